use std::path::Path;
use std::path::PathBuf;

use ignore::WalkBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Serialize;

use crate::DEFAULT_MAX_FILE_SIZE;
use crate::IbConfig;
use crate::IbError;
use crate::IbResult;
use crate::IncludeDiagnostic;
use crate::LexOptions;
use crate::lex;

/// Options for checking every IB file below a directory.
///
/// Use [`CheckOptions::default()`] for sensible defaults or
/// [`CheckOptions::from_config`] to construct from an [`IbConfig`].
#[derive(Debug, Clone)]
pub struct CheckOptions {
	pub lex: LexOptions,
	/// Gitignore-style patterns to exclude from the walk.
	pub exclude_patterns: Vec<String>,
	/// Maximum file size to lex in bytes.
	pub max_file_size: u64,
	/// Whether to disable `.gitignore` integration.
	pub disable_gitignore: bool,
}

impl Default for CheckOptions {
	fn default() -> Self {
		Self {
			lex: LexOptions::default(),
			exclude_patterns: Vec::new(),
			max_file_size: DEFAULT_MAX_FILE_SIZE,
			disable_gitignore: false,
		}
	}
}

impl CheckOptions {
	/// Construct [`CheckOptions`] from an [`IbConfig`].
	pub fn from_config(config: Option<&IbConfig>) -> Self {
		Self {
			lex: LexOptions::from_config(config),
			exclude_patterns: config
				.map(|c| c.exclude.patterns.clone())
				.unwrap_or_default(),
			max_file_size: config.map_or(DEFAULT_MAX_FILE_SIZE, |c| c.max_file_size),
			disable_gitignore: config.is_some_and(|c| c.disable_gitignore),
		}
	}
}

/// The outcome of lexing one file during a project check.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
	pub file: PathBuf,
	/// Number of tokens, including those of included files.
	pub token_count: usize,
	/// Include diagnostics raised by this file's own include directives.
	pub diagnostics: Vec<IncludeDiagnostic>,
}

/// The outcome of checking every IB file below a directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectReport {
	pub files: Vec<FileReport>,
}

impl ProjectReport {
	/// Returns true when no include diagnostics were raised.
	pub fn is_ok(&self) -> bool {
		self.files.iter().all(|file| file.diagnostics.is_empty())
	}

	pub fn diagnostics(&self) -> impl Iterator<Item = &IncludeDiagnostic> {
		self.files.iter().flat_map(|file| file.diagnostics.iter())
	}

	pub fn diagnostic_count(&self) -> usize {
		self.files.iter().map(|file| file.diagnostics.len()).sum()
	}
}

fn build_exclude_matcher(root: &Path, patterns: &[String]) -> IbResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			IbError::InvalidExcludePattern {
				pattern: pattern.clone(),
				reason: e.to_string(),
			}
		})?;
	}
	builder.build().map_err(|e| {
		IbError::InvalidExcludePattern {
			pattern: patterns.join(", "),
			reason: e.to_string(),
		}
	})
}

fn has_extension(path: &Path, extension: &str) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Collect every IB file below `root`, sorted for deterministic ordering.
///
/// When `disable_gitignore` is false (the default), files matched by
/// `.gitignore` are skipped. Exclude patterns from `ib.toml` follow gitignore
/// syntax and are always applied on top. Hidden directories are skipped.
pub fn collect_source_files(root: &Path, options: &CheckOptions) -> IbResult<Vec<PathBuf>> {
	let exclude = build_exclude_matcher(root, &options.exclude_patterns)?;
	let mut files = Vec::new();

	let walker = WalkBuilder::new(root)
		.hidden(true)
		.git_ignore(!options.disable_gitignore)
		.git_exclude(!options.disable_gitignore)
		.git_global(false)
		.require_git(false)
		.build();

	for entry in walker {
		let entry = match entry {
			Ok(entry) => entry,
			Err(e) => {
				tracing::warn!(error = %e, "skipping unreadable entry");
				continue;
			}
		};

		let path = entry.path();
		if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
			continue;
		}

		if !has_extension(path, &options.lex.default_extension) {
			continue;
		}

		if exclude
			.matched_path_or_any_parents(path, false)
			.is_ignore()
		{
			tracing::trace!(path = %path.display(), "excluded");
			continue;
		}

		files.push(path.to_path_buf());
	}

	files.sort();
	Ok(files)
}

/// Lex every IB file below `root` and collect the include diagnostics each
/// file raises.
pub fn check_project(root: &Path, options: &CheckOptions) -> IbResult<ProjectReport> {
	let files = collect_source_files(root, options)?;
	let mut report = ProjectReport::default();

	for file in files {
		let size = std::fs::metadata(&file)?.len();
		if size > options.max_file_size {
			return Err(IbError::FileTooLarge {
				path: file.display().to_string(),
				size,
				limit: options.max_file_size,
			});
		}

		let content = std::fs::read(&file)?;
		let result = lex(&file, &content, &options.lex);
		let diagnostics = result.own_diagnostics().cloned().collect();

		report.files.push(FileReport {
			token_count: result.tokens.len(),
			file,
			diagnostics,
		});
	}

	tracing::debug!(
		files = report.files.len(),
		diagnostics = report.diagnostic_count(),
		"checked project"
	);

	Ok(report)
}

use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::AnyResult;
use crate::LexOptions;
use crate::ParseResult;
use crate::lex;

/// A path whose ancestors contain no `source` directory, so includes stay
/// disabled.
pub(crate) const ROOTLESS_FILE: &str = "/__ib_tests__/memory.ib";

/// Lex `content` without a project root.
pub(crate) fn lex_str(content: &str) -> ParseResult {
	lex(
		Path::new(ROOTLESS_FILE),
		content.as_bytes(),
		&LexOptions::default(),
	)
}

pub(crate) fn lex_str_with(content: &str, options: &LexOptions) -> ParseResult {
	lex(Path::new(ROOTLESS_FILE), content.as_bytes(), options)
}

pub(crate) fn texts(result: &ParseResult) -> Vec<&str> {
	result
		.tokens
		.iter()
		.map(|token| token.text.as_str())
		.collect()
}

/// One token per line, as printed by `Token`'s `Display`.
pub(crate) fn render(result: &ParseResult) -> String {
	result
		.tokens
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("\n")
}

/// A temporary IB project: `<tmp>/source` with a `system` child directory.
pub(crate) struct ProjectFixture {
	dir: TempDir,
}

impl ProjectFixture {
	pub fn new() -> AnyResult<Self> {
		let dir = tempfile::tempdir()?;
		std::fs::create_dir_all(dir.path().join("source").join("system"))?;
		Ok(Self { dir })
	}

	/// The temporary directory holding `source`.
	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	/// The project root.
	pub fn source(&self) -> PathBuf {
		self.dir.path().join("source")
	}

	/// Write `content` to `relative` below `source`, creating parents.
	pub fn write(&self, relative: &str, content: &str) -> AnyResult<PathBuf> {
		let path = self.source().join(relative);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&path, content)?;
		Ok(path)
	}

	/// Write `content` to `relative` and lex it with `options`.
	pub fn lex(&self, relative: &str, content: &str, options: &LexOptions) -> AnyResult<ParseResult> {
		let path = self.write(relative, content)?;
		Ok(lex(&path, content.as_bytes(), options))
	}
}

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use crate::IncludeDiagnosticKind;
use crate::ProjectRoot;

/// The file specifier scanned from an include directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Specifier {
	/// A closed `"..."` or `'...'` specifier, as raw bytes.
	Quoted(Vec<u8>),
	/// An opening quote without a closing one on the same line.
	Unterminated(String),
	/// No quote before the end of the line.
	Missing,
}

/// Result of scanning forward from the delimiter that ended an `include`
/// keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IncludeDirective {
	pub specifier: Specifier,
	/// Index of the next byte the outer scan should process. Points past the
	/// closing quote, or at the `\r`/`\n` that cut the directive short so the
	/// outer scan still sees it.
	pub resume: usize,
}

fn is_quote(byte: u8) -> bool {
	matches!(byte, b'"' | b'\'')
}

/// Scan an include directive starting at `start`, the delimiter directly
/// after the `include` keyword.
///
/// Skips to the first quote, then collects the specifier up to the next
/// quote. A line terminator or the end of input ends the scan early. Never
/// reads past the end of `input`.
pub(crate) fn scan_directive(input: &[u8], start: usize) -> IncludeDirective {
	let stops_scan = |byte: u8| is_quote(byte) || byte == b'\r' || byte == b'\n';
	let mut index = start;

	while index < input.len() && !stops_scan(input[index]) {
		index += 1;
	}

	if index >= input.len() || !is_quote(input[index]) {
		return IncludeDirective {
			specifier: Specifier::Missing,
			resume: index,
		};
	}

	// Skip the opening quote.
	index += 1;
	let specifier_start = index;

	while index < input.len() && !stops_scan(input[index]) {
		index += 1;
	}

	let specifier = &input[specifier_start..index];

	if index < input.len() && is_quote(input[index]) {
		IncludeDirective {
			specifier: Specifier::Quoted(specifier.to_vec()),
			resume: index + 1,
		}
	} else {
		IncludeDirective {
			specifier: Specifier::Unterminated(decode(specifier)),
			resume: index,
		}
	}
}

/// Decode each byte as one Latin-1 character.
pub(crate) fn decode(bytes: &[u8]) -> String {
	bytes.iter().map(|&byte| char::from(byte)).collect()
}

/// Build the path an include specifier refers to.
///
/// Both `/` and `\` separate components, so specifiers written for either
/// platform resolve the same way. Specifiers without an extension receive
/// `default_extension`.
pub fn resolve_include_path(root: &ProjectRoot, specifier: &str, default_extension: &str) -> PathBuf {
	let components = specifier.split(['/', '\\']).map(OsString::from);
	join_components(root, components, default_extension)
}

/// [`resolve_include_path`] for a specifier read straight from a source file.
pub(crate) fn resolve_specifier(root: &ProjectRoot, specifier: &[u8], default_extension: &str) -> PathBuf {
	let components = specifier
		.split(|&byte| byte == b'/' || byte == b'\\')
		.map(path_component);
	join_components(root, components, default_extension)
}

fn join_components(
	root: &ProjectRoot,
	components: impl Iterator<Item = OsString>,
	default_extension: &str,
) -> PathBuf {
	let mut path = root.path().to_path_buf();

	for component in components.filter(|component| !component.is_empty()) {
		path.push(component);
	}

	if path.extension().is_none() {
		path.set_extension(default_extension);
	}

	path
}

/// File names on Unix are arbitrary bytes, so bytes above ASCII name the
/// file exactly as written.
#[cfg(unix)]
fn path_component(bytes: &[u8]) -> OsString {
	use std::os::unix::ffi::OsStrExt;

	std::ffi::OsStr::from_bytes(bytes).to_os_string()
}

/// Elsewhere each byte is read as a Latin-1 character.
#[cfg(not(unix))]
fn path_component(bytes: &[u8]) -> OsString {
	OsString::from(decode(bytes))
}

/// The files currently being lexed, outermost first. Guards against include
/// cycles and runaway nesting.
#[derive(Debug, Default)]
pub(crate) struct IncludeChain {
	files: Vec<PathBuf>,
}

impl IncludeChain {
	pub fn new(file: &Path) -> Self {
		Self {
			files: vec![canonical(file)],
		}
	}

	/// Check whether `path` may be entered, returning the reason it may not.
	pub fn check(&self, path: &Path, limit: usize) -> Result<PathBuf, IncludeDiagnosticKind> {
		let canonical = canonical(path);

		if self.files.contains(&canonical) {
			return Err(IncludeDiagnosticKind::Cycle {
				path: path.to_path_buf(),
			});
		}

		// The outermost file is not an include, so it does not count.
		if self.files.len() > limit {
			return Err(IncludeDiagnosticKind::DepthExceeded {
				path: path.to_path_buf(),
				limit,
			});
		}

		Ok(canonical)
	}

	pub fn push(&mut self, canonical: PathBuf) {
		self.files.push(canonical);
	}

	pub fn pop(&mut self) {
		self.files.pop();
	}

	pub fn depth(&self) -> usize {
		self.files.len().saturating_sub(1)
	}
}

fn canonical(path: &Path) -> PathBuf {
	path.canonicalize()
		.or_else(|_| std::path::absolute(path))
		.unwrap_or_else(|_| path.to_path_buf())
}

use std::fmt::Display;
use std::path::PathBuf;

use serde::Serialize;

use crate::ProjectRoot;

/// Reserved words of the IB language. All comparisons are
/// ASCII-case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
	/// `comment`, opens a block comment.
	Comment,
	/// `endcomment`, closes a block comment.
	EndComment,
	/// `module`
	Module,
	/// `library`
	Library,
	/// `include`, splices another file's tokens.
	Include,
}

impl Keyword {
	pub const ALL: [Keyword; 5] = [
		Keyword::Comment,
		Keyword::EndComment,
		Keyword::Module,
		Keyword::Library,
		Keyword::Include,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Keyword::Comment => "comment",
			Keyword::EndComment => "endcomment",
			Keyword::Module => "module",
			Keyword::Library => "library",
			Keyword::Include => "include",
		}
	}

	/// Whether `text` spells this keyword, ignoring ASCII case.
	pub fn matches(self, text: &str) -> bool {
		text.eq_ignore_ascii_case(self.as_str())
	}

	pub fn from_text(text: &str) -> Option<Keyword> {
		Self::ALL.into_iter().find(|keyword| keyword.matches(text))
	}
}

impl Display for Keyword {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// A zero-based location in a file. `column` counts bytes since the last line
/// terminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Point {
	pub line: usize,
	pub column: usize,
}

impl Point {
	pub fn new(line: usize, column: usize) -> Self {
		Self { line, column }
	}
}

impl Display for Point {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

/// A maximal run of identifier characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
	/// The identifier run. Never empty.
	pub text: String,
	/// The last non-blank delimiter seen before this token on its line, or the
	/// blank one when no other was seen.
	pub leading_delimiter: Option<char>,
	/// Where the token starts. `None` for tokens spliced in from an included
	/// file.
	pub position: Option<Point>,
}

impl Token {
	pub fn new(text: impl Into<String>, leading_delimiter: Option<char>, position: Point) -> Self {
		Self {
			text: text.into(),
			leading_delimiter,
			position: Some(position),
		}
	}

	/// Whether this token was pulled in through an include directive.
	pub fn is_included(&self) -> bool {
		self.position.is_none()
	}

	/// The keyword this token spells, if any.
	pub fn keyword(&self) -> Option<Keyword> {
		Keyword::from_text(&self.text)
	}

	/// Strip the position, as done for every token of an included file.
	#[must_use]
	pub fn into_included(self) -> Self {
		Self {
			position: None,
			..self
		}
	}

	/// Whether `point` falls on this token.
	pub fn contains(&self, point: Point) -> bool {
		self.position.is_some_and(|start| {
			start.line == point.line
				&& point.column >= start.column
				&& point.column < start.column + self.text.len()
		})
	}
}

/// One token per line: `line:column`, the leading delimiter (debug-escaped,
/// `_` when absent) and the text. Included tokens print `-:-`.
impl Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.position {
			Some(point) => write!(f, "{point}")?,
			None => write!(f, "-:-")?,
		}

		match self.leading_delimiter {
			Some(delimiter) => write!(f, " {delimiter:?}")?,
			None => write!(f, " _")?,
		}

		write!(f, " {}", self.text)
	}
}

/// Why an include directive contributed no tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum IncludeDiagnosticKind {
	/// No opening quote before the end of the line.
	MissingSpecifier,
	/// The quoted specifier was not closed before the end of the line.
	UnterminatedSpecifier { specifier: String },
	/// The resolved file does not exist.
	NotFound { path: PathBuf },
	/// The resolved file exists but could not be read.
	Unreadable { path: PathBuf, reason: String },
	/// The resolved file is already being lexed further up the include chain.
	Cycle { path: PathBuf },
	/// Following the include would nest deeper than the configured limit.
	DepthExceeded { path: PathBuf, limit: usize },
}

/// An include directive that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeDiagnostic {
	/// The file containing the include directive.
	pub file: PathBuf,
	/// Position of the `include` keyword.
	pub position: Point,
	#[serde(flatten)]
	pub kind: IncludeDiagnosticKind,
}

impl IncludeDiagnostic {
	/// Human-readable message for this diagnostic.
	pub fn message(&self) -> String {
		match &self.kind {
			IncludeDiagnosticKind::MissingSpecifier => {
				"include directive has no quoted file specifier".to_string()
			}
			IncludeDiagnosticKind::UnterminatedSpecifier { specifier } => {
				format!("unterminated include specifier `{specifier}`")
			}
			IncludeDiagnosticKind::NotFound { path } => {
				format!("included file `{}` does not exist", path.display())
			}
			IncludeDiagnosticKind::Unreadable { path, reason } => {
				format!("included file `{}` could not be read: {reason}", path.display())
			}
			IncludeDiagnosticKind::Cycle { path } => {
				format!("include cycle: `{}` is already being included", path.display())
			}
			IncludeDiagnosticKind::DepthExceeded { path, limit } => {
				format!(
					"including `{}` exceeds the maximum include depth of {limit}",
					path.display()
				)
			}
		}
	}

	/// Short machine-readable code, e.g. `ib::include_not_found`.
	pub fn code(&self) -> &'static str {
		match &self.kind {
			IncludeDiagnosticKind::MissingSpecifier => "ib::include_missing_specifier",
			IncludeDiagnosticKind::UnterminatedSpecifier { .. } => "ib::include_unterminated",
			IncludeDiagnosticKind::NotFound { .. } => "ib::include_not_found",
			IncludeDiagnosticKind::Unreadable { .. } => "ib::include_unreadable",
			IncludeDiagnosticKind::Cycle { .. } => "ib::include_cycle",
			IncludeDiagnosticKind::DepthExceeded { .. } => "ib::include_depth_exceeded",
		}
	}
}

/// The tokens of one file, with the tokens of its includes inlined where each
/// include directive appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult {
	/// The lexed file.
	pub path: PathBuf,
	/// The project root includes were resolved against, if one was found.
	pub root: Option<ProjectRoot>,
	pub tokens: Vec<Token>,
	/// Skipped includes, from this file and from every file it includes.
	pub diagnostics: Vec<IncludeDiagnostic>,
}

impl ParseResult {
	/// Tokens that originate from this file rather than from an include.
	pub fn own_tokens(&self) -> impl Iterator<Item = &Token> {
		self.tokens.iter().filter(|token| !token.is_included())
	}

	/// The token of this file covering `point`.
	pub fn token_at(&self, point: Point) -> Option<&Token> {
		self.own_tokens().find(|token| token.contains(point))
	}

	/// Diagnostics raised by include directives in this file itself.
	pub fn own_diagnostics(&self) -> impl Iterator<Item = &IncludeDiagnostic> {
		self.diagnostics
			.iter()
			.filter(move |diagnostic| diagnostic.file == self.path)
	}
}

use std::path::Path;

use crate::IbError;
use crate::IbResult;
use crate::IncludeDiagnostic;
use crate::IncludeDiagnosticKind;
use crate::Keyword;
use crate::LexOptions;
use crate::LineEndings;
use crate::ParseResult;
use crate::Point;
use crate::ProjectRoot;
use crate::Token;
use crate::find_project_root;
use crate::include::IncludeChain;
use crate::include::Specifier;
use crate::include::resolve_specifier;
use crate::include::scan_directive;

/// ASCII letters, digits and `_` make up tokens. Every other byte is a
/// delimiter.
pub fn is_identifier_byte(byte: u8) -> bool {
	byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Whitespace when each byte is read as a Latin-1 character.
pub fn is_blank(byte: u8) -> bool {
	matches!(
		byte,
		b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c | 0x85 | 0xa0
	)
}

/// What the scan is currently inside of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
	/// Ordinary text.
	#[default]
	Scanning,
	/// After `;`, up to the end of the line.
	LineComment,
	/// Between `comment` and `endcomment`.
	BlockComment,
	/// After `\`, up to the end of the line.
	LineContinuation,
}

/// Outcome of feeding one byte to a [`LexState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
	Continue,
	/// A completed token.
	Emit(Token),
	/// The `include` keyword just ended at this byte. The caller scans the
	/// directive starting at this byte and then calls
	/// [`LexState::finish_include`]. The byte has not been consumed.
	Include { keyword: Point },
}

/// The scanner for a single file, fed one byte at a time.
#[derive(Debug, Clone)]
pub struct LexState {
	mode: Mode,
	line_endings: LineEndings,
	/// Whether `include` is treated as a directive. Only true when a project
	/// root is known.
	includes_enabled: bool,
	/// The identifier run in progress.
	text: String,
	/// Where the run in progress started.
	start: Point,
	/// Leading delimiter candidate for the next token.
	leading: Option<u8>,
	/// The previous byte was `\r`, so a following `\n` belongs to it.
	after_cr: bool,
	line: usize,
	column: usize,
}

impl LexState {
	pub fn new(line_endings: LineEndings, includes_enabled: bool) -> Self {
		Self {
			mode: Mode::default(),
			line_endings,
			includes_enabled,
			text: String::new(),
			start: Point::default(),
			leading: None,
			after_cr: false,
			line: 0,
			column: 0,
		}
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	/// The identifier run accumulated so far.
	pub fn pending(&self) -> &str {
		&self.text
	}

	/// Position of the next byte.
	pub fn position(&self) -> Point {
		Point::new(self.line, self.column)
	}

	/// Feed the next byte.
	pub fn step(&mut self, byte: u8) -> Step {
		let step = self.classify(byte);

		if !matches!(step, Step::Include { .. }) {
			self.advance_column(byte);
		}

		step
	}

	/// Complete an include directive that consumed `consumed` bytes (none of
	/// them line terminators). The keyword never becomes a token.
	pub fn finish_include(&mut self, consumed: usize) {
		self.text.clear();
		self.leading = None;
		self.column += consumed;
	}

	/// Signal the end of input. A run still pending in ordinary text is
	/// emitted; anything pending inside a comment or continuation is dropped.
	pub fn finish(&mut self) -> Step {
		if self.mode != Mode::Scanning || Keyword::Comment.matches(&self.text) {
			self.text.clear();
			return Step::Continue;
		}

		if self.includes_enabled && Keyword::Include.matches(&self.text) {
			return Step::Include { keyword: self.start };
		}

		self.take_token()
	}

	fn advance_column(&mut self, byte: u8) {
		if matches!(byte, b'\r' | b'\n') {
			self.column = 0;
		} else {
			self.column += 1;
		}
	}

	fn classify(&mut self, byte: u8) -> Step {
		let after_cr = std::mem::take(&mut self.after_cr);

		if is_identifier_byte(byte) {
			if matches!(self.mode, Mode::Scanning | Mode::BlockComment) {
				self.accumulate(byte);
			}
			return Step::Continue;
		}

		if after_cr && byte == b'\n' {
			return Step::Continue;
		}

		let terminator = self.line_endings.is_terminator(byte);

		match self.mode {
			Mode::LineComment => {
				self.text.clear();
				if terminator {
					self.mode = Mode::Scanning;
					self.end_line(byte);
				}
				Step::Continue
			}
			Mode::BlockComment => {
				if Keyword::EndComment.matches(&self.text) {
					self.mode = Mode::Scanning;
				}
				self.text.clear();
				self.leading = None;
				if terminator {
					self.end_line(byte);
				}
				Step::Continue
			}
			Mode::LineContinuation => {
				self.text.clear();
				if terminator {
					self.mode = Mode::Scanning;
					self.end_line(byte);
				}
				Step::Continue
			}
			Mode::Scanning => self.delimit(byte, terminator),
		}
	}

	/// Handle a delimiter in ordinary text.
	fn delimit(&mut self, byte: u8, terminator: bool) -> Step {
		if Keyword::Comment.matches(&self.text) {
			self.mode = Mode::BlockComment;
			self.text.clear();
			self.leading = None;
			if terminator {
				self.end_line(byte);
			}
			return Step::Continue;
		}

		if self.includes_enabled && Keyword::Include.matches(&self.text) {
			return Step::Include {
				keyword: self.start,
			};
		}

		let step = self.take_token();

		if terminator {
			self.leading = None;
			self.end_line(byte);
		} else if byte == b'\\' {
			self.mode = Mode::LineContinuation;
		} else if byte == b';' {
			self.mode = Mode::LineComment;
		} else if self.leading.is_none_or(is_blank) {
			self.leading = Some(byte);
		}

		step
	}

	fn accumulate(&mut self, byte: u8) {
		if self.text.is_empty() {
			self.start = self.position();
		}
		self.text.push(char::from(byte));
	}

	fn take_token(&mut self) -> Step {
		if self.text.is_empty() {
			return Step::Continue;
		}

		Step::Emit(Token {
			text: std::mem::take(&mut self.text),
			leading_delimiter: self.leading.take().map(char::from),
			position: Some(self.start),
		})
	}

	/// Count a line terminator. Only an ordinary line end in text clears the
	/// leading delimiter candidate; one that closes a `;` comment or a
	/// continuation leaves it for the next token.
	fn end_line(&mut self, byte: u8) {
		self.line += 1;
		self.after_cr = byte == b'\r';
	}
}

/// Lex `content` as the IB file at `path`.
///
/// The project root is discovered from `path`, and include directives are
/// resolved against it. Problems with includes never fail the lex; they are
/// reported through [`ParseResult::diagnostics`].
pub fn lex(path: &Path, content: &[u8], options: &LexOptions) -> ParseResult {
	let mut chain = IncludeChain::new(path);
	lex_in_chain(path, content, options, &mut chain)
}

/// Read and lex the IB file at `path`.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn lex_file(path: &Path, options: &LexOptions) -> IbResult<ParseResult> {
	if !path.is_file() {
		return Err(IbError::NotAFile(path.display().to_string()));
	}

	let content = std::fs::read(path)?;
	Ok(lex(path, &content, options))
}

fn lex_in_chain(
	path: &Path,
	content: &[u8],
	options: &LexOptions,
	chain: &mut IncludeChain,
) -> ParseResult {
	let root = find_project_root(path);

	let (tokens, diagnostics) = {
		let mut lexer = Lexer {
			path,
			input: content,
			options,
			root: root.as_ref(),
			chain,
			tokens: Vec::new(),
			diagnostics: Vec::new(),
		};
		lexer.run();
		(lexer.tokens, lexer.diagnostics)
	};

	tracing::debug!(
		path = %path.display(),
		tokens = tokens.len(),
		diagnostics = diagnostics.len(),
		"lexed file"
	);

	ParseResult {
		path: path.to_path_buf(),
		root,
		tokens,
		diagnostics,
	}
}

/// Drives a [`LexState`] over one file and splices in its includes.
struct Lexer<'a> {
	path: &'a Path,
	input: &'a [u8],
	options: &'a LexOptions,
	root: Option<&'a ProjectRoot>,
	chain: &'a mut IncludeChain,
	tokens: Vec<Token>,
	diagnostics: Vec<IncludeDiagnostic>,
}

impl Lexer<'_> {
	fn run(&mut self) {
		let mut state = LexState::new(self.options.line_endings, self.root.is_some());
		let mut index = 0;

		while index < self.input.len() {
			match state.step(self.input[index]) {
				Step::Continue => {}
				Step::Emit(token) => self.tokens.push(token),
				Step::Include { keyword } => {
					let directive = scan_directive(self.input, index);
					state.finish_include(directive.resume - index);
					self.include(directive.specifier, keyword);
					// The byte at `resume` may be the one just stepped; its
					// run has been cleared so it cannot trigger again.
					index = directive.resume;
					continue;
				}
			}

			index += 1;
		}

		match state.finish() {
			Step::Continue => {}
			Step::Emit(token) => self.tokens.push(token),
			Step::Include { keyword } => self.include(Specifier::Missing, keyword),
		}
	}

	fn include(&mut self, specifier: Specifier, keyword: Point) {
		let Some(root) = self.root else {
			return;
		};

		let specifier = match specifier {
			Specifier::Quoted(specifier) => specifier,
			Specifier::Unterminated(specifier) => {
				self.skip(
					keyword,
					IncludeDiagnosticKind::UnterminatedSpecifier { specifier },
				);
				return;
			}
			Specifier::Missing => {
				self.skip(keyword, IncludeDiagnosticKind::MissingSpecifier);
				return;
			}
		};

		let path = resolve_specifier(root, &specifier, &self.options.default_extension);

		if !path.is_file() {
			tracing::debug!(path = %path.display(), "included file not found");
			self.skip(keyword, IncludeDiagnosticKind::NotFound { path });
			return;
		}

		let canonical = match self.chain.check(&path, self.options.max_include_depth) {
			Ok(canonical) => canonical,
			Err(kind) => {
				let reason = if matches!(kind, IncludeDiagnosticKind::Cycle { .. }) {
					"include cycle"
				} else {
					"maximum include depth exceeded"
				};
				tracing::warn!(
					file = %self.path.display(),
					include = %path.display(),
					depth = self.chain.depth(),
					"skipping include: {reason}"
				);
				self.skip(keyword, kind);
				return;
			}
		};

		let content = match std::fs::read(&path) {
			Ok(content) => content,
			Err(e) => {
				tracing::warn!(include = %path.display(), error = %e, "failed to read included file");
				self.skip(
					keyword,
					IncludeDiagnosticKind::Unreadable {
						path,
						reason: e.to_string(),
					},
				);
				return;
			}
		};

		self.chain.push(canonical);
		let nested = lex_in_chain(&path, &content, self.options, self.chain);
		self.chain.pop();

		self.tokens
			.extend(nested.tokens.into_iter().map(Token::into_included));
		self.diagnostics.extend(nested.diagnostics);
	}

	fn skip(&mut self, position: Point, kind: IncludeDiagnosticKind) {
		self.diagnostics.push(IncludeDiagnostic {
			file: self.path.to_path_buf(),
			position,
			kind,
		});
	}
}

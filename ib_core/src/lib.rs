//! `ib_core` turns IB source files into position-annotated token streams for
//! editor tooling.
//!
//! ## Processing Pipeline
//!
//! ```text
//! IB source file (bytes)
//!   → Root locator (finds the `source` directory that holds `system`)
//!   → Tokenizer (identifier runs, comments, continuations, include directives)
//!   → Include resolver (lexes included files recursively, splices their tokens)
//!   → ParseResult (tokens + include diagnostics)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `ib.toml` (line endings, default
//!   include extension, include depth, project walk exclusions).
//! - [`project`]: Walks a directory for IB files and lexes each one, collecting
//!   include diagnostics.
//!
//! ## Key Types
//!
//! - [`Token`]: An identifier run with its leading delimiter and position.
//! - [`ParseResult`]: The tokens of one file with its includes inlined.
//! - [`IncludeDiagnostic`]: An include directive that contributed no tokens.
//! - [`ProjectRoot`]: The directory include specifiers are resolved against.
//! - [`LexState`]: The byte-at-a-time scanner behind [`lex`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use ib_core::LexOptions;
//! use ib_core::lex_file;
//!
//! let result = lex_file(Path::new("source/main.ib"), &LexOptions::default()).unwrap();
//!
//! for token in &result.tokens {
//! 	println!("{token}");
//! }
//! ```

pub use config::*;
pub use error::*;
pub use include::resolve_include_path;
pub use lexer::*;
pub use root::*;
pub use tokens::*;

pub mod config;
#[allow(unused_assignments)]
mod error;
mod include;
mod lexer;
pub mod project;
mod root;
mod tokens;

#[cfg(test)]
mod __fixtures;

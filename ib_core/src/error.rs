use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum IbError {
	#[error(transparent)]
	#[diagnostic(code(ib::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(ib::config_parse),
		help("check that ib.toml is valid TOML, e.g. `line_endings = \"universal\"`")
	)]
	ConfigParse(String),

	#[error("invalid exclude pattern `{pattern}`: {reason}")]
	#[diagnostic(
		code(ib::invalid_exclude_pattern),
		help("exclude patterns in ib.toml use gitignore syntax")
	)]
	InvalidExcludePattern { pattern: String, reason: String },

	#[error("file too large: `{path}` is {size} bytes (limit: {limit} bytes)")]
	#[diagnostic(
		code(ib::file_too_large),
		help("increase `max_file_size` in ib.toml or exclude this file")
	)]
	FileTooLarge { path: String, size: u64, limit: u64 },

	#[error("not a file: `{0}`")]
	#[diagnostic(code(ib::not_a_file), help("pass the path of an IB source file"))]
	NotAFile(String),
}

pub type IbResult<T> = Result<T, IbError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::IbError;
use crate::IbResult;

/// Default maximum file size in bytes (10 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Extension appended to include specifiers that have none.
pub const DEFAULT_EXTENSION: &str = "ib";

/// Maximum number of nested include levels followed from a single file.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["ib.toml", ".ib.toml", ".config/ib.toml"];

/// Which bytes end a physical line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEndings {
	/// `\r`, `\n` and `\r\n` each end exactly one line.
	#[default]
	Universal,
	/// Only `\r` (or `\r\n`) ends a line. A bare `\n` is treated as ordinary
	/// whitespace and does not advance the line counter. This matches the
	/// line numbering produced by older IB tooling.
	CarriageReturn,
}

impl LineEndings {
	/// Whether `byte` ends a line under this convention.
	pub fn is_terminator(self, byte: u8) -> bool {
		match self {
			Self::Universal => matches!(byte, b'\r' | b'\n'),
			Self::CarriageReturn => byte == b'\r',
		}
	}
}

/// Configuration loaded from an `ib.toml` file.
///
/// ```toml
/// line_endings = "universal"
/// default_extension = "ib"
/// max_include_depth = 32
/// max_file_size = 10485760
/// disable_gitignore = false
///
/// [exclude]
/// patterns = ["build/", "*.generated.ib"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct IbConfig {
	/// Line terminator convention used for line numbering.
	#[serde(default)]
	pub line_endings: LineEndings,
	/// Extension appended to extensionless include specifiers.
	#[serde(default = "default_extension")]
	pub default_extension: String,
	/// Maximum include nesting followed before giving up on an include.
	#[serde(default = "default_max_include_depth")]
	pub max_include_depth: usize,
	/// Maximum file size in bytes to lex during a project check. Larger files
	/// are reported as errors.
	#[serde(default = "default_max_file_size")]
	pub max_file_size: u64,
	/// When true, `.gitignore` files are not consulted while walking a
	/// project for IB files.
	#[serde(default)]
	pub disable_gitignore: bool,
	/// Exclusion configuration using gitignore-style patterns.
	#[serde(default)]
	pub exclude: ExcludeConfig,
}

/// Paths skipped while walking a project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Gitignore-style patterns, relative to the project directory.
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl Default for IbConfig {
	fn default() -> Self {
		Self {
			line_endings: LineEndings::default(),
			default_extension: default_extension(),
			max_include_depth: default_max_include_depth(),
			max_file_size: default_max_file_size(),
			disable_gitignore: false,
			exclude: ExcludeConfig::default(),
		}
	}
}

fn default_extension() -> String {
	DEFAULT_EXTENSION.to_string()
}

fn default_max_include_depth() -> usize {
	DEFAULT_MAX_INCLUDE_DEPTH
}

fn default_max_file_size() -> u64 {
	DEFAULT_MAX_FILE_SIZE
}

impl IbConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(dir: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| dir.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file in `dir`.
	/// Returns `None` if there is no config file.
	pub fn load(dir: &Path) -> IbResult<Option<IbConfig>> {
		let Some(config_path) = Self::resolve_path(dir) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::from_toml(&content)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	/// Parse config from TOML text.
	pub fn from_toml(content: &str) -> IbResult<IbConfig> {
		toml::from_str(content).map_err(|e| IbError::ConfigParse(e.to_string()))
	}
}

/// Options for a single lex request, including the includes it follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexOptions {
	pub line_endings: LineEndings,
	/// Extension (without the dot) given to extensionless include specifiers.
	pub default_extension: String,
	pub max_include_depth: usize,
}

impl Default for LexOptions {
	fn default() -> Self {
		Self {
			line_endings: LineEndings::default(),
			default_extension: default_extension(),
			max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
		}
	}
}

impl LexOptions {
	/// Construct [`LexOptions`] from an optional [`IbConfig`], falling back to
	/// defaults.
	pub fn from_config(config: Option<&IbConfig>) -> Self {
		let Some(config) = config else {
			return Self::default();
		};

		let extension = config.default_extension.trim_start_matches('.');
		Self {
			line_endings: config.line_endings,
			default_extension: if extension.is_empty() {
				default_extension()
			} else {
				extension.to_string()
			},
			max_include_depth: config.max_include_depth,
		}
	}
}

use std::path::Path;
use std::path::PathBuf;

use derive_more::Deref;
use serde::Serialize;

/// Name of the directory that anchors an IB project.
pub const SOURCE_DIR_NAME: &str = "source";

/// A `source` directory only counts as the project root when it has a child
/// directory with this name.
pub const SYSTEM_DIR_NAME: &str = "system";

/// The directory that include specifiers are resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Serialize)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
	pub fn path(&self) -> &Path {
		&self.0
	}

	pub fn into_path_buf(self) -> PathBuf {
		self.0
	}
}

impl AsRef<Path> for ProjectRoot {
	fn as_ref(&self) -> &Path {
		&self.0
	}
}

/// Find the project root for `file`.
///
/// Walks upward from the directory containing `file` and returns the first
/// ancestor named `source` (compared case-insensitively) that contains a
/// `system` directory (also case-insensitive). Returns `None` once the walk
/// passes the filesystem root.
pub fn find_project_root(file: &Path) -> Option<ProjectRoot> {
	let file = std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf());
	let mut current = file.parent();

	while let Some(dir) = current {
		if is_source_dir(dir) && has_system_dir(dir) {
			tracing::debug!(root = %dir.display(), "found project root");
			return Some(ProjectRoot(dir.to_path_buf()));
		}

		current = dir.parent();
	}

	tracing::debug!(file = %file.display(), "no project root found");
	None
}

fn is_source_dir(dir: &Path) -> bool {
	dir.file_name()
		.and_then(|name| name.to_str())
		.is_some_and(|name| name.eq_ignore_ascii_case(SOURCE_DIR_NAME))
}

fn has_system_dir(dir: &Path) -> bool {
	let entries = match std::fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) => {
			tracing::trace!(dir = %dir.display(), error = %e, "skipping unreadable directory");
			return false;
		}
	};

	entries.filter_map(Result::ok).any(|entry| {
		entry.path().is_dir()
			&& entry
				.file_name()
				.to_str()
				.is_some_and(|name| name.eq_ignore_ascii_case(SYSTEM_DIR_NAME))
	})
}

use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;
use ib_core::AnyResult;
use insta_cmd::get_cargo_bin;

pub fn ib_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("ib"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("IB_LOG");
	cmd
}

/// Create `source/system` below `dir` and write `files` into `source`.
#[allow(dead_code)]
pub fn write_project(dir: &Path, files: &[(&str, &str)]) -> AnyResult<PathBuf> {
	let source = dir.join("source");
	std::fs::create_dir_all(source.join("system"))?;

	for (name, content) in files {
		let path = source.join(name);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, content)?;
	}

	Ok(source)
}

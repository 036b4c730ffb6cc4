use std::ffi::{OsStr,OsString};
use std::path::{Path,PathBuf};

pub const PATH_KEY: &'static str = "PATH";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{name}: command not found")]
pub struct ResolveError {
	pub name: String,
}

// relative PATH entries are taken from `cwd`, the directory the child will run in
pub fn lookup(name: &str, search_path: Option<&OsStr>, cwd: &Path) -> Result<PathBuf, ResolveError> {
	let token = Path::new(name);
	if token.is_absolute() && token.exists() {
		tracing::debug!(name, "absolute path exists, skipping PATH search");
		return Ok(token.to_path_buf());
	}
	let dirs = search_path.map(OsStr::to_os_string).unwrap_or_else(OsString::new);
	for dir in std::env::split_paths(&dirs) {
		let candidate = cwd.join(dir.join(token));
		if candidate.exists() {
			tracing::debug!(name, path = %candidate.display(), "resolved");
			return Ok(candidate);
		}
	}
	tracing::debug!(name, "not found in PATH");
	Err(ResolveError { name: name.to_string() })
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn absolute_path_bypasses_search() {
		let found = lookup("/bin/sh", Some(OsStr::new("")), Path::new("/")).unwrap();
		assert_eq!(found, PathBuf::from("/bin/sh"));
	}

	#[test]
	fn first_matching_directory_wins() {
		let first = tempfile::tempdir().unwrap();
		let second = tempfile::tempdir().unwrap();
		fs::write(first.path().join("tool"), b"").unwrap();
		fs::write(second.path().join("tool"), b"").unwrap();
		let path = std::env::join_paths(&[first.path(), second.path()]).unwrap();

		let found = lookup("tool", Some(path.as_os_str()), Path::new("/")).unwrap();
		assert_eq!(found, first.path().join("tool"));
		assert_eq!(lookup("tool", Some(path.as_os_str()), Path::new("/")).unwrap(), found);
	}

	#[test]
	fn later_directory_is_searched() {
		let empty = tempfile::tempdir().unwrap();
		let bin = tempfile::tempdir().unwrap();
		fs::write(bin.path().join("only-here"), b"").unwrap();
		let path = std::env::join_paths(&[empty.path(), bin.path()]).unwrap();

		assert_eq!(lookup("only-here", Some(path.as_os_str()), Path::new("/")).unwrap(), bin.path().join("only-here"));
	}

	#[test]
	fn reflects_filesystem_changes() {
		let bin = tempfile::tempdir().unwrap();
		let path = bin.path().as_os_str();
		assert!(lookup("appears-later", Some(path), Path::new("/")).is_err());
		fs::write(bin.path().join("appears-later"), b"").unwrap();
		assert!(lookup("appears-later", Some(path), Path::new("/")).is_ok());
	}

	#[test]
	fn unknown_command() {
		let err = lookup("zzzznotacommand", Some(OsStr::new("/bin:/usr/bin")), Path::new("/")).unwrap_err();
		assert_eq!(err.to_string(), "zzzznotacommand: command not found");
	}

	#[test]
	fn missing_absolute_path_is_not_found() {
		assert!(lookup("/no/such/program", Some(OsStr::new("/bin")), Path::new("/")).is_err());
		assert!(lookup("/no/such/program", None, Path::new("/")).is_err());
	}

	#[test]
	fn relative_entries_follow_the_given_directory() {
		let root = tempfile::tempdir().unwrap();
		fs::create_dir(root.path().join("bin")).unwrap();
		fs::write(root.path().join("bin").join("localtool"), b"").unwrap();
		fs::write(root.path().join("here"), b"").unwrap();

		let found = lookup("localtool", Some(OsStr::new("bin:/usr/bin")), root.path()).unwrap();
		assert_eq!(found, root.path().join("bin").join("localtool"));
		assert!(found.is_absolute());

		let found = lookup("here", Some(OsStr::new("")), root.path()).unwrap();
		assert_eq!(found, root.path().join("here"));

		let elsewhere = tempfile::tempdir().unwrap();
		assert!(lookup("localtool", Some(OsStr::new("bin")), elsewhere.path()).is_err());
	}
}

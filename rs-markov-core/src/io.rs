use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::{fs, io};

use tempfile::NamedTempFile;

/// Reads a whole file into memory.
pub(crate) fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
	fs::read(path)
}

/// Replaces `path` with `bytes` atomically.
///
/// - Creates the parent directory if needed
/// - Writes a temporary file next to the target, syncs it, then renames it
///   over the target, so readers see either the old or the new content
pub(crate) fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
	let path = path.as_ref();
	let parent = path
		.parent()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory"))?;
	fs::create_dir_all(parent)?;

	let mut temp_file = NamedTempFile::new_in(parent)?;
	temp_file.write_all(bytes)?;
	temp_file.as_file().sync_all()?;
	temp_file.persist(path).map_err(|e| e.error)?;
	Ok(())
}

/// Deletes a file, returning whether it existed.
pub(crate) fn remove_file<P: AsRef<Path>>(path: P) -> io::Result<bool> {
	match fs::remove_file(path) {
		Ok(()) => Ok(true),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
		Err(e) => Err(e),
	}
}

/// Lists the regular files of a directory, sorted by name.
///
/// - With `extension`, only matching files are kept and the extension is
///   stripped from the returned names
/// - A missing directory is an empty listing
/// - Hidden files (leftover temporary files included) are skipped
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: Option<&str>) -> io::Result<Vec<String>> {
	let entries = match fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(e) => return Err(e),
	};

	let mut files = Vec::new();
	for entry in entries {
		let path = entry?.path();
		if !path.is_file() {
			continue;
		}

		let name = match extension {
			Some(extension) if path.extension() == Some(OsStr::new(extension)) => path.file_stem(),
			Some(_) => None,
			None => path.file_name(),
		};
		if let Some(name) = name {
			let name = name.to_string_lossy();
			if !name.starts_with('.') {
				files.push(name.into_owned());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn write_atomic_creates_parents_and_replaces() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("a").join("b").join("file");

		write_atomic(&path, b"first").unwrap();
		write_atomic(&path, b"second").unwrap();

		assert_eq!(read_file(&path).unwrap(), b"second");
		assert_eq!(list_files(path.parent().unwrap(), None).unwrap(), vec!["file"]);
	}

	#[test]
	fn remove_file_reports_existence() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("x");
		write_atomic(&path, b"x").unwrap();

		assert!(remove_file(&path).unwrap());
		assert!(!remove_file(&path).unwrap());
	}

	#[test]
	fn list_files_filters_by_extension() {
		let dir = tempfile::tempdir().unwrap();
		for name in ["b.chain", "a.chain", "notes.txt", ".hidden.chain"] {
			fs::write(dir.path().join(name), b"").unwrap();
		}
		fs::create_dir(dir.path().join("sub.chain")).unwrap();

		assert_eq!(list_files(dir.path(), Some("chain")).unwrap(), vec!["a", "b"]);
		assert_eq!(list_files(dir.path(), None).unwrap(), vec!["a.chain", "b.chain", "notes.txt"]);
	}

	#[test]
	fn list_files_of_missing_directory_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		assert!(list_files(dir.path().join("missing"), None).unwrap().is_empty());
	}
}

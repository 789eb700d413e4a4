/*!
  Writes the output files of a run as a unit. Every artifact is first written to a sibling
  `.partial` file; only once all of them are on disk are they renamed over their destinations.
  If any step fails, whatever was already staged or published by this call is removed, so a
  failed run never leaves an image without its log or a dump without its trace.
*/

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

fn partial_path(path: &Path) -> PathBuf {
  let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
  name.push(".partial");
  path.with_file_name(name)
}

fn discard<'a>(paths: impl IntoIterator<Item = &'a Path>) {
  for path in paths {
    // Already failing; a leftover we cannot remove does not change the error we report.
    let _ = fs::remove_file(path);
  }
}

/// Writes every `(path, contents)` pair, or none of them.
pub fn write_all_or_nothing(artifacts: &[(&Path, &[u8])]) -> Result<(), Error> {
  let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(artifacts.len());

  for &(path, contents) in artifacts {
    let partial = partial_path(path);
    if let Err(e) = fs::write(&partial, contents) {
      discard(staged.iter().map(|(partial, _)| partial.as_path()));
      discard([partial.as_path()]);
      return Err(Error::io(path, e));
    }
    staged.push((partial, path));
  }

  for (idx, (partial, path)) in staged.iter().enumerate() {
    if let Err(e) = fs::rename(partial, path) {
      discard(staged[..idx].iter().map(|(_, published)| *published));
      discard(staged[idx..].iter().map(|(partial, _)| partial.as_path()));
      return Err(Error::io(*path, e));
    }
  }

  Ok(())
}

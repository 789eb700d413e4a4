use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::bytecode::AssemblyError;

/// Errors that abort an assembler or interpreter run before any artifact is written.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Assembly(#[from] AssemblyError),
  /// The requested dump window does not fit in memory.
  #[error("Error: Memory range [{start}, {end}) is out of bounds for memory of size {memory_size}.")]
  WindowOutOfBounds {
    start: usize,
    end: usize,
    memory_size: usize
  },
  #[error("Error: could not access '{}': {source}", .path.display())]
  Io {
    path: PathBuf,
    source: io::Error
  },
  #[error("Error: could not serialize log: {0}")]
  Yaml(#[from] serde_yaml::Error),
}

impl Error {
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Error {
    Error::Io { path: path.into(), source }
  }
}

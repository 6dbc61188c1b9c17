use std::{io, path::Path, str};

pub use pushback::*;

mod pushback;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    IoError(#[from] io::Error),

    #[error(transparent)]
    Utf8Error(#[from] str::Utf8Error),
}

/// Position of the reader in the underlying source.
///
/// Lines are 1-based; the column counts characters since the last `\n`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub const START: Location = Location { line: 1, column: 0 };
}

impl Default for Location {
    fn default() -> Self {
        Self::START
    }
}

impl From<[usize; 2]> for Location {
    fn from(value: [usize; 2]) -> Self {
        Self {
            line: value[0],
            column: value[1],
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Loads a whole document so it can be handed to a [`PushbackReader`].
pub async fn read_source<P: AsRef<Path>>(path: P) -> Result<String, SourceError> {
    let bytes = smol::fs::read(path).await?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => Err(err.utf8_error().into()),
    }
}

/// Error types for the storage side of the game.
///
/// Game rules never fail; only the score ledger touches the filesystem.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("failed to {operation} {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid player name '{name}': names may not contain commas or line breaks")]
    InvalidName { name: String },
}

pub type Result<T> = std::result::Result<T, Error>;

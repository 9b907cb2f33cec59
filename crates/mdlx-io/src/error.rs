use std::io;
use std::path::PathBuf;

use mdlx_core::MdlError;
use thiserror::Error;

/// Failures of the file layer. Converted to [`io::Error`] at the trait boundary.
#[derive(Error, Debug)]
pub enum MdlIoError {
    #[error("{}: {source}", .path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: MdlError,
    },
    #[error("writer already holds model '{0}'")]
    AlreadyAdded(String),
    #[error("no model added to writer")]
    NoModel,
}

impl From<MdlIoError> for io::Error {
    fn from(err: MdlIoError) -> Self {
        let kind = match err {
            MdlIoError::Codec { .. } => io::ErrorKind::InvalidData,
            MdlIoError::AlreadyAdded(_) | MdlIoError::NoModel => io::ErrorKind::InvalidInput,
        };
        io::Error::new(kind, err)
    }
}

//! Typed failures for reads whose absence is a normal condition.
use std::{io, path::PathBuf};

use thiserror::Error;

/// A sysfs value or helper reply could not be turned into a number.
///
/// Callers treat every variant as "nothing to report", which is distinct from
/// a successful read of zero.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} holds {value:?}, not a number")]
    Parse { path: PathBuf, value: String },
    #[error("helper produced no usable output")]
    NoOutput,
}

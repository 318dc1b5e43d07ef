// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Error type shared by the histogram engine, the dataset helpers and the
//! lane table.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed caller input: bin count, value range, radii, region
    /// corners, sample dimensionality or buffer length.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A region or index reaches past the extents of the thing it
    /// addresses.
    #[error("out of range: {what} {index:?} exceeds {limit:?}")]
    OutOfRange {
        what: &'static str,
        index: (usize, usize),
        limit: (usize, usize),
    },

    /// Loaded data does not satisfy the declared axis semantics.
    #[error("dataset constraint violated: {0}")]
    DatasetConstraint(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidArgument(msg.into())
}

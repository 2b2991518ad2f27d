// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for STEP parsing and document access.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading an IFC document.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Invalid IFC type: {0}")]
    InvalidIfcType(String),

    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    #[error("Document unreadable: {0}")]
    DocumentUnreadable(String),
}

impl Error {
    /// Build a parse error at a byte offset.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }

    /// Build a document-level failure.
    pub fn unreadable(message: impl Into<String>) -> Self {
        Error::DocumentUnreadable(message.into())
    }
}

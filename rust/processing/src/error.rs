// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fatal pipeline errors. Per-room gaps are not errors; they end up as
//! missing cells and are counted in the processing statistics.

use thiserror::Error;

/// Result alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a room book run.
#[derive(Debug, Error)]
pub enum Error {
    /// Allow-list unreadable or malformed. Raised before any room is processed.
    #[error("Allow-list error: {0}")]
    Config(String),

    /// The IFC document could not be opened.
    #[error("Document unreadable: {0}")]
    DocumentUnreadable(String),

    /// The report could not be serialized.
    #[error("Export error: {0}")]
    Export(String),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

impl From<raumbuch_core::Error> for Error {
    fn from(err: raumbuch_core::Error) -> Self {
        Error::DocumentUnreadable(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Error::Export(err.to_string())
    }
}

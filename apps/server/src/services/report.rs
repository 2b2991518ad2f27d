// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room book generation for uploaded models.
//!
//! Everything here is synchronous and CPU-bound; handlers call it from
//! `spawn_blocking`.

use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use raumbuch_processing::{
    export, process, report_file_name, success_message, AllowListIndex, AllowListTable,
    ProcessingStats,
};

use crate::error::ApiError;
use crate::services::cache::DiskCache;
use crate::types::{PreviewResponse, PreviewTable};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Raw multipart upload.
#[derive(Debug, Default)]
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
    /// Per-request allow-list: (file name, bytes)
    pub allow_list: Option<(String, Vec<u8>)>,
}

/// Decoded upload ready for the pipeline.
pub struct ReportJob {
    pub file_name: String,
    pub content: String,
    pub allow_list: Arc<AllowListIndex>,
    pub cache_key: String,
}

impl ReportJob {
    /// Decompress, size-check and decode the upload and pick the allow-list.
    pub fn prepare(
        upload: Upload,
        configured: &Arc<AllowListIndex>,
        max_bytes: usize,
    ) -> Result<Self, ApiError> {
        let max_mb = max_bytes / (1024 * 1024);
        let data = decompress_if_gzip(upload.data, max_bytes)?;
        if data.len() > max_bytes {
            return Err(ApiError::FileTooLarge { max_mb });
        }

        let allow_list = match upload.allow_list {
            Some((name, bytes)) => {
                let index = AllowListIndex::build(&AllowListTable::from_bytes(&bytes, &name)?)?;
                tracing::info!(file_name = %name, entries = index.len(), "Using uploaded allow-list");
                Arc::new(index)
            }
            None => Arc::clone(configured),
        };

        let cache_key = DiskCache::report_key(&data, &allow_list.fingerprint());
        let content = String::from_utf8(data)?;

        Ok(Self {
            file_name: upload.file_name,
            content,
            allow_list,
            cache_key,
        })
    }

    /// Key of the xlsx bytes
    pub fn export_key(&self) -> String {
        format!("{}.xlsx", self.cache_key)
    }

    /// Key of the stats stored next to the xlsx bytes
    pub fn export_stats_key(&self) -> String {
        format!("{}.stats", self.cache_key)
    }

    /// Key of the preview JSON
    pub fn preview_key(&self) -> String {
        format!("{}.preview", self.cache_key)
    }

    pub fn report_file_name(&self) -> String {
        report_file_name(&self.file_name)
    }

    /// Run the pipeline and build the preview.
    pub fn preview(&self) -> Result<PreviewResponse, ApiError> {
        let raumbuch = process(&self.content, &self.allow_list)?;
        Ok(PreviewResponse {
            file_name: self.file_name.clone(),
            report_file_name: self.report_file_name(),
            message: success_message(&self.file_name),
            cache_key: self.cache_key.clone(),
            table: PreviewTable::from_display(&raumbuch.display)?,
            stats: raumbuch.stats,
            from_cache: false,
        })
    }

    /// Run the pipeline and render the xlsx report.
    pub fn export(&self) -> Result<(Vec<u8>, ProcessingStats), ApiError> {
        let raumbuch = process(&self.content, &self.allow_list)?;
        let bytes = export::write_xlsx(&raumbuch.table)?;
        tracing::info!(
            file_name = %self.file_name,
            rows = raumbuch.table.len(),
            size = bytes.len(),
            "Rendered room book"
        );
        Ok((bytes, raumbuch.stats))
    }
}

/// Gzip uploads (magic `1f 8b`) are inflated; anything else passes through.
pub fn decompress_if_gzip(data: Vec<u8>, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    if !data.starts_with(&GZIP_MAGIC) {
        return Ok(data);
    }

    let mut out = Vec::with_capacity(inflate_capacity(data.len(), max_bytes));
    // One byte past the limit is enough to know it is too large
    let limit = max_bytes as u64 + 1;
    GzDecoder::new(data.as_slice())
        .take(limit)
        .read_to_end(&mut out)
        .map_err(|e| ApiError::DocumentUnreadable(format!("invalid gzip stream: {}", e)))?;

    tracing::debug!(
        compressed = data.len(),
        decompressed = out.len(),
        "Decompressed gzip upload"
    );

    if out.len() > max_bytes {
        return Err(ApiError::FileTooLarge {
            max_mb: max_bytes / (1024 * 1024),
        });
    }
    Ok(out)
}

/// Initial buffer size for inflating `compressed` bytes, never past the limit.
fn inflate_capacity(compressed: usize, max_bytes: usize) -> usize {
    compressed
        .saturating_mul(4)
        .min(max_bytes.saturating_add(1))
}

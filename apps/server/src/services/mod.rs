// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service modules for room book generation and caching.

pub mod cache;
pub mod report;

pub use cache::DiskCache;
pub use report::{ReportJob, Upload};

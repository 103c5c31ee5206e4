// SPDX-License-Identifier: Apache-2.0

//! Boundary to the bridge that executes remote queries.

use std::fmt;

use datafusion::arrow::record_batch::RecordBatch;

use crate::context::ScanContext;
use crate::error::JdbcResult;

/// Executes one remote query and yields its rows in batches.
///
/// A scanner is owned by exactly one scan session and is not reused after
/// [`RemoteScanner::close`].
pub trait RemoteScanner: Send {
    /// Connect to the remote source and start the query described by `context`.
    fn open(&mut self, context: &ScanContext) -> JdbcResult<()>;

    /// Fetch the next batch, or `None` once the result set is exhausted.
    ///
    /// A returned batch may have zero rows even if more data follows.
    fn fetch(&mut self) -> JdbcResult<Option<RecordBatch>>;

    /// Release the remote cursor and any bridge resources held by the scanner.
    fn close(&mut self) -> JdbcResult<()>;
}

/// Creates a fresh [`RemoteScanner`] for every scan session
pub trait RemoteScannerFactory: Send + Sync + fmt::Debug {
    fn create_scanner(&self) -> JdbcResult<Box<dyn RemoteScanner>>;
}

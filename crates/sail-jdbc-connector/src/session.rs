// SPDX-License-Identifier: Apache-2.0

//! Lifecycle of a single remote scan.
//!
//! ```text
//! Created --open--> Open --next_batch--> Reading --end of data--> Exhausted
//!    |                |                     |
//!    |                +------ error --------+------> Failed
//!    +------------------ close (from any state) ----> Closed
//! ```
//!
//! The session never hands out an empty batch. Zero-row batches produced by
//! the remote bridge are skipped until a batch with rows arrives or the
//! result set ends.

use std::sync::Arc;

use datafusion::arrow::record_batch::RecordBatch;
use log::{debug, error, trace, warn};

use crate::context::ScanContext;
use crate::descriptor::JdbcTableDescriptor;
use crate::driver::DriverResolver;
use crate::error::{JdbcError, JdbcResult};
use crate::query::build_query;
use crate::scanner::{RemoteScanner, RemoteScannerFactory};

/// What a single session reads from the remote table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub table: String,
    pub columns: Vec<String>,
    pub filters: Vec<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Created,
    Open,
    Reading,
    Exhausted,
    Closed,
    Failed,
}

/// Drives one remote scan from `open` to `close`.
pub struct ScanSession {
    table: Arc<JdbcTableDescriptor>,
    resolver: Arc<dyn DriverResolver>,
    factory: Arc<dyn RemoteScannerFactory>,
    scanner: Option<Box<dyn RemoteScanner>>,
    context: Option<ScanContext>,
    state: ScanState,
    rows_read: u64,
}

impl ScanSession {
    pub fn new(
        table: Arc<JdbcTableDescriptor>,
        resolver: Arc<dyn DriverResolver>,
        factory: Arc<dyn RemoteScannerFactory>,
    ) -> Self {
        Self {
            table,
            resolver,
            factory,
            scanner: None,
            context: None,
            state: ScanState::Created,
            rows_read: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The context of the remote query, available once the query was generated
    pub fn context(&self) -> Option<&ScanContext> {
        self.context.as_ref()
    }

    /// Number of rows in the batches returned so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Rows received from the remote source.
    /// Equal to [`Self::rows_read`] since no rows are filtered locally.
    pub fn raw_rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Rows handed to the caller
    pub fn num_rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Resolve the driver, generate the query, and open the remote scanner.
    ///
    /// Driver failures are returned as [`JdbcError::DriverResolution`], every
    /// other failure as [`JdbcError::ScanOpen`]. On failure the session is
    /// unusable but [`Self::close`] still releases whatever was acquired.
    pub fn open(&mut self, request: &ScanRequest) -> JdbcResult<()> {
        if self.state != ScanState::Created {
            return Err(JdbcError::state(format!(
                "cannot open a scan session in state {:?}",
                self.state
            )));
        }
        match self.try_open(request) {
            Ok(()) => {
                self.state = ScanState::Open;
                Ok(())
            }
            Err(e) => {
                self.state = ScanState::Failed;
                Err(e)
            }
        }
    }

    fn try_open(&mut self, request: &ScanRequest) -> JdbcResult<()> {
        let driver = self.resolver.resolve(&self.table.driver).inspect_err(|e| {
            error!("Get JDBC driver {} error: {}", self.table.driver.name, e);
        })?;
        let sql = build_query(
            &request.table,
            &request.columns,
            &request.filters,
            request.limit,
        )
        .map_err(|e| JdbcError::ScanOpen(e.to_string()))?;

        let connection = &self.table.connection;
        let context = ScanContext::new(
            driver.path,
            &self.table.driver.class_name,
            &connection.url,
            connection.user.clone(),
            connection.password.clone(),
            sql,
        );
        debug!("Opening JDBC scan on {}: {}", context.url(), context.sql());

        let mut scanner = self.factory.create_scanner().map_err(into_open_error)?;
        let result = scanner.open(&context);
        // Keep the scanner even if it failed to open, so `close` releases it.
        self.scanner = Some(scanner);
        self.context = Some(context);
        result.map_err(into_open_error)
    }

    /// Return the next non-empty batch, or `None` at the end of the data.
    ///
    /// Once the end was reached, further calls keep returning `None` and
    /// leave the row counter untouched.
    pub fn next_batch(&mut self) -> JdbcResult<Option<RecordBatch>> {
        match self.state {
            ScanState::Open | ScanState::Reading => {}
            ScanState::Exhausted => return Ok(None),
            ScanState::Failed => {
                return Err(JdbcError::ScanRead("scan session has failed".to_string()))
            }
            ScanState::Created => return Err(JdbcError::state("scan session is not open")),
            ScanState::Closed => return Err(JdbcError::state("scan session is closed")),
        }
        let Some(scanner) = self.scanner.as_mut() else {
            return Err(JdbcError::state("scan session has no scanner"));
        };
        loop {
            match scanner.fetch() {
                Ok(Some(batch)) if batch.num_rows() == 0 => {
                    trace!("Skipping empty JDBC batch");
                }
                Ok(Some(batch)) => {
                    self.rows_read += batch.num_rows() as u64;
                    self.state = ScanState::Reading;
                    return Ok(Some(batch));
                }
                Ok(None) => {
                    debug!("JDBC scan exhausted after {} rows", self.rows_read);
                    self.state = ScanState::Exhausted;
                    return Ok(None);
                }
                Err(e) => {
                    self.state = ScanState::Failed;
                    return Err(match e {
                        JdbcError::ScanRead(_) => e,
                        other => JdbcError::ScanRead(other.to_string()),
                    });
                }
            }
        }
    }

    /// Release the remote scanner. Safe to call repeatedly and in any state.
    pub fn close(&mut self) {
        if let Some(mut scanner) = self.scanner.take() {
            if let Err(e) = scanner.close() {
                warn!("Failed to close JDBC scanner: {e}");
            }
        }
        if self.state != ScanState::Closed {
            debug!("Closed JDBC scan after {} rows", self.rows_read);
            self.state = ScanState::Closed;
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn into_open_error(e: JdbcError) -> JdbcError {
    match e {
        JdbcError::ScanOpen(_) => e,
        other => JdbcError::ScanOpen(other.to_string()),
    }
}

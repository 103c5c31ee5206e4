// SPDX-License-Identifier: Apache-2.0

//! JDBC foreign-table scan connector for Lakesail.
//!
//! The connector reads rows from a remote relational source whose JDBC
//! driver is provisioned on demand. It owns the scan lifecycle and leaves the
//! execution of the remote query to a pluggable bridge.
//!
//! # Architecture
//!
//! ```text
//! JdbcTableProvider (TableProvider)
//!   ↓
//! JdbcScanExec (ExecutionPlan, one partition per scan range)
//!   ↓
//! JdbcDataSourceProvider → JdbcDataSource
//!   ↓
//! ScanSession ── DriverResolver (DriverArtifactCache)
//!   ↓
//! RemoteScanner (Python bridge, or any other transport)
//! ```
//!
//! A scan session resolves the driver artifact, generates the remote query,
//! and then yields non-empty Arrow record batches until the remote result set
//! is exhausted.

pub mod config;
pub mod context;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod exec;
pub mod options;
pub mod partition;
pub mod provider;
#[cfg(feature = "python")]
pub mod python;
pub mod query;
pub mod scanner;
pub mod session;
pub mod source;

// Re-exports
pub use config::JdbcConfig;
pub use context::ScanContext;
pub use descriptor::{JdbcConnection, JdbcScanNode, JdbcTableDescriptor};
pub use driver::{DriverArtifactCache, DriverDescriptor, DriverResolver, ResolvedDriver};
pub use error::{JdbcError, JdbcResult};
pub use provider::JdbcTableProvider;
pub use scanner::{RemoteScanner, RemoteScannerFactory};
pub use session::{ScanRequest, ScanSession, ScanState};
pub use source::{JdbcConnector, JdbcDataSource, JdbcDataSourceProvider};

// SPDX-License-Identifier: Apache-2.0

//! Factories binding table descriptors and scan ranges to scan sessions.

use std::sync::Arc;

use datafusion::arrow::record_batch::RecordBatch;

use crate::config::JdbcConfig;
use crate::descriptor::{JdbcScanNode, JdbcTableDescriptor};
use crate::driver::{DriverArtifactCache, DriverResolver};
use crate::error::JdbcResult;
use crate::partition::JdbcScanRange;
use crate::scanner::RemoteScannerFactory;
use crate::session::{ScanRequest, ScanSession, ScanState};

/// Entry point of the connector.
///
/// Holds the driver resolver shared by every scan it creates.
#[derive(Debug, Clone)]
pub struct JdbcConnector {
    resolver: Arc<dyn DriverResolver>,
    scanner_factory: Arc<dyn RemoteScannerFactory>,
}

impl JdbcConnector {
    pub fn new(
        resolver: Arc<dyn DriverResolver>,
        scanner_factory: Arc<dyn RemoteScannerFactory>,
    ) -> Self {
        Self {
            resolver,
            scanner_factory,
        }
    }

    /// Create a connector provisioning drivers through a [`DriverArtifactCache`]
    pub fn from_config(
        config: &JdbcConfig,
        scanner_factory: Arc<dyn RemoteScannerFactory>,
    ) -> JdbcResult<Self> {
        let cache = DriverArtifactCache::new(&config.driver_cache)?;
        Ok(Self::new(Arc::new(cache), scanner_factory))
    }

    /// Same as [`Self::from_config`] with the configuration from [`JdbcConfig::load`]
    pub fn try_from_env(scanner_factory: Arc<dyn RemoteScannerFactory>) -> JdbcResult<Self> {
        Self::from_config(&JdbcConfig::load()?, scanner_factory)
    }

    pub fn resolver(&self) -> &Arc<dyn DriverResolver> {
        &self.resolver
    }

    pub fn create_data_source_provider(
        &self,
        table: Arc<JdbcTableDescriptor>,
        scan_node: JdbcScanNode,
    ) -> JdbcDataSourceProvider {
        JdbcDataSourceProvider {
            table,
            scan_node,
            resolver: self.resolver.clone(),
            scanner_factory: self.scanner_factory.clone(),
        }
    }
}

/// Creates one data source per scan range of a planned scan
#[derive(Debug, Clone)]
pub struct JdbcDataSourceProvider {
    table: Arc<JdbcTableDescriptor>,
    scan_node: JdbcScanNode,
    resolver: Arc<dyn DriverResolver>,
    scanner_factory: Arc<dyn RemoteScannerFactory>,
}

impl JdbcDataSourceProvider {
    pub fn table(&self) -> &JdbcTableDescriptor {
        &self.table
    }

    pub fn scan_node(&self) -> &JdbcScanNode {
        &self.scan_node
    }

    pub fn create_data_source(&self, range: &JdbcScanRange) -> JdbcDataSource {
        let mut filters = self.scan_node.filters.clone();
        if let Some(predicate) = &range.predicate {
            filters.push(predicate.clone());
        }
        let request = ScanRequest {
            table: self.table.table.clone(),
            columns: self.scan_node.columns.clone(),
            filters,
            limit: self.scan_node.limit,
        };
        let session = ScanSession::new(
            self.table.clone(),
            self.resolver.clone(),
            self.scanner_factory.clone(),
        );
        JdbcDataSource {
            range: range.clone(),
            request,
            session,
        }
    }
}

/// Reads one scan range of a JDBC table
pub struct JdbcDataSource {
    range: JdbcScanRange,
    request: ScanRequest,
    session: ScanSession,
}

impl JdbcDataSource {
    pub fn range(&self) -> &JdbcScanRange {
        &self.range
    }

    pub fn request(&self) -> &ScanRequest {
        &self.request
    }

    pub fn state(&self) -> ScanState {
        self.session.state()
    }

    pub fn open(&mut self) -> JdbcResult<()> {
        self.session.open(&self.request)
    }

    pub fn next_batch(&mut self) -> JdbcResult<Option<RecordBatch>> {
        self.session.next_batch()
    }

    pub fn close(&mut self) {
        self.session.close()
    }

    pub fn rows_read(&self) -> u64 {
        self.session.rows_read()
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Table and scan descriptors handed to the connector by the catalog and the planner.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::driver::DriverDescriptor;

/// Connection settings of a remote JDBC source
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdbcConnection {
    /// JDBC URL (e.g., "jdbc:postgresql://localhost:5432/mydb")
    pub url: String,

    pub user: Option<String>,

    pub password: Option<String>,
}

impl fmt::Debug for JdbcConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JdbcConnection")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A foreign table backed by a JDBC source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdbcTableDescriptor {
    /// Table name in the remote dialect
    pub table: String,

    pub connection: JdbcConnection,

    pub driver: DriverDescriptor,
}

/// The part of a scan decided by the planner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdbcScanNode {
    /// Projected column names, in output order
    pub columns: Vec<String>,

    /// Predicate fragments rendered in the remote dialect
    pub filters: Vec<String>,

    /// Maximum number of rows to read per scan range
    pub limit: Option<u64>,
}

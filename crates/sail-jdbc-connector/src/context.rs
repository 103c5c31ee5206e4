// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::path::{Path, PathBuf};

/// Everything a remote scanner needs to run one query.
///
/// Built once when a scan session opens and never modified afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ScanContext {
    driver_path: PathBuf,
    driver_class: String,
    url: String,
    user: Option<String>,
    password: Option<String>,
    sql: String,
}

impl ScanContext {
    pub fn new(
        driver_path: PathBuf,
        driver_class: impl Into<String>,
        url: impl Into<String>,
        user: Option<String>,
        password: Option<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            driver_path,
            driver_class: driver_class.into(),
            url: url.into(),
            user,
            password,
            sql: sql.into(),
        }
    }

    /// Local path of the verified driver artifact
    pub fn driver_path(&self) -> &Path {
        &self.driver_path
    }

    /// Fully qualified driver class, e.g. `org.postgresql.Driver`
    pub fn driver_class(&self) -> &str {
        &self.driver_class
    }

    /// JDBC URL of the remote source
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Generated query to run on the remote source
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl fmt::Debug for ScanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanContext")
            .field("driver_path", &self.driver_path)
            .field("driver_class", &self.driver_class)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("sql", &self.sql)
            .finish()
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Remote scanner bridging to a Python JDBC reader via PyO3.
//!
//! The Python class is instantiated without arguments and must provide:
//! - `open(context: dict) -> Iterator[pa.RecordBatch]`
//! - `close()` (optional)
//!
//! The context dictionary carries `driver_path`, `driver_class`, `url`,
//! `user`, `password`, and `sql`.

use datafusion::arrow::pyarrow::FromPyArrow;
use datafusion::arrow::record_batch::RecordBatch;
use pyo3::exceptions::PyStopIteration;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::PythonBridgeConfig;
use crate::context::ScanContext;
use crate::error::{JdbcError, JdbcResult};
use crate::scanner::{RemoteScanner, RemoteScannerFactory};

/// Creates [`PythonRemoteScanner`]s for a configured Python class
#[derive(Debug, Clone)]
pub struct PythonScannerFactory {
    module: String,
    class: String,
}

impl PythonScannerFactory {
    pub fn new(config: &PythonBridgeConfig) -> Self {
        Self {
            module: config.module.clone(),
            class: config.class.clone(),
        }
    }
}

impl RemoteScannerFactory for PythonScannerFactory {
    fn create_scanner(&self) -> JdbcResult<Box<dyn RemoteScanner>> {
        Ok(Box::new(PythonRemoteScanner {
            module: self.module.clone(),
            class: self.class.clone(),
            scanner: None,
            batches: None,
        }))
    }
}

pub struct PythonRemoteScanner {
    module: String,
    class: String,
    scanner: Option<PyObject>,
    batches: Option<PyObject>,
}

impl RemoteScanner for PythonRemoteScanner {
    fn open(&mut self, context: &ScanContext) -> JdbcResult<()> {
        Python::with_gil(|py| {
            let module = PyModule::import(py, self.module.as_str())?;
            let scanner = module.getattr(self.class.as_str())?.call0()?;
            // Keep the instance first so `close` reaches it even if `open` raises.
            self.scanner = Some(scanner.clone().unbind());
            let batches = scanner.call_method1("open", (context_dict(py, context)?,))?;
            self.batches = Some(batches.unbind());
            Ok(())
        })
    }

    fn fetch(&mut self) -> JdbcResult<Option<RecordBatch>> {
        let Some(batches) = &self.batches else {
            return Err(JdbcError::state("Python scanner is not open"));
        };
        Python::with_gil(|py| match batches.bind(py).call_method0("__next__") {
            Ok(batch) => Ok(Some(RecordBatch::from_pyarrow_bound(&batch)?)),
            Err(e) if e.is_instance_of::<PyStopIteration>(py) => Ok(None),
            Err(e) => Err(JdbcError::ScanRead(e.to_string())),
        })
    }

    fn close(&mut self) -> JdbcResult<()> {
        let Some(scanner) = self.scanner.take() else {
            return Ok(());
        };
        Python::with_gil(|py| {
            self.batches = None;
            let scanner = scanner.bind(py);
            if scanner.hasattr("close")? {
                scanner.call_method0("close")?;
            }
            Ok(())
        })
    }
}

fn context_dict<'py>(py: Python<'py>, context: &ScanContext) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("driver_path", context.driver_path().to_string_lossy().as_ref())?;
    dict.set_item("driver_class", context.driver_class())?;
    dict.set_item("url", context.url())?;
    dict.set_item("user", context.user())?;
    dict.set_item("password", context.password())?;
    dict.set_item("sql", context.sql())?;
    Ok(dict)
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use datafusion::arrow::array::{Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use md5::{Digest, Md5};
use sail_jdbc_connector::{
    DriverDescriptor, DriverResolver, JdbcConnection, JdbcError, JdbcResult, JdbcTableDescriptor,
    RemoteScanner, RemoteScannerFactory, ResolvedDriver, ScanContext,
};

pub const CHECKSUM: &str = "0123456789abcdef0123456789abcdef";

pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

pub fn orders_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, true),
        Field::new("name", DataType::Utf8, true),
    ]))
}

/// Rows `start..end` of the orders table
pub fn orders(start: i64, end: i64) -> RecordBatch {
    let ids: Vec<i64> = (start..end).collect();
    let names: Vec<String> = ids.iter().map(|id| format!("order-{id}")).collect();
    RecordBatch::try_new(
        orders_schema(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(names)),
        ],
    )
    .unwrap()
}

pub fn ids(batches: &[RecordBatch]) -> Vec<i64> {
    let mut ids: Vec<i64> = batches
        .iter()
        .flat_map(|b| {
            let array = b.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
            (0..array.len()).map(|i| array.value(i)).collect::<Vec<_>>()
        })
        .collect();
    ids.sort();
    ids
}

pub fn table_descriptor(driver: DriverDescriptor) -> JdbcTableDescriptor {
    JdbcTableDescriptor {
        table: "public.orders".to_string(),
        connection: JdbcConnection {
            url: "jdbc:postgresql://localhost:5432/shop".to_string(),
            user: Some("reader".to_string()),
            password: Some("secret".to_string()),
        },
        driver,
    }
}

pub fn driver_descriptor(url: &str, checksum: &str) -> DriverDescriptor {
    DriverDescriptor {
        name: "postgresql".to_string(),
        url: url.to_string(),
        checksum: checksum.to_string(),
        class_name: "org.postgresql.Driver".to_string(),
    }
}

/// Resolver returning a fixed path, or failing every resolution
#[derive(Debug, Default)]
pub struct StaticResolver {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl DriverResolver for StaticResolver {
    fn resolve(&self, driver: &DriverDescriptor) -> JdbcResult<ResolvedDriver> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(JdbcError::driver(&driver.name, "artifact not reachable"));
        }
        Ok(ResolvedDriver {
            name: driver.name.clone(),
            checksum: driver.checksum.clone(),
            path: "/opt/jdbc/postgresql.jar".into(),
        })
    }
}

type Responder = dyn Fn(&str) -> JdbcResult<Vec<RecordBatch>> + Send + Sync;

/// Scanner factory answering every query with batches chosen by a responder.
/// The answer is projected to the columns of the query, and an empty batch
/// is placed before and after every batch.
pub struct InMemoryScannerFactory {
    responder: Arc<Responder>,
    pub contexts: Arc<Mutex<Vec<ScanContext>>>,
    pub closes: Arc<AtomicUsize>,
    pub fail_after: Option<usize>,
}

impl std::fmt::Debug for InMemoryScannerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryScannerFactory").finish()
    }
}

impl InMemoryScannerFactory {
    pub fn new(
        responder: impl Fn(&str) -> JdbcResult<Vec<RecordBatch>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Arc::new(responder),
            contexts: Arc::new(Mutex::new(vec![])),
            closes: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
        }
    }

    pub fn serving(batches: Vec<RecordBatch>) -> Self {
        Self::new(move |_| Ok(batches.clone()))
    }

    pub fn queries(&self) -> Vec<String> {
        let mut queries: Vec<String> = self
            .contexts
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.sql().to_string())
            .collect();
        queries.sort();
        queries
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl RemoteScannerFactory for InMemoryScannerFactory {
    fn create_scanner(&self) -> JdbcResult<Box<dyn RemoteScanner>> {
        Ok(Box::new(InMemoryScanner {
            factory_contexts: self.contexts.clone(),
            closes: self.closes.clone(),
            responder: self.responder.clone(),
            pending: VecDeque::new(),
            fail_after: self.fail_after,
            fetched: 0,
        }))
    }
}

struct InMemoryScanner {
    factory_contexts: Arc<Mutex<Vec<ScanContext>>>,
    closes: Arc<AtomicUsize>,
    responder: Arc<Responder>,
    pending: VecDeque<RecordBatch>,
    fail_after: Option<usize>,
    fetched: usize,
}

impl RemoteScanner for InMemoryScanner {
    fn open(&mut self, context: &ScanContext) -> JdbcResult<()> {
        self.factory_contexts.lock().unwrap().push(context.clone());
        let columns = projected_columns(context.sql());
        for batch in (self.responder)(context.sql())? {
            let indices = columns
                .iter()
                .map(|c| batch.schema().index_of(c))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| JdbcError::ScanOpen(e.to_string()))?;
            let projected = batch
                .project(&indices)
                .map_err(|e| JdbcError::ScanOpen(e.to_string()))?;
            self.pending.push_back(projected.slice(0, 0));
            self.pending.push_back(projected);
        }
        if let Some(last) = self.pending.back().cloned() {
            self.pending.push_back(last.slice(0, 0));
        }
        Ok(())
    }

    fn fetch(&mut self) -> JdbcResult<Option<RecordBatch>> {
        if self.fail_after == Some(self.fetched) {
            return Err(JdbcError::ScanRead("connection reset by peer".to_string()));
        }
        self.fetched += 1;
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) -> JdbcResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn projected_columns(sql: &str) -> Vec<String> {
    let start = "SELECT ".len();
    let end = sql.find(" FROM ").unwrap_or(sql.len());
    sql[start..end].split(", ").map(|s| s.to_string()).collect()
}

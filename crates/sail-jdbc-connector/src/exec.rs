// SPDX-License-Identifier: Apache-2.0

//! JDBC ExecutionPlan implementation for DataFusion.
//!
//! Every partition of the plan reads one scan range. The scan session is
//! blocking, so each partition drives its data source on a blocking task and
//! forwards the batches to the output stream.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::{RecordBatch, RecordBatchOptions};
use datafusion::common::{internal_err, DataFusionError, Result as DFResult};
use datafusion::execution::TaskContext;
use datafusion::physical_expr::EquivalenceProperties;
use datafusion::physical_plan::execution_plan::{Boundedness, EmissionType};
use datafusion::physical_plan::stream::RecordBatchReceiverStream;
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionPlan, Partitioning, PlanProperties,
    SendableRecordBatchStream,
};
use log::debug;
use tokio::sync::mpsc::Sender;

use crate::partition::JdbcScanRange;
use crate::source::{JdbcDataSource, JdbcDataSourceProvider};

/// Leaf plan reading a JDBC table, one partition per scan range
#[derive(Debug)]
pub struct JdbcScanExec {
    /// Output schema
    schema: SchemaRef,
    provider: JdbcDataSourceProvider,
    ranges: Vec<JdbcScanRange>,
    properties: PlanProperties,
}

impl JdbcScanExec {
    pub fn new(
        schema: SchemaRef,
        provider: JdbcDataSourceProvider,
        ranges: Vec<JdbcScanRange>,
    ) -> Self {
        let properties = PlanProperties::new(
            EquivalenceProperties::new(schema.clone()),
            Partitioning::UnknownPartitioning(ranges.len()),
            EmissionType::Incremental,
            Boundedness::Bounded,
        );
        Self {
            schema,
            provider,
            ranges,
            properties,
        }
    }

    pub fn provider(&self) -> &JdbcDataSourceProvider {
        &self.provider
    }

    pub fn ranges(&self) -> &[JdbcScanRange] {
        &self.ranges
    }
}

impl DisplayAs for JdbcScanExec {
    fn fmt_as(&self, _t: DisplayFormatType, f: &mut fmt::Formatter) -> fmt::Result {
        let node = self.provider.scan_node();
        write!(
            f,
            "JdbcScanExec: table={}, columns=[{}], ranges={}",
            self.provider.table().table,
            node.columns.join(", "),
            self.ranges.len()
        )?;
        if !node.filters.is_empty() {
            write!(f, ", filters=[{}]", node.filters.join(", "))?;
        }
        if let Some(limit) = node.limit {
            write!(f, ", limit={limit}")?;
        }
        Ok(())
    }
}

impl ExecutionPlan for JdbcScanExec {
    fn name(&self) -> &str {
        "JdbcScanExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn properties(&self) -> &PlanProperties {
        &self.properties
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        if !children.is_empty() {
            return internal_err!("JdbcScanExec should have no children");
        }
        Ok(self)
    }

    fn execute(
        &self,
        partition: usize,
        _context: Arc<TaskContext>,
    ) -> DFResult<SendableRecordBatchStream> {
        let range = self.ranges.get(partition).ok_or_else(|| {
            DataFusionError::Execution(format!("invalid partition index: {partition}"))
        })?;
        let mut source = self.provider.create_data_source(range);
        let schema = self.schema.clone();

        let mut builder = RecordBatchReceiverStream::builder(self.schema.clone(), 2);
        let tx = builder.tx();
        builder.spawn_blocking(move || {
            let result = read_range(&mut source, &schema, &tx);
            source.close();
            result
        });
        Ok(builder.build())
    }
}

fn read_range(
    source: &mut JdbcDataSource,
    schema: &SchemaRef,
    tx: &Sender<DFResult<RecordBatch>>,
) -> DFResult<()> {
    source.open()?;
    while let Some(batch) = source.next_batch()? {
        let batch = align_batch(schema, batch)?;
        if tx.blocking_send(Ok(batch)).is_err() {
            // the consumer is gone
            break;
        }
    }
    debug!(
        "JDBC scan range {} read {} rows",
        source.range().index,
        source.rows_read()
    );
    Ok(())
}

/// Attach the output schema to a batch produced by the remote scanner
fn align_batch(schema: &SchemaRef, batch: RecordBatch) -> DFResult<RecordBatch> {
    if schema.fields().is_empty() {
        let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        return Ok(RecordBatch::try_new_with_options(
            schema.clone(),
            vec![],
            &options,
        )?);
    }
    Ok(RecordBatch::try_new(schema.clone(), batch.columns().to_vec())?)
}

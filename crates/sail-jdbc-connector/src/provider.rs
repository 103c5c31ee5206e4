// SPDX-License-Identifier: Apache-2.0

//! JDBC TableProvider implementation for DataFusion.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::catalog::{Session, TableProvider};
use datafusion::common::tree_node::{Transformed, TreeNode};
use datafusion::common::{plan_err, Column, Result as DFResult};
use datafusion::logical_expr::{Expr, Operator, TableProviderFilterPushDown, TableType};
use datafusion::physical_plan::ExecutionPlan;
use datafusion::sql::unparser::expr_to_sql;
use log::debug;

use crate::descriptor::{JdbcScanNode, JdbcTableDescriptor};
use crate::error::JdbcResult;
use crate::exec::JdbcScanExec;
use crate::options::JdbcOptions;
use crate::partition::{plan_scan_ranges, JdbcScanRange};
use crate::source::JdbcConnector;

/// A JDBC table with a known schema
#[derive(Debug)]
pub struct JdbcTableProvider {
    schema: SchemaRef,
    table: Arc<JdbcTableDescriptor>,
    ranges: Vec<JdbcScanRange>,
    connector: JdbcConnector,
}

impl JdbcTableProvider {
    pub fn new(
        connector: JdbcConnector,
        table: JdbcTableDescriptor,
        schema: SchemaRef,
        ranges: Vec<JdbcScanRange>,
    ) -> Self {
        let ranges = if ranges.is_empty() {
            vec![JdbcScanRange::full()]
        } else {
            ranges
        };
        Self {
            schema,
            table: Arc::new(table),
            ranges,
            connector,
        }
    }

    /// Create a provider from data source options
    pub fn try_new(
        connector: JdbcConnector,
        options: &JdbcOptions,
        schema: SchemaRef,
    ) -> JdbcResult<Self> {
        options.validate()?;
        Ok(Self::new(
            connector,
            options.to_table_descriptor(),
            schema,
            plan_scan_ranges(options),
        ))
    }

    pub fn table(&self) -> &JdbcTableDescriptor {
        &self.table
    }

    pub fn ranges(&self) -> &[JdbcScanRange] {
        &self.ranges
    }
}

#[async_trait]
impl TableProvider for JdbcTableProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    fn supports_filters_pushdown(
        &self,
        filters: &[&Expr],
    ) -> DFResult<Vec<TableProviderFilterPushDown>> {
        // Pushed filters only reduce the rows transferred; DataFusion still applies them.
        Ok(filters
            .iter()
            .map(|f| {
                if render_filter(f).is_some() {
                    TableProviderFilterPushDown::Inexact
                } else {
                    TableProviderFilterPushDown::Unsupported
                }
            })
            .collect())
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        filters: &[Expr],
        limit: Option<usize>,
    ) -> DFResult<Arc<dyn ExecutionPlan>> {
        let schema = if let Some(projection) = projection {
            Arc::new(self.schema.project(projection)?)
        } else {
            self.schema.clone()
        };

        let mut columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
        if columns.is_empty() {
            // Only the row count is needed, so any single column will do.
            let Some(field) = self.schema.fields().first() else {
                return plan_err!("JDBC table {} has no columns", self.table.table);
            };
            columns.push(field.name().clone());
        }
        let filters: Vec<String> = filters.iter().filter_map(render_filter).collect();
        debug!(
            "Planning JDBC scan of {} with columns {:?} and filters {:?}",
            self.table.table, columns, filters
        );

        let scan_node = JdbcScanNode {
            columns,
            filters,
            limit: limit.map(|n| n as u64),
        };
        let provider = self
            .connector
            .create_data_source_provider(self.table.clone(), scan_node);
        Ok(Arc::new(JdbcScanExec::new(
            schema,
            provider,
            self.ranges.clone(),
        )))
    }
}

/// Render a filter as a SQL fragment for the remote source.
/// Returns `None` for expressions that may not be understood remotely.
fn render_filter(expr: &Expr) -> Option<String> {
    if !is_portable(expr) {
        return None;
    }
    let expr = expr
        .clone()
        .transform(|e| match e {
            Expr::Column(c) => Ok(Transformed::yes(Expr::Column(Column::new_unqualified(
                c.name,
            )))),
            e => Ok(Transformed::no(e)),
        })
        .ok()?
        .data;
    expr_to_sql(&expr).ok().map(|sql| sql.to_string())
}

fn is_portable(expr: &Expr) -> bool {
    match expr {
        Expr::Column(_) | Expr::Literal(..) => true,
        Expr::BinaryExpr(binary) => {
            matches!(
                binary.op,
                Operator::Eq
                    | Operator::NotEq
                    | Operator::Lt
                    | Operator::LtEq
                    | Operator::Gt
                    | Operator::GtEq
                    | Operator::And
                    | Operator::Or
                    | Operator::Plus
                    | Operator::Minus
                    | Operator::Multiply
                    | Operator::Divide
            ) && is_portable(&binary.left)
                && is_portable(&binary.right)
        }
        Expr::Not(e) | Expr::IsNull(e) | Expr::IsNotNull(e) | Expr::Negative(e) => is_portable(e),
        Expr::Between(between) => {
            is_portable(&between.expr) && is_portable(&between.low) && is_portable(&between.high)
        }
        Expr::InList(in_list) => {
            is_portable(&in_list.expr) && in_list.list.iter().all(is_portable)
        }
        Expr::Like(like) => {
            !like.case_insensitive
                && like.escape_char.is_none()
                && is_portable(&like.expr)
                && is_portable(&like.pattern)
        }
        _ => false,
    }
}

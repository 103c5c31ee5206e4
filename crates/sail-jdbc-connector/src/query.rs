// SPDX-License-Identifier: Apache-2.0

//! SQL generation for remote JDBC scans.

use std::fmt::Write;

use crate::error::{JdbcError, JdbcResult};

/// Build the source-native query for a scan.
///
/// The output has the shape
/// `SELECT c1, c2 FROM table WHERE (f1) AND(f2) LIMIT n`, where the `WHERE`
/// clause is present only for non-empty `filters` and the `LIMIT` clause only
/// when `limit` is set. Every filter fragment is parenthesized on its own, so
/// a fragment containing `OR` keeps its grouping under the `AND` join.
///
/// No quoting or escaping is performed. The table name, the column names, and
/// the filter fragments are trusted strings produced by the planner in the
/// remote dialect; this function must never receive user input directly.
///
/// An empty column list is rejected since there is no projection to emit.
pub fn build_query(
    table: &str,
    columns: &[String],
    filters: &[String],
    limit: Option<u64>,
) -> JdbcResult<String> {
    if table.is_empty() {
        return Err(JdbcError::invalid("table name must not be empty"));
    }
    if columns.is_empty() {
        return Err(JdbcError::invalid(format!(
            "no projected columns for table {table}"
        )));
    }

    let mut sql = String::from("SELECT");
    for (i, column) in columns.iter().enumerate() {
        let sep = if i == 0 { " " } else { ", " };
        sql.push_str(sep);
        sql.push_str(column);
    }
    sql.push_str(" FROM ");
    sql.push_str(table);
    if !filters.is_empty() {
        sql.push_str(" WHERE ");
        for (i, filter) in filters.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND");
            }
            let _ = write!(sql, "({filter})");
        }
    }
    if let Some(limit) = limit {
        let _ = write!(sql, " LIMIT {limit}");
    }
    Ok(sql)
}

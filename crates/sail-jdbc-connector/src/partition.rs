// SPDX-License-Identifier: Apache-2.0

//! Scan range planning.
//!
//! Every range becomes one scan session whose query carries the range
//! predicate as an extra filter. Together the ranges of a plan cover every
//! row of the table exactly once, including rows whose partition column is
//! NULL or lies outside the configured bounds.

use serde::{Deserialize, Serialize};

use crate::options::JdbcOptions;

/// The slice of a remote table read by one scan session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JdbcScanRange {
    pub index: usize,

    /// Predicate fragment restricting the scan to this range
    pub predicate: Option<String>,
}

impl JdbcScanRange {
    /// A range covering the whole table
    pub fn full() -> Self {
        Self {
            index: 0,
            predicate: None,
        }
    }
}

/// How a table is split for parallel reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRangeStrategy<'a> {
    Full,
    /// One range per user-supplied predicate
    Predicates(&'a [String]),
    /// Integer column split into `count` strides between `lower` and `upper`
    Stride {
        column: &'a str,
        lower: i64,
        upper: i64,
        count: usize,
    },
}

impl<'a> ScanRangeStrategy<'a> {
    pub fn from_options(options: &'a JdbcOptions) -> Self {
        if !options.predicates.is_empty() {
            return Self::Predicates(&options.predicates);
        }
        match (
            options.partition_column.as_deref(),
            options.lower_bound,
            options.upper_bound,
        ) {
            (Some(column), Some(lower), Some(upper)) if options.num_partitions > 1 => {
                Self::Stride {
                    column,
                    lower,
                    upper,
                    count: options.num_partitions,
                }
            }
            _ => Self::Full,
        }
    }

    pub fn plan(&self) -> Vec<JdbcScanRange> {
        match self {
            Self::Full => vec![JdbcScanRange::full()],
            Self::Predicates(predicates) => predicates
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .enumerate()
                .map(|(index, p)| JdbcScanRange {
                    index,
                    predicate: Some(p.to_string()),
                })
                .collect(),
            Self::Stride {
                column,
                lower,
                upper,
                count,
            } => stride_ranges(column, *lower, *upper, *count),
        }
    }
}

/// Plan the scan ranges for parallel reads
pub fn plan_scan_ranges(options: &JdbcOptions) -> Vec<JdbcScanRange> {
    let ranges = ScanRangeStrategy::from_options(options).plan();
    if ranges.is_empty() {
        vec![JdbcScanRange::full()]
    } else {
        ranges
    }
}

/// The bounds only place the stride boundaries. The first range is open
/// below and also takes NULLs, the last range is open above.
fn stride_ranges(column: &str, lower: i64, upper: i64, count: usize) -> Vec<JdbcScanRange> {
    let span = i128::from(upper) - i128::from(lower);
    let count = (count as i128).min(span);
    if count <= 1 {
        return vec![JdbcScanRange::full()];
    }

    // each boundary lies within [lower, upper], so it fits in i64
    let boundaries: Vec<i128> = (1..count)
        .map(|i| i128::from(lower) + span * i / count)
        .collect();

    let last = boundaries.len();
    (0..=last)
        .map(|index| {
            let predicate = if index == 0 {
                format!("{column} < {} OR {column} IS NULL", boundaries[0])
            } else if index == last {
                format!("{column} >= {}", boundaries[last - 1])
            } else {
                format!(
                    "{column} >= {} AND {column} < {}",
                    boundaries[index - 1],
                    boundaries[index]
                )
            };
            JdbcScanRange {
                index,
                predicate: Some(predicate),
            }
        })
        .collect()
}

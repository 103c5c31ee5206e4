// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::descriptor::{JdbcConnection, JdbcTableDescriptor};
use crate::driver::DriverDescriptor;
use crate::error::{JdbcError, JdbcResult};

/// JDBC table options, as given to the data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JdbcOptions {
    /// JDBC URL (e.g., "jdbc:postgresql://localhost:5432/mydb")
    pub url: String,

    /// Remote table name
    pub dbtable: String,

    /// Database user
    pub user: Option<String>,

    /// Database password
    pub password: Option<String>,

    /// Logical driver name
    pub driver: String,

    /// Location of the driver artifact
    pub driver_url: String,

    /// MD5 checksum of the driver artifact
    pub driver_checksum: String,

    /// Driver class name
    pub driver_class: String,

    /// Partition column for parallel reads
    pub partition_column: Option<String>,

    /// Lower bound for partitioning
    pub lower_bound: Option<i64>,

    /// Upper bound for partitioning
    pub upper_bound: Option<i64>,

    /// Number of partitions
    pub num_partitions: usize,

    /// Explicit range predicates, one scan range each
    pub predicates: Vec<String>,
}

impl Default for JdbcOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            dbtable: String::new(),
            user: None,
            password: None,
            driver: String::new(),
            driver_url: String::new(),
            driver_checksum: String::new(),
            driver_class: String::new(),
            partition_column: None,
            lower_bound: None,
            upper_bound: None,
            num_partitions: 1,
            predicates: vec![],
        }
    }
}

impl JdbcOptions {
    /// Parse JDBC options from a hashmap. Keys are matched case-insensitively.
    pub fn from_hashmap(options: &HashMap<String, String>) -> JdbcResult<Self> {
        let options: HashMap<String, &String> = options
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        let required = |key: &str| -> JdbcResult<String> {
            options
                .get(key)
                .map(|v| v.to_string())
                .ok_or_else(|| JdbcError::options(format!("missing '{key}' option")))
        };
        let optional = |key: &str| options.get(key).map(|v| v.to_string());

        let mut jdbc_opts = Self {
            url: required("url")?,
            dbtable: required("dbtable")?,
            user: optional("user"),
            password: optional("password"),
            driver: required("driver")?,
            driver_url: required("driver_url")?,
            driver_checksum: required("driver_checksum")?,
            driver_class: required("driver_class")?,
            partition_column: optional("partitioncolumn"),
            lower_bound: parse_optional(&options, "lowerbound")?,
            upper_bound: parse_optional(&options, "upperbound")?,
            predicates: optional("predicates")
                .map(|p| split_predicates(&p))
                .unwrap_or_default(),
            ..Default::default()
        };
        if let Some(num_partitions) = parse_optional(&options, "numpartitions")? {
            jdbc_opts.num_partitions = num_partitions;
        }
        Ok(jdbc_opts)
    }

    /// Validate options
    pub fn validate(&self) -> JdbcResult<()> {
        for (key, value) in [
            ("url", &self.url),
            ("dbtable", &self.dbtable),
            ("driver", &self.driver),
            ("driver_url", &self.driver_url),
            ("driver_checksum", &self.driver_checksum),
            ("driver_class", &self.driver_class),
        ] {
            if value.is_empty() {
                return Err(JdbcError::options(format!("empty '{key}' option")));
            }
        }

        if self.num_partitions == 0 {
            return Err(JdbcError::options("numPartitions must be > 0"));
        }

        if self.partition_column.is_some()
            && (self.lower_bound.is_none() || self.upper_bound.is_none())
        {
            return Err(JdbcError::options(
                "partitionColumn requires lowerBound and upperBound",
            ));
        }

        if let (Some(lower), Some(upper)) = (self.lower_bound, self.upper_bound) {
            if lower > upper {
                return Err(JdbcError::options(format!(
                    "lowerBound ({lower}) must not exceed upperBound ({upper})"
                )));
            }
        }

        if self.partition_column.is_some() && !self.predicates.is_empty() {
            return Err(JdbcError::options(
                "cannot specify both partitionColumn and predicates",
            ));
        }

        Ok(())
    }

    pub fn to_table_descriptor(&self) -> JdbcTableDescriptor {
        JdbcTableDescriptor {
            table: self.dbtable.clone(),
            connection: JdbcConnection {
                url: self.url.clone(),
                user: self.user.clone(),
                password: self.password.clone(),
            },
            driver: DriverDescriptor {
                name: self.driver.clone(),
                url: self.driver_url.clone(),
                checksum: self.driver_checksum.clone(),
                class_name: self.driver_class.clone(),
            },
        }
    }
}

/// Split a `predicates` option on the commas that separate predicates.
/// Commas inside quotes or parentheses belong to the predicate.
fn split_predicates(value: &str) -> Vec<String> {
    let mut predicates = vec![];
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in value.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                predicates.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    predicates.push(current.trim().to_string());
    predicates.retain(|p| !p.is_empty());
    predicates
}

fn parse_optional<T: FromStr>(
    options: &HashMap<String, &String>,
    key: &str,
) -> JdbcResult<Option<T>> {
    options
        .get(key)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| JdbcError::options(format!("invalid {key}: {v}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_options() -> HashMap<String, String> {
        HashMap::from([
            ("url".to_string(), "jdbc:postgresql://localhost/db".to_string()),
            ("dbtable".to_string(), "public.orders".to_string()),
            ("user".to_string(), "admin".to_string()),
            ("password".to_string(), "secret".to_string()),
            ("driver".to_string(), "postgresql".to_string()),
            ("driver_url".to_string(), "https://repo.example.com/pg.jar".to_string()),
            ("driver_checksum".to_string(), "0123456789abcdef0123456789abcdef".to_string()),
            ("driver_class".to_string(), "org.postgresql.Driver".to_string()),
        ])
    }

    #[test]
    fn test_from_hashmap() {
        let mut options = base_options();
        options.insert("partitionColumn".to_string(), "id".to_string());
        options.insert("lowerBound".to_string(), "0".to_string());
        options.insert("upperBound".to_string(), "100".to_string());
        options.insert("numPartitions".to_string(), "4".to_string());

        let parsed = JdbcOptions::from_hashmap(&options).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.dbtable, "public.orders");
        assert_eq!(parsed.partition_column.as_deref(), Some("id"));
        assert_eq!(parsed.lower_bound, Some(0));
        assert_eq!(parsed.upper_bound, Some(100));
        assert_eq!(parsed.num_partitions, 4);

        let table = parsed.to_table_descriptor();
        assert_eq!(table.driver.class_name, "org.postgresql.Driver");
        assert_eq!(table.connection.user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_missing_required_option() {
        let mut options = base_options();
        options.remove("driver_checksum");
        let err = JdbcOptions::from_hashmap(&options).unwrap_err();
        assert!(err.to_string().contains("driver_checksum"));
    }

    #[test]
    fn test_invalid_number() {
        let mut options = base_options();
        options.insert("numpartitions".to_string(), "many".to_string());
        assert!(JdbcOptions::from_hashmap(&options).is_err());
    }

    #[test]
    fn test_validate() {
        let parsed = JdbcOptions::from_hashmap(&base_options()).unwrap();
        parsed.validate().unwrap();

        let no_bounds = JdbcOptions {
            partition_column: Some("id".to_string()),
            ..parsed.clone()
        };
        assert!(no_bounds.validate().is_err());

        let both = JdbcOptions {
            partition_column: Some("id".to_string()),
            lower_bound: Some(0),
            upper_bound: Some(10),
            predicates: vec!["id < 5".to_string()],
            ..parsed.clone()
        };
        assert!(both.validate().is_err());

        let inverted = JdbcOptions {
            partition_column: Some("id".to_string()),
            lower_bound: Some(10),
            upper_bound: Some(0),
            ..parsed.clone()
        };
        let err = inverted.validate().unwrap_err();
        assert!(err.to_string().contains("lowerBound"));

        let zero = JdbcOptions {
            num_partitions: 0,
            ..parsed
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_predicates_split_on_top_level_commas() {
        let mut options = base_options();
        options.insert(
            "predicates".to_string(),
            "region IN ('eu','us'), coalesce(tier, 'a,b') = 'x' ,, name = \"o,k\"".to_string(),
        );
        let parsed = JdbcOptions::from_hashmap(&options).unwrap();
        assert_eq!(
            parsed.predicates,
            vec![
                "region IN ('eu','us')".to_string(),
                "coalesce(tier, 'a,b') = 'x'".to_string(),
                "name = \"o,k\"".to_string(),
            ]
        );
        parsed.validate().unwrap();
    }

    #[test]
    fn test_connection_debug_redacts_password() {
        let table = JdbcOptions::from_hashmap(&base_options())
            .unwrap()
            .to_table_descriptor();
        assert!(!format!("{table:?}").contains("secret"));
    }
}

//! Remote `CREATE TABLE` parsing through a running server's `/v1/sql/parse`

use super::{Column, IndexKind, SemanticType};
use crate::{AdvisorError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParseResponse {
    Single(StatementNode),
    Many(Vec<StatementNode>),
}

#[derive(Debug, Deserialize)]
struct StatementNode {
    #[serde(rename = "CreateTable")]
    create_table: Option<CreateTableNode>,
}

#[derive(Debug, Deserialize)]
struct CreateTableNode {
    columns: Vec<ColumnNode>,
    #[serde(default)]
    constraints: Vec<ConstraintNode>,
}

#[derive(Debug, Deserialize)]
struct ColumnNode {
    column_def: ColumnDefNode,
}

#[derive(Debug, Deserialize)]
struct ColumnDefNode {
    name: IdentNode,
    data_type: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct IdentNode {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ConstraintNode {
    #[serde(rename = "PrimaryKey")]
    primary_key: Option<PrimaryKeyNode>,
    #[serde(rename = "TimeIndex")]
    time_index: Option<TimeIndexNode>,
}

#[derive(Debug, Deserialize)]
struct PrimaryKeyNode {
    columns: Vec<IdentNode>,
}

#[derive(Debug, Deserialize)]
struct TimeIndexNode {
    column: IdentNode,
}

/// `"Float64"` -> `float64`, `{"Timestamp": ...}` -> `timestamp`
fn data_type_name(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.to_lowercase(),
        serde_json::Value::Object(map) => map
            .keys()
            .next()
            .map(|k| k.to_lowercase())
            .unwrap_or_default(),
        other => other.to_string().to_lowercase(),
    }
}

/// Map a `/v1/sql/parse` response body to advisor columns
pub fn columns_from_response(body: &str) -> Result<Vec<Column>> {
    let response: ParseResponse = serde_json::from_str(body)?;
    let statement = match response {
        ParseResponse::Single(node) => node,
        ParseResponse::Many(nodes) => nodes
            .into_iter()
            .next()
            .ok_or_else(|| AdvisorError::SqlParse("Empty statement".into()))?,
    };
    let table = statement.create_table.ok_or_else(|| {
        AdvisorError::SqlParse("Only CREATE TABLE statements are supported".into())
    })?;

    let primary_keys: HashSet<&str> = table
        .constraints
        .iter()
        .filter_map(|c| c.primary_key.as_ref())
        .flat_map(|pk| pk.columns.iter().map(|c| c.value.as_str()))
        .collect();
    let time_index = table
        .constraints
        .iter()
        .find_map(|c| c.time_index.as_ref())
        .map(|t| t.column.value.as_str());

    Ok(table
        .columns
        .iter()
        .map(|col| {
            let name = col.column_def.name.value.clone();
            let is_time = time_index == Some(name.as_str());
            let is_primary = primary_keys.contains(name.as_str());

            let (semantic_type, index) = if is_time {
                (SemanticType::Timestamp, Some(IndexKind::Time))
            } else if is_primary {
                (SemanticType::Tag, Some(IndexKind::Primary))
            } else {
                (SemanticType::Field, None)
            };

            Column {
                data_type: data_type_name(&col.column_def.data_type),
                semantic_type,
                nullable: !is_time,
                index,
                cardinality: None,
                name,
            }
        })
        .collect())
}

/// Client for a server's SQL parse endpoint
#[derive(Debug, Clone)]
pub struct RemoteParser {
    client: reqwest::Client,
    addr: String,
}

impl RemoteParser {
    /// Create a parser for `host:port`
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, addr))
    }

    /// Reuse an existing HTTP client
    pub fn with_client(client: reqwest::Client, addr: impl Into<String>) -> Self {
        let addr = addr.into();
        let addr = addr
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();
        Self { client, addr }
    }

    /// Same client, different server
    pub fn at(&self, addr: impl Into<String>) -> Self {
        Self::with_client(self.client.clone(), addr)
    }

    /// Server address without scheme
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Parse a statement remotely. No retries.
    pub async fn parse(&self, sql: &str) -> Result<Vec<Column>> {
        info!("Parsing SQL via {}", self.addr);
        let response = self
            .client
            .get(self.url("/v1/sql/parse"))
            .query(&[("sql", sql)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AdvisorError::Remote(format!("HTTP {}: {}", status, body)));
        }

        columns_from_response(&body)
    }

    /// Check that the server answers its health endpoint
    pub async fn health(&self) -> Result<bool> {
        let response = self.client.get(self.url("/health")).send().await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "CreateTable": {
            "name": [{"value": "monitor"}],
            "columns": [
                {"column_def": {"name": {"value": "host"}, "data_type": "String"}},
                {"column_def": {"name": {"value": "ts"}, "data_type": {"Timestamp": [3, "None"]}}},
                {"column_def": {"name": {"value": "cpu"}, "data_type": "Float64"}}
            ],
            "constraints": [
                {"TimeIndex": {"column": {"value": "ts"}}},
                {"PrimaryKey": {"columns": [{"value": "host"}]}}
            ]
        }
    }"#;

    #[test]
    fn test_columns_from_response() {
        let columns = columns_from_response(RESPONSE).unwrap();
        assert_eq!(columns.len(), 3);

        assert_eq!(columns[0].data_type, "string");
        assert_eq!(columns[0].index, Some(IndexKind::Primary));
        assert_eq!(columns[0].semantic_type, SemanticType::Tag);

        assert_eq!(columns[1].data_type, "timestamp");
        assert_eq!(columns[1].index, Some(IndexKind::Time));
        assert!(!columns[1].nullable);

        assert_eq!(columns[2].semantic_type, SemanticType::Field);
        assert!(columns[2].nullable);
    }

    #[test]
    fn test_columns_from_array_response() {
        let body = format!("[{}]", RESPONSE);
        assert_eq!(columns_from_response(&body).unwrap().len(), 3);
    }

    #[test]
    fn test_non_create_table_response() {
        let err = columns_from_response(r#"{"Query": {}}"#).unwrap_err();
        assert!(matches!(err, AdvisorError::SqlParse(_)));

        assert!(matches!(
            columns_from_response("not json"),
            Err(AdvisorError::Json(_))
        ));
    }

    #[test]
    fn test_addr_normalization() {
        let parser = RemoteParser::new("http://localhost:4000/").unwrap();
        assert_eq!(parser.addr(), "localhost:4000");
        assert_eq!(parser.url("/health"), "http://localhost:4000/health");
        assert_eq!(parser.at("https://db:4000").addr(), "db:4000");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let parser = RemoteParser::new("127.0.0.1:1").unwrap();
        let err = parser.parse("CREATE TABLE t (a INT)").await.unwrap_err();
        assert!(err.is_remote());
    }
}

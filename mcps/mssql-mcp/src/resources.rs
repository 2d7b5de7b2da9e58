//! Tables as MCP resources
//!
//! Each base table is published as `mssql://<schema.table>/data`; reading the
//! resource returns the first rows of the table (the default read limit) as
//! JSON.

use mcp_common::{invalid_params, McpError, ResultExt};
use rmcp::model::{
    AnnotateAble, ListResourcesResult, RawResource, ReadResourceResult, Resource, ResourceContents,
};

use crate::dispatcher::Dispatcher;
use crate::types::{QueryResponse, TableIdentifier};

const SCHEME: &str = "mssql://";
const SUFFIX: &str = "/data";

/// `mssql://<table>/data`, with the table's display name percent-encoded
pub fn resource_uri(table: &TableIdentifier) -> String {
    format!("{}{}{}", SCHEME, urlencoding::encode(&table.to_string()), SUFFIX)
}

pub fn parse_resource_uri(uri: &str) -> Result<TableIdentifier, McpError> {
    let encoded = uri
        .strip_prefix(SCHEME)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
        .ok_or_else(|| invalid_params(format!("Unsupported resource URI: {}", uri)))?;

    let table = urlencoding::decode(encoded)
        .map_err(|e| invalid_params(format!("Invalid encoding in URI '{}': {}", uri, e)))?;

    table
        .parse()
        .map_err(|e| invalid_params(format!("Invalid table in URI '{}': {}", uri, e)))
}

fn table_resource(table: &TableIdentifier) -> Resource {
    let mut raw = RawResource::new(resource_uri(table), format!("Table: {}", table));
    raw.description = Some(format!("Data in table {}", table));
    raw.mime_type = Some("application/json".to_string());
    raw.no_annotation()
}

pub async fn list(dispatcher: &Dispatcher) -> Result<ListResourcesResult, McpError> {
    let tables = dispatcher.list_tables().await.to_mcp_err()?;
    let resources = tables.iter().map(table_resource).collect();
    Ok(ListResourcesResult::with_all_items(resources))
}

pub async fn read(dispatcher: &Dispatcher, uri: &str) -> Result<ReadResourceResult, McpError> {
    let table = parse_resource_uri(uri)?;
    let set = dispatcher.read_table(&table, None).await.to_mcp_err()?;

    let json = serde_json::to_string_pretty(&QueryResponse::from(set)).to_mcp_err()?;
    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(json, uri)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_round_trip() {
        let table = TableIdentifier::new(Some("sales"), "order.lines");
        let uri = resource_uri(&table);
        assert_eq!(uri, "mssql://sales.%5Border.lines%5D/data");
        assert_eq!(parse_resource_uri(&uri).unwrap(), table);
    }

    #[test]
    fn test_uri_encodes_reserved_characters() {
        let table = TableIdentifier::new(Some("dbo"), "Order Details?#50%");
        let uri = resource_uri(&table);

        let encoded = uri
            .strip_prefix("mssql://")
            .and_then(|rest| rest.strip_suffix("/data"))
            .unwrap();
        assert!(!encoded.contains([' ', '?', '#']));
        assert_eq!(encoded, "dbo.Order%20Details%3F%2350%25");
        assert_eq!(parse_resource_uri(&uri).unwrap(), table);
    }

    #[test]
    fn test_rejects_bad_percent_encoding() {
        assert!(parse_resource_uri("mssql://dbo.%FF%FE/data").is_err());
    }

    #[test]
    fn test_rejects_foreign_uri() {
        assert!(parse_resource_uri("file:///etc/passwd").is_err());
        assert!(parse_resource_uri("mssql://dbo.orders").is_err());
    }
}

//! REST transport for the sheets and drive APIs

use crate::transport::{Method, Transport};
use async_trait::async_trait;
use gridstore_common::{GridStoreConfig, GridStoreError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Query parameters forwarded from `params` when present
const QUERY_PARAMS: &[&str] = &[
    "includeGridData",
    "ranges",
    "valueInputOption",
    "insertDataOption",
    "valueRenderOption",
    "majorDimension",
    "fields",
];

/// HTTP verb of a prepared request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

/// A request ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub verb: Verb,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Transport that calls the REST endpoints with a bearer token
///
/// # Example
///
/// ```ignore
/// use gridstore_common::GridStoreConfig;
/// use gridstore_grid::{GridAdapter, HttpTransport};
/// use std::sync::Arc;
///
/// let config = GridStoreConfig::from_env()?;
/// let transport = HttpTransport::new(&config, token)?;
/// let adapter = GridAdapter::new(Arc::new(transport), &config);
/// ```
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

struct HttpTransportInner {
    client: reqwest::Client,
    sheets_base_url: String,
    drive_base_url: String,
    access_token: String,
}

impl HttpTransport {
    /// Create a transport; the access token is supplied by the caller
    pub fn new(config: &GridStoreConfig, access_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("gridstore/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| GridStoreError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(HttpTransportInner {
                client,
                sheets_base_url: config.sheets_base_url.trim_end_matches('/').to_string(),
                drive_base_url: config.drive_base_url.trim_end_matches('/').to_string(),
                access_token: access_token.into(),
            }),
        })
    }

    /// Map a method and its parameters onto a REST request
    pub fn prepare(&self, method: Method, params: &Value) -> Result<PreparedRequest> {
        let sheets = &self.inner.sheets_base_url;
        let (verb, url) = match method {
            Method::SpreadsheetsGet => (
                Verb::Get,
                format!("{}/spreadsheets/{}", sheets, path_param(params, "spreadsheetId")?),
            ),
            Method::ValuesGet => (
                Verb::Get,
                format!(
                    "{}/spreadsheets/{}/values/{}",
                    sheets,
                    path_param(params, "spreadsheetId")?,
                    path_param(params, "range")?
                ),
            ),
            Method::ValuesAppend => (
                Verb::Post,
                format!(
                    "{}/spreadsheets/{}/values/{}:append",
                    sheets,
                    path_param(params, "spreadsheetId")?,
                    path_param(params, "range")?
                ),
            ),
            Method::ValuesBatchUpdate => (
                Verb::Post,
                format!(
                    "{}/spreadsheets/{}/values:batchUpdate",
                    sheets,
                    path_param(params, "spreadsheetId")?
                ),
            ),
            Method::BatchUpdate => (
                Verb::Post,
                format!(
                    "{}/spreadsheets/{}:batchUpdate",
                    sheets,
                    path_param(params, "spreadsheetId")?
                ),
            ),
            Method::DriveFilesGet => (
                Verb::Get,
                format!(
                    "{}/files/{}",
                    self.inner.drive_base_url,
                    path_param(params, "fileId")?
                ),
            ),
        };

        let query = QUERY_PARAMS
            .iter()
            .filter_map(|key| params.get(*key).map(|v| (key.to_string(), query_value(v))))
            .collect();

        let body = match verb {
            Verb::Post => Some(params.get("resource").cloned().unwrap_or(Value::Object(
                serde_json::Map::new(),
            ))),
            Verb::Get => None,
        };

        Ok(PreparedRequest {
            verb,
            url,
            query,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: Method, params: Value) -> Result<Value> {
        let request = self.prepare(method, &params)?;
        debug!(method = %method, url = %request.url, "sending request");

        let builder = match request.verb {
            Verb::Get => self.inner.client.get(&request.url),
            Verb::Post => self.inner.client.post(&request.url),
        };
        let mut builder = builder
            .bearer_auth(&self.inner.access_token)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GridStoreError::Transport(format!("{}: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GridStoreError::Transport(format!(
                "{} returned {}: {}",
                method, status, text
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GridStoreError::Transport(format!("{}: invalid body: {}", method, e)))
    }
}

fn path_param(params: &Value, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(|v| urlencoding::encode(v).into_owned())
        .ok_or_else(|| GridStoreError::InvalidArgument(format!("missing parameter '{}'", key)))
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport() -> HttpTransport {
        let config = GridStoreConfig::new("sheet-1").sheets_base_url("https://example.test/v4/");
        HttpTransport::new(&config, "token").unwrap()
    }

    #[test]
    fn test_prepare_spreadsheets_get() {
        let request = transport()
            .prepare(
                Method::SpreadsheetsGet,
                &json!({ "spreadsheetId": "sheet-1", "includeGridData": true }),
            )
            .unwrap();
        assert_eq!(request.verb, Verb::Get);
        assert_eq!(request.url, "https://example.test/v4/spreadsheets/sheet-1");
        assert_eq!(
            request.query,
            vec![("includeGridData".to_string(), "true".to_string())]
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn test_prepare_append_encodes_range() {
        let request = transport()
            .prepare(
                Method::ValuesAppend,
                &json!({
                    "spreadsheetId": "sheet-1",
                    "range": "'My Data'!A1",
                    "valueInputOption": "RAW",
                    "resource": { "values": [["a"]] },
                }),
            )
            .unwrap();
        assert_eq!(request.verb, Verb::Post);
        assert_eq!(
            request.url,
            "https://example.test/v4/spreadsheets/sheet-1/values/%27My%20Data%27%21A1:append"
        );
        assert_eq!(request.body, Some(json!({ "values": [["a"]] })));
    }

    #[test]
    fn test_prepare_drive_files_get() {
        let request = transport()
            .prepare(Method::DriveFilesGet, &json!({ "fileId": "sheet-1", "fields": "id,name" }))
            .unwrap();
        assert_eq!(request.url, "https://www.googleapis.com/drive/v3/files/sheet-1");
        assert_eq!(request.query, vec![("fields".to_string(), "id,name".to_string())]);
    }

    #[test]
    fn test_prepare_missing_parameter() {
        let err = transport()
            .prepare(Method::ValuesGet, &json!({ "spreadsheetId": "sheet-1" }))
            .unwrap_err();
        assert!(matches!(err, GridStoreError::InvalidArgument(_)));
    }
}

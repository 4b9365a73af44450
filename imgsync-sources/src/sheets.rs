//! Google Sheets v4 client.
//!
//! One instance is bound to one spreadsheet. The declared inventory and the
//! release/report spreadsheet are usually different documents, so callers
//! build one client per id and share the [`TokenProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use imgsync_core::{DeclaredState, DeclaredStateSource, ReportSink, SourceError};

use crate::google_auth::TokenProvider;

pub const SHEETS_API: &str = "https://sheets.googleapis.com";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    api: Url,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("api", &self.api.as_str())
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    pub fn new(
        http: Client,
        spreadsheet_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, SourceError> {
        Self::with_api(http, SHEETS_API, spreadsheet_id, tokens)
    }

    /// Point the client at a different API root.
    pub fn with_api(
        http: Client,
        api: &str,
        spreadsheet_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, SourceError> {
        let api = Url::parse(api)
            .map_err(|e| SourceError::Invalid(format!("invalid API root {api}: {e}")))?;
        Ok(Self {
            http,
            api,
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// `<api>/v4/spreadsheets/<id><suffix>/<segments...>`, percent-encoding
    /// each segment.
    fn url(&self, suffix: &str, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.api.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                SourceError::Http(format!("API root {} cannot hold a path", self.api))
            })?;
            path.pop_if_empty()
                .push("v4")
                .push("spreadsheets")
                .push(&format!("{}{suffix}", self.spreadsheet_id));
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SourceError> {
        let token = self.tokens.token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SourceError::Http(format!("HTTP {status}: {}", body.trim())))
    }

    /// Raw rows of one A1 range, every cell rendered as a string.
    pub async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError> {
        let url = self.url("", &["values", range])?;
        let body: ValueRange = self
            .send(self.http.get(url))
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".into(),
        Value::Bool(false) => "FALSE".into(),
        other => other.to_string(),
    }
}

/// Quote a tab title for use in an A1 range.
pub fn a1_tab(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[async_trait]
impl DeclaredStateSource for SheetsClient {
    async fn fetch_declared(&self, ranges: &[String]) -> Result<DeclaredState, SourceError> {
        let mut state = DeclaredState::default();
        for range in ranges {
            let rows = self.read_range(range).await.map_err(|e| {
                tracing::error!(
                    spreadsheet = %self.spreadsheet_id,
                    %range,
                    error = %e,
                    "range read failed"
                );
                SourceError::Unavailable {
                    range: range.clone(),
                    reason: e.to_string(),
                }
            })?;
            if rows.is_empty() {
                tracing::warn!(spreadsheet = %self.spreadsheet_id, %range, "no data found");
                continue;
            }
            let part = DeclaredState::from_rows(&rows);
            tracing::info!(
                %range,
                rows = rows.len(),
                include = part.include.len(),
                exclude = part.exclude.len(),
                "range read",
            );
            state.extend(part);
        }
        Ok(state)
    }
}

#[async_trait]
impl ReportSink for SheetsClient {
    async fn create_tab(&self, title: &str) -> Result<(), SourceError> {
        let url = self.url(":batchUpdate", &[])?;
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        self.send(self.http.post(url).json(&body)).await?;
        tracing::info!(spreadsheet = %self.spreadsheet_id, tab = %title, "tab created");
        Ok(())
    }

    async fn write_rows(&self, tab: &str, rows: Vec<Vec<String>>) -> Result<(), SourceError> {
        let range = format!("{}!A1", a1_tab(tab));
        let mut url = self.url("", &["values", &range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let count = rows.len();
        let body = json!({ "range": range, "majorDimension": "ROWS", "values": rows });
        self.send(self.http.put(url).json(&body)).await?;
        tracing::info!(
            spreadsheet = %self.spreadsheet_id,
            tab = %tab,
            rows = count,
            "rows written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_auth::StaticToken;

    fn client(api: &str) -> SheetsClient {
        SheetsClient::with_api(Client::new(), api, "sheet-id", Arc::new(StaticToken("t".into())))
            .expect("client")
    }

    #[test]
    fn range_is_a_single_encoded_segment() {
        let url = client("http://127.0.0.1:9").url("", &["values", "CK1!C2:D"]).expect("url");
        assert_eq!(url.path(), "/v4/spreadsheets/sheet-id/values/CK1!C2:D");

        let url = client("http://127.0.0.1:9/").url("", &["values", "'a b'!A1"]).expect("url");
        assert_eq!(url.path(), "/v4/spreadsheets/sheet-id/values/'a%20b'!A1");
    }

    #[test]
    fn batch_update_suffix() {
        let url = client("http://127.0.0.1:9").url(":batchUpdate", &[]).expect("url");
        assert_eq!(url.path(), "/v4/spreadsheets/sheet-id:batchUpdate");
    }

    #[test]
    fn cells_render_as_text() {
        assert_eq!(cell_text(json!("app:1")), "app:1");
        assert_eq!(cell_text(json!(false)), "FALSE");
        assert_eq!(cell_text(json!(3)), "3");
        assert_eq!(a1_tab("it's"), "'it''s'");
    }
}

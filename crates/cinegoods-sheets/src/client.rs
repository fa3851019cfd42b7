//! Sheets v4 values API: header contract and row append.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

use crate::auth::TokenProvider;
use crate::error::SheetsError;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/";

/// One row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    cells: HashMap<String, String>,
}

impl SheetRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.cells.insert(column.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

/// Cell values in `header` order; columns the row does not have are blank.
#[must_use]
pub fn order_by_header(header: &[String], row: &SheetRow) -> Vec<String> {
    header
        .iter()
        .map(|column| row.get(column).unwrap_or_default().to_string())
        .collect()
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Client for one spreadsheet's first worksheet.
pub struct SheetsClient {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenProvider>,
    worksheet: OnceCell<String>,
}

impl SheetsClient {
    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the HTTP client cannot be built.
    pub fn new(spreadsheet_id: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self, SheetsError> {
        Self::with_base_url(spreadsheet_id, tokens, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the HTTP client cannot be built, or
    /// [`SheetsError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        spreadsheet_id: &str,
        tokens: Arc<dyn TokenProvider>,
        base_url: &str,
    ) -> Result<Self, SheetsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| SheetsError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            client,
            base_url,
            spreadsheet_id: spreadsheet_id.to_string(),
            tokens,
            worksheet: OnceCell::new(),
        })
    }

    /// Returns the header row, writing `columns` first if row 1 is empty.
    ///
    /// An existing header is never rewritten, even if it differs.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError`] on auth, transport, or API failure.
    pub async fn ensure_header(&self, columns: &[&str]) -> Result<Vec<String>, SheetsError> {
        let title = self.worksheet_title().await?;
        let range = encode_range(&format!("{}!1:1", quote_title(title)));
        let req = self.client.get(self.values_url(&range));
        let existing: ValueRange = self.send_json(req).await?;

        if let Some(header) = existing.values.into_iter().next().filter(|r| !r.is_empty()) {
            return Ok(header);
        }

        let start = encode_range(&format!("{}!A1", quote_title(title)));
        let req = self
            .client
            .put(self.values_url(&start))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [columns] }));
        let _: serde_json::Value = self.send_json(req).await?;
        tracing::info!(worksheet = %title, "initialized sheet header row");
        Ok(columns.iter().map(|c| (*c).to_string()).collect())
    }

    /// Appends `row` below the existing data, ordered by the sheet's header.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError`] on auth, transport, or API failure.
    pub async fn append_row(&self, columns: &[&str], row: &SheetRow) -> Result<(), SheetsError> {
        let header = self.ensure_header(columns).await?;
        let values = order_by_header(&header, row);
        let title = self.worksheet_title().await?;
        let range = encode_range(&format!("{}!A1", quote_title(title)));
        let req = self
            .client
            .post(format!("{}:append", self.values_url(&range)))
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [values] }));
        let _: serde_json::Value = self.send_json(req).await?;
        Ok(())
    }

    async fn worksheet_title(&self) -> Result<&String, SheetsError> {
        self.worksheet
            .get_or_try_init(|| async {
                let req = self
                    .client
                    .get(self.spreadsheet_url())
                    .query(&[("fields", "sheets.properties.title")]);
                let meta: SpreadsheetMeta = self.send_json(req).await?;
                meta.sheets
                    .into_iter()
                    .next()
                    .map(|s| s.properties.title)
                    .ok_or(SheetsError::NoWorksheet)
            })
            .await
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}v4/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, encoded_range: &str) -> String {
        format!("{}/values/{encoded_range}", self.spreadsheet_url())
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, SheetsError> {
        let token = self.tokens.access_token().await?;
        let resp = req.bearer_auth(token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }
}

/// A1-notation sheet name, quoted so titles with spaces or symbols work.
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn encode_range(range: &str) -> String {
    utf8_percent_encode(range, NON_ALPHANUMERIC).to_string()
}

//! Google Sheets (REST v4) worksheet store.
//!
//! Speaks the `spreadsheets` and `spreadsheets.values` endpoints with a
//! bearer token. Obtaining the token (service account, gcloud, ...) is left
//! to the caller: either a static token or a shell command that prints one.

use super::error::StoreError;
use super::models::{from_grid, header_for, to_grid, upsert_rows, Row, WriteMode};
use super::store::WorksheetStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Default Sheets API base URL.
pub const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Timeout for token_command execution.
const TOKEN_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the OAuth bearer token.
#[derive(Clone)]
pub enum TokenSource {
    /// Static access token.
    Static(String),
    /// Shell command that outputs a fresh access token
    /// (e.g. `gcloud auth print-access-token`).
    Command(String),
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("Static(<redacted>)"),
            TokenSource::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
        }
    }
}

impl TokenSource {
    async fn get_token(&self) -> Result<String, StoreError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Command(cmd) => {
                debug!(command = %cmd, "Fetching sheets token via command");

                let result = tokio::time::timeout(
                    TOKEN_COMMAND_TIMEOUT,
                    Command::new("sh").arg("-c").arg(cmd).output(),
                )
                .await;

                let output = match result {
                    Ok(Ok(output)) => output,
                    Ok(Err(e)) => {
                        warn!(command = %cmd, error = %e, "token_command failed to execute");
                        return Err(StoreError::Unavailable(format!(
                            "Failed to execute token_command: {}",
                            e
                        )));
                    }
                    Err(_) => {
                        warn!(command = %cmd, "token_command timed out");
                        return Err(StoreError::Unavailable(
                            "token_command timed out".to_string(),
                        ));
                    }
                };

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(StoreError::Unavailable(format!(
                        "token_command failed with status {}: {}",
                        output.status, stderr
                    )));
                }

                let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if token.is_empty() {
                    return Err(StoreError::Unavailable(
                        "token_command returned empty token".to_string(),
                    ));
                }
                Ok(token)
            }
        }
    }
}

/// Worksheet store backed by a Google spreadsheet.
pub struct GoogleSheetsStore {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    token_source: TokenSource,
    timeout: Duration,
}

impl GoogleSheetsStore {
    pub fn new(spreadsheet_id: impl Into<String>, token_source: TokenSource) -> Self {
        Self::with_base_url(SHEETS_API_BASE_URL, spreadsheet_id, token_source)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        token_source: TokenSource,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            token_source,
            timeout: Duration::from_secs(60),
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.token_source.get_token().await?;
        let response = request
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Unavailable("request timed out".to_string())
                } else {
                    StoreError::Unavailable(e.to_string())
                }
            })?;
        Ok(response)
    }

    /// Map a non-success response onto the store taxonomy.
    async fn check(response: Response, table: &str) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body, table))
    }

    async fn fetch_metadata(&self) -> Result<SpreadsheetMetadata, StoreError> {
        let request = self.client.get(self.spreadsheet_url()).query(&[(
            "fields",
            "sheets(properties(sheetId,title),protectedRanges(protectedRangeId))",
        )]);
        let response = Self::check(self.send(request).await?, "").await?;
        response
            .json::<SpreadsheetMetadata>()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to parse metadata: {}", e)))
    }

    async fn put_grid(&self, name: &str, grid: Vec<Vec<String>>) -> Result<(), StoreError> {
        let range = format!("'{}'!A1", name);
        let body = ValueRange {
            range: Some(range.clone()),
            major_dimension: Some("ROWS".to_string()),
            values: Some(
                grid.into_iter()
                    .map(|line| line.into_iter().map(serde_json::Value::String).collect())
                    .collect(),
            ),
        };
        let request = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        Self::check(self.send(request).await?, name).await?;
        Ok(())
    }

    /// Sheet id of `name`, creating the worksheet when it does not exist.
    async fn ensure_table(&self, name: &str) -> Result<i64, StoreError> {
        if let Some(sheet) = self.fetch_metadata().await?.sheet(name) {
            return Ok(sheet.properties.sheet_id);
        }
        self.create_table(name).await?;
        self.fetch_metadata()
            .await?
            .sheet(name)
            .map(|sheet| sheet.properties.sheet_id)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    /// Blank every cell outside the top-left `height` x `width` block, i.e.
    /// whatever a previous, larger write left behind.
    async fn clear_outside(
        &self,
        name: &str,
        sheet_id: i64,
        height: usize,
        width: usize,
    ) -> Result<(), StoreError> {
        let body = serde_json::json!({
            "requests": [
                { "updateCells": {
                    "range": { "sheetId": sheet_id, "startRowIndex": height },
                    "fields": "userEnteredValue"
                } },
                { "updateCells": {
                    "range": {
                        "sheetId": sheet_id,
                        "startRowIndex": 0,
                        "endRowIndex": height,
                        "startColumnIndex": width
                    },
                    "fields": "userEnteredValue"
                } }
            ]
        });
        let request = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .json(&body);
        Self::check(self.send(request).await?, name).await?;
        Ok(())
    }
}

#[async_trait]
impl WorksheetStore for GoogleSheetsStore {
    async fn read_table(&self, name: &str) -> Result<Vec<Row>, StoreError> {
        let range = format!("'{}'", name);
        let request = self
            .client
            .get(self.values_url(&range))
            .query(&[("majorDimension", "ROWS"), ("valueRenderOption", "FORMATTED_VALUE")]);
        let response = Self::check(self.send(request).await?, name).await?;
        let value_range: ValueRange = response
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to parse values: {}", e)))?;

        let grid = value_range
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|line| line.into_iter().map(cell_to_string).collect())
            .collect();

        let parsed = from_grid(grid);
        if parsed.ignored_cells > 0 {
            warn!(
                table = name,
                cells = parsed.ignored_cells,
                "Ignoring cells outside the header columns"
            );
        }
        debug!(table = name, rows = parsed.rows.len(), "Read worksheet");
        Ok(parsed.rows)
    }

    async fn write_table(
        &self,
        name: &str,
        columns: &[&str],
        rows: &[Row],
        mode: &WriteMode,
    ) -> Result<(), StoreError> {
        // One PUT over the existing cells, nothing cleared ahead of it: a
        // failed write leaves the previous contents in place.
        let (merged, sheet_id) = match mode {
            WriteMode::Replace => (rows.to_vec(), Some(self.ensure_table(name).await?)),
            WriteMode::Upsert { key_column } => {
                let existing = match self.read_table(name).await {
                    Ok(existing) => existing,
                    Err(StoreError::TableNotFound(_)) => {
                        self.create_table(name).await?;
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                };
                // Never shorter than what is already there
                (upsert_rows(existing, rows, key_column), None)
            }
        };

        let header = header_for(columns, &merged);
        let grid = to_grid(&header, &merged);
        let height = grid.len();
        self.put_grid(name, grid).await?;
        if let Some(sheet_id) = sheet_id {
            self.clear_outside(name, sheet_id, height, header.len()).await?;
        }
        info!(table = name, rows = merged.len(), "Wrote worksheet");
        Ok(())
    }

    async fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let metadata = self.fetch_metadata().await?;
        Ok(metadata.sheet(name).is_some())
    }

    async fn is_protected(&self, name: &str) -> Result<bool, StoreError> {
        let metadata = self.fetch_metadata().await?;
        let sheet = metadata
            .sheet(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        Ok(!sheet.protected_ranges.is_empty())
    }

    async fn create_table(&self, name: &str) -> Result<(), StoreError> {
        let body = serde_json::json!({
            "requests": [{ "addSheet": { "properties": { "title": name } } }]
        });
        let request = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .json(&body);
        match Self::check(self.send(request).await?, name).await {
            Ok(_) => {
                info!(table = name, "Created worksheet");
                Ok(())
            }
            // addSheet on an existing title is a 400 "already exists"
            Err(StoreError::MalformedTable { reason, .. }) if reason.contains("already exists") => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn clear_table(&self, name: &str) -> Result<(), StoreError> {
        let range = format!("'{}'", name);
        let request = self
            .client
            .post(format!("{}:clear", self.values_url(&range)))
            .json(&serde_json::json!({}));
        Self::check(self.send(request).await?, name).await?;
        Ok(())
    }
}

/// Translate an HTTP failure into the store error taxonomy.
fn classify_failure(status: StatusCode, body: &str, table: &str) -> StoreError {
    match status.as_u16() {
        404 => StoreError::TableNotFound(table.to_string()),
        400 if body.contains("Unable to parse range") => StoreError::TableNotFound(table.to_string()),
        400 if body.contains("protected") => {
            StoreError::ProtectedTableWriteRejected(table.to_string())
        }
        400 => StoreError::MalformedTable {
            table: table.to_string(),
            reason: body.to_string(),
        },
        // 401/403/408/429/5xx: auth and transport trouble, retried by the caller
        _ => StoreError::Unavailable(format!("HTTP {}: {}", status.as_u16(), body)),
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// Sheets API types

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetMetadata>,
}

impl SpreadsheetMetadata {
    fn sheet(&self, title: &str) -> Option<&SheetMetadata> {
        self.sheets.iter().find(|s| s.properties.title == title)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetMetadata {
    properties: SheetProperties,
    #[serde(default)]
    protected_ranges: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry_policy::RetryPolicy;
    use crate::worksheet::RetryingStore;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const SPREADSHEET: &str = "sheet-1";

    /// In-process stand-in for the Sheets API, holding one grid per worksheet.
    #[derive(Default)]
    struct FakeSheets {
        sheets: Vec<(i64, String, Vec<Vec<String>>)>,
        failing_puts: usize,
        requests: Vec<String>,
    }

    impl FakeSheets {
        fn with_sheet(mut self, title: &str, grid: &[&[&str]]) -> Self {
            let id = self.sheets.len() as i64;
            let grid = grid
                .iter()
                .map(|line| line.iter().map(|c| c.to_string()).collect())
                .collect();
            self.sheets.push((id, title.to_string(), grid));
            self
        }

        fn grid(&self, title: &str) -> Option<&Vec<Vec<String>>> {
            self.sheets
                .iter()
                .find(|(_, t, _)| t == title)
                .map(|(_, _, grid)| grid)
        }

        fn grid_mut(&mut self, title: &str) -> Option<&mut Vec<Vec<String>>> {
            self.sheets
                .iter_mut()
                .find(|(_, t, _)| t == title)
                .map(|(_, _, grid)| grid)
        }

        fn handle(&mut self, method: &str, path: &str, body: &str) -> (u16, String) {
            let path = urlencoding::decode(path.split('?').next().unwrap())
                .unwrap()
                .into_owned();
            self.requests.push(format!("{} {}", method, path));
            let root = format!("/spreadsheets/{}", SPREADSHEET);

            if method == "GET" && path == root {
                let sheets: Vec<Value> = self
                    .sheets
                    .iter()
                    .map(|(id, title, _)| json!({"properties": {"sheetId": id, "title": title}}))
                    .collect();
                return (200, json!({ "sheets": sheets }).to_string());
            }
            if method == "POST" && path == format!("{}:batchUpdate", root) {
                let body: Value = serde_json::from_str(body).unwrap();
                for request in body["requests"].as_array().unwrap() {
                    if let Some(title) = request["addSheet"]["properties"]["title"].as_str() {
                        if self.grid(title).is_some() {
                            return (400, "A sheet with this name already exists".into());
                        }
                        let id = self.sheets.len() as i64;
                        self.sheets.push((id, title.to_string(), Vec::new()));
                    }
                    if let Some(range) = request["updateCells"]["range"].as_object() {
                        let id = range["sheetId"].as_i64().unwrap();
                        let index = |key: &str| range.get(key).and_then(Value::as_u64);
                        let rows = index("startRowIndex").unwrap_or(0) as usize
                            ..index("endRowIndex").map_or(usize::MAX, |v| v as usize);
                        let columns = index("startColumnIndex").unwrap_or(0) as usize
                            ..index("endColumnIndex").map_or(usize::MAX, |v| v as usize);
                        let grid = &mut self.sheets.iter_mut().find(|s| s.0 == id).unwrap().2;
                        for (r, line) in grid.iter_mut().enumerate() {
                            for (c, cell) in line.iter_mut().enumerate() {
                                if rows.contains(&r) && columns.contains(&c) {
                                    cell.clear();
                                }
                            }
                        }
                        trim(grid);
                    }
                }
                return (200, "{}".into());
            }

            let Some(range) = path.strip_prefix(&format!("{}/values/", root)) else {
                return (404, "{}".into());
            };
            let title = range.split('\'').nth(1).unwrap_or_default().to_string();
            if self.grid(&title).is_none() {
                return (400, format!("Unable to parse range: {}", range));
            }
            match method {
                "GET" => (200, json!({ "values": self.grid(&title) }).to_string()),
                "POST" if range.ends_with(":clear") => {
                    self.grid_mut(&title).unwrap().clear();
                    (200, "{}".into())
                }
                "PUT" if self.failing_puts > 0 => {
                    self.failing_puts -= 1;
                    (503, "backend error".into())
                }
                "PUT" => {
                    let body: Value = serde_json::from_str(body).unwrap();
                    let grid = self.grid_mut(&title).unwrap();
                    for (r, line) in body["values"].as_array().unwrap().iter().enumerate() {
                        if grid.len() <= r {
                            grid.resize(r + 1, Vec::new());
                        }
                        for (c, cell) in line.as_array().unwrap().iter().enumerate() {
                            if grid[r].len() <= c {
                                grid[r].resize(c + 1, String::new());
                            }
                            grid[r][c] = cell.as_str().unwrap().to_string();
                        }
                    }
                    trim(grid);
                    (200, "{}".into())
                }
                _ => (405, "{}".into()),
            }
        }
    }

    /// Drop trailing empty cells and lines, as the values API does on read.
    fn trim(grid: &mut Vec<Vec<String>>) {
        for line in grid.iter_mut() {
            while line.last().is_some_and(|c| c.is_empty()) {
                line.pop();
            }
        }
        while grid.last().is_some_and(|line| line.is_empty()) {
            grid.pop();
        }
    }

    async fn read_request(socket: &mut TcpStream) -> (String, String, String) {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        let text = String::from_utf8_lossy(&request).to_string();
        let (head, body) = text.split_once("\r\n\r\n").unwrap_or((text.as_str(), ""));
        let mut request_line = head.lines().next().unwrap_or_default().split(' ');
        let method = request_line.next().unwrap_or_default().to_string();
        let path = request_line.next().unwrap_or_default().to_string();
        (method, path, body.to_string())
    }

    async fn serve(fake: FakeSheets) -> (GoogleSheetsStore, Arc<Mutex<FakeSheets>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(fake));
        let server_state = state.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let (method, path, body) = read_request(&mut socket).await;
                let (status, reply) = server_state.lock().unwrap().handle(&method, &path, &body);
                let response = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    reply.len(),
                    reply
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
        });
        let store = GoogleSheetsStore::with_base_url(
            base_url,
            SPREADSHEET,
            TokenSource::Static("token".into()),
        );
        (store, state)
    }

    fn ledger() -> FakeSheets {
        FakeSheets::default().with_sheet(
            "processed",
            &[
                &["record_key", "status"],
                &["a", "Success"],
                &["b", "Success"],
                &["c", "Failed"],
            ],
        )
    }

    fn keys(rows: &[Row]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.get("record_key")).collect()
    }

    #[tokio::test]
    async fn test_upsert_retried_after_failed_write_keeps_ledger() {
        let (sheets, state) = serve(FakeSheets {
            failing_puts: 1,
            ..ledger()
        })
        .await;
        let store = RetryingStore::new(
            Arc::new(sheets),
            RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                backoff_multiplier: 2.0,
            },
        );
        let incoming = Row::new().with("record_key", "d").with("status", "Success");

        store
            .write_table(
                "processed",
                &["record_key", "status"],
                &[incoming],
                &WriteMode::upsert("record_key"),
            )
            .await
            .unwrap();

        let rows = store.read_table("processed").await.unwrap();
        assert_eq!(keys(&rows), vec!["a", "b", "c", "d"]);
        let fake = state.lock().unwrap();
        assert!(!fake.requests.iter().any(|r| r.contains(":clear")));
        assert_eq!(fake.requests.iter().filter(|r| r.starts_with("PUT")).count(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_table_intact() {
        let (store, state) = serve(FakeSheets {
            failing_puts: 1,
            ..ledger()
        })
        .await;

        let err = store
            .write_table(
                "processed",
                &["record_key", "status"],
                &[Row::new().with("record_key", "d")],
                &WriteMode::upsert("record_key"),
            )
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(
            state.lock().unwrap().grid("processed"),
            ledger().grid("processed")
        );
    }

    #[tokio::test]
    async fn test_replace_clears_previous_contents_outside_new_grid() {
        let (store, state) = serve(FakeSheets::default().with_sheet(
            "staging",
            &[
                &["a", "b", "old"],
                &["1", "2", "x"],
                &["3", "4", "y"],
                &["5", "6"],
            ],
        ))
        .await;

        store
            .write_table(
                "staging",
                &["a", "b"],
                &[Row::new().with("a", "7").with("b", "8")],
                &WriteMode::Replace,
            )
            .await
            .unwrap();

        assert_eq!(
            state.lock().unwrap().grid("staging").unwrap(),
            &vec![vec!["a", "b"], vec!["7", "8"]]
        );
        let rows = store.read_table("staging").await.unwrap();
        assert_eq!(rows, vec![Row::new().with("a", "7").with("b", "8")]);
    }

    #[tokio::test]
    async fn test_replace_creates_missing_table() {
        let (store, state) = serve(FakeSheets::default()).await;

        store
            .write_table(
                "staging",
                &["a"],
                &[Row::new().with("a", "1")],
                &WriteMode::Replace,
            )
            .await
            .unwrap();

        assert!(store.table_exists("staging").await.unwrap());
        assert_eq!(
            state.lock().unwrap().grid("staging").unwrap(),
            &vec![vec!["a"], vec!["1"]]
        );
    }

    #[tokio::test]
    async fn test_read_table_ignores_notes_past_header() {
        let (store, _) = serve(FakeSheets::default().with_sheet(
            "raw_data",
            &[
                &["Clothing ID", "Review Text"],
                &["1", "ok"],
                &["2", "fine", "note by a human"],
            ],
        ))
        .await;

        let rows = store.read_table("raw_data").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("Review Text"), Some("fine"));
        assert_eq!(rows[1].len(), 2);
    }

    #[tokio::test]
    async fn test_clear_table() {
        let (store, state) = serve(ledger()).await;

        store.clear_table("processed").await.unwrap();

        assert!(store.read_table("processed").await.unwrap().is_empty());
        assert!(state.lock().unwrap().grid("processed").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_table() {
        let (store, _) = serve(FakeSheets::default()).await;
        assert_eq!(
            store.read_table("raw_data").await,
            Err(StoreError::TableNotFound("raw_data".into()))
        );
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure(StatusCode::BAD_REQUEST, "Unable to parse range: 'x'", "x"),
            StoreError::TableNotFound("x".into())
        );
        assert!(matches!(
            classify_failure(StatusCode::SERVICE_UNAVAILABLE, "", "x"),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, "bad token", "x"),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "You are trying to edit a protected cell", "raw_data"),
            StoreError::ProtectedTableWriteRejected(_)
        ));
    }

    #[test]
    fn test_metadata_parsing() {
        let json = serde_json::json!({
            "sheets": [
                {
                    "properties": {"sheetId": 0, "title": "raw_data"},
                    "protectedRanges": [{"protectedRangeId": 7}]
                },
                {"properties": {"sheetId": 1, "title": "staging"}}
            ]
        });
        let metadata: SpreadsheetMetadata = serde_json::from_value(json).unwrap();

        assert!(!metadata.sheet("raw_data").unwrap().protected_ranges.is_empty());
        assert!(metadata.sheet("staging").unwrap().protected_ranges.is_empty());
        assert!(metadata.sheet("processed").is_none());
    }

    #[test]
    fn test_value_range_cells_become_strings() {
        let json = serde_json::json!({
            "range": "raw_data!A1:B2",
            "majorDimension": "ROWS",
            "values": [["Rating", "Title"], [5, "Great"]]
        });
        let value_range: ValueRange = serde_json::from_value(json).unwrap();
        let grid: Vec<Vec<String>> = value_range
            .values
            .unwrap()
            .into_iter()
            .map(|line| line.into_iter().map(cell_to_string).collect())
            .collect();

        assert_eq!(grid[1], vec!["5", "Great"]);
    }

    #[tokio::test]
    async fn test_static_token() {
        let source = TokenSource::Static("abc".into());
        assert_eq!(source.get_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_command_token_is_trimmed() {
        let source = TokenSource::Command("echo '  tok123  '".into());
        assert_eq!(source.get_token().await.unwrap(), "tok123");
    }

    #[tokio::test]
    async fn test_failing_command_is_unavailable() {
        let source = TokenSource::Command("exit 3".into());
        assert!(matches!(
            source.get_token().await,
            Err(StoreError::Unavailable(_))
        ));
    }
}

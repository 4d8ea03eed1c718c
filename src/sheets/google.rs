//! Google Sheets v4 backend.
//!
//! Spreadsheets are located by name through the Drive v3 files API, since
//! the Sheets API only addresses them by id. Credentials are loaded on first
//! use, so a missing key file surfaces as a `SheetAuth` failure of the write
//! step rather than at startup.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::auth::{AccessToken, ServiceAccountKey};
use super::{column_letters, out_of_bounds, quote_title, Anchor, Cell, SheetBackend, WorksheetRef};
use crate::config;
use crate::error::{Result, SyncError};

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const NEW_SHEET_ROWS: u32 = 1000;
const NEW_SHEET_COLS: u32 = 20;

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
}

/// Sheets REST client authenticated with a service-account key.
pub struct GoogleSheets {
    client: Client,
    sheets_api_base: String,
    drive_files_url: String,
    credentials_file: PathBuf,
    key: Option<ServiceAccountKey>,
    token: Option<AccessToken>,
    spreadsheet_ids: HashMap<String, String>,
    /// Keyed by (spreadsheet id, worksheet title).
    sheets: HashMap<(String, String), SheetProperties>,
}

impl GoogleSheets {
    pub fn new(credentials_file: PathBuf, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            sheets_api_base: config::SHEETS_API_BASE.to_string(),
            drive_files_url: config::DRIVE_FILES_URL.to_string(),
            credentials_file,
            key: None,
            token: None,
            spreadsheet_ids: HashMap::new(),
            sheets: HashMap::new(),
        })
    }

    /// Point the client at other Sheets and Drive endpoints.
    pub fn with_endpoints(mut self, sheets_api_base: &str, drive_files_url: &str) -> Self {
        self.sheets_api_base = sheets_api_base.to_string();
        self.drive_files_url = drive_files_url.to_string();
        self
    }

    /// Current access token, requesting a new one when absent or expiring.
    fn access_token(&mut self) -> Result<String> {
        if let Some(token) = self.token.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }
        if self.key.is_none() {
            self.key = Some(ServiceAccountKey::load(&self.credentials_file)?);
        }
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| SyncError::SheetAuth("no service-account key loaded".to_string()))?;
        let token = key.request_token(&self.client)?;
        let value = token.value.clone();
        self.token = Some(token);
        Ok(value)
    }

    fn send(&mut self, request: RequestBuilder, what: &str) -> Result<Response> {
        let token = self.access_token()?;
        let resp = request
            .bearer_auth(token)
            .send()
            .map_err(|e| SyncError::SheetAccess(format!("failed to {}: {}", what, e)))?;
        check_status(resp, what)
    }

    fn spreadsheet_id(&mut self, name: &str) -> Result<String> {
        if let Some(id) = self.spreadsheet_ids.get(name) {
            return Ok(id.clone());
        }

        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_query(name),
            SPREADSHEET_MIME
        );
        let request = self.client.get(&self.drive_files_url).query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name)"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ]);
        let what = format!("look up spreadsheet '{}'", name);
        let list: DriveFileList = decode(self.send(request, &what)?, &what)?;

        let file = list
            .files
            .into_iter()
            .find(|f| f.name == name)
            .ok_or_else(|| {
                SyncError::SheetAccess(format!(
                    "Spreadsheet '{}' not found. Check the name and that it is shared with the service account.",
                    name
                ))
            })?;
        self.spreadsheet_ids.insert(name.to_string(), file.id.clone());
        Ok(file.id)
    }

    fn load_sheets(&mut self, spreadsheet_id: &str) -> Result<Vec<SheetProperties>> {
        let url = api_url(&self.sheets_api_base, &[spreadsheet_id])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties(sheetId,title,gridProperties)")]);
        let what = "read spreadsheet metadata";
        let meta: SpreadsheetMeta = decode(self.send(request, what)?, what)?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    fn batch_update(&mut self, spreadsheet_id: &str, body: serde_json::Value, what: &str) -> Result<()> {
        let url = api_url(&self.sheets_api_base, &[&format!("{}:batchUpdate", spreadsheet_id)])?;
        let request = self.client.post(url).json(&body);
        self.send(request, what)?;
        Ok(())
    }

    fn add_worksheet(&mut self, spreadsheet_id: &str, title: &str) -> Result<()> {
        tracing::info!("Worksheet '{}' not found; creating it", title);
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": NEW_SHEET_COLS,
                        }
                    }
                }
            }]
        });
        self.batch_update(spreadsheet_id, body, &format!("create worksheet '{}'", title))
    }

    /// Grow the worksheet grid so `rows` x `cols` cells fit.
    fn ensure_grid(&mut self, ws: &WorksheetRef, rows: u32, cols: u32) -> Result<()> {
        let key = (ws.spreadsheet_id.clone(), ws.title.clone());
        let props = match self.sheets.get(&key) {
            Some(p) => p.clone(),
            None => return Ok(()),
        };
        let grid = props.grid_properties;
        if grid.row_count >= rows && grid.column_count >= cols {
            return Ok(());
        }

        let new_grid = GridProperties {
            row_count: grid.row_count.max(rows),
            column_count: grid.column_count.max(cols),
        };
        tracing::info!(
            "Resizing '{}' to {} rows x {} columns",
            ws.title,
            new_grid.row_count,
            new_grid.column_count
        );
        let body = json!({
            "requests": [{
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": props.sheet_id,
                        "gridProperties": {
                            "rowCount": new_grid.row_count,
                            "columnCount": new_grid.column_count,
                        }
                    },
                    "fields": "gridProperties(rowCount,columnCount)"
                }
            }]
        });
        self.batch_update(&ws.spreadsheet_id, body, &format!("resize worksheet '{}'", ws.title))?;
        if let Some(p) = self.sheets.get_mut(&key) {
            p.grid_properties = new_grid;
        }
        Ok(())
    }
}

impl SheetBackend for GoogleSheets {
    fn open_worksheet(
        &mut self,
        spreadsheet: &str,
        worksheet: &str,
        create_if_missing: bool,
    ) -> Result<WorksheetRef> {
        let id = self.spreadsheet_id(spreadsheet)?;
        let mut sheets = self.load_sheets(&id)?;

        if !sheets.iter().any(|s| s.title == worksheet) {
            if !create_if_missing {
                return Err(SyncError::SheetAccess(format!(
                    "Worksheet '{}' not found in spreadsheet '{}'",
                    worksheet, spreadsheet
                )));
            }
            self.add_worksheet(&id, worksheet)?;
            sheets = self.load_sheets(&id)?;
        }

        let props = sheets
            .into_iter()
            .find(|s| s.title == worksheet)
            .ok_or_else(|| {
                SyncError::SheetAccess(format!(
                    "Worksheet '{}' not found in spreadsheet '{}'",
                    worksheet, spreadsheet
                ))
            })?;
        tracing::info!("Found worksheet '{}' (sheet id {})", props.title, props.sheet_id);
        self.sheets
            .insert((id.clone(), worksheet.to_string()), props);

        Ok(WorksheetRef {
            spreadsheet_id: id,
            title: worksheet.to_string(),
        })
    }

    fn clear(&mut self, ws: &WorksheetRef) -> Result<()> {
        let url = api_url(&self.sheets_api_base, &[
            &ws.spreadsheet_id,
            "values",
            &format!("{}:clear", quote_title(&ws.title)),
        ])?;
        let request = self.client.post(url).json(&json!({}));
        self.send(request, &format!("clear worksheet '{}'", ws.title))?;
        Ok(())
    }

    fn write_grid(&mut self, ws: &WorksheetRef, anchor: Anchor, grid: &[Vec<Cell>]) -> Result<()> {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let height = grid.len();
        if height == 0 || width == 0 {
            return Ok(());
        }
        let (last_row, last_col) = anchor
            .last_cell(height, width)
            .ok_or_else(|| out_of_bounds(ws, anchor, height, width))?;
        self.ensure_grid(ws, last_row, last_col)?;

        let range = format!(
            "{}!{}:{}{}",
            quote_title(&ws.title),
            anchor.a1(),
            column_letters(last_col),
            last_row
        );
        let values: Vec<Vec<serde_json::Value>> = grid
            .iter()
            .map(|row| row.iter().map(Cell::to_json).collect())
            .collect();

        let url = api_url(&self.sheets_api_base, &[&ws.spreadsheet_id, "values", &range])?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": values,
            }));
        self.send(request, &format!("write range {}", range))?;
        Ok(())
    }
}

/// `base` with percent-encoded path segments appended.
fn api_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| SyncError::SheetAccess(format!("invalid Sheets API base URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| SyncError::SheetAccess("Sheets API base URL cannot take a path".to_string()))?
        .extend(segments);
    Ok(url)
}

fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    resp.json().map_err(|e| {
        SyncError::SheetAccess(format!("failed to {}: unexpected response: {}", what, e))
    })
}

fn check_status(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    let message = format!("failed to {} (HTTP {}): {}", what, status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SyncError::SheetAuth(message)),
        _ => Err(SyncError::SheetAccess(message)),
    }
}

/// Escape a value for a single-quoted Drive query string.
pub fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

//! The shared booking sheet.
//!
//! [`SpreadsheetStore`] is the capability the sync needs; [`SheetsClient`]
//! implements it over the Google Sheets v4 REST API with a bearer token.
//! [`sync_to_sheet`] merges a batch into whatever the sheet already holds
//! and rewrites it.

use std::future::Future;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder};
use rescrawl_core::ReservationRecord;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ExportError;
use crate::merge::{merge, records_to_sheet_rows, rows_to_records, sheet_header};

/// An opened spreadsheet and the worksheets it had when opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
    pub sheets: Vec<Worksheet>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub spreadsheet_id: String,
    pub sheet_id: i64,
    pub title: String,
}

pub trait SpreadsheetStore: Send + Sync {
    /// Open by full URL or bare id.
    fn open(&self, id_or_url: &str)
        -> impl Future<Output = Result<Spreadsheet, ExportError>> + Send;

    /// The worksheet called `name`, created with the header row if missing.
    fn get_or_create_sheet(
        &self,
        spreadsheet: &Spreadsheet,
        name: &str,
    ) -> impl Future<Output = Result<Worksheet, ExportError>> + Send;

    /// Every non-empty row, header included.
    fn read_all_rows(
        &self,
        sheet: &Worksheet,
    ) -> impl Future<Output = Result<Vec<Vec<String>>, ExportError>> + Send;

    /// Replace the sheet's contents with `rows`.
    fn write_all_rows(
        &self,
        sheet: &Worksheet,
        rows: &[Vec<String>],
    ) -> impl Future<Output = Result<(), ExportError>> + Send;

    fn apply_header_formatting(
        &self,
        sheet: &Worksheet,
    ) -> impl Future<Output = Result<(), ExportError>> + Send;
}

/// Spreadsheet id from a `.../spreadsheets/d/<id>/...` URL or a bare id.
///
/// # Errors
///
/// [`ExportError::SpreadsheetRef`] when neither form matches.
pub fn spreadsheet_id(id_or_url: &str) -> Result<String, ExportError> {
    let trimmed = id_or_url.trim();
    let candidate = match trimmed.split_once("/spreadsheets/d/") {
        Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or_default(),
        None if !trimmed.contains('/') => trimmed,
        None => "",
    };
    let valid = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(candidate.to_string())
    } else {
        Err(ExportError::SpreadsheetRef(id_or_url.to_string()))
    }
}

/// A1 range covering the whole sheet.
fn whole_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    properties: TitleProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct TitleProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct SheetsClient {
    client: Client,
    api_base: String,
    access_token: String,
}

impl SheetsClient {
    /// # Errors
    ///
    /// [`ExportError::Http`] if the HTTP client cannot be built.
    pub fn new(
        api_base: &str,
        access_token: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn spreadsheet_url(&self, id: &str) -> String {
        format!("{}/v4/spreadsheets/{id}", self.api_base)
    }

    fn values_url(&self, sheet: &Worksheet, suffix: &str) -> String {
        let range = utf8_percent_encode(&whole_sheet(&sheet.title), NON_ALPHANUMERIC).to_string();
        format!(
            "{}/values/{range}{suffix}",
            self.spreadsheet_url(&sheet.spreadsheet_id)
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ExportError> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);
        Err(ExportError::SheetsApi {
            status: status.as_u16(),
            message,
        })
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: Value,
    ) -> Result<BatchUpdateResponse, ExportError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url(spreadsheet_id));
        let response = self
            .send(self.client.post(url).json(&json!({ "requests": requests })))
            .await?;
        Ok(response.json().await?)
    }
}

impl SpreadsheetStore for SheetsClient {
    async fn open(&self, id_or_url: &str) -> Result<Spreadsheet, ExportError> {
        let id = spreadsheet_id(id_or_url)?;
        let request = self
            .client
            .get(self.spreadsheet_url(&id))
            .query(&[("fields", "properties.title,sheets.properties")]);
        let meta: SpreadsheetMeta = self.send(request).await?.json().await?;

        let sheets = meta
            .sheets
            .into_iter()
            .map(|s| Worksheet {
                spreadsheet_id: id.clone(),
                sheet_id: s.properties.sheet_id,
                title: s.properties.title,
            })
            .collect();
        tracing::debug!(spreadsheet = %meta.properties.title, "spreadsheet opened");
        Ok(Spreadsheet {
            id,
            title: meta.properties.title,
            sheets,
        })
    }

    async fn get_or_create_sheet(
        &self,
        spreadsheet: &Spreadsheet,
        name: &str,
    ) -> Result<Worksheet, ExportError> {
        if let Some(existing) = spreadsheet.sheets.iter().find(|s| s.title == name) {
            return Ok(existing.clone());
        }

        let column_count = sheet_header().len();
        let response = self
            .batch_update(
                &spreadsheet.id,
                json!([{
                    "addSheet": {
                        "properties": {
                            "title": name,
                            "gridProperties": { "rowCount": 1000, "columnCount": column_count }
                        }
                    }
                }]),
            )
            .await?;
        let sheet_id = response
            .replies
            .first()
            .and_then(|r| r["addSheet"]["properties"]["sheetId"].as_i64())
            .ok_or_else(|| ExportError::SheetsApi {
                status: 200,
                message: "addSheet reply carried no sheetId".to_string(),
            })?;

        let sheet = Worksheet {
            spreadsheet_id: spreadsheet.id.clone(),
            sheet_id,
            title: name.to_string(),
        };
        self.write_all_rows(&sheet, &[sheet_header()]).await?;
        tracing::info!(worksheet = name, "worksheet created");
        Ok(sheet)
    }

    async fn read_all_rows(&self, sheet: &Worksheet) -> Result<Vec<Vec<String>>, ExportError> {
        let range: ValueRange = self
            .send(self.client.get(self.values_url(sheet, "")))
            .await?
            .json()
            .await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .collect())
    }

    async fn write_all_rows(
        &self,
        sheet: &Worksheet,
        rows: &[Vec<String>],
    ) -> Result<(), ExportError> {
        self.send(self.client.post(self.values_url(sheet, ":clear")).json(&json!({})))
            .await?;
        let request = self
            .client
            .put(self.values_url(sheet, ""))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": whole_sheet(&sheet.title),
                "majorDimension": "ROWS",
                "values": rows,
            }));
        self.send(request).await?;
        Ok(())
    }

    async fn apply_header_formatting(&self, sheet: &Worksheet) -> Result<(), ExportError> {
        let column_count = sheet_header().len();
        self.batch_update(
            &sheet.spreadsheet_id,
            json!([
                {
                    "repeatCell": {
                        "range": {
                            "sheetId": sheet.sheet_id,
                            "startRowIndex": 0,
                            "endRowIndex": 1,
                            "startColumnIndex": 0,
                            "endColumnIndex": column_count
                        },
                        "cell": {
                            "userEnteredFormat": {
                                "backgroundColor": { "red": 0.2, "green": 0.4, "blue": 0.8 },
                                "horizontalAlignment": "CENTER",
                                "textFormat": {
                                    "bold": true,
                                    "foregroundColor": { "red": 1.0, "green": 1.0, "blue": 1.0 }
                                }
                            }
                        },
                        "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)"
                    }
                },
                {
                    "updateSheetProperties": {
                        "properties": {
                            "sheetId": sheet.sheet_id,
                            "gridProperties": { "frozenRowCount": 1 }
                        },
                        "fields": "gridProperties.frozenRowCount"
                    }
                }
            ]),
        )
        .await?;
        Ok(())
    }
}

/// What a sheet sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSyncReport {
    pub spreadsheet: String,
    pub worksheet: String,
    pub rows_before: usize,
    pub rows_after: usize,
}

/// Merge `records` into the worksheet `worksheet` of `sheet_ref` and rewrite
/// it, sorted by date with the header row formatted.
///
/// # Errors
///
/// Any store failure, or [`ExportError::InvalidRow`] when a stored row has
/// an unreadable date. Nothing is written in that case.
pub async fn sync_to_sheet<S: SpreadsheetStore>(
    store: &S,
    sheet_ref: &str,
    worksheet: &str,
    records: Vec<ReservationRecord>,
) -> Result<SheetSyncReport, ExportError> {
    let spreadsheet = store.open(sheet_ref).await?;
    let sheet = store.get_or_create_sheet(&spreadsheet, worksheet).await?;

    let persisted = rows_to_records(&store.read_all_rows(&sheet).await?)?;
    let rows_before = persisted.len();
    let incoming = records.len();
    let merged = merge(persisted, records);

    store
        .write_all_rows(&sheet, &records_to_sheet_rows(&merged))
        .await?;
    store.apply_header_formatting(&sheet).await?;

    tracing::info!(
        spreadsheet = %spreadsheet.title,
        worksheet,
        rows_before,
        incoming,
        rows_after = merged.len(),
        "sheet synced"
    );
    Ok(SheetSyncReport {
        spreadsheet: spreadsheet.title,
        worksheet: sheet.title,
        rows_before,
        rows_after: merged.len(),
    })
}

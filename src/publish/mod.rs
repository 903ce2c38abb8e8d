//! # Spreadsheet Publishing
//!
//! Final shop tables are published to a shared spreadsheet: one worksheet
//! per shop, plus a status worksheet with one row per shop that records when
//! the shop was last refreshed.
//!
//! ## Status Worksheet
//!
//! Rows are found by vertical lookup on the shop's base URL (column A); the
//! status cell (column B) holds `In progress...` while an upload runs and the
//! run date once it has finished.
//!
//! ## Google Sheets
//!
//! [`SheetsPublisher`] talks to the Sheets v4 REST API with a bearer token.
//! Values are written as `RAW` strings so prices are not reinterpreted by
//! the spreadsheet's locale.
//!
//! Shops name their spreadsheet by title. The title is resolved to a file id
//! through the Drive v3 file search once per publisher and then reused.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ShopError;

/// Destination for finished shop tables.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Finds the row whose `lookup_index` column equals `lookup_value` and
    /// writes `value` into its `value_index` column. Indices are zero-based.
    async fn set_value_by_lookup(
        &self,
        spreadsheet: &str,
        sheet: &str,
        lookup_value: &str,
        lookup_index: usize,
        value_index: usize,
        value: &str,
    ) -> Result<(), ShopError>;

    /// Replaces the content of `sheet` with `header` followed by `rows`.
    async fn upload(
        &self,
        spreadsheet: &str,
        sheet: &str,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<(), ShopError>;
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Serialize)]
struct ValuesBody {
    values: Vec<Vec<String>>,
}

/// Spreadsheet column letters for a zero-based index: 0 is `A`, 26 is `AA`.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Google Sheets v4 client.
pub struct SheetsPublisher {
    client: Client,
    base_url: String,
    drive_url: String,
    token: Option<String>,
    /// Spreadsheet title -> Drive file id
    ids: Mutex<HashMap<String, String>>,
}

impl SheetsPublisher {
    /// `base_url` is the Sheets API root, e.g. `https://sheets.googleapis.com/v4`,
    /// `drive_url` the Drive API root, e.g. `https://www.googleapis.com/drive/v3`.
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        drive_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            drive_url: drive_url.into().trim_end_matches('/').to_string(),
            token,
            ids: Mutex::new(HashMap::new()),
        }
    }

    /// File id of the spreadsheet titled `name`.
    async fn spreadsheet_id(&self, name: &str) -> Result<String, ShopError> {
        let cached = self.ids.lock().ok().and_then(|ids| ids.get(name).cloned());
        if let Some(id) = cached {
            return Ok(id);
        }

        let url = format!("{}/files", self.drive_url);
        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            name.replace('\\', "\\\\").replace('\'', "\\'"),
            SPREADSHEET_MIME_TYPE
        );
        let response = self
            .authorized(self.client.get(&url))
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await?;
        let list = checked(response, &url)?.json::<FileList>().await?;

        let id = list
            .files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| ShopError::SpreadsheetNotFound {
                name: name.to_string(),
            })?;

        info!("Spreadsheet {} resolved to {}", name, id);
        if let Ok(mut ids) = self.ids.lock() {
            ids.insert(name.to_string(), id.clone());
        }
        Ok(id)
    }

    fn values_url(&self, spreadsheet: &str, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(spreadsheet),
            urlencoding::encode(range)
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read(&self, spreadsheet: &str, range: &str) -> Result<ValueRange, ShopError> {
        let url = self.values_url(spreadsheet, range);
        let response = self.authorized(self.client.get(&url)).send().await?;
        Ok(checked(response, &url)?.json::<ValueRange>().await?)
    }
}

fn checked(response: Response, url: &str) -> Result<Response, ShopError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ShopError::UnexpectedStatus {
            status: response.status().as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Publisher for SheetsPublisher {
    async fn set_value_by_lookup(
        &self,
        spreadsheet: &str,
        sheet: &str,
        lookup_value: &str,
        lookup_index: usize,
        value_index: usize,
        value: &str,
    ) -> Result<(), ShopError> {
        let id = self.spreadsheet_id(spreadsheet).await?;
        let column = column_letter(lookup_index);
        let lookup = self.read(&id, &format!("{sheet}!{column}:{column}")).await?;

        let row = lookup
            .values
            .iter()
            .position(|cells| cells.first().is_some_and(|c| c == lookup_value))
            .ok_or_else(|| ShopError::LookupMissing {
                sheet: sheet.to_string(),
                value: lookup_value.to_string(),
            })?;

        let cell = format!("{sheet}!{}{}", column_letter(value_index), row + 1);
        let url = format!("{}?valueInputOption=RAW", self.values_url(&id, &cell));
        let body = ValuesBody {
            values: vec![vec![value.to_string()]],
        };
        let response = self
            .authorized(self.client.put(&url))
            .json(&body)
            .send()
            .await?;
        checked(response, &url)?;

        info!("Set {} to {:?} for {}", cell, value, lookup_value);
        Ok(())
    }

    async fn upload(
        &self,
        spreadsheet: &str,
        sheet: &str,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<(), ShopError> {
        if rows.is_empty() {
            return Err(ShopError::EmptyUpload {
                sheet: sheet.to_string(),
            });
        }
        let row_count = rows.len();
        let id = self.spreadsheet_id(spreadsheet).await?;

        let clear_url = format!("{}:clear", self.values_url(&id, sheet));
        let response = self
            .authorized(self.client.post(&clear_url))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        checked(response, &clear_url)?;

        let mut values = Vec::with_capacity(row_count + 1);
        values.push(header);
        values.extend(rows);

        let append_url = format!(
            "{}:append?valueInputOption=RAW&insertDataOption=OVERWRITE",
            self.values_url(&id, &format!("{sheet}!A1"))
        );
        let response = self
            .authorized(self.client.post(&append_url))
            .json(&ValuesBody { values })
            .send()
            .await?;
        checked(response, &append_url)?;

        info!("Uploaded {} rows to {}/{}", row_count, spreadsheet, sheet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(1), "B");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn ranges_are_percent_encoded() {
        let publisher = SheetsPublisher::new(
            Client::new(),
            "https://sheets.test/v4/",
            "https://drive.test/v3",
            None,
        );
        assert_eq!(
            publisher.values_url("1AbC", "TS!A:A"),
            "https://sheets.test/v4/spreadsheets/1AbC/values/TS%21A%3AA"
        );
    }
}

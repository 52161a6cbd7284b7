use super::{has_extension, run_blocking, Extractor};
use crate::cancel::CancellationSignal;
use crate::error::ExtractError;
use async_trait::async_trait;
use calamine::{open_workbook_auto, Reader};
use std::path::Path;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Workbook extraction via `calamine`: one block per sheet, cells tab-separated.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for SpreadsheetExtractor {
    fn name(&self) -> &str {
        "spreadsheet"
    }

    fn can_handle(&self, path: &Path) -> bool {
        has_extension(path, SPREADSHEET_EXTENSIONS)
    }

    async fn extract(
        &self,
        path: &Path,
        cancel: &CancellationSignal,
    ) -> Result<String, ExtractError> {
        cancel.check()?;
        if let Err(e) = tokio::fs::metadata(path).await {
            return Err(ExtractError::from_io(path, e));
        }

        let cancel = cancel.clone();
        run_blocking(path, move |path| {
            let mut workbook =
                open_workbook_auto(&path).map_err(|e| ExtractError::decode(&path, e.to_string()))?;
            let mut sheets = Vec::new();

            for name in workbook.sheet_names() {
                cancel.check()?;
                let range = workbook
                    .worksheet_range(&name)
                    .map_err(|e| ExtractError::decode(&path, format!("sheet '{}': {}", name, e)))?;

                let rows: Vec<String> = range
                    .rows()
                    .map(|row| {
                        row.iter()
                            .map(|cell| cell.to_string())
                            .collect::<Vec<_>>()
                            .join("\t")
                            .trim_end()
                            .to_string()
                    })
                    .filter(|row| !row.is_empty())
                    .collect();

                sheets.push(format!("[{}]\n{}", name, rows.join("\n")));
            }

            Ok(sheets.join("\n\n"))
        })
        .await
    }
}

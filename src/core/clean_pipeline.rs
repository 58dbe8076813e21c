use crate::config::toml_config::CleaningRules;
use crate::core::filters::{self, Frame};
use crate::core::parse_pipeline::INDEX_FILE;
use crate::domain::model::{
    CleanedIndex, CleanedSheetEntry, CleaningStats, Record, RunSummary, SheetEntry, SheetFiles,
    SheetIndex, StructuredSheet, TransformResult,
};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::{Result, TidyError};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::io::Write;
use std::path::PathBuf;
use zip::write::{SimpleFileOptions, ZipWriter};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A sheet as listed in the parsed index, with its CSV if one was found.
#[derive(Debug, Clone)]
pub struct LoadedSheet {
    pub name: String,
    pub entry: SheetEntry,
    pub csv: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ParsedInput {
    pub index: SheetIndex,
    pub sheets: Vec<LoadedSheet>,
}

/// Rewrites `parsed_data` into `cleaned_data`, dropping junk sheets, columns and rows.
pub struct CleanPipeline<S: Storage> {
    input: S,
    output: S,
    rules: CleaningRules,
    archive: Option<PathBuf>,
}

impl<S: Storage> CleanPipeline<S> {
    pub fn new(input: S, output: S, rules: CleaningRules) -> Self {
        Self {
            input,
            output,
            rules,
            archive: None,
        }
    }

    /// Also writes every output file into a zip archive at `path`.
    pub fn with_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive = Some(path.into());
        self
    }

    fn clean_sheet(&self, sheet: &LoadedSheet, csv: &[u8]) -> Result<Option<CleanedSheet>> {
        let mut frame = Frame::from_csv(csv)?;

        let dropped = frame.drop_columns(&self.rules.junk_columns);
        if !dropped.is_empty() {
            tracing::info!("   🧹 Dropped columns: {:?}", dropped);
        }

        frame.drop_empty_rows();
        let removed = frame.drop_rows_where(|row| filters::is_junk_row(row, &self.rules));
        if removed > 0 {
            tracing::info!("   🧹 Removed {} junk rows", removed);
        }
        frame.drop_empty_columns();

        if frame.rows.is_empty() {
            tracing::warn!("   ⚠️  Sheet {} is empty after cleaning", sheet.name);
            return Ok(None);
        }

        let records: Vec<Record> = frame
            .filled_records()
            .into_iter()
            .filter(|record| filters::passes_value_filter(record, &self.rules))
            .filter(|record| filters::is_meaningful(record, &self.rules))
            .collect();

        if records.is_empty() {
            tracing::warn!("   ⚠️  Sheet {} is empty after filtering", sheet.name);
            return Ok(None);
        }

        Ok(Some(CleanedSheet {
            columns: frame.columns,
            records,
        }))
    }

    fn sheet_files(&self, name: &str) -> SheetFiles {
        SheetFiles::for_stem(&crate::core::parse_pipeline::safe_file_stem(name))
    }

    fn build_archive(&self, files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, bytes) in files {
            zip.start_file(name.as_str(), SimpleFileOptions::default())?;
            zip.write_all(bytes)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

struct CleanedSheet {
    columns: Vec<String>,
    records: Vec<Record>,
}

#[async_trait]
impl<S: Storage> Pipeline for CleanPipeline<S> {
    type Extracted = ParsedInput;
    type Transformed = TransformResult;

    fn name(&self) -> &str {
        "clean"
    }

    async fn extract(&self) -> Result<ParsedInput> {
        if !self.input.exists(INDEX_FILE).await {
            return Err(TidyError::missing_input(format!(
                "{}/{}",
                self.input.location(),
                INDEX_FILE
            )));
        }

        let index: SheetIndex = serde_json::from_slice(&self.input.read_file(INDEX_FILE).await?)?;
        tracing::info!("📊 Cleaning {} sheets...", index.total_sheets);

        let mut sheets = Vec::with_capacity(index.sheets.len());
        for (name, entry) in &index.sheets {
            if self.rules.junk_sheets.contains(name) {
                sheets.push(LoadedSheet {
                    name: name.clone(),
                    entry: entry.clone(),
                    csv: None,
                });
                continue;
            }

            let csv_path = entry
                .files
                .as_ref()
                .map(|files| files.csv.clone())
                .unwrap_or_else(|| format!("{}.csv", name));

            let csv = if self.input.exists(&csv_path).await {
                Some(self.input.read_file(&csv_path).await?)
            } else {
                None
            };

            sheets.push(LoadedSheet {
                name: name.clone(),
                entry: entry.clone(),
                csv,
            });
        }

        Ok(ParsedInput { index, sheets })
    }

    async fn transform(&self, data: ParsedInput) -> Result<TransformResult> {
        let mut files = Vec::new();
        let mut cleaned_sheets = IndexMap::new();
        let mut summary = RunSummary::default();

        for sheet in &data.sheets {
            summary.total_sheets += 1;
            summary.total_rows_before += sheet.entry.rows;
            tracing::info!("🔄 Processing sheet: {}", sheet.name);

            if self.rules.junk_sheets.contains(&sheet.name) {
                tracing::info!("   🗑️  Sheet {} is junk, dropping it", sheet.name);
                summary.junk_sheets_removed += 1;
                continue;
            }

            let Some(csv) = &sheet.csv else {
                tracing::warn!("   ⚠️  CSV for {} not found, skipping", sheet.name);
                summary.skipped_sheets += 1;
                continue;
            };

            let cleaned = match self.clean_sheet(sheet, csv) {
                Ok(Some(cleaned)) => cleaned,
                Ok(None) => {
                    summary.skipped_sheets += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!("   ❌ Failed to process {}: {}", sheet.name, e);
                    summary.failed_sheets += 1;
                    continue;
                }
            };

            let sheet_files = self.sheet_files(&sheet.name);
            let structured = StructuredSheet {
                sheet_name: sheet.name.clone(),
                total_rows: cleaned.records.len(),
                total_columns: cleaned.columns.len(),
                columns: cleaned.columns.clone(),
                data: cleaned.records.clone(),
            };

            files.push((
                sheet_files.json.clone(),
                serde_json::to_vec_pretty(&cleaned.records)?,
            ));
            files.push((
                sheet_files.csv.clone(),
                records_to_csv(&cleaned.columns, &cleaned.records)?,
            ));
            files.push((
                sheet_files.structured_json.clone(),
                serde_json::to_vec_pretty(&structured)?,
            ));

            tracing::info!(
                "   ✅ Saved cleaned sheet: {} rows, {} columns",
                cleaned.records.len(),
                cleaned.columns.len()
            );

            summary.total_rows_after += cleaned.records.len();
            summary.written_sheets += 1;
            cleaned_sheets.insert(
                sheet.name.clone(),
                CleanedSheetEntry {
                    original_rows: sheet.entry.rows,
                    cleaned_rows: cleaned.records.len(),
                    removed_rows: sheet.entry.rows as i64 - cleaned.records.len() as i64,
                    original_columns: sheet.entry.columns,
                    cleaned_columns: cleaned.columns.len(),
                    removed_columns: sheet.entry.columns as i64 - cleaned.columns.len() as i64,
                    files: sheet_files,
                },
            );
        }

        let cleaned_index = CleanedIndex {
            source_file: data.index.source_file.clone(),
            total_original_sheets: data.index.total_sheets,
            total_cleaned_sheets: summary.written_sheets,
            junk_sheets_removed: summary.junk_sheets_removed,
            cleaning_stats: CleaningStats::new(summary.total_rows_before, summary.total_rows_after),
            sheets: cleaned_sheets,
        };
        files.push((INDEX_FILE.to_string(), serde_json::to_vec_pretty(&cleaned_index)?));

        Ok(TransformResult { files, summary })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        self.output.reset().await?;

        for (path, bytes) in &result.files {
            tracing::debug!("Writing {} ({} bytes)", path, bytes.len());
            self.output.write_file(path, bytes).await?;
        }

        if let Some(archive) = &self.archive {
            let zip_data = self.build_archive(&result.files)?;
            tracing::debug!("Writing archive ({} bytes) to {}", zip_data.len(), archive.display());
            if let Some(parent) = archive.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(archive, zip_data).await?;
            tracing::info!("📦 Archive saved to {}", archive.display());
        }

        let summary = &result.summary;
        let stats = CleaningStats::new(summary.total_rows_before, summary.total_rows_after);
        tracing::info!("🎉 Cleaning finished, results in {}", self.output.location());
        tracing::info!(
            "📊 sheets: {}, junk removed: {}, cleaned: {}, skipped: {}, failed: {}",
            summary.total_sheets,
            summary.junk_sheets_removed,
            summary.written_sheets,
            summary.skipped_sheets,
            summary.failed_sheets
        );
        tracing::info!(
            "📊 rows before: {}, after: {}, removed: {}, reduction: {}%",
            stats.total_rows_before,
            stats.total_rows_after,
            stats.removed_rows,
            stats.data_reduction_percent
        );

        Ok(self.output.location())
    }
}

/// CSV with a UTF-8 byte order mark so spreadsheet tools detect the encoding.
fn records_to_csv(columns: &[String], records: &[Record]) -> Result<Vec<u8>> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(columns)?;
        for record in records {
            writer.write_record(columns.iter().map(|column| {
                match record.data.get(column) {
                    None | Some(serde_json::Value::Null) => String::new(),
                    Some(serde_json::Value::String(text)) => text.clone(),
                    Some(value) => value.to_string(),
                }
            }))?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: &str, data: &str) {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                TidyError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }

        async fn reset(&self) -> Result<()> {
            self.files.lock().await.clear();
            Ok(())
        }

        fn location(&self) -> String {
            "memory".to_string()
        }
    }

    const INDEX: &str = r#"{
  "source_file": "book.xlsx",
  "total_sheets": 3,
  "sheets": {
    "Games": {"rows": 4, "columns": 4, "files": {"json": "Games.json", "csv": "Games.csv", "structured_json": "Games_structured.json"}},
    "-Template-": {"rows": 2, "columns": 1},
    "Missing": {"rows": 1, "columns": 1}
  }
}"#;

    fn rules() -> CleaningRules {
        CleaningRules {
            junk_sheets: vec!["-Template-".to_string()],
            junk_columns: vec!["Unnamed: 0".to_string()],
            junk_row_keywords: vec!["copy & paste".to_string()],
            ..CleaningRules::default()
        }
    }

    async fn input() -> MockStorage {
        let storage = MockStorage::default();
        storage.put(INDEX_FILE, INDEX).await;
        storage
            .put(
                "Games.csv",
                "Unnamed: 0,Game Name,Site$,Empty\n\
                 1,Chess,10,\n\
                 2,▬▬▬▬,,\n\
                 ,,,\n\
                 3,Go,0,\n",
            )
            .await;
        storage
    }

    #[tokio::test]
    async fn cleans_sheet_and_writes_index() {
        let output = MockStorage::default();
        output.put("stale.json", "[]").await;
        let pipeline = CleanPipeline::new(input().await, output.clone(), rules());

        let parsed = pipeline.extract().await.unwrap();
        let result = pipeline.transform(parsed).await.unwrap();
        assert_eq!(result.summary.total_sheets, 3);
        assert_eq!(result.summary.junk_sheets_removed, 1);
        assert_eq!(result.summary.skipped_sheets, 1);
        assert_eq!(result.summary.written_sheets, 1);

        pipeline.load(result).await.unwrap();
        assert!(output.get_file("stale.json").await.is_none());

        let records: serde_json::Value =
            serde_json::from_slice(&output.get_file("Games.json").await.unwrap()).unwrap();
        assert_eq!(
            records,
            serde_json::json!([
                {"Game Name": "Chess", "Site$": 10},
                {"Game Name": "Go", "Site$": 0}
            ])
        );

        let csv = output.get_file("Games.csv").await.unwrap();
        assert!(csv.starts_with(UTF8_BOM));
        assert_eq!(&csv[UTF8_BOM.len()..], "Game Name,Site$\nChess,10\nGo,0\n".as_bytes());

        let index: CleanedIndex =
            serde_json::from_slice(&output.get_file(INDEX_FILE).await.unwrap()).unwrap();
        assert_eq!(index.total_original_sheets, 3);
        assert_eq!(index.total_cleaned_sheets, 1);
        assert_eq!(index.cleaning_stats.total_rows_before, 7);
        assert_eq!(index.cleaning_stats.total_rows_after, 2);
        assert_eq!(index.sheets["Games"].removed_rows, 2);
        assert_eq!(index.sheets["Games"].cleaned_columns, 2);
        assert_eq!(index.sheets["Games"].removed_columns, 2);
    }

    #[tokio::test]
    async fn sheet_emptied_by_filters_does_not_stop_the_run() {
        let storage = MockStorage::default();
        storage
            .put(
                INDEX_FILE,
                r#"{"source_file": "b.xlsx", "total_sheets": 2, "sheets": {
                    "Zeros": {"rows": 1, "columns": 1},
                    "Kept": {"rows": 1, "columns": 1}}}"#,
            )
            .await;
        storage.put("Zeros.csv", "n\n0\n").await;
        storage.put("Kept.csv", "n\n5\n").await;

        let pipeline = CleanPipeline::new(storage, MockStorage::default(), rules());
        let parsed = pipeline.extract().await.unwrap();
        let result = pipeline.transform(parsed).await.unwrap();

        assert_eq!(result.summary.skipped_sheets, 1);
        assert_eq!(result.summary.written_sheets, 1);
        assert!(result.files.iter().any(|(name, _)| name == "Kept.json"));
        assert!(!result.files.iter().any(|(name, _)| name == "Zeros.json"));
    }

    #[tokio::test]
    async fn missing_index_is_missing_input() {
        let pipeline =
            CleanPipeline::new(MockStorage::default(), MockStorage::default(), rules());
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, TidyError::MissingInputError { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}

use crate::domain::model::{
    Cell, RunSummary, SheetEntry, SheetFiles, SheetIndex, SheetTable, StructuredSheet,
    TransformResult,
};
use crate::domain::ports::{Pipeline, Storage};
use crate::utils::error::{Result, TidyError};
use async_trait::async_trait;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.json";

/// Reads every sheet of a workbook and writes per-sheet JSON/CSV files plus `index.json`.
pub struct ParsePipeline<S: Storage> {
    input: PathBuf,
    storage: S,
}

impl<S: Storage> ParsePipeline<S> {
    pub fn new(input: impl Into<PathBuf>, storage: S) -> Self {
        Self {
            input: input.into(),
            storage,
        }
    }

    fn source_file(&self) -> String {
        self.input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

#[async_trait]
impl<S: Storage> Pipeline for ParsePipeline<S> {
    type Extracted = Vec<SheetTable>;
    type Transformed = TransformResult;

    fn name(&self) -> &str {
        "parse"
    }

    async fn extract(&self) -> Result<Vec<SheetTable>> {
        if !self.input.is_file() {
            return Err(TidyError::missing_input(self.input.display().to_string()));
        }

        tracing::info!("📖 Reading workbook: {}", self.input.display());
        let input = self.input.clone();
        let tables = tokio::task::spawn_blocking(move || read_workbook(&input))
            .await
            .map_err(|e| TidyError::processing(format!("workbook reader task failed: {}", e)))??;

        tracing::info!("📊 Found {} sheets", tables.len());
        Ok(tables)
    }

    async fn transform(&self, data: Vec<SheetTable>) -> Result<TransformResult> {
        let mut files = Vec::new();
        let mut sheets = IndexMap::new();
        let mut summary = RunSummary {
            total_sheets: data.len(),
            ..RunSummary::default()
        };

        for table in &data {
            let stem = safe_file_stem(&table.name);
            let sheet_files = SheetFiles::for_stem(&stem);
            let records = table.records();

            files.push((sheet_files.json.clone(), serde_json::to_vec_pretty(&records)?));
            files.push((sheet_files.csv.clone(), table_to_csv(table)?));

            let structured = StructuredSheet {
                sheet_name: table.name.clone(),
                total_rows: table.rows.len(),
                total_columns: table.columns.len(),
                columns: table.columns.clone(),
                data: records,
            };
            files.push((
                sheet_files.structured_json.clone(),
                serde_json::to_vec_pretty(&structured)?,
            ));

            tracing::info!(
                "   ✅ {}: {} rows, {} columns",
                table.name,
                table.rows.len(),
                table.columns.len()
            );

            summary.total_rows_before += table.rows.len();
            summary.written_sheets += 1;
            sheets.insert(
                table.name.clone(),
                SheetEntry {
                    rows: table.rows.len(),
                    columns: table.columns.len(),
                    column_names: table.columns.clone(),
                    files: Some(sheet_files),
                },
            );
        }
        summary.total_rows_after = summary.total_rows_before;

        let index = SheetIndex {
            source_file: self.source_file(),
            total_sheets: data.len(),
            sheets,
        };
        files.push((INDEX_FILE.to_string(), serde_json::to_vec_pretty(&index)?));

        Ok(TransformResult { files, summary })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        for (path, bytes) in &result.files {
            tracing::debug!("Writing {} ({} bytes)", path, bytes.len());
            self.storage.write_file(path, bytes).await?;
        }
        tracing::info!(
            "📁 Parsed {} sheets into {}",
            result.summary.written_sheets,
            self.storage.location()
        );
        Ok(self.storage.location())
    }
}

/// Reads every sheet. Column indices count from sheet column A, so leading
/// blank columns become `Unnamed: <index>`. The header is the first non-blank
/// row, as a dataframe reader skips blank lines before it.
pub fn read_workbook(path: &Path) -> Result<Vec<SheetTable>> {
    let mut workbook = open_workbook_auto(path)?;
    let mut tables = Vec::new();

    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let leading = range.start().map_or(0, |(_, column)| column as usize);
        let to_cells = |row: &[Data]| -> Vec<Cell> {
            std::iter::repeat(Cell::Empty)
                .take(leading)
                .chain(row.iter().map(cell_from_data))
                .collect()
        };
        let mut rows = range.rows();

        let header: Vec<Cell> = match rows.next() {
            Some(header) => to_cells(header),
            None => {
                tables.push(SheetTable {
                    name,
                    columns: Vec::new(),
                    rows: Vec::new(),
                });
                continue;
            }
        };

        let width = (leading + range.width()).max(header.len());
        let columns = mangle_headers(&header, width);
        let body = rows
            .map(|row| {
                let mut cells = to_cells(row);
                cells.resize(width, Cell::Empty);
                cells
            })
            .collect();

        tables.push(SheetTable {
            name,
            columns,
            rows: body,
        });
    }

    Ok(tables)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(text) if text.trim().is_empty() => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Int(int) => Cell::Int(*int),
        Data::Float(float) => Cell::float(*float),
        Data::Bool(flag) => Cell::Bool(*flag),
        Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
            Some(datetime) => Cell::DateTime(datetime),
            None => Cell::Text(data.to_string()),
        },
        Data::DurationIso(text) => Cell::Text(text.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

/// Header names as a dataframe reader produces them: blanks become
/// `Unnamed: <index>` and repeats get `.1`, `.2`, ... suffixes.
pub fn mangle_headers(header: &[Cell], width: usize) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::with_capacity(width);

    for index in 0..width {
        let base = match header.get(index) {
            None | Some(Cell::Empty) => format!("Unnamed: {}", index),
            Some(cell) => cell.to_csv_field(),
        };

        let name = if used.contains(&base) {
            let counter = counters.entry(base.clone()).or_insert(1);
            let mut candidate = format!("{}.{}", base, counter);
            while used.contains(&candidate) {
                *counter += 1;
                candidate = format!("{}.{}", base, counter);
            }
            *counter += 1;
            candidate
        } else {
            base
        };

        used.insert(name.clone());
        columns.push(name);
    }

    columns
}

/// File stem for a sheet: path separators and reserved characters become `_`.
pub fn safe_file_stem(sheet_name: &str) -> String {
    sheet_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn table_to_csv(table: &SheetTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if !table.columns.is_empty() {
        writer.write_record(&table.columns)?;
    }
    for row in &table.rows {
        writer.write_record(row.iter().map(Cell::to_csv_field))?;
    }
    writer
        .into_inner()
        .map_err(|e| TidyError::processing(format!("CSV buffer error: {}", e)))
}

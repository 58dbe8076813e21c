use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One spreadsheet row keyed by column name, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self { data: Map::new() }
    }

    pub fn from_cells(columns: &[String], cells: &[Cell]) -> Self {
        let mut data = Map::new();
        for (index, column) in columns.iter().enumerate() {
            let value = cells.get(index).map(Cell::to_json).unwrap_or(Value::Null);
            data.insert(column.clone(), value);
        }
        Self { data }
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Infers a typed cell from raw CSV text. Empty text is `Empty`.
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return Cell::Empty;
        }
        if let Ok(int) = raw.parse::<i64>() {
            return Cell::Int(int);
        }
        match raw.parse::<f64>() {
            Ok(float) if float.is_finite() => Cell::float(float),
            _ => Cell::Text(raw.to_string()),
        }
    }

    /// Integral floats are stored as integers, as workbook readers do.
    pub fn float(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < 9.0e15 {
            Cell::Int(value as i64)
        } else {
            Cell::Float(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Text(text) => Value::String(text.clone()),
            Cell::Int(int) => Value::from(*int),
            Cell::Float(float) => serde_json::Number::from_f64(*float)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Bool(flag) => Value::Bool(*flag),
            Cell::DateTime(datetime) => {
                Value::String(datetime.format(DATETIME_FORMAT).to_string())
            }
        }
    }

    /// Text form used in CSV output. Empty cells are empty fields.
    pub fn to_csv_field(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.clone(),
            Cell::Int(int) => int.to_string(),
            Cell::Float(float) => float.to_string(),
            Cell::Bool(flag) => if *flag { "True" } else { "False" }.to_string(),
            Cell::DateTime(datetime) => datetime.format(DATETIME_FORMAT).to_string(),
        }
    }
}

/// A sheet as read from a workbook: mangled header plus padded rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| Record::from_cells(&self.columns, row))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetFiles {
    pub json: String,
    pub csv: String,
    pub structured_json: String,
}

impl SheetFiles {
    pub fn for_stem(stem: &str) -> Self {
        Self {
            json: format!("{}.json", stem),
            csv: format!("{}.csv", stem),
            structured_json: format!("{}_structured.json", stem),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub rows: usize,
    pub columns: usize,
    #[serde(default)]
    pub column_names: Vec<String>,
    pub files: Option<SheetFiles>,
}

/// `index.json` written by the parse stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetIndex {
    pub source_file: String,
    pub total_sheets: usize,
    pub sheets: IndexMap<String, SheetEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredSheet {
    pub sheet_name: String,
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<String>,
    pub data: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub total_rows_before: usize,
    pub total_rows_after: usize,
    pub removed_rows: i64,
    pub data_reduction_percent: f64,
}

impl CleaningStats {
    pub fn new(total_rows_before: usize, total_rows_after: usize) -> Self {
        let reduction =
            (1.0 - total_rows_after as f64 / total_rows_before.max(1) as f64) * 100.0;
        Self {
            total_rows_before,
            total_rows_after,
            removed_rows: total_rows_before as i64 - total_rows_after as i64,
            data_reduction_percent: (reduction * 100.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedSheetEntry {
    pub original_rows: usize,
    pub cleaned_rows: usize,
    pub removed_rows: i64,
    pub original_columns: usize,
    pub cleaned_columns: usize,
    pub removed_columns: i64,
    pub files: SheetFiles,
}

/// `index.json` written by the clean stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedIndex {
    pub source_file: String,
    pub total_original_sheets: usize,
    pub total_cleaned_sheets: usize,
    pub junk_sheets_removed: usize,
    pub cleaning_stats: CleaningStats,
    pub sheets: IndexMap<String, CleanedSheetEntry>,
}

/// Output of a transform step: files to write, relative to the output root.
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub files: Vec<(String, Vec<u8>)>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total_sheets: usize,
    pub junk_sheets_removed: usize,
    pub written_sheets: usize,
    pub skipped_sheets: usize,
    pub failed_sheets: usize,
    pub total_rows_before: usize,
    pub total_rows_after: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn infer_types_csv_fields() {
        assert_eq!(Cell::infer(""), Cell::Empty);
        assert_eq!(Cell::infer("42"), Cell::Int(42));
        assert_eq!(Cell::infer("2.0"), Cell::Int(2));
        assert_eq!(Cell::infer("2.5"), Cell::Float(2.5));
        assert_eq!(Cell::infer("NaN"), Cell::Text("NaN".to_string()));
        assert_eq!(Cell::infer("abc"), Cell::Text("abc".to_string()));
    }

    #[test]
    fn datetime_cells_render_as_strings() {
        let datetime = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 0)
            .unwrap();
        assert_eq!(
            Cell::DateTime(datetime).to_json(),
            Value::String("2024-03-05 14:07:00".to_string())
        );
    }

    #[test]
    fn record_keeps_column_order() {
        let columns = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let record = Record::from_cells(&columns, &[Cell::Int(1), Cell::Empty]);
        let keys: Vec<&String> = record.data.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(record.data["c"], Value::Null);
    }

    #[test]
    fn cleaning_stats_round_to_two_places() {
        let stats = CleaningStats::new(3, 1);
        assert_eq!(stats.removed_rows, 2);
        assert_eq!(stats.data_reduction_percent, 66.67);

        let empty = CleaningStats::new(0, 0);
        assert_eq!(empty.data_reduction_percent, 100.0);
    }
}

//! Row and column predicates for the clean stage.
//!
//! Every word list comes from [`CleaningRules`]; nothing here knows about a
//! particular workbook.

use crate::config::toml_config::CleaningRules;
use crate::domain::model::{Cell, Record};
use serde_json::Value;

/// A sheet loaded from CSV, before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn from_csv(bytes: &[u8]) -> csv::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut cells: Vec<Cell> = record.iter().map(Cell::infer).collect();
            cells.resize(columns.len(), Cell::Empty);
            rows.push(cells);
        }

        Ok(Self { columns, rows })
    }

    pub fn drop_columns(&mut self, names: &[String]) -> Vec<String> {
        let dropped: Vec<String> = self
            .columns
            .iter()
            .filter(|column| names.contains(column))
            .cloned()
            .collect();
        if !dropped.is_empty() {
            let keep: Vec<bool> = self.columns.iter().map(|c| !dropped.contains(c)).collect();
            self.retain_columns(&keep);
        }
        dropped
    }

    pub fn drop_empty_rows(&mut self) {
        self.rows.retain(|row| row.iter().any(|cell| !cell.is_empty()));
    }

    /// Removes rows matching `is_junk`, returning how many went.
    pub fn drop_rows_where(&mut self, mut is_junk: impl FnMut(&[Cell]) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !is_junk(row));
        before - self.rows.len()
    }

    pub fn drop_empty_columns(&mut self) {
        let keep: Vec<bool> = (0..self.columns.len())
            .map(|index| {
                self.rows
                    .iter()
                    .any(|row| row.get(index).is_some_and(|cell| !cell.is_empty()))
            })
            .collect();
        self.retain_columns(&keep);
    }

    /// Records with empty cells filled by `""`.
    pub fn filled_records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Record::new();
                for (column, cell) in self.columns.iter().zip(row) {
                    let value = match cell {
                        Cell::Empty => Value::String(String::new()),
                        cell => cell.to_json(),
                    };
                    record.data.insert(column.clone(), value);
                }
                record
            })
            .collect()
    }

    fn retain_columns(&mut self, keep: &[bool]) {
        self.columns = self
            .columns
            .iter()
            .zip(keep)
            .filter(|(_, keep)| **keep)
            .map(|(column, _)| column.clone())
            .collect();
        for row in &mut self.rows {
            *row = row
                .iter()
                .zip(keep)
                .filter(|(_, keep)| **keep)
                .map(|(cell, _)| cell.clone())
                .collect();
        }
    }
}

/// Decoration or instruction rows, judged on the joined text of non-empty cells.
pub fn is_junk_row(row: &[Cell], rules: &CleaningRules) -> bool {
    let text = row
        .iter()
        .filter(|cell| !cell.is_empty())
        .map(Cell::to_csv_field)
        .collect::<Vec<_>>()
        .join(" ");

    if contains_any_char(&text, &rules.decorative_chars) {
        return true;
    }

    let lowered = text.to_lowercase();
    rules
        .junk_row_keywords
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

/// False when any string value links a blocked domain, carries decoration or
/// repeats an instruction phrase.
pub fn passes_value_filter(record: &Record, rules: &CleaningRules) -> bool {
    for value in record.data.values() {
        let Value::String(text) = value else {
            continue;
        };
        let lowered = text.to_lowercase();

        if rules
            .blocked_domains
            .iter()
            .any(|domain| lowered.contains(&domain.to_lowercase()))
        {
            return false;
        }
        if contains_any_char(text, &rules.strict_decorative_chars) {
            return false;
        }
        if rules
            .garbage_phrases
            .iter()
            .any(|phrase| lowered.contains(&phrase.to_lowercase()))
        {
            return false;
        }
    }
    true
}

/// Fields that decide whether a record carries data: the first profile whose
/// marker column is present, else the first few columns.
pub fn key_fields(record: &Record, rules: &CleaningRules) -> Vec<String> {
    rules
        .key_field_profiles
        .iter()
        .find(|profile| record.data.contains_key(&profile.marker))
        .map(|profile| profile.fields.clone())
        .unwrap_or_else(|| {
            record
                .data
                .keys()
                .take(rules.fallback_key_fields)
                .cloned()
                .collect()
        })
}

pub fn is_meaningful(record: &Record, rules: &CleaningRules) -> bool {
    key_fields(record, rules).iter().any(|field| {
        match record.data.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => {
                let trimmed = text.trim();
                !trimmed.is_empty() && trimmed != "0" && trimmed != "0.0"
            }
            Some(value) => {
                let text = value.to_string();
                let trimmed = text.trim();
                !trimmed.is_empty() && !matches!(trimmed, "0" | "0.0" | "nan")
            }
        }
    })
}

fn contains_any_char(text: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|needle| !needle.is_empty() && text.contains(needle.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::KeyFieldProfile;
    use serde_json::json;

    fn rules() -> CleaningRules {
        CleaningRules {
            junk_row_keywords: vec!["copy & paste".to_string(), "Example".to_string()],
            blocked_domains: vec!["market.example".to_string()],
            garbage_phrases: vec!["account login:".to_string()],
            key_field_profiles: vec![KeyFieldProfile {
                marker: "Discord".to_string(),
                fields: vec!["Discord".to_string(), "Contact Email".to_string()],
            }],
            ..CleaningRules::default()
        }
    }

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn frame_reads_typed_cells() {
        let frame = Frame::from_csv(b"name,price,note\nA,1.5,\n,,\nB,2\n").unwrap();
        assert_eq!(frame.columns, vec!["name", "price", "note"]);
        assert_eq!(frame.rows.len(), 3);
        assert_eq!(frame.rows[0][1], Cell::Float(1.5));
        assert_eq!(frame.rows[2], vec![Cell::Text("B".into()), Cell::Int(2), Cell::Empty]);
    }

    #[test]
    fn frame_drops_columns_and_rows() {
        let mut frame =
            Frame::from_csv(b"Unnamed: 0,name,blank\n1,A,\n,,\n2,B,\n").unwrap();

        assert_eq!(frame.drop_columns(&["Unnamed: 0".to_string()]), vec!["Unnamed: 0"]);
        frame.drop_empty_rows();
        frame.drop_empty_columns();

        assert_eq!(frame.columns, vec!["name"]);
        assert_eq!(frame.rows.len(), 2);
    }

    #[test]
    fn filled_records_replace_empty_with_blank_strings() {
        let frame = Frame::from_csv(b"a,b\n1,\n").unwrap();
        let records = frame.filled_records();
        assert_eq!(records[0].data["a"], json!(1));
        assert_eq!(records[0].data["b"], json!(""));
    }

    #[test]
    fn junk_rows_by_decoration_or_keyword() {
        let rules = rules();
        assert!(is_junk_row(&[Cell::Text("▬▬▬▬".into())], &rules));
        assert!(is_junk_row(
            &[Cell::Text("Like the EXAMPLE below".into()), Cell::Empty],
            &rules
        ));
        assert!(!is_junk_row(&[Cell::Text("Chess".into()), Cell::Int(3)], &rules));
    }

    #[test]
    fn value_filter_checks_domains_decoration_and_phrases() {
        let rules = rules();
        assert!(!passes_value_filter(
            &record(json!({"a": "see https://Market.Example/x"})),
            &rules
        ));
        assert!(!passes_value_filter(&record(json!({"a": "■ item"})), &rules));
        assert!(!passes_value_filter(&record(json!({"a": "Account login: ___"})), &rules));
        assert!(passes_value_filter(&record(json!({"a": "Chess", "b": 3})), &rules));
    }

    #[test]
    fn key_fields_follow_profiles_then_fallback() {
        let rules = rules();
        let contact = record(json!({"Name": "x", "Discord": "", "Contact Email": "a@b"}));
        assert_eq!(key_fields(&contact, &rules), vec!["Discord", "Contact Email"]);

        let plain = record(json!({"a": 1, "b": 2, "c": 3, "d": 4}));
        assert_eq!(key_fields(&plain, &rules), vec!["a", "b", "c"]);
    }

    #[test]
    fn meaningful_records_need_a_non_zero_key_field() {
        let rules = rules();
        assert!(!is_meaningful(&record(json!({"a": "", "b": "0", "c": 0, "d": "x"})), &rules));
        assert!(!is_meaningful(&record(json!({"a": " 0.0 ", "b": 0.0, "c": ""})), &rules));
        assert!(is_meaningful(&record(json!({"a": "", "b": 12, "c": ""})), &rules));
        assert!(is_meaningful(
            &record(json!({"Discord": "", "Contact Email": "me@example.org"})),
            &rules
        ));
    }
}

//! Line-based fixes for OpenAPI YAML documents.
//!
//! Edits work on the text rather than a parsed tree, so comments, key order
//! and quoting survive. Only block-style mappings are understood; anything
//! written in flow style is left alone.

use crate::utils::error::{Result, TidyError};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static KEY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^( *)(?:"([^"]*)"|'([^']*)'|([^\s#'"\-][^:#]*?))\s*:(?:\s+(.*?))?\s*$"#).unwrap()
});
static PLAIN_SCALAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap());

const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "patch", "head", "options", "trace"];

#[derive(Debug, Clone, PartialEq)]
struct KeyLine {
    indent: usize,
    key: String,
    value: Option<String>,
}

impl KeyLine {
    fn parse(line: &str) -> Option<Self> {
        let caps = KEY_LINE.captures(line)?;
        let key = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))?
            .as_str()
            .trim()
            .to_string();
        let value = caps
            .get(5)
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty() && !v.starts_with('#'));
        Some(Self {
            indent: caps[1].len(),
            key,
            value,
        })
    }

    /// True when the value sits on the same line (`key: value`).
    fn is_inline(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFix {
    pub content: String,
    pub titles_added: usize,
    pub operation_ids_added: usize,
}

impl DocumentFix {
    pub fn changes(&self) -> usize {
        self.titles_added + self.operation_ids_added
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpenApiFixer {
    titles: bool,
    operation_ids: bool,
}

impl OpenApiFixer {
    /// With neither fix selected, both run.
    pub fn new(titles: bool, operation_ids: bool) -> Self {
        if !titles && !operation_ids {
            return Self {
                titles: true,
                operation_ids: true,
            };
        }
        Self {
            titles,
            operation_ids,
        }
    }

    /// Fixed text of `source`. Fails when the document doesn't parse before
    /// or after editing.
    pub fn fix(&self, source: &str) -> Result<DocumentFix> {
        serde_yaml::from_str::<serde_yaml::Value>(source)?;

        let ending = if source.contains("\r\n") { "\r\n" } else { "\n" };
        let mut lines: Vec<String> = source
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();

        let mut insertions: Vec<(usize, String)> = Vec::new();
        let mut titles_added = 0;
        let mut operation_ids_added = 0;
        if self.titles {
            let titles = schema_titles(&lines);
            titles_added = titles.len();
            insertions.extend(titles);
        }
        if self.operation_ids {
            let ids = operation_ids(&lines);
            operation_ids_added = ids.len();
            insertions.extend(ids);
        }

        if insertions.is_empty() {
            return Ok(DocumentFix {
                content: source.to_string(),
                titles_added: 0,
                operation_ids_added: 0,
            });
        }

        insertions.sort_by(|a, b| b.0.cmp(&a.0));
        for (index, line) in insertions {
            lines.insert(index, line);
        }
        let mut content = lines.join(ending);
        if source.ends_with('\n') {
            content.push_str(ending);
        }

        if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(&content) {
            return Err(TidyError::ValidationError {
                message: format!("edited document no longer parses: {}", e),
            });
        }

        Ok(DocumentFix {
            content,
            titles_added,
            operation_ids_added,
        })
    }
}

/// True for documents with a top-level `openapi:` or `swagger:` key.
pub fn is_openapi(source: &str) -> bool {
    source
        .lines()
        .any(|line| line.starts_with("openapi:") || line.starts_with("swagger:"))
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#') && trimmed != "---"
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Indent of the first content line inside the block opened at `parent`.
fn child_indent(lines: &[String], parent: usize) -> Option<usize> {
    let parent_indent = indent_width(&lines[parent]);
    lines[parent + 1..]
        .iter()
        .find(|line| is_content(line))
        .map(|line| indent_width(line))
        .filter(|&indent| indent > parent_indent)
}

/// Direct child keys of the mapping opened at `parent`, with line indices.
fn children(lines: &[String], parent: usize) -> Vec<(usize, KeyLine)> {
    let parent_indent = indent_width(&lines[parent]);
    let Some(indent) = child_indent(lines, parent) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for (index, line) in lines.iter().enumerate().skip(parent + 1) {
        if !is_content(line) {
            continue;
        }
        let current = indent_width(line);
        if current <= parent_indent {
            break;
        }
        if current == indent {
            if let Some(key) = KeyLine::parse(line) {
                found.push((index, key));
            }
        }
    }
    found
}

fn top_level(lines: &[String], key: &str) -> Option<usize> {
    lines.iter().position(|line| {
        KeyLine::parse(line).is_some_and(|k| k.indent == 0 && k.key == key && !k.is_inline())
    })
}

/// `title:` lines for schemas under `components.schemas` that lack one.
fn schema_titles(lines: &[String]) -> Vec<(usize, String)> {
    let Some(components) = top_level(lines, "components") else {
        return Vec::new();
    };
    let Some((schemas, _)) = children(lines, components)
        .into_iter()
        .find(|(_, k)| k.key == "schemas" && !k.is_inline())
    else {
        return Vec::new();
    };

    let mut insertions = Vec::new();
    for (index, schema) in children(lines, schemas) {
        if schema.is_inline() {
            continue;
        }
        let fields = children(lines, index);
        if fields.is_empty() || fields.iter().any(|(_, f)| f.key == "title" || f.key == "$ref") {
            continue;
        }
        let indent = fields[0].1.indent;
        insertions.push((
            index + 1,
            format!("{}title: {}", " ".repeat(indent), yaml_scalar(&schema.key)),
        ));
    }
    insertions
}

/// `operationId:` lines for operations under `paths` that lack one.
fn operation_ids(lines: &[String]) -> Vec<(usize, String)> {
    let Some(paths) = top_level(lines, "paths") else {
        return Vec::new();
    };
    let mut used: HashSet<String> = lines
        .iter()
        .filter_map(|line| KeyLine::parse(line))
        .filter(|k| k.key == "operationId")
        .filter_map(|k| k.value)
        .map(|v| v.trim_matches(['"', '\'']).to_string())
        .collect();

    let mut insertions = Vec::new();
    for (path_index, path) in children(lines, paths) {
        for (method_index, method) in children(lines, path_index) {
            let verb = method.key.to_lowercase();
            if !HTTP_METHODS.contains(&verb.as_str()) || method.is_inline() {
                continue;
            }
            let fields = children(lines, method_index);
            if fields.is_empty() || fields.iter().any(|(_, f)| f.key == "operationId") {
                continue;
            }

            let id = unique_id(operation_id(&verb, &path.key), &used);
            used.insert(id.clone());
            insertions.push((
                method_index + 1,
                format!("{}operationId: {}", " ".repeat(fields[0].1.indent), id),
            ));
        }
    }
    insertions
}

/// camelCase id from method and path: `get /users/{id}/orders` is
/// `getUsersByIdOrders`.
pub fn operation_id(method: &str, path: &str) -> String {
    let mut id = method.to_lowercase();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        id.push_str("Root");
    }
    for segment in segments {
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(param) => {
                id.push_str("By");
                id.push_str(&pascal_case(param));
            }
            None => id.push_str(&pascal_case(segment)),
        }
    }
    id
}

fn pascal_case(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn unique_id(base: String, used: &HashSet<String>) -> String {
    if !used.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or(base)
}

fn yaml_scalar(text: &str) -> String {
    let reserved = matches!(
        text.to_lowercase().as_str(),
        "true" | "false" | "null" | "yes" | "no" | "on" | "off"
    );
    if PLAIN_SCALAR.is_match(text) && !reserved {
        text.to_string()
    } else {
        format!("'{}'", text.replace('\'', "''"))
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct OpenApiReport {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub skipped: usize,
    pub failures: usize,
    pub titles_added: usize,
    pub operation_ids_added: usize,
}

impl OpenApiReport {
    pub fn log_summary(&self, dry_run: bool) {
        let verb = if dry_run { "would change" } else { "changed" };
        tracing::info!(
            "📊 Scanned {} documents, {} {} ({} titles, {} operationIds, {} failures, {} not OpenAPI)",
            self.files_scanned,
            verb,
            self.files_changed,
            self.titles_added,
            self.operation_ids_added,
            self.failures,
            self.skipped
        );
    }
}

pub struct OpenApiRunner {
    fixer: OpenApiFixer,
    extensions: Vec<String>,
    dry_run: bool,
}

impl OpenApiRunner {
    pub fn new(fixer: OpenApiFixer, extensions: Vec<String>) -> Self {
        Self {
            fixer,
            extensions,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Fixes one document or every document under a directory.
    pub fn run(&self, target: &Path) -> Result<OpenApiReport> {
        if !target.exists() {
            return Err(TidyError::missing_input(target.display().to_string()));
        }

        let files = if target.is_file() {
            vec![target.to_path_buf()]
        } else {
            self.collect(target)
        };

        let mut report = OpenApiReport::default();
        for path in files {
            report.files_scanned += 1;
            match self.fix_file(&path) {
                Ok(None) => report.skipped += 1,
                Ok(Some(fix)) => {
                    if fix.changes() > 0 {
                        report.files_changed += 1;
                    }
                    report.titles_added += fix.titles_added;
                    report.operation_ids_added += fix.operation_ids_added;
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!("⚠️  {}: {}", path.display(), e);
                }
            }
        }
        Ok(report)
    }

    /// `None` when the file isn't an OpenAPI document.
    fn fix_file(&self, path: &Path) -> Result<Option<DocumentFix>> {
        let source = std::fs::read_to_string(path)?;
        if !is_openapi(&source) {
            tracing::debug!("Skipping {}, not an OpenAPI document", path.display());
            return Ok(None);
        }

        let fix = self.fixer.fix(&source)?;
        if fix.changes() > 0 {
            if self.dry_run {
                tracing::info!("📝 Would update {}", path.display());
            } else {
                std::fs::write(path, &fix.content)?;
                tracing::info!(
                    "✅ Updated {} ({} titles, {} operationIds)",
                    path.display(),
                    fix.titles_added,
                    fix.operation_ids_added
                );
            }
        }
        Ok(Some(fix))
    }

    fn collect(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !(entry.file_name().to_string_lossy().starts_with('.')
                        || entry.file_name() == "node_modules"
                        || entry.file_name() == "target")
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension().is_some_and(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    self.extensions.iter().any(|allowed| allowed.to_lowercase() == ext)
                })
            })
            .collect();
        files.sort();
        files
    }
}

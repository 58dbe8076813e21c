use super::{indent_of, Fix, FixContext, Fixer, FixerKind, SourceLines};
use crate::java::checkstyle::WarningKind;
use crate::java::scan::{self, Region};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static TYPE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w$.@])(@interface|class|interface|enum|record)\s+[A-Za-z_$][\w$]*").unwrap()
});
static CONSTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:static\s+final|final\s+static)\s+[\w$<>\[\]]+\s+([A-Z][A-Z0-9_]*)\s*=\s*([^;]+);")
        .unwrap()
});
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z_$][\w$]*").unwrap());

/// Moves reported numeric literals into `private static final` constants.
pub struct MagicNumberFixer;

#[derive(Debug)]
struct Constant {
    java_type: &'static str,
    name: String,
    literal: String,
}

impl Fixer for MagicNumberFixer {
    fn kind(&self) -> FixerKind {
        FixerKind::MagicNumbers
    }

    fn fix(&self, source: &str, ctx: &FixContext<'_>) -> Fix {
        let mut targets: Vec<(usize, Option<usize>, &str)> = ctx
            .warnings
            .iter()
            .filter_map(|w| match &w.kind {
                WarningKind::MagicNumber { literal } => Some((w.line, w.column, literal.as_str())),
                _ => None,
            })
            .collect();
        if targets.is_empty() {
            return Fix::unchanged(source);
        }
        targets.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        targets.dedup();

        let regions = scan::classify(source);
        let code = scan::blank_non_code(source, &regions);

        let Some(decl) = TYPE_DECLARATION.captures(&code) else {
            return Fix::unchanged(source);
        };
        if !matches!(&decl[1], "class" | "record") {
            tracing::debug!(
                "{} declares {}, constants not added",
                ctx.path.display(),
                &decl[1]
            );
            return Fix::unchanged(source);
        }
        let Some(decl_end) = decl.get(0).map(|m| m.end()) else {
            return Fix::unchanged(source);
        };
        let Some(brace) = code[decl_end..].find('{').map(|p| p + decl_end) else {
            return Fix::unchanged(source);
        };
        let brace_line = code[..brace].matches('\n').count();

        let mut lines = SourceLines::parse(source);
        if lines
            .lines
            .get(brace_line)
            .and_then(|line| line.find('{').map(|p| line[p + 1..].trim().to_string()))
            .is_some_and(|rest| !rest.is_empty())
        {
            return Fix::unchanged(source);
        }

        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let mut identifiers: HashSet<String> = IDENTIFIER
            .find_iter(&code)
            .map(|m| m.as_str().to_string())
            .collect();
        let mut by_literal: HashMap<String, String> = CONSTANT
            .captures_iter(&code)
            .map(|caps| (caps[2].trim().to_string(), caps[1].to_string()))
            .collect();

        let mut created: Vec<Constant> = Vec::new();
        let mut changes = 0;
        for (line_no, column, literal) in targets {
            let index = line_no.saturating_sub(1);
            if index <= brace_line || index >= lines.lines.len() {
                continue;
            }
            if line_starts
                .get(index)
                .and_then(|&start| regions.get(start))
                .is_some_and(|r| matches!(r, Region::BlockComment | Region::TextBlock))
            {
                continue;
            }

            let line = &lines.lines[index];
            let code_line = line.trim_start();
            if code_line.contains("static final") || code_line.contains("final static") {
                continue;
            }
            let Some(position) = nearest_occurrence(line, literal, column) else {
                continue;
            };

            let name = match by_literal.get(literal) {
                Some(name) => name.clone(),
                None => {
                    let assigned = assigned_name(line, literal);
                    let base = assigned
                        .as_deref()
                        .map(screaming_snake)
                        .unwrap_or_else(|| format!("NUMBER_{}", literal_suffix(literal)));
                    let name = unique_name(&base, &identifiers);
                    identifiers.insert(name.clone());
                    if assigned.is_none() {
                        by_literal.insert(literal.to_string(), name.clone());
                    }
                    created.push(Constant {
                        java_type: literal_type(literal),
                        name: name.clone(),
                        literal: literal.to_string(),
                    });
                    name
                }
            };

            lines.lines[index].replace_range(position..position + literal.len(), &name);
            changes += 1;
        }

        if changes == 0 {
            return Fix::unchanged(source);
        }

        let member_indent = lines.lines[brace_line + 1..]
            .iter()
            .find(|line| !line.trim().is_empty() && line.trim() != "}")
            .map(|line| indent_of(line).to_string())
            .unwrap_or_else(|| format!("{}    ", indent_of(&lines.lines[brace_line])));

        created.reverse();
        let mut block: Vec<String> = created
            .iter()
            .map(|c| {
                format!(
                    "{}private static final {} {} = {};",
                    member_indent, c.java_type, c.name, c.literal
                )
            })
            .collect();
        if !block.is_empty()
            && lines
                .lines
                .get(brace_line + 1)
                .is_some_and(|next| !next.trim().is_empty())
        {
            block.push(String::new());
        }
        lines
            .lines
            .splice(brace_line + 1..brace_line + 1, block);

        Fix {
            content: lines.render(),
            changes,
        }
    }
}

/// Byte offset of the code occurrence of `literal` closest to the reported
/// 1-based column.
fn nearest_occurrence(line: &str, literal: &str, column: Option<usize>) -> Option<usize> {
    let regions = scan::classify(line);
    let bytes = line.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'.');

    let candidates = line.match_indices(literal).map(|(i, _)| i).filter(|&i| {
        let end = i + literal.len();
        regions[i..end].iter().all(|r| r.is_code())
            && !i.checked_sub(1).is_some_and(|p| is_word(bytes[p]))
            && !bytes.get(end).is_some_and(|&b| is_word(b))
    });

    match column {
        Some(column) => {
            let target = column.saturating_sub(1);
            candidates.min_by_key(|&i| i.abs_diff(target))
        }
        None => candidates.min(),
    }
}

/// Target of `name = <literal>;` on this line, if that's what the line is.
fn assigned_name(line: &str, literal: &str) -> Option<String> {
    let pattern = format!(
        r"^\s*(?:(?:private|protected|public|static|final|var)\s+)*(?:[\w$.<>\[\]]+\s+)?(?:this\.)?([A-Za-z_$][\w$]*)\s*=\s*{}\s*;",
        regex::escape(literal)
    );
    let caps = Regex::new(&pattern).ok()?.captures(line)?;
    Some(caps[1].to_string())
}

fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// `maxRetryCount` becomes `MAX_RETRY_COUNT`, `httpPort` becomes `HTTP_PORT`.
pub(crate) fn screaming_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

fn literal_suffix(literal: &str) -> String {
    literal
        .chars()
        .map(|c| match c {
            '.' => "_".to_string(),
            '-' => "MINUS_".to_string(),
            c => c.to_ascii_uppercase().to_string(),
        })
        .collect()
}

fn literal_type(literal: &str) -> &'static str {
    let lowered = literal.to_lowercase();
    let hex = lowered.trim_start_matches('-').starts_with("0x");
    if lowered.ends_with('l') {
        "long"
    } else if hex {
        "int"
    } else if lowered.ends_with('f') {
        "float"
    } else if lowered.ends_with('d') || lowered.contains('.') || lowered.contains('e') {
        "double"
    } else {
        "int"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::java::checkstyle::Warning;
    use std::path::Path;

    fn magic(line: usize, column: usize, literal: &str) -> Warning {
        Warning::parse_line(
            &format!(
                "[WARN] /src/A.java:{}:{}: '{}' is a magic number. [MagicNumber]",
                line, column, literal
            ),
            Path::new("/"),
        )
        .unwrap()
    }

    fn fix(source: &str, warnings: &[Warning]) -> Fix {
        let refs: Vec<&Warning> = warnings.iter().collect();
        MagicNumberFixer.fix(source, &FixContext::new(Path::new("/src/A.java"), &refs))
    }

    #[test]
    fn extracts_constants_named_after_assignments_or_values() {
        let source = "\
package shop;

public class Pricing {
    private final int timeout;

    public Pricing() {
        this.timeout = 30;
    }

    double discount(double total) {
        int maxItems = 100;
        return total > 500.0 ? total * 0.5 : total;
    }
}
";
        let warnings = vec![
            magic(7, 24, "30"),
            magic(11, 24, "100"),
            magic(12, 24, "500.0"),
            magic(12, 40, "0.5"),
        ];
        let result = fix(source, &warnings);
        assert_eq!(result.changes, 4);
        assert_eq!(
            result.content,
            "\
package shop;

public class Pricing {
    private static final int TIMEOUT = 30;
    private static final int MAX_ITEMS = 100;
    private static final double NUMBER_500_0 = 500.0;
    private static final double NUMBER_0_5 = 0.5;

    private final int timeout;

    public Pricing() {
        this.timeout = TIMEOUT;
    }

    double discount(double total) {
        int maxItems = MAX_ITEMS;
        return total > NUMBER_500_0 ? total * NUMBER_0_5 : total;
    }
}
"
        );
    }

    #[test]
    fn reuses_existing_constant_with_same_value() {
        let source = "\
class Limits {
    static final int MAX = 50;

    int clamp(int v) {
        return Math.min(v, 50);
    }
}
";
        let result = fix(source, &[magic(5, 28, "50")]);
        assert_eq!(result.changes, 1);
        assert!(result.content.contains("return Math.min(v, MAX);"));
        assert_eq!(result.content.matches("static final").count(), 1);
    }

    #[test]
    fn generic_names_are_unique_and_shared_per_literal() {
        let source = "\
class Grid {
    int NUMBER_8;

    int area() {
        return 8 * 8 + size(8L);
    }
}
";
        let result = fix(source, &[magic(5, 16, "8"), magic(5, 20, "8"), magic(5, 29, "8L")]);
        assert!(result.content.contains("    private static final int NUMBER_8_2 = 8;\n"));
        assert!(result.content.contains("    private static final long NUMBER_8L = 8L;\n"));
        assert!(result.content.contains("return NUMBER_8_2 * NUMBER_8_2 + size(NUMBER_8L);"));
    }

    #[test]
    fn skips_interfaces_and_enums() {
        let source = "public interface Api {\n    int LIMIT = 10;\n}\n";
        assert_eq!(fix(source, &[magic(2, 17, "10")]).changes, 0);

        let source = "enum Size {\n    SMALL(10);\n}\n";
        assert_eq!(fix(source, &[magic(2, 11, "10")]).content, source);
    }

    #[test]
    fn helpers_name_and_type_literals() {
        assert_eq!(screaming_snake("maxRetryCount"), "MAX_RETRY_COUNT");
        assert_eq!(screaming_snake("HTTPPort"), "HTTP_PORT");
        assert_eq!(literal_type("10L"), "long");
        assert_eq!(literal_type("0xFF"), "int");
        assert_eq!(literal_type("2.5f"), "float");
        assert_eq!(literal_type("1e3"), "double");
        assert_eq!(literal_type("42"), "int");
    }
}

use super::{Fix, FixContext, Fixer, FixerKind};
use crate::java::scan;
use regex::Regex;
use std::sync::LazyLock;

/// Method or constructor header up to its `(`. Group 1 is the return type,
/// group 2 the name.
pub(crate) const HEADER_PATTERN: &str = concat!(
    r"[ \t]*(?:@[\w$.]+(?:\([^)]*\))?\s+)*",
    r"(?:(?:public|protected|private|static|final|synchronized|abstract|native|default|strictfp)\s+)*",
    r"(?:<[^>{};]*(?:<[^>{};]*>[^>{};]*)*>\s+)?",
    r"(?:([\w$.]+(?:<[^{};()]*>)?(?:\s*\[\s*\])*)\s+)?",
    r"([A-Za-z_$][\w$]*)\s*\(",
);

static DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?m)^{}", HEADER_PATTERN)).unwrap());
pub(crate) static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^[\w$.]+(?:\s*<.*>)?(?:\s*\[\s*\])*(?:\s*\.\.\.\s*|\s+)([A-Za-z_$][\w$]*)(?:\s*\[\s*\])*\s*$",
    )
    .unwrap()
});

const NOT_METHOD_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "synchronized", "try", "return", "new", "throw",
    "else", "do", "case", "assert", "super", "this", "yield",
];
const NOT_RETURN_TYPES: &[&str] = &[
    "return", "new", "else", "throw", "case", "record", "yield", "package", "import", "assert",
];

/// Adds `final` to every parameter of methods and constructors with a body.
pub struct FinalParamsFixer;

impl Fixer for FinalParamsFixer {
    fn kind(&self) -> FixerKind {
        FixerKind::FinalParams
    }

    fn fix(&self, source: &str, _ctx: &FixContext<'_>) -> Fix {
        let regions = scan::classify(source);
        let code = scan::blank_non_code(source, &regions);

        let mut insertions = Vec::new();
        for caps in DECLARATION.captures_iter(&code) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                continue;
            };
            if !is_declaration(caps.get(1).map(|m| m.as_str()), name.as_str()) {
                continue;
            }

            let open = whole.end() - 1;
            let Some(close) = scan::matching_close(&code, &regions, open) else {
                continue;
            };
            if !has_body(&code[close + 1..]) {
                continue;
            }
            if let Some(offsets) = parameter_insertions(&code, &regions, open, close) {
                insertions.extend(offsets);
            }
        }

        if insertions.is_empty() {
            return Fix::unchanged(source);
        }

        insertions.sort_unstable();
        insertions.dedup();
        let mut content = source.to_string();
        for &offset in insertions.iter().rev() {
            content.insert_str(offset, "final ");
        }
        Fix {
            content,
            changes: insertions.len(),
        }
    }
}

/// Rules out control flow, calls through `new` and record headers that
/// [`HEADER_PATTERN`] also matches.
pub(crate) fn is_declaration(return_type: Option<&str>, name: &str) -> bool {
    !NOT_METHOD_NAMES.contains(&name) && !return_type.is_some_and(|ty| NOT_RETURN_TYPES.contains(&ty))
}

/// True when the header is followed by `{`, possibly after a `throws` clause.
pub(crate) fn has_body(after_close: &str) -> bool {
    let rest = after_close.trim_start();
    if rest.starts_with('{') {
        return true;
    }
    if let Some(throws) = rest.strip_prefix("throws") {
        if throws.starts_with(|c: char| c.is_whitespace()) {
            return throws
                .find(['{', ';', '='])
                .is_some_and(|index| throws[index..].starts_with('{'));
        }
    }
    false
}

/// Offsets where `final ` goes, or `None` when the list isn't a parameter
/// list (an enum constant with arguments, say).
fn parameter_insertions(
    code: &str,
    regions: &[scan::Region],
    open: usize,
    close: usize,
) -> Option<Vec<usize>> {
    let parts = scan::split_top_level(code, regions, open + 1, close, b',', true);
    if parts.len() == 1 && code[parts[0].0..parts[0].1].trim().is_empty() {
        return Some(Vec::new());
    }

    let mut offsets = Vec::new();
    for (start, end) in parts {
        let segment = &code[start..end];
        let (type_offset, already_final) = skip_annotations_and_final(segment)?;
        let declaration = &segment[type_offset..];
        let caps = PARAMETER.captures(declaration)?;
        if &caps[1] == "this" || already_final {
            continue;
        }
        offsets.push(start + type_offset);
    }
    Some(offsets)
}

/// Byte offset of the parameter type inside `segment`, and whether a
/// `final` modifier was seen on the way.
pub(crate) fn skip_annotations_and_final(segment: &str) -> Option<(usize, bool)> {
    let bytes = segment.as_bytes();
    let mut index = skip_whitespace(bytes, 0);
    let mut already_final = false;

    loop {
        if bytes.get(index) == Some(&b'@') {
            index += 1;
            while index < bytes.len()
                && (bytes[index].is_ascii_alphanumeric() || matches!(bytes[index], b'_' | b'$' | b'.'))
            {
                index += 1;
            }
            index = skip_whitespace(bytes, index);
            if bytes.get(index) == Some(&b'(') {
                index = skip_parens(bytes, index)?;
                index = skip_whitespace(bytes, index);
            }
        } else if segment[index..].starts_with("final")
            && bytes
                .get(index + 5)
                .is_some_and(|b| b.is_ascii_whitespace())
        {
            already_final = true;
            index = skip_whitespace(bytes, index + 5);
        } else {
            break;
        }
    }

    (index < bytes.len()).then_some((index, already_final))
}

fn skip_whitespace(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && bytes[index].is_ascii_whitespace() {
        index += 1;
    }
    index
}

/// Index just past the parenthesis group opening at `open`.
fn skip_parens(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fix(source: &str) -> Fix {
        FinalParamsFixer.fix(source, &FixContext::new(Path::new("A.java"), &[]))
    }

    #[test]
    fn adds_final_to_method_and_constructor_parameters() {
        let source = "\
public class A {
    public A(String name, int size) {
    }

    @Override
    public <T> List<T> map(@NotNull Map<String, List<T>> values, final int limit, String... rest)
            throws IOException {
        return null;
    }
}
";
        let result = fix(source);
        assert_eq!(result.changes, 4);
        assert!(result.content.contains("public A(final String name, final int size) {"));
        assert!(result.content.contains(
            "map(@NotNull final Map<String, List<T>> values, final int limit, final String... rest)"
        ));
    }

    #[test]
    fn leaves_calls_abstract_methods_and_control_flow_alone() {
        let source = "\
interface Repo {
    User find(Long id);
}
class B {
    void run(int times) {
        if (times > 0) {
            helper(times);
        }
        for (int i = 0; i < times; i++) {
        }
        list.forEach(item -> {
        });
        synchronized (this) {
        }
    }
}
";
        let result = fix(source);
        assert_eq!(result.changes, 1);
        assert!(result.content.contains("void run(final int times) {"));
        assert!(result.content.contains("User find(Long id);"));
        assert!(result.content.contains("helper(times);"));
    }

    #[test]
    fn skips_records_enum_constants_and_comments() {
        let source = "\
public record Point(int x, int y) {
}
enum Size {
    SMALL(1) {
    };
}
// void commented(int x) {
";
        let result = fix(source);
        assert_eq!(result.changes, 0);
        assert_eq!(result.content, source);
    }

    #[test]
    fn is_idempotent() {
        let source = "class C {\n    void a(String s, int[] values) {\n    }\n}\n";
        let once = fix(source);
        assert_eq!(once.changes, 2);
        let twice = fix(&once.content);
        assert_eq!(twice.changes, 0);
        assert_eq!(twice.content, once.content);
    }
}

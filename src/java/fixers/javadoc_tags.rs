use super::final_params::{self, HEADER_PATTERN, PARAMETER};
use super::{indent_of, Fix, FixContext, Fixer, FixerKind, SourceLines};
use crate::java::checkstyle::WarningKind;
use crate::java::scan;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{}", HEADER_PATTERN)).unwrap());

/// How far below a warning the method header may start.
const HEADER_WINDOW: usize = 5;
/// How far above the header the Javadoc may end.
const JAVADOC_WINDOW: usize = 20;
const SIGNATURE_LINES: usize = 15;

/// Block tags in the order Javadoc style checks expect them.
const TAG_ORDER: &[&str] = &[
    "@author",
    "@deprecated",
    "@exception",
    "@param",
    "@return",
    "@see",
    "@serial",
    "@serialData",
    "@serialField",
    "@since",
    "@throws",
    "@version",
];

#[derive(Debug, Clone, PartialEq)]
struct MethodHeader {
    start: usize,
    end: usize,
    params: Vec<String>,
    /// `None` for constructors and `void` methods.
    return_type: Option<String>,
}

#[derive(Debug, Default)]
struct NeededTags {
    params: Vec<String>,
    needs_return: bool,
}

/// Adds the `@param` and `@return` tags Checkstyle reports as missing.
pub struct JavadocTagFixer {
    descriptions: BTreeMap<String, String>,
}

impl JavadocTagFixer {
    pub fn new(descriptions: BTreeMap<String, String>) -> Self {
        Self { descriptions }
    }

    fn param_description(&self, name: &str) -> String {
        if name.starts_with('<') {
            return "the type parameter".to_string();
        }
        let lowered = name.to_lowercase();
        self.descriptions
            .iter()
            .filter(|(key, _)| lowered.contains(&key.to_lowercase()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, description)| description.clone())
            .unwrap_or_else(|| format!("the {}", name))
    }
}

fn return_description(return_type: &str) -> &'static str {
    let base = return_type.split('<').next().unwrap_or(return_type).trim();
    let simple = base.rsplit('.').next().unwrap_or(base);
    if return_type.ends_with("[]")
        || matches!(
            simple,
            "List" | "Set" | "Collection" | "Iterable" | "Stream" | "Page" | "SortedSet"
        )
    {
        "list of results"
    } else if simple.eq_ignore_ascii_case("boolean") {
        "true if the operation succeeds, false otherwise"
    } else if simple.starts_with("Optional") {
        "optional result"
    } else {
        "the result"
    }
}

impl Fixer for JavadocTagFixer {
    fn kind(&self) -> FixerKind {
        FixerKind::JavadocTags
    }

    fn fix(&self, source: &str, ctx: &FixContext<'_>) -> Fix {
        let mut lines = SourceLines::parse(source);

        let mut wanted: HashMap<usize, (MethodHeader, NeededTags)> = HashMap::new();
        for warning in ctx.warnings {
            let index = warning.line.saturating_sub(1);
            let (param, needs_return) = match &warning.kind {
                WarningKind::MissingParamTag { name } => (Some(name.clone()), false),
                WarningKind::MissingReturnTag => (None, true),
                _ => continue,
            };
            let Some(header) = locate_method(&lines.lines, index) else {
                tracing::debug!(
                    "No method header near {}:{}",
                    ctx.path.display(),
                    warning.line
                );
                continue;
            };

            let entry = wanted
                .entry(header.start)
                .or_insert_with(|| (header, NeededTags::default()));
            if let Some(name) = param {
                if !entry.1.params.contains(&name) {
                    entry.1.params.push(name);
                }
            }
            entry.1.needs_return |= needs_return;
        }

        let mut edits = Vec::new();
        for (header, needed) in wanted.values() {
            let Some((start, end)) = find_javadoc(&lines.lines, header.start) else {
                continue;
            };
            if let Some((replacement, added)) =
                self.rewrite_javadoc(&lines.lines[start..=end], header, needed)
            {
                edits.push((start, end, replacement, added));
            }
        }

        if edits.is_empty() {
            return Fix::unchanged(source);
        }

        edits.sort_by(|a, b| b.0.cmp(&a.0));
        edits.dedup_by_key(|edit| edit.0);
        let mut changes = 0;
        for (start, end, replacement, added) in edits {
            lines.lines.splice(start..=end, replacement);
            changes += added;
        }

        Fix {
            content: lines.render(),
            changes,
        }
    }
}

impl JavadocTagFixer {
    fn rewrite_javadoc(
        &self,
        block: &[String],
        header: &MethodHeader,
        needed: &NeededTags,
    ) -> Option<(Vec<String>, usize)> {
        let doc = JavadocBlock::parse(block)?;

        let mut ordered: Vec<&String> = header
            .params
            .iter()
            .filter(|param| needed.params.contains(param))
            .collect();
        ordered.extend(
            needed
                .params
                .iter()
                .filter(|name| name.starts_with('<') && !header.params.contains(name)),
        );

        let mut new_tags: Vec<(&'static str, String)> = ordered
            .into_iter()
            .filter(|name| !doc.has_param(name))
            .map(|name| {
                (
                    "@param",
                    format!("@param {} {}", name, self.param_description(name)),
                )
            })
            .collect();

        if needed.needs_return && !doc.has_tag("@return") {
            if let Some(return_type) = &header.return_type {
                new_tags.push((
                    "@return",
                    format!("@return {}", return_description(return_type)),
                ));
            }
        }

        if new_tags.is_empty() {
            return None;
        }
        let added = new_tags.len();
        Some((doc.render_with(new_tags), added))
    }
}

/// A Javadoc comment split into description lines and block tags.
struct JavadocBlock {
    indent: String,
    description: Vec<String>,
    /// Each tag's lines, first line first.
    tags: Vec<Vec<String>>,
}

impl JavadocBlock {
    fn parse(block: &[String]) -> Option<Self> {
        let first = block.first()?;
        let indent = indent_of(first).to_string();

        let mut body: Vec<String> = Vec::new();
        if block.len() == 1 {
            let inner = first.trim().strip_prefix("/**")?.strip_suffix("*/")?.trim();
            if !inner.is_empty() {
                body.push(format!("{} * {}", indent, inner));
            }
        } else {
            let opener = first.trim().strip_prefix("/**")?.trim();
            if !opener.is_empty() {
                body.push(format!("{} * {}", indent, opener));
            }
            body.extend(block[1..block.len() - 1].iter().cloned());

            let last = block.last()?;
            let before_close = last.trim().strip_suffix("*/")?.trim_start_matches('*').trim();
            if !before_close.is_empty() {
                body.push(format!("{} * {}", indent, before_close));
            }
        }

        let mut description = Vec::new();
        let mut tags: Vec<Vec<String>> = Vec::new();
        for line in body {
            if tag_name(&line).is_some() {
                tags.push(vec![line]);
            } else if let Some(tag) = tags.last_mut() {
                tag.push(line);
            } else {
                description.push(line);
            }
        }

        Some(Self {
            indent,
            description,
            tags,
        })
    }

    fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag_name(&tag[0]) == Some(name))
    }

    fn has_param(&self, param: &str) -> bool {
        self.tags.iter().any(|tag| {
            let content = content_of(&tag[0]);
            let mut words = content.split_whitespace();
            words.next() == Some("@param") && words.next() == Some(param)
        })
    }

    fn render_with(mut self, new_tags: Vec<(&'static str, String)>) -> Vec<String> {
        let had_tags = !self.tags.is_empty();
        for (name, text) in new_tags {
            let position = insertion_point(&self.tags, name);
            self.tags
                .insert(position, vec![format!("{} * {}", self.indent, text)]);
        }

        let mut out = vec![format!("{}/**", self.indent)];
        let has_text = self.description.iter().any(|line| !content_of(line).is_empty());
        let ends_blank = self
            .description
            .last()
            .is_some_and(|line| content_of(line).is_empty());
        out.append(&mut self.description);
        if !had_tags && has_text && !ends_blank {
            out.push(format!("{} *", self.indent));
        }
        out.extend(self.tags.into_iter().flatten());
        out.push(format!("{} */", self.indent));
        out
    }
}

/// Index in `tags` where a new `name` tag goes: after the last tag of the
/// same name, else before the first tag that sorts after it.
fn insertion_point(tags: &[Vec<String>], name: &str) -> usize {
    if let Some(last_same) = tags.iter().rposition(|tag| tag_name(&tag[0]) == Some(name)) {
        return last_same + 1;
    }
    let rank = tag_rank(name);
    tags.iter()
        .position(|tag| tag_name(&tag[0]).map(tag_rank).unwrap_or(usize::MAX) > rank)
        .unwrap_or(tags.len())
}

fn tag_rank(name: &str) -> usize {
    TAG_ORDER
        .iter()
        .position(|tag| *tag == name)
        .unwrap_or(TAG_ORDER.len())
}

/// Javadoc line text with the leading `*` and whitespace removed.
fn content_of(line: &str) -> &str {
    line.trim().trim_start_matches('*').trim()
}

fn tag_name(line: &str) -> Option<&str> {
    let content = content_of(line);
    content
        .starts_with('@')
        .then(|| content.split_whitespace().next())
        .flatten()
}

/// The method whose header starts near `index`. A warning may point at the
/// Javadoc, the header line or a parameter on a continuation line.
fn locate_method(lines: &[String], index: usize) -> Option<MethodHeader> {
    let mut from = index;
    if let Some(line) = lines.get(index) {
        let trimmed = line.trim_start();
        if trimmed.starts_with("/**") || trimmed.starts_with('*') {
            let close = (index..lines.len()).find(|&i| lines[i].contains("*/"))?;
            from = close + 1;
        }
    }

    for start in from..lines.len().min(from + HEADER_WINDOW + 1) {
        if let Some(header) = parse_header(lines, start) {
            return Some(header);
        }
    }
    (index.saturating_sub(HEADER_WINDOW)..index)
        .rev()
        .filter_map(|start| parse_header(lines, start))
        .find(|header| header.end >= index)
}

fn parse_header(lines: &[String], start: usize) -> Option<MethodHeader> {
    let caps = HEADER.captures(&lines[start])?;
    let name = caps.get(2)?.as_str();
    let return_type = caps.get(1).map(|m| m.as_str());
    if !final_params::is_declaration(return_type, name) {
        return None;
    }
    if return_type.is_none() && !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }

    let open = caps.get(0)?.end() - 1;
    let stop = lines.len().min(start + SIGNATURE_LINES);
    let joined = lines[start..stop].join("\n");
    let regions = scan::classify(&joined);
    let code = scan::blank_non_code(&joined, &regions);
    let close = scan::matching_close(&code, &regions, open)?;

    let after = code[close + 1..].trim_start();
    if !(after.starts_with('{') || after.starts_with(';') || final_params::has_body(&code[close + 1..]))
        && !after.starts_with("throws")
    {
        return None;
    }

    let mut params = Vec::new();
    for (s, e) in scan::split_top_level(&code, &regions, open + 1, close, b',', true) {
        let segment = &code[s..e];
        if segment.trim().is_empty() {
            continue;
        }
        let (offset, _) = final_params::skip_annotations_and_final(segment)?;
        let caps = PARAMETER.captures(&segment[offset..])?;
        params.push(caps[1].to_string());
    }

    let return_type = return_type
        .filter(|ty| *ty != "void")
        .map(|ty| ty.to_string());
    let end = start + code[..close].matches('\n').count();

    Some(MethodHeader {
        start,
        end,
        params,
        return_type,
    })
}

/// `(start, end)` lines of the Javadoc directly above the header at `header`,
/// skipping annotations and blank lines.
fn find_javadoc(lines: &[String], header: usize) -> Option<(usize, usize)> {
    let lowest = header.saturating_sub(JAVADOC_WINDOW);
    let mut index = header;
    while index > lowest {
        index -= 1;
        let trimmed = lines[index].trim();
        if trimmed.ends_with("*/") {
            let start = (lowest..=index).rev().find(|&i| lines[i].contains("/**"))?;
            return Some((start, index));
        }
        if trimmed.ends_with(';') || trimmed.ends_with('{') || trimmed.ends_with('}') {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::java::checkstyle::Warning;
    use std::path::Path;

    fn warning(line: usize, message: &str) -> Warning {
        Warning::parse_line(
            &format!("[WARN] /src/A.java:{}: {} [JavadocMethod]", line, message),
            Path::new("/"),
        )
        .unwrap()
    }

    fn fix(source: &str, warnings: &[Warning]) -> Fix {
        let refs: Vec<&Warning> = warnings.iter().collect();
        let mut descriptions = BTreeMap::new();
        descriptions.insert("id".to_string(), "the identifier".to_string());
        JavadocTagFixer::new(descriptions).fix(source, &FixContext::new(Path::new("/src/A.java"), &refs))
    }

    #[test]
    fn adds_params_in_declaration_order_then_return() {
        let source = "\
class A {
    /**
     * Finds orders.
     */
    @GetMapping
    public List<Order> find(Long userId, String status) {
        return null;
    }
}
";
        let warnings = vec![
            warning(6, "Expected @param tag for 'status'."),
            warning(6, "Expected @param tag for 'userId'."),
            warning(2, "@return tag should be present and have description."),
        ];
        let result = fix(source, &warnings);
        assert_eq!(result.changes, 3);
        assert_eq!(
            result.content,
            "\
class A {
    /**
     * Finds orders.
     *
     * @param userId the identifier
     * @param status the status
     * @return list of results
     */
    @GetMapping
    public List<Order> find(Long userId, String status) {
        return null;
    }
}
"
        );
    }

    #[test]
    fn expands_single_line_javadoc_and_places_return_before_throws() {
        let source = "    /** Checks access. */
    boolean allowed(String role) throws AuthException {
        return true;
    }
";
        let warnings = vec![
            warning(2, "Expected @param tag for 'role'."),
            warning(2, "@return tag should be present and have description."),
        ];
        let result = fix(source, &warnings);
        assert_eq!(
            result.content,
            "    /**
     * Checks access.
     *
     * @param role the role
     * @return true if the operation succeeds, false otherwise
     */
    boolean allowed(String role) throws AuthException {
        return true;
    }
"
        );

        let with_throws = "    /**
     * Saves.
     *
     * @throws IOException on failure
     */
    Optional<User> save(User user) throws IOException {
        return null;
    }
";
        let result = fix(with_throws, &[warning(6, "@return tag should be present and have description.")]);
        assert!(result.content.contains(
            "     * @return optional result\n     * @throws IOException on failure\n"
        ));
    }

    #[test]
    fn never_duplicates_tags_or_documents_void_and_constructors() {
        let source = "    /**
     * Creates it.
     *
     * @param name the name
     */
    public Widget(String name) {
    }

    /**
     * Runs.
     */
    void run() {
    }
";
        let warnings = vec![
            warning(6, "Expected @param tag for 'name'."),
            warning(6, "@return tag should be present and have description."),
            warning(12, "@return tag should be present and have description."),
        ];
        let result = fix(source, &warnings);
        assert_eq!(result.changes, 0);
        assert_eq!(result.content, source);
    }

    #[test]
    fn parameter_on_continuation_line_finds_its_method() {
        let source = "    /**
     * Moves funds.
     */
    public void transfer(Account from,
            Account to) {
    }
";
        let result = fix(source, &[warning(5, "Expected @param tag for 'to'.")]);
        assert!(result.content.contains("     * @param to the to\n"));
        assert_eq!(result.changes, 1);
    }
}

use super::{Fix, FixContext, Fixer, FixerKind};
use crate::java::scan::{self, Region};

/// Ends every Javadoc summary with a period.
pub struct JavadocPeriodFixer;

impl Fixer for JavadocPeriodFixer {
    fn kind(&self) -> FixerKind {
        FixerKind::JavadocPeriod
    }

    fn fix(&self, source: &str, _ctx: &FixContext<'_>) -> Fix {
        let regions = scan::classify(source);
        let mut insertions: Vec<usize> = javadoc_blocks(source, &regions)
            .into_iter()
            .filter_map(|(start, end)| period_insertion(source, start, end))
            .collect();

        if insertions.is_empty() {
            return Fix::unchanged(source);
        }

        insertions.sort_unstable();
        let mut content = source.to_string();
        for &offset in insertions.iter().rev() {
            content.insert(offset, '.');
        }
        Fix {
            content,
            changes: insertions.len(),
        }
    }
}

/// `(start, end)` byte ranges of `/** ... */` comments.
pub(crate) fn javadoc_blocks(source: &str, regions: &[Region]) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    let mut index = 0;
    while index < regions.len() {
        if regions[index] != Region::BlockComment {
            index += 1;
            continue;
        }
        let start = index;
        while index < regions.len() && regions[index] == Region::BlockComment {
            index += 1;
        }
        let text = &source[start..index];
        if text.starts_with("/**") && !text.starts_with("/**/") && text.ends_with("*/") && text.len() >= 5 {
            blocks.push((start, index));
        }
    }
    blocks
}

/// Where the missing period of the block `source[start..end]` goes, if any.
fn period_insertion(source: &str, start: usize, end: usize) -> Option<usize> {
    let body_start = start + 3;
    let body_end = end - 2;
    let body = &source[body_start..body_end];

    // (absolute end of trimmed content, content) for each summary line
    let mut summary: Vec<(usize, &str)> = Vec::new();
    let mut offset = body_start;
    for raw in body.split('\n') {
        let line_start = offset;
        offset += raw.len() + 1;

        let trimmed_start = raw.trim_start();
        let without_star = trimmed_start.trim_start_matches('*');
        let content = without_star.trim();
        if content.starts_with('@') {
            break;
        }
        if content.is_empty() {
            if summary.is_empty() {
                continue;
            }
            break;
        }

        let lead = raw.len() - without_star.len() + (without_star.len() - without_star.trim_start().len());
        let content_end = line_start + lead + content.len();
        summary.push((content_end, content));
    }

    let (last_end, last_line) = *summary.last()?;
    let text = summary
        .iter()
        .map(|(_, content)| *content)
        .collect::<Vec<_>>()
        .join(" ");

    if text.contains("{@inheritDoc}") {
        return None;
    }
    // Closing quotes and parentheses may follow the terminator.
    let last = last_line.trim_end_matches(['"', '\'', ')']);
    if last.ends_with(['.', '?', '!']) || last_line.ends_with([':', ',', ';', '>']) {
        return None;
    }
    Some(last_end)
}

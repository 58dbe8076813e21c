use super::{indent_of, Fix, FixContext, Fixer, FixerKind, SourceLines};
use crate::java::checkstyle::WarningKind;
use crate::java::scan::{self, Region};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static CONDITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\}\s*)?(?:else\s+)?(?:if|while)\s*\(").unwrap());

/// Passes over pieces that are still too long after the first split.
const EXTRA_PASSES: usize = 2;
const MIN_ARGUMENT_LIST: usize = 30;

/// Splits the lines Checkstyle reports as too long.
pub struct LongLineFixer {
    max: usize,
    continuation: usize,
}

impl LongLineFixer {
    pub fn new(max: usize, continuation: usize) -> Self {
        Self { max, continuation }
    }

    /// `in_block_comment` is whether the line's first non-blank byte lies
    /// inside a `/* */` comment of the whole file.
    fn split(&self, line: &str, in_block_comment: bool) -> Option<Vec<String>> {
        let mut pieces = self.split_once(line, in_block_comment)?;
        for _ in 0..EXTRA_PASSES {
            let mut progressed = false;
            let mut next = Vec::with_capacity(pieces.len());
            for piece in pieces {
                if width(&piece) > self.max {
                    if let Some(parts) = self.split_once(&piece, in_block_comment) {
                        next.extend(parts);
                        progressed = true;
                        continue;
                    }
                }
                next.push(piece);
            }
            pieces = next;
            if !progressed {
                break;
            }
        }
        Some(pieces)
    }

    fn split_once(&self, line: &str, in_block_comment: bool) -> Option<Vec<String>> {
        let indent = indent_of(line);
        let body = &line[indent.len()..];
        let cont = format!("{}{}", indent, " ".repeat(self.continuation));

        if in_block_comment {
            let (marker, text) = match body.strip_prefix('*') {
                Some(_) if body.starts_with("*/") => return None,
                Some(_) => ("* ", body.trim_start_matches('*').trim_start()),
                None => ("", body),
            };
            return self.wrap_words(&format!("{}{}", indent, marker), text);
        }
        if let Some(pieces) = self.wrap_comment(indent, body) {
            return Some(pieces);
        }

        let regions = scan::classify(body);
        if is_lone_literal(body, &regions) {
            return None;
        }

        let strategies = [
            Self::split_condition,
            Self::split_concatenation,
            Self::split_chain,
            Self::split_arguments,
            Self::split_assignment,
            Self::split_fallback,
        ];
        let original = width(line);
        strategies
            .iter()
            .filter_map(|strategy| strategy(self, indent, &cont, body, &regions))
            .find(|pieces| pieces.len() > 1 && pieces.iter().all(|p| width(p) < original))
    }

    /// Rewraps a `//` comment line, or moves a trailing `//` comment above
    /// its code.
    fn wrap_comment(&self, indent: &str, body: &str) -> Option<Vec<String>> {
        if let Some(text) = body.strip_prefix("//") {
            return self.wrap_words(&format!("{}// ", indent), text.trim_start());
        }

        let regions = scan::classify(body);
        let start = regions.iter().position(|r| *r == Region::LineComment)?;
        let code = body[..start].trim_end();
        if code.is_empty() || width(indent) + width(code) > self.max {
            return None;
        }
        let comment = body[start + 2..].trim();
        let mut pieces = self
            .wrap_words(&format!("{}// ", indent), comment)
            .unwrap_or_else(|| vec![format!("{}// {}", indent, comment)]);
        pieces.push(format!("{}{}", indent, code));
        Some(pieces)
    }

    fn wrap_words(&self, prefix: &str, text: &str) -> Option<Vec<String>> {
        let room = self.max.saturating_sub(width(prefix)).max(20);
        let mut pieces = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            if !current.is_empty() && width(&current) + 1 + width(word) > room {
                pieces.push(format!("{}{}", prefix, current));
                current.clear();
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            pieces.push(format!("{}{}", prefix, current));
        }
        (pieces.len() > 1).then_some(pieces)
    }

    /// Breaks an `if`/`while` condition before its top-level `&&` and `||`.
    fn split_condition(
        &self,
        indent: &str,
        cont: &str,
        body: &str,
        regions: &[Region],
    ) -> Option<Vec<String>> {
        let code = scan::blank_non_code(body, regions);
        let open = CONDITION.find(&code)?.end() - 1;
        let close = scan::matching_close(body, regions, open).unwrap_or(body.len());
        let depth = scan::depths(body, regions, false);
        let inner = depth[open] + 1;

        let mut ops: Vec<usize> = scan::code_matches(body, regions, "&&")
            .into_iter()
            .chain(scan::code_matches(body, regions, "||"))
            .filter(|&p| p > open && p < close && depth[p] == inner)
            .collect();
        ops.sort_unstable();
        self.pack_at(indent, cont, body, &ops, " ")
    }

    /// Breaks string concatenation before its shallowest `+` operators.
    fn split_concatenation(
        &self,
        indent: &str,
        cont: &str,
        body: &str,
        regions: &[Region],
    ) -> Option<Vec<String>> {
        if !regions.contains(&Region::Str) {
            return None;
        }
        let bytes = body.as_bytes();
        let plus: Vec<usize> = scan::code_matches(body, regions, "+")
            .into_iter()
            .filter(|&p| {
                let next = bytes.get(p + 1).copied();
                let prev = p.checked_sub(1).map(|i| bytes[i]);
                next != Some(b'+') && next != Some(b'=') && prev != Some(b'+') && is_operand_end(body, p)
            })
            .collect();
        let ops = shallowest(body, regions, plus);
        self.pack_at(indent, cont, body, &ops, " ")
    }

    /// Breaks a method chain before each `.` that follows a call.
    fn split_chain(
        &self,
        indent: &str,
        cont: &str,
        body: &str,
        regions: &[Region],
    ) -> Option<Vec<String>> {
        let hops: Vec<usize> = scan::code_matches(body, regions, ".")
            .into_iter()
            .filter(|&p| body[..p].trim_end().ends_with(')'))
            .collect();
        let hops = shallowest(body, regions, hops);
        if hops.len() < 2 {
            return None;
        }
        self.pack_at(indent, cont, body, &hops, "")
    }

    /// Puts each argument of the longest argument list on its own line.
    fn split_arguments(
        &self,
        indent: &str,
        cont: &str,
        body: &str,
        regions: &[Region],
    ) -> Option<Vec<String>> {
        let (open, close) = scan::code_matches(body, regions, "(")
            .into_iter()
            .filter_map(|open| {
                scan::matching_close(body, regions, open).map(|close| (open, close))
            })
            .filter(|(open, close)| close - open - 1 > MIN_ARGUMENT_LIST)
            .max_by_key(|(open, close)| close - open)?;

        let args = scan::split_top_level(body, regions, open + 1, close, b',', false);
        if args.len() < 2 {
            return None;
        }

        let mut pieces = vec![format!("{}{}", indent, body[..=open].trim_end())];
        let last = args.len() - 1;
        for (index, (start, end)) in args.into_iter().enumerate() {
            let arg = body[start..end].trim();
            if index == last {
                pieces.push(format!("{}{}{}", cont, arg, &body[close..]));
            } else {
                pieces.push(format!("{}{},", cont, arg));
            }
        }
        Some(pieces)
    }

    /// Breaks after the first top-level `=`.
    fn split_assignment(
        &self,
        indent: &str,
        cont: &str,
        body: &str,
        regions: &[Region],
    ) -> Option<Vec<String>> {
        let bytes = body.as_bytes();
        let depth = scan::depths(body, regions, false);
        let position = scan::code_matches(body, regions, "=").into_iter().find(|&p| {
            let prev = p.checked_sub(1).map(|i| bytes[i]);
            let next = bytes.get(p + 1).copied();
            depth[p] == 0
                && next != Some(b'=')
                && !prev.is_some_and(|b| b"=<>!+-*/%&|^".contains(&b))
        })?;

        let lhs = body[..=position].trim_end();
        let rhs = body[position + 1..].trim();
        if rhs.is_empty() {
            return None;
        }
        Some(vec![format!("{}{}", indent, lhs), format!("{}{}", cont, rhs)])
    }

    /// Breaks at the last space or comma in code that keeps the head within
    /// the limit.
    fn split_fallback(
        &self,
        indent: &str,
        cont: &str,
        body: &str,
        regions: &[Region],
    ) -> Option<Vec<String>> {
        let room = self.max.saturating_sub(width(indent));
        let limit = body
            .char_indices()
            .nth(room)
            .map(|(index, _)| index)
            .unwrap_or(body.len());
        let bytes = body.as_bytes();

        let position = (1..limit.min(bytes.len()))
            .rev()
            .find(|&p| regions[p].is_code() && matches!(bytes[p], b' ' | b','))?;
        let (head, rest) = if bytes[position] == b',' {
            (&body[..=position], &body[position + 1..])
        } else {
            (&body[..position], &body[position + 1..])
        };
        let head = head.trim_end();
        let rest = rest.trim_start();
        if head.is_empty() || rest.is_empty() {
            return None;
        }
        Some(vec![format!("{}{}", indent, head), format!("{}{}", cont, rest)])
    }

    /// Splits `body` before each offset in `breaks` and packs the segments
    /// greedily into lines that fit.
    fn pack_at(
        &self,
        indent: &str,
        cont: &str,
        body: &str,
        breaks: &[usize],
        joiner: &str,
    ) -> Option<Vec<String>> {
        let first = *breaks.first()?;
        let head = body[..first].trim_end();
        if head.is_empty() {
            return None;
        }

        let mut bounds: Vec<usize> = breaks.to_vec();
        bounds.push(body.len());
        let mut pieces = Vec::new();
        let mut current = format!("{}{}", indent, head);
        for window in bounds.windows(2) {
            let segment = body[window[0]..window[1]].trim();
            if width(&current) + joiner.len() + width(segment) <= self.max {
                current.push_str(joiner);
                current.push_str(segment);
            } else {
                pieces.push(current);
                current = format!("{}{}", cont, segment);
            }
        }
        pieces.push(current);
        (pieces.len() > 1).then_some(pieces)
    }
}

impl Fixer for LongLineFixer {
    fn kind(&self) -> FixerKind {
        FixerKind::LongLines
    }

    fn fix(&self, source: &str, ctx: &FixContext<'_>) -> Fix {
        let targets: BTreeSet<usize> = ctx
            .warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::LineLength { .. }))
            .map(|w| w.line.saturating_sub(1))
            .collect();
        if targets.is_empty() {
            return Fix::unchanged(source);
        }

        let regions = scan::classify(source);
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        let mut lines = SourceLines::parse(source);
        let mut changes = 0;
        for &index in targets.iter().rev() {
            let Some(line) = lines.lines.get(index) else {
                continue;
            };
            if width(line) <= self.max {
                continue;
            }
            let in_block_comment = line_starts
                .get(index)
                .and_then(|start| regions.get(start + indent_of(line).len()))
                .is_some_and(|region| *region == Region::BlockComment);
            match self.split(line, in_block_comment) {
                Some(pieces) => {
                    lines.lines.splice(index..=index, pieces);
                    changes += 1;
                }
                None => tracing::debug!("Could not split {}:{}", ctx.path.display(), index + 1),
            }
        }

        if changes == 0 {
            return Fix::unchanged(source);
        }
        Fix {
            content: lines.render(),
            changes,
        }
    }
}

fn width(text: &str) -> usize {
    text.chars().count()
}

/// A line that is nothing but a string literal, give or take punctuation.
fn is_lone_literal(body: &str, regions: &[Region]) -> bool {
    let has_literal = regions
        .iter()
        .any(|r| matches!(r, Region::Str | Region::TextBlock));
    has_literal
        && body
            .bytes()
            .zip(regions)
            .filter(|(_, region)| region.is_code())
            .all(|(byte, _)| byte.is_ascii_whitespace() || b",;+)".contains(&byte))
}

/// True when the `+` at `position` follows an operand, which rules out unary plus.
fn is_operand_end(body: &str, position: usize) -> bool {
    body[..position]
        .trim_end()
        .bytes()
        .last()
        .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'"' | b'\'' | b')' | b']' | b'_'))
}

/// The offsets at the smallest bracket depth among `positions`.
fn shallowest(body: &str, regions: &[Region], positions: Vec<usize>) -> Vec<usize> {
    let depth = scan::depths(body, regions, false);
    let Some(min) = positions.iter().map(|&p| depth[p]).min() else {
        return Vec::new();
    };
    positions.into_iter().filter(|&p| depth[p] == min).collect()
}

//! Byte-level classification of Java source text.
//!
//! The fixers never parse Java. They only need to know whether a byte is
//! code, a comment or a literal, and how deeply it is nested in brackets.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Code,
    LineComment,
    BlockComment,
    Str,
    TextBlock,
    Char,
}

impl Region {
    pub fn is_code(self) -> bool {
        self == Region::Code
    }
}

/// Region of every byte in `source`.
pub fn classify(source: &str) -> Vec<Region> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut regions = vec![Region::Code; len];
    let mut i = 0;

    while i < len {
        let rest = &bytes[i..];
        if rest.starts_with(b"//") {
            let end = find_byte(bytes, i, b'\n').unwrap_or(len);
            regions[i..end].fill(Region::LineComment);
            i = end;
        } else if rest.starts_with(b"/*") {
            let end = find_seq(bytes, i + 2, b"*/").map(|p| p + 2).unwrap_or(len);
            regions[i..end].fill(Region::BlockComment);
            i = end;
        } else if rest.starts_with(b"\"\"\"") {
            let end = literal_end(bytes, i + 3, b"\"\"\"", true).unwrap_or(len);
            regions[i..end].fill(Region::TextBlock);
            i = end;
        } else if bytes[i] == b'"' {
            let end = literal_end(bytes, i + 1, b"\"", false).unwrap_or(len);
            regions[i..end].fill(Region::Str);
            i = end;
        } else if bytes[i] == b'\'' {
            let end = literal_end(bytes, i + 1, b"'", false).unwrap_or(len);
            regions[i..end].fill(Region::Char);
            i = end;
        } else {
            i += 1;
        }
    }

    regions
}

/// Bracket depth of every byte. An opening bracket sits at the outer depth,
/// its contents one deeper and its closing bracket at the outer depth again.
/// Brackets inside comments and literals are ignored.
pub fn depths(source: &str, regions: &[Region], angle: bool) -> Vec<i32> {
    let mut depth = 0i32;
    source
        .bytes()
        .zip(regions)
        .map(|(byte, region)| {
            if !region.is_code() {
                return depth;
            }
            if is_open(byte, angle) {
                let current = depth;
                depth += 1;
                current
            } else if is_close(byte, angle) {
                depth -= 1;
                depth
            } else {
                depth
            }
        })
        .collect()
}

/// Index of the bracket closing the one at `open`.
pub fn matching_close(source: &str, regions: &[Region], open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let opener = *bytes.get(open)?;
    let closer = match opener {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        b'<' => b'>',
        _ => return None,
    };

    let mut depth = 0usize;
    for index in open..bytes.len() {
        if !regions[index].is_code() {
            continue;
        }
        let byte = bytes[index];
        if byte == opener {
            depth += 1;
        } else if byte == closer {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
    }
    None
}

/// Ranges of `source[start..end]` separated by `separator` at the nesting
/// level of `start`. With `angle`, `<...>` counts as nesting (for generics).
pub fn split_top_level(
    source: &str,
    regions: &[Region],
    start: usize,
    end: usize,
    separator: u8,
    angle: bool,
) -> Vec<(usize, usize)> {
    let bytes = source.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut part_start = start;

    for index in start..end {
        if !regions[index].is_code() {
            continue;
        }
        let byte = bytes[index];
        if is_open(byte, angle) {
            depth += 1;
        } else if is_close(byte, angle) {
            depth -= 1;
        } else if byte == separator && depth == 0 {
            parts.push((part_start, index));
            part_start = index + 1;
        }
    }
    parts.push((part_start, end));
    parts
}

/// Byte offsets of `needle` that lie entirely in code.
pub fn code_matches(source: &str, regions: &[Region], needle: &str) -> Vec<usize> {
    source
        .match_indices(needle)
        .map(|(index, _)| index)
        .filter(|&index| regions[index..index + needle.len()].iter().all(|r| r.is_code()))
        .collect()
}

/// Copy of `text` with every non-code byte replaced by a space, so byte
/// offsets stay valid.
pub fn blank_non_code(text: &str, regions: &[Region]) -> String {
    let bytes: Vec<u8> = text
        .bytes()
        .zip(regions)
        .map(|(byte, region)| if region.is_code() { byte } else { b' ' })
        .collect();
    // Comment and literal bytes are replaced wholesale, so multi-byte
    // characters are either kept intact or fully blanked.
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn is_open(byte: u8, angle: bool) -> bool {
    matches!(byte, b'(' | b'[' | b'{') || (angle && byte == b'<')
}

fn is_close(byte: u8, angle: bool) -> bool {
    matches!(byte, b')' | b']' | b'}') || (angle && byte == b'>')
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|p| p + from)
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|p| p + from)
}

/// End (exclusive) of a literal whose body starts at `from`. Single-line
/// literals stop at a newline.
fn literal_end(bytes: &[u8], from: usize, terminator: &[u8], multiline: bool) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if !multiline => return Some(i),
            _ if bytes[i..].starts_with(terminator) => return Some(i + terminator.len()),
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_comments_and_literals() {
        let source = "int a = 1; // note\nString s = \"x // y\"; /* c */ char c = '\"';";
        let regions = classify(source);

        let note = source.find("note").unwrap();
        assert_eq!(regions[note], Region::LineComment);

        let inside_string = source.find("x // y").unwrap() + 2;
        assert_eq!(regions[inside_string], Region::Str);

        let block = source.find("/* c */").unwrap() + 3;
        assert_eq!(regions[block], Region::BlockComment);

        let quote_char = source.rfind('"').unwrap();
        assert_eq!(regions[quote_char], Region::Char);

        let semicolon = source.rfind(';').unwrap();
        assert_eq!(regions[semicolon], Region::Code);
    }

    #[test]
    fn escaped_quotes_stay_inside_strings() {
        let source = r#"s = "a\"b"; t = 1;"#;
        let regions = classify(source);
        let t = source.find('t').unwrap();
        assert_eq!(regions[t], Region::Code);
        assert_eq!(regions[source.find('b').unwrap()], Region::Str);
    }

    #[test]
    fn text_blocks_span_lines() {
        let source = "String s = \"\"\"\n  a \"quoted\"\n  \"\"\";\nint x;";
        let regions = classify(source);
        assert_eq!(regions[source.find("quoted").unwrap()], Region::TextBlock);
        assert_eq!(regions[source.find("int").unwrap()], Region::Code);
    }

    #[test]
    fn brackets_in_literals_do_not_count() {
        let source = r#"foo(")", bar(1), '(')"#;
        let regions = classify(source);
        assert_eq!(matching_close(source, &regions, 3), Some(source.len() - 1));

        let parts = split_top_level(source, &regions, 4, source.len() - 1, b',', false);
        let texts: Vec<&str> = parts.iter().map(|(s, e)| source[*s..*e].trim()).collect();
        assert_eq!(texts, vec![r#"")""#, "bar(1)", "'('"]);
    }

    #[test]
    fn generics_split_with_angle_nesting() {
        let source = "Map<String, Integer> a, List<int[]> b";
        let regions = classify(source);
        let parts = split_top_level(source, &regions, 0, source.len(), b',', true);
        assert_eq!(parts.len(), 2);
        assert_eq!(&source[parts[1].0..parts[1].1], " List<int[]> b");
    }

    #[test]
    fn depth_tracks_nesting() {
        let source = "a(b[c])";
        let regions = classify(source);
        let depth = depths(source, &regions, false);
        assert_eq!(depth, vec![0, 0, 1, 1, 2, 1, 0]);
    }

    #[test]
    fn code_matches_skip_comments() {
        let source = "a && b // && c\n&& d";
        let regions = classify(source);
        assert_eq!(code_matches(source, &regions, "&&").len(), 2);
        assert_eq!(
            blank_non_code(source, &regions),
            format!("a && b {}\n&& d", " ".repeat(7))
        );
    }
}

use super::{Fix, FixContext, Fixer, FixerKind, SourceLines};

/// Strips trailing spaces and tabs and makes sure the file ends with a newline.
pub struct TrailingWhitespaceFixer;

impl Fixer for TrailingWhitespaceFixer {
    fn kind(&self) -> FixerKind {
        FixerKind::TrailingWhitespace
    }

    fn fix(&self, source: &str, _ctx: &FixContext<'_>) -> Fix {
        if source.is_empty() {
            return Fix::unchanged(source);
        }

        let mut lines = SourceLines::parse(source);
        let mut changes = 0;
        for line in &mut lines.lines {
            let trimmed_len = line.trim_end_matches([' ', '\t']).len();
            if trimmed_len != line.len() {
                line.truncate(trimmed_len);
                changes += 1;
            }
        }
        if !source.ends_with('\n') {
            lines.set_trailing_newline();
            changes += 1;
        }

        Fix {
            content: lines.render(),
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn fix(source: &str) -> Fix {
        TrailingWhitespaceFixer.fix(source, &FixContext::new(Path::new("A.java"), &[]))
    }

    #[test]
    fn strips_trailing_blanks_and_adds_final_newline() {
        let result = fix("class A {  \n\tint x;\t\n}");
        assert_eq!(result.content, "class A {\n\tint x;\n}\n");
        assert_eq!(result.changes, 3);
    }

    #[test]
    fn clean_file_is_untouched() {
        let result = fix("class A {\r\n}\r\n");
        assert_eq!(result.content, "class A {\r\n}\r\n");
        assert_eq!(result.changes, 0);
    }
}

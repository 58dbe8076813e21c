use super::{Fix, FixContext, Fixer, FixerKind, SourceLines};
use crate::config::toml_config::ImportRules;
use crate::java::scan;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};

static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^import\s+(static\s+)?([\w$]+(?:\.[\w$]+)*(?:\.\*)?)\s*;$").unwrap()
});
static PACKAGE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*package\s+([\w$.]+)\s*;").unwrap());
static TYPE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][\w$]*").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Import {
    is_static: bool,
    path: String,
}

impl Import {
    fn parse(line: &str) -> Option<Self> {
        let caps = IMPORT_LINE.captures(line.trim())?;
        Some(Self {
            is_static: caps.get(1).is_some(),
            path: caps[2].to_string(),
        })
    }

    fn star_package(&self) -> Option<&str> {
        self.path.strip_suffix(".*")
    }

    fn simple_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    fn render(&self) -> String {
        if self.is_static {
            format!("import static {};", self.path)
        } else {
            format!("import {};", self.path)
        }
    }
}

/// Deduplicates, groups and sorts the import block, expanding star imports
/// whose classes can be resolved.
pub struct ImportFixer {
    rules: ImportRules,
    package_cache: Mutex<HashMap<PathBuf, Vec<String>>>,
}

impl ImportFixer {
    pub fn new(rules: ImportRules) -> Self {
        Self {
            rules,
            package_cache: Mutex::new(HashMap::new()),
        }
    }

    fn group_of(&self, import: &Import) -> usize {
        let groups = self.rules.groups.len();
        if import.is_static {
            return if self.rules.static_first { 0 } else { groups + 2 };
        }
        self.rules
            .groups
            .iter()
            .position(|prefix| import.path.starts_with(prefix.as_str()))
            .map(|index| index + 1)
            .unwrap_or(groups + 1)
    }

    /// Classes of `package` from the rules table plus the `.java` files found
    /// under the source root of `file`.
    fn classes_in(&self, package: &str, file: &Path, own_package: Option<&str>) -> BTreeSet<String> {
        let mut classes: BTreeSet<String> = self
            .rules
            .known_classes
            .get(package)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default();

        for root in source_roots(file, own_package) {
            let dir = package
                .split('.')
                .fold(root, |dir, segment| dir.join(segment));
            classes.extend(self.list_package_dir(&dir));
        }
        classes
    }

    fn list_package_dir(&self, dir: &Path) -> Vec<String> {
        if let Ok(cache) = self.package_cache.lock() {
            if let Some(names) = cache.get(dir) {
                return names.clone();
            }
        }

        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "java") {
                    if let Some(stem) = path.file_stem() {
                        names.push(stem.to_string_lossy().into_owned());
                    }
                }
            }
        }
        names.sort();

        if let Ok(mut cache) = self.package_cache.lock() {
            cache.insert(dir.to_path_buf(), names.clone());
        }
        names
    }
}

impl Fixer for ImportFixer {
    fn kind(&self) -> FixerKind {
        FixerKind::Imports
    }

    fn fix(&self, source: &str, ctx: &FixContext<'_>) -> Fix {
        let mut lines = SourceLines::parse(source);
        let import_lines: Vec<usize> = lines
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| Import::parse(line).is_some())
            .map(|(index, _)| index)
            .collect();
        let (Some(&first), Some(&last)) = (import_lines.first(), import_lines.last()) else {
            return Fix::unchanged(source);
        };

        let block = &lines.lines[first..=last];
        if block
            .iter()
            .any(|line| !line.trim().is_empty() && Import::parse(line).is_none())
        {
            tracing::debug!(
                "Import block of {} is interleaved with other content, leaving it alone",
                ctx.path.display()
            );
            return Fix::unchanged(source);
        }

        let mut seen = HashSet::new();
        let mut imports = Vec::new();
        let mut duplicates = 0;
        for import in block.iter().filter_map(|line| Import::parse(line)) {
            if seen.insert(import.clone()) {
                imports.push(import);
            } else {
                duplicates += 1;
            }
        }

        let body = lines.lines[last + 1..].join("\n");
        let (imports, expanded) = self.expand_star_imports(imports, &body, source, ctx.path);

        let mut grouped: BTreeMap<usize, Vec<Import>> = BTreeMap::new();
        for import in imports {
            grouped.entry(self.group_of(&import)).or_default().push(import);
        }

        let mut new_block = Vec::new();
        for group in grouped.values_mut() {
            group.sort_by(|a, b| a.path.cmp(&b.path));
            if !new_block.is_empty() {
                new_block.push(String::new());
            }
            new_block.extend(group.iter().map(Import::render));
        }

        if new_block.as_slice() == block {
            return Fix::unchanged(source);
        }

        let mut changes = duplicates + expanded;
        if changes == 0 {
            changes = 1;
        }
        lines.lines.splice(first..=last, new_block);
        Fix {
            content: lines.render(),
            changes,
        }
    }
}

impl ImportFixer {
    /// Replaces each non-static star import with the classes of its package
    /// that the file references. Returns the new list and how many stars went.
    fn expand_star_imports(
        &self,
        imports: Vec<Import>,
        body: &str,
        source: &str,
        path: &Path,
    ) -> (Vec<Import>, usize) {
        if !imports.iter().any(|i| !i.is_static && i.star_package().is_some()) {
            return (imports, 0);
        }

        let regions = scan::classify(body);
        let code = scan::blank_non_code(body, &regions);
        let referenced: HashSet<&str> = TYPE_NAME.find_iter(&code).map(|m| m.as_str()).collect();
        let explicit: HashSet<String> = imports
            .iter()
            .filter(|i| !i.is_static && i.star_package().is_none())
            .map(|i| i.simple_name().to_string())
            .collect();
        let own_package = PACKAGE_LINE.captures(source).map(|caps| caps[1].to_string());

        let mut result = Vec::new();
        let mut expanded = 0;
        for import in imports {
            let package = match import.star_package() {
                Some(package) if !import.is_static => package.to_string(),
                _ => {
                    result.push(import);
                    continue;
                }
            };

            let used: Vec<String> = self
                .classes_in(&package, path, own_package.as_deref())
                .into_iter()
                .filter(|name| referenced.contains(name.as_str()) && !explicit.contains(name))
                .collect();
            if used.is_empty() {
                tracing::debug!("No classes resolved for {}.*, keeping the star import", package);
                result.push(import);
                continue;
            }

            expanded += 1;
            for name in used {
                let explicit_import = Import {
                    is_static: false,
                    path: format!("{}.{}", package, name),
                };
                if !result.contains(&explicit_import) {
                    result.push(explicit_import);
                }
            }
        }
        (result, expanded)
    }
}

/// Source roots for `file`: its directory minus the package path, plus the
/// main root when the file lives in a test root.
fn source_roots(file: &Path, own_package: Option<&str>) -> Vec<PathBuf> {
    let Some(mut root) = file.parent().map(Path::to_path_buf) else {
        return Vec::new();
    };
    if let Some(package) = own_package {
        for segment in package.split('.').rev() {
            if root.file_name().is_some_and(|name| name == segment) {
                root.pop();
            } else {
                return vec![file.parent().map(Path::to_path_buf).unwrap_or_default()];
            }
        }
    }

    let mut roots = vec![root.clone()];
    if root.ends_with("src/test/java") {
        if let Some(src) = root.parent().and_then(Path::parent) {
            roots.push(src.join("main").join("java"));
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixer() -> ImportFixer {
        let mut rules = ImportRules::default();
        rules.known_classes.insert(
            "com.acme.domain".to_string(),
            vec!["User".to_string(), "Order".to_string(), "Invoice".to_string()],
        );
        ImportFixer::new(rules)
    }

    fn fix_at(fixer: &ImportFixer, path: &Path, source: &str) -> Fix {
        fixer.fix(source, &FixContext::new(path, &[]))
    }

    #[test]
    fn groups_sorts_dedups_and_expands_stars() {
        let source = "\
package com.acme.api;

import org.slf4j.Logger;
import java.util.List;
import static org.junit.Assert.assertEquals;
import java.util.List;
import com.acme.domain.*;

public class Api {
    private List<User> users;
    private Order order; // Invoice is only mentioned here
}
";
        let result = fix_at(&fixer(), Path::new("/nowhere/Api.java"), source);
        assert_eq!(result.changes, 2);
        assert_eq!(
            result.content,
            "\
package com.acme.api;

import static org.junit.Assert.assertEquals;

import java.util.List;

import org.slf4j.Logger;

import com.acme.domain.Order;
import com.acme.domain.User;

public class Api {
    private List<User> users;
    private Order order; // Invoice is only mentioned here
}
"
        );
    }

    #[test]
    fn sorted_block_is_left_alone() {
        let source = "import java.util.List;\nimport java.util.Map;\n\nclass A {}\n";
        let result = fix_at(&fixer(), Path::new("A.java"), source);
        assert_eq!(result.changes, 0);
        assert_eq!(result.content, source);
    }

    #[test]
    fn unresolved_star_imports_are_kept() {
        let source = "import org.mystery.*;\nimport java.util.List;\n\nclass A { Widget w; }\n";
        let result = fix_at(&fixer(), Path::new("A.java"), source);
        assert_eq!(
            result.content,
            "import java.util.List;\n\nimport org.mystery.*;\n\nclass A { Widget w; }\n"
        );
        assert_eq!(result.changes, 1);
    }

    #[test]
    fn interleaved_block_is_untouched() {
        let source = "import java.util.Map;\n// keep\nimport java.util.List;\nclass A {}\n";
        let result = fix_at(&fixer(), Path::new("A.java"), source);
        assert_eq!(result.content, source);
    }

    #[test]
    fn stars_resolve_from_the_source_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("src/main/java");
        std::fs::create_dir_all(root.join("org/shop/model")).unwrap();
        std::fs::create_dir_all(root.join("org/shop/web")).unwrap();
        std::fs::write(root.join("org/shop/model/Cart.java"), "class Cart {}").unwrap();
        std::fs::write(root.join("org/shop/model/Item.java"), "class Item {}").unwrap();

        let file = root.join("org/shop/web/CartController.java");
        let source = "package org.shop.web;\n\nimport org.shop.model.*;\n\nclass CartController { Cart cart; }\n";
        let result = fix_at(&ImportFixer::new(ImportRules::default()), &file, source);
        assert_eq!(
            result.content,
            "package org.shop.web;\n\nimport org.shop.model.Cart;\n\nclass CartController { Cart cart; }\n"
        );
        assert_eq!(result.changes, 1);
    }
}

//! `{{name}}` transclusion expansion.

use std::collections::HashMap;

/// Recursion limit for nested transclusions; cycles bottom out here.
const MAX_DEPTH: usize = 8;

/// Expand whole-line `{{name}}` references from the source map.
///
/// Expansion is recursive so a transcluded document may itself transclude.
/// Unresolved names are left verbatim, and cycles stop at a fixed depth.
pub fn expand_transclusions(source: &str, sources: &HashMap<String, String>) -> String {
    expand(source, sources, 0)
}

fn expand(source: &str, sources: &HashMap<String, String>, depth: usize) -> String {
    if depth >= MAX_DEPTH {
        return source.to_string();
    }

    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        let trimmed = line.trim();
        if let Some(inner) = trimmed.strip_prefix("{{").and_then(|s| s.strip_suffix("}}"))
            && let Some(content) = sources.get(inner.trim())
        {
            out.push_str(&expand(content, sources, depth + 1));
            if !out.ends_with('\n') {
                out.push('\n');
            }
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn simple_expansion() {
        let map = sources(&[("part.md", "transcluded text")]);
        let out = expand_transclusions("before\n{{part.md}}\nafter\n", &map);
        assert_eq!(out, "before\ntranscluded text\nafter\n");
    }

    #[test]
    fn unresolved_reference_left_verbatim() {
        let out = expand_transclusions("{{missing.md}}\n", &HashMap::new());
        assert_eq!(out, "{{missing.md}}\n");
    }

    #[test]
    fn nested_expansion() {
        let map = sources(&[("a.md", "{{b.md}}"), ("b.md", "leaf")]);
        let out = expand_transclusions("{{a.md}}\n", &map);
        assert_eq!(out, "leaf\n");
    }

    #[test]
    fn cycles_terminate() {
        let map = sources(&[("a.md", "{{b.md}}"), ("b.md", "{{a.md}}")]);
        let out = expand_transclusions("{{a.md}}\n", &map);
        assert!(out.contains("{{"));
    }
}

//! Conditional-compilation block resolution
//!
//! Swift sources guard target-specific code with blocks such as
//!
//! ```text
//! #if KOTLIN
//! val x = listOf(1, 2)
//! #else
//! let x = [1, 2]
//! #endif
//! ```
//!
//! The translator only understands its own guard tag, so these blocks are
//! resolved textually before translation: every block whose tag is in the
//! configured [`TagSet`] is replaced by the body of the selected [`Branch`].
//! Blocks with other tags pass through unchanged.

use crate::error::SkiffResult;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One accepted spelling of a guard tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// Matched verbatim, e.g. `KOTLIN`
    Literal(String),
    /// Matched as a regular expression, e.g. `os\(Android\)`
    Pattern(String),
}

impl Tag {
    fn to_regex(&self) -> String {
        match self {
            Tag::Literal(text) => regex::escape(text),
            Tag::Pattern(pattern) => format!("(?:{})", pattern),
        }
    }
}

/// Ordered set of synonymous tags that all name the same target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet(pub Vec<Tag>);

impl Default for TagSet {
    fn default() -> Self {
        TagSet(vec![
            Tag::Literal("SKIP".to_string()),
            Tag::Literal("KOTLIN".to_string()),
            Tag::Pattern(r"os\(Android\)".to_string()),
        ])
    }
}

/// Which body of a matched block survives resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    /// Keep the body guarded by the tag (`#if TAG`)
    #[default]
    Primary,
    /// Keep the `#else` body; one-branch blocks disappear entirely
    Alternate,
}

/// Swap of a source-ecosystem import guard for the translator's own tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfImportGuard {
    pub from: String,
    pub to: String,
}

impl Default for SelfImportGuard {
    fn default() -> Self {
        SelfImportGuard {
            from: "#if canImport(Skiff)".to_string(),
            to: "#if GRYPHON".to_string(),
        }
    }
}

impl SelfImportGuard {
    pub fn apply(&self, code: &str) -> String {
        code.replace(&self.from, &self.to)
    }
}

/// Resolves tagged conditional blocks toward one branch
///
/// The block pattern is compiled once in [`ConditionalResolver::new`] and reused
/// for every call to [`ConditionalResolver::resolve`].
#[derive(Debug, Clone)]
pub struct ConditionalResolver {
    block: Regex,
    branch: Branch,
}

impl ConditionalResolver {
    /// Compile a resolver for the given tags
    ///
    /// # Errors
    /// `SkiffError::InvalidPattern` if a `Tag::Pattern` is not a valid regex
    pub fn new(tags: &TagSet, branch: Branch) -> SkiffResult<Self> {
        let alternatives: Vec<String> = tags.0.iter().map(Tag::to_regex).collect();
        // a tag set with no entries must not match anything
        let tag_group = if alternatives.is_empty() {
            r"\b\B".to_string()
        } else {
            alternatives.join("|")
        };

        // bodies exclude '#', so an inner block has to resolve before its parent can match;
        // either body may be empty
        let pattern = format!(
            r"(?P<lead>\A|\n)[ \t]*#if (?:{})[ \t]*\n(?:(?P<primary>[^#]*)\n)?(?:[ \t]*#else[ \t]*\n(?:(?P<alternate>[^#]*)\n)?)?[ \t]*#endif",
            tag_group
        );

        Ok(ConditionalResolver {
            block: Regex::new(&pattern)?,
            branch,
        })
    }

    pub fn branch(&self) -> Branch {
        self.branch
    }

    /// Resolve every recognized block in `code`
    ///
    /// Never fails: text that does not form a complete block with a known tag
    /// is returned unchanged. Passes repeat until nothing matches, which makes
    /// the result a fixed point of this function.
    pub fn resolve(&self, code: &str) -> String {
        let mut code = code.to_string();
        let mut passes = 0;
        loop {
            match self.resolve_pass(&code) {
                Some(next) => {
                    code = next;
                    passes += 1;
                }
                None => break,
            }
        }
        if passes > 0 {
            debug!(passes, branch = ?self.branch, "resolved conditional blocks");
        }
        code
    }

    /// One traversal: all current matches, spliced right to left
    fn resolve_pass(&self, code: &str) -> Option<String> {
        let mut replacements: Vec<(usize, usize, String)> = self
            .block
            .captures_iter(code)
            .map(|caps| {
                let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
                (whole.0, whole.1, self.replacement(&caps))
            })
            .collect();

        if replacements.is_empty() {
            return None;
        }

        replacements.sort_by(|a, b| b.0.cmp(&a.0));

        let mut result = code.to_string();
        for (start, end, text) in replacements {
            result.replace_range(start..end, &text);
        }
        Some(result)
    }

    fn replacement(&self, caps: &Captures) -> String {
        let lead = caps.name("lead").map_or("", |m| m.as_str());
        let body = match self.branch {
            Branch::Primary => caps.name("primary"),
            Branch::Alternate => caps.name("alternate"),
        };
        match body {
            Some(body) => format!("{}{}", lead, body.as_str()),
            // empty or absent branch
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(code: &str) -> String {
        ConditionalResolver::new(&TagSet::default(), Branch::Primary)
            .unwrap()
            .resolve(code)
    }

    // ========== Two-Branch Tests ==========

    #[test]
    fn test_two_branch_block_keeps_primary() {
        assert_eq!(resolve("#if KOTLIN\nA\n#else\nB\n#endif"), "A");
    }

    #[test]
    fn test_two_branch_block_inside_text() {
        let code = "let a = 1\n#if KOTLIN\nval b = 2\n#else\nlet b = 2\n#endif\nprint(a)";
        assert_eq!(resolve(code), "let a = 1\nval b = 2\nprint(a)");
    }

    #[test]
    fn test_indented_markers() {
        let code = "func f() {\n    #if KOTLIN  \n    A()\n    #else\n    B()\n    #endif\n}";
        assert_eq!(resolve(code), "func f() {\n    A()\n}");
    }

    #[test]
    fn test_multiline_bodies() {
        let code = "#if KOTLIN\na\nb\n#else\nc\nd\n#endif";
        assert_eq!(resolve(code), "a\nb");
    }

    #[test]
    fn test_no_dangling_markers() {
        let code = "x\n#if SKIP\none\n#else\ntwo\n#endif\ny\n#if KOTLIN\nthree\n#endif\nz";
        let resolved = resolve(code);
        assert!(!resolved.contains("#if"));
        assert!(!resolved.contains("#else"));
        assert!(!resolved.contains("#endif"));
        assert_eq!(resolved, "x\none\ny\nthree\nz");
    }

    // ========== Tag Tests ==========

    #[test]
    fn test_pattern_tag() {
        let code = "#if os(Android)\nandroid()\n#else\nios()\n#endif";
        assert_eq!(resolve(code), "android()");
    }

    #[test]
    fn test_unknown_tag_passes_through() {
        let code = "#if os(iOS)\nA\n#else\nB\n#endif";
        assert_eq!(resolve(code), code);
    }

    #[test]
    fn test_tag_prefix_does_not_match() {
        let code = "#if KOTLINX\nA\n#endif";
        assert_eq!(resolve(code), code);
    }

    #[test]
    fn test_tag_comparison_is_case_sensitive() {
        let code = "#if kotlin\nA\n#endif";
        assert_eq!(resolve(code), code);
    }

    #[test]
    fn test_custom_tag_set() {
        let tags = TagSet(vec![Tag::Literal("JVM".to_string())]);
        let resolver = ConditionalResolver::new(&tags, Branch::Primary).unwrap();
        assert_eq!(resolver.resolve("#if JVM\nA\n#else\nB\n#endif"), "A");
        let untouched = "#if KOTLIN\nA\n#endif";
        assert_eq!(resolver.resolve(untouched), untouched);
    }

    #[test]
    fn test_empty_tag_set_matches_nothing() {
        let resolver = ConditionalResolver::new(&TagSet(vec![]), Branch::Primary).unwrap();
        let code = "#if KOTLIN\nA\n#endif";
        assert_eq!(resolver.resolve(code), code);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let tags = TagSet(vec![Tag::Pattern("os(Android".to_string())]);
        assert!(ConditionalResolver::new(&tags, Branch::Primary).is_err());
    }

    // ========== One-Branch Tests ==========

    #[test]
    fn test_one_branch_block_keeps_body() {
        assert_eq!(resolve("a\n#if KOTLIN\nb\n#endif\nc"), "a\nb\nc");
    }

    #[test]
    fn test_empty_primary_branch_hides_swift_only_code() {
        assert_eq!(
            resolve("a\n#if KOTLIN\n#else\nswiftOnly()\n#endif\nb"),
            "a\nb"
        );
    }

    #[test]
    fn test_empty_primary_keeps_alternate_when_selected() {
        let resolver =
            ConditionalResolver::new(&TagSet::default(), Branch::Alternate).unwrap();
        assert_eq!(
            resolver.resolve("a\n#if KOTLIN\n#else\nswiftOnly()\n#endif\nb"),
            "a\nswiftOnly()\nb"
        );
    }

    #[test]
    fn test_empty_alternate_branch() {
        let resolver =
            ConditionalResolver::new(&TagSet::default(), Branch::Alternate).unwrap();
        assert_eq!(resolver.resolve("a\n#if KOTLIN\nx()\n#else\n#endif\nb"), "a\nb");
        assert_eq!(resolve("a\n#if KOTLIN\nx()\n#else\n#endif\nb"), "a\nx()\nb");
    }

    #[test]
    fn test_unterminated_block_passes_through() {
        let code = "a\n#if KOTLIN\nb\nc";
        assert_eq!(resolve(code), code);
    }

    // ========== Branch Selection Tests ==========

    #[test]
    fn test_alternate_branch() {
        let resolver =
            ConditionalResolver::new(&TagSet::default(), Branch::Alternate).unwrap();
        assert_eq!(resolver.resolve("x\n#if KOTLIN\nA\n#else\nB\n#endif\ny"), "x\nB\ny");
    }

    #[test]
    fn test_alternate_drops_one_branch_block() {
        let resolver =
            ConditionalResolver::new(&TagSet::default(), Branch::Alternate).unwrap();
        assert_eq!(resolver.resolve("x\n#if KOTLIN\nA\n#endif\ny"), "x\ny");
    }

    // ========== Nesting & Determinism Tests ==========

    #[test]
    fn test_nested_blocks_resolve_inside_out() {
        let code = "#if KOTLIN\nouter\n#if SKIP\ninner\n#else\nswift\n#endif\n#endif";
        assert_eq!(resolve(code), "outer\ninner");
    }

    #[test]
    fn test_nested_foreign_tag_blocks_outer() {
        // the inner block is not ours, so the outer body still contains '#'
        let code = "#if KOTLIN\n#if DEBUG\nx\n#endif\n#endif";
        assert_eq!(resolve(code), code);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let code = "a\n#if KOTLIN\nb\n#else\nc\n#endif\n#if os(Android)\nd\n#endif";
        let once = resolve(code);
        assert_eq!(resolve(&once), once);
    }

    // ========== Self Import Guard Tests ==========

    #[test]
    fn test_self_import_guard_swaps_tag() {
        let guard = SelfImportGuard::default();
        let code = "#if canImport(Skiff)\nimport Skiff\n#endif";
        assert_eq!(guard.apply(code), "#if GRYPHON\nimport Skiff\n#endif");
    }
}

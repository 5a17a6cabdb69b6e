//! Post-processing rules for translator output
//!
//! The translator has a handful of systematic defects: it emits nested
//! namespaces joined with `$`, keeps Swift string coercions, marks local
//! functions `internal`, and splits inline value classes over two lines. Each
//! defect is repaired by a named [`PatchRule`]. Rules belong to a
//! [`RuleGroup`], and a [`PatchMode`] decides which groups run.
//!
//! Rules are applied in declaration order; later rules may assume earlier ones
//! already ran. [`PatchEngine::patch`] repeats the whole list until the text
//! stops changing, so `patch(patch(x)) == patch(x)` holds for any input.

use crate::error::SkiffResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Upper bound on full passes over the rule list
///
/// The built-in rules only ever shorten the text or remove `$` characters, so
/// they settle long before this. It guards user-supplied rule lists.
const MAX_PASSES: usize = 64;

/// Rule groups that can be switched on and off independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleGroup {
    /// `$`-joined namespace references and redundant string wrapper constructors
    QualifiedNameRepair,
    /// Swift string coercion calls on optional returns
    StringCoercionRemoval,
    /// `internal` on function declarations
    VisibilityModifierFix,
    /// Supertype calls with no target counterpart
    ConformanceCleanup,
    /// Two-line inline value class declarations
    DataClassAnnotationFix,
}

/// Which rule groups are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchMode {
    pub qualified_name_repair: bool,
    pub string_coercion_removal: bool,
    pub visibility_modifier_fix: bool,
    pub conformance_cleanup: bool,
    pub data_class_annotation_fix: bool,
}

impl Default for PatchMode {
    /// The groups every translation needs; namespace and coercion repair are opt-in
    fn default() -> Self {
        PatchMode {
            qualified_name_repair: false,
            string_coercion_removal: false,
            visibility_modifier_fix: true,
            conformance_cleanup: true,
            data_class_annotation_fix: true,
        }
    }
}

impl PatchMode {
    /// Every group enabled, for code ported against the Java standard library
    pub fn autoport() -> Self {
        PatchMode {
            qualified_name_repair: true,
            string_coercion_removal: true,
            ..PatchMode::default()
        }
    }

    /// No group enabled
    pub fn none() -> Self {
        PatchMode {
            qualified_name_repair: false,
            string_coercion_removal: false,
            visibility_modifier_fix: false,
            conformance_cleanup: false,
            data_class_annotation_fix: false,
        }
    }

    pub fn enables(&self, group: RuleGroup) -> bool {
        match group {
            RuleGroup::QualifiedNameRepair => self.qualified_name_repair,
            RuleGroup::StringCoercionRemoval => self.string_coercion_removal,
            RuleGroup::VisibilityModifierFix => self.visibility_modifier_fix,
            RuleGroup::ConformanceCleanup => self.conformance_cleanup,
            RuleGroup::DataClassAnnotationFix => self.data_class_annotation_fix,
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal { from: String, to: String },
    Pattern { regex: Regex, replacement: String },
}

/// A named, deterministic text substitution
#[derive(Debug, Clone)]
pub struct PatchRule {
    name: String,
    group: RuleGroup,
    matcher: Matcher,
}

impl PatchRule {
    /// Replace every occurrence of `from` with `to`
    pub fn literal(name: &str, group: RuleGroup, from: &str, to: &str) -> Self {
        PatchRule {
            name: name.to_string(),
            group,
            matcher: Matcher::Literal {
                from: from.to_string(),
                to: to.to_string(),
            },
        }
    }

    /// Replace every match of `pattern`; `replacement` may use `$1`/`${name}` groups
    ///
    /// # Errors
    /// `SkiffError::InvalidPattern` if `pattern` does not compile
    pub fn pattern(
        name: &str,
        group: RuleGroup,
        pattern: &str,
        replacement: &str,
    ) -> SkiffResult<Self> {
        Ok(PatchRule {
            name: name.to_string(),
            group,
            matcher: Matcher::Pattern {
                regex: Regex::new(pattern)?,
                replacement: replacement.to_string(),
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> RuleGroup {
        self.group
    }

    /// Apply the rule once; unmatched text comes back unchanged
    pub fn apply(&self, text: &str) -> String {
        match &self.matcher {
            Matcher::Literal { from, to } => text.replace(from.as_str(), to),
            Matcher::Pattern { regex, replacement } => {
                regex.replace_all(text, replacement.as_str()).into_owned()
            }
        }
    }
}

/// The built-in rules, in the order they must run
pub fn default_rules() -> SkiffResult<Vec<PatchRule>> {
    Ok(vec![
        // Kotlin rejects `internal` on local functions, and snippets are evaluated as
        // a script where every function is local. The translator cannot tell local
        // from top-level, so this strips the modifier from top-level functions too.
        // That is unsound but harmless: a top-level function without the modifier is
        // still valid Kotlin with public visibility.
        PatchRule::pattern(
            "internal-function-modifier",
            RuleGroup::VisibilityModifierFix,
            r"(?:\binternal[ \t]+)+fun ",
            "fun ",
        )?,
        PatchRule::literal(
            "raw-representable-supertype",
            RuleGroup::ConformanceCleanup,
            ": RawRepresentable()",
            "",
        ),
        PatchRule::literal(
            "jvm-inline-value-class",
            RuleGroup::DataClassAnnotationFix,
            "@JvmInline\n\ndata class",
            "@JvmInline value class",
        ),
        // java.lang.String("x") is an inferred platform type where kotlin.String? is expected
        PatchRule::literal(
            "java-string-constructor",
            RuleGroup::QualifiedNameRepair,
            "java$lang$String(",
            "(",
        ),
        PatchRule::literal(
            "java-lang-namespace",
            RuleGroup::QualifiedNameRepair,
            "java$lang$",
            "java.lang.",
        ),
        PatchRule::literal(
            "java-io-namespace",
            RuleGroup::QualifiedNameRepair,
            "java$io$",
            "java.io.",
        ),
        PatchRule::literal(
            "java-util-namespace",
            RuleGroup::QualifiedNameRepair,
            "java$util$",
            "java.util.",
        ),
        PatchRule::literal(
            "swift-string-coercion",
            RuleGroup::StringCoercionRemoval,
            "?.toSwiftString()",
            "",
        ),
    ])
}

/// Applies the active rules of an ordered rule list
#[derive(Debug, Clone)]
pub struct PatchEngine {
    rules: Vec<PatchRule>,
    mode: PatchMode,
}

impl PatchEngine {
    /// Engine with the built-in rules
    pub fn new(mode: PatchMode) -> SkiffResult<Self> {
        Ok(Self::with_rules(default_rules()?, mode))
    }

    /// Engine with a caller-supplied ordered rule list
    pub fn with_rules(rules: Vec<PatchRule>, mode: PatchMode) -> Self {
        PatchEngine { rules, mode }
    }

    pub fn mode(&self) -> PatchMode {
        self.mode
    }

    /// Same rules, different active groups
    pub fn with_mode(&self, mode: PatchMode) -> Self {
        PatchEngine {
            rules: self.rules.clone(),
            mode,
        }
    }

    /// Rules that run under the current mode, in order
    pub fn active_rules(&self) -> impl Iterator<Item = &PatchRule> {
        self.rules
            .iter()
            .filter(move |rule| self.mode.enables(rule.group))
    }

    /// Patch `text` until no active rule changes it
    pub fn patch(&self, text: &str) -> String {
        self.patch_with(text, self.mode)
    }

    /// Patch `text` with the groups of `mode` instead of the engine's own
    pub fn patch_with(&self, text: &str, mode: PatchMode) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            let mut changed = false;
            for rule in self.rules.iter().filter(|r| mode.enables(r.group)) {
                let next = rule.apply(&current);
                if next != current {
                    debug!(rule = rule.name(), "patch rule applied");
                    current = next;
                    changed = true;
                }
            }
            if !changed {
                return current;
            }
        }
        warn!(
            passes = MAX_PASSES,
            "patch rules did not settle; returning last pass"
        );
        current
    }
}

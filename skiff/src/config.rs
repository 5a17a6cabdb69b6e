use crate::conditional::{Branch, SelfImportGuard, TagSet};
use crate::error::{SkiffError, SkiffResult};
use crate::patch::PatchMode;
use crate::snippet::DEFAULT_SENTINEL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Harness configuration
///
/// Every key is optional in the JSON form; missing keys take the defaults below.
///
/// ```json
/// {
///     "sentinel": "} verify: {",
///     "prelude": ["let jvm = true"],
///     "tags": [{ "literal": "KOTLIN" }, { "pattern": "os\\(Android\\)" }],
///     "branch": "primary",
///     "patch": { "qualified_name_repair": true },
///     "self_import_guard": { "from": "#if canImport(Skiff)", "to": "#if GRYPHON" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Token closing an inline snippet
    pub sentinel: String,
    /// Lines placed before every inline snippet
    pub prelude: Vec<String>,
    /// Conditional-compilation tags resolved toward the target
    pub tags: TagSet,
    /// Which body of a conditional block survives
    pub branch: Branch,
    /// Active patch rule groups
    pub patch: PatchMode,
    pub self_import_guard: SelfImportGuard,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            sentinel: DEFAULT_SENTINEL.to_string(),
            // inline snippets always run on the JVM side
            prelude: vec!["let jvm = true".to_string()],
            tags: TagSet::default(),
            branch: Branch::Primary,
            patch: PatchMode::default(),
            self_import_guard: SelfImportGuard::default(),
        }
    }
}

/// Load a harness configuration from a JSON file
///
/// # Arguments
/// * `path` - Path to the JSON file
///
/// # Errors
/// - File not found or unreadable
/// - Invalid JSON, or a key with the wrong shape
/// - An empty sentinel
pub fn load_config_from_file(path: &Path) -> SkiffResult<HarnessConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        SkiffError::Config(format!("Failed to read file '{}': {}", path.display(), e))
    })?;
    parse_config(&content).map_err(|e| match e {
        SkiffError::Config(msg) => {
            SkiffError::Config(format!("Invalid config '{}': {}", path.display(), msg))
        }
        other => other,
    })
}

/// Parse a harness configuration from JSON text
pub fn parse_config(content: &str) -> SkiffResult<HarnessConfig> {
    let config: HarnessConfig = serde_json::from_str(content)
        .map_err(|e| SkiffError::Config(format!("Failed to parse JSON: {}", e)))?;

    if config.sentinel.trim().is_empty() {
        return Err(SkiffError::Config("sentinel cannot be empty".to_string()));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditional::Tag;
    use std::io::Write;

    #[test]
    fn test_empty_object_gives_defaults() {
        assert_eq!(parse_config("{}").unwrap(), HarnessConfig::default());
    }

    #[test]
    fn test_partial_patch_mode_keeps_other_defaults() {
        let config = parse_config(r#"{ "patch": { "qualified_name_repair": true } }"#).unwrap();
        assert!(config.patch.qualified_name_repair);
        assert!(config.patch.visibility_modifier_fix);
        assert!(!config.patch.string_coercion_removal);
    }

    #[test]
    fn test_tags_and_branch() {
        let config = parse_config(
            r#"{ "tags": [{ "literal": "JVM" }, { "pattern": "os\\(Android\\)" }], "branch": "alternate" }"#,
        )
        .unwrap();
        assert_eq!(
            config.tags,
            TagSet(vec![
                Tag::Literal("JVM".to_string()),
                Tag::Pattern(r"os\(Android\)".to_string()),
            ])
        );
        assert_eq!(config.branch, Branch::Alternate);
    }

    #[test]
    fn test_empty_sentinel_rejected() {
        assert!(matches!(
            parse_config(r#"{ "sentinel": "  " }"#),
            Err(SkiffError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(parse_config("{ sentinel: }").is_err());
        assert!(parse_config(r#"{ "branch": "sideways" }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "sentinel": "// END", "prelude": [] }}"#).unwrap();
        let config = load_config_from_file(file.path()).unwrap();
        assert_eq!(config.sentinel, "// END");
        assert!(config.prelude.is_empty());
    }

    #[test]
    fn test_load_invalid_file_names_path_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ sentinel: }}").unwrap();
        let message = load_config_from_file(file.path()).unwrap_err().to_string();
        assert!(message.starts_with("Configuration error: Invalid config '"));
        assert!(message.contains("': Failed to parse JSON: "));
        assert_eq!(message.matches("Configuration error").count(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config_from_file(Path::new("/nonexistent/skiff.json"));
        assert!(matches!(result, Err(SkiffError::Config(_))));
    }
}

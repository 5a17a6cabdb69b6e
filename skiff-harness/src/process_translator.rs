//! Translator backed by an external executable
//!
//! The executable receives the invoker's arguments (flags, then the source
//! path) and prints its result list as JSON on stdout.
//!
//! # Configuration
//!
//! `ProcessTranslator::from_env()` reads:
//!
//! - `SKIFF_TRANSLATOR` - path or name of the translator executable (required)
//! - `SKIFF_TRANSLATOR_ARGS` - extra whitespace-separated arguments placed
//!   before the invoker's own (optional)

use crate::translator::Translator;
use async_trait::async_trait;
use serde_json::Value;
use skiff::{SkiffError, SkiffResult};
use tokio::process::Command;
use tracing::debug;

pub const TRANSLATOR_ENV: &str = "SKIFF_TRANSLATOR";
pub const TRANSLATOR_ARGS_ENV: &str = "SKIFF_TRANSLATOR_ARGS";

/// Runs the translator as a child process, once per translation
#[derive(Debug, Clone)]
pub struct ProcessTranslator {
    program: String,
    extra_args: Vec<String>,
}

impl ProcessTranslator {
    /// # Returns
    ///
    /// * `Ok(Self)` - New translator
    /// * `Err(SkiffError)` - If the program name is empty
    pub fn new(program: impl Into<String>, extra_args: Vec<String>) -> SkiffResult<Self> {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(SkiffError::Config(
                "translator program cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            program,
            extra_args,
        })
    }

    /// Create a ProcessTranslator from the `SKIFF_TRANSLATOR` environment variables
    pub fn from_env() -> SkiffResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a ProcessTranslator from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SkiffResult<Self> {
        let program = lookup(TRANSLATOR_ENV).ok_or_else(|| {
            SkiffError::Config(format!("{} environment variable not set", TRANSLATOR_ENV))
        })?;
        let extra_args = lookup(TRANSLATOR_ARGS_ENV)
            .map(|args| args.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Self::new(program, extra_args)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }
}

#[async_trait]
impl Translator for ProcessTranslator {
    async fn compile(&self, args: &[String]) -> SkiffResult<Option<Value>> {
        debug!(program = %self.program, ?args, "spawning translator");

        let output = Command::new(&self.program)
            .args(&self.extra_args)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                SkiffError::Translator(format!("Failed to run '{}': {}", self.program, e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|code| format!("exit code {}", code))
                .unwrap_or_else(|| "terminated by signal".to_string());
            return Err(SkiffError::Translator(if stderr.is_empty() {
                status
            } else {
                format!("{} ({})", stderr, status)
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(stdout.trim()).map(Some).map_err(|e| {
            SkiffError::Translator(if stderr.is_empty() {
                format!("Unreadable translator output: {}", e)
            } else {
                stderr
            })
        })
    }

    fn translator_name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ========== Configuration Tests ==========

    #[test]
    fn test_from_lookup_reads_program_and_args() {
        let translator = ProcessTranslator::from_lookup(lookup(&[
            (TRANSLATOR_ENV, "gryphon"),
            (TRANSLATOR_ARGS_ENV, "--indentation 4  --verbose"),
        ]))
        .unwrap();
        assert_eq!(translator.program(), "gryphon");
        assert_eq!(translator.extra_args(), &["--indentation", "4", "--verbose"]);
    }

    #[test]
    fn test_from_lookup_requires_program() {
        let result = ProcessTranslator::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(SkiffError::Config(_))));
    }

    #[test]
    fn test_empty_program_rejected() {
        assert!(ProcessTranslator::new("  ", vec![]).is_err());
    }

    // ========== Process Tests ==========

    #[cfg(unix)]
    fn shell(script: &str) -> ProcessTranslator {
        // sh -c <script> <$0> receives the invoker arguments as $1.. onward
        ProcessTranslator::new("sh", vec!["-c".to_string(), script.to_string(), "sh".to_string()])
            .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reads_json_from_stdout() {
        let translator = shell(r#"printf '[{"translatedText": "%s"}]' "$(cat "$3")""#);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"1 + 2").unwrap();

        let args = vec![
            "--no-main-file".to_string(),
            "--quiet".to_string(),
            file.path().display().to_string(),
        ];
        let response = translator.compile(&args).await.unwrap();
        assert_eq!(response, Some(json!([{ "translatedText": "1 + 2" }])));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_stdout_is_no_output() {
        let translator = shell("true");
        assert_eq!(translator.compile(&[]).await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_reports_stderr() {
        let translator = shell("echo 'unsupported statement' >&2; exit 3");
        match translator.compile(&[]).await {
            Err(SkiffError::Translator(msg)) => {
                assert!(msg.contains("unsupported statement"));
                assert!(msg.contains("exit code 3"));
            }
            other => panic!("Expected Translator error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_json_stdout_is_translator_error() {
        let translator = shell("echo 'not json'");
        assert!(matches!(
            translator.compile(&[]).await,
            Err(SkiffError::Translator(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_translator_error() {
        let translator = ProcessTranslator::new("skiff-no-such-translator", vec![]).unwrap();
        assert!(matches!(
            translator.compile(&[]).await,
            Err(SkiffError::Translator(_))
        ));
    }
}

//! Translator trait and the invoker that feeds it
//!
//! The translator is an external collaborator: it takes a Swift source file on
//! disk and answers with a list of translation records. The `Translator` trait
//! hides how it is reached (a child process, a test double), and
//! `TranslationInvoker` does everything around the call: persisting the text,
//! passing the flags, and narrowing the loosely-shaped response into a
//! `TranslationRecord` or a typed failure.
//!
//! # Example
//!
//! ```ignore
//! use skiff_harness::{MockMode, MockTranslator, TranslationInvoker};
//! use std::sync::Arc;
//!
//! let invoker = TranslationInvoker::new(Arc::new(MockTranslator::new(MockMode::Echo)));
//! let kotlin = invoker.translate("1 + 2 + 3").await?;
//! assert_eq!(kotlin, "1 + 2 + 3");
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skiff::{SelfImportGuard, SkiffError, SkiffResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Skip wrapping the translated output in a `main` function
pub const NO_MAIN_FILE_FLAG: &str = "--no-main-file";

/// Keep the translator from echoing the translation to the console
pub const QUIET_FLAG: &str = "--quiet";

/// One translated file as reported by the translator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    #[serde(rename = "translatedText")]
    pub translated_text: String,
}

/// Generic trait for translator backends
///
/// Implementations receive the complete argument list (flags and the path of
/// the persisted source file) and return the raw response, untouched.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Run the translator
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The translator produced no output at all
    /// * `Ok(Some(value))` - The raw response, expected to be a list of records
    /// * `Err(SkiffError)` - The translator itself failed
    async fn compile(&self, args: &[String]) -> SkiffResult<Option<Value>>;

    /// Name used in logs to identify the backend
    fn translator_name(&self) -> &str;
}

/// Narrow a raw translator response into its first translation record
///
/// # Errors
/// - `NoResult` when there is no response
/// - `NoInitialResult` when the response is not a list
/// - `NoInitialTranslationResult` when the list is empty or its first element has
///   no `translatedText` string
pub fn unwrap_response(response: Option<Value>) -> SkiffResult<TranslationRecord> {
    let response = response.ok_or(SkiffError::NoResult)?;
    let list = response.as_array().ok_or(SkiffError::NoInitialResult)?;
    let first = list
        .first()
        .ok_or(SkiffError::NoInitialTranslationResult)?;
    serde_json::from_value(first.clone()).map_err(|_| SkiffError::NoInitialTranslationResult)
}

/// Persists source text and hands it to a `Translator`
#[derive(Clone)]
pub struct TranslationInvoker {
    translator: Arc<dyn Translator>,
    guard: SelfImportGuard,
    temp_dir: PathBuf,
}

impl std::fmt::Debug for TranslationInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationInvoker")
            .field("translator", &self.translator.translator_name())
            .field("guard", &self.guard)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

impl TranslationInvoker {
    /// Invoker writing to the system temporary directory
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        TranslationInvoker {
            translator,
            guard: SelfImportGuard::default(),
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_guard(mut self, guard: SelfImportGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Write source files under `dir` instead of the system temporary directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn translator_name(&self) -> &str {
        self.translator.translator_name()
    }

    /// Translate `text` and return the translated text
    ///
    /// The only rewrite done here is the import-guard swap, because the
    /// translator recognizes no conditional tag but its own.
    pub async fn translate(&self, text: &str) -> SkiffResult<String> {
        let source = self.guard.apply(text);
        let path = self.persist(&source)?;

        let args = vec![
            NO_MAIN_FILE_FLAG.to_string(),
            QUIET_FLAG.to_string(),
            path.display().to_string(),
        ];
        debug!(
            translator = self.translator.translator_name(),
            path = %path.display(),
            "invoking translator"
        );

        let response = self.translator.compile(&args).await?;
        let record = unwrap_response(response)?;
        Ok(record.translated_text)
    }

    /// Write `text` to a fresh uniquely-named `.swift` file
    ///
    /// The file is kept after the call; cleanup is left to the temp directory.
    fn persist(&self, text: &str) -> SkiffResult<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix("skiff-")
            .suffix(".swift")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| {
                SkiffError::Io(format!(
                    "Failed to create source file in '{}': {}",
                    self.temp_dir.display(),
                    e
                ))
            })?;
        file.write_all(text.as_bytes())?;
        let (_, path) = file
            .keep()
            .map_err(|e| SkiffError::Io(format!("Failed to keep source file: {}", e)))?;
        Ok(path)
    }
}

/// The source path an invoker passed to a translator: the last argument
pub fn source_path(args: &[String]) -> Option<&Path> {
    args.last().map(Path::new)
}

//! The translation pipeline
//!
//! `Skiff` wires the text stages of the `skiff` crate around a `Translator`
//! and, optionally, a shared script engine:
//!
//! locate → resolve → translate → patch → compose → evaluate
//!
//! Stages run strictly in that order and the first failure aborts the rest;
//! failures come back annotated with the stage that raised them.

use crate::engine::{EngineCache, EvaluationBridge};
use crate::translator::{TranslationInvoker, Translator};
use skiff::{
    ArtifactComposer, ComparableValue, ComposeOptions, ConditionalResolver, HarnessConfig,
    PatchEngine, PatchMode, SkiffError, SkiffResult, SourceFragment, Stage, locate,
};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Per-call switches on top of the configured patch mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationOptions {
    /// Also repair Java standard library references and string coercions
    pub autoport: bool,
    /// Instrument the output as a JUnit test case
    pub test_case: bool,
}

impl TranslationOptions {
    pub fn autoport() -> Self {
        TranslationOptions {
            autoport: true,
            ..Self::default()
        }
    }

    pub fn test_case() -> Self {
        TranslationOptions {
            test_case: true,
            ..Self::default()
        }
    }
}

/// Result of translating an inline snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineTranslation {
    /// The source handed to the translator: prelude, preamble, then snippet
    pub source: String,
    /// Patched and composed translation
    pub translated: String,
    /// Literal found on the sentinel line, if any
    pub expectation: Option<String>,
    pub fragment: SourceFragment,
}

/// Result of a successful `Skiff::check`
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub translation: InlineTranslation,
    /// Value the translated snippet evaluated to
    pub value: ComparableValue,
}

/// Swift-to-Kotlin translation context
pub struct Skiff {
    config: HarnessConfig,
    resolver: ConditionalResolver,
    invoker: TranslationInvoker,
    patcher: PatchEngine,
    composer: ArtifactComposer,
    bridge: Option<EvaluationBridge>,
}

impl std::fmt::Debug for Skiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Skiff")
            .field("config", &self.config)
            .field("invoker", &self.invoker)
            .field("bridge", &self.bridge)
            .finish()
    }
}

impl Skiff {
    /// Build a context translating with `translator`
    ///
    /// # Errors
    /// - `InvalidPattern` when a configured tag pattern does not compile
    pub fn new(translator: Arc<dyn Translator>, config: HarnessConfig) -> SkiffResult<Self> {
        let resolver = ConditionalResolver::new(&config.tags, config.branch)?;
        let invoker =
            TranslationInvoker::new(translator).with_guard(config.self_import_guard.clone());
        let patcher = PatchEngine::new(config.patch)?;
        let composer = ArtifactComposer::new()?;

        Ok(Skiff {
            config,
            resolver,
            invoker,
            patcher,
            composer,
            bridge: None,
        })
    }

    /// Evaluate through the engine held by `cache`
    pub fn with_engine(mut self, cache: Arc<EngineCache>) -> Self {
        self.bridge = Some(EvaluationBridge::new(cache));
        self
    }

    /// Write translator input files under `dir`
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.invoker = self.invoker.with_temp_dir(dir);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Translate a whole Swift file
    ///
    /// # Arguments
    /// * `swift` - Swift source text
    /// * `module_name` - Package for the generated file; adds the generated-file banner
    /// * `options` - Extra patch groups and test instrumentation
    pub async fn translate(
        &self,
        swift: &str,
        module_name: Option<&str>,
        options: TranslationOptions,
    ) -> SkiffResult<String> {
        self.run(swift, module_name, options, true).await
    }

    /// Translate the snippet that follows line `line` of `path`
    ///
    /// The translator sees the configured prelude, then the preamble lines, then
    /// the snippet.
    pub async fn transpile_inline(
        &self,
        path: &Path,
        line: usize,
        preamble: Option<Range<usize>>,
        options: TranslationOptions,
    ) -> SkiffResult<InlineTranslation> {
        let located = locate(path, line, &self.config.sentinel, preamble)
            .map_err(|e| e.in_stage(Stage::Locate))?;
        let fragment = located.fragment.with_leading_lines(&self.config.prelude);
        let source = fragment.text();

        let translated = self.run(&source, None, options, false).await?;

        Ok(InlineTranslation {
            source,
            translated,
            expectation: located.expectation,
            fragment,
        })
    }

    /// Translate, evaluate and compare one inline snippet
    ///
    /// `expected` is the value the original Swift snippet computed. When the
    /// sentinel line carries an expectation literal, it must match the tail of
    /// the translated text. Either disagreement is an `ExpectationMismatch`
    /// carrying both sides.
    pub async fn check(
        &self,
        expected: impl Into<ComparableValue>,
        path: &Path,
        line: usize,
        preamble: Option<Range<usize>>,
        options: TranslationOptions,
    ) -> SkiffResult<CheckOutcome> {
        let expected = expected.into();
        let translation = self.transpile_inline(path, line, preamble, options).await?;

        if let Some(literal) = &translation.expectation {
            let tail = translated_tail(&translation.translated, literal);
            if tail != literal.trim() {
                return Err(SkiffError::mismatch(literal, tail));
            }
        }

        let value = self.evaluate(&translation.translated)?;
        if value != expected {
            return Err(SkiffError::mismatch(&expected, &value));
        }

        Ok(CheckOutcome { translation, value })
    }

    /// Evaluate an artifact on the configured engine
    pub fn evaluate(&self, artifact: &str) -> SkiffResult<ComparableValue> {
        let bridge = self.bridge.as_ref().ok_or_else(|| {
            SkiffError::EngineUnavailable("no script engine configured".to_string())
                .in_stage(Stage::Evaluate)
        })?;
        bridge
            .evaluate(artifact)
            .map_err(|e| e.in_stage(Stage::Evaluate))
    }

    async fn run(
        &self,
        swift: &str,
        module_name: Option<&str>,
        options: TranslationOptions,
        whole_file: bool,
    ) -> SkiffResult<String> {
        let resolved = self.resolver.resolve(swift);
        debug!(
            bytes_in = swift.len(),
            bytes_out = resolved.len(),
            "resolved conditional blocks"
        );

        let translated = self
            .invoker
            .translate(&resolved)
            .await
            .map_err(|e| e.in_stage(Stage::Translate))?;

        let patched = self.patcher.patch_with(&translated, self.patch_mode(options));

        let compose_options = ComposeOptions {
            test_shim: options.test_case,
            module_name: module_name.map(str::to_string),
            whole_file,
        };
        Ok(self.composer.compose(&patched, &compose_options))
    }

    fn patch_mode(&self, options: TranslationOptions) -> PatchMode {
        let mut mode = self.patcher.mode();
        if options.autoport {
            mode.qualified_name_repair = true;
            mode.string_coercion_removal = true;
        }
        mode
    }
}

/// The trailing lines of `translated`, as many as `literal` spans
///
/// Prelude and preamble lines translate to text ahead of the snippet's own
/// translation, so only the tail is compared.
fn translated_tail<'a>(translated: &'a str, literal: &str) -> &'a str {
    let translated = translated.trim();
    let wanted = literal.trim().lines().count().max(1);
    let breaks: Vec<usize> = translated.match_indices('\n').map(|(i, _)| i).collect();
    if breaks.len() < wanted {
        return translated;
    }
    translated[breaks[breaks.len() - wanted] + 1..].trim()
}

//! Translation harness around the `skiff` text pipeline
//!
//! This crate connects the pure text stages of `skiff` to the two external
//! collaborators: a Swift-to-Kotlin translator and a script engine that runs
//! the result. It also translates whole Swift packages and drives their Gradle
//! build.
//!
//! # Workflow Example
//!
//! ```ignore
//! use skiff::HarnessConfig;
//! use skiff_harness::{EngineCache, ProcessTranslator, Skiff, TranslationOptions, engine_factory, EngineMode};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Pick a translator
//!     let translator = Arc::new(ProcessTranslator::from_env()?);
//!
//!     // 2. Build a context sharing one engine
//!     let engine = Arc::new(EngineCache::new(engine_factory(EngineMode::Arithmetic)));
//!     let skiff = Skiff::new(translator, HarnessConfig::default())?.with_engine(engine);
//!
//!     // 3. Translate the snippet after line 12 and compare with the Swift result
//!     let outcome = skiff
//!         .check(6, Path::new("Tests/DemoTests/DemoTests.swift"), 12, None, TranslationOptions::default())
//!         .await?;
//!
//!     println!("{}", outcome.translation.translated);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod mock;
pub mod pipeline;
pub mod process_translator;
pub mod project;
pub mod translator;


// Re-export main types for convenient access
pub use engine::{EngineCache, EvaluationBridge, ScriptEngine};
pub use mock::{
    EngineMode, MockCall, MockEngine, MockMode, MockTranslator, engine_factory, failing_factory,
};
pub use pipeline::{CheckOutcome, InlineTranslation, Skiff, TranslationOptions};
pub use process_translator::ProcessTranslator;
pub use project::{
    BuildProfile, FileSystem, GradleInvocation, LocalFileSystem, ProjectLayout, ProjectReport,
    ProjectTranspiler,
};
pub use translator::{TranslationInvoker, TranslationRecord, Translator, unwrap_response};

//! Snippet extraction and deterministic text rewriting for Swift-to-Kotlin
//! translation tests
//!
//! The pipeline around the translator is a chain of pure text stages:
//!
//! 1. [`snippet`] - find the fragment to translate in the calling source file
//! 2. [`conditional`] - resolve `#if KOTLIN … #else … #endif` blocks
//! 3. (the translator itself, see the `skiff-harness` crate)
//! 4. [`patch`] - repair systematic translator defects
//! 5. [`compose`] - add test-runner instrumentation and a package header
//!
//! Results of the original and the translated code are compared as
//! [`ComparableValue`]s.

pub mod compose;
pub mod conditional;
pub mod config;
pub mod error;
pub mod patch;
pub mod snippet;
pub mod value;

// Re-export the types every caller needs
pub use compose::{ArtifactComposer, ComposeOptions};
pub use conditional::{Branch, ConditionalResolver, SelfImportGuard, Tag, TagSet};
pub use config::{HarnessConfig, load_config_from_file, parse_config};
pub use error::{SkiffError, SkiffResult, Stage};
pub use patch::{PatchEngine, PatchMode, PatchRule, RuleGroup};
pub use snippet::{DEFAULT_SENTINEL, LocatedSnippet, SourceFragment, locate, locate_in_text};
pub use value::ComparableValue;

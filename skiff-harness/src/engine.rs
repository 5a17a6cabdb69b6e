//! Script engine boundary and the evaluation bridge
//!
//! Engine construction is expensive, so one engine is built lazily and shared
//! by every evaluation through an `EngineCache`. The cache makes exactly one
//! construction attempt per instance; a failure is remembered and replayed to
//! every later caller.

use serde_json::Value;
use skiff::{ComparableValue, SkiffError, SkiffResult};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// An embedded runtime able to execute a translated artifact
pub trait ScriptEngine: Send + Sync {
    /// Execute `text` and return the value of its last expression
    fn eval(&self, text: &str) -> Result<Value, String>;

    /// Name used in logs to identify the engine
    fn engine_name(&self) -> &str;
}

type EngineFactory = Box<dyn Fn() -> Result<Arc<dyn ScriptEngine>, String> + Send + Sync>;

/// Lazily-built, failure-sticky engine handle
pub struct EngineCache {
    factory: EngineFactory,
    engine: OnceLock<SkiffResult<Arc<dyn ScriptEngine>>>,
    attempts: AtomicUsize,
}

impl fmt::Debug for EngineCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.engine.get() {
            None => "uninitialized",
            Some(Ok(_)) => "ready",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("EngineCache")
            .field("state", &state)
            .field("attempts", &self.construction_attempts())
            .finish()
    }
}

impl EngineCache {
    /// Cache that builds its engine with `factory` on first use
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ScriptEngine>, String> + Send + Sync + 'static,
    {
        EngineCache {
            factory: Box::new(factory),
            engine: OnceLock::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Cache around an engine that already exists
    pub fn with_engine(engine: Arc<dyn ScriptEngine>) -> Self {
        Self::new(move || Ok(engine.clone()))
    }

    /// The shared engine, constructing it on the first call
    ///
    /// Concurrent first calls block until the single construction finishes.
    /// A construction failure is returned as `EngineUnavailable`, now and on
    /// every later call.
    pub fn get(&self) -> SkiffResult<Arc<dyn ScriptEngine>> {
        self.engine
            .get_or_init(|| {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                match (self.factory)() {
                    Ok(engine) => {
                        debug!(engine = engine.engine_name(), "script engine ready");
                        Ok(engine)
                    }
                    Err(message) => {
                        warn!(error = %message, "script engine construction failed");
                        Err(SkiffError::EngineUnavailable(message))
                    }
                }
            })
            .clone()
    }

    pub fn construction_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Runs artifacts on the shared engine and canonicalizes the results
#[derive(Debug, Clone)]
pub struct EvaluationBridge {
    cache: Arc<EngineCache>,
}

impl EvaluationBridge {
    pub fn new(cache: Arc<EngineCache>) -> Self {
        EvaluationBridge { cache }
    }

    pub fn cache(&self) -> &Arc<EngineCache> {
        &self.cache
    }

    /// Evaluate `artifact` as-is
    ///
    /// # Errors
    /// - `EngineUnavailable` when the engine could not be built
    /// - `Eval` with the artifact attached when the engine rejects or throws
    pub fn evaluate(&self, artifact: &str) -> SkiffResult<ComparableValue> {
        let engine = self.cache.get()?;
        debug!(
            engine = engine.engine_name(),
            bytes = artifact.len(),
            "evaluating artifact"
        );
        let native = engine.eval(artifact).map_err(|message| SkiffError::Eval {
            message,
            artifact: artifact.to_string(),
        })?;
        Ok(ComparableValue::from_native(&native))
    }
}

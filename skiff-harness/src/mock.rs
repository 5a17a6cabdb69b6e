//! Mock translator and script engine for testing
//!
//! Deterministic, process-free stand-ins for the two external collaborators,
//! so the whole pipeline can be exercised without a translator binary or an
//! embedded runtime.
//!
//! # Example
//!
//! ```ignore
//! use skiff_harness::{EngineMode, MockEngine, MockMode, MockTranslator, ScriptEngine};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockTranslator::new(MockMode::Echo);
//!     let engine = MockEngine::new(EngineMode::Arithmetic);
//!     assert_eq!(engine.eval("1 + 2 + 3").unwrap(), serde_json::json!(6));
//! }
//! ```

use crate::engine::ScriptEngine;
use crate::translator::{Translator, source_path};
use async_trait::async_trait;
use serde_json::{Value, json};
use skiff::{SkiffError, SkiffResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Return the source unchanged as the translated text
    Echo,

    /// Use predefined whole-source mappings (compared after trimming),
    /// falling back to echo for unknown sources
    Mappings(HashMap<String, String>),

    /// Apply ordered substring substitutions to the source
    Rewrite(Vec<(String, String)>),

    /// Return this response verbatim, whatever the source
    Raw(Value),

    /// Produce no output at all
    Nothing,

    /// Simulate a translator failure
    Error(String),
}

/// One recorded translator invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub args: Vec<String>,
    /// Contents of the source file at the time of the call
    pub source: String,
}

/// Mock translator that reads the persisted source file like a real one would
#[derive(Debug)]
pub struct MockTranslator {
    mode: MockMode,
    calls: Mutex<Vec<MockCall>>,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every invocation seen so far, oldest first
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn apply_translation(&self, source: &str) -> SkiffResult<Option<Value>> {
        let translated = match &self.mode {
            MockMode::Echo => source.to_string(),
            MockMode::Mappings(map) => map
                .get(source.trim())
                .cloned()
                .unwrap_or_else(|| source.to_string()),
            MockMode::Rewrite(pairs) => pairs
                .iter()
                .fold(source.to_string(), |text, (from, to)| text.replace(from, to)),
            MockMode::Raw(value) => return Ok(Some(value.clone())),
            MockMode::Nothing => return Ok(None),
            MockMode::Error(msg) => return Err(SkiffError::Translator(msg.clone())),
        };
        Ok(Some(json!([{ "translatedText": translated }])))
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn compile(&self, args: &[String]) -> SkiffResult<Option<Value>> {
        let path = source_path(args)
            .ok_or_else(|| SkiffError::Translator("no source file given".to_string()))?;
        let source = tokio::fs::read_to_string(path).await?;

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(MockCall {
                args: args.to_vec(),
                source: source.clone(),
            });
        }

        self.apply_translation(&source)
    }

    fn translator_name(&self) -> &str {
        "mock"
    }
}

/// Mock evaluation modes
#[derive(Debug, Clone)]
pub enum EngineMode {
    /// Result keyed by the artifact's last non-empty line (trimmed)
    Mappings(HashMap<String, Value>),

    /// Fold the last non-empty line as `+`-joined number or string literals
    Arithmetic,

    /// Every evaluation throws
    Error(String),
}

/// Mock script engine
#[derive(Debug, Clone)]
pub struct MockEngine {
    mode: EngineMode,
}

impl MockEngine {
    pub fn new(mode: EngineMode) -> Self {
        Self { mode }
    }
}

impl ScriptEngine for MockEngine {
    fn eval(&self, text: &str) -> Result<Value, String> {
        let line = last_expression(text);
        match &self.mode {
            EngineMode::Mappings(map) => map
                .get(line)
                .cloned()
                .ok_or_else(|| format!("unresolved expression: {}", line)),
            EngineMode::Arithmetic => fold_literals(line),
            EngineMode::Error(msg) => Err(msg.clone()),
        }
    }

    fn engine_name(&self) -> &str {
        "mock"
    }
}

/// Engine factory that always fails with `message`
pub fn failing_factory(
    message: &str,
) -> impl Fn() -> Result<Arc<dyn ScriptEngine>, String> + Send + Sync + 'static {
    let message = message.to_string();
    move || Err(message.clone())
}

/// Engine factory producing a fresh `MockEngine` in `mode`
pub fn engine_factory(
    mode: EngineMode,
) -> impl Fn() -> Result<Arc<dyn ScriptEngine>, String> + Send + Sync + 'static {
    move || Ok(Arc::new(MockEngine::new(mode.clone())) as Arc<dyn ScriptEngine>)
}

fn last_expression(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

#[derive(Debug, PartialEq)]
enum Literal {
    Integer(i64),
    Float(f64),
    Str(String),
}

fn fold_literals(expr: &str) -> Result<Value, String> {
    match expr {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" | "nil" => return Ok(Value::Null),
        _ => {}
    }

    let literals = tokenize(expr)?;
    let mut iter = literals.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| "empty expression".to_string())?;

    let folded = iter.try_fold(first, |acc, next| match (acc, next) {
        (Literal::Integer(a), Literal::Integer(b)) => a
            .checked_add(b)
            .map(Literal::Integer)
            .ok_or_else(|| "integer overflow".to_string()),
        (Literal::Integer(a), Literal::Float(b)) => Ok(Literal::Float(a as f64 + b)),
        (Literal::Float(a), Literal::Integer(b)) => Ok(Literal::Float(a + b as f64)),
        (Literal::Float(a), Literal::Float(b)) => Ok(Literal::Float(a + b)),
        (Literal::Str(a), Literal::Str(b)) => Ok(Literal::Str(a + &b)),
        _ => Err("type mismatch: cannot add a string and a number".to_string()),
    })?;

    Ok(match folded {
        Literal::Integer(n) => json!(n),
        Literal::Float(f) => json!(f),
        Literal::Str(s) => Value::String(s),
    })
}

fn tokenize(expr: &str) -> Result<Vec<Literal>, String> {
    let mut literals = Vec::new();
    let mut chars = expr.chars().peekable();
    let mut expect_operand = true;

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if !expect_operand {
            if c != '+' {
                return Err(format!("unexpected '{}' in '{}'", c, expr));
            }
            chars.next();
            expect_operand = true;
            continue;
        }

        if c == '"' {
            chars.next();
            let mut s = String::new();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                match ch {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            s.push(escaped);
                        }
                    }
                    other => s.push(other),
                }
            }
            if !closed {
                return Err(format!("unterminated string in '{}'", expr));
            }
            literals.push(Literal::Str(s));
        } else if c.is_ascii_digit() || c == '-' || c == '.' {
            let mut number = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_ascii_digit() || ch == '.' || (ch == '-' && number.is_empty()) {
                    number.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            let literal = if number.contains('.') {
                number.parse().map(Literal::Float).ok()
            } else {
                number.parse().map(Literal::Integer).ok()
            };
            literals.push(literal.ok_or_else(|| format!("invalid number '{}'", number))?);
        } else {
            return Err(format!("unresolved reference at '{}'", c));
        }
        expect_operand = false;
    }

    if expect_operand && !literals.is_empty() {
        return Err(format!("dangling '+' in '{}'", expr));
    }
    Ok(literals)
}

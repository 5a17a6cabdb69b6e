/// Error types shared by every stage of the skiff pipeline
use std::fmt;

/// Pipeline stage a failure was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Locate,
    Resolve,
    Translate,
    Patch,
    Compose,
    Evaluate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Locate => "locate",
            Stage::Resolve => "resolve",
            Stage::Translate => "translate",
            Stage::Patch => "patch",
            Stage::Compose => "compose",
            Stage::Evaluate => "evaluate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkiffError {
    /// No line at or after the start line begins with the sentinel
    SnippetNotFound {
        path: String,
        start_line: usize,
        sentinel: String,
    },
    /// Reading or writing a file failed
    Io(String),
    /// A configured tag or patch pattern is not a valid regular expression
    InvalidPattern(String),
    /// Configuration could not be loaded
    Config(String),
    /// The translator produced nothing at all
    NoResult,
    /// The translator response was not a list
    NoInitialResult,
    /// The translator response list is empty or does not start with a translation record
    NoInitialTranslationResult,
    /// Error reported by the translator itself, passed through verbatim
    Translator(String),
    /// The script engine rejected or threw while executing an artifact
    Eval { message: String, artifact: String },
    /// The script engine could not be constructed (remembered for the process lifetime)
    EngineUnavailable(String),
    /// Produced text or value disagrees with the hand-written expectation
    ExpectationMismatch { expected: String, actual: String },
    /// The external build exited with a non-zero status
    BuildFailed { exit_code: i32 },
    /// Project directory layout does not match what the project transpiler expects
    Layout(String),
    /// Any of the above, annotated with the stage that raised it
    InStage {
        stage: Stage,
        source: Box<SkiffError>,
    },
}

impl SkiffError {
    /// Annotate this error with the stage it was raised in
    ///
    /// Already-annotated errors keep their original stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            SkiffError::InStage { .. } => self,
            other => SkiffError::InStage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error with any stage annotation removed
    pub fn root(&self) -> &SkiffError {
        match self {
            SkiffError::InStage { source, .. } => source.root(),
            other => other,
        }
    }

    /// The stage this error was annotated with, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SkiffError::InStage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn mismatch(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        SkiffError::ExpectationMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Display for SkiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkiffError::SnippetNotFound {
                path,
                start_line,
                sentinel,
            } => write!(
                f,
                "Unable to find a line starting with '{}' after line {} of {}",
                sentinel, start_line, path
            ),
            SkiffError::Io(msg) => write!(f, "I/O error: {}", msg),
            SkiffError::InvalidPattern(msg) => write!(f, "Invalid pattern: {}", msg),
            SkiffError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SkiffError::NoResult => write!(f, "Translator produced no result"),
            SkiffError::NoInitialResult => {
                write!(f, "Translator result was not a list")
            }
            SkiffError::NoInitialTranslationResult => {
                write!(f, "First translator result is missing or not a translation record")
            }
            SkiffError::Translator(msg) => write!(f, "Translator error: {}", msg),
            SkiffError::Eval { message, artifact } => {
                write!(f, "Evaluation error: {}\n--- artifact ---\n{}", message, artifact)
            }
            SkiffError::EngineUnavailable(msg) => {
                write!(f, "Script engine unavailable: {}", msg)
            }
            SkiffError::ExpectationMismatch { expected, actual } => write!(
                f,
                "Expectation mismatch\n--- expected ---\n{}\n--- actual ---\n{}",
                expected, actual
            ),
            SkiffError::BuildFailed { exit_code } => {
                write!(f, "Build failed with exit code {}", exit_code)
            }
            SkiffError::Layout(msg) => write!(f, "Project layout error: {}", msg),
            SkiffError::InStage { stage, source } => write!(f, "[{}] {}", stage, source),
        }
    }
}

impl std::error::Error for SkiffError {}

impl From<std::io::Error> for SkiffError {
    fn from(err: std::io::Error) -> Self {
        SkiffError::Io(err.to_string())
    }
}

impl From<regex::Error> for SkiffError {
    fn from(err: regex::Error) -> Self {
        SkiffError::InvalidPattern(err.to_string())
    }
}

/// Result type for skiff operations
pub type SkiffResult<T> = Result<T, SkiffError>;

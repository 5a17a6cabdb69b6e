//! Snippet extraction from a calling source file
//!
//! A snippet is the run of lines that follows a known line of a file and ends
//! just before the first line whose trimmed content begins with a sentinel
//! token. Test cases embed the code they want translated directly in their own
//! source file and point the locator at the line of the call:
//!
//! ```text
//! 12 | try check(expect: 6) {
//! 13 |     1+2+3
//! 14 | } verify: {
//! ```
//!
//! Locating from line 12 yields the fragment `["    1+2+3"]`, whose first line
//! is 13.
//!
//! A sentinel line may also carry an inline expectation, written as
//! `<sentinel>: <literal>`; the literal is returned next to the fragment so a
//! caller can compare it against the translated text.

use crate::error::{SkiffError, SkiffResult};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Token that closes an inline snippet unless the caller picks another one
pub const DEFAULT_SENTINEL: &str = "} verify: {";

/// Placeholder for a `return` the source language needs but the target forbids
pub const NORETURN_MARKER: &str = "return /* noreturn */";

const RETURN_PREFIX: &str = "return ";

/// Lines extracted from a source file, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFragment {
    /// File the lines were read from
    pub path: PathBuf,
    /// 1-based line number of the first snippet line (preamble lines excluded)
    pub first_line: usize,
    /// Number of leading lines that came from the preamble range
    pub preamble_len: usize,
    /// Preamble lines followed by snippet lines
    pub lines: Vec<String>,
}

impl SourceFragment {
    /// Join the lines back into one text buffer
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// The snippet lines without the preamble
    pub fn body(&self) -> &[String] {
        &self.lines[self.preamble_len..]
    }

    /// Build a new fragment with `lines` placed before every existing line
    pub fn with_leading_lines(&self, lines: &[String]) -> SourceFragment {
        let mut all = lines.to_vec();
        all.extend(self.lines.iter().cloned());
        SourceFragment {
            path: self.path.clone(),
            first_line: self.first_line,
            preamble_len: self.preamble_len + lines.len(),
            lines: all,
        }
    }
}

/// A located fragment and the optional expectation found on its sentinel line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSnippet {
    pub fragment: SourceFragment,
    pub expectation: Option<String>,
}

/// Read `path` and locate the snippet that follows line `start_line`
///
/// # Arguments
/// * `path` - Source file containing the snippet
/// * `start_line` - 1-based line of the call site; the snippet starts on the next line
/// * `sentinel` - Token that marks the end of the snippet
/// * `preamble` - Optional `start..end` of 1-based marker lines; the lines strictly
///   between them are prepended verbatim
///
/// # Errors
/// - `SkiffError::Io` when the file cannot be read as UTF-8
/// - `SkiffError::SnippetNotFound` when no sentinel line follows `start_line`
pub fn locate(
    path: &Path,
    start_line: usize,
    sentinel: &str,
    preamble: Option<Range<usize>>,
) -> SkiffResult<LocatedSnippet> {
    let code = fs::read_to_string(path)
        .map_err(|e| SkiffError::Io(format!("Failed to read '{}': {}", path.display(), e)))?;
    locate_in_text(&code, path, start_line, sentinel, preamble)
}

/// Locate a snippet in already-loaded file contents
///
/// Same contract as [`locate`]; `path` is only recorded in the fragment and in
/// error messages.
pub fn locate_in_text(
    code: &str,
    path: &Path,
    start_line: usize,
    sentinel: &str,
    preamble: Option<Range<usize>>,
) -> SkiffResult<LocatedSnippet> {
    // split rather than lines(): a trailing empty line must keep its number
    let lines: Vec<&str> = code.split('\n').collect();

    let not_found = || SkiffError::SnippetNotFound {
        path: path.display().to_string(),
        start_line,
        sentinel: sentinel.to_string(),
    };

    if start_line >= lines.len() {
        return Err(not_found());
    }
    let initial = &lines[start_line..];

    let brace = initial
        .iter()
        .position(|line| line.trim().starts_with(sentinel))
        .ok_or_else(not_found)?;
    let expectation = parse_expectation(initial[brace], sentinel);

    let mut parts: Vec<String> = Vec::new();
    if let Some(range) = preamble {
        // both ends name marker lines; only the lines strictly between are kept
        let start = range.start.min(lines.len());
        let end = range.end.saturating_sub(1).min(lines.len()).max(start);
        parts.extend(lines[start..end].iter().map(|line| line.to_string()));
    }
    let preamble_len = parts.len();
    parts.extend(initial[..brace].iter().map(|line| line.to_string()));

    normalize_returns(&mut parts);

    debug!(
        path = %path.display(),
        first_line = start_line + 1,
        lines = parts.len(),
        preamble_len,
        "located snippet"
    );

    Ok(LocatedSnippet {
        fragment: SourceFragment {
            path: path.to_path_buf(),
            first_line: start_line + 1,
            preamble_len,
            lines: parts,
        },
        expectation,
    })
}

/// Extract `<literal>` from a sentinel line of the form `<sentinel>: <literal>`
fn parse_expectation(line: &str, sentinel: &str) -> Option<String> {
    let rest = line.trim().strip_prefix(sentinel)?;
    let literal = rest.strip_prefix(": ")?.trim();
    if literal.is_empty() {
        None
    } else {
        Some(literal.to_string())
    }
}

/// Drop returns that the target language forbids at the top level
///
/// The no-return marker is removed wherever it appears; a plain `return ` is
/// only stripped from the final line, where it yields the snippet's value.
fn normalize_returns(parts: &mut [String]) {
    for part in parts.iter_mut() {
        if part.contains(NORETURN_MARKER) {
            *part = part.replace(NORETURN_MARKER, "");
        }
    }

    if let Some(last) = parts.last_mut() {
        let trimmed = last.trim();
        if let Some(value) = trimmed.strip_prefix(RETURN_PREFIX) {
            *last = value.to_string();
        }
    }
}

//! Final artifact composition
//!
//! Turns patched translator output into the text that is written to disk or
//! handed to the script engine: optionally instruments it for the JUnit test
//! runner, and optionally places it in a package.

use crate::error::SkiffResult;
use regex::Regex;
use tracing::debug;

/// Banner placed above whole-file artifacts
pub const GENERATED_BANNER: &str = "// =========================================\n\
// GENERATED FILE; EDITS WILL BE OVERWRITTEN\n\
// =========================================\n";

/// Imports and runner annotations placed before the primary test class
pub const TEST_RUNNER_HEADER: &str = r#"import kotlin.test.*
import org.junit.Test
import org.junit.Assert
import org.junit.runner.RunWith

import kotlinx.coroutines.*
import kotlinx.coroutines.test.*

@RunWith(org.robolectric.RobolectricTestRunner::class)
@org.robolectric.annotation.Config(manifest=org.robolectric.annotation.Config.NONE)
"#;

/// XCTest assertion surface implemented with JUnit's `Assert`
///
/// XCTest takes assertion arguments as values on Darwin and as autoclosures on
/// Linux, so both shapes get a full overload set. JUnit assertions throw where
/// XCTest records the failure and continues.
pub const XCTEST_SHIM: &str = r#"
// XCTest assertion API on top of JUnit
// JUnit assert* throws on failure; XCTAssert* records the failure and keeps going

private interface XCTestCase {
    fun XCTFail() = Assert.fail()

    fun XCTFail(msg: String) = Assert.fail(msg)

    fun XCTUnwrap(ob: Any?) = { Assert.assertNotNull(ob); ob }
    fun XCTUnwrap(ob: Any?, msg: String) = { Assert.assertNotNull(msg, ob); ob }

    fun XCTAssertTrue(a: Boolean) = Assert.assertTrue(a as Boolean)
    fun XCTAssertTrue(a: Boolean, msg: String) = Assert.assertTrue(msg, a)
    fun XCTAssertFalse(a: Boolean) = Assert.assertFalse(a)
    fun XCTAssertFalse(a: Boolean, msg: String) = Assert.assertFalse(msg, a)

    fun XCTAssertNil(a: Any?) = Assert.assertNull(a)
    fun XCTAssertNil(a: Any?, msg: String) = Assert.assertNull(msg, a)
    fun XCTAssertNotNil(a: Any?) = Assert.assertNotNull(a)
    fun XCTAssertNotNil(a: Any?, msg: String) = Assert.assertNotNull(msg, a)

    fun XCTAssertIdentical(a: Any?, b: Any?) = Assert.assertSame(a, b)
    fun XCTAssertIdentical(a: Any?, b: Any?, msg: String) = Assert.assertSame(msg, a, b)
    fun XCTAssertNotIdentical(a: Any?, b: Any?) = Assert.assertNotSame(a, b)
    fun XCTAssertNotIdentical(a: Any?, b: Any?, msg: String) = Assert.assertNotSame(msg, a, b)

    fun XCTAssertEqual(a: Any?, b: Any?) = Assert.assertEquals(a, b)
    fun XCTAssertEqual(a: Any?, b: Any?, msg: String) = Assert.assertEquals(msg, a, b)
    fun XCTAssertNotEqual(a: Any?, b: Any?) = Assert.assertNotEquals(a, b)
    fun XCTAssertNotEqual(a: Any?, b: Any?, msg: String) = Assert.assertNotEquals(msg, a, b)

    // deferred-argument overloads, matching the autoclosure signatures

    fun XCTUnwrap(ob: () -> Any?) = { val x = ob(); Assert.assertNotNull(x); x }
    fun XCTUnwrap(ob: () -> Any?, msg: () -> String) = { val x = ob(); Assert.assertNotNull(msg(), x); x }

    fun XCTAssertTrue(a: () -> Boolean) = Assert.assertTrue(a())
    fun XCTAssertTrue(a: () -> Boolean, msg: () -> String) = Assert.assertTrue(msg(), a())
    fun XCTAssertFalse(a: () -> Boolean) = Assert.assertFalse(a())
    fun XCTAssertFalse(a: () -> Boolean, msg: () -> String) = Assert.assertFalse(msg(), a())

    fun XCTAssertNil(a: () -> Any?) = Assert.assertNull(a())
    fun XCTAssertNil(a: () -> Any?, msg: () -> String) = Assert.assertNull(msg(), a())
    fun XCTAssertNotNil(a: () -> Any?) = Assert.assertNotNull(a())
    fun XCTAssertNotNil(a: () -> Any?, msg: () -> String) = Assert.assertNotNull(msg(), a())

    fun XCTAssertIdentical(a: () -> Any?, b: () -> Any?) = Assert.assertSame(a(), b())
    fun XCTAssertIdentical(a: () -> Any?, b: () -> Any?, msg: () -> String) = Assert.assertSame(msg(), a(), b())
    fun XCTAssertNotIdentical(a: () -> Any?, b: () -> Any?) = Assert.assertNotSame(a(), b())
    fun XCTAssertNotIdentical(a: () -> Any?, b: () -> Any?, msg: () -> String) = Assert.assertNotSame(msg(), a(), b())

    fun XCTAssertEqual(a: () -> Any?, b: () -> Any?) = Assert.assertEquals(a(), b())
    fun XCTAssertEqual(a: () -> Any?, b: () -> Any?, msg: () -> String) = Assert.assertEquals(msg(), a(), b())
    fun XCTAssertNotEqual(a: () -> Any?, b: () -> Any?) = Assert.assertNotEquals(a(), b())
    fun XCTAssertNotEqual(a: () -> Any?, b: () -> Any?, msg: () -> String) = Assert.assertNotEquals(msg(), a(), b())
}

"#;

const PRIMARY_DECLARATION: &str = "internal class";

/// What to add around the patched text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Instrument the artifact for the JUnit runner
    pub test_shim: bool,
    /// Package to place the artifact in
    pub module_name: Option<String>,
    /// The artifact is a whole generated file rather than an inline snippet
    pub whole_file: bool,
}

/// Builds final artifacts from patched translator output
#[derive(Debug, Clone)]
pub struct ArtifactComposer {
    internal_fun: Regex,
    open_test_fun: Regex,
}

impl ArtifactComposer {
    pub fn new() -> SkiffResult<Self> {
        Ok(ArtifactComposer {
            internal_fun: Regex::new(r"(?:\binternal[ \t]+)+fun ")?,
            open_test_fun: Regex::new(r"\bopen fun (test\w*)")?,
        })
    }

    /// Compose the artifact for `text`
    ///
    /// # Arguments
    /// * `text` - Patched translator output
    /// * `options` - Instrumentation and packaging to apply
    ///
    /// # Returns
    /// A new string; `text` is not modified
    pub fn compose(&self, text: &str, options: &ComposeOptions) -> String {
        let mut artifact = text.to_string();

        if options.test_shim {
            artifact = self.instrument_for_tests(&artifact);
        }

        if let Some(module_name) = &options.module_name {
            let mut header = String::new();
            if options.whole_file {
                header.push_str(GENERATED_BANNER);
            }
            header.push_str(&format!("package {}\n\n", module_name));
            artifact = header + &artifact;
        }

        debug!(
            test_shim = options.test_shim,
            module = options.module_name.as_deref().unwrap_or(""),
            bytes = artifact.len(),
            "composed artifact"
        );
        artifact
    }

    fn instrument_for_tests(&self, text: &str) -> String {
        // files translated separately never went through one shared patch pass
        let text = self.internal_fun.replace_all(text, "fun ");
        let text = self.open_test_fun.replace_all(&text, "@Test fun $1");

        let mut artifact = text.replacen(
            PRIMARY_DECLARATION,
            &format!("{}{}", TEST_RUNNER_HEADER, PRIMARY_DECLARATION),
            1,
        );
        artifact.push_str("\n\n");
        artifact.push_str(XCTEST_SHIM);
        artifact
    }
}

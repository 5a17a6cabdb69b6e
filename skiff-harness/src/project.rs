//! Whole-project transpilation and the Gradle build
//!
//! A Swift package is laid out as
//!
//! ```text
//! <root>/Sources/<Module>/*.swift
//! <root>/Tests/<Module>Tests/*.swift
//! ```
//!
//! Starting from one test file, the module name is derived from its folder,
//! every Swift file under `Sources` and `Tests` is translated into a sibling
//! `.kt` file, and Gradle runs the unit tests of the resulting project.

use crate::pipeline::{Skiff, TranslationOptions};
use skiff::{SkiffError, SkiffResult};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

pub const SOURCES_FOLDER: &str = "Sources";
pub const TESTS_FOLDER: &str = "Tests";

const GRADLE_PROGRAM: &str = "gradle";
const GRADLE_OPTS: &str = "-Xmx512m";
const DEFAULT_ANDROID_SDK: &str = "Library/Android/sdk";

/// Existence checks against the filesystem the project lives on
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// The local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Where a project lives and which module it builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub module_name: String,
}

impl ProjectLayout {
    /// Derive the layout from a test file at `<root>/Tests/<Module>Tests/<file>`
    ///
    /// # Errors
    /// `SkiffError::Layout` when the file's folder is not named `<Module>Tests`
    /// or is not nested two levels below a project root
    pub fn from_test_file(test_file: &Path) -> SkiffResult<Self> {
        let test_base = test_file.parent().ok_or_else(|| {
            SkiffError::Layout(format!("'{}' has no parent folder", test_file.display()))
        })?;
        let folder = test_base
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default();

        let module_name = folder
            .strip_suffix(TESTS_FOLDER)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                SkiffError::Layout(format!(
                    "'{}' must be inside a folder named <Module>{}",
                    test_file.display(),
                    TESTS_FOLDER
                ))
            })?;

        let root = test_base.parent().and_then(Path::parent).ok_or_else(|| {
            SkiffError::Layout(format!(
                "'{}' is not inside {}/<Module>{}",
                test_file.display(),
                TESTS_FOLDER,
                TESTS_FOLDER
            ))
        })?;

        Ok(ProjectLayout {
            root: root.to_path_buf(),
            module_name: module_name.to_string(),
        })
    }
}

/// Build flavor of the Gradle test task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildProfile {
    #[default]
    Debug,
    Release,
}

impl BuildProfile {
    pub fn test_action(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "testDebugUnitTest",
            BuildProfile::Release => "testReleaseUnitTest",
        }
    }
}

/// One Gradle run over a project directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradleInvocation {
    program: String,
    project_dir: PathBuf,
    actions: Vec<String>,
    android_home: String,
}

impl GradleInvocation {
    /// Gradle run of the unit tests for `profile`, configured from the environment
    pub fn new(project_dir: impl Into<PathBuf>, profile: BuildProfile) -> Self {
        Self::from_lookup(project_dir, profile, |key| std::env::var(key).ok())
    }

    /// Same as `new`, reading variables from `lookup`
    ///
    /// `ANDROID_HOME` is used when set; otherwise the SDK is assumed at
    /// `$HOME/Library/Android/sdk`.
    pub fn from_lookup(
        project_dir: impl Into<PathBuf>,
        profile: BuildProfile,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let android_home = lookup("ANDROID_HOME").unwrap_or_else(|| match lookup("HOME") {
            Some(home) => format!("{}/{}", home.trim_end_matches('/'), DEFAULT_ANDROID_SDK),
            None => format!("~/{}", DEFAULT_ANDROID_SDK),
        });

        GradleInvocation {
            program: GRADLE_PROGRAM.to_string(),
            project_dir: project_dir.into(),
            actions: vec![profile.test_action().to_string()],
            android_home,
        }
    }

    /// Run a different executable with the same arguments
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.actions = actions;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = self.actions.clone();
        args.extend(
            [
                "--console",
                "plain",
                "--info",
                "--rerun-tasks",
                "--project-dir",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(self.project_dir.display().to_string());
        args
    }

    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            ("ANDROID_HOME".to_string(), self.android_home.clone()),
            ("GRADLE_OPTS".to_string(), GRADLE_OPTS.to_string()),
        ]
    }

    /// Run the build and wait for it
    ///
    /// # Errors
    /// - `SkiffError::Io` when the program cannot be started
    /// - `SkiffError::BuildFailed` on a non-zero exit (`-1` when killed by a signal)
    pub async fn run(&self) -> SkiffResult<()> {
        info!(program = %self.program, args = ?self.args(), "running build");

        let status = Command::new(&self.program)
            .args(self.args())
            .envs(self.env())
            .status()
            .await
            .map_err(|e| SkiffError::Io(format!("Failed to run '{}': {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(SkiffError::BuildFailed {
                exit_code: status.code().unwrap_or(-1),
            })
        }
    }
}

/// What `transpile_and_test` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub layout: ProjectLayout,
    /// Generated `.kt` files, in the order they were written
    pub written: Vec<PathBuf>,
    pub built: bool,
}

/// Translates every Swift file of a project
pub struct ProjectTranspiler<'a> {
    skiff: &'a Skiff,
    files: &'a dyn FileSystem,
}

impl<'a> ProjectTranspiler<'a> {
    pub fn new(skiff: &'a Skiff) -> Self {
        ProjectTranspiler {
            skiff,
            files: &LocalFileSystem,
        }
    }

    pub fn with_file_system(mut self, files: &'a dyn FileSystem) -> Self {
        self.files = files;
        self
    }

    /// Layout of the project containing `test_file`, which must exist
    pub fn layout(&self, test_file: &Path) -> SkiffResult<ProjectLayout> {
        if !self.files.exists(test_file) {
            return Err(SkiffError::Layout(format!(
                "test file '{}' does not exist",
                test_file.display()
            )));
        }
        ProjectLayout::from_test_file(test_file)
    }

    /// Translate `Sources` and `Tests` into `.kt` files next to their sources
    ///
    /// Files under `Tests` are instrumented as test cases. Missing source
    /// roots are skipped.
    pub async fn transpile(&self, layout: &ProjectLayout) -> SkiffResult<Vec<PathBuf>> {
        info!(module = %layout.module_name, root = %layout.root.display(), "building module");

        let mut written = Vec::new();
        for folder in [SOURCES_FOLDER, TESTS_FOLDER] {
            let base = layout.root.join(folder);
            if !self.files.exists(&base) {
                debug!(path = %base.display(), "source root missing, skipping");
                continue;
            }

            let options = TranslationOptions {
                test_case: folder == TESTS_FOLDER,
                ..TranslationOptions::default()
            };

            let mut sources = collect_swift_files(&base).await?;
            sources.sort();

            for source_path in sources {
                let swift = tokio::fs::read_to_string(&source_path).await.map_err(|e| {
                    SkiffError::Io(format!("Failed to read '{}': {}", source_path.display(), e))
                })?;
                let kotlin = self
                    .skiff
                    .translate(&swift, Some(&layout.module_name), options)
                    .await?;

                let kotlin_path = source_path.with_extension("kt");
                tokio::fs::write(&kotlin_path, kotlin).await.map_err(|e| {
                    SkiffError::Io(format!("Failed to write '{}': {}", kotlin_path.display(), e))
                })?;
                info!(path = %kotlin_path.display(), "wrote translation");
                written.push(kotlin_path);
            }
        }
        Ok(written)
    }

    /// Translate the project around `test_file`, then run its unit tests
    ///
    /// With `build` unset, only the translation happens.
    pub async fn transpile_and_test(
        &self,
        test_file: &Path,
        build: Option<GradleInvocation>,
    ) -> SkiffResult<ProjectReport> {
        let layout = self.layout(test_file)?;
        let written = self.transpile(&layout).await?;

        let built = match build {
            Some(invocation) => {
                invocation.run().await?;
                true
            }
            None => false,
        };

        Ok(ProjectReport {
            layout,
            written,
            built,
        })
    }
}

/// Gather `.swift` files below `dir`
///
/// Symbolic links to directories are not followed.
async fn collect_swift_files(dir: &Path) -> SkiffResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            SkiffError::Io(format!("Failed to read directory '{}': {}", dir.display(), e))
        })?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if path.extension() == Some(OsStr::new("swift")) {
                found.push(path);
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockMode, MockTranslator};
    use skiff::HarnessConfig;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Arc;

    fn echo_skiff() -> Skiff {
        Skiff::new(
            Arc::new(MockTranslator::new(MockMode::Echo)),
            HarnessConfig::default(),
        )
        .unwrap()
    }

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    /// Minimal package: one source file, one nested source file, one test file
    fn package() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("Sources/Demo/Demo.swift"), "internal fun f() = 1");
        write(&root.join("Sources/Demo/Util/Util.swift"), "val u = 2");
        write(&root.join("Sources/Demo/README.md"), "not swift");
        let test_file = root.join("Tests/DemoTests/DemoTests.swift");
        write(
            &test_file,
            "internal class DemoTests {\n    open fun testF() { }\n}",
        );
        (dir, test_file)
    }

    // ========== Layout Tests ==========

    #[test]
    fn test_layout_from_test_file() {
        let layout =
            ProjectLayout::from_test_file(Path::new("/work/pkg/Tests/DemoTests/DemoTests.swift"))
                .unwrap();
        assert_eq!(layout.root, PathBuf::from("/work/pkg"));
        assert_eq!(layout.module_name, "Demo");
    }

    #[test]
    fn test_layout_requires_tests_folder() {
        for path in [
            "/work/pkg/Sources/Demo/Demo.swift",
            "/work/pkg/Tests/Tests/X.swift",
        ] {
            assert!(matches!(
                ProjectLayout::from_test_file(Path::new(path)),
                Err(SkiffError::Layout(_))
            ));
        }
    }

    struct FakeFileSystem(Vec<PathBuf>);

    impl FileSystem for FakeFileSystem {
        fn exists(&self, path: &Path) -> bool {
            self.0.iter().any(|p| p == path)
        }
    }

    #[test]
    fn test_layout_checks_existence_through_file_system() {
        let skiff = echo_skiff();
        let test_file = PathBuf::from("/virtual/pkg/Tests/DemoTests/DemoTests.swift");

        let present = FakeFileSystem(vec![test_file.clone()]);
        let transpiler = ProjectTranspiler::new(&skiff).with_file_system(&present);
        assert_eq!(transpiler.layout(&test_file).unwrap().module_name, "Demo");

        let absent = FakeFileSystem(vec![]);
        let transpiler = ProjectTranspiler::new(&skiff).with_file_system(&absent);
        assert!(matches!(
            transpiler.layout(&test_file),
            Err(SkiffError::Layout(_))
        ));
    }

    // ========== Transpile Tests ==========

    #[tokio::test]
    async fn test_transpile_writes_sibling_kotlin_files() {
        let (dir, test_file) = package();
        let skiff = echo_skiff();
        let report = ProjectTranspiler::new(&skiff)
            .transpile_and_test(&test_file, None)
            .await
            .unwrap();

        let root = dir.path();
        assert_eq!(report.layout.module_name, "Demo");
        assert!(!report.built);
        assert_eq!(
            report.written,
            vec![
                root.join("Sources/Demo/Demo.kt"),
                root.join("Sources/Demo/Util/Util.kt"),
                root.join("Tests/DemoTests/DemoTests.kt"),
            ]
        );
        assert!(!root.join("Sources/Demo/README.kt").exists());
    }

    #[tokio::test]
    async fn test_sources_get_package_and_tests_get_shim() {
        let (dir, test_file) = package();
        let skiff = echo_skiff();
        ProjectTranspiler::new(&skiff)
            .transpile_and_test(&test_file, None)
            .await
            .unwrap();

        let source = fs::read_to_string(dir.path().join("Sources/Demo/Demo.kt")).unwrap();
        assert!(source.starts_with(skiff::compose::GENERATED_BANNER));
        assert!(source.contains("package Demo\n\nfun f() = 1"));
        assert!(!source.contains("XCTestCase"));

        let test = fs::read_to_string(dir.path().join("Tests/DemoTests/DemoTests.kt")).unwrap();
        assert!(test.contains("package Demo"));
        assert!(test.contains("@Test fun testF()"));
        assert!(test.contains("private interface XCTestCase"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_directories_are_not_followed() {
        let (dir, test_file) = package();
        let util = dir.path().join("Sources/Demo/Util");
        std::os::unix::fs::symlink(dir.path().join("Sources"), util.join("Loop")).unwrap();

        let skiff = echo_skiff();
        let report = ProjectTranspiler::new(&skiff)
            .transpile_and_test(&test_file, None)
            .await
            .unwrap();
        assert_eq!(report.written.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_sources_folder_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("Tests/OnlyTests/OnlyTests.swift");
        write(&test_file, "val t = 1");

        let skiff = echo_skiff();
        let report = ProjectTranspiler::new(&skiff)
            .transpile_and_test(&test_file, None)
            .await
            .unwrap();
        assert_eq!(report.written.len(), 1);
    }

    #[tokio::test]
    async fn test_translation_failure_stops_the_project() {
        let (_dir, test_file) = package();
        let skiff = Skiff::new(
            Arc::new(MockTranslator::new(MockMode::Error("bad".to_string()))),
            HarnessConfig::default(),
        )
        .unwrap();
        let err = ProjectTranspiler::new(&skiff)
            .transpile_and_test(&test_file, None)
            .await
            .unwrap_err();
        assert_eq!(err.root(), &SkiffError::Translator("bad".to_string()));
    }

    // ========== Build Tests ==========

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_gradle_arguments() {
        let gradle = GradleInvocation::from_lookup("/work/pkg", BuildProfile::Debug, lookup(&[]));
        assert_eq!(gradle.program(), "gradle");
        assert_eq!(
            gradle.args(),
            vec![
                "testDebugUnitTest",
                "--console",
                "plain",
                "--info",
                "--rerun-tasks",
                "--project-dir",
                "/work/pkg",
            ]
        );
    }

    #[test]
    fn test_release_profile_action() {
        let gradle = GradleInvocation::from_lookup("/p", BuildProfile::Release, lookup(&[]));
        assert_eq!(gradle.args()[0], "testReleaseUnitTest");
    }

    #[test]
    fn test_gradle_environment() {
        let from_home =
            GradleInvocation::from_lookup("/p", BuildProfile::Debug, lookup(&[("HOME", "/home/dev/")]));
        assert_eq!(
            from_home.env(),
            vec![
                ("ANDROID_HOME".to_string(), "/home/dev/Library/Android/sdk".to_string()),
                ("GRADLE_OPTS".to_string(), "-Xmx512m".to_string()),
            ]
        );

        let explicit = GradleInvocation::from_lookup(
            "/p",
            BuildProfile::Debug,
            lookup(&[("HOME", "/home/dev"), ("ANDROID_HOME", "/opt/android")]),
        );
        assert_eq!(explicit.env()[0].1, "/opt/android");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_exit_status() {
        let ok = GradleInvocation::from_lookup("/p", BuildProfile::Debug, lookup(&[]))
            .with_program("true");
        assert_eq!(ok.run().await, Ok(()));

        let failing = GradleInvocation::from_lookup("/p", BuildProfile::Debug, lookup(&[]))
            .with_program("sh")
            .with_actions(vec!["-c".to_string(), "exit 7".to_string()]);
        assert_eq!(failing.run().await, Err(SkiffError::BuildFailed { exit_code: 7 }));
    }

    #[tokio::test]
    async fn test_build_program_missing() {
        let gradle = GradleInvocation::from_lookup("/p", BuildProfile::Debug, lookup(&[]))
            .with_program("skiff-no-such-gradle");
        assert!(matches!(gradle.run().await, Err(SkiffError::Io(_))));
    }
}

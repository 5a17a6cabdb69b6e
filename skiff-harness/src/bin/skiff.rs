use clap::{Arg, ArgAction, ArgMatches, Command};
use skiff::{HarnessConfig, load_config_from_file};
use skiff_harness::{
    BuildProfile, EngineCache, EngineMode, GradleInvocation, MockMode, MockTranslator,
    ProcessTranslator, ProjectLayout, ProjectTranspiler, Skiff, TranslationOptions, Translator,
    engine_factory,
};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("skiff")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Swift-to-Kotlin translation harness")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON harness configuration file")
                .global(true),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .short('m')
                .help("Use the echoing mock translator instead of $SKIFF_TRANSLATOR")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("translate")
                .about("Translate a whole Swift file and print the Kotlin")
                .arg(Arg::new("file").help("Swift source file").required(true).index(1))
                .arg(
                    Arg::new("module")
                        .long("module")
                        .help("Package name for the generated file"),
                )
                .arg(
                    Arg::new("autoport")
                        .long("autoport")
                        .help("Repair Java standard library references")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("test-case")
                        .long("test-case")
                        .help("Instrument the output as a JUnit test case")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("inline")
                .about("Translate the snippet that follows a line of a Swift file")
                .arg(Arg::new("file").help("Swift source file").required(true).index(1))
                .arg(
                    Arg::new("line")
                        .help("1-based line of the call site")
                        .required(true)
                        .index(2)
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("sentinel")
                        .long("sentinel")
                        .help("Token closing the snippet (default: \"} verify: {\")"),
                )
                .arg(
                    Arg::new("preamble")
                        .long("preamble")
                        .help("Prepend the lines between marker lines START and END (1-based, both excluded)"),
                )
                .arg(
                    Arg::new("autoport")
                        .long("autoport")
                        .help("Repair Java standard library references")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("evaluate")
                        .long("evaluate")
                        .help("Evaluate the translation (requires --mock)")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("project")
                .about("Translate a Swift package and run its unit tests with Gradle")
                .arg(
                    Arg::new("test-file")
                        .help("A test file at <root>/Tests/<Module>Tests/<file>.swift")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("release")
                        .long("release")
                        .help("Run testReleaseUnitTest instead of testDebugUnitTest")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("skip-build")
                        .long("skip-build")
                        .help("Only write the Kotlin files")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => load_config_from_file(Path::new(path))?,
        None => HarnessConfig::default(),
    };
    let use_mock = matches.get_flag("mock");

    let translator: Arc<dyn Translator> = if use_mock {
        Arc::new(MockTranslator::new(MockMode::Echo))
    } else {
        Arc::new(ProcessTranslator::from_env()?)
    };

    match matches.subcommand() {
        Some(("translate", sub)) => {
            let file = required(sub, "file")?;
            let swift = std::fs::read_to_string(&file)?;
            let options = TranslationOptions {
                autoport: sub.get_flag("autoport"),
                test_case: sub.get_flag("test-case"),
            };
            let skiff = Skiff::new(translator, config)?;
            let module = sub.get_one::<String>("module").map(String::as_str);
            println!("{}", skiff.translate(&swift, module, options).await?);
        }
        Some(("inline", sub)) => {
            let file = required(sub, "file")?;
            let line = *sub
                .get_one::<usize>("line")
                .ok_or("missing line number")?;
            if let Some(sentinel) = sub.get_one::<String>("sentinel") {
                config.sentinel = sentinel.clone();
            }
            let preamble = sub
                .get_one::<String>("preamble")
                .map(|range| parse_range(range))
                .transpose()?;
            let options = TranslationOptions {
                autoport: sub.get_flag("autoport"),
                ..TranslationOptions::default()
            };

            let mut skiff = Skiff::new(translator, config)?;
            if use_mock && sub.get_flag("evaluate") {
                skiff = skiff.with_engine(Arc::new(EngineCache::new(engine_factory(
                    EngineMode::Arithmetic,
                ))));
            }

            let translation = skiff.transpile_inline(&file, line, preamble, options).await?;
            println!("{}", translation.translated);
            if let Some(expectation) = &translation.expectation {
                info!(%expectation, "inline expectation");
            }
            if sub.get_flag("evaluate") {
                println!("=> {}", skiff.evaluate(&translation.translated)?);
            }
        }
        Some(("project", sub)) => {
            let test_file = required(sub, "test-file")?;
            let profile = if sub.get_flag("release") {
                BuildProfile::Release
            } else {
                BuildProfile::Debug
            };
            let build = if sub.get_flag("skip-build") {
                None
            } else {
                let layout = ProjectLayout::from_test_file(&test_file)?;
                Some(GradleInvocation::new(layout.root, profile))
            };

            let skiff = Skiff::new(translator, config)?;
            let report = ProjectTranspiler::new(&skiff)
                .transpile_and_test(&test_file, build)
                .await?;
            info!(
                module = %report.layout.module_name,
                files = report.written.len(),
                built = report.built,
                "project done"
            );
        }
        _ => return Err("unknown subcommand".into()),
    }

    Ok(())
}

fn required(matches: &ArgMatches, name: &str) -> Result<PathBuf, String> {
    matches
        .get_one::<String>(name)
        .map(PathBuf::from)
        .ok_or_else(|| format!("missing argument <{}>", name))
}

/// Parse `START..END` into a line range
fn parse_range(text: &str) -> Result<Range<usize>, String> {
    let (start, end) = text
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{}'", text))?;
    let start: usize = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid range start '{}': {}", start, e))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid range end '{}': {}", end, e))?;
    if end < start {
        return Err(format!("range end {} is before start {}", end, start));
    }
    Ok(start..end)
}

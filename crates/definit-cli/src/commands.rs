use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use definit_engine::{classify, is_deinitable, DeinitReport, Deinitializer, EngineConfig, Value};

use crate::cli::*;
use crate::scenario::{self, Scenario};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Diff,
    Deep,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Diff => "diff",
            Mode::Deep => "deep",
        }
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Diff(args) => cmd_release(Mode::Diff, &args, &config, &cli.format),
        Command::Deep(args) => cmd_release(Mode::Deep, &args, &config, &cli.format),
        Command::Check(args) => cmd_check(&args, &cli.format),
    }
}

/// Read the engine configuration, or use the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: EngineConfig =
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    debug!(?config, "loaded engine config");
    Ok(config)
}

/// Run the engine over a parsed scenario.
pub fn run_scenario(mode: Mode, scenario: &Scenario, config: &EngineConfig) -> DeinitReport {
    let engine = Deinitializer::new(config.clone());
    match mode {
        Mode::Diff => engine.diff(&scenario.prev, &scenario.next),
        Mode::Deep => engine.deep(&scenario.prev),
    }
}

fn cmd_release(
    mode: Mode,
    args: &ScenarioArgs,
    config: &EngineConfig,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let scenario = scenario::load(&args.scenario)?;
    let report = run_scenario(mode, &scenario, config);
    let released = scenario.released();

    match format {
        OutputFormat::Text => {
            if released.is_empty() {
                println!("Nothing to release.");
            }
            for label in &released {
                if scenario.failing.contains(label) {
                    println!("  {} {}", "✗".red().bold(), label.red());
                } else {
                    println!("  {} {}", "✓".green(), label);
                }
            }
            println!(
                "{} released, {} failed, {} composites entered, {} survivors skipped",
                report.released.to_string().bold(),
                report.failed.to_string().bold(),
                report.composites_entered,
                report.survivors_skipped,
            );
        }
        OutputFormat::Json => {
            let out = release_json(mode, &scenario, &report);
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    match report.error {
        Some(err) => Err(anyhow::Error::new(err).context("cleanup traversal signalled a failure")),
        None => Ok(()),
    }
}

/// Machine-readable summary of one release run.
fn release_json(mode: Mode, scenario: &Scenario, report: &DeinitReport) -> serde_json::Value {
    let released = scenario.released();
    let failed: Vec<&String> = released
        .iter()
        .filter(|label| scenario.failing.contains(*label))
        .collect();
    json!({
        "mode": mode.as_str(),
        "released": released,
        "failed": failed,
        "stats": {
            "released": report.released,
            "failed": report.failed,
            "composites_entered": report.composites_entered,
            "survivors_skipped": report.survivors_skipped,
            "cycles_skipped": report.cycles_skipped,
            "repeats_skipped": report.repeats_skipped,
        },
        "error": report.error.as_ref().map(|e| e.to_string()),
    })
}

fn cmd_check(args: &ScenarioArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let scenario = scenario::load(&args.scenario)?;

    match format {
        OutputFormat::Text => {
            println!("prev: {}", describe_root(&scenario.prev));
            println!("next: {}", describe_root(&scenario.next));
            println!("{} resources:", scenario.resources.len().to_string().bold());
            for label in &scenario.resources {
                if scenario.failing.contains(label) {
                    println!("  {} {}", label.yellow(), "(fails)".red());
                } else {
                    println!("  {}", label.yellow());
                }
            }
        }
        OutputFormat::Json => {
            let out = json!({
                "prev": describe_root(&scenario.prev),
                "next": describe_root(&scenario.next),
                "resources": scenario.resources,
                "failing": scenario.failing,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn describe_root(value: &Value) -> String {
    if value.is_undefined() {
        return "absent".into();
    }
    let category = classify(value);
    if is_deinitable(value) {
        format!("{category} (deinitable)")
    } else {
        format!("{category} ({})", value.kind_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use definit_engine::{DeinitError, ErrorPolicy, Seq};

    const SCENARIO: &str = r#"{
        "prev": {
            "db": {"$resource": "db"},
            "subs": [{"$resource": "s1"}, {"$resource": "s2"}],
            "cache": {"$opaque": "lru"}
        },
        "next": {
            "db": {"$resource": "db"},
            "subs": [{"$resource": "s2"}]
        },
        "failing": ["s1"]
    }"#;

    #[test]
    fn diff_releases_only_dropped_resources() {
        let scenario = scenario::parse(SCENARIO).unwrap();
        let report = run_scenario(Mode::Diff, &scenario, &EngineConfig::default());
        assert_eq!(scenario.released(), vec!["s1"]);
        assert_eq!(report.failed, 1);
        assert!(matches!(report.error, Some(DeinitError::Cleanup { ref resource, .. }) if resource == "s1"));
    }

    #[test]
    fn deep_releases_everything_in_document_order() {
        let scenario = scenario::parse(SCENARIO).unwrap();
        let report = run_scenario(Mode::Deep, &scenario, &EngineConfig::default());
        assert_eq!(scenario.released(), vec!["db", "s1", "s2"]);
        assert_eq!(report.released, 2);
    }

    #[test]
    fn cyclic_scenario_terminates() {
        let scenario = scenario::parse(
            r#"{"prev": {"$anchor": "loop", "value": [{"$ref": "loop"}, {"$resource": "r"}]}}"#,
        )
        .unwrap();
        let report = run_scenario(Mode::Deep, &scenario, &EngineConfig::default());
        assert!(report.is_clean());
        assert_eq!(scenario.released(), vec!["r"]);
        assert_eq!(report.cycles_skipped, 1);
    }

    #[test]
    fn default_config_without_file() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn config_file_is_parsed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "error_policy = \"collect-all\"").unwrap();
        writeln!(file, "max_depth = 3").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.error_policy, ErrorPolicy::CollectAll);
        assert_eq!(config.max_depth, Some(3));
    }

    #[test]
    fn bad_config_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "error_policy = \"sometimes\"").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().starts_with("parsing config"));
    }

    fn scenario_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{text}").unwrap();
        file
    }

    #[test]
    fn json_summary_lists_releases_and_stats() {
        let scenario = scenario::parse(SCENARIO).unwrap();
        let report = run_scenario(Mode::Deep, &scenario, &EngineConfig::default());
        let out = release_json(Mode::Deep, &scenario, &report);

        assert_eq!(out["mode"], "deep");
        assert_eq!(out["released"], json!(["db", "s1", "s2"]));
        assert_eq!(out["failed"], json!(["s1"]));
        assert_eq!(out["stats"]["released"], 2);
        assert_eq!(out["stats"]["failed"], 1);
        assert_eq!(out["stats"]["composites_entered"], 2);
        assert_eq!(out["error"], "cleanup of s1 failed: s1 is configured to fail");
    }

    #[test]
    fn json_summary_of_clean_run_has_null_error() {
        let scenario = scenario::parse(r#"{"prev": [{"$resource": "r"}]}"#).unwrap();
        let report = run_scenario(Mode::Diff, &scenario, &EngineConfig::default());
        let out = release_json(Mode::Diff, &scenario, &report);

        assert_eq!(out["mode"], "diff");
        assert_eq!(out["failed"], json!([]));
        assert!(out["error"].is_null());
    }

    #[test]
    fn release_command_fails_when_cleanup_fails() {
        let file = scenario_file(SCENARIO);
        let args = ScenarioArgs {
            scenario: file.path().to_path_buf(),
        };

        for format in [OutputFormat::Text, OutputFormat::Json] {
            let err = cmd_release(Mode::Diff, &args, &EngineConfig::default(), &format)
                .unwrap_err();
            assert_eq!(err.to_string(), "cleanup traversal signalled a failure");
            assert!(format!("{err:#}").contains("cleanup of s1 failed"));
        }
    }

    #[test]
    fn release_command_succeeds_when_clean() {
        let file = scenario_file(r#"{"prev": {"a": {"$resource": "a"}}, "next": {}}"#);
        let args = ScenarioArgs {
            scenario: file.path().to_path_buf(),
        };
        cmd_release(Mode::Diff, &args, &EngineConfig::default(), &OutputFormat::Json).unwrap();
    }

    #[test]
    fn root_descriptions() {
        assert_eq!(describe_root(&Value::Undefined), "absent");
        assert_eq!(describe_root(&Value::Seq(Seq::new())), "sequence (seq)");
        assert_eq!(describe_root(&Value::from(1.0)), "opaque (number)");
    }
}

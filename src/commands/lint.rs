use crate::cli::{PresetChoice, ReportFormat};
use crate::models::{IgnoreList, RuleFunctionResultSet, Severity};
use crate::motor::{RuleSetExecution, RuleSetExecutionResult, apply_rules};
use crate::rulesets::RuleSetComposer;
use crate::{LintError, Result};
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options of the `lint` command
#[derive(Debug, Clone)]
pub struct LintOptions {
    pub spec: PathBuf,
    pub ruleset: Option<PathBuf>,
    pub preset: PresetChoice,
    pub ignore: Option<PathBuf>,
    pub format: ReportFormat,
    pub timeout: Duration,
    pub skip_check: bool,
    pub allow_lookup: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    spec: String,
    counts: crate::models::SeverityCounts,
    results: &'a RuleFunctionResultSet,
    ignored: usize,
    errors: Vec<String>,
}

/// Lint a spec and print the report; returns whether any `error` result was found
pub async fn execute_lint(options: &LintOptions) -> Result<bool> {
    let bytes = tokio::fs::read(&options.spec)
        .await
        .map_err(|e| LintError::LocalRead {
            location: options.spec.display().to_string(),
            cause: e.to_string(),
        })?;

    let rule_set = match &options.ruleset {
        Some(path) => RuleSetComposer::new().compose_file(path).await?,
        None => match options.preset {
            PresetChoice::Recommended => RuleSetComposer::generate_openapi_recommended(),
            PresetChoice::All => RuleSetComposer::generate_openapi_default(),
        },
    };

    let ignored = match &options.ignore {
        Some(path) => {
            let raw = tokio::fs::read(path)
                .await
                .map_err(|e| LintError::LocalRead {
                    location: path.display().to_string(),
                    cause: e.to_string(),
                })?;
            IgnoreList::from_yaml(&raw)?
        }
        None => IgnoreList::default(),
    };

    let (base, file_name) = split_spec_path(&options.spec);
    let mut execution = RuleSetExecution::new(rule_set, bytes)
        .with_file_name(file_name)
        .with_timeout(options.timeout)
        .with_skip_document_check(options.skip_check)
        .with_allow_lookup(options.allow_lookup)
        .with_ignored_results(ignored);
    if let Some(base) = base {
        execution = execution.with_base(base);
    }

    let outcome = apply_rules(&execution).await;
    let mut results = RuleFunctionResultSet::new(outcome.results.clone());
    results.sort_total();
    let counts = results.severity_counts();

    match options.format {
        ReportFormat::Json => print_json(&options.spec, &results, &outcome)?,
        ReportFormat::Text => print_text(&options.spec, &results, &outcome),
    }
    Ok(counts.error > 0)
}

fn split_spec_path(spec: &Path) -> (Option<String>, String) {
    let file_name = spec
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| spec.display().to_string());
    let base = spec
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.display().to_string());
    (base, file_name)
}

fn print_json(
    spec: &Path,
    results: &RuleFunctionResultSet,
    outcome: &RuleSetExecutionResult,
) -> Result<()> {
    let report = JsonReport {
        spec: spec.display().to_string(),
        counts: results.severity_counts(),
        results,
        ignored: outcome.ignored_results.len(),
        errors: outcome.errors.iter().map(ToString::to_string).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_text(spec: &Path, results: &RuleFunctionResultSet, outcome: &RuleSetExecutionResult) {
    println!("{}", "Linting OpenAPI document...".bright_blue());
    println!("  Path: {}", spec.display());
    if let Some(info) = &outcome.spec_info {
        println!("  Format: {} {}", info.spec_type, info.version);
        if let Some(title) = &info.title {
            println!("  Title: {}", title.bold());
        }
    }
    println!();

    for error in &outcome.errors {
        println!("  {} {}", "!".yellow().bold(), error.to_string().yellow());
    }
    if !outcome.errors.is_empty() {
        println!();
    }

    for result in results.iter() {
        let severity = match result.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warn => "warn".yellow().bold(),
            Severity::Info => "info".bright_blue(),
            Severity::Hint => "hint".normal(),
            Severity::Off => continue,
        };
        let location = match result.origin.as_ref() {
            Some(origin) => format!("{}:{}:{}", origin.filename, origin.line, origin.column),
            None => format!("{}:{}", result.start_node.line, result.start_node.column),
        };
        println!(
            "  {:<8} {:<7} {:<40} {}",
            location.dimmed(),
            severity,
            result.rule_id.cyan(),
            result.message
        );
        println!("  {:<8} {:<7} {}", "", "", result.path.dimmed());
    }

    let counts = results.severity_counts();
    println!();
    if results.is_empty() {
        println!("{}", "✓ No problems found".green());
    } else {
        let summary = format!(
            "{} error(s), {} warning(s), {} info, {} hint(s)",
            counts.error, counts.warn, counts.info, counts.hint
        );
        if counts.error > 0 {
            println!("{}", format!("✗ {}", summary).red().bold());
        } else {
            println!("{}", summary.yellow());
        }
    }
    if !outcome.ignored_results.is_empty() {
        println!("  {} result(s) ignored", outcome.ignored_results.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_spec_path() {
        assert_eq!(
            split_spec_path(Path::new("specs/api.yaml")),
            (Some("specs".to_string()), "api.yaml".to_string())
        );
        assert_eq!(split_spec_path(Path::new("api.yaml")), (None, "api.yaml".to_string()));
    }

    #[tokio::test]
    async fn test_lint_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("api.yaml");
        std::fs::write(&spec, "openapi: 3.0.0\ninfo:\n  title: T\n  version: '1'\n").unwrap();

        let options = LintOptions {
            spec,
            ruleset: None,
            preset: PresetChoice::Recommended,
            ignore: None,
            format: ReportFormat::Json,
            timeout: Duration::from_secs(5),
            skip_check: false,
            allow_lookup: false,
        };
        // missing `paths` fails the structural check
        assert!(execute_lint(&options).await.unwrap());
    }

    #[tokio::test]
    async fn test_lint_missing_spec() {
        let options = LintOptions {
            spec: PathBuf::from("/definitely/not/here.yaml"),
            ruleset: None,
            preset: PresetChoice::All,
            ignore: None,
            format: ReportFormat::Text,
            timeout: Duration::from_secs(5),
            skip_check: true,
            allow_lookup: false,
        };
        assert!(matches!(execute_lint(&options).await, Err(LintError::LocalRead { .. })));
    }

    #[tokio::test]
    async fn test_lint_missing_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("api.yaml");
        std::fs::write(
            &spec,
            "openapi: 3.0.0\ninfo:\n  title: T\n  version: '1'\npaths: {}\n",
        )
        .unwrap();

        let options = LintOptions {
            spec,
            ruleset: None,
            preset: PresetChoice::Recommended,
            ignore: Some(dir.path().join("missing-ignore.yaml")),
            format: ReportFormat::Text,
            timeout: Duration::from_secs(5),
            skip_check: false,
            allow_lookup: false,
        };
        let outcome = execute_lint(&options).await;
        assert!(matches!(
            outcome,
            Err(LintError::LocalRead { ref location, .. }) if location.ends_with("missing-ignore.yaml")
        ));
    }
}

use crate::Result;
use crate::cli::PresetChoice;
use crate::models::Severity;
use crate::rulesets::RuleSetComposer;
use colored::*;

pub fn execute_rules(preset: PresetChoice) -> Result<()> {
    let ruleset = match preset {
        PresetChoice::Recommended => RuleSetComposer::generate_openapi_recommended(),
        PresetChoice::All => RuleSetComposer::generate_openapi_default(),
    };

    println!("{}", format!("Built-in rules ({}):", ruleset.rules.len()).bold());
    for rule in ruleset.rules.values() {
        let severity = match rule.severity {
            Severity::Error => "error".red(),
            Severity::Warn => "warn".yellow(),
            Severity::Info => "info".bright_blue(),
            Severity::Hint | Severity::Off => rule.severity.as_str().normal(),
        };
        println!();
        println!("  {} [{}] {}", rule.id.cyan().bold(), severity, rule.category.name().dimmed());
        println!("     {}", rule.display_text());
        if !rule.formats.is_empty() {
            println!("     Formats: {}", rule.formats.join(", "));
        }
        if let Some(how_to_fix) = &rule.how_to_fix {
            println!("     Fix: {}", how_to_fix);
        }
    }
    Ok(())
}

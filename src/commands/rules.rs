use crate::commands::{OptionOverrides, load_config};
use crate::config::ConversionOptions;
use crate::rules::TransformationRule;
use crate::rules::custom::load_from_yaml;
use crate::rules::table::{BUILTIN_RULES, RULE_TABLE_VERSION};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize, Debug)]
pub struct RuleSummary {
    pub name: String,
    pub description: String,
    pub tier: &'static str,
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<&'static str>,
    pub enabled: bool,
    pub custom: bool,
}

fn summarize(rule: &TransformationRule, options: &ConversionOptions, custom: bool) -> RuleSummary {
    RuleSummary {
        name: rule.name.clone(),
        description: rule.description.clone(),
        tier: rule.tier.label(),
        category: rule.category.label(),
        target: rule.only_for.map(|t| t.label()),
        enabled: rule.applies_to(options),
        custom,
    }
}

/// Built-in rules in application order, then the project's custom rules.
pub fn rule_summaries(options: &ConversionOptions, custom: &[Arc<TransformationRule>]) -> Vec<RuleSummary> {
    BUILTIN_RULES
        .iter()
        .map(|r| summarize(r, options, false))
        .chain(custom.iter().map(|r| summarize(r, options, true)))
        .collect()
}

pub fn handle_rules_command(project_root: &Path, overrides: &OptionOverrides, json: bool) -> anyhow::Result<()> {
    let config = load_config(project_root, overrides)?;
    let custom = match config.extra_rules_path(project_root) {
        Some(path) => load_from_yaml(&path)?,
        None => Vec::new(),
    };
    let summaries = rule_summaries(&config.options, &custom);

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("\n{} (tabla v{})", "Reglas de reescritura:".bold(), RULE_TABLE_VERSION);
    for r in &summaries {
        let status = if r.enabled { "[ON] ".green() } else { "[OFF]".dimmed() };
        let origin = if r.custom { " (custom)" } else { "" };
        println!(
            "  {} {:<36} {:<14} {:<8} {}{}",
            status,
            r.name.yellow(),
            format!("[{}]", r.category),
            r.tier,
            r.description,
            origin.cyan()
        );
    }
    let activas = summaries.iter().filter(|r| r.enabled).count();
    println!();
    println!("   Info: {} de {} reglas activas con la configuración actual.", activas, summaries.len());
    println!("   Las reglas de API solo se aplican dentro de los handlers convertidos.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_categories_turn_rules_off() {
        let options = ConversionOptions {
            transform_data_fetching: false,
            ..ConversionOptions::default()
        };
        let summaries = rule_summaries(&options, &[]);
        assert_eq!(summaries.len(), BUILTIN_RULES.len());
        assert!(
            summaries
                .iter()
                .filter(|r| r.category == "data-fetching")
                .all(|r| !r.enabled)
        );
        assert!(summaries.iter().any(|r| r.enabled));
        assert!(summaries.iter().filter(|r| r.category == "api").all(|r| !r.enabled));
    }
}

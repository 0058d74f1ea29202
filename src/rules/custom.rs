//! User rules loaded from a YAML file and appended after the built-in table.
//!
//! ```yaml
//! version: 1
//! rules:
//!   - name: analytics
//!     description: "Swap the analytics wrapper"
//!     pattern: "from '@/lib/next-analytics'"
//!     replacement: "from '@/lib/analytics'"
//!     category: general
//! ```

use crate::rules::{ComplexityTier, RuleCategory, TransformationRule};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CustomRuleFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub rules: Vec<CustomRule>,
}

fn default_version() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CustomRule {
    #[serde(default)]
    pub name: Option<String>,
    pub description: String,
    pub pattern: String,
    pub replacement: String,
    #[serde(default = "default_category")]
    pub category: RuleCategory,
    #[serde(default = "default_tier")]
    pub tier: ComplexityTier,
    #[serde(default)]
    pub advisory: Option<String>,
}

fn default_category() -> RuleCategory {
    RuleCategory::General
}

fn default_tier() -> ComplexityTier {
    ComplexityTier::Simple
}

impl CustomRule {
    fn compile(&self, index: usize) -> anyhow::Result<TransformationRule> {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("custom/{}", index + 1));
        let rule = TransformationRule::template(
            &name,
            &self.pattern,
            &self.replacement,
            &self.description,
            self.tier,
            self.category,
        )
        .with_context(|| format!("rule '{}' has an invalid pattern", name))?;
        Ok(match &self.advisory {
            Some(advisory) => rule.with_advisory(advisory),
            None => rule,
        })
    }
}

pub fn parse_rules(content: &str) -> anyhow::Result<Vec<Arc<TransformationRule>>> {
    let file: CustomRuleFile = serde_yaml::from_str(content)?;
    file.rules
        .iter()
        .enumerate()
        .map(|(i, r)| r.compile(i).map(Arc::new))
        .collect()
}

pub fn load_from_yaml(yaml_path: &Path) -> anyhow::Result<Vec<Arc<TransformationRule>>> {
    let content = fs::read_to_string(yaml_path)
        .with_context(|| format!("reading {}", yaml_path.display()))?;
    parse_rules(&content).with_context(|| format!("loading rules from {}", yaml_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionOptions;
    use crate::rules::RuleRewriter;
    use tempfile::TempDir;

    const RULES: &str = r#"
version: 1
rules:
  - name: analytics
    description: "Swap analytics import"
    pattern: "@/lib/next-analytics"
    replacement: "@/lib/analytics"
  - description: "Routing helper"
    pattern: "goTo\\("
    replacement: "navigate("
    category: routing
    tier: medium
    advisory: "check goTo call sites"
"#;

    #[test]
    fn test_parse_rules_with_defaults() {
        let rules = parse_rules(RULES).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "analytics");
        assert_eq!(rules[0].category, RuleCategory::General);
        assert_eq!(rules[1].name, "custom/2");
        assert_eq!(rules[1].tier, ComplexityTier::Medium);
        assert!(rules[1].advisory.is_some());
    }

    #[test]
    fn test_custom_rules_run_after_builtin_and_follow_toggles() {
        let extra = parse_rules(RULES).unwrap();
        let mut options = ConversionOptions::default();
        options.use_client_router = false;
        let rw = RuleRewriter::for_options(&options, &extra);
        let out = rw.apply("import a from '@/lib/next-analytics'; goTo('/x');").unwrap();
        assert_eq!(out.text, "import a from '@/lib/analytics'; goTo('/x');");
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.yaml");
        fs::write(
            &path,
            "rules:\n  - description: bad\n    pattern: \"(\"\n    replacement: x\n",
        )
        .unwrap();
        let err = load_from_yaml(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid pattern"));
    }
}

pub mod custom;
pub mod engine;
pub mod imports;
pub mod table;

pub use engine::{AppliedRule, RewriteOutput, RuleFailure, RuleRewriter};

use crate::config::{BuildTarget, ConversionOptions};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Simple,
    Medium,
    Complex,
}

impl ComplexityTier {
    pub fn label(&self) -> &'static str {
        match self {
            ComplexityTier::Simple => "simple",
            ComplexityTier::Medium => "medium",
            ComplexityTier::Complex => "complex",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    Component,
    Routing,
    DataFetching,
    Api,
    Config,
    General,
}

impl RuleCategory {
    pub fn label(&self) -> &'static str {
        match self {
            RuleCategory::Component => "component",
            RuleCategory::Routing => "routing",
            RuleCategory::DataFetching => "data-fetching",
            RuleCategory::Api => "api",
            RuleCategory::Config => "config",
            RuleCategory::General => "general",
        }
    }

    pub fn all() -> [RuleCategory; 6] {
        [
            RuleCategory::Component,
            RuleCategory::Routing,
            RuleCategory::DataFetching,
            RuleCategory::Api,
            RuleCategory::Config,
            RuleCategory::General,
        ]
    }
}

/// What a callback sees besides its own captures.
pub struct RuleContext<'a> {
    /// Text the match was found in (offsets in `Captures` refer to it).
    pub segment: &'a str,
    /// Whole file text as it stands before this rule runs.
    pub document: &'a str,
}

/// One piece of a replacement.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    /// New text. Later rules of the same pass skip it.
    Produced(String),
    /// A range of the segment carried over unchanged. Later rules still rewrite it.
    Kept(Range<usize>),
}

/// Replacement for `segment[match.start()..end]`. The span always starts at the
/// match start but may extend past the match end.
#[derive(Debug, Clone, PartialEq)]
pub struct Splice {
    pub end: usize,
    pub pieces: Vec<Piece>,
}

impl Splice {
    /// Removes the span.
    pub fn new(end: usize) -> Self {
        Self {
            end,
            pieces: Vec::new(),
        }
    }

    pub fn replace(end: usize, text: impl Into<String>) -> Self {
        Self::new(end).produced(text)
    }

    pub fn produced(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.pieces.push(Piece::Produced(text));
        }
        self
    }

    pub fn kept(mut self, range: Range<usize>) -> Self {
        if !range.is_empty() {
            self.pieces.push(Piece::Kept(range));
        }
        self
    }
}

/// Returns the splice for this match, or `None` to leave it alone.
pub type RuleCallback = fn(&Captures<'_>, &RuleContext<'_>) -> Result<Option<Splice>, String>;

pub enum Replacement {
    /// Regex template with `$1` / `${name}` expansion.
    Template(String),
    Callback(RuleCallback),
}

impl std::fmt::Debug for Replacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Replacement::Template(t) => write!(f, "Template({:?})", t),
            Replacement::Callback(_) => write!(f, "Callback"),
        }
    }
}

#[derive(Debug)]
pub struct TransformationRule {
    pub name: String,
    pub pattern: Regex,
    pub replacement: Replacement,
    pub description: String,
    pub tier: ComplexityTier,
    pub category: RuleCategory,
    /// Restricts the rule to one build target.
    pub only_for: Option<BuildTarget>,
    /// Reported as a warning every time the rule fires.
    pub advisory: Option<String>,
}

impl TransformationRule {
    pub fn template(
        name: &str,
        pattern: &str,
        replacement: &str,
        description: &str,
        tier: ComplexityTier,
        category: RuleCategory,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            pattern: Regex::new(pattern)?,
            replacement: Replacement::Template(replacement.to_string()),
            description: description.to_string(),
            tier,
            category,
            only_for: None,
            advisory: None,
        })
    }

    pub fn callback(
        name: &str,
        pattern: &str,
        callback: RuleCallback,
        description: &str,
        tier: ComplexityTier,
        category: RuleCategory,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            pattern: Regex::new(pattern)?,
            replacement: Replacement::Callback(callback),
            description: description.to_string(),
            tier,
            category,
            only_for: None,
            advisory: None,
        })
    }

    pub fn only_for(mut self, target: BuildTarget) -> Self {
        self.only_for = Some(target);
        self
    }

    pub fn with_advisory(mut self, advisory: &str) -> Self {
        self.advisory = Some(advisory.to_string());
        self
    }

    /// Whether the options enable this rule for ordinary source files.
    /// API rules are never selected here; the API emitter picks them itself.
    pub fn applies_to(&self, options: &ConversionOptions) -> bool {
        let enabled = match self.category {
            RuleCategory::Component => options.replace_framework_components,
            RuleCategory::Routing => options.use_client_router,
            RuleCategory::DataFetching => options.transform_data_fetching,
            RuleCategory::Api => false,
            RuleCategory::Config | RuleCategory::General => true,
        };
        enabled && self.matches_target(options.target)
    }

    pub fn matches_target(&self, target: BuildTarget) -> bool {
        self.only_for.is_none_or(|t| t == target)
    }

    pub(crate) fn replace_at(
        &self,
        caps: &Captures<'_>,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Splice>, String> {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => return Err("empty capture set".to_string()),
        };
        match &self.replacement {
            Replacement::Template(template) => {
                let mut out = String::new();
                caps.expand(template, &mut out);
                Ok(Some(Splice::replace(whole.end(), out)))
            }
            Replacement::Callback(callback) => callback(caps, ctx),
        }
    }
}

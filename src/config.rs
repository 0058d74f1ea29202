use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Versión actual de nextport (leída desde Cargo.toml en tiempo de compilación)
pub const NEXTPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CONFIG_FILE_NAME: &str = ".nextportrc.toml";

/// Files within one batch are converted concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 8;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    #[default]
    Typescript,
    Javascript,
}

impl Syntax {
    pub fn is_typescript(&self) -> bool {
        matches!(self, Syntax::Typescript)
    }

    /// Extension for generated modules (`ts` / `js`).
    pub fn module_ext(&self) -> &'static str {
        match self {
            Syntax::Typescript => "ts",
            Syntax::Javascript => "js",
        }
    }

    /// Extension for generated modules containing JSX.
    pub fn component_ext(&self) -> &'static str {
        match self {
            Syntax::Typescript => "tsx",
            Syntax::Javascript => "jsx",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BuildTarget {
    #[default]
    Vite,
    CreateReactApp,
}

impl BuildTarget {
    pub fn label(&self) -> &'static str {
        match self {
            BuildTarget::Vite => "vite",
            BuildTarget::CreateReactApp => "create-react-app",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiFramework {
    #[default]
    Express,
    Fastify,
    Hono,
}

impl ApiFramework {
    pub fn label(&self) -> &'static str {
        match self {
            ApiFramework::Express => "express",
            ApiFramework::Fastify => "fastify",
            ApiFramework::Hono => "hono",
        }
    }
}

/// Toggles for a single conversion run. Shared read-only by every stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConversionOptions {
    pub use_client_router: bool,
    pub convert_api_routes: bool,
    pub transform_data_fetching: bool,
    pub replace_framework_components: bool,
    pub update_dependencies: bool,
    pub handle_middleware: bool,
    pub preserve_comments: bool,
    pub syntax: Syntax,
    pub target: BuildTarget,
    pub api_framework: ApiFramework,
    pub generate_api_tests: bool,
    pub include_realtime_channel: bool,
    pub batch_size: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            use_client_router: true,
            convert_api_routes: true,
            transform_data_fetching: true,
            replace_framework_components: true,
            update_dependencies: true,
            handle_middleware: true,
            preserve_comments: true,
            syntax: Syntax::Typescript,
            target: BuildTarget::Vite,
            api_framework: ApiFramework::Express,
            generate_api_tests: false,
            include_realtime_channel: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ConversionOptions {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, 64)
    }
}

/// Contents of `.nextportrc.toml`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectConfig {
    #[serde(default = "current_version")]
    pub version: String,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// YAML file with extra rewrite rules, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_rules: Option<String>,
    // Tables go last so the TOML output stays valid.
    #[serde(default)]
    pub options: ConversionOptions,
}

fn current_version() -> String {
    NEXTPORT_VERSION.to_string()
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        "node_modules".to_string(),
        ".next".to_string(),
        ".git".to_string(),
        "dist".to_string(),
        "build".to_string(),
        "out".to_string(),
        "coverage".to_string(),
    ]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            version: NEXTPORT_VERSION.to_string(),
            options: ConversionOptions::default(),
            ignore_patterns: default_ignore_patterns(),
            output_dir: None,
            extra_rules: None,
        }
    }
}

impl ProjectConfig {
    pub fn save(&self, project_root: &Path) -> anyhow::Result<PathBuf> {
        let toml = toml::to_string_pretty(self)?;
        let path = project_root.join(CONFIG_FILE_NAME);
        fs::write(&path, toml).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Loads `.nextportrc.toml` from the project root. Missing file is `Ok(None)`;
    /// missing fields fall back to defaults.
    pub fn load(project_root: &Path) -> anyhow::Result<Option<Self>> {
        let path = project_root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_file(&path).map(Some)
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        if config.version != NEXTPORT_VERSION {
            // Older files only gain new defaulted fields, so a version bump is enough.
            config.version = NEXTPORT_VERSION.to_string();
        }
        Ok(config)
    }

    pub fn extra_rules_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.extra_rules.as_ref().map(|p| project_root.join(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_options_enable_every_stage() {
        let o = ConversionOptions::default();
        assert!(o.use_client_router && o.convert_api_routes && o.transform_data_fetching);
        assert!(o.replace_framework_components && o.update_dependencies && o.handle_middleware);
        assert_eq!(o.syntax, Syntax::Typescript);
        assert_eq!(o.target, BuildTarget::Vite);
    }

    #[test]
    fn test_save_and_load_roundtrip_keeps_toggles() {
        let dir = TempDir::new().unwrap();
        let mut config = ProjectConfig::default();
        config.options.convert_api_routes = false;
        config.options.api_framework = ApiFramework::Hono;
        config.extra_rules = Some("rules.yaml".to_string());
        config.save(dir.path()).unwrap();

        let loaded = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert!(!loaded.options.convert_api_routes);
        assert_eq!(loaded.options.api_framework, ApiFramework::Hono);
        assert_eq!(loaded.extra_rules_path(dir.path()), Some(dir.path().join("rules.yaml")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "version = \"0.0.1\"\n[options]\nsyntax = \"javascript\"\ntarget = \"create-react-app\"\n",
        )
        .unwrap();
        let loaded = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.version, NEXTPORT_VERSION);
        assert_eq!(loaded.options.syntax, Syntax::Javascript);
        assert_eq!(loaded.options.target, BuildTarget::CreateReactApp);
        assert!(loaded.options.use_client_router);
        assert!(loaded.ignore_patterns.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }
}

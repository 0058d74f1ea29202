use crate::config::{ApiFramework, BuildTarget, ConversionOptions};
use anyhow::{Context, bail};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DependencyChange {
    Add { name: String, version: String, dev: bool },
    Remove { name: String },
    Script { name: String, command: String },
}

impl DependencyChange {
    pub fn describe(&self) -> String {
        match self {
            DependencyChange::Add { name, version, dev } => format!(
                "add {}{}@{}",
                name,
                if *dev { " (dev)" } else { "" },
                version
            ),
            DependencyChange::Remove { name } => format!("remove {}", name),
            DependencyChange::Script { name, command } => format!("script {}: {}", name, command),
        }
    }
}

/// Packages removed whatever the options.
const REMOVED: &[&str] = &["next", "eslint-config-next"];
const REMOVED_PREFIX: &str = "@next/";

#[derive(Debug, Clone, Default)]
pub struct DependencyPlan {
    adds: Vec<(String, String, bool)>,
    scripts: Vec<(String, String)>,
}

impl DependencyPlan {
    /// Empty when `update_dependencies` is off.
    pub fn from_options(options: &ConversionOptions, has_api_routes: bool, realtime: bool) -> Self {
        if !options.update_dependencies {
            return Self::default();
        }
        let mut plan = Self::default();
        let mut add = |name: &str, version: &str, dev: bool| {
            plan.adds.push((name.to_string(), version.to_string(), dev));
        };

        if options.use_client_router {
            add("react-router-dom", "^6.26.0", false);
        }
        if options.replace_framework_components {
            add("react-helmet-async", "^2.0.5", false);
            add("@unpic/react", "^0.1.14", false);
        }
        match options.target {
            BuildTarget::Vite => {
                add("vite", "^5.4.0", true);
                add("@vitejs/plugin-react", "^4.3.1", true);
            }
            BuildTarget::CreateReactApp => add("react-scripts", "5.0.1", false),
        }
        if options.convert_api_routes && has_api_routes {
            match options.api_framework {
                ApiFramework::Express => {
                    add("express", "^4.19.2", false);
                    if options.syntax.is_typescript() {
                        add("@types/express", "^4.17.21", true);
                    }
                }
                ApiFramework::Fastify => add("fastify", "^4.28.1", false),
                ApiFramework::Hono => {
                    add("hono", "^4.5.0", false);
                    add("@hono/node-server", "^1.12.0", false);
                }
            }
            if realtime && options.include_realtime_channel && options.api_framework != ApiFramework::Hono {
                add("socket.io", "^4.7.5", false);
            }
            if options.generate_api_tests {
                add("vitest", "^2.0.5", true);
                if options.api_framework == ApiFramework::Express {
                    add("supertest", "^7.0.0", true);
                }
            }
        }

        plan.scripts = match options.target {
            BuildTarget::Vite => vec![
                ("dev".to_string(), "vite".to_string()),
                ("build".to_string(), "vite build".to_string()),
                ("preview".to_string(), "vite preview".to_string()),
            ],
            BuildTarget::CreateReactApp => vec![
                ("dev".to_string(), "react-scripts start".to_string()),
                ("build".to_string(), "react-scripts build".to_string()),
                ("test".to_string(), "react-scripts test".to_string()),
            ],
        };
        if options.generate_api_tests && options.convert_api_routes && has_api_routes {
            plan.scripts.push(("test:api".to_string(), "vitest run server".to_string()));
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.scripts.is_empty()
    }

    /// Rewrites a `package.json` document, returning the new text and every change made.
    pub fn apply(&self, package_json: &str) -> anyhow::Result<(String, Vec<DependencyChange>)> {
        let mut changes = Vec::new();
        if self.is_empty() {
            return Ok((package_json.to_string(), changes));
        }
        let mut doc: Value = serde_json::from_str(package_json).context("parsing package.json")?;
        let Some(root) = doc.as_object_mut() else {
            bail!("package.json is not a JSON object");
        };

        for section in ["dependencies", "devDependencies"] {
            if let Some(Value::Object(deps)) = root.get_mut(section) {
                let removed: Vec<String> = deps
                    .keys()
                    .filter(|k| REMOVED.contains(&k.as_str()) || k.starts_with(REMOVED_PREFIX))
                    .cloned()
                    .collect();
                for name in removed {
                    deps.remove(&name);
                    changes.push(DependencyChange::Remove { name });
                }
            }
        }

        for (name, version, dev) in &self.adds {
            let section = if *dev { "devDependencies" } else { "dependencies" };
            let deps = object_entry(root, section)?;
            if deps.get(name).and_then(Value::as_str) == Some(version.as_str()) {
                continue;
            }
            deps.insert(name.clone(), Value::String(version.clone()));
            changes.push(DependencyChange::Add {
                name: name.clone(),
                version: version.clone(),
                dev: *dev,
            });
        }

        let scripts = object_entry(root, "scripts")?;
        for (name, command) in &self.scripts {
            if scripts.get(name).and_then(Value::as_str) == Some(command.as_str()) {
                continue;
            }
            scripts.insert(name.clone(), Value::String(command.clone()));
            changes.push(DependencyChange::Script {
                name: name.clone(),
                command: command.clone(),
            });
        }
        // `next start` / `next lint` have no replacement.
        for stale in ["start", "lint", "export"] {
            if scripts
                .get(stale)
                .and_then(Value::as_str)
                .is_some_and(|cmd| cmd.starts_with("next"))
            {
                scripts.remove(stale);
                changes.push(DependencyChange::Remove {
                    name: format!("script {}", stale),
                });
            }
        }

        let mut text = serde_json::to_string_pretty(&doc)?;
        text.push('\n');
        Ok((text, changes))
    }
}

fn object_entry<'a>(root: &'a mut Map<String, Value>, key: &str) -> anyhow::Result<&'a mut Map<String, Value>> {
    root.entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .with_context(|| format!("package.json field '{}' is not an object", key))
}

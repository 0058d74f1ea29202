//! `next.config.*` to `vite.config.*`.

use crate::config::{BuildTarget, Syntax};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static BASE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bbasePath\s*:\s*['"`]([^'"`]*)['"`]"#).expect("valid basePath regex")
});

static DIST_DIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bdistDir\s*:\s*['"`]([^'"`]*)['"`]"#).expect("valid distDir regex")
});

/// Keys with no build-config counterpart, and where their behavior has to go.
const UNSUPPORTED_KEYS: &[(&str, &str)] = &[
    ("env", "expose the values as VITE_-prefixed variables in .env"),
    ("images", "image domains and loaders are handled by @unpic/react or the CDN"),
    ("redirects", "move redirects to the server or a react-router loader"),
    ("rewrites", "move rewrites to the dev server proxy or the backend"),
    ("headers", "set response headers on the backend or the hosting platform"),
    ("i18n", "use a client-side i18n library; locale routing is not converted"),
];

#[derive(Serialize, Debug, Clone, Default)]
pub struct ConfigMigration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub warnings: Vec<String>,
}

fn has_key(source: &str, key: &str) -> bool {
    Regex::new(&format!(r"(?m)(?:^|[{{,\s])(?:async\s+)?{}\s*(?::|\()", regex::escape(key)))
        .is_ok_and(|re| re.is_match(source))
}

pub fn migrate_next_config(source: &str, target: BuildTarget, syntax: Syntax) -> ConfigMigration {
    let mut migration = ConfigMigration::default();
    for (key, hint) in UNSUPPORTED_KEYS {
        if has_key(source, key) {
            migration
                .warnings
                .push(format!("next.config '{}' is not migrated: {}", key, hint));
        }
    }
    let base = BASE_PATH.captures(source).map(|c| c[1].to_string());
    let out_dir = DIST_DIR.captures(source).map(|c| c[1].to_string());

    match target {
        BuildTarget::Vite => {
            let mut code = String::from(
                "import { defineConfig } from 'vite';\nimport react from '@vitejs/plugin-react';\n\nexport default defineConfig({\n  plugins: [react()],\n",
            );
            if let Some(base) = base.filter(|b| !b.is_empty()) {
                code.push_str(&format!("  base: '{}/',\n", base.trim_end_matches('/')));
            }
            if let Some(dir) = out_dir {
                code.push_str(&format!("  build: {{ outDir: '{}' }},\n", dir));
            }
            code.push_str("});\n");
            migration.output_path = Some(format!("vite.config.{}", syntax.module_ext()));
            migration.code = Some(code);
        }
        BuildTarget::CreateReactApp => {
            if let Some(base) = base {
                migration.warnings.push(format!(
                    "basePath '{}' must be set as \"homepage\" in package.json",
                    base
                ));
            }
        }
    }
    migration
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vite_config_with_base_and_warnings() {
        let src = "module.exports = {\n  reactStrictMode: true,\n  basePath: '/docs',\n  images: { domains: ['cdn.example.com'] },\n  async redirects() {\n    return [];\n  },\n};\n";
        let m = migrate_next_config(src, BuildTarget::Vite, Syntax::Typescript);
        assert_eq!(m.output_path.as_deref(), Some("vite.config.ts"));
        let code = m.code.unwrap();
        assert!(code.contains("plugins: [react()],\n  base: '/docs/',\n"));
        assert_eq!(m.warnings.len(), 2);
        assert!(m.warnings[0].contains("'images'"));
        assert!(m.warnings[1].contains("'redirects'"));
    }

    #[test]
    fn test_cra_has_no_config_file() {
        let m = migrate_next_config("export default { basePath: '/app' };", BuildTarget::CreateReactApp, Syntax::Javascript);
        assert!(m.code.is_none());
        assert!(m.warnings[0].contains("homepage"));
    }
}

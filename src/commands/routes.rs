use crate::commands::convert::DEFAULT_OUTPUT_DIR;
use crate::commands::{OptionOverrides, load_config};
use crate::files::collect_project;
use crate::routes::{derive_routes, to_target_routes};
use crate::ui;
use colored::*;
use std::path::Path;

/// Project-relative paths with `/` separators.
fn relative_paths(root: &Path, files: &[std::path::PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

pub fn handle_routes_command(project_root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(project_root, &OptionOverrides::default())?;
    let output_dir = project_root.join(config.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR));
    let spinner = (!json).then(|| ui::crear_progreso("Analizando rutas del proyecto..."));
    let files = collect_project(project_root, &config.ignore_patterns, Some(&output_dir));
    let derivation = derive_routes(&relative_paths(project_root, &files.sources));
    let converted = to_target_routes(&derivation.routes);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        let out = serde_json::json!({
            "routes": derivation.routes,
            "converted_routes": converted,
            "diagnostics": derivation.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("\n{}", "📄 Páginas Next.js".bright_cyan().bold());
    for route in &derivation.routes {
        let mut flags = Vec::new();
        if route.is_catch_all {
            flags.push("catch-all");
        }
        if route.is_optional_catch_all {
            flags.push("optional");
        }
        if route.layout.is_some() {
            flags.push("layout");
        }
        println!(
            "   {:<32} {} {}",
            route.path.yellow(),
            route.component_ref.dimmed(),
            flags.join(",").magenta()
        );
    }
    ui::imprimir_arbol_rutas(&converted);
    for d in &derivation.diagnostics {
        ui::imprimir_diagnostico(d);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_paths_use_forward_slashes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let files = vec![root.join("pages").join("blog").join("[id].tsx")];
        assert_eq!(relative_paths(root, &files), vec!["pages/blog/[id].tsx"]);
    }
}

use crate::config::{CONFIG_FILE_NAME, ProjectConfig, Syntax};
use colored::*;
use std::path::{Path, PathBuf};

/// TypeScript when the project has a `tsconfig.json`.
pub fn detect_syntax(root: &Path) -> Syntax {
    if root.join("tsconfig.json").exists() {
        Syntax::Typescript
    } else {
        Syntax::Javascript
    }
}

/// Routing roots present in the project (`pages`, `app`, with or without `src/`).
pub fn detect_routers(root: &Path) -> Vec<String> {
    ["pages", "src/pages", "app", "src/app"]
        .iter()
        .filter(|dir| root.join(dir).is_dir())
        .map(|dir| dir.to_string())
        .collect()
}

/// Writes `.nextportrc.toml` in `project_root`.
/// Returns Err if the file already exists and `force == false`.
pub fn run_init(project_root: &Path, force: bool) -> anyhow::Result<PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        anyhow::bail!(
            "Ya existe una configuración en {}. Usa --force para sobrescribir.",
            config_path.display()
        );
    }
    let mut config = ProjectConfig::default();
    config.options.syntax = detect_syntax(project_root);
    config.save(project_root)
}

pub fn handle_init_command(project_root: &Path, force: bool) -> anyhow::Result<()> {
    println!("\n{}", "🚀 nextport init".bold().green());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let routers = detect_routers(project_root);
    if routers.is_empty() {
        println!("   ℹ️  No se encontró pages/ ni app/. ¿Es un proyecto Next.js?");
    } else {
        println!("   🔍 Directorios de rutas: {}", routers.join(", ").cyan());
    }
    let syntax = if detect_syntax(project_root).is_typescript() {
        "typescript"
    } else {
        "javascript"
    };
    println!("   🔍 Sintaxis: {}", syntax.cyan());

    let config_path = run_init(project_root, force)?;
    println!("   ✅ Configuración creada en: {}", config_path.display().to_string().cyan());
    println!("\n   {} Próximos pasos:", "💡".yellow());
    println!("      nextport routes            # revisar las rutas derivadas");
    println!("      nextport convert --dry-run # ver el resumen sin escribir archivos");
    println!("      nextport convert -o ../app # convertir el proyecto");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_detects_typescript() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("tsconfig.json"), "{}").unwrap();
        std::fs::create_dir_all(tmp.path().join("src/pages")).unwrap();

        let path = run_init(tmp.path(), false).unwrap();
        let config = ProjectConfig::load_file(&path).unwrap();
        assert_eq!(config.options.syntax, Syntax::Typescript);
        assert_eq!(detect_routers(tmp.path()), vec!["src/pages"]);
    }

    #[test]
    fn test_init_defaults_to_javascript_without_tsconfig() {
        let tmp = TempDir::new().unwrap();
        let path = run_init(tmp.path(), false).unwrap();
        let config = ProjectConfig::load_file(&path).unwrap();
        assert_eq!(config.options.syntax, Syntax::Javascript);
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "version = \"0.0.1\"").unwrap();

        assert!(run_init(tmp.path(), false).is_err());
        assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "version = \"0.0.1\"");

        run_init(tmp.path(), true).unwrap();
        assert!(std::fs::read_to_string(&config_path).unwrap().contains("[options]"));
    }
}

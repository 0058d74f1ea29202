use crate::commands::{OptionOverrides, load_config};
use crate::diagnostics::Severity;
use crate::files::{collect_project, copy_assets, write_output};
use crate::orchestrator::{ConversionResult, Converter};
use crate::report::{REPORT_FILE, render_markdown};
use crate::rules::custom::load_from_yaml;
use crate::stats::NextportStats;
use crate::ui;
use anyhow::{Context, bail};
use colored::*;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "converted";
const MAX_DIAGNOSTICOS: usize = 15;

pub struct ConvertRequest {
    pub root: PathBuf,
    pub out: Option<PathBuf>,
    pub dry_run: bool,
    pub json: bool,
    pub report: Option<PathBuf>,
    pub overrides: OptionOverrides,
}

/// Output directory: flag, then config, then `converted/` under the project.
fn resolve_output(root: &Path, flag: Option<&Path>, configured: Option<&str>) -> PathBuf {
    match (flag, configured) {
        (Some(out), _) => out.to_path_buf(),
        (None, Some(dir)) => root.join(dir),
        (None, None) => root.join(DEFAULT_OUTPUT_DIR),
    }
}

/// Runs the engine over the project on disk. Writes nothing.
pub async fn run_conversion(
    root: &Path,
    overrides: &OptionOverrides,
    out_dir: Option<&Path>,
    show_progress: bool,
) -> anyhow::Result<(ConversionResult, Vec<PathBuf>)> {
    let config = load_config(root, overrides)?;
    let extra_rules = match config.extra_rules_path(root) {
        Some(path) => load_from_yaml(&path)?,
        None => Vec::new(),
    };
    let project = collect_project(root, &config.ignore_patterns, out_dir);
    if project.sources.is_empty() {
        bail!("No se encontraron archivos fuente en {}", root.display());
    }

    let converter = Converter::new(config.options.clone()).with_extra_rules(extra_rules);
    let sources = project.disk_sources(root);
    let result = if show_progress {
        let pb = ui::crear_barra_conversion();
        let result = converter
            .convert(sources, |pct, msg| {
                pb.set_position(pct.round() as u64);
                pb.set_message(msg.to_string());
            })
            .await;
        pb.finish_and_clear();
        result
    } else {
        converter.convert(sources, |_, _| {}).await
    };
    Ok((result, project.assets))
}

pub async fn handle_convert_command(request: ConvertRequest) -> anyhow::Result<bool> {
    let root = request
        .root
        .canonicalize()
        .with_context(|| format!("El proyecto '{}' no existe", request.root.display()))?;
    let configured = load_config(&root, &request.overrides)?.output_dir;
    let out_dir = resolve_output(&root, request.out.as_deref(), configured.as_deref());
    if out_dir == root {
        bail!("El directorio de salida no puede ser la raíz del proyecto");
    }

    if !request.json {
        ui::mostrar_banner();
        println!("\n📂 Proyecto: {}", root.display().to_string().cyan());
    }
    let (result, assets) = run_conversion(&root, &request.overrides, Some(&out_dir), !request.json).await?;

    if !request.dry_run {
        let written = write_output(&out_dir, &result)?;
        let copied = copy_assets(&root, &out_dir, &assets)?;
        if !request.json {
            println!(
                "💾 {} archivos escritos y {} assets copiados en {}",
                written,
                copied,
                out_dir.display().to_string().cyan()
            );
        }
    }

    let report_path = match (&request.report, request.dry_run) {
        (Some(path), _) => Some(path.clone()),
        (None, false) => Some(out_dir.join(REPORT_FILE)),
        (None, true) => None,
    };
    if let Some(path) = report_path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, render_markdown(&result))
            .with_context(|| format!("writing {}", path.display()))?;
        if !request.json {
            println!("📝 Reporte: {}", path.display().to_string().cyan());
        }
    }

    let mut stats = NextportStats::cargar(&root);
    stats.registrar(
        &result.stats,
        result.api_handlers.len(),
        result.diagnostics_of(Severity::Critical).count(),
    );
    stats.guardar(&root);

    if request.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        ui::imprimir_resumen(&result, MAX_DIAGNOSTICOS);
        if request.dry_run {
            println!("{}", "   (dry-run: no se escribió ningún archivo)".dimmed());
        }
    }
    Ok(result.success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_resolution_order() {
        let root = Path::new("/work/shop");
        assert_eq!(
            resolve_output(root, Some(Path::new("/tmp/out")), Some("dist-react")),
            PathBuf::from("/tmp/out")
        );
        assert_eq!(resolve_output(root, None, Some("dist-react")), root.join("dist-react"));
        assert_eq!(resolve_output(root, None, None), root.join("converted"));
    }

    #[tokio::test]
    async fn test_run_conversion_reads_project_and_custom_rules() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("pages")).unwrap();
        std::fs::write(
            root.join("pages/index.tsx"),
            "export default function Home() {\n  return <p>{legacyFormat(1)}</p>;\n}\n",
        )
        .unwrap();
        std::fs::write(
            root.join("rules.yaml"),
            "version: 1\nrules:\n  - name: legacy-format\n    pattern: 'legacyFormat\\('\n    replacement: 'format('\n    description: legacyFormat renamed\n",
        )
        .unwrap();
        std::fs::write(root.join(".nextportrc.toml"), "extra_rules = \"rules.yaml\"\n").unwrap();

        let (result, assets) = run_conversion(root, &OptionOverrides::default(), None, false)
            .await
            .unwrap();
        assert!(assets.is_empty());
        let page = result.files.iter().find(|f| f.path == "pages/index.tsx").unwrap();
        assert!(page.content.contains("{format(1)}"));
        assert!(result.files.iter().any(|f| f.path == "rules.yaml"));
    }

    #[tokio::test]
    async fn test_empty_project_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(run_conversion(dir.path(), &OptionOverrides::default(), None, false).await.is_err());
    }
}

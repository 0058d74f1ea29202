pub mod convert;
pub mod init;
pub mod routes;
pub mod rules;

use crate::config::{ApiFramework, BuildTarget, ConversionOptions, ProjectConfig, Syntax};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nextport")]
#[command(about = "Convierte proyectos Next.js a react-router + Vite con servidor API propio", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convierte el proyecto y escribe el árbol resultante
    Convert {
        /// Raíz del proyecto Next.js
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Directorio de salida (por defecto `output_dir` de .nextportrc.toml o `converted`)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// No escribe archivos; solo muestra el resumen
        #[arg(long)]
        dry_run: bool,
        /// Imprime el resultado completo en JSON
        #[arg(long)]
        json: bool,
        /// Escribe el reporte markdown en esta ruta
        #[arg(long)]
        report: Option<PathBuf>,
        #[command(flatten)]
        overrides: OptionOverrides,
    },
    /// Muestra las rutas derivadas del sistema de archivos
    Routes {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Lista las reglas de reescritura activas
    Rules {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        overrides: OptionOverrides,
    },
    /// Crea .nextportrc.toml con los valores por defecto
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Sobrescribe una configuración existente
        #[arg(long)]
        force: bool,
    },
}

/// Flags que reemplazan los valores de `.nextportrc.toml`.
#[derive(Args, Debug, Default, Clone)]
pub struct OptionOverrides {
    /// Framework del servidor API
    #[arg(long, value_enum)]
    pub framework: Option<ApiFramework>,
    /// Herramienta de build destino
    #[arg(long, value_enum)]
    pub target: Option<BuildTarget>,
    #[arg(long, value_enum)]
    pub syntax: Option<Syntax>,
    #[arg(long)]
    pub no_router: bool,
    #[arg(long)]
    pub no_api: bool,
    #[arg(long)]
    pub no_data_fetching: bool,
    #[arg(long)]
    pub no_components: bool,
    #[arg(long)]
    pub no_deps: bool,
    #[arg(long)]
    pub no_middleware: bool,
    #[arg(long)]
    pub strip_comments: bool,
    /// Genera tests para los handlers API
    #[arg(long)]
    pub api_tests: bool,
    /// Omite el canal realtime aunque se detecte uso de websockets
    #[arg(long)]
    pub no_realtime: bool,
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl OptionOverrides {
    pub fn apply(&self, options: &mut ConversionOptions) {
        if let Some(framework) = self.framework {
            options.api_framework = framework;
        }
        if let Some(target) = self.target {
            options.target = target;
        }
        if let Some(syntax) = self.syntax {
            options.syntax = syntax;
        }
        if let Some(size) = self.batch_size {
            options.batch_size = size;
        }
        options.use_client_router &= !self.no_router;
        options.convert_api_routes &= !self.no_api;
        options.transform_data_fetching &= !self.no_data_fetching;
        options.replace_framework_components &= !self.no_components;
        options.update_dependencies &= !self.no_deps;
        options.handle_middleware &= !self.no_middleware;
        options.preserve_comments &= !self.strip_comments;
        options.include_realtime_channel &= !self.no_realtime;
        options.generate_api_tests |= self.api_tests;
    }
}

/// Configuración del proyecto, o la de por defecto si no existe el archivo.
pub fn load_config(root: &Path, overrides: &OptionOverrides) -> anyhow::Result<ProjectConfig> {
    let mut config = ProjectConfig::load(root)?.unwrap_or_default();
    overrides.apply(&mut config.options);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let mut file = ProjectConfig::default();
        file.options.api_framework = ApiFramework::Fastify;
        file.options.generate_api_tests = false;
        file.save(dir.path()).unwrap();

        let cli = Cli::try_parse_from([
            "nextport",
            "convert",
            dir.path().to_str().unwrap(),
            "--framework",
            "hono",
            "--target",
            "create-react-app",
            "--no-deps",
            "--api-tests",
        ])
        .unwrap();
        let Commands::Convert { overrides, path, .. } = cli.command else {
            panic!("expected convert");
        };
        let config = load_config(&path, &overrides).unwrap();
        assert_eq!(config.options.api_framework, ApiFramework::Hono);
        assert_eq!(config.options.target, BuildTarget::CreateReactApp);
        assert!(!config.options.update_dependencies);
        assert!(config.options.generate_api_tests);
        assert!(config.options.convert_api_routes);
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path(), &OptionOverrides::default()).unwrap();
        assert_eq!(config.options, ConversionOptions::default());
    }
}

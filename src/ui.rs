//! Módulo de interfaz de usuario
//!
//! Salida en terminal: banner, barras de progreso y resumen de la conversión.

use crate::diagnostics::{Diagnostic, Severity};
use crate::orchestrator::{ConversionResult, FileStatus};
use crate::routes::ConvertedRoute;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SEPARADOR: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub fn mostrar_banner() {
    println!();
    println!("{}", "╔══════════════════════════════════════════╗".bright_cyan());
    println!(
        "{}",
        "║   nextport · Next.js → React Router      ║".bright_cyan().bold()
    );
    println!("{}", "╚══════════════════════════════════════════╝".bright_cyan());
    println!(
        "{}",
        format!("   v{}", crate::config::NEXTPORT_VERSION).dimmed()
    );
}

/// Spinner para tareas sin total conocido.
pub fn crear_progreso(mensaje: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(mensaje.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Barra de 0 a 100 alimentada por el callback de progreso del motor.
pub fn crear_barra_conversion() -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
    {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn icono(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "❌".red(),
        Severity::Warning => "⚠️ ".yellow(),
        Severity::Info => "ℹ️ ".cyan(),
    }
}

pub fn imprimir_diagnostico(d: &Diagnostic) {
    let ubicacion = match (&d.file, d.line) {
        (Some(file), Some(line)) => format!("{}:{}", file, line),
        (Some(file), None) => file.clone(),
        _ => String::new(),
    };
    println!(
        "   {} {} {} {}",
        icono(d.severity),
        format!("[{}]", d.code).bold(),
        ubicacion.dimmed(),
        d.message
    );
    if let Some(suggestion) = &d.suggestion {
        println!("      💡 {}", suggestion.dimmed());
    }
}

/// Resumen de una ejecución. `max_diagnosticos` limita los avisos e infos;
/// los críticos se muestran siempre.
pub fn imprimir_resumen(result: &ConversionResult, max_diagnosticos: usize) {
    let stats = &result.stats;
    let fallidos = result
        .files
        .iter()
        .filter(|f| f.status == FileStatus::Failed)
        .count();

    println!("\n{}", SEPARADOR.bright_cyan());
    println!("{}", "📊 RESUMEN DE CONVERSIÓN".bright_cyan().bold());
    println!("{}", SEPARADOR.bright_cyan());
    println!("   Archivos analizados:   {}", stats.total_files);
    println!(
        "   Archivos modificados:  {} ({:.1}%)",
        stats.modified_files.to_string().green(),
        stats.transformation_rate * 100.0
    );
    if fallidos > 0 {
        println!("   Archivos fallidos:     {}", fallidos.to_string().red().bold());
    }
    println!("   Rutas generadas:       {}", stats.route_changes);
    println!("   Handlers API:          {}", result.api_handlers.len());
    println!("   Cambios de dependencias: {}", stats.dependency_changes);
    println!("   Archivos generados:    {}", result.generated_files.len());

    let criticos: Vec<&Diagnostic> = result.diagnostics_of(Severity::Critical).collect();
    let resto: Vec<&Diagnostic> = result
        .diagnostics
        .iter()
        .filter(|d| d.severity != Severity::Critical)
        .collect();
    if !criticos.is_empty() || !resto.is_empty() {
        println!("\n{}", "🔎 Diagnósticos".bold());
        for d in &criticos {
            imprimir_diagnostico(d);
        }
        for d in resto.iter().take(max_diagnosticos) {
            imprimir_diagnostico(d);
        }
        if resto.len() > max_diagnosticos {
            println!(
                "   {}",
                format!("… y {} más (usa --json o --report para verlos todos)", resto.len() - max_diagnosticos)
                    .dimmed()
            );
        }
    }

    println!();
    if result.success {
        println!("{}", "✅ Conversión completada.".green().bold());
    } else {
        println!(
            "{}",
            format!("❌ Conversión con {} error(es) crítico(s).", criticos.len())
                .red()
                .bold()
        );
    }
}

fn imprimir_ruta(route: &ConvertedRoute, nivel: usize) {
    let sangria = "  ".repeat(nivel + 1);
    let path = if route.index {
        "(index)".to_string()
    } else {
        route.path.clone()
    };
    let loader = match &route.component {
        Some(c) if c.has_loader => " loader".magenta().to_string(),
        _ => String::new(),
    };
    println!("{}{} {}{}", sangria, path.yellow(), route.element.dimmed(), loader);
    for child in &route.children {
        imprimir_ruta(child, nivel + 1);
    }
}

pub fn imprimir_arbol_rutas(routes: &[ConvertedRoute]) {
    println!("\n{}", "🧭 Rutas de react-router".bright_cyan().bold());
    println!("{}", SEPARADOR.bright_cyan());
    if routes.is_empty() {
        println!("   No se encontraron páginas.");
    }
    for route in routes {
        imprimir_ruta(route, 0);
    }
}

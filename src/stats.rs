use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const STATS_FILE: &str = ".nextport_stats.json";

/// Figures for a single conversion run.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConversionStats {
    pub total_files: usize,
    pub modified_files: usize,
    /// Fraction of files modified, 0.0 when there are no files.
    pub transformation_rate: f64,
    pub dependency_changes: usize,
    pub route_changes: usize,
}

impl ConversionStats {
    pub fn compute(total_files: usize, modified_files: usize, dependency_changes: usize, route_changes: usize) -> Self {
        let transformation_rate = if total_files == 0 {
            0.0
        } else {
            modified_files as f64 / total_files as f64
        };
        Self {
            total_files,
            modified_files,
            transformation_rate,
            dependency_changes,
            route_changes,
        }
    }
}

/// Totals across runs, kept next to the project in `.nextport_stats.json`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct NextportStats {
    pub total_runs: u32,
    pub archivos_convertidos: u64,
    pub rutas_generadas: u64,
    pub handlers_api: u64,
    pub diagnosticos_criticos: u64,
}

impl NextportStats {
    pub fn cargar(path: &Path) -> Self {
        let stats_path = path.join(STATS_FILE);
        if let Ok(content) = fs::read_to_string(stats_path) {
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    pub fn guardar(&self, path: &Path) {
        let stats_path = path.join(STATS_FILE);
        if let Ok(content) = serde_json::to_string_pretty(self) {
            let _ = fs::write(stats_path, content);
        }
    }

    pub fn registrar(&mut self, run: &ConversionStats, handlers: usize, critical: usize) {
        self.total_runs += 1;
        self.archivos_convertidos += run.modified_files as u64;
        self.rutas_generadas += run.route_changes as u64;
        self.handlers_api += handlers as u64;
        self.diagnosticos_criticos += critical as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rate_is_zero_without_files() {
        assert_eq!(ConversionStats::compute(0, 0, 0, 0).transformation_rate, 0.0);
        assert_eq!(ConversionStats::compute(4, 1, 2, 3).transformation_rate, 0.25);
    }

    #[test]
    fn test_cumulative_stats_persist() {
        let dir = TempDir::new().unwrap();
        let mut stats = NextportStats::cargar(dir.path());
        assert_eq!(stats.total_runs, 0);
        stats.registrar(&ConversionStats::compute(10, 4, 2, 3), 1, 0);
        stats.guardar(dir.path());

        let loaded = NextportStats::cargar(dir.path());
        assert_eq!(loaded.total_runs, 1);
        assert_eq!(loaded.archivos_convertidos, 4);
        assert_eq!(loaded.rutas_generadas, 3);
    }
}

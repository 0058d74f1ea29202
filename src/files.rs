//! Project walking and writing of the converted tree.

use crate::config::CONFIG_FILE_NAME;
use crate::orchestrator::{ConversionResult, DiskFile, FileSource};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extensions read as text and handed to the engine. Everything else is an asset.
const TEXT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts", "json", "css", "scss", "sass", "less", "html",
    "md", "mdx", "svg", "txt", "yml", "yaml",
];

const SKIPPED_FILES: &[&str] = &[CONFIG_FILE_NAME, ".nextport_stats.json"];

#[derive(Debug, Default)]
pub struct ProjectFiles {
    /// Text files, sorted by relative path.
    pub sources: Vec<PathBuf>,
    /// Binary and unknown files, copied as-is.
    pub assets: Vec<PathBuf>,
}

impl ProjectFiles {
    pub fn disk_sources(&self, root: &Path) -> Vec<Arc<dyn FileSource>> {
        self.sources
            .iter()
            .map(|p| Arc::new(DiskFile::new(root, p.clone())) as Arc<dyn FileSource>)
            .collect()
    }
}

fn is_text(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext))
        || path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(".env"))
}

/// Walks `root` honoring `.gitignore`. Directories named in `ignore_patterns`
/// and the output directory are skipped.
pub fn collect_project(root: &Path, ignore_patterns: &[String], output_dir: Option<&Path>) -> ProjectFiles {
    let patterns = ignore_patterns.to_vec();
    let output_dir = output_dir.map(Path::to_path_buf);
    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .require_git(false)
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == ".git" || patterns.contains(&name) {
                return false;
            }
            output_dir.as_ref().is_none_or(|out| entry.path() != out.as_path())
        })
        .build();

    let mut files = ProjectFiles::default();
    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if SKIPPED_FILES.contains(&name) {
            continue;
        }
        if is_text(path) {
            files.sources.push(path.to_path_buf());
        } else {
            files.assets.push(path.to_path_buf());
        }
    }
    files.sources.sort();
    files.assets.sort();
    files
}

fn write_file(out_dir: &Path, relative: &str, content: &str) -> anyhow::Result<()> {
    let target = out_dir.join(relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&target, content).with_context(|| format!("writing {}", target.display()))
}

/// Writes converted, unchanged and generated files under `out_dir`.
/// Entries without an output path are dropped. Returns the number of files written.
pub fn write_output(out_dir: &Path, result: &ConversionResult) -> anyhow::Result<usize> {
    let mut written = 0;
    for file in &result.files {
        let Some(relative) = file.output_path.as_deref() else { continue };
        write_file(out_dir, relative, &file.content)?;
        written += 1;
    }
    for generated in &result.generated_files {
        write_file(out_dir, &generated.path, &generated.content)?;
        written += 1;
    }
    Ok(written)
}

/// Copies binary assets (images, fonts) to the same relative location.
pub fn copy_assets(root: &Path, out_dir: &Path, assets: &[PathBuf]) -> anyhow::Result<usize> {
    for asset in assets {
        let relative = asset.strip_prefix(root).unwrap_or(asset);
        let target = out_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(asset, &target).with_context(|| format!("copying {}", asset.display()))?;
    }
    Ok(assets.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionOptions;
    use crate::orchestrator::Converter;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collect_skips_ignored_and_output_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "pages/index.tsx", "");
        touch(root, "public/logo.png", "png");
        touch(root, "node_modules/react/index.js", "");
        touch(root, "converted/pages/index.tsx", "");
        touch(root, ".env.local", "NEXT_PUBLIC_X=1");
        touch(root, CONFIG_FILE_NAME, "");

        let out = root.join("converted");
        let files = collect_project(root, &["node_modules".to_string()], Some(&out));
        let sources: Vec<String> = files
            .sources
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(sources, vec![".env.local", "pages/index.tsx"]);
        assert_eq!(files.assets.len(), 1);
    }

    #[tokio::test]
    async fn test_write_output_places_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("app");
        touch(&root, "pages/index.tsx", "export default function Home() {\n  return <main />;\n}\n");
        touch(&root, "pages/_document.tsx", "export default function Document() { return null; }\n");
        touch(&root, "public/logo.png", "png");

        let files = collect_project(&root, &[], None);
        let result = Converter::new(ConversionOptions::default())
            .convert(files.disk_sources(&root), |_, _| {})
            .await;

        let out = dir.path().join("out");
        let written = write_output(&out, &result).unwrap();
        copy_assets(&root, &out, &files.assets).unwrap();

        assert!(out.join("pages/index.tsx").exists());
        assert!(!out.join("pages/_document.tsx").exists());
        assert!(out.join("src/router.tsx").exists());
        assert!(out.join("index.html").exists());
        assert!(out.join("public/logo.png").exists());
        assert_eq!(written, 1 + result.generated_files.len());
    }
}

//! Conversion orchestrator
//!
//! Runs the stages in a fixed order (dependencies, routes, files, API handlers,
//! middleware, finalize) and folds every outcome into one `ConversionResult`.
//! Files are processed in fixed-size batches; members of a batch run
//! concurrently on a `JoinSet` and report into a shared `DiagnosticsCollector`.

use crate::api::{self, ApiEmitter, EmitOptions, EmittedHandler, detect_realtime};
use crate::ast::AstPipeline;
use crate::config::ConversionOptions;
use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticsCollector, Severity};
use crate::middleware;
use crate::project::next_config::migrate_next_config;
use crate::project::scaffold::{GeneratedFile, scaffold_files};
use crate::project::{DependencyChange, DependencyPlan, FileKind, classify};
use crate::routes::{ConvertedRoute, NextJsRoute, derive_routes, mark_loaders, to_target_routes};
use crate::rules::TransformationRule;
use crate::rules::engine::RuleRewriter;
use crate::rules::imports::ensure_router_imports;
use crate::stats::ConversionStats;
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

static LOADER_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+(?:async\s+function\s+loader\b|function\s+loader\b|const\s+loader\s*=)")
        .expect("valid loader export regex")
});

/// A file handed to the engine. Content is loaded lazily, once.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Project-relative path with `/` separators.
    fn path(&self) -> &str;
    async fn load(&self) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
impl FileSource for SourceFile {
    fn path(&self) -> &str {
        &self.path
    }

    async fn load(&self) -> anyhow::Result<String> {
        Ok(self.content.clone())
    }
}

/// A file on disk, read with `tokio::fs` when its batch runs.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: String,
    absolute: PathBuf,
}

impl DiskFile {
    pub fn new(root: &Path, absolute: PathBuf) -> Self {
        let path = absolute
            .strip_prefix(root)
            .unwrap_or(&absolute)
            .to_string_lossy()
            .replace('\\', "/");
        Self { path, absolute }
    }
}

#[async_trait]
impl FileSource for DiskFile {
    fn path(&self) -> &str {
        &self.path
    }

    async fn load(&self) -> anyhow::Result<String> {
        tokio::fs::read_to_string(&self.absolute)
            .await
            .with_context(|| format!("reading {}", self.absolute.display()))
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Modified,
    Unchanged,
    Failed,
}

#[derive(Serialize, Debug, Clone)]
pub struct TransformedFile {
    pub path: String,
    /// Location in the converted tree; `None` drops the file.
    pub output_path: Option<String>,
    pub content: String,
    pub status: FileStatus,
    pub kind: FileKind,
    pub applied_transformations: Vec<String>,
}

impl TransformedFile {
    fn unchanged(path: &str, kind: FileKind, content: &str) -> Self {
        Self {
            path: path.to_string(),
            output_path: Some(path.to_string()),
            content: content.to_string(),
            status: FileStatus::Unchanged,
            kind,
            applied_transformations: Vec::new(),
        }
    }

    fn failed(path: &str, kind: FileKind, content: &str) -> Self {
        Self {
            status: FileStatus::Failed,
            ..Self::unchanged(path, kind, content)
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct ConversionResult {
    pub run_id: String,
    pub started_at: String,
    /// No critical diagnostic was raised.
    pub success: bool,
    pub files: Vec<TransformedFile>,
    pub generated_files: Vec<GeneratedFile>,
    pub routes: Vec<NextJsRoute>,
    pub converted_routes: Vec<ConvertedRoute>,
    pub api_handlers: Vec<EmittedHandler>,
    pub dependency_changes: Vec<DependencyChange>,
    pub diagnostics: Vec<Diagnostic>,
    pub logs: Vec<LogEntry>,
    pub stats: ConversionStats,
}

impl ConversionResult {
    pub fn diagnostics_of(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }
}

/// Keeps reported progress within 0..=100 and never decreasing.
struct ProgressTracker<F> {
    last: f32,
    callback: F,
}

impl<F: FnMut(f32, &str)> ProgressTracker<F> {
    fn new(callback: F) -> Self {
        Self { last: 0.0, callback }
    }

    fn report(&mut self, value: f32, message: &str) {
        let value = value.clamp(0.0, 100.0).max(self.last);
        self.last = value;
        (self.callback)(value, message);
    }
}

fn log(logs: &mut Vec<LogEntry>, message: impl Into<String>) {
    logs.push(LogEntry {
        timestamp: Utc::now().to_rfc3339(),
        message: message.into(),
    });
}

fn is_typescript_path(path: &str) -> bool {
    path.ends_with(".ts") || path.ends_with(".tsx")
}

/// AST pass, rule pass and import fix-up for one page or script.
fn rewrite_source(
    path: &str,
    kind: FileKind,
    original: &str,
    options: &ConversionOptions,
    pipeline: &AstPipeline,
    rewriter: &RuleRewriter,
    collector: &DiagnosticsCollector,
) -> TransformedFile {
    let mut applied = Vec::new();
    let mut text = match pipeline.transform(path, original) {
        Ok(out) => {
            collector.extend(out.warnings);
            applied.extend(out.changes);
            out.code
        }
        Err(diagnostic) => {
            collector.add(diagnostic.scoped_to(path));
            original.to_string()
        }
    };

    match rewriter.apply(&text) {
        Ok(out) => {
            for rule in &out.applied {
                if let Some(advisory) = &rule.advisory {
                    collector.add(
                        Diagnostic::warning("RULE_ADVISORY", DiagnosticCategory::Rule, advisory.clone())
                            .in_file(path)
                            .with_suggestion(format!("Review the output of rule '{}'", rule.name)),
                    );
                }
            }
            applied.extend(out.applied_descriptions());
            text = out.text;
        }
        Err(failure) => {
            collector.add(
                Diagnostic::critical("RULE_FAILED", DiagnosticCategory::Rule, failure.to_string())
                    .in_file(path)
                    .with_suggestion("The file was left unchanged; convert it by hand"),
            );
            return TransformedFile::failed(path, kind, original);
        }
    }

    if options.use_client_router {
        let (fixed, added) = ensure_router_imports(&text);
        if !added.is_empty() {
            applied.push(format!("Added react-router-dom import: {}", added.join(", ")));
            text = fixed;
        }
    }

    if !options.syntax.is_typescript() && is_typescript_path(path) {
        collector.add(
            Diagnostic::info(
                "TS_SOURCE_KEPT",
                DiagnosticCategory::Config,
                "TypeScript source converted in place; type annotations are not stripped",
            )
            .in_file(path),
        );
    }
    if kind == FileKind::AppShell {
        collector.add(
            Diagnostic::info(
                "APP_SHELL",
                DiagnosticCategory::Routing,
                "_app has no react-router counterpart; move its providers into the entry module",
            )
            .in_file(path),
        );
    }

    let status = if text == original {
        FileStatus::Unchanged
    } else {
        FileStatus::Modified
    };
    TransformedFile {
        path: path.to_string(),
        output_path: Some(path.to_string()),
        content: text,
        status,
        kind,
        applied_transformations: applied,
    }
}

fn passthrough(path: &str, kind: FileKind, content: &str, collector: &DiagnosticsCollector) -> TransformedFile {
    if kind == FileKind::DocumentShell {
        collector.add(
            Diagnostic::info(
                "DOCUMENT_SHELL",
                DiagnosticCategory::Routing,
                "_document is dropped; merge its <Head> and <body> customizations into index.html",
            )
            .in_file(path),
        );
        return TransformedFile {
            output_path: None,
            ..TransformedFile::unchanged(path, kind, content)
        };
    }
    TransformedFile::unchanged(path, kind, content)
}

type LoadOutcome = (usize, Result<String, String>);

async fn load_all(sources: &[Arc<dyn FileSource>], indices: &[usize], batch: usize) -> Vec<LoadOutcome> {
    let mut out = Vec::with_capacity(indices.len());
    for chunk in indices.chunks(batch.max(1)) {
        let mut set = JoinSet::new();
        for &idx in chunk {
            let source = Arc::clone(&sources[idx]);
            set.spawn(async move { (idx, source.load().await.map_err(|e| format!("{:#}", e))) });
        }
        while let Some(joined) = set.join_next().await {
            if let Ok(outcome) = joined {
                out.push(outcome);
            }
        }
    }
    out
}

pub struct Converter {
    options: Arc<ConversionOptions>,
    extra_rules: Vec<Arc<TransformationRule>>,
}

impl Converter {
    pub fn new(options: ConversionOptions) -> Self {
        Self {
            options: Arc::new(options),
            extra_rules: Vec::new(),
        }
    }

    /// User rules run after the built-in table.
    pub fn with_extra_rules(mut self, rules: Vec<Arc<TransformationRule>>) -> Self {
        self.extra_rules = rules;
        self
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub async fn convert_sources<F>(&self, files: Vec<SourceFile>, progress: F) -> ConversionResult
    where
        F: FnMut(f32, &str),
    {
        let sources: Vec<Arc<dyn FileSource>> = files
            .into_iter()
            .map(|f| Arc::new(f) as Arc<dyn FileSource>)
            .collect();
        self.convert(sources, progress).await
    }

    pub async fn convert<F>(&self, sources: Vec<Arc<dyn FileSource>>, progress: F) -> ConversionResult
    where
        F: FnMut(f32, &str),
    {
        let started_at = Utc::now().to_rfc3339();
        let run_id = uuid::Uuid::new_v4().to_string();
        let options = Arc::clone(&self.options);
        let collector = Arc::new(DiagnosticsCollector::new());
        let mut tracker = ProgressTracker::new(progress);
        let mut logs = Vec::new();
        log(&mut logs, format!("Run {} started with {} files", run_id, sources.len()));

        if sources.is_empty() {
            tracker.report(100.0, "Nothing to convert");
            return ConversionResult {
                run_id,
                started_at,
                success: true,
                files: Vec::new(),
                generated_files: Vec::new(),
                routes: Vec::new(),
                converted_routes: Vec::new(),
                api_handlers: Vec::new(),
                dependency_changes: Vec::new(),
                diagnostics: Vec::new(),
                logs,
                stats: ConversionStats::default(),
            };
        }

        let n = sources.len();
        let batch = options.effective_batch_size();
        let paths: Vec<String> = sources.iter().map(|s| s.path().to_string()).collect();
        let kinds: Vec<FileKind> = paths.iter().map(|p| classify(p)).collect();
        let mut contents: Vec<Option<String>> = vec![None; n];
        let mut files: Vec<Option<TransformedFile>> = vec![None; n];
        let indices_of = |kind: FileKind| -> Vec<usize> { (0..n).filter(|&i| kinds[i] == kind).collect() };

        // Dependencies.
        tracker.report(0.0, "Analyzing dependencies");
        let api_indices = indices_of(FileKind::ApiRoute);
        let manifest = indices_of(FileKind::PackageManifest).first().copied();
        let mut preload: Vec<usize> = manifest.into_iter().collect();
        if options.convert_api_routes {
            preload.extend(&api_indices);
        }
        for (idx, loaded) in load_all(&sources, &preload, batch).await {
            match loaded {
                Ok(text) => contents[idx] = Some(text),
                Err(message) => {
                    collector.add(
                        Diagnostic::critical("READ_ERROR", DiagnosticCategory::Io, message).in_file(&paths[idx]),
                    );
                    files[idx] = Some(TransformedFile::failed(&paths[idx], kinds[idx], ""));
                }
            }
        }
        let realtime = api_indices
            .iter()
            .filter_map(|&i| contents[i].as_deref())
            .any(detect_realtime);
        let plan = DependencyPlan::from_options(&options, !api_indices.is_empty(), realtime);
        log(
            &mut logs,
            if options.update_dependencies {
                "Dependency plan prepared"
            } else {
                "Dependency updates disabled"
            },
        );
        tracker.report(10.0, "Dependencies analyzed");

        // Routes.
        let derivation = derive_routes(&paths);
        collector.extend(derivation.diagnostics.iter().cloned());
        let routes = derivation.routes;
        let mut converted_routes = to_target_routes(&routes);
        log(&mut logs, format!("Derived {} routes", routes.len()));
        tracker.report(15.0, "Routes analyzed");

        // Files.
        let pipeline = Arc::new(AstPipeline::new(&options));
        let rewriter = Arc::new(RuleRewriter::for_options(&options, &self.extra_rules));
        let pending: Vec<usize> = (0..n)
            .filter(|&i| contents[i].is_none() && files[i].is_none())
            .collect();
        let mut done = 0usize;
        for chunk in pending.chunks(batch) {
            let mut set = JoinSet::new();
            for &idx in chunk {
                let source = Arc::clone(&sources[idx]);
                let kind = kinds[idx];
                let options = Arc::clone(&options);
                let pipeline = Arc::clone(&pipeline);
                let rewriter = Arc::clone(&rewriter);
                let collector = Arc::clone(&collector);
                set.spawn(async move {
                    let path = source.path().to_string();
                    let outcome = source
                        .load()
                        .await
                        .map(|text| {
                            let entry = if kind.is_rewritable() {
                                rewrite_source(&path, kind, &text, &options, &pipeline, &rewriter, &collector)
                            } else {
                                passthrough(&path, kind, &text, &collector)
                            };
                            (text, entry)
                        })
                        .map_err(|e| format!("{:#}", e));
                    (idx, outcome)
                });
            }

            let mut task_errors = Vec::new();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((idx, Ok((text, entry)))) => {
                        contents[idx] = Some(text);
                        files[idx] = Some(entry);
                    }
                    Ok((idx, Err(message))) => {
                        collector.add(
                            Diagnostic::critical("READ_ERROR", DiagnosticCategory::Io, message)
                                .in_file(&paths[idx]),
                        );
                        files[idx] = Some(TransformedFile::failed(&paths[idx], kinds[idx], ""));
                    }
                    Err(e) => task_errors.push(e.to_string()),
                }
            }
            // A panicked task has no result; its file is the one left empty.
            for &idx in chunk {
                if files[idx].is_none() {
                    collector.add(
                        Diagnostic::critical(
                            "INTERNAL_ERROR",
                            DiagnosticCategory::Internal,
                            format!("Conversion task failed: {}", task_errors.join("; ")),
                        )
                        .in_file(&paths[idx]),
                    );
                    files[idx] = Some(TransformedFile::failed(
                        &paths[idx],
                        kinds[idx],
                        contents[idx].as_deref().unwrap_or(""),
                    ));
                }
            }

            done += chunk.len();
            let fraction = done as f32 / pending.len().max(1) as f32;
            tracker.report(
                15.0 + 65.0 * fraction,
                &format!("Converted {}/{} files", done, pending.len()),
            );
        }
        log(&mut logs, format!("Processed {} source files", pending.len()));
        tracker.report(80.0, "Files converted");

        // API handlers.
        let mut generated_files = Vec::new();
        let mut api_handlers = Vec::new();
        if options.convert_api_routes {
            let emitter = ApiEmitter::new(&options);
            let emit_options = EmitOptions::from_options(&options);
            for &idx in &api_indices {
                let Some(source) = contents[idx].as_deref() else { continue };
                let path = &paths[idx];
                let emitted = emitter.emit(source, path, &emit_options);
                for warning in &emitted.warnings {
                    collector.add(
                        Diagnostic::warning("API_CONVERSION", DiagnosticCategory::Api, warning.clone()).in_file(path),
                    );
                }
                let converted = emitted.code != source;
                files[idx] = Some(if converted {
                    TransformedFile {
                        path: path.clone(),
                        output_path: Some(api::output_path(path, options.syntax)),
                        content: emitted.code.clone(),
                        status: FileStatus::Modified,
                        kind: FileKind::ApiRoute,
                        applied_transformations: vec![format!(
                            "{} handler {} for {} {}",
                            options.api_framework.label(),
                            emitted.handler_name,
                            emitted.method.map(|m| m.as_str()).unwrap_or("ALL"),
                            emitted.path
                        )],
                    }
                } else {
                    TransformedFile::unchanged(path, FileKind::ApiRoute, source)
                });
                if let Some(tests) = &emitted.tests {
                    generated_files.push(GeneratedFile::new(
                        api::test_output_path(path, options.syntax),
                        tests.clone(),
                        "API handler test stub",
                    ));
                }
                api_handlers.push(emitted);
            }
            if !api_handlers.is_empty() {
                collector.add(
                    Diagnostic::info(
                        "API_BACKEND",
                        DiagnosticCategory::Api,
                        format!(
                            "API routes require a separate backend; mount the server/routes modules on a {} app",
                            options.api_framework.label()
                        ),
                    )
                    .with_suggestion("Call each module's register(app) from the server entry point"),
                );
            }
            log(&mut logs, format!("Converted {} API handlers", api_handlers.len()));
        }
        tracker.report(90.0, "API routes processed");

        // Middleware.
        if options.handle_middleware {
            for idx in indices_of(FileKind::Middleware) {
                let Some(source) = contents[idx].as_deref() else { continue };
                let path = &paths[idx];
                let typed = options.syntax.is_typescript();
                match middleware::convert_middleware(source, options.api_framework, typed) {
                    Ok(converted) => {
                        for warning in &converted.warnings {
                            collector.add(
                                Diagnostic::warning("MIDDLEWARE_CONVERSION", DiagnosticCategory::Middleware, warning.clone())
                                    .in_file(path),
                            );
                        }
                        log(
                            &mut logs,
                            format!("Middleware mounted on {}", converted.mount_paths.join(", ")),
                        );
                        files[idx] = Some(TransformedFile {
                            path: path.clone(),
                            output_path: Some(middleware::output_path(options.syntax)),
                            content: converted.code,
                            status: FileStatus::Modified,
                            kind: FileKind::Middleware,
                            applied_transformations: vec![format!(
                                "{} middleware",
                                options.api_framework.label()
                            )],
                        });
                    }
                    Err(diagnostic) => collector.add(diagnostic.scoped_to(path)),
                }
            }
        }
        tracker.report(95.0, "Middleware processed");

        // Finalize.
        for idx in indices_of(FileKind::NextConfig) {
            let Some(source) = contents[idx].as_deref() else { continue };
            let migration = migrate_next_config(source, options.target, options.syntax);
            for warning in &migration.warnings {
                collector.add(
                    Diagnostic::warning("CONFIG_KEY", DiagnosticCategory::Config, warning.clone()).in_file(&paths[idx]),
                );
            }
            if let (Some(out_path), Some(code)) = (migration.output_path, migration.code) {
                generated_files.push(GeneratedFile::new(out_path.clone(), code, "Build configuration"));
                files[idx] = Some(TransformedFile {
                    output_path: None,
                    applied_transformations: vec![format!("Replaced by {}", out_path)],
                    ..TransformedFile::unchanged(&paths[idx], FileKind::NextConfig, source)
                });
            }
        }

        let mut dependency_changes = Vec::new();
        if let Some(idx) = manifest
            && let Some(source) = contents[idx].as_deref()
        {
            match plan.apply(source) {
                Ok((text, changes)) => {
                    let status = if text == source {
                        FileStatus::Unchanged
                    } else {
                        FileStatus::Modified
                    };
                    files[idx] = Some(TransformedFile {
                        path: paths[idx].clone(),
                        output_path: Some(paths[idx].clone()),
                        content: text,
                        status,
                        kind: FileKind::PackageManifest,
                        applied_transformations: changes.iter().map(DependencyChange::describe).collect(),
                    });
                    dependency_changes = changes;
                }
                Err(e) => collector.add(
                    Diagnostic::warning("MANIFEST_INVALID", DiagnosticCategory::Dependency, format!("{:#}", e))
                        .in_file(&paths[idx]),
                ),
            }
        } else if !plan.is_empty() {
            collector.add(Diagnostic::info(
                "NO_PACKAGE_JSON",
                DiagnosticCategory::Dependency,
                "No package.json found; dependency changes were not applied",
            ));
        }

        let by_path: HashMap<&str, &TransformedFile> = files
            .iter()
            .flatten()
            .map(|f| (f.path.as_str(), f))
            .collect();
        mark_loaders(&mut converted_routes, &|path: &str| {
            by_path
                .get(path)
                .is_some_and(|f| LOADER_EXPORT.is_match(&f.content))
        });
        let app_shell = indices_of(FileKind::AppShell)
            .first()
            .and_then(|&i| contents[i].as_deref().map(|c| (paths[i].as_str(), c)));
        generated_files.extend(scaffold_files(&converted_routes, &options, app_shell));

        // Every input yields exactly one entry.
        let files: Vec<TransformedFile> = files
            .into_iter()
            .enumerate()
            .map(|(i, f)| {
                f.unwrap_or_else(|| match contents[i].as_deref() {
                    Some(text) => TransformedFile::unchanged(&paths[i], kinds[i], text),
                    None => TransformedFile::failed(&paths[i], kinds[i], ""),
                })
            })
            .collect();

        let modified = files.iter().filter(|f| f.status == FileStatus::Modified).count();
        let stats = ConversionStats::compute(n, modified, dependency_changes.len(), routes.len());
        let diagnostics = collector.snapshot();
        let success = !collector.has_critical();
        log(
            &mut logs,
            format!(
                "Run finished: {}/{} files modified, {} diagnostics",
                modified,
                n,
                diagnostics.len()
            ),
        );
        tracker.report(100.0, "Conversion complete");

        ConversionResult {
            run_id,
            started_at,
            success,
            files,
            generated_files,
            routes,
            converted_routes,
            api_handlers,
            dependency_changes,
            diagnostics,
            logs,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiFramework;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const HOME: &str = r#"import Image from 'next/image';
import Link from 'next/link';

export default function Home() {
  return (
    <main>
      <Image src="/hero.png" alt="Hero" width={800} height={400} priority />
      <Link href="/about" className="nav">About</Link>
    </main>
  );
}
"#;

    const USER_API: &str = "export default async function handler(req, res) {\n  const user = await find(req.query.id);\n  res.status(200).json(user);\n}\n";

    async fn run(options: ConversionOptions, files: Vec<SourceFile>) -> ConversionResult {
        Converter::new(options).convert_sources(files, |_, _| {}).await
    }

    fn file<'a>(result: &'a ConversionResult, path: &str) -> &'a TransformedFile {
        result.files.iter().find(|f| f.path == path).unwrap()
    }

    #[tokio::test]
    async fn test_empty_input_is_successful() {
        let mut seen = Vec::new();
        let result = Converter::new(ConversionOptions::default())
            .convert_sources(Vec::new(), |p, _| seen.push(p))
            .await;
        assert!(result.success);
        assert!(result.files.is_empty());
        assert_eq!(seen.last(), Some(&100.0));
    }

    #[tokio::test]
    async fn test_image_and_link_page_end_to_end() {
        let result = run(
            ConversionOptions::default(),
            vec![SourceFile::new("pages/index.tsx", HOME)],
        )
        .await;
        let page = file(&result, "pages/index.tsx");
        assert_eq!(page.status, FileStatus::Modified);
        assert!(page.content.contains("import { Image } from '@unpic/react';"));
        assert!(page.content.contains("import { Link } from 'react-router-dom';"));
        assert!(page.content.contains(r#"<Link to="/about" className="nav">About</Link>"#));
        assert!(page.content.contains(r#"loading="eager""#));
        assert!(!page.content.contains("next/"));
        assert!(result.success);
        assert_eq!(result.converted_routes[0].path, "/");
        assert!(result.generated_files.iter().any(|g| g.path == "src/router.tsx"));
    }

    #[tokio::test]
    async fn test_one_entry_per_file_in_input_order() {
        let inputs = vec![
            SourceFile::new("package.json", r#"{ "dependencies": { "next": "14.0.0", "react": "18.3.1" } }"#),
            SourceFile::new("pages/index.tsx", HOME),
            SourceFile::new("pages/api/users/[id].js", USER_API),
            SourceFile::new("styles/globals.css", "body { margin: 0; }\n"),
            SourceFile::new("pages/_document.tsx", "export default function Document() { return null; }\n"),
        ];
        let expected: Vec<String> = inputs.iter().map(|f| f.path.clone()).collect();
        let result = run(ConversionOptions::default(), inputs).await;

        let paths: Vec<String> = result.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, expected);
        assert_eq!(result.stats.total_files, 5);
        assert_eq!(file(&result, "styles/globals.css").status, FileStatus::Unchanged);
        assert!(file(&result, "pages/_document.tsx").output_path.is_none());

        let api = file(&result, "pages/api/users/[id].js");
        assert_eq!(api.output_path.as_deref(), Some("server/routes/users/[id].ts"));
        assert!(api.content.contains("req.params.id"));
        assert_eq!(result.api_handlers.len(), 1);
        assert!(result.diagnostics.iter().any(|d| d.code == "API_BACKEND"));

        let manifest = file(&result, "package.json");
        assert_eq!(manifest.status, FileStatus::Modified);
        assert!(!manifest.content.contains("\"next\""));
        assert!(result.dependency_changes.contains(&DependencyChange::Remove { name: "next".to_string() }));
    }

    #[tokio::test]
    async fn test_rule_failure_is_critical_and_keeps_text() {
        let broken = "export function getStaticPaths() {\n  return { paths: [] ;\n";
        let result = run(
            ConversionOptions::default(),
            vec![SourceFile::new("lib/paths.ts", broken)],
        )
        .await;
        assert!(!result.success);
        let entry = file(&result, "lib/paths.ts");
        assert_eq!(entry.status, FileStatus::Failed);
        assert_eq!(entry.content, broken);
        let critical: Vec<&Diagnostic> = result.diagnostics_of(Severity::Critical).collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].file.as_deref(), Some("lib/paths.ts"));
        assert!(critical[0].message.contains("data-fetching/static-paths"));
    }

    #[tokio::test]
    async fn test_parse_error_still_runs_rules() {
        let source = "const url = process.env.NEXT_PUBLIC_API;\nexport default function ( {\n";
        let result = run(
            ConversionOptions::default(),
            vec![SourceFile::new("lib/env.ts", source)],
        )
        .await;
        assert!(result.success);
        let entry = file(&result, "lib/env.ts");
        assert!(entry.content.contains("import.meta.env.VITE_API"));
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == "PARSE_ERROR" && d.severity == Severity::Warning));
    }

    #[tokio::test]
    async fn test_foreign_router_code_is_left_alone() {
        let nav = "import { useRouter } from '@tanstack/react-router';\n\nexport function Nav() {\n  const router = useRouter();\n  return <button onClick={() => router.navigate({ to: '/x' })}>Go</button>;\n}\n\nexport function go(router) {\n  router.push('/y');\n  return router.query;\n}\n";
        let next = "import { useRouter } from 'next/router';\n\nexport default function Back() {\n  const router = useRouter();\n  return <button onClick={() => router.back()}>{router.query.from}</button>;\n}\n";
        let result = run(
            ConversionOptions::default(),
            vec![
                SourceFile::new("src/nav.tsx", nav),
                SourceFile::new("pages/back.tsx", next),
            ],
        )
        .await;

        let foreign = file(&result, "src/nav.tsx");
        assert_eq!(foreign.status, FileStatus::Unchanged);
        assert_eq!(foreign.content, nav);

        let converted = file(&result, "pages/back.tsx");
        assert!(converted.content.contains("navigate(-1)"));
        assert!(converted.content.contains("{params.from}"));
        assert!(converted.content.contains("const navigate = useNavigate();"));
        assert!(!converted.content.contains("next/router"));
    }

    #[tokio::test]
    async fn test_diagnostics_order_is_stable_across_batches() {
        let files = || {
            (0..6)
                .map(|i| {
                    SourceFile::new(
                        format!("lib/env{}.ts", i),
                        "const url = process.env.NEXT_PUBLIC_API;\nexport default function ( {\n",
                    )
                })
                .collect::<Vec<_>>()
        };
        let options = ConversionOptions {
            batch_size: 6,
            ..ConversionOptions::default()
        };
        let first = run(options.clone(), files()).await;
        let second = run(options, files()).await;
        assert_eq!(first.diagnostics, second.diagnostics);
        let paths: Vec<Option<&str>> = first.diagnostics.iter().map(|d| d.file.as_deref()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[tokio::test]
    async fn test_disabled_toggles_skip_stages() {
        let options = ConversionOptions {
            convert_api_routes: false,
            update_dependencies: false,
            handle_middleware: false,
            ..ConversionOptions::default()
        };
        let result = run(
            options,
            vec![
                SourceFile::new("package.json", r#"{ "dependencies": { "next": "14.0.0" } }"#),
                SourceFile::new("pages/api/users/[id].js", USER_API),
                SourceFile::new("middleware.ts", "export function middleware(req) {\n  return NextResponse.next();\n}\n"),
            ],
        )
        .await;
        assert!(result.api_handlers.is_empty());
        assert!(result.dependency_changes.is_empty());
        assert!(!result.diagnostics.iter().any(|d| d.code == "API_BACKEND"));
        assert_eq!(file(&result, "pages/api/users/[id].js").status, FileStatus::Unchanged);
        assert_eq!(file(&result, "middleware.ts").status, FileStatus::Unchanged);
        assert_eq!(file(&result, "package.json").status, FileStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_complete() {
        let seen = Mutex::new(Vec::new());
        let files: Vec<SourceFile> = (0..20)
            .map(|i| SourceFile::new(format!("pages/p{}.tsx", i), HOME))
            .collect();
        let options = ConversionOptions {
            batch_size: 3,
            ..ConversionOptions::default()
        };
        Converter::new(options)
            .convert_sources(files, |p, _| seen.lock().unwrap().push(p))
            .await;
        let seen = seen.into_inner().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.first(), Some(&0.0));
        assert_eq!(seen.last(), Some(&100.0));
    }

    struct PanickingFile;

    #[async_trait]
    impl FileSource for PanickingFile {
        fn path(&self) -> &str {
            "components/Boom.tsx"
        }

        async fn load(&self) -> anyhow::Result<String> {
            panic!("loader exploded")
        }
    }

    #[tokio::test]
    async fn test_panicking_task_becomes_internal_error() {
        let sources: Vec<Arc<dyn FileSource>> = vec![
            Arc::new(SourceFile::new("pages/index.tsx", HOME)),
            Arc::new(PanickingFile),
        ];
        let result = Converter::new(ConversionOptions::default())
            .convert(sources, |_, _| {})
            .await;
        assert!(!result.success);
        assert_eq!(result.files.len(), 2);
        assert_eq!(file(&result, "components/Boom.tsx").status, FileStatus::Failed);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == "INTERNAL_ERROR" && d.file.as_deref() == Some("components/Boom.tsx")));
    }

    #[tokio::test]
    async fn test_disk_files_and_loader_wiring() {
        let dir = TempDir::new().unwrap();
        let pages = dir.path().join("pages/blog");
        std::fs::create_dir_all(&pages).unwrap();
        let page = pages.join("[id].tsx");
        std::fs::write(
            &page,
            "export default function Post({ post }) {\n  return <h1>{post.title}</h1>;\n}\n\nexport async function getServerSideProps({ params }) {\n  const post = await fetchPost(params.id);\n  return { props: { post } };\n}\n",
        )
        .unwrap();

        let sources: Vec<Arc<dyn FileSource>> = vec![Arc::new(DiskFile::new(dir.path(), page))];
        let options = ConversionOptions {
            api_framework: ApiFramework::Hono,
            ..ConversionOptions::default()
        };
        let result = Converter::new(options).convert(sources, |_, _| {}).await;

        let entry = file(&result, "pages/blog/[id].tsx");
        assert!(entry.content.contains("export async function loader({ params, request })"));
        assert!(entry.content.contains("import { useLoaderData } from 'react-router-dom';"));
        let router = result
            .generated_files
            .iter()
            .find(|g| g.path == "src/router.tsx")
            .unwrap();
        assert!(router.content.contains("loader: blogIdPageLoader,"));
        assert_eq!(result.converted_routes[0].path, "/blog/:id");
    }
}

pub mod comments;
pub mod imports;
pub mod jsx;
pub mod members;
pub mod node;

pub use node::{Bindings, SyntaxNode};

use crate::config::ConversionOptions;
use crate::diagnostics::{Diagnostic, DiagnosticCategory};
use std::cmp::Reverse;
use std::path::Path;
use tree_sitter::{Language, Parser};

/// Replace `start..end` of the original text with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn remove(start: usize, end: usize) -> Self {
        Self::replace(start, end, "")
    }
}

/// What one visitor contributes for one node.
#[derive(Debug, Default, Clone)]
pub struct Delta {
    pub edits: Vec<Edit>,
    pub changes: Vec<String>,
    pub warnings: Vec<Diagnostic>,
}

impl Delta {
    pub fn edit(mut self, edit: Edit) -> Self {
        self.edits.push(edit);
        self
    }

    pub fn change(mut self, note: impl Into<String>) -> Self {
        self.changes.push(note.into());
        self
    }

    pub fn warn(mut self, warning: Diagnostic) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn merge(mut self, other: Delta) -> Self {
        self.edits.extend(other.edits);
        self.changes.extend(other.changes);
        self.warnings.extend(other.warnings);
        self
    }
}

pub struct VisitContext<'a> {
    pub source: &'a str,
    pub path: &'a str,
    pub bindings: &'a Bindings,
}

impl VisitContext<'_> {
    pub fn warning(
        &self,
        code: &str,
        category: DiagnosticCategory,
        line: usize,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic::warning(code, category, message)
            .in_file(self.path)
            .at_line(line)
    }
}

pub trait Visitor: Send + Sync {
    fn visit(&self, node: &SyntaxNode, cx: &VisitContext<'_>) -> Delta;
}

#[derive(Debug, Clone)]
pub struct AstOutput {
    pub code: String,
    pub warnings: Vec<Diagnostic>,
    pub changes: Vec<String>,
}

/// Grammar for a file extension, and whether it accepts JSX.
pub fn grammar_for(path: &str) -> Option<(Language, bool)> {
    let ext = Path::new(path).extension()?.to_str()?;
    match ext {
        "ts" | "mts" | "cts" => Some((tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), false)),
        "tsx" => Some((tree_sitter_typescript::LANGUAGE_TSX.into(), true)),
        "js" | "jsx" | "mjs" | "cjs" => Some((tree_sitter_javascript::LANGUAGE.into(), true)),
        _ => None,
    }
}

pub struct AstPipeline {
    visitors: Vec<Box<dyn Visitor>>,
    strip_comments: bool,
}

impl AstPipeline {
    pub fn new(options: &ConversionOptions) -> Self {
        let mut visitors: Vec<Box<dyn Visitor>> = Vec::new();
        visitors.push(Box::new(imports::ImportVisitor {
            components: options.replace_framework_components,
            routing: options.use_client_router,
        }));
        visitors.push(Box::new(jsx::JsxVisitor {
            components: options.replace_framework_components,
            routing: options.use_client_router,
        }));
        if options.use_client_router {
            visitors.push(Box::new(members::RouterMemberVisitor));
        }
        Self {
            visitors,
            strip_comments: !options.preserve_comments,
        }
    }

    pub fn transform(&self, path: &str, text: &str) -> Result<AstOutput, Diagnostic> {
        let (language, jsx) = grammar_for(path).ok_or_else(|| {
            Diagnostic::warning(
                "UNSUPPORTED_FILE",
                DiagnosticCategory::Parse,
                "No grammar for this file extension",
            )
            .in_file(path)
        })?;

        let mut parser = Parser::new();
        parser.set_language(&language).map_err(|e| {
            Diagnostic::critical("INTERNAL_ERROR", DiagnosticCategory::Internal, e.to_string())
                .in_file(path)
        })?;
        let tree = parser.parse(text, None).ok_or_else(|| {
            Diagnostic::warning("PARSE_ERROR", DiagnosticCategory::Parse, "Parser returned no tree")
                .in_file(path)
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let at = node::first_error(root).unwrap_or(root);
            let pos = at.start_position();
            return Err(Diagnostic::warning(
                "PARSE_ERROR",
                DiagnosticCategory::Parse,
                format!(
                    "Syntax error at {}:{}; AST transforms skipped",
                    pos.row + 1,
                    pos.column + 1
                ),
            )
            .in_file(path)
            .at_line(pos.row + 1));
        }

        let nodes = node::lower(&tree, &language, jsx, text).map_err(|e| {
            Diagnostic::critical("INTERNAL_ERROR", DiagnosticCategory::Internal, e.to_string())
                .in_file(path)
        })?;
        let bindings = Bindings::collect(&nodes);
        let cx = VisitContext {
            source: text,
            path,
            bindings: &bindings,
        };

        let mut delta = nodes
            .iter()
            .flat_map(|n| self.visitors.iter().map(move |v| (v, n)))
            .fold(Delta::default(), |acc, (v, n)| acc.merge(v.visit(n, &cx)));

        if self.strip_comments {
            delta = delta.merge(comments::strip_comments(&tree, &language, text).map_err(|e| {
                Diagnostic::critical("INTERNAL_ERROR", DiagnosticCategory::Internal, e.to_string())
                    .in_file(path)
            })?);
        }

        Ok(AstOutput {
            code: apply_edits(text, delta.edits),
            warnings: delta.warnings,
            changes: delta.changes,
        })
    }
}

/// Applies non-overlapping edits; an edit overlapping an earlier one is dropped.
pub fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.start, Reverse(e.end)));
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for edit in edits {
        if edit.start < cursor || edit.end > source.len() || edit.start > edit.end {
            continue;
        }
        out.push_str(&source[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;

    fn run(path: &str, text: &str) -> AstOutput {
        AstPipeline::new(&ConversionOptions::default())
            .transform(path, text)
            .unwrap()
    }

    #[test]
    fn test_grammar_by_extension() {
        assert!(grammar_for("a.ts").is_some_and(|(_, jsx)| !jsx));
        assert!(grammar_for("a.tsx").is_some_and(|(_, jsx)| jsx));
        assert!(grammar_for("a.jsx").is_some());
        assert!(grammar_for("a.cjs").is_some());
        assert!(grammar_for("a.css").is_none());
    }

    #[test]
    fn test_apply_edits_drops_overlaps() {
        let edits = vec![
            Edit::replace(0, 5, "HELLO"),
            Edit::replace(2, 4, "xx"),
            Edit::replace(6, 11, "there"),
        ];
        assert_eq!(apply_edits("hello world", edits), "HELLO there");
    }

    #[test]
    fn test_image_and_link_page() {
        let source = r#"import Image from 'next/image';
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
        let out = run("pages/index.tsx", source);
        assert!(out.code.contains("import { Image } from '@unpic/react';"));
        assert!(out.code.contains("import { Link } from 'react-router-dom';"));
        assert!(out.code.contains(r#"<Link to="/about" className="nav">About</Link>"#));
        assert!(out.code.contains(r#"height={400} loading="eager" />"#));
        assert!(out.changes.len() >= 4);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_parse_error_is_a_warning() {
        let err = AstPipeline::new(&ConversionOptions::default())
            .transform("pages/bad.tsx", "export default function ( {\n")
            .unwrap_err();
        assert_eq!(err.code, "PARSE_ERROR");
        assert_eq!(err.severity, Severity::Warning);
        assert_eq!(err.file.as_deref(), Some("pages/bad.tsx"));
    }

    #[test]
    fn test_unbound_image_tag_is_untouched() {
        let source = "import Image from './my-image';\nconst a = <Image priority src=\"x\" />;\n";
        let out = run("a.tsx", source);
        assert_eq!(out.code, source);
    }

    #[test]
    fn test_disabled_components_leave_imports() {
        let mut options = ConversionOptions::default();
        options.replace_framework_components = false;
        let source = "import Image from 'next/image';\nconst a = <Image src=\"x\" priority />;\n";
        let out = AstPipeline::new(&options).transform("a.tsx", source).unwrap();
        assert_eq!(out.code, source);
    }
}

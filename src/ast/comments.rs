use crate::ast::{Delta, Edit};
use crate::scan::extend_left_ws;
use tree_sitter::{Language, Query, QueryCursor, StreamingIterator, Tree};

/// Comments that tools read are kept.
fn is_pragma(comment: &str) -> bool {
    comment.starts_with("/*!")
        || comment.starts_with("// @ts-")
        || comment.starts_with("/// <reference")
        || comment.contains("eslint-")
        || comment.contains("@vite-ignore")
}

/// Removes comment nodes. A comment alone on its line takes the line with it.
pub fn strip_comments(
    tree: &Tree,
    language: &Language,
    source: &str,
) -> Result<Delta, tree_sitter::QueryError> {
    let query = Query::new(language, "(comment) @comment")?;
    let mut cursor = QueryCursor::new();
    let mut captures = cursor.captures(&query, tree.root_node(), source.as_bytes());
    let bytes = source.as_bytes();

    let mut delta = Delta::default();
    let mut removed = 0usize;
    while let Some((m, index)) = captures.next() {
        let node = m.captures[*index].node;
        let (start, end) = (node.start_byte(), node.end_byte());
        if is_pragma(&source[start..end]) {
            continue;
        }
        let mut from = extend_left_ws(source, start);
        let mut to = end;
        let line_start = from == 0 || bytes[from - 1] == b'\n';
        let mut after = to;
        while after < bytes.len() && matches!(bytes[after], b' ' | b'\t' | b'\r') {
            after += 1;
        }
        let line_end = after >= bytes.len() || bytes[after] == b'\n';
        if line_start && line_end {
            to = (after + 1).min(bytes.len());
        } else if !line_start {
            // Keep the code before a trailing comment, drop only the comment.
            to = end;
        } else {
            from = start;
            to = after;
        }
        delta = delta.edit(Edit::remove(from, to));
        removed += 1;
    }
    if removed > 0 {
        delta = delta.change(format!("Removed {} comment(s)", removed));
    }
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use crate::ast::AstPipeline;
    use crate::config::ConversionOptions;

    #[test]
    fn test_comments_removed_when_not_preserved() {
        let mut options = ConversionOptions::default();
        options.preserve_comments = false;
        let source = "// header\nconst a = 1; // trailing\n/* block */ const b = 2;\n// @ts-ignore\nconst c = a as any;\n";
        let out = AstPipeline::new(&options).transform("a.ts", source).unwrap();
        assert_eq!(
            out.code,
            "const a = 1;\nconst b = 2;\n// @ts-ignore\nconst c = a as any;\n"
        );
    }

    #[test]
    fn test_comments_kept_by_default() {
        let source = "// header\nconst a = 1;\n";
        let out = AstPipeline::new(&ConversionOptions::default())
            .transform("a.ts", source)
            .unwrap();
        assert_eq!(out.code, source);
    }
}

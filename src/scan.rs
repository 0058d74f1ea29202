//! Small lexical helpers shared by the rule callbacks and the emitters.
//! They understand strings, template literals and comments well enough to
//! find balanced delimiters in JavaScript/TypeScript source.

/// Index of the delimiter closing the one at `open` (`{`, `(` or `[`).
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (open_ch, close_ch) = match bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'"' | b'\'' => {
                i = skip_string(bytes, i)?;
                continue;
            }
            b'`' => {
                i = skip_template(text, i)?;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let rest = text.get(i + 2..)?;
                i = i + 2 + rest.find("*/")? + 2;
                continue;
            }
            _ if c == open_ch => depth += 1,
            _ if c == close_ch => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the index just past the closing quote of the string starting at `start`.
fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_template(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = matching_close(text, i + 1)? + 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Splits `text` on commas that are not nested inside delimiters or strings.
pub fn split_top_level(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'(' | b'[' => match matching_close(text, i) {
                Some(close) => i = close + 1,
                None => break,
            },
            b'"' | b'\'' => match skip_string(bytes, i) {
                Some(next) => i = next,
                None => break,
            },
            b'`' => match skip_template(text, i) {
                Some(next) => i = next,
                None => break,
            },
            b',' => {
                parts.push(&text[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    parts.push(&text[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Moves `start` left over spaces and tabs.
pub fn extend_left_ws(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = start;
    while i > 0 && matches!(bytes[i - 1], b' ' | b'\t') {
        i -= 1;
    }
    i
}

/// Moves `end` past trailing spaces, an optional `;` and one line break.
pub fn extend_statement_end(text: &str, end: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = end;
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    if bytes.get(i) == Some(&b';') {
        i += 1;
    }
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
        i += 1;
    }
    if bytes.get(i) == Some(&b'\r') {
        i += 1;
    }
    if bytes.get(i) == Some(&b'\n') {
        i += 1;
    }
    i
}

/// Rewrites every `callee(args)` call. `f` receives the top-level arguments and
/// returns the replacement, or `None` to keep the call as written.
pub fn rewrite_calls(text: &str, callee: &str, mut f: impl FnMut(&[&str]) -> Option<String>) -> String {
    let needle = format!("{}(", callee);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    let mut search = 0usize;
    while let Some(found) = text[search..].find(&needle) {
        let start = search + found;
        let open = start + callee.len();
        search = open + 1;
        let bounded = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '$' || c == '.'));
        if !bounded || start < cursor {
            continue;
        }
        let Some(close) = matching_close(text, open) else { continue };
        let args = split_top_level(&text[open + 1..close]);
        if let Some(replacement) = f(&args) {
            out.push_str(&text[cursor..start]);
            out.push_str(&replacement);
            cursor = close + 1;
            search = cursor;
        }
    }
    out.push_str(&text[cursor..]);
    out
}

/// 1-based line number of a byte offset.
pub fn line_of(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_close_skips_strings_and_templates() {
        let text = "{ a: '}', b: `x ${ {c: 1}.c } }`, d: { e: \"{\" } } tail";
        let close = matching_close(text, 0).unwrap();
        assert_eq!(&text[close + 1..], " tail");
    }

    #[test]
    fn test_matching_close_skips_comments() {
        let text = "( a // )\n , /* ) */ b )";
        assert_eq!(matching_close(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn test_unbalanced_is_none() {
        assert_eq!(matching_close("{ a: { b }", 0), None);
        assert_eq!(matching_close("x", 0), None);
    }

    #[test]
    fn test_split_top_level() {
        let parts = split_top_level("a, { b, c }, fn(d, e), 'f,g'");
        assert_eq!(parts, vec!["a", "{ b, c }", "fn(d, e)", "'f,g'"]);
    }

    #[test]
    fn test_statement_end_and_lines() {
        let text = "import x from 'y';  \nnext";
        assert_eq!(&text[extend_statement_end(text, 17)..], "next");
        assert_eq!(line_of(text, text.len() - 1), 2);
        assert_eq!(extend_left_ws("a   b", 4), 1);
    }

    #[test]
    fn test_rewrite_calls_balanced_arguments() {
        let src = "return NextResponse.json({ a: f(1, 2) }, { status: 401 }); x.NextResponse.json(1);";
        let out = rewrite_calls(src, "NextResponse.json", |args| {
            Some(format!("json[{}]", args.join(" | ")))
        });
        assert_eq!(out, "return json[{ a: f(1, 2) } | { status: 401 }]; x.NextResponse.json(1);");
    }
}

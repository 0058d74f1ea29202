use crate::scan::matching_close;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Registration method name (`app.get`, `app.post`, ...).
    pub fn lower(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METHOD_CHECK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b\w+\.method\s*(?:===|!==|==|!=)\s*['"]([A-Za-z]+)['"]"#)
        .expect("valid method regex")
});

static METHOD_CHECK_REVERSED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"]([A-Za-z]+)['"]\s*(?:===|!==|==|!=)\s*\w+\.method\b"#)
        .expect("valid method regex")
});

static METHOD_SWITCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"switch\s*\(\s*\w+\.method\s*\)\s*\{").expect("valid switch regex")
});

static CASE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"case\s+['"]([A-Za-z]+)['"]\s*:"#).expect("valid case regex"));

/// Every method the handler branches on, in order of first appearance.
pub fn detect_methods(source: &str) -> Vec<HttpMethod> {
    let mut found: Vec<(usize, HttpMethod)> = Vec::new();
    let mut push = |at: usize, raw: &str| {
        if let Some(m) = HttpMethod::parse(raw)
            && !found.iter().any(|(_, f)| *f == m)
        {
            found.push((at, m));
        }
    };

    for re in [&*METHOD_CHECK, &*METHOD_CHECK_REVERSED] {
        for caps in re.captures_iter(source) {
            if let Some(m) = caps.get(1) {
                push(m.start(), m.as_str());
            }
        }
    }
    for switch in METHOD_SWITCH.find_iter(source) {
        let open = switch.end() - 1;
        let close = matching_close(source, open).unwrap_or(source.len());
        for caps in CASE_LABEL.captures_iter(&source[open..close]) {
            if let Some(m) = caps.get(1) {
                push(open + m.start(), m.as_str());
            }
        }
    }
    found.sort_by_key(|(at, _)| *at);
    found.into_iter().map(|(_, m)| m).collect()
}

/// The single method handled, or `None` when the handler serves several or all.
pub fn detect_method(source: &str) -> Option<HttpMethod> {
    match detect_methods(source).as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_post_branch() {
        let src = "export default function h(req, res) {\n  if (req.method === 'POST') {\n    res.status(201).json({ ok: true });\n  }\n}";
        assert_eq!(detect_method(src), Some(HttpMethod::Post));
    }

    #[test]
    fn test_guard_with_not_equal() {
        let src = "if (req.method !== \"DELETE\") return res.status(405).end();";
        assert_eq!(detect_method(src), Some(HttpMethod::Delete));
    }

    #[test]
    fn test_no_branch_means_all_methods() {
        assert_eq!(detect_method("export default (req, res) => res.json({})"), None);
    }

    #[test]
    fn test_switch_with_several_methods() {
        let src = "switch (req.method) {\n  case 'GET': return list();\n  case 'POST': return create();\n  default: res.status(405).end();\n}";
        assert_eq!(detect_methods(src), vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(detect_method(src), None);
    }
}

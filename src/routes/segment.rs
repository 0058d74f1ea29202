use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static PARAM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$-]*$").expect("valid param regex"));

/// One directory or file name of a route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Dynamic(String),
    CatchAll(String),
    OptionalCatchAll(String),
    /// `(group)` folders: organize files, never appear in the URL.
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    Unbalanced(String),
    EmptyName(String),
    InvalidName(String),
    CatchAllNotLast(String),
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Unbalanced(s) => write!(f, "unbalanced brackets in segment '{}'", s),
            SegmentError::EmptyName(s) => write!(f, "empty parameter name in segment '{}'", s),
            SegmentError::InvalidName(s) => write!(f, "invalid parameter name in segment '{}'", s),
            SegmentError::CatchAllNotLast(s) => {
                write!(f, "catch-all segment '{}' must be the last segment", s)
            }
        }
    }
}

impl Segment {
    pub fn parse(raw: &str) -> Result<Self, SegmentError> {
        if raw.len() > 2 && raw.starts_with('(') && raw.ends_with(')') {
            return Ok(Segment::Group(raw[1..raw.len() - 1].to_string()));
        }
        if !raw.contains('[') && !raw.contains(']') {
            return Ok(Segment::Static(raw.to_string()));
        }

        let (inner, optional) = if let Some(rest) = raw.strip_prefix("[[") {
            let inner = rest
                .strip_suffix("]]")
                .ok_or_else(|| SegmentError::Unbalanced(raw.to_string()))?;
            (inner, true)
        } else {
            let inner = raw
                .strip_prefix('[')
                .and_then(|r| r.strip_suffix(']'))
                .ok_or_else(|| SegmentError::Unbalanced(raw.to_string()))?;
            (inner, false)
        };
        if inner.contains('[') || inner.contains(']') {
            return Err(SegmentError::Unbalanced(raw.to_string()));
        }

        let (name, spread) = match inner.strip_prefix("...") {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if name.is_empty() {
            return Err(SegmentError::EmptyName(raw.to_string()));
        }
        if !PARAM_NAME.is_match(name) {
            return Err(SegmentError::InvalidName(raw.to_string()));
        }
        match (optional, spread) {
            (true, true) => Ok(Segment::OptionalCatchAll(name.to_string())),
            // `[[id]]` is not a valid form.
            (true, false) => Err(SegmentError::Unbalanced(raw.to_string())),
            (false, true) => Ok(Segment::CatchAll(name.to_string())),
            (false, false) => Ok(Segment::Dynamic(name.to_string())),
        }
    }

    pub fn param(&self) -> Option<&str> {
        match self {
            Segment::Dynamic(n) | Segment::CatchAll(n) | Segment::OptionalCatchAll(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Segment::CatchAll(_) | Segment::OptionalCatchAll(_))
    }

    /// Form used in Next.js paths (`blog`, `[id]`, `[...slug]`); groups render empty.
    pub fn source_form(&self) -> String {
        match self {
            Segment::Static(s) => s.clone(),
            Segment::Dynamic(n) => format!("[{}]", n),
            Segment::CatchAll(n) => format!("[...{}]", n),
            Segment::OptionalCatchAll(n) => format!("[[...{}]]", n),
            Segment::Group(_) => String::new(),
        }
    }

    /// Form used in react-router paths (`blog`, `:id`, `*`).
    pub fn target_form(&self) -> String {
        match self {
            Segment::Static(s) => s.clone(),
            Segment::Dynamic(n) => format!(":{}", n),
            Segment::CatchAll(_) | Segment::OptionalCatchAll(_) => "*".to_string(),
            Segment::Group(_) => String::new(),
        }
    }
}

/// Parses every part; catch-alls must come last.
pub fn parse_segments<'a>(parts: impl IntoIterator<Item = &'a str>) -> Result<Vec<Segment>, SegmentError> {
    let segments = parts
        .into_iter()
        .map(Segment::parse)
        .collect::<Result<Vec<_>, _>>()?;
    let routed: Vec<&Segment> = segments
        .iter()
        .filter(|s| !matches!(s, Segment::Group(_)))
        .collect();
    if let Some(pos) = routed.iter().position(|s| s.is_catch_all())
        && pos + 1 != routed.len()
    {
        return Err(SegmentError::CatchAllNotLast(routed[pos].source_form()));
    }
    Ok(segments)
}

fn join(parts: impl Iterator<Item = String>) -> String {
    let joined: Vec<String> = parts.filter(|p| !p.is_empty()).collect();
    format!("/{}", joined.join("/"))
}

pub fn source_path(segments: &[Segment]) -> String {
    join(segments.iter().map(Segment::source_form))
}

pub fn target_path(segments: &[Segment]) -> String {
    join(segments.iter().map(Segment::target_form))
}

/// Converts a Next.js path string (`/blog/[id]`) to react-router syntax.
/// Segments that do not parse are kept as written.
pub fn convert_path(path: &str) -> String {
    let converted = path
        .split('/')
        .filter(|p| !p.is_empty())
        .map(|p| Segment::parse(p).map(|s| s.target_form()).unwrap_or_else(|_| p.to_string()));
    join(converted)
}

/// `blog/[id]` → `BlogId`.
pub fn pascal_case(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(Segment::parse("blog"), Ok(Segment::Static("blog".into())));
        assert_eq!(Segment::parse("[id]"), Ok(Segment::Dynamic("id".into())));
        assert_eq!(Segment::parse("[...slug]"), Ok(Segment::CatchAll("slug".into())));
        assert_eq!(Segment::parse("[[...slug]]"), Ok(Segment::OptionalCatchAll("slug".into())));
        assert_eq!(Segment::parse("(shop)"), Ok(Segment::Group("shop".into())));
    }

    #[test]
    fn test_malformed_segments() {
        assert!(matches!(Segment::parse("[id"), Err(SegmentError::Unbalanced(_))));
        assert!(matches!(Segment::parse("[]"), Err(SegmentError::EmptyName(_))));
        assert!(matches!(Segment::parse("[...]"), Err(SegmentError::EmptyName(_))));
        assert!(matches!(Segment::parse("[[id]]"), Err(SegmentError::Unbalanced(_))));
        assert!(matches!(Segment::parse("[a b]"), Err(SegmentError::InvalidName(_))));
        assert!(matches!(
            parse_segments(["[...slug]", "edit"]),
            Err(SegmentError::CatchAllNotLast(_))
        ));
    }

    #[test]
    fn test_convert_path() {
        assert_eq!(convert_path("/blog/[id]"), "/blog/:id");
        assert_eq!(convert_path("/docs/[...slug]"), "/docs/*");
        assert_eq!(convert_path("/shop/[[...slug]]"), "/shop/*");
        assert_eq!(convert_path("/"), "/");
        assert_eq!(convert_path("/a/"), "/a");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case(&["blog", "[id]"]), "BlogId");
        assert_eq!(pascal_case(&["user-settings", "[...slug]"]), "UserSettingsSlug");
    }
}

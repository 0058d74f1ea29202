//! The built-in rewrite rules, in application order.
//!
//! Callback rules that scan balanced braces run before anything that could
//! split the text they need to see, so the data-fetching block comes first.
//! Rules that wrap source text keep the wrapped range open, and the rules
//! reading a `useRouter()` binding run before the one that expands it.

use crate::config::BuildTarget;
use crate::rules::imports::{
    HEAD_MODULE, IMAGE_MODULE, ROUTER_MODULE, map_router_specifiers, render_named_import,
};
use crate::rules::{ComplexityTier, RuleCategory, RuleContext, Splice, TransformationRule};
use crate::scan::{extend_statement_end, matching_close, split_top_level};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::sync::Arc;

/// Bumped whenever a rule is added, removed or changes its output.
pub const RULE_TABLE_VERSION: u32 = 4;

pub static BUILTIN_RULES: Lazy<Vec<Arc<TransformationRule>>> = Lazy::new(|| {
    build_table()
        .expect("built-in rule patterns are valid")
        .into_iter()
        .map(Arc::new)
        .collect()
});

static NAMED_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+(?:type\s+)?(?:\w+\s*,\s*)?\{([^}]*)\}\s*from\s*['"]([^'"]+)['"]"#)
        .expect("valid named import regex")
});

static FONT_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+(?:(\w+)|\{([^}]*)\})\s+from\s+['"]@?next/font/(?:google|local)['"]"#)
        .expect("valid font import regex")
});

type Spliced = Result<Option<Splice>, String>;

fn whole<'t>(caps: &Captures<'t>) -> Result<regex::Match<'t>, String> {
    caps.get(0).ok_or_else(|| "empty match".to_string())
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> Result<regex::Match<'t>, String> {
    caps.get(index).ok_or_else(|| format!("missing capture {}", index))
}

fn has_data_loader(document: &str) -> bool {
    document.contains("getServerSideProps") || document.contains("getStaticProps")
}

fn in_loader_module(document: &str) -> bool {
    has_data_loader(document)
        || document.contains("function loader(")
        || document.contains("const loader =")
}

/// Local name of an import specifier (`a as b` binds `b`).
fn local_name(specifier: &str) -> &str {
    let specifier = specifier.trim().trim_start_matches("type ").trim();
    specifier.rsplit(" as ").next().unwrap_or(specifier).trim()
}

/// Module a named import binds `local` from.
fn import_source<'d>(document: &'d str, local: &str) -> Option<&'d str> {
    NAMED_IMPORT_RE.captures_iter(document).find_map(|caps| {
        let binds = caps.get(1)?.as_str().split(',').any(|s| local_name(s) == local);
        if binds { caps.get(2).map(|m| m.as_str()) } else { None }
    })
}

fn declares(document: &str, name: &str) -> bool {
    let pattern = format!(r"\b(?:function|const|let|var|class)\s+{}\b", regex::escape(name));
    Regex::new(&pattern)
        .map(|re| re.is_match(document))
        .unwrap_or(false)
}

/// Whether `hook` is the Next.js router hook, or the react-router import the
/// AST layer already put in its place.
fn is_next_router_hook(document: &str, hook: &str) -> bool {
    match import_source(document, hook) {
        Some(module) => matches!(module, "next/router" | "next/navigation" | ROUTER_MODULE),
        None => {
            !declares(document, hook)
                && (document.contains("next/router")
                    || document.contains("next/navigation")
                    || document.contains(ROUTER_MODULE))
        }
    }
}

/// Whether `name` holds the result of the Next.js `useRouter()`.
fn is_router_var(document: &str, name: &str) -> bool {
    if !is_next_router_hook(document, "useRouter") {
        return false;
    }
    let pattern = format!(
        r"\b(?:const|let|var)\s+{}\s*=\s*useRouter\(\s*\)",
        regex::escape(name)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(document))
        .unwrap_or(false)
}

/// Local names bound by `next/font` imports.
fn font_loaders(document: &str) -> Vec<&str> {
    let mut names = Vec::new();
    for caps in FONT_IMPORT_RE.captures_iter(document) {
        if let Some(default) = caps.get(1) {
            names.push(default.as_str());
        }
        if let Some(named) = caps.get(2) {
            names.extend(named.as_str().split(',').map(local_name).filter(|n| !n.is_empty()));
        }
    }
    names
}

/// Removes a declaration whose pattern ends at its opening brace, body included.
fn remove_braced_declaration(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    let m = whole(caps)?;
    let open = m.end() - 1;
    let close = matching_close(ctx.segment, open)
        .ok_or_else(|| format!("unbalanced braces after `{}`", m.as_str().trim()))?;
    Ok(Some(Splice::new(extend_statement_end(ctx.segment, close + 1))))
}

/// `return { props: X, revalidate: n }` becomes `return X`.
fn unwrap_props_return(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    if !has_data_loader(ctx.document) {
        return Ok(None);
    }
    let m = whole(caps)?;
    let open = m.start() + m.as_str().find('{').ok_or_else(|| "missing `{`".to_string())?;
    let close = matching_close(ctx.segment, open)
        .ok_or_else(|| "unbalanced braces in `return { props: ... }`".to_string())?;
    let inner = &ctx.segment[m.end()..close];
    let value = split_top_level(inner)
        .first()
        .copied()
        .ok_or_else(|| "empty `props` value".to_string())?;
    let start = m.end() + inner.find(value).unwrap_or(0);
    Ok(Some(
        Splice::replace(close + 1, "return ").kept(start..start + value.len()),
    ))
}

/// Page component props now come from the route loader.
fn props_from_loader_data(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    if !has_data_loader(ctx.document) {
        return Ok(None);
    }
    let m = whole(caps)?;
    let header = format!(
        "export default function {}() {{\n  const {} = useLoaderData()",
        &caps[1], &caps[2]
    );
    let splice = match caps.get(3) {
        Some(cast) => Splice::replace(m.end(), header + " as ").kept(cast.range()),
        None => Splice::replace(m.end(), header),
    };
    Ok(Some(splice.produced(";")))
}

fn redirect_return(caps: &Captures<'_>, _: &RuleContext<'_>) -> Spliced {
    let destination = group(caps, 1)?;
    Ok(Some(
        Splice::replace(whole(caps)?.end(), "return redirect(")
            .kept(destination.range())
            .produced(")"),
    ))
}

fn loader_params(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    if !in_loader_module(ctx.document) {
        return Ok(None);
    }
    Ok(Some(Splice::replace(whole(caps)?.end(), "params")))
}

fn loader_query(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    if !in_loader_module(ctx.document) {
        return Ok(None);
    }
    Ok(Some(Splice::replace(
        whole(caps)?.end(),
        "Object.fromEntries(new URL(request.url).searchParams)",
    )))
}

fn font_loader_shim(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    if !font_loaders(ctx.document).contains(&&caps[3]) {
        return Ok(None);
    }
    Ok(Some(Splice::replace(
        whole(caps)?.end(),
        format!(
            "{}{} = {{ className: '', variable: '', style: {{}} }};",
            &caps[1], &caps[2]
        ),
    )))
}

fn aliased_import(caps: &Captures<'_>, imported: &str, module: &str) -> Spliced {
    let local = &caps[1];
    let quote = caps[2].chars().next().unwrap_or('\'');
    let specifier = if local == imported {
        imported.to_string()
    } else {
        format!("{} as {}", imported, local)
    };
    Ok(Some(Splice::replace(
        whole(caps)?.end(),
        render_named_import(&[specifier], module, quote, false),
    )))
}

fn image_import(caps: &Captures<'_>, _: &RuleContext<'_>) -> Spliced {
    aliased_import(caps, "Image", IMAGE_MODULE)
}

fn head_import(caps: &Captures<'_>, _: &RuleContext<'_>) -> Spliced {
    aliased_import(caps, "Helmet", HEAD_MODULE)
}

fn link_import(caps: &Captures<'_>, _: &RuleContext<'_>) -> Spliced {
    aliased_import(caps, "Link", ROUTER_MODULE)
}

fn router_hooks_import(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    let m = whole(caps)?;
    let quote = caps[2].chars().next().unwrap_or('\'');
    let (mapped, _) = map_router_specifiers(caps[1].split(','));
    if mapped.is_empty() {
        return Ok(Some(Splice::new(extend_statement_end(ctx.segment, m.end()))));
    }
    Ok(Some(Splice::replace(
        m.end(),
        render_named_import(&mapped, ROUTER_MODULE, quote, false),
    )))
}

/// Match of `<var>.member` when `<var>` is bound to the Next.js router.
fn router_match<'t>(caps: &Captures<'t>, ctx: &RuleContext<'_>) -> Result<Option<regex::Match<'t>>, String> {
    let m = whole(caps)?;
    let member_of_member = ctx.segment[..m.start()].ends_with('.');
    if member_of_member || !is_router_var(ctx.document, &caps[1]) {
        return Ok(None);
    }
    Ok(Some(m))
}

fn router_member(caps: &Captures<'_>, ctx: &RuleContext<'_>, text: &str) -> Spliced {
    Ok(router_match(caps, ctx)?.map(|m| Splice::replace(m.end(), text)))
}

fn router_push(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    router_member(caps, ctx, "navigate(")
}

fn router_replace(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    let Some(m) = router_match(caps, ctx)? else {
        return Ok(None);
    };
    Ok(Some(
        Splice::replace(m.end(), "navigate(")
            .kept(group(caps, 2)?.range())
            .produced(", { replace: true })"),
    ))
}

fn router_back(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    router_member(caps, ctx, "navigate(-1)")
}

fn router_reload(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    router_member(caps, ctx, "window.location.reload()")
}

fn router_query(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    router_member(caps, ctx, "params")
}

fn router_as_path(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    router_member(caps, ctx, "(location.pathname + location.search)")
}

fn router_pathname(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    router_member(caps, ctx, "location.pathname")
}

fn router_is_ready(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    router_member(caps, ctx, "true")
}

fn expand_use_router(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    if !is_next_router_hook(ctx.document, "useRouter") {
        return Ok(None);
    }
    let indent = &caps[1];
    Ok(Some(Splice::replace(
        whole(caps)?.end(),
        format!(
            "{i}const navigate = useNavigate();\n{i}const location = useLocation();\n{i}const params = useParams();",
            i = indent
        ),
    )))
}

fn use_pathname(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    if !is_next_router_hook(ctx.document, "usePathname") {
        return Ok(None);
    }
    Ok(Some(Splice::replace(whole(caps)?.end(), "useLocation().pathname")))
}

fn search_params_tuple(caps: &Captures<'_>, ctx: &RuleContext<'_>) -> Spliced {
    if !is_next_router_hook(ctx.document, "useSearchParams") {
        return Ok(None);
    }
    Ok(Some(Splice::replace(
        whole(caps)?.end(),
        format!("const [{}] = useSearchParams()", &caps[1]),
    )))
}

fn build_table() -> Result<Vec<TransformationRule>, regex::Error> {
    use ComplexityTier::*;
    use RuleCategory::*;

    const MEMBER: &str = r"\b([A-Za-z_]\w*)\.";

    Ok(vec![
        TransformationRule::template(
            "general/use-client-directive",
            r#"(?m)^[ \t]*['"]use client['"];?[ \t]*\r?\n?"#,
            "",
            "Removed 'use client' directive",
            Simple,
            General,
        )?,
        TransformationRule::template(
            "general/use-server-directive",
            r#"(?m)^[ \t]*['"]use server['"];?[ \t]*\r?\n?"#,
            "",
            "Removed 'use server' directive",
            Simple,
            General,
        )?
        .with_advisory("Server actions have no client-side equivalent; move them to a backend endpoint"),
        // Data fetching: balanced scans first.
        TransformationRule::callback(
            "data-fetching/static-paths",
            r"(?m)^[ \t]*export\s+(?:(?:async\s+)?function\s+getStaticPaths\s*\([^)]*\)[^{]*|const\s+getStaticPaths\b[^=]*=\s*(?:async\s*)?\([^)]*\)[^{]*=>\s*)\{",
            remove_braced_declaration,
            "Removed getStaticPaths",
            Complex,
            DataFetching,
        )?
        .with_advisory("getStaticPaths was removed; dynamic segments are resolved at runtime by the router"),
        TransformationRule::callback(
            "data-fetching/props-return",
            r"return\s*\{\s*props\s*:\s*",
            unwrap_props_return,
            "Loader returns page props directly",
            Complex,
            DataFetching,
        )?
        .with_advisory("Options returned next to `props` (revalidate, notFound) are not kept by the loader"),
        TransformationRule::callback(
            "data-fetching/page-props",
            r"export\s+default\s+function\s+(\w+)\s*\(\s*(\{[^}]*\}|\w+)\s*(?::\s*([\w.]+(?:<[^>()]*>)?))?\s*\)\s*\{",
            props_from_loader_data,
            "Page props read with useLoaderData()",
            Complex,
            DataFetching,
        )?,
        TransformationRule::template(
            "data-fetching/not-found-return",
            r"return\s*\{\s*notFound\s*:\s*true\s*,?\s*\}",
            "throw new Response('Not Found', { status: 404 })",
            "notFound result becomes a 404 response",
            Medium,
            DataFetching,
        )?,
        TransformationRule::callback(
            "data-fetching/redirect-return",
            r"return\s*\{\s*redirect\s*:\s*\{\s*destination\s*:\s*([^,}]+?)\s*(?:,[^}]*)?\}\s*,?\s*\}",
            redirect_return,
            "redirect result becomes redirect()",
            Medium,
            DataFetching,
        )?,
        TransformationRule::template(
            "data-fetching/loader-function",
            r"export\s+(?:async\s+)?function\s+getS(?:erverSide|tatic)Props\s*\([^)]*\)",
            "export async function loader({ params, request })",
            "getServerSideProps/getStaticProps converted to a route loader",
            Complex,
            DataFetching,
        )?
        .with_advisory("Register the exported `loader` on the route that renders this page"),
        TransformationRule::template(
            "data-fetching/loader-arrow",
            r"export\s+const\s+getS(?:erverSide|tatic)Props(?:\s*:\s*[\w.]+(?:<[^>]*>)?)?\s*=\s*async\s*(?:\([^)]*\)|\w+)\s*=>",
            "export const loader = async ({ params, request }) =>",
            "getServerSideProps/getStaticProps converted to a route loader",
            Complex,
            DataFetching,
        )?
        .with_advisory("Register the exported `loader` on the route that renders this page"),
        TransformationRule::callback(
            "data-fetching/context-params",
            r"\b(?:context|ctx)\.params\b",
            loader_params,
            "context.params read from loader params",
            Simple,
            DataFetching,
        )?,
        TransformationRule::callback(
            "data-fetching/context-query",
            r"\b(?:context|ctx)\.query\b",
            loader_query,
            "context.query read from the request URL",
            Medium,
            DataFetching,
        )?,
        TransformationRule::template(
            "data-fetching/inferred-props-type",
            r"\bInferGet(?:ServerSide|Static)PropsType<typeof\s+\w+>",
            "Awaited<ReturnType<typeof loader>>",
            "Inferred page props typed from the loader",
            Simple,
            DataFetching,
        )?,
        // General framework cleanup.
        TransformationRule::template(
            "general/next-type-imports",
            r#"(?m)^[ \t]*import\s+(?:type\s+)?(?:\{[^}]*\}|\w+)(?:\s*,\s*\{[^}]*\})?\s+from\s+['"]next(?:/app|/types)?['"];?[ \t]*\r?\n?"#,
            "",
            "Removed Next.js type imports",
            Simple,
            General,
        )?,
        TransformationRule::template(
            "general/next-page-annotation",
            r":\s*NextPage(?:<[^>]*>)?(\s*=)",
            "$1",
            "Removed NextPage annotation",
            Simple,
            General,
        )?,
        TransformationRule::callback(
            "general/next-font-loader",
            r"(?m)^([ \t]*)((?:export\s+)?const\s+\w+)\s*=\s*([A-Za-z_]\w*)\(\s*\{[^}]*\}\s*\)\s*;?",
            font_loader_shim,
            "Font loader call replaced by a static shim",
            Medium,
            General,
        )?,
        TransformationRule::template(
            "general/next-font-import",
            r#"(?m)^[ \t]*import\s+(?:\w+|\{[^}]*\})\s+from\s+['"]@?next/font/(?:google|local)['"];?[ \t]*\r?\n?"#,
            "",
            "Removed next/font import",
            Simple,
            General,
        )?
        .with_advisory("Fonts are no longer optimized at build time; load them with a <link> tag or @font-face"),
        TransformationRule::template(
            "general/dynamic-import",
            r#"import\s+dynamic\s+from\s+(['"])next/dynamic['"]"#,
            "import { lazy } from ${1}react${1}",
            "next/dynamic replaced by React.lazy",
            Simple,
            General,
        )?,
        TransformationRule::template(
            "general/dynamic-call",
            r#"\bdynamic\(\s*(\(\)\s*=>\s*import\(\s*['"][^'"]+['"]\s*\))\s*(?:,\s*\{[^}]*\}\s*)?\)"#,
            "lazy($1)",
            "dynamic() call replaced by lazy()",
            Medium,
            General,
        )?
        .with_advisory("Lazy components must render inside <Suspense>; loading options were dropped"),
        // Component imports the AST layer could not handle.
        TransformationRule::callback(
            "component/image-import",
            r#"import\s+(\w+)\s+from\s+(['"])next/(?:legacy/|future/)?image['"]"#,
            image_import,
            "next/image import replaced by @unpic/react",
            Simple,
            Component,
        )?,
        TransformationRule::callback(
            "component/head-import",
            r#"import\s+(\w+)\s+from\s+(['"])next/head['"]"#,
            head_import,
            "next/head import replaced by react-helmet-async",
            Simple,
            Component,
        )?,
        // Routing: members of a `useRouter()` binding, then the binding itself, then imports.
        TransformationRule::callback(
            "routing/router-replace",
            &format!(r"{}replace\(([^()]*)\)", MEMBER),
            router_replace,
            "router.replace() replaced by navigate(..., { replace: true })",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/router-push",
            &format!(r"{}push\(", MEMBER),
            router_push,
            "router.push() replaced by navigate()",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/router-back",
            &format!(r"{}back\(\)", MEMBER),
            router_back,
            "router.back() replaced by navigate(-1)",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/router-reload",
            &format!(r"{}reload\(\)", MEMBER),
            router_reload,
            "router.reload() replaced by window.location.reload()",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/router-query",
            &format!(r"{}query\b", MEMBER),
            router_query,
            "router.query replaced by params",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/router-as-path",
            &format!(r"{}asPath\b", MEMBER),
            router_as_path,
            "router.asPath replaced by location",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/router-pathname",
            &format!(r"{}pathname\b", MEMBER),
            router_pathname,
            "router.pathname replaced by location.pathname",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/router-is-ready",
            &format!(r"{}isReady\b", MEMBER),
            router_is_ready,
            "router.isReady is always true",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/use-router-expansion",
            r"(?m)^([ \t]*)(?:const|let|var)\s+\w+\s*=\s*useRouter\(\)\s*;?",
            expand_use_router,
            "useRouter() split into navigate/location/params hooks",
            Medium,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/use-pathname",
            r"\busePathname\(\)",
            use_pathname,
            "usePathname() replaced by useLocation().pathname",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/use-search-params",
            r"\bconst\s+(\w+)\s*=\s*useSearchParams\(\)",
            search_params_tuple,
            "useSearchParams() destructured as a tuple",
            Simple,
            Routing,
        )?,
        TransformationRule::template(
            "routing/app-outlet",
            r"<Component\s+\{\s*\.\.\.pageProps\s*\}\s*/>",
            "<Outlet />",
            "App shell renders <Outlet />",
            Medium,
            Routing,
        )?
        .with_advisory("The app shell is now a layout route; mount it at the root of the router"),
        TransformationRule::template(
            "routing/app-props",
            r"\(\s*\{\s*Component\s*,\s*pageProps\s*\}\s*(?::\s*AppProps)?\s*\)",
            "()",
            "App shell no longer receives Component/pageProps",
            Simple,
            Routing,
        )?,
        TransformationRule::callback(
            "routing/link-import",
            r#"import\s+(\w+)\s+from\s+(['"])next/link['"]"#,
            link_import,
            "next/link import replaced by react-router-dom",
            Simple,
            Routing,
        )?
        .with_advisory("react-router <Link> takes `to` instead of `href`"),
        TransformationRule::callback(
            "routing/router-hooks-import",
            r#"import\s*\{([^}]*)\}\s*from\s*(['"])next/(?:router|navigation)['"]"#,
            router_hooks_import,
            "Router hooks imported from react-router-dom",
            Simple,
            Routing,
        )?,
        // Environment variables.
        TransformationRule::template(
            "config/public-env-vite",
            r"\bprocess\.env\.NEXT_PUBLIC_(\w+)",
            "import.meta.env.VITE_$1",
            "NEXT_PUBLIC_ variables read from import.meta.env.VITE_",
            Simple,
            Config,
        )?
        .only_for(BuildTarget::Vite)
        .with_advisory("Rename NEXT_PUBLIC_ variables to VITE_ in your .env files"),
        TransformationRule::template(
            "config/node-env-vite",
            r"\bprocess\.env\.NODE_ENV\b",
            "import.meta.env.MODE",
            "NODE_ENV read from import.meta.env.MODE",
            Simple,
            Config,
        )?
        .only_for(BuildTarget::Vite),
        TransformationRule::template(
            "config/public-env-cra",
            r"\bprocess\.env\.NEXT_PUBLIC_(\w+)",
            "process.env.REACT_APP_$1",
            "NEXT_PUBLIC_ variables renamed to REACT_APP_",
            Simple,
            Config,
        )?
        .only_for(BuildTarget::CreateReactApp)
        .with_advisory("Rename NEXT_PUBLIC_ variables to REACT_APP_ in your .env files"),
        // API handlers.
        TransformationRule::callback(
            "api/config-export",
            r"(?m)^[ \t]*export\s+const\s+config\s*=\s*\{",
            remove_braced_declaration,
            "Removed API route config export",
            Medium,
            Api,
        )?
        .with_advisory("API route config (bodyParser, runtime) must be set on the server instead"),
        TransformationRule::template(
            "api/next-api-handler-type",
            r":\s*NextApiHandler\b(?:<[^>]*>)?",
            "",
            "Removed NextApiHandler annotation",
            Simple,
            Api,
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionOptions;
    use crate::rules::RuleRewriter;
    use std::collections::HashSet;

    fn rewrite(source: &str) -> String {
        RuleRewriter::builtin().apply(source).unwrap().text
    }

    #[test]
    fn test_table_compiles_with_unique_names() {
        let names: HashSet<&str> = BUILTIN_RULES.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names.len(), BUILTIN_RULES.len());
        assert!(BUILTIN_RULES.len() > 30);
    }

    #[test]
    fn test_use_router_expansion_keeps_indentation() {
        let out = rewrite("import { useRouter } from 'next/router';\nfunction A() {\n    const router = useRouter();\n}\n");
        assert!(out.contains("    const navigate = useNavigate();\n    const location = useLocation();\n    const params = useParams();"));
    }

    #[test]
    fn test_router_members() {
        let out = rewrite("import { useRouter } from 'next/router';\nconst router = useRouter();\nrouter.push('/a'); router.replace('/b'); router.back(); x = router.query.id;\n");
        assert!(out.ends_with(
            "navigate('/a'); navigate('/b', { replace: true }); navigate(-1); x = params.id;\n"
        ));
        assert!(out.starts_with("import { useNavigate, useLocation, useParams } from 'react-router-dom';\n"));
    }

    #[test]
    fn test_router_rules_need_a_next_router_binding() {
        let tanstack = "import { useRouter } from '@tanstack/react-router';\nexport function Nav() {\n  const router = useRouter();\n  router.navigate({ to: '/x' });\n  return router.state.location.pathname;\n}\n";
        assert_eq!(rewrite(tanstack), tanstack);

        let param = "function go(router) {\n  router.push('/y');\n  return router.query;\n}\n";
        assert_eq!(rewrite(param), param);

        let nested = "import { useRouter } from 'next/router';\nconst router = useRouter();\nthis.router.push('/z');\nitems.push(router.pathname);\n";
        let out = rewrite(nested);
        assert!(out.contains("this.router.push('/z');"));
        assert!(out.contains("items.push(location.pathname);"));
    }

    #[test]
    fn test_navigation_hooks_only_from_next() {
        let next = "import { usePathname, useSearchParams } from 'next/navigation';\nconst path = usePathname();\nconst search = useSearchParams();\n";
        let out = rewrite(next);
        assert!(out.contains("const path = useLocation().pathname;"));
        assert!(out.contains("const [search] = useSearchParams();"));

        let other = "import { usePathname } from './hooks';\nconst path = usePathname();\n";
        assert_eq!(rewrite(other), other);
    }

    #[test]
    fn test_router_import_drops_unmapped_names() {
        let out = rewrite("import { useRouter, withRouter } from \"next/router\";\n");
        assert_eq!(
            out,
            "import { useNavigate, useLocation, useParams } from \"react-router-dom\";\n"
        );
        let out = rewrite("import { notFound } from 'next/navigation';\nexport {};\n");
        assert_eq!(out, "export {};\n");
    }

    #[test]
    fn test_component_import_fallbacks() {
        let out = rewrite("import Image from 'next/image';\nimport Meta from 'next/head';\n");
        assert!(out.contains("import { Image } from '@unpic/react'"));
        assert!(out.contains("import { Helmet as Meta } from 'react-helmet-async'"));
    }

    #[test]
    fn test_server_side_props_become_loader() {
        let source = "export default function Page({ user }: Props) {\n  return <p>{user.name}</p>;\n}\n\nexport async function getServerSideProps(ctx) {\n  const user = await load(ctx.params.id, ctx.query.tab);\n  if (!user) return { redirect: { destination: '/login', permanent: false } };\n  return { props: { user } };\n}\n";
        let out = rewrite(source);
        assert!(out.contains("export default function Page() {\n  const { user } = useLoaderData() as Props;"));
        assert!(out.contains("export async function loader({ params, request })"));
        assert!(out.contains("load(params.id, Object.fromEntries(new URL(request.url).searchParams).tab)"));
        assert!(out.contains("return redirect('/login')"));
        assert!(out.contains("return { user };"));
    }

    #[test]
    fn test_props_return_untouched_without_loader() {
        let source = "function build() { return { props: { a: 1 } }; }\n";
        assert_eq!(rewrite(source), source);
    }

    #[test]
    fn test_static_paths_arrow_form_is_removed() {
        let source = "export const getStaticPaths = async () => {\n  return { paths: [], fallback: 'blocking' };\n};\nexport const x = 1;\n";
        assert_eq!(rewrite(source), "export const x = 1;\n");
    }

    #[test]
    fn test_unbalanced_static_paths_fails_the_file() {
        let err = RuleRewriter::builtin()
            .apply("export function getStaticPaths() {\n  return { paths: [] ;\n")
            .unwrap_err();
        assert_eq!(err.rule, "data-fetching/static-paths");
    }

    #[test]
    fn test_env_rules_follow_target() {
        let mut options = ConversionOptions::default();
        let vite = RuleRewriter::for_options(&options, &[]);
        assert_eq!(
            vite.apply("process.env.NEXT_PUBLIC_URL").unwrap().text,
            "import.meta.env.VITE_URL"
        );
        options.target = BuildTarget::CreateReactApp;
        let cra = RuleRewriter::for_options(&options, &[]);
        assert_eq!(
            cra.apply("process.env.NEXT_PUBLIC_URL + process.env.NODE_ENV").unwrap().text,
            "process.env.REACT_APP_URL + process.env.NODE_ENV"
        );
    }

    #[test]
    fn test_font_loader_is_shimmed() {
        let source = "import { Inter } from 'next/font/google';\nconst inter = Inter({ subsets: ['latin'] });\n";
        let out = rewrite(source);
        assert_eq!(
            out,
            "const inter = { className: '', variable: '', style: {} };\n"
        );
    }

    #[test]
    fn test_font_shim_only_for_imported_loaders() {
        let source = "import localFont from 'next/font/local';\nconst brand = localFont({ src: './brand.woff2' });\nconst theme = createTheme({ mode: 'dark' });\nconst Palette = Colors({ base: 1 });\n";
        let out = rewrite(source);
        assert!(out.starts_with("const brand = { className: '', variable: '', style: {} };\n"));
        assert!(out.contains("const theme = createTheme({ mode: 'dark' });"));
        assert!(out.contains("const Palette = Colors({ base: 1 });"));
    }

    #[test]
    fn test_api_config_export_removed() {
        let rw = RuleRewriter::for_api(&ConversionOptions::default());
        let out = rw
            .apply("export const config = {\n  api: { bodyParser: false },\n};\nexport default h;\n")
            .unwrap();
        assert_eq!(out.text, "export default h;\n");
        assert!(out.applied[0].advisory.is_some());
    }
}

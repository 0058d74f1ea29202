use crate::config::ConversionOptions;
use crate::rules::table::BUILTIN_RULES;
use crate::rules::{ComplexityTier, Piece, RuleCategory, RuleContext, TransformationRule};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppliedRule {
    pub name: String,
    pub description: String,
    pub tier: ComplexityTier,
    pub category: RuleCategory,
    pub occurrences: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RewriteOutput {
    pub text: String,
    pub applied: Vec<AppliedRule>,
}

impl RewriteOutput {
    pub fn applied_descriptions(&self) -> Vec<String> {
        self.applied.iter().map(|r| r.description.clone()).collect()
    }
}

/// A callback rule refused its match. The caller keeps the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFailure {
    pub rule: String,
    pub message: String,
}

impl std::fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule '{}' failed: {}", self.rule, self.message)
    }
}

/// Text of the file split into pieces; pieces written by a rule are never
/// matched again in the same pass. Text a rule only carried over stays open.
struct Segment {
    text: String,
    produced: bool,
}

pub struct RuleRewriter {
    rules: Vec<Arc<TransformationRule>>,
}

impl RuleRewriter {
    pub fn new(rules: Vec<Arc<TransformationRule>>) -> Self {
        Self { rules }
    }

    /// Every built-in rule, whatever its category or target.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_RULES.iter().cloned().collect())
    }

    pub fn filtered(predicate: impl Fn(&TransformationRule) -> bool) -> Self {
        Self::new(
            BUILTIN_RULES
                .iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
        )
    }

    /// Rules enabled by the options, followed by user rules that are enabled too.
    pub fn for_options(options: &ConversionOptions, extra: &[Arc<TransformationRule>]) -> Self {
        let mut rules: Vec<Arc<TransformationRule>> = BUILTIN_RULES
            .iter()
            .filter(|r| r.applies_to(options))
            .cloned()
            .collect();
        rules.extend(extra.iter().filter(|r| r.applies_to(options)).cloned());
        Self::new(rules)
    }

    /// Rules for API handler modules: api and general. The handlers run on
    /// Node, so `process.env` stays as written.
    pub fn for_api(options: &ConversionOptions) -> Self {
        let target = options.target;
        Self::filtered(|r| {
            matches!(r.category, RuleCategory::Api | RuleCategory::General) && r.matches_target(target)
        })
    }

    pub fn rules(&self) -> &[Arc<TransformationRule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies every rule once, in table order.
    pub fn apply(&self, source: &str) -> Result<RewriteOutput, RuleFailure> {
        let mut segments = vec![Segment {
            text: source.to_string(),
            produced: false,
        }];
        let mut applied = Vec::new();

        for rule in &self.rules {
            let fires = segments
                .iter()
                .any(|s| !s.produced && rule.pattern.is_match(&s.text));
            if !fires {
                continue;
            }

            let document: String = segments.iter().map(|s| s.text.as_str()).collect();
            let mut next = Vec::with_capacity(segments.len() + 2);
            let mut occurrences = 0usize;
            for segment in segments {
                if segment.produced {
                    next.push(segment);
                    continue;
                }
                occurrences += split_segment(rule, &segment.text, &document, &mut next)?;
            }
            segments = next;

            if occurrences == 0 {
                continue;
            }
            applied.push(AppliedRule {
                name: rule.name.clone(),
                description: rule.description.clone(),
                tier: rule.tier,
                category: rule.category,
                occurrences,
                advisory: rule.advisory.clone(),
            });
        }

        Ok(RewriteOutput {
            text: segments.into_iter().map(|s| s.text).collect(),
            applied,
        })
    }
}

fn split_segment(
    rule: &TransformationRule,
    text: &str,
    document: &str,
    out: &mut Vec<Segment>,
) -> Result<usize, RuleFailure> {
    let ctx = RuleContext {
        segment: text,
        document,
    };
    let mut cursor = 0usize;
    let mut occurrences = 0usize;

    for caps in rule.pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        // Skip matches swallowed by a callback that extended its span.
        if whole.start() < cursor {
            continue;
        }
        let spliced = rule.replace_at(&caps, &ctx).map_err(|message| RuleFailure {
            rule: rule.name.clone(),
            message,
        })?;
        let Some(splice) = spliced else { continue };
        let end = splice.end.clamp(whole.end(), text.len());

        if whole.start() > cursor {
            out.push(Segment {
                text: text[cursor..whole.start()].to_string(),
                produced: false,
            });
        }
        for piece in splice.pieces {
            let segment = match piece {
                Piece::Produced(text) => Segment {
                    text,
                    produced: true,
                },
                Piece::Kept(range) => {
                    if range.start < whole.start() || range.end > end {
                        return Err(RuleFailure {
                            rule: rule.name.clone(),
                            message: format!("kept range {:?} outside the replaced span", range),
                        });
                    }
                    let kept = text.get(range).ok_or_else(|| RuleFailure {
                        rule: rule.name.clone(),
                        message: "kept range splits a character".to_string(),
                    })?;
                    Segment {
                        text: kept.to_string(),
                        produced: false,
                    }
                }
            };
            out.push(segment);
        }
        cursor = end;
        occurrences += 1;
    }

    if cursor < text.len() {
        out.push(Segment {
            text: text[cursor..].to_string(),
            produced: false,
        });
    }
    Ok(occurrences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleCallback, Splice};
    use regex::Captures;

    fn rule(name: &str, pattern: &str, replacement: &str) -> Arc<TransformationRule> {
        Arc::new(
            TransformationRule::template(
                name,
                pattern,
                replacement,
                name,
                ComplexityTier::Simple,
                RuleCategory::General,
            )
            .unwrap(),
        )
    }

    fn failing(_: &Captures<'_>, _: &RuleContext<'_>) -> Result<Option<Splice>, String> {
        Err("unbalanced braces".to_string())
    }

    fn unwrap_call(caps: &Captures<'_>, _: &RuleContext<'_>) -> Result<Option<Splice>, String> {
        let end = caps.get(0).unwrap().end();
        let arg = caps.get(1).unwrap().range();
        Ok(Some(Splice::replace(end, "call(").kept(arg).produced(")")))
    }

    fn callback_rule(name: &str, pattern: &str, callback: RuleCallback) -> Arc<TransformationRule> {
        Arc::new(
            TransformationRule::callback(
                name,
                pattern,
                callback,
                name,
                ComplexityTier::Medium,
                RuleCategory::General,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_rules_apply_in_order_and_replace_all_occurrences() {
        let rw = RuleRewriter::new(vec![rule("a", "foo", "bar"), rule("b", "baz", "qux")]);
        let out = rw.apply("foo baz foo").unwrap();
        assert_eq!(out.text, "bar qux bar");
        assert_eq!(out.applied.len(), 2);
        assert_eq!(out.applied[0].occurrences, 2);
    }

    #[test]
    fn test_later_rule_does_not_rescan_produced_text() {
        // "b" would turn the output of "a" into something else if it re-scanned it.
        let rw = RuleRewriter::new(vec![rule("a", "alpha", "beta"), rule("b", "beta", "gamma")]);
        let out = rw.apply("alpha beta").unwrap();
        assert_eq!(out.text, "beta gamma");
    }

    #[test]
    fn test_rule_sees_text_modified_by_earlier_rules_outside_produced_spans() {
        let rw = RuleRewriter::new(vec![rule("a", "x", "y"), rule("b", "z", "w")]);
        let out = rw.apply("xz").unwrap();
        assert_eq!(out.text, "yw");
    }

    #[test]
    fn test_kept_text_is_still_rewritten_by_later_rules() {
        let rw = RuleRewriter::new(vec![
            callback_rule("wrap", r"wrap\(([^)]*)\)", unwrap_call),
            rule("inner", "old", "new"),
        ]);
        let out = rw.apply("wrap(old) + old").unwrap();
        assert_eq!(out.text, "call(new) + new");
        assert_eq!(out.applied[1].occurrences, 2);
        // "call(" itself was produced, so a rule on it does not fire.
        let rw = RuleRewriter::new(vec![
            callback_rule("wrap", r"wrap\(([^)]*)\)", unwrap_call),
            rule("call", r"call\(", "invoke("),
        ]);
        assert_eq!(rw.apply("wrap(a)").unwrap().text, "call(a)");
    }

    #[test]
    fn test_non_matching_rule_is_not_recorded() {
        let rw = RuleRewriter::new(vec![rule("a", "nope", "yes")]);
        let out = rw.apply("hello").unwrap();
        assert_eq!(out.text, "hello");
        assert!(out.applied.is_empty());
    }

    #[test]
    fn test_callback_failure_is_reported_with_rule_name() {
        let bad = callback_rule("broken", "x", failing);
        let rw = RuleRewriter::new(vec![rule("a", "a", "b"), bad]);
        let err = rw.apply("a x").unwrap_err();
        assert_eq!(err.rule, "broken");
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn test_builtin_table_is_idempotent_on_its_output() {
        let source = r#"'use client';
import { useRouter } from 'next/router';
import Link from 'next/link';
import Image from 'next/image';
import Head from 'next/head';
import dynamic from 'next/dynamic';
import type { GetServerSideProps, NextPage } from 'next';

const Chart = dynamic(() => import('../components/Chart'), { ssr: false });

export default function Post({ post }: Props) {
  const router = useRouter();
  const id = router.query.id;
  const key = process.env.NEXT_PUBLIC_API_KEY;
  if (process.env.NODE_ENV === 'development') console.log(router.asPath);
  return <Link href="/">{post.title}</Link>;
}

export async function getServerSideProps(context) {
  const res = await fetch(`https://api.example.com/posts/${context.params.id}`);
  const post = await res.json();
  if (!post) {
    return { notFound: true };
  }
  return { props: { post }, revalidate: 10 };
}

export async function getStaticPaths() {
  return { paths: [{ params: { id: '1' } }], fallback: false };
}
"#;
        let rw = RuleRewriter::builtin();
        let once = rw.apply(source).unwrap();
        let twice = rw.apply(&once.text).unwrap();
        assert_eq!(once.text, twice.text);
        assert!(twice.applied.is_empty(), "re-fired: {:?}", twice.applied);
    }

    #[test]
    fn test_builtin_table_is_idempotent_on_loader_and_router_fixtures() {
        let fixtures = [
            // Router calls nested in each other.
            "import { useRouter } from 'next/router';\nexport function Next() {\n  const router = useRouter();\n  useEffect(() => { router.replace(router.query.next); }, []);\n  return <p>{router.asPath}</p>;\n}\n",
            // Public env read inside the returned props.
            "export async function getStaticProps() {\n  return { props: { url: process.env.NEXT_PUBLIC_URL } };\n}\n",
            // Route params inside the returned props.
            "export async function getServerSideProps(context) {\n  return { props: { id: context.params.id, tab: context.query.tab } };\n}\n",
            // Page typed from the data loader.
            "import type { InferGetServerSidePropsType } from 'next';\nexport default function Page({ user }: InferGetServerSidePropsType<typeof getServerSideProps>) {\n  return <p>{user.name}</p>;\n}\nexport const getServerSideProps = async (ctx) => {\n  if (!ctx.params) return { redirect: { destination: ctx.query.back, permanent: false } };\n  return { props: { user: await load(ctx.params.id) } };\n};\n",
        ];
        let rw = RuleRewriter::builtin();
        for source in fixtures {
            let once = rw.apply(source).unwrap();
            let twice = rw.apply(&once.text).unwrap();
            assert_eq!(once.text, twice.text, "not idempotent for:\n{}", source);
            assert!(twice.applied.is_empty(), "re-fired: {:?}", twice.applied);
        }
    }

    #[test]
    fn test_loader_output_has_no_next_leftovers() {
        let rw = RuleRewriter::builtin();
        let out = rw
            .apply("export async function getServerSideProps(context) {\n  return { props: { id: context.params.id, url: process.env.NEXT_PUBLIC_URL } };\n}\n")
            .unwrap();
        assert_eq!(
            out.text,
            "export async function loader({ params, request }) {\n  return { id: params.id, url: import.meta.env.VITE_URL };\n}\n"
        );

        let out = rw
            .apply("export default function Page({ user }: InferGetServerSidePropsType<typeof getServerSideProps>) {\n  return null;\n}\nexport async function getServerSideProps() {\n  return { props: { user: 1 } };\n}\n")
            .unwrap();
        assert!(out.text.contains("const { user } = useLoaderData() as Awaited<ReturnType<typeof loader>>;"));
        assert!(!out.text.contains("getServerSideProps"));

        let out = rw
            .apply("import { useRouter } from 'next/router';\nconst router = useRouter();\nrouter.replace(router.query.next);\n")
            .unwrap();
        assert!(out.text.contains("navigate(params.next, { replace: true });"));
    }

    #[test]
    fn test_for_options_respects_toggles() {
        let mut options = ConversionOptions::default();
        options.transform_data_fetching = false;
        options.use_client_router = false;
        let rw = RuleRewriter::for_options(&options, &[]);
        assert!(
            rw.rules()
                .iter()
                .all(|r| r.category != RuleCategory::DataFetching && r.category != RuleCategory::Routing)
        );
        assert!(rw.rules().iter().all(|r| r.category != RuleCategory::Api));
    }

    #[test]
    fn test_for_api_keeps_api_rules() {
        let rw = RuleRewriter::for_api(&ConversionOptions::default());
        assert!(rw.rules().iter().any(|r| r.category == RuleCategory::Api));
        assert!(rw.rules().iter().all(|r| r.category != RuleCategory::Routing));
    }

    #[test]
    fn test_for_api_keeps_process_env() {
        let rw = RuleRewriter::for_api(&ConversionOptions::default());
        assert!(rw.rules().iter().all(|r| r.category != RuleCategory::Config));
        let source = "const key = process.env.NEXT_PUBLIC_KEY;\nif (process.env.NODE_ENV === 'test') {}\n";
        assert_eq!(rw.apply(source).unwrap().text, source);
    }
}

//! Route patterns: `/users/:id`, `/static/*`.
//!
//! A pattern is a sequence of segments separated by `/`:
//!
//! | Segment | Matches |
//! |---|---|
//! | `users` | exactly `users` |
//! | `:id`   | any single non-empty segment, bound as `id` |
//! | `*`     | the rest of the path, zero or more segments (last segment only) |
//!
//! Literal and named segments are handed to `matchit` in its own `{name}`
//! syntax. Wildcard patterns are matched here, segment by segment, because
//! they must also accept an empty remainder (`/users/*` matches `/users`).

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::Error;

/// Parameter key under which a wildcard's remainder is stored.
pub(crate) const WILDCARD: &str = "*";

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Segment {
    Literal(String),
    Named(String),
}

#[derive(Clone, Debug)]
pub(crate) struct Pattern {
    source: Arc<str>,
    segments: Vec<Segment>,
    wildcard: bool,
}

impl Pattern {
    pub(crate) fn parse(source: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidRoute {
            pattern: source.to_owned(),
            reason: reason.to_owned(),
        };

        let rest = source.strip_prefix('/').ok_or_else(|| invalid("must start with `/`"))?;
        let raw: Vec<&str> = rest.split('/').collect();

        let mut segments = Vec::with_capacity(raw.len());
        let mut wildcard = false;

        for (i, seg) in raw.iter().enumerate() {
            if *seg == WILDCARD {
                if i + 1 != raw.len() {
                    return Err(invalid("`*` must be the last segment"));
                }
                wildcard = true;
            } else if let Some(name) = seg.strip_prefix(':') {
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                    return Err(invalid("parameter names must be non-empty [A-Za-z0-9_-]"));
                }
                if segments.contains(&Segment::Named(name.to_owned())) {
                    return Err(invalid("duplicate parameter name"));
                }
                segments.push(Segment::Named(name.to_owned()));
            } else {
                segments.push(Segment::Literal((*seg).to_owned()));
            }
        }

        Ok(Self { source: Arc::from(source), segments, wildcard })
    }

    pub(crate) fn source(&self) -> &Arc<str> {
        &self.source
    }

    pub(crate) fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Number of segments before the wildcard; longer prefixes are more specific.
    pub(crate) fn prefix_len(&self) -> usize {
        self.segments.len()
    }

    /// Whether both patterns match exactly the same paths, parameter names aside.
    pub(crate) fn same_shape(&self, other: &Pattern) -> bool {
        self.wildcard == other.wildcard
            && self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|pair| match pair {
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Named(_), Segment::Named(_)) => true,
                _ => false,
            })
    }

    /// Orders wildcard patterns most specific first: longer prefixes, then a
    /// literal before a parameter at the first segment where they differ.
    pub(crate) fn specificity(&self, other: &Pattern) -> Ordering {
        other.prefix_len().cmp(&self.prefix_len()).then_with(|| {
            self.segments
                .iter()
                .zip(&other.segments)
                .map(|pair| match pair {
                    (Segment::Literal(_), Segment::Named(_)) => Ordering::Less,
                    (Segment::Named(_), Segment::Literal(_)) => Ordering::Greater,
                    _ => Ordering::Equal,
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }

    /// The route in `matchit` syntax. Only meaningful for non-wildcard patterns.
    pub(crate) fn to_tree_path(&self) -> String {
        let mut out = String::with_capacity(self.source.len() + 8);
        for seg in &self.segments {
            out.push('/');
            match seg {
                Segment::Literal(lit) => out.push_str(&lit.replace('{', "{{").replace('}', "}}")),
                Segment::Named(name) => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }

    /// Matches a wildcard pattern against a raw request path, returning the
    /// raw (still percent-encoded) parameters, remainder included.
    pub(crate) fn match_wildcard(&self, path: &str) -> Option<Vec<(String, String)>> {
        debug_assert!(self.wildcard);
        let rest = path.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let mut params = Vec::new();

        for seg in &self.segments {
            let part = parts.next()?;
            match seg {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Named(_) if part.is_empty() => return None,
                Segment::Named(name) => params.push((name.clone(), part.to_owned())),
            }
        }

        let remainder = parts.collect::<Vec<_>>().join("/");
        params.push((WILDCARD.to_owned(), remainder));
        Some(params)
    }

    /// Builds a concrete path, filling parameters (and the wildcard) in order.
    pub(crate) fn reverse(&self, values: &[&str]) -> Option<String> {
        let mut values = values.iter();
        let mut out = String::new();

        for seg in &self.segments {
            out.push('/');
            match seg {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Named(_) => out.push_str(values.next()?),
            }
        }
        if self.wildcard {
            out.push('/');
            out.push_str(values.next().copied().unwrap_or(""));
        }
        if out.is_empty() {
            out.push('/');
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_named_segments_for_the_tree() {
        let p = Pattern::parse("/bind/users/:name/:email").unwrap();
        assert_eq!(p.to_tree_path(), "/bind/users/{name}/{email}");
        assert!(!p.is_wildcard());

        assert_eq!(Pattern::parse("/").unwrap().to_tree_path(), "/");
        assert_eq!(Pattern::parse("/a{b}").unwrap().to_tree_path(), "/a{{b}}");
    }

    #[test]
    fn rejects_malformed_patterns() {
        for bad in ["users", "/a/*/b", "/:", "/:a/:a", "/:na me"] {
            assert!(
                matches!(Pattern::parse(bad), Err(Error::InvalidRoute { .. })),
                "{bad} should be rejected",
            );
        }
    }

    #[test]
    fn wildcard_matches_empty_and_multi_segment_remainders() {
        let p = Pattern::parse("/users/*").unwrap();
        assert_eq!(p.prefix_len(), 1);

        let rest = |path| p.match_wildcard(path).map(|ps| ps.last().unwrap().1.clone());
        assert_eq!(rest("/users").as_deref(), Some(""));
        assert_eq!(rest("/users/").as_deref(), Some(""));
        assert_eq!(rest("/users/a").as_deref(), Some("a"));
        assert_eq!(rest("/users/a/b/c").as_deref(), Some("a/b/c"));
        assert_eq!(rest("/usersx"), None);
        assert_eq!(rest("/"), None);
    }

    #[test]
    fn wildcard_prefix_binds_named_segments() {
        let p = Pattern::parse("/files/:owner/*").unwrap();
        let params = p.match_wildcard("/files/jon/a/b.txt").unwrap();
        assert_eq!(params, vec![
            ("owner".to_owned(), "jon".to_owned()),
            ("*".to_owned(), "a/b.txt".to_owned()),
        ]);
        assert!(p.match_wildcard("/files//a").is_none());
    }

    #[test]
    fn root_wildcard_matches_everything() {
        let p = Pattern::parse("/*").unwrap();
        assert!(p.match_wildcard("/").is_some());
        assert!(p.match_wildcard("/css/site.css").is_some());
    }

    #[test]
    fn shape_ignores_parameter_names() {
        let parse = |s| Pattern::parse(s).unwrap();
        assert!(parse("/a/:x/*").same_shape(&parse("/a/:y/*")));
        assert!(!parse("/a/:x/*").same_shape(&parse("/a/b/*")));
        assert!(!parse("/a/:x/*").same_shape(&parse("/a/:x")));
        assert!(!parse("/a/*").same_shape(&parse("/a/:x/*")));
    }

    #[test]
    fn literals_are_more_specific_than_parameters() {
        let parse = |s| Pattern::parse(s).unwrap();
        let public = parse("/files/public/*");
        let owner = parse("/files/:owner/*");

        assert_eq!(public.specificity(&owner), Ordering::Less);
        assert_eq!(owner.specificity(&public), Ordering::Greater);
        assert_eq!(parse("/files/*").specificity(&owner), Ordering::Greater);
        assert_eq!(owner.specificity(&parse("/files/:id/*")), Ordering::Equal);
    }

    #[test]
    fn reverse_fills_parameters_in_order() {
        let p = Pattern::parse("/bind/users/:name/:email").unwrap();
        assert_eq!(p.reverse(&["jon", "jon@x.com"]).as_deref(), Some("/bind/users/jon/jon@x.com"));
        assert_eq!(p.reverse(&["jon"]), None);

        assert_eq!(Pattern::parse("/something").unwrap().reverse(&[]).as_deref(), Some("/something"));
        assert_eq!(Pattern::parse("/users/*").unwrap().reverse(&["a/b"]).as_deref(), Some("/users/a/b"));
    }
}

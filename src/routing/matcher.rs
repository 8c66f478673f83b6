//! Request matching logic.
//!
//! # Responsibilities
//! - Match request paths against Ant-style patterns (`**`, `*`, `?`)
//! - Detect WebSocket upgrade requests
//! - Combine conditions with AND / OR semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Empty segments are ignored, so `/ws` and `/ws/` are the same path
//! - Patterns compiled once at startup with `globset`; `*` and `?` never
//!   cross a `/`

use axum::body::Body;
use axum::http::{header, Request};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// A compiled Ant-style path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    set: GlobSet,
}

impl PathPattern {
    /// Compile a pattern such as `/frontend/**` or `/*.hot-update.*`.
    pub fn new(pattern: &str) -> Result<Self, globset::Error> {
        let normalized = normalize(pattern);
        let mut builder = GlobSetBuilder::new();
        builder.add(compile(&normalized)?);
        // `/a/**` also covers `/a` itself.
        if let Some(prefix) = normalized.strip_suffix("/**") {
            builder.add(compile(if prefix.is_empty() { "/" } else { prefix })?);
        }

        Ok(Self {
            source: pattern.to_string(),
            set: builder.build()?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check a request path (without query string).
    pub fn matches_path(&self, path: &str) -> bool {
        self.set.is_match(normalize(path))
    }
}

fn compile(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Collapse empty segments: `//a/b/` becomes `/a/b`, the empty path becomes `/`.
fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

impl Matcher for PathPattern {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matches_path(req.uri().path())
    }
}

/// Matches requests asking for a WebSocket upgrade.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpgradeMatcher;

impl Matcher for UpgradeMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.headers()
            .get(header::UPGRADE)
            .and_then(|h| h.to_str().ok())
            .map(|h| h.eq_ignore_ascii_case("websocket"))
            .unwrap_or(false)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}

/// Combines multiple matchers with OR semantics. Empty never matches.
#[derive(Debug)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// One `PathPattern` per entry.
    pub fn paths<S: AsRef<str>>(patterns: &[S]) -> Result<Self, globset::Error> {
        let matchers = patterns
            .iter()
            .map(|p| PathPattern::new(p.as_ref()).map(|m| Box::new(m) as Box<dyn Matcher>))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(matchers))
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matchers.iter().any(|m| m.matches(req))
    }
}

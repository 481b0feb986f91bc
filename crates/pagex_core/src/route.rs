//! Route registration and matching
//!
//! Routes are registered declaratively as `{path, case_sensitive, target}` and
//! matched against the current location. Patterns support:
//!
//! - static segments (`/about`)
//! - dynamic segments (`/users/:id`)
//! - a trailing splat (`/docs/*`) that swallows the rest of the path
//!
//! The most specific pattern wins (static beats dynamic beats splat); ties go
//! to the route registered first. Query strings and fragments are ignored.
//!
//! The identity used by the transition machine is the matched *pattern*,
//! so `/users/1` and `/users/2` resolve to the same route.
//!
//! # Example
//!
//! ```rust
//! use pagex_core::route::RouteTable;
//!
//! let mut table = RouteTable::new();
//! table.define("/about", "about-page").unwrap();
//! table.define("/users/:id", "user-page").unwrap();
//!
//! let matched = table.match_path("/users/42?tab=posts").unwrap();
//! assert_eq!(matched.route, "/users/:id");
//! assert_eq!(matched.param("id"), Some("42"));
//! ```

use smallvec::SmallVec;

use crate::error::{Result, TransitionError};

const STATIC_SEGMENT_SCORE: i32 = 10;
const DYNAMIC_SEGMENT_SCORE: i32 = 3;
const SPLAT_PENALTY: i32 = -2;

/// A single parsed segment of a route pattern
#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Splat,
}

/// A parsed route pattern
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: SmallVec<[Segment; 4]>,
    case_sensitive: bool,
}

impl RoutePattern {
    /// Parse a route pattern
    ///
    /// Fails on an empty parameter name (`/:`) or a splat that is not the
    /// final segment.
    pub fn parse(path: &str, case_sensitive: bool) -> Result<Self> {
        let raw: Vec<&str> = split_segments(path).collect();
        let mut segments = SmallVec::new();

        for (index, segment) in raw.iter().enumerate() {
            if *segment == "*" {
                if index + 1 != raw.len() {
                    return Err(TransitionError::InvalidRoutePattern(path.to_string()));
                }
                segments.push(Segment::Splat);
            } else if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(TransitionError::InvalidRoutePattern(path.to_string()));
                }
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Static(segment.to_string()));
            }
        }

        Ok(Self {
            source: path.to_string(),
            segments,
            case_sensitive,
        })
    }

    /// The pattern as it was registered
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Specificity score used to rank competing matches
    pub fn score(&self) -> i32 {
        let mut score = self.segments.len() as i32;
        for segment in &self.segments {
            score += match segment {
                Segment::Static(_) => STATIC_SEGMENT_SCORE,
                Segment::Param(_) => DYNAMIC_SEGMENT_SCORE,
                Segment::Splat => SPLAT_PENALTY,
            };
        }
        score
    }

    /// Match a location path against this pattern
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = split_segments(strip_search(path)).collect();
        let mut params = Vec::new();
        let mut index = 0;

        for segment in &self.segments {
            match segment {
                Segment::Splat => {
                    params.push(("*".to_string(), parts[index.min(parts.len())..].join("/")));
                    return Some(params);
                }
                Segment::Param(name) => {
                    let part = parts.get(index)?;
                    params.push((name.clone(), (*part).to_string()));
                }
                Segment::Static(expected) => {
                    let part = parts.get(index)?;
                    let equal = if self.case_sensitive {
                        part == expected
                    } else {
                        part.eq_ignore_ascii_case(expected)
                    };
                    if !equal {
                        return None;
                    }
                }
            }
            index += 1;
        }

        (index == parts.len()).then_some(params)
    }
}

fn strip_search(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// A route registration
#[derive(Clone, Debug)]
pub struct RouteDefinition<C> {
    pub path: String,
    pub case_sensitive: bool,
    /// The render target (component, factory, ...) for this route
    pub target: C,
    /// Overrides the host's default entrance duration for this page
    pub enter_duration_ms: Option<f32>,
    /// Overrides the host's default exit duration for this page
    pub exit_duration_ms: Option<f32>,
}

impl<C> RouteDefinition<C> {
    pub fn new(path: impl Into<String>, target: C) -> Self {
        Self {
            path: path.into(),
            case_sensitive: false,
            target,
            enter_duration_ms: None,
            exit_duration_ms: None,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn enter_duration(mut self, duration_ms: f32) -> Self {
        self.enter_duration_ms = Some(duration_ms);
        self
    }

    pub fn exit_duration(mut self, duration_ms: f32) -> Self {
        self.exit_duration_ms = Some(duration_ms);
        self
    }
}

/// The result of matching a location against the route table
#[derive(Clone, Debug)]
pub struct MatchedRoute<C> {
    /// Route identity (the registered pattern)
    pub route: String,
    pub target: C,
    pub params: Vec<(String, String)>,
    pub enter_duration_ms: Option<f32>,
    pub exit_duration_ms: Option<f32>,
}

impl<C> MatchedRoute<C> {
    /// Look up a captured parameter by name (`*` for the splat)
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Resolves a location path to a registered route
///
/// The host only depends on this trait, so an external matcher can stand in
/// for [`RouteTable`].
pub trait RouteMatcher<C> {
    fn match_path(&self, path: &str) -> Option<MatchedRoute<C>>;
}

/// Ordered collection of route registrations
#[derive(Clone, Debug)]
pub struct RouteTable<C> {
    routes: Vec<(RoutePattern, RouteDefinition<C>)>,
}

impl<C> Default for RouteTable<C> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<C: Clone> RouteTable<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route
    pub fn route(&mut self, definition: RouteDefinition<C>) -> Result<&mut Self> {
        let pattern = RoutePattern::parse(&definition.path, definition.case_sensitive)?;
        tracing::trace!("registered route {}", pattern.as_str());
        self.routes.push((pattern, definition));
        Ok(self)
    }

    /// Register a case-insensitive route with default durations
    pub fn define(&mut self, path: impl Into<String>, target: C) -> Result<&mut Self> {
        self.route(RouteDefinition::new(path, target))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the most specific route for `path`
    pub fn match_path(&self, path: &str) -> Option<MatchedRoute<C>> {
        let mut best: Option<(i32, usize, Vec<(String, String)>)> = None;

        for (index, (pattern, _)) in self.routes.iter().enumerate() {
            if let Some(params) = pattern.matches(path) {
                let score = pattern.score();
                // Strictly greater: earlier registrations win ties
                if best.as_ref().map_or(true, |(best_score, _, _)| score > *best_score) {
                    best = Some((score, index, params));
                }
            }
        }

        best.map(|(_, index, params)| {
            let (pattern, definition) = &self.routes[index];
            MatchedRoute {
                route: pattern.as_str().to_string(),
                target: definition.target.clone(),
                params,
                enter_duration_ms: definition.enter_duration_ms,
                exit_duration_ms: definition.exit_duration_ms,
            }
        })
    }
}

impl<C: Clone> RouteMatcher<C> for RouteTable<C> {
    fn match_path(&self, path: &str) -> Option<MatchedRoute<C>> {
        RouteTable::match_path(self, path)
    }
}

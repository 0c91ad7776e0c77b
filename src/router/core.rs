//! Router core module - structural route matching.

use http::Method;
use smallvec::SmallVec;
use std::fmt;
use tracing::debug;

/// Maximum number of path parameters before heap allocation.
/// The deepest Wax route captures two (`sessionId`, `itemId`).
pub const MAX_INLINE_PARAMS: usize = 4;

/// Stack-allocated path parameter storage.
///
/// Names are the `'static` capture names from the route table; values are the
/// percent-decoded request segments.
pub type ParamVec = SmallVec<[(&'static str, String); MAX_INLINE_PARAMS]>;

/// Resources exposed by the Wax service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaxRoute {
    /// `/quit`
    Quit,
    /// `/newsession`
    NewSession,
    /// `/removesession`
    RemoveSession,
    /// `/sessions/{sessionId}/items`
    SessionItems,
    /// `/sessions/{sessionId}/items/{itemId}`
    Item,
}

impl fmt::Display for WaxRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaxRoute::Quit => "quit",
            WaxRoute::NewSession => "new_session",
            WaxRoute::RemoveSession => "remove_session",
            WaxRoute::SessionItems => "session_items",
            WaxRoute::Item => "item",
        };
        f.write_str(name)
    }
}

/// Method names a route accepts. `None` accepts every method.
type MethodSet = Option<&'static [&'static str]>;

const POST_ONLY: &[&str] = &["POST"];
const COLLECTION_METHODS: &[&str] = &["GET", "POST"];
const ITEM_METHODS: &[&str] = &["GET", "DELETE", "PATCH", "PUT"];

/// The Wax route table: path pattern, resource, accepted methods.
const ROUTE_TABLE: &[(&str, WaxRoute, MethodSet)] = &[
    ("/quit", WaxRoute::Quit, None),
    ("/newsession", WaxRoute::NewSession, Some(POST_ONLY)),
    ("/removesession", WaxRoute::RemoveSession, Some(POST_ONLY)),
    (
        "/sessions/{sessionId}/items",
        WaxRoute::SessionItems,
        Some(COLLECTION_METHODS),
    ),
    (
        "/sessions/{sessionId}/items/{itemId}",
        WaxRoute::Item,
        Some(ITEM_METHODS),
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Capture(&'static str),
}

#[derive(Debug, Clone)]
struct RouteEntry {
    pattern: &'static str,
    segments: Vec<Segment>,
    route: WaxRoute,
    methods: MethodSet,
}

impl RouteEntry {
    fn compile(pattern: &'static str, route: WaxRoute, methods: MethodSet) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                if segment.starts_with('{') && segment.ends_with('}') {
                    Segment::Capture(segment.trim_start_matches('{').trim_end_matches('}'))
                } else {
                    Segment::Literal(segment)
                }
            })
            .collect();
        Self {
            pattern,
            segments,
            route,
            methods,
        }
    }

    fn matches(&self, request_segments: &[&str]) -> Option<ParamVec> {
        if request_segments.len() != self.segments.len() {
            return None;
        }
        let mut params = ParamVec::new();
        for (expected, actual) in self.segments.iter().zip(request_segments) {
            match expected {
                Segment::Literal(lit) if lit == actual => {}
                Segment::Literal(_) => return None,
                Segment::Capture(_) if actual.is_empty() => return None,
                Segment::Capture(name) => params.push((*name, decode_segment(actual))),
            }
        }
        Some(params)
    }
}

fn decode_segment(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Result of matching a request path against the route table.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched resource
    pub route: WaxRoute,
    /// The route pattern (e.g. `/sessions/{sessionId}/items`)
    pub pattern: &'static str,
    /// Captured path parameters
    pub path_params: ParamVec,
    methods: MethodSet,
}

impl RouteMatch {
    /// Get a path parameter by name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the matched route accepts `method`.
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods
            .map_or(true, |allowed| allowed.contains(&method.as_str()))
    }
}

/// Router over the fixed Wax route table.
///
/// Paths are split on `/` and compared segment by segment: literal segments
/// must match exactly, `{name}` segments capture any non-empty run of
/// non-slash characters. The query string is ignored. Method filtering is
/// left to the caller through [`RouteMatch::allows`] so that a known path with
/// an unsupported method can be told apart from an unknown path.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<RouteEntry>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        let routes = ROUTE_TABLE
            .iter()
            .map(|(pattern, route, methods)| RouteEntry::compile(*pattern, *route, *methods))
            .collect();
        Self { routes }
    }

    /// Match a request target (path plus optional query) to a route.
    #[must_use]
    pub fn route(&self, target: &str) -> Option<RouteMatch> {
        let path = target.split('?').next().unwrap_or(target);
        let request_segments: SmallVec<[&str; 8]> =
            path.strip_prefix('/')?.split('/').collect();

        let matched = self.routes.iter().find_map(|entry| {
            entry.matches(&request_segments).map(|params| RouteMatch {
                route: entry.route,
                pattern: entry.pattern,
                path_params: params,
                methods: entry.methods,
            })
        });

        match &matched {
            Some(m) => debug!(
                path = %path,
                route = %m.route,
                path_params = ?m.path_params,
                "Route matched"
            ),
            None => debug!(path = %path, "No route matched"),
        }
        matched
    }

    /// All registered patterns, in table order.
    #[must_use]
    pub fn patterns(&self) -> Vec<&'static str> {
        self.routes.iter().map(|r| r.pattern).collect()
    }
}

use std::fmt::{Display, Formatter};

use orderdesk_core::{AppError, AppResult};

use crate::{BlockMode, GateDecision, SubscriptionLifecycle};

/// Route shown when the subscription denies workspace access.
pub const SUBSCRIPTION_FALLBACK_ROUTE: &str = "/subscription-expired";

/// Panel prefixes that require an active or trial subscription.
const SUBSCRIPTION_GATED_ROUTES: &[&str] = &[
    "/dashboard/*",
    "/orders/*",
    "/production/*",
    "/reports/*",
    "/calendar/*",
    "/delivery/*",
    "/settings/*",
    "/reminders/*",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum RouteSegment {
    Literal(String),
    Placeholder(String),
    Rest,
}

/// Route pattern with positional `:name` placeholders.
///
/// Matching is segment-wise over `/`-delimited segments. A single trailing
/// slash and any `?query` or `#fragment` suffix are ignored on both sides.
/// Empty interior segments are literal and never satisfy a placeholder.
/// A final `*` segment turns the pattern into a prefix: `/reports/*` matches
/// `/reports` and every path below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<RouteSegment>,
}

impl RoutePattern {
    /// Parses an absolute route pattern such as `/orders/:id/edit`.
    pub fn parse(pattern: &str) -> AppResult<Self> {
        let normalized = normalize_path(pattern);
        if !normalized.starts_with('/') {
            return Err(AppError::Validation(format!(
                "route pattern '{pattern}' must start with '/'"
            )));
        }

        let raw_segments = normalized.split('/').collect::<Vec<_>>();
        let last_index = raw_segments.len().saturating_sub(1);
        let segments = raw_segments
            .into_iter()
            .enumerate()
            .map(|(index, segment)| match (segment, segment.strip_prefix(':')) {
                ("*", _) if index == last_index && index > 0 => Ok(RouteSegment::Rest),
                ("*", _) => Err(AppError::Validation(format!(
                    "route pattern '{pattern}' may only end with '*'"
                ))),
                (_, Some("")) => Err(AppError::Validation(format!(
                    "route pattern '{pattern}' has an unnamed placeholder"
                ))),
                (_, Some(name)) => Ok(RouteSegment::Placeholder(name.to_owned())),
                (_, None) => Ok(RouteSegment::Literal(segment.to_owned())),
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            raw: normalized.to_owned(),
            segments,
        })
    }

    /// Parses every pattern in `patterns`.
    pub fn parse_all<'a>(patterns: impl IntoIterator<Item = &'a str>) -> AppResult<Vec<Self>> {
        patterns.into_iter().map(Self::parse).collect()
    }

    /// Returns the normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Returns `(segment index, placeholder name)` pairs. Index 0 is the
    /// empty segment before the leading slash.
    pub fn placeholders(&self) -> impl Iterator<Item = (usize, &str)> {
        self.segments
            .iter()
            .enumerate()
            .filter_map(|(index, segment)| match segment {
                RouteSegment::Placeholder(name) => Some((index, name.as_str())),
                RouteSegment::Literal(_) | RouteSegment::Rest => None,
            })
    }

    /// Returns whether `path` matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if path == self.raw {
            return true;
        }

        let path_segments = path.split('/').collect::<Vec<_>>();
        let (segments, open_ended) = match self.segments.split_last() {
            Some((RouteSegment::Rest, prefix)) => (prefix, true),
            _ => (self.segments.as_slice(), false),
        };
        let length_matches = if open_ended {
            path_segments.len() >= segments.len()
        } else {
            path_segments.len() == segments.len()
        };
        if !length_matches {
            return false;
        }

        segments
            .iter()
            .zip(path_segments)
            .all(|(pattern_segment, path_segment)| match pattern_segment {
                RouteSegment::Literal(literal) => literal == path_segment,
                RouteSegment::Placeholder(_) => !path_segment.is_empty(),
                RouteSegment::Rest => true,
            })
    }

    /// Returns whether any of `patterns` matches `path`.
    #[must_use]
    pub fn any_matches(patterns: &[Self], path: &str) -> bool {
        patterns.iter().any(|pattern| pattern.matches(path))
    }
}

impl Display for RoutePattern {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.raw.as_str())
    }
}

fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

/// Which routes a gate instance covers.
///
/// The allow list and block list are mutually exclusive per gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteScope {
    /// Every route is gated.
    AllRoutes,
    /// Only routes outside this list are gated.
    AllowList(Vec<RoutePattern>),
    /// Only routes in this list are gated.
    BlockList(Vec<RoutePattern>),
}

/// Configuration of one subscription route gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGateConfig {
    /// Covered routes.
    pub scope: RouteScope,
    /// Route that always renders, shown when access is denied.
    pub fallback_route: String,
    /// Where blocked navigation goes. Without it the block mode applies.
    pub redirect_to: Option<String>,
    /// Presentation when blocking without a redirect.
    pub block_mode: BlockMode,
    /// Only paid subscriptions pass; trials are denied.
    pub strict: bool,
}

impl RouteGateConfig {
    /// Creates a gate over `scope` that hides blocked content.
    #[must_use]
    pub fn new(scope: RouteScope, fallback_route: impl Into<String>) -> Self {
        Self {
            scope,
            fallback_route: fallback_route.into(),
            redirect_to: None,
            block_mode: BlockMode::Hide,
            strict: false,
        }
    }

    /// Redirects blocked navigation to `target`.
    #[must_use]
    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }

    /// Sets the presentation used when no redirect is configured.
    #[must_use]
    pub fn with_block_mode(mut self, block_mode: BlockMode) -> Self {
        self.block_mode = block_mode;
        self
    }

    /// Admits only active subscriptions.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Gate protecting the workspace panels, redirecting to the expired page.
    pub fn subscription_default() -> AppResult<Self> {
        let patterns = RoutePattern::parse_all(SUBSCRIPTION_GATED_ROUTES.iter().copied())?;
        Ok(
            Self::new(RouteScope::BlockList(patterns), SUBSCRIPTION_FALLBACK_ROUTE)
                .with_redirect(SUBSCRIPTION_FALLBACK_ROUTE),
        )
    }
}

/// Per-navigation inputs of the route gate.
#[derive(Debug, Clone, Copy)]
pub struct RouteGateInput<'a> {
    /// Current path.
    pub path: &'a str,
    /// Whether a session exists.
    pub authenticated: bool,
    /// Subscription lifecycle resolved for now.
    pub lifecycle: &'a SubscriptionLifecycle,
}

/// Subscription gate over route identity.
pub struct RouteGate;

impl RouteGate {
    /// Returns whether navigation to `input.path` must be blocked.
    #[must_use]
    pub fn should_block(config: &RouteGateConfig, input: RouteGateInput<'_>) -> bool {
        if !input.authenticated {
            return false;
        }

        if normalize_path(input.path) == normalize_path(config.fallback_route.as_str()) {
            return false;
        }

        let subscription_denies = input.lifecycle.is_blocked
            || !input.lifecycle.allowed_by_status(config.strict);
        if !subscription_denies {
            return false;
        }

        match &config.scope {
            RouteScope::AllowList(allowed) => !RoutePattern::any_matches(allowed, input.path),
            RouteScope::BlockList(blocked) => RoutePattern::any_matches(blocked, input.path),
            RouteScope::AllRoutes => true,
        }
    }

    /// Decides how navigation to `input.path` renders.
    #[must_use]
    pub fn evaluate(config: &RouteGateConfig, input: RouteGateInput<'_>) -> GateDecision {
        if !Self::should_block(config, input) {
            return GateDecision::Render;
        }

        match &config.redirect_to {
            Some(target) => GateDecision::Redirect(target.clone()),
            None => config.block_mode.denied(),
        }
    }
}

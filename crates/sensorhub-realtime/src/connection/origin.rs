//! Origin acceptance policy for the upgrade handshake.

use std::fmt;
use std::sync::Arc;

use url::Url;

/// Config value selecting [`OriginPolicy::Any`].
pub const ANY_ORIGIN: &str = "*";
/// Config value selecting [`OriginPolicy::WellFormed`].
pub const WELL_FORMED_ORIGIN: &str = "well-formed";

type OriginPredicate = dyn Fn(Option<&str>) -> bool + Send + Sync;

/// Decides, once per handshake, whether a request's `Origin` is accepted.
///
/// `None` means the request carried no `Origin` header, which is what
/// non-browser clients (devices, scripts) send.
#[derive(Clone)]
pub enum OriginPolicy {
    /// Accept every request.
    Any,
    /// Accept a missing origin or any parseable `http`/`https` origin with a
    /// host; reject the literal `null`.
    WellFormed,
    /// Accept only exact matches (ASCII case-insensitive, trailing slash
    /// ignored). A missing origin is rejected.
    List(Vec<String>),
    /// Caller-supplied predicate.
    Custom(Arc<OriginPredicate>),
}

impl OriginPolicy {
    /// Build a policy from `realtime.allowed_origins`.
    pub fn from_config(origins: &[String]) -> Self {
        match origins {
            [only] if only == ANY_ORIGIN => Self::Any,
            [only] if only == WELL_FORMED_ORIGIN => Self::WellFormed,
            _ => Self::List(
                origins
                    .iter()
                    .map(|o| o.trim_end_matches('/').to_string())
                    .collect(),
            ),
        }
    }

    /// Wrap a custom predicate.
    pub fn custom(predicate: impl Fn(Option<&str>) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    /// Evaluate the policy for one handshake.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::WellFormed => origin.is_none_or(is_well_formed),
            Self::List(allowed) => origin.is_some_and(|origin| {
                let origin = origin.trim_end_matches('/');
                allowed.iter().any(|a| a.eq_ignore_ascii_case(origin))
            }),
            Self::Custom(predicate) => predicate(origin),
        }
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::Any
    }
}

impl fmt::Debug for OriginPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::WellFormed => f.write_str("WellFormed"),
            Self::List(allowed) => f.debug_tuple("List").field(allowed).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn is_well_formed(origin: &str) -> bool {
    if origin == "null" {
        return false;
    }
    Url::parse(origin)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

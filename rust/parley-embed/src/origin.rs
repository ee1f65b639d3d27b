//! Origin policy for inbound cross-document messages.
//!
//! A message is trusted when its origin is the widget host's own origin, or
//! when it appears in the caller's `allowedOrigins` list (customer domains
//! that proxy the widget). Everything else is dropped with a warning.

use tracing::warn;
use url::Url;

/// The outcome of checking a message origin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The message may be acted on
    Trusted,
    /// The message must be dropped
    Untrusted,
}

/// Decides which origins the loader accepts messages from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginPolicy {
    trusted: String,
    allowed: Vec<String>,
}

impl OriginPolicy {
    /// A policy trusting `trusted` plus every origin in `allowed`
    pub fn new<I, S>(trusted: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = allowed
            .into_iter()
            .filter_map(|origin| {
                let origin = normalize(origin.as_ref());
                // Sandboxed and file frames all report "null"
                (origin != "null" && !origin.is_empty()).then_some(origin)
            })
            .collect();

        Self {
            trusted: normalize(&trusted.into()),
            allowed,
        }
    }

    /// The origin outbound messages are addressed to
    pub fn trusted_origin(&self) -> &str {
        &self.trusted
    }

    /// The extra origins accepted besides [`Self::trusted_origin`]
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed
    }

    /// Classify `origin` without side effects
    pub fn check(&self, origin: &str) -> Verdict {
        if origin == self.trusted || self.allowed.iter().any(|allowed| allowed == origin) {
            Verdict::Trusted
        } else {
            Verdict::Untrusted
        }
    }

    /// Like [`Self::check`], but logs a warning for rejected origins
    pub fn admit(&self, origin: &str) -> bool {
        match self.check(origin) {
            Verdict::Trusted => true,
            Verdict::Untrusted => {
                warn!(
                    origin,
                    trusted = %self.trusted,
                    "Dropping widget message from untrusted origin"
                );
                false
            }
        }
    }
}

/// Reduce a configured origin to the form browsers report in
/// `MessageEvent.origin` (scheme, host and non-default port, no path)
fn normalize(raw: &str) -> String {
    let raw = raw.trim();

    match Url::parse(raw) {
        Ok(url) if url.has_host() => url.origin().ascii_serialization(),
        _ => raw.trim_end_matches('/').to_string(),
    }
}

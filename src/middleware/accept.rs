//! `Accept` header negotiation.

use std::sync::Arc;

use tracing::debug;

use crate::handler::Chain;
use crate::middleware::Middleware;
use crate::render::{self, NOT_ACCEPTABLE};
use crate::request::Request;
use crate::status::Status;

/// Answers `406 Not Acceptable` unless the request's `Accept` header lists
/// the configured media type.
///
/// Media-type parameters (`;q=0.5`) are ignored; wildcards are not
/// expanded, so `*/*` does not satisfy `Accept::new("application/json")`.
#[derive(Clone, Debug)]
pub struct Accept {
    media_type: Arc<str>,
}

impl Accept {
    pub fn new(media_type: &str) -> Self {
        Self { media_type: Arc::from(media_type) }
    }

    /// `application/vnd.api+json`, the type of every error envelope.
    pub fn json_api() -> Self {
        Self::new("application/vnd.api+json")
    }

    fn accepts(&self, header: Option<&str>) -> bool {
        header.is_some_and(|value| {
            value
                .split(',')
                .filter_map(|entry| entry.split(';').next())
                .any(|media| media.trim().eq_ignore_ascii_case(&self.media_type))
        })
    }
}

impl Middleware for Accept {
    fn wrap(&self, next: Chain) -> Chain {
        let this = self.clone();
        Chain::new(move |req: Request| {
            let next = next.clone();
            let accepted = this.accepts(req.header("accept"));
            if !accepted {
                debug!(
                    request_id = %req.context().id(),
                    wanted = %this.media_type,
                    got = req.header("accept").unwrap_or(""),
                    "rejecting request: unacceptable Accept header"
                );
            }
            async move {
                if accepted {
                    next.call(req).await
                } else {
                    render::emit_error(&NOT_ACCEPTABLE, Status::NotAcceptable)
                }
            }
        })
    }
}

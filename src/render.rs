//! Structured error envelopes and HTML templates.
//!
//! Two calls, used by handlers, middleware and the router alike:
//!
//! - [`emit_error`] writes `{"errors":[{"type","status","title","detail"}]}`
//!   as `application/vnd.api+json` with the given status.
//! - [`Templates::render`] (or [`render`] for the default `templates/`
//!   directory) renders a Tera template with serialisable data as HTML. Any
//!   failure is logged and answered with [`INTERNAL_SERVER_ERROR`].
//!
//! ```rust,no_run
//! use serde::Serialize;
//! use strata::{Request, Response, render};
//!
//! #[derive(Serialize)]
//! struct Page { title: String }
//!
//! async fn index(_req: Request) -> Response {
//!     render::render("index.html", &Page { title: "home".into() }).await
//! }
//! ```

use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::error;

use crate::response::{ContentType, Response};
use crate::status::Status;

// ── Error envelopes ───────────────────────────────────────────────────────────

/// The fixed part of a structured error: machine-readable type, title, detail.
///
/// The status code is supplied separately to [`emit_error`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ErrorKind {
    pub kind: &'static str,
    pub title: &'static str,
    pub detail: &'static str,
}

pub const INTERNAL_SERVER_ERROR: ErrorKind = ErrorKind {
    kind: "internal_server_error",
    title: "Internal Server Error",
    detail: "The server failed to complete the request.",
};

pub const NOT_ACCEPTABLE: ErrorKind = ErrorKind {
    kind: "not_acceptable_error",
    title: "Not Acceptable",
    detail: "The request could not be accepted in its current form.",
};

pub const NOT_FOUND: ErrorKind = ErrorKind {
    kind: "not_found_error",
    title: "Not Found",
    detail: "No resource is registered for this method and path.",
};

pub const BAD_REQUEST: ErrorKind = ErrorKind {
    kind: "bad_request_error",
    title: "Bad Request",
    detail: "The request could not be read.",
};

#[derive(Serialize)]
struct ErrorObject<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    status: u16,
    title: &'a str,
    detail: &'a str,
}

#[derive(Serialize)]
struct Errors<'a> {
    errors: [ErrorObject<'a>; 1],
}

/// Builds a structured error response for `kind` with `status`.
pub fn emit_error(kind: &ErrorKind, status: Status) -> Response {
    let envelope = Errors {
        errors: [ErrorObject {
            kind: kind.kind,
            status: status.as_u16(),
            title: kind.title,
            detail: kind.detail,
        }],
    };
    match serde_json::to_vec(&envelope) {
        Ok(body) => Response::builder()
            .status(status)
            .bytes(ContentType::JsonApi, body),
        Err(e) => {
            error!(kind = kind.kind, "failed to encode error envelope: {e}");
            Response::status(status)
        }
    }
}

// ── Templates ─────────────────────────────────────────────────────────────────

/// Directory [`render`] resolves template names against.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

/// Why a template could not be rendered. Only ever logged; clients see a 500.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template name `{0}` does not resolve inside the template directory")]
    InvalidName(String),

    #[error("reading template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tera(#[from] tera::Error),
}

/// A template directory. Templates are read from disk on every render.
#[derive(Clone, Debug)]
pub struct Templates {
    dir: PathBuf,
}

impl Templates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Renders `name` with `data` into an HTML response.
    ///
    /// `data` must serialise to a map (a struct or a map type); its fields
    /// become template variables.
    pub async fn render<T>(&self, name: &str, data: &T) -> Response
    where
        T: Serialize + ?Sized,
    {
        match self.try_render(name, data).await {
            Ok(html) => Response::html(html),
            Err(e) => {
                error!(template = name, dir = %self.dir.display(), "template rendering failed: {e}");
                emit_error(&INTERNAL_SERVER_ERROR, Status::InternalServerError)
            }
        }
    }

    pub async fn try_render<T>(&self, name: &str, data: &T) -> Result<String, RenderError>
    where
        T: Serialize + ?Sized,
    {
        let path = self.resolve(name)?;
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| RenderError::Read { path, source })?;
        let context = tera::Context::from_serialize(data)?;
        Ok(tera::Tera::one_off(&source, &context, true)?)
    }

    /// Joins `name` onto the directory; only plain relative names are allowed.
    fn resolve(&self, name: &str) -> Result<PathBuf, RenderError> {
        let rel = Path::new(name);
        let plain = !name.is_empty()
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(RenderError::InvalidName(name.to_owned()));
        }
        Ok(self.dir.join(rel))
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE_DIR)
    }
}

/// Renders `name` from [`DEFAULT_TEMPLATE_DIR`].
pub async fn render<T>(name: &str, data: &T) -> Response
where
    T: Serialize + ?Sized,
{
    Templates::default().render(name, data).await
}

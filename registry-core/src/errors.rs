//! Errors!
//!
//! The core distinguishes the error kinds named in the specification
//! (§7); everything else (an `io::Error`, a `reqwest::Error`, a YAML parse
//! failure) is folded into those kinds rather than propagated as its own
//! type, so callers can match on a small, stable surface.

use thiserror::Error;

/// The result type used throughout this crate.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Errors the bundle registry engine can surface.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum RegistryError {
    /// A source or bundle id collided with an existing one.
    #[error("'{id}' already exists")]
    DuplicateId {
        /// The id that collided.
        id: String,
    },

    /// A source, bundle, profile or installed-bundle record was not found.
    #[error("{kind} '{id}' was not found")]
    NotFound {
        /// What kind of entity was being looked up (`source`, `bundle`, `profile`).
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// A repository URL could not be parsed as `owner/repo`.
    #[error("'{url}' is not a recognised repository URL")]
    #[diagnostic(help(
        "expected https://host/owner/repo(.git) or git@host:owner/repo(.git)"
    ))]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
    },

    /// A repository-scope operation was attempted without an open workspace.
    #[error("this operation requires an open workspace")]
    NoWorkspace,

    /// Connection failure, DNS failure, an HTTP 5xx, or too many redirects.
    #[error("network error: {message}")]
    Network {
        /// Human-readable summary.
        message: String,
    },

    /// Authentication was exhausted: every method in the fallback chain was
    /// tried and the destination still answered 401/403.
    #[error("authentication failed (status {status}); tried: {}", attempted_methods.join(", "))]
    #[diagnostic(help("{suggestion}"))]
    Authentication {
        /// HTTP status code that triggered the failure (401 or 403).
        status: u16,
        /// Every auth method attempted, in order.
        attempted_methods: Vec<String>,
        /// Status-specific suggestion (token validity / scope / existence).
        suggestion: String,
    },

    /// JSON was expected but an HTML document was returned.
    #[error("expected JSON, received an HTML response: {snippet}")]
    #[diagnostic(help("the server likely returned a login page or error page instead of API data"))]
    HtmlResponse {
        /// Best-effort human text extracted from the HTML body.
        snippet: String,
    },

    /// Syntactically invalid JSON or YAML.
    #[error("failed to parse {format}: {message}")]
    ParseFailure {
        /// `json` or `yaml`.
        format: &'static str,
        /// Underlying parser message.
        message: String,
    },

    /// A manifest or lockfile violated its schema, or referenced an unknown source.
    #[error("validation failed: {message}")]
    Validation {
        /// Human-readable summary.
        message: String,
    },

    /// A downloaded archive or an installed file's checksum did not match.
    #[error("integrity check failed for '{path}': expected {expected}, got {actual}")]
    IntegrityFailure {
        /// Path (archive name or installed file path) that failed.
        path: String,
        /// Expected checksum.
        expected: String,
        /// Actual computed checksum.
        actual: String,
    },

    /// A scope move targeted a scope where the bundle is already installed.
    #[error("'{bundle_id}' is already installed in the target scope")]
    Conflict {
        /// The bundle id that conflicted.
        bundle_id: String,
    },

    /// The operation was cancelled via the ambient cancellation signal or deadline.
    #[error("operation cancelled")]
    Cancelled,

    /// Wraps an I/O error with the path it occurred on, still reported under
    /// one of the kinds above by callers that know the context; used as a
    /// fallback when no richer categorisation applies.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Build an [`RegistryError::Authentication`] with the status-specific
    /// suggestion keyed per §4.1.
    pub fn authentication(status: u16, attempted_methods: Vec<String>) -> Self {
        let suggestion = match status {
            401 => "check that the configured token is still valid",
            403 => "check that the token has the required scopes/permissions",
            404 => "check that the repository exists and is reachable",
            _ => "re-authenticate and try again",
        }
        .to_string();
        RegistryError::Authentication {
            status,
            attempted_methods,
            suggestion,
        }
    }
}

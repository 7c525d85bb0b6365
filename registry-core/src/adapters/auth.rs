//! The release-hosted adapter's authentication fallback chain (§4.1).
//!
//! Resolution order, cached per adapter instance:
//!
//! 1. explicit token from source config (trimmed; whitespace-only is absent)
//! 2. host-editor credential session (silent)
//! 3. external CLI token command
//! 4. none
//!
//! A 401/403 response invalidates the cached token, records the attempted
//! method, and the caller surfaces an [`RegistryError::Authentication`]
//! listing every method tried so far.

use std::collections::BTreeSet;
use std::process::Command;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::capabilities::AuthSessionProvider;

/// Truncate a token to 8 characters with an ellipsis, for safe logging.
pub fn redact_token(token: &str) -> String {
    if token.len() <= 8 {
        format!("{token}...")
    } else {
        format!("{}...", &token[..8])
    }
}

/// Per-adapter authentication state: a lazily-resolved, invalidatable token
/// plus the set of methods attempted since the last successful resolution.
pub struct AuthChain {
    explicit_token: Option<String>,
    session_provider: Option<Arc<dyn AuthSessionProvider>>,
    cli_token_env_var: String,
    resolved: Mutex<Option<(String, String)>>, // (token, method name)
    attempted: Mutex<BTreeSet<String>>,
}

impl AuthChain {
    /// Build a chain for one source. `cli_token_env_var` is the
    /// environment variable consulted for fallback #3 (e.g.
    /// `GITHUB_TOKEN_COMMAND`).
    pub fn new(
        explicit_token: Option<String>,
        session_provider: Option<Arc<dyn AuthSessionProvider>>,
        cli_token_env_var: impl Into<String>,
    ) -> Self {
        let explicit_token = explicit_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            explicit_token,
            session_provider,
            cli_token_env_var: cli_token_env_var.into(),
            resolved: Mutex::new(None),
            attempted: Mutex::new(BTreeSet::new()),
        }
    }

    /// Resolve a token for `host`, trying each method in order until one
    /// succeeds, short-circuiting once a token was already cached.
    pub async fn resolve(&self, host: &str) -> Option<String> {
        {
            let cached = self.resolved.lock().await;
            if let Some((token, _method)) = cached.as_ref() {
                return Some(token.clone());
            }
        }

        if let Some(token) = self.explicit_token.clone() {
            self.remember("explicit-config", &token).await;
            return Some(token);
        }
        self.mark_attempted("explicit-config").await;

        if let Some(provider) = &self.session_provider {
            if let Some(token) = provider.silent_token(host).await {
                self.remember("host-session", &token).await;
                return Some(token);
            }
        }
        self.mark_attempted("host-session").await;

        if let Some(token) = self.cli_token() {
            self.remember("external-cli", &token).await;
            return Some(token);
        }
        self.mark_attempted("external-cli").await;

        None
    }

    fn cli_token(&self) -> Option<String> {
        let command = std::env::var(&self.cli_token_env_var).ok()?;
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        let output = Command::new(program).args(parts).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let token = String::from_utf8(output.stdout).ok()?;
        let token = token.trim().to_string();
        (!token.is_empty()).then_some(token)
    }

    async fn remember(&self, method: &str, token: &str) {
        debug!(method, token = %redact_token(token), "resolved auth token");
        let mut resolved = self.resolved.lock().await;
        *resolved = Some((token.to_string(), method.to_string()));
    }

    async fn mark_attempted(&self, method: &str) {
        self.attempted.lock().await.insert(method.to_string());
    }

    /// Clear the cached token after a 401/403, recording the method that
    /// just failed so the next error message lists it.
    pub async fn invalidate(&self) {
        let method = {
            let resolved = self.resolved.lock().await;
            resolved.as_ref().map(|(_, m)| m.clone())
        };
        if let Some(method) = method {
            self.mark_attempted(&method).await;
        }
        let mut resolved = self.resolved.lock().await;
        *resolved = None;
    }

    /// Every method attempted since the chain was created or last resolved
    /// successfully, in the order they were recorded.
    pub async fn attempted_methods(&self) -> Vec<String> {
        self.attempted.lock().await.iter().cloned().collect()
    }
}

/// A provider's trusted-domain predicate: `Authorization` headers are only
/// attached when the destination host matches one of these patterns.
/// Patterns starting with `*.` match any subdomain.
pub fn is_trusted_host(host: &str, trusted: &[&str]) -> bool {
    trusted.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix("*.") {
            host.ends_with(suffix) && host.len() > suffix.len()
        } else {
            host == *pattern
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_long_tokens() {
        assert_eq!(redact_token("ghp_abcdefghijklmnop"), "ghp_abcd...");
    }

    #[test]
    fn redacts_short_tokens_without_panicking() {
        assert_eq!(redact_token("short"), "short...");
    }

    #[test]
    fn trusted_host_matches_exact_and_wildcard() {
        let trusted = ["github.com", "api.github.com", "*.githubusercontent.com"];
        assert!(is_trusted_host("github.com", &trusted));
        assert!(is_trusted_host("api.github.com", &trusted));
        assert!(is_trusted_host("objects.githubusercontent.com", &trusted));
        assert!(!is_trusted_host("githubusercontent.com.evil.example", &trusted));
        assert!(!is_trusted_host("cdn.example.com", &trusted));
    }

    #[tokio::test]
    async fn explicit_token_is_trimmed_and_whitespace_only_is_absent() {
        let chain = AuthChain::new(Some("   ".to_string()), None, "NO_SUCH_ENV_VAR_XYZ");
        assert_eq!(chain.resolve("github.com").await, None);

        let chain = AuthChain::new(Some("  abc123  ".to_string()), None, "NO_SUCH_ENV_VAR_XYZ");
        assert_eq!(chain.resolve("github.com").await, Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn invalidate_clears_cache_and_records_method() {
        let chain = AuthChain::new(Some("abc123".to_string()), None, "NO_SUCH_ENV_VAR_XYZ");
        assert_eq!(chain.resolve("github.com").await, Some("abc123".to_string()));
        chain.invalidate().await;
        assert!(chain
            .attempted_methods()
            .await
            .contains(&"explicit-config".to_string()));
    }
}

//! Release-hosted adapter: GitHub/GitLab releases-as-bundles.

use std::sync::Arc;

use async_trait::async_trait;
use bundle_registry_schema::wire::github::{GithubAsset, GithubRelease};
use bundle_registry_schema::{Bundle, DeploymentManifest};
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use reqwest::{Response, StatusCode};
use tracing::warn;

use crate::{
    adapters::{auth::AuthChain, html_snippet, SourceAdapter, MAX_REDIRECTS},
    capabilities::AuthSessionProvider,
    errors::{RegistryError, RegistryResult},
};

/// Which release-hosting provider this adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `api.github.com`-shaped releases API.
    GitHub,
    /// GitLab releases API.
    GitLab,
}

impl Provider {
    fn trusted_hosts(self) -> &'static [&'static str] {
        match self {
            Provider::GitHub => super::GITHUB_TRUSTED_HOSTS,
            Provider::GitLab => super::GITLAB_TRUSTED_HOSTS,
        }
    }

    fn default_api_base(self) -> &'static str {
        match self {
            Provider::GitHub => "https://api.github.com",
            Provider::GitLab => "https://gitlab.com/api/v4",
        }
    }
}

/// Parse `https://host/owner/repo[.git]` or `git@host:owner/repo[.git]`,
/// tolerating a `.git` suffix and either separator. Anything else is
/// rejected with [`RegistryError::InvalidUrl`].
pub fn parse_owner_repo(url: &str) -> RegistryResult<(String, String)> {
    let https_re = Regex::new(r"^https?://[^/]+/([^/]+)/([^/]+?)(\.git)?/?$")
        .expect("static regex is valid");
    let ssh_re = Regex::new(r"^git@[^:]+:([^/]+)/([^/]+?)(\.git)?$").expect("static regex is valid");

    if let Some(caps) = https_re.captures(url) {
        return Ok((caps[1].to_string(), caps[2].to_string()));
    }
    if let Some(caps) = ssh_re.captures(url) {
        return Ok((caps[1].to_string(), caps[2].to_string()));
    }
    Err(RegistryError::InvalidUrl {
        url: url.to_string(),
    })
}

/// Release-hosted [`SourceAdapter`].
pub struct ReleaseHostedAdapter {
    source_id: String,
    owner: String,
    repo: String,
    provider: Provider,
    api_base: String,
    client: reqwest::Client,
    auth: AuthChain,
}

impl ReleaseHostedAdapter {
    /// Construct an adapter for `source_id`, parsing `repo_url` eagerly so
    /// malformed URLs fail at construction rather than at first sync.
    pub fn new(
        source_id: impl Into<String>,
        repo_url: &str,
        provider: Provider,
        explicit_token: Option<String>,
        session_provider: Option<Arc<dyn AuthSessionProvider>>,
        api_base_override: Option<String>,
    ) -> RegistryResult<Self> {
        let (owner, repo) = parse_owner_repo(repo_url)?;
        let client = crate::net::build_client(&crate::net::ClientSettings::default())?;
        let cli_env_var = match provider {
            Provider::GitHub => "GITHUB_TOKEN_COMMAND",
            Provider::GitLab => "GITLAB_TOKEN_COMMAND",
        };
        Ok(Self {
            source_id: source_id.into(),
            owner,
            repo,
            provider,
            api_base: api_base_override.unwrap_or_else(|| provider.default_api_base().to_string()),
            client,
            auth: AuthChain::new(explicit_token, session_provider, cli_env_var),
        })
    }

    fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_base, self.owner, self.repo
        )
    }

    async fn authed_request(&self, url: &str) -> RegistryResult<reqwest::RequestBuilder> {
        let host = url::Url::parse(url)
            .map_err(|_| RegistryError::InvalidUrl {
                url: url.to_string(),
            })?
            .host_str()
            .unwrap_or_default()
            .to_string();
        let mut builder = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if super::auth::is_trusted_host(&host, self.provider.trusted_hosts()) {
            if let Some(token) = self.auth.resolve(&host).await {
                builder = builder.header(AUTHORIZATION, format!("token {token}"));
            }
        }
        Ok(builder)
    }

    /// Issue a GET, following redirects manually so the `Authorization`
    /// header can be dropped/restored per hop based on the trusted-host
    /// predicate rather than carried blindly across domains.
    async fn get_following_redirects(&self, start_url: &str) -> RegistryResult<Response> {
        let mut url = start_url.to_string();
        for hop in 0..=MAX_REDIRECTS {
            if hop == MAX_REDIRECTS {
                return Err(RegistryError::Network {
                    message: format!("exceeded {MAX_REDIRECTS} redirects starting from {start_url}"),
                });
            }
            let request = self.authed_request(&url).await?;
            let response = request.send().await.map_err(|e| RegistryError::Network {
                message: e.to_string(),
            })?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                self.auth.invalidate().await;
                return Err(RegistryError::authentication(
                    status.as_u16(),
                    self.auth.attempted_methods().await,
                ));
            }
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| RegistryError::Network {
                        message: "redirect response had no Location header".to_string(),
                    })?
                    .to_string();
                url = location;
                continue;
            }
            if status.is_server_error() {
                return Err(RegistryError::Network {
                    message: format!("server error {status}"),
                });
            }
            return Ok(response);
        }
        unreachable!("loop always returns or errors before exhausting MAX_REDIRECTS + 1 iterations")
    }

    async fn parse_json_response<T: serde::de::DeserializeOwned>(
        response: Response,
    ) -> RegistryResult<T> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type.contains("text/html") {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::HtmlResponse {
                snippet: super::html_snippet(&body),
            });
        }
        let body = response.text().await.map_err(|e| RegistryError::Network {
            message: e.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|e| RegistryError::ParseFailure {
            format: "json",
            message: e.to_string(),
        })
    }

    fn next_page_url(link_header: &str) -> Option<String> {
        link_header.split(',').find_map(|entry| {
            if !entry.contains("rel=\"next\"") {
                return None;
            }
            let url_part = entry.split(';').next()?.trim();
            url_part
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
                .map(str::to_string)
        })
    }

    async fn fetch_all_releases(&self) -> RegistryResult<Vec<GithubRelease>> {
        let mut url = self.releases_url();
        let mut out = Vec::new();
        loop {
            let response = self.get_following_redirects(&url).await?;
            let link_header = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let page: Vec<GithubRelease> = Self::parse_json_response(response).await?;
            out.extend(page);
            match link_header.as_deref().and_then(Self::next_page_url) {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(out)
    }

    fn derive_bundle(&self, release: &GithubRelease, manifest: &GithubAsset, archive: &GithubAsset) -> Bundle {
        let tag = release.tag_name.clone();
        let version = tag.strip_prefix('v').unwrap_or(&tag).to_string();
        let id = format!("{}-{}-{}", self.owner, self.repo, tag);
        let name = if release.name.trim().is_empty() {
            format!("{} {}", self.repo, tag)
        } else {
            release.name.trim().to_string()
        };
        let (environments, tags) = parse_release_note_hints(release.body.as_deref().unwrap_or(""));
        Bundle {
            id,
            name,
            version,
            description: release.body.clone(),
            author: Some(self.owner.clone()),
            source_id: self.source_id.clone(),
            environments,
            tags,
            last_updated: release.published_at.clone(),
            size: Some(archive.size),
            license: None,
            manifest_url: manifest.browser_download_url.clone(),
            download_url: archive.browser_download_url.clone(),
            repository: Some(format!("{}/{}", self.owner, self.repo)),
        }
    }
}

/// Parse `environments:` and `tags:` hints out of free-form release notes.
/// Case-insensitive; values are comma/whitespace separated.
fn parse_release_note_hints(body: &str) -> (Vec<String>, Vec<String>) {
    let mut environments = Vec::new();
    let mut tags = Vec::new();
    for line in body.lines() {
        let lower = line.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("environments:") {
            environments = split_hint_values(&line[line.len() - rest.len()..]);
        } else if let Some(rest) = lower.strip_prefix("tags:") {
            tags = split_hint_values(&line[line.len() - rest.len()..]);
        }
    }
    (environments, tags)
}

fn split_hint_values(rest: &str) -> Vec<String> {
    rest.split([',', ' ', '\t'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl SourceAdapter for ReleaseHostedAdapter {
    async fn validate(&self) -> RegistryResult<()> {
        let bundles = self.fetch_bundles().await?;
        if bundles.is_empty() {
            warn!(source_id = %self.source_id, "source validated but currently advertises zero bundles");
        }
        Ok(())
    }

    async fn fetch_bundles(&self) -> RegistryResult<Vec<Bundle>> {
        let releases = self.fetch_all_releases().await?;
        let mut bundles = Vec::new();
        for release in &releases {
            let (Some(manifest), Some(archive)) =
                (release.manifest_asset(), release.archive_asset())
            else {
                warn!(tag = %release.tag_name, "release missing manifest or archive asset, skipping");
                continue;
            };
            bundles.push(self.derive_bundle(release, manifest, archive));
        }
        Ok(bundles)
    }

    async fn fetch_metadata(&self, bundle: &Bundle) -> RegistryResult<DeploymentManifest> {
        let response = self.get_following_redirects(&bundle.manifest_url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await.map_err(|e| RegistryError::Network {
            message: e.to_string(),
        })?;
        if content_type.contains("text/html") {
            return Err(RegistryError::HtmlResponse {
                snippet: html_snippet(&body),
            });
        }
        serde_yml::from_str(&body).map_err(|e| RegistryError::ParseFailure {
            format: "yaml",
            message: e.to_string(),
        })
    }

    async fn download_bundle(&self, bundle: &Bundle) -> RegistryResult<Vec<u8>> {
        let response = self.get_following_redirects(&bundle.download_url).await?;
        let bytes = response.bytes().await.map_err(|e| RegistryError::Network {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_https_url() {
        assert_eq!(
            parse_owner_repo("https://github.com/test-owner/test-repo").unwrap(),
            ("test-owner".to_string(), "test-repo".to_string())
        );
    }

    #[test]
    fn parses_https_url_with_git_suffix() {
        assert_eq!(
            parse_owner_repo("https://github.com/test-owner/test-repo.git").unwrap(),
            ("test-owner".to_string(), "test-repo".to_string())
        );
    }

    #[test]
    fn parses_ssh_url() {
        assert_eq!(
            parse_owner_repo("git@github.com:test-owner/test-repo.git").unwrap(),
            ("test-owner".to_string(), "test-repo".to_string())
        );
    }

    #[test]
    fn rejects_garbage_url() {
        assert!(parse_owner_repo("not a url at all").is_err());
        assert!(parse_owner_repo("https://github.com/just-owner").is_err());
    }

    #[test]
    fn parses_release_note_hints_case_insensitively() {
        let body = "Some notes\nEnvironments: production, staging\nTags: security beta\n";
        let (envs, tags) = parse_release_note_hints(body);
        assert_eq!(envs, vec!["production", "staging"]);
        assert_eq!(tags, vec!["security", "beta"]);
    }

    #[test]
    fn next_page_url_parses_link_header() {
        let header = r#"<https://api.github.com/repositories/1/releases?page=2>; rel="next", <https://api.github.com/repositories/1/releases?page=5>; rel="last""#;
        assert_eq!(
            ReleaseHostedAdapter::next_page_url(header),
            Some("https://api.github.com/repositories/1/releases?page=2".to_string())
        );
    }

    #[test]
    fn next_page_url_none_when_missing() {
        let header = r#"<https://api.github.com/repositories/1/releases?page=1>; rel="prev""#;
        assert_eq!(ReleaseHostedAdapter::next_page_url(header), None);
    }
}

//! Minimal GitHub API surface: the pull-request diff used for differential
//! filtering and release-tag resolution for the installer.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::infrastructure::error::ActionError;
use crate::infrastructure::network::{NetworkConfig, NetworkManager};

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Source of pull-request diffs. The production implementation talks to the
/// GitHub API; tests substitute stubs.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<String, ActionError>;
}

#[derive(Deserialize)]
struct ReleaseResponse {
    tag_name: String,
}

pub struct GithubClient {
    network: NetworkManager,
    base: Url,
    token: String,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, ActionError> {
        // join() 需要以 / 结尾的 base，否则最后一段会被替换掉
        let mut base = api_url.trim_end_matches('/').to_string();
        base.push('/');
        let base = Url::parse(&base)
            .map_err(|e| ActionError::network(format!("invalid API url: {}", e), None))?;

        Ok(Self {
            network: NetworkManager::new(NetworkConfig::default())?,
            base,
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ActionError> {
        self.base
            .join(path)
            .map_err(|e| ActionError::network(format!("invalid API path: {}", e), None))
    }

    fn auth_header(&self) -> Option<String> {
        if self.token.is_empty() {
            None
        } else {
            Some(format!("token {}", self.token))
        }
    }

    /// Resolve the tag name of the latest published release.
    pub async fn latest_release(&self, owner: &str, repo: &str) -> Result<String, ActionError> {
        let url = self.endpoint(&format!("repos/{}/{}/releases/latest", owner, repo))?;

        let mut headers = vec![("accept", JSON_MEDIA_TYPE.to_string())];
        if let Some(auth) = self.auth_header() {
            headers.push(("authorization", auth));
        }
        let header_refs: Vec<(&str, &str)> =
            headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response = self.network.get_with_retry(url.as_str(), &header_refs).await?;
        let release: ReleaseResponse = response.json().await.map_err(|e| {
            ActionError::network(
                format!("cannot decode release response: {}", e),
                Some(url.to_string()),
            )
        })?;
        Ok(release.tag_name)
    }
}

#[async_trait]
impl DiffSource for GithubClient {
    async fn pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<String, ActionError> {
        let url = self.endpoint(&format!("repos/{}/{}/pulls/{}", owner, repo, number))?;

        let mut headers = vec![("accept", DIFF_MEDIA_TYPE.to_string())];
        if let Some(auth) = self.auth_header() {
            headers.push(("authorization", auth));
        }
        let header_refs: Vec<(&str, &str)> =
            headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response = self.network.get_with_retry(url.as_str(), &header_refs).await?;
        response.text().await.map_err(|e| {
            ActionError::network(
                format!("cannot read diff body: {}", e),
                Some(url.to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_api_prefix() {
        // GitHub Enterprise 的 API base 带有路径前缀
        let client = GithubClient::new("https://ghe.example.com/api/v3", "").unwrap();
        let url = client.endpoint("repos/a/b/pulls/7").unwrap();
        assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/repos/a/b/pulls/7");
    }

    #[test]
    fn test_auth_header_only_with_token() {
        let anonymous = GithubClient::new("https://api.github.com", "").unwrap();
        assert!(anonymous.auth_header().is_none());

        let authed = GithubClient::new("https://api.github.com", "ghs_x").unwrap();
        assert_eq!(authed.auth_header().as_deref(), Some("token ghs_x"));
    }
}

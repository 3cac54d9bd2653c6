use crate::infrastructure::error::ActionError;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// 网络客户端配置
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: usize,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            user_agent: format!("lint-action/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl NetworkConfig {
    /// 下载大文件时使用的宽松超时配置
    pub fn for_downloads() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            max_retries: 1,
            ..Self::default()
        }
    }
}

/// 网络客户端管理器
pub struct NetworkManager {
    client: Client,
    config: NetworkConfig,
}

impl NetworkManager {
    pub fn new(config: NetworkConfig) -> Result<Self, ActionError> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ActionError::network(format!("Failed to create HTTP client: {}", e), None)
            })?;

        Ok(Self { client, config })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// 带重试的 GET 请求，任何非 2xx 状态都视为失败
    pub async fn get_with_retry(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<reqwest::Response, ActionError> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_retries {
            let mut request = self.client.get(url);
            for (key, value) in headers {
                request = request.header(*key, *value);
            }

            match request.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }
                    last_error = Some(ActionError::network(
                        format!("HTTP error: {}", response.status()),
                        Some(url.to_string()),
                    ));
                }
                Err(e) => {
                    last_error = Some(ActionError::network(
                        format!("Request failed: {}", e),
                        Some(url.to_string()),
                    ));
                }
            }

            if attempt < self.config.max_retries {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ActionError::network("All retry attempts failed".to_string(), Some(url.to_string()))
        }))
    }
}

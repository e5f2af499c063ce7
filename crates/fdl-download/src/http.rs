//! Shared HTTP client construction.

use fdl_core::{DownloadError, DownloadManagerConfig};

/// Build the client used for both probes and transfers.
///
/// Timeouts apply per connect and per read; a long transfer is never cut off
/// by a whole-request deadline.
pub fn build_client(config: &DownloadManagerConfig) -> Result<reqwest::Client, DownloadError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .build()
        .map_err(|e| DownloadError::network(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_sends_configured_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("User-Agent", "fdl-test/1.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = DownloadManagerConfig::default().with_user_agent("fdl-test/1.0");
        let client = build_client(&config).unwrap();
        let status = client.get(server.uri()).send().await.unwrap().status();
        assert_eq!(status, 200);
    }
}

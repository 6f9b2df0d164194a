//! Default [`Transport`] backed by `reqwest`.

use async_trait::async_trait;
use bcb_core::{BcbError, Headers, Result, Transport};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout of the default client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("bcb-rs/", env!("CARGO_PKG_VERSION"));

/// HTTP transport using a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with a 60 second timeout.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| BcbError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Creates a transport with a custom HTTP client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str, headers: Headers<'_>) -> Result<String> {
        debug!(url, "GET");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BcbError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BcbError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| BcbError::Network(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcb_core::ODATA_HEADERS;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_get_text_sends_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/odata/Moedas")
                .header("OData-Version", "4.0")
                .header("OData-MaxVersion", "4.0");
            then.status(200).body(r#"{"value":[]}"#);
        });

        let transport = HttpTransport::new().unwrap();
        let body = transport
            .get_text(&server.url("/odata/Moedas"), ODATA_HEADERS)
            .await
            .unwrap();

        assert_eq!(body, r#"{"value":[]}"#);
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_success_is_http_error() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/odata/Missing");
            then.status(404).body("not here");
        });

        let transport = HttpTransport::new().unwrap();
        let err = transport
            .get_text(&server.url("/odata/Missing"), &[])
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let transport = HttpTransport::new().unwrap();
        let err = transport
            .get_text("http://127.0.0.1:1/unreachable", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, BcbError::Network(_)));
    }
}

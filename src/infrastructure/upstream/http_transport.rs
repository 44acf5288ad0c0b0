use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::domain::upstream::{
    Method, TransportError, UpstreamRequest, UpstreamResponse, UpstreamTransport,
};
use crate::domain::DomainError;

pub const DEFAULT_USER_AGENT: &str = concat!("organizze-gateway/", env!("CARGO_PKG_VERSION"));

/// Upstream transport using reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(request.timeout)
            .header(AUTHORIZATION, &request.authorization)
            .header(CONTENT_TYPE, "application/json");

        if !request.params.is_empty() {
            let query: Vec<(&str, &str)> = request.params.iter().collect();
            builder = builder.query(&query);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;

        Ok(UpstreamResponse { status, body })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Interrupted(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::upstream::QueryParams;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(path: &str, params: QueryParams, timeout: Duration) -> UpstreamRequest {
        UpstreamRequest {
            method: Method::Get,
            path: path.to_string(),
            params,
            authorization: "Basic test-token".to_string(),
            timeout,
        }
    }

    #[tokio::test]
    async fn test_send_passes_auth_and_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/transactions"))
            .and(header("authorization", "Basic test-token"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), DEFAULT_USER_AGENT).unwrap();
        let params = QueryParams::new().with("page", 2).with("per_page", 10);

        let response = transport
            .send(request("/transactions", params, Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"[1,2,3]");
    }

    #[tokio::test]
    async fn test_send_returns_error_statuses() {
        let server = MockServer::start().await;

        Mock::given(path("/accounts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), DEFAULT_USER_AGENT).unwrap();
        let response = transport
            .send(request("/accounts", QueryParams::new(), Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_send_classifies_timeout() {
        let server = MockServer::start().await;

        Mock::given(path("/accounts"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), DEFAULT_USER_AGENT).unwrap();
        let result = transport
            .send(request("/accounts", QueryParams::new(), Duration::from_millis(100)))
            .await;

        assert_eq!(result.unwrap_err(), TransportError::Timeout);
    }

    #[tokio::test]
    async fn test_send_classifies_connection_failure() {
        let transport = HttpTransport::new("http://127.0.0.1:1", DEFAULT_USER_AGENT).unwrap();
        let result = transport
            .send(request("/accounts", QueryParams::new(), Duration::from_secs(5)))
            .await;

        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = HttpTransport::new("https://api.organizze.com.br/rest/v2/", DEFAULT_USER_AGENT)
            .unwrap();
        assert_eq!(transport.base_url(), "https://api.organizze.com.br/rest/v2");
    }
}

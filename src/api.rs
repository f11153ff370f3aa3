use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use tracing::info;

use crate::error::ApiError;
use crate::ingest;
use crate::models::RecordSet;

/// Supplies the bearer token for each request. Passed into the client
/// rather than held in a process-wide slot.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(self.url(path));
        match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetches opportunity records. The endpoint may answer with a JSON array
    /// or with a CSV export; `Content-Type` decides which decoder runs.
    pub async fn fetch_opportunities(&self, path: &str) -> Result<RecordSet, ApiError> {
        let url = self.url(path);
        let response = self
            .get(path)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }

        let is_csv = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("csv"));

        let body = response.bytes().await.map_err(|source| ApiError::Request {
            url: url.clone(),
            source,
        })?;

        let decoded = if is_csv {
            ingest::read_csv(body.as_ref())
        } else {
            ingest::parse_json(&body)
        };
        let set = decoded.map_err(|source| ApiError::Decode {
            url: url.clone(),
            source,
        })?;

        info!(url = %url, rows = set.stats.rows, csv = is_csv, "Fetched opportunities");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recurrence;
    use reqwest::header::AUTHORIZATION;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answers one request with a canned response and hands back the raw
    /// request head.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{address}"), handle)
    }

    #[test]
    fn joins_base_and_path_with_one_slash() {
        let client = ApiClient::new("https://volunteer.example.org/", Arc::new(NoToken));
        assert_eq!(
            client.url("/admin/opportunities"),
            "https://volunteer.example.org/admin/opportunities"
        );
        assert_eq!(
            client.url("volunteer/events"),
            "https://volunteer.example.org/volunteer/events"
        );
    }

    #[test]
    fn attaches_bearer_token_from_provider() {
        let client = ApiClient::new(
            "https://volunteer.example.org",
            Arc::new(StaticToken("abc123".to_string())),
        );
        let request = client.get("/admin/opportunities").build().unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc123"
        );
    }

    #[test]
    fn omits_authorization_without_token() {
        let client = ApiClient::new("https://volunteer.example.org", Arc::new(NoToken));
        let request = client.get("/admin/opportunities").build().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn csv_content_type_uses_csv_decoder() {
        let (base_url, server) = serve_once(
            "200 OK",
            "text/csv; charset=utf-8",
            "title,category_desc,Borough,vol_requests,recurrence_type,created_date\n\
             Park Cleanup,Environment,Queens,7,ongoing,2024-02-01\n",
        )
        .await;
        let client = ApiClient::new(base_url, Arc::new(StaticToken("abc123".to_string())));

        let set = client
            .fetch_opportunities("/admin/opportunities")
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.records[0].borough.as_deref(), Some("Queens"));
        assert_eq!(set.records[0].vol_requests, 7);
        assert_eq!(set.records[0].recurrence, Recurrence::Ongoing);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /admin/opportunities HTTP/1.1"));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer abc123"));
    }

    #[tokio::test]
    async fn json_content_type_uses_json_decoder() {
        let (base_url, server) = serve_once(
            "200 OK",
            "application/json",
            r#"[{"title": "Tutor", "vol_requests": 3, "created_date": "2024-01-01"},
                {"title": "Mentor", "category_desc": "Education"}]"#,
        )
        .await;
        let client = ApiClient::new(base_url, Arc::new(NoToken));

        let set = client.fetch_opportunities("opportunities").await.unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].vol_requests, 3);
        assert_eq!(set.records[1].category.as_deref(), Some("Education"));

        let request = server.await.unwrap();
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let (base_url, server) =
            serve_once("500 Internal Server Error", "text/plain", "boom").await;
        let client = ApiClient::new(base_url, Arc::new(NoToken));

        let err = client
            .fetch_opportunities("/admin/opportunities")
            .await
            .unwrap_err();
        match err {
            ApiError::Status { url, status } => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                assert!(url.ends_with("/admin/opportunities"));
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let (base_url, server) = serve_once("200 OK", "application/json", "{\"rows\": 1}").await;
        let client = ApiClient::new(base_url, Arc::new(NoToken));

        let err = client
            .fetch_opportunities("/admin/opportunities")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
        server.await.unwrap();
    }
}

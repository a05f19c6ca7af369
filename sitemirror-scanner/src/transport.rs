use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Response body as handed over by the transport.
///
/// Textual content types arrive already decoded; everything else keeps its
/// raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Binary(Vec<u8>),
    Text(String),
}

impl Payload {
    pub fn is_binary(&self) -> bool {
        matches!(self, Payload::Binary(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Binary(bytes) => bytes,
            Payload::Text(text) => text.as_bytes(),
        }
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Payload::Binary(bytes) => String::from_utf8_lossy(bytes),
            Payload::Text(text) => Cow::Borrowed(text),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub payload: Payload,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

/// Performs one HTTP GET.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<RawResponse>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sitemirror/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<RawResponse> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let textual = headers
            .get("content-type")
            .is_some_and(|ct| is_textual_content_type(ct));

        let payload = if textual {
            Payload::Text(response.text().await?)
        } else {
            Payload::Binary(response.bytes().await?.to_vec())
        };

        Ok(RawResponse {
            status,
            headers,
            payload,
        })
    }
}

/// Content types whose bodies are decoded to text.
pub fn is_textual_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    if ct.starts_with("image/") {
        return false;
    }
    ct.starts_with("text/") || ct.contains("javascript") || ct.contains("json") || ct.contains("xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_textual_content_types() {
        assert!(is_textual_content_type("text/html; charset=utf-8"));
        assert!(is_textual_content_type("text/css"));
        assert!(is_textual_content_type("application/javascript"));
        assert!(is_textual_content_type("application/xhtml+xml"));
        assert!(!is_textual_content_type("image/png"));
        assert!(!is_textual_content_type("image/svg+xml"));
        assert!(!is_textual_content_type("application/octet-stream"));
    }

    #[test]
    fn test_payload_text_view_is_lossy() {
        let payload = Payload::Binary(vec![b'h', b'i', 0xFF]);
        assert_eq!(payload.as_text(), "hi\u{FFFD}");
        assert_eq!(payload.len(), 3);
        assert!(payload.is_binary());
    }

    #[tokio::test]
    async fn test_http_transport_payload_shapes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/style.css"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/css")
                    .set_body_bytes(b"body{}".to_vec()),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let base = Url::parse(&mock_server.uri()).unwrap();

        let css = transport.fetch(&base.join("/style.css").unwrap()).await.unwrap();
        assert_eq!(css.status, 200);
        assert_eq!(css.content_type(), Some("text/css"));
        assert_eq!(css.payload, Payload::Text("body{}".to_string()));

        let png = transport.fetch(&base.join("/logo.png").unwrap()).await.unwrap();
        assert_eq!(png.payload, Payload::Binary(vec![0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_http_transport_reports_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::new().unwrap();
        let url = Url::parse(&mock_server.uri()).unwrap().join("/gone").unwrap();
        let response = transport.fetch(&url).await.unwrap();
        assert_eq!(response.status, 404);
    }
}

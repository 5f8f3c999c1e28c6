//! Google Cloud Storage client over the JSON API.

use super::client::{ObjectMetadata, ObjectReader, ObjectStoreClient};
use crate::error::ObjectStoreError;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tokio_util::io::StreamReader;

/// Public Cloud Storage endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Environment variable pointing at a storage emulator (`host:port` or URL).
pub const EMULATOR_HOST_ENV: &str = "STORAGE_EMULATOR_HOST";

/// Environment variable holding an OAuth2 access token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Connection settings for [`GcsClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct GcsConfig {
    endpoint: String,
    access_token: Option<String>,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
        }
    }
}

impl GcsConfig {
    /// Reads [`EMULATOR_HOST_ENV`] and [`ACCESS_TOKEN_ENV`], falling back to
    /// the public endpoint without credentials.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var(EMULATOR_HOST_ENV)
            && !host.is_empty()
        {
            config = config.with_endpoint(normalize_endpoint(&host));
        }
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV)
            && !token.is_empty()
        {
            config = config.with_access_token(token);
        }
        config
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the bearer token sent with every request.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// The API endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns `true` if a bearer token is configured.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }
}

impl core::fmt::Debug for GcsConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GcsConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn normalize_endpoint(host: &str) -> String {
    if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

/// Object resource as returned by `GET /storage/v1/b/{bucket}/o/{object}`.
///
/// Generation numbers are int64 values encoded as JSON strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    generation: String,
    metageneration: String,
    #[serde(default)]
    content_type: Option<String>,
}

impl TryFrom<ObjectResource> for ObjectMetadata {
    type Error = ObjectStoreError;

    fn try_from(object: ObjectResource) -> Result<Self, Self::Error> {
        let parse = |field: &str, value: &str| {
            value.parse::<i64>().map_err(|err| {
                ObjectStoreError::InvalidResponse(format!("bad {field} '{value}': {err}"))
            })
        };
        Ok(Self {
            generation: parse("generation", &object.generation)?,
            metageneration: parse("metageneration", &object.metageneration)?,
            content_type: object.content_type,
        })
    }
}

/// HTTP client for the Cloud Storage JSON API.
#[derive(Debug, Clone)]
pub struct GcsClient {
    client: reqwest::Client,
    config: GcsConfig,
}

impl GcsClient {
    /// Creates a new client.
    #[must_use]
    pub fn new(config: GcsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn object_url(&self, bucket: &str, key: &str, media: bool) -> Result<Url, ObjectStoreError> {
        let mut url = Url::parse(&self.config.endpoint).map_err(|err| {
            ObjectStoreError::Init(format!("invalid endpoint '{}': {err}", self.config.endpoint))
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                ObjectStoreError::Init(format!(
                    "endpoint '{}' cannot carry a path",
                    self.config.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(["storage", "v1", "b", bucket, "o", key]);
        if media {
            url.query_pairs_mut().append_pair("alt", "media");
        }
        Ok(url)
    }

    async fn get(
        &self,
        bucket: &str,
        key: &str,
        media: bool,
    ) -> Result<reqwest::Response, ObjectStoreError> {
        let url = self.object_url(bucket, key, media)?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.config.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| ObjectStoreError::Auth(format!("invalid access token: {err}")))?;
            request = request.header(AUTHORIZATION, value);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ObjectStoreError::Http(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ObjectStoreError::Auth(message),
            _ => ObjectStoreError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl ObjectStoreClient for GcsClient {
    async fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, ObjectStoreError> {
        let object: ObjectResource = self
            .get(bucket, key, false)
            .await?
            .json()
            .await
            .map_err(|err| {
                if err.is_decode() {
                    ObjectStoreError::InvalidResponse(format!(
                        "failed to parse object metadata: {err}"
                    ))
                } else {
                    ObjectStoreError::Http(err.to_string())
                }
            })?;
        object.try_into()
    }

    async fn open_reader(&self, bucket: &str, key: &str) -> Result<ObjectReader, ObjectStoreError> {
        let response = self.get(bucket, key, true).await?;
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(ObjectReader::new(StreamReader::new(Box::pin(stream))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_encodes_key_as_one_segment() {
        let client = GcsClient::new(GcsConfig::default());
        let url = client.object_url("my-bucket", "dir/config.json", false).unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/my-bucket/o/dir%2Fconfig.json"
        );
    }

    #[test]
    fn media_url_requests_content() {
        let client = GcsClient::new(GcsConfig::default().with_endpoint("http://localhost:4443/"));
        let url = client.object_url("b", "k", true).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4443/storage/v1/b/b/o/k?alt=media");
    }

    #[test]
    fn invalid_endpoint_is_an_init_error() {
        let client = GcsClient::new(GcsConfig::default().with_endpoint("not a url"));
        assert!(matches!(
            client.object_url("b", "k", false),
            Err(ObjectStoreError::Init(_))
        ));
    }

    #[test]
    fn metadata_parses_string_generations() {
        let object: ObjectResource = serde_json::from_str(
            r#"{"name":"k","generation":"1700000000000001","metageneration":"3","contentType":"text/csv"}"#,
        )
        .unwrap();
        let metadata = ObjectMetadata::try_from(object).unwrap();
        assert_eq!(metadata.generation, 1_700_000_000_000_001);
        assert_eq!(metadata.metageneration, 3);
        assert_eq!(metadata.content_type.as_deref(), Some("text/csv"));
    }

    #[test]
    fn metadata_rejects_bad_generation() {
        let object = ObjectResource {
            generation: "abc".into(),
            metageneration: "1".into(),
            content_type: None,
        };
        assert!(matches!(
            ObjectMetadata::try_from(object),
            Err(ObjectStoreError::InvalidResponse(_))
        ));
    }

    #[test]
    fn emulator_host_gets_a_scheme() {
        assert_eq!(normalize_endpoint("localhost:4443"), "http://localhost:4443");
        assert_eq!(normalize_endpoint("https://gcs.local/"), "https://gcs.local");
    }

    #[test]
    fn debug_redacts_token() {
        let config = GcsConfig::default().with_access_token("secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    /// Serves one canned JSON response on a loopback port.
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        endpoint
    }

    #[tokio::test]
    async fn metadata_decodes_json_body() {
        let endpoint = serve_once(r#"{"generation":"42","metageneration":"2"}"#).await;
        let client = GcsClient::new(GcsConfig::default().with_endpoint(endpoint));

        let metadata = client.metadata("b", "k").await.unwrap();
        assert_eq!(metadata.generation, 42);
        assert_eq!(metadata.metageneration, 2);
        assert!(metadata.content_type.is_none());
    }

    #[tokio::test]
    async fn malformed_metadata_is_an_invalid_response() {
        let endpoint = serve_once("<html>gateway</html>").await;
        let client = GcsClient::new(GcsConfig::default().with_endpoint(endpoint));

        let err = client.metadata("b", "k").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::InvalidResponse(_)), "{err}");
    }
}

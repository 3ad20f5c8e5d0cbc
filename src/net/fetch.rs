//! Single-request HTTP downloads

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("asset-deploy/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Could not download {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL has no file name: {0}")]
    NoFileName(String),
}

/// Fetches a URL and returns the complete body.
///
/// Any response status of 400 or above is an error. There is no retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<u64>) -> Result<Self, FetchError> {
        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(timeout_secs) = timeout {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        debug!("Downloaded {} bytes from {url}", body.len());
        Ok(body.to_vec())
    }
}

/// Decoded last path segment of a URL, ignoring query and fragment.
pub fn file_name(url: &str) -> Result<String, FetchError> {
    let parsed = url::Url::parse(url).map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .filter(|name| !name.is_empty() && name != "." && name != ".." && !name.contains('/'))
        .ok_or_else(|| FetchError::NoFileName(url.to_string()))
}

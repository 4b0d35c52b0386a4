//! Title lookup for a single link.
//!
//! Two requests per link: a HEAD to vet the declared content type (so images,
//! video and archives are never downloaded), then a GET whose body is parsed as
//! HTML for the first `<title>`.

use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    redirect, StatusCode,
};
use scraper::{Html, Selector};
use url::Url;

use crate::{deadline::Deadline, errors::Error, Result};

pub const DEFAULT_USER_AGENT: &str =
    concat!("TitleBot/", env!("CARGO_PKG_VERSION"), " (IRC link title fetcher)");

/// Default cap on how much of a GET body is read looking for the title.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

const MAX_REDIRECTS: usize = 10;

/// Why a link produced no title.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TitleError {
    #[error("unsupported content type")]
    UnsupportedContentType,

    #[error("empty or no title")]
    NoTitle,

    #[error("non-OK status code: {0}")]
    BadStatus(u16),

    #[error("network failure: {0}")]
    Network(String),
}

impl TitleError {
    /// Expected outcomes for arbitrary user links; not worth an operator's attention.
    pub fn is_routine(&self) -> bool {
        matches!(self, Self::UnsupportedContentType | Self::NoTitle)
    }
}

pub type TitleResult = std::result::Result<String, TitleError>;

/// Resolves the page title of one URL within a deadline.
#[async_trait]
pub trait TitleSource: Send + Sync {
    async fn resolve(&self, url: &Url, deadline: Deadline) -> TitleResult;
}

/// HTTP implementation of [`TitleSource`].
#[derive(Clone, Debug)]
pub struct TitleResolver {
    http: reqwest::Client,
    max_body_bytes: usize,
}

impl TitleResolver {
    pub fn new(user_agent: &str, max_body_bytes: usize) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        headers.insert(header::ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| Error::Http(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            max_body_bytes,
        })
    }

    async fn negotiate(&self, url: &Url) -> TitleResult {
        let head = self.http.head(url.clone()).send().await.map_err(network)?;
        check_head(head.status(), head.headers().get(header::CONTENT_TYPE))?;
        drop(head);

        // The GET status is not checked: error pages with a title still count.
        let resp = self.http.get(url.clone()).send().await.map_err(network)?;
        let body = read_body(resp, self.max_body_bytes).await?;

        extract_title(&String::from_utf8_lossy(&body)).ok_or(TitleError::NoTitle)
    }
}

#[async_trait]
impl TitleSource for TitleResolver {
    async fn resolve(&self, url: &Url, deadline: Deadline) -> TitleResult {
        if deadline.is_expired() {
            return Err(TitleError::Network(format!(
                "deadline exceeded before requesting {url}"
            )));
        }
        match deadline.run(self.negotiate(url)).await {
            Ok(result) => result,
            Err(e) => Err(TitleError::Network(format!("{e} while fetching {url}"))),
        }
    }
}

fn network(e: reqwest::Error) -> TitleError {
    TitleError::Network(e.to_string())
}

/// HEAD phase verdict. Content type is checked before status.
fn check_head(
    status: StatusCode,
    content_type: Option<&HeaderValue>,
) -> std::result::Result<(), TitleError> {
    let content_type = content_type.and_then(|v| v.to_str().ok()).unwrap_or("");
    if !is_html(content_type) {
        return Err(TitleError::UnsupportedContentType);
    }
    // 405: servers that refuse HEAD but serve GET.
    if status != StatusCode::OK && status != StatusCode::METHOD_NOT_ALLOWED {
        return Err(TitleError::BadStatus(status.as_u16()));
    }
    Ok(())
}

/// `text/html`, optionally followed by parameters. Compared case-sensitively,
/// exactly as the server sent it.
pub fn is_html(content_type: &str) -> bool {
    content_type == "text/html" || content_type.starts_with("text/html;")
}

async fn read_body(
    mut resp: reqwest::Response,
    limit: usize,
) -> std::result::Result<Vec<u8>, TitleError> {
    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await.map_err(network)? {
        let room = limit.saturating_sub(body.len());
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= limit {
            break;
        }
    }
    Ok(body)
}

fn title_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("title").expect("valid selector"))
}

/// Text of the first `<title>` element, trimmed. `None` if absent or blank.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let text: String = document.select(title_selector()).next()?.text().collect();
    let title = text.trim();
    (!title.is_empty()).then(|| title.to_string())
}

//! Article fetcher.
//!
//! Downloads one essay page at a time and hands the markup to the body
//! extractor. Requests are strictly sequential; pacing between essays is the
//! pipeline's job, not the fetcher's.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use essaybridge_shared::{EssayBridgeError, Result};

use crate::extract::extract_body_text;

/// User-Agent string for article requests.
const USER_AGENT: &str = concat!("EssayBridge/", env!("CARGO_PKG_VERSION"));

/// Fetches essay pages and extracts their body text.
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    client: Client,
}

impl ArticleFetcher {
    /// Create a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| EssayBridgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch `url` and return its body text, or `None` if the page has none.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_article_text(&self, url: &Url) -> Result<Option<String>> {
        debug!("fetching article");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| EssayBridgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EssayBridgeError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EssayBridgeError::Network(format!("{url}: body read failed: {e}")))?;

        let text = extract_body_text(&body);
        debug!(
            chars = text.as_ref().map_or(0, |t| t.chars().count()),
            "article body extracted"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod fetcher_tests {
    use super::*;

    fn fetcher() -> ArticleFetcher {
        ArticleFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        let page = r#"<html><body><table><tr><td>
            <font size="2">Superlinear Returns<br><br>One of the most important things...</font>
        </td></tr></table></body></html>"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/superlinear.html"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/superlinear.html", server.uri())).unwrap();
        let text = fetcher().fetch_article_text(&url).await.unwrap().unwrap();

        assert_eq!(text, "Superlinear Returns\nOne of the most important things...");
    }

    #[tokio::test]
    async fn test_fetch_page_without_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/empty.html"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("<html><body></body></html>"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/empty.html", server.uri())).unwrap();
        let text = fetcher().fetch_article_text(&url).await.unwrap();

        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/gone.html"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/gone.html", server.uri())).unwrap();
        let err = fetcher().fetch_article_text(&url).await.unwrap_err();

        assert!(err.to_string().contains("404"));
    }
}

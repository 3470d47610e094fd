//! Capabilities the pipeline consumes, with their production implementations.

use std::future::Future;

use url::Url;

use essaybridge_crawler::ArticleFetcher;
use essaybridge_shared::Result;
use essaybridge_translator::GeminiClient;

/// Fetches the plain body text of one essay. `Ok(None)` means the page had none.
pub trait ArticleSource: Send + Sync {
    fn fetch_text(&self, url: &Url) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Turns an essay into its translated Markdown.
pub trait Translate: Send + Sync {
    fn translate(&self, title: &str, text: &str) -> impl Future<Output = Result<String>> + Send;
}

impl ArticleSource for ArticleFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<Option<String>> {
        self.fetch_article_text(url).await
    }
}

impl Translate for GeminiClient {
    async fn translate(&self, title: &str, text: &str) -> Result<String> {
        GeminiClient::translate(self, title, text).await
    }
}

use crate::config::Config;
use crate::parser::{ParseError, parse_listing_page, parse_locality_table, parse_page_count};
use crate::types::{LocalityCategory, LocalityRecord, PropertyRecord, UrlTemplate};

use reqwest::Client;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Page not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Source of page bodies. Requests are issued one at a time by the caller.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

#[derive(Debug, Clone)]
pub struct WebScraper<F = HttpFetcher> {
    fetcher: F,
    base_url: String,
    city: String,
}

impl WebScraper<HttpFetcher> {
    pub fn new(config: &Config) -> Result<Self, ScraperError> {
        Ok(Self::with_fetcher(HttpFetcher::new()?, config))
    }
}

impl<F: Fetch> WebScraper<F> {
    pub fn with_fetcher(fetcher: F, config: &Config) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            city: config.city.clone(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    pub fn trends_template(&self) -> UrlTemplate {
        UrlTemplate::new(format!(
            "{}/price-trends/property-rates-for-buy-in-{}?page={}",
            self.base_url,
            self.city,
            UrlTemplate::PLACEHOLDER
        ))
    }

    pub fn listing_template(&self, view_ppt_link: &str) -> UrlTemplate {
        UrlTemplate::with_page_query(&self.absolute_url(view_ppt_link))
    }

    /// Fetches page 1 of `template` and reads how many pages it has.
    pub async fn fetch_page_count(&self, template: &UrlTemplate) -> Result<u32, ScraperError> {
        let url = template.page(1);
        log::debug!("Resolving page count from {}", url);
        let html = self.fetcher.fetch(&url).await?;
        let pages = parse_page_count(&html)?;
        log::info!("There are {} pages to be crawled", pages);
        Ok(pages)
    }

    pub async fn fetch_locality_page(
        &self,
        category: LocalityCategory,
        page: u32,
    ) -> Result<Vec<LocalityRecord>, ScraperError> {
        let url = self.trends_template().page(page);
        log::info!("Fetching {} localities, page {}: {}", category, page, url);
        let html = self.fetcher.fetch(&url).await?;
        let records = parse_locality_table(&html, category)?;
        log::debug!("Parsed {} {} rows from page {}", records.len(), category, page);
        Ok(records)
    }

    pub async fn fetch_listing_page(
        &self,
        location: &str,
        view_ppt_link: &str,
        page: u32,
    ) -> Result<Vec<PropertyRecord>, ScraperError> {
        let url = self.listing_template(view_ppt_link).page(page);
        log::info!("Fetching {} listings, page {}: {}", location, page, url);
        let html = self.fetcher.fetch(&url).await?;
        Ok(parse_listing_page(&html, &url))
    }
}

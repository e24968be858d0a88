pub mod config;
pub mod output;
mod parser;
pub mod pipeline;
pub mod scraper;
pub mod types;
pub mod utils;

pub use config::Config;
pub use parser::ParseError;
pub use scraper::{Fetch, HttpFetcher, ScraperError, WebScraper};

pub(crate) const BASE_URL: &str = "https://www.makaan.com";
pub(crate) const DEFAULT_CITY: &str = "bangalore";

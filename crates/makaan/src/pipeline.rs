//! The two scraping stages. The locality stage must have written its files
//! before the listing stage runs, since those files are its input.

use crate::config::Config;
use crate::output::{read_localities, reset_folder, write_json};
use crate::scraper::{Fetch, ScraperError, WebScraper};
use crate::utils::{RunSummary, listing_file_name, reconcile};

/// Crawls every page of the price-trend table for each configured category
/// and writes one `<category>.json` per category.
pub async fn scrape_localities<F: Fetch>(
    scraper: &WebScraper<F>,
    config: &Config,
) -> Result<RunSummary, ScraperError> {
    reset_folder(&config.locality_dir)?;

    let pages = scraper.fetch_page_count(&scraper.trends_template()).await?;
    let mut summary = RunSummary::default();

    for &category in &config.categories {
        log::info!("Fetching data on {}", category.table_id());

        let mut records = Vec::new();
        for page in 1..=pages {
            records.extend(scraper.fetch_locality_page(category, page).await?);
        }

        let path = config.locality_file(category);
        write_json(&path, &records)?;
        log::info!(
            "Data for {} ({} localities) written into file {}",
            category,
            records.len(),
            path.display()
        );
        summary.record(path, records.len());
    }

    Ok(summary)
}

/// Crawls the listing pages of every locality in the configured categories'
/// locality files and writes one file per locality. All inputs are read
/// before the output folder is reset.
pub async fn scrape_properties<F: Fetch>(
    scraper: &WebScraper<F>,
    config: &Config,
) -> Result<RunSummary, ScraperError> {
    let mut localities = Vec::new();
    for &category in &config.categories {
        let input = config.locality_file(category);
        let records = read_localities(&input)?;
        log::info!("Read {} localities from {}", records.len(), input.display());
        localities.extend(records);
    }

    reset_folder(&config.property_dir)?;

    let mut summary = RunSummary::default();

    for locality in &localities {
        if !locality.has_listings() {
            log::info!("No listings available for {}, skipping", locality.location);
            continue;
        }

        let template = scraper.listing_template(&locality.view_ppt_link);
        let pages = scraper.fetch_page_count(&template).await?;

        let mut records = Vec::new();
        for page in 1..=pages {
            records.extend(
                scraper
                    .fetch_listing_page(&locality.location, &locality.view_ppt_link, page)
                    .await?,
            );
        }

        match locality.expected_properties() {
            Some(expected) => {
                log::info!("Reconciling listings for {}", locality.location);
                let outcome = reconcile(expected, records.len());
                summary.reconciled(&locality.location, outcome);
            }
            None => log::debug!(
                "No expected count for {} ({})",
                locality.location,
                locality.no_of_properties
            ),
        }

        let path = config.property_dir.join(listing_file_name(locality));
        write_json(&path, &records)?;
        log::info!(
            "Listings for {} written into file {}",
            locality.location,
            path.display()
        );
        summary.record(path, records.len());
    }

    Ok(summary)
}

/// Runs both stages in order.
pub async fn run<F: Fetch>(
    scraper: &WebScraper<F>,
    config: &Config,
) -> Result<(RunSummary, RunSummary), ScraperError> {
    let localities = scrape_localities(scraper, config).await?;
    let properties = scrape_properties(scraper, config).await?;
    Ok((localities, properties))
}

use std::path::PathBuf;

use crate::types::LocalityCategory;

/// Settings shared by both scraping stages.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub city: String,
    /// Where the locality stage writes one file per category.
    pub locality_dir: PathBuf,
    /// Where the listing stage writes one file per locality.
    pub property_dir: PathBuf,
    /// Categories scraped by the locality stage and read back by the
    /// listing stage.
    pub categories: Vec<LocalityCategory>,
}

impl Config {
    pub fn locality_file(&self, category: LocalityCategory) -> PathBuf {
        self.locality_dir.join(category.file_name())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: crate::BASE_URL.to_string(),
            city: crate::DEFAULT_CITY.to_string(),
            locality_dir: PathBuf::from("output/localities"),
            property_dir: PathBuf::from("output/properties"),
            categories: LocalityCategory::ALL.to_vec(),
        }
    }
}

use std::{collections::HashSet, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel stored in any field whose source cell is absent.
pub const NA: &str = "NA";

#[derive(Debug, thiserror::Error)]
#[error("Invalid category '{0}'. Accepted values: 'apartment', 'villa', 'plot', 'builderfloor'")]
pub struct CategoryParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalityCategory {
    Apartment,
    Villa,
    Plot,
    BuilderFloor,
}

impl LocalityCategory {
    pub const ALL: [LocalityCategory; 4] = [
        LocalityCategory::Apartment,
        LocalityCategory::Villa,
        LocalityCategory::Plot,
        LocalityCategory::BuilderFloor,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            LocalityCategory::Apartment => "apartment",
            LocalityCategory::Villa => "villa",
            LocalityCategory::Plot => "plot",
            LocalityCategory::BuilderFloor => "builderfloor",
        }
    }

    /// Id of the table holding this category on the price-trend page.
    pub fn table_id(&self) -> String {
        format!("locality_{}", self.slug())
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.slug())
    }
}

impl FromStr for LocalityCategory {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apartment" => Ok(LocalityCategory::Apartment),
            "villa" => Ok(LocalityCategory::Villa),
            "plot" => Ok(LocalityCategory::Plot),
            "builderfloor" | "builder_floor" => Ok(LocalityCategory::BuilderFloor),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

impl Display for LocalityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalityCategory::Apartment => write!(f, "Apartment"),
            LocalityCategory::Villa => write!(f, "Villa"),
            LocalityCategory::Plot => write!(f, "Plot"),
            LocalityCategory::BuilderFloor => write!(f, "Builder Floor"),
        }
    }
}

/// One row of a price-trend table.
///
/// `view_ppt_link` and `no_of_properties` come from the same optional cell, so
/// they are either both set or both [`NA`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityRecord {
    pub locality_link: String,
    pub location: String,
    pub location_code: String,
    pub min_price: String,
    pub max_price: String,
    pub avg_price: String,
    pub growth: String,
    pub view_ppt_link: String,
    pub no_of_properties: String,
}

impl LocalityRecord {
    pub fn has_listings(&self) -> bool {
        self.view_ppt_link != NA
    }

    pub fn expected_properties(&self) -> Option<usize> {
        self.no_of_properties.replace(',', "").parse().ok()
    }
}

impl Display for LocalityRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] min {} / max {} / avg {} ({}%)",
            self.location,
            self.location_code,
            self.min_price,
            self.max_price,
            self.avg_price,
            self.growth
        )
    }
}

/// A listing card: the embedded payload plus whatever the card's detail list
/// and project block add. Serializes as a flat JSON object in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyRecord(Map<String, Value>);

impl PropertyRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Accumulates a [`PropertyRecord`]. Keys seeded from the payload are never
/// replaced; scraped keys overwrite each other in arrival order.
#[derive(Debug, Default)]
pub struct PropertyRecordBuilder {
    fields: Map<String, Value>,
    seeded: HashSet<String>,
}

impl PropertyRecordBuilder {
    pub fn from_payload(payload: Map<String, Value>) -> Self {
        let seeded = payload.keys().cloned().collect();
        Self {
            fields: payload,
            seeded,
        }
    }

    /// Returns `false` when the key belongs to the payload and was left alone.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.seeded.contains(&key) {
            return false;
        }
        self.fields.insert(key, Value::String(value.into()));
        true
    }

    pub fn build(self) -> PropertyRecord {
        PropertyRecord(self.fields)
    }
}

/// A URL with a `{page}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub const PLACEHOLDER: &'static str = "{page}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Appends a `page` query parameter to an existing URL.
    pub fn with_page_query(url: &str) -> Self {
        let sep = if url.contains('?') { '&' } else { '?' };
        Self(format!("{url}{sep}page={}", Self::PLACEHOLDER))
    }

    pub fn page(&self, page: u32) -> String {
        self.0.replace(Self::PLACEHOLDER, &page.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UrlTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_round_trips_through_slug() {
        for category in LocalityCategory::ALL {
            assert_eq!(category.slug().parse::<LocalityCategory>().unwrap(), category);
        }
        assert_eq!(LocalityCategory::BuilderFloor.table_id(), "locality_builderfloor");
        assert_eq!(LocalityCategory::Villa.file_name(), "villa.json");
        assert!("bungalow".parse::<LocalityCategory>().is_err());
    }

    #[test]
    fn test_url_template_query_separator() {
        let listing = UrlTemplate::with_page_query("https://www.makaan.com/listings?localityIds=50167");
        assert_eq!(
            listing.page(3),
            "https://www.makaan.com/listings?localityIds=50167&page=3"
        );

        let plain = UrlTemplate::with_page_query("https://www.makaan.com/whitefield-property");
        assert_eq!(plain.page(1), "https://www.makaan.com/whitefield-property?page=1");
    }

    #[test]
    fn test_builder_keeps_payload_keys() {
        let payload = json!({"listingId": 11, "price": "50 L"});
        let Value::Object(map) = payload else {
            unreachable!()
        };

        let mut builder = PropertyRecordBuilder::from_payload(map);
        assert!(!builder.insert("price", "49 L"));
        assert!(builder.insert("bathrooms", "2"));
        assert!(builder.insert("bathrooms", "3"));
        let record = builder.build();

        assert_eq!(record.get("price"), Some(&json!("50 L")));
        assert_eq!(record.get_str("bathrooms"), Some("3"));
        assert_eq!(
            record.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["listingId", "price", "bathrooms"]
        );
    }

    #[test]
    fn test_expected_properties() {
        let mut record = LocalityRecord {
            locality_link: "/bangalore/whitefield".into(),
            location: "Whitefield".into(),
            location_code: "50167".into(),
            min_price: NA.into(),
            max_price: NA.into(),
            avg_price: NA.into(),
            growth: NA.into(),
            view_ppt_link: NA.into(),
            no_of_properties: NA.into(),
        };
        assert!(!record.has_listings());
        assert_eq!(record.expected_properties(), None);

        record.no_of_properties = "1,204".into();
        assert_eq!(record.expected_properties(), Some(1204));
    }
}

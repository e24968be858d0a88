use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use crate::types::{
    LocalityCategory, LocalityRecord, NA, PropertyRecord, PropertyRecordBuilder,
};

/// Width of the unit label (" / sqft") trailing the max and average prices.
pub const PRICE_SUFFIX_LEN: usize = 7;
/// Width of the "%" trailing the growth figure.
pub const GROWTH_SUFFIX_LEN: usize = 1;
/// Text of an average-price cell with no data.
pub const PRICE_PLACEHOLDER: &str = "-";
/// Key used for a detail-list item that carries no `title`.
pub const UNTITLED_DETAIL_KEY: &str = "new_resale";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid selector: {0}")]
    Selector(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Pagination controls not found")]
    MissingPagination,
    #[error("Invalid page count: {0}")]
    InvalidPageCount(String),
    #[error("Invalid card payload: {0}")]
    Payload(#[from] serde_json::Error),
}

macro_rules! selector {
    ($name:ident, $css:literal) => {
        static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect(concat!("invalid selector: ", $css)));
    };
}

selector!(SEL_PAGINATION, ".pagination li");

selector!(SEL_LOCALITY_LINK, "td[data-source='locality']>a");
selector!(SEL_LOCATION, "td[data-source='locality']>a>span");
selector!(SEL_LOCATION_CODE, "td.link-td.ta-c[data-source='See Trends']");
selector!(SEL_MIN_PRICE, "td.ta-r>span[itemprop='minPrice']");
selector!(SEL_MAX_PRICE, "td.ta-r>span[itemprop='maxPrice']");
selector!(SEL_AVG_PRICE, "td.ta-r:nth-child(3)");
selector!(SEL_GROWTH, "td:nth-child(4)");
selector!(SEL_VIEW_PROPERTIES, "td[data-source='View Properties']:not(.disabled)");

selector!(SEL_CARD, "li.cardholder");
selector!(SEL_CARD_PAYLOAD, "script[type='text/x-config']");
selector!(SEL_DETAIL_ITEM, "ul.listing-details > li");
selector!(SEL_PROJECT, "a.projName");

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_text(element: ElementRef) -> String {
    normalize_whitespace(&elem_text(element))
}

fn first<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

fn cell_text(row: ElementRef, selector: &Selector) -> Option<String> {
    first(row, selector).map(clean_text)
}

/// Drops a fixed number of trailing characters. This is not unit-aware: a
/// label of a different width corrupts the value rather than failing.
pub fn drop_suffix(text: &str, len: usize) -> String {
    let keep = text.chars().count().saturating_sub(len);
    text.chars().take(keep).collect()
}

pub fn plain_field(text: Option<&str>) -> String {
    text.unwrap_or(NA).to_string()
}

pub fn suffixed_field(text: Option<&str>, suffix_len: usize) -> String {
    text.map(|t| drop_suffix(t, suffix_len))
        .unwrap_or_else(|| NA.to_string())
}

pub fn avg_price_field(text: Option<&str>) -> String {
    match text {
        Some(t) if t != PRICE_PLACEHOLDER => drop_suffix(t, PRICE_SUFFIX_LEN),
        _ => NA.to_string(),
    }
}

/// Reads the view-properties cell into `(view_ppt_link, no_of_properties)`.
/// Both come from the one cell, so both are [`NA`] when it is absent.
pub fn view_properties_fields(
    data_url: Option<&str>,
    text: Option<&str>,
) -> Result<(String, String), ParseError> {
    let Some(text) = text else {
        return Ok((NA.to_string(), NA.to_string()));
    };

    let link = data_url.ok_or_else(|| ParseError::MissingField("data-url".to_string()))?;
    let count = text
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ParseError::MissingField(format!("property count in '{}'", text)))?;

    Ok((link.to_string(), count.to_string()))
}

/// Reads the total page count from the second-to-last pagination control. The
/// last control is "next" or an ellipsis on this site.
pub fn parse_page_count(html: &str) -> Result<u32, ParseError> {
    let document = Html::parse_document(html);
    let controls: Vec<ElementRef> = document.select(&SEL_PAGINATION).collect();

    if controls.is_empty() {
        return Err(ParseError::MissingPagination);
    }

    let label = controls
        .len()
        .checked_sub(2)
        .map(|i| clean_text(controls[i]))
        .ok_or_else(|| {
            ParseError::InvalidPageCount(format!(
                "expected at least two pagination controls, found {}",
                controls.len()
            ))
        })?;

    match label.parse::<u32>() {
        Ok(pages) if pages > 0 => Ok(pages),
        _ => Err(ParseError::InvalidPageCount(label)),
    }
}

fn locality_row_selector(category: LocalityCategory) -> Result<Selector, ParseError> {
    let css = format!(
        "#{} .tbl tr[itemtype='http://schema.org/Place']",
        category.table_id()
    );
    Selector::parse(&css).map_err(|e| ParseError::Selector(format!("{css}: {e}")))
}

pub fn parse_locality_table(
    html: &str,
    category: LocalityCategory,
) -> Result<Vec<LocalityRecord>, ParseError> {
    let document = Html::parse_document(html);
    let row_selector = locality_row_selector(category)?;

    let mut records = Vec::new();

    for row in document.select(&row_selector) {
        match parse_locality_row(row) {
            Ok(record) => records.push(record),
            Err(e) => match first(row, &SEL_LOCALITY_LINK).and_then(|a| a.value().attr("href")) {
                Some(href) => log::warn!("Error in {}: {}", href, e),
                None => log::warn!("Error in {} row without locality link: {}", category, e),
            },
        }
    }

    Ok(records)
}

fn parse_locality_row(row: ElementRef) -> Result<LocalityRecord, ParseError> {
    let locality_link = first(row, &SEL_LOCALITY_LINK)
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| ParseError::MissingField("locality link".to_string()))?
        .to_string();

    let location = first(row, &SEL_LOCATION)
        .map(clean_text)
        .ok_or_else(|| ParseError::MissingField("location".to_string()))?;

    let location_code = first(row, &SEL_LOCATION_CODE)
        .and_then(|td| td.value().attr("data-id"))
        .ok_or_else(|| ParseError::MissingField("location code".to_string()))?
        .to_string();

    let min_price = plain_field(cell_text(row, &SEL_MIN_PRICE).as_deref());
    let max_price = suffixed_field(cell_text(row, &SEL_MAX_PRICE).as_deref(), PRICE_SUFFIX_LEN);
    let avg_price = avg_price_field(cell_text(row, &SEL_AVG_PRICE).as_deref());
    let growth = suffixed_field(cell_text(row, &SEL_GROWTH).as_deref(), GROWTH_SUFFIX_LEN);

    let view_cell = first(row, &SEL_VIEW_PROPERTIES);
    let (view_ppt_link, no_of_properties) = view_properties_fields(
        view_cell.and_then(|td| td.value().attr("data-url")),
        view_cell.map(clean_text).as_deref(),
    )?;

    Ok(LocalityRecord {
        locality_link,
        location,
        location_code,
        min_price,
        max_price,
        avg_price,
        growth,
        view_ppt_link,
        no_of_properties,
    })
}

/// Parses every listing card on a page. `url` is only used to label skipped
/// cards in the log.
pub fn parse_listing_page(html: &str, url: &str) -> Vec<PropertyRecord> {
    let document = Html::parse_document(html);

    document
        .select(&SEL_CARD)
        .enumerate()
        .filter_map(|(i, card)| match parse_listing_card(card) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Error in {} at row {}: {}", url, i + 1, e);
                None
            }
        })
        .collect()
}

fn parse_listing_card(card: ElementRef) -> Result<PropertyRecord, ParseError> {
    let script = first(card, &SEL_CARD_PAYLOAD)
        .ok_or_else(|| ParseError::MissingField("card payload".to_string()))?;
    let payload: Map<String, Value> = serde_json::from_str(elem_text(script).trim())?;

    let mut builder = PropertyRecordBuilder::from_payload(payload);

    for item in card.select(&SEL_DETAIL_ITEM) {
        let key = item
            .value()
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| UNTITLED_DETAIL_KEY.to_string());

        if !builder.insert(key.clone(), clean_text(item)) {
            log::debug!("Keeping payload value for '{}'", key);
        }
    }

    let project = first(card, &SEL_PROJECT);
    let proj_name = project
        .map(clean_text)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| NA.to_string());
    let proj_href = project
        .and_then(|a| a.value().attr("href"))
        .unwrap_or(NA)
        .to_string();

    builder.insert("proj_name", proj_name);
    builder.insert("proj_href", proj_href);

    Ok(builder.build())
}

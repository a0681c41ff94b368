//! Geofabrik listing pages
//!
//! Region pages carry one or two subregion tables (`#subregions`,
//! `#specialsubregions`). Each `tr[onmouseover]` row holds the region name in
//! `td.subregion`, followed by link cells whose file names identify the
//! format, and a parenthesised size cell after the `.osm.pbf` link.

use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use crate::app::listing::{clean_text, href_file_name, selector, Listing, ListingRow};
use crate::app::models::{parse_byte_size, DataSource, FormatTag};
use crate::constants::selectors;
use crate::errors::ScrapingResult;

/// Parse one Geofabrik page
pub fn parse_listing(html: &str, page_url: &Url) -> ScrapingResult<Listing> {
    let document = Html::parse_document(html);
    let table_selector = selector(selectors::SUBREGION_TABLES)?;
    let row_selector = selector(selectors::SUBREGION_ROWS)?;
    let cell_selector = selector(selectors::CELLS)?;
    let link_selector = selector(selectors::LINKS)?;

    let mut listing = Listing::default();

    for table in document.select(&table_selector) {
        listing.has_subregion_table = true;

        for row in table.select(&row_selector) {
            if let Some(parsed) = parse_row(row, page_url, &cell_selector, &link_selector) {
                listing.rows.push(parsed);
            }
        }
    }

    debug!(
        "Parsed {} rows from {} (subregion table: {})",
        listing.rows.len(),
        page_url,
        listing.has_subregion_table
    );

    Ok(listing)
}

fn parse_row(
    row: ElementRef<'_>,
    page_url: &Url,
    cell_selector: &scraper::Selector,
    link_selector: &scraper::Selector,
) -> Option<ListingRow> {
    let mut parsed = ListingRow::default();
    let mut last_format: Option<FormatTag> = None;

    for cell in row.select(cell_selector) {
        let anchor = cell.select(link_selector).next();

        if is_subregion_cell(&cell) {
            parsed.name = clean_text(cell.text());
            parsed.link = anchor
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| page_url.join(href).ok());
        } else if let Some(anchor) = anchor {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let format = FormatTag::from_file_name(href_file_name(href), DataSource::Geofabrik);
            if let (Some(format), Ok(url)) = (format, page_url.join(href)) {
                parsed.download_links.insert(format, url);
                last_format = Some(format);
            }
        } else if let (Some(format), Some(size)) =
            (last_format, parse_byte_size(&clean_text(cell.text())))
        {
            parsed.size_by_format.insert(format, size);
        }
    }

    if parsed.name.is_empty() {
        return None;
    }

    // Some rows link the region only through the map hover handler
    if parsed.link.is_none() {
        parsed.link = row
            .value()
            .attr("onmouseover")
            .and_then(hover_target)
            .and_then(|target| page_url.join(&target.replace(".kml", ".html")).ok());
    }

    Some(parsed)
}

fn is_subregion_cell(cell: &ElementRef<'_>) -> bool {
    cell.value()
        .attr("class")
        .map(|classes| classes.split_whitespace().any(|c| c == "subregion"))
        .unwrap_or(false)
}

/// Quoted argument of a handler such as `loadkml('europe/germany.kml')`
fn hover_target(handler: &str) -> Option<String> {
    let open = handler.find(['\'', '"'])?;
    let quote = handler[open..].chars().next()?;
    let rest = &handler[open + 1..];
    let close = rest.find(quote)?;
    let target = rest[..close].trim();
    (!target.is_empty()).then(|| target.to_string())
}

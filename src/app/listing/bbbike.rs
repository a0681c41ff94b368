//! BBBike listing pages
//!
//! The root is a plain directory index with one folder per city. A city page
//! has no subregions; it publishes the city's own files as
//! `a.download_link` anchors with the size in a nested `span.size`.

use scraper::Html;
use tracing::debug;
use url::Url;

use crate::app::listing::{clean_text, href_file_name, selector, Listing, ListingRow};
use crate::app::models::{parse_byte_size, DataSource, FormatTag};
use crate::constants::selectors;
use crate::errors::ScrapingResult;

/// Parse one BBBike page, either the city index or a city download page
pub fn parse_listing(html: &str, page_url: &Url) -> ScrapingResult<Listing> {
    let document = Html::parse_document(html);
    let download_selector = selector(selectors::DOWNLOAD_LINKS)?;
    let size_selector = selector(selectors::SIZE_SPAN)?;

    let mut listing = Listing::default();

    for anchor in document.select(&download_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(format) = FormatTag::from_file_name(href_file_name(href), DataSource::Bbbike)
        else {
            continue;
        };
        let Ok(url) = page_url.join(href) else {
            continue;
        };

        listing.own_links.insert(format, url);
        if let Some(size) = anchor
            .select(&size_selector)
            .next()
            .and_then(|span| parse_byte_size(&clean_text(span.text())))
        {
            listing.own_sizes.insert(format, size);
        }
    }

    if !listing.own_links.is_empty() {
        debug!("Parsed {} files from {}", listing.own_links.len(), page_url);
        return Ok(listing);
    }

    let row_selector = selector(selectors::INDEX_ROWS)?;
    let link_selector = selector(selectors::LINKS)?;

    for row in document.select(&row_selector) {
        listing.has_subregion_table = true;

        let Some(anchor) = row.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !is_city_folder(href) {
            continue;
        }

        let name = clean_text(anchor.text());
        let name = name.trim_end_matches('/').trim();
        if name.is_empty() {
            continue;
        }

        listing
            .rows
            .push(ListingRow::new(name, page_url.join(href).ok()));
    }

    debug!("Parsed {} cities from {}", listing.rows.len(), page_url);
    Ok(listing)
}

fn is_city_folder(href: &str) -> bool {
    href.ends_with('/')
        && !href.starts_with('/')
        && !href.starts_with("..")
        && !href.starts_with('?')
        && !href.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_PAGE: &str = r#"
<html><body><table>
<thead><tr><th>Name</th><th>Last modified</th><th>Size</th><th>Type</th></tr></thead>
<tbody>
<tr><td><a href="../">Parent Directory</a></td><td></td><td>-</td><td>Directory</td></tr>
<tr><td><a href="Aachen/">Aachen/</a></td><td>2024-Jan-01 10:00</td><td>-</td><td>Directory</td></tr>
<tr><td><a href="Amsterdam/">Amsterdam/</a></td><td>2024-Jan-01 10:00</td><td>-</td><td>Directory</td></tr>
<tr><td><a href="HEADER.txt">HEADER.txt</a></td><td></td><td>1k</td><td>text</td></tr>
</tbody></table></body></html>
"#;

    const CITY_PAGE: &str = r#"
<html><body><div class="list">
<a class="download_link" href="Aachen.osm.pbf" title="last update: 2024-01-01 10:00">Protocolbuffer (PBF) <span class="size">13M</span></a>
<a class="download_link" href="Aachen.osm.gz" title="last update: 2024-01-01 10:00">OSM XML gzip'd <span class="size">21M</span></a>
<a class="download_link" href="Aachen.osm.shp.zip" title="last update: 2024-01-01 10:00">Shapefile (Esri) <span class="size">29M</span></a>
<a class="download_link" href="Aachen.osm.garmin-onroad-latin1.zip" title="last update: 2024-01-01 10:00">Garmin Onroad <span class="size">2.1M</span></a>
<a class="download_link" href="Aachen.osm.navit.zip" title="last update: 2024-01-01 10:00">Navit <span class="size">9.4M</span></a>
<a class="small" href="Aachen.poly">poly</a>
</div></body></html>
"#;

    #[test]
    fn test_index_page_rows() {
        let url = Url::parse("https://download.bbbike.org/osm/bbbike/").unwrap();
        let listing = parse_listing(INDEX_PAGE, &url).unwrap();

        assert!(listing.has_subregion_table);
        let names: Vec<_> = listing.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Aachen", "Amsterdam"]);
        assert_eq!(
            listing.rows[0].link.as_ref().unwrap().as_str(),
            "https://download.bbbike.org/osm/bbbike/Aachen/"
        );
    }

    #[test]
    fn test_city_page_own_files() {
        let url = Url::parse("https://download.bbbike.org/osm/bbbike/Aachen/").unwrap();
        let listing = parse_listing(CITY_PAGE, &url).unwrap();

        assert!(!listing.has_subregions());
        assert_eq!(listing.own_links.len(), 5);
        assert_eq!(
            listing.own_links[&FormatTag::Pbf].as_str(),
            "https://download.bbbike.org/osm/bbbike/Aachen/Aachen.osm.pbf"
        );
        assert!(listing.own_links.contains_key(&FormatTag::GarminOnroadLatin1));
        assert_eq!(
            listing.own_links[&FormatTag::NavitZip].as_str(),
            "https://download.bbbike.org/osm/bbbike/Aachen/Aachen.osm.navit.zip"
        );
        assert_eq!(listing.own_sizes[&FormatTag::Gz], 21 * 1024 * 1024);
    }
}

//! Data models shared across the catalogue, resolver and downloader
//!
//! Describes the two supported extract servers, the file formats each one
//! publishes, and the small naming helpers used to lay out local files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::sources;
use crate::errors::{CatalogueError, CatalogueResult};

/// Size of a published file in bytes
pub type ByteSize = u64;

/// Extract servers with a browsable catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// download.geofabrik.de: nested continent/country/subdivision tables
    Geofabrik,
    /// download.bbbike.org: flat index of city extracts
    Bbbike,
}

const GEOFABRIK_FORMATS: &[FormatTag] = &[FormatTag::OsmPbf, FormatTag::ShpZip, FormatTag::OsmBz2];

const BBBIKE_FORMATS: &[FormatTag] = &[
    FormatTag::Pbf,
    FormatTag::Gz,
    FormatTag::ShpZip,
    FormatTag::GarminOsm,
    FormatTag::GarminOnroad,
    FormatTag::GarminOnroadLatin1,
    FormatTag::GarminOpentopo,
    FormatTag::MapsforgeOsm,
    FormatTag::SvgOsm,
    FormatTag::NavitZip,
    FormatTag::GeojsonXz,
    FormatTag::CsvXz,
];

impl DataSource {
    /// All supported sources
    pub const ALL: [DataSource; 2] = [DataSource::Geofabrik, DataSource::Bbbike];

    /// Stable identifier used for snapshot and download directories
    pub fn slug(&self) -> &'static str {
        match self {
            DataSource::Geofabrik => "geofabrik",
            DataSource::Bbbike => "bbbike",
        }
    }

    /// Human readable server name
    pub fn display_name(&self) -> &'static str {
        match self {
            DataSource::Geofabrik => "Geofabrik",
            DataSource::Bbbike => "BBBike",
        }
    }

    /// Root listing page of the server
    pub fn root_url(&self) -> &'static str {
        match self {
            DataSource::Geofabrik => sources::GEOFABRIK_URL,
            DataSource::Bbbike => sources::BBBIKE_URL,
        }
    }

    /// The fixed set of formats this source publishes
    pub fn formats(&self) -> &'static [FormatTag] {
        match self {
            DataSource::Geofabrik => GEOFABRIK_FORMATS,
            DataSource::Bbbike => BBBIKE_FORMATS,
        }
    }

    /// Format used to compare duplicate catalogue rows by size
    pub fn primary_format(&self) -> FormatTag {
        match self {
            DataSource::Geofabrik => FormatTag::OsmPbf,
            DataSource::Bbbike => FormatTag::Pbf,
        }
    }

    /// Normalize a user supplied format name into one of this source's tags
    ///
    /// Accepts the extension with or without the leading dot, in any case,
    /// and the distinguishing component alone (`pbf`, `shp`, `bz2`).
    ///
    /// # Errors
    ///
    /// Returns `CatalogueError::UnknownFormat` listing the valid formats when
    /// nothing matches.
    pub fn parse_format(&self, input: &str) -> CatalogueResult<FormatTag> {
        let lowered = input.trim().to_lowercase();
        let needle = lowered.trim_start_matches('.');

        if !needle.is_empty() {
            let formats = self.formats();

            if let Some(tag) = formats.iter().find(|f| f.bare_extension() == needle) {
                return Ok(*tag);
            }

            // "osm.gz" for a source that only knows ".gz"
            if let Some(tag) = formats
                .iter()
                .filter(|f| needle.ends_with(&format!(".{}", f.bare_extension())))
                .max_by_key(|f| f.extension().len())
            {
                return Ok(*tag);
            }

            if let Some(tag) = formats
                .iter()
                .find(|f| f.bare_extension().split(['.', '-']).any(|part| part == needle))
            {
                return Ok(*tag);
            }

            if needle == "shapefile" && formats.contains(&FormatTag::ShpZip) {
                return Ok(FormatTag::ShpZip);
            }
        }

        Err(CatalogueError::UnknownFormat {
            input: input.to_string(),
            valid: self
                .formats()
                .iter()
                .map(|f| f.extension())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "geofabrik" => Ok(DataSource::Geofabrik),
            "bbbike" => Ok(DataSource::Bbbike),
            other => Err(format!(
                "unknown data source '{}' (expected geofabrik or bbbike)",
                other
            )),
        }
    }
}

/// One downloadable file encoding
///
/// Serialized as its file extension so snapshots stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatTag {
    #[serde(rename = ".osm.pbf")]
    OsmPbf,
    #[serde(rename = ".shp.zip")]
    ShpZip,
    #[serde(rename = ".osm.bz2")]
    OsmBz2,
    #[serde(rename = ".pbf")]
    Pbf,
    #[serde(rename = ".gz")]
    Gz,
    #[serde(rename = ".garmin-osm.zip")]
    GarminOsm,
    #[serde(rename = ".garmin-onroad.zip")]
    GarminOnroad,
    #[serde(rename = ".garmin-onroad-latin1.zip")]
    GarminOnroadLatin1,
    #[serde(rename = ".garmin-opentopo.zip")]
    GarminOpentopo,
    #[serde(rename = ".mapsforge-osm.zip")]
    MapsforgeOsm,
    #[serde(rename = ".svg-osm.zip")]
    SvgOsm,
    #[serde(rename = ".navit.zip")]
    NavitZip,
    #[serde(rename = ".geojson.xz")]
    GeojsonXz,
    #[serde(rename = ".csv.xz")]
    CsvXz,
}

impl FormatTag {
    /// File extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            FormatTag::OsmPbf => ".osm.pbf",
            FormatTag::ShpZip => ".shp.zip",
            FormatTag::OsmBz2 => ".osm.bz2",
            FormatTag::Pbf => ".pbf",
            FormatTag::Gz => ".gz",
            FormatTag::GarminOsm => ".garmin-osm.zip",
            FormatTag::GarminOnroad => ".garmin-onroad.zip",
            FormatTag::GarminOnroadLatin1 => ".garmin-onroad-latin1.zip",
            FormatTag::GarminOpentopo => ".garmin-opentopo.zip",
            FormatTag::MapsforgeOsm => ".mapsforge-osm.zip",
            FormatTag::SvgOsm => ".svg-osm.zip",
            FormatTag::NavitZip => ".navit.zip",
            FormatTag::GeojsonXz => ".geojson.xz",
            FormatTag::CsvXz => ".csv.xz",
        }
    }

    fn bare_extension(&self) -> &'static str {
        &self.extension()[1..]
    }

    /// Directory-safe form of the extension, e.g. `osm-pbf`
    pub fn dir_suffix(&self) -> String {
        self.bare_extension().replace('.', "-")
    }

    /// Identify the format of a published file name
    ///
    /// The longest extension offered by `source` wins, so `berlin.osm.pbf`
    /// is `.osm.pbf` on Geofabrik and `.pbf` on BBBike.
    pub fn from_file_name(file_name: &str, source: DataSource) -> Option<FormatTag> {
        let lowered = file_name.to_lowercase();
        source
            .formats()
            .iter()
            .filter(|f| lowered.ends_with(f.extension()))
            .max_by_key(|f| f.extension().len())
            .copied()
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Parse a human readable size such as `(1.2 GB)` or `345M`
///
/// Returns `None` when no number can be read.
pub fn parse_byte_size(text: &str) -> Option<ByteSize> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '\u{a0}') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let split = cleaned
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(cleaned.len());
    let (number, unit) = cleaned.split_at(split);
    let value: f64 = number.replace(',', "").parse().ok()?;

    let multiplier: f64 = match unit.to_uppercase().trim_end_matches('B') {
        "" => 1.0,
        "K" | "KI" => 1024.0,
        "M" | "MI" => 1024.0 * 1024.0,
        "G" | "GI" => 1024.0 * 1024.0 * 1024.0,
        "T" | "TI" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };

    Some((value * multiplier).round() as ByteSize)
}

/// Directory name for a region: lower-case words without punctuation, joined by `-`
pub fn region_dir_name(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '/')
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Directory that holds fanned-out subregion files for an unavailable (region, format)
pub fn fan_out_dir_name(name: &str, format: FormatTag) -> String {
    format!("{}-{}", region_dir_name(name), format.dir_suffix())
}

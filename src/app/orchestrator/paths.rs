//! Local file layout
//!
//! Structure under a destination root:
//! - Direct file: `{dest}/{region-dir}/{file name}`
//! - Fan-out namespace: `{dest}/{region-dir}-{format-dir}/`
//! - Fanned-out child file: `{namespace}/{file name}`
//! - Nested fan-out: `{namespace}/{child-dir}-{format-dir}/`

use std::path::{Path, PathBuf};

use url::Url;

use crate::app::models::{fan_out_dir_name, region_dir_name, FormatTag};

/// Where an item of a download plan lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Requested directly: gets a directory of its own under the root
    Root(PathBuf),
    /// Stands in for an unavailable parent file: lives inside its namespace
    Namespace(PathBuf),
}

impl Placement {
    pub fn dir(&self) -> &Path {
        match self {
            Placement::Root(dir) | Placement::Namespace(dir) => dir,
        }
    }
}

/// Path generation utility for downloaded extracts
pub struct PathGenerator;

impl PathGenerator {
    /// Local path of a region's direct file
    pub fn file_path(placement: &Placement, name: &str, format: FormatTag, url: &Url) -> PathBuf {
        let file_name = Self::file_name(name, format, url);
        match placement {
            Placement::Root(root) => root.join(region_dir_name(name)).join(file_name),
            Placement::Namespace(dir) => dir.join(file_name),
        }
    }

    /// Namespace directory for the subregion files replacing (name, format)
    pub fn fan_out_dir(placement: &Placement, name: &str, format: FormatTag) -> PathBuf {
        placement.dir().join(fan_out_dir_name(name, format))
    }

    /// Published file name, or one derived from the region when the URL has none
    pub fn file_name(name: &str, format: FormatTag, url: &Url) -> String {
        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", region_dir_name(name), format.extension()))
    }
}

//! Diet classification side file.
//!
//! A JSON object mapping scientific name to diet category, written with
//! sorted keys so diffs stay small.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Scientific name to diet category.
pub type DietMap = BTreeMap<String, String>;

/// Load the diet map, returning an empty map if the file does not exist.
pub fn load_diet_map(path: &Path) -> Result<DietMap> {
    if !path.exists() {
        return Ok(DietMap::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| Error::DietRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| Error::DietParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write the whole diet map to `path`.
pub fn save_diet_map(map: &DietMap, path: &Path) -> Result<()> {
    let mut content = serde_json::to_string_pretty(map).map_err(|e| Error::DietParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    content.push('\n');

    std::fs::write(path, content).map_err(|e| Error::DietWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Set one species' diet, re-reading the file first so concurrent edits to
/// other keys survive.
pub fn set_diet(path: &Path, scientific_name: &str, diet: &str) -> Result<()> {
    let mut map = load_diet_map(path)?;
    map.insert(scientific_name.to_string(), diet.to_string());
    save_diet_map(&map, path)
}

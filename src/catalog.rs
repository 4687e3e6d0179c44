use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;

use crate::challenge::Challenge;
use crate::error::StoreError;

static CATALOG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets/catalog");

/// Fixed seed list of challenges
#[derive(Deserialize, Clone, Debug)]
pub struct Catalog {
    pub name: String,
    pub challenges: Vec<Challenge>,
}

impl Catalog {
    /// The catalog bundled with the binary
    pub fn builtin() -> Result<Self, StoreError> {
        Self::embedded("challenges.json")
    }

    pub fn embedded(file_name: &str) -> Result<Self, StoreError> {
        let file = CATALOG_DIR
            .get_file(file_name)
            .ok_or_else(|| StoreError::MissingCatalog(file_name.to_string()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| StoreError::MissingCatalog(file_name.to_string()))?;
        Self::from_json(contents)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(from_str(json)?)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of the public dataset snapshot. Read-only within iamdb.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetRecord {
    pub external_id: String,
    pub title: String,
    pub year: Option<u32>,
    pub public_rating: Option<f64>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    #[serde(default)]
    pub title_type: String,
}

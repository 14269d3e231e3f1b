//! Functions for loading asset settings.

use std::io::Read;

use crate::errors::*;

/// Configuration of the `AssetManager`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// The file extension of serialized assets, without the leading dot.
    pub extension: String,
    /// Assets discovered in a directory of this name are engine assets.
    pub engine_directory: String,
    /// How many times a completed request could wait for its dependencies before
    /// it is loaded synchronously.
    pub requeue_limit: u32,
    /// The number of completed requests handled per `update`.
    pub finalize_budget: usize,
    /// The maximum number of passes a sweep makes.
    pub sweep_passes: usize,
}

impl Default for AssetSettings {
    fn default() -> Self {
        AssetSettings {
            extension: "asset".to_owned(),
            engine_directory: "Engine".to_owned(),
            requeue_limit: 30,
            finalize_budget: 3,
            sweep_passes: 10,
        }
    }
}

impl AssetSettings {
    /// Reads settings from JSON. Missing fields keep their defaults.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A named hydraulic model definition on the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schematisation {
    pub id: i64,
    pub name: String,
}

impl Schematisation {
    /// Build from a raw key-value payload
    pub fn from_payload(payload: Value) -> Result<Self> {
        Ok(serde_json::from_value(payload)?)
    }
}

/// Metadata of a stored file (name only; the payload is fetched separately)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub filename: String,
}

/// Primary database of a revision, shipped as a zip archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionDatabase {
    pub file: FileMeta,
}

/// Raster attached to a revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterReference {
    pub id: i64,
    pub name: String,
    #[serde(default, rename = "type")]
    pub raster_type: Option<String>,
}

/// An immutable, published schematisation revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRevision {
    pub id: i64,
    pub number: i64,
    #[serde(default)]
    pub schematisation_id: Option<i64>,
    #[serde(default)]
    pub sqlite: Option<RevisionDatabase>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rasters: Vec<RasterReference>,
    #[serde(default)]
    pub commit_message: Option<String>,
}

impl RemoteRevision {
    /// Build from a raw key-value payload
    pub fn from_payload(payload: Value) -> Result<Self> {
        Ok(serde_json::from_value(payload)?)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<RasterReference>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<RasterReference>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Simulation model built from a revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreediModel {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Pre-signed download handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub get_url: String,
}

/// A downloadable model artifact (gridadmin or its geopackage export)
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub file: FileMeta,
    pub download: Download,
}

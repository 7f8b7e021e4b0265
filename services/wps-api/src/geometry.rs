//! Polygon geometry retrieval from a WFS feature service.
//!
//! The feature service is queried with a WFS 1.0.0 GetFeature request for a
//! typename and a list of feature ids, asking for GeoJSON. The polygons of
//! the returned features are merged into a single geometry that is handed to
//! the computation backend.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::error::{ProcessError, ProcessResult};

/// A GeoJSON position: longitude, latitude and optional extra ordinates.
pub type Position = Vec<f64>;

/// Polygonal GeoJSON geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    /// Exterior ring followed by interior rings.
    Polygon { coordinates: Vec<Vec<Position>> },

    /// A list of polygons.
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl Geometry {
    /// Merge polygons into one geometry.
    ///
    /// A single polygon stays a `Polygon`; anything else becomes a
    /// `MultiPolygon`. Returns `None` when there is nothing to merge.
    pub fn merge(parts: impl IntoIterator<Item = Geometry>) -> Option<Geometry> {
        let mut polygons = Vec::new();
        for part in parts {
            match part {
                Geometry::Polygon { coordinates } => polygons.push(coordinates),
                Geometry::MultiPolygon { coordinates } => polygons.extend(coordinates),
            }
        }

        match polygons.len() {
            0 => None,
            1 => polygons.pop().map(|coordinates| Geometry::Polygon { coordinates }),
            _ => Some(Geometry::MultiPolygon {
                coordinates: polygons,
            }),
        }
    }

    /// Number of polygons in this geometry.
    pub fn polygon_count(&self) -> usize {
        match self {
            Geometry::Polygon { .. } => 1,
            Geometry::MultiPolygon { coordinates } => coordinates.len(),
        }
    }
}

/// The geometry selected for an execution, with the CRS the service named.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureGeometry {
    pub geometry: Geometry,
    pub crs: Option<String>,
    pub feature_ids: Vec<String>,
}

impl FeatureGeometry {
    /// GeoJSON Feature document for this geometry.
    pub fn to_geojson(&self) -> serde_json::Value {
        let mut feature = serde_json::json!({
            "type": "Feature",
            "geometry": self.geometry,
            "properties": { "feature_ids": self.feature_ids },
        });
        if let Some(ref crs) = self.crs {
            feature["crs"] = serde_json::json!({
                "type": "name",
                "properties": { "name": crs },
            });
        }
        feature
    }
}

/// Split a comma-separated feature id string into ids.
///
/// Values are passed through unchanged: no trimming and no filtering of
/// empty entries.
pub fn split_feature_ids(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_string).collect()
}

/// WFS GetFeature base URL for a geoserver host; the typename is appended.
pub fn wfs_base_url(geoserver_host: &str) -> String {
    format!(
        "http://{}/geoserver/ows?service=WFS&version=1.0.0&request=GetFeature&typeName=",
        geoserver_host
    )
}

/// Full GetFeature URL for a typename and feature ids.
pub fn get_feature_url(base_url: &str, typename: &str, feature_ids: &[String]) -> String {
    let mut url = format!("{}{}", base_url, typename);
    if !feature_ids.is_empty() {
        url.push_str("&featureID=");
        url.push_str(&feature_ids.join(","));
    }
    url.push_str("&outputFormat=application/json");
    url
}

/// Source of polygon geometries.
#[async_trait]
pub trait FeatureService: Send + Sync {
    /// Fetch the merged geometry of the given features.
    async fn fetch_geometry(
        &self,
        ctx: &RequestContext,
        typename: &str,
        feature_ids: &[String],
    ) -> ProcessResult<FeatureGeometry>;
}

#[derive(Debug, Deserialize)]
struct FeatureCollectionBody {
    #[serde(default)]
    features: Vec<RawFeature>,
    #[serde(default)]
    crs: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    /// String or number.
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    geometry: Option<serde_json::Value>,
}

impl RawFeature {
    fn id(&self) -> Option<String> {
        match self.id.as_ref()? {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// CRS name from a GeoJSON `crs` member.
///
/// Handles the named form (`properties.name`) and the legacy EPSG form
/// (`properties.code`); anything else yields `None`.
fn crs_name(crs: &serde_json::Value) -> Option<String> {
    let properties = crs.get("properties")?;
    if let Some(name) = properties.get("name").and_then(|n| n.as_str()) {
        return Some(name.to_string());
    }
    match properties.get("code")? {
        serde_json::Value::String(code) => Some(format!("EPSG:{}", code)),
        serde_json::Value::Number(code) => Some(format!("EPSG:{}", code)),
        _ => None,
    }
}

/// Extract the merged geometry from a GeoJSON FeatureCollection body.
///
/// Features whose id is not in `feature_ids` are dropped; features without
/// an id are kept, since the service has already applied the filter.
/// Non-polygonal geometries are ignored.
pub fn geometry_from_geojson(body: &str, feature_ids: &[String]) -> ProcessResult<FeatureGeometry> {
    let collection: FeatureCollectionBody = serde_json::from_str(body)
        .map_err(|e| ProcessError::Geometry(format!("invalid GeoJSON response: {}", e)))?;

    let wanted: HashSet<&str> = feature_ids.iter().map(String::as_str).collect();
    let parts = collection
        .features
        .into_iter()
        .filter(|f| match f.id() {
            Some(id) => wanted.is_empty() || wanted.contains(id.as_str()),
            None => true,
        })
        .filter_map(|f| f.geometry)
        .filter_map(|g| serde_json::from_value::<Geometry>(g).ok());

    let geometry = Geometry::merge(parts).ok_or_else(|| {
        ProcessError::Geometry(format!(
            "no polygon features found for ids [{}]",
            feature_ids.join(",")
        ))
    })?;

    Ok(FeatureGeometry {
        geometry,
        crs: collection.crs.as_ref().and_then(crs_name),
        feature_ids: feature_ids.to_vec(),
    })
}

/// WFS client backed by `reqwest`.
pub struct WfsClient {
    client: Client,
    base_url: String,
}

impl WfsClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl FeatureService for WfsClient {
    async fn fetch_geometry(
        &self,
        ctx: &RequestContext,
        typename: &str,
        feature_ids: &[String],
    ) -> ProcessResult<FeatureGeometry> {
        let url = get_feature_url(&self.base_url, typename, feature_ids);
        debug!(parent: &ctx.span, url = %url, "Requesting features");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProcessError::Geometry(format!("WFS request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProcessError::Geometry(format!(
                "WFS returned HTTP {} for {}",
                status, typename
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProcessError::Geometry(format!("failed to read WFS response: {}", e)))?;

        let geometry = geometry_from_geojson(&body, feature_ids)?;
        info!(
            parent: &ctx.span,
            typename = %typename,
            features = feature_ids.len(),
            polygons = geometry.geometry.polygon_count(),
            "Fetched geometry"
        );
        Ok(geometry)
    }
}

//! Recent-detection listing and its GeoJSON rendering.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use firewatch_schema::{AggregatedCounts, Detection, DetectionStatus};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::{DetectionStore, VerificationLedger};

/// A listed detection and its current community counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionWithCounts {
    pub detection: Detection,
    pub counts: AggregatedCounts,
}

/// Non-dismissed detections created in the last `hours` with confidence at
/// least `min_confidence`, newest first.
pub fn list_detections<S>(
    store: &S,
    now: DateTime<Utc>,
    hours: u32,
    min_confidence: f64,
) -> Result<Vec<DetectionWithCounts>, LedgerError>
where
    S: DetectionStore + VerificationLedger + ?Sized,
{
    let since = now - Duration::hours(i64::from(hours));
    store
        .list_since(since, min_confidence, false)?
        .into_iter()
        .map(|detection| {
            let counts = store.counts(&detection.id)?;
            Ok(DetectionWithCounts { detection, counts })
        })
        .collect()
}

/// GeoJSON `FeatureCollection` of detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub geometry: PointGeometry,
    pub properties: FeatureProperties,
}

/// Point geometry; coordinates are `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: String,
    pub created_at: String,
    pub confidence: f64,
    pub source: String,
    pub fwi_bucket: u8,
    pub wind_dir_deg: u16,
    pub status: DetectionStatus,
    pub community: AggregatedCounts,
}

impl FeatureCollection {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("FeatureCollection serialization cannot fail")
    }
}

impl From<&DetectionWithCounts> for Feature {
    fn from(item: &DetectionWithCounts) -> Self {
        let d = &item.detection;
        Feature {
            kind: "Feature".to_string(),
            id: d.id.clone(),
            geometry: PointGeometry {
                kind: "Point".to_string(),
                coordinates: [d.lon, d.lat],
            },
            properties: FeatureProperties {
                id: d.id.clone(),
                created_at: d.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, false),
                confidence: d.confidence,
                source: d.source.clone(),
                fwi_bucket: d.fwi_bucket,
                wind_dir_deg: d.wind_dir_deg,
                status: d.status,
                community: item.counts,
            },
        }
    }
}

/// Render listed detections as a GeoJSON feature collection.
pub fn to_feature_collection(items: &[DetectionWithCounts]) -> FeatureCollection {
    FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features: items.iter().map(Feature::from).collect(),
    }
}

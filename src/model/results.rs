//! `ShipsResults` — the packaged end-of-run artifact and its wire form.

use crate::config::defaults::{SUMMARY_KV_SENTINEL, TRAJECTORY_BLOB_INLINE_LIMIT_BYTES};
use crate::error::{SimError, SimResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;

/// Ordered key/value summary, preserved verbatim on the wire so that
/// `from_json(to_json(r)) == r`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipsResults {
    pub summary_kv: Vec<(String, String)>,
    pub trajectory_blob: Option<Vec<u8>>,
    pub trajectory_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Wire-form mirror of [`ShipsResults`], matching spec.md §6 exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ShipsResultsWire {
    #[serde(rename = "summaryData")]
    summary_data: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(rename = "trajectoryFileName")]
    trajectory_file_name: String,
    #[serde(rename = "summaryFileName")]
    summary_file_name: String,
    #[serde(rename = "trajectoryFileDataIncluded")]
    trajectory_file_data_included: bool,
    #[serde(rename = "trajectoryFileData", skip_serializing_if = "Option::is_none")]
    trajectory_file_data: Option<String>,
}

impl ShipsResults {
    pub fn new(
        summary_kv: Vec<(String, String)>,
        trajectory_blob: Option<Vec<u8>>,
        trajectory_path: PathBuf,
        summary_path: PathBuf,
    ) -> Self {
        Self {
            summary_kv,
            trajectory_blob,
            trajectory_path,
            summary_path,
        }
    }

    /// Compress raw trajectory CSV bytes using deflate at the highest
    /// compression level, per spec.md §6.
    pub fn compress_trajectory(raw: &[u8]) -> SimResult<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(raw)?;
        Ok(encoder.finish()?)
    }

    pub fn decompress_trajectory(blob: &[u8]) -> SimResult<Vec<u8>> {
        let mut decoder = DeflateDecoder::new(blob);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Flatten the `\x1D :`-sentinel-joined wire text into ordered pairs.
    pub fn summary_text_to_kv(text: &str) -> Vec<(String, String)> {
        text.lines()
            .filter_map(|line| {
                line.split_once(SUMMARY_KV_SENTINEL)
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            })
            .collect()
    }

    pub fn kv_to_summary_text(kv: &[(String, String)]) -> String {
        kv.iter()
            .map(|(k, v)| format!("{k}{SUMMARY_KV_SENTINEL}{v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> SimResult<serde_json::Value> {
        let summary_data = self
            .summary_kv
            .iter()
            .map(|(k, v)| {
                let mut m = serde_json::Map::new();
                m.insert(k.clone(), serde_json::Value::String(v.clone()));
                m
            })
            .collect();

        let include_blob = self
            .trajectory_blob
            .as_ref()
            .is_some_and(|b| b.len() <= TRAJECTORY_BLOB_INLINE_LIMIT_BYTES);

        let wire = ShipsResultsWire {
            summary_data,
            trajectory_file_name: self
                .trajectory_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            summary_file_name: self
                .summary_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            trajectory_file_data_included: include_blob,
            trajectory_file_data: if include_blob {
                self.trajectory_blob.as_ref().map(|b| BASE64.encode(b))
            } else {
                None
            },
        };

        Ok(serde_json::to_value(wire)?)
    }

    pub fn from_json(value: serde_json::Value) -> SimResult<Self> {
        let wire: ShipsResultsWire = serde_json::from_value(value)
            .map_err(|e| SimError::Protocol(format!("malformed ShipsResults: {e}")))?;

        let summary_kv = wire
            .summary_data
            .into_iter()
            .flat_map(|m| {
                m.into_iter().map(|(k, v)| {
                    let value_str = match v {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (k, value_str)
                })
            })
            .collect();

        let trajectory_blob = if wire.trajectory_file_data_included {
            match wire.trajectory_file_data {
                Some(encoded) => Some(
                    BASE64
                        .decode(encoded)
                        .map_err(|e| SimError::Protocol(format!("bad base64 trajectory blob: {e}")))?,
                ),
                None => {
                    return Err(SimError::Protocol(
                        "trajectoryFileDataIncluded=true but trajectoryFileData missing".into(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(Self {
            summary_kv,
            trajectory_blob,
            trajectory_path: PathBuf::from(wire.trajectory_file_name),
            summary_path: PathBuf::from(wire.summary_file_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(blob_len: usize) -> ShipsResults {
        ShipsResults::new(
            vec![
                ("shipsReachedDestination".to_string(), "2".to_string()),
                ("averageSpeedKn".to_string(), "12.5".to_string()),
            ],
            Some(vec![b'x'; blob_len]),
            PathBuf::from("shipTrajectory_1.csv"),
            PathBuf::from("shipSummary_1.txt"),
        )
    }

    #[test]
    fn round_trip_small_blob_preserves_everything() {
        let original = sample(128);
        let wire = original.to_json().unwrap();
        let restored = ShipsResults::from_json(wire).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn round_trip_oversized_blob_drops_only_the_blob() {
        let original = sample(TRAJECTORY_BLOB_INLINE_LIMIT_BYTES + 1);
        let wire = original.to_json().unwrap();
        assert_eq!(wire["trajectoryFileDataIncluded"], false);
        let restored = ShipsResults::from_json(wire).unwrap();
        assert_eq!(restored.trajectory_blob, None);
        assert_eq!(restored.summary_kv, original.summary_kv);
        assert_eq!(restored.trajectory_path, original.trajectory_path);
    }

    #[test]
    fn compress_decompress_round_trip() {
        let raw = b"TStep_s,ShipNo,Speed_knots\n1.0,ship-1,12.0\n";
        let blob = ShipsResults::compress_trajectory(raw).unwrap();
        let restored = ShipsResults::decompress_trajectory(&blob).unwrap();
        assert_eq!(restored, raw);
    }

    #[test]
    fn summary_kv_text_round_trip() {
        let kv = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        let text = ShipsResults::kv_to_summary_text(&kv);
        let restored = ShipsResults::summary_text_to_kv(&text);
        assert_eq!(restored, kv);
    }
}

//! The structured-record and wire-object input shapes: ships described as
//! string-keyed maps (spec.md §4.B shape 2) or as JSON objects arriving
//! over the broker (shape 3). Both funnel through the same
//! [`apply_field`] converters as the line-oriented file format.

use super::schema::{
    apply_field, is_na, json_value_to_field_string, synthetic_resistance_path, ShipFieldBuilder,
    SCHEMA,
};
use crate::error::{SimError, SimResult};
use crate::model::ShipParameters;
use std::collections::HashMap;

/// Build one ship from a string-keyed record. A missing key is treated the
/// same as an explicit `"na"` and must be optional.
pub fn parse_record(
    record: &HashMap<String, String>,
    resistance_only: bool,
) -> SimResult<ShipParameters> {
    let mut builder = ShipFieldBuilder::default();
    for field in SCHEMA {
        let raw = record.get(field.name).map(String::as_str);
        match raw {
            Some(value) => {
                if field.name == "Path" && resistance_only && is_na(value) {
                    builder.path = Some(synthetic_resistance_path());
                    continue;
                }
                if field.is_optional && is_na(value) {
                    continue;
                }
                apply_field(&mut builder, field.name, value)?;
            }
            None if field.name == "Path" && resistance_only => {
                builder.path = Some(synthetic_resistance_path());
            }
            None if field.is_optional => continue,
            None => {
                return Err(SimError::Domain(format!(
                    "missing required field: {}",
                    field.name
                )))
            }
        }
    }
    builder.build()
}

pub fn parse_records(
    records: &[HashMap<String, String>],
    resistance_only: bool,
) -> SimResult<Vec<ShipParameters>> {
    records
        .iter()
        .map(|r| parse_record(r, resistance_only))
        .collect()
}

/// Build one ship from a JSON object keyed by field name, normalizing each
/// value to the canonical string syntax before dispatching to the shared
/// converter table.
pub fn parse_json_object(
    obj: &serde_json::Map<String, serde_json::Value>,
    resistance_only: bool,
) -> SimResult<ShipParameters> {
    let mut builder = ShipFieldBuilder::default();
    for field in SCHEMA {
        let raw = obj.get(field.name);
        match raw {
            Some(serde_json::Value::Null) | None => {
                if field.name == "Path" && resistance_only {
                    builder.path = Some(synthetic_resistance_path());
                } else if field.is_optional {
                    continue;
                } else {
                    return Err(SimError::Domain(format!(
                        "missing required field: {}",
                        field.name
                    )));
                }
            }
            Some(value) => {
                let as_string = json_value_to_field_string(value);
                apply_field(&mut builder, field.name, &as_string)?;
            }
        }
    }
    builder.build()
}

/// Parse the `{"ships": [...]}` wire object shape (spec.md §4.D
/// `addShipsToSimulator`, JSON-object variant).
pub fn parse_wire_object(
    value: &serde_json::Value,
    resistance_only: bool,
) -> SimResult<Vec<ShipParameters>> {
    let ships = value
        .get("ships")
        .and_then(|v| v.as_array())
        .ok_or_else(|| SimError::Protocol("wire object missing \"ships\" array".to_string()))?;

    ships
        .iter()
        .map(|entry| {
            let obj = entry
                .as_object()
                .ok_or_else(|| SimError::Protocol("ship entry is not a JSON object".to_string()))?;
            parse_json_object(obj, resistance_only)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("ID".to_string(), "ship-1".to_string());
        m.insert("Path".to_string(), "0,0;1,1".to_string());
        m.insert("MaxSpeed".to_string(), "12".to_string());
        m.insert("WaterlineLength".to_string(), "100".to_string());
        m.insert("LengthBetweenPerpendiculars".to_string(), "98".to_string());
        m.insert("Beam".to_string(), "20".to_string());
        m.insert("DraftAtForward".to_string(), "6".to_string());
        m.insert("DraftAtAft".to_string(), "6.2".to_string());
        m.insert(
            "ShipAndCargoAreaAboveWaterline".to_string(),
            "500".to_string(),
        );
        m.insert(
            "BulbousBowTransverseAreaCenterHeight".to_string(),
            "2".to_string(),
        );
        m.insert("BulbousBowTransverseArea".to_string(), "10".to_string());
        m.insert("ImmersedTransomArea".to_string(), "5".to_string());
        m.insert("SurfaceRoughness".to_string(), "0.00015".to_string());
        m.insert("LongitudinalBuoyancyCenter".to_string(), "0.5".to_string());
        m.insert("SternShapeParam".to_string(), "normal".to_string());
        m.insert("FuelType".to_string(), "HFO".to_string());
        m.insert("TankSize".to_string(), "50000".to_string());
        m.insert(
            "TankInitialCapacityPercentage".to_string(),
            "90".to_string(),
        );
        m.insert("TankDepthOfDischarge".to_string(), "10".to_string());
        m.insert("EnginesCountPerPropeller".to_string(), "1".to_string());
        m.insert(
            "EngineOperationalPowerSettings".to_string(),
            "1000,2000,3000,4000".to_string(),
        );
        m.insert(
            "EngineTierIIPropertiesPoints".to_string(),
            "500,100,0.9;1000,200,0.92".to_string(),
        );
        m.insert("GearboxRatio".to_string(), "0.98".to_string());
        m.insert("GearboxEfficiency".to_string(), "0.97".to_string());
        m.insert("ShaftEfficiency".to_string(), "0.99".to_string());
        m.insert("PropellerCount".to_string(), "1".to_string());
        m.insert("PropellerDiameter".to_string(), "5".to_string());
        m.insert("PropellerPitch".to_string(), "4".to_string());
        m.insert("PropellerBladesCount".to_string(), "4".to_string());
        m.insert(
            "PropellerExpandedAreaRatio".to_string(),
            "0.6".to_string(),
        );
        m.insert("VesselWeight".to_string(), "20000".to_string());
        m.insert("CargoWeight".to_string(), "5000".to_string());
        m
    }

    #[test]
    fn record_missing_optional_field_succeeds() {
        let params = parse_record(&full_record(), false).unwrap();
        assert_eq!(params.id, "ship-1");
        assert!(params.volumetric_displacement_m3.is_none());
    }

    #[test]
    fn record_missing_required_field_fails() {
        let mut record = full_record();
        record.remove("MaxSpeed");
        assert!(parse_record(&record, false).is_err());
    }

    #[test]
    fn wire_object_parses_nested_json_arrays() {
        let mut obj: serde_json::Map<String, serde_json::Value> = full_record()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        obj.insert(
            "Path".to_string(),
            serde_json::json!([[0.0, 0.0], [1.0, 1.0]]),
        );
        let value = serde_json::json!({ "ships": [serde_json::Value::Object(obj)] });
        let ships = parse_wire_object(&value, false).unwrap();
        assert_eq!(ships.len(), 1);
        assert_eq!(ships[0].path.len(), 2);
    }

    #[test]
    fn wire_object_without_ships_key_fails() {
        let value = serde_json::json!({ "notShips": [] });
        assert!(parse_wire_object(&value, false).is_err());
    }
}

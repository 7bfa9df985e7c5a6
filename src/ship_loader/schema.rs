//! The ordered parameter schema — single source of truth for recognized
//! ship fields, their column order, and whether each is optional.
//!
//! All three loader input shapes (line-oriented file, structured records,
//! wire object) funnel through [`apply_field`], keeping field-name-to-type
//! conversion in exactly one place, per spec.md §4.B.

use crate::error::{SimError, SimResult};
use crate::model::ship::GeoPoint;
use crate::model::{Appendage, EnginePowerPoints, EnginePropertyPoint, FuelType, SternShapeParam};
use serde_json::Value;
use std::collections::HashMap;

/// One recognized field: its name (as it appears in file headers, record
/// keys, and wire-object keys) and whether `"na"` is accepted for it.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub is_optional: bool,
}

/// Column order, exactly as enumerated in spec.md §4.B.
pub const SCHEMA: &[FieldSpec] = &[
    spec("ID", false),
    spec("Path", false),
    spec("MaxSpeed", false),
    spec("WaterlineLength", false),
    spec("LengthBetweenPerpendiculars", false),
    spec("Beam", false),
    spec("DraftAtForward", false),
    spec("DraftAtAft", false),
    spec("VolumetricDisplacement", true),
    spec("WettedHullSurface", true),
    spec("ShipAndCargoAreaAboveWaterline", false),
    spec("BulbousBowTransverseAreaCenterHeight", false),
    spec("BulbousBowTransverseArea", false),
    spec("ImmersedTransomArea", false),
    spec("HalfWaterlineEntranceAngle", true),
    spec("SurfaceRoughness", false),
    spec("LongitudinalBuoyancyCenter", false),
    spec("SternShapeParam", false),
    spec("MidshipSectionCoef", true),
    spec("WaterplaneAreaCoef", true),
    spec("PrismaticCoef", true),
    spec("BlockCoef", true),
    spec("FuelType", false),
    spec("TankSize", false),
    spec("TankInitialCapacityPercentage", false),
    spec("TankDepthOfDischarge", false),
    spec("EnginesCountPerPropeller", false),
    spec("EngineOperationalPowerSettings", false),
    spec("EngineTierIIPropertiesPoints", false),
    spec("EngineTierIIIPropertiesPoints", true),
    spec("GearboxRatio", false),
    spec("GearboxEfficiency", false),
    spec("ShaftEfficiency", false),
    spec("PropellerCount", false),
    spec("PropellerDiameter", false),
    spec("PropellerPitch", false),
    spec("PropellerBladesCount", false),
    spec("PropellerExpandedAreaRatio", false),
    spec("StopIfNoEnergy", true),
    spec("MaxRudderAngle", true),
    spec("VesselWeight", false),
    spec("CargoWeight", false),
    spec("AppendagesWettedSurfaces", true),
];

const fn spec(name: &'static str, is_optional: bool) -> FieldSpec {
    FieldSpec { name, is_optional }
}

/// `"na"` (case-insensitive) means "unset" for an optional field.
pub fn is_na(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("na")
}

fn parse_f64(raw: &str, field: &str) -> SimResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| SimError::Domain(format!("field {field}: not a number: {raw:?}")))
}

fn parse_f64_opt(raw: &str, field: &str) -> SimResult<Option<f64>> {
    if is_na(raw) {
        Ok(None)
    } else {
        Ok(Some(parse_f64(raw, field)?))
    }
}

fn parse_u32(raw: &str, field: &str) -> SimResult<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| SimError::Domain(format!("field {field}: not an integer: {raw:?}")))
}

fn parse_bool_opt(raw: &str, field: &str) -> SimResult<Option<bool>> {
    if is_na(raw) {
        return Ok(None);
    }
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        other => Err(SimError::Domain(format!(
            "field {field}: not a boolean: {other:?}"
        ))),
    }
}

/// Parse a `"lon,lat;lon,lat;..."` path into WGS-84-checked points.
pub fn parse_path(raw: &str) -> SimResult<Vec<GeoPoint>> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, ',');
            let lon = parts
                .next()
                .ok_or_else(|| SimError::Domain(format!("malformed path point: {pair:?}")))?;
            let lat = parts
                .next()
                .ok_or_else(|| SimError::Domain(format!("malformed path point: {pair:?}")))?;
            GeoPoint::new(parse_f64(lon, "Path.lon")?, parse_f64(lat, "Path.lat")?)
        })
        .collect()
}

/// Synthetic two-point path used for resistance-only studies when `Path`
/// is omitted (spec.md §4.B validation rules).
pub fn synthetic_resistance_path() -> Vec<GeoPoint> {
    vec![
        GeoPoint::new(0.0, 0.0).expect("0,0 is always valid"),
        GeoPoint::new(0.0, 1.0).expect("0,1 is always valid"),
    ]
}

fn parse_engine_power_points(raw: &str) -> SimResult<EnginePowerPoints> {
    let values: SimResult<Vec<f64>> = raw
        .split(',')
        .map(|v| parse_f64(v, "EngineOperationalPowerSettings"))
        .collect();
    EnginePowerPoints::from_values(&values?)
}

fn parse_engine_property_points(raw: &str) -> SimResult<Vec<EnginePropertyPoint>> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|triple| {
            let values: SimResult<Vec<f64>> = triple
                .split(',')
                .map(|v| parse_f64(v, "EngineTierPropertiesPoints"))
                .collect();
            EnginePropertyPoint::from_triple(&values?)
        })
        .collect()
}

fn parse_appendages(raw: &str) -> SimResult<HashMap<Appendage, f64>> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, ',');
            let name = parts
                .next()
                .ok_or_else(|| SimError::Domain(format!("malformed appendage entry: {pair:?}")))?;
            let value = parts
                .next()
                .ok_or_else(|| SimError::Domain(format!("malformed appendage entry: {pair:?}")))?;
            Ok((name.parse::<Appendage>()?, parse_f64(value, "AppendagesWettedSurfaces")?))
        })
        .collect()
}

/// Mutable accumulator applied field-by-field in schema order, then
/// finalized by [`crate::ship_loader::ShipLoader`] into a `ShipParameters`.
#[derive(Debug, Default)]
pub struct ShipFieldBuilder {
    pub id: Option<String>,
    pub path: Option<Vec<GeoPoint>>,
    pub max_speed_kn: Option<f64>,
    pub waterline_length_m: Option<f64>,
    pub length_between_perpendiculars_m: Option<f64>,
    pub beam_m: Option<f64>,
    pub draft_at_forward_m: Option<f64>,
    pub draft_at_aft_m: Option<f64>,
    pub volumetric_displacement_m3: Option<f64>,
    pub wetted_hull_surface_m2: Option<f64>,
    pub ship_and_cargo_area_above_waterline_m2: Option<f64>,
    pub bulbous_bow_transverse_area_center_height_m: Option<f64>,
    pub bulbous_bow_transverse_area_m2: Option<f64>,
    pub immersed_transom_area_m2: Option<f64>,
    pub half_waterline_entrance_angle_deg: Option<f64>,
    pub surface_roughness_nm: Option<f64>,
    pub longitudinal_buoyancy_center: Option<f64>,
    pub stern_shape_param: Option<SternShapeParam>,
    pub midship_section_coef: Option<f64>,
    pub waterplane_area_coef: Option<f64>,
    pub prismatic_coef: Option<f64>,
    pub block_coef: Option<f64>,
    pub fuel_type: Option<FuelType>,
    pub tank_size_l: Option<f64>,
    pub tank_initial_capacity_percentage: Option<f64>,
    pub tank_depth_of_discharge: Option<f64>,
    pub engines_count_per_propeller: Option<u32>,
    pub engine_operational_power_settings: Option<EnginePowerPoints>,
    pub engine_tier_ii_properties_points: Option<Vec<EnginePropertyPoint>>,
    pub engine_tier_iii_properties_points: Option<Vec<EnginePropertyPoint>>,
    pub gearbox_ratio: Option<f64>,
    pub gearbox_efficiency: Option<f64>,
    pub shaft_efficiency: Option<f64>,
    pub propeller_count: Option<u32>,
    pub propeller_diameter_m: Option<f64>,
    pub propeller_pitch_m: Option<f64>,
    pub propeller_blades_count: Option<u32>,
    pub propeller_expanded_area_ratio: Option<f64>,
    pub stop_if_no_energy: Option<bool>,
    pub max_rudder_angle_deg: Option<f64>,
    pub vessel_weight_tons: Option<f64>,
    pub cargo_weight_tons: Option<f64>,
    pub appendages_wetted_surfaces_m2: Option<HashMap<Appendage, f64>>,
}

const KNOTS_TO_MPS: f64 = 0.514_444;

/// Apply one `(field_name, raw_value)` pair to the builder. `raw` may come
/// from a file column, a string-keyed record, or a JSON value normalized
/// to its canonical string form by [`json_value_to_field_string`].
pub fn apply_field(builder: &mut ShipFieldBuilder, name: &str, raw: &str) -> SimResult<()> {
    match name {
        "ID" => builder.id = Some(raw.trim().to_string()),
        "Path" => builder.path = Some(parse_path(raw)?),
        "MaxSpeed" => builder.max_speed_kn = Some(parse_f64(raw, name)?),
        "WaterlineLength" => builder.waterline_length_m = Some(parse_f64(raw, name)?),
        "LengthBetweenPerpendiculars" => {
            builder.length_between_perpendiculars_m = Some(parse_f64(raw, name)?)
        }
        "Beam" => builder.beam_m = Some(parse_f64(raw, name)?),
        "DraftAtForward" => builder.draft_at_forward_m = Some(parse_f64(raw, name)?),
        "DraftAtAft" => builder.draft_at_aft_m = Some(parse_f64(raw, name)?),
        "VolumetricDisplacement" => builder.volumetric_displacement_m3 = parse_f64_opt(raw, name)?,
        "WettedHullSurface" => builder.wetted_hull_surface_m2 = parse_f64_opt(raw, name)?,
        "ShipAndCargoAreaAboveWaterline" => {
            builder.ship_and_cargo_area_above_waterline_m2 = Some(parse_f64(raw, name)?)
        }
        "BulbousBowTransverseAreaCenterHeight" => {
            builder.bulbous_bow_transverse_area_center_height_m = Some(parse_f64(raw, name)?)
        }
        "BulbousBowTransverseArea" => {
            builder.bulbous_bow_transverse_area_m2 = Some(parse_f64(raw, name)?)
        }
        "ImmersedTransomArea" => builder.immersed_transom_area_m2 = Some(parse_f64(raw, name)?),
        "HalfWaterlineEntranceAngle" => {
            builder.half_waterline_entrance_angle_deg = parse_f64_opt(raw, name)?
        }
        "SurfaceRoughness" => builder.surface_roughness_nm = Some(parse_f64(raw, name)?),
        "LongitudinalBuoyancyCenter" => {
            builder.longitudinal_buoyancy_center = Some(parse_f64(raw, name)?)
        }
        "SternShapeParam" => builder.stern_shape_param = Some(raw.parse()?),
        "MidshipSectionCoef" => builder.midship_section_coef = parse_f64_opt(raw, name)?,
        "WaterplaneAreaCoef" => builder.waterplane_area_coef = parse_f64_opt(raw, name)?,
        "PrismaticCoef" => builder.prismatic_coef = parse_f64_opt(raw, name)?,
        "BlockCoef" => builder.block_coef = parse_f64_opt(raw, name)?,
        "FuelType" => builder.fuel_type = Some(raw.parse()?),
        "TankSize" => builder.tank_size_l = Some(parse_f64(raw, name)?),
        "TankInitialCapacityPercentage" => {
            builder.tank_initial_capacity_percentage = Some(parse_f64(raw, name)?)
        }
        "TankDepthOfDischarge" => builder.tank_depth_of_discharge = Some(parse_f64(raw, name)?),
        "EnginesCountPerPropeller" => {
            builder.engines_count_per_propeller = Some(parse_u32(raw, name)?)
        }
        "EngineOperationalPowerSettings" => {
            builder.engine_operational_power_settings = Some(parse_engine_power_points(raw)?)
        }
        "EngineTierIIPropertiesPoints" => {
            builder.engine_tier_ii_properties_points = Some(parse_engine_property_points(raw)?)
        }
        "EngineTierIIIPropertiesPoints" => {
            builder.engine_tier_iii_properties_points = if is_na(raw) {
                None
            } else {
                Some(parse_engine_property_points(raw)?)
            }
        }
        "GearboxRatio" => builder.gearbox_ratio = Some(parse_f64(raw, name)?),
        "GearboxEfficiency" => builder.gearbox_efficiency = Some(parse_f64(raw, name)?),
        "ShaftEfficiency" => builder.shaft_efficiency = Some(parse_f64(raw, name)?),
        "PropellerCount" => builder.propeller_count = Some(parse_u32(raw, name)?),
        "PropellerDiameter" => builder.propeller_diameter_m = Some(parse_f64(raw, name)?),
        "PropellerPitch" => builder.propeller_pitch_m = Some(parse_f64(raw, name)?),
        "PropellerBladesCount" => builder.propeller_blades_count = Some(parse_u32(raw, name)?),
        "PropellerExpandedAreaRatio" => {
            builder.propeller_expanded_area_ratio = Some(parse_f64(raw, name)?)
        }
        "StopIfNoEnergy" => builder.stop_if_no_energy = parse_bool_opt(raw, name)?,
        "MaxRudderAngle" => builder.max_rudder_angle_deg = parse_f64_opt(raw, name)?,
        "VesselWeight" => builder.vessel_weight_tons = Some(parse_f64(raw, name)?),
        "CargoWeight" => builder.cargo_weight_tons = Some(parse_f64(raw, name)?),
        "AppendagesWettedSurfaces" => {
            builder.appendages_wetted_surfaces_m2 = if is_na(raw) {
                None
            } else {
                Some(parse_appendages(raw)?)
            }
        }
        other => {
            return Err(SimError::Protocol(format!(
                "unrecognized ship parameter: {other}"
            )))
        }
    }
    Ok(())
}

impl ShipFieldBuilder {
    /// Finalize into typed `ShipParameters`, failing if any required field
    /// was never set.
    pub fn build(self) -> SimResult<crate::model::ShipParameters> {
        macro_rules! require {
            ($field:ident, $name:expr) => {
                self.$field
                    .ok_or_else(|| SimError::Domain(format!("missing required field: {}", $name)))?
            };
        }

        Ok(crate::model::ShipParameters {
            id: require!(id, "ID"),
            path: require!(path, "Path"),
            max_speed_mps: require!(max_speed_kn, "MaxSpeed") * KNOTS_TO_MPS,
            waterline_length_m: require!(waterline_length_m, "WaterlineLength"),
            length_between_perpendiculars_m: require!(
                length_between_perpendiculars_m,
                "LengthBetweenPerpendiculars"
            ),
            beam_m: require!(beam_m, "Beam"),
            draft_at_forward_m: require!(draft_at_forward_m, "DraftAtForward"),
            draft_at_aft_m: require!(draft_at_aft_m, "DraftAtAft"),
            volumetric_displacement_m3: self.volumetric_displacement_m3,
            wetted_hull_surface_m2: self.wetted_hull_surface_m2,
            ship_and_cargo_area_above_waterline_m2: require!(
                ship_and_cargo_area_above_waterline_m2,
                "ShipAndCargoAreaAboveWaterline"
            ),
            bulbous_bow_transverse_area_center_height_m: require!(
                bulbous_bow_transverse_area_center_height_m,
                "BulbousBowTransverseAreaCenterHeight"
            ),
            bulbous_bow_transverse_area_m2: require!(
                bulbous_bow_transverse_area_m2,
                "BulbousBowTransverseArea"
            ),
            immersed_transom_area_m2: require!(immersed_transom_area_m2, "ImmersedTransomArea"),
            half_waterline_entrance_angle_deg: self.half_waterline_entrance_angle_deg,
            surface_roughness_nm: require!(surface_roughness_nm, "SurfaceRoughness"),
            longitudinal_buoyancy_center: require!(
                longitudinal_buoyancy_center,
                "LongitudinalBuoyancyCenter"
            ),
            stern_shape_param: require!(stern_shape_param, "SternShapeParam"),
            midship_section_coef: self.midship_section_coef,
            waterplane_area_coef: self.waterplane_area_coef,
            prismatic_coef: self.prismatic_coef,
            block_coef: self.block_coef,
            fuel_type: require!(fuel_type, "FuelType"),
            tank_size_l: require!(tank_size_l, "TankSize"),
            tank_initial_capacity_percentage: require!(
                tank_initial_capacity_percentage,
                "TankInitialCapacityPercentage"
            ),
            tank_depth_of_discharge: require!(tank_depth_of_discharge, "TankDepthOfDischarge"),
            engines_count_per_propeller: require!(
                engines_count_per_propeller,
                "EnginesCountPerPropeller"
            ),
            engine_operational_power_settings: require!(
                engine_operational_power_settings,
                "EngineOperationalPowerSettings"
            ),
            engine_tier_ii_properties_points: require!(
                engine_tier_ii_properties_points,
                "EngineTierIIPropertiesPoints"
            ),
            engine_tier_iii_properties_points: self.engine_tier_iii_properties_points,
            gearbox_ratio: require!(gearbox_ratio, "GearboxRatio"),
            gearbox_efficiency: require!(gearbox_efficiency, "GearboxEfficiency"),
            shaft_efficiency: require!(shaft_efficiency, "ShaftEfficiency"),
            propeller_count: require!(propeller_count, "PropellerCount"),
            propeller_diameter_m: require!(propeller_diameter_m, "PropellerDiameter"),
            propeller_pitch_m: require!(propeller_pitch_m, "PropellerPitch"),
            propeller_blades_count: require!(propeller_blades_count, "PropellerBladesCount"),
            propeller_expanded_area_ratio: require!(
                propeller_expanded_area_ratio,
                "PropellerExpandedAreaRatio"
            ),
            stop_if_no_energy: self.stop_if_no_energy,
            max_rudder_angle_deg: self.max_rudder_angle_deg,
            vessel_weight_tons: require!(vessel_weight_tons, "VesselWeight"),
            cargo_weight_tons: require!(cargo_weight_tons, "CargoWeight"),
            appendages_wetted_surfaces_m2: self.appendages_wetted_surfaces_m2,
        })
    }
}

/// Normalize a JSON value into the same string syntax used by the
/// line-oriented file format, so the wire-object shape can be funneled
/// through the same [`apply_field`] converters.
pub fn json_value_to_field_string(value: &Value) -> String {
    match value {
        Value::Null => "na".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(inner) => inner
                    .iter()
                    .map(json_value_to_field_string)
                    .collect::<Vec<_>>()
                    .join(","),
                other => json_value_to_field_string(other),
            })
            .collect::<Vec<_>>()
            .join(";"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k},{}", json_value_to_field_string(v)))
            .collect::<Vec<_>>()
            .join(";"),
    }
}

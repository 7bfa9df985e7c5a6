//! Shared data model: the boundary capabilities (`Ship`, `Network`) and the
//! value types that cross between the simulator, the ship loader, and the
//! coordinator.

pub mod network;
pub mod results;
pub mod ship;

pub use network::{Network, StaticNetwork};
pub use results::ShipsResults;
pub use ship::{
    CriticalPoints, EnvironmentSample, GeoPoint, PathLine, Ship, ShipHandle, StaticShip,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stern shape parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SternShapeParam {
    Normal,
    VShaped,
    UShaped,
    PramWithGondola,
    PramWithoutGondola,
}

impl std::str::FromStr for SternShapeParam {
    type Err = crate::error::SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "v-shaped" | "vshaped" => Ok(Self::VShaped),
            "u-shaped" | "ushaped" => Ok(Self::UShaped),
            "pram-with-gondola" | "pramwithgondola" => Ok(Self::PramWithGondola),
            "pram-without-gondola" | "pramwithoutgondola" => Ok(Self::PramWithoutGondola),
            other => Err(crate::error::SimError::Domain(format!(
                "unrecognized SternShapeParam: {other}"
            ))),
        }
    }
}

/// Fuel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    HFO,
    MDO,
    MGO,
    LNG,
    Methanol,
    Hydrogen,
}

impl std::str::FromStr for FuelType {
    type Err = crate::error::SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HFO" => Ok(Self::HFO),
            "MDO" => Ok(Self::MDO),
            "MGO" => Ok(Self::MGO),
            "LNG" => Ok(Self::LNG),
            "METHANOL" => Ok(Self::Methanol),
            "HYDROGEN" => Ok(Self::Hydrogen),
            other => Err(crate::error::SimError::Domain(format!(
                "unrecognized FuelType: {other}"
            ))),
        }
    }
}

/// Hull appendage, used as the key of `AppendagesWettedSurfaces`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Appendage {
    Rudder,
    Skeg,
    ShaftBrackets,
    Stabilizers,
    BilgeKeels,
}

impl std::str::FromStr for Appendage {
    type Err = crate::error::SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rudder" => Ok(Self::Rudder),
            "skeg" => Ok(Self::Skeg),
            "shaftbrackets" | "shaft-brackets" => Ok(Self::ShaftBrackets),
            "stabilizers" => Ok(Self::Stabilizers),
            "bilgekeels" | "bilge-keels" => Ok(Self::BilgeKeels),
            other => Err(crate::error::SimError::Domain(format!(
                "unrecognized Appendage: {other}"
            ))),
        }
    }
}

/// Engine power set-points, L1 through L4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnginePowerPoints {
    pub l1_kw: f64,
    pub l2_kw: f64,
    pub l3_kw: f64,
    pub l4_kw: f64,
}

impl EnginePowerPoints {
    pub fn from_values(values: &[f64]) -> crate::error::SimResult<Self> {
        if values.len() != 4 {
            return Err(crate::error::SimError::Domain(format!(
                "EngineOperationalPowerSettings must have exactly 4 entries, got {}",
                values.len()
            )));
        }
        Ok(Self {
            l1_kw: values[0],
            l2_kw: values[1],
            l3_kw: values[2],
            l4_kw: values[3],
        })
    }
}

/// A single (power, rpm, efficiency) operating point for an engine tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnginePropertyPoint {
    pub power_kw: f64,
    pub rpm: f64,
    pub efficiency: f64,
}

impl EnginePropertyPoint {
    pub fn from_triple(values: &[f64]) -> crate::error::SimResult<Self> {
        if values.len() != 3 {
            return Err(crate::error::SimError::Domain(format!(
                "engine property point must have exactly 3 values, got {}",
                values.len()
            )));
        }
        Ok(Self {
            power_kw: values[0],
            rpm: values[1],
            efficiency: values[2],
        })
    }
}

/// The fully-typed parameter set for one ship definition, as produced by
/// the ship loader before binding to a concrete `Ship` implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipParameters {
    pub id: String,
    pub path: Vec<ship::GeoPoint>,
    pub max_speed_mps: f64,
    pub waterline_length_m: f64,
    pub length_between_perpendiculars_m: f64,
    pub beam_m: f64,
    pub draft_at_forward_m: f64,
    pub draft_at_aft_m: f64,
    pub volumetric_displacement_m3: Option<f64>,
    pub wetted_hull_surface_m2: Option<f64>,
    pub ship_and_cargo_area_above_waterline_m2: f64,
    pub bulbous_bow_transverse_area_center_height_m: f64,
    pub bulbous_bow_transverse_area_m2: f64,
    pub immersed_transom_area_m2: f64,
    pub half_waterline_entrance_angle_deg: Option<f64>,
    pub surface_roughness_nm: f64,
    pub longitudinal_buoyancy_center: f64,
    pub stern_shape_param: SternShapeParam,
    pub midship_section_coef: Option<f64>,
    pub waterplane_area_coef: Option<f64>,
    pub prismatic_coef: Option<f64>,
    pub block_coef: Option<f64>,
    pub fuel_type: FuelType,
    pub tank_size_l: f64,
    pub tank_initial_capacity_percentage: f64,
    pub tank_depth_of_discharge: f64,
    pub engines_count_per_propeller: u32,
    pub engine_operational_power_settings: EnginePowerPoints,
    pub engine_tier_ii_properties_points: Vec<EnginePropertyPoint>,
    pub engine_tier_iii_properties_points: Option<Vec<EnginePropertyPoint>>,
    pub gearbox_ratio: f64,
    pub gearbox_efficiency: f64,
    pub shaft_efficiency: f64,
    pub propeller_count: u32,
    pub propeller_diameter_m: f64,
    pub propeller_pitch_m: f64,
    pub propeller_blades_count: u32,
    pub propeller_expanded_area_ratio: f64,
    pub stop_if_no_energy: Option<bool>,
    pub max_rudder_angle_deg: Option<f64>,
    pub vessel_weight_tons: f64,
    pub cargo_weight_tons: f64,
    pub appendages_wetted_surfaces_m2: Option<HashMap<Appendage, f64>>,
}

//! The `Ship` boundary capability.
//!
//! Ship dynamics (resistance, propulsion, fuel accounting) are explicitly
//! out of scope (spec.md §1) — the core only ever interacts with a ship
//! through this trait, the way the teacher's `KnowledgeStore` trait keeps
//! the pipeline coordinator ignorant of which backend answers a query
//! (`context/mod.rs`).

use crate::model::FuelType;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A WGS-84 geographic point.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Result<Self, crate::error::SimError> {
        if lon.abs() > 180.0 || lat.abs() > 90.0 {
            return Err(crate::error::SimError::Domain(format!(
                "invalid WGS-84 coordinate: lon={lon}, lat={lat}"
            )));
        }
        Ok(Self { lon, lat })
    }

    /// Great-circle-ish planar approximation used only for short in-network
    /// hops; real routing distance comes from the `Network` capability.
    pub fn euclidean_distance_m(&self, other: &GeoPoint) -> f64 {
        const DEG_TO_M: f64 = 111_320.0;
        let dx = (self.lon - other.lon) * DEG_TO_M * self.lat.to_radians().cos();
        let dy = (self.lat - other.lat) * DEG_TO_M;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A line segment on a ship's resolved path.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PathLine {
    pub start: GeoPoint,
    pub end: GeoPoint,
}

/// Per-step critical-points bundle (spec.md §3). Exactly one entry per step
/// today: the next stopping point with target speed zero. The
/// "lower max speeds ahead" path is intentionally not modeled here — see
/// DESIGN NOTES §9.
#[derive(Debug, Clone, Default)]
pub struct CriticalPoints {
    pub gap_to_critical_point: Vec<f64>,
    pub speed_at_critical_point: Vec<f64>,
    pub is_following_another_ship: Vec<bool>,
}

impl CriticalPoints {
    pub fn single_stop(gap: f64, following: bool) -> Self {
        Self {
            gap_to_critical_point: vec![gap],
            speed_at_critical_point: vec![0.0],
            is_following_another_ship: vec![following],
        }
    }

    pub fn len(&self) -> usize {
        self.gap_to_critical_point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gap_to_critical_point.is_empty()
    }
}

/// Environment sample at a ship's current position (spec.md §4.C step b).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSample {
    pub salinity_ppt: f64,
    pub wave_height_m: f64,
    pub wave_frequency_hz: f64,
    pub wave_length_m: f64,
    pub wind_eastward_mps: f64,
    pub wind_northward_mps: f64,
}

/// One row of the resistance-study phase-1 table (spec.md §4.C
/// `study_ships_resistance`), computed by the ship's own calm-resistance
/// strategy. `None` from [`Ship::resistance_at_speed`] means "no strategy
/// attached," which is fatal for that ship per spec.md §4.C.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResistanceComponents {
    pub froude_number: f64,
    pub fr_i: f64,
    pub air_resistance_kn: f64,
    pub bulbous_bow_resistance_kn: f64,
    pub immersed_transom_resistance_kn: f64,
    pub appendage_resistance_n: f64,
    pub wave_resistance_kn: f64,
    pub frictional_resistance_kn: f64,
    pub model_correlation_resistance_kn: f64,
    pub total_resistance_kn: f64,
    pub resistance_coefficient: f64,
}

/// One driving engine's brake power/torque at a computed propeller RPM.
#[derive(Debug, Clone, Copy)]
pub struct EnginePowerAtSpeed {
    pub engine_index: usize,
    pub brake_power_kw: f64,
    pub torque_knm: f64,
}

/// Phase-2 row of the resistance study: propulsion figures at one speed.
#[derive(Debug, Clone)]
pub struct PropulsionAtSpeed {
    pub speed_of_advance_mps: f64,
    pub propeller_rpm: f64,
    pub required_shaft_power_kw: f64,
    pub engines: Vec<EnginePowerAtSpeed>,
}

/// The opaque ship capability. Concrete dynamics models implement this;
/// the core never matches on a concrete type.
pub trait Ship: std::fmt::Debug + Send {
    fn user_id(&self) -> &str;
    fn start_time(&self) -> f64;

    fn is_loaded(&self) -> bool;
    fn is_reached_destination(&self) -> bool;
    fn is_ship_still_moving(&self) -> bool;
    fn is_out_of_energy(&self) -> bool;
    fn is_currently_dwelling(&self) -> bool;

    fn current_position(&self) -> GeoPoint;
    fn current_heading(&self) -> f64;
    fn speed(&self) -> f64;
    fn previous_speed(&self) -> f64;
    fn acceleration(&self) -> f64;
    fn max_acceleration(&self) -> f64;
    fn max_speed(&self) -> f64;
    fn length_in_waterline(&self) -> f64;

    fn path_points(&self) -> &[GeoPoint];
    fn path_lines(&self) -> &[PathLine];
    fn next_stopping_point(&self) -> Option<GeoPoint>;
    /// Remaining distance (m) to `next_stopping_point`.
    fn distance_to_next_stopping_point(&self) -> f64;
    fn distance_from_current_to_path_index(&self, index: usize) -> f64;

    fn cumulative_energy_kwh(&self) -> f64;
    fn cumulative_fuel_by_type_liters(&self) -> &HashMap<FuelType, f64>;
    fn cargo_weight_tons(&self) -> f64;

    /// Fraction of the path travelled, in `[0, 1]`, used to compute the
    /// simulator's mean progress percent.
    fn progress(&self) -> f64;

    /// The first point of this ship's path — used by the loading admission
    /// rule (two ships sharing an origin point).
    fn origin_path_point(&self) -> Option<GeoPoint> {
        self.path_points().first().copied()
    }

    fn load(&mut self);
    fn reset(&mut self);

    #[allow(clippy::too_many_arguments)]
    fn sail(
        &mut self,
        sim_time: f64,
        dt: f64,
        max_speed_cap: f64,
        critical_points: &CriticalPoints,
        stop_point: Option<GeoPoint>,
        environment: EnvironmentSample,
    );

    fn calculate_general_stats(&mut self, dt: f64);
    fn kick_forward(&mut self, distance: f64, dt: f64);

    /// Calm-water resistance components at `speed_mps`, for the
    /// resistance-only study mode. `None` means no calm-resistance
    /// strategy is attached to this ship — fatal for that ship per
    /// spec.md §4.C.
    fn resistance_at_speed(&self, speed_mps: f64) -> Option<ResistanceComponents>;

    /// Propulsion figures (propeller RPM, shaft power, per-engine brake
    /// power/torque) at `speed_mps`, for resistance study phase 2.
    fn propulsion_at_speed(&self, speed_mps: f64) -> Option<PropulsionAtSpeed>;
}

/// Shared ownership handle: a ship is mutated only from its World's worker
/// but read concurrently by `ship_state` queries and per-ship signal
/// wiring, per DESIGN NOTES §9 ("ships are shared between the simulator and
/// the per-ship signal wiring").
pub type ShipHandle = Arc<Mutex<dyn Ship>>;

/// Default, dependency-free `Ship` implementation. Hull/propulsion/fuel
/// dynamics are out of scope; this model advances position by capped
/// kinematics only, the same way [`crate::model::network::StaticNetwork`]
/// stands in for a real routing backend.
#[derive(Debug, Clone)]
pub struct StaticShip {
    user_id: String,
    start_time: f64,
    loaded: bool,
    out_of_energy: bool,
    dwelling: bool,
    position: GeoPoint,
    heading: f64,
    speed: f64,
    previous_speed: f64,
    acceleration: f64,
    max_acceleration: f64,
    max_speed: f64,
    length_in_waterline: f64,
    path_points: Vec<GeoPoint>,
    path_lines: Vec<PathLine>,
    next_stop_index: usize,
    cumulative_energy_kwh: f64,
    cumulative_fuel_by_type_liters: HashMap<FuelType, f64>,
    cargo_weight_tons: f64,
    gearbox_ratio: f64,
    propeller_pitch_m: f64,
    propeller_slip: f64,
    engine_power_points_kw: Vec<f64>,
    resistance_capable: bool,
}

impl StaticShip {
    pub fn new(
        user_id: impl Into<String>,
        start_time: f64,
        max_speed: f64,
        length_in_waterline: f64,
        cargo_weight_tons: f64,
        path_points: Vec<GeoPoint>,
        path_lines: Vec<PathLine>,
    ) -> Self {
        let position = path_points.first().copied().unwrap_or(GeoPoint {
            lon: 0.0,
            lat: 0.0,
        });
        Self {
            user_id: user_id.into(),
            start_time,
            loaded: false,
            out_of_energy: false,
            dwelling: false,
            position,
            heading: 0.0,
            speed: 0.0,
            previous_speed: 0.0,
            acceleration: 0.0,
            max_acceleration: max_speed.max(1.0) / 60.0,
            max_speed,
            length_in_waterline,
            path_points,
            path_lines,
            next_stop_index: 0,
            cumulative_energy_kwh: 0.0,
            cumulative_fuel_by_type_liters: HashMap::new(),
            cargo_weight_tons,
            gearbox_ratio: 1.0,
            propeller_pitch_m: 4.0,
            propeller_slip: 0.2,
            engine_power_points_kw: vec![1000.0, 2000.0, 3000.0, 4000.0],
            resistance_capable: true,
        }
    }

    /// Attach propulsion figures (gearbox ratio, propeller pitch/slip, and
    /// the engine power set-points) used by [`Ship::propulsion_at_speed`].
    pub fn with_propulsion(
        mut self,
        gearbox_ratio: f64,
        propeller_pitch_m: f64,
        propeller_slip: f64,
        engine_power_points_kw: Vec<f64>,
    ) -> Self {
        self.gearbox_ratio = gearbox_ratio;
        self.propeller_pitch_m = propeller_pitch_m;
        self.propeller_slip = propeller_slip;
        self.engine_power_points_kw = engine_power_points_kw;
        self
    }

    /// Simulate a ship with no calm-resistance strategy attached, to
    /// exercise the "fatal per ship" path in a resistance-only study.
    pub fn without_resistance_strategy(mut self) -> Self {
        self.resistance_capable = false;
        self
    }

    fn total_path_length_m(&self) -> f64 {
        self.path_lines
            .iter()
            .map(|l| l.start.euclidean_distance_m(&l.end))
            .sum()
    }

    fn distance_travelled_m(&self) -> f64 {
        self.path_lines
            .iter()
            .take(self.next_stop_index)
            .map(|l| l.start.euclidean_distance_m(&l.end))
            .sum::<f64>()
            + self
                .path_lines
                .get(self.next_stop_index.saturating_sub(1))
                .map(|l| l.start.euclidean_distance_m(&self.position))
                .unwrap_or(0.0)
    }
}

impl Ship for StaticShip {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn is_reached_destination(&self) -> bool {
        self.next_stop_index >= self.path_points.len().saturating_sub(1) && self.loaded
    }

    fn is_ship_still_moving(&self) -> bool {
        !self.is_reached_destination() && !self.out_of_energy
    }

    fn is_out_of_energy(&self) -> bool {
        self.out_of_energy
    }

    fn is_currently_dwelling(&self) -> bool {
        self.dwelling
    }

    fn current_position(&self) -> GeoPoint {
        self.position
    }

    fn current_heading(&self) -> f64 {
        self.heading
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn previous_speed(&self) -> f64 {
        self.previous_speed
    }

    fn acceleration(&self) -> f64 {
        self.acceleration
    }

    fn max_acceleration(&self) -> f64 {
        self.max_acceleration
    }

    fn max_speed(&self) -> f64 {
        self.max_speed
    }

    fn length_in_waterline(&self) -> f64 {
        self.length_in_waterline
    }

    fn path_points(&self) -> &[GeoPoint] {
        &self.path_points
    }

    fn path_lines(&self) -> &[PathLine] {
        &self.path_lines
    }

    fn next_stopping_point(&self) -> Option<GeoPoint> {
        self.path_points.get(self.next_stop_index + 1).copied()
    }

    fn distance_to_next_stopping_point(&self) -> f64 {
        match self.next_stopping_point() {
            Some(p) => self.position.euclidean_distance_m(&p),
            None => 0.0,
        }
    }

    fn distance_from_current_to_path_index(&self, index: usize) -> f64 {
        match self.path_points.get(index) {
            Some(p) => self.position.euclidean_distance_m(p),
            None => 0.0,
        }
    }

    fn cumulative_energy_kwh(&self) -> f64 {
        self.cumulative_energy_kwh
    }

    fn cumulative_fuel_by_type_liters(&self) -> &HashMap<FuelType, f64> {
        &self.cumulative_fuel_by_type_liters
    }

    fn cargo_weight_tons(&self) -> f64 {
        self.cargo_weight_tons
    }

    fn progress(&self) -> f64 {
        let total = self.total_path_length_m();
        if total <= 0.0 {
            return if self.is_reached_destination() { 1.0 } else { 0.0 };
        }
        (self.distance_travelled_m() / total).clamp(0.0, 1.0)
    }

    fn load(&mut self) {
        self.loaded = true;
    }

    fn reset(&mut self) {
        self.loaded = false;
        self.out_of_energy = false;
        self.dwelling = false;
        self.speed = 0.0;
        self.previous_speed = 0.0;
        self.acceleration = 0.0;
        self.next_stop_index = 0;
        self.cumulative_energy_kwh = 0.0;
        self.cumulative_fuel_by_type_liters.clear();
        self.position = self.path_points.first().copied().unwrap_or(self.position);
    }

    fn sail(
        &mut self,
        _sim_time: f64,
        dt: f64,
        max_speed_cap: f64,
        critical_points: &CriticalPoints,
        stop_point: Option<GeoPoint>,
        _environment: EnvironmentSample,
    ) {
        if !self.loaded || self.out_of_energy {
            return;
        }
        if self.is_reached_destination() {
            self.dwelling = true;
            self.speed = 0.0;
            return;
        }
        self.dwelling = false;

        let target_speed = critical_points
            .speed_at_critical_point
            .first()
            .copied()
            .unwrap_or(self.max_speed)
            .min(max_speed_cap.min(self.max_speed));

        self.previous_speed = self.speed;
        let max_delta = self.max_acceleration * dt;
        self.speed += (target_speed - self.speed).clamp(-max_delta, max_delta);
        self.acceleration = (self.speed - self.previous_speed) / dt.max(f64::EPSILON);

        let step_distance = self.speed * dt;
        if let Some(next) = self.next_stopping_point() {
            if self.position.euclidean_distance_m(&next) <= step_distance {
                self.position = stop_point.unwrap_or(next);
                self.next_stop_index += 1;
            } else {
                let bearing = (next.lat - self.position.lat).atan2(next.lon - self.position.lon);
                self.heading = bearing.to_degrees();
                let deg_per_m = 1.0 / 111_320.0;
                self.position.lon += bearing.cos() * step_distance * deg_per_m;
                self.position.lat += bearing.sin() * step_distance * deg_per_m;
            }
        }
    }

    fn calculate_general_stats(&mut self, dt: f64) {
        let power_kw = self.speed.max(0.0).powi(3) * 0.01 + 50.0;
        self.cumulative_energy_kwh += power_kw * (dt / 3600.0);
        *self
            .cumulative_fuel_by_type_liters
            .entry(FuelType::HFO)
            .or_insert(0.0) += power_kw * (dt / 3600.0) * 0.2;
    }

    fn kick_forward(&mut self, distance: f64, dt: f64) {
        if let Some(next) = self.next_stopping_point() {
            let remaining = self.position.euclidean_distance_m(&next);
            if distance >= remaining {
                self.position = next;
                self.next_stop_index += 1;
            } else {
                let bearing = (next.lat - self.position.lat).atan2(next.lon - self.position.lon);
                let deg_per_m = 1.0 / 111_320.0;
                self.position.lon += bearing.cos() * distance * deg_per_m;
                self.position.lat += bearing.sin() * distance * deg_per_m;
            }
        }
        if dt > 0.0 {
            self.speed = distance / dt;
        }
    }

    fn resistance_at_speed(&self, speed_mps: f64) -> Option<ResistanceComponents> {
        if !self.resistance_capable {
            return None;
        }
        const GRAVITY_MPS2: f64 = 9.80665;
        let waterline_length = self.length_in_waterline.max(1.0);
        let froude_number = speed_mps / (GRAVITY_MPS2 * waterline_length).sqrt();
        let dynamic_pressure_kn = 0.5 * 1.025 * speed_mps * speed_mps / 1000.0;
        Some(ResistanceComponents {
            froude_number,
            fr_i: froude_number * 1.05,
            air_resistance_kn: dynamic_pressure_kn * 0.02,
            bulbous_bow_resistance_kn: dynamic_pressure_kn * 0.01,
            immersed_transom_resistance_kn: dynamic_pressure_kn * 0.005,
            appendage_resistance_n: dynamic_pressure_kn * 5.0,
            wave_resistance_kn: dynamic_pressure_kn * froude_number.powi(2) * 0.5,
            frictional_resistance_kn: dynamic_pressure_kn * 0.3,
            model_correlation_resistance_kn: dynamic_pressure_kn * 0.015,
            total_resistance_kn: dynamic_pressure_kn
                * (0.02 + 0.01 + 0.005 + 0.3 + 0.015 + froude_number.powi(2) * 0.5),
            resistance_coefficient: 0.001 + froude_number * 0.0002,
        })
    }

    fn propulsion_at_speed(&self, speed_mps: f64) -> Option<PropulsionAtSpeed> {
        if !self.resistance_capable {
            return None;
        }
        let speed_of_advance_mps = speed_mps * (1.0 - self.propeller_slip);
        let propeller_rpm =
            60.0 * speed_of_advance_mps / (self.propeller_pitch_m * (1.0 - self.propeller_slip));
        let required_shaft_power_kw =
            self.resistance_at_speed(speed_mps)?.total_resistance_kn * speed_mps;
        let engines = self
            .engine_power_points_kw
            .iter()
            .enumerate()
            .map(|(i, &rated_kw)| EnginePowerAtSpeed {
                engine_index: i,
                brake_power_kw: required_shaft_power_kw / self.gearbox_ratio.max(0.01),
                torque_knm: if propeller_rpm > 0.0 {
                    rated_kw.min(required_shaft_power_kw) * 9549.3 / propeller_rpm / 1000.0
                } else {
                    0.0
                },
            })
            .collect();
        Some(PropulsionAtSpeed {
            speed_of_advance_mps,
            propeller_rpm,
            required_shaft_power_kw,
            engines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_longitude() {
        assert!(GeoPoint::new(181.0, 10.0).is_err());
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        assert!(GeoPoint::new(10.0, 91.0).is_err());
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(GeoPoint::new(180.0, 90.0).is_ok());
        assert!(GeoPoint::new(-180.0, -90.0).is_ok());
    }

    #[test]
    fn critical_points_single_stop_has_one_entry() {
        let cp = CriticalPoints::single_stop(500.0, false);
        assert_eq!(cp.len(), 1);
        assert_eq!(cp.speed_at_critical_point[0], 0.0);
    }

    fn two_point_ship() -> StaticShip {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 1.0).unwrap();
        StaticShip::new(
            "ship-1",
            0.0,
            10.0,
            100.0,
            5000.0,
            vec![a, b],
            vec![PathLine { start: a, end: b }],
        )
    }

    #[test]
    fn static_ship_reaches_destination_after_enough_steps() {
        let mut ship = two_point_ship();
        ship.load();
        let cp = CriticalPoints::single_stop(0.0, false);
        for _ in 0..100_000 {
            if ship.is_reached_destination() {
                break;
            }
            ship.sail(0.0, 1.0, 100.0, &cp, None, EnvironmentSample::default());
        }
        assert!(ship.is_reached_destination());
    }

    #[test]
    fn static_ship_progress_increases_monotonically() {
        let mut ship = two_point_ship();
        ship.load();
        let cp = CriticalPoints::single_stop(0.0, false);
        let mut last = ship.progress();
        for _ in 0..50 {
            ship.sail(0.0, 1.0, 100.0, &cp, None, EnvironmentSample::default());
            let next = ship.progress();
            assert!(next >= last);
            last = next;
        }
    }

    #[test]
    fn static_ship_accrues_fuel_when_stats_calculated() {
        let mut ship = two_point_ship();
        ship.load();
        ship.calculate_general_stats(1.0);
        assert!(ship.cumulative_energy_kwh() > 0.0);
        assert!(ship.cumulative_fuel_by_type_liters().contains_key(&FuelType::HFO));
    }

    #[test]
    fn resistance_and_propulsion_present_by_default() {
        let ship = two_point_ship();
        assert!(ship.resistance_at_speed(5.0).is_some());
        assert!(ship.propulsion_at_speed(5.0).is_some());
    }

    #[test]
    fn resistance_absent_when_strategy_not_attached() {
        let ship = two_point_ship().without_resistance_strategy();
        assert!(ship.resistance_at_speed(5.0).is_none());
        assert!(ship.propulsion_at_speed(5.0).is_none());
    }

    #[test]
    fn resistance_increases_with_speed() {
        let ship = two_point_ship();
        let low = ship.resistance_at_speed(2.0).unwrap().total_resistance_kn;
        let high = ship.resistance_at_speed(10.0).unwrap().total_resistance_kn;
        assert!(high > low);
    }
}

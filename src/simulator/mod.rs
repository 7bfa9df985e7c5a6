//! The per-world simulation loop (spec.md §4.C).
//!
//! Owns the ship set, the clock, and per-tick progression; honors
//! pause/resume/terminate/restart; produces trajectory rows, an
//! end-of-run summary, and a packaged [`ShipsResults`] artifact.

pub mod control;
pub mod signals;

pub use control::SimulatorControl;
pub use signals::{signal_channel, SimSignal, SimSignalReceiver, SimSignalSender};

use crate::config::defaults::{
    KICK_FORWARD_EPSILON_MPS, LOADING_ADMISSION_MULTIPLE, NO_SPEED_CAP_SENTINEL_MPS,
};
use crate::error::{SimError, SimResult};
use crate::model::ship::EnvironmentSample;
use crate::model::{CriticalPoints, FuelType, Network, Ship, ShipHandle, ShipsResults};
use crate::sinks::{SummarySink, TrajectorySchema, TrajectorySink};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, MutexGuard};

const MPS_TO_KNOTS: f64 = 1.0 / 0.514_444;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorState {
    Created,
    Initialized,
    Running,
    Terminated,
    Finished,
}

/// Construction parameters for [`Simulator::new`], grouped because the
/// constructor otherwise outgrows a reasonable argument list.
pub struct SimulatorConfig {
    pub ships: Vec<ShipHandle>,
    pub time_step: f64,
    pub end_time: f64,
    pub output_dir: PathBuf,
    pub serial: u128,
    pub export_trajectory: bool,
    pub externally_controlled: bool,
    pub resistance_only: bool,
    pub plot_frequency_s: Option<f64>,
}

pub struct Simulator {
    network: Option<Arc<dyn Network>>,
    ships: Vec<ShipHandle>,
    clock: f64,
    time_step: f64,
    end_time: f64,
    export_trajectory: bool,
    externally_controlled: bool,
    progress_percent: u8,
    state: SimulatorState,
    control: Arc<SimulatorControl>,
    trajectory_sink: TrajectorySink,
    summary_sink: SummarySink,
    signal_tx: SimSignalSender,
    plot_frequency_s: Option<f64>,
}

fn lock_ship(handle: &ShipHandle) -> SimResult<MutexGuard<'_, dyn Ship>> {
    handle
        .lock()
        .map_err(|_| SimError::Coordination("ship mutex poisoned".to_string()))
}

fn rounds_to_zero(value: f64, resolution: f64) -> bool {
    (value / resolution).round() == 0.0
}

fn path_total_length_m(ship: &dyn Ship) -> f64 {
    ship.path_lines()
        .iter()
        .map(|l| l.start.euclidean_distance_m(&l.end))
        .sum()
}

fn co2_factor_kg_per_liter(fuel: FuelType) -> f64 {
    match fuel {
        FuelType::HFO => 3.114,
        FuelType::MDO | FuelType::MGO => 3.206,
        FuelType::LNG => 2.75,
        FuelType::Methanol => 1.375,
        FuelType::Hydrogen => 0.0,
    }
}

impl Simulator {
    /// A null network is fatal at construction unless this is a
    /// resistance-only study, which never consults the network
    /// (spec.md §4.C `Failure semantics`).
    pub fn new(
        network: Option<Arc<dyn Network>>,
        config: SimulatorConfig,
        signal_tx: SimSignalSender,
    ) -> SimResult<Self> {
        if config.time_step <= 0.0 {
            return Err(SimError::Domain("Invalid time step value".to_string()));
        }
        if !config.resistance_only && network.is_none() {
            return Err(SimError::Capability(
                "a network is required for a non resistance-only simulator".to_string(),
            ));
        }

        let schema = if config.resistance_only {
            TrajectorySchema::ResistanceStudy
        } else {
            TrajectorySchema::TimeStepped
        };
        let trajectory_path = config
            .output_dir
            .join(format!("shipTrajectory_{}.csv", config.serial));
        let summary_path = config
            .output_dir
            .join(format!("shipSummary_{}.txt", config.serial));

        Ok(Self {
            network,
            ships: config.ships,
            clock: 0.0,
            time_step: config.time_step,
            end_time: config.end_time,
            export_trajectory: config.export_trajectory,
            externally_controlled: config.externally_controlled,
            progress_percent: 0,
            state: SimulatorState::Created,
            control: Arc::new(SimulatorControl::new()),
            trajectory_sink: TrajectorySink::new(trajectory_path, schema),
            summary_sink: SummarySink::new(summary_path),
            signal_tx,
            plot_frequency_s: config.plot_frequency_s,
        })
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn ships(&self) -> &[ShipHandle] {
        &self.ships
    }

    pub fn trajectory_path(&self) -> &std::path::Path {
        self.trajectory_sink.path()
    }

    pub fn summary_path(&self) -> &std::path::Path {
        self.summary_sink.path()
    }

    /// Shared control block: any thread may call `pause`/`resume`/
    /// `terminate` on the returned handle while `run_for` is in progress
    /// on the World's worker, without routing through the worker queue
    /// (see `control.rs`).
    pub fn control(&self) -> Arc<SimulatorControl> {
        Arc::clone(&self.control)
    }

    pub fn add_ships(&mut self, ships: Vec<ShipHandle>) -> SimResult<Vec<String>> {
        let mut ids = Vec::with_capacity(ships.len());
        for ship in &ships {
            ids.push(lock_ship(ship)?.user_id().to_string());
        }
        self.ships.extend(ships);
        let _ = self.signal_tx.send(SimSignal::ShipAdded { ids: ids.clone() });
        Ok(ids)
    }

    pub fn initialize(&mut self, emit_signal: bool) -> SimResult<()> {
        if self.state != SimulatorState::Created {
            return Ok(());
        }
        if self.export_trajectory {
            self.trajectory_sink.open()?;
        }
        self.state = SimulatorState::Initialized;
        if emit_signal {
            let _ = self.signal_tx.send(SimSignal::Initialized);
        }
        Ok(())
    }

    pub fn pause(&self) {
        self.control.pause();
        let _ = self.signal_tx.send(SimSignal::Paused);
    }

    pub fn resume(&self) {
        self.control.resume();
        let _ = self.signal_tx.send(SimSignal::Resumed);
    }

    pub fn terminate(&self) {
        self.control.terminate();
    }

    /// Reset clock, progress, summary, and every ship's internal state;
    /// truncate both sink files. Idempotent: `restart(); restart()` leaves
    /// the simulator in the same state as one `restart()` (spec.md §8).
    pub fn restart(&mut self) -> SimResult<()> {
        self.clock = 0.0;
        self.progress_percent = 0;
        self.state = SimulatorState::Created;
        self.control.reset();
        for ship in &self.ships {
            lock_ship(ship)?.reset();
        }
        self.trajectory_sink.clear()?;
        let _ = self.signal_tx.send(SimSignal::Restarted);
        Ok(())
    }

    fn all_ships_satisfy(&self, predicate: impl Fn(&dyn Ship) -> bool) -> SimResult<bool> {
        for ship in &self.ships {
            if !predicate(&*lock_ship(ship)?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn mean_progress_percent(&self) -> SimResult<u8> {
        if self.ships.is_empty() {
            return Ok(0);
        }
        let mut total = 0.0;
        for ship in &self.ships {
            total += lock_ship(ship)?.progress();
        }
        let mean = (total / self.ships.len() as f64 * 100.0).round();
        Ok(mean.clamp(0.0, 100.0) as u8)
    }

    /// Advance one tick: load eligible ships, sail every active ship,
    /// record trajectory rows, then advance the clock (spec.md §4.C
    /// `run_one_time_step`).
    pub fn run_one_time_step(&mut self) -> SimResult<()> {
        let snapshot = self.ships.clone();
        let dt = self.time_step;
        let sim_time = self.clock;
        let network = self.network.clone().ok_or_else(|| {
            SimError::Capability("stepped simulation requires a network".to_string())
        })?;

        for ship in &snapshot {
            let (reached, out_of_energy) = {
                let guard = lock_ship(ship)?;
                (guard.is_reached_destination(), guard.is_out_of_energy())
            };
            if reached || out_of_energy {
                continue;
            }
            self.play_one(ship, sim_time, dt, &snapshot, network.as_ref())?;
        }

        if let Some(plot_freq) = self.plot_frequency_s.filter(|f| *f > 0.0) {
            let sim_tenths = (sim_time * 10.0).round() as i64;
            let freq_tenths = (plot_freq * 10.0).round().max(1.0) as i64;
            if sim_tenths % freq_tenths == 0 {
                let mut positions = Vec::new();
                for ship in &snapshot {
                    let guard = lock_ship(ship)?;
                    if guard.is_loaded() {
                        positions.push((guard.user_id().to_string(), guard.current_position()));
                    }
                }
                let _ = self.signal_tx.send(SimSignal::PlotUpdate(positions));
            }
        }

        self.clock += dt;
        let _ = self.signal_tx.send(SimSignal::Advanced { clock: self.clock });

        if !self.externally_controlled {
            let any_on_network = snapshot.iter().any(|s| {
                lock_ship(s)
                    .map(|g| g.is_loaded() && !g.is_reached_destination())
                    .unwrap_or(false)
            });
            if !any_on_network {
                let mut min_start = f64::INFINITY;
                for ship in &snapshot {
                    let guard = lock_ship(ship)?;
                    if !guard.is_loaded() {
                        min_start = min_start.min(guard.start_time());
                    }
                }
                if min_start.is_finite() && min_start > self.clock {
                    self.clock = min_start;
                }
            }
        }

        Ok(())
    }

    fn play_one(
        &mut self,
        ship: &ShipHandle,
        sim_time: f64,
        dt: f64,
        snapshot: &[ShipHandle],
        network: &dyn Network,
    ) -> SimResult<()> {
        let needs_admission_check = {
            let guard = lock_ship(ship)?;
            sim_time >= guard.start_time() && !guard.is_loaded()
        };

        if needs_admission_check {
            let (origin, waterline, user_id) = {
                let guard = lock_ship(ship)?;
                (
                    guard.origin_path_point(),
                    guard.length_in_waterline(),
                    guard.user_id().to_string(),
                )
            };
            let _ = waterline;

            let blocked = match origin {
                Some(origin) => {
                    let mut blocked = false;
                    for other in snapshot {
                        if Arc::ptr_eq(other, ship) {
                            continue;
                        }
                        let other_guard = lock_ship(other)?;
                        if other_guard.user_id() == user_id || !other_guard.is_loaded() {
                            continue;
                        }
                        let Some(other_origin) = other_guard.origin_path_point() else {
                            continue;
                        };
                        if other_origin.euclidean_distance_m(&origin) >= 1.0 {
                            continue;
                        }
                        let traveled = other_guard.distance_from_current_to_path_index(0);
                        if traveled < other_guard.length_in_waterline() * LOADING_ADMISSION_MULTIPLE
                        {
                            blocked = true;
                            break;
                        }
                    }
                    blocked
                }
                None => false,
            };

            if blocked {
                return Ok(());
            }
            lock_ship(ship)?.load();
        }

        let is_loaded = lock_ship(ship)?.is_loaded();
        if !is_loaded {
            return Ok(());
        }

        let environment = {
            let guard = lock_ship(ship)?;
            if sim_time >= guard.start_time() {
                network.sample_environment(guard.current_position())
            } else {
                EnvironmentSample::default()
            }
        };

        let (stop_point, gap, dwelling, acceleration, previous_speed, speed) = {
            let guard = lock_ship(ship)?;
            (
                guard.next_stopping_point(),
                guard.distance_to_next_stopping_point(),
                guard.is_currently_dwelling(),
                guard.acceleration(),
                guard.previous_speed(),
                guard.speed(),
            )
        };
        let critical_points = CriticalPoints::single_stop(gap, false);

        let should_kick = !dwelling
            && critical_points.len() == 1
            && acceleration <= 0.0
            && rounds_to_zero(previous_speed, KICK_FORWARD_EPSILON_MPS)
            && rounds_to_zero(speed, KICK_FORWARD_EPSILON_MPS)
            && speed >= 0.0
            && speed * dt * 3.0 >= gap;

        {
            let mut guard = lock_ship(ship)?;
            if should_kick {
                guard.kick_forward(gap, dt);
            } else {
                guard.sail(
                    sim_time,
                    dt,
                    NO_SPEED_CAP_SENTINEL_MPS,
                    &critical_points,
                    stop_point,
                    environment,
                );
            }
            guard.calculate_general_stats(dt);
        }

        if self.export_trajectory {
            let row = {
                let guard = lock_ship(ship)?;
                format_time_stepped_row(&*guard, sim_time, &environment)
            };
            self.trajectory_sink.write_line(&row)?;
        }

        Ok(())
    }

    /// Run until `clock` reaches `clock_at_call + duration` (computed once
    /// at loop entry — spec.md §9 open question resolution) or a terminal
    /// condition. `duration = f64::INFINITY` models `byTimeSteps <= 0`
    /// ("run until finished").
    pub fn run_for(&mut self, duration: f64, end_after_run: bool, emit_step_signal: bool) -> SimResult<()> {
        if self.state == SimulatorState::Created {
            self.initialize(true)?;
        }
        self.control.reset();
        self.state = SimulatorState::Running;
        let target = self.clock + duration;

        loop {
            self.control.wait_while_paused();
            if !self.control.is_running() {
                self.state = SimulatorState::Terminated;
                let _ = self.signal_tx.send(SimSignal::Terminated);
                return Ok(());
            }
            if !(self.clock <= target && (self.end_time <= 0.0 || self.clock <= self.end_time)) {
                break;
            }

            let none_moving = self.all_ships_satisfy(|s| !s.is_ship_still_moving())?;
            if none_moving {
                // An externally-controlled world waiting for more ships and
                // a naturally-idle world both just stop driving this call;
                // the former expects a later `add_ships`/`run_for` to
                // resume (see DESIGN.md — this particular call cannot
                // block for ships that only a queued command can add).
                break;
            }

            let all_reached = self.all_ships_satisfy(|s| s.is_reached_destination())?;
            if all_reached {
                let _ = self.signal_tx.send(SimSignal::AllReachedDestination);
                if self.externally_controlled {
                    self.control.pause();
                }
                break;
            }

            self.run_one_time_step()?;

            let percent = self.mean_progress_percent()?;
            if percent != self.progress_percent {
                self.progress_percent = percent;
                if emit_step_signal {
                    let _ = self.signal_tx.send(SimSignal::ProgressUpdated { percent });
                }
            }
        }

        if duration.is_finite() {
            let _ = self.signal_tx.send(SimSignal::ReachedReportingTime {
                clock: self.clock,
                percent: self.progress_percent,
            });
        }

        if end_after_run {
            self.end_simulation()?;
        }

        Ok(())
    }

    /// Generate the summary, write both sinks, and package a
    /// [`ShipsResults`]. Exposed directly as the coordinator's `finalize`
    /// command, and called internally on natural `run_for` completion.
    pub fn finalize(&mut self) -> SimResult<ShipsResults> {
        self.end_simulation()
    }

    /// A snapshot of the summary data without closing out the run, for the
    /// coordinator's `current_results` command.
    pub fn current_summary(&self) -> SimResult<Vec<(String, String)>> {
        self.generate_summary_data()
    }

    fn end_simulation(&mut self) -> SimResult<ShipsResults> {
        let summary_kv = self.generate_summary_data()?;
        let summary_text = ShipsResults::kv_to_summary_text(&summary_kv);
        self.summary_sink.write_once(&summary_text)?;
        self.trajectory_sink.close()?;

        let trajectory_blob = if self.export_trajectory {
            let raw = std::fs::read(self.trajectory_sink.path())?;
            Some(ShipsResults::compress_trajectory(&raw)?)
        } else {
            None
        };

        let results = ShipsResults::new(
            summary_kv,
            trajectory_blob,
            self.trajectory_sink.path().to_path_buf(),
            self.summary_sink.path().to_path_buf(),
        );

        self.state = SimulatorState::Finished;
        let _ = self
            .signal_tx
            .send(SimSignal::Finished(Box::new(results.clone())));
        Ok(results)
    }

    /// Fleet-wide aggregates followed by per-ship detail blocks, rendered
    /// into an ordered key/value sequence (spec.md §4.C `Summary`). Field
    /// order is part of the wire contract (§8 round-trip law), so this
    /// always emits fleet aggregates first.
    fn generate_summary_data(&self) -> SimResult<Vec<(String, String)>> {
        let mut reached = 0usize;
        let mut total_cargo_tons = 0.0;
        let mut total_ton_km = 0.0;
        let mut total_speed_kn = 0.0;
        let mut total_acceleration = 0.0;
        let mut total_distance_m = 0.0;
        let mut cumulative_energy_kwh = 0.0;
        let mut fuel_by_type: HashMap<FuelType, f64> = HashMap::new();

        for ship in &self.ships {
            let guard = lock_ship(ship)?;
            if guard.is_reached_destination() {
                reached += 1;
            }
            let distance_m = guard.progress() * path_total_length_m(&*guard);
            total_cargo_tons += guard.cargo_weight_tons();
            total_ton_km += guard.cargo_weight_tons() * (distance_m / 1000.0);
            total_speed_kn += guard.speed() * MPS_TO_KNOTS;
            total_acceleration += guard.acceleration();
            total_distance_m += distance_m;
            cumulative_energy_kwh += guard.cumulative_energy_kwh();
            for (fuel, liters) in guard.cumulative_fuel_by_type_liters() {
                *fuel_by_type.entry(*fuel).or_insert(0.0) += liters;
            }
        }

        let count = (self.ships.len().max(1)) as f64;
        let mut kv = vec![
            ("shipsReachedDestination".to_string(), reached.to_string()),
            ("totalCargoMovedTons".to_string(), total_cargo_tons.to_string()),
            ("totalTonKm".to_string(), total_ton_km.to_string()),
            ("operatingTimeS".to_string(), self.clock.to_string()),
            ("averageSpeedKn".to_string(), (total_speed_kn / count).to_string()),
            (
                "averageAccelerationMps2".to_string(),
                (total_acceleration / count).to_string(),
            ),
            ("averageDistanceM".to_string(), (total_distance_m / count).to_string()),
            ("cumulativeEnergyKwh".to_string(), cumulative_energy_kwh.to_string()),
            (
                "averageEnergyKwh".to_string(),
                (cumulative_energy_kwh / count).to_string(),
            ),
        ];

        for fuel in [
            FuelType::HFO,
            FuelType::MDO,
            FuelType::MGO,
            FuelType::LNG,
            FuelType::Methanol,
            FuelType::Hydrogen,
        ] {
            if let Some(liters) = fuel_by_type.get(&fuel) {
                kv.push((format!("fuelConsumedLiters.{fuel:?}"), liters.to_string()));
            }
        }

        let co2_kg: f64 = fuel_by_type
            .iter()
            .map(|(fuel, liters)| liters * co2_factor_kg_per_liter(*fuel))
            .sum();
        kv.push(("co2EmissionsKg".to_string(), co2_kg.to_string()));

        // Each ship's block is independent of every other ship's, so this
        // runs across the rayon global pool rather than sequentially — the
        // only per-tick work that is genuinely embarrassingly parallel.
        let per_ship: Vec<Vec<(String, String)>> = self
            .ships
            .par_iter()
            .map(|ship| -> SimResult<Vec<(String, String)>> {
                let guard = lock_ship(ship)?;
                let id = guard.user_id().to_string();
                let pos = guard.current_position();
                Ok(vec![
                    (
                        format!("ship.{id}.reachedDestination"),
                        guard.is_reached_destination().to_string(),
                    ),
                    (format!("ship.{id}.finalPosition"), format!("{},{}", pos.lon, pos.lat)),
                    (
                        format!("ship.{id}.cumulativeEnergyKwh"),
                        guard.cumulative_energy_kwh().to_string(),
                    ),
                    (format!("ship.{id}.cargoWeightTons"), guard.cargo_weight_tons().to_string()),
                ])
            })
            .collect::<SimResult<Vec<_>>>()?;
        kv.extend(per_ship.into_iter().flatten());

        Ok(kv)
    }

    /// Sweep each ship's speed from 0 to its max (knots) writing a
    /// calm-resistance row per (ship, speed), then — after two blank
    /// lines — a propulsion table for the same speed range. Does not
    /// advance the clock or consult a network (spec.md §4.C).
    pub fn study_ships_resistance(&mut self) -> SimResult<()> {
        for ship in &self.ships {
            let guard = lock_ship(ship)?;
            let max_speed_kn = (guard.max_speed() * MPS_TO_KNOTS).ceil() as i64;
            for speed_kn in 0..=max_speed_kn {
                let speed_mps = speed_kn as f64 / MPS_TO_KNOTS;
                let r = guard.resistance_at_speed(speed_mps).ok_or_else(|| {
                    SimError::Capability(format!(
                        "ship {} has no calm-resistance strategy",
                        guard.user_id()
                    ))
                })?;
                let row = format!(
                    "{},{speed_kn},{},{},{},{},{},{},{},{},{},{},{}",
                    guard.user_id(),
                    r.froude_number,
                    r.fr_i,
                    r.air_resistance_kn,
                    r.bulbous_bow_resistance_kn,
                    r.immersed_transom_resistance_kn,
                    r.appendage_resistance_n,
                    r.wave_resistance_kn,
                    r.frictional_resistance_kn,
                    r.model_correlation_resistance_kn,
                    r.total_resistance_kn,
                    r.resistance_coefficient,
                );
                self.trajectory_sink.write_line(&row)?;
            }
        }

        self.trajectory_sink.write_blank_line()?;
        self.trajectory_sink.write_blank_line()?;

        for ship in &self.ships {
            let guard = lock_ship(ship)?;
            let max_speed_kn = (guard.max_speed() * MPS_TO_KNOTS).ceil() as i64;
            for speed_kn in 0..=max_speed_kn {
                let speed_mps = speed_kn as f64 / MPS_TO_KNOTS;
                let p = guard.propulsion_at_speed(speed_mps).ok_or_else(|| {
                    SimError::Capability(format!(
                        "ship {} has no calm-resistance strategy",
                        guard.user_id()
                    ))
                })?;
                let engine_columns = p
                    .engines
                    .iter()
                    .map(|e| format!("{},{}", e.brake_power_kw, e.torque_knm))
                    .collect::<Vec<_>>()
                    .join(",");
                let row = format!(
                    "{},{speed_kn},{},{},{}{}",
                    guard.user_id(),
                    p.speed_of_advance_mps,
                    p.propeller_rpm,
                    p.required_shaft_power_kw,
                    if engine_columns.is_empty() {
                        String::new()
                    } else {
                        format!(",{engine_columns}")
                    },
                );
                self.trajectory_sink.write_line(&row)?;
            }
        }

        Ok(())
    }
}

fn format_time_stepped_row(ship: &dyn Ship, sim_time: f64, environment: &EnvironmentSample) -> String {
    let resistance_kn = ship
        .resistance_at_speed(ship.speed())
        .map(|r| r.total_resistance_kn)
        .unwrap_or(0.0);
    let resistance_n = resistance_kn * 1000.0;
    // Ship mass isn't part of the boundary view (fuel/hull accounting is
    // out of scope); cargo weight is the closest available proxy.
    let mass_kg = ship.cargo_weight_tons() * 1000.0;
    let thrust_n = mass_kg * ship.acceleration() + resistance_n;
    let travelled_m = ship.progress() * path_total_length_m(ship);
    let pos = ship.current_position();
    let speed_kn = ship.speed() * MPS_TO_KNOTS;
    let id = ship.user_id();
    let salinity = environment.salinity_ppt;
    let wave_h = environment.wave_height_m;
    let wave_f = environment.wave_frequency_hz;
    let wave_l = environment.wave_length_m;
    let wind_n = environment.wind_northward_mps;
    let wind_e = environment.wind_eastward_mps;
    let max_accel = ship.max_acceleration();
    let accel = ship.acceleration();
    let energy = ship.cumulative_energy_kwh();
    // Fuel tank capacity tracking is out of scope (ship dynamics); report
    // a full tank rather than fabricate a depletion curve.
    let capacity_pct = 100.0;
    let lon = pos.lon;
    let lat = pos.lat;
    let course = ship.current_heading();
    format!(
        "{sim_time},{id},{salinity},{wave_h},{wave_f},{wave_l},{wind_n},{wind_e},\
{thrust_n},{resistance_n},{max_accel},{travelled_m},{accel},{speed_kn},{energy},\
{capacity_pct},{lon};{lat},{course}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeoPoint, PathLine, StaticNetwork, StaticShip};
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn ship(id: &str, start_time: f64, max_speed: f64) -> ShipHandle {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 1.0).unwrap();
        Arc::new(Mutex::new(StaticShip::new(
            id,
            start_time,
            max_speed,
            100.0,
            1000.0,
            vec![a, b],
            vec![PathLine { start: a, end: b }],
        )))
    }

    fn test_simulator(
        ships: Vec<ShipHandle>,
        dt: f64,
        externally_controlled: bool,
    ) -> (Simulator, SimSignalReceiver, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let (tx, rx) = signal_channel();
        let sim = Simulator::new(
            Some(Arc::new(StaticNetwork::new())),
            SimulatorConfig {
                ships,
                time_step: dt,
                end_time: 0.0,
                output_dir: dir.path().to_path_buf(),
                serial: 1,
                export_trajectory: true,
                externally_controlled,
                resistance_only: false,
                plot_frequency_s: None,
            },
            tx,
        )
        .unwrap();
        (sim, rx, dir)
    }

    #[test]
    fn invalid_time_step_is_fatal_at_construction() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = signal_channel();
        let err = Simulator::new(
            Some(Arc::new(StaticNetwork::new())),
            SimulatorConfig {
                ships: vec![],
                time_step: 0.0,
                end_time: 0.0,
                output_dir: dir.path().to_path_buf(),
                serial: 1,
                export_trajectory: false,
                externally_controlled: false,
                resistance_only: false,
                plot_frequency_s: None,
            },
            tx,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "domain error: Invalid time step value");
    }

    #[test]
    fn null_network_is_fatal_unless_resistance_only() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = signal_channel();
        assert!(Simulator::new(
            None,
            SimulatorConfig {
                ships: vec![],
                time_step: 1.0,
                end_time: 0.0,
                output_dir: dir.path().to_path_buf(),
                serial: 1,
                export_trajectory: false,
                externally_controlled: false,
                resistance_only: false,
                plot_frequency_s: None,
            },
            tx,
        )
        .is_err());
    }

    #[test]
    fn run_for_reaches_destination_and_finishes() {
        let s1 = ship("s1", 0.0, 10.0);
        let (mut sim, rx, _dir) = test_simulator(vec![Arc::clone(&s1)], 1.0, false);
        sim.run_for(f64::INFINITY, true, false).unwrap();
        assert_eq!(sim.state(), SimulatorState::Finished);
        assert!(s1.lock().unwrap().is_loaded());
        assert!(s1.lock().unwrap().is_reached_destination());
        let got_finished = rx.try_iter().any(|s| matches!(s, SimSignal::Finished(_)));
        assert!(got_finished);
    }

    #[test]
    fn idle_ship_fast_forwards_clock_to_start_time() {
        let (mut sim, _rx, _dir) = test_simulator(vec![ship("s1", 3600.0, 10.0)], 1.0, false);
        sim.run_one_time_step().unwrap();
        assert_eq!(sim.clock(), 3600.0);
    }

    #[test]
    fn restart_resets_clock_and_is_idempotent() {
        let (mut sim, _rx, _dir) = test_simulator(vec![ship("s1", 0.0, 10.0)], 1.0, false);
        sim.run_one_time_step().unwrap();
        assert!(sim.clock() > 0.0);
        sim.restart().unwrap();
        assert_eq!(sim.clock(), 0.0);
        sim.restart().unwrap();
        assert_eq!(sim.clock(), 0.0);
        assert_eq!(sim.state(), SimulatorState::Created);
    }

    #[test]
    fn pause_then_pause_again_stays_paused() {
        let (sim, rx, _dir) = test_simulator(vec![ship("s1", 0.0, 10.0)], 1.0, false);
        sim.pause();
        sim.pause();
        assert!(sim.control().is_paused());
        let paused_count = rx.try_iter().filter(|s| matches!(s, SimSignal::Paused)).count();
        assert_eq!(paused_count, 2);
    }

    #[test]
    fn resume_emits_signal_even_if_not_paused() {
        let (sim, rx, _dir) = test_simulator(vec![ship("s1", 0.0, 10.0)], 1.0, false);
        sim.resume();
        assert!(rx.try_iter().any(|s| matches!(s, SimSignal::Resumed)));
    }

    #[test]
    fn study_ships_resistance_writes_two_phases_separated_by_blank_lines() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = signal_channel();
        let mut sim = Simulator::new(
            None,
            SimulatorConfig {
                ships: vec![ship("s1", 0.0, 20.0 * 0.514_444), ship("s2", 0.0, 20.0 * 0.514_444)],
                time_step: 1.0,
                end_time: 0.0,
                output_dir: dir.path().to_path_buf(),
                serial: 2,
                export_trajectory: true,
                externally_controlled: false,
                resistance_only: true,
                plot_frequency_s: None,
            },
            tx,
        )
        .unwrap();
        sim.study_ships_resistance().unwrap();
        let contents = std::fs::read_to_string(sim.trajectory_path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], TrajectorySchema::ResistanceStudy.header());
        // header + 2 ships * 21 rows (0..=20kn) = 43, then two blanks, then 42 phase-2 rows.
        let blank_at = lines.iter().position(|l| l.is_empty()).unwrap();
        assert_eq!(lines[blank_at], "");
        assert_eq!(lines[blank_at + 1], "");
    }

    #[test]
    fn resistance_study_is_fatal_per_ship_without_strategy() {
        let dir = tempdir().unwrap();
        let (tx, _rx) = signal_channel();
        let broken = Arc::new(Mutex::new(
            StaticShip::new(
                "broken",
                0.0,
                10.0,
                100.0,
                1000.0,
                vec![GeoPoint::new(0.0, 0.0).unwrap(), GeoPoint::new(0.0, 1.0).unwrap()],
                vec![PathLine {
                    start: GeoPoint::new(0.0, 0.0).unwrap(),
                    end: GeoPoint::new(0.0, 1.0).unwrap(),
                }],
            )
            .without_resistance_strategy(),
        )) as ShipHandle;
        let mut sim = Simulator::new(
            None,
            SimulatorConfig {
                ships: vec![broken],
                time_step: 1.0,
                end_time: 0.0,
                output_dir: dir.path().to_path_buf(),
                serial: 3,
                export_trajectory: true,
                externally_controlled: false,
                resistance_only: true,
                plot_frequency_s: None,
            },
            tx,
        )
        .unwrap();
        assert!(sim.study_ships_resistance().is_err());
    }
}

//! The coordinator: the process-singleton surface that turns broker
//! commands into operations against the
//! [`WorldRegistry`](crate::world::WorldRegistry).
//!
//! Every command here validates the world(s) it names and returns a
//! [`SimError`] on failure; [`crate::dispatch`] is the boundary that
//! converts that failure into an `errorOccurred` event and clears the busy
//! flag — the coordinator itself never swallows an error into a log line.
//!
//! Two command shapes are handled differently here:
//! - `pause`/`resume`/`terminate` act directly on a World's
//!   [`SimulatorControl`], bypassing the worker queue entirely, for the
//!   same reason `control.rs` gives: a long `run_for` would otherwise never
//!   yield to a queued pause.
//! - Everything else that mutates a World's `Simulator` or ship index goes
//!   through `World::worker`, preserving the invariant that at most one
//!   operation is in flight per World at a time.
//!
//! A dedicated signal-pump thread per World (spawned in
//! `create_environment`) is the only consumer of that World's
//! [`SimSignalReceiver`]; it turns the streaming, worker-thread-originated
//! signals (`ProgressUpdated`, `ReachedReportingTime`, `AllReachedDestination`,
//! `Finished`, `Error`) into [`CoordinatorEvent`]s, applying the barrier/
//! immediate aggregation discipline for the two that are meaningfully
//! cross-world (`Advanced`, `ResultsAvailable`). Commands the coordinator
//! issues and completes synchronously (`pause`, `add_ships`, ...) emit
//! their event directly instead of round-tripping through a signal — the
//! pump would otherwise have no way to tell which in-flight command a
//! given signal belongs to.

pub mod events;
pub mod tracker;

pub use events::{event_channel, CoordinatorEvent, CoordinatorEventReceiver, CoordinatorEventSender};
pub use tracker::RequestTracker;

use crate::config;
use crate::error::{SimError, SimResult};
use crate::model::{GeoPoint, Network, Ship, ShipHandle, ShipsResults, StaticNetwork};
use crate::ship_loader::ShipLoader;
use crate::simulator::{signal_channel, SimSignal, Simulator, SimulatorConfig, SimulatorControl};
use crate::world::{AggregationMode, World, WorldRegistry};
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

fn lock_ship(handle: &ShipHandle) -> SimResult<std::sync::MutexGuard<'_, dyn Ship>> {
    handle
        .lock()
        .map_err(|_| SimError::Coordination("ship mutex poisoned".to_string()))
}

/// Parameters for [`Coordinator::create_environment`], grouped for the same
/// reason [`SimulatorConfig`] is: a long, mostly-optional argument list
/// calls for a named-fields struct instead.
pub struct CreateEnvironmentParams {
    pub ships: Vec<ShipHandle>,
    pub time_step: f64,
    pub end_time: f64,
    pub externally_controlled: bool,
    pub resistance_only: bool,
    pub mode: AggregationMode,
    pub export_trajectory: bool,
    pub plot_frequency_s: Option<f64>,
}

pub struct Coordinator {
    registry: Arc<WorldRegistry>,
    events_tx: CoordinatorEventSender,
    pause_tracker: Arc<RequestTracker<()>>,
    resume_tracker: Arc<RequestTracker<()>>,
    terminate_tracker: Arc<RequestTracker<()>>,
    restart_tracker: Arc<RequestTracker<()>>,
    advance_tracker: Arc<RequestTracker<(f64, u8)>>,
    ports_tracker: Arc<RequestTracker<Vec<String>>>,
    results_tracker: Arc<RequestTracker<ShipsResults>>,
    current_results_tracker: Arc<RequestTracker<Vec<(String, String)>>>,
}

impl Coordinator {
    pub fn new(registry: Arc<WorldRegistry>) -> (Self, CoordinatorEventReceiver) {
        let (events_tx, events_rx) = event_channel();
        let coordinator = Self {
            registry,
            events_tx,
            pause_tracker: Arc::new(RequestTracker::new()),
            resume_tracker: Arc::new(RequestTracker::new()),
            terminate_tracker: Arc::new(RequestTracker::new()),
            restart_tracker: Arc::new(RequestTracker::new()),
            advance_tracker: Arc::new(RequestTracker::new()),
            ports_tracker: Arc::new(RequestTracker::new()),
            results_tracker: Arc::new(RequestTracker::new()),
            current_results_tracker: Arc::new(RequestTracker::new()),
        };
        (coordinator, events_rx)
    }

    pub fn registry(&self) -> &Arc<WorldRegistry> {
        &self.registry
    }

    /// `checkConnection`: answered immediately, with no world lookup.
    pub fn check_connection(&self) {
        let _ = self.events_tx.send(CoordinatorEvent::ConnectionStatus { connected: true });
    }

    /// The fold point for every command-dispatch failure: no command is
    /// allowed to raise past the dispatch boundary, so [`crate::dispatch`]
    /// converts every `Err` it sees into a call here instead.
    pub fn emit_error(&self, message: impl Into<String>) {
        let _ = self.events_tx.send(CoordinatorEvent::Error {
            message: message.into(),
        });
    }

    fn partition_by_mode(&self, names: &[String]) -> SimResult<Vec<(AggregationMode, Vec<String>)>> {
        let mut barrier = Vec::new();
        let mut immediate = Vec::new();
        for name in names {
            let world = self.registry.require(name)?;
            match world.mode() {
                AggregationMode::Barrier => barrier.push(name.clone()),
                AggregationMode::Immediate => immediate.push(name.clone()),
            }
        }
        let mut groups = Vec::new();
        if !barrier.is_empty() {
            groups.push((AggregationMode::Barrier, barrier));
        }
        if !immediate.is_empty() {
            groups.push((AggregationMode::Immediate, immediate));
        }
        Ok(groups)
    }

    /// Emit one aggregated event (Barrier) or one event per world
    /// (Immediate) from whatever a tracker has accumulated so far, clearing
    /// it afterwards.
    fn flush_tracker<T: Clone>(
        &self,
        mode: AggregationMode,
        tracker: &RequestTracker<T>,
        make_event: impl Fn(Vec<(String, T)>) -> CoordinatorEvent,
    ) {
        match mode {
            AggregationMode::Barrier => {
                if tracker.is_complete() {
                    let worlds: Vec<(String, T)> = tracker.get_buffer().into_iter().collect();
                    let _ = self.events_tx.send(make_event(worlds));
                    tracker.clear_all();
                }
            }
            AggregationMode::Immediate => {
                for entry in tracker.get_buffer() {
                    let _ = self.events_tx.send(make_event(vec![entry]));
                }
                tracker.clear_all();
            }
        }
    }

    // --- network / environment lifecycle -----------------------------

    /// Replace (or create) a world's network. `Network::load` is
    /// synchronous here, so this is a direct call rather than a wait on
    /// some loaded/error callback.
    pub fn load_network(&self, name: &str, path: Option<&str>) -> SimResult<()> {
        if self.registry.contains(name) {
            self.registry.remove(name);
        }
        let mut network = StaticNetwork::new();
        network.load(path)?;
        self.registry.add_or_update(World::new(name, Box::new(network)));
        let _ = self
            .events_tx
            .send(CoordinatorEvent::NetworkLoaded { world: name.to_string() });
        Ok(())
    }

    pub fn create_environment(&self, name: &str, params: CreateEnvironmentParams) -> SimResult<()> {
        let world = self.registry.require(name)?;
        world.set_mode(params.mode);
        world.resistance_only.store(params.resistance_only, Ordering::SeqCst);

        let (signal_tx, signal_rx) = signal_channel();
        *world
            .signal_rx
            .lock()
            .expect("world signal_rx mutex poisoned") = Some(signal_rx);

        let network: Option<Arc<dyn Network>> = if params.resistance_only {
            None
        } else {
            Some(Arc::new(world.network.clone()))
        };

        let config = SimulatorConfig {
            ships: params.ships,
            time_step: params.time_step,
            end_time: params.end_time,
            output_dir: config::get().resolved_output_dir(),
            serial: now_millis(),
            export_trajectory: params.export_trajectory,
            externally_controlled: params.externally_controlled,
            resistance_only: params.resistance_only,
            plot_frequency_s: params.plot_frequency_s,
        };

        let mut simulator = Simulator::new(network, config, signal_tx)?;
        *world.control.lock().expect("control mutex poisoned") = Some(simulator.control());
        simulator.initialize(true)?;
        *world.simulator.lock().expect("simulator mutex poisoned") = Some(simulator);

        self.spawn_signal_pump(world.clone());

        let _ = self
            .events_tx
            .send(CoordinatorEvent::Created { world: name.to_string() });
        Ok(())
    }

    /// Drain one World's signal receiver for the lifetime of the process,
    /// translating streaming simulator signals into coordinator events.
    /// Commands the coordinator completes synchronously (`pause`,
    /// `add_ships`, ...) emit their own event directly and are ignored
    /// here if they also happen to cross this channel.
    fn spawn_signal_pump(&self, world: World) {
        let rx = match world.take_signal_rx() {
            Some(rx) => rx,
            None => return,
        };
        let events_tx = self.events_tx.clone();
        let advance_tracker = Arc::clone(&self.advance_tracker);
        let results_tracker = Arc::clone(&self.results_tracker);
        let world_name = world.name.clone();

        let spawned = thread::Builder::new()
            .name(format!("signal-pump-{world_name}"))
            .spawn(move || {
                for signal in rx.iter() {
                    match signal {
                        SimSignal::ProgressUpdated { percent } => {
                            if percent % config::defaults::PROGRESS_EMIT_STEP_PERCENT == 0 {
                                let _ = events_tx.send(CoordinatorEvent::ProgressUpdated {
                                    world: world_name.clone(),
                                    percent,
                                });
                            }
                        }
                        SimSignal::ReachedReportingTime { clock, percent } => match world.mode() {
                            AggregationMode::Immediate => {
                                let _ = events_tx.send(CoordinatorEvent::Advanced {
                                    worlds: vec![(world_name.clone(), clock, percent)],
                                });
                            }
                            AggregationMode::Barrier => {
                                advance_tracker.add_or_update(&world_name, (clock, percent));
                                if advance_tracker.is_complete() {
                                    let worlds = advance_tracker.get_buffer().into_iter().collect();
                                    let _ = events_tx.send(CoordinatorEvent::Advanced { worlds });
                                    advance_tracker.clear_all();
                                }
                            }
                        },
                        SimSignal::AllReachedDestination => {
                            let _ = events_tx.send(CoordinatorEvent::AllReachedDestination {
                                world: world_name.clone(),
                            });
                        }
                        SimSignal::Finished(results) => match world.mode() {
                            AggregationMode::Immediate => {
                                let _ = events_tx.send(CoordinatorEvent::ResultsAvailable {
                                    worlds: vec![(world_name.clone(), *results)],
                                });
                            }
                            AggregationMode::Barrier => {
                                results_tracker.add_or_update(&world_name, *results);
                                if results_tracker.is_complete() {
                                    let worlds = results_tracker.get_buffer().into_iter().collect();
                                    let _ = events_tx.send(CoordinatorEvent::ResultsAvailable { worlds });
                                    results_tracker.clear_all();
                                }
                            }
                        },
                        SimSignal::Error(message) => {
                            let _ = events_tx.send(CoordinatorEvent::Error { message });
                        }
                        // Initialized/Restarted/Paused/Resumed/Terminated/ShipAdded are
                        // emitted directly by the command that caused them; PlotUpdate
                        // has no corresponding wire event.
                        _ => {}
                    }
                }
            });
        if let Err(err) = spawned {
            tracing::error!(world = %world.name, %err, "failed to spawn signal pump thread");
        }
    }

    // --- ships ---------------------------------------------------------

    pub fn add_ships(&self, name: &str, ships: Vec<ShipHandle>) -> SimResult<Vec<String>> {
        let world = self.registry.require(name)?;
        for ship in &ships {
            let id = lock_ship(ship)?.user_id().to_string();
            world
                .ship_index
                .lock()
                .expect("ship index mutex poisoned")
                .insert(id, Arc::clone(ship));
        }
        let worker_world = world.clone();
        let ids = world
            .worker
            .invoke(move || -> SimResult<Vec<String>> {
                let mut guard = worker_world
                    .simulator
                    .lock()
                    .expect("simulator mutex poisoned");
                let sim = guard
                    .as_mut()
                    .ok_or_else(|| SimError::Domain("world has no simulator".to_string()))?;
                sim.add_ships(ships)
            })??;
        let _ = self.events_tx.send(CoordinatorEvent::ShipsAdded {
            world: name.to_string(),
            ship_ids: ids.clone(),
        });
        Ok(ids)
    }

    pub fn load_ships_from_file(
        &self,
        name: &str,
        contents: &str,
        resistance_only: bool,
        start_time: f64,
    ) -> SimResult<Vec<String>> {
        let world = self.registry.require(name)?;
        let network = world.network.clone();
        let contents = contents.to_string();
        let ships = world
            .worker
            .invoke(move || ShipLoader::load_from_file(&contents, resistance_only, &network, start_time))??;
        self.add_ships(name, ships)
    }

    pub fn load_ships_from_records(
        &self,
        name: &str,
        records: &[HashMap<String, String>],
        resistance_only: bool,
        start_time: f64,
    ) -> SimResult<Vec<String>> {
        let world = self.registry.require(name)?;
        let network = world.network.clone();
        let records = records.to_vec();
        let ships = world.worker.invoke(move || {
            crate::ship_loader::records::parse_records(&records, resistance_only)
                .and_then(|params| ShipLoader::bind(params, &network, start_time))
        })??;
        self.add_ships(name, ships)
    }

    pub fn load_ships_from_wire_object(
        &self,
        name: &str,
        value: &serde_json::Value,
        resistance_only: bool,
        start_time: f64,
    ) -> SimResult<Vec<String>> {
        let world = self.registry.require(name)?;
        let network = world.network.clone();
        let value = value.clone();
        let ships = world
            .worker
            .invoke(move || ShipLoader::load_from_wire_object(&value, resistance_only, &network, start_time))??;
        self.add_ships(name, ships)
    }

    // --- run control -----------------------------------------------------

    /// Posted, fire-and-forget: `run_for` can take an arbitrary amount of
    /// wall time, so the caller must not block on it. Progress streams back
    /// through the signal pump instead.
    pub fn run_for(
        &self,
        names: &[String],
        duration: f64,
        end_after_run: bool,
        emit_step_signal: bool,
    ) -> SimResult<()> {
        self.advance_tracker.set_requested(names.iter().cloned());
        for name in names {
            let world = self.registry.require(name)?;
            world.set_busy(true);
            let worker_world = world.clone();
            let name_owned = name.clone();
            let events_tx = self.events_tx.clone();
            world.worker.post(Box::new(move || {
                let result = {
                    let mut guard = worker_world
                        .simulator
                        .lock()
                        .expect("simulator mutex poisoned");
                    match guard.as_mut() {
                        Some(sim) => sim.run_for(duration, end_after_run, emit_step_signal),
                        None => Err(SimError::Domain(format!("world {name_owned} has no simulator"))),
                    }
                };
                if let Err(err) = result {
                    let _ = events_tx.send(CoordinatorEvent::Error {
                        message: err.to_string(),
                    });
                }
                worker_world.set_busy(false);
            }))?;
        }
        Ok(())
    }

    /// Bypasses the worker queue so it can interrupt a `run_for` in
    /// progress (see module docs and `simulator::control`).
    fn dispatch_control_command(
        &self,
        names: &[String],
        tracker: &Arc<RequestTracker<()>>,
        apply: fn(&SimulatorControl),
        make_event: fn(Vec<String>) -> CoordinatorEvent,
    ) -> SimResult<()> {
        for (mode, group) in self.partition_by_mode(names)? {
            tracker.set_requested(group.clone());
            for name in &group {
                let world = self.registry.require(name)?;
                let control = world
                    .control
                    .lock()
                    .expect("control mutex poisoned")
                    .clone()
                    .ok_or_else(|| SimError::Domain(format!("world {name} has no simulator")))?;
                apply(&control);
                tracker.add_or_update(name, ());
            }
            self.flush_tracker(mode, tracker, move |worlds: Vec<(String, ())>| {
                make_event(worlds.into_iter().map(|(n, _)| n).collect())
            });
        }
        Ok(())
    }

    pub fn pause(&self, names: &[String]) -> SimResult<()> {
        let tracker = Arc::clone(&self.pause_tracker);
        self.dispatch_control_command(names, &tracker, SimulatorControl::pause, |worlds| {
            CoordinatorEvent::Paused { worlds }
        })
    }

    pub fn resume(&self, names: &[String]) -> SimResult<()> {
        let tracker = Arc::clone(&self.resume_tracker);
        self.dispatch_control_command(names, &tracker, SimulatorControl::resume, |worlds| {
            CoordinatorEvent::Resumed { worlds }
        })
    }

    pub fn terminate(&self, names: &[String]) -> SimResult<()> {
        let tracker = Arc::clone(&self.terminate_tracker);
        self.dispatch_control_command(names, &tracker, SimulatorControl::terminate, |worlds| {
            CoordinatorEvent::Terminated { worlds }
        })
    }

    /// Restart touches the ship list, not just the control flag, so it
    /// routes through the worker queue like any other state mutation.
    pub fn restart(&self, names: &[String]) -> SimResult<()> {
        for (mode, group) in self.partition_by_mode(names)? {
            self.restart_tracker.set_requested(group.clone());
            for name in &group {
                let world = self.registry.require(name)?;
                let worker_world = world.clone();
                world
                    .worker
                    .invoke(move || -> SimResult<()> {
                        let mut guard = worker_world
                            .simulator
                            .lock()
                            .expect("simulator mutex poisoned");
                        guard
                            .as_mut()
                            .ok_or_else(|| SimError::Domain("world has no simulator".to_string()))?
                            .restart()
                    })??;
                self.restart_tracker.add_or_update(name, ());
            }
            self.flush_tracker(mode, &self.restart_tracker, |worlds: Vec<(String, ())>| {
                CoordinatorEvent::Restarted {
                    worlds: worlds.into_iter().map(|(n, _)| n).collect(),
                }
            });
        }
        Ok(())
    }

    pub fn finalize(&self, names: &[String]) -> SimResult<()> {
        for (mode, group) in self.partition_by_mode(names)? {
            self.results_tracker.set_requested(group.clone());
            for name in &group {
                let world = self.registry.require(name)?;
                world.set_busy(true);
                let worker_world = world.clone();
                let results = world
                    .worker
                    .invoke(move || -> SimResult<ShipsResults> {
                        let mut guard = worker_world
                            .simulator
                            .lock()
                            .expect("simulator mutex poisoned");
                        guard
                            .as_mut()
                            .ok_or_else(|| SimError::Domain("world has no simulator".to_string()))?
                            .finalize()
                    })??;
                world.set_busy(false);
                self.results_tracker.add_or_update(name, results);
            }
            self.flush_tracker(mode, &self.results_tracker, |worlds| {
                CoordinatorEvent::ResultsAvailable { worlds }
            });
        }
        Ok(())
    }

    pub fn available_ports(&self, names: &[String], only_on_paths: bool) -> SimResult<()> {
        for (mode, group) in self.partition_by_mode(names)? {
            self.ports_tracker.set_requested(group.clone());
            for name in &group {
                let world = self.registry.require(name)?;
                world.set_busy(true);
                let ship_paths: Vec<Vec<GeoPoint>> = world
                    .ship_index
                    .lock()
                    .expect("ship index mutex poisoned")
                    .values()
                    .map(|s| s.lock().expect("ship mutex poisoned").path_points().to_vec())
                    .collect();
                let ports = world.network.available_ports(only_on_paths, &ship_paths);
                world.set_busy(false);
                self.ports_tracker.add_or_update(name, ports);
            }
            self.flush_tracker(mode, &self.ports_tracker, |worlds| {
                CoordinatorEvent::PortsAvailable { worlds }
            });
        }
        Ok(())
    }

    pub fn current_results(&self, names: &[String]) -> SimResult<()> {
        for (mode, group) in self.partition_by_mode(names)? {
            self.current_results_tracker.set_requested(group.clone());
            for name in &group {
                let world = self.registry.require(name)?;
                let worker_world = world.clone();
                let kv = world
                    .worker
                    .invoke(move || -> SimResult<Vec<(String, String)>> {
                        let guard = worker_world
                            .simulator
                            .lock()
                            .expect("simulator mutex poisoned");
                        guard
                            .as_ref()
                            .ok_or_else(|| SimError::Domain("world has no simulator".to_string()))?
                            .current_summary()
                    })??;
                self.current_results_tracker.add_or_update(name, kv);
            }
            self.flush_tracker(mode, &self.current_results_tracker, |worlds| {
                CoordinatorEvent::CurrentResults { worlds }
            });
        }
        Ok(())
    }

    pub fn current_state(&self, name: &str) -> SimResult<()> {
        let world = self.registry.require(name)?;
        let worker_world = world.clone();
        let (clock, percent, ship_ids) = world
            .worker
            .invoke(move || -> SimResult<(f64, u8, Vec<String>)> {
                let guard = worker_world
                    .simulator
                    .lock()
                    .expect("simulator mutex poisoned");
                let sim = guard
                    .as_ref()
                    .ok_or_else(|| SimError::Domain("world has no simulator".to_string()))?;
                let mut ids = Vec::with_capacity(sim.ships().len());
                for ship in sim.ships() {
                    ids.push(lock_ship(ship)?.user_id().to_string());
                }
                Ok((sim.clock(), sim.progress_percent(), ids))
            })??;
        let _ = self.events_tx.send(CoordinatorEvent::CurrentState {
            world: name.to_string(),
            clock,
            progress_percent: percent,
            ship_ids,
        });
        Ok(())
    }

    pub fn ship_state(&self, name: &str, id: &str) -> SimResult<()> {
        let ship = self
            .registry
            .get_ship_by_id(name, id)
            .ok_or_else(|| SimError::Domain(format!("unknown ship {id} in world {name}")))?;
        let guard = lock_ship(&ship)?;
        let pos = guard.current_position();
        let _ = self.events_tx.send(CoordinatorEvent::ShipState {
            world: name.to_string(),
            ship_id: id.to_string(),
            position: (pos.lon, pos.lat),
            speed: guard.speed(),
            reached_destination: guard.is_reached_destination(),
        });
        Ok(())
    }

    /// `restServer`: destroy every world and every tracker's accumulated
    /// state; the signal graph is reinstalled the next time
    /// `create_environment` runs for a given name.
    pub fn reset_api(&self) {
        self.registry.clear();
        self.pause_tracker.clear_all();
        self.resume_tracker.clear_all();
        self.terminate_tracker.clear_all();
        self.restart_tracker.clear_all();
        self.advance_tracker.clear_all();
        self.ports_tracker.clear_all();
        self.results_tracker.clear_all();
        self.current_results_tracker.clear_all();
        let _ = self.events_tx.send(CoordinatorEvent::ServerReset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::AggregationMode;

    fn new_coordinator() -> (Coordinator, CoordinatorEventReceiver) {
        Coordinator::new(Arc::new(WorldRegistry::new()))
    }

    fn wait_for<F: Fn(&CoordinatorEvent) -> bool>(
        rx: &CoordinatorEventReceiver,
        predicate: F,
    ) -> CoordinatorEvent {
        loop {
            let event = rx
                .recv_timeout(std::time::Duration::from_secs(2))
                .expect("expected a coordinator event");
            if predicate(&event) {
                return event;
            }
        }
    }

    #[test]
    fn load_network_then_create_environment_emits_created() {
        let (coordinator, rx) = new_coordinator();
        coordinator.load_network("A", None).unwrap();
        assert!(matches!(
            rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap(),
            CoordinatorEvent::NetworkLoaded { .. }
        ));

        coordinator
            .create_environment(
                "A",
                CreateEnvironmentParams {
                    ships: Vec::new(),
                    time_step: 1.0,
                    end_time: 0.0,
                    externally_controlled: false,
                    resistance_only: false,
                    mode: AggregationMode::Barrier,
                    export_trajectory: false,
                    plot_frequency_s: None,
                },
            )
            .unwrap();
        assert!(matches!(
            rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap(),
            CoordinatorEvent::Created { .. }
        ));
    }

    #[test]
    fn pause_on_unknown_world_is_a_domain_error() {
        let (coordinator, _rx) = new_coordinator();
        let err = coordinator.pause(&["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, SimError::Domain(_)));
    }

    #[test]
    fn barrier_mode_pause_emits_once_for_every_requested_world() {
        let (coordinator, rx) = new_coordinator();
        for name in ["A", "B"] {
            coordinator.load_network(name, None).unwrap();
            coordinator
                .create_environment(
                    name,
                    CreateEnvironmentParams {
                        ships: Vec::new(),
                        time_step: 1.0,
                        end_time: 0.0,
                        externally_controlled: false,
                        resistance_only: false,
                        mode: AggregationMode::Barrier,
                        export_trajectory: false,
                        plot_frequency_s: None,
                    },
                )
                .unwrap();
        }
        // Drain the NetworkLoaded/Created events from setup.
        for _ in 0..4 {
            rx.recv_timeout(std::time::Duration::from_secs(1)).unwrap();
        }

        coordinator
            .pause(&["A".to_string(), "B".to_string()])
            .unwrap();
        let event = wait_for(&rx, |e| matches!(e, CoordinatorEvent::Paused { .. }));
        let CoordinatorEvent::Paused { mut worlds } = event else {
            unreachable!()
        };
        worlds.sort();
        assert_eq!(worlds, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn reset_api_clears_the_registry() {
        let (coordinator, _rx) = new_coordinator();
        coordinator.load_network("A", None).unwrap();
        assert!(coordinator.registry().contains("A"));
        coordinator.reset_api();
        assert!(!coordinator.registry().contains("A"));
    }
}

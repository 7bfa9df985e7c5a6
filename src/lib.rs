//! ShipNetSim core: a multi-world discrete-event maritime simulation
//! engine with a broker-facing command/event control plane.
//!
//! A [`world::World`] bundles a network, a [`simulator::Simulator`], and
//! the ship index that fills it, each mutated serially by its own
//! [`world::Worker`] thread. The [`coordinator::Coordinator`] is the
//! process-facing API: it turns inbound commands into per-world
//! operations and aggregates their results, either per-world as they
//! report (`Immediate`) or once every requested world has reported
//! (`Barrier`). [`broker`] is the only boundary that talks to the outside
//! world — an AMQP consumer/publisher pair running on its own Tokio
//! runtime, translating [`dispatch`]'s JSON commands into calls on the
//! coordinator and its outbound events back into wire JSON.

pub mod broker;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod ship_loader;
pub mod simulator;
pub mod sinks;
pub mod world;

pub use config::Settings;
pub use coordinator::{Coordinator, CoordinatorEvent};
pub use error::{SimError, SimResult};
pub use model::{GeoPoint, Network, Ship, ShipHandle, ShipsResults, StaticNetwork, StaticShip};
pub use simulator::{Simulator, SimulatorConfig, SimulatorState};
pub use world::{AggregationMode, World, WorldRegistry};

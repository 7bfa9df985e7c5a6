//! Ship loading: turns one of the three input shapes (line-oriented file,
//! structured records, wire object) into bound [`ShipHandle`]s, resolving
//! each ship's path against a [`Network`] capability.
//!
//! The column schema, its converters, and the "na"-means-unset convention
//! live in [`schema`] as the single source of truth; [`file`] and
//! [`records`] each adapt one input shape onto it.

pub mod file;
pub mod records;
pub mod schema;

use crate::error::SimResult;
use crate::model::{Network, ShipHandle, ShipParameters, StaticShip};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct ShipLoader;

impl ShipLoader {
    /// Parse a TAB-delimited ship definition file and bind every ship's
    /// path against `network`.
    pub fn load_from_file(
        contents: &str,
        resistance_only: bool,
        network: &dyn Network,
        start_time: f64,
    ) -> SimResult<Vec<ShipHandle>> {
        let params = file::parse_file(contents, resistance_only)?;
        Self::bind(params, network, start_time)
    }

    /// Parse structured records (one string-keyed map per ship).
    pub fn load_from_records(
        records: &[HashMap<String, String>],
        resistance_only: bool,
        network: &dyn Network,
        start_time: f64,
    ) -> SimResult<Vec<ShipHandle>> {
        let params = records::parse_records(records, resistance_only)?;
        Self::bind(params, network, start_time)
    }

    /// Parse the `{"ships": [...]}` wire object shape.
    pub fn load_from_wire_object(
        value: &serde_json::Value,
        resistance_only: bool,
        network: &dyn Network,
        start_time: f64,
    ) -> SimResult<Vec<ShipHandle>> {
        let params = records::parse_wire_object(value, resistance_only)?;
        Self::bind(params, network, start_time)
    }

    /// Already-parsed parameters, e.g. ships added programmatically by a
    /// test or by a caller that built `ShipParameters` directly.
    pub fn bind(
        params: Vec<ShipParameters>,
        network: &dyn Network,
        start_time: f64,
    ) -> SimResult<Vec<ShipHandle>> {
        params
            .into_iter()
            .map(|p| Self::bind_one(p, network, start_time))
            .collect()
    }

    fn bind_one(
        params: ShipParameters,
        network: &dyn Network,
        start_time: f64,
    ) -> SimResult<ShipHandle> {
        let (points, lines) = network.shortest_path(&params.path)?;
        let ship = StaticShip::new(
            params.id,
            start_time,
            params.max_speed_mps,
            params.waterline_length_m,
            params.cargo_weight_tons,
            points,
            lines,
        );
        Ok(Arc::new(Mutex::new(ship)) as ShipHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StaticNetwork;

    fn sample_line() -> String {
        [
            "ship-1", "0,0;1,1", "12", "100", "98", "20", "6", "6.2", "na", "na", "500", "2",
            "10", "5", "na", "0.00015", "0.5", "normal", "na", "na", "na", "na", "HFO", "50000",
            "90", "10", "1", "1000,2000,3000,4000", "500,100,0.9;1000,200,0.92", "na", "0.98",
            "0.97", "0.99", "1", "5", "4", "4", "0.6", "na", "na", "20000", "5000", "na",
        ]
        .join("\t")
    }

    #[test]
    fn loads_and_binds_a_ship_to_the_network() {
        let network = StaticNetwork::new();
        let handles =
            ShipLoader::load_from_file(&sample_line(), false, &network, 0.0).unwrap();
        assert_eq!(handles.len(), 1);
        let ship = handles[0].lock().unwrap();
        assert_eq!(ship.user_id(), "ship-1");
        assert_eq!(ship.path_points().len(), 2);
    }

    #[test]
    fn rejects_unresolvable_path() {
        let network = StaticNetwork::new();
        let mut line = sample_line();
        line = line.replacen("0,0;1,1", "0,0", 1);
        assert!(ShipLoader::load_from_file(&line, false, &network, 0.0).is_err());
    }
}

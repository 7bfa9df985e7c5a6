//! Command dispatch. Parses one inbound JSON envelope,
//! validates the fields the named command requires, and calls into the
//! [`Coordinator`]. Every path ends in exactly one terminal event on the
//! coordinator's event channel — either whatever the coordinator call
//! itself emits on success, or `errorOccurred` via [`Coordinator::emit_error`]
//! on any failure. That "always exactly one terminal event" contract is
//! what lets the broker's busy-flag guard release unconditionally once
//! [`dispatch`] returns.

use crate::coordinator::{Coordinator, CreateEnvironmentParams};
use crate::world::AggregationMode;
use serde_json::Value;

/// Parse and execute one inbound command envelope. Never panics and never
/// propagates a failure past this call; every error becomes an
/// `errorOccurred` event instead.
pub fn dispatch(coordinator: &Coordinator, body: &[u8]) {
    let envelope: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(err) => {
            coordinator.emit_error(format!("malformed command JSON: {err}"));
            return;
        }
    };

    let command = match envelope.get("command").and_then(Value::as_str) {
        Some(c) => c,
        None => {
            coordinator.emit_error("command envelope is missing a 'command' field".to_string());
            return;
        }
    };

    let result = match command {
        "checkConnection" => {
            coordinator.check_connection();
            Ok(())
        }
        "defineSimulator" => handle_define_simulator(coordinator, &envelope),
        "runSimulator" => handle_run_simulator(coordinator, &envelope),
        "terminateSimulator" => {
            network_names(&envelope, command).and_then(|names| coordinator.terminate(&names))
        }
        "endSimulator" => {
            network_names(&envelope, command).and_then(|names| coordinator.finalize(&names))
        }
        "addShipsToSimulator" => handle_add_ships(coordinator, &envelope),
        "addContainersToShip" => handle_add_containers_to_ship(coordinator, &envelope),
        "getNetworkSeaPorts" => handle_get_sea_ports(coordinator, &envelope),
        "unloadContainersFromShipAtCurrentTerminal" => {
            handle_unload_containers(coordinator, &envelope)
        }
        "restServer" => {
            coordinator.reset_api();
            Ok(())
        }
        other => Err(format!("unrecognized command: {other}")),
    };

    if let Err(message) = result {
        coordinator.emit_error(message);
    }
}

fn require_str<'a>(value: &'a Value, field: &str, command: &str) -> Result<&'a str, String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("'{command}' requires a string field '{field}'"))
}

fn require_f64(value: &Value, field: &str, command: &str) -> Result<f64, String> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("'{command}' requires a numeric field '{field}'"))
}

fn require_array<'a>(
    value: &'a Value,
    field: &str,
    command: &str,
) -> Result<&'a Vec<Value>, String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| format!("'{command}' requires a non-empty array field '{field}'"))
}

fn string_array(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn network_names(value: &Value, command: &str) -> Result<Vec<String>, String> {
    Ok(string_array(require_array(value, "networkNames", command)?))
}

/// `defineSimulator`: loads the network, optionally seeds it with an inline
/// `ships` array, then creates the simulation environment. The run is
/// left externally controlled — `runSimulator` is what actually steps it.
fn handle_define_simulator(coordinator: &Coordinator, value: &Value) -> Result<(), String> {
    const COMMAND: &str = "defineSimulator";
    let network_name = require_str(value, "networkName", COMMAND)?;
    let time_step = require_f64(value, "timeStep", COMMAND)?;
    if time_step <= 0.0 {
        return Err("Invalid time step value".to_string());
    }
    let network_file_path = value.get("networkFilePath").and_then(Value::as_str);
    let resistance_only = value
        .get("resistanceOnly")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    coordinator
        .load_network(network_name, network_file_path)
        .map_err(|e| e.to_string())?;

    if let Some(ships) = value.get("ships").filter(|v| !v.is_null()) {
        coordinator
            .load_ships_from_wire_object(
                network_name,
                &serde_json::json!({ "ships": ships }),
                resistance_only,
                0.0,
            )
            .map_err(|e| e.to_string())?;
    }

    coordinator
        .create_environment(
            network_name,
            CreateEnvironmentParams {
                ships: Vec::new(),
                time_step,
                end_time: 0.0,
                externally_controlled: true,
                resistance_only,
                mode: AggregationMode::Barrier,
                export_trajectory: true,
                plot_frequency_s: None,
            },
        )
        .map_err(|e| e.to_string())
}

/// `runSimulator`: `byTimeSteps <= 0` means "run to natural completion",
/// wired here to an unbounded duration plus the end-of-run finalize flag
/// instead of a second control path.
fn handle_run_simulator(coordinator: &Coordinator, value: &Value) -> Result<(), String> {
    const COMMAND: &str = "runSimulator";
    let names = network_names(value, COMMAND)?;
    let by_time_steps = require_f64(value, "byTimeSteps", COMMAND)?;

    let (duration, end_after_run, emit_step_signal) = if by_time_steps <= 0.0 {
        (f64::INFINITY, true, true)
    } else {
        (by_time_steps, false, false)
    };

    coordinator
        .run_for(&names, duration, end_after_run, emit_step_signal)
        .map_err(|e| e.to_string())
}

fn handle_add_ships(coordinator: &Coordinator, value: &Value) -> Result<(), String> {
    const COMMAND: &str = "addShipsToSimulator";
    let network_name = require_str(value, "networkName", COMMAND)?;
    let ships = require_array(value, "ships", COMMAND)?;
    if ships.iter().any(|s| !s.is_object()) {
        return Err(format!("'{COMMAND}' ships array contains a non-object entry"));
    }

    coordinator
        .load_ships_from_wire_object(
            network_name,
            &serde_json::json!({ "ships": ships }),
            false,
            0.0,
        )
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Cargo container modeling is out of scope; these two commands are opaque
/// pass-throughs whose only observable effect here is confirming the
/// referenced ship exists and reporting its state.
fn handle_add_containers_to_ship(coordinator: &Coordinator, value: &Value) -> Result<(), String> {
    const COMMAND: &str = "addContainersToShip";
    let network_name = require_str(value, "networkName", COMMAND)?;
    let ship_id = require_str(value, "shipID", COMMAND)?;
    require_array(value, "containers", COMMAND)?;
    coordinator
        .ship_state(network_name, ship_id)
        .map_err(|e| e.to_string())
}

fn handle_unload_containers(coordinator: &Coordinator, value: &Value) -> Result<(), String> {
    const COMMAND: &str = "unloadContainersFromShipAtCurrentTerminal";
    let network_name = require_str(value, "networkName", COMMAND)?;
    let ship_id = require_str(value, "shipID", COMMAND)?;
    require_array(value, "portNames", COMMAND)?;
    coordinator
        .ship_state(network_name, ship_id)
        .map_err(|e| e.to_string())
}

fn handle_get_sea_ports(coordinator: &Coordinator, value: &Value) -> Result<(), String> {
    const COMMAND: &str = "getNetworkSeaPorts";
    let network_name = require_str(value, "networkName", COMMAND)?;
    let consider_ships_path_only = value
        .get("considerShipsPathOnly")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    coordinator
        .available_ports(&[network_name.to_string()], consider_ships_path_only)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldRegistry;
    use std::sync::Arc;
    use std::time::Duration;

    fn new_coordinator() -> (Coordinator, crate::coordinator::CoordinatorEventReceiver) {
        Coordinator::new(Arc::new(WorldRegistry::new()))
    }

    #[test]
    fn malformed_json_emits_an_error_event() {
        let (coordinator, rx) = new_coordinator();
        dispatch(&coordinator, b"not json");
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(event, crate::coordinator::CoordinatorEvent::Error { .. }));
    }

    #[test]
    fn missing_command_field_emits_an_error_event() {
        let (coordinator, rx) = new_coordinator();
        dispatch(&coordinator, br#"{"networkName": "A"}"#);
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(event, crate::coordinator::CoordinatorEvent::Error { .. }));
    }

    #[test]
    fn check_connection_answers_immediately() {
        let (coordinator, rx) = new_coordinator();
        dispatch(&coordinator, br#"{"command": "checkConnection"}"#);
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(
            event,
            crate::coordinator::CoordinatorEvent::ConnectionStatus { connected: true }
        ));
    }

    #[test]
    fn define_simulator_without_time_step_is_an_error() {
        let (coordinator, rx) = new_coordinator();
        dispatch(
            &coordinator,
            br#"{"command": "defineSimulator", "networkName": "A"}"#,
        );
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(event, crate::coordinator::CoordinatorEvent::Error { .. }));
    }

    #[test]
    fn define_simulator_with_non_positive_time_step_is_a_single_error_and_creates_no_world() {
        let (coordinator, rx) = new_coordinator();
        dispatch(
            &coordinator,
            br#"{"command": "defineSimulator", "networkName": "A", "timeStep": 0.0}"#,
        );
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(event, crate::coordinator::CoordinatorEvent::Error { .. }));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(coordinator.terminate(&["A".to_string()]).is_err());
    }

    #[test]
    fn define_simulator_loads_network_and_creates_environment() {
        let (coordinator, rx) = new_coordinator();
        dispatch(
            &coordinator,
            br#"{"command": "defineSimulator", "networkName": "A", "timeStep": 1.0}"#,
        );
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            crate::coordinator::CoordinatorEvent::NetworkLoaded { .. }
        ));
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            crate::coordinator::CoordinatorEvent::Created { .. }
        ));
    }

    #[test]
    fn rest_server_emits_server_reset() {
        let (coordinator, rx) = new_coordinator();
        dispatch(&coordinator, br#"{"command": "restServer"}"#);
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(event, crate::coordinator::CoordinatorEvent::ServerReset));
    }

    #[test]
    fn unrecognized_command_emits_an_error_event() {
        let (coordinator, rx) = new_coordinator();
        dispatch(&coordinator, br#"{"command": "doSomethingUnknown"}"#);
        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(event, crate::coordinator::CoordinatorEvent::Error { .. }));
    }
}

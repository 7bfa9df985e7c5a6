//! End-to-end tests that drive the coordinator the same way the broker
//! does: a JSON command envelope in, a sequence of `CoordinatorEvent`s out.
//! Exercises `dispatch` against a real `Coordinator`/`WorldRegistry` pair
//! with no broker or network I/O involved.

use shipnetsim_core::coordinator::{Coordinator, CoordinatorEvent};
use shipnetsim_core::dispatch::dispatch;
use shipnetsim_core::world::WorldRegistry;
use std::sync::Arc;
use std::time::Duration;

fn new_coordinator() -> (Coordinator, shipnetsim_core::coordinator::CoordinatorEventReceiver) {
    Coordinator::new(Arc::new(WorldRegistry::new()))
}

fn recv(rx: &shipnetsim_core::coordinator::CoordinatorEventReceiver) -> CoordinatorEvent {
    rx.recv_timeout(Duration::from_secs(2))
        .expect("expected a coordinator event")
}

fn inline_ship(id: &str) -> serde_json::Value {
    serde_json::json!({
        "ID": id,
        "Path": [[0.0, 0.0], [0.0, 1.0]],
        "MaxSpeed": "12",
        "WaterlineLength": "100",
        "LengthBetweenPerpendiculars": "98",
        "Beam": "20",
        "DraftAtForward": "6",
        "DraftAtAft": "6.2",
        "ShipAndCargoAreaAboveWaterline": "500",
        "BulbousBowTransverseAreaCenterHeight": "2",
        "BulbousBowTransverseArea": "10",
        "ImmersedTransomArea": "5",
        "SurfaceRoughness": "0.00015",
        "LongitudinalBuoyancyCenter": "0.5",
        "SternShapeParam": "normal",
        "FuelType": "HFO",
        "TankSize": "50000",
        "TankInitialCapacityPercentage": "90",
        "TankDepthOfDischarge": "10",
        "EnginesCountPerPropeller": "1",
        "EngineOperationalPowerSettings": "1000,2000,3000,4000",
        "EngineTierIIPropertiesPoints": "500,100,0.9;1000,200,0.92",
        "GearboxRatio": "0.98",
        "GearboxEfficiency": "0.97",
        "ShaftEfficiency": "0.99",
        "PropellerCount": "1",
        "PropellerDiameter": "5",
        "PropellerPitch": "4",
        "PropellerBladesCount": "4",
        "PropellerExpandedAreaRatio": "0.6",
        "VesselWeight": "20000",
        "CargoWeight": "5000",
    })
}

/// `defineSimulator` with an inline ship, then `runSimulator` to natural
/// completion, then `endSimulator` — the full lifecycle a broker client
/// drives a world through, with no cargo/terminal features in play.
#[test]
fn full_lifecycle_reaches_destination_and_finalizes() {
    let (coordinator, rx) = new_coordinator();

    dispatch(
        &coordinator,
        serde_json::json!({
            "command": "defineSimulator",
            "networkName": "A",
            "timeStep": 10.0,
            "ships": [inline_ship("ship-1")],
        })
        .to_string()
        .as_bytes(),
    );
    assert!(matches!(recv(&rx), CoordinatorEvent::NetworkLoaded { .. }));
    assert!(matches!(recv(&rx), CoordinatorEvent::ShipsAdded { .. }));
    assert!(matches!(recv(&rx), CoordinatorEvent::Created { .. }));

    dispatch(
        &coordinator,
        serde_json::json!({
            "command": "runSimulator",
            "networkNames": ["A"],
            "byTimeSteps": 0,
        })
        .to_string()
        .as_bytes(),
    );

    let mut saw_results = false;
    for _ in 0..64 {
        match recv(&rx) {
            CoordinatorEvent::ResultsAvailable { worlds } => {
                assert_eq!(worlds.len(), 1);
                assert_eq!(worlds[0].0, "A");
                saw_results = true;
                break;
            }
            CoordinatorEvent::Error { message } => panic!("unexpected error: {message}"),
            _ => continue,
        }
    }
    assert!(saw_results, "expected a ResultsAvailable event before the run drained");

    // The run must have actually loaded and moved the ship, not merely
    // reached a terminal state without ever stepping it.
    coordinator.ship_state("A", "ship-1").unwrap();
    assert!(matches!(
        recv(&rx),
        CoordinatorEvent::ShipState {
            reached_destination: true,
            ..
        }
    ));
}

/// A command referencing a world that was never defined always answers
/// with `errorOccurred`, never a panic or a silent drop.
#[test]
fn command_against_unknown_world_is_reported_as_an_error() {
    let (coordinator, rx) = new_coordinator();

    dispatch(
        &coordinator,
        br#"{"command": "terminateSimulator", "networkNames": ["doesNotExist"]}"#,
    );
    assert!(matches!(recv(&rx), CoordinatorEvent::Error { .. }));
}

/// `restServer` clears the registry: a world created before a reset is
/// gone afterwards, so a command naming it fails.
#[test]
fn rest_server_clears_previously_defined_worlds() {
    let (coordinator, rx) = new_coordinator();

    dispatch(
        &coordinator,
        br#"{"command": "defineSimulator", "networkName": "A", "timeStep": 1.0}"#,
    );
    assert!(matches!(recv(&rx), CoordinatorEvent::NetworkLoaded { .. }));
    assert!(matches!(recv(&rx), CoordinatorEvent::Created { .. }));

    dispatch(&coordinator, br#"{"command": "restServer"}"#);
    assert!(matches!(recv(&rx), CoordinatorEvent::ServerReset));

    dispatch(
        &coordinator,
        br#"{"command": "terminateSimulator", "networkNames": ["A"]}"#,
    );
    assert!(matches!(recv(&rx), CoordinatorEvent::Error { .. }));
}

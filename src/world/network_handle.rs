//! Adapter that lets a `Box<dyn Network>` be mutated once during
//! `load_network` and then shared read-only with the ship loader and the
//! simulator, without the coordinator ever needing two different handle
//! types for "before load" and "after load".

use crate::error::{SimError, SimResult};
use crate::model::ship::{EnvironmentSample, GeoPoint, PathLine};
use crate::model::Network;
use std::sync::{Arc, Mutex};

/// Cheap-to-`Clone` handle around a boxed `Network`. All trait methods lock
/// the inner mutex for the duration of the call; nothing holds the lock
/// across a call into other core code, so the "registry lock never calls
/// into simulator code" ordering rule (spec.md §4.D) isn't affected by
/// this one.
#[derive(Debug, Clone)]
pub struct NetworkHandle(Arc<Mutex<Box<dyn Network>>>);

impl NetworkHandle {
    pub fn new(inner: Box<dyn Network>) -> Self {
        Self(Arc::new(Mutex::new(inner)))
    }

    fn lock(&self) -> SimResult<std::sync::MutexGuard<'_, Box<dyn Network>>> {
        self.0
            .lock()
            .map_err(|_| SimError::Coordination("network mutex poisoned".to_string()))
    }
}

impl Network for NetworkHandle {
    fn load(&mut self, path: Option<&str>) -> SimResult<()> {
        self.lock()?.load(path)
    }

    fn shortest_path(&self, waypoints: &[GeoPoint]) -> SimResult<(Vec<GeoPoint>, Vec<PathLine>)> {
        self.lock()?.shortest_path(waypoints)
    }

    fn sample_environment(&self, position: GeoPoint) -> EnvironmentSample {
        self.lock()
            .map(|g| g.sample_environment(position))
            .unwrap_or_default()
    }

    fn available_ports(&self, only_on_paths: bool, ship_paths: &[Vec<GeoPoint>]) -> Vec<String> {
        self.lock()
            .map(|g| g.available_ports(only_on_paths, ship_paths))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StaticNetwork;

    #[test]
    fn clone_shares_the_same_underlying_network() {
        let mut handle = NetworkHandle::new(Box::new(StaticNetwork::with_ports(vec![(
            "Porto".to_string(),
            GeoPoint::new(1.0, 1.0).unwrap(),
        )])));
        let other = handle.clone();
        handle.load(None).unwrap();
        // A load through one handle doesn't disturb data visible through a
        // clone — both wrap the same Arc<Mutex<..>>.
        assert_eq!(other.available_ports(false, &[]).len(), 1);
    }
}

//! The `Network` boundary capability.
//!
//! Geographic network loading, shortest-path routing, and environment
//! sampling are out of scope here. The core only calls through this
//! trait, the same way it only ever calls through [`crate::model::ship::Ship`].

use crate::error::SimResult;
use crate::model::ship::{EnvironmentSample, GeoPoint, PathLine};

pub trait Network: std::fmt::Debug + Send + Sync {
    /// Load network data from `path`, or a built-in default network if
    /// `path` is `None`. Synchronous from the trait's point of view; the
    /// coordinator is responsible for turning this into a non-blocking
    /// operation for its own caller.
    fn load(&mut self, path: Option<&str>) -> SimResult<()>;

    /// Resolve a shortest path through the given waypoints, returning the
    /// resolved path points and the line segments between them.
    fn shortest_path(&self, waypoints: &[GeoPoint]) -> SimResult<(Vec<GeoPoint>, Vec<PathLine>)>;

    /// Sample environment conditions (salinity, wave, wind) at a position.
    fn sample_environment(&self, position: GeoPoint) -> EnvironmentSample;

    /// List sea port identifiers known to the network.
    ///
    /// `only_on_paths`, when true, restricts the result to ports that lie
    /// on at least one currently-loaded ship's path.
    fn available_ports(&self, only_on_paths: bool, ship_paths: &[Vec<GeoPoint>]) -> Vec<String>;
}

/// A minimal, fully in-memory network used by tests and as the "default"
/// network referenced by `defineSimulator`'s optional `networkFilePath`: a
/// trivial, swappable default backend behind a trait object.
#[derive(Debug, Default)]
pub struct StaticNetwork {
    loaded: bool,
    ports: Vec<(String, GeoPoint)>,
}

impl StaticNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ports(ports: Vec<(String, GeoPoint)>) -> Self {
        Self {
            loaded: false,
            ports,
        }
    }
}

impl Network for StaticNetwork {
    fn load(&mut self, _path: Option<&str>) -> SimResult<()> {
        self.loaded = true;
        Ok(())
    }

    fn shortest_path(&self, waypoints: &[GeoPoint]) -> SimResult<(Vec<GeoPoint>, Vec<PathLine>)> {
        if waypoints.len() < 2 {
            return Err(crate::error::SimError::Domain(
                "shortest_path requires at least two waypoints".to_string(),
            ));
        }
        let points = waypoints.to_vec();
        let lines = points
            .windows(2)
            .map(|w| PathLine {
                start: w[0],
                end: w[1],
            })
            .collect();
        Ok((points, lines))
    }

    fn sample_environment(&self, _position: GeoPoint) -> EnvironmentSample {
        EnvironmentSample::default()
    }

    fn available_ports(&self, only_on_paths: bool, ship_paths: &[Vec<GeoPoint>]) -> Vec<String> {
        if !only_on_paths {
            return self.ports.iter().map(|(name, _)| name.clone()).collect();
        }
        self.ports
            .iter()
            .filter(|(_, pos)| {
                ship_paths
                    .iter()
                    .any(|path| path.iter().any(|p| p.euclidean_distance_m(pos) < 1.0))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_path_needs_two_points() {
        let net = StaticNetwork::new();
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        assert!(net.shortest_path(&[a]).is_err());
    }

    #[test]
    fn shortest_path_builds_consecutive_lines() {
        let net = StaticNetwork::new();
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(1.0, 1.0).unwrap();
        let c = GeoPoint::new(2.0, 2.0).unwrap();
        let (points, lines) = net.shortest_path(&[a, b, c]).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn available_ports_filters_by_ship_paths() {
        let porto = GeoPoint::new(10.0, 10.0).unwrap();
        let net = StaticNetwork::with_ports(vec![("Porto".to_string(), porto)]);
        assert_eq!(net.available_ports(false, &[]).len(), 1);
        assert_eq!(net.available_ports(true, &[]).len(), 0);
        assert_eq!(net.available_ports(true, &[vec![porto]]).len(), 1);
    }
}

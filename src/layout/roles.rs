use std::collections::{BTreeMap, BTreeSet};

use crate::Error;
use crate::geometry::Side;

/// What the geometry on a layout layer stands for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayerRole {
    /// Outline of the computational cell.
    Cell,
    /// Footprint of the eigenmode source.
    Source { side: Side },
    /// Footprint of the flux monitor on port `index`.
    Port { index: usize, side: Side },
    /// Waveguide polygons of one coupler branch.
    Branch { side: Side },
}

/// Maps GDSII layer numbers to their [`LayerRole`].
#[derive(Clone, Debug, PartialEq)]
pub struct LayerMap {
    roles: BTreeMap<i16, LayerRole>,
}

impl Default for LayerMap {
    /// The coupler layer convention: cell on 0, ports on 1-4, source on 5,
    /// branches on 31 (upper) and 32 (lower).
    fn default() -> Self {
        LayerMap::new()
            .with(0, LayerRole::Cell)
            .with(1, LayerRole::Port { index: 1, side: Side::Upper })
            .with(2, LayerRole::Port { index: 2, side: Side::Lower })
            .with(3, LayerRole::Port { index: 3, side: Side::Upper })
            .with(4, LayerRole::Port { index: 4, side: Side::Lower })
            .with(5, LayerRole::Source { side: Side::Upper })
            .with(31, LayerRole::Branch { side: Side::Upper })
            .with(32, LayerRole::Branch { side: Side::Lower })
    }
}

impl LayerMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self { roles: BTreeMap::new() }
    }

    /// Assigns `role` to `layer`, replacing any previous assignment.
    pub fn with(mut self, layer: i16, role: LayerRole) -> Self {
        self.roles.insert(layer, role);
        self
    }

    pub fn role(&self, layer: i16) -> Option<LayerRole> {
        self.roles.get(&layer).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i16, LayerRole)> + '_ {
        self.roles.iter().map(|(layer, role)| (*layer, *role))
    }

    /// Checks that the map describes a complete two-branch coupler.
    pub fn validate(&self) -> Result<(), Error> {
        let cells = self.iter().filter(|(_, r)| *r == LayerRole::Cell).count();
        if cells != 1 {
            return Err(Error::InvalidConfig(format!(
                "layer map needs exactly one cell layer, found {}",
                cells,
            )));
        }
        let sources = self
            .iter()
            .filter(|(_, r)| matches!(r, LayerRole::Source { .. }))
            .count();
        if sources != 1 {
            return Err(Error::InvalidConfig(format!(
                "layer map needs exactly one source layer, found {}",
                sources,
            )));
        }

        let mut indices = BTreeSet::new();
        for (layer, port, _) in self.ports() {
            if !indices.insert(port) {
                return Err(Error::InvalidConfig(format!(
                    "port {} assigned twice (again on layer {})",
                    port, layer,
                )));
            }
        }
        if indices.is_empty() {
            return Err(Error::InvalidConfig("layer map has no port layers".to_string()));
        }

        for side in [Side::Upper, Side::Lower] {
            if self.branch_layers(side).is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "layer map has no {:?} branch layer",
                    side,
                )));
            }
        }
        Ok(())
    }

    pub fn cell_layer(&self) -> Option<i16> {
        self.iter()
            .find(|(_, r)| *r == LayerRole::Cell)
            .map(|(layer, _)| layer)
    }

    /// The source layer and the side it follows.
    pub fn source(&self) -> Option<(i16, Side)> {
        self.iter().find_map(|(layer, r)| match r {
            LayerRole::Source { side } => Some((layer, side)),
            _ => None,
        })
    }

    /// `(layer, port index, side)` for every port, sorted by port index.
    pub fn ports(&self) -> Vec<(i16, usize, Side)> {
        let mut ports = self
            .iter()
            .filter_map(|(layer, r)| match r {
                LayerRole::Port { index, side } => Some((layer, index, side)),
                _ => None,
            })
            .collect::<Vec<_>>();
        ports.sort_by_key(|(layer, index, _)| (*index, *layer));
        ports
    }

    pub fn branch_layers(&self, side: Side) -> Vec<i16> {
        self.iter()
            .filter(|(_, r)| *r == LayerRole::Branch { side })
            .map(|(layer, _)| layer)
            .collect()
    }
}

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Position on the tile grid
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan_distance(&self, other: &GridPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn distance_to(&self, other: &GridPos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// The four orthogonal neighbors (networks do not conduct diagonally)
    pub fn neighbors4(&self) -> [GridPos; 4] {
        [
            GridPos::new(self.x + 1, self.y),
            GridPos::new(self.x - 1, self.y),
            GridPos::new(self.x, self.y + 1),
            GridPos::new(self.x, self.y - 1),
        ]
    }
}

/// A placed building on the grid
///
/// `kind` keys into `GameConfig::buildings` for static data (cost, draw,
/// footprint). Runtime state lives here and is mutated by the monthly
/// simulation passes.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub kind: String,
    pub construction_progress: f32, // 0.0 to 1.0
    pub built: bool,
    pub health: f32, // 0.0 to 1.0, collapses at 0
    pub powered: bool,
    pub watered: bool,
    pub operational: bool,
    pub months_unpowered: u32,
}

impl Building {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            construction_progress: 0.0,
            built: false,
            health: 1.0,
            powered: false,
            watered: false,
            operational: false,
            months_unpowered: 0,
        }
    }

    /// Construct a building that is already finished, for map setup and tests
    pub fn completed(kind: impl Into<String>) -> Self {
        Self {
            built: true,
            construction_progress: 1.0,
            ..Self::new(kind)
        }
    }
}

/// Zoned lot. Level 0 is an empty lot; levels 1-3 are developed tiers.
///
/// A developed lot carries a `Building` component on the same entity; the
/// tier table in `GameConfig::zone_tiers` supplies capacity, jobs, tax
/// yield and utility draw per level.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub level: u8,
    pub occupancy: f32, // 0.0 to 1.0 of tier capacity in use
}

impl Zone {
    pub fn new(kind: ZoneKind) -> Self {
        Self {
            kind,
            level: 0,
            occupancy: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Residential,
    Commercial,
    Industrial,
}

impl ZoneKind {
    /// Config key for the building spawned when the lot develops
    pub fn building_key(&self) -> &'static str {
        match self {
            ZoneKind::Residential => "residential",
            ZoneKind::Commercial => "commercial",
            ZoneKind::Industrial => "industrial",
        }
    }
}

/// Marks a building as a power source
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerPlant {
    pub kind: PlantKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlantKind {
    Coal,
    Wind,
    Solar,
}

/// Battery bank. Charge persists across months and is building state,
/// unlike the transient network maps.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct PowerStorageUnit {
    pub capacity_kwh: f32,
    pub charge_kwh: f32,
}

impl PowerStorageUnit {
    pub fn new(capacity_kwh: f32) -> Self {
        Self {
            capacity_kwh,
            charge_kwh: 0.0,
        }
    }
}

/// Overhead line segment on a cell. Conducts power while healthy; a
/// storm-severed line (health below 0.5) splits the network until repaired.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct PowerLine {
    pub health: f32,
}

impl Default for PowerLine {
    fn default() -> Self {
        Self { health: 1.0 }
    }
}

impl PowerLine {
    pub fn is_conductive(&self) -> bool {
        self.health >= 0.5
    }
}

/// Buried pipe segment on a cell, conducts water
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct WaterPipe;

/// Marks a building as a water source. Pumps need power and adjacency to a
/// water tile to push anything into the pipe network.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WaterPump;

/// Service building with a circular coverage radius
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServiceBuilding {
    pub kind: ServiceKind,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    Police,
    Fire,
    Clinic,
    School,
    Park,
}

/// Remains of a collapsed building. Blocks the cell until cleared with a
/// demolish command.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rubble;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pos_distance() {
        let a = GridPos::new(0, 0);
        let b = GridPos::new(3, 4);
        assert_eq!(a.manhattan_distance(&b), 7);
        assert!((a.distance_to(&b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_neighbors_are_orthogonal() {
        let p = GridPos::new(5, 5);
        for n in p.neighbors4() {
            assert_eq!(p.manhattan_distance(&n), 1);
        }
    }

    #[test]
    fn test_new_building_starts_unbuilt() {
        let b = Building::new("coal_plant");
        assert!(!b.built);
        assert_eq!(b.construction_progress, 0.0);
        assert_eq!(b.health, 1.0);
        assert!(!b.operational);
    }

    #[test]
    fn test_completed_building() {
        let b = Building::completed("park");
        assert!(b.built);
        assert_eq!(b.construction_progress, 1.0);
    }

    #[test]
    fn test_severed_line_does_not_conduct() {
        let mut line = PowerLine::default();
        assert!(line.is_conductive());
        line.health = 0.3;
        assert!(!line.is_conductive());
    }
}

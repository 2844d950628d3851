use crate::components::{GridPos, ZoneKind};
use crate::notifications::NotificationKind;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Event for placing a new building
#[derive(Event, Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBuildingEvent {
    pub kind: String,
    pub position: GridPos,
}

/// Event for zoning lots. Cells that are not buildable or already taken
/// are skipped.
#[derive(Event, Debug, Clone, Serialize, Deserialize)]
pub struct ZoneCellsEvent {
    pub kind: ZoneKind,
    pub cells: Vec<GridPos>,
}

/// Event for laying road tiles
#[derive(Event, Debug, Clone, Serialize, Deserialize)]
pub struct BuildRoadEvent {
    pub cells: Vec<GridPos>,
}

/// Event for stringing power lines across cells
#[derive(Event, Debug, Clone, Serialize, Deserialize)]
pub struct PlacePowerLineEvent {
    pub cells: Vec<GridPos>,
}

/// Event for burying water pipes
#[derive(Event, Debug, Clone, Serialize, Deserialize)]
pub struct PlacePipeEvent {
    pub cells: Vec<GridPos>,
}

/// Event for demolishing whatever occupies a cell (building, zone lot,
/// line, pipe, or rubble)
#[derive(Event, Debug, Clone, Serialize, Deserialize)]
pub struct DemolishEvent {
    pub position: GridPos,
}

/// Event for building construction completion
#[derive(Event, Debug, Clone)]
pub struct BuildingCompletedEvent {
    pub building: Entity,
    pub kind: String,
    pub position: GridPos,
}

/// Event for a building collapsing at zero health
#[derive(Event, Debug, Clone)]
pub struct BuildingCollapsedEvent {
    pub kind: String,
    pub position: GridPos,
}

/// Event for grid changes that invalidate the utility networks
#[derive(Event, Debug, Clone)]
pub struct MapChangedEvent {
    pub position: GridPos,
    pub change: MapChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapChangeKind {
    BuildingPlaced,
    BuildingRemoved,
    RoadBuilt,
    PowerLineBuilt,
    PowerLineSevered,
    PowerLineRemoved,
    PipeBuilt,
    PipeRemoved,
    StructureRepaired,
}

/// Event feeding the notification system. The template keyed by `kind`
/// interpolates `{target}`, `{value}` and `{ratio}` placeholders.
#[derive(Event, Debug, Clone)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub target: Option<String>,
    pub value: Option<i64>,
    pub position: Option<GridPos>,
}

impl NotificationEvent {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            target: None,
            value: None,
            position: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn at(mut self, position: GridPos) -> Self {
        self.position = Some(position);
        self
    }
}

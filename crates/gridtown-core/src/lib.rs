// Gridtown - Core simulation engine
// MIT License

pub mod components;
pub mod systems;
pub mod resources;
pub mod events;
pub mod data;
pub mod notifications;
pub mod map;
pub mod simulation;
pub mod save;

pub use simulation::{NewGameConfig, SimulationApp};

// Re-export commonly used types
pub use bevy::prelude::*;
pub use components::*;
pub use resources::*;
pub use events::*;

pub mod ads;
pub mod ammo;
pub mod collision;
pub mod config;
pub mod error;
pub mod events;
pub mod fire_control;
pub mod jump;
pub mod locomotion;
pub mod player;
pub mod recoil;
pub mod timeline;
pub mod timer;
pub mod types;

pub use collision::{FlatWorld, RayHit, WorldProbe};
pub use config::{ControllerConfig, WeaponConfig};
pub use error::{ConfigError, Result};
pub use events::{AnimEvent, AudioCue, CoreEvent, EffectRequest, MaterialParam, Observer};
pub use player::{PlayerController, PlayerSnapshot, WeaponSnapshot};
pub use types::{FireMode, FireState, InputEvent, MoveMode, Rotator, TriggerPhase};

/// Client simulation rate.
pub const TICK_RATE: f64 = 60.0;

#[cfg(test)]
mod tests;

use bevy::math::{Vec2, Vec3};
use serde::Deserialize;

/// Phase of a trigger-style input, mirroring how input devices report actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerPhase {
    Started,
    Triggered,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// x = strafe (right positive), y = forward.
    Move(Vec2),
    /// Degrees; x = yaw delta, y = pitch delta (up positive).
    Look(Vec2),
    Jump(TriggerPhase),
    Crouch(TriggerPhase),
    Sprint(TriggerPhase),
    Fire(TriggerPhase),
    Reload(TriggerPhase),
    SwitchFireMode(TriggerPhase),
    Ads(TriggerPhase),
}

/// Aim orientation in degrees. Positive pitch looks up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
}

pub const MAX_AIM_PITCH: f32 = 89.0;

impl Rotator {
    pub fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }

    pub fn clamp_pitch(&mut self) {
        self.pitch = self.pitch.clamp(-MAX_AIM_PITCH, MAX_AIM_PITCH);
    }

    /// Unit view direction. Yaw 0 looks down -Z, yaw grows to the left.
    pub fn forward(&self) -> Vec3 {
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    /// Horizontal forward and right vectors for movement.
    pub fn flat_basis(&self) -> (Vec3, Vec3) {
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        (Vec3::new(-sy, 0.0, -cy), Vec3::new(cy, 0.0, -sy))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MoveMode {
    #[default]
    Walking,
    Crouching,
    Sprinting,
    Sliding,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    #[default]
    Single,
    Burst,
    Auto,
}

impl FireMode {
    pub fn next(self) -> Self {
        match self {
            FireMode::Single => FireMode::Burst,
            FireMode::Burst => FireMode::Auto,
            FireMode::Auto => FireMode::Single,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmmoType {
    #[default]
    Primary,
    Secondary,
    Heavy,
}

/// Fire-control state derived from the weapon's lifecycle and cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireState {
    Idle,
    Equipping,
    Firing,
    Reloading,
    Stowing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SurfaceType {
    #[default]
    Default,
    Character,
    Concrete,
    Glass,
}

/// Tags for every scheduled sequence in a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKey {
    StandUpProbe,
    SprintCharge,
    Coyote,
    FireCadence,
    FireRateLimit,
    Equip,
    Reload,
    ReloadLockout,
    Stow,
}

/// Moves `current` toward `target` by at most `max_delta`.
pub fn move_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

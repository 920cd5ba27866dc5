//! Tuning values for the player core, loadable from TOML.
//!
//! Distances are in centimetres, speeds in cm/s, angles in degrees and times in
//! seconds. Every struct has a `Default` that matches the shipped feel, so a
//! config file only needs the fields it overrides.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::types::{AmmoType, FireMode};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocomotionCues {
    pub footstep: Option<String>,
    pub jump: Option<String>,
    pub land: Option<String>,
    pub slide: Option<String>,
}

impl Default for LocomotionCues {
    fn default() -> Self {
        Self {
            footstep: Some("player.footstep".into()),
            jump: Some("player.jump".into()),
            land: Some("player.land".into()),
            slide: Some("player.slide".into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub base_walk_speed: f32,
    /// Fraction of the walk speed reached when fully crouched.
    pub crouch_speed_ratio: f32,
    pub stand_half_height: f32,
    pub crouch_half_height: f32,
    pub capsule_radius: f32,
    /// Distance from the top of the capsule down to the eyes.
    pub eye_offset: f32,
    pub crouch_blend_time: f32,
    pub stand_probe_interval: f32,
    pub sprint_speed_multiplier: f32,
    pub sprint_charge_interval: f32,
    pub sprint_charge_step: f32,
    /// Forward axis below which sprinting stops.
    pub sprint_stop_threshold: f32,
    /// Horizontal speed needed before sprint can start.
    pub min_sprint_speed: f32,
    pub slide_duration: f32,
    /// Slide ceiling is `sprint speed * (1 + boost * charge)`.
    pub slide_ceiling_boost: f32,
    /// Crouch-down play rate during a slide is `1 + boost * charge`.
    pub slide_crouch_rate_boost: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub air_control: f32,
    pub max_acceleration: f32,
    pub braking_deceleration: f32,
    /// Walk-cycle play rate reached at the base walk speed.
    pub footstep_rate: f32,
    pub cues: LocomotionCues,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            base_walk_speed: 600.0,
            crouch_speed_ratio: 0.65,
            stand_half_height: 96.0,
            crouch_half_height: 55.0,
            capsule_radius: 35.0,
            eye_offset: 20.0,
            crouch_blend_time: 0.2,
            stand_probe_interval: 1.0 / 30.0,
            sprint_speed_multiplier: 1.5,
            sprint_charge_interval: 0.1,
            sprint_charge_step: 0.1,
            sprint_stop_threshold: 0.5,
            min_sprint_speed: 10.0,
            slide_duration: 1.0,
            slide_ceiling_boost: 0.5,
            slide_crouch_rate_boost: 1.0,
            gravity: 1470.0,
            jump_velocity: 750.0,
            air_control: 0.275,
            max_acceleration: 2048.0,
            braking_deceleration: 2048.0,
            footstep_rate: 1.65,
            cues: LocomotionCues::default(),
        }
    }
}

impl LocomotionConfig {
    pub fn crouch_speed(&self) -> f32 {
        self.base_walk_speed * self.crouch_speed_ratio
    }

    pub fn sprint_speed(&self) -> f32 {
        self.base_walk_speed * self.sprint_speed_multiplier
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    pub jumps_max: u32,
    /// Coyote window at full walk speed; slower falls get down to a quarter of it.
    pub coyote_time: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            jumps_max: 2,
            coyote_time: 0.35,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdsConfig {
    pub base_fov: f32,
    pub aimed_fov: f32,
    /// Seconds for a full aim-in.
    pub aim_time: f32,
    pub fast_exit_rate_scale: f32,
    pub vignette: [f32; 2],
    pub flat_fov: [f32; 2],
    /// Movement speed multiplier at hip and fully aimed.
    pub move_speed_multiplier: [f32; 2],
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            base_fov: 90.0,
            aimed_fov: 70.0,
            aim_time: 0.35,
            fast_exit_rate_scale: 2.0,
            vignette: [0.4, 0.7],
            flat_fov: [90.0, 25.0],
            move_speed_multiplier: [1.0, 0.6],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecoilConfig {
    /// Initial upward angular velocity per shot, deg/s.
    pub pitch_kick: f32,
    /// Scale of the sampled yaw velocity per shot, deg/s.
    pub yaw_kick: f32,
    /// Linear decay of both velocities, deg/s^2.
    pub damping: f32,
    /// 0..=100, higher narrows the yaw spread and leans it toward `preferred_yaw`.
    pub control: f32,
    /// -1 (left) to 1 (right).
    pub preferred_yaw: f32,
    pub heat_per_shot: f32,
    pub heat_decay: f32,
    pub max_heat_attenuation: f32,
    pub heat_on_hip_fire: bool,
    /// Constant recovery speed used while far from the checkpoint, deg/s.
    pub recovery_fast_rate: f32,
    /// Proportional recovery gain near the checkpoint, 1/s.
    pub recovery_slow_rate: f32,
    pub large_deviation: f32,
    pub recovery_epsilon: f32,
}

impl Default for RecoilConfig {
    fn default() -> Self {
        Self {
            pitch_kick: 30.0,
            yaw_kick: 20.0,
            damping: 600.0,
            control: 50.0,
            preferred_yaw: 1.0,
            heat_per_shot: 0.15,
            heat_decay: 1.5,
            max_heat_attenuation: 0.5,
            heat_on_hip_fire: false,
            recovery_fast_rate: 30.0,
            recovery_slow_rate: 10.0,
            large_deviation: 2.0,
            recovery_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeshKickConfig {
    pub location_min: [f32; 3],
    pub location_max: [f32; 3],
    pub rotation_min: [f32; 3],
    pub rotation_max: [f32; 3],
    /// Kick scale when fully aimed; hip fire uses the full range.
    pub aimed_scale: f32,
}

impl Default for MeshKickConfig {
    fn default() -> Self {
        Self {
            location_min: [-0.1, -3.0, 0.2],
            location_max: [0.1, -1.0, 1.0],
            rotation_min: [-5.0, -1.0, -3.0],
            rotation_max: [5.0, 1.0, -1.0],
            aimed_scale: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeaponCues {
    pub fire: Option<String>,
    pub dry_fire: Option<String>,
    pub equip: Option<String>,
    pub reload: Option<String>,
    pub camera_shake: Option<String>,
}

impl Default for WeaponCues {
    fn default() -> Self {
        Self {
            fire: Some("weapon.fire".into()),
            dry_fire: Some("weapon.dry_fire".into()),
            equip: Some("weapon.equip".into()),
            reload: Some("weapon.reload".into()),
            camera_shake: Some("shake.fire".into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub name: String,
    pub ammo_type: AmmoType,
    pub magazine_capacity: u32,
    pub fire_rate_rpm: f32,
    pub fire_mode: FireMode,
    pub can_switch_fire_mode: bool,
    pub burst_rounds: u32,
    pub equip_time: f32,
    pub stow_time: f32,
    pub reload_time: f32,
    pub reload_cancel_blend: f32,
    /// Reload stays locked this long after its animation is interrupted.
    pub reload_lockout: f32,
    pub pellets: u32,
    /// Pellet `i` widens the cone by `i / pellet_spread` degrees.
    pub pellet_spread: f32,
    pub min_spread: f32,
    pub max_spread: f32,
    pub bloom_per_shot: f32,
    pub bloom_decay: f32,
    pub max_bloom: f32,
    pub range: f32,
    pub damage: f32,
    /// Fire cue spacing as a fraction of the fire delay.
    pub fire_sound_delay_scale: f32,
    pub cues: WeaponCues,
    pub ads: AdsConfig,
    pub recoil: Option<RecoilConfig>,
    pub kick: MeshKickConfig,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            name: "rifle".into(),
            ammo_type: AmmoType::Primary,
            magazine_capacity: 30,
            fire_rate_rpm: 560.0,
            fire_mode: FireMode::Single,
            can_switch_fire_mode: true,
            burst_rounds: 3,
            equip_time: 1.0,
            stow_time: 0.5,
            reload_time: 2.0,
            reload_cancel_blend: 0.25,
            reload_lockout: 0.2,
            pellets: 1,
            pellet_spread: 10.0,
            min_spread: 0.08,
            max_spread: 2.0,
            bloom_per_shot: 0.15,
            bloom_decay: 2.0,
            max_bloom: 1.5,
            range: 10000.0,
            damage: 5.0,
            fire_sound_delay_scale: 0.5,
            cues: WeaponCues::default(),
            ads: AdsConfig::default(),
            recoil: Some(RecoilConfig::default()),
            kick: MeshKickConfig::default(),
        }
    }
}

impl WeaponConfig {
    pub fn fire_delay(&self) -> f32 {
        60.0 / self.fire_rate_rpm
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReserveEntry {
    pub ammo: AmmoType,
    pub rounds: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub locomotion: LocomotionConfig,
    pub jump: JumpConfig,
    pub loadout: Vec<WeaponConfig>,
    pub reserve: Vec<ReserveEntry>,
    pub look_sensitivity: f32,
    /// Fixed seed for spread, kick and recoil sampling.
    pub seed: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            locomotion: LocomotionConfig::default(),
            jump: JumpConfig::default(),
            loadout: vec![WeaponConfig::default()],
            reserve: vec![ReserveEntry {
                ammo: AmmoType::Primary,
                rounds: 90,
            }],
            look_sensitivity: 1.0,
            seed: None,
        }
    }
}

impl ControllerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let loco = &self.locomotion;
        positive("locomotion.base_walk_speed", loco.base_walk_speed)?;
        positive("locomotion.crouch_blend_time", loco.crouch_blend_time)?;
        positive("locomotion.stand_probe_interval", loco.stand_probe_interval)?;
        positive("locomotion.sprint_charge_interval", loco.sprint_charge_interval)?;
        positive("locomotion.slide_duration", loco.slide_duration)?;
        if !(0.0..=1.0).contains(&loco.crouch_speed_ratio) {
            return Err(ConfigError::Invalid(
                "locomotion.crouch_speed_ratio must be within 0..=1".into(),
            ));
        }
        if loco.crouch_half_height > loco.stand_half_height {
            return Err(ConfigError::Invalid(
                "locomotion.crouch_half_height exceeds stand_half_height".into(),
            ));
        }
        positive("jump.coyote_time", self.jump.coyote_time)?;

        if self.loadout.is_empty() {
            return Err(ConfigError::Invalid("loadout is empty".into()));
        }
        for weapon in &self.loadout {
            weapon.validate()?;
        }
        if self.reserve.is_empty() {
            warn!("no reserve ammo configured, reloads will be unavailable");
        }
        Ok(())
    }
}

impl WeaponConfig {
    pub fn validate(&self) -> Result<()> {
        let scoped = |field: &str| format!("weapon {}: {}", self.name, field);
        positive(&scoped("fire_rate_rpm"), self.fire_rate_rpm)?;
        positive(&scoped("ads.aim_time"), self.ads.aim_time)?;
        if self.magazine_capacity == 0 {
            return Err(ConfigError::Invalid(scoped("magazine_capacity is 0")));
        }
        if self.burst_rounds == 0 {
            return Err(ConfigError::Invalid(scoped("burst_rounds is 0")));
        }
        if self.min_spread > self.max_spread {
            return Err(ConfigError::Invalid(scoped("min_spread exceeds max_spread")));
        }
        if let Some(recoil) = &self.recoil {
            if !(0.0..=100.0).contains(&recoil.control) {
                return Err(ConfigError::Invalid(scoped("recoil.control outside 0..=100")));
            }
            positive(&scoped("recoil.damping"), recoil.damping)?;
        }
        Ok(())
    }
}

fn positive(field: &str, value: f32) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be positive, got {value}"
        )))
    }
}

//! Aim recoil: per-shot angular impulse, linear damping, then recovery toward
//! the aim recorded when the sequence began.

use bevy::math::{FloatExt, Vec2};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::trace;

use crate::config::RecoilConfig;
use crate::types::{Rotator, move_toward};

const AIMED_HEAT_THRESHOLD: f32 = 0.5;
const YAW_SPREAD_AT_MAX_CONTROL: f32 = 0.25;
const YAW_BIAS_AT_MAX_CONTROL: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecoilPhase {
    #[default]
    Neutral,
    Kick,
    Recovery,
}

#[derive(Debug, Clone)]
pub struct RecoilModel {
    config: RecoilConfig,
    phase: RecoilPhase,
    checkpoint: Rotator,
    /// x = pitch, y = yaw, deg/s.
    velocity: Vec2,
    recover_yaw: bool,
    heat: f32,
}

impl RecoilModel {
    pub fn new(config: RecoilConfig) -> Self {
        Self {
            config,
            phase: RecoilPhase::Neutral,
            checkpoint: Rotator::default(),
            velocity: Vec2::ZERO,
            recover_yaw: false,
            heat: 0.0,
        }
    }

    pub fn phase(&self) -> RecoilPhase {
        self.phase
    }

    pub fn is_recoiling(&self) -> bool {
        self.phase == RecoilPhase::Kick
    }

    pub fn is_recovering(&self) -> bool {
        self.phase == RecoilPhase::Recovery
    }

    pub fn is_neutral(&self) -> bool {
        self.phase == RecoilPhase::Neutral
    }

    pub fn checkpoint(&self) -> Rotator {
        self.checkpoint
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn recovers_yaw(&self) -> bool {
        self.recover_yaw
    }

    pub fn heat(&self) -> f32 {
        self.heat
    }

    pub fn on_shot<R: Rng + ?Sized>(&mut self, aim: &Rotator, ads_alpha: f32, rng: &mut R) {
        if self.phase == RecoilPhase::Neutral {
            self.checkpoint = *aim;
            self.recover_yaw = true;
        } else {
            // Keep whatever the player already compensated.
            if aim.pitch < self.checkpoint.pitch {
                self.checkpoint.pitch = aim.pitch;
            }
            if !self.recover_yaw {
                self.checkpoint.yaw = aim.yaw;
            }
        }

        let cfg = &self.config;
        let heat_applies = ads_alpha >= AIMED_HEAT_THRESHOLD || cfg.heat_on_hip_fire;
        let attenuation = if heat_applies {
            self.heat.min(cfg.max_heat_attenuation)
        } else {
            0.0
        };
        if heat_applies {
            self.heat += cfg.heat_per_shot;
        }
        let scale = 1.0 - attenuation;

        let control = (cfg.control / 100.0).clamp(0.0, 1.0);
        let mean = cfg.preferred_yaw.clamp(-1.0, 1.0)
            * cfg.yaw_kick
            * YAW_BIAS_AT_MAX_CONTROL
            * control;
        let std_dev = cfg.yaw_kick.abs() * 1.0_f32.lerp(YAW_SPREAD_AT_MAX_CONTROL, control);
        let yaw = Normal::new(mean, std_dev)
            .map(|normal| normal.sample(rng))
            .unwrap_or(mean);

        self.velocity.x += cfg.pitch_kick * scale;
        self.velocity.y += yaw * scale;
        self.phase = RecoilPhase::Kick;
        trace!(
            pitch_velocity = self.velocity.x,
            yaw_velocity = self.velocity.y,
            attenuation,
            "recoil kick"
        );
    }

    /// Yaw input during a sequence hands yaw back to the player.
    pub fn note_manual_look(&mut self, yaw_delta: f32) {
        if self.phase != RecoilPhase::Neutral && yaw_delta != 0.0 {
            self.recover_yaw = false;
        }
    }

    pub fn tick(&mut self, dt: f32, aim: &mut Rotator) {
        let cfg = &self.config;
        self.heat = (self.heat - cfg.heat_decay * dt).max(0.0);

        match self.phase {
            RecoilPhase::Neutral => {}
            RecoilPhase::Kick => {
                aim.pitch += self.velocity.x * dt;
                aim.yaw += self.velocity.y * dt;
                aim.clamp_pitch();
                let decay = cfg.damping * dt;
                self.velocity.x = move_toward(self.velocity.x, 0.0, decay);
                self.velocity.y = move_toward(self.velocity.y, 0.0, decay);
                if self.velocity.x == 0.0 {
                    self.velocity = Vec2::ZERO;
                    self.phase = RecoilPhase::Recovery;
                }
            }
            RecoilPhase::Recovery => {
                let pitch_dev = aim.pitch - self.checkpoint.pitch;
                let pitch_done = pitch_dev <= cfg.recovery_epsilon;
                if !pitch_done {
                    aim.pitch -= self.recovery_step(pitch_dev, dt);
                }

                let yaw_dev = aim.yaw - self.checkpoint.yaw;
                let yaw_done = !self.recover_yaw || yaw_dev.abs() <= cfg.recovery_epsilon;
                if !yaw_done {
                    aim.yaw -= yaw_dev.signum() * self.recovery_step(yaw_dev.abs(), dt);
                }

                if pitch_done && yaw_done {
                    self.phase = RecoilPhase::Neutral;
                    self.recover_yaw = false;
                    self.velocity = Vec2::ZERO;
                    trace!("recoil recovered");
                }
            }
        }
    }

    /// Fast constant-rate step far from the checkpoint, proportional near it.
    fn recovery_step(&self, deviation: f32, dt: f32) -> f32 {
        let cfg = &self.config;
        let step = if deviation > cfg.large_deviation {
            cfg.recovery_fast_rate * dt
        } else {
            deviation * (cfg.recovery_slow_rate * dt).min(1.0)
        };
        step.min(deviation)
    }
}

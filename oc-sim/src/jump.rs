use bevy::math::FloatExt;
use tracing::debug;

use crate::config::JumpConfig;
use crate::timer::{TimerHandle, TimerManager};
use crate::types::TimerKey;

/// Jump permission with an air-jump budget and a coyote window after walking
/// off a ledge.
#[derive(Debug)]
pub struct JumpController {
    config: JumpConfig,
    jumps_left: u32,
    coyote: Option<TimerHandle>,
}

impl JumpController {
    pub fn new(config: JumpConfig) -> Self {
        Self {
            jumps_left: config.jumps_max,
            config,
            coyote: None,
        }
    }

    pub fn jumps_left(&self) -> u32 {
        self.jumps_left
    }

    pub fn jumps_max(&self) -> u32 {
        self.config.jumps_max
    }

    pub fn coyote_active(&self) -> bool {
        self.coyote.is_some()
    }

    /// Faster falls get a longer grace window, down to a quarter at rest.
    pub fn coyote_duration(&self, speed: f32, base_speed: f32) -> f32 {
        let ratio = if base_speed > 0.0 {
            (speed / base_speed).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.config.coyote_time * 0.25_f32.lerp(1.0, ratio)
    }

    pub fn can_jump(&self, grounded: bool, stand_up_pending: bool) -> bool {
        !stand_up_pending && (grounded || self.coyote.is_some() || self.jumps_left > 0)
    }

    /// Consumes one charge and closes the coyote window on success.
    pub fn try_jump(
        &mut self,
        grounded: bool,
        stand_up_pending: bool,
        timers: &mut TimerManager<TimerKey>,
    ) -> bool {
        if !self.can_jump(grounded, stand_up_pending) {
            debug!(
                grounded,
                stand_up_pending,
                jumps_left = self.jumps_left,
                "jump denied"
            );
            return false;
        }
        timers.clear(&mut self.coyote);
        self.jumps_left = self.jumps_left.saturating_sub(1);
        true
    }

    pub fn on_left_ground(
        &mut self,
        speed: f32,
        base_speed: f32,
        timers: &mut TimerManager<TimerKey>,
    ) {
        timers.clear(&mut self.coyote);
        let duration = self.coyote_duration(speed, base_speed);
        self.coyote = Some(timers.schedule(TimerKey::Coyote, duration, false));
        debug!(duration, "coyote window open");
    }

    pub fn on_coyote_expired(&mut self) {
        if self.coyote.take().is_some() {
            self.jumps_left = self.jumps_left.saturating_sub(1);
        }
    }

    pub fn on_landed(&mut self, timers: &mut TimerManager<TimerKey>) {
        timers.clear(&mut self.coyote);
        self.jumps_left = self.config.jumps_max;
    }
}

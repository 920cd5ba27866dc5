use bevy::math::FloatExt;
use tracing::debug;

use crate::config::AdsConfig;
use crate::events::{MaterialParam, Outbox};
use crate::timeline::{Curve, PlayDirection, Timeline};

/// Aim-down-sights blend. `held` tracks the input so a forced exit (sprint,
/// reload) can resume once the blocker clears.
#[derive(Debug, Clone)]
pub struct AdsBlend {
    config: AdsConfig,
    timeline: Timeline,
    alpha: f32,
    held: bool,
}

impl AdsBlend {
    pub fn new(config: AdsConfig) -> Self {
        Self {
            timeline: Timeline::new(Curve::cubic(0.0, 1.0, 1.0)),
            config,
            alpha: 0.0,
            held: false,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn held(&self) -> bool {
        self.held
    }

    pub fn set_held(&mut self, held: bool) {
        self.held = held;
    }

    /// True while aimed in or blending toward it.
    pub fn is_engaged(&self) -> bool {
        self.alpha > 0.0
            || (self.timeline.is_playing()
                && self.timeline.direction() == PlayDirection::Forward)
    }

    pub fn enter(&mut self) {
        self.timeline.set_play_rate(1.0 / self.config.aim_time);
        self.timeline.play();
    }

    pub fn exit(&mut self, fast: bool) {
        let scale = if fast {
            self.config.fast_exit_rate_scale
        } else {
            1.0
        };
        self.timeline.set_play_rate(scale / self.config.aim_time);
        self.timeline.reverse();
        if fast {
            debug!(alpha = self.alpha, "forced aim exit");
        }
    }

    pub fn advance(&mut self, dt: f32, out: &mut Outbox) {
        let value = self.timeline.advance(dt).value;
        if value == self.alpha {
            return;
        }
        self.alpha = value;
        out.material(MaterialParam::FieldOfView, self.fov());
        out.material(MaterialParam::FlatFieldOfView, self.flat_fov());
        out.material(MaterialParam::Vignette, self.vignette());
    }

    pub fn fov(&self) -> f32 {
        self.config.base_fov.lerp(self.config.aimed_fov, self.alpha)
    }

    pub fn flat_fov(&self) -> f32 {
        self.config.flat_fov[0].lerp(self.config.flat_fov[1], self.alpha)
    }

    pub fn vignette(&self) -> f32 {
        self.config.vignette[0].lerp(self.config.vignette[1], self.alpha)
    }

    pub fn speed_multiplier(&self) -> f32 {
        let [hip, aimed] = self.config.move_speed_multiplier;
        hip.lerp(aimed, self.alpha)
    }
}

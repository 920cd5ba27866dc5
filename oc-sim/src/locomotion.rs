use bevy::math::{FloatExt, Vec2, Vec3};
use tracing::debug;

use crate::collision::WorldProbe;
use crate::config::LocomotionConfig;
use crate::events::{AudioCue, Outbox};
use crate::timeline::{Curve, Timeline};
use crate::timer::{TimerHandle, TimerManager};
use crate::types::{MoveMode, Rotator, TimerKey};

const STAND_PROBE_RADIUS_SCALE: f32 = 0.5;
const STAND_PROBE_MARGIN: f32 = 1.1;
const FOOTSTEP_TIMES: [f32; 2] = [0.35, 0.85];
const INPUT_DEADZONE_SQ: f32 = 1e-6;
/// Largest drop the body follows while grounded; anything deeper is a ledge.
const MAX_STEP_DOWN: f32 = 45.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Footstep;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Body {
    /// Feet position.
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
}

impl Body {
    pub fn horizontal_velocity(&self) -> Vec3 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z)
    }

    pub fn horizontal_speed(&self) -> f32 {
        self.horizontal_velocity().length()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GroundChange {
    Landed { impact_speed: f32 },
    LeftGround,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SprintToggle {
    Started,
    Stopped,
    Ignored,
}

/// Movement mode machine: crouch blend, sprint charge, slide momentum and the
/// walk cycle. The body it moves is owned by the player.
#[derive(Debug)]
pub struct Locomotion {
    config: LocomotionConfig,
    mode: MoveMode,
    crouch: Timeline,
    crouch_alpha: f32,
    crouch_held: bool,
    stand_probe: Option<TimerHandle>,
    sprint_charge: f32,
    sprint_timer: Option<TimerHandle>,
    slide: Timeline,
    slide_alpha: f32,
    slide_charge: f32,
    slide_velocity: Vec3,
    move_input: Vec2,
    last_move_dir: Vec3,
    walk_cycle: Timeline<Footstep>,
}

impl Locomotion {
    pub fn new(config: LocomotionConfig) -> Self {
        let crouch = Timeline::new(Curve::cubic(0.0, 1.0, config.crouch_blend_time));
        let slide = Timeline::new(Curve::linear(1.0, 0.0, config.slide_duration));
        let mut walk_cycle = Timeline::new(Curve::linear(0.0, 1.0, 1.0)).looping(true);
        for time in FOOTSTEP_TIMES {
            walk_cycle = walk_cycle.with_event(time, Footstep);
        }
        walk_cycle.set_play_rate(0.0);
        walk_cycle.play();

        Self {
            config,
            mode: MoveMode::Walking,
            crouch,
            crouch_alpha: 0.0,
            crouch_held: false,
            stand_probe: None,
            sprint_charge: 0.0,
            sprint_timer: None,
            slide,
            slide_alpha: 0.0,
            slide_charge: 0.0,
            slide_velocity: Vec3::ZERO,
            move_input: Vec2::ZERO,
            last_move_dir: Vec3::ZERO,
            walk_cycle,
        }
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn mode(&self) -> MoveMode {
        self.mode
    }

    pub fn crouch_alpha(&self) -> f32 {
        self.crouch_alpha
    }

    pub fn crouch_held(&self) -> bool {
        self.crouch_held
    }

    pub fn sprint_charge(&self) -> f32 {
        self.sprint_charge
    }

    pub fn slide_alpha(&self) -> f32 {
        self.slide_alpha
    }

    pub fn slide_velocity(&self) -> Vec3 {
        self.slide_velocity
    }

    pub fn move_input(&self) -> Vec2 {
        self.move_input
    }

    /// Ground friction multiplier handed to the movement collaborator.
    pub fn friction_factor(&self) -> f32 {
        if self.mode == MoveMode::Sliding {
            1.0 - self.slide_alpha
        } else {
            1.0
        }
    }

    pub fn stand_up_pending(&self) -> bool {
        self.stand_probe.is_some()
    }

    pub fn capsule_half_height(&self) -> f32 {
        self.config
            .stand_half_height
            .lerp(self.config.crouch_half_height, self.crouch_alpha)
    }

    pub fn eye_height(&self) -> f32 {
        2.0 * self.capsule_half_height() - self.config.eye_offset
    }

    /// Movement speed cap before the aim multiplier.
    pub fn speed_cap(&self) -> f32 {
        let cfg = &self.config;
        let ground = cfg.base_walk_speed.lerp(cfg.crouch_speed(), self.crouch_alpha);
        match self.mode {
            MoveMode::Walking | MoveMode::Crouching => ground,
            MoveMode::Sprinting => ground * cfg.sprint_speed_multiplier,
            MoveMode::Sliding => {
                let ceiling =
                    cfg.sprint_speed() * (1.0 + cfg.slide_ceiling_boost * self.slide_charge);
                cfg.crouch_speed().lerp(ceiling, self.slide_alpha)
            }
        }
    }

    /// Stores the move axis. Returns true when the input ended a sprint.
    pub fn set_move_input(&mut self, axis: Vec2, timers: &mut TimerManager<TimerKey>) -> bool {
        self.move_input = axis.clamp_length_max(1.0);
        if self.mode == MoveMode::Sprinting && self.move_input.y < self.config.sprint_stop_threshold
        {
            return self.stop_sprint(timers);
        }
        false
    }

    pub fn toggle_sprint(
        &mut self,
        horizontal_speed: f32,
        timers: &mut TimerManager<TimerKey>,
    ) -> SprintToggle {
        match self.mode {
            MoveMode::Sprinting => {
                self.stop_sprint(timers);
                SprintToggle::Stopped
            }
            MoveMode::Walking if horizontal_speed > self.config.min_sprint_speed => {
                self.mode = MoveMode::Sprinting;
                self.sprint_charge = 0.0;
                timers.clear(&mut self.sprint_timer);
                self.sprint_timer = Some(timers.schedule(
                    TimerKey::SprintCharge,
                    self.config.sprint_charge_interval,
                    true,
                ));
                debug!(speed = horizontal_speed, "sprint started");
                SprintToggle::Started
            }
            _ => SprintToggle::Ignored,
        }
    }

    /// Returns true if a sprint was actually stopped.
    pub fn stop_sprint(&mut self, timers: &mut TimerManager<TimerKey>) -> bool {
        if self.mode != MoveMode::Sprinting {
            return false;
        }
        self.mode = MoveMode::Walking;
        self.reset_sprint_charge(timers);
        debug!("sprint stopped");
        true
    }

    pub fn on_sprint_charge(&mut self, timers: &mut TimerManager<TimerKey>) {
        self.sprint_charge = (self.sprint_charge + self.config.sprint_charge_step).min(1.0);
        if self.sprint_charge >= 1.0 - 1e-4 {
            self.sprint_charge = 1.0;
            timers.clear(&mut self.sprint_timer);
        }
    }

    pub fn press_crouch(
        &mut self,
        body: &Body,
        timers: &mut TimerManager<TimerKey>,
        out: &mut Outbox,
    ) {
        self.crouch_held = true;
        match self.mode {
            MoveMode::Walking | MoveMode::Crouching => {
                timers.clear(&mut self.stand_probe);
                self.mode = MoveMode::Crouching;
                self.crouch.set_play_rate(1.0);
                self.crouch.play();
            }
            MoveMode::Sprinting if body.grounded => self.start_slide(body, timers, out),
            // Airborne sprint slides on landing.
            MoveMode::Sprinting | MoveMode::Sliding => {}
        }
    }

    pub fn release_crouch(&mut self, timers: &mut TimerManager<TimerKey>) {
        self.crouch_held = false;
        if self.mode == MoveMode::Crouching {
            self.begin_stand_probe(timers);
        }
    }

    pub fn on_stand_probe(
        &mut self,
        body: &Body,
        world: &dyn WorldProbe,
        timers: &mut TimerManager<TimerKey>,
    ) {
        if self.mode != MoveMode::Crouching {
            timers.clear(&mut self.stand_probe);
            return;
        }

        let cfg = &self.config;
        let start = body.position + Vec3::Y * (2.0 * cfg.crouch_half_height);
        let rise = 2.0
            * (cfg.stand_half_height - cfg.crouch_half_height)
            * self.crouch_alpha
            * STAND_PROBE_MARGIN;
        let end = start + Vec3::Y * rise;
        let radius = cfg.capsule_radius * STAND_PROBE_RADIUS_SCALE;
        if body.grounded && world.sweep_obstructed(start, end, radius) {
            return;
        }

        timers.clear(&mut self.stand_probe);
        self.mode = MoveMode::Walking;
        self.crouch.set_play_rate(1.0);
        self.crouch.reverse();
        debug!("standing up");
    }

    pub fn on_landed(&mut self, body: &Body, timers: &mut TimerManager<TimerKey>, out: &mut Outbox) {
        if self.crouch_held && self.mode == MoveMode::Sprinting {
            self.start_slide(body, timers, out);
        }
    }

    /// Advances the crouch, slide and walk-cycle blends.
    pub fn advance(
        &mut self,
        dt: f32,
        body: &Body,
        timers: &mut TimerManager<TimerKey>,
        out: &mut Outbox,
    ) {
        self.crouch_alpha = self.crouch.advance(dt).value;

        if self.mode == MoveMode::Sliding {
            let step = self.slide.advance(dt);
            self.slide_alpha = step.value;
            if step.finished {
                self.finish_slide(timers);
            }
        }

        let walk_rate = if body.grounded && self.mode != MoveMode::Sliding {
            let ratio = (body.horizontal_speed() / self.config.base_walk_speed).clamp(0.0, 2.0);
            self.config.footstep_rate * ratio
        } else {
            0.0
        };
        self.walk_cycle.set_play_rate(walk_rate);
        let step = self.walk_cycle.advance(dt);
        for _ in step.events {
            out.audio(
                AudioCue::Footstep,
                self.config.cues.footstep.as_ref(),
                body.position,
                1.0,
            );
        }
    }

    /// Integrates the body one step. Ground contact comes from the probe; no
    /// collision is resolved.
    pub fn integrate(
        &mut self,
        body: &mut Body,
        aim: &Rotator,
        speed_cap: f32,
        dt: f32,
        world: &dyn WorldProbe,
    ) -> Option<GroundChange> {
        let cfg = &self.config;
        let (forward, right) = aim.flat_basis();
        let wish = (forward * self.move_input.y + right * self.move_input.x).clamp_length_max(1.0);
        if wish.length_squared() > INPUT_DEADZONE_SQ {
            self.last_move_dir = wish.normalize();
        }

        let mut horizontal = body.horizontal_velocity();
        if self.mode == MoveMode::Sliding {
            horizontal = (self.slide_velocity * self.slide_alpha).clamp_length_max(speed_cap);
        } else if body.grounded {
            let rate = if wish.length_squared() > INPUT_DEADZONE_SQ {
                cfg.max_acceleration
            } else {
                cfg.braking_deceleration
            };
            horizontal = horizontal.move_towards(wish * speed_cap, rate * dt);
        } else {
            let limit = speed_cap.max(horizontal.length());
            horizontal += wish * cfg.max_acceleration * cfg.air_control * dt;
            horizontal = horizontal.clamp_length_max(limit);
        }

        let mut vertical = body.velocity.y;
        if !body.grounded {
            vertical -= cfg.gravity * dt;
        }
        body.velocity = Vec3::new(horizontal.x, vertical, horizontal.z);
        body.position += body.velocity * dt;

        let ground = world.ground_height(body.position);
        if body.grounded {
            match ground {
                Some(height) if body.position.y - height <= MAX_STEP_DOWN => {
                    body.position.y = height;
                    None
                }
                _ => {
                    body.grounded = false;
                    Some(GroundChange::LeftGround)
                }
            }
        } else {
            match ground {
                Some(height) if body.position.y <= height && body.velocity.y <= 0.0 => {
                    let impact_speed = -body.velocity.y;
                    body.position.y = height;
                    body.velocity.y = 0.0;
                    body.grounded = true;
                    Some(GroundChange::Landed { impact_speed })
                }
                _ => None,
            }
        }
    }

    fn start_slide(&mut self, body: &Body, timers: &mut TimerManager<TimerKey>, out: &mut Outbox) {
        let charge = self.sprint_charge;
        let velocity = body.horizontal_velocity();
        let direction = if self.last_move_dir.length_squared() > INPUT_DEADZONE_SQ {
            self.last_move_dir
        } else {
            velocity.normalize_or_zero()
        };

        self.reset_sprint_charge(timers);
        timers.clear(&mut self.stand_probe);
        self.mode = MoveMode::Sliding;
        self.slide_charge = charge;
        self.slide_velocity = direction * velocity.length() * charge;
        self.slide.play_from_start();
        self.slide_alpha = self.slide.value();
        self.crouch
            .set_play_rate(1.0 + self.config.slide_crouch_rate_boost * charge);
        self.crouch.play();
        out.audio(
            AudioCue::Slide,
            self.config.cues.slide.as_ref(),
            body.position,
            1.0,
        );
        debug!(charge, speed = velocity.length(), "slide started");
    }

    fn finish_slide(&mut self, timers: &mut TimerManager<TimerKey>) {
        self.mode = MoveMode::Crouching;
        self.slide_alpha = 0.0;
        self.slide_charge = 0.0;
        self.slide_velocity = Vec3::ZERO;
        self.crouch.set_play_rate(1.0);
        debug!(crouch_held = self.crouch_held, "slide finished");
        if !self.crouch_held {
            self.begin_stand_probe(timers);
        }
    }

    fn begin_stand_probe(&mut self, timers: &mut TimerManager<TimerKey>) {
        if self.stand_probe.is_some() {
            return;
        }
        self.stand_probe = Some(timers.schedule(
            TimerKey::StandUpProbe,
            self.config.stand_probe_interval,
            true,
        ));
    }

    fn reset_sprint_charge(&mut self, timers: &mut TimerManager<TimerKey>) {
        timers.clear(&mut self.sprint_timer);
        self.sprint_charge = 0.0;
    }
}

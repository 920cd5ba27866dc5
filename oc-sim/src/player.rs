use bevy::ecs::resource::Resource;
use bevy::math::{Vec2, Vec3};
use tracing::debug;

use crate::ammo::AmmoReserve;
use crate::collision::WorldProbe;
use crate::config::ControllerConfig;
use crate::events::{AudioCue, CoreEvent, Observer, Outbox, dispatch};
use crate::fire_control::{WeaponContext, WeaponController, WeaponSignal};
use crate::jump::JumpController;
use crate::locomotion::{Body, GroundChange, Locomotion, SprintToggle};
use crate::timer::{TimerHandle, TimerManager};
use crate::types::{FireMode, FireState, InputEvent, MoveMode, Rotator, TimerKey, TriggerPhase};

#[derive(Clone, Debug, PartialEq)]
pub struct WeaponSnapshot {
    pub name: String,
    pub state: FireState,
    pub fire_mode: FireMode,
    pub magazine: u32,
    pub capacity: u32,
    pub reserve: u32,
    pub ads_alpha: f32,
    pub fov: f32,
    pub vignette: f32,
    pub spread: f32,
    pub recoil_active: bool,
    pub recovery_active: bool,
    pub is_reloading: bool,
    pub is_equipping: bool,
    pub is_stowing: bool,
}

/// Read-only view handed to collaborators once per tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSnapshot {
    pub mode: MoveMode,
    pub crouch_alpha: f32,
    pub slide_alpha: f32,
    pub sprint_charge: f32,
    pub friction_factor: f32,
    pub speed_cap: f32,
    pub capsule_half_height: f32,
    pub position: Vec3,
    pub eye: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
    pub aim: Rotator,
    pub jumps_left: u32,
    pub coyote_active: bool,
    pub stand_up_pending: bool,
    pub weapon: Option<WeaponSnapshot>,
}

/// One player: locomotion and the equipped weapon composed over a shared timer
/// service and event queue.
#[derive(Resource)]
pub struct PlayerController {
    config: ControllerConfig,
    timers: TimerManager<TimerKey>,
    locomotion: Locomotion,
    jump: JumpController,
    body: Body,
    aim: Rotator,
    weapon: Option<WeaponController>,
    active_slot: usize,
    pending_slot: Option<usize>,
    magazines: Vec<u32>,
    reserve: AmmoReserve,
    pending_input: Vec<InputEvent>,
    out: Outbox,
}

impl PlayerController {
    /// Spawns grounded at the origin and starts equipping the first loadout slot.
    pub fn new(config: ControllerConfig) -> Self {
        let magazines = config.loadout.iter().map(|w| w.magazine_capacity).collect();
        let mut player = Self {
            timers: TimerManager::new(),
            locomotion: Locomotion::new(config.locomotion.clone()),
            jump: JumpController::new(config.jump.clone()),
            body: Body {
                grounded: true,
                ..Body::default()
            },
            aim: Rotator::default(),
            weapon: None,
            active_slot: 0,
            pending_slot: None,
            magazines,
            reserve: AmmoReserve::from_entries(&config.reserve),
            pending_input: Vec::new(),
            out: Outbox::default(),
            config,
        };
        player.equip_slot(0);
        player
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    pub fn jump_controller(&self) -> &JumpController {
        &self.jump
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn aim(&self) -> Rotator {
        self.aim
    }

    pub fn set_aim(&mut self, aim: Rotator) {
        self.aim = aim;
        self.aim.clamp_pitch();
    }

    pub fn weapon(&self) -> Option<&WeaponController> {
        self.weapon.as_ref()
    }

    pub fn weapon_mut(&mut self) -> Option<&mut WeaponController> {
        self.weapon.as_mut()
    }

    pub fn active_slot(&self) -> usize {
        self.active_slot
    }

    pub fn reserve(&self) -> &AmmoReserve {
        &self.reserve
    }

    pub fn reserve_mut(&mut self) -> &mut AmmoReserve {
        &mut self.reserve
    }

    pub fn timers(&self) -> &TimerManager<TimerKey> {
        &self.timers
    }

    pub fn eye_position(&self) -> Vec3 {
        self.body.position + Vec3::Y * self.locomotion.eye_height()
    }

    /// Speed cap after the aim multiplier.
    pub fn current_speed_cap(&self) -> f32 {
        let ads = self
            .weapon
            .as_ref()
            .map_or(1.0, |w| w.ads().speed_multiplier());
        self.locomotion.speed_cap() * ads
    }

    /// Weapon actions are blocked mid-slide.
    pub fn can_act(&self) -> bool {
        self.locomotion.mode() != MoveMode::Sliding
    }

    /// Buffers an input for the next tick.
    pub fn push_input(&mut self, event: InputEvent) {
        self.pending_input.push(event);
    }

    /// One simulation step: buffered inputs, then due timers, then blends,
    /// then the body.
    pub fn tick(&mut self, dt: f32, world: &dyn WorldProbe) {
        let inputs = std::mem::take(&mut self.pending_input);
        for event in inputs {
            self.apply_input(event, world);
        }

        self.timers.advance(dt);
        while let Some((handle, key)) = self.timers.next_due() {
            self.on_timer(handle, key, world);
        }

        self.locomotion
            .advance(dt, &self.body, &mut self.timers, &mut self.out);
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.advance(dt, &mut self.aim, &mut self.out);
        }

        let speed_cap = self.current_speed_cap();
        let change = self
            .locomotion
            .integrate(&mut self.body, &self.aim, speed_cap, dt, world);
        match change {
            Some(GroundChange::Landed { impact_speed }) => self.on_landed(impact_speed),
            Some(GroundChange::LeftGround) => {
                let speed = self.body.horizontal_speed();
                let base = self.locomotion.config().base_walk_speed;
                self.jump.on_left_ground(speed, base, &mut self.timers);
            }
            None => {}
        }
    }

    pub fn apply_input(&mut self, event: InputEvent, world: &dyn WorldProbe) {
        use TriggerPhase::{Completed, Started};
        match event {
            InputEvent::Move(axis) => self.apply_move(axis),
            InputEvent::Look(delta) => self.apply_look(delta),
            InputEvent::Jump(Started) => {
                self.jump();
            }
            InputEvent::Crouch(Started) => self.press_crouch(),
            InputEvent::Crouch(Completed) => self.release_crouch(),
            InputEvent::Sprint(Started) => self.toggle_sprint(),
            InputEvent::Fire(Started) => self.press_fire(world),
            InputEvent::Fire(Completed) => self.release_fire(),
            InputEvent::Reload(Started) => {
                self.reload(world);
            }
            InputEvent::SwitchFireMode(Started) => {
                self.switch_fire_mode();
            }
            InputEvent::Ads(Started) => self.press_ads(),
            InputEvent::Ads(Completed) => self.release_ads(),
            _ => {}
        }
    }

    pub fn apply_move(&mut self, axis: Vec2) {
        if self.locomotion.set_move_input(axis, &mut self.timers) {
            self.after_sprint_stopped();
        }
    }

    /// `delta` in degrees, x = yaw, y = pitch (up positive).
    pub fn apply_look(&mut self, delta: Vec2) {
        let scaled = delta * self.config.look_sensitivity;
        self.aim.yaw += scaled.x;
        self.aim.pitch += scaled.y;
        self.aim.clamp_pitch();
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.note_manual_look(scaled.x);
        }
    }

    pub fn jump(&mut self) -> bool {
        let allowed = self.jump.try_jump(
            self.body.grounded,
            self.locomotion.stand_up_pending(),
            &mut self.timers,
        );
        if allowed {
            self.body.velocity.y = self.locomotion.config().jump_velocity;
            self.body.grounded = false;
            self.out.audio(
                AudioCue::Jump,
                self.locomotion.config().cues.jump.as_ref(),
                self.body.position,
                1.0,
            );
        }
        allowed
    }

    pub fn press_crouch(&mut self) {
        self.locomotion
            .press_crouch(&self.body, &mut self.timers, &mut self.out);
    }

    pub fn release_crouch(&mut self) {
        self.locomotion.release_crouch(&mut self.timers);
    }

    pub fn toggle_sprint(&mut self) {
        let speed = self.body.horizontal_speed();
        if self.locomotion.mode() == MoveMode::Walking {
            if let Some(weapon) = self.weapon.as_mut() {
                if speed > self.locomotion.config().min_sprint_speed {
                    weapon.force_ads_exit();
                }
            }
        }
        if self.locomotion.toggle_sprint(speed, &mut self.timers) == SprintToggle::Stopped {
            self.after_sprint_stopped();
        }
    }

    pub fn press_fire(&mut self, world: &dyn WorldProbe) {
        self.stop_sprint();
        let can_act = self.can_act();
        let eye = self.eye_position();
        let Some(weapon) = self.weapon.as_mut() else {
            return;
        };
        let mut ctx = WeaponContext {
            timers: &mut self.timers,
            reserve: &mut self.reserve,
            out: &mut self.out,
            aim: &mut self.aim,
            eye,
            world,
        };
        weapon.press_fire(&mut ctx, can_act);
    }

    pub fn release_fire(&mut self) {
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.release_fire(&mut self.timers);
        }
    }

    pub fn reload(&mut self, world: &dyn WorldProbe) -> bool {
        if !self.can_act() {
            return false;
        }
        let eye = self.eye_position();
        let Some(weapon) = self.weapon.as_mut() else {
            return false;
        };
        let mut ctx = WeaponContext {
            timers: &mut self.timers,
            reserve: &mut self.reserve,
            out: &mut self.out,
            aim: &mut self.aim,
            eye,
            world,
        };
        weapon.request_reload(&mut ctx)
    }

    pub fn switch_fire_mode(&mut self) -> bool {
        if !self.can_act() {
            return false;
        }
        self.weapon
            .as_mut()
            .is_some_and(|weapon| weapon.switch_fire_mode())
    }

    pub fn press_ads(&mut self) {
        self.stop_sprint();
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.press_ads();
        }
    }

    pub fn release_ads(&mut self) {
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.release_ads();
        }
    }

    /// Stows the current weapon and equips `slot` once the stow finishes.
    pub fn swap_weapon(&mut self, slot: usize) -> bool {
        if slot >= self.config.loadout.len() {
            return false;
        }
        let Some(weapon) = self.weapon.as_mut() else {
            self.equip_slot(slot);
            return true;
        };
        if slot == self.active_slot && !weapon.is_stowing() {
            return false;
        }
        self.pending_slot = Some(slot);
        weapon.begin_stow(&mut self.timers, &mut self.out);
        true
    }

    pub fn notify_equip_blended_out(&mut self, _interrupted: bool) {
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.notify_equip_blended_out(&mut self.timers);
        }
    }

    pub fn notify_reload_blended_out(&mut self, interrupted: bool, world: &dyn WorldProbe) {
        let eye = self.eye_position();
        let Some(weapon) = self.weapon.as_mut() else {
            return;
        };
        let mut ctx = WeaponContext {
            timers: &mut self.timers,
            reserve: &mut self.reserve,
            out: &mut self.out,
            aim: &mut self.aim,
            eye,
            world,
        };
        if let Some(signal) = weapon.notify_reload_blended_out(interrupted, &mut ctx) {
            self.on_weapon_signal(signal);
        }
    }

    pub fn notify_recoil_kick_settled(&mut self) {
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.notify_recoil_kick_settled();
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &CoreEvent> {
        self.out.iter()
    }

    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        self.out.drain().collect()
    }

    pub fn dispatch_events<O: Observer + ?Sized>(&mut self, observer: &mut O) {
        dispatch(self.out.drain(), observer);
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let weapon = self.weapon.as_ref().map(|w| WeaponSnapshot {
            name: w.config().name.clone(),
            state: w.state(),
            fire_mode: w.fire_mode(),
            magazine: w.magazine().count(),
            capacity: w.magazine().capacity(),
            reserve: self.reserve.get(w.config().ammo_type),
            ads_alpha: w.ads().alpha(),
            fov: w.ads().fov(),
            vignette: w.ads().vignette(),
            spread: w.spread(),
            recoil_active: w.recoil().is_some_and(|r| r.is_recoiling()),
            recovery_active: w.recoil().is_some_and(|r| r.is_recovering()),
            is_reloading: w.is_reloading(),
            is_equipping: w.is_equipping(),
            is_stowing: w.is_stowing(),
        });
        PlayerSnapshot {
            mode: self.locomotion.mode(),
            crouch_alpha: self.locomotion.crouch_alpha(),
            slide_alpha: self.locomotion.slide_alpha(),
            sprint_charge: self.locomotion.sprint_charge(),
            friction_factor: self.locomotion.friction_factor(),
            speed_cap: self.current_speed_cap(),
            capsule_half_height: self.locomotion.capsule_half_height(),
            position: self.body.position,
            eye: self.eye_position(),
            velocity: self.body.velocity,
            grounded: self.body.grounded,
            aim: self.aim,
            jumps_left: self.jump.jumps_left(),
            coyote_active: self.jump.coyote_active(),
            stand_up_pending: self.locomotion.stand_up_pending(),
            weapon,
        }
    }

    fn stop_sprint(&mut self) {
        if self.locomotion.stop_sprint(&mut self.timers) {
            self.after_sprint_stopped();
        }
    }

    fn after_sprint_stopped(&mut self) {
        if let Some(weapon) = self.weapon.as_mut() {
            weapon.resume_ads();
        }
    }

    fn on_landed(&mut self, impact_speed: f32) {
        self.jump.on_landed(&mut self.timers);
        self.locomotion
            .on_landed(&self.body, &mut self.timers, &mut self.out);
        let jump_velocity = self.locomotion.config().jump_velocity;
        let volume = (impact_speed / jump_velocity).clamp(0.0, 1.0);
        self.out.audio(
            AudioCue::Land,
            self.locomotion.config().cues.land.as_ref(),
            self.body.position,
            volume,
        );
        debug!(impact_speed, "landed");
    }

    fn on_timer(&mut self, handle: TimerHandle, key: TimerKey, world: &dyn WorldProbe) {
        match key {
            TimerKey::StandUpProbe => {
                self.locomotion
                    .on_stand_probe(&self.body, world, &mut self.timers)
            }
            TimerKey::SprintCharge => self.locomotion.on_sprint_charge(&mut self.timers),
            TimerKey::Coyote => self.jump.on_coyote_expired(),
            TimerKey::FireCadence
            | TimerKey::FireRateLimit
            | TimerKey::Equip
            | TimerKey::Reload
            | TimerKey::ReloadLockout
            | TimerKey::Stow => {
                let eye = self.eye_position();
                let Some(weapon) = self.weapon.as_mut() else {
                    return;
                };
                let mut ctx = WeaponContext {
                    timers: &mut self.timers,
                    reserve: &mut self.reserve,
                    out: &mut self.out,
                    aim: &mut self.aim,
                    eye,
                    world,
                };
                if let Some(signal) = weapon.on_timer(handle, key, &mut ctx) {
                    self.on_weapon_signal(signal);
                }
            }
        }
    }

    fn on_weapon_signal(&mut self, signal: WeaponSignal) {
        match signal {
            WeaponSignal::Stowed => self.finish_stow(),
            // Sprint excludes aim; a held aim input comes back once sprint stops.
            WeaponSignal::AdsResumable if self.locomotion.mode() == MoveMode::Sprinting => {}
            WeaponSignal::AdsResumable => {
                if let Some(weapon) = self.weapon.as_mut() {
                    weapon.resume_ads();
                }
            }
        }
    }

    fn finish_stow(&mut self) {
        if let Some(weapon) = self.weapon.take() {
            if let Some(count) = self.magazines.get_mut(self.active_slot) {
                *count = weapon.magazine().count();
            }
            debug!(weapon = %weapon.config().name, "stowed");
        }
        if let Some(slot) = self.pending_slot.take() {
            self.equip_slot(slot);
        }
    }

    fn equip_slot(&mut self, slot: usize) {
        let Some(config) = self.config.loadout.get(slot).cloned() else {
            return;
        };
        let count = self
            .magazines
            .get(slot)
            .copied()
            .unwrap_or(config.magazine_capacity);
        let seed = self.config.seed.map(|seed| seed.wrapping_add(slot as u64));
        let mut weapon = WeaponController::new(config, count, seed);
        weapon.begin_equip(&mut self.timers, &mut self.out, self.body.position);
        self.weapon = Some(weapon);
        self.active_slot = slot;
    }
}

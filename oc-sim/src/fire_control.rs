use std::f32::consts::TAU;

use bevy::math::{FloatExt, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::ads::AdsBlend;
use crate::ammo::{self, AmmoReserve, Magazine};
use crate::collision::WorldProbe;
use crate::config::WeaponConfig;
use crate::events::{
    AnimEvent, AudioCue, CoreEvent, EffectRequest, Impact, MeshKick, Outbox, ShotReport,
};
use crate::recoil::RecoilModel;
use crate::timer::{TimerHandle, TimerManager};
use crate::types::{FireMode, FireState, Rotator, TimerKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Ready,
    Equipping,
    Reloading,
    Stowing,
    Stowed,
}

/// Weapon-mesh recoil phase, flipped by the animation collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KickPhase {
    #[default]
    Idle,
    Kick,
    Recovery,
}

/// Outcomes the owning player has to act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeaponSignal {
    Stowed,
    /// A reload ended; aim may come back if the input is still held and
    /// nothing else excludes it.
    AdsResumable,
}

/// Player state a weapon reads and writes while handling an action.
pub struct WeaponContext<'a> {
    pub timers: &'a mut TimerManager<TimerKey>,
    pub reserve: &'a mut AmmoReserve,
    pub out: &'a mut Outbox,
    pub aim: &'a mut Rotator,
    pub eye: Vec3,
    pub world: &'a dyn WorldProbe,
}

/// Fire-control machine for one equipped weapon: lifecycle, cadence, magazine,
/// aim blend, recoil and spread.
#[derive(Debug)]
pub struct WeaponController {
    config: WeaponConfig,
    fire_mode: FireMode,
    magazine: Magazine,
    lifecycle: Lifecycle,
    lifecycle_timer: Option<TimerHandle>,
    reload_locked: bool,
    fire_timer: Option<TimerHandle>,
    cadence: bool,
    trigger_held: bool,
    burst_fired: u32,
    ads: AdsBlend,
    recoil: Option<RecoilModel>,
    bloom: f32,
    kick_phase: KickPhase,
    last_fire_cue: Option<f64>,
    rng: StdRng,
}

impl WeaponController {
    pub fn new(config: WeaponConfig, magazine_count: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            fire_mode: config.fire_mode,
            magazine: Magazine::with_count(config.magazine_capacity, magazine_count),
            lifecycle: Lifecycle::Stowed,
            lifecycle_timer: None,
            reload_locked: false,
            fire_timer: None,
            cadence: false,
            trigger_held: false,
            burst_fired: 0,
            ads: AdsBlend::new(config.ads.clone()),
            recoil: config.recoil.clone().map(RecoilModel::new),
            bloom: 0.0,
            kick_phase: KickPhase::Idle,
            last_fire_cue: None,
            rng,
            config,
        }
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    pub fn fire_mode(&self) -> FireMode {
        self.fire_mode
    }

    pub fn magazine(&self) -> &Magazine {
        &self.magazine
    }

    pub fn magazine_mut(&mut self) -> &mut Magazine {
        &mut self.magazine
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_reloading(&self) -> bool {
        self.lifecycle == Lifecycle::Reloading
    }

    pub fn is_equipping(&self) -> bool {
        self.lifecycle == Lifecycle::Equipping
    }

    pub fn is_stowing(&self) -> bool {
        self.lifecycle == Lifecycle::Stowing
    }

    pub fn ads(&self) -> &AdsBlend {
        &self.ads
    }

    pub fn recoil(&self) -> Option<&RecoilModel> {
        self.recoil.as_ref()
    }

    pub fn kick_phase(&self) -> KickPhase {
        self.kick_phase
    }

    pub fn trigger_held(&self) -> bool {
        self.trigger_held
    }

    pub fn bloom(&self) -> f32 {
        self.bloom
    }

    /// Cone half-angle in degrees for the next shot.
    pub fn spread(&self) -> f32 {
        self.config.max_spread.lerp(self.config.min_spread, self.ads.alpha()) + self.bloom
    }

    pub fn is_rate_limited(&self, timers: &TimerManager<TimerKey>) -> bool {
        timers.remaining_opt(self.fire_timer) > 0.0
    }

    pub fn state(&self) -> FireState {
        match self.lifecycle {
            Lifecycle::Equipping => FireState::Equipping,
            Lifecycle::Reloading => FireState::Reloading,
            Lifecycle::Stowing | Lifecycle::Stowed => FireState::Stowing,
            Lifecycle::Ready if self.cadence => FireState::Firing,
            Lifecycle::Ready => FireState::Idle,
        }
    }

    pub fn begin_equip(&mut self, timers: &mut TimerManager<TimerKey>, out: &mut Outbox, at: Vec3) {
        timers.clear(&mut self.lifecycle_timer);
        self.lifecycle = Lifecycle::Equipping;
        self.lifecycle_timer = Some(timers.schedule(TimerKey::Equip, self.config.equip_time, false));
        out.anim(AnimEvent::EquipStart);
        out.audio(AudioCue::Equip, self.config.cues.equip.as_ref(), at, 1.0);
        debug!(weapon = %self.config.name, "equipping");
    }

    pub fn notify_equip_blended_out(&mut self, timers: &mut TimerManager<TimerKey>) {
        if self.lifecycle == Lifecycle::Equipping {
            timers.clear(&mut self.lifecycle_timer);
            self.finish_equip();
        }
    }

    pub fn press_fire(&mut self, ctx: &mut WeaponContext<'_>, can_act: bool) {
        self.trigger_held = true;
        if !can_act {
            return;
        }
        if self.lifecycle != Lifecycle::Ready {
            debug!(lifecycle = ?self.lifecycle, "fire ignored");
            return;
        }
        if self.is_rate_limited(ctx.timers) {
            trace!("fire rate limited");
            return;
        }
        self.begin_cadence(ctx);
    }

    pub fn release_fire(&mut self, timers: &mut TimerManager<TimerKey>) {
        self.trigger_held = false;
        if self.cadence && self.fire_mode == FireMode::Auto {
            let remaining = timers.remaining_opt(self.fire_timer);
            self.arm_rate_limit(timers, remaining);
        }
    }

    pub fn switch_fire_mode(&mut self) -> bool {
        if !self.config.can_switch_fire_mode || self.lifecycle != Lifecycle::Ready || self.cadence
        {
            return false;
        }
        self.fire_mode = self.fire_mode.next();
        debug!(mode = ?self.fire_mode, "fire mode switched");
        true
    }

    /// Starts a reload if one is allowed. Returns true when it started.
    pub fn request_reload(&mut self, ctx: &mut WeaponContext<'_>) -> bool {
        if self.lifecycle != Lifecycle::Ready {
            return false;
        }
        if !ammo::can_reload(&self.magazine, ctx.reserve, self.config.ammo_type) {
            return false;
        }
        self.start_reload(ctx);
        true
    }

    pub fn cancel_reload(&mut self, timers: &mut TimerManager<TimerKey>, out: &mut Outbox) {
        if self.lifecycle != Lifecycle::Reloading {
            return;
        }
        timers.clear(&mut self.lifecycle_timer);
        self.reload_locked = false;
        self.lifecycle = Lifecycle::Ready;
        out.anim(AnimEvent::ReloadCancel {
            blend_time: self.config.reload_cancel_blend,
        });
        debug!("reload cancelled");
    }

    /// Reload animation finished. An uninterrupted blend-out completes the
    /// reload; an interrupted one drops it after a short lockout.
    pub fn notify_reload_blended_out(
        &mut self,
        interrupted: bool,
        ctx: &mut WeaponContext<'_>,
    ) -> Option<WeaponSignal> {
        if self.lifecycle != Lifecycle::Reloading {
            return None;
        }
        if !interrupted {
            ctx.timers.clear(&mut self.lifecycle_timer);
            self.finish_reload(ctx);
            return Some(WeaponSignal::AdsResumable);
        }
        if self.reload_locked {
            return None;
        }
        ctx.timers.clear(&mut self.lifecycle_timer);
        self.lifecycle_timer = Some(ctx.timers.schedule(
            TimerKey::ReloadLockout,
            self.config.reload_lockout,
            false,
        ));
        self.reload_locked = true;
        debug!("reload interrupted");
        None
    }

    pub fn notify_recoil_kick_settled(&mut self) {
        if self.kick_phase == KickPhase::Kick {
            self.kick_phase = KickPhase::Recovery;
        }
    }

    pub fn press_ads(&mut self) {
        self.ads.set_held(true);
        if matches!(self.lifecycle, Lifecycle::Ready | Lifecycle::Equipping) {
            self.ads.enter();
        }
    }

    pub fn release_ads(&mut self) {
        self.ads.set_held(false);
        self.ads.exit(false);
    }

    /// Fast aim exit that keeps the held input for later.
    pub fn force_ads_exit(&mut self) {
        if self.ads.is_engaged() {
            self.ads.exit(true);
        }
    }

    pub fn resume_ads(&mut self) {
        if self.ads.held() && matches!(self.lifecycle, Lifecycle::Ready | Lifecycle::Equipping) {
            self.ads.enter();
        }
    }

    pub fn begin_stow(&mut self, timers: &mut TimerManager<TimerKey>, out: &mut Outbox) {
        if matches!(self.lifecycle, Lifecycle::Stowing | Lifecycle::Stowed) {
            return;
        }
        self.cancel_reload(timers, out);
        timers.clear(&mut self.lifecycle_timer);
        timers.clear(&mut self.fire_timer);
        self.cadence = false;
        self.trigger_held = false;
        self.ads.set_held(false);
        self.force_ads_exit();
        self.lifecycle = Lifecycle::Stowing;
        self.lifecycle_timer = Some(timers.schedule(TimerKey::Stow, self.config.stow_time, false));
        out.anim(AnimEvent::StowStart);
        debug!(weapon = %self.config.name, "stowing");
    }

    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        key: TimerKey,
        ctx: &mut WeaponContext<'_>,
    ) -> Option<WeaponSignal> {
        match key {
            TimerKey::FireCadence => self.on_cadence(ctx),
            TimerKey::FireRateLimit if self.fire_timer == Some(handle) => {
                self.fire_timer = None;
                // A held auto trigger picks the cadence back up; an empty
                // magazine only dry-fires once per pull.
                if self.trigger_held
                    && self.fire_mode == FireMode::Auto
                    && self.lifecycle == Lifecycle::Ready
                    && !self.magazine.is_empty()
                {
                    self.begin_cadence(ctx);
                }
            }
            TimerKey::Equip if self.lifecycle_timer == Some(handle) => {
                self.lifecycle_timer = None;
                self.finish_equip();
            }
            TimerKey::Reload if self.lifecycle_timer == Some(handle) => {
                self.lifecycle_timer = None;
                self.finish_reload(ctx);
                return Some(WeaponSignal::AdsResumable);
            }
            TimerKey::ReloadLockout if self.lifecycle_timer == Some(handle) => {
                self.lifecycle_timer = None;
                self.reload_locked = false;
                self.lifecycle = Lifecycle::Ready;
                return Some(WeaponSignal::AdsResumable);
            }
            TimerKey::Stow if self.lifecycle_timer == Some(handle) => {
                self.lifecycle_timer = None;
                self.lifecycle = Lifecycle::Stowed;
                return Some(WeaponSignal::Stowed);
            }
            _ => {}
        }
        None
    }

    /// Advances the aim blend, recoil and bloom decay.
    pub fn advance(&mut self, dt: f32, aim: &mut Rotator, out: &mut Outbox) {
        self.ads.advance(dt, out);
        self.bloom = (self.bloom - self.config.bloom_decay * dt).max(0.0);
        if let Some(recoil) = self.recoil.as_mut() {
            recoil.tick(dt, aim);
        }
        let recoil_settled = self.recoil.as_ref().is_none_or(|r| r.is_neutral());
        if self.kick_phase == KickPhase::Recovery && recoil_settled {
            self.kick_phase = KickPhase::Idle;
        }
    }

    /// Lets the recoil model know the player moved the view themselves.
    pub fn note_manual_look(&mut self, yaw_delta: f32) {
        if let Some(recoil) = self.recoil.as_mut() {
            recoil.note_manual_look(yaw_delta);
        }
    }

    fn finish_equip(&mut self) {
        self.lifecycle = Lifecycle::Ready;
        debug!(weapon = %self.config.name, "equipped");
    }

    fn begin_cadence(&mut self, ctx: &mut WeaponContext<'_>) {
        self.burst_fired = 0;
        if !self.fire_round(ctx) {
            return;
        }
        let delay = self.config.fire_delay();
        match self.fire_mode {
            FireMode::Single => self.arm_rate_limit(ctx.timers, delay),
            FireMode::Burst => {
                self.burst_fired = 1;
                if self.burst_fired >= self.config.burst_rounds {
                    self.arm_rate_limit(ctx.timers, delay);
                } else {
                    self.start_cadence(ctx.timers, delay);
                }
            }
            FireMode::Auto => self.start_cadence(ctx.timers, delay),
        }
    }

    fn on_cadence(&mut self, ctx: &mut WeaponContext<'_>) {
        if self.lifecycle != Lifecycle::Ready || !self.cadence {
            self.stop_cadence(ctx.timers);
            return;
        }
        let delay = self.config.fire_delay();
        match self.fire_mode {
            FireMode::Auto => {
                if !self.trigger_held {
                    self.stop_cadence(ctx.timers);
                    return;
                }
                self.fire_round(ctx);
            }
            FireMode::Burst => {
                if !self.fire_round(ctx) {
                    return;
                }
                self.burst_fired += 1;
                if self.burst_fired >= self.config.burst_rounds {
                    self.arm_rate_limit(ctx.timers, delay);
                }
            }
            FireMode::Single => self.arm_rate_limit(ctx.timers, delay),
        }
    }

    /// Fires one round, or dry-fires when the magazine is empty. Returns true
    /// if a round left the barrel.
    fn fire_round(&mut self, ctx: &mut WeaponContext<'_>) -> bool {
        if !self.magazine.consume_round() {
            self.dry_fire(ctx);
            return false;
        }
        self.resolve_shot(ctx);
        true
    }

    fn dry_fire(&mut self, ctx: &mut WeaponContext<'_>) {
        ctx.out.audio(
            AudioCue::DryFire,
            self.config.cues.dry_fire.as_ref(),
            ctx.eye,
            1.0,
        );
        let delay = self.config.fire_delay();
        self.arm_rate_limit(ctx.timers, delay);
        debug!(weapon = %self.config.name, "dry fire");
        if ammo::can_reload(&self.magazine, ctx.reserve, self.config.ammo_type) {
            self.start_reload(ctx);
        }
    }

    fn start_reload(&mut self, ctx: &mut WeaponContext<'_>) {
        if self.cadence {
            self.stop_cadence(ctx.timers);
        }
        ctx.timers.clear(&mut self.lifecycle_timer);
        self.lifecycle = Lifecycle::Reloading;
        self.reload_locked = false;
        self.lifecycle_timer =
            Some(ctx.timers.schedule(TimerKey::Reload, self.config.reload_time, false));
        self.force_ads_exit();
        ctx.out.anim(AnimEvent::ReloadStart);
        ctx.out
            .audio(AudioCue::Reload, self.config.cues.reload.as_ref(), ctx.eye, 1.0);
        debug!(
            weapon = %self.config.name,
            magazine = self.magazine.count(),
            reserve = ctx.reserve.get(self.config.ammo_type),
            "reload started"
        );
    }

    fn finish_reload(&mut self, ctx: &mut WeaponContext<'_>) {
        let moved = ammo::transfer(&mut self.magazine, ctx.reserve, self.config.ammo_type);
        self.lifecycle = Lifecycle::Ready;
        debug!(moved, magazine = self.magazine.count(), "reload finished");
        if self.trigger_held
            && self.fire_mode == FireMode::Auto
            && !self.is_rate_limited(ctx.timers)
        {
            self.begin_cadence(ctx);
        }
    }

    fn start_cadence(&mut self, timers: &mut TimerManager<TimerKey>, delay: f32) {
        timers.clear(&mut self.fire_timer);
        self.fire_timer = Some(timers.schedule(TimerKey::FireCadence, delay, true));
        self.cadence = true;
    }

    fn stop_cadence(&mut self, timers: &mut TimerManager<TimerKey>) {
        if self.cadence {
            timers.clear(&mut self.fire_timer);
            self.cadence = false;
        }
    }

    fn arm_rate_limit(&mut self, timers: &mut TimerManager<TimerKey>, delay: f32) {
        timers.clear(&mut self.fire_timer);
        self.cadence = false;
        if delay > 0.0 {
            self.fire_timer = Some(timers.schedule(TimerKey::FireRateLimit, delay, false));
        }
    }

    fn resolve_shot(&mut self, ctx: &mut WeaponContext<'_>) {
        let ads_alpha = self.ads.alpha();
        let spread = self.spread();
        let forward = ctx.aim.forward();
        let pellets = self.config.pellets.max(1);
        let pellet_spread = self.config.pellet_spread.max(f32::EPSILON);

        let mut pellet_ends = Vec::with_capacity(pellets as usize);
        let mut impacts = Vec::new();
        for i in 0..pellets {
            let cone = spread + i as f32 / pellet_spread;
            let direction = random_in_cone(forward, cone, &mut self.rng);
            match ctx.world.raycast(ctx.eye, direction, self.config.range) {
                Some(hit) => {
                    pellet_ends.push(hit.position);
                    impacts.push(Impact {
                        position: hit.position,
                        normal: hit.normal,
                        surface: hit.surface,
                    });
                }
                None => pellet_ends.push(ctx.eye + direction * self.config.range),
            }
        }

        self.bloom = (self.bloom + self.config.bloom_per_shot).min(self.config.max_bloom);
        if let Some(recoil) = self.recoil.as_mut() {
            recoil.on_shot(ctx.aim, ads_alpha, &mut self.rng);
        }
        let kick = self.sample_kick(ads_alpha);
        self.kick_phase = KickPhase::Kick;

        let out = &mut *ctx.out;
        out.anim(AnimEvent::Fire { kick });
        out.push(CoreEvent::Effect(EffectRequest::MuzzleFlash {
            origin: ctx.eye,
            direction: forward,
        }));
        out.push(CoreEvent::Effect(EffectRequest::ShellEject { origin: ctx.eye }));
        out.push(CoreEvent::Effect(EffectRequest::Tracers {
            origin: ctx.eye,
            ends: pellet_ends.clone(),
        }));
        if !impacts.is_empty() {
            out.push(CoreEvent::Effect(EffectRequest::Impacts(impacts.clone())));
        }
        if let Some(profile) = &self.config.cues.camera_shake {
            out.push(CoreEvent::CameraShake {
                profile: profile.clone(),
            });
        }

        let now = ctx.timers.now();
        let cue_gap = (self.config.fire_delay() * self.config.fire_sound_delay_scale) as f64;
        if self.last_fire_cue.is_none_or(|last| now - last >= cue_gap) {
            out.audio(AudioCue::Fire, self.config.cues.fire.as_ref(), ctx.eye, 1.0);
            self.last_fire_cue = Some(now);
        }

        out.push(CoreEvent::Shot(ShotReport {
            origin: ctx.eye,
            aim: *ctx.aim,
            spread,
            pellet_ends,
            impacts,
            damage: self.config.damage,
            rounds_left: self.magazine.count(),
        }));
        trace!(
            spread,
            rounds_left = self.magazine.count(),
            "shot fired"
        );
    }

    fn sample_kick(&mut self, ads_alpha: f32) -> MeshKick {
        let cfg = &self.config.kick;
        let scale = cfg.aimed_scale.lerp(1.0, 1.0 - ads_alpha);
        let mut sample = |min: [f32; 3], max: [f32; 3]| {
            Vec3::new(
                min[0].lerp(max[0], self.rng.gen_range(0.0..1.0)),
                min[1].lerp(max[1], self.rng.gen_range(0.0..1.0)),
                min[2].lerp(max[2], self.rng.gen_range(0.0..1.0)),
            ) * scale
        };
        MeshKick {
            location: sample(cfg.location_min, cfg.location_max),
            rotation: sample(cfg.rotation_min, cfg.rotation_max),
        }
    }
}

/// Uniform direction inside a cone of `half_angle` degrees around `axis`.
fn random_in_cone<R: Rng + ?Sized>(axis: Vec3, half_angle: f32, rng: &mut R) -> Vec3 {
    if half_angle <= 0.0 {
        return axis;
    }
    let cos_max = half_angle.min(180.0).to_radians().cos();
    let z = rng.gen_range(cos_max..=1.0);
    let phi = rng.gen_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    let (u, v) = axis.any_orthonormal_pair();
    (u * r * phi.cos() + v * r * phi.sin() + axis * z).normalize_or(axis)
}

//! Collaborator side of the player core: core requests become Bevy events, and
//! small stand-in systems play the roles of the audio, VFX and animation layers.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use oc_sim::events::{AudioRequest, EffectRequest, MeshKick, ShotReport};
use oc_sim::{AnimEvent, MaterialParam, Observer, PlayerController};
use tracing::{debug, info, trace};

/// Seconds the stand-in viewmodel takes to settle after a fire kick.
const KICK_SETTLE_TIME: f32 = 0.08;
const SHAKE_PER_REQUEST: f32 = 0.35;
const SHAKE_DECAY: f32 = 3.0;
/// Camera offset at full trauma, in metres.
pub const SHAKE_MAX_OFFSET: f32 = 0.04;

#[derive(Event, Debug, Clone)]
pub struct AudioRequested(pub AudioRequest);

#[derive(Event, Debug, Clone)]
pub struct CameraShakeRequested {
    pub profile: String,
}

#[derive(Event, Debug, Clone)]
pub struct EffectRequested(pub EffectRequest);

#[derive(Event, Debug, Clone, Copy)]
pub struct MaterialParamChanged {
    pub param: MaterialParam,
    pub value: f32,
}

#[derive(Event, Debug, Clone)]
pub struct AnimCue(pub AnimEvent);

#[derive(Event, Debug, Clone)]
pub struct ShotFired(pub ShotReport);

/// Writers for every core request, handed to the core as its observer.
#[derive(SystemParam)]
pub struct CoreEventWriters<'w> {
    audio: EventWriter<'w, AudioRequested>,
    shake: EventWriter<'w, CameraShakeRequested>,
    effects: EventWriter<'w, EffectRequested>,
    material: EventWriter<'w, MaterialParamChanged>,
    anim: EventWriter<'w, AnimCue>,
    shots: EventWriter<'w, ShotFired>,
}

impl Observer for CoreEventWriters<'_> {
    fn on_audio(&mut self, request: &AudioRequest) {
        self.audio.write(AudioRequested(request.clone()));
    }

    fn on_camera_shake(&mut self, profile: &str) {
        self.shake.write(CameraShakeRequested {
            profile: profile.to_owned(),
        });
    }

    fn on_effect(&mut self, request: &EffectRequest) {
        self.effects.write(EffectRequested(request.clone()));
    }

    fn on_material_param(&mut self, param: MaterialParam, value: f32) {
        self.material.write(MaterialParamChanged { param, value });
    }

    fn on_fire(&mut self, shot: &ShotReport) {
        self.shots.write(ShotFired(shot.clone()));
    }

    fn on_fire_anim(&mut self, kick: &MeshKick) {
        self.anim.write(AnimCue(AnimEvent::Fire { kick: *kick }));
    }

    fn on_reload_start(&mut self) {
        self.anim.write(AnimCue(AnimEvent::ReloadStart));
    }

    fn on_reload_cancel(&mut self, blend_time: f32) {
        self.anim.write(AnimCue(AnimEvent::ReloadCancel { blend_time }));
    }

    fn on_equip_start(&mut self) {
        self.anim.write(AnimCue(AnimEvent::EquipStart));
    }

    fn on_stow_start(&mut self) {
        self.anim.write(AnimCue(AnimEvent::StowStart));
    }
}

/// Camera trauma in [0, 1]; squared when applied so small shakes stay subtle.
#[derive(Resource, Debug, Default)]
pub struct CameraShake {
    pub trauma: f32,
    pub time: f32,
}

impl CameraShake {
    pub fn add(&mut self, amount: f32) {
        self.trauma = (self.trauma + amount).min(1.0);
    }

    pub fn decay(&mut self, dt: f32) {
        self.trauma = (self.trauma - SHAKE_DECAY * dt).max(0.0);
        self.time += dt;
    }

    pub fn offset(&self) -> Vec3 {
        let strength = self.trauma * self.trauma * SHAKE_MAX_OFFSET;
        let t = self.time * 40.0;
        Vec3::new((t * 1.3).sin(), (t * 1.7 + 1.0).sin(), 0.0) * strength
    }
}

/// Stand-in viewmodel: settles a fire kick after a fixed time and tells the core.
#[derive(Resource, Debug, Default)]
pub struct ViewmodelKick {
    pub kick: MeshKick,
    pub remaining: Option<f32>,
}

impl ViewmodelKick {
    /// Returns true on the step the kick settles.
    pub fn step(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.remaining.as_mut() else {
            return false;
        };
        *remaining -= dt;
        if *remaining > 0.0 {
            return false;
        }
        self.remaining = None;
        self.kick = MeshKick::default();
        true
    }
}

pub fn viewmodel_kick_system(
    time: Res<Time>,
    mut cues: EventReader<AnimCue>,
    mut viewmodel: ResMut<ViewmodelKick>,
    mut player: ResMut<PlayerController>,
) {
    for AnimCue(event) in cues.read() {
        match event {
            AnimEvent::Fire { kick } => {
                viewmodel.kick = *kick;
                viewmodel.remaining = Some(KICK_SETTLE_TIME);
            }
            other => debug!(?other, "animation cue"),
        }
    }
    if viewmodel.step(time.delta_secs()) {
        player.notify_recoil_kick_settled();
    }
}

pub fn camera_shake_system(
    time: Res<Time>,
    mut requests: EventReader<CameraShakeRequested>,
    mut shake: ResMut<CameraShake>,
) {
    for request in requests.read() {
        trace!(profile = %request.profile, "camera shake");
        shake.add(SHAKE_PER_REQUEST);
    }
    shake.decay(time.delta_secs());
}

pub fn log_audio_system(mut requests: EventReader<AudioRequested>) {
    for AudioRequested(request) in requests.read() {
        debug!(
            cue = ?request.cue,
            asset = %request.asset,
            volume = request.volume,
            "play sound"
        );
    }
}

pub fn log_effect_system(mut requests: EventReader<EffectRequested>) {
    for EffectRequested(request) in requests.read() {
        match request {
            EffectRequest::Impacts(impacts) => {
                for impact in impacts {
                    debug!(surface = ?impact.surface, position = ?impact.position, "impact");
                }
            }
            other => trace!(?other, "effect"),
        }
    }
}

pub fn log_shot_system(mut shots: EventReader<ShotFired>) {
    for ShotFired(shot) in shots.read() {
        info!(
            rounds_left = shot.rounds_left,
            spread = shot.spread,
            hits = shot.impacts.len(),
            "shot"
        );
    }
}

pub fn log_material_system(mut changes: EventReader<MaterialParamChanged>) {
    for change in changes.read() {
        trace!(param = ?change.param, value = change.value, "material param");
    }
}

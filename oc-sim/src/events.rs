//! Requests the core makes of its collaborators (audio, camera, VFX, materials,
//! animation). They are queued during a tick and drained by the host.

use bevy::math::Vec3;

use crate::types::{Rotator, SurfaceType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCue {
    Footstep,
    Jump,
    Land,
    Slide,
    Fire,
    DryFire,
    Equip,
    Reload,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AudioRequest {
    pub cue: AudioCue,
    /// Asset id from configuration.
    pub asset: String,
    pub location: Vec3,
    pub volume: f32,
    pub pitch: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impact {
    pub position: Vec3,
    pub normal: Vec3,
    pub surface: SurfaceType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EffectRequest {
    MuzzleFlash { origin: Vec3, direction: Vec3 },
    Tracers { origin: Vec3, ends: Vec<Vec3> },
    ShellEject { origin: Vec3 },
    Impacts(Vec<Impact>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialParam {
    FieldOfView,
    FlatFieldOfView,
    Vignette,
}

/// Cosmetic weapon-mesh offset applied by the animation collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshKick {
    pub location: Vec3,
    /// Pitch, yaw, roll in degrees.
    pub rotation: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShotReport {
    pub origin: Vec3,
    pub aim: Rotator,
    pub spread: f32,
    pub pellet_ends: Vec<Vec3>,
    pub impacts: Vec<Impact>,
    pub damage: f32,
    pub rounds_left: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnimEvent {
    Fire { kick: MeshKick },
    ReloadStart,
    ReloadCancel { blend_time: f32 },
    EquipStart,
    StowStart,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CoreEvent {
    Audio(AudioRequest),
    CameraShake { profile: String },
    Effect(EffectRequest),
    MaterialParam { param: MaterialParam, value: f32 },
    Anim(AnimEvent),
    Shot(ShotReport),
}

/// Typed callback slots for collaborators. Every slot defaults to a no-op.
pub trait Observer {
    fn on_audio(&mut self, _request: &AudioRequest) {}
    fn on_camera_shake(&mut self, _profile: &str) {}
    fn on_effect(&mut self, _request: &EffectRequest) {}
    fn on_material_param(&mut self, _param: MaterialParam, _value: f32) {}
    fn on_fire(&mut self, _shot: &ShotReport) {}
    fn on_fire_anim(&mut self, _kick: &MeshKick) {}
    fn on_reload_start(&mut self) {}
    fn on_reload_cancel(&mut self, _blend_time: f32) {}
    fn on_equip_start(&mut self) {}
    fn on_stow_start(&mut self) {}
}

pub fn dispatch<O: Observer + ?Sized>(events: impl IntoIterator<Item = CoreEvent>, observer: &mut O) {
    for event in events {
        match &event {
            CoreEvent::Audio(request) => observer.on_audio(request),
            CoreEvent::CameraShake { profile } => observer.on_camera_shake(profile),
            CoreEvent::Effect(request) => observer.on_effect(request),
            CoreEvent::MaterialParam { param, value } => observer.on_material_param(*param, *value),
            CoreEvent::Anim(AnimEvent::Fire { kick }) => observer.on_fire_anim(kick),
            CoreEvent::Anim(AnimEvent::ReloadStart) => observer.on_reload_start(),
            CoreEvent::Anim(AnimEvent::ReloadCancel { blend_time }) => {
                observer.on_reload_cancel(*blend_time)
            }
            CoreEvent::Anim(AnimEvent::EquipStart) => observer.on_equip_start(),
            CoreEvent::Anim(AnimEvent::StowStart) => observer.on_stow_start(),
            CoreEvent::Shot(shot) => observer.on_fire(shot),
        }
    }
}

/// Per-tick queue of outbound requests.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<CoreEvent>,
}

impl Outbox {
    pub fn push(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    /// Queues an audio cue if an asset is configured for it.
    pub fn audio(&mut self, cue: AudioCue, asset: Option<&String>, location: Vec3, volume: f32) {
        let Some(asset) = asset else {
            return;
        };
        self.events.push(CoreEvent::Audio(AudioRequest {
            cue,
            asset: asset.clone(),
            location,
            volume,
            pitch: 1.0,
        }));
    }

    pub fn material(&mut self, param: MaterialParam, value: f32) {
        self.events.push(CoreEvent::MaterialParam { param, value });
    }

    pub fn anim(&mut self, event: AnimEvent) {
        self.events.push(CoreEvent::Anim(event));
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, CoreEvent> {
        self.events.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoreEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

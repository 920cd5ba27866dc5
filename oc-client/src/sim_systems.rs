use bevy::prelude::*;
use oc_sim::{FlatWorld, PlayerController};
use tracing::{debug, info};

use crate::collaborators::{CameraShake, CoreEventWriters};
use crate::input::PendingInput;

/// Core units are centimetres; the scene is in metres.
pub const CM_TO_WORLD: f32 = 0.01;

/// Distance of the target wall in front of the spawn, in centimetres.
pub const TARGET_WALL_Z: f32 = -2500.0;

#[derive(Component)]
pub struct PlayerCamera;

/// World queries the core runs against: the ground plane and the target wall.
#[derive(Resource, Debug)]
pub struct SandboxWorld(pub FlatWorld);

impl Default for SandboxWorld {
    fn default() -> Self {
        Self(FlatWorld {
            floor: 0.0,
            ceiling: None,
            wall_z: Some(TARGET_WALL_Z),
        })
    }
}

pub fn fixed_player_tick_system(
    time: Res<Time>,
    world: Res<SandboxWorld>,
    mut pending: ResMut<PendingInput>,
    mut player: ResMut<PlayerController>,
    mut writers: CoreEventWriters,
    mut last_mode: Local<Option<oc_sim::MoveMode>>,
) {
    if let Some(slot) = pending.swap_to.take() {
        if player.swap_weapon(slot) {
            info!(slot, "weapon swap");
        }
    }
    for event in pending.events.drain(..) {
        player.push_input(event);
    }

    player.tick(time.delta_secs(), &world.0);
    player.dispatch_events(&mut writers);

    let mode = player.locomotion().mode();
    if *last_mode != Some(mode) {
        debug!(?mode, "movement mode");
        *last_mode = Some(mode);
    }
}

pub fn apply_camera_system(
    player: Res<PlayerController>,
    shake: Res<CameraShake>,
    mut cameras: Query<(&mut Transform, &mut Projection), With<PlayerCamera>>,
) {
    let Ok((mut transform, mut projection)) = cameras.single_mut() else {
        return;
    };
    let snapshot = player.snapshot();
    transform.translation = snapshot.eye * CM_TO_WORLD + shake.offset();
    transform.rotation = Quat::from_euler(
        EulerRot::YXZ,
        snapshot.aim.yaw.to_radians(),
        snapshot.aim.pitch.to_radians(),
        0.0,
    );

    if let (Some(weapon), Projection::Perspective(perspective)) =
        (snapshot.weapon.as_ref(), projection.as_mut())
    {
        perspective.fov = weapon.fov.to_radians();
    }
}

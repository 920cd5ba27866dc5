use bevy::prelude::*;
use bevy::time::Fixed;
use bevy::window::{CursorGrabMode, PrimaryWindow};
use oc_sim::{ControllerConfig, PlayerController, TICK_RATE};

use crate::collaborators;
use crate::input;
use crate::sim_systems::{self, CM_TO_WORLD, PlayerCamera, TARGET_WALL_Z};

pub struct PlayerCorePlugin {
    config: ControllerConfig,
}

impl PlayerCorePlugin {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }
}

impl Plugin for PlayerCorePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(TICK_RATE))
            .insert_resource(PlayerController::new(self.config.clone()))
            .insert_resource(sim_systems::SandboxWorld::default())
            .insert_resource(input::PendingInput::default())
            .insert_resource(collaborators::CameraShake::default())
            .insert_resource(collaborators::ViewmodelKick::default())
            .add_event::<collaborators::AudioRequested>()
            .add_event::<collaborators::CameraShakeRequested>()
            .add_event::<collaborators::EffectRequested>()
            .add_event::<collaborators::MaterialParamChanged>()
            .add_event::<collaborators::AnimCue>()
            .add_event::<collaborators::ShotFired>()
            .add_systems(Update, input::input_collect_system)
            .add_systems(
                FixedUpdate,
                (
                    sim_systems::fixed_player_tick_system,
                    collaborators::viewmodel_kick_system,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    collaborators::camera_shake_system,
                    collaborators::log_audio_system,
                    collaborators::log_effect_system,
                    collaborators::log_shot_system,
                    collaborators::log_material_system,
                    sim_systems::apply_camera_system.after(collaborators::camera_shake_system),
                ),
            );
    }
}

pub struct PlayerScenePlugin;

impl Plugin for PlayerScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (spawn_scene, grab_cursor));
    }
}

fn spawn_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        PlayerCamera,
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: 90.0_f32.to_radians(),
            ..default()
        }),
        Transform::default(),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(200.0, 200.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.35, 0.38, 0.33),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::default(),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(40.0, 8.0, 0.5))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.6, 0.55, 0.5),
            ..default()
        })),
        Transform::from_xyz(0.0, 4.0, TARGET_WALL_Z * CM_TO_WORLD - 0.25),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn grab_cursor(mut windows: Query<&mut Window, With<PrimaryWindow>>) {
    if let Ok(mut window) = windows.single_mut() {
        window.cursor_options.grab_mode = CursorGrabMode::Locked;
        window.cursor_options.visible = false;
    }
}

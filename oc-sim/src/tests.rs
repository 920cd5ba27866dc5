use super::ammo::Magazine;
use super::collision::{FlatWorld, WorldProbe};
use super::config::{ControllerConfig, ReserveEntry, WeaponConfig};
use super::events::{
    AnimEvent, AudioCue, AudioRequest, CoreEvent, MaterialParam, Observer, ShotReport,
};
use super::fire_control::KickPhase;
use super::player::PlayerController;
use super::types::{AmmoType, FireMode, FireState, InputEvent, MoveMode, Rotator, TriggerPhase};
use bevy::math::{Vec2, Vec3};

const DT: f32 = 1.0 / 60.0;

/// Flat ground that ends at `edge_z`; beyond it the floor is `drop` lower.
struct LedgeWorld {
    edge_z: f32,
    drop: f32,
}

impl WorldProbe for LedgeWorld {
    fn ground_height(&self, pos: Vec3) -> Option<f32> {
        if pos.z > self.edge_z {
            Some(0.0)
        } else {
            Some(-self.drop)
        }
    }

    fn sweep_obstructed(&self, _start: Vec3, _end: Vec3, _radius: f32) -> bool {
        false
    }
}

fn seeded_config() -> ControllerConfig {
    ControllerConfig {
        seed: Some(42),
        ..ControllerConfig::default()
    }
}

fn config_with_mode(mode: FireMode) -> ControllerConfig {
    let mut config = seeded_config();
    config.loadout[0].fire_mode = mode;
    config
}

fn run(player: &mut PlayerController, world: &dyn WorldProbe, seconds: f32) -> Vec<CoreEvent> {
    let ticks = (seconds / DT).ceil() as usize;
    let mut events = Vec::new();
    for _ in 0..ticks {
        player.tick(DT, world);
        events.extend(player.drain_events());
    }
    events
}

fn send(player: &mut PlayerController, world: &dyn WorldProbe, event: InputEvent) {
    player.push_input(event);
    player.tick(DT, world);
}

fn tap(
    player: &mut PlayerController,
    world: &dyn WorldProbe,
    input: fn(TriggerPhase) -> InputEvent,
) {
    send(player, world, input(TriggerPhase::Started));
    send(player, world, input(TriggerPhase::Completed));
}

/// Player with its first weapon fully equipped and the event queue empty.
fn ready_player(config: ControllerConfig) -> PlayerController {
    let mut player = PlayerController::new(config);
    run(&mut player, &FlatWorld::empty(), 1.2);
    player.drain_events();
    player
}

fn magazine(player: &PlayerController) -> u32 {
    player.weapon().unwrap().magazine().count()
}

fn fire_state(player: &PlayerController) -> FireState {
    player.weapon().unwrap().state()
}

fn audio_cues(events: &[CoreEvent]) -> Vec<AudioCue> {
    events
        .iter()
        .filter_map(|event| match event {
            CoreEvent::Audio(request) => Some(request.cue),
            _ => None,
        })
        .collect()
}

fn shot_count(events: &[CoreEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, CoreEvent::Shot(_)))
        .count()
}

fn walk_forward(player: &mut PlayerController, world: &dyn WorldProbe, seconds: f32) {
    send(player, world, InputEvent::Move(Vec2::new(0.0, 1.0)));
    run(player, world, seconds);
}

#[test]
fn crouch_reaches_both_endpoints() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    let loco = player.config().locomotion.clone();

    send(&mut player, &world, InputEvent::Crouch(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Crouching);
    run(&mut player, &world, 0.3);
    assert!((player.locomotion().crouch_alpha() - 1.0).abs() < 1e-5);
    assert!((player.locomotion().capsule_half_height() - loco.crouch_half_height).abs() < 1e-3);
    assert!((player.current_speed_cap() - loco.crouch_speed()).abs() < 1e-2);

    send(&mut player, &world, InputEvent::Crouch(TriggerPhase::Completed));
    run(&mut player, &world, 0.5);
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);
    assert!(player.locomotion().crouch_alpha().abs() < 1e-5);
    assert!((player.locomotion().capsule_half_height() - loco.stand_half_height).abs() < 1e-3);
    assert!(!player.locomotion().stand_up_pending());
}

#[test]
fn crouch_alpha_stays_in_unit_range_mid_blend() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    send(&mut player, &world, InputEvent::Crouch(TriggerPhase::Started));
    for _ in 0..30 {
        player.tick(DT, &world);
        let alpha = player.locomotion().crouch_alpha();
        assert!((0.0..=1.0).contains(&alpha));
    }
    // Crouch again while the stand-up blend is still running.
    send(&mut player, &world, InputEvent::Crouch(TriggerPhase::Completed));
    player.tick(DT, &world);
    send(&mut player, &world, InputEvent::Crouch(TriggerPhase::Started));
    for _ in 0..30 {
        player.tick(DT, &world);
        let alpha = player.locomotion().crouch_alpha();
        assert!((0.0..=1.0).contains(&alpha));
    }
    assert_eq!(player.locomotion().mode(), MoveMode::Crouching);
}

#[test]
fn release_crouch_twice_schedules_one_probe() {
    let world = FlatWorld::with_ceiling(150.0);
    let mut player = ready_player(seeded_config());
    send(&mut player, &world, InputEvent::Crouch(TriggerPhase::Started));
    run(&mut player, &world, 0.3);

    let before = player.timers().active_count();
    player.release_crouch();
    let after_first = player.timers().active_count();
    player.release_crouch();
    assert_eq!(after_first, before + 1);
    assert_eq!(player.timers().active_count(), after_first);
}

#[test]
fn stand_up_waits_for_clearance() {
    let blocked = FlatWorld::with_ceiling(150.0);
    let mut player = ready_player(seeded_config());
    send(&mut player, &blocked, InputEvent::Crouch(TriggerPhase::Started));
    run(&mut player, &blocked, 0.3);
    send(&mut player, &blocked, InputEvent::Crouch(TriggerPhase::Completed));
    run(&mut player, &blocked, 1.0);

    assert_eq!(player.locomotion().mode(), MoveMode::Crouching);
    assert!(player.locomotion().stand_up_pending());
    assert!((player.locomotion().crouch_alpha() - 1.0).abs() < 1e-5);

    // No jumping out from under the obstruction.
    let jumps = player.jump_controller().jumps_left();
    send(&mut player, &blocked, InputEvent::Jump(TriggerPhase::Started));
    assert!(player.body().grounded);
    assert_eq!(player.jump_controller().jumps_left(), jumps);

    let clear = FlatWorld::empty();
    run(&mut player, &clear, 0.5);
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);
    assert!(!player.locomotion().stand_up_pending());
    assert!(player.locomotion().crouch_alpha().abs() < 1e-5);
}

#[test]
fn crouch_press_cancels_pending_stand() {
    let blocked = FlatWorld::with_ceiling(150.0);
    let mut player = ready_player(seeded_config());
    send(&mut player, &blocked, InputEvent::Crouch(TriggerPhase::Started));
    run(&mut player, &blocked, 0.3);
    send(&mut player, &blocked, InputEvent::Crouch(TriggerPhase::Completed));
    run(&mut player, &blocked, 0.2);
    assert!(player.locomotion().stand_up_pending());

    send(&mut player, &blocked, InputEvent::Crouch(TriggerPhase::Started));
    assert!(!player.locomotion().stand_up_pending());
    run(&mut player, &FlatWorld::empty(), 0.5);
    assert_eq!(player.locomotion().mode(), MoveMode::Crouching);
}

#[test]
fn sprint_needs_velocity_and_forward_input() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());

    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);

    walk_forward(&mut player, &world, 0.5);
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Sprinting);
    run(&mut player, &world, 0.5);
    let loco = player.config().locomotion.clone();
    assert!((player.current_speed_cap() - loco.sprint_speed()).abs() < 1e-2);
    assert!(player.body().horizontal_speed() > loco.base_walk_speed);

    send(&mut player, &world, InputEvent::Move(Vec2::new(0.0, 0.2)));
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);
    assert_eq!(player.locomotion().sprint_charge(), 0.0);
}

#[test]
fn sprint_charge_ramps_to_full() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    walk_forward(&mut player, &world, 0.5);
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));

    run(&mut player, &world, 0.5);
    let partial = player.locomotion().sprint_charge();
    assert!(partial > 0.0 && partial < 1.0);
    run(&mut player, &world, 1.0);
    assert_eq!(player.locomotion().sprint_charge(), 1.0);
}

fn start_full_slide(player: &mut PlayerController, world: &dyn WorldProbe) {
    walk_forward(player, world, 0.5);
    send(player, world, InputEvent::Sprint(TriggerPhase::Started));
    run(player, world, 1.2);
    assert_eq!(player.locomotion().sprint_charge(), 1.0);
    send(player, world, InputEvent::Crouch(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Sliding);
}

#[test]
fn slide_with_crouch_held_ends_crouched() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    start_full_slide(&mut player, &world);

    let slide_velocity = player.locomotion().slide_velocity();
    assert!(slide_velocity.length() > player.config().locomotion.base_walk_speed);
    assert!(slide_velocity.z < 0.0);
    assert!(player.locomotion().friction_factor() < 0.1);

    // Weapon actions are locked out mid-slide.
    tap(&mut player, &world, InputEvent::Fire);
    assert_eq!(magazine(&player), 30);
    assert!(!player.can_act());

    run(&mut player, &world, 1.2);
    assert_eq!(player.locomotion().mode(), MoveMode::Crouching);
    assert_eq!(player.locomotion().slide_alpha(), 0.0);
    assert_eq!(player.locomotion().friction_factor(), 1.0);
    assert!(!player.locomotion().stand_up_pending());
}

#[test]
fn slide_with_crouch_released_stands_up() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    start_full_slide(&mut player, &world);
    run(&mut player, &world, 0.2);
    send(&mut player, &world, InputEvent::Crouch(TriggerPhase::Completed));
    assert_eq!(player.locomotion().mode(), MoveMode::Sliding);

    run(&mut player, &world, 1.5);
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);
    assert!(player.locomotion().crouch_alpha().abs() < 1e-5);
}

#[test]
fn slide_alpha_decays_monotonically() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    start_full_slide(&mut player, &world);
    let mut last = player.locomotion().slide_alpha();
    while player.locomotion().mode() == MoveMode::Sliding {
        player.tick(DT, &world);
        let alpha = player.locomotion().slide_alpha();
        assert!((0.0..=1.0).contains(&alpha));
        assert!(alpha <= last);
        last = alpha;
    }
}

#[test]
fn landing_sprint_with_crouch_held_slides() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    walk_forward(&mut player, &world, 0.5);
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    run(&mut player, &world, 1.2);
    assert_eq!(player.locomotion().sprint_charge(), 1.0);

    send(&mut player, &world, InputEvent::Jump(TriggerPhase::Started));
    assert!(!player.body().grounded);
    send(&mut player, &world, InputEvent::Crouch(TriggerPhase::Started));
    // Airborne sprint keeps sprinting until touchdown.
    assert_eq!(player.locomotion().mode(), MoveMode::Sprinting);
    assert!(player.locomotion().crouch_held());

    let mut ticks = 0;
    while !player.body().grounded {
        player.tick(DT, &world);
        ticks += 1;
        assert!(ticks < 180, "never landed");
    }
    assert_eq!(player.locomotion().mode(), MoveMode::Sliding);
    let slide_velocity = player.locomotion().slide_velocity();
    assert!(slide_velocity.length() > 0.0);
    assert!(slide_velocity.z < 0.0);
    assert_eq!(player.locomotion().sprint_charge(), 0.0);
}

#[test]
fn jumps_left_stays_within_bounds() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    let max = player.jump_controller().jumps_max();

    send(&mut player, &world, InputEvent::Jump(TriggerPhase::Started));
    assert!(!player.body().grounded);
    assert_eq!(player.jump_controller().jumps_left(), max - 1);
    send(&mut player, &world, InputEvent::Jump(TriggerPhase::Started));
    assert_eq!(player.jump_controller().jumps_left(), 0);
    send(&mut player, &world, InputEvent::Jump(TriggerPhase::Started));
    assert_eq!(player.jump_controller().jumps_left(), 0);

    let mut events = Vec::new();
    for _ in 0..600 {
        player.tick(DT, &world);
        events.extend(player.drain_events());
        assert!(player.jump_controller().jumps_left() <= max);
        if player.body().grounded {
            break;
        }
    }
    assert!(player.body().grounded);
    assert_eq!(player.jump_controller().jumps_left(), max);
    assert!(audio_cues(&events).contains(&AudioCue::Land));
}

#[test]
fn coyote_window_expiry_consumes_one_jump() {
    let world = LedgeWorld {
        edge_z: -100.0,
        drop: 1000.0,
    };
    let mut player = ready_player(seeded_config());
    send(&mut player, &world, InputEvent::Move(Vec2::new(0.0, 1.0)));
    for _ in 0..120 {
        player.tick(DT, &world);
        if !player.body().grounded {
            break;
        }
    }
    assert!(!player.body().grounded);
    assert!(player.jump_controller().coyote_active());
    assert_eq!(player.jump_controller().jumps_left(), 2);

    run(&mut player, &world, 0.5);
    assert!(!player.jump_controller().coyote_active());
    assert_eq!(player.jump_controller().jumps_left(), 1);
}

#[test]
fn coyote_jump_closes_window_without_double_charge() {
    let world = LedgeWorld {
        edge_z: -100.0,
        drop: 1000.0,
    };
    let mut player = ready_player(seeded_config());
    send(&mut player, &world, InputEvent::Move(Vec2::new(0.0, 1.0)));
    for _ in 0..120 {
        player.tick(DT, &world);
        if !player.body().grounded {
            break;
        }
    }
    assert!(player.jump_controller().coyote_active());

    send(&mut player, &world, InputEvent::Jump(TriggerPhase::Started));
    assert_eq!(player.jump_controller().jumps_left(), 1);
    assert!(!player.jump_controller().coyote_active());
    assert!(player.body().velocity.y > 0.0);

    // The window would have closed by now; nothing else is charged.
    run(&mut player, &world, 0.5);
    assert_eq!(player.jump_controller().jumps_left(), 1);

    send(&mut player, &world, InputEvent::Jump(TriggerPhase::Started));
    assert_eq!(player.jump_controller().jumps_left(), 0);
    send(&mut player, &world, InputEvent::Jump(TriggerPhase::Started));
    assert_eq!(player.jump_controller().jumps_left(), 0);

    for _ in 0..600 {
        player.tick(DT, &world);
        if player.body().grounded {
            break;
        }
    }
    assert!(player.body().grounded);
    assert!((player.body().position.y + 1000.0).abs() < 1e-3);
    assert_eq!(player.jump_controller().jumps_left(), 2);
}

#[test]
fn fire_is_ignored_while_equipping() {
    let world = FlatWorld::empty();
    let mut player = PlayerController::new(seeded_config());
    assert_eq!(fire_state(&player), FireState::Equipping);
    let events = player.drain_events();
    assert!(
        events
            .iter()
            .any(|event| matches!(event, CoreEvent::Anim(AnimEvent::EquipStart)))
    );

    tap(&mut player, &world, InputEvent::Fire);
    assert_eq!(magazine(&player), 30);

    run(&mut player, &world, 1.1);
    assert_eq!(fire_state(&player), FireState::Idle);
}

#[test]
fn equip_blend_out_finishes_early() {
    let mut player = PlayerController::new(seeded_config());
    player.notify_equip_blended_out(true);
    assert_eq!(fire_state(&player), FireState::Idle);
}

#[test]
fn emptying_the_magazine_auto_reloads() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    let mut events = Vec::new();

    for _ in 0..30 {
        tap(&mut player, &world, InputEvent::Fire);
        events.extend(run(&mut player, &world, 0.15));
        let count = magazine(&player);
        assert!(count <= 30);
    }
    assert_eq!(magazine(&player), 0);
    assert_eq!(player.reserve().get(AmmoType::Primary), 90);

    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Started));
    events.extend(player.drain_events());
    assert!(audio_cues(&events).contains(&AudioCue::DryFire));
    assert_eq!(fire_state(&player), FireState::Reloading);

    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Completed));
    run(&mut player, &world, 2.2);
    assert_eq!(magazine(&player), 30);
    assert_eq!(player.reserve().get(AmmoType::Primary), 60);
    assert_eq!(fire_state(&player), FireState::Idle);
}

#[test]
fn reload_respects_reserve_and_capacity() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());

    // Full magazine: nothing to do.
    assert!(!player.reload(&world));

    player.reserve_mut().set(AmmoType::Primary, 10);
    *player.weapon_mut().unwrap().magazine_mut() = Magazine::with_count(30, 5);
    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    assert_eq!(fire_state(&player), FireState::Reloading);
    run(&mut player, &world, 2.2);
    assert_eq!(magazine(&player), 15);
    assert_eq!(player.reserve().get(AmmoType::Primary), 0);

    // Empty reserve blocks the next reload.
    assert!(!player.reload(&world));
    assert_eq!(fire_state(&player), FireState::Idle);
}

#[test]
fn interrupted_reload_drops_after_lockout() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    *player.weapon_mut().unwrap().magazine_mut() = Magazine::with_count(30, 10);

    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    player.notify_reload_blended_out(true, &world);
    assert_eq!(fire_state(&player), FireState::Reloading);
    run(&mut player, &world, 0.25);
    assert_eq!(fire_state(&player), FireState::Idle);
    assert_eq!(magazine(&player), 10);
    assert_eq!(player.reserve().get(AmmoType::Primary), 90);

    // An uninterrupted blend-out completes on the spot.
    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    player.notify_reload_blended_out(false, &world);
    assert_eq!(fire_state(&player), FireState::Idle);
    assert_eq!(magazine(&player), 30);
    assert_eq!(player.reserve().get(AmmoType::Primary), 70);
}

#[test]
fn burst_fires_three_then_rate_limits() {
    let world = FlatWorld::empty();
    let mut player = ready_player(config_with_mode(FireMode::Burst));

    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Started));
    assert_eq!(magazine(&player), 29);
    run(&mut player, &world, 0.25);
    assert_eq!(magazine(&player), 27);
    assert!(
        player
            .weapon()
            .unwrap()
            .is_rate_limited(player.timers())
    );

    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Started));
    assert_eq!(magazine(&player), 27);

    run(&mut player, &world, 0.2);
    assert_eq!(magazine(&player), 27);
    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Started));
    assert_eq!(magazine(&player), 26);
}

#[test]
fn single_fire_is_rate_limited() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    tap(&mut player, &world, InputEvent::Fire);
    tap(&mut player, &world, InputEvent::Fire);
    assert_eq!(magazine(&player), 29);
    run(&mut player, &world, 0.15);
    tap(&mut player, &world, InputEvent::Fire);
    assert_eq!(magazine(&player), 28);
}

#[test]
fn auto_dry_fire_reloads_and_resumes() {
    let world = FlatWorld::empty();
    let mut player = ready_player(config_with_mode(FireMode::Auto));
    *player.weapon_mut().unwrap().magazine_mut() = Magazine::with_count(30, 1);

    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Started));
    let mut events = player.drain_events();
    assert_eq!(magazine(&player), 0);
    assert_eq!(fire_state(&player), FireState::Firing);

    events.extend(run(&mut player, &world, 0.2));
    assert_eq!(fire_state(&player), FireState::Reloading);
    let cues = audio_cues(&events);
    assert_eq!(cues.iter().filter(|cue| **cue == AudioCue::DryFire).count(), 1);
    assert!(
        events
            .iter()
            .any(|event| matches!(event, CoreEvent::Anim(AnimEvent::ReloadStart)))
    );

    events.extend(run(&mut player, &world, 2.3));
    assert_eq!(player.reserve().get(AmmoType::Primary), 60);
    assert_eq!(fire_state(&player), FireState::Firing);
    let count = magazine(&player);
    assert!(count < 30 && count > 20, "magazine at {count}");
    assert_eq!(shot_count(&events), 1 + (30 - count) as usize);

    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Completed));
    assert_eq!(fire_state(&player), FireState::Idle);
    let stopped_at = magazine(&player);
    run(&mut player, &world, 0.5);
    assert_eq!(magazine(&player), stopped_at);
}

#[test]
fn held_auto_trigger_resumes_after_rate_limit() {
    let world = FlatWorld::empty();
    let mut player = ready_player(config_with_mode(FireMode::Auto));

    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Started));
    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Completed));
    assert_eq!(magazine(&player), 29);
    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    assert_eq!(fire_state(&player), FireState::Reloading);
    send(&mut player, &world, InputEvent::Fire(TriggerPhase::Started));

    // The reload lands while the released cadence is still rate limiting.
    player.notify_reload_blended_out(false, &world);
    assert_eq!(magazine(&player), 30);
    assert!(
        player
            .weapon()
            .unwrap()
            .is_rate_limited(player.timers())
    );
    assert_eq!(fire_state(&player), FireState::Idle);

    run(&mut player, &world, 0.2);
    assert_eq!(fire_state(&player), FireState::Firing);
    assert!(magazine(&player) < 30);
}

#[test]
fn fire_mode_cycles_unless_busy() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    let mut seen = Vec::new();
    for _ in 0..3 {
        tap(&mut player, &world, InputEvent::SwitchFireMode);
        seen.push(player.weapon().unwrap().fire_mode());
    }
    assert_eq!(seen, vec![FireMode::Burst, FireMode::Auto, FireMode::Single]);

    *player.weapon_mut().unwrap().magazine_mut() = Magazine::with_count(30, 3);
    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    assert!(!player.switch_fire_mode());
    assert_eq!(player.weapon().unwrap().fire_mode(), FireMode::Single);
}

#[test]
fn single_shot_recoil_returns_to_checkpoint() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    let start = Rotator::new(2.0, 30.0);
    player.set_aim(start);

    tap(&mut player, &world, InputEvent::Fire);
    assert!(player.aim().pitch > start.pitch);
    assert!(player.snapshot().weapon.unwrap().recoil_active);

    run(&mut player, &world, 3.0);
    let recoil = player.weapon().unwrap().recoil().unwrap();
    assert!(recoil.is_neutral());
    assert!((player.aim().pitch - start.pitch).abs() <= 0.011);
    assert!((player.aim().yaw - start.yaw).abs() <= 0.011);
}

#[test]
fn mesh_kick_settles_after_recoil() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    tap(&mut player, &world, InputEvent::Fire);
    assert_eq!(player.weapon().unwrap().kick_phase(), KickPhase::Kick);

    player.notify_recoil_kick_settled();
    assert_eq!(player.weapon().unwrap().kick_phase(), KickPhase::Recovery);
    run(&mut player, &world, 3.0);
    assert_eq!(player.weapon().unwrap().kick_phase(), KickPhase::Idle);
}

#[test]
fn sprint_and_aim_exclude_each_other() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    walk_forward(&mut player, &world, 0.5);

    send(&mut player, &world, InputEvent::Ads(TriggerPhase::Started));
    run(&mut player, &world, 0.5);
    assert!(player.weapon().unwrap().ads().alpha() > 0.99);
    let base = player.config().locomotion.base_walk_speed;
    assert!((player.current_speed_cap() - base * 0.6).abs() < 0.5);

    // Sprinting forces a fast aim exit but remembers the held input.
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Sprinting);
    run(&mut player, &world, 0.25);
    assert_eq!(player.weapon().unwrap().ads().alpha(), 0.0);
    assert!(player.weapon().unwrap().ads().held());

    // Ending the sprint re-enters aim.
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);
    run(&mut player, &world, 0.5);
    assert!(player.weapon().unwrap().ads().alpha() > 0.99);

    // Aiming while sprinting stops the sprint first.
    send(&mut player, &world, InputEvent::Ads(TriggerPhase::Completed));
    run(&mut player, &world, 0.5);
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Sprinting);
    send(&mut player, &world, InputEvent::Ads(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);
    run(&mut player, &world, 0.5);
    assert!(player.weapon().unwrap().ads().alpha() > 0.99);
}

#[test]
fn firing_stops_sprint() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    walk_forward(&mut player, &world, 0.5);
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Sprinting);
    tap(&mut player, &world, InputEvent::Fire);
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);
    assert_eq!(magazine(&player), 29);
}

#[test]
fn reload_exits_aim_and_resumes_it() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    *player.weapon_mut().unwrap().magazine_mut() = Magazine::with_count(30, 10);
    send(&mut player, &world, InputEvent::Ads(TriggerPhase::Started));
    run(&mut player, &world, 0.5);

    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    run(&mut player, &world, 0.3);
    assert_eq!(player.weapon().unwrap().ads().alpha(), 0.0);

    run(&mut player, &world, 2.2);
    assert_eq!(fire_state(&player), FireState::Idle);
    assert!(player.weapon().unwrap().ads().alpha() > 0.99);
}

#[test]
fn reload_finishing_mid_sprint_keeps_aim_down() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    *player.weapon_mut().unwrap().magazine_mut() = Magazine::with_count(30, 10);
    walk_forward(&mut player, &world, 0.5);
    send(&mut player, &world, InputEvent::Ads(TriggerPhase::Started));
    run(&mut player, &world, 0.5);

    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    run(&mut player, &world, 0.3);
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Sprinting);

    run(&mut player, &world, 2.2);
    assert_eq!(fire_state(&player), FireState::Idle);
    assert_eq!(magazine(&player), 30);
    assert_eq!(player.locomotion().mode(), MoveMode::Sprinting);
    assert_eq!(player.weapon().unwrap().ads().alpha(), 0.0);
    assert!(player.weapon().unwrap().ads().held());
    let sprint_speed = player.config().locomotion.sprint_speed();
    assert!((player.current_speed_cap() - sprint_speed).abs() < 0.5);

    // Aim comes back once the sprint ends.
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    assert_eq!(player.locomotion().mode(), MoveMode::Walking);
    run(&mut player, &world, 0.5);
    assert!(player.weapon().unwrap().ads().alpha() > 0.99);
}

#[test]
fn reload_lockout_mid_sprint_keeps_aim_down() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    *player.weapon_mut().unwrap().magazine_mut() = Magazine::with_count(30, 10);
    walk_forward(&mut player, &world, 0.5);
    send(&mut player, &world, InputEvent::Ads(TriggerPhase::Started));
    run(&mut player, &world, 0.5);

    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    run(&mut player, &world, 0.3);
    send(&mut player, &world, InputEvent::Sprint(TriggerPhase::Started));
    player.notify_reload_blended_out(true, &world);
    run(&mut player, &world, 0.3);

    assert_eq!(fire_state(&player), FireState::Idle);
    assert_eq!(magazine(&player), 10);
    assert_eq!(player.locomotion().mode(), MoveMode::Sprinting);
    assert_eq!(player.weapon().unwrap().ads().alpha(), 0.0);
}

#[test]
fn aim_blend_publishes_material_params() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    send(&mut player, &world, InputEvent::Ads(TriggerPhase::Started));
    let events = run(&mut player, &world, 0.5);

    let last_fov = events
        .iter()
        .filter_map(|event| match event {
            CoreEvent::MaterialParam {
                param: MaterialParam::FieldOfView,
                value,
            } => Some(*value),
            _ => None,
        })
        .last()
        .unwrap();
    let ads = &player.config().loadout[0].ads;
    assert!((last_fov - ads.aimed_fov).abs() < 1e-3);

    let snapshot = player.snapshot().weapon.unwrap();
    assert!((snapshot.fov - ads.aimed_fov).abs() < 1e-3);
    assert!((snapshot.vignette - ads.vignette[1]).abs() < 1e-3);
}

#[test]
fn swap_keeps_per_slot_magazines() {
    let world = FlatWorld::empty();
    let mut config = seeded_config();
    config.loadout.push(WeaponConfig {
        name: "pistol".into(),
        ammo_type: AmmoType::Secondary,
        magazine_capacity: 12,
        ..WeaponConfig::default()
    });
    config.reserve.push(ReserveEntry {
        ammo: AmmoType::Secondary,
        rounds: 24,
    });
    let mut player = ready_player(config);

    tap(&mut player, &world, InputEvent::Fire);
    assert_eq!(magazine(&player), 29);

    assert!(player.swap_weapon(1));
    assert_eq!(fire_state(&player), FireState::Stowing);
    run(&mut player, &world, 0.6);
    assert_eq!(player.active_slot(), 1);
    assert_eq!(player.weapon().unwrap().config().name, "pistol");
    assert_eq!(fire_state(&player), FireState::Equipping);
    run(&mut player, &world, 1.1);
    assert_eq!(fire_state(&player), FireState::Idle);
    assert_eq!(magazine(&player), 12);

    assert!(!player.swap_weapon(1));
    assert!(!player.swap_weapon(5));

    assert!(player.swap_weapon(0));
    run(&mut player, &world, 1.7);
    assert_eq!(player.weapon().unwrap().config().name, "rifle");
    assert_eq!(magazine(&player), 29);
}

#[test]
fn swap_cancels_reload_without_refund() {
    let world = FlatWorld::empty();
    let mut config = seeded_config();
    config.loadout.push(WeaponConfig {
        name: "pistol".into(),
        ammo_type: AmmoType::Secondary,
        magazine_capacity: 12,
        ..WeaponConfig::default()
    });
    let mut player = ready_player(config);
    *player.weapon_mut().unwrap().magazine_mut() = Magazine::with_count(30, 10);

    send(&mut player, &world, InputEvent::Reload(TriggerPhase::Started));
    run(&mut player, &world, 0.5);
    assert_eq!(fire_state(&player), FireState::Reloading);
    player.drain_events();

    assert!(player.swap_weapon(1));
    let events = player.drain_events();
    assert!(events.contains(&CoreEvent::Anim(AnimEvent::ReloadCancel { blend_time: 0.25 })));
    assert!(events.contains(&CoreEvent::Anim(AnimEvent::StowStart)));
    assert_eq!(fire_state(&player), FireState::Stowing);
    assert_eq!(magazine(&player), 10);
    assert_eq!(player.reserve().get(AmmoType::Primary), 90);

    // Well past the original reload time.
    run(&mut player, &world, 2.0);
    assert_eq!(player.weapon().unwrap().config().name, "pistol");
    assert_eq!(player.reserve().get(AmmoType::Primary), 90);

    assert!(player.swap_weapon(0));
    run(&mut player, &world, 1.7);
    assert_eq!(player.weapon().unwrap().config().name, "rifle");
    assert_eq!(fire_state(&player), FireState::Idle);
    assert_eq!(magazine(&player), 10);
    assert_eq!(player.reserve().get(AmmoType::Primary), 90);
}

#[test]
fn walking_plays_footsteps() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    send(&mut player, &world, InputEvent::Move(Vec2::new(0.0, 1.0)));
    let events = run(&mut player, &world, 2.0);
    let steps = audio_cues(&events)
        .into_iter()
        .filter(|cue| *cue == AudioCue::Footstep)
        .count();
    assert!(steps >= 3, "only {steps} footsteps");

    send(&mut player, &world, InputEvent::Move(Vec2::ZERO));
    run(&mut player, &world, 1.0);
    let events = run(&mut player, &world, 1.0);
    assert!(!audio_cues(&events).contains(&AudioCue::Footstep));
}

#[test]
fn look_input_clamps_pitch() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    send(&mut player, &world, InputEvent::Look(Vec2::new(15.0, 200.0)));
    assert_eq!(player.aim().pitch, 89.0);
    assert_eq!(player.aim().yaw, 15.0);
}

#[derive(Default)]
struct Recorder {
    shots: Vec<ShotReport>,
    audio: Vec<AudioRequest>,
    shakes: usize,
}

impl Observer for Recorder {
    fn on_audio(&mut self, request: &AudioRequest) {
        self.audio.push(request.clone());
    }

    fn on_camera_shake(&mut self, _profile: &str) {
        self.shakes += 1;
    }

    fn on_fire(&mut self, shot: &ShotReport) {
        self.shots.push(shot.clone());
    }
}

#[test]
fn observer_receives_shot_and_cues() {
    let world = FlatWorld {
        wall_z: Some(-500.0),
        ..FlatWorld::default()
    };
    let mut player = ready_player(seeded_config());
    player.push_input(InputEvent::Fire(TriggerPhase::Started));
    player.tick(DT, &world);

    let mut recorder = Recorder::default();
    player.dispatch_events(&mut recorder);
    assert_eq!(recorder.shots.len(), 1);
    assert_eq!(recorder.shakes, 1);
    assert!(recorder.audio.iter().any(|a| a.cue == AudioCue::Fire));

    let shot = &recorder.shots[0];
    assert_eq!(shot.rounds_left, 29);
    assert_eq!(shot.impacts.len(), 1);
    assert!((shot.impacts[0].position.z + 500.0).abs() < 1e-2);
    assert!(player.events().next().is_none());
}

#[test]
fn snapshot_reflects_state() {
    let world = FlatWorld::empty();
    let mut player = ready_player(seeded_config());
    walk_forward(&mut player, &world, 0.5);
    let snapshot = player.snapshot();
    assert_eq!(snapshot.mode, MoveMode::Walking);
    assert!(snapshot.grounded);
    assert_eq!(snapshot.jumps_left, 2);
    assert!(snapshot.velocity.z < 0.0);
    assert!((snapshot.eye.y - player.eye_position().y).abs() < 1e-4);
    let weapon = snapshot.weapon.unwrap();
    assert_eq!(weapon.name, "rifle");
    assert_eq!(weapon.magazine, 30);
    assert_eq!(weapon.reserve, 90);
    assert_eq!(weapon.state, FireState::Idle);
}

#[test]
fn seeded_runs_are_deterministic() {
    let world = FlatWorld::empty();
    let script = |player: &mut PlayerController| {
        walk_forward(player, &world, 0.3);
        for _ in 0..5 {
            tap(player, &world, InputEvent::Fire);
            run(player, &world, 0.05);
        }
        player.snapshot()
    };
    let mut a = ready_player(config_with_mode(FireMode::Auto));
    let mut b = ready_player(config_with_mode(FireMode::Auto));
    assert_eq!(script(&mut a), script(&mut b));
}

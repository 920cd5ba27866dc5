use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use oc_sim::{InputEvent, TriggerPhase};

/// Degrees of aim per pixel of mouse travel.
const LOOK_DEGREES_PER_PIXEL: f32 = 0.1;

/// Input gathered on `Update` and consumed by the next fixed tick.
#[derive(Resource, Default, Debug)]
pub struct PendingInput {
    pub events: Vec<InputEvent>,
    pub swap_to: Option<usize>,
}

/// Device state sampled once per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Buttons {
    pub move_axis: Vec2,
    pub jump: bool,
    pub crouch: bool,
    pub sprint: bool,
    pub fire: bool,
    pub reload: bool,
    pub switch_fire_mode: bool,
    pub ads: bool,
}

impl Buttons {
    pub fn sample(keys: &ButtonInput<KeyCode>, mouse: &ButtonInput<MouseButton>) -> Self {
        let mut move_axis = Vec2::ZERO;
        if keys.pressed(KeyCode::KeyW) {
            move_axis.y += 1.0;
        }
        if keys.pressed(KeyCode::KeyS) {
            move_axis.y -= 1.0;
        }
        if keys.pressed(KeyCode::KeyD) {
            move_axis.x += 1.0;
        }
        if keys.pressed(KeyCode::KeyA) {
            move_axis.x -= 1.0;
        }

        Self {
            move_axis: move_axis.clamp_length_max(1.0),
            jump: keys.pressed(KeyCode::Space),
            crouch: keys.pressed(KeyCode::ControlLeft) || keys.pressed(KeyCode::KeyC),
            sprint: keys.pressed(KeyCode::ShiftLeft),
            fire: mouse.pressed(MouseButton::Left),
            reload: keys.pressed(KeyCode::KeyR),
            switch_fire_mode: keys.pressed(KeyCode::KeyB),
            ads: mouse.pressed(MouseButton::Right),
        }
    }
}

/// Turns two consecutive device samples and the mouse travel between them into
/// core input events. Buttons produce `Started`/`Completed` on their edges; the
/// move axis is only re-sent when it changes.
pub fn map_input(prev: &Buttons, now: &Buttons, mouse_delta: Vec2) -> Vec<InputEvent> {
    let mut events = Vec::new();
    if now.move_axis != prev.move_axis {
        events.push(InputEvent::Move(now.move_axis));
    }
    if mouse_delta != Vec2::ZERO {
        // Screen x grows right and y grows down; yaw grows left and pitch up.
        events.push(InputEvent::Look(-mouse_delta * LOOK_DEGREES_PER_PIXEL));
    }

    let edges: [(bool, bool, fn(TriggerPhase) -> InputEvent); 7] = [
        (prev.jump, now.jump, InputEvent::Jump),
        (prev.crouch, now.crouch, InputEvent::Crouch),
        (prev.sprint, now.sprint, InputEvent::Sprint),
        (prev.fire, now.fire, InputEvent::Fire),
        (prev.reload, now.reload, InputEvent::Reload),
        (prev.switch_fire_mode, now.switch_fire_mode, InputEvent::SwitchFireMode),
        (prev.ads, now.ads, InputEvent::Ads),
    ];
    for (was, is, make) in edges {
        match (was, is) {
            (false, true) => events.push(make(TriggerPhase::Started)),
            (true, false) => events.push(make(TriggerPhase::Completed)),
            _ => {}
        }
    }
    events
}

pub fn input_collect_system(
    keys: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut motion_events: EventReader<MouseMotion>,
    mut last: Local<Buttons>,
    mut pending: ResMut<PendingInput>,
) {
    let mut mouse_delta = Vec2::ZERO;
    for ev in motion_events.read() {
        mouse_delta += ev.delta;
    }

    let now = Buttons::sample(&keys, &mouse);
    let events = map_input(&last, &now, mouse_delta);
    pending.events.extend(events);
    *last = now;

    const SLOT_KEYS: [KeyCode; 4] = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
    ];
    if let Some(slot) = SLOT_KEYS.iter().position(|key| keys.just_pressed(*key)) {
        pending.swap_to = Some(slot);
    }
}

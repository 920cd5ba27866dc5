//! Keyframed curves and the playhead that drives every blended quantity.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interp {
    Linear,
    /// Hermite segments with auto tangents (flat at the end keys).
    Cubic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

#[derive(Clone, Debug)]
pub struct Curve {
    keys: Vec<CurveKey>,
    interp: Interp,
}

impl Curve {
    pub fn new(mut keys: Vec<CurveKey>, interp: Interp) -> Self {
        if keys.is_empty() {
            keys.push(CurveKey {
                time: 0.0,
                value: 0.0,
            });
        }
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys, interp }
    }

    pub fn from_points(points: &[(f32, f32)], interp: Interp) -> Self {
        Self::new(
            points
                .iter()
                .map(|&(time, value)| CurveKey { time, value })
                .collect(),
            interp,
        )
    }

    pub fn linear(from: f32, to: f32, length: f32) -> Self {
        Self::from_points(&[(0.0, from), (length, to)], Interp::Linear)
    }

    pub fn cubic(from: f32, to: f32, length: f32) -> Self {
        Self::from_points(&[(0.0, from), (length, to)], Interp::Cubic)
    }

    pub fn length(&self) -> f32 {
        self.keys.last().map_or(0.0, |k| k.time)
    }

    pub fn sample(&self, t: f32) -> f32 {
        let first = self.keys[0];
        let last = self.keys[self.keys.len() - 1];
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        let i = self
            .keys
            .windows(2)
            .position(|w| t >= w[0].time && t < w[1].time)
            .unwrap_or(0);
        let k0 = self.keys[i];
        let k1 = self.keys[i + 1];
        let span = k1.time - k0.time;
        if span <= f32::EPSILON {
            return k1.value;
        }
        let u = (t - k0.time) / span;
        match self.interp {
            Interp::Linear => k0.value + (k1.value - k0.value) * u,
            Interp::Cubic => {
                let m0 = self.tangent(i) * span;
                let m1 = self.tangent(i + 1) * span;
                let u2 = u * u;
                let u3 = u2 * u;
                (2.0 * u3 - 3.0 * u2 + 1.0) * k0.value
                    + (u3 - 2.0 * u2 + u) * m0
                    + (-2.0 * u3 + 3.0 * u2) * k1.value
                    + (u3 - u2) * m1
            }
        }
    }

    fn tangent(&self, i: usize) -> f32 {
        if i == 0 || i + 1 >= self.keys.len() {
            return 0.0;
        }
        let prev = self.keys[i - 1];
        let next = self.keys[i + 1];
        let span = next.time - prev.time;
        if span <= f32::EPSILON {
            0.0
        } else {
            (next.value - prev.value) / span
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayDirection {
    Forward,
    Backward,
}

/// Result of one [`Timeline::advance`] call.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineStep<E> {
    pub value: f32,
    /// Set once when a non-looping timeline reaches either end.
    pub finished: bool,
    pub events: Vec<E>,
}

const MAX_WRAPS_PER_ADVANCE: usize = 8;

#[derive(Clone, Debug)]
pub struct Timeline<E = ()> {
    curve: Curve,
    length: f32,
    position: f32,
    play_rate: f32,
    direction: PlayDirection,
    playing: bool,
    looping: bool,
    events: Vec<(f32, E)>,
}

impl<E: Copy> Timeline<E> {
    pub fn new(curve: Curve) -> Self {
        let length = curve.length().max(1e-4);
        Self {
            curve,
            length,
            position: 0.0,
            play_rate: 1.0,
            direction: PlayDirection::Forward,
            playing: false,
            looping: false,
            events: Vec::new(),
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_event(mut self, time: f32, event: E) -> Self {
        self.events.push((time.clamp(0.0, self.length), event));
        self
    }

    pub fn with_play_rate(mut self, rate: f32) -> Self {
        self.play_rate = rate.max(0.0);
        self
    }

    /// Plays forward from the current position.
    pub fn play(&mut self) {
        self.direction = PlayDirection::Forward;
        self.playing = true;
    }

    /// Plays backward from the current position.
    pub fn reverse(&mut self) {
        self.direction = PlayDirection::Backward;
        self.playing = true;
    }

    pub fn play_from_start(&mut self) {
        self.position = 0.0;
        self.play();
    }

    pub fn reverse_from_end(&mut self) {
        self.position = self.length;
        self.reverse();
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn set_play_rate(&mut self, rate: f32) {
        self.play_rate = rate.max(0.0);
    }

    pub fn play_rate(&self) -> f32 {
        self.play_rate
    }

    pub fn set_position(&mut self, position: f32) {
        self.position = position.clamp(0.0, self.length);
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn direction(&self) -> PlayDirection {
        self.direction
    }

    pub fn value(&self) -> f32 {
        self.curve.sample(self.position)
    }

    pub fn advance(&mut self, dt: f32) -> TimelineStep<E> {
        let mut events = Vec::new();
        let mut finished = false;
        let delta = dt * self.play_rate;
        if self.playing && delta > 0.0 {
            match self.direction {
                PlayDirection::Forward => {
                    finished = self.step_forward(delta, &mut events);
                }
                PlayDirection::Backward => {
                    finished = self.step_backward(delta, &mut events);
                }
            }
        }
        TimelineStep {
            value: self.value(),
            finished,
            events,
        }
    }

    fn step_forward(&mut self, delta: f32, events: &mut Vec<E>) -> bool {
        let mut from = self.position;
        let mut to = from + delta;
        let mut wraps = 0;
        while to >= self.length {
            self.collect(from, self.length, true, events);
            if !self.looping {
                self.position = self.length;
                self.playing = false;
                return true;
            }
            to -= self.length;
            from = 0.0;
            wraps += 1;
            if wraps >= MAX_WRAPS_PER_ADVANCE {
                to = to.rem_euclid(self.length);
                break;
            }
            // An event keyed at 0 fires on wrap.
            self.collect_exact(0.0, events);
        }
        self.collect(from, to, true, events);
        self.position = to;
        false
    }

    fn step_backward(&mut self, delta: f32, events: &mut Vec<E>) -> bool {
        let mut from = self.position;
        let mut to = from - delta;
        let mut wraps = 0;
        while to <= 0.0 {
            self.collect(to.max(0.0), from, false, events);
            if !self.looping {
                self.position = 0.0;
                self.playing = false;
                return true;
            }
            to += self.length;
            from = self.length;
            wraps += 1;
            if wraps >= MAX_WRAPS_PER_ADVANCE {
                to = to.rem_euclid(self.length);
                break;
            }
        }
        self.collect(to, from, false, events);
        self.position = to;
        false
    }

    /// Forward collects keys in `(lo, hi]`, backward in `[lo, hi)`.
    fn collect(&self, lo: f32, hi: f32, forward: bool, out: &mut Vec<E>) {
        let hits = self.events.iter().filter(|(t, _)| {
            if forward {
                *t > lo && *t <= hi
            } else {
                *t >= lo && *t < hi
            }
        });
        if forward {
            out.extend(hits.map(|(_, e)| *e));
        } else {
            let mut hits: Vec<&(f32, E)> = hits.collect();
            hits.sort_by(|a, b| b.0.total_cmp(&a.0));
            out.extend(hits.into_iter().map(|(_, e)| *e));
        }
    }

    fn collect_exact(&self, time: f32, out: &mut Vec<E>) {
        out.extend(
            self.events
                .iter()
                .filter(|(t, _)| *t == time)
                .map(|(_, e)| *e),
        );
    }
}

//! Cancellable one-shot and repeating timers.
//!
//! Timers carry a caller-chosen key instead of a callback. The owner advances the
//! clock once per tick and then drains due timers with [`TimerManager::next_due`],
//! one at a time, so a handler that cancels a sibling timer is seen before that
//! sibling would fire in the same tick.

const DUE_EPS: f64 = 1e-9;
const MIN_REPEAT_INTERVAL: f32 = 1e-4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    index: u32,
    generation: u32,
}

#[derive(Clone, Copy, Debug)]
struct Timer<K> {
    key: K,
    due: f64,
    interval: f32,
    repeat: bool,
    order: u64,
}

#[derive(Debug)]
struct Slot<K> {
    generation: u32,
    timer: Option<Timer<K>>,
}

#[derive(Debug)]
pub struct TimerManager<K> {
    now: f64,
    slots: Vec<Slot<K>>,
    free: Vec<u32>,
    next_order: u64,
}

impl<K: Copy> Default for TimerManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy> TimerManager<K> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            slots: Vec::new(),
            free: Vec::new(),
            next_order: 0,
        }
    }

    /// Seconds since the manager was created.
    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn schedule(&mut self, key: K, delay: f32, repeat: bool) -> TimerHandle {
        self.schedule_with_first_delay(key, delay, repeat, delay)
    }

    /// Schedules a timer whose first firing happens after `first_delay` and, when
    /// repeating, every `interval` after that.
    pub fn schedule_with_first_delay(
        &mut self,
        key: K,
        interval: f32,
        repeat: bool,
        first_delay: f32,
    ) -> TimerHandle {
        let repeat = repeat && interval >= MIN_REPEAT_INTERVAL;
        let order = self.next_order;
        self.next_order += 1;
        let timer = Timer {
            key,
            due: self.now + first_delay.max(0.0) as f64,
            interval,
            repeat,
            order,
        };

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.timer = Some(timer);
            TimerHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                timer: Some(timer),
            });
            TimerHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Returns true if the handle referred to a live timer.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        if !self.is_active(handle) {
            return false;
        }
        self.release(handle.index);
        true
    }

    /// Cancels the timer held in `handle` (if any) and empties the slot.
    pub fn clear(&mut self, handle: &mut Option<TimerHandle>) {
        if let Some(h) = handle.take() {
            self.cancel(h);
        }
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.generation == handle.generation && slot.timer.is_some())
    }

    /// Seconds until the timer next fires, 0 for dead handles.
    pub fn remaining(&self, handle: TimerHandle) -> f32 {
        self.timer(handle)
            .map(|t| (t.due - self.now).max(0.0) as f32)
            .unwrap_or(0.0)
    }

    pub fn remaining_opt(&self, handle: Option<TimerHandle>) -> f32 {
        handle.map_or(0.0, |h| self.remaining(h))
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.timer.is_some()).count()
    }

    pub fn advance(&mut self, dt: f32) {
        self.now += dt.max(0.0) as f64;
    }

    /// Pops the earliest due timer. Repeating timers are rescheduled one interval
    /// after their previous due time, so a long tick can yield the same timer more
    /// than once.
    pub fn next_due(&mut self) -> Option<(TimerHandle, K)> {
        let mut best: Option<(usize, f64, u64)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(timer) = slot.timer else {
                continue;
            };
            if timer.due > self.now + DUE_EPS {
                continue;
            }
            let earlier = match best {
                None => true,
                Some((_, due, order)) => {
                    timer.due < due || (timer.due == due && timer.order < order)
                }
            };
            if earlier {
                best = Some((index, timer.due, timer.order));
            }
        }

        let (index, _, _) = best?;
        let slot = &mut self.slots[index];
        let handle = TimerHandle {
            index: index as u32,
            generation: slot.generation,
        };
        let timer = slot.timer.as_mut()?;
        let key = timer.key;
        if timer.repeat {
            timer.due += timer.interval as f64;
        } else {
            self.release(index as u32);
        }
        Some((handle, key))
    }

    fn timer(&self, handle: TimerHandle) -> Option<&Timer<K>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.timer.as_ref())
    }

    fn release(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.timer = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }
}

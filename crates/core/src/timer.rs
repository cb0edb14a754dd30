//! One-shot timers driven by the host's frame clock.

use std::collections::BTreeMap;

use crate::value::WaitFor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Clone, Debug, PartialEq)]
struct Timer {
    remaining_ms: f64,
    paused: bool,
    payload: WaitFor,
}

/// Arena of outstanding timers keyed by handle.
///
/// A timer fires once when its remaining time reaches zero and is removed
/// from the arena at that point. Paused timers do not advance.
#[derive(Clone, Debug, Default)]
pub struct TimerArena {
    next_id: u64,
    timers: BTreeMap<TimerHandle, Timer>,
}

impl TimerArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, delay_ms: f64, payload: WaitFor) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.timers.insert(
            handle,
            Timer {
                remaining_ms: delay_ms.max(0.0),
                paused: false,
                payload,
            },
        );
        handle
    }

    pub fn remove(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    pub fn set_paused(&mut self, handle: TimerHandle, paused: bool) {
        if let Some(timer) = self.timers.get_mut(&handle) {
            timer.paused = paused;
        }
    }

    pub fn is_paused(&self, handle: TimerHandle) -> Option<bool> {
        self.timers.get(&handle).map(|timer| timer.paused)
    }

    pub fn remaining_ms(&self, handle: TimerHandle) -> Option<f64> {
        self.timers.get(&handle).map(|timer| timer.remaining_ms)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Advances every running timer and returns the ones that fired, in
    /// handle order. Overshoot is discarded.
    pub fn advance(&mut self, delta_ms: f64) -> Vec<(TimerHandle, WaitFor)> {
        let mut fired = Vec::new();
        for (handle, timer) in self.timers.iter_mut() {
            if timer.paused {
                continue;
            }
            timer.remaining_ms -= delta_ms;
            if timer.remaining_ms <= 0.0 {
                fired.push((*handle, timer.payload.clone()));
            }
        }
        for (handle, _) in &fired {
            self.timers.remove(handle);
        }
        fired
    }
}

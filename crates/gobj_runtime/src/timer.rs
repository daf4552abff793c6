//! Timer scheduler
//!
//! Timers are a source of dispatch, not an execution context: the host drives
//! the clock by calling `GRuntime::process_timers`, and every due timer fires
//! through `send_event` exactly as any other caller would. One-shot timers are
//! consumed on firing; interval timers re-arm. A cleared timer never fires.

use gobj_core::{GObjId, GValue};
use slotmap::{new_key_type, SlotMap};
use std::time::{Duration, Instant};

new_key_type! {
    /// Unique identifier for a pending timer
    pub struct TimerId;
}

struct Timer {
    target: GObjId,
    event: String,
    kw: GValue,
    deadline: Instant,
    period: Option<Duration>,
}

/// Pending timers, fired in deadline order
pub struct TimerScheduler {
    timers: SlotMap<TimerId, Timer>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
        }
    }

    /// Arm a one-shot timer
    pub fn set_timeout(
        &mut self,
        now: Instant,
        delay: Duration,
        target: GObjId,
        event: &str,
        kw: GValue,
    ) -> TimerId {
        self.timers.insert(Timer {
            target,
            event: event.to_string(),
            kw,
            deadline: now + delay,
            period: None,
        })
    }

    /// Arm a periodic timer; first fire after one full period
    pub fn set_interval(
        &mut self,
        now: Instant,
        period: Duration,
        target: GObjId,
        event: &str,
        kw: GValue,
    ) -> TimerId {
        self.timers.insert(Timer {
            target,
            event: event.to_string(),
            kw,
            deadline: now + period,
            period: Some(period),
        })
    }

    /// Cancel a pending timer; returns false when it already fired or
    /// was never armed
    pub fn clear(&mut self, id: TimerId) -> bool {
        self.timers.remove(id).is_some()
    }

    /// Drop every timer aimed at `target`
    pub fn drop_for_target(&mut self, target: GObjId) {
        self.timers.retain(|_, t| t.target != target);
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Due timers in deadline order.
    ///
    /// One-shots are removed; intervals re-arm by one period.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<(TimerId, GObjId, String, GValue)> {
        let mut due: Vec<TimerId> = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .map(|(id, _)| id)
            .collect();
        due.sort_by_key(|id| self.timers[*id].deadline);

        let mut fired = Vec::with_capacity(due.len());
        for id in due {
            let timer = &mut self.timers[id];
            let entry = (id, timer.target, timer.event.clone(), timer.kw.clone());
            match timer.period {
                Some(period) => timer.deadline += period,
                None => {
                    self.timers.remove(id);
                }
            }
            fired.push(entry);
        }
        fired
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some_id() -> GObjId {
        let mut arena: SlotMap<GObjId, ()> = SlotMap::with_key();
        arena.insert(())
    }

    fn two_ids() -> (GObjId, GObjId) {
        let mut arena: SlotMap<GObjId, ()> = SlotMap::with_key();
        (arena.insert(()), arena.insert(()))
    }

    #[test]
    fn test_timeout_fires_once_in_deadline_order() {
        let mut sched = TimerScheduler::new();
        let now = Instant::now();
        let target = some_id();

        sched.set_timeout(now, Duration::from_millis(20), target, "EV_LATER", GValue::Null);
        sched.set_timeout(now, Duration::from_millis(10), target, "EV_SOON", GValue::Null);

        let fired = sched.take_due(now + Duration::from_millis(30));
        let events: Vec<&str> = fired.iter().map(|(_, _, e, _)| e.as_str()).collect();
        assert_eq!(events, vec!["EV_SOON", "EV_LATER"]);
        assert!(sched.is_empty());

        // nothing left to fire
        assert!(sched.take_due(now + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_not_due_timers_stay_armed() {
        let mut sched = TimerScheduler::new();
        let now = Instant::now();
        sched.set_timeout(now, Duration::from_secs(5), some_id(), "EV_X", GValue::Null);
        assert!(sched.take_due(now + Duration::from_secs(1)).is_empty());
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn test_cleared_timer_never_fires() {
        let mut sched = TimerScheduler::new();
        let now = Instant::now();
        let id = sched.set_timeout(now, Duration::ZERO, some_id(), "EV_X", GValue::Null);
        assert!(sched.clear(id));
        assert!(!sched.clear(id));
        assert!(sched.take_due(now + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_interval_rearms() {
        let mut sched = TimerScheduler::new();
        let now = Instant::now();
        let target = some_id();
        sched.set_interval(now, Duration::from_millis(10), target, "EV_TICK", GValue::Null);

        let first = sched.take_due(now + Duration::from_millis(10));
        assert_eq!(first.len(), 1);
        assert_eq!(sched.len(), 1);

        let second = sched.take_due(now + Duration::from_millis(20));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_drop_for_target() {
        let mut sched = TimerScheduler::new();
        let now = Instant::now();
        let (a, b) = two_ids();
        sched.set_timeout(now, Duration::ZERO, a, "EV_X", GValue::Null);
        sched.set_timeout(now, Duration::ZERO, b, "EV_X", GValue::Null);
        sched.drop_for_target(a);
        let fired = sched.take_due(now + Duration::from_secs(1));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1, b);
    }
}

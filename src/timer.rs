use std::time::{Duration, Instant};

/// A single-shot scheduled task, polled by the host's event loop.
///
/// Scheduling always clears any pending deadline first, so a timer never fires twice
/// for one logical request.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleShotTimer {
    deadline: Option<Instant>,
}

impl SingleShotTimer {
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.cancel();
        self.deadline = Some(now + delay);
    }

    /// Schedule only if nothing is pending.
    pub fn schedule_if_idle(&mut self, now: Instant, delay: Duration) {
        if self.deadline.is_none() {
            self.deadline = Some(now + delay);
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once() {
        let t0 = Instant::now();
        let mut timer = SingleShotTimer::default();
        timer.schedule(t0, Duration::from_millis(10));
        assert!(!timer.poll(t0 + Duration::from_millis(5)));
        assert!(timer.poll(t0 + Duration::from_millis(10)));
        assert!(!timer.poll(t0 + Duration::from_millis(20)));
    }

    #[test]
    fn rescheduling_replaces_the_deadline() {
        let t0 = Instant::now();
        let mut timer = SingleShotTimer::default();
        timer.schedule(t0, Duration::from_millis(10));
        timer.schedule(t0 + Duration::from_millis(8), Duration::from_millis(10));
        assert!(!timer.poll(t0 + Duration::from_millis(12)));
        assert!(timer.poll(t0 + Duration::from_millis(18)));
    }

    #[test]
    fn schedule_if_idle_keeps_the_first_deadline() {
        let t0 = Instant::now();
        let mut timer = SingleShotTimer::default();
        timer.schedule_if_idle(t0, Duration::from_millis(10));
        timer.schedule_if_idle(t0 + Duration::from_millis(8), Duration::from_millis(10));
        assert!(timer.poll(t0 + Duration::from_millis(10)));
    }
}

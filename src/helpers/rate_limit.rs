use std::thread;
use std::time::{Duration, Instant};

/// Time source for the limiter, injectable so tests can run on a virtual
/// clock.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, dur: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, dur: Duration) {
        thread::sleep(dur);
    }
}

/// Fixed-window rate limiter. An acquisition beyond the per-window budget
/// blocks until the window resets; calls are never rejected.
pub struct RateLimiter<C: Clock = SystemClock> {
    max_calls: u32,
    period: Duration,
    window_start: Option<Instant>,
    calls: u32,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self::with_clock(max_calls, period, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(max_calls: u32, period: Duration, clock: C) -> Self {
        RateLimiter {
            max_calls,
            period,
            window_start: None,
            calls: 0,
            clock,
        }
    }

    /// Takes one slot from the current window, sleeping through the rest of
    /// the window first if the budget is already spent.
    pub fn acquire(&mut self) {
        let now = self.clock.now();
        match self.window_start {
            Some(start) if now.duration_since(start) < self.period => {
                if self.calls >= self.max_calls {
                    let wait = self.period - now.duration_since(start);
                    log::debug!("rate limit reached; sleeping {:.3}s", wait.as_secs_f32());
                    self.clock.sleep(wait);
                    self.window_start = Some(self.clock.now());
                    self.calls = 1;
                } else {
                    self.calls += 1;
                }
            }
            _ => {
                self.window_start = Some(now);
                self.calls = 1;
            }
        }
    }
}

//! "Next display frame" scheduling.

use std::time::{Duration, Instant};

use crate::foundation::clock::ManualClock;

/// Delivers frame callbacks at the display cadence.
pub trait FrameTicker {
    /// Wait for the next frame. `false` ends the loop.
    fn next_frame(&mut self) -> bool;
}

/// Real-time ticker sleeping to a fixed fps grid.
///
/// Late frames are not made up; the grid restarts from the late frame.
#[derive(Debug)]
pub struct IntervalTicker {
    period: Duration,
    next: Option<Instant>,
    remaining: Option<u64>,
}

impl IntervalTicker {
    /// Endless ticker at `fps` (clamped to at least 1).
    pub fn new(fps: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            next: None,
            remaining: None,
        }
    }

    /// Stop after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl FrameTicker for IntervalTicker {
    fn next_frame(&mut self) -> bool {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return false;
            }
            *remaining -= 1;
        }
        let now = Instant::now();
        match self.next {
            Some(deadline) if deadline > now => {
                std::thread::sleep(deadline - now);
                self.next = Some(deadline + self.period);
            }
            _ => self.next = Some(now + self.period),
        }
        true
    }
}

/// Offline ticker that moves a [`ManualClock`] onto each frame's timestamp.
///
/// Frame `n` happens at `start + n * 1000 / fps` milliseconds; the first frame is at `start`.
#[derive(Debug)]
pub struct ClockTicker {
    clock: ManualClock,
    start_ms: u64,
    fps: u32,
    frame: u64,
    frames: u64,
}

impl ClockTicker {
    /// Deliver `frames` frames at `fps` starting at the clock's current time.
    pub fn new(clock: ManualClock, fps: u32, frames: u64) -> Self {
        use crate::foundation::clock::Clock as _;
        Self {
            start_ms: clock.now_ms(),
            clock,
            fps: fps.max(1),
            frame: 0,
            frames,
        }
    }

    /// Frames delivered so far.
    pub fn frames_delivered(&self) -> u64 {
        self.frame
    }
}

impl FrameTicker for ClockTicker {
    fn next_frame(&mut self) -> bool {
        if self.frame >= self.frames {
            return false;
        }
        self.clock
            .set_ms(self.start_ms + self.frame * 1000 / u64::from(self.fps));
        self.frame += 1;
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/ticker.rs"]
mod tests;

//! Frame clock with priority-ordered listeners.
//!
//! The embedding event loop owns the actual frame scheduling: it asks
//! [`Ticker::needs_frame`] whether another frame is wanted and feeds
//! timestamps to [`Ticker::update`] (or lets [`Ticker::tick`] read a monotonic
//! clock).

use std::time::Instant;

/// Frames per millisecond at the reference frame rate of 60 fps.
pub const TARGET_FPMS: f64 = 0.06;

/// Order in which listeners run within one update; higher runs first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdatePriority(pub i32);

impl UpdatePriority {
    pub const INTERACTION: Self = Self(50);
    pub const HIGH: Self = Self(25);
    pub const NORMAL: Self = Self(0);
    pub const LOW: Self = Self(-25);
    pub const UTILITY: Self = Self(-50);
}

impl Default for UpdatePriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

pub type TickerId = u64;

struct TickerListener {
    id: TickerId,
    priority: UpdatePriority,
    once: bool,
    callback: Box<dyn FnMut(f64)>,
}

pub struct Ticker {
    listeners: Vec<TickerListener>,
    next_id: TickerId,
    started: bool,
    /// Start automatically when a listener is added.
    pub auto_start: bool,
    /// Multiplier applied to `delta_time`.
    pub speed: f64,
    delta_time: f64,
    elapsed_ms: f64,
    max_elapsed_ms: f64,
    last_time: Option<f64>,
    clock: Instant,
}

impl Ticker {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
            started: false,
            auto_start: false,
            speed: 1.0,
            delta_time: 1.0,
            elapsed_ms: 1.0 / TARGET_FPMS,
            max_elapsed_ms: 100.0,
            last_time: None,
            clock: Instant::now(),
        }
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    fn insert(
        &mut self,
        priority: UpdatePriority,
        once: bool,
        callback: Box<dyn FnMut(f64)>,
    ) -> TickerId {
        self.next_id += 1;
        let id = self.next_id;
        // before the first listener with a lower priority, so equals stay FIFO
        let index = self
            .listeners
            .iter()
            .position(|l| l.priority < priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(
            index,
            TickerListener {
                id,
                priority,
                once,
                callback,
            },
        );
        if self.auto_start && !self.started {
            self.start();
        }
        id
    }

    /// Register `f`, called with the scaled frame delta on every update.
    pub fn add<F>(&mut self, f: F, priority: UpdatePriority) -> TickerId
    where
        F: FnMut(f64) + 'static,
    {
        self.insert(priority, false, Box::new(f))
    }

    /// Like [`Ticker::add`], but the listener is removed after it runs once.
    pub fn add_once<F>(&mut self, f: F, priority: UpdatePriority) -> TickerId
    where
        F: FnMut(f64) + 'static,
    {
        self.insert(priority, true, Box::new(f))
    }

    /// Returns whether a listener was removed.
    pub fn remove(&mut self, id: TickerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn start(&mut self) {
        if !self.started {
            log::debug!("Ticker started");
            self.started = true;
            self.last_time = None;
        }
    }

    pub fn stop(&mut self) {
        if self.started {
            log::debug!("Ticker stopped");
            self.started = false;
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// Whether the event loop should schedule another frame.
    pub fn needs_frame(&self) -> bool {
        self.started && !self.listeners.is_empty()
    }

    /// Advance to `now_ms` and run every listener.
    ///
    /// The first update after construction or [`Ticker::start`] only records
    /// the timestamp. A timestamp that does not move forward zeroes the
    /// deltas and runs nothing.
    pub fn update(&mut self, now_ms: f64) {
        let last = self.last_time.replace(now_ms);
        let elapsed = match last {
            Some(last) if now_ms > last => (now_ms - last).min(self.max_elapsed_ms),
            _ => {
                self.elapsed_ms = 0.0;
                self.delta_time = 0.0;
                return;
            }
        };

        self.elapsed_ms = elapsed;
        self.delta_time = elapsed * TARGET_FPMS * self.speed;

        let delta = self.delta_time;
        for listener in &mut self.listeners {
            (listener.callback)(delta);
        }
        self.listeners.retain(|l| !l.once);
    }

    /// [`Ticker::update`] with the time since this ticker was created.
    pub fn tick(&mut self) {
        let now = self.clock.elapsed().as_secs_f64() * 1000.0;
        self.update(now);
    }

    /// Scaled frame delta, 1.0 at 60 fps.
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Milliseconds between the last two updates, after clamping.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn fps(&self) -> f64 {
        if self.elapsed_ms > 0.0 {
            1000.0 / self.elapsed_ms
        } else {
            0.0
        }
    }

    /// Lowest frame rate whose elapsed time is passed through unclamped.
    pub fn min_fps(&self) -> f64 {
        1000.0 / self.max_elapsed_ms
    }

    /// Values above 60 are treated as 60; zero or less disables clamping.
    pub fn set_min_fps(&mut self, fps: f64) {
        self.max_elapsed_ms = if fps > 0.0 {
            1000.0 / fps.min(TARGET_FPMS * 1000.0)
        } else {
            f64::INFINITY
        };
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("listeners", &self.listeners.len())
            .field("started", &self.started)
            .field("delta_time", &self.delta_time)
            .finish()
    }
}

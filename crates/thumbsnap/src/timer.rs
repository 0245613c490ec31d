//! Frame loop profiling.

use std::{
    cell::Cell,
    fmt,
    time::{Duration, Instant},
};

const EMA_ALPHA: f32 = 0.3;

/// Measures how long a pipeline stage takes, smoothed with an exponential moving average.
///
/// Collected timings are reset whenever the timer is displayed using `{}`
/// ([`std::fmt::Display`]), so printing it once per second shows that second's average.
pub struct Timer {
    name: &'static str,
    state: Cell<State>,
}

#[derive(Clone, Copy, Default)]
struct State {
    /// Smoothed duration in seconds, `None` until the first measurement.
    avg: Option<f32>,
    /// The number of measurements that contributed to `avg`.
    count: usize,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Cell::new(State::default()),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// The time between the call to `start` and the drop of the returned [`TimerGuard`] is
    /// recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn record(&self, duration: Duration) {
        let mut state = self.state.get();
        let secs = duration.as_secs_f32();
        state.avg = Some(match state.avg {
            Some(avg) => avg + EMA_ALPHA * (secs - avg),
            None => secs,
        });
        state.count += 1;
        self.state.set(state);
    }

    /// Returns the number of measurements recorded since the timer was last displayed.
    pub fn count(&self) -> usize {
        self.state.get().count
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let State { avg, count } = self.state.take();
        let avg_ms = avg.unwrap_or(0.0) * 1000.0;
        write!(f, "{}: {count}x{avg_ms:.01}ms", self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Logs frames per second, together with a set of [`Timer`]s, once per second.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Advances the frame counter by 1 and logs FPS and `timers` if one second has passed.
    pub fn tick_with<'a>(&mut self, timers: impl IntoIterator<Item = &'a Timer>) {
        self.frames += 1;
        if self.start.elapsed() > Duration::from_secs(1) {
            let timers = timers
                .into_iter()
                .map(|timer| timer.to_string())
                .collect::<Vec<_>>();
            if timers.is_empty() {
                log::debug!("{}: {} FPS", self.name, self.frames);
            } else {
                log::debug!(
                    "{}: {} FPS ({})",
                    self.name,
                    self.frames,
                    timers.join(", ")
                );
            }

            self.frames = 0;
            self.start = Instant::now();
        }
    }
}

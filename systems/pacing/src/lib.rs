#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-timestep pacing for hosts that render frames in real time.
//!
//! The simulation only ever advances in whole steps of [`TICK_DURATION`].
//! A host feeds the pacer the wall-clock length of every frame; the pacer
//! scales it by the game speed, carries the unconsumed remainder to the next
//! frame and reports how many steps are due. A per-frame cap bounds catch-up
//! work, and the carried remainder is clamped so a stall never snowballs.

use std::time::Duration;

use bulwark_core::TICK_DURATION;

/// Game speeds a player can cycle through, slowest first.
pub const SPEEDS: [f64; 7] = [0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0];

/// Frames per fixed step a host is assumed to render at normal speed.
const FRAMES_PER_STEP: f64 = 3.0;

/// Timing parameters of a [`FramePacer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacerConfig {
    /// Simulated time covered by a single step.
    pub step: Duration,
    /// Largest remainder carried into the next frame.
    pub max_carry: Duration,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            step: TICK_DURATION,
            max_carry: Duration::from_millis(75),
        }
    }
}

/// Converts real frame time into a number of due simulation steps.
#[derive(Clone, Debug)]
pub struct FramePacer {
    config: PacerConfig,
    speed: f64,
    carry: Duration,
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new(PacerConfig::default())
    }
}

impl FramePacer {
    /// Creates a pacer running at normal speed.
    #[must_use]
    pub const fn new(config: PacerConfig) -> Self {
        Self {
            config,
            speed: 1.0,
            carry: Duration::ZERO,
        }
    }

    /// Current game-speed multiplier.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Sets the game-speed multiplier; zero or less pauses the game.
    ///
    /// Positive speeds are clamped to the range spanned by [`SPEEDS`].
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if !speed.is_finite() || speed <= 0.0 {
            0.0
        } else {
            speed.clamp(SPEEDS[0], SPEEDS[SPEEDS.len() - 1])
        };
    }

    /// Reports whether frames currently advance no simulated time.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.speed <= 0.0
    }

    /// Doubles the speed, wrapping from the fastest back to the slowest.
    pub fn faster(&mut self) {
        let doubled = self.speed * 2.0;
        self.speed = if doubled > SPEEDS[SPEEDS.len() - 1] {
            SPEEDS[0]
        } else {
            doubled
        };
    }

    /// Halves the speed, wrapping from the slowest back to the fastest.
    pub fn slower(&mut self) {
        let halved = self.speed / 2.0;
        self.speed = if halved < SPEEDS[0] {
            SPEEDS[SPEEDS.len() - 1]
        } else {
            halved
        };
    }

    /// Most steps a single frame may run at the current speed.
    ///
    /// A host rendering at three frames per step only needs one step per
    /// frame at normal speed; faster speeds raise the cap proportionally.
    #[must_use]
    pub fn max_steps_per_frame(&self) -> u32 {
        let cap = (self.speed / FRAMES_PER_STEP).ceil();
        if cap >= f64::from(u32::MAX) {
            u32::MAX
        } else if cap >= 1.0 {
            cap as u32
        } else {
            1
        }
    }

    /// Accounts for one rendered frame and returns the number of steps due.
    pub fn advance(&mut self, frame: Duration) -> u32 {
        if self.is_paused() {
            self.carry = Duration::ZERO;
            return 0;
        }
        let scaled = Duration::try_from_secs_f64(frame.as_secs_f64() * self.speed).unwrap_or(Duration::MAX);
        self.carry = self.carry.saturating_add(scaled);

        let mut due = 0;
        let cap = self.max_steps_per_frame();
        while self.carry > self.config.step && due < cap {
            self.carry -= self.config.step;
            due += 1;
        }
        self.carry = self.carry.min(self.config.max_carry);
        due
    }

    /// Runs the due steps of one frame, stopping at the first failure.
    ///
    /// Returns the number of steps that completed.
    pub fn run<E, F>(&mut self, frame: Duration, mut step: F) -> Result<u32, E>
    where
        F: FnMut() -> Result<(), E>,
    {
        let due = self.advance(frame);
        for _ in 0..due {
            step()?;
        }
        Ok(due)
    }

    /// Fraction of the next step already elapsed, for visual interpolation.
    #[must_use]
    pub fn interpolation(&self) -> f64 {
        if self.config.step.is_zero() {
            return 0.0;
        }
        (self.carry.as_secs_f64() / self.config.step.as_secs_f64()).min(1.0)
    }

    /// Time carried over to the next frame.
    #[must_use]
    pub const fn carry(&self) -> Duration {
        self.carry
    }
}

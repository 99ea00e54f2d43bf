//! Countdown-gated capture state machine.
//!
//! The session never sleeps by itself. It exposes the instant of its next
//! timer (`deadline`) and the owner calls [`CaptureSession::on_deadline`]
//! when that instant passes. Cancelling clears the deadline, so a stopped
//! sequence has nothing left to fire.

use tokio::time::{Duration, Instant};

use crate::config::{CaptureConfig, ALLOWED_COUNTDOWN_SECONDS};
use crate::error::CaptureRejected;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Idle,
    CountingDown,
    PausedBetweenShots,
}

/// What happened when a deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// One second elapsed; the countdown continues.
    Tick { remaining: u32 },
    /// The countdown reached zero: grab a frame now.
    Grab,
    /// The inter-shot pause ended and the next countdown began.
    CountdownStarted { remaining: u32 },
    /// Auto-capture ended because the collection is full or it was stopped.
    AutoFinished,
    /// Nothing was scheduled.
    Idle,
}

/// Follow-up after a grab has been attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterGrab {
    /// Manual capture: back to idle.
    Done,
    /// Auto-capture: waiting before the next countdown.
    Paused,
    /// Auto-capture reached the photo limit.
    AutoFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub mode: CaptureMode,
    pub remaining_seconds: Option<u32>,
    pub auto_mode_active: bool,
}

#[derive(Debug, Clone)]
pub struct CaptureSession {
    mode: CaptureMode,
    remaining_seconds: Option<u32>,
    auto_mode_active: bool,
    delay_seconds: u32,
    inter_shot_pause: Duration,
    deadline: Option<Instant>,
}

impl CaptureSession {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            mode: CaptureMode::Idle,
            remaining_seconds: None,
            auto_mode_active: false,
            delay_seconds: config.countdown_seconds,
            inter_shot_pause: Duration::from_millis(config.inter_shot_pause_ms),
            deadline: None,
        }
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            mode: self.mode,
            remaining_seconds: self.remaining_seconds,
            auto_mode_active: self.auto_mode_active,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining_seconds
    }

    pub fn is_auto_active(&self) -> bool {
        self.auto_mode_active
    }

    pub fn delay_seconds(&self) -> u32 {
        self.delay_seconds
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Takes effect from the next countdown.
    pub fn set_delay(&mut self, seconds: u32) -> Result<(), CaptureRejected> {
        if !ALLOWED_COUNTDOWN_SECONDS.contains(&seconds) {
            return Err(CaptureRejected::UnsupportedDelay(seconds));
        }
        self.delay_seconds = seconds;
        Ok(())
    }

    pub fn start_manual(&mut self, now: Instant, photo_count: usize, max_photos: usize) -> Result<(), CaptureRejected> {
        if self.auto_mode_active {
            return Err(CaptureRejected::AutoModeActive);
        }
        self.check_can_start(photo_count, max_photos)?;
        self.begin_countdown(now);
        log::info!("Manual capture: {}s countdown", self.delay_seconds);
        Ok(())
    }

    pub fn start_auto(&mut self, now: Instant, photo_count: usize, max_photos: usize) -> Result<(), CaptureRejected> {
        if self.auto_mode_active {
            return Err(CaptureRejected::AutoModeActive);
        }
        self.check_can_start(photo_count, max_photos)?;
        self.auto_mode_active = true;
        self.begin_countdown(now);
        log::info!(
            "Auto-capture started: {} shots left, {}s countdown each",
            max_photos - photo_count,
            self.delay_seconds
        );
        Ok(())
    }

    fn check_can_start(&self, photo_count: usize, max_photos: usize) -> Result<(), CaptureRejected> {
        if self.mode != CaptureMode::Idle {
            return Err(CaptureRejected::Busy);
        }
        if photo_count >= max_photos {
            return Err(CaptureRejected::PhotoCapReached);
        }
        Ok(())
    }

    fn begin_countdown(&mut self, now: Instant) {
        self.mode = CaptureMode::CountingDown;
        self.remaining_seconds = Some(self.delay_seconds);
        self.deadline = Some(now + TICK);
    }

    /// Clear any pending timer and return to idle.
    pub fn stop(&mut self) {
        if self.mode != CaptureMode::Idle || self.auto_mode_active {
            log::info!("Capture cancelled");
        }
        self.mode = CaptureMode::Idle;
        self.remaining_seconds = None;
        self.auto_mode_active = false;
        self.deadline = None;
    }

    /// Advance the machine once its deadline has passed.
    ///
    /// `now` is when the owner got around to handling the deadline. A late
    /// handler re-anchors the next timer on `now`, so overdue ticks are never
    /// replayed back to back.
    ///
    /// `photo_count` is the collection length right now; auto-capture reads
    /// it at every pause boundary instead of keeping its own counter.
    pub fn on_deadline(&mut self, now: Instant, photo_count: usize, max_photos: usize) -> TimerOutcome {
        let Some(deadline) = self.deadline else {
            return TimerOutcome::Idle;
        };

        match self.mode {
            CaptureMode::Idle => {
                self.deadline = None;
                TimerOutcome::Idle
            }
            CaptureMode::CountingDown => {
                let remaining = self.remaining_seconds.unwrap_or(1).saturating_sub(1);
                if remaining == 0 {
                    self.mode = CaptureMode::Idle;
                    self.remaining_seconds = None;
                    self.deadline = None;
                    TimerOutcome::Grab
                } else {
                    self.remaining_seconds = Some(remaining);
                    self.deadline = Some(deadline.max(now) + TICK);
                    log::debug!("Countdown: {}", remaining);
                    TimerOutcome::Tick { remaining }
                }
            }
            CaptureMode::PausedBetweenShots => {
                if !self.auto_mode_active || photo_count >= max_photos {
                    self.finish_auto();
                    return TimerOutcome::AutoFinished;
                }
                self.begin_countdown(deadline.max(now));
                TimerOutcome::CountdownStarted { remaining: self.delay_seconds }
            }
        }
    }

    /// Call after every `Grab`, whether or not a photo was appended.
    pub fn after_grab(&mut self, now: Instant, photo_count: usize, max_photos: usize) -> AfterGrab {
        if !self.auto_mode_active {
            return AfterGrab::Done;
        }
        if photo_count >= max_photos {
            self.finish_auto();
            return AfterGrab::AutoFinished;
        }
        self.mode = CaptureMode::PausedBetweenShots;
        self.remaining_seconds = None;
        self.deadline = Some(now + self.inter_shot_pause);
        AfterGrab::Paused
    }

    fn finish_auto(&mut self) {
        self.stop();
        log::info!("Auto-capture finished");
    }
}

use std::fmt;
use std::time::Duration;

use rand::distributions::{Distribution, Standard, Uniform};
use rand::Rng;

/// Steps of the menu-driven destructive action on one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStep {
    /// Close stray overlays and nudge the viewport.
    Stabilize,
    /// Click the record's menu trigger.
    OpenMenu,
    /// Find the one popup container that is visible.
    SelectMenu,
    /// Find the entry carrying the action label.
    ReadMenuItems,
    /// Click the entry.
    ClickItem,
    Done,
    Failed,
}

impl fmt::Display for ActionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionStep::Stabilize => "stabilize",
            ActionStep::OpenMenu => "open-menu",
            ActionStep::SelectMenu => "select-menu",
            ActionStep::ReadMenuItems => "read-menu-items",
            ActionStep::ClickItem => "click-item",
            ActionStep::Done => "done",
            ActionStep::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Bookkeeping for one invocation of the action. Any failure restarts the
/// sequence from [`ActionStep::Stabilize`]; captured handles are never reused
/// after a failure because the menu or scroll position may have moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionAttempt {
    step: ActionStep,
    restarts: u32,
    max_restarts: u32,
    last_error: Option<String>,
    last_failed_step: Option<ActionStep>,
    acted: bool,
}

impl ActionAttempt {
    pub fn new(max_restarts: u32) -> Self {
        Self {
            step: ActionStep::Stabilize,
            restarts: 0,
            max_restarts,
            last_error: None,
            last_failed_step: None,
            acted: false,
        }
    }

    pub fn step(&self) -> ActionStep {
        self.step
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_failed_step(&self) -> Option<ActionStep> {
        self.last_failed_step
    }

    /// True once the click on the menu entry went through.
    pub fn acted(&self) -> bool {
        self.acted
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.step, ActionStep::Done | ActionStep::Failed)
    }

    /// Moves to the next step after the current one succeeded.
    pub fn advance(&mut self) -> ActionStep {
        self.step = match self.step {
            ActionStep::Stabilize => ActionStep::OpenMenu,
            ActionStep::OpenMenu => ActionStep::SelectMenu,
            ActionStep::SelectMenu => ActionStep::ReadMenuItems,
            ActionStep::ReadMenuItems => ActionStep::ClickItem,
            ActionStep::ClickItem => {
                self.acted = true;
                ActionStep::Done
            }
            finished => finished,
        };
        self.step
    }

    /// Records a failure of the current step and restarts from
    /// `Stabilize`, or gives up once the restart ceiling is exceeded.
    pub fn fail(&mut self, error: impl Into<String>) -> ActionStep {
        if self.is_finished() {
            return self.step;
        }
        self.last_error = Some(error.into());
        self.last_failed_step = Some(self.step);
        self.restarts += 1;
        self.step = if self.restarts > self.max_restarts {
            ActionStep::Failed
        } else {
            ActionStep::Stabilize
        };
        self.step
    }
}

/// Uniform random pause taken before every action step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_ms: 100,
            max_ms: 300,
        }
    }
}

impl Pacing {
    /// No pause at all.
    pub const NONE: Pacing = Pacing {
        min_ms: 0,
        max_ms: 0,
    };

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(Uniform::new_inclusive(self.min_ms, self.max_ms).sample(rng))
    }
}

/// Element rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Random point strictly inside the box, 1px away from every edge.
    /// `None` when the box has no such interior.
    pub fn click_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(f64, f64)> {
        if !self.is_clickable() {
            return None;
        }
        let ux: f64 = Standard.sample(rng);
        let uy: f64 = Standard.sample(rng);
        Some((
            self.x + 1.0 + ux * (self.width - 2.0),
            self.y + 1.0 + uy * (self.height - 2.0),
        ))
    }

    /// More than 2px in both directions.
    pub fn is_clickable(&self) -> bool {
        self.width > 2.0 && self.height > 2.0
    }
}

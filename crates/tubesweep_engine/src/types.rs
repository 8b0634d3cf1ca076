use std::fmt;
use std::time::Duration;

use tubesweep_core::{ActionStep, FilterSet, Layout, Record, ScrollBudget, Termination};

use crate::action::ActionSettings;
use crate::dom::DomError;

/// What the walker reports, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// A history section header; its entries follow.
    Section { index: usize, titles: Vec<String> },
    /// A read record, after filtering and any post-match action.
    Record { record: Record, acted: bool },
}

pub trait WalkSink: Send + Sync {
    fn emit(&self, event: WalkEvent);
}

/// A destructive action that gave up after its restart ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub title: String,
    pub url: String,
    pub step: ActionStep,
    pub restarts: u32,
    pub message: String,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]({}): failed at {} after {} restarts: {}",
            self.title, self.url, self.step, self.restarts, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkReport {
    pub layout: Layout,
    pub termination: Termination,
    pub passes: u64,
    pub scrolls: u32,
    /// Non-placeholder records read.
    pub seen: usize,
    pub matched: usize,
    pub acted: usize,
    /// Placeholder and unrecognised containers.
    pub skipped: usize,
    pub failures: Vec<ActionFailure>,
}

impl WalkReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: DomError,
    },
    #[error(transparent)]
    Dom(#[from] DomError),
}

#[derive(Debug, Clone)]
pub struct WalkSettings {
    pub budget: ScrollBudget,
    /// Stop once a record is older than this many days (recency layouts).
    pub horizon_days: Option<u64>,
    pub filters: FilterSet,
    /// Run the destructive menu action on matched records.
    pub destructive: bool,
    /// Remove processed elements at the end of every pass.
    pub remove_processed: bool,
    pub stall_limit: u32,
    /// Wheel scroll issued between passes: (dy per step, steps).
    pub scroll: (f64, u32),
    pub visible_timeout: Duration,
    pub action: ActionSettings,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            budget: ScrollBudget::None,
            horizon_days: None,
            filters: FilterSet::default(),
            destructive: false,
            remove_processed: false,
            stall_limit: 3,
            scroll: (800.0, 5),
            visible_timeout: Duration::from_secs(10),
            action: ActionSettings::default(),
        }
    }
}

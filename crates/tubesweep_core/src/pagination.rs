use crate::layout::ScrollRule;

/// How many scrolls a walk may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBudget {
    /// One pass over what is already rendered.
    #[default]
    None,
    Max(u32),
    Unlimited,
}

impl ScrollBudget {
    /// Maps the command-line convention: 0 = none, negative = unlimited.
    pub fn from_flag(value: i64) -> Self {
        match value {
            0 => ScrollBudget::None,
            v if v < 0 => ScrollBudget::Unlimited,
            v => ScrollBudget::Max(u32::try_from(v).unwrap_or(u32::MAX)),
        }
    }

    pub fn allows(self, scrolls_done: u32) -> bool {
        match self {
            ScrollBudget::None => false,
            ScrollBudget::Max(max) => scrolls_done < max,
            ScrollBudget::Unlimited => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    pub budget: ScrollBudget,
    /// Records older than this many days stop the walk (recency layouts only).
    pub horizon_days: Option<u64>,
    pub rule: ScrollRule,
    /// Consecutive settles without a new trailing element before giving up.
    pub stall_limit: u32,
    pub load_page: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            budget: ScrollBudget::None,
            horizon_days: None,
            rule: ScrollRule::Budget,
            stall_limit: 3,
            load_page: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Init,
    Collect,
    Extract,
    Filter,
    Process,
    DecideScroll,
    ScrollWait,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    SinglePass,
    BudgetExhausted,
    HorizonReached,
    FeedExhausted,
    NoGrowth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Start,
    /// Items enumerated for this pass.
    Collected {
        items: usize,
        still_loading: bool,
        trailing: Option<String>,
    },
    /// Current item was read; recency is known for recency layouts.
    Extracted { recency_days: Option<u64> },
    /// Current item was filtered; `act` asks for its post-match processing.
    Filtered { matched: bool, act: bool },
    /// Post-match processing of the current item finished.
    Processed,
    /// Scroll issued and the page went quiet again.
    Settled { trailing: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadPage,
    Collect,
    Extract { index: usize },
    Filter { index: usize },
    Process { index: usize },
    /// Remove this pass's processed elements before scrolling.
    PrunePass,
    Scroll,
    Finish(Termination),
}

/// Scroll bookkeeping for one walk. Reset by [`Msg::Start`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaginationState {
    config: PaginationConfig,
    phase: Phase,
    pass: u64,
    scrolls: u32,
    horizon_reached: bool,
    trailing: Option<String>,
    stalls: u32,
    items: usize,
    cursor: usize,
    still_loading: bool,
    termination: Option<Termination>,
}

impl PaginationState {
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// 1-based pass number; 0 before the walk started.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn scrolls(&self) -> u32 {
        self.scrolls
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Sticky: once set it stays set until the next [`Msg::Start`].
    pub fn horizon_reached(&self) -> bool {
        self.horizon_reached
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    fn effective_budget(&self) -> ScrollBudget {
        match (self.config.rule, self.config.horizon_days) {
            (ScrollRule::RecencyHorizon, Some(days)) if days > 0 => ScrollBudget::Unlimited,
            _ => self.config.budget,
        }
    }

    fn terminate(&mut self, reason: Termination) -> Vec<Effect> {
        self.phase = Phase::Terminated;
        self.termination = Some(reason);
        vec![Effect::Finish(reason)]
    }

    fn next_item(&mut self) -> Vec<Effect> {
        self.cursor += 1;
        if self.cursor < self.items {
            self.phase = Phase::Extract;
            vec![Effect::Extract { index: self.cursor }]
        } else {
            self.decide_scroll()
        }
    }

    fn decide_scroll(&mut self) -> Vec<Effect> {
        self.phase = Phase::DecideScroll;
        if self.config.rule == ScrollRule::SinglePass {
            return self.terminate(Termination::SinglePass);
        }
        if self.horizon_reached {
            return self.terminate(Termination::HorizonReached);
        }
        if !self.effective_budget().allows(self.scrolls) {
            return self.terminate(Termination::BudgetExhausted);
        }
        if !self.still_loading {
            return self.terminate(Termination::FeedExhausted);
        }
        self.phase = Phase::ScrollWait;
        self.scrolls += 1;
        vec![Effect::PrunePass, Effect::Scroll]
    }
}

/// Pure update function: applies a message to the pagination state and
/// returns the effects the walker has to perform, in order.
pub fn update(mut state: PaginationState, msg: Msg) -> (PaginationState, Vec<Effect>) {
    let effects = match (state.phase, msg) {
        (Phase::Terminated, _) => Vec::new(),
        (_, Msg::Start) => {
            state.reset();
            state.phase = Phase::Collect;
            state.pass = 1;
            let mut effects = Vec::with_capacity(2);
            if state.config.load_page {
                effects.push(Effect::LoadPage);
            }
            effects.push(Effect::Collect);
            effects
        }
        (
            Phase::Collect,
            Msg::Collected {
                items,
                still_loading,
                trailing,
            },
        ) => {
            state.items = items;
            state.cursor = 0;
            state.still_loading = still_loading;
            state.trailing = trailing;
            if items == 0 {
                state.decide_scroll()
            } else {
                state.phase = Phase::Extract;
                vec![Effect::Extract { index: 0 }]
            }
        }
        (Phase::Extract, Msg::Extracted { recency_days }) => {
            if let (ScrollRule::RecencyHorizon, Some(horizon), Some(days)) =
                (state.config.rule, state.config.horizon_days, recency_days)
            {
                if horizon > 0 && days > horizon {
                    state.horizon_reached = true;
                }
            }
            state.phase = Phase::Filter;
            vec![Effect::Filter {
                index: state.cursor,
            }]
        }
        (Phase::Filter, Msg::Filtered { matched, act }) => {
            if matched && act {
                state.phase = Phase::Process;
                vec![Effect::Process {
                    index: state.cursor,
                }]
            } else {
                state.next_item()
            }
        }
        (Phase::Process, Msg::Processed) => state.next_item(),
        (Phase::ScrollWait, Msg::Settled { trailing }) => {
            if trailing == state.trailing {
                state.stalls += 1;
            } else {
                state.stalls = 0;
                state.trailing = trailing;
            }
            if state.stalls >= state.config.stall_limit {
                state.terminate(Termination::NoGrowth)
            } else {
                state.pass += 1;
                state.phase = Phase::Collect;
                vec![Effect::Collect]
            }
        }
        // Messages that do not belong to the current phase are ignored.
        _ => Vec::new(),
    };

    (state, effects)
}

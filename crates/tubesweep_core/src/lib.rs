//! Tubesweep core: records, filters, recency parsing and the pure state
//! machines behind pagination and the destructive menu action.
mod action;
mod filter;
mod layout;
mod pagination;
mod recency;
mod record;

pub use action::{ActionAttempt, ActionStep, BoundingBox, Pacing};
pub use filter::{FilterSet, MatchOutcome};
pub use layout::{
    Container, Layout, PostMatch, ScrollRule, CONTINUATION_SELECTOR, MENU_REMOVE_FROM_HISTORY,
};
pub use pagination::{
    update, Effect, Msg, PaginationConfig, PaginationState, Phase, ScrollBudget, Termination,
};
pub use recency::recency_days;
pub use record::{full_url, url_decode, Record, SITE_BASE};

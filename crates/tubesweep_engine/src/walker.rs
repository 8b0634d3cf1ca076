//! Drives the pure pagination machine against a live page.

use std::collections::{HashSet, VecDeque};

use engine_logging::{engine_debug, engine_info, engine_warn, set_scroll_pass};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tubesweep_core::{
    recency_days, update, Container, Effect, Layout, Msg, PaginationConfig, PaginationState,
    PostMatch, Record, ScrollRule, Termination, CONTINUATION_SELECTOR,
};

use crate::action::MenuAction;
use crate::dom::{DomElement, DomError, DomPage, ElementHandle, Scope};
use crate::resolve::resolve;
use crate::types::{ActionFailure, WalkError, WalkEvent, WalkReport, WalkSettings, WalkSink};

/// A record travelling through one Extract → Filter → Process cycle.
struct RecordContext {
    record: Record,
    acted: bool,
}

#[derive(Debug, Default)]
struct Tally {
    seen: usize,
    matched: usize,
    acted: usize,
    skipped: usize,
}

pub struct Walker<'a> {
    page: &'a dyn DomPage,
    settings: &'a WalkSettings,
    sink: &'a dyn WalkSink,
    rng: Box<dyn RngCore + Send>,
    failures: Vec<ActionFailure>,
    tally: Tally,
    sections: usize,
}

impl<'a> Walker<'a> {
    pub fn new(page: &'a dyn DomPage, settings: &'a WalkSettings, sink: &'a dyn WalkSink) -> Self {
        Self {
            page,
            settings,
            sink,
            rng: Box::new(StdRng::from_entropy()),
            failures: Vec::new(),
            tally: Tally::default(),
            sections: 0,
        }
    }

    /// Replaces the randomness behind pauses and click points.
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    /// Walks `layout` on `url`, or on the layout's own page when `url` is
    /// `None`. Action failures are collected in the report; only a lost
    /// session or a failed navigation ends the walk with an error.
    pub async fn walk(mut self, layout: Layout, url: Option<&str>) -> Result<WalkReport, WalkError> {
        let target = url.map(str::to_string).or_else(|| layout.page_url());
        engine_info!(
            "Walking {} on {}",
            layout.name(),
            target.as_deref().unwrap_or("the current page")
        );
        let state = self.drive(layout, None, target).await?;
        let termination = state.termination().unwrap_or(Termination::FeedExhausted);
        engine_info!(
            "Walk over {} finished after {} passes: {:?}",
            layout.name(),
            state.pass(),
            termination
        );

        Ok(WalkReport {
            layout,
            termination,
            passes: state.pass(),
            scrolls: state.scrolls(),
            seen: self.tally.seen,
            matched: self.tally.matched,
            acted: self.tally.acted,
            skipped: self.tally.skipped,
            failures: self.failures,
        })
    }

    /// Runs one pagination machine to termination. `parent` is set for
    /// nested walks over the entries of a history section.
    async fn drive(
        &mut self,
        layout: Layout,
        parent: Option<&dyn DomElement>,
        target: Option<String>,
    ) -> Result<PaginationState, WalkError> {
        let config = PaginationConfig {
            budget: self.settings.budget,
            horizon_days: self.settings.horizon_days,
            rule: layout.scroll_rule(),
            stall_limit: self.settings.stall_limit,
            load_page: target.is_some(),
        };
        let mut state = PaginationState::new(config);
        let mut queue = VecDeque::new();
        let mut items: Vec<ElementHandle> = Vec::new();
        let mut yielded: HashSet<String> = HashSet::new();
        let mut current: Option<RecordContext> = None;
        let mut msg = Some(Msg::Start);

        loop {
            if let Some(next) = msg.take() {
                let (next_state, effects) = update(state, next);
                state = next_state;
                queue.extend(effects);
            }
            let Some(effect) = queue.pop_front() else {
                break;
            };

            msg = match effect {
                Effect::LoadPage => {
                    if let Some(url) = target.as_deref() {
                        self.load(url).await?;
                    }
                    None
                }
                Effect::Collect => {
                    if parent.is_none() {
                        set_scroll_pass(state.pass());
                    }
                    items = self.collect(layout, parent, &mut yielded).await?;
                    let still_loading = self.still_loading(layout).await?;
                    let trailing = self.trailing(layout, parent).await?;
                    engine_debug!("Collected {} new {} items", items.len(), layout.name());
                    Some(Msg::Collected {
                        items: items.len(),
                        still_loading,
                        trailing,
                    })
                }
                Effect::Extract { index } => {
                    let record = match items.get(index) {
                        Some(element) => resolve(layout, element.as_ref()).await?,
                        None => Record::unrecognized(),
                    };
                    let recency = (layout.scroll_rule() == ScrollRule::RecencyHorizon
                        && !record.is_placeholder())
                    .then(|| recency_days(&record.text));
                    current = Some(RecordContext {
                        record,
                        acted: false,
                    });
                    Some(Msg::Extracted {
                        recency_days: recency,
                    })
                }
                Effect::Filter { .. } => {
                    let (matched, act) = match current.as_mut() {
                        Some(context) => self.filter(layout, context),
                        None => (false, false),
                    };
                    if !act || layout.post_match() == PostMatch::WalkEntries {
                        if let Some(context) = current.take() {
                            self.report(layout, context);
                        }
                    }
                    Some(Msg::Filtered { matched, act })
                }
                Effect::Process { index } => {
                    if let Some(element) = items.get(index) {
                        self.process(layout, element.as_ref(), current.take())
                            .await?;
                    }
                    Some(Msg::Processed)
                }
                Effect::PrunePass => {
                    if self.settings.remove_processed {
                        self.prune(layout, std::mem::take(&mut items)).await?;
                    }
                    None
                }
                Effect::Scroll => {
                    let (dy, steps) = self.settings.scroll;
                    tolerate(self.page.scroll_by(0.0, dy, steps).await, "scroll")?;
                    tolerate(self.page.wait_load().await, "wait for load")?;
                    tolerate(self.page.wait_stable().await, "wait for render")?;
                    let trailing = self.trailing(layout, parent).await?;
                    Some(Msg::Settled { trailing })
                }
                Effect::Finish(reason) => {
                    engine_debug!("{} walk terminated: {:?}", layout.name(), reason);
                    None
                }
            };
        }

        Ok(state)
    }

    async fn load(&self, url: &str) -> Result<(), WalkError> {
        self.page
            .navigate(url)
            .await
            .map_err(|source| WalkError::Navigation {
                url: url.to_string(),
                source,
            })?;
        tolerate(self.page.wait_load().await, "wait for load")?;
        Ok(())
    }

    /// Items of this pass that were not yielded before, in document order.
    async fn collect(
        &self,
        layout: Layout,
        parent: Option<&dyn DomElement>,
        yielded: &mut HashSet<String>,
    ) -> Result<Vec<ElementHandle>, WalkError> {
        let holder;
        let scope = match (layout.container(), parent) {
            (Container::Parent, Some(parent)) => Scope::Element(parent),
            (Container::Page | Container::Parent, _) => Scope::Page(self.page),
            (Container::Selector(selector), _) => {
                match tolerate(self.page.query(selector).await, "container lookup")? {
                    Some(found) => {
                        holder = found;
                        Scope::Element(holder.as_ref())
                    }
                    None => {
                        engine_debug!("No {} container '{}' yet", layout.name(), selector);
                        return Ok(Vec::new());
                    }
                }
            }
        };

        for selector in layout.dropped_sublists() {
            for sublist in tolerate(scope.query_all(selector).await, "sub-list lookup")? {
                tolerate(sublist.remove().await, "sub-list removal")?;
            }
        }

        let mut items = tolerate(scope.query_all(layout.item_selector()).await, "item lookup")?;
        if layout.waits_for_visible() {
            if let Some(first) = items.first() {
                if let Err(err) = first.wait_visible(self.settings.visible_timeout).await {
                    if err.is_fatal() {
                        return Err(err.into());
                    }
                    engine_warn!("First {} item never became visible: {}", layout.name(), err);
                }
            }
        }
        items.retain(|item| yielded.insert(item.id()));
        Ok(items)
    }

    async fn still_loading(&self, layout: Layout) -> Result<bool, WalkError> {
        if !layout.has_continuation() {
            return Ok(true);
        }
        let spinner = tolerate(self.page.query(CONTINUATION_SELECTOR).await, "spinner lookup")?;
        Ok(spinner.is_some())
    }

    async fn trailing(&self, layout: Layout, parent: Option<&dyn DomElement>) -> Result<Option<String>, WalkError> {
        if parent.is_some() {
            return Ok(None);
        }
        let all = tolerate(self.page.query_all(layout.trailing_selector()).await, "trailing lookup")?;
        Ok(all.last().map(|element| element.id()))
    }

    /// Applies the layout's filters and decides whether the record gets its
    /// post-match processing.
    fn filter(&mut self, layout: Layout, context: &mut RecordContext) -> (bool, bool) {
        let record = &mut context.record;
        // Section headers group records; they are not counted as records.
        let counted = layout.post_match() != PostMatch::WalkEntries;
        if record.is_placeholder() {
            if counted {
                self.tally.skipped += 1;
            }
            return (false, false);
        }
        if counted {
            self.tally.seen += 1;
        }

        let matched = if layout.uses_filters() {
            self.settings.filters.apply(record)
        } else {
            record.matched = true;
            true
        };
        if matched && counted {
            self.tally.matched += 1;
        }

        let act = matched
            && match layout.post_match() {
                PostMatch::Report => false,
                PostMatch::WalkEntries => true,
                PostMatch::MenuAction { .. } => self.settings.destructive,
            };
        (matched, act)
    }

    async fn process(
        &mut self,
        layout: Layout,
        element: &dyn DomElement,
        context: Option<RecordContext>,
    ) -> Result<(), WalkError> {
        match layout.post_match() {
            PostMatch::WalkEntries => {
                Box::pin(self.drive(Layout::HistoryEntry, Some(element), None)).await?;
            }
            PostMatch::MenuAction { label } => {
                if let Some(mut context) = context {
                    self.act(element, label, &mut context).await?;
                    self.report(layout, context);
                }
            }
            PostMatch::Report => {
                if let Some(context) = context {
                    self.report(layout, context);
                }
            }
        }
        Ok(())
    }

    async fn act(&mut self, element: &dyn DomElement, label: &str, context: &mut RecordContext) -> Result<(), WalkError> {
        if !tolerate(element.is_visible().await, "visibility check")? {
            engine_debug!("Skipping hidden entry '{}'", context.record.title);
            return Ok(());
        }

        let attempt = MenuAction::new(self.page, &self.settings.action, self.rng.as_mut())
            .run(element, label)
            .await?;
        if attempt.acted() {
            context.acted = true;
            self.tally.acted += 1;
            engine_info!("'{}' on '{}' done", label, context.record.title);
        } else {
            let failure = ActionFailure {
                title: context.record.title.clone(),
                url: context.record.url.clone(),
                step: attempt.last_failed_step().unwrap_or(attempt.step()),
                restarts: attempt.restarts(),
                message: attempt.last_error().unwrap_or_default().to_string(),
            };
            engine_warn!("{}", failure);
            self.failures.push(failure);
        }
        Ok(())
    }

    fn report(&mut self, layout: Layout, context: RecordContext) {
        if context.record.is_placeholder() {
            return;
        }
        let event = if layout.post_match() == PostMatch::WalkEntries {
            let index = self.sections;
            self.sections += 1;
            WalkEvent::Section {
                index,
                titles: context.record.titles,
            }
        } else {
            WalkEvent::Record {
                record: context.record,
                acted: context.acted,
            }
        };
        self.sink.emit(event);
    }

    /// Removes the elements processed in this pass, plus every continuation
    /// spinner but the last on feeds that show them.
    async fn prune(&self, layout: Layout, processed: Vec<ElementHandle>) -> Result<(), WalkError> {
        let count = processed.len();
        for element in processed.into_iter().rev() {
            tolerate(element.remove().await, "element removal")?;
        }
        if layout.has_continuation() {
            let mut spinners = tolerate(self.page.query_all(CONTINUATION_SELECTOR).await, "spinner lookup")?;
            spinners.pop();
            for spinner in spinners {
                tolerate(spinner.remove().await, "spinner removal")?;
            }
        }
        engine_debug!("Pruned {} processed {} items", count, layout.name());
        Ok(())
    }
}

/// Keeps the walk going on transient DOM errors; a lost session ends it.
fn tolerate<T: Default>(result: Result<T, DomError>, what: &str) -> Result<T, WalkError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_fatal() => Err(err.into()),
        Err(err) => {
            engine_warn!("{} failed: {}", what, err);
            Ok(T::default())
        }
    }
}

#![allow(dead_code)]

pub mod fake_dom;

use std::sync::{Mutex, Once};

use fake_dom::{el, NodeSpec};
use tubesweep_core::{Pacing, Record, MENU_REMOVE_FROM_HISTORY};
use tubesweep_engine::{ActionSettings, WalkEvent, WalkSettings, WalkSink};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(engine_logging::initialize_for_tests);
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WalkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<WalkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<(Record, bool)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                WalkEvent::Record { record, acted } => Some((record, acted)),
                WalkEvent::Section { .. } => None,
            })
            .collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .map(|(record, _)| record.title)
            .collect()
    }
}

impl WalkSink for RecordingSink {
    fn emit(&self, event: WalkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Settings without pauses so tests run instantly.
pub fn quick_settings() -> WalkSettings {
    WalkSettings {
        action: quick_action_settings(),
        ..WalkSettings::default()
    }
}

pub fn quick_action_settings() -> ActionSettings {
    ActionSettings {
        pacing: Pacing::NONE,
        max_restarts: 2,
        menu_read_attempts: 3,
        menu_read_delay: std::time::Duration::ZERO,
        ..ActionSettings::default()
    }
}

/// Classic history entry: `#video-title`, description, channel link and a
/// menu button.
pub fn classic_entry(key: &str, title: &str, channel: &str) -> NodeSpec {
    el("ytd-video-renderer").children([
        el("a")
            .id("video-title")
            .attr("href", &format!("/watch?v={key}"))
            .text(title),
        el("yt-formatted-string")
            .id("description-text")
            .text(&format!("About {title}")),
        el("div").id("metadata").child(
            el("a")
                .attr("href", &format!("/@{channel}"))
                .text(channel),
        ),
        el("button")
            .attr("aria-label", "Action menu")
            .menu(key, &["Add to queue", MENU_REMOVE_FROM_HISTORY, "Share"]),
    ])
}

/// Lockup history entry with its metadata split in `[role='text']` parts.
pub fn lockup_entry(key: &str, title: &str, channel: &str, parts: &[&str]) -> NodeSpec {
    let fragments = parts.iter().enumerate().map(|(index, part)| {
        let fragment = el("span").attr("role", "text");
        if index == 1 {
            fragment.child(el("a").attr("href", &format!("/@{channel}")).text(part))
        } else {
            fragment.text(part)
        }
    });
    el("yt-lockup-view-model").children([
        el("div")
            .class("yt-lockup-metadata-view-model__text-container")
            .child(el("a").attr("href", &format!("/watch?v={key}")).text(title))
            .children(fragments),
        el("div")
            .class("yt-lockup-metadata-view-model__menu-button")
            .menu(key, &[MENU_REMOVE_FROM_HISTORY]),
    ])
}

pub fn history_section(header: &str, entries: Vec<NodeSpec>) -> NodeSpec {
    el("ytd-item-section-renderer")
        .child(el("div").id("title").text(header))
        .child(el("div").id("contents").children(entries))
}

pub fn sub_video(key: &str, title: &str, channel: &str, age: &str) -> NodeSpec {
    el("ytd-rich-item-renderer").children([
        el("h3").child(el("a").attr("href", &format!("/watch?v={key}")).text(title)),
        el("yt-content-metadata-view-model").children([
            el("span")
                .attr("role", "text")
                .child(el("a").attr("href", &format!("/@{channel}")).text(channel)),
            el("span").attr("role", "text").text("1.2K views"),
            el("span").attr("role", "text").text(age),
        ]),
    ])
}

//! Renders walk events on stdout as markdown lines or JSON objects.

use std::io::Write;
use std::sync::Mutex;

use engine_logging::engine_warn;
use serde::Serialize;
use tubesweep_core::Record;
use tubesweep_engine::{ActionFailure, WalkEvent, WalkSink};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Print records the filters rejected, prefixed with `-`.
    pub verbose: bool,
    pub json: bool,
    /// Print the record text column.
    pub show_text: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonLine<'a> {
    Section {
        section: &'a [String],
    },
    Record {
        #[serde(flatten)]
        record: &'a Record,
        acted: bool,
    },
}

/// Sink that prints every event as it arrives and keeps the matched
/// records for follow-up walks.
pub struct Reporter<W: Write + Send> {
    out: Mutex<W>,
    options: ReportOptions,
    matched: Mutex<Vec<Record>>,
}

impl<W: Write + Send> Reporter<W> {
    pub fn new(out: W, options: ReportOptions) -> Self {
        Self {
            out: Mutex::new(out),
            options,
            matched: Mutex::new(Vec::new()),
        }
    }

    /// Writes a free-form heading line (`## title`, or a JSON section).
    pub fn heading(&self, title: &str) {
        let titles = [title.to_string()];
        self.write_line(&render_section(&titles, self.options));
    }

    /// Matched records emitted so far, in encounter order.
    pub fn take_matched(&self) -> Vec<Record> {
        match self.matched.lock() {
            Ok(mut matched) => std::mem::take(&mut *matched),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_line(&self, line: &str) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            engine_warn!("Failed to write report line: {}", err);
        }
    }
}

impl<W: Write + Send> WalkSink for Reporter<W> {
    fn emit(&self, event: WalkEvent) {
        if let WalkEvent::Record { record, .. } = &event {
            if record.matched {
                match self.matched.lock() {
                    Ok(mut matched) => matched.push(record.clone()),
                    Err(poisoned) => poisoned.into_inner().push(record.clone()),
                }
            }
        }
        if let Some(line) = render(&event, self.options) {
            self.write_line(&line);
        }
    }
}

/// One output line for `event`, or `None` when the options hide it.
pub fn render(event: &WalkEvent, options: ReportOptions) -> Option<String> {
    match event {
        WalkEvent::Section { titles, .. } => Some(render_section(titles, options)),
        WalkEvent::Record { record, acted } => {
            if !record.matched && !options.verbose {
                return None;
            }
            if options.json {
                return Some(to_json(&JsonLine::Record {
                    record,
                    acted: *acted,
                }));
            }
            Some(render_record(record, *acted, options))
        }
    }
}

fn render_section(titles: &[String], options: ReportOptions) -> String {
    if options.json {
        return to_json(&JsonLine::Section { section: titles });
    }
    format!("## {}", titles.join(" / "))
}

fn render_record(record: &Record, acted: bool, options: ReportOptions) -> String {
    let mut line = String::new();
    if !record.matched {
        line.push_str("- ");
    }
    if options.show_text {
        line.push_str(&record.to_string());
    } else {
        line.push_str(&format!(
            "[{}]({}) | [{}]({})",
            record.title, record.url, record.channel_name, record.channel_url
        ));
    }
    if let Some(pattern) = &record.matched_substring {
        line.push_str(&format!(" ({pattern})"));
    }
    if acted {
        line.push_str(" [removed]");
    }
    line
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        engine_warn!("Failed to encode report line: {}", err);
        String::from("{}")
    })
}

/// Prints the queued action failures to stderr.
pub fn print_failures(failures: &[ActionFailure]) {
    if failures.is_empty() {
        return;
    }
    eprintln!("{} action(s) failed:", failures.len());
    for failure in failures {
        eprintln!("  {failure}");
    }
}

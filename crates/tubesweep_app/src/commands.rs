use std::io::{self, Stdout};

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use tubesweep_core::{FilterSet, Layout, ScrollBudget};
use tubesweep_engine::{
    ActionFailure, DomPage, PageTimings, Session, WalkReport, WalkSettings, Walker,
};

use crate::cli::{Cli, Command, HistoryArgs, PlaylistArgs, SubCommand};
use crate::config::Config;
use crate::report::{ReportOptions, Reporter};

/// Connects to the browser and runs the selected command. Returns the
/// action failures queued by every walk of the run.
pub async fn run(cli: &Cli, config: &Config) -> Result<Vec<ActionFailure>> {
    let devtools = config.devtools();
    let session = Session::open(&devtools, PageTimings::default())
        .await
        .with_context(|| format!("connecting to Chrome DevTools at {}", devtools.base_url()))?;
    let page = session
        .current_page()
        .await
        .context("attaching to the current tab")?;

    let options = ReportOptions {
        verbose: cli.verbose,
        json: cli.json,
        show_text: true,
    };
    let budget = ScrollBudget::from_flag(cli.scroll_max);

    match &cli.command {
        Command::History(args) => history(&page, config, budget, options, args).await,
        Command::Playlist(args) => playlist(&page, budget, options, args).await,
        Command::Sub(SubCommand::Channel) => {
            let settings = WalkSettings {
                budget,
                ..WalkSettings::default()
            };
            let reporter = Reporter::new(io::stdout(), options);
            walk(&page, &settings, &reporter, Layout::SubChannel, None).await
        }
        Command::Sub(SubCommand::Video(args)) => {
            let settings = WalkSettings {
                budget,
                horizon_days: (args.day > 0).then_some(args.day),
                ..WalkSettings::default()
            };
            let reporter = Reporter::new(io::stdout(), options);
            walk(&page, &settings, &reporter, Layout::SubVideo, None).await
        }
    }
}

/// Settings of a history walk: configured patterns first, then the
/// command-line ones.
pub fn history_settings(config: &Config, budget: ScrollBudget, args: &HistoryArgs) -> WalkSettings {
    let include = config.history_filter.iter().chain(&args.include).cloned();
    let exclude = config.history_exclude.iter().chain(&args.exclude).cloned();
    WalkSettings {
        budget,
        filters: FilterSet::new(include, exclude),
        destructive: args.del,
        remove_processed: !args.no_remove,
        action: config.action(),
        ..WalkSettings::default()
    }
}

async fn history(
    page: &dyn DomPage,
    config: &Config,
    budget: ScrollBudget,
    options: ReportOptions,
    args: &HistoryArgs,
) -> Result<Vec<ActionFailure>> {
    let settings = history_settings(config, budget, args);
    if settings.destructive && settings.filters.include().is_empty() {
        engine_warn!("--del without include patterns removes every walked entry");
    }
    let reporter = Reporter::new(
        io::stdout(),
        ReportOptions {
            show_text: args.desc,
            ..options
        },
    );
    walk(page, &settings, &reporter, Layout::HistorySection, None).await
}

async fn playlist(
    page: &dyn DomPage,
    budget: ScrollBudget,
    options: ReportOptions,
    args: &PlaylistArgs,
) -> Result<Vec<ActionFailure>> {
    let settings = WalkSettings {
        budget,
        filters: FilterSet::new(args.include.iter().cloned(), args.exclude.iter().cloned()),
        ..WalkSettings::default()
    };
    let reporter = Reporter::new(io::stdout(), options);
    reporter.heading("Playlist");
    let mut failures = walk(page, &settings, &reporter, Layout::Playlist, None).await?;

    if !args.get_list {
        return Ok(failures);
    }

    let video_settings = WalkSettings {
        budget,
        ..WalkSettings::default()
    };
    for playlist in reporter.take_matched() {
        if playlist.url.is_empty() {
            engine_warn!("Playlist {:?} has no link, skipped", playlist.title);
            continue;
        }
        reporter.heading(&playlist.title);
        failures.extend(
            walk(
                page,
                &video_settings,
                &reporter,
                Layout::PlaylistVideo,
                Some(&playlist.url),
            )
            .await?,
        );
    }
    Ok(failures)
}

async fn walk(
    page: &dyn DomPage,
    settings: &WalkSettings,
    reporter: &Reporter<Stdout>,
    layout: Layout,
    url: Option<&str>,
) -> Result<Vec<ActionFailure>> {
    let report = Walker::new(page, settings, reporter)
        .walk(layout, url)
        .await
        .with_context(|| format!("walking {}", layout.name()))?;
    log_summary(&report);
    Ok(report.failures)
}

fn log_summary(report: &WalkReport) {
    engine_info!(
        "{}: {} seen, {} matched, {} acted, {} skipped, {} scrolls, {} failures",
        report.layout.name(),
        report.seen,
        report.matched,
        report.acted,
        report.skipped,
        report.scrolls,
        report.failures.len()
    );
}

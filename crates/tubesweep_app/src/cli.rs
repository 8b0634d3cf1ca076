use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "tubesweep",
    version,
    about = "Walks YouTube feeds in a running Chrome and prunes watch history"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub debug: bool,
    #[arg(long, short = 't', global = true)]
    pub trace: bool,
    /// Also report records the filters rejected.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// Config file (default ~/.config/tubesweep.json).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
    /// Scrolls after the first pass; -1 scrolls until the feed ends.
    #[arg(long, short, global = true, default_value_t = 0, allow_negative_numbers = true)]
    pub scroll_max: i64,
    /// DevTools host, overrides the config.
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// DevTools port, overrides the config.
    #[arg(long, global = true)]
    pub port: Option<u16>,
    /// Print one JSON object per line instead of markdown.
    #[arg(long, global = true)]
    pub json: bool,
    /// Also write the log to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Walk the watch history and optionally remove matching entries.
    #[command(visible_aliases = ["h", "hist"])]
    History(HistoryArgs),
    /// List the saved playlists.
    #[command(visible_aliases = ["p", "pl"])]
    Playlist(PlaylistArgs),
    /// Walk the subscription feeds.
    #[command(subcommand)]
    Sub(SubCommand),
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Remove matched entries from the watch history (dry run otherwise).
    #[arg(long)]
    pub del: bool,
    /// Keep processed entries on the page.
    #[arg(long, short = 'n')]
    pub no_remove: bool,
    /// Show the entry description.
    #[arg(long)]
    pub desc: bool,
    /// Include pattern, added to the configured history filter.
    #[arg(long, short)]
    pub include: Vec<String>,
    #[arg(long, short)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PlaylistArgs {
    #[arg(long, short)]
    pub include: Vec<String>,
    #[arg(long, short)]
    pub exclude: Vec<String>,
    /// Walk the videos of every matched playlist.
    #[arg(long, short)]
    pub get_list: bool,
}

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    /// List subscribed channels.
    #[command(visible_aliases = ["c", "ch"])]
    Channel,
    /// List the subscription video feed.
    #[command(visible_aliases = ["v", "videos"])]
    Video(SubVideoArgs),
}

#[derive(Debug, Args)]
pub struct SubVideoArgs {
    /// Keep scrolling until a video is older than this many days.
    #[arg(long, default_value_t = 0)]
    pub day: u64,
}

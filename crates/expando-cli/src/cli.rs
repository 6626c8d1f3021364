use clap::{Args, Parser, Subcommand, ValueEnum};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = "expando - expand typed prefixes into text in any application",
    long_about = "expando watches what you type and replaces registered prefixes with their expansions."
)]
pub struct Expando {
    #[clap(long, global = true, help = "Data file to use instead of the default")]
    pub data: Option<PathBuf>,

    #[clap(subcommand)]
    pub commands: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the keyboard and expand prefixes until interrupted
    Run,
    /// List all groups and their expansions
    List,
    /// Add a new expansion
    Add {
        #[clap(long, short = 'g', default_value = "General", help = "Group to add to")]
        group: String,

        #[clap(long, short = 'p', help = "Prefix that triggers the expansion")]
        prefix: String,

        #[clap(long, short = 'b', help = "Replacement text")]
        body: String,

        #[clap(long, help = "Wait this long after the prefix before expanding")]
        delay_ms: Option<u64>,

        #[clap(long, short = 'd', default_value = "", help = "Short description")]
        description: String,
    },
    /// Remove an expansion by prefix
    Remove {
        #[clap(long, short = 'p', help = "Prefix of the expansion to remove")]
        prefix: String,
    },
    /// Manage expansion groups
    #[clap(subcommand)]
    Group(GroupCommand),
    /// Restrict which applications expansions fire in
    #[clap(subcommand)]
    Whitelist(WhitelistCommand),
    /// Load expansions from another data file
    Import {
        file: PathBuf,

        #[clap(long, help = "Add to the current expansions instead of replacing them")]
        merge: bool,
    },
    /// Write all expansions to a file
    Export { file: PathBuf },
    /// Print the location of the data file
    Path,
}

#[derive(Subcommand)]
pub enum GroupCommand {
    Add { name: String },
    Rename { name: String, new_name: String },
    Enable { name: String },
    Disable { name: String },
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum WhitelistCommand {
    /// Set how the application list is applied
    Mode { mode: ModeArg },
    /// Add an application to the list
    Add(MatcherArgs),
    /// Remove an application from the list
    Remove(MatcherArgs),
    /// Show the current mode and list
    Show,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct MatcherArgs {
    #[clap(long, help = "Match the process name, e.g. notepad.exe")]
    pub process: Option<String>,

    #[clap(long, help = "Match part of the window title")]
    pub title: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Disabled,
    Allow,
    Deny,
}

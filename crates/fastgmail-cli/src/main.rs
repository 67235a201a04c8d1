use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "fastgmail", version, about = "Read Gmail messages and edit their labels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to <config dir>/fastgmail/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Mailbox to act on, overriding gmail.user_id
    #[arg(long, global = true, value_name = "USER_ID")]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print headers, flags and body of a message
    Show {
        id: String,
        /// Print the HTML body instead of plain text
        #[arg(long)]
        html: bool,
        /// strftime pattern for the date line
        #[arg(long, value_name = "FORMAT")]
        date_format: Option<String>,
    },
    /// List attachments, optionally saving them
    Attachments {
        id: String,
        #[arg(long)]
        save: bool,
        /// Target directory (defaults to attachments.download_dir)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Replace files that already exist
        #[arg(long)]
        overwrite: bool,
    },
    /// Resolve and print the labels of a message
    Labels { id: String },
    /// Add or remove label ids
    Label {
        id: String,
        #[arg(long = "add", value_name = "LABEL")]
        add: Vec<String>,
        #[arg(long = "remove", value_name = "LABEL")]
        remove: Vec<String>,
    },
    /// Flip one of the well-known flags
    Toggle { id: String, target: ToggleTarget },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ToggleTarget {
    Read,
    Starred,
    Important,
    Spam,
    Trash,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = fastgmail_core::init() {
        eprintln!("Failed to initialize logging: {e:#}");
    }

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("{:?}", err);
            eprintln!("error: {}", commands::describe(&err));
            ExitCode::FAILURE
        }
    }
}

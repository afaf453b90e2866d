mod cmd_config;
mod cmd_init;
mod cmd_notice;
mod cmd_render;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd_config::ConfigCmd;

#[derive(Parser)]
#[command(name = "noticeboard", version, about = "Admin notice registry")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .noticeboard/ store in the current directory
    Init,
    /// Activate a notice
    Add {
        /// Notice id (e.g. "update")
        id: String,
    },
    /// Activate a notice with custom HTML content
    AddCustom {
        /// Notice id
        id: String,
        /// Notice HTML; filtered against the post allow-list before storing
        html: String,
    },
    /// Deactivate a notice and delete its custom content
    Remove {
        /// Notice id
        id: String,
    },
    /// Deactivate every notice
    Clear,
    /// List active notices
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mint a dismiss-link nonce
    Nonce,
    /// Process a dismiss link as the local operator
    Dismiss {
        /// Notice id from the link
        id: String,
        /// Nonce from the link
        #[arg(long)]
        nonce: String,
    },
    /// Render active notices for an admin request
    Render {
        /// Value of the `page` request parameter
        #[arg(long)]
        page: Option<String>,
        /// Extra request parameters as key=value (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,
        /// Notice sources registered by other components, as
        /// `hook:name`, `hook:name@Type` or `hook:{closure}` (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
    },
    /// Read or record the installed schema version
    DbVersion {
        /// New version to record; prints the current one when omitted
        version: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("NOTICEBOARD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => cmd_init::execute(&cwd),
        Command::Add { id } => cmd_notice::add(&cwd, &id),
        Command::AddCustom { id, html } => cmd_notice::add_custom(&cwd, &id, &html),
        Command::Remove { id } => cmd_notice::remove(&cwd, &id),
        Command::Clear => cmd_notice::clear(&cwd),
        Command::List { json } => cmd_notice::list(&cwd, json),
        Command::Nonce => cmd_notice::nonce(&cwd),
        Command::Dismiss { id, nonce } => cmd_notice::dismiss(&cwd, &id, &nonce),
        Command::Render {
            page,
            params,
            sources,
        } => cmd_render::execute(&cwd, page.as_deref(), &params, &sources),
        Command::DbVersion { version } => cmd_notice::db_version(&cwd, version.as_deref()),
        Command::Config { cmd } => cmd_config::run(cmd, &cwd),
    }
}

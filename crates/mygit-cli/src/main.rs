//! mygit - a minimal wire-compatible git client.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// mygit - read, write, and clone git repositories
#[derive(Parser, Debug)]
#[command(name = "mygit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the git directory structure
    Init,

    /// Print the content of a repository object
    CatFile {
        /// Pretty-print the object payload
        #[arg(short = 'p')]
        pretty: bool,
        /// Object id
        oid: String,
    },

    /// Compute the object id of a file, optionally storing it as a blob
    HashObject {
        /// Write the object into the database
        #[arg(short = 'w')]
        write: bool,
        /// File to hash
        path: String,
    },

    /// List the contents of a tree object
    LsTree {
        /// Print only entry names
        #[arg(long)]
        name_only: bool,
        /// Tree object id
        oid: String,
    },

    /// Record the working directory as a tree object
    WriteTree,

    /// Create a commit object for an existing tree
    CommitTree {
        /// Parent commit id
        #[arg(short = 'p')]
        parent: Option<String>,
        /// Commit message
        #[arg(short = 'm')]
        message: String,
        /// Tree object id
        tree: String,
    },

    /// Record the working directory and commit it on the current branch
    Commit {
        /// Commit message
        #[arg(short = 'm')]
        message: String,
        /// Allow a commit with an empty message
        #[arg(long)]
        allow_empty_message: bool,
    },

    /// Show commit history
    Log {
        /// Commit to start from (default HEAD)
        oid: Option<String>,
    },

    /// List references advertised by a remote repository
    LsRemote {
        /// Remote URL
        url: String,
    },

    /// Clone a remote repository
    Clone {
        /// Remote URL
        url: String,
        /// Target directory (default: derived from the URL)
        dir: Option<String>,
    },
}

fn main() {
    // Usage problems exit 1, not clap's default of 2; --help and
    // --version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mygit={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        Commands::Init => commands::init(),
        Commands::CatFile { pretty, oid } => commands::cat_file(pretty, &oid),
        Commands::HashObject { write, path } => commands::hash_object(write, &path),
        Commands::LsTree { name_only, oid } => commands::ls_tree(name_only, &oid),
        Commands::WriteTree => commands::write_tree(),
        Commands::CommitTree {
            parent,
            message,
            tree,
        } => commands::commit_tree(&tree, parent.as_deref(), &message),
        Commands::Commit {
            message,
            allow_empty_message,
        } => commands::commit(&message, allow_empty_message),
        Commands::Log { oid } => commands::log(oid.as_deref()),
        Commands::LsRemote { url } => commands::ls_remote(&url),
        Commands::Clone { url, dir } => commands::clone(&url, dir.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

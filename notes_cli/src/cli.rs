use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "Apple Notes MCP - call the note tools from a terminal and build the extension bundle")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  notes list                              Most recently modified notes
  notes list --folder work                Notes in folders matching 'work'
  notes search coffee                     Search titles and bodies
  notes search '#project'                 Notes carrying a hashtag
  notes get <id> [<id> ...]               Full note content
  notes create \"Title\" --body '# Hi'      Create a note from Markdown

\x1b[1;36mPackaging:\x1b[0m
  notes package --binary target/release/apple-notes-mcp")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notes, newest first
    #[command(alias = "ls")]
    List {
        /// Maximum number of notes (1-1000)
        #[arg(short, long, default_value_t = 50, allow_negative_numbers = true)]
        limit: i64,
        /// Folder name filter (case-insensitive substring)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Fetch full notes by ID
    Get {
        /// Note IDs from `list` or `search`
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Search note titles and bodies, or hashtags with a leading '#'
    Search {
        query: String,
        /// Maximum number of results (1-100)
        #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Create a note from a Markdown body
    Create {
        title: String,
        /// Markdown body; '-' reads standard input
        #[arg(short, long, default_value = "")]
        body: String,
        /// Folder to create the note in
        #[arg(short, long)]
        folder: Option<String>,
        /// Account to create the note in
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Show the MCP tool catalogue
    Tools,

    /// Check Notes automation permission and database access
    Doctor,

    /// Build the .dxt desktop extension bundle
    Package {
        /// Extension manifest
        #[arg(long, default_value = "manifest.json")]
        manifest: PathBuf,
        /// Server binary to bundle
        #[arg(long)]
        binary: PathBuf,
        /// Directory for the generated bundle
        #[arg(short = 'o', long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
}

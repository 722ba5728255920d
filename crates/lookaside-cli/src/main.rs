mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_MISSING};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "lookaside",
    version,
    about = "Track, verify, and fetch large artifacts kept in lookaside storage"
)]
struct Cli {
    /// Path to the manifest listing tracked artifacts.
    #[arg(short, long, default_value = "lookaside.json", global = true)]
    manifest: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum RemoteAction {
    /// Save the remote URL used when `fetch` gets no --remote.
    Set {
        url: String,
        /// Bearer token sent with every request (LOOKASIDE_TOKEN overrides it).
        #[arg(long)]
        token: Option<String>,
    },
    /// Show the effective remote.
    Show,
    /// Delete the saved remote.
    Unset,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hash files and record them in the manifest (replacing existing entries).
    Add {
        /// Files to track.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Digest algorithm for the new records.
        #[arg(short, long, default_value = "sha1")]
        algorithm: String,
    },
    /// Stop tracking files.
    Remove {
        /// Files to drop from the manifest.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List tracked files.
    List,
    /// Show which tracked files are present on disk.
    Status,
    /// Check size and digest of every tracked file.
    Verify,
    /// Download tracked files that are missing on disk.
    Fetch {
        /// Remote lookaside URL (overrides LOOKASIDE_REMOTE and the saved remote).
        #[arg(long)]
        remote: Option<String>,
        /// Only ask the remote which missing files it holds; download nothing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Manage the saved default remote.
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn run_remote(action: RemoteAction, json: bool) -> Result<u8, String> {
    let path = commands::remote::config_path()?;
    match action {
        RemoteAction::Set { url, token } => {
            commands::remote::set(&path, &url, token.as_deref(), json)
        }
        RemoteAction::Show => commands::remote::show(&path, json),
        RemoteAction::Unset => commands::remote::unset(&path, json),
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LOOKASIDE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let manifest = cli.manifest.as_path();
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Add { files, algorithm } => {
            commands::add::run(manifest, &files, &algorithm, json_output)
        }
        Commands::Remove { files } => commands::remove::run(manifest, &files, json_output),
        Commands::List => commands::list::run(manifest, json_output),
        Commands::Status => commands::status::run(manifest, json_output),
        Commands::Verify => commands::verify::run(manifest, json_output),
        Commands::Fetch { remote, dry_run } => {
            commands::fetch::run(manifest, remote.as_deref(), dry_run, json_output)
        }
        Commands::Remote { action } => run_remote(action, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:") {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("missing file:") {
                EXIT_MISSING
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

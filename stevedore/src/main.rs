use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use libstevedore::auth::{CredentialStore, Credentials, FileCredentialStore};
use libstevedore::config::{Settings, Verbosity};
use libstevedore::registry::{HttpRegistryClient, SearchApi};
use libstevedore::store::FsImageStore;
use std::path::PathBuf;
use std::process;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;
mod options;
mod output;
mod terminal;

use commands::{Collaborators, Dispatcher};
use context::{AppContext, Overrides};
use options::CommandOptions;
use output::{ColorChoice, ConsoleSink, MessageSink};
use terminal::StdTerminal;

/// Stevedore - user-space container image manager
///
/// Search registries, and import, export and clone images in a local
/// repository without root privileges.
#[derive(Parser, Debug)]
#[command(name = "stevedore")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Control colored output: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    color: String,

    /// Configuration file (default: $STEVEDORE_CONFIG or ~/.config/stevedore/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Local repository root
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// v1 index URL used by search and login
    #[arg(long, global = true)]
    index_url: Option<String>,

    /// v2 registry URL used by catalog search
    #[arg(long, global = true)]
    registry_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a local image repository
    #[command(visible_alias = "mkrepo")]
    CreateRepository {
        /// Directory to create (default: the configured repository)
        location: Option<String>,
    },
    /// Load images from a docker-save archive
    Load {
        /// Archive to read
        #[arg(short, long)]
        input: String,
    },
    /// Import an archive as an image
    Import {
        /// Archive to read
        file: String,
        /// Image name (repository[:tag])
        image: String,
        /// Remove the archive after a successful import
        #[arg(long = "move", id = "move")]
        move_archive: bool,
        /// The archive was written by `export --clone`
        #[arg(long)]
        clone: bool,
    },
    /// Export an image to an archive
    Export {
        /// Archive to write
        #[arg(short, long)]
        output: String,
        /// Image name (repository[:tag])
        image: String,
        /// Write the clone layout instead of docker-save
        #[arg(long)]
        clone: bool,
    },
    /// Tag an existing image under a new name
    Clone {
        /// Existing image
        source: String,
        /// New image name
        target: String,
    },
    /// Store credentials for a registry
    Login {
        /// Username (will prompt if not provided)
        #[arg(short, long)]
        username: Option<String>,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
        /// Registry host or URL (default: the index host)
        #[arg(long)]
        registry: Option<String>,
    },
    /// Remove stored credentials
    Logout {
        /// Registry host or URL (default: the index host)
        #[arg(long)]
        registry: Option<String>,
        /// Remove credentials for every registry
        #[arg(short, long)]
        all: bool,
    },
    /// Search a registry for images
    Search {
        /// Search expression
        expression: String,
        /// Show all pages without prompting
        #[arg(short, long)]
        all: bool,
        /// Search the v2 catalog instead of the v1 index
        #[arg(long)]
        catalog: bool,
    },
    /// List images in the local repository
    Images {
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Show host and configuration information
    Info {
        /// Output format: pretty, json, yaml
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Display version information
    Version,
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    init_tracing(cli.verbose, cli.quiet);

    if let Commands::Completion { shell } = cli.command {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        return;
    }

    let search_api = match cli.command {
        Commands::Search { catalog: true, .. } => Some(SearchApi::Catalog),
        _ => None,
    };

    // Precedence: defaults > config file > env vars > CLI flags
    let ctx = match AppContext::build(Overrides {
        config: cli.config,
        repository: cli.repo,
        index_url: cli.index_url,
        registry_url: cli.registry_url,
        search_api,
        verbosity: verbosity_override(cli.verbose, cli.quiet),
    }) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(commands::STATUS_ERROR);
        }
    };

    let sink = ConsoleSink::new(ctx.settings.verbosity, ColorChoice::from(cli.color.as_str()));

    let Some((name, sub_matches)) = matches.subcommand() else {
        sink.error("No command given");
        process::exit(commands::STATUS_ERROR);
    };
    let options = CommandOptions::from_matches(sub_matches);

    let collaborators = match build_collaborators(&ctx.settings, sink) {
        Ok(collaborators) => collaborators,
        Err(e) => {
            sink.error(&e.to_string());
            process::exit(commands::STATUS_ERROR);
        }
    };

    let mut dispatcher = Dispatcher::new(ctx, collaborators);
    process::exit(dispatcher.dispatch(name, &options));
}

/// Installs the diagnostic log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn verbosity_override(verbose: u8, quiet: bool) -> Option<Verbosity> {
    match (quiet, verbose) {
        (true, _) => Some(Verbosity::Error),
        (false, 0) => None,
        (false, 1) => Some(Verbosity::Verbose),
        (false, _) => Some(Verbosity::Debug),
    }
}

fn build_collaborators(
    settings: &Settings,
    sink: ConsoleSink,
) -> libstevedore::Result<Collaborators> {
    let keystore = FileCredentialStore::new(settings.keystore_path());

    let search_host = match settings.search_api {
        SearchApi::Index => settings.index_host(),
        SearchApi::Catalog => settings.registry_host(),
    };
    let credentials = search_host
        .and_then(|host| match keystore.get(&host) {
            Ok(record) => record,
            Err(e) => {
                warn!(host = %host, error = %e, "ignoring unreadable keystore");
                None
            }
        })
        .map(Credentials::from)
        .unwrap_or(Credentials::Anonymous);

    let registry = HttpRegistryClient::new(settings.client_config(credentials))?;

    Ok(Collaborators {
        registry: Box::new(registry),
        store: Box::new(FsImageStore::new(&settings.repository)),
        credentials: Box::new(keystore),
        terminal: Box::new(StdTerminal),
        sink: Box::new(sink),
    })
}

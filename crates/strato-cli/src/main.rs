mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use commands::{AgentContext, EXIT_FAILURE};
use std::path::PathBuf;
use std::process::ExitCode;
use strato_host::SystemRunner;

#[derive(Debug, Parser)]
#[command(
    name = "strato",
    version,
    about = "Provisioning agent for OpenStack compute hosts"
)]
struct Cli {
    /// Path to the agent configuration file.
    #[arg(long, default_value = "/etc/strato/config.toml", global = true)]
    config: PathBuf,

    /// Path to the relation snapshot file.
    #[arg(long, default_value = "/etc/strato/relations.json", global = true)]
    relations: PathBuf,

    /// Directory holding per-release template sets.
    #[arg(long, default_value = "/usr/share/strato/templates", global = true)]
    templates: PathBuf,

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
enum Commands {
    /// Show the computed resource map (file -> services + contexts).
    Resolve,
    /// List every service the agent manages under the current config.
    Services,
    /// Show the package set required for the current config.
    Packages,
    /// Render every registered configuration file.
    Render {
        /// Write below this root instead of / (dry runs, tests).
        #[arg(long, default_value = "/")]
        root: PathBuf,
    },
    /// Upgrade the node to the release named by openstack-origin.
    Upgrade {
        /// Skip service restarts (unit is administratively paused).
        #[arg(long, default_value_t = false)]
        paused: bool,
    },
    /// Import SSH known_hosts and authorized_keys from the relation snapshot.
    ImportKeys {
        /// Relation key prefix for the indexed lists.
        #[arg(long)]
        prefix: Option<String>,
        /// User whose keys are being managed.
        #[arg(long, default_value = "root")]
        user: String,
    },
    /// Install the CA certificate advertised by the identity service.
    ImportCa,
    /// Generate an SSH keypair for a user if one is missing.
    InitSsh {
        #[arg(long, default_value = "root")]
        user: String,
    },
    /// Ensure a libvirt secret exists with the given value.
    Secret {
        /// Secret UUID.
        #[arg(long)]
        uuid: String,
        /// Secret descriptor XML file.
        #[arg(long)]
        file: PathBuf,
        /// Base64 key material.
        #[arg(long)]
        key: String,
    },
    /// Destroy a libvirt network if it exists (best effort).
    NetDestroy {
        /// Network name, e.g. "default".
        name: String,
    },
    /// Prepare the host for LXD-backed compute (subuid map, daemon check).
    EnableLxd {
        /// Service user the container runtime is configured for.
        #[arg(long, default_value = "nova")]
        user: String,
    },
    /// Reserve hugepages per the configuration.
    Hugepages,
    /// Set the ppc64 SMT state ("off" or a thread count).
    Smt { state: String },
    /// Report the unit's workload status and component version.
    Status {
        /// Unit is administratively paused.
        #[arg(long, default_value_t = false)]
        paused: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions { shell: Shell },
}

fn main() -> ExitCode {
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
            tracing_subscriber::EnvFilter::try_from_env("STRATO_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(
            *shell,
            &mut Cli::command(),
            "strato",
            &mut std::io::stdout(),
        );
        return ExitCode::SUCCESS;
    }

    let runner = SystemRunner;
    let json = cli.json;

    let result = match &cli.command {
        Commands::Resolve => {
            AgentContext::load(&runner, &cli.config, &cli.relations)
                .and_then(|ctx| commands::resolve::run(&ctx, json))
        }
        Commands::Services => {
            AgentContext::load(&runner, &cli.config, &cli.relations)
                .and_then(|ctx| commands::services::run(&ctx, json))
        }
        Commands::Packages => {
            AgentContext::load(&runner, &cli.config, &cli.relations)
                .and_then(|ctx| commands::packages::run(&ctx, json))
        }
        Commands::Render { root } => AgentContext::load(&runner, &cli.config, &cli.relations)
            .and_then(|ctx| commands::render::run(&ctx, &cli.templates, root, json)),
        Commands::Upgrade { paused } => {
            AgentContext::load(&runner, &cli.config, &cli.relations).and_then(|ctx| {
                commands::upgrade::run(&runner, &ctx, &cli.templates, *paused, json)
            })
        }
        Commands::ImportKeys { prefix, user } => {
            AgentContext::load(&runner, &cli.config, &cli.relations)
                .and_then(|ctx| commands::import_keys::run(&runner, &ctx, prefix.as_deref(), user))
        }
        Commands::ImportCa => AgentContext::load(&runner, &cli.config, &cli.relations)
            .and_then(|ctx| commands::import_ca::run(&runner, &ctx)),
        Commands::InitSsh { user } => commands::init_ssh::run(&runner, user),
        Commands::Secret { uuid, file, key } => {
            AgentContext::load(&runner, &cli.config, &cli.relations)
                .and_then(|ctx| commands::secret::run(&runner, &ctx, uuid, file, key))
        }
        Commands::NetDestroy { name } => {
            AgentContext::load(&runner, &cli.config, &cli.relations)
                .and_then(|ctx| commands::net_destroy::run(&runner, &ctx, name))
        }
        Commands::EnableLxd { user } => AgentContext::load(&runner, &cli.config, &cli.relations)
            .and_then(|ctx| commands::enable_lxd::run(&runner, &ctx, user)),
        Commands::Hugepages => AgentContext::load(&runner, &cli.config, &cli.relations)
            .and_then(|ctx| commands::hugepages::run(&runner, &ctx)),
        Commands::Smt { state } => commands::smt::run(&runner, state),
        Commands::Status { paused } => {
            AgentContext::load(&runner, &cli.config, &cli.relations)
                .and_then(|ctx| commands::status::run(&runner, &ctx, *paused, json))
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

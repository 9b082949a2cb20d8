use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use warden_cli::commands::{self, DeleteTarget};
use warden_cli::{build_engine, default_data_dir, server, show, tenants, CliCategory};
use warden_core::Operation;
use warden_infra::FileTenantRegistry;
use warden_persistence::RedbStore;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    /// JSON-RPC base URL of the remote API
    #[arg(long, global = true, env = "WARDEN_API_URL", default_value = warden_config::DEFAULT_API_URL)]
    api_url: String,
    /// Directory holding the local store
    #[arg(long, global = true, env = "WARDEN_DATA_DIR")]
    data_dir: Option<Utf8PathBuf>,
    /// Tenant registry file
    #[arg(long, global = true, env = "WARDEN_TENANTS_FILE")]
    tenants_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tenants (API keys)
    Tenant {
        #[command(subcommand)]
        command: TenantCommands,
    },
    /// Run one sync pass for a tenant
    Sync {
        tenant: String,
        #[arg(long, help = "Ignore staleness and run every operation")]
        force: bool,
        #[arg(long, help = "Keep going after a failed operation")]
        continue_on_error: bool,
    },
    /// Show checkpoints and due times
    Status { tenant: String },
    /// Forget every checkpoint of a tenant
    #[command(name = "clear-history")]
    ClearHistory { tenant: String },
    /// Print the stored rows of one category
    Show {
        tenant: String,
        /// Category name, e.g. endpoints or installation-links
        category: Operation,
        #[arg(long)]
        include_deleted: bool,
    },
    /// Delete an object remotely and drop its local row
    Delete {
        #[command(subcommand)]
        command: DeleteCommands,
    },
    /// Serve the HTTP sync trigger
    Serve {
        #[arg(long, env = "WARDEN_BIND", default_value = warden_config::DEFAULT_BIND_ADDR)]
        bind: String,
    },
}

#[derive(Subcommand)]
enum TenantCommands {
    List,
    Add {
        #[arg(long, help = "Unique id; also the apiKeyId of the HTTP trigger")]
        id: String,
        name: String,
        #[arg(long, env = "WARDEN_API_KEY", hide_env_values = true)]
        token: String,
        #[arg(long, value_enum, default_value_t = CliCategory::FullService)]
        category: CliCategory,
        #[arg(long)]
        inactive: bool,
    },
    Remove {
        id: String,
    },
    Activate {
        id: String,
    },
    Deactivate {
        id: String,
    },
}

#[derive(Subcommand)]
enum DeleteCommands {
    Group { tenant: String, id: String },
    Package { tenant: String, id: String },
}

fn init_tracing(verbose: bool, serving: bool) {
    let default = match (verbose, serving) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Token cancelled by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping at the next operation boundary");
            trigger.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, matches!(cli.command, Commands::Serve { .. }));

    let registry = match &cli.tenants_file {
        Some(path) => FileTenantRegistry::new(path.clone()),
        None => FileTenantRegistry::default_location()?,
    };
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => default_data_dir()?,
    };

    match cli.command {
        Commands::Tenant { command } => match command {
            TenantCommands::List => {
                tenants::handle_list(&registry)?;
            }
            TenantCommands::Add {
                id,
                name,
                token,
                category,
                inactive,
            } => {
                tenants::handle_add(&registry, id, name, token, category.into(), inactive)?;
            }
            TenantCommands::Remove { id } => tenants::handle_remove(&registry, &id)?,
            TenantCommands::Activate { id } => tenants::handle_set_active(&registry, &id, true)?,
            TenantCommands::Deactivate { id } => {
                tenants::handle_set_active(&registry, &id, false)?
            }
        },
        Commands::Sync {
            tenant,
            force,
            continue_on_error,
        } => {
            let engine = build_engine(&cli.api_url, registry, &data_dir)?;
            let cancel = cancel_on_ctrl_c();
            commands::cmd_sync(&engine, &tenant, force, continue_on_error, &cancel).await?;
        }
        Commands::Status { tenant } => {
            let engine = build_engine(&cli.api_url, registry, &data_dir)?;
            commands::cmd_status(&engine, &tenant).await?;
        }
        Commands::ClearHistory { tenant } => {
            let engine = build_engine(&cli.api_url, registry, &data_dir)?;
            commands::cmd_clear_history(&engine, &tenant).await?;
        }
        Commands::Show {
            tenant,
            category,
            include_deleted,
        } => {
            let store = RedbStore::open_in(&data_dir)
                .with_context(|| format!("Failed to open local store in {data_dir}"))?;
            show::cmd_show(&store, &tenant, category, include_deleted, true).await?;
        }
        Commands::Delete { command } => {
            let engine = build_engine(&cli.api_url, registry, &data_dir)?;
            let cancel = cancel_on_ctrl_c();
            let (tenant, target) = match command {
                DeleteCommands::Group { tenant, id } => (tenant, DeleteTarget::Group(id)),
                DeleteCommands::Package { tenant, id } => (tenant, DeleteTarget::Package(id)),
            };
            commands::cmd_delete(&engine, &tenant, target, &cancel).await?;
        }
        Commands::Serve { bind } => {
            let engine = Arc::new(build_engine(&cli.api_url, registry, &data_dir)?);
            let listener = TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {bind}"))?;
            let shutdown = cancel_on_ctrl_c();
            server::serve(listener, engine, shutdown).await?;
        }
    }

    Ok(())
}

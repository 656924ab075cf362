//! crdform CLI - Kubernetes custom resources as typed, schema-checked resources

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod display;
mod error;
mod exit_codes;

use commands::schema::{SchemaFormat, VariantArg};
use context::{Context, ProviderArgs};
use error::Result;

#[derive(Parser)]
#[command(name = "crdform")]
#[command(version)]
#[command(about = "Manage Kubernetes custom resources through typed, schema-checked resource types", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered resource types
    Types {
        /// Also list the manifest type names
        #[arg(long)]
        manifests: bool,
    },

    /// Show the attribute schema of a resource type
    Schema {
        /// Type name (`<type>_manifest` selects the manifest variant)
        type_name: String,

        /// Schema variant
        #[arg(long, value_enum, default_value = "resource")]
        variant: VariantArg,

        /// Output format
        #[arg(long, value_enum, default_value = "tree")]
        format: SchemaFormat,
    },

    /// Check that every registered schema is internally consistent
    Check,

    /// Validate plan files without contacting a cluster
    Validate {
        /// Plan file(s)
        #[arg(required = true)]
        plans: Vec<PathBuf>,
    },

    /// Render plan files as Kubernetes manifests
    Render {
        /// Plan file(s)
        #[arg(required = true)]
        plans: Vec<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create or update a resource with server-side apply
    Apply {
        /// Plan file
        plan: PathBuf,

        /// State file (default: <plan>.state.yaml)
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Re-read a tracked resource from the cluster
    Refresh {
        /// State file
        state: PathBuf,
    },

    /// Read an object through its data source
    Get {
        /// Type name
        type_name: String,

        /// <namespace>/<name>, or <name> for cluster-scoped kinds
        id: String,
    },

    /// Delete a tracked resource
    Delete {
        /// State file
        state: PathBuf,

        /// Keep the state file after deleting
        #[arg(long)]
        keep_state: bool,
    },

    /// Start tracking an existing object
    Import {
        /// Type name
        type_name: String,

        /// <namespace>/<name>, or <name> for cluster-scoped kinds
        id: String,

        /// State file to write (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate resource type definitions from CRD manifests
    Generate {
        /// CRD file(s)
        #[arg(required = true, value_name = "CRD_FILE")]
        crd_files: Vec<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("CRDFORM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = Context::load(&cli.provider)?;
    match cli.command {
        Commands::Types { manifests } => commands::types::run(&ctx, manifests),
        Commands::Schema {
            type_name,
            variant,
            format,
        } => commands::schema::run(&ctx, &type_name, variant, format),
        Commands::Check => commands::check::run(&ctx),
        Commands::Validate { plans } => commands::validate::run(&ctx, &plans),
        Commands::Render { plans, output } => {
            commands::render::run(&ctx, &plans, output.as_deref())
        }
        Commands::Apply { plan, state } => {
            commands::apply::run(&ctx, &plan, state.as_deref()).await
        }
        Commands::Refresh { state } => commands::refresh::run(&ctx, &state).await,
        Commands::Get { type_name, id } => commands::get::run(&ctx, &type_name, &id).await,
        Commands::Delete { state, keep_state } => {
            commands::delete::run(&ctx, &state, keep_state).await
        }
        Commands::Import {
            type_name,
            id,
            output,
        } => commands::import::run(&ctx, &type_name, &id, output.as_deref()).await,
        Commands::Generate { crd_files, output } => {
            commands::generate::run(&crd_files, output.as_deref())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::resource::Kind;

#[derive(Parser)]
#[command(name = "devhub")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Declaratively manage devhub workflows, dashboards, databases and workspaces",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Declarations file (default: ./devhub.toml, then the config directory)
    #[arg(short, long, global = true, env = "DEVHUB_FILE")]
    pub file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show drift and what apply would change
    Plan(TargetArgs),

    /// Create, update and delete remote objects to match the declarations
    Apply(ApplyArgs),

    /// Re-read tracked objects and record what the remote holds
    Refresh(TargetArgs),

    /// Start tracking an existing remote object
    Import(ImportArgs),

    /// Delete tracked remote objects
    Destroy(DestroyArgs),

    /// Look up users and roles
    #[command(subcommand)]
    Lookup(LookupCommand),

    /// Print schema declarations as JSON
    Schema {
        /// Only this kind
        #[arg(value_enum)]
        kind: Option<Kind>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Only this kind or address (e.g. `database`, `devhub_workflow.deploy`)
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only this kind or address
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Number of resources to reconcile in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Skip the confirmation before deletes
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Resource kind
    #[arg(value_enum)]
    pub kind: Kind,

    /// Local name; the instance address becomes `<type>.<name>`
    pub name: String,

    /// Remote identifier
    pub id: String,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only this kind or address
    pub target: Option<String>,

    /// Skip the confirmation
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Lookup Commands
// ============================================================================

#[derive(Subcommand)]
pub enum LookupCommand {
    /// Find a user by email or name
    User {
        /// Email address
        #[arg(short, long, required_unless_present = "name")]
        email: Option<String>,

        /// Display name (wins over --email)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Find a role by name
    Role {
        /// Role name
        name: String,
    },
}

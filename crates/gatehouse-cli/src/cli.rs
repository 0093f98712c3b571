//! Operator CLI for the Gatehouse user directory.
//!
//! # Usage
//!
//! ```bash
//! # Create the snapshot
//! gatehouse init --store data/users.json
//!
//! # Add a user with a card
//! gatehouse add -u alice -e a@x.com -p 's3cret!!' --phone 555 -d ops --card-uid 04A1B2C3
//!
//! # Check credentials
//! gatehouse login alice -p 's3cret!!'
//!
//! # Move a user and disable them
//! gatehouse update 1 -d eng --active false
//!
//! # Ask what a reader would answer for a card
//! gatehouse verify 04A1B2C3
//! ```
//!
//! Every command prints JSON on stdout. Password hashes never appear in it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gatehouse_core::constants::{
    DEFAULT_HASH_ITERATIONS, DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_PARALLELISM,
    DEFAULT_SNAPSHOT_PATH,
};
use gatehouse_core::{Role, UserId};
use gatehouse_storage::{
    CardVerdict, CardVerifier, CredentialHasher, ErrorKind, HashConfig, IdentityService,
    JsonFileStore, NewUser, StorageError, StoreConfig, UserPatch,
};
use serde_json::{Value, json};
use tracing::debug;

/// Gatehouse user directory CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gatehouse",
    version,
    about = "Manage the Gatehouse user directory",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Path to the JSON user snapshot.
    #[arg(long, global = true, env = "GATEHOUSE_STORE", default_value = DEFAULT_SNAPSHOT_PATH)]
    pub store: PathBuf,

    /// Argon2id memory cost in KiB for new password hashes.
    #[arg(long, global = true, default_value_t = DEFAULT_HASH_MEMORY_KIB)]
    pub hash_memory_kib: u32,

    /// Argon2id time cost for new password hashes.
    #[arg(long, global = true, default_value_t = DEFAULT_HASH_ITERATIONS)]
    pub hash_iterations: u32,

    /// Argon2id lanes for new password hashes.
    #[arg(long, global = true, default_value_t = DEFAULT_HASH_PARALLELISM)]
    pub hash_parallelism: u32,
}

impl GlobalOptions {
    fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.store)
    }

    fn hash_config(&self) -> HashConfig {
        HashConfig::default()
            .memory_kib(self.hash_memory_kib)
            .iterations(self.hash_iterations)
            .parallelism(self.hash_parallelism)
    }
}

/// Directory subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create the snapshot if it does not exist and check that it parses.
    Init,

    /// Add a new user.
    Add {
        /// Login name.
        #[arg(short, long)]
        username: String,

        /// Email address, also accepted at login.
        #[arg(short, long)]
        email: String,

        /// Initial password.
        #[arg(short, long)]
        password: String,

        /// Contact phone.
        #[arg(long)]
        phone: String,

        /// Department.
        #[arg(short, long)]
        department: String,

        /// Role (admin, gatekeeper, standard-user).
        #[arg(short, long)]
        role: Option<Role>,

        /// Raw card UID to enroll.
        #[arg(long)]
        card_uid: Option<String>,

        /// Create the user disabled.
        #[arg(long)]
        inactive: bool,
    },

    /// List all users.
    List,

    /// Show one user.
    Show {
        /// User id.
        id: UserId,
    },

    /// Check a username or email against a password.
    Login {
        /// Username or email.
        identifier: String,

        /// Password to check.
        #[arg(short, long)]
        password: String,
    },

    /// Update user fields.
    Update {
        /// User id.
        id: UserId,

        /// New password.
        #[arg(short, long)]
        password: Option<String>,

        /// New email.
        #[arg(short, long)]
        email: Option<String>,

        /// New phone.
        #[arg(long)]
        phone: Option<String>,

        /// New department.
        #[arg(short, long)]
        department: Option<String>,

        /// New username.
        #[arg(short, long)]
        username: Option<String>,

        /// New raw card UID; an empty value clears the enrollment.
        #[arg(long)]
        card_uid: Option<String>,

        /// New role.
        #[arg(short, long)]
        role: Option<Role>,

        /// Enable or disable the user.
        #[arg(long)]
        active: Option<bool>,
    },

    /// Remove a user.
    Remove {
        /// User id.
        id: UserId,
    },

    /// Resolve a card UID the way a reader would.
    Verify {
        /// Raw card UID.
        uid: String,
    },
}

/// Result of a successful command.
#[derive(Debug)]
pub struct Report {
    /// JSON printed on stdout.
    pub output: Value,

    /// False when the command ran but the outcome is a failure,
    /// as for an `ERROR` verdict.
    pub success: bool,
}

impl Report {
    fn ok(output: Value) -> Self {
        Self {
            output,
            success: true,
        }
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<Report> {
    let store = JsonFileStore::open(cli.options.store_config())
        .await
        .with_context(|| format!("opening {}", cli.options.store.display()))?;

    let hasher = CredentialHasher::new(cli.options.hash_config())?;
    let directory = Arc::new(IdentityService::new(store, hasher));
    debug!("Running {}", command_name(&cli.command));

    let output = match cli.command {
        Commands::Init => json!({
            "snapshot": directory.store().path().display().to_string(),
            "users": directory.list().await?.len(),
        }),
        Commands::Add {
            username,
            email,
            password,
            phone,
            department,
            role,
            card_uid,
            inactive,
        } => {
            let mut input = NewUser::new(username, email, password, phone, department)
                .with_active(!inactive);
            input.role = role;
            input.card_uid = card_uid;
            serde_json::to_value(directory.create(input).await?)?
        }
        Commands::List => serde_json::to_value(directory.list().await?)?,
        Commands::Show { id } => serde_json::to_value(directory.find_by_id(id).await?)?,
        Commands::Login {
            identifier,
            password,
        } => serde_json::to_value(directory.login(&identifier, &password).await?)?,
        Commands::Update {
            id,
            password,
            email,
            phone,
            department,
            username,
            card_uid,
            role,
            active,
        } => {
            let patch = UserPatch {
                password,
                email,
                phone,
                department,
                username,
                card_uid,
                role,
                active,
            };
            serde_json::to_value(directory.update(id, patch).await?)?
        }
        Commands::Remove { id } => serde_json::to_value(directory.delete(id).await?)?,
        Commands::Verify { uid } => {
            let verdict = CardVerifier::new(Arc::clone(&directory))
                .verify_card(&uid)
                .await?;
            let success = !matches!(verdict, CardVerdict::Error { .. });
            return Ok(Report {
                output: serde_json::to_value(verdict)?,
                success,
            });
        }
    };

    Ok(Report::ok(output))
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init => "init",
        Commands::Add { .. } => "add",
        Commands::List => "list",
        Commands::Show { .. } => "show",
        Commands::Login { .. } => "login",
        Commands::Update { .. } => "update",
        Commands::Remove { .. } => "remove",
        Commands::Verify { .. } => "verify",
    }
}

/// Process exit status for a failed command.
///
/// 2 validation or conflict, 3 authentication, 4 not found,
/// 1 for store failures and anything unexpected.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match storage_error(err).map(StorageError::kind) {
        Some(ErrorKind::Validation | ErrorKind::Conflict) => 2,
        Some(ErrorKind::Auth) => 3,
        Some(ErrorKind::NotFound) => 4,
        Some(ErrorKind::Store | ErrorKind::Internal) | None => 1,
    }
}

/// Text shown to the operator for a failed command.
///
/// Caller errors are shown as-is; store and internal failures get a generic
/// line and their detail goes to the log.
pub fn error_message(err: &anyhow::Error) -> String {
    match storage_error(err) {
        Some(e) if e.kind().is_caller_error() => e.to_string(),
        _ => "the user directory is unavailable (see log for details)".to_string(),
    }
}

fn storage_error(err: &anyhow::Error) -> Option<&StorageError> {
    err.chain().find_map(|cause| cause.downcast_ref::<StorageError>())
}

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use lockbox_core::countdown::{format_delay, format_remaining, TimeRemaining};
use lockbox_core::{countdown_target, paths, resolve_status, CreateLockbox, LocalStore, Lockbox, UpdateLockbox};
use lockbox_engine::{Authenticator, Session, SessionConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser)]
#[command(name = "lockbox")]
#[command(about = "Time-delayed disclosure vault", long_about = None)]
struct Cli {
    /// Override the store file location.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the master password for a new store
    Init,

    /// List entries with their derived status
    List {
        /// Substring match on name or category
        #[arg(short, long, default_value = "")]
        search: String,

        /// Exact category, or "__uncategorized__" for entries without one
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show one entry; prints the content while it is unlocked
    Show { id: i64 },

    /// Create a new entry (content is prompted, not passed on the command line)
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        category: Option<String>,

        /// Seconds between an unlock request and the content opening
        #[arg(long, default_value = "60")]
        unlock_delay: i64,

        /// Seconds the content stays open before relocking
        #[arg(long, default_value = "3600")]
        relock_delay: i64,
    },

    /// Update fields of an existing entry
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        /// Prompt for replacement content
        #[arg(long)]
        content: bool,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        unlock_delay: Option<i64>,

        #[arg(long)]
        relock_delay: Option<i64>,
    },

    /// Delete an entry
    Delete { id: i64 },

    /// Request an unlock; the content opens after the configured delay
    Unlock { id: i64 },

    /// Relock an entry immediately
    Relock { id: i64 },

    /// Follow all entries live until interrupted
    Watch,

    /// Write every entry (content sealed) as a JSON blob
    Export {
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import entries from an exported blob, skipping existing names
    Import { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store_path = match &cli.store {
        Some(path) => path.clone(),
        None => paths::store_path()?,
    };
    let store = Arc::new(LocalStore::open(&store_path)?);
    let auth = Authenticator::new(store.clone(), SessionConfig::default());

    if let Commands::Init = cli.command {
        return init_command(&auth).await;
    }

    if !auth.is_master_password_set().await? {
        return Err(anyhow!("no master password set; run `lockbox init` first"));
    }
    let password = rpassword::prompt_password("Master password: ")?;
    let session = auth.login(&password).await?;

    let result = run_command(cli.command, &session).await;
    session.logout().await;
    result
}

async fn init_command(auth: &Authenticator) -> Result<()> {
    if auth.is_master_password_set().await? {
        return Err(anyhow!("master password already set"));
    }
    let password = rpassword::prompt_password("Create master password: ")?;
    let confirm = rpassword::prompt_password("Confirm master password: ")?;
    let session = auth.set_master_password(&password, &confirm).await?;
    session.logout().await;
    println!("Store initialized.");
    Ok(())
}

async fn run_command(command: Commands, session: &Session) -> Result<()> {
    match command {
        Commands::Init => unreachable!("handled before login"),

        Commands::List { search, category } => {
            let entries = session.filtered(&search, category.as_deref());
            if entries.is_empty() {
                println!("No entries.");
                return Ok(());
            }
            for entry in &entries {
                println!("{}", describe(entry));
            }
            Ok(())
        }

        Commands::Show { id } => {
            let entry = session
                .fetch_decrypted(id)
                .await
                .ok_or_else(|| anyhow!(session
                    .last_error()
                    .unwrap_or_else(|| format!("no entry with id {id}"))))?;
            let now = chrono::Utc::now().timestamp_millis();
            println!("{}", describe(&entry));
            println!(
                "  delays: unlock {}, relock {}",
                format_delay(entry.unlock_delay_seconds),
                format_delay(entry.relock_delay_seconds)
            );
            if resolve_status(&entry, now) == lockbox_core::LockboxStatus::Unlocked {
                println!("  content: {}", entry.content);
            } else {
                println!("  content: (sealed)");
            }
            Ok(())
        }

        Commands::Create {
            name,
            category,
            unlock_delay,
            relock_delay,
        } => {
            let content = rpassword::prompt_password("Content: ")?;
            let entry = session
                .create(CreateLockbox {
                    name,
                    content,
                    category,
                    unlock_delay_seconds: unlock_delay,
                    relock_delay_seconds: relock_delay,
                })
                .await?;
            println!("Created #{} {}", entry.id, entry.name);
            Ok(())
        }

        Commands::Update {
            id,
            name,
            content,
            category,
            unlock_delay,
            relock_delay,
        } => {
            let content = if content {
                Some(rpassword::prompt_password("New content: ")?)
            } else {
                None
            };
            let entry = session
                .update(
                    id,
                    UpdateLockbox {
                        name,
                        content,
                        category,
                        unlock_delay_seconds: unlock_delay,
                        relock_delay_seconds: relock_delay,
                    },
                )
                .await?;
            println!("Updated #{} {}", entry.id, entry.name);
            Ok(())
        }

        Commands::Delete { id } => {
            session.delete(id).await?;
            println!("Deleted #{id}");
            Ok(())
        }

        Commands::Unlock { id } => {
            let entry = session.unlock(id).await?;
            match entry.unlock_timestamp {
                Some(ts) => {
                    let now = chrono::Utc::now().timestamp_millis();
                    let remaining = TimeRemaining::until(ts, now);
                    println!(
                        "Unlock requested; opens in {}",
                        format_remaining(Some(&remaining))
                    );
                }
                None => println!("Unlock requested."),
            }
            Ok(())
        }

        Commands::Relock { id } => {
            let entry = session.relock(id).await?;
            println!("Relocked #{} {}", entry.id, entry.name);
            Ok(())
        }

        Commands::Watch => watch(session).await,

        Commands::Export { out } => {
            let blob = session.export_all().await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, blob)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{blob}"),
            }
            Ok(())
        }

        Commands::Import { path } => {
            let blob = std::fs::read_to_string(&path)?;
            let imported = session.import_all(&blob).await?;
            if imported.is_empty() {
                println!("Nothing imported (all names already present).");
            } else {
                println!("Imported: {}", imported.join(", "));
            }
            Ok(())
        }
    }
}

/// Follow every entry, reprinting on each tick until ctrl-c. The reconcile
/// loop keeps the snapshot current in the background.
async fn watch(session: &Session) -> Result<()> {
    let mut ticker = tokio::time::interval(session.config().countdown_interval);
    println!("Watching (ctrl-c to stop)...");
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!();
                return Ok(());
            }
            _ = ticker.tick() => {
                let entries = session.snapshot();
                if entries.is_empty() {
                    println!("(no entries)");
                    continue;
                }
                for entry in &entries {
                    println!("{}", describe(entry));
                }
                println!("---");
            }
        }
    }
}

fn describe(entry: &Lockbox) -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let status = resolve_status(entry, now);
    let category = entry.category.as_deref().unwrap_or("uncategorized");
    match countdown_target(entry, now) {
        Some(target) => {
            let remaining = TimeRemaining::until(target, now);
            format!(
                "#{:<4} {:<24} [{}] {} ({} remaining)",
                entry.id,
                entry.name,
                category,
                status,
                format_remaining(Some(&remaining))
            )
        }
        None => format!("#{:<4} {:<24} [{}] {}", entry.id, entry.name, category, status),
    }
}


//! chatdoc - local conversation store maintenance

use anyhow::{bail, Context};
use chatdoc_store::{
    export_file_name, expiry_notice, relative_day, ChatStore, Clock, CredentialBundle,
    EntryPatch, Role, SystemClock, WriteOutcome,
};
use clap::Parser;
use colored::Colorize;
use secrecy::ExposeSecret;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

use commands::{ApiUrlCommands, ByokCommands, Cli, Commands, ConfigCommands};
use config::CliConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config_file.as_deref()).with_data_dir(cli.data_dir.clone());
    if !config.colors {
        colored::control::set_override(false);
    }

    let store = ChatStore::open(&config.store);
    let clock = SystemClock;

    let result = match &cli.command {
        Commands::List => run_list(&store, &clock),
        Commands::Show { id } => run_show(&store, id),
        Commands::Rename { id, label } => run_rename(&store, id, label),
        Commands::Remove { id } => run_remove(&store, id),
        Commands::Export { output } => run_export(&store, &clock, output.as_deref()),
        Commands::Import { file } => run_import(&store, file),
        Commands::Sweep => run_sweep(&store, &clock),
        Commands::Expired => {
            println!("{}", store.records.expired_count(clock.today()));
            Ok(())
        }
        Commands::Compose { id, question } => run_compose(&store, id, question),
        Commands::Byok { command } => run_byok(&store, command),
        Commands::ApiUrl { command } => run_api_url(&store, command),
        Commands::Watch => run_watch(&store).await,
        Commands::Config { command } => run_config(&cli, &config, command),
    };

    if let Err(e) = result {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn ensure_durable(outcome: WriteOutcome, what: &str) -> anyhow::Result<()> {
    if outcome.is_durable() {
        Ok(())
    } else {
        bail!("{what} could not be saved; the previous state is unchanged")
    }
}

fn run_list(store: &ChatStore, clock: &dyn Clock) -> anyhow::Result<()> {
    let entries = store.records.list();
    if entries.is_empty() {
        println!("{}", "No conversations yet.".dimmed());
        return Ok(());
    }

    let today = clock.today();
    for entry in &entries {
        let badge = if entry.is_protected() {
            " BYOK".green().bold().to_string()
        } else {
            String::new()
        };
        println!(
            "{}  {}{}",
            entry.id().yellow(),
            entry.label().bold(),
            badge
        );

        let mut details = format!(
            "    {} · {} messages",
            relative_day(entry.created_at(), today),
            entry.turns().len()
        );
        if let Some(notice) = expiry_notice(entry, today) {
            details.push_str(&format!(" · {}", notice.yellow()));
        }
        println!("{}", details.dimmed());
    }

    Ok(())
}

fn run_show(store: &ChatStore, id: &str) -> anyhow::Result<()> {
    let Some(entry) = store.records.get(id) else {
        bail!("no conversation with id '{id}'");
    };

    println!("{} {}", "Conversation:".cyan().bold(), entry.label().yellow());
    println!("{}", "─".repeat(50).dimmed());
    println!("{}: {}", "Id".cyan(), entry.id());
    println!("{}: {}", "Uploaded".cyan(), entry.created_at().to_rfc3339());
    println!(
        "{}: {}",
        "Protected".cyan(),
        if entry.is_protected() { "yes" } else { "no" }
    );
    println!("{}", "─".repeat(50).dimmed());

    for message in entry.turns() {
        let role = match message.role {
            Role::User => message.role.label().green(),
            Role::Assistant => message.role.label().blue(),
        };
        println!("{}: {}", role.bold(), message.text);
        println!();
    }

    Ok(())
}

fn run_rename(store: &ChatStore, id: &str, label: &str) -> anyhow::Result<()> {
    if store.records.get(id).is_none() {
        bail!("no conversation with id '{id}'");
    }
    ensure_durable(store.records.update(id, EntryPatch::label(label)), "Rename")?;
    println!("{} {}", "Renamed".green(), id);
    Ok(())
}

fn run_remove(store: &ChatStore, id: &str) -> anyhow::Result<()> {
    match store.records.remove(id) {
        WriteOutcome::Written => println!("{} {}", "Removed".green(), id),
        WriteOutcome::Unchanged => println!("{}", format!("No conversation with id '{id}'").dimmed()),
        WriteOutcome::NotDurable => ensure_durable(WriteOutcome::NotDurable, "Removal")?,
    }
    Ok(())
}

fn run_export(store: &ChatStore, clock: &dyn Clock, output: Option<&Path>) -> anyhow::Result<()> {
    let exported = store.records.export()?;

    let Some(output) = output else {
        println!("{exported}");
        return Ok(());
    };

    let path = if output.is_dir() {
        output.join(export_file_name(clock.today()))
    } else {
        output.to_path_buf()
    };
    std::fs::write(&path, exported)
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!(
        "{} {} conversations to {}",
        "Exported".green(),
        store.records.list().len(),
        path.display()
    );
    Ok(())
}

fn run_import(store: &ChatStore, file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let count = store.records.import(&text)?;
    println!("{} {} conversations", "Imported".green(), count);
    Ok(())
}

fn run_sweep(store: &ChatStore, clock: &dyn Clock) -> anyhow::Result<()> {
    let result = store.records.sweep_expired(clock.today());
    ensure_durable(result.outcome, "Sweep")?;
    println!(
        "{} {} expired conversations ({} remaining)",
        "Removed".green(),
        result.removed,
        result.remaining
    );
    Ok(())
}

fn run_compose(store: &ChatStore, id: &str, question: &str) -> anyhow::Result<()> {
    let Some(entry) = store.records.get(id) else {
        bail!("no conversation with id '{id}'");
    };
    println!("{}", store.composer.compose(&entry, question));
    Ok(())
}

fn run_byok(store: &ChatStore, command: &ByokCommands) -> anyhow::Result<()> {
    match command {
        ByokCommands::Set {
            api_key,
            vector_store_uri,
            vector_store_token,
            collection,
        } => {
            let bundle =
                CredentialBundle::new(api_key, vector_store_uri, vector_store_token, collection);
            ensure_durable(store.vault.set(&bundle), "Credentials")?;
            println!("{}", "Credentials saved".green());
            if !bundle.is_complete() {
                println!(
                    "{}",
                    "Some fields are empty; new uploads will still expire at midnight.".yellow()
                );
            }
        }
        ByokCommands::Clear => {
            ensure_durable(store.vault.clear(), "Credentials")?;
            println!("{}", "Credentials cleared".green());
        }
        ByokCommands::Status => match store.vault.get() {
            Some(bundle) => {
                let state = if bundle.is_complete() {
                    "configured".green()
                } else {
                    "incomplete".yellow()
                };
                println!("{}: {}", "BYOK".cyan().bold(), state);
                println!("{}: {}", "API key".cyan(), mask(bundle.api_key.expose_secret()));
                println!("{}: {}", "Vector store".cyan(), bundle.vector_store_uri);
                println!("{}: {}", "Collection".cyan(), bundle.collection_name);
            }
            None => println!("{}: {}", "BYOK".cyan().bold(), "not configured".dimmed()),
        },
    }
    Ok(())
}

/// Keep only the last four characters visible.
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

fn run_api_url(store: &ChatStore, command: &ApiUrlCommands) -> anyhow::Result<()> {
    match command {
        ApiUrlCommands::Get => println!("{}", store.settings.api_base_url()),
        ApiUrlCommands::Set { url } => {
            if url.trim().is_empty() {
                bail!("API base URL must not be empty");
            }
            ensure_durable(store.settings.set_api_base_url(url), "API base URL")?;
            println!("{} {}", "API base URL set to".green(), store.settings.api_base_url());
        }
        ApiUrlCommands::Reset => {
            ensure_durable(store.settings.reset(), "API base URL")?;
            println!("{} {}", "API base URL reset to".green(), store.settings.api_base_url());
        }
    }
    Ok(())
}

async fn run_watch(store: &ChatStore) -> anyhow::Result<()> {
    let scheduler = store.scheduler(Arc::new(SystemClock));
    let mut reports = scheduler.subscribe();
    scheduler.start();

    println!("{}", "Watching for expired conversations (Ctrl-C to stop)".cyan());

    loop {
        tokio::select! {
            report = reports.recv() => match report {
                Ok(report) => println!(
                    "{} removed {}, {} remaining",
                    report.ran_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                    report.removed,
                    report.remaining
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "missed sweep reports");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    scheduler.stop().await;
    Ok(())
}

fn run_config(cli: &Cli, config: &CliConfig, command: &ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigCommands::Path => {
            let path = cli.config_file.clone().or_else(CliConfig::default_path);
            match path {
                Some(path) => println!("{}", path.display()),
                None => bail!("no configuration directory on this platform"),
            }
        }
    }
    Ok(())
}

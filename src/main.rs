use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hisoka::commands::{self, CommandRegistry};
use hisoka::config::{Config, Overrides};
use std::path::PathBuf;

/// hisoka -- WhatsApp command bot
#[derive(Parser, Debug)]
#[command(name = "hisoka", version, about)]
struct Cli {
    /// Config file (defaults to ~/.hisoka/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Phone number to pair with instead of scanning a QR code
    #[arg(long, global = true)]
    pairing_number: Option<String>,

    /// Listen address of the QR page
    #[arg(long, global = true)]
    qr_listen: Option<String>,

    /// Session database path
    #[arg(long, global = true)]
    session_db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to WhatsApp and serve commands (default)
    Run,

    /// List the registered chat commands
    Commands {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            pairing_number: self.pairing_number.clone(),
            qr_listen: self.qr_listen.clone(),
            session_db: self.session_db.clone(),
        }
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path, true)?,
            None => Config::load()?,
        };
        config.apply_overrides(self.overrides());
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Commands { json } => list_commands(json),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn list_commands(json: bool) -> Result<()> {
    let registry: CommandRegistry<()> =
        commands::builtin_registry().context("Failed to register commands")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry.summaries())?);
        return Ok(());
    }

    for tag in registry.tags() {
        println!("[{}]", if tag.is_empty() { "untagged" } else { tag });
        for command in registry.by_tag(tag) {
            println!(
                "  {:<12} aliases: {}{}",
                command.name(),
                command.alias_list().join(", "),
                if command.is_prefix_required() { "" } else { " (no prefix)" },
            );
        }
    }
    Ok(())
}

#[cfg(feature = "whatsapp")]
async fn run(config: Config) -> Result<()> {
    use hisoka::commands::Dispatcher;
    use hisoka::whatsapp::{Client, WhatsAppAgent};
    use std::sync::Arc;

    let _guard = hisoka::logging::init(&config.logging)?;

    // Registration finishes before the dispatcher exists; a conflict stops startup.
    let registry: CommandRegistry<Client> =
        commands::builtin_registry().context("Failed to register commands")?;
    tracing::info!("Registered {} command(s)", registry.len());

    let dispatcher = Dispatcher::new(Arc::new(registry), config.bot.prefixes.clone());
    let agent = WhatsAppAgent::new(dispatcher, config.whatsapp, config.bot.allowed_phones);
    let mut handle = agent.start();

    tokio::select! {
        result = &mut handle => {
            result.context("WhatsApp agent panicked")??;
            tracing::info!("WhatsApp agent stopped");
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutting down");
            handle.abort();
        }
    }
    Ok(())
}

#[cfg(not(feature = "whatsapp"))]
async fn run(_config: Config) -> Result<()> {
    anyhow::bail!("hisoka was built without the `whatsapp` feature")
}

#[cfg(feature = "whatsapp")]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

//! # GuiasMEI Backend
//!
//! Fiscal assistant for Brazilian microentrepreneurs: GPS/INSS guides,
//! NFSe invoices and PIX charges, with WhatsApp notifications and a
//! conversational assistant.
//!
//! Usage:
//!   guiasmei                       # Start the HTTP gateway + notification worker
//!   guiasmei notifier              # Run only the notification worker
//!   guiasmei checkup               # Print the credential readiness report
//!   guiasmei chat "mensagem"       # Ask the assistant from the terminal

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use guiasmei_assistant::{AssistantClient, UserProfile};
use guiasmei_channels::TwilioWhatsApp;
use guiasmei_checkup::{BucketOutcome, BucketSetup, CredentialChecker, StorageBootstrap};
use guiasmei_core::config::GuiasMeiConfig;
use guiasmei_core::traits::{DeliveryChannel, NotificationStore};
use guiasmei_notifier::NotificationProcessor;
use guiasmei_store::SupabaseStore;

#[derive(Parser)]
#[command(
    name = "guiasmei",
    version,
    about = "💼 GuiasMEI: gestão fiscal para MEI e autônomos"
)]
struct Cli {
    /// Config file path (default: ~/.guiasmei/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway with the notification worker
    Serve,
    /// Run only the notification delivery worker
    Notifier,
    /// Check credentials and integrations, print the readiness report
    Checkup {
        /// Emit the report as JSON instead of the console format
        #[arg(long)]
        json: bool,
        /// Create missing Supabase Storage buckets before checking
        #[arg(long)]
        setup_storage: bool,
    },
    /// Ask the assistant a single question from the terminal
    Chat {
        /// Message for the assistant
        message: String,
        /// User profile: mei, autonomo, parceiro, admin
        #[arg(long, default_value = "default")]
        profile: String,
    },
}

fn load_config(path: Option<&str>) -> Result<GuiasMeiConfig> {
    let mut config = match path {
        Some(p) => {
            let expanded = shellexpand::tilde(p).to_string();
            GuiasMeiConfig::load_from(std::path::Path::new(&expanded))?
        }
        None => GuiasMeiConfig::load()?,
    };
    config.apply_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Notifier => run_notifier(config).await,
        Commands::Checkup { json, setup_storage } => {
            run_checkup(config, json, setup_storage).await
        }
        Commands::Chat { message, profile } => run_chat(config, &message, &profile).await,
    }
}

async fn serve(config: GuiasMeiConfig) -> Result<()> {
    println!("💼 GuiasMEI v{}", env!("CARGO_PKG_VERSION"));
    println!("   🌐 API:          http://{}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   📨 Notificações: {}",
        if config.notifier.enabled { "ativas" } else { "desativadas" }
    );
    println!();

    guiasmei_gateway::start(config).await
}

async fn run_notifier(config: GuiasMeiConfig) -> Result<()> {
    let store: Arc<dyn NotificationStore> = Arc::new(SupabaseStore::new(&config.supabase)?);
    let channel: Arc<dyn DeliveryChannel> = Arc::new(TwilioWhatsApp::new(config.twilio.clone()));

    let processor = NotificationProcessor::new(store, channel, &config.notifier);
    processor.run().await;
    Ok(())
}

async fn run_checkup(config: GuiasMeiConfig, json: bool, setup_storage: bool) -> Result<()> {
    // Buckets are created before the checks run, so the report below
    // already reflects them.
    let buckets = if setup_storage {
        Some(StorageBootstrap::new(&config.supabase)?.ensure_buckets().await)
    } else {
        None
    };

    let checker = CredentialChecker::new(&config);
    let report = checker.run_all().await;

    if json {
        let mut doc = serde_json::to_value(&report)?;
        if let Some(buckets) = &buckets {
            doc["storage_setup"] = serde_json::to_value(buckets)?;
        }
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        if let Some(buckets) = &buckets {
            print_storage_setup(buckets);
        }
        report.print_console();
    }
    Ok(())
}

fn print_storage_setup(buckets: &[BucketSetup]) {
    println!("{}", "=".repeat(80));
    println!("SETUP DE STORAGE - GuiasMEI");
    println!("{}", "=".repeat(80));
    for setup in buckets {
        match &setup.outcome {
            BucketOutcome::Created => println!("  ✓ Bucket '{}': criado", setup.bucket),
            BucketOutcome::AlreadyExists => println!("  ✓ Bucket '{}': já existe", setup.bucket),
            BucketOutcome::Failed(reason) => println!("  ✗ Bucket '{}': {reason}", setup.bucket),
        }
    }
    let ready = buckets.iter().filter(|b| b.ready()).count();
    println!();
    println!("Buckets prontos: {}/{}", ready, buckets.len());
    println!();
}

async fn run_chat(config: GuiasMeiConfig, message: &str, profile: &str) -> Result<()> {
    let assistant = AssistantClient::new(&config.llm);
    let profile = UserProfile::from_tag(profile);

    let reply = assistant
        .reply(profile, message, &serde_json::Value::Null)
        .await;
    println!("{reply}");
    Ok(())
}

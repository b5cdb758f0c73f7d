//! Pineapple Cart CLI - drive a Shopify cart from the terminal.
//!
//! The active cart ID is kept in `CART_ID_STORE_PATH` between runs, so
//! successive invocations act on the same cart. Every command prints the
//! resulting cart as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Show the current cart
//! cart-cli show
//!
//! # Add two units of a variant (creates the cart if needed)
//! cart-cli add gid://shopify/ProductVariant/123 -q 2
//!
//! # Change a line's quantity
//! cart-cli update gid://shopify/CartLine/abc -q 1
//!
//! # Apply a discount code
//! cart-cli discount SAVE10
//!
//! # Forget the stored cart
//! cart-cli forget
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use pineapple_cart::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(author, version, about = "Pineapple Cart CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current cart
    Show,
    /// Create a new cart, replacing the stored one
    Create {
        /// Cart note
        #[arg(long)]
        note: Option<String>,

        /// Buyer country (ISO 3166-1 alpha-2)
        #[arg(long)]
        country: Option<String>,
    },
    /// Add a line
    Add {
        /// Product variant ID
        merchandise_id: String,

        /// Quantity to add
        #[arg(short, long)]
        quantity: Option<i64>,
    },
    /// Update a line
    Update {
        /// Cart line ID
        line_id: String,

        /// New quantity
        #[arg(short, long)]
        quantity: Option<i64>,

        /// Swap to another product variant
        #[arg(short, long)]
        merchandise_id: Option<String>,
    },
    /// Remove lines
    Remove {
        /// Cart line IDs
        #[arg(required = true)]
        line_ids: Vec<String>,
    },
    /// Replace the cart note
    Note {
        /// New note
        note: String,
    },
    /// Update the buyer identity
    Buyer {
        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Country (ISO 3166-1 alpha-2)
        #[arg(long)]
        country: Option<String>,
    },
    /// Replace the cart attributes
    Attributes {
        /// Attributes as `key=value`
        attributes: Vec<String>,
    },
    /// Replace the discount codes
    Discount {
        /// Discount codes (none clears them)
        codes: Vec<String>,
    },
    /// Forget the stored cart ID
    Forget,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pineapple_cart=info,cart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    use commands::cart;

    match cli.command {
        Commands::Show => cart::show(config).await?,
        Commands::Create { note, country } => cart::create(config, note, country).await?,
        Commands::Add {
            merchandise_id,
            quantity,
        } => cart::add(config, merchandise_id, quantity).await?,
        Commands::Update {
            line_id,
            quantity,
            merchandise_id,
        } => cart::update(config, line_id, quantity, merchandise_id).await?,
        Commands::Remove { line_ids } => cart::remove(config, line_ids).await?,
        Commands::Note { note } => cart::note(config, note).await?,
        Commands::Buyer {
            email,
            phone,
            country,
        } => cart::buyer(config, email, phone, country).await?,
        Commands::Attributes { attributes } => cart::attributes(config, &attributes).await?,
        Commands::Discount { codes } => cart::discount(config, codes).await?,
        Commands::Forget => cart::forget(config)?,
    }
    Ok(())
}

//! PeelOJuice CLI - Order juice from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password is read from stdin)
//! pj login asha@example.com
//!
//! # Pick a branch and browse its menu
//! pj branches --select 2
//! pj menu
//!
//! # Fill the cart and check out
//! pj cart add 1 --quantity 3
//! pj cart coupon FRESH10
//! pj checkout --method cod
//! ```
//!
//! # Environment Variables
//!
//! - `PEELOJUICE_API_URL` - Backend origin (default `http://localhost:8000`)
//! - `PEELOJUICE_STATE_DIR` - Where the refresh token and branch are kept
//! - `SENTRY_DSN` - Optional error reporting

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use peelojuice_client::state::BootstrapError;
use peelojuice_client::{
    ApiError, ClientConfig, ClientError, ConfigError, SessionEvent, Storefront,
};
use peelojuice_core::{AddressId, BranchId, CategoryId, JuiceId, OrderFilter, OrderId, PaymentMethod};
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tokio::sync::broadcast::error::TryRecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod prompt;

use prompt::PromptGateway;

/// The storefront as driven by this binary.
pub type Shop = Storefront<peelojuice_client::ApiClient, PromptGateway>;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

// Direct adapter calls get the same classification as coordinator calls
impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        Self::Client(ClientError::from(err))
    }
}

#[derive(Parser)]
#[command(name = "pj")]
#[command(author, version, about = "PeelOJuice storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with an email address or phone number
    Login {
        /// Email address or 10-digit phone number
        identifier: String,
    },
    /// Log out and forget stored credentials
    Logout,
    /// Create an account
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        phone: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Verify an email address or phone number with its OTP
    Verify {
        #[command(subcommand)]
        target: commands::account::VerifyTarget,
    },
    /// Reset a forgotten password
    ResetPassword {
        /// Email address or phone number of the account
        identifier: String,
    },
    /// List branches, optionally selecting one
    Branches {
        /// Branch to deliver from
        #[arg(short, long)]
        select: Option<BranchId>,
    },
    /// List menu categories
    Categories,
    /// Show one juice
    Juice { id: JuiceId },
    /// Show the menu of the selected branch
    Menu {
        /// Only show one category
        #[arg(short, long)]
        category: Option<CategoryId>,
    },
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Manage delivery addresses
    Addresses {
        #[command(subcommand)]
        action: Option<AddressAction>,
    },
    /// Place an order for the current cart
    Checkout {
        /// `cod` or `online`
        #[arg(short, long, default_value = "cod")]
        method: PaymentMethod,
        /// Delivery address (defaults to the default address)
        #[arg(short, long)]
        address: Option<AddressId>,
    },
    /// Show order history
    Orders {
        #[command(subcommand)]
        action: Option<OrderAction>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a juice
    Add {
        juice: JuiceId,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Add one more of a juice already in the cart
    Increment { juice: JuiceId },
    /// Remove one of a juice; the line disappears at zero
    Decrement { juice: JuiceId },
    /// Remove a juice entirely
    Remove { juice: JuiceId },
    /// Apply a coupon code
    Coupon { code: String },
    /// Remove the applied coupon
    RemoveCoupon,
    /// Set cooking instructions for a juice
    Note { juice: JuiceId, instructions: String },
}

#[derive(Subcommand)]
enum AddressAction {
    /// Add an address (fields are prompted)
    Add {
        /// Make it the default address
        #[arg(long)]
        default: bool,
    },
    /// Edit an address (fields are prompted)
    Edit { id: AddressId },
    /// Make an address the default
    Default { id: AddressId },
    /// Delete an address
    Delete { id: AddressId },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List orders
    List {
        /// `ongoing`, `delivered` or `cancelled`
        #[arg(short, long)]
        status: Option<OrderFilter>,
    },
    /// Show one order
    Show { id: OrderId },
    /// Cancel a pending order
    Cancel { id: OrderId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Command failed: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "peelojuice_client=info,peelojuice_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CliError> {
    let shop: Shop = Storefront::bootstrap(config, PromptGateway).await?;
    let mut events = shop.session().subscribe();
    shop.start().await?;

    let result = dispatch(&shop, cli.command).await;

    if let Err(CliError::Client(e)) = &result {
        shop.report(e).await;
    }
    commands::print_toasts(&shop).await;

    loop {
        match events.try_recv() {
            Ok(SessionEvent::LoginRequired) => {
                println!("Your session has expired. Run `pj login` to continue.");
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    match result {
        // Already shown as a toast
        Err(CliError::Client(e)) if e.requires_login() => {
            println!("Run `pj login` first.");
            std::process::exit(1);
        }
        Err(CliError::Client(_)) => std::process::exit(1),
        other => other,
    }
}

async fn dispatch(shop: &Shop, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Login { identifier } => commands::account::login(shop, &identifier).await,
        Commands::Logout => commands::account::logout(shop).await,
        Commands::Register {
            email,
            phone,
            first_name,
            last_name,
        } => commands::account::register(shop, email, phone, first_name, last_name).await,
        Commands::Verify { target } => commands::account::verify(shop, target).await,
        Commands::ResetPassword { identifier } => {
            commands::account::reset_password(shop, &identifier).await
        }
        Commands::Branches { select } => commands::catalog::branches(shop, select).await,
        Commands::Categories => commands::catalog::categories(shop).await,
        Commands::Juice { id } => commands::catalog::juice(shop, id).await,
        Commands::Menu { category } => commands::catalog::menu(shop, category).await,
        Commands::Cart { action } => match action {
            None => commands::cart::show(shop).await,
            Some(CartAction::Add { juice, quantity }) => {
                commands::cart::add(shop, juice, quantity).await
            }
            Some(CartAction::Increment { juice }) => commands::cart::increment(shop, juice).await,
            Some(CartAction::Decrement { juice }) => commands::cart::decrement(shop, juice).await,
            Some(CartAction::Remove { juice }) => commands::cart::remove(shop, juice).await,
            Some(CartAction::Coupon { code }) => commands::cart::apply_coupon(shop, &code).await,
            Some(CartAction::RemoveCoupon) => commands::cart::remove_coupon(shop).await,
            Some(CartAction::Note {
                juice,
                instructions,
            }) => commands::cart::note(shop, juice, &instructions).await,
        },
        Commands::Addresses { action } => match action {
            None => commands::addresses::list(shop).await,
            Some(AddressAction::Add { default }) => commands::addresses::add(shop, default).await,
            Some(AddressAction::Edit { id }) => commands::addresses::edit(shop, id).await,
            Some(AddressAction::Default { id }) => commands::addresses::set_default(shop, id).await,
            Some(AddressAction::Delete { id }) => commands::addresses::delete(shop, id).await,
        },
        Commands::Checkout { method, address } => {
            commands::checkout::checkout(shop, method, address).await
        }
        Commands::Orders { action } => match action {
            None => commands::orders::list(shop, None).await,
            Some(OrderAction::List { status }) => commands::orders::list(shop, status).await,
            Some(OrderAction::Show { id }) => commands::orders::show(shop, id).await,
            Some(OrderAction::Cancel { id }) => commands::orders::cancel(shop, id).await,
        },
    }
}

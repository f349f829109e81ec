/**
 * cardkeep Command Line Entry Point
 *
 * Drives the catalog client from a terminal: account commands, catalog
 * browsing and wishlist/collection management. Results are printed as
 * pretty JSON on stdout; logs go to stderr.
 */

use cardkeep::client::{CardClient, CardQuery, Config, MembershipTarget, WishlistFilter};
use cardkeep::shared::{CardId, ClientError, MembershipId, MembershipSet, SetId};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "cardkeep", about = "Browse the card catalog and manage your wishlist and collection", version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "CARDKEEP_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CARDKEEP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CARDKEEP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the session
    Logout,
    /// Show the current user
    Me,
    /// Show email and list sizes
    Profile,
    /// List catalog sets
    Sets,
    /// Show one catalog set
    Set { id: SetId },
    /// List the cards of a set
    Cards {
        set_id: SetId,
        /// Case-insensitive name search
        #[arg(long)]
        search: Option<String>,
        /// Only wishlisted (`in`) or non-wishlisted (`out`) cards
        #[arg(long, value_enum)]
        wishlist: Option<FilterArg>,
        /// Sort by name
        #[arg(long)]
        sort: bool,
    },
    /// Show one card
    Card { id: CardId },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: MembershipAction,
    },
    /// Manage the collection
    Collection {
        #[command(subcommand)]
        action: MembershipAction,
    },
}

#[derive(Subcommand, Debug)]
enum MembershipAction {
    /// List entries with card details
    List,
    Add { card_id: CardId },
    /// Remove by card id, or by entry id with `--entry`
    Remove {
        card_id: Option<CardId>,
        #[arg(long, conflicts_with = "card_id", required_unless_present = "card_id")]
        entry: Option<MembershipId>,
    },
    /// Add when absent, remove when present
    Toggle { card_id: CardId },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FilterArg {
    In,
    Out,
}

impl From<FilterArg> for WishlistFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::In => WishlistFilter::InWishlist,
            FilterArg::Out => WishlistFilter::NotInWishlist,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("[Cli] {:?}", e);
            eprintln!("error: {}", e);
            if !matches!(e, ClientError::Config(_)) {
                eprintln!("{}", e.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!("[Config] Server {}", config.server_url());
    let client = CardClient::connect(config).await?;

    match cli.command {
        Command::Login { email, password } => {
            client.account().login(&email, &password).await?;
            print(&serde_json::json!({ "logged_in": email }))
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            client.account().register(&name, &email, &password).await?;
            print(&serde_json::json!({ "registered": email }))
        }
        Command::Logout => {
            client.account().logout().await?;
            print(&serde_json::json!({ "logged_out": true }))
        }
        Command::Me => print(&client.account().me().await?),
        Command::Profile => print(&client.library().profile_summary().await?),
        Command::Sets => print(&client.catalog().list_sets().await?),
        Command::Set { id } => print(&client.catalog().get_set(id).await?),
        Command::Cards {
            set_id,
            search,
            wishlist,
            sort,
        } => {
            let query = CardQuery {
                search,
                wishlist: wishlist.map(WishlistFilter::from).unwrap_or_default(),
                sort_by_name: sort,
            };
            print(&client.library().set_cards(set_id, &query).await?)
        }
        Command::Card { id } => print(&client.catalog().get_card(id).await?),
        Command::Wishlist { action } => membership(&client, MembershipSet::Wishlist, action).await,
        Command::Collection { action } => membership(&client, MembershipSet::Collection, action).await,
    }
}

async fn membership(client: &CardClient, set: MembershipSet, action: MembershipAction) -> Result<(), ClientError> {
    let cache = client.membership();
    match action {
        MembershipAction::List => match set {
            MembershipSet::Wishlist => print(&client.library().wishlist_cards().await?),
            MembershipSet::Collection => print(&client.library().collection_cards().await?),
        },
        MembershipAction::Add { card_id } => print(&cache.add(set, card_id).await?),
        MembershipAction::Remove { card_id, entry } => {
            let target = match (card_id, entry) {
                (_, Some(entry)) => MembershipTarget::Entry(entry),
                (Some(card_id), None) => MembershipTarget::Card(card_id),
                (None, None) => return Err(ClientError::not_found("card", "<none>")),
            };
            cache.remove(set, target).await?;
            print(&serde_json::json!({ "removed": true, "set": set }))
        }
        MembershipAction::Toggle { card_id } => {
            let change = cache.toggle(set, card_id).await?;
            print(&serde_json::json!({
                "set": change.set,
                "card_id": change.card_id,
                "member": change.member,
                "record": change.record,
            }))
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<(), ClientError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! FareCard CLI - a terminal client for the FareCard transit smart-card
//! service: wallet top-up, news, payment-point discovery, and account
//! settings, with a locally managed session.

mod api;
mod auth;
mod cache;
mod config;
mod models;

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use api::{ApiClient, ApiError};
use auth::{
    AuthPrompt, CredentialStore, FileStore, KeyringStore, Navigator, PromptPresenter,
    SessionGate, SessionManager, StorageBackend,
};
use config::Config;

/// Log file name in the cache directory
const LOG_FILE: &str = "farecard.log";

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing(config: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = config.cache_dir().ok().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
        tracing_appender::non_blocking(appender)
    });

    match file_layer {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

// ============================================================================
// CLI presenter and navigator
// ============================================================================

/// Terminal rendition of the auth prompt: a y/n question on stdin.
/// Input is read off-thread so the gate's await stays non-blocking.
struct CliPresenter;

impl PromptPresenter for CliPresenter {
    fn present(&self, prompt: AuthPrompt) {
        print!(
            "You need to sign in to {}. Go to login now? [y/N] ",
            prompt.action
        );
        let _ = io::stdout().flush();
        std::thread::spawn(move || {
            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line).is_err() {
                prompt.responder.dismiss_escape();
                return;
            }
            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => prompt.responder.confirm(),
                _ => prompt.responder.decline(),
            }
        });
    }

    fn dismiss(&self, _prompt_id: u64) {
        // A line prompt leaves nothing on screen to tear down
    }
}

/// The CLI has two "views": the normal prompt and the signed-out state.
struct CliNavigator {
    at_login: AtomicBool,
}

impl CliNavigator {
    fn new() -> Self {
        Self {
            at_login: AtomicBool::new(false),
        }
    }
}

impl Navigator for CliNavigator {
    fn to_login(&self) {
        self.at_login.store(true, Ordering::SeqCst);
        println!("You are signed out. Run `farecard login` to sign in.");
    }

    fn current_is_login(&self) -> bool {
        self.at_login.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config);
    info!("FareCard CLI starting");

    let backend: Box<dyn StorageBackend> = if config.use_keyring {
        Box::new(KeyringStore)
    } else {
        Box::new(FileStore::new(config.cache_dir()?)?)
    };
    let store = Arc::new(CredentialStore::new(backend));
    let navigator = Arc::new(CliNavigator::new());
    let session = Arc::new(SessionManager::new(
        Arc::clone(&store),
        navigator as Arc<dyn Navigator>,
    ));
    let client = ApiClient::new(&config, Arc::clone(&session))?;
    let gate = SessionGate::new(
        Arc::clone(&session),
        Arc::new(CliPresenter) as Arc<dyn PromptPresenter>,
    );

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");

    let result = match command {
        "login" => cmd_login(&client, &mut config).await,
        "logout" => {
            session.logout();
            Ok(())
        }
        "status" => cmd_status(&session),
        "balance" => cmd_balance(&client).await,
        "topup" => cmd_topup(&client, &gate, &args).await,
        "news" => cmd_news(&client, &args).await,
        "points" => cmd_points(&client, &args).await,
        "settings" => cmd_settings(&client, &args).await,
        "delete-account" => cmd_delete_account(&client, &gate).await,
        _ => {
            usage();
            Ok(())
        }
    };

    if let Err(e) = &result {
        if let Some(api_err) = e.downcast_ref::<ApiError>() {
            if api_err.is_terminal() {
                eprintln!("Your session has expired. Please log in again.");
                return Ok(());
            }
        }
    }
    result
}

fn usage() {
    println!("farecard <command>");
    println!();
    println!("  login            Sign in to your FareCard account");
    println!("  logout           Sign out and clear stored credentials");
    println!("  status           Show session and cached profile info");
    println!("  balance          Show your cards and balances");
    println!("  topup CARD EUR   Order a top-up for a card");
    println!("  news [PAGE]      Service announcements");
    println!("  points LAT LON [RADIUS]   Nearby payment points");
    println!("  settings [newsletter on|off]   Show or change account settings");
    println!("  delete-account   Permanently delete your account");
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn cmd_login(client: &ApiClient, config: &mut Config) -> Result<()> {
    let default = config.last_identifier.clone().unwrap_or_default();
    let prompt = if default.is_empty() {
        "Email: ".to_string()
    } else {
        format!("Email [{}]: ", default)
    };
    let mut identifier = read_line(&prompt)?;
    if identifier.is_empty() {
        identifier = default;
    }
    let secret = rpassword::prompt_password("Password: ")?;

    let profile = client.login(&identifier, &secret).await?;
    config.last_identifier = Some(identifier);
    config.save()?;
    println!("Welcome, {}!", profile.display_name());
    Ok(())
}

fn cmd_status(session: &SessionManager) -> Result<()> {
    if !session.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    match session.cached_profile() {
        Some(profile) => println!("Signed in as {}", profile.display_name()),
        None => println!("Signed in."),
    }
    match session.token_ttl() {
        Some(ttl) if ttl > 0 => println!("Token expires in {} min", ttl / 60),
        Some(_) => println!("Token has expired; it will refresh on the next request"),
        None => {}
    }
    Ok(())
}

async fn cmd_balance(client: &ApiClient) -> Result<()> {
    let cards = client.cards().await?;
    if cards.is_empty() {
        println!("No cards registered.");
    }
    for card in cards {
        let alias = card.alias.as_deref().unwrap_or("card");
        println!("{} ({}): {}", alias, card.card_number, card.balance.display());
    }
    Ok(())
}

async fn cmd_topup(client: &ApiClient, gate: &SessionGate, args: &[String]) -> Result<()> {
    if !gate.prompt_for_auth("top up your card").await {
        return Ok(());
    }
    let card = args
        .get(2)
        .context("Usage: farecard topup CARD EUR")?;
    let eur: f64 = args
        .get(3)
        .context("Usage: farecard topup CARD EUR")?
        .parse()
        .context("Amount must be a number, e.g. 10 or 12.50")?;
    let cents = (eur * 100.0).round() as i64;

    let order = client.top_up(card, cents).await?;
    println!("Top-up order {} accepted ({}).", order.order_id, order.status);
    if let Some(url) = order.payment_url {
        println!("Complete the payment at: {}", url);
    }
    Ok(())
}

async fn cmd_news(client: &ApiClient, args: &[String]) -> Result<()> {
    let page: i32 = match args.get(2) {
        Some(raw) => raw.parse().context("PAGE must be a number")?,
        None => 1,
    };
    let feed = client.news(page).await?;
    for item in &feed.items {
        match &item.published_at {
            Some(at) => println!("[{}] {}", at.format("%Y-%m-%d"), item.title),
            None => println!("{}", item.title),
        }
    }
    println!("(page {} of {})", feed.page, feed.total_pages);
    Ok(())
}

async fn cmd_points(client: &ApiClient, args: &[String]) -> Result<()> {
    let lat: f64 = args
        .get(2)
        .context("Usage: farecard points LAT LON [RADIUS]")?
        .parse()
        .context("LAT must be a number")?;
    let lon: f64 = args
        .get(3)
        .context("Usage: farecard points LAT LON [RADIUS]")?
        .parse()
        .context("LON must be a number")?;
    let radius: u32 = match args.get(4) {
        Some(raw) => raw.parse().context("RADIUS must be a number of meters")?,
        None => 1000,
    };

    let points = client.payment_points(lat, lon, radius).await?;
    if points.is_empty() {
        println!("No payment points within {} m.", radius);
    }
    for point in points {
        println!("{}", point.display_line());
    }
    Ok(())
}

async fn cmd_settings(client: &ApiClient, args: &[String]) -> Result<()> {
    if let (Some("newsletter"), Some(value)) = (
        args.get(2).map(String::as_str),
        args.get(3).map(String::as_str),
    ) {
        let mut settings = client.profile().await?.settings;
        settings.newsletter_opt_in = matches!(value, "on" | "yes" | "true");
        let profile = client.update_settings(&settings).await?;
        println!(
            "Newsletter: {}",
            if profile.settings.newsletter_opt_in { "on" } else { "off" }
        );
        return Ok(());
    }

    let profile = client.profile().await?;
    let settings = &profile.settings;
    println!("newsletter: {}", if settings.newsletter_opt_in { "on" } else { "off" });
    println!(
        "low-balance alerts: {}",
        if settings.low_balance_alerts { "on" } else { "off" }
    );
    if let Some(language) = &settings.preferred_language {
        println!("language: {}", language);
    }
    Ok(())
}

async fn cmd_delete_account(client: &ApiClient, gate: &SessionGate) -> Result<()> {
    if !gate.prompt_for_auth("delete your account").await {
        return Ok(());
    }
    let answer = read_line("This permanently deletes your account and wallet. Type DELETE to confirm: ")?;
    if answer != "DELETE" {
        println!("Aborted.");
        return Ok(());
    }
    client.delete_account().await?;
    println!("Account deleted.");
    Ok(())
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use paperbroker::application::account_engine::AccountEngine;
use paperbroker::application::portfolio_service::PortfolioService;
use paperbroker::application::trade_engine::TradeEngine;
use paperbroker::application::user_locks::UserLocks;
use paperbroker::config::{Config, QuoteMode};
use paperbroker::domain::portfolio::PositionValue;
use paperbroker::domain::ports::QuoteSource;
use paperbroker::domain::types::{Principal, usd};
use paperbroker::infrastructure::credentials::Argon2CredentialHasher;
use paperbroker::infrastructure::mock::MockQuoteSource;
use paperbroker::infrastructure::persistence::{Database, SqliteLedgerStore, SqliteUserRepository};
use paperbroker::infrastructure::quotes::HttpQuoteSource;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "paperbroker", about = "Simulated brokerage against a virtual cash balance")]
struct Cli {
    /// Account username (authenticates every command except `register`)
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Account password
    #[arg(short, long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new account with seeded cash
    Register {
        new_username: String,
        new_password: String,
        confirmation: String,
    },
    /// Look up the current price for a symbol
    Quote { symbol: String },
    /// Buy shares at the current quoted price
    Buy { symbol: String, shares: String },
    /// Sell shares at the current quoted price
    Sell { symbol: String, shares: String },
    /// Show current holdings and total valuation
    Portfolio,
    /// Show the full transaction history
    History,
    /// Add cash to the account balance
    Reload { amount: String },
    /// Change the account password
    Password {
        new_password: String,
        confirmation: String,
    },
}

struct App {
    accounts: AccountEngine,
    trades: TradeEngine,
    views: PortfolioService,
}

async fn build_quote_source(config: &Config) -> Result<Arc<dyn QuoteSource>> {
    match config.quote_mode {
        QuoteMode::Mock => {
            let quotes = MockQuoteSource::new();
            for (symbol, price) in [
                ("AAPL", dec!(178.50)),
                ("MSFT", dec!(402.10)),
                ("NVDA", dec!(131.25)),
                ("TSLA", dec!(244.90)),
                ("GOOGL", dec!(166.80)),
            ] {
                quotes.set_price(symbol, price).await;
            }
            Ok(Arc::new(quotes))
        }
        QuoteMode::Iex => Ok(Arc::new(HttpQuoteSource::new(
            &config.quote_api_url,
            &config.quote_api_key,
            Duration::from_millis(config.quote_timeout_ms),
        )?)),
    }
}

async fn login(app: &App, cli: &Cli) -> Result<Principal> {
    let username = cli
        .username
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--username is required for this command"))?;
    let password = cli
        .password
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--password is required for this command"))?;
    Ok(app.accounts.authenticate(username, password).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let db = Database::new(&config.database_url).await?;
    let users = Arc::new(SqliteUserRepository::new(db.pool.clone()));
    let ledger = Arc::new(SqliteLedgerStore::new(db.pool.clone()));
    let quotes = build_quote_source(&config).await?;
    let locks = Arc::new(UserLocks::new());

    let app = App {
        accounts: AccountEngine::new(
            users.clone(),
            ledger.clone(),
            Arc::new(Argon2CredentialHasher::new()),
            locks.clone(),
            config.starting_cash,
        ),
        trades: TradeEngine::new(ledger.clone(), quotes.clone(), locks),
        views: PortfolioService::new(ledger, quotes),
    };

    match &cli.command {
        Command::Register {
            new_username,
            new_password,
            confirmation,
        } => {
            let user = app
                .accounts
                .register(new_username, new_password, confirmation)
                .await?;
            println!(
                "Registered {} with starting cash {}",
                user.username,
                usd(user.cash)
            );
        }
        Command::Quote { symbol } => match app.views.quote(symbol).await? {
            Some(quote) => println!("{} ({}): {}", quote.name, quote.symbol, usd(quote.price)),
            None => println!("Symbol not found: {}", symbol),
        },
        Command::Buy { symbol, shares } => {
            let principal = login(&app, &cli).await?;
            let receipt = app.trades.buy(principal.user_id, symbol, shares).await?;
            println!(
                "Bought {} {} at {} for {}. Cash: {}",
                receipt.shares,
                receipt.symbol,
                usd(receipt.price),
                usd(receipt.amount),
                usd(receipt.cash_after)
            );
        }
        Command::Sell { symbol, shares } => {
            let principal = login(&app, &cli).await?;
            let receipt = app.trades.sell(principal.user_id, symbol, shares).await?;
            println!(
                "Sold {} {} at {} for {}. Cash: {}",
                receipt.shares,
                receipt.symbol,
                usd(receipt.price),
                usd(receipt.amount),
                usd(receipt.cash_after)
            );
        }
        Command::Portfolio => {
            let principal = login(&app, &cli).await?;
            let portfolio = app.views.get_portfolio(principal.user_id).await?;
            for position in &portfolio.positions {
                match &position.value {
                    PositionValue::Quoted { price, value } => println!(
                        "{:<6} {:<24} {:>6} @ {:>12} = {}",
                        position.symbol,
                        position.name,
                        position.shares,
                        usd(*price),
                        usd(*value)
                    ),
                    PositionValue::Unlisted => println!(
                        "{:<6} {:<24} {:>6}   (no longer quoted)",
                        position.symbol, position.name, position.shares
                    ),
                }
            }
            println!("Cash:  {}", usd(portfolio.cash));
            println!("Total: {}", usd(portfolio.total));
        }
        Command::History => {
            let principal = login(&app, &cli).await?;
            for entry in app.views.get_history(principal.user_id).await? {
                let when = chrono::DateTime::from_timestamp(entry.timestamp, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| entry.timestamp.to_string());
                println!(
                    "{} {:<4} {:<6} {:>6} @ {:>12} total {}",
                    when,
                    entry.side(),
                    entry.symbol,
                    entry.quantity.abs(),
                    usd(entry.price),
                    usd(entry.total)
                );
            }
        }
        Command::Reload { amount } => {
            let principal = login(&app, &cli).await?;
            let amount = Decimal::from_str(amount)
                .map_err(|_| anyhow::anyhow!("invalid amount: {}", amount))?;
            let balance = app.accounts.reload_cash(principal.user_id, amount).await?;
            println!("Reloaded {}. Cash: {}", usd(amount), usd(balance));
        }
        Command::Password {
            new_password,
            confirmation,
        } => {
            let principal = login(&app, &cli).await?;
            let current = cli.password.as_deref().unwrap_or_default();
            app.accounts
                .change_password(principal.user_id, current, new_password, confirmation)
                .await?;
            println!("Password changed");
        }
    }

    Ok(())
}

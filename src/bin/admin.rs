//! CLI administration tool for link-shortener.
//!
//! Provides commands for inspecting short hashes, retiring expired links,
//! revoking sessions and checking the database without going through the
//! HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Map a hash to its link id and back
//! cargo run --bin admin -- link decode 86Rf07
//! cargo run --bin admin -- link encode 42
//!
//! # Retire expired links now instead of waiting for the sweeper
//! cargo run --bin admin -- link purge
//!
//! # Sign a user out everywhere
//! cargo run --bin admin -- session revoke-user 17
//!
//! # Delete a user and revoke their sessions
//! cargo run --bin admin -- user delete 17
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required for `link purge`, `session`, `user` and `db`)
//! - `HASH_MIN_LENGTH` (default: 6) must match the running service

use link_shortener::domain::codec::IdCodec;
use link_shortener::domain::repositories::{LinkRepository, TokenRepository, UserRepository};
use link_shortener::infrastructure::codec::SqidsCodec;
use link_shortener::infrastructure::memory::ANONYMOUS_OWNER_ID;
use link_shortener::infrastructure::persistence::{
    PgLinkRepository, PgTokenRepository, PgUserRepository,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing link-shortener.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Inspect and maintain short links
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Manage user sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Link subcommands.
#[derive(Subcommand)]
enum LinkAction {
    /// Print the link id behind a short hash
    Decode {
        /// Short hash as it appears in the URL path
        hash: String,
    },

    /// Print the short hash for a link id
    Encode {
        /// Numeric link id
        id: u64,
    },

    /// Soft-delete every link whose expiry has passed
    Purge,
}

/// Session subcommands.
#[derive(Subcommand)]
enum SessionAction {
    /// Revoke every active session of a user
    RevokeUser {
        /// User id
        user_id: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// User subcommands.
#[derive(Subcommand)]
enum UserAction {
    /// Soft-delete a user and revoke every session they hold
    Delete {
        /// User id
        user_id: i64,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show row counts and server version
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Link { action } => handle_link_action(action).await?,
        Commands::Session { action } => handle_session_action(action).await?,
        Commands::User { action } => handle_user_action(action).await?,
        Commands::Db { action } => handle_db_action(action).await?,
    }

    Ok(())
}

async fn connect() -> Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")
}

fn codec() -> Result<SqidsCodec> {
    let min_length = match std::env::var("HASH_MIN_LENGTH") {
        Ok(raw) => raw
            .parse::<u8>()
            .with_context(|| format!("HASH_MIN_LENGTH '{raw}' is not a valid length"))?,
        Err(_) => 6,
    };

    SqidsCodec::new(min_length).context("Failed to build hash codec")
}

/// Dispatches link commands. Only `purge` touches the database.
async fn handle_link_action(action: LinkAction) -> Result<()> {
    match action {
        LinkAction::Decode { hash } => {
            let id = codec()?
                .decode(&hash)
                .map_err(|e| anyhow::anyhow!("Cannot decode '{}': {}", hash, e))?;

            println!("  {} → {}", hash.cyan(), id.to_string().bright_green().bold());
        }
        LinkAction::Encode { id } => {
            let hash = codec()?
                .encode(id)
                .map_err(|e| anyhow::anyhow!("Cannot encode {}: {}", id, e))?;

            println!("  {} → {}", id.to_string().cyan(), hash.bright_green().bold());
        }
        LinkAction::Purge => {
            println!("{}", "🧹 Retiring expired links...".bright_blue());

            let pool = connect().await?;
            let repo = PgLinkRepository::new(Arc::new(pool));

            let retired = repo
                .purge_expired()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to purge links: {}", e))?;

            println!(
                "{} {}",
                "✅ Links retired:".green().bold(),
                retired.to_string().bright_white().bold()
            );
        }
    }

    Ok(())
}

/// Revokes sessions after a confirmation prompt (default: No).
async fn handle_session_action(action: SessionAction) -> Result<()> {
    let SessionAction::RevokeUser { user_id, yes } = action;

    println!("{}", "🔒 Revoke Sessions".bright_blue().bold());
    println!();

    let pool = connect().await?;

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tokens WHERE user_id = $1 AND NOT deleted",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    println!("  User:            {}", user_id.to_string().cyan());
    println!("  Active sessions: {}", active.to_string().bright_white());
    println!();

    if active == 0 {
        println!("{}", "⚠️  Nothing to revoke".yellow());
        return Ok(());
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Revoke all sessions of this user?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let repo = PgTokenRepository::new(Arc::new(pool));
    let revoked = repo
        .soft_delete_by_user(user_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to revoke sessions: {}", e))?;

    println!();
    println!(
        "{} {}",
        "✅ Sessions revoked:".green().bold(),
        revoked.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Deletes a user after a confirmation prompt (default: No).
///
/// The provider identity becomes free, so the next sign-in through it creates
/// a new user.
async fn handle_user_action(action: UserAction) -> Result<()> {
    let UserAction::Delete { user_id, yes } = action;

    anyhow::ensure!(
        user_id != ANONYMOUS_OWNER_ID,
        "User {user_id} owns anonymous links and cannot be deleted"
    );

    println!("{}", "🗑️  Delete User".bright_blue().bold());
    println!();

    let pool = Arc::new(connect().await?);
    let users = PgUserRepository::new(pool.clone());

    let user = users
        .find_by_id(user_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load user: {}", e))?
        .with_context(|| format!("User {user_id} not found"))?;

    println!("  User:     {}", user.id.to_string().cyan());
    println!("  Provider: {}", user.provider.as_str().bright_white());
    println!("  Name:     {}", user.name.bright_white());
    println!("  Email:    {}", user.email.bright_white());
    println!();

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Delete this user and revoke their sessions?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    if !users
        .soft_delete(user_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete user: {}", e))?
    {
        println!("{}", "⚠️  User was already deleted".yellow());
        return Ok(());
    }

    let revoked = PgTokenRepository::new(pool)
        .soft_delete_by_user(user_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to revoke sessions: {}", e))?;

    println!(
        "{} {}",
        "✅ User deleted, sessions revoked:".green().bold(),
        revoked.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction) -> Result<()> {
    let pool = connect().await?;

    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(&pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(&pool)
                .await?;

            let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE NOT deleted")
                .fetch_one(&pool)
                .await?;

            let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE NOT deleted")
                .fetch_one(&pool)
                .await?;

            let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens WHERE NOT deleted")
                .fetch_one(&pool)
                .await?;

            println!("  PostgreSQL:      {}", version.bright_white());
            println!("  Users:           {}", users.to_string().bright_green().bold());
            println!("  Active links:    {}", links.to_string().bright_green().bold());
            println!("  Active sessions: {}", sessions.to_string().bright_green().bold());
            println!();
        }
    }

    Ok(())
}

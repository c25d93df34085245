mod api;
mod cli;
mod config;
mod db;
mod models;
mod notifications;
mod prayer_times;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rusqlite::Connection;

use cli::args::{Cli, Commands};
use cli::handlers::{self, AppContext, SetupOptions};
use config::AppConfig;
use db::migrations::run_migrations;
use db::repository::{MetaRepo, PrefsRepo, KEY_SETUP_DONE};
use models::ContactMessage;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;

    // Ensure data directory exists and open DB
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    run_migrations(&conn)?;

    if PrefsRepo::take_first_launch(&conn)? {
        info!("first launch");
        welcome();
    }

    let mut ctx = AppContext::new(config, db::share(conn));

    match cli.command {
        Some(Commands::Setup {
            lat,
            lng,
            name,
            method,
            madhab,
            source,
            reset,
        }) => handlers::handle_setup(
            &mut ctx,
            SetupOptions {
                lat,
                lng,
                name,
                method,
                madhab,
                source,
                reset,
            },
        )?,
        Some(Commands::Times { twelve_hour }) => handlers::handle_times(&ctx, twelve_hour).await?,
        Some(Commands::Watch) => handlers::handle_watch(&ctx).await?,
        Some(Commands::Notify { action }) => handlers::handle_notify(&ctx, &action).await?,
        Some(Commands::Categories) => handlers::handle_categories(&ctx).await?,
        Some(Commands::Subcategories { category }) => {
            handlers::handle_subcategories(&ctx, category.as_deref()).await?
        }
        Some(Commands::Duas { id }) => handlers::handle_duas(&ctx, &id).await?,
        Some(Commands::Favorites { action }) => handlers::handle_favorites(&ctx, &action).await?,
        Some(Commands::Contact {
            name,
            email,
            message,
        }) => {
            handlers::handle_contact(
                &ctx,
                ContactMessage {
                    name,
                    email,
                    message,
                },
            )
            .await?
        }
        Some(Commands::Ask { query }) => handlers::handle_ask(&ctx, &query).await?,
        Some(Commands::Auth { action }) => handlers::handle_auth(&ctx, &action).await?,
        Some(Commands::Prefs { language, theme }) => {
            handlers::handle_prefs(&ctx, language.as_deref(), theme.as_deref())?
        }

        // No subcommand → today's times, running setup first if needed
        None => {
            ensure_setup(&mut ctx)?;
            handlers::handle_times(&ctx, false).await?;
        }
    }

    Ok(())
}

/// Check if setup has been done; if not, run the wizard automatically.
fn ensure_setup(ctx: &mut AppContext) -> Result<()> {
    let done = {
        let conn = db::lock(&ctx.conn)?;
        MetaRepo::get(&conn, KEY_SETUP_DONE)?
    };
    if done.as_deref() != Some("1") {
        eprintln!("No configuration found. Running setup...");
        eprintln!();
        handlers::handle_setup(ctx, SetupOptions::default())?;
    }
    Ok(())
}

fn welcome() {
    println!();
    println!("\x1b[38;2;196;160;68m  Assalamu alaikum, welcome to hisn.\x1b[0m");
    println!("\x1b[2m  Run `hisn setup` to set your location, then `hisn times`.\x1b[0m");
    println!();
}

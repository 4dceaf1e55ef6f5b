//! # Activity Board Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database, starts the
//! board scheduler and the health server, and runs the Telegram dispatcher.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use activity_board_bot::activity::{ActivityEnv, ActivityRegistry};
use activity_board_bot::board::{default_schedule, BoardManager};
use activity_board_bot::bot::{BotHandler, BotServices};
use activity_board_bot::config::Config;
use activity_board_bot::database::DatabaseManager;
use activity_board_bot::gateway::{MessagingGateway, TelegramGateway};
use activity_board_bot::services::{BoardScheduler, HealthService};
use activity_board_bot::utils::logging::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "activity_board_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Activity Board Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Board timezone: {}",
        config.database_url, config.http_port, config.board_timezone
    );

    ensure_data_dir(&config.database_url)?;

    // Initialize database
    info!("Initializing database connection...");
    let db = DatabaseManager::new(&config.database_url).await?;
    db.run_migrations().await?;
    info!("Database initialized successfully");

    // Initialize bot and engine
    let bot = Bot::new(&config.telegram_bot_token);
    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramGateway::new(bot.clone()));

    let env = ActivityEnv::new(gateway.clone(), db)
        .with_operator_chat(config.operator_chat_id.map(ChatId))
        .with_timezone(config.board_timezone);
    let registry = ActivityRegistry::new(env);
    let boards = BoardManager::new(
        gateway,
        default_schedule(config.board_timezone),
        config.board_update_interval(),
    );

    let handler = BotHandler::new(BotServices::new(registry.clone(), boards.clone(), &config));
    info!("Telegram bot initialized successfully");

    // Initialize and start the board scheduler
    let mut board_scheduler = BoardScheduler::new(
        boards.clone(),
        registry.clone(),
        config.board_tick(),
        config.activity_max_idle(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create board scheduler: {}", e))?;

    if let Err(e) = board_scheduler.start().await {
        tracing::error!("Failed to start board scheduler: {}", e);
    }

    // Initialize health service
    let health_service = HealthService::new(registry, boards);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;

    info!("Health check server starting on port {}", config.http_port);

    // Run both the bot and health server concurrently
    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    // Wait for either task to complete (which would indicate shutdown)
    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Err(e) = board_scheduler.stop().await {
        tracing::warn!("Error stopping board scheduler: {}", e);
    }

    log_system_event("application stopped", None);
    Ok(())
}

/// Creates the directory of a file-backed SQLite database.
fn ensure_data_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

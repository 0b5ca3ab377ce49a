use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::sleep;

use tusabot::core::{config, init_logger, log_startup_configuration};
use tusabot::scheduler::{self, Broadcaster, SchedulerDeps};
use tusabot::session::SessionStore;
use tusabot::storage::cache::StoreCache;
use tusabot::storage::{create_pool, get_connection};
use tusabot::telegram::delivery::{BotDelivery, Delivery};
use tusabot::telegram::notifications::notify_admin_startup;
use tusabot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use tusabot::verify::VkClient;

const MAX_DISPATCHER_RETRIES: u32 = 5;

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    // Set up global panic handler to catch panics in the dispatcher
    // so they are logged instead of silently terminating the process
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;
    log_startup_configuration();

    run_bot().await
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");

    let bot = create_bot()?;

    // Get bot information; retry while the Bot API is still coming up
    let bot_info = {
        let startup_max_retries = 12;
        let mut startup_retry = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    startup_retry += 1;
                    if startup_retry >= startup_max_retries {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Bot API after {} retries: {}",
                            startup_retry,
                            e
                        ));
                    }
                    log::warn!(
                        "Bot API not ready (attempt {}/{}): {}. Retrying in 5 seconds...",
                        startup_retry,
                        startup_max_retries,
                        e
                    );
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    };
    let bot_username = bot_info.username.as_deref();
    log::info!("Bot username: {:?}, Bot ID: {}", bot_username, bot_info.id);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    // Notify admin about bot startup/restart
    notify_admin_startup(&bot, bot_username).await;

    // Create database connection pool
    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    // Warm the in-memory caches from the database
    let cache = {
        let conn = get_connection(&db_pool)?;
        Arc::new(StoreCache::load(&conn)?)
    };

    let sessions = Arc::new(SessionStore::new());
    let vk = VkClient::from_env().map(Arc::new);
    let broadcaster = Arc::new(Broadcaster::new(*config::broadcast::MAX_CONCURRENT_SENDS));
    let delivery: Arc<dyn Delivery> = Arc::new(BotDelivery::new(bot.clone()));

    // Start the weekly re-engagement timer
    let _scheduler_handle = scheduler::spawn_weekly(SchedulerDeps {
        db_pool: Arc::clone(&db_pool),
        cache: Arc::clone(&cache),
        delivery,
        broadcaster: Arc::clone(&broadcaster),
        vk: vk.clone(),
        admin_chat_id: *config::admin::ADMIN_USER_ID,
    });

    let handler_deps = HandlerDeps::new(db_pool, sessions, cache, vk, broadcaster);
    let handler = schema(handler_deps);

    log::info!("================================================");
    log::info!("🎉 Bot initialization complete");
    log::info!("📡 Ready to receive updates!");
    log::info!("================================================");

    // Run the dispatcher with retry logic; a new dispatcher runs in its own
    // task so a panic is caught via the JoinHandle instead of taking the
    // process down
    let mut retry_count = 0;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(DependencyMap::new())
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Dispatcher panicked: {}", join_err);
                if retry_count >= MAX_DISPATCHER_RETRIES {
                    log::error!("Max retries reached after panic. Exiting...");
                    break;
                }
                retry_count += 1;
                let backoff = Duration::from_secs(5 * 2u64.pow(retry_count.min(5)));
                log::info!(
                    "Retrying dispatcher connection after panic (attempt {}/{}, waiting {}s)...",
                    retry_count,
                    MAX_DISPATCHER_RETRIES,
                    backoff.as_secs()
                );
                sleep(backoff).await;
            }
            Err(join_err) => {
                log::warn!("Dispatcher task was cancelled: {}", join_err);
                break;
            }
        }
    }

    Ok(())
}

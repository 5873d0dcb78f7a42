mod config;
mod detail_handlers;
mod error;
mod favorites;
mod genres;
mod handlers;
mod media;
mod nav;
mod telegram;
mod tmdb;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use favorites::FavoritesStore;
use genres::GenreCache;
use telegram::Bot;
use tmdb::CatalogClient;

/// Everything a handler needs, built once at startup and shared across
/// the per-update tasks.
pub struct App {
    pub bot: Bot,
    pub catalog: CatalogClient,
    pub favorites: FavoritesStore,
    pub genres: GenreCache,
    pub region: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kinobot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("startup failed: {err}");
            std::process::exit(1);
        }
    };

    let favorites = match FavoritesStore::open(&config.db_path).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("startup failed: cannot open favorites store: {err}");
            std::process::exit(1);
        }
    };
    info!(db_path = %config.db_path, "favorites store ready");

    let catalog = CatalogClient::new(config.tmdb_api_key.clone(), config.language.clone());
    let genres = GenreCache::new();
    if let Err(err) = genres.warm(&catalog).await {
        // Not fatal: lookups fall back to raw ids until a later warm succeeds.
        warn!(error = %err, "initial genre cache warm failed");
    }

    let app = Arc::new(App {
        bot: Bot::new(&config.bot_token),
        catalog,
        favorites,
        genres,
        region: config.region(),
    });

    info!(language = %config.language, "bot is running");
    poll_loop(app).await;
}

/// Long-poll loop: one spawned task per update, no ordering between them.
async fn poll_loop(app: Arc<App>) {
    let mut offset: i64 = 0;
    loop {
        let updates = match app.bot.get_updates(offset).await {
            Ok(updates) => updates,
            Err(err) => {
                error!(error = %err, "getUpdates failed, backing off");
                tokio::time::sleep(Duration::from_secs(3)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                handlers::handle_update(&app, update).await;
            });
        }
    }
}

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod models;
pub mod session;
pub mod store;
pub mod stream;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

use app::App;
use cli::Args;
use config::ClientConfig;
use log::{ info, warn };
use std::error::Error;
use ui::ThemeController;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ClientConfig::from(&args);

    info!("--- Client Configuration ---");
    info!("Backend URL: {}", config.backend_url);
    info!("Request Timeout: {:?}", config.request_timeout);
    info!("Stream Read Timeout: {:?}", config.stream_read_timeout);
    info!("Default Conversation Title: {}", config.default_title);
    match config.preference_store() {
        Some(store) => info!("Preferences Path: {}", store.path().display()),
        None => info!("Preferences Path: (none, theme will not be saved)"),
    }
    info!("Render Width: {}", config.render_width);
    info!("-------------------------");

    let api = api::new_client(&config)?;
    match api.health().await {
        Ok(status) => info!("Backend reachable: {}", status),
        Err(e) => warn!("Backend health check failed: {}", e),
    }

    let theme = ThemeController::load(config.preference_store());
    App::new(api, &config, theme).run().await
}

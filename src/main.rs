use yukkuri_console::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config::default_config_path();
    let config = config::load_config(&config_path);
    yukkuri_console::logging::init(&config.log_level);

    if !config_path.exists() {
        if let Err(e) = config::save_config(&config_path, &config) {
            tracing::warn!("[Config] Could not write default config: {}", e);
        }
    }

    yukkuri_console::run(config).await
}

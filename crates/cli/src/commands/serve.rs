//! `filechat serve` — Start the web chat.

use filechat_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("FileChat");
    println!("   Open:   http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:  {}", config.model);
    if !config.has_api_key() {
        println!("   API key: not set, run `filechat onboard` and edit secrets.toml");
    }

    filechat_gateway::start(config).await?;

    Ok(())
}

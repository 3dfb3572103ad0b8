//! `filechat doctor` — Diagnose configuration and provider health.

use filechat_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("FileChat Doctor — Diagnostics");
    println!("=============================\n");

    let mut issues = 0;
    let config_dir = AppConfig::config_dir();

    let config_path = config_dir.join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults — run `filechat onboard`");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid (model {}, max_tokens {})", config.model, config.max_tokens);
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  {} issue(s) found. See above for details.", issues + 1);
            return Ok(());
        }
    };

    if config_dir.join("secrets.toml").exists() {
        println!("  ✅ Secret store present");
    } else {
        println!("  ⚠️  No secrets.toml — run `filechat onboard`");
        issues += 1;
    }

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set OPENAI_API_KEY in secrets.toml or the environment");
        issues += 1;
    }

    let provider = filechat_providers::build_from_config(&config)?;
    if config.has_api_key() {
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider reachable at {}", config.provider.base_url),
            Ok(false) => {
                println!("  ❌ Provider at {} answered but is not healthy", config.provider.base_url);
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider check failed: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ⏭️  Skipping provider check without an API key");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

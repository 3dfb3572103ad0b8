//! `filechat onboard` — First-time setup.

use filechat_config::{API_KEY_NAME, AppConfig, PLACEHOLDER_API_KEY};

/// Template for the secret store. The key stays commented out until edited.
fn secrets_template() -> String {
    format!(
        "# FileChat secret store. Keep this file private.\n\
         # Uncomment and set your key; it takes precedence over the\n\
         # {API_KEY_NAME} environment variable.\n\
         # {API_KEY_NAME} = \"{PLACEHOLDER_API_KEY}\"\n"
    )
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let secrets_path = config_dir.join("secrets.toml");

    println!("FileChat — First-Time Setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
    }

    if secrets_path.exists() {
        println!("  Secret store already exists at: {}", secrets_path.display());
    } else {
        std::fs::write(&secrets_path, secrets_template())?;
        println!("  Created secrets.toml at: {}", secrets_path.display());
    }

    println!("\n  Next steps:");
    println!("   1. Put your API key in {}", secrets_path.display());
    println!("   2. Run: filechat serve");
    println!("   3. Open the printed address and upload a file\n");

    Ok(())
}

//! Completion API provider implementations for FileChat.
//!
//! All providers implement the `filechat_core::Provider` trait.
//! [`build_from_config`] wires the configured endpoint and API key together.

pub mod openai_compat;

use std::sync::Arc;

use filechat_config::AppConfig;
use filechat_core::provider::Provider;

pub use openai_compat::OpenAiCompatProvider;

/// Build the provider described by the configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, reqwest::Error> {
    let provider = OpenAiCompatProvider::new(
        &config.provider.name,
        &config.provider.base_url,
        &config.api_key,
        std::time::Duration::from_secs(config.provider.timeout_secs),
    )?;
    tracing::info!(
        provider = %config.provider.name,
        base_url = %config.provider.base_url,
        model = %config.model,
        "Completion provider configured"
    );
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_default_provider() {
        let provider = build_from_config(&AppConfig::default()).unwrap();
        assert_eq!(provider.name(), "openai");
    }
}

//! Check-config command - loads the layered configuration the same way
//! `serve` does and prints it

use crate::config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    config.validate()?;

    println!("{}", render(&config)?);
    Ok(())
}

fn render(config: &AppConfig) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&config.redacted())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_hides_secret() {
        let mut config = AppConfig::default();
        config.gateway.secret = "topsecret".to_string();

        let rendered = render(&config).unwrap();
        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}

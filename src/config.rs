use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub maps_base_url: String,
    pub maps_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            maps_base_url: std::env::var("MAPS_BASE_URL")
                .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api".to_string())
                .trim_end_matches('/')
                .to_string(),
            maps_api_key: std::env::var("GOOGLE_MAPS_API_KEY")
                .map_err(|_| anyhow::anyhow!("GOOGLE_MAPS_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("GOOGLE_MAPS_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            llm_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string())
                .trim_end_matches('/')
                .to_string(),
            llm_model: std::env::var("OLLAMA_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "llama3.2".to_string()),
        };

        if !config.maps_base_url.starts_with("http://")
            && !config.maps_base_url.starts_with("https://")
        {
            anyhow::bail!("MAPS_BASE_URL must start with http:// or https://");
        }
        if !config.llm_base_url.starts_with("http://")
            && !config.llm_base_url.starts_with("https://")
        {
            anyhow::bail!("OLLAMA_BASE_URL must start with http:// or https://");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Maps Base URL: {}", config.maps_base_url);
        tracing::debug!("Maps API Key: [REDACTED]");
        tracing::debug!("LLM Base URL: {}", config.llm_base_url);
        tracing::debug!("LLM Model: {}", config.llm_model);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

use dotenv::dotenv;

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:8080",
    "http://127.0.0.1",
    "http://127.0.0.1:8080",
    // file:// pages send `Origin: null`
    "null",
];

pub struct Config {
    pub database_url: String,
    pub allowed_origins: Vec<String>,
    pub bind_addr: String,
    pub market_data_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://stock_data.db?mode=rwc".to_string()),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect()),
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            market_data_base_url: std::env::var("MARKET_DATA_BASE_URL")
                .unwrap_or_else(|_| crate::market_data::YAHOO_BASE_URL.to_string()),
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_skips_blanks() {
        let origins = parse_origins(" http://localhost:3000, ,null,https://app.example.com ");
        assert_eq!(
            origins,
            vec!["http://localhost:3000", "null", "https://app.example.com"]
        );
    }

    #[test]
    fn test_default_origins_include_null() {
        assert!(DEFAULT_ALLOWED_ORIGINS.contains(&"null"));
    }
}

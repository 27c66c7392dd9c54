use std::env;

use crate::alert::ThresholdConfig;
use anyhow::{anyhow, Result};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub api_key: String,
    pub watch_addresses: Vec<String>,
    pub poll_interval_secs: u64,
    pub alert_on_any_tx: bool,
    pub min_tx_value: Decimal,
    pub max_tx_value: Decimal,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("ETHERSCAN_API_KEY")
            .map_err(|_| anyhow!("ETHERSCAN_API_KEY must be set in .env"))?;
        let api_url = env::var("ETHERSCAN_API_URL")
            .unwrap_or_else(|_| "https://api.etherscan.io".to_string());

        let watch_addresses_raw = env::var("WATCH_ADDRESSES")
            .map_err(|_| anyhow!("WATCH_ADDRESSES must be set in .env"))?;
        let watch_addresses = parse_address_list(&watch_addresses_raw);
        if watch_addresses.is_empty() {
            return Err(anyhow!("WATCH_ADDRESSES cannot be empty"));
        }

        let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let alert_on_any_tx = env::var("ALERT_ON_ANY_TX")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let min_tx_value = parse_decimal(env::var("MIN_TX_VALUE").ok().as_deref(), Decimal::ONE);
        let max_tx_value =
            parse_decimal(env::var("MAX_TX_VALUE").ok().as_deref(), Decimal::ONE_HUNDRED);

        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN").ok();
        let telegram_chat_id = env::var("TELEGRAM_CHAT_ID").ok();

        Ok(Self {
            api_url,
            api_key,
            watch_addresses,
            poll_interval_secs,
            alert_on_any_tx,
            min_tx_value,
            max_tx_value,
            telegram_bot_token,
            telegram_chat_id,
        })
    }

    pub fn thresholds(&self) -> ThresholdConfig {
        ThresholdConfig {
            alert_on_any_tx: self.alert_on_any_tx,
            min_value: self.min_tx_value,
            max_value: self.max_tx_value,
        }
    }
}

pub fn parse_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_decimal(raw: Option<&str>, default: Decimal) -> Decimal {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

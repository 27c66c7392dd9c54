pub mod alert;
pub mod config;
pub mod diff;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod notifier;
pub mod store;
pub mod utils;
pub mod watcher;

use config::AppConfig;
use ledger::EtherscanClient;
use notifier::{ConsoleNotifier, NotifierHub, TelegramNotifier};
use watcher::WalletMonitor;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run() -> Result<()> {
    let config = AppConfig::from_env()?;
    let ledger = Arc::new(EtherscanClient::new(config.api_url.clone()));

    let console = ConsoleNotifier::new();
    let telegram = TelegramNotifier::maybe_from_config(&config);
    if telegram.is_some() {
        info!("📱 Telegram notifications enabled");
    } else {
        info!("📱 Telegram notifications disabled (no credentials)");
    }
    let notifier = NotifierHub::new(console, telegram);

    let monitor = WalletMonitor::new(ledger, notifier, &config);

    info!("👁️  Adding {} wallets to monitoring:", config.watch_addresses.len());
    for address in &config.watch_addresses {
        match monitor.add_wallet(address).await {
            Ok(wallet) => info!(
                "   - {} ({:.4} ETH, {} recent txs)",
                wallet.address, wallet.balance, wallet.tx_count
            ),
            Err(e) => warn!("⚠️  Could not add {}: {}", address, e),
        }
    }

    monitor.start();
    info!(
        "✅ Watching for wallet activity every {}s",
        config.poll_interval_secs
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    monitor.stop();

    Ok(())
}

use crate::alert::Alert;
use anyhow::Result;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }

    pub async fn send(&self, alert: &Alert) -> Result<()> {
        println!("{}  {}", alert.kind.symbol(), alert.message);
        if let Some(hash) = &alert.tx_hash {
            println!("    https://etherscan.io/tx/{hash}");
        }
        info!("Alert sent to console: {}", alert.message);
        Ok(())
    }
}

use crate::domain::{wei_to_eth, FetchResult, TxRecord, TX_WINDOW};
use crate::error::FetchError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Ledger-query service the monitor consumes. Both calls fail uniformly
/// with a `FetchError`; callers never see transport details.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current balance in wei.
    async fn balance(&self, address: &str, api_key: &str) -> Result<u128, FetchError>;

    /// Most-recent-first transaction page, at most `TX_WINDOW` entries.
    async fn transactions(&self, address: &str, api_key: &str)
        -> Result<Vec<TxRecord>, FetchError>;
}

/// One full fetch pass for an address: balance plus transaction page.
/// The reported `tx_count` is the length of the returned page.
pub async fn fetch_wallet_data(
    client: &dyn LedgerClient,
    address: &str,
    api_key: &str,
) -> Result<FetchResult, FetchError> {
    let balance_wei = client.balance(address, api_key).await?;
    let transactions = client.transactions(address, api_key).await?;

    Ok(FetchResult {
        balance: wei_to_eth(balance_wei),
        tx_count: transactions.len() as u32,
        transactions,
    })
}

#[derive(Debug, Deserialize)]
struct RawTx {
    hash: String,
    from: String,
    value: String,
}

/// Etherscan `module=account` client.
pub struct EtherscanClient {
    base_url: String,
    client: reqwest::Client,
}

impl EtherscanClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::new(format!("request failed: {e}")))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::new(format!("invalid response body: {e}")))
    }
}

/// Etherscan wraps every payload in `{status, message, result}`; any status
/// other than "1" is an application-level rejection and `message` carries
/// the reason.
fn unwrap_envelope(json: Value) -> Result<Value, FetchError> {
    let status = json.get("status").and_then(Value::as_str).unwrap_or("");
    if status != "1" {
        let message = json
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("ledger query rejected");
        return Err(FetchError::new(message));
    }

    Ok(json.get("result").cloned().unwrap_or(Value::Null))
}

#[async_trait]
impl LedgerClient for EtherscanClient {
    async fn balance(&self, address: &str, api_key: &str) -> Result<u128, FetchError> {
        let url = format!(
            "{}/api?module=account&action=balance&address={address}&tag=latest&apikey={api_key}",
            self.base_url
        );

        let result = unwrap_envelope(self.call(&url).await?)?;
        let raw = result
            .as_str()
            .ok_or_else(|| FetchError::new("balance result is not a string"))?;

        raw.parse::<u128>()
            .map_err(|_| FetchError::new(format!("unparseable balance: {raw}")))
    }

    async fn transactions(
        &self,
        address: &str,
        api_key: &str,
    ) -> Result<Vec<TxRecord>, FetchError> {
        let url = format!(
            "{}/api?module=account&action=txlist&address={address}&startblock=0&endblock=99999999&page=1&offset={TX_WINDOW}&sort=desc&apikey={api_key}",
            self.base_url
        );

        let result = unwrap_envelope(self.call(&url).await?)?;
        let raw: Vec<RawTx> = serde_json::from_value(result)
            .map_err(|e| FetchError::new(format!("invalid transaction list: {e}")))?;

        raw.into_iter()
            .map(|tx| {
                let value_wei = tx
                    .value
                    .parse::<u128>()
                    .map_err(|_| FetchError::new(format!("unparseable value: {}", tx.value)))?;
                Ok(TxRecord {
                    hash: tx.hash,
                    from: tx.from,
                    value_wei,
                })
            })
            .collect()
    }
}

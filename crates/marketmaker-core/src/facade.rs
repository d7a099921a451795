//! Named node operations.
//!
//! [`MarketMaker`] forwards keyword parameters to [`MmProxy::call`] and fills
//! in server lists from the endpoint [`Registry`]. Operations whose answer is
//! only useful through its `result` field return that field; the rest return
//! the whole response.

use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, RpcError};
use crate::registry::{EndpointRecord, Registry};
use crate::rpc::{MmProxy, Params, RpcResponse};

/// Swap contract used when activating ERC20 coins.
pub const ERC20_SWAP_CONTRACT_ADDRESS: &str = "0x8500AFc0bc5214728082163326C2FF0C73f4a871";

/// Selector for `cancel_all_orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CancelBy {
    All,
    Pair { base: String, rel: String },
    Coin { ticker: String },
}

/// Selector for `unban_pubkeys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum UnbanBy {
    All,
    Few(Vec<String>),
}

/// Build call parameters from `"key" => value` pairs.
macro_rules! params {
    ($($key:literal => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut params = Params::new();
        $(params.insert($key.to_owned(), Value::from($value));)*
        params
    }};
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, CoreError> {
    Ok(serde_json::to_value(value).map_err(RpcError::Encode)?)
}

pub struct MarketMaker {
    proxy: MmProxy,
    registry: Registry,
}

impl MarketMaker {
    pub fn new(proxy: MmProxy, registry: Registry) -> Self {
        Self { proxy, registry }
    }

    pub fn proxy(&self) -> &MmProxy {
        &self.proxy
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn available_coins(&self) -> Vec<&str> {
        self.registry.available_coins()
    }

    async fn forward(&self, method: &str, args: Params) -> Result<RpcResponse, CoreError> {
        self.proxy.call(method, args).await
    }

    async fn forward_result(&self, method: &str, args: Params) -> Result<Value, CoreError> {
        let response = self.forward(method, args).await?;
        Ok(response.into_result(method)?)
    }

    fn servers(&self, coin: &str) -> Result<&[EndpointRecord], CoreError> {
        self.registry
            .endpoints(coin)
            .ok_or_else(|| CoreError::UnknownCoin(coin.to_owned()))
    }

    // ==========================================================================
    // Wallet
    // ==========================================================================

    pub async fn my_balance(&self, coin: &str) -> Result<RpcResponse, CoreError> {
        self.forward("my_balance", params! { "coin" => coin }).await
    }

    /// Activate a UTXO coin against its registered electrum servers.
    pub async fn electrum(&self, coin: &str) -> Result<RpcResponse, CoreError> {
        let servers = to_json(&self.servers(coin)?)?;
        self.forward(
            "electrum",
            params! { "coin" => coin, "servers" => servers, "tx_history" => true, "mm2" => "1" },
        )
        .await
    }

    pub async fn electrum_batch(&self, coins: &[String]) -> Result<Vec<RpcResponse>, CoreError> {
        let mut responses = Vec::with_capacity(coins.len());
        for coin in coins {
            responses.push(self.electrum(coin).await?);
        }
        Ok(responses)
    }

    /// Activate a coin through `enable`, passing the full endpoint records.
    pub async fn enable(&self, coin: &str) -> Result<RpcResponse, CoreError> {
        let urls = to_json(&self.servers(coin)?)?;
        self.forward(
            "enable",
            params! { "coin" => coin, "urls" => urls, "tx_history" => true, "mm2" => "1" },
        )
        .await
    }

    /// Activate an ETH/ERC20 coin; the node expects bare node URLs here.
    pub async fn enable_erc20(&self, coin: &str) -> Result<RpcResponse, CoreError> {
        let eth_nodes: Vec<&str> = self
            .servers(coin)?
            .iter()
            .map(|record| record.url.as_str())
            .collect();
        self.forward(
            "enable",
            params! {
                "coin" => coin,
                "urls" => eth_nodes,
                "swap_contract_address" => ERC20_SWAP_CONTRACT_ADDRESS,
                "tx_history" => true,
                "mm2" => "1",
            },
        )
        .await
    }

    pub async fn enable_batch(&self, coins: &[String]) -> Result<Vec<RpcResponse>, CoreError> {
        let mut responses = Vec::with_capacity(coins.len());
        for coin in coins {
            responses.push(self.enable(coin).await?);
        }
        Ok(responses)
    }

    pub async fn kmd_rewards_info(&self) -> Result<RpcResponse, CoreError> {
        self.forward("kmd_rewards_info", params! {}).await
    }

    /// Build (but do not broadcast) a withdrawal transaction.
    pub async fn withdraw(
        &self,
        coin: &str,
        to: &str,
        amount: &str,
    ) -> Result<RpcResponse, CoreError> {
        self.forward("withdraw", params! { "coin" => coin, "to" => to, "amount" => amount })
            .await
    }

    /// Build (but do not broadcast) a transaction sweeping the whole balance.
    pub async fn withdraw_max(&self, coin: &str, to: &str) -> Result<RpcResponse, CoreError> {
        self.forward("withdraw", params! { "coin" => coin, "to" => to, "max" => true })
            .await
    }

    pub async fn send_raw_transaction(
        &self,
        coin: &str,
        tx_hex: &str,
    ) -> Result<RpcResponse, CoreError> {
        self.forward("send_raw_transaction", params! { "coin" => coin, "tx_hex" => tx_hex })
            .await
    }

    /// Withdraw `amount` to `to` and broadcast the resulting transaction.
    ///
    /// If the withdrawal response carries no `tx_hex`, it is returned as is
    /// and nothing is broadcast.
    pub async fn send(
        &self,
        coin: &str,
        to: &str,
        amount: &str,
    ) -> Result<RpcResponse, CoreError> {
        let response = self.withdraw(coin, to, amount).await?;
        self.broadcast_withdrawal(coin, response).await
    }

    /// Sweep the whole balance to `to` and broadcast it, like [`Self::send`].
    pub async fn send_max(&self, coin: &str, to: &str) -> Result<RpcResponse, CoreError> {
        let response = self.withdraw_max(coin, to).await?;
        self.broadcast_withdrawal(coin, response).await
    }

    async fn broadcast_withdrawal(
        &self,
        coin: &str,
        withdrawal: RpcResponse,
    ) -> Result<RpcResponse, CoreError> {
        let tx_hex = withdrawal
            .as_json()
            .and_then(|body| body.get("tx_hex"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        match tx_hex {
            Some(tx_hex) => {
                tracing::info!(coin, tx_hex = %tx_hex, "broadcasting withdrawal");
                self.send_raw_transaction(coin, &tx_hex).await
            }
            None => Ok(withdrawal),
        }
    }

    pub async fn disable_coin(&self, coin: &str) -> Result<RpcResponse, CoreError> {
        self.forward("disable_coin", params! { "coin" => coin }).await
    }

    pub async fn disable_batch(&self, coins: &[String]) -> Result<Vec<RpcResponse>, CoreError> {
        let mut responses = Vec::with_capacity(coins.len());
        for coin in coins {
            responses.push(self.disable_coin(coin).await?);
        }
        Ok(responses)
    }

    /// Disable every coin that has endpoints in the registry.
    pub async fn disable_all(&self) -> Result<Vec<RpcResponse>, CoreError> {
        let coins: Vec<String> = self
            .available_coins()
            .into_iter()
            .map(str::to_owned)
            .collect();
        self.disable_batch(&coins).await
    }

    /// Tickers of the coins currently active on the node.
    pub async fn get_enabled_coins(&self) -> Result<Vec<String>, CoreError> {
        let method = "get_enabled_coins";
        let result = self.forward_result(method, params! {}).await?;
        let entries = result.as_array().ok_or_else(|| RpcError::MissingResult {
            method: method.to_owned(),
            detail: format!("expected an array of coins, got {result}"),
        })?;
        Ok(entries
            .iter()
            .filter_map(|entry| entry.get("ticker").and_then(Value::as_str))
            .map(str::to_owned)
            .collect())
    }

    /// Balance of every enabled coin, in the node's order.
    pub async fn wallet(&self) -> Result<Vec<(String, RpcResponse)>, CoreError> {
        let enabled = self.get_enabled_coins().await?;
        tracing::debug!(enabled = enabled.len(), "collecting wallet balances");
        let mut balances = Vec::with_capacity(enabled.len());
        for coin in enabled {
            let balance = self.my_balance(&coin).await?;
            balances.push((coin, balance));
        }
        Ok(balances)
    }

    pub async fn my_tx_history(
        &self,
        coin: &str,
        limit: u32,
        max: bool,
    ) -> Result<Value, CoreError> {
        self.forward_result(
            "my_tx_history",
            params! { "coin" => coin, "limit" => limit, "max" => max },
        )
        .await
    }

    pub async fn validateaddress(&self, coin: &str, address: &str) -> Result<Value, CoreError> {
        self.forward_result("validateaddress", params! { "coin" => coin, "address" => address })
            .await
    }

    pub async fn show_priv_key(&self, coin: &str) -> Result<Value, CoreError> {
        self.forward_result("show_priv_key", params! { "coin" => coin })
            .await
    }

    // ==========================================================================
    // Trading
    // ==========================================================================

    pub async fn setprice(
        &self,
        base: &str,
        rel: &str,
        volume: f64,
        price: f64,
    ) -> Result<Value, CoreError> {
        self.forward_result(
            "setprice",
            params! { "base" => base, "rel" => rel, "volume" => volume, "price" => price },
        )
        .await
    }

    /// Place a maker order for the whole `base` balance.
    pub async fn setprice_max(
        &self,
        base: &str,
        rel: &str,
        price: f64,
    ) -> Result<Value, CoreError> {
        self.forward_result(
            "setprice",
            params! { "base" => base, "rel" => rel, "max" => true, "price" => price },
        )
        .await
    }

    pub async fn buy(
        &self,
        base: &str,
        rel: &str,
        volume: f64,
        price: f64,
    ) -> Result<Value, CoreError> {
        self.forward_result(
            "buy",
            params! { "base" => base, "rel" => rel, "volume" => volume, "price" => price },
        )
        .await
    }

    pub async fn sell(
        &self,
        base: &str,
        rel: &str,
        volume: f64,
        price: f64,
    ) -> Result<Value, CoreError> {
        self.forward_result(
            "sell",
            params! { "base" => base, "rel" => rel, "volume" => volume, "price" => price },
        )
        .await
    }

    pub async fn max_taker_vol(&self, coin: &str) -> Result<RpcResponse, CoreError> {
        self.forward("max_taker_vol", params! { "coin" => coin }).await
    }

    pub async fn my_orders(&self) -> Result<Value, CoreError> {
        self.forward_result("my_orders", params! {}).await
    }

    pub async fn order_status(&self, uuid: &str) -> Result<Value, CoreError> {
        self.forward_result("order_status", params! { "uuid" => uuid })
            .await
    }

    pub async fn my_recent_swaps(&self, limit: u32) -> Result<Value, CoreError> {
        self.forward_result("my_recent_swaps", params! { "limit" => limit })
            .await
    }

    pub async fn my_swap_status(&self, uuid: &str) -> Result<RpcResponse, CoreError> {
        self.forward("my_swap_status", params! { "uuid" => uuid }).await
    }

    pub async fn set_required_confirmations(
        &self,
        coin: &str,
        confirmations: u32,
    ) -> Result<RpcResponse, CoreError> {
        self.forward(
            "set_required_confirmations",
            params! { "coin" => coin, "confirmations" => confirmations },
        )
        .await
    }

    pub async fn set_requires_notarization(
        &self,
        coin: &str,
        requires: bool,
    ) -> Result<RpcResponse, CoreError> {
        self.forward(
            "set_requires_notarization",
            params! { "coin" => coin, "requires_notarization" => requires },
        )
        .await
    }

    pub async fn orderbook(&self, base: &str, rel: &str) -> Result<RpcResponse, CoreError> {
        self.forward("orderbook", params! { "base" => base, "rel" => rel })
            .await
    }

    pub async fn cancel_all_orders(&self, cancel_by: &CancelBy) -> Result<Value, CoreError> {
        let cancel_by = to_json(cancel_by)?;
        self.forward_result("cancel_all_orders", params! { "cancel_by" => cancel_by })
            .await
    }

    pub async fn cancel_order(&self, uuid: &str) -> Result<RpcResponse, CoreError> {
        self.forward("cancel_order", params! { "uuid" => uuid }).await
    }

    // ==========================================================================
    // Utilities
    // ==========================================================================

    pub async fn list_banned_pubkeys(&self) -> Result<Value, CoreError> {
        self.forward_result("list_banned_pubkeys", params! {}).await
    }

    pub async fn unban_pubkeys(&self, pubkeys: Vec<String>) -> Result<RpcResponse, CoreError> {
        let unban_by = to_json(&UnbanBy::Few(pubkeys))?;
        self.forward("unban_pubkeys", params! { "unban_by" => unban_by })
            .await
    }

    pub async fn unban_all_pubkeys(&self) -> Result<Value, CoreError> {
        let unban_by = to_json(&UnbanBy::All)?;
        self.forward_result("unban_pubkeys", params! { "unban_by" => unban_by })
            .await
    }

    pub async fn version(&self) -> Result<RpcResponse, CoreError> {
        self.forward("version", params! {}).await
    }

    pub async fn help(&self) -> Result<RpcResponse, CoreError> {
        self.forward("help", params! {}).await
    }

    /// Ask the node to shut down.
    pub async fn stop(&self) -> Result<Value, CoreError> {
        self.forward_result("stop", params! {}).await
    }
}

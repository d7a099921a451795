use clap::{Parser, Subcommand};

use marketmaker_core::registry::{
    DEFAULT_ETH_BASE_URL, DEFAULT_FETCH_CONCURRENCY, DEFAULT_UTXO_BASE_URL,
};
use marketmaker_core::rpc::{
    DEFAULT_RPC_HOST, DEFAULT_RPC_PORT, DEFAULT_RPC_TIMEOUT, DEFAULT_USERPASS,
};

/// marketmaker — command-line client for an AtomicDEX marketmaker node.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Node RPC password, sent as `userpass` in every request.
    #[arg(long, default_value = DEFAULT_USERPASS, env = "MM_USERPASS", hide_env_values = true)]
    pub userpass: String,

    /// Node RPC host.
    #[arg(long, default_value = DEFAULT_RPC_HOST, env = "MM_RPC_HOST")]
    pub rpc_host: String,

    /// Node RPC port.
    #[arg(long, default_value_t = DEFAULT_RPC_PORT, env = "MM_RPC_PORT")]
    pub rpc_port: u16,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_RPC_TIMEOUT.as_secs(), env = "MM_RPC_TIMEOUT")]
    pub timeout_secs: u64,

    /// Base URL of electrum server lists for UTXO coins.
    #[arg(long, default_value = DEFAULT_UTXO_BASE_URL)]
    pub utxo_url: String,

    /// Base URL of node lists for ETH-family coins.
    #[arg(long, default_value = DEFAULT_ETH_BASE_URL)]
    pub eth_url: String,

    /// Coin tickers to load endpoints for (repeatable).
    /// If omitted, a built-in list is used.
    #[arg(long = "ticker")]
    pub tickers: Vec<String>,

    /// Maximum concurrent endpoint-list fetches.
    #[arg(long, default_value_t = DEFAULT_FETCH_CONCURRENCY)]
    pub registry_concurrency: usize,

    /// Optional cap on endpoint-list fetches per second.
    #[arg(long)]
    pub registry_rps: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Call any node method with a JSON object of parameters.
    Call {
        method: String,
        #[arg(long, default_value = "{}")]
        params: String,
    },

    /// Send a JSON object of labelled sub-requests as one batch.
    Batch { requests: String },

    /// Fetch and print the coin endpoint registry.
    Electrums,

    /// Print the node version.
    Version,

    /// Print the balance of one coin.
    Balance { coin: String },

    /// Activate a coin with its registered endpoints.
    Enable {
        coin: String,
        /// Activate as an ETH/ERC20 coin.
        #[arg(long)]
        erc20: bool,
    },

    /// List tickers of active coins.
    EnabledCoins,

    /// Print the orderbook of a pair.
    Orderbook { base: String, rel: String },

    /// Stop the node.
    Stop,
}

impl Command {
    /// Whether the command needs the endpoint registry to be built first.
    pub fn needs_registry(&self) -> bool {
        matches!(self, Command::Electrums | Command::Enable { .. })
    }
}

mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{eyre, WrapErr};
use serde_json::{json, Value};

use marketmaker_core::error::RpcError;
use marketmaker_core::registry::{
    EndpointSource, HttpEndpointSource, RegistrySources, DEFAULT_FETCH_TIMEOUT,
};
use marketmaker_core::rpc::{Params, ProxyConfig};
use marketmaker_core::{CoreError, MarketMaker, MmProxy, Registry, RegistryBuilder};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .init();

    let config = ProxyConfig {
        userpass: args.userpass.clone(),
        host: args.rpc_host.clone(),
        port: args.rpc_port,
        timeout: Duration::from_secs(args.timeout_secs),
    };
    let proxy = MmProxy::new(&config).wrap_err("configure node RPC client")?;

    let registry = if args.command.needs_registry() {
        build_registry(&args).await?
    } else {
        Registry::default()
    };
    let mm = MarketMaker::new(proxy, registry);
    let endpoint = format!("http://{}:{}", args.rpc_host, args.rpc_port);

    match &args.command {
        Command::Call { method, params } => {
            let params = parse_params(params).wrap_err("parse --params")?;
            let response = mm.proxy().call(method, params).await;
            println!("{}", node_result(response, &endpoint)?);
        }
        Command::Batch { requests } => {
            let requests = parse_params(requests).wrap_err("parse batch requests")?;
            let response = mm.proxy().call("batch", requests).await;
            println!("{}", node_result(response, &endpoint)?);
        }
        Command::Electrums => print_registry(mm.registry()),
        Command::Version => println!("{}", node_result(mm.version().await, &endpoint)?),
        Command::Balance { coin } => {
            println!("{}", node_result(mm.my_balance(coin).await, &endpoint)?)
        }
        Command::Enable { coin, erc20 } => {
            let response = if *erc20 {
                mm.enable_erc20(coin).await
            } else {
                mm.enable(coin).await
            };
            println!("{}", node_result(response, &endpoint)?);
        }
        Command::EnabledCoins => {
            let coins = node_result(mm.get_enabled_coins().await, &endpoint)?;
            println!("Enabled coins {coins:?}, total: {}", coins.len());
        }
        Command::Orderbook { base, rel } => {
            println!("{}", node_result(mm.orderbook(base, rel).await, &endpoint)?)
        }
        Command::Stop => println!("{:#}", node_result(mm.stop().await, &endpoint)?),
    }

    Ok(())
}

async fn build_registry(args: &Cli) -> eyre::Result<Registry> {
    let source = HttpEndpointSource::new(DEFAULT_FETCH_TIMEOUT, args.registry_rps)
        .wrap_err("configure endpoint source")?;
    let builder = RegistryBuilder::new(Arc::new(source) as Arc<dyn EndpointSource>)
        .with_concurrency(args.registry_concurrency);

    let tickers = if args.tickers.is_empty() {
        RegistrySources::default().tickers
    } else {
        args.tickers.clone()
    };
    tracing::info!(
        utxo_url = %args.utxo_url,
        eth_url = %args.eth_url,
        "loading coin endpoints from the coins repository"
    );
    Ok(builder
        .build(&tickers, &args.utxo_url, &args.eth_url)
        .await)
}

fn parse_params(raw: &str) -> eyre::Result<Params> {
    match serde_json::from_str::<Value>(raw).wrap_err("invalid JSON")? {
        Value::Object(map) => Ok(map),
        other => Err(eyre!("expected a JSON object, got {other}")),
    }
}

fn print_registry(registry: &Registry) {
    let failures: Vec<Value> = registry
        .failures()
        .iter()
        .map(|f| json!({ "ticker": f.ticker, "url": f.url, "error": f.error }))
        .collect();
    let output = json!({
        "electrums": registry.electrums(),
        "available_coins": registry.available_coins(),
        "failures": failures,
    });
    println!("{output:#}");
}

/// Attach an actionable hint to node call failures.
fn node_result<T>(result: Result<T, CoreError>, endpoint: &str) -> eyre::Result<T> {
    result.map_err(|err| {
        let message = format_rpc_error(endpoint, &err);
        eyre!(message).wrap_err("while calling the marketmaker node")
    })
}

fn format_rpc_error(endpoint: &str, err: &CoreError) -> String {
    let mut lines = vec![
        format!("request to `{endpoint}` failed"),
        format!("error: {err}"),
    ];

    match err {
        CoreError::Rpc(RpcError::Transport(e)) if e.is_timeout() => lines.push(
            "hint: the node did not answer in time; raise --timeout-secs or check node load"
                .into(),
        ),
        CoreError::Rpc(RpcError::Transport(e)) if e.is_connect() => lines.push(
            "hint: the node is not reachable; verify it is running and --rpc-host/--rpc-port"
                .into(),
        ),
        CoreError::Rpc(RpcError::MissingResult { .. }) => lines.push(
            "hint: the node rejected the request; check --userpass and the method parameters"
                .into(),
        ),
        CoreError::UnknownCoin(_) => {
            lines.push("hint: pass the coin with --ticker so its endpoints are loaded".into())
        }
        _ => {}
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use marketmaker_core::rpc::DEFAULT_RPC_TIMEOUT;

    use super::*;

    #[test]
    fn parse_params_accepts_objects_only() {
        let params = parse_params(r#"{"coin":"KMD","limit":5}"#).expect("object parses");
        assert_eq!(params.get("coin"), Some(&json!("KMD")));
        assert!(parse_params("[1,2]").is_err());
        assert!(parse_params("not json").is_err());
    }

    #[test]
    fn unknown_coin_error_suggests_ticker_flag() {
        let message =
            format_rpc_error("http://127.0.0.1:7783", &CoreError::UnknownCoin("XYZ".into()));
        assert!(message.contains("`http://127.0.0.1:7783`"));
        assert!(message.contains("--ticker"));
    }

    #[test]
    fn only_endpoint_commands_build_the_registry() {
        assert!(Command::Electrums.needs_registry());
        assert!(Command::Enable {
            coin: "KMD".into(),
            erc20: false
        }
        .needs_registry());
        assert!(!Command::Version.needs_registry());
    }

    #[test]
    fn timeout_defaults_to_the_proxy_default() {
        let cli = Cli::try_parse_from(["marketmaker", "version"]).expect("arguments parse");
        assert_eq!(cli.timeout_secs, DEFAULT_RPC_TIMEOUT.as_secs());
    }
}

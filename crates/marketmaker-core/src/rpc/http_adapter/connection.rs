use reqwest::Url;

use crate::error::CoreError;

/// Build the node endpoint URL from a host and port.
pub(super) fn rpc_url(host: &str, port: u16) -> Result<String, CoreError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(CoreError::Config("rpc host must not be empty".to_owned()));
    }

    let url = format!("http://{host}:{port}");
    let parsed = Url::parse(&url).map_err(|e| {
        CoreError::Config(format!("invalid rpc endpoint `{url}`: {e}"))
    })?;
    if parsed.host_str().is_none() || parsed.path() != "/" {
        return Err(CoreError::Config(format!(
            "invalid rpc endpoint `{url}`: host must not contain a path"
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_url_from_host_and_port() {
        let url = rpc_url("127.0.0.1", 7783).expect("should build");
        assert_eq!(url, "http://127.0.0.1:7783");
    }

    #[test]
    fn rpc_url_accepts_hostnames() {
        let url = rpc_url("localhost", 80).expect("should build");
        assert_eq!(url, "http://localhost:80");
    }

    #[test]
    fn rpc_url_rejects_empty_host() {
        let err = rpc_url("  ", 7783).expect_err("must reject empty host");
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn rpc_url_rejects_host_with_path() {
        let err = rpc_url("example.com/rpc", 7783).expect_err("must reject path");
        assert!(err.to_string().contains("invalid rpc endpoint"));
    }
}

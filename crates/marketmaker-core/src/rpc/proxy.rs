use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{CoreError, RpcError};

use super::http_adapter::HttpTransport;
use super::ids::RequestIdAllocator;
use super::protocol::{
    frame_batch, frame_single, is_batch_method, validate_batch, Params, RpcResponse,
};
use super::RpcTransport;

pub const DEFAULT_USERPASS: &str = "testuser";
pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 7783;
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(120);

// ==============================================================================
// Configuration
// ==============================================================================

/// Connection settings for a marketmaker node.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Shared secret sent as `userpass` in every request.
    pub userpass: String,
    pub host: String,
    pub port: u16,
    /// Bound on a whole request, connect through body.
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            userpass: DEFAULT_USERPASS.to_owned(),
            host: DEFAULT_RPC_HOST.to_owned(),
            port: DEFAULT_RPC_PORT,
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

// ==============================================================================
// Proxy
// ==============================================================================

/// Generic entrypoint for every node method.
///
/// The node's method set is versioned independently of this client, so no
/// method is enumerated here: any name and any keyword parameters are
/// framed and sent as given. Parameters are merged into the request object
/// after the protocol fields and may therefore override `method`, `id`,
/// `userpass` or `jsonrpc`.
pub struct MmProxy {
    transport: Arc<dyn RpcTransport>,
    userpass: String,
    ids: Arc<RequestIdAllocator>,
}

impl MmProxy {
    /// Connect over HTTP using `config`, with a fresh id sequence.
    pub fn new(config: &ProxyConfig) -> Result<Self, CoreError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            config.userpass.clone(),
        ))
    }

    pub fn with_transport(transport: Arc<dyn RpcTransport>, userpass: impl Into<String>) -> Self {
        Self {
            transport,
            userpass: userpass.into(),
            ids: Arc::new(RequestIdAllocator::new()),
        }
    }

    /// Draw request ids from `ids` instead of a private sequence.
    pub fn with_id_allocator(mut self, ids: Arc<RequestIdAllocator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn id_allocator(&self) -> &Arc<RequestIdAllocator> {
        &self.ids
    }

    /// Call `method` on the node.
    ///
    /// When `method` contains `"batch"`, `params` maps arbitrary labels to
    /// sub-request descriptors, each an object with a `method` field; one
    /// request per descriptor is sent in a single array body, in the map's
    /// iteration order, each with its own id. An empty batch still consumes
    /// one id and sends `[]`.
    ///
    /// Returns the decoded JSON body, or the raw body as text when it is
    /// not JSON.
    pub async fn call(&self, method: &str, params: Params) -> Result<RpcResponse, CoreError> {
        if method.is_empty() {
            return Err(RpcError::EmptyMethod.into());
        }

        let body = if is_batch_method(method) {
            let descriptors = validate_batch(&params)?;
            let start_id = self.ids.reserve(descriptors.len().max(1) as u64);
            debug!(
                rpc.method = method,
                rpc.batch_start_id = start_id,
                rpc.batch_size = descriptors.len(),
                "rpc batch call"
            );
            frame_batch(&self.userpass, &descriptors, start_id)
        } else {
            let id = self.ids.reserve(1);
            debug!(
                rpc.id = id,
                rpc.method = method,
                rpc.params = params.len(),
                "rpc call"
            );
            frame_single(&self.userpass, method, id, &params)
        };
        let body = serde_json::to_string(&body).map_err(RpcError::Encode)?;

        let raw = self.transport.post(body).await?;
        let response = RpcResponse::decode(raw);
        if let RpcResponse::Text(text) = &response {
            trace!(rpc.method = method, body = %text, "rpc response is not JSON");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::super::mock::MockTransport;
    use super::*;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            other => panic!("test params must be an object, got {other}"),
        }
    }

    fn proxy_with(transport: &Arc<MockTransport>) -> MmProxy {
        MmProxy::with_transport(Arc::clone(transport) as Arc<dyn RpcTransport>, "secret")
    }

    #[tokio::test]
    async fn single_call_frames_method_params_and_userpass() {
        let transport = Arc::new(MockTransport::replying(r#"{"result":"ok"}"#));
        let proxy = proxy_with(&transport);

        let response = proxy
            .call("foo", params(json!({"a": 1, "b": "x"})))
            .await
            .expect("call should succeed");
        assert_eq!(response, RpcResponse::Json(json!({"result": "ok"})));

        let sent = transport.sent_json();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            json!({
                "jsonrpc": "2.0",
                "userpass": "secret",
                "method": "foo",
                "id": 0,
                "a": 1,
                "b": "x",
            })
        );
    }

    #[tokio::test]
    async fn ids_strictly_increase_across_single_and_batch_calls() {
        let transport = Arc::new(MockTransport::replying("[]"));
        let proxy = proxy_with(&transport);

        proxy.call("version", Params::new()).await.expect("call");
        proxy
            .call(
                "batch",
                params(json!({
                    "first": {"method": "my_balance", "coin": "KMD"},
                    "second": {"method": "my_balance", "coin": "BTC"},
                    "third": {"method": "my_orders"},
                })),
            )
            .await
            .expect("batch call");
        proxy.call("help", Params::new()).await.expect("call");

        let mut ids = Vec::new();
        for body in transport.sent_json() {
            match body {
                Value::Array(frames) => {
                    ids.extend(frames.iter().map(|f| f["id"].as_u64().expect("numeric id")))
                }
                frame => ids.push(frame["id"].as_u64().expect("numeric id")),
            }
        }
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn empty_batch_still_consumes_an_id() {
        let transport = Arc::new(MockTransport::replying("[]"));
        let proxy = proxy_with(&transport);

        proxy.call("batch", Params::new()).await.expect("empty batch");
        proxy.call("version", Params::new()).await.expect("call");

        let sent = transport.sent_json();
        assert_eq!(sent[0], json!([]));
        assert_eq!(sent[1]["id"], 1);
        assert_eq!(proxy.id_allocator().peek(), 2);
    }

    #[tokio::test]
    async fn batch_call_sends_one_array_without_labels() {
        let transport = Arc::new(MockTransport::replying(r#"[{"result":1},{"result":2}]"#));
        let proxy = proxy_with(&transport);

        let response = proxy
            .call(
                "batch",
                params(json!({
                    "label1": {"method": "m1", "x": 1},
                    "label2": {"method": "m2", "y": 2},
                })),
            )
            .await
            .expect("batch call should succeed");
        assert_eq!(
            response,
            RpcResponse::Json(json!([{"result": 1}, {"result": 2}]))
        );

        let sent = transport.sent_json();
        assert_eq!(sent.len(), 1, "a batch is one round trip");
        let frames = sent[0].as_array().expect("batch body is an array");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["method"], "m1");
        assert_eq!(frames[1]["method"], "m2");
        assert_ne!(frames[0]["id"], frames[1]["id"]);
        let serialized = sent[0].to_string();
        assert!(!serialized.contains("label1"));
        assert!(!serialized.contains("label2"));
    }

    #[tokio::test]
    async fn malformed_batch_fails_before_sending() {
        let transport = Arc::new(MockTransport::replying("{}"));
        let proxy = proxy_with(&transport);

        let err = proxy
            .call(
                "my_batch",
                params(json!({"good": {"method": "m1"}, "bad": {"coin": "KMD"}})),
            )
            .await
            .expect_err("descriptor without method must fail");
        assert!(matches!(
            err,
            CoreError::Rpc(RpcError::MalformedDescriptor { ref label, .. }) if label == "bad"
        ));
        assert!(transport.sent().is_empty(), "no frame may be sent");
    }

    #[tokio::test]
    async fn non_json_body_is_returned_as_text() {
        let transport = Arc::new(MockTransport::replying("not-json"));
        let proxy = proxy_with(&transport);

        let response = proxy
            .call("version", Params::new())
            .await
            .expect("non-JSON body is not an error");
        assert_eq!(response, RpcResponse::Text("not-json".to_owned()));
        assert_eq!(response.as_text(), Some("not-json"));
    }

    #[tokio::test]
    async fn failed_post_propagates_and_still_consumes_id() {
        let transport = Arc::new(MockTransport::failing());
        let proxy = proxy_with(&transport);

        let err = proxy
            .call("version", Params::new())
            .await
            .expect_err("transport failure must surface");
        assert!(matches!(err, CoreError::Config(_)));
        assert_eq!(proxy.id_allocator().peek(), 1);
        assert_eq!(transport.sent().len(), 1, "exactly one attempt");
    }

    #[tokio::test]
    async fn empty_method_is_rejected_without_consuming_an_id() {
        let transport = Arc::new(MockTransport::replying("{}"));
        let proxy = proxy_with(&transport);

        let err = proxy
            .call("", Params::new())
            .await
            .expect_err("empty method must be rejected");
        assert!(matches!(err, CoreError::Rpc(RpcError::EmptyMethod)));
        assert_eq!(proxy.id_allocator().peek(), 0);
    }

    #[tokio::test]
    async fn proxies_sharing_an_allocator_never_reuse_ids() {
        let ids = Arc::new(RequestIdAllocator::starting_at(100));
        let first_transport = Arc::new(MockTransport::replying("{}"));
        let second_transport = Arc::new(MockTransport::replying("{}"));
        let first = proxy_with(&first_transport).with_id_allocator(Arc::clone(&ids));
        let second = proxy_with(&second_transport).with_id_allocator(Arc::clone(&ids));

        first.call("a", Params::new()).await.expect("call");
        second.call("b", Params::new()).await.expect("call");
        first.call("c", Params::new()).await.expect("call");

        assert_eq!(first_transport.sent_json()[0]["id"], 100);
        assert_eq!(second_transport.sent_json()[0]["id"], 101);
        assert_eq!(first_transport.sent_json()[1]["id"], 102);
    }

    #[tokio::test]
    async fn concurrent_calls_receive_distinct_ids() {
        let transport = Arc::new(MockTransport::replying("{}"));
        let proxy = Arc::new(proxy_with(&transport));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let proxy = Arc::clone(&proxy);
                tokio::spawn(async move { proxy.call("version", Params::new()).await })
            })
            .collect();
        for handle in handles {
            handle
                .await
                .expect("task must not panic")
                .expect("call should succeed");
        }

        let mut ids: Vec<u64> = transport
            .sent_json()
            .iter()
            .map(|frame| frame["id"].as_u64().expect("numeric id"))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..16).collect::<Vec<_>>());
    }
}

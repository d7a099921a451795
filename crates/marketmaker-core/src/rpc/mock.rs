use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;

use super::RpcTransport;

/// A mock transport for testing. Records every request body and answers
/// from a queue of canned replies; the last reply repeats once the queue is
/// drained. With no replies at all, every call fails.
pub struct MockTransport {
    replies: Mutex<VecDeque<String>>,
    sent: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::replying_in_order([reply.into()])
    }

    pub fn replying_in_order(replies: impl IntoIterator<Item = String>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::replying_in_order([])
    }

    /// Raw bodies posted so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }

    /// Posted bodies parsed back into JSON.
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .map(|body| serde_json::from_str(body).expect("proxy must post valid JSON"))
            .collect()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn post(&self, body: String) -> Result<String, CoreError> {
        self.sent.lock().expect("mock lock poisoned").push(body);
        let mut replies = self.replies.lock().expect("mock lock poisoned");
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.ok_or_else(|| CoreError::Config("mock transport is offline".to_owned()))
    }
}

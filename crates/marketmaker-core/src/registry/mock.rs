use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CoreError, RegistryError};

use super::EndpointSource;

/// A mock endpoint source for testing. Serves canned JSON documents or HTTP
/// statuses keyed by URL; unknown URLs answer 404.
pub struct MockSource {
    documents: HashMap<String, Result<Value, u16>>,
    requested: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with_json(mut self, url: &str, body: Value) -> Self {
        self.documents.insert(url.to_owned(), Ok(body));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.documents.insert(url.to_owned(), Err(status));
        self
    }

    /// URLs fetched so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl EndpointSource for MockSource {
    async fn fetch(&self, url: &str) -> Result<Value, CoreError> {
        self.requested
            .lock()
            .expect("mock lock poisoned")
            .push(url.to_owned());
        match self.documents.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(RegistryError::Status { status: *status }.into()),
            None => Err(RegistryError::Status { status: 404 }.into()),
        }
    }
}

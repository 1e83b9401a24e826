//! In-memory cluster used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use namespace_reaper::{Namespace, NamespaceDeleter, NamespaceSource, SourceError};
use std::collections::BTreeSet;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub const ANNOTATION_KEY: &str = "your-annotation-key";

/// Namespaces stored in insertion order, mimicking the API's list order
#[derive(Default)]
pub struct FakeCluster {
    namespaces: Mutex<Vec<Namespace>>,
    delete_calls: Mutex<Vec<String>>,
    failing_deletes: BTreeSet<String>,
    list_error: Option<String>,
    /// Cancelled right after the first delete call, to simulate a shutdown mid-cycle
    cancel_after_first_delete: Option<CancellationToken>,
}

impl FakeCluster {
    pub fn new(namespaces: Vec<Namespace>) -> Self {
        Self {
            namespaces: Mutex::new(namespaces),
            ..Self::default()
        }
    }

    pub fn failing_delete_for(mut self, name: &str) -> Self {
        self.failing_deletes.insert(name.to_string());
        self
    }

    pub fn failing_list(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    pub fn cancel_after_first_delete(mut self, token: CancellationToken) -> Self {
        self.cancel_after_first_delete = Some(token);
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.namespaces
            .lock()
            .unwrap()
            .iter()
            .map(|ns| ns.name.clone())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().iter().any(|n| n == name)
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NamespaceSource for FakeCluster {
    async fn list(&self) -> Result<Vec<Namespace>, SourceError> {
        if let Some(message) = &self.list_error {
            return Err(SourceError::Unavailable(message.clone()));
        }
        Ok(self.namespaces.lock().unwrap().clone())
    }
}

#[async_trait]
impl NamespaceDeleter for FakeCluster {
    async fn delete(&self, name: &str) -> Result<(), SourceError> {
        self.delete_calls.lock().unwrap().push(name.to_string());
        if let Some(token) = &self.cancel_after_first_delete {
            token.cancel();
        }

        if self.failing_deletes.contains(name) {
            return Err(SourceError::Unavailable(format!(
                "namespaces \"{name}\" is forbidden"
            )));
        }

        let mut namespaces = self.namespaces.lock().unwrap();
        let before = namespaces.len();
        namespaces.retain(|ns| ns.name != name);
        if namespaces.len() == before {
            return Err(SourceError::Unavailable(format!(
                "namespaces \"{name}\" not found"
            )));
        }
        Ok(())
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn expiring(name: &str, expires_at: i64) -> Namespace {
    Namespace::new(name).with_annotation(ANNOTATION_KEY, expires_at.to_string())
}

//! Namespace listing and deletion
//!
//! The cycle only talks to the cluster through [`NamespaceSource`] and
//! [`NamespaceDeleter`]. [`KubeNamespaces`] implements both on top of the
//! Kubernetes API; tests plug in in-memory fakes.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace as K8sNamespace;
use kube::api::{Api, DeleteParams, ListParams};
use kube::{Client, Error as KubeError};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the namespace API
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] KubeError),

    #[error("namespace API unavailable: {0}")]
    Unavailable(String),
}

/// Snapshot of a namespace as seen by one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub annotations: BTreeMap<String, String>,
}

impl Namespace {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// Lists every namespace in the cluster
#[async_trait]
pub trait NamespaceSource: Send + Sync {
    /// Namespaces in whatever order the API returns them.
    async fn list(&self) -> Result<Vec<Namespace>, SourceError>;
}

/// Deletes a namespace by exact name
#[async_trait]
pub trait NamespaceDeleter: Send + Sync {
    async fn delete(&self, name: &str) -> Result<(), SourceError>;
}

/// Kubernetes-backed namespace API
#[derive(Clone)]
pub struct KubeNamespaces {
    api: Api<K8sNamespace>,
}

impl KubeNamespaces {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

impl From<K8sNamespace> for Namespace {
    fn from(ns: K8sNamespace) -> Self {
        Self {
            name: ns.metadata.name.unwrap_or_default(),
            annotations: ns.metadata.annotations.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl NamespaceSource for KubeNamespaces {
    async fn list(&self) -> Result<Vec<Namespace>, SourceError> {
        let list = self.api.list(&ListParams::default()).await?;
        debug!(count = list.items.len(), "Listed namespaces");

        Ok(list
            .items
            .into_iter()
            .map(Namespace::from)
            .filter(|ns| {
                if ns.name.is_empty() {
                    warn!("Ignoring namespace object without a name");
                    return false;
                }
                true
            })
            .collect())
    }
}

#[async_trait]
impl NamespaceDeleter for KubeNamespaces {
    async fn delete(&self, name: &str) -> Result<(), SourceError> {
        // Left: object returned while finalizers run. Right: deletion already complete.
        let terminating = self
            .api
            .delete(name, &DeleteParams::default())
            .await?
            .is_left();
        debug!(namespace = %name, terminating, "Delete request accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_namespace_from_k8s_object() {
        let ns = K8sNamespace {
            metadata: ObjectMeta {
                name: Some("test-namespace".to_string()),
                annotations: Some(BTreeMap::from([(
                    "expires-at".to_string(),
                    "1700000000".to_string(),
                )])),
                ..ObjectMeta::default()
            },
            ..K8sNamespace::default()
        };

        let converted = Namespace::from(ns);
        assert_eq!(converted.name, "test-namespace");
        assert_eq!(
            converted.annotations.get("expires-at").map(String::as_str),
            Some("1700000000")
        );
    }

    #[test]
    fn test_namespace_without_annotations() {
        let ns = K8sNamespace {
            metadata: ObjectMeta {
                name: Some("bare".to_string()),
                ..ObjectMeta::default()
            },
            ..K8sNamespace::default()
        };

        let converted = Namespace::from(ns);
        assert_eq!(converted, Namespace::new("bare"));
    }

    #[test]
    fn test_builder_adds_annotations() {
        let ns = Namespace::new("preview-42").with_annotation("expires-at", "10");
        assert_eq!(ns.annotations.len(), 1);
        assert_eq!(ns.annotations["expires-at"], "10");
    }
}

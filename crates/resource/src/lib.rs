//! Kard resource adapters: per-kind cells for data selection and the
//! side-effecting operations against the control plane.

#![forbid(unsafe_code)]

use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, ListParams, PostParams},
    Client,
};

pub mod labels;
pub mod namespace;

pub use labels::{Label, NamespaceLabels};
pub use namespace::{
    build_namespace, create_namespace, from_cells, list_namespaces, select_namespaces, to_cells, NamespaceCell,
    NamespaceList, NamespaceSpec,
};

/// Control-plane calls the namespace operations need.
///
/// Implementations report failures in their own error type; callers receive
/// it unchanged.
#[async_trait::async_trait]
pub trait NamespaceClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, Self::Error>;

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, Self::Error>;
}

/// [`NamespaceClient`] backed by kube-rs.
#[derive(Clone)]
pub struct KubeNamespaceClient {
    api: Api<Namespace>,
}

impl KubeNamespaceClient {
    pub fn new(client: Client) -> Self {
        Self { api: Api::all(client) }
    }

    /// Client from the ambient kubeconfig or in-cluster environment.
    pub async fn try_default() -> Result<Self, kube::Error> {
        Ok(Self::new(Client::try_default().await?))
    }
}

#[async_trait::async_trait]
impl NamespaceClient for KubeNamespaceClient {
    type Error = kube::Error;

    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, kube::Error> {
        self.api.create(&PostParams::default(), namespace).await
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, kube::Error> {
        Ok(self.api.list(&ListParams::default()).await?.items)
    }
}

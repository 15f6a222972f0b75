use crate::crds::DevWorkspace;
use async_trait::async_trait;
use kube::{
    api::{Api, DeleteParams, PostParams},
    Client, ResourceExt,
};
use std::fmt;
use tracing::debug;

/// Namespaced identity of a workspace
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkspaceKey {
    pub namespace: String,
    pub name: String,
}

impl WorkspaceKey {
    #[cfg(test)]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of(workspace: &DevWorkspace) -> Self {
        Self {
            namespace: workspace.namespace().unwrap_or_default(),
            name: workspace.name_any(),
        }
    }
}

impl fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The cluster operations the harness needs
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    type Error: std::error::Error + Into<crate::error::Error> + Send;

    async fn create(&self, workspace: &DevWorkspace) -> Result<DevWorkspace, Self::Error>;

    /// Fetch a workspace, `None` if it does not exist
    async fn get(&self, key: &WorkspaceKey) -> Result<Option<DevWorkspace>, Self::Error>;

    async fn delete(&self, workspace: &DevWorkspace) -> Result<(), Self::Error>;
}

/// Store backed by the Kubernetes API server
#[derive(Clone)]
pub struct ClusterStore {
    client: Client,
}

impl ClusterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<DevWorkspace> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl WorkspaceStore for ClusterStore {
    type Error = kube::Error;

    async fn create(&self, workspace: &DevWorkspace) -> Result<DevWorkspace, kube::Error> {
        let key = WorkspaceKey::of(workspace);
        let created = self
            .api(&key.namespace)
            .create(&PostParams::default(), workspace)
            .await?;
        debug!("Created DevWorkspace {}", key);
        Ok(created)
    }

    async fn get(&self, key: &WorkspaceKey) -> Result<Option<DevWorkspace>, kube::Error> {
        self.api(&key.namespace).get_opt(&key.name).await
    }

    async fn delete(&self, workspace: &DevWorkspace) -> Result<(), kube::Error> {
        let key = WorkspaceKey::of(workspace);
        let _ = self
            .api(&key.namespace)
            .delete(&key.name, &DeleteParams::default())
            .await?;
        debug!("Deleted DevWorkspace {}", key);
        Ok(())
    }
}

use super::Resource;
use tokio::sync::RwLock;

/// Collects resources as the application starts up, for one teardown at the
/// end.
pub struct ResourceRegistry {
    resources: RwLock<Vec<Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self, resource: impl Into<Resource>) {
        let resource = resource.into();
        let mut resources = self.resources.write().await;
        tracing::debug!(resource = %resource.path(), "Registering resource");
        resources.push(resource);
    }

    pub async fn count(&self) -> usize {
        self.resources.read().await.len()
    }

    /// Empties the registry, returning resources in registration order.
    pub async fn take_all(&self) -> Vec<Resource> {
        std::mem::take(&mut *self.resources.write().await)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

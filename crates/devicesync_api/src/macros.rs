//! Shared `Resource` plumbing for the record kinds.

/// Implements `Resource` and `IsSynced` for a record with the common
/// `metadata`/`spec`/`status` layout.
macro_rules! impl_resource {
    ($record:ty, $status:ty, $kind:expr) => {
        impl $crate::resource::IsSynced for $record {
            fn is_synced(&self) -> bool {
                self.status.synced
            }
        }

        impl $crate::resource::Resource for $record {
            type Status = $status;

            const KIND: $crate::resource::Kind = $kind;

            fn meta(&self) -> &$crate::meta::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut $crate::meta::ObjectMeta {
                &mut self.metadata
            }

            fn status(&self) -> &Self::Status {
                &self.status
            }

            fn status_mut(&mut self) -> &mut Self::Status {
                &mut self.status
            }

            fn node_pool(&self) -> &str {
                &self.spec.node_pool
            }

            fn set_node_pool(&mut self, pool: &str) {
                self.spec.node_pool = pool.to_string();
            }

            fn is_managed(&self) -> bool {
                self.spec.managed
            }

            fn set_managed(&mut self, managed: bool) {
                self.spec.managed = managed;
            }

            fn edge_id(&self) -> Option<&str> {
                self.status.edge_id.as_deref().filter(|id| !id.is_empty())
            }

            fn mark_synced(&mut self, edge_id: String) {
                self.status.edge_id = Some(edge_id);
                self.status.synced = true;
            }

            fn mark_unsynced(&mut self) {
                self.status.synced = false;
            }

            fn conditions(&self) -> &$crate::condition::Conditions {
                &self.status.conditions
            }

            fn conditions_mut(&mut self) -> &mut $crate::condition::Conditions {
                &mut self.status.conditions
            }
        }
    };
}

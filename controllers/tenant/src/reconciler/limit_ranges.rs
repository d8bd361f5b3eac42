//! LimitRange replication.

use crds::Tenant;
use k8s_openapi::api::core::v1::{LimitRange, LimitRangeSpec};

use super::Reconciler;
use super::indexed::IndexedChild;
use crate::error::ControllerError;

impl IndexedChild for LimitRange {
    type Item = LimitRangeSpec;

    const ACTION: &'static str = "Ensuring LimitRange";

    fn items(tenant: &Tenant) -> &[LimitRangeSpec] {
        tenant.limit_range_items()
    }

    fn set_item(&mut self, item: &LimitRangeSpec) {
        self.spec = Some(item.clone());
    }
}

impl Reconciler {
    /// Converge the tenant's LimitRanges in one namespace
    pub async fn sync_limit_ranges(&self, tenant: &Tenant, namespace: &str) -> Result<(), ControllerError> {
        self.sync_indexed::<LimitRange>(tenant, namespace).await
    }
}

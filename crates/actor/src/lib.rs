//! Service access actor.
//!
//! Answers "which service plans can be seen, and under what visibility policy"
//! for an optional offering / broker / organization scope. The answer is an
//! ordered list in which every broker's plans are contiguous, plus every
//! warning the remote service produced on the way.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use svcaccess_ccclient::{ClientReply, ResourceClient};
use svcaccess_core::{Access, ServicePlanAccess, ServicePlanVisibility, VisibilityType};
use tracing::{info, warn};

pub mod filter;

pub use filter::AccessFilter;

pub type ServiceAccessReply = ClientReply<Vec<ServicePlanAccess>>;

/// Surface frontends depend on.
#[async_trait]
pub trait ServiceAccessActor: Send + Sync {
    /// Plan access rows ordered by broker, then offering, then plan.
    ///
    /// Errors come from the resource client unchanged; the warnings collected
    /// before the failure are still returned. No matches is an empty success.
    async fn get_service_access(&self, filter: &AccessFilter) -> ServiceAccessReply;
}

/// Actor backed by an injected resource client.
pub struct Actor<C: ?Sized> {
    client: Arc<C>,
}

impl<C: ResourceClient + ?Sized> Actor<C> {
    pub fn new(client: Arc<C>) -> Self { Self { client } }

    pub fn client(&self) -> &C { &self.client }
}

#[async_trait]
impl<C: ResourceClient + ?Sized> ServiceAccessActor for Actor<C> {
    async fn get_service_access(&self, filter: &AccessFilter) -> ServiceAccessReply {
        let t0 = Instant::now();
        info!(
            offering = %filter.service_offering_name().unwrap_or("(all)"),
            broker = %filter.service_broker_name().unwrap_or("(all)"),
            org = %filter.organization_name().unwrap_or("(all)"),
            "actor: service access start"
        );
        let queries = filter.queries();
        let reply = self.client.get_service_plan_visibilities(&queries).await.map(merge);
        match &reply.result {
            Ok(rows) => {
                histogram!("service_access_ms", t0.elapsed().as_secs_f64() * 1000.0);
                histogram!("service_access_records", rows.len() as f64);
                info!(records = rows.len(), warnings = reply.warnings.len(), took_ms = %t0.elapsed().as_millis(), "actor: service access ok");
            }
            Err(e) => {
                warn!(error = %e, warnings = reply.warnings.len(), took_ms = %t0.elapsed().as_millis(), "actor: service access failed");
            }
        }
        reply
    }
}

/// Classify one listed plan. Scopes are kept only for limited visibility.
pub fn classify(v: ServicePlanVisibility) -> ServicePlanAccess {
    let visibility_type = VisibilityType::parse(&v.visibility_type);
    let access = Access::from(&visibility_type);
    let scopes = if access == Access::Limited { v.visibility_details } else { Vec::new() };
    ServicePlanAccess {
        broker_name: v.service_broker_name,
        service_offering_name: v.service_offering_name,
        service_plan_name: v.service_plan_name,
        visibility_type,
        access,
        scopes,
    }
}

/// Stable sort on (broker, offering, plan); brokers end up contiguous
/// whatever order the service listed them in.
pub fn sort_by_broker(rows: &mut [ServicePlanAccess]) {
    rows.sort_by(|a, b| {
        a.broker_name
            .cmp(&b.broker_name)
            .then_with(|| a.service_offering_name.cmp(&b.service_offering_name))
            .then_with(|| a.service_plan_name.cmp(&b.service_plan_name))
    });
}

pub fn merge(rows: Vec<ServicePlanVisibility>) -> Vec<ServicePlanAccess> {
    let mut out: Vec<_> = rows.into_iter().map(classify).collect();
    sort_by_broker(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vis(broker: &str, offering: &str, plan: &str, tag: &str, details: &[&str]) -> ServicePlanVisibility {
        ServicePlanVisibility {
            service_offering_name: offering.into(),
            service_plan_name: plan.into(),
            service_broker_name: broker.into(),
            visibility_type: tag.into(),
            visibility_details: details.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn classify_drops_scopes_unless_limited() {
        let public = classify(vis("b", "o", "p", "public", &["ignored"]));
        assert_eq!(public.access, Access::Public);
        assert!(public.scopes.is_empty());

        let admin = classify(vis("b", "o", "p", "admin", &[]));
        assert_eq!(admin.access, Access::AdminOnly);

        let space = classify(vis("b", "o", "p", "space", &["dev"]));
        assert_eq!(space.access, Access::Limited);
        assert!(space.is_space_scoped());
        assert_eq!(space.scopes, ["dev"]);
    }

    #[test]
    fn unknown_tag_is_never_promoted() {
        for tag in ["", "Public", "ADMIN", "everyone"] {
            let row = classify(vis("b", "o", "p", tag, &["org1"]));
            assert_eq!(row.access, Access::Limited, "tag {tag:?}");
            assert_eq!(row.scopes, ["org1"]);
        }
    }

    #[test]
    fn merge_makes_brokers_contiguous_and_is_stable() {
        let rows = vec![
            vis("b2", "db", "large", "admin", &[]),
            vis("b1", "db", "small", "public", &[]),
            vis("b2", "cache", "tiny", "public", &[]),
            vis("b1", "db", "small", "organization", &["org1"]),
        ];
        let merged = merge(rows);
        let keys: Vec<_> = merged.iter().map(|r| (r.broker_name.as_str(), r.service_plan_name.as_str())).collect();
        assert_eq!(keys, [("b1", "small"), ("b1", "small"), ("b2", "tiny"), ("b2", "large")]);
        // equal keys keep their listed order
        assert_eq!(merged[0].access, Access::Public);
        assert_eq!(merged[1].access, Access::Limited);
    }
}

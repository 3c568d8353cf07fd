//! Resource client: the fetch contract the service access actor consumes.
//!
//! Every operation returns a [`Reply`] so warnings reach the caller on both
//! the success and the error path. List operations walk pagination to the
//! end; callers never see pages or cursors.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use svcaccess_core::{
    Application, Organization, Query, QueryKey, Reply, ResourceKind, ServicePlanVisibility, Space,
};

pub mod fake;
pub mod pager;

pub use fake::FakeResourceClient;
pub use pager::{PageRequest, PageSource, PageToken, PagedClient, RawIncluded, RawPage};

/// Errors reported by the resource client. Passed through the actor unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("authorization: {0}")]
    Authorization(String),
    #[error("{kind}: '{identity}' not found")]
    NotFound { kind: ResourceKind, identity: String },
    #[error("{kind}: '{identity}' matched {count} records, expected one")]
    AmbiguousMatch { kind: ResourceKind, identity: String, count: usize },
    #[error("{kind}: decode failed: {message}")]
    Decode { kind: ResourceKind, message: String },
    #[error("{kind}: more than {max_pages} pages")]
    PageLimit { kind: ResourceKind, max_pages: u32 },
}

pub type ClientReply<T> = Reply<T, ClientError>;

/// Records returned alongside a primary listing when `include=` is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedResources {
    pub organizations: Vec<Organization>,
}

/// Paging limits for [`PagedClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub per_page: u32,
    pub max_pages: u32,
}

impl Default for ClientConfig {
    fn default() -> Self { Self { per_page: 50, max_pages: 1000 } }
}

impl ClientConfig {
    /// Read `SVCACCESS_PER_PAGE` / `SVCACCESS_MAX_PAGES`; bad or missing values keep defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let read = |key: &str, fallback: u32| {
            get(key).and_then(|s| s.trim().parse::<u32>().ok()).filter(|v| *v > 0).unwrap_or(fallback)
        };
        Self {
            per_page: read("SVCACCESS_PER_PAGE", d.per_page),
            max_pages: read("SVCACCESS_MAX_PAGES", d.max_pages),
        }
    }
}

/// Read access to the remote resource-management API.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get_applications(&self, queries: &[Query]) -> ClientReply<Vec<Application>>;

    async fn get_organizations(&self, queries: &[Query]) -> ClientReply<Vec<Organization>>;

    /// Spaces plus any included records (pass `include=organization` to get owners).
    async fn get_spaces(&self, queries: &[Query]) -> ClientReply<(Vec<Space>, IncludedResources)>;

    /// Composite listing: one record per plan with its broker, offering and visibility.
    async fn get_service_plan_visibilities(&self, queries: &[Query]) -> ClientReply<Vec<ServicePlanVisibility>>;

    async fn get_application_by_name_and_space(&self, name: &str, space_guid: &str) -> ClientReply<Application> {
        let queries = [Query::equals(QueryKey::Names, name), Query::equals(QueryKey::SpaceGuids, space_guid)];
        let reply = self.get_applications(&queries).await;
        expect_one(ResourceKind::Applications, format!("{name} in space {space_guid}"), reply)
    }

    async fn get_organization_by_name(&self, name: &str) -> ClientReply<Organization> {
        let queries = [Query::equals(QueryKey::Names, name)];
        let reply = self.get_organizations(&queries).await;
        expect_one(ResourceKind::Organizations, name, reply)
    }
}

/// Narrow a listing that should identify one record.
///
/// Zero matches is `NotFound`, several is `AmbiguousMatch`; warnings are kept either way.
pub fn expect_one<T>(kind: ResourceKind, identity: impl Into<String>, reply: ClientReply<Vec<T>>) -> ClientReply<T> {
    let identity = identity.into();
    reply.and_then(|items| {
        let mut it = items.into_iter();
        match (it.next(), it.len()) {
            (Some(one), 0) => Ok(one),
            (Some(_), rest) => Err(ClientError::AmbiguousMatch { kind, identity, count: rest + 1 }),
            (None, _) => Err(ClientError::NotFound { kind, identity }),
        }
    })
}

//! Pagination walker over a page-at-a-time transport.

use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use svcaccess_core::{
    Application, Organization, Query, QueryKey, Reply, ResourceKind, ServicePlanVisibility, Space, Warnings,
};
use tracing::{debug, info, warn};

use crate::{ClientConfig, ClientError, ClientReply, IncludedResources, ResourceClient};

/// Opaque continuation token handed back by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(pub String);

/// One page request. `token` is `None` for the first page.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub kind: ResourceKind,
    pub queries: &'a [Query],
    pub per_page: u32,
    pub token: Option<&'a PageToken>,
}

impl PageRequest<'_> {
    /// Filter parameters followed by the page size, as `(name, value)` pairs.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut out: Vec<_> = self.queries.iter().map(Query::to_param).collect();
        out.push((QueryKey::PerPage.as_str(), self.per_page.to_string()));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawIncluded {
    #[serde(default)]
    pub organizations: Vec<serde_json::Value>,
}

/// Undecoded page as produced by a transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub resources: Vec<serde_json::Value>,
    #[serde(default)]
    pub included: RawIncluded,
    #[serde(default)]
    pub next: Option<PageToken>,
}

/// Transport seam: fetch exactly one page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: PageRequest<'_>) -> ClientReply<RawPage>;
}

#[derive(Default)]
struct Collected {
    resources: Vec<serde_json::Value>,
    included_organizations: Vec<serde_json::Value>,
}

/// [`ResourceClient`] that exhausts pagination on a [`PageSource`].
///
/// Holds no state between calls; cursor state lives on the stack of one call.
pub struct PagedClient<S> {
    source: S,
    config: ClientConfig,
}

impl<S: PageSource> PagedClient<S> {
    pub fn new(source: S, config: ClientConfig) -> Self { Self { source, config } }

    pub fn source(&self) -> &S { &self.source }
    pub fn config(&self) -> ClientConfig { self.config }

    async fn walk(&self, kind: ResourceKind, queries: &[Query]) -> ClientReply<Collected> {
        let t0 = Instant::now();
        let mut warnings = Warnings::new();
        let mut out = Collected::default();
        let mut token: Option<PageToken> = None;
        let mut pages = 0u32;
        loop {
            if pages >= self.config.max_pages {
                warn!(kind = %kind, max_pages = self.config.max_pages, "ccclient: page limit reached");
                counter!("ccclient_fetch_errors_total", 1u64, "kind" => kind.as_str());
                return Reply::err(ClientError::PageLimit { kind, max_pages: self.config.max_pages }, warnings);
            }
            let request = PageRequest { kind, queries, per_page: self.config.per_page, token: token.as_ref() };
            let (result, page_warnings) = self.source.fetch_page(request).await.into_parts();
            warnings.append(page_warnings);
            pages += 1;
            let page = match result {
                Ok(p) => p,
                Err(e) => {
                    warn!(kind = %kind, page = pages, error = %e, warnings = warnings.len(), "ccclient: page fetch failed");
                    counter!("ccclient_fetch_errors_total", 1u64, "kind" => kind.as_str());
                    return Reply::err(e, warnings);
                }
            };
            counter!("ccclient_pages_total", 1u64, "kind" => kind.as_str());
            debug!(kind = %kind, page = pages, items = page.resources.len(), more = page.next.is_some(), "ccclient: page");
            out.resources.extend(page.resources);
            out.included_organizations.extend(page.included.organizations);
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        histogram!("ccclient_fetch_ms", t0.elapsed().as_secs_f64() * 1000.0);
        info!(kind = %kind, pages, items = out.resources.len(), warnings = warnings.len(), took_ms = %t0.elapsed().as_millis(), "ccclient: list ok");
        Reply::ok(out, warnings)
    }

    async fn list<T: DeserializeOwned + Send>(&self, kind: ResourceKind, queries: &[Query]) -> ClientReply<Vec<T>> {
        self.walk(kind, queries).await.and_then(|c| decode(kind, c.resources))
    }
}

fn decode<T: DeserializeOwned>(kind: ResourceKind, raw: Vec<serde_json::Value>) -> Result<Vec<T>, ClientError> {
    raw.into_iter()
        .map(|v| serde_json::from_value(v).map_err(|e| ClientError::Decode { kind, message: e.to_string() }))
        .collect()
}

#[async_trait]
impl<S: PageSource> ResourceClient for PagedClient<S> {
    async fn get_applications(&self, queries: &[Query]) -> ClientReply<Vec<Application>> {
        self.list(ResourceKind::Applications, queries).await
    }

    async fn get_organizations(&self, queries: &[Query]) -> ClientReply<Vec<Organization>> {
        self.list(ResourceKind::Organizations, queries).await
    }

    async fn get_spaces(&self, queries: &[Query]) -> ClientReply<(Vec<Space>, IncludedResources)> {
        self.walk(ResourceKind::Spaces, queries).await.and_then(|c| {
            let spaces = decode(ResourceKind::Spaces, c.resources)?;
            let organizations = decode(ResourceKind::Organizations, c.included_organizations)?;
            Ok((spaces, IncludedResources { organizations }))
        })
    }

    async fn get_service_plan_visibilities(&self, queries: &[Query]) -> ClientReply<Vec<ServicePlanVisibility>> {
        self.list(ResourceKind::ServicePlanVisibilities, queries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves scripted pages in order and records the tokens it was asked for.
    #[derive(Default)]
    struct ScriptedPages {
        pages: Mutex<VecDeque<ClientReply<RawPage>>>,
        seen: Mutex<Vec<(ResourceKind, Option<PageToken>, Vec<(&'static str, String)>)>>,
    }

    impl ScriptedPages {
        fn new(pages: Vec<ClientReply<RawPage>>) -> Self {
            Self { pages: Mutex::new(pages.into()), seen: Mutex::default() }
        }
    }

    #[async_trait]
    impl PageSource for ScriptedPages {
        async fn fetch_page(&self, request: PageRequest<'_>) -> ClientReply<RawPage> {
            self.seen.lock().unwrap().push((request.kind, request.token.cloned(), request.params()));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Reply::err(ClientError::Transport("no more pages".into()), Warnings::new()))
        }
    }

    fn page(resources: Vec<serde_json::Value>, next: Option<&str>, warnings: &[&str]) -> ClientReply<RawPage> {
        Reply::ok(
            RawPage { resources, included: RawIncluded::default(), next: next.map(|t| PageToken(t.into())) },
            warnings.iter().copied().collect(),
        )
    }

    fn org(name: &str) -> serde_json::Value { json!({ "guid": format!("{name}-guid"), "name": name }) }

    #[tokio::test]
    async fn walks_every_page_and_concatenates_warnings() {
        let source = ScriptedPages::new(vec![
            page(vec![org("o1"), org("o2")], Some("t2"), &["p1-a", "p1-b"]),
            page(vec![org("o3")], Some("t3"), &[]),
            page(vec![org("o4")], None, &["p3"]),
        ]);
        let client = PagedClient::new(source, ClientConfig { per_page: 2, max_pages: 10 });
        let q = [Query::equals(QueryKey::Names, "o1")];
        let reply = client.get_organizations(&q).await;

        let orgs = reply.result.expect("orgs");
        let names: Vec<_> = orgs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["o1", "o2", "o3", "o4"]);
        assert_eq!(reply.warnings.as_slice(), ["p1-a", "p1-b", "p3"]);

        let seen = client.source().seen.lock().unwrap();
        let tokens: Vec<_> = seen.iter().map(|(_, t, _)| t.clone().map(|t| t.0)).collect();
        assert_eq!(tokens, [None, Some("t2".to_string()), Some("t3".to_string())]);
        assert!(seen.iter().all(|(k, _, _)| *k == ResourceKind::Organizations));
        assert_eq!(seen[0].2, vec![("names", "o1".to_string()), ("per_page", "2".to_string())]);
    }

    #[tokio::test]
    async fn failure_mid_walk_keeps_earlier_warnings() {
        let source = ScriptedPages::new(vec![
            page(vec![org("o1")], Some("t2"), &["first"]),
            Reply::err(ClientError::Authorization("forbidden".into()), ["second"].into_iter().collect()),
        ]);
        let client = PagedClient::new(source, ClientConfig::default());
        let reply = client.get_organizations(&[]).await;
        assert_eq!(reply.result, Err(ClientError::Authorization("forbidden".into())));
        assert_eq!(reply.warnings.as_slice(), ["first", "second"]);
    }

    #[tokio::test]
    async fn stops_at_page_limit() {
        let source = ScriptedPages::new(vec![
            page(vec![org("o1")], Some("t2"), &["w"]),
            page(vec![org("o2")], Some("t3"), &[]),
            page(vec![org("o3")], None, &[]),
        ]);
        let client = PagedClient::new(source, ClientConfig { per_page: 1, max_pages: 2 });
        let reply = client.get_organizations(&[]).await;
        assert_eq!(reply.result, Err(ClientError::PageLimit { kind: ResourceKind::Organizations, max_pages: 2 }));
        assert_eq!(reply.warnings.as_slice(), ["w"]);
    }

    #[tokio::test]
    async fn decode_failure_is_reported_with_kind() {
        let source = ScriptedPages::new(vec![page(vec![json!({ "guid": 7 })], None, &["w"])]);
        let client = PagedClient::new(source, ClientConfig::default());
        let reply = client.get_applications(&[]).await;
        match reply.result {
            Err(ClientError::Decode { kind, .. }) => assert_eq!(kind, ResourceKind::Applications),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert_eq!(reply.warnings.as_slice(), ["w"]);
    }

    #[tokio::test]
    async fn spaces_carry_included_organizations() {
        let first = RawPage {
            resources: vec![json!({ "guid": "s1", "name": "dev", "organization_guid": "o1-guid" })],
            included: RawIncluded { organizations: vec![org("o1")] },
            next: Some(PageToken("t2".into())),
        };
        let second = RawPage {
            resources: vec![json!({ "guid": "s2", "name": "prod", "organization_guid": "o2-guid" })],
            included: RawIncluded { organizations: vec![org("o2")] },
            next: None,
        };
        let source = ScriptedPages::new(vec![Reply::ok(first, Warnings::new()), Reply::ok(second, Warnings::new())]);
        let client = PagedClient::new(source, ClientConfig::default());
        let q = [Query::equals(QueryKey::Include, "organization")];
        let (spaces, included) = client.get_spaces(&q).await.result.expect("spaces");
        assert_eq!(spaces.len(), 2);
        let owner = included.organizations.iter().find(|o| o.guid == spaces[1].organization_guid).expect("owner");
        assert_eq!(owner.name, "o2");
    }

    #[tokio::test]
    async fn lookup_by_name_and_space_uses_both_filters() {
        let source = ScriptedPages::new(vec![page(
            vec![json!({ "guid": "a1", "name": "web", "space_guid": "s1", "state": "STARTED" })],
            None,
            &["deprecated"],
        )]);
        let client = PagedClient::new(source, ClientConfig { per_page: 5, max_pages: 3 });
        let reply = client.get_application_by_name_and_space("web", "s1").await;
        assert_eq!(reply.result.map(|a| a.guid), Ok("a1".to_string()));
        assert_eq!(reply.warnings.as_slice(), ["deprecated"]);
        let seen = client.source().seen.lock().unwrap();
        assert_eq!(
            seen[0].2,
            vec![("names", "web".to_string()), ("space_guids", "s1".to_string()), ("per_page", "5".to_string())]
        );
    }

    #[tokio::test]
    async fn visibilities_decode_from_raw_records() {
        let source = ScriptedPages::new(vec![page(
            vec![json!({
                "service_offering_name": "db",
                "service_plan_name": "small",
                "service_broker_name": "b1",
                "visibility_type": "organization",
                "visibility_details": ["org1", "org2"]
            })],
            None,
            &[],
        )]);
        let client = PagedClient::new(source, ClientConfig::default());
        let rows = client.get_service_plan_visibilities(&[]).await.result.expect("rows");
        assert_eq!(rows[0].visibility_details, ["org1", "org2"]);
        assert_eq!(rows[0].visibility_type, "organization");
    }
}

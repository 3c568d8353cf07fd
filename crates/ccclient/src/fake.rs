//! Hand-written fake of [`ResourceClient`] for tests.
//!
//! Each operation records its arguments and answers with a configured reply:
//! a per-call override if one was set for that call index, else the default
//! reply, else an empty success. All state sits behind mutexes so one fake can
//! be shared across tasks.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use svcaccess_core::{Application, Organization, Query, Reply, ResourceKind, ServicePlanVisibility, Space, Warnings};

use crate::{ClientError, ClientReply, IncludedResources, ResourceClient};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct OpState<A, T> {
    args: Vec<A>,
    returns: Option<ClientReply<T>>,
    on_call: FxHashMap<usize, ClientReply<T>>,
}

/// Recorder and canned answers for one fake operation.
pub struct FakeOp<A, T> {
    state: Mutex<OpState<A, T>>,
}

impl<A, T> Default for FakeOp<A, T> {
    fn default() -> Self {
        Self { state: Mutex::new(OpState { args: Vec::new(), returns: None, on_call: FxHashMap::default() }) }
    }
}

impl<A: Clone, T: Clone> FakeOp<A, T> {
    /// Answer every call without a per-call override.
    pub fn returns(&self, reply: ClientReply<T>) { lock(&self.state).returns = Some(reply); }

    /// Answer the `i`-th call (zero-based).
    pub fn returns_on_call(&self, i: usize, reply: ClientReply<T>) { lock(&self.state).on_call.insert(i, reply); }

    pub fn call_count(&self) -> usize { lock(&self.state).args.len() }

    pub fn args_for_call(&self, i: usize) -> Option<A> { lock(&self.state).args.get(i).cloned() }

    fn record(&self, args: A) -> Option<ClientReply<T>> {
        let mut st = lock(&self.state);
        let i = st.args.len();
        st.args.push(args);
        st.on_call.get(&i).cloned().or_else(|| st.returns.clone())
    }
}

/// Fake resource client with per-operation recorders.
#[derive(Default)]
pub struct FakeResourceClient {
    pub get_applications: FakeOp<Vec<Query>, Vec<Application>>,
    pub get_application_by_name_and_space: FakeOp<(String, String), Application>,
    pub get_organizations: FakeOp<Vec<Query>, Vec<Organization>>,
    pub get_spaces: FakeOp<Vec<Query>, (Vec<Space>, IncludedResources)>,
    pub get_service_plan_visibilities: FakeOp<Vec<Query>, Vec<ServicePlanVisibility>>,
    invocations: Mutex<Vec<&'static str>>,
}

impl FakeResourceClient {
    pub fn new() -> Self { Self::default() }

    /// Operation names in the order they were called.
    pub fn invocations(&self) -> Vec<&'static str> { lock(&self.invocations).clone() }

    fn invoked(&self, op: &'static str) { lock(&self.invocations).push(op); }
}

fn empty<T: Default>() -> ClientReply<T> { Reply::ok(T::default(), Warnings::new()) }

#[async_trait]
impl ResourceClient for FakeResourceClient {
    async fn get_applications(&self, queries: &[Query]) -> ClientReply<Vec<Application>> {
        self.invoked("get_applications");
        self.get_applications.record(queries.to_vec()).unwrap_or_else(empty)
    }

    async fn get_organizations(&self, queries: &[Query]) -> ClientReply<Vec<Organization>> {
        self.invoked("get_organizations");
        self.get_organizations.record(queries.to_vec()).unwrap_or_else(empty)
    }

    async fn get_spaces(&self, queries: &[Query]) -> ClientReply<(Vec<Space>, IncludedResources)> {
        self.invoked("get_spaces");
        self.get_spaces.record(queries.to_vec()).unwrap_or_else(empty)
    }

    async fn get_service_plan_visibilities(&self, queries: &[Query]) -> ClientReply<Vec<ServicePlanVisibility>> {
        self.invoked("get_service_plan_visibilities");
        self.get_service_plan_visibilities.record(queries.to_vec()).unwrap_or_else(empty)
    }

    async fn get_application_by_name_and_space(&self, name: &str, space_guid: &str) -> ClientReply<Application> {
        self.invoked("get_application_by_name_and_space");
        self.get_application_by_name_and_space
            .record((name.to_string(), space_guid.to_string()))
            .unwrap_or_else(|| {
                let identity = format!("{name} in space {space_guid}");
                Reply::err(ClientError::NotFound { kind: ResourceKind::Applications, identity }, Warnings::new())
            })
    }
}

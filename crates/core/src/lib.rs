//! Service access core types: warnings, query filters and resource records.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ---- warnings side channel ----

/// Advisory messages surfaced by the remote service. Order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Warnings(Vec<String>);

impl Warnings {
    pub fn new() -> Self { Self(Vec::new()) }

    pub fn push(&mut self, warning: impl Into<String>) { self.0.push(warning.into()); }

    /// Append `later` after the warnings already held.
    pub fn append(&mut self, later: Warnings) { self.0.extend(later.0); }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, String> { self.0.iter() }
    pub fn as_slice(&self) -> &[String] { &self.0 }
    pub fn into_vec(self) -> Vec<String> { self.0 }
}

impl<S: Into<String>> FromIterator<S> for Warnings {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for Warnings {
    fn from(v: Vec<String>) -> Self { Self(v) }
}

impl Extend<String> for Warnings {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) { self.0.extend(iter); }
}

impl IntoIterator for Warnings {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;
    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'a> IntoIterator for &'a Warnings {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

/// Outcome of a remote call: data or error, and always the warnings.
///
/// Warnings are kept on the error path too; callers must surface them
/// before acting on `result`.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T, E> {
    pub result: Result<T, E>,
    pub warnings: Warnings,
}

impl<T, E> Reply<T, E> {
    pub fn ok(value: T, warnings: Warnings) -> Self { Self { result: Ok(value), warnings } }
    pub fn err(error: E, warnings: Warnings) -> Self { Self { result: Err(error), warnings } }

    pub fn is_ok(&self) -> bool { self.result.is_ok() }

    pub fn into_parts(self) -> (Result<T, E>, Warnings) { (self.result, self.warnings) }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U, E> {
        Reply { result: self.result.map(f), warnings: self.warnings }
    }

    /// Fallible continuation that keeps the warnings regardless of outcome.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, E>) -> Reply<U, E> {
        Reply { result: self.result.and_then(f), warnings: self.warnings }
    }

    /// Put warnings gathered by earlier calls in front of this reply's own.
    pub fn after(mut self, earlier: Warnings) -> Self {
        let mut all = earlier;
        all.append(std::mem::take(&mut self.warnings));
        self.warnings = all;
        self
    }
}

// ---- query filters ----

/// Filter fields understood by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKey {
    Names,
    SpaceGuids,
    OrganizationGuids,
    OrganizationNames,
    ServiceOfferingNames,
    ServiceBrokerNames,
    Include,
    PerPage,
}

impl QueryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKey::Names => "names",
            QueryKey::SpaceGuids => "space_guids",
            QueryKey::OrganizationGuids => "organization_guids",
            QueryKey::OrganizationNames => "organization_names",
            QueryKey::ServiceOfferingNames => "service_offering_names",
            QueryKey::ServiceBrokerNames => "service_broker_names",
            QueryKey::Include => "include",
            QueryKey::PerPage => "per_page",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A single `key = value(s)` constraint. Queries on one call are ANDed,
/// values within one query are ORed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub key: QueryKey,
    pub values: SmallVec<[String; 1]>,
}

impl Query {
    pub fn equals(key: QueryKey, value: impl Into<String>) -> Self {
        let mut values = SmallVec::new();
        values.push(value.into());
        Self { key, values }
    }

    pub fn any_of<I, S>(key: QueryKey, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { key, values: values.into_iter().map(Into::into).collect() }
    }

    /// Render as a `(name, comma-joined values)` pair for a transport.
    pub fn to_param(&self) -> (&'static str, String) {
        (self.key.as_str(), self.values.join(","))
    }
}

// ---- resource records ----

/// Resource collections reachable through the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Applications,
    Organizations,
    Spaces,
    ServicePlanVisibilities,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Applications => "applications",
            ResourceKind::Organizations => "organizations",
            ResourceKind::Spaces => "spaces",
            ResourceKind::ServicePlanVisibilities => "service_plan_visibilities",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub space_guid: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub guid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub guid: String,
    pub name: String,
    /// Owning organization; correlate with included organizations by guid.
    #[serde(default)]
    pub organization_guid: String,
}

/// One plan as listed by the composite visibility endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlanVisibility {
    pub service_offering_name: String,
    pub service_plan_name: String,
    pub service_broker_name: String,
    /// Raw tag; see [`VisibilityType`].
    #[serde(default)]
    pub visibility_type: String,
    /// Organization names, or a single space name, granted access.
    #[serde(default)]
    pub visibility_details: Vec<String>,
}

/// Visibility tag as reported by the service. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VisibilityType {
    Public,
    Admin,
    Organization,
    Space,
    Other(String),
}

impl VisibilityType {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "public" => VisibilityType::Public,
            "admin" => VisibilityType::Admin,
            "organization" => VisibilityType::Organization,
            "space" => VisibilityType::Space,
            other => VisibilityType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VisibilityType::Public => "public",
            VisibilityType::Admin => "admin",
            VisibilityType::Organization => "organization",
            VisibilityType::Space => "space",
            VisibilityType::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for VisibilityType {
    fn from(s: String) -> Self { Self::parse(&s) }
}

impl From<VisibilityType> for String {
    fn from(v: VisibilityType) -> Self { v.as_str().to_string() }
}

/// Visibility classification of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    /// Visible in every organization.
    Public,
    /// Visible to privileged users only.
    AdminOnly,
    /// Visible in the named organizations or space.
    Limited,
}

impl From<&VisibilityType> for Access {
    fn from(v: &VisibilityType) -> Self {
        match v {
            VisibilityType::Public => Access::Public,
            VisibilityType::Admin => Access::AdminOnly,
            // Anything else names explicit scopes; never promote an unknown tag.
            _ => Access::Limited,
        }
    }
}

impl Access {
    pub fn classify(tag: &str) -> Self { Access::from(&VisibilityType::parse(tag)) }
}

/// One row of the merged service plan access answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlanAccess {
    pub broker_name: String,
    pub service_offering_name: String,
    pub service_plan_name: String,
    pub visibility_type: VisibilityType,
    pub access: Access,
    /// Non-empty only when `access` is [`Access::Limited`].
    pub scopes: Vec<String>,
}

impl ServicePlanAccess {
    pub fn is_space_scoped(&self) -> bool { self.visibility_type == VisibilityType::Space }
}

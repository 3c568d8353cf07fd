//! Optional scoping inputs and their translation into query filters.

use serde::{Deserialize, Serialize};
use svcaccess_core::{Query, QueryKey};

/// Which plans to list. An absent field means no filtering on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessFilter {
    pub service_offering: Option<String>,
    pub service_broker: Option<String>,
    pub organization: Option<String>,
}

fn present(name: impl Into<String>) -> Option<String> {
    let name = name.into();
    (!name.is_empty()).then_some(name)
}

fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl AccessFilter {
    pub fn new() -> Self { Self::default() }

    /// Build from flag-style values where `""` means "not given".
    pub fn from_names(service_offering: &str, service_broker: &str, organization: &str) -> Self {
        Self {
            service_offering: present(service_offering),
            service_broker: present(service_broker),
            organization: present(organization),
        }
    }

    pub fn with_service_offering(mut self, name: impl Into<String>) -> Self {
        self.service_offering = present(name);
        self
    }

    pub fn with_service_broker(mut self, name: impl Into<String>) -> Self {
        self.service_broker = present(name);
        self
    }

    pub fn with_organization(mut self, name: impl Into<String>) -> Self {
        self.organization = present(name);
        self
    }

    /// Offering filter, if one was given. `Some("")` counts as absent.
    pub fn service_offering_name(&self) -> Option<&str> { given(&self.service_offering) }
    pub fn service_broker_name(&self) -> Option<&str> { given(&self.service_broker) }
    pub fn organization_name(&self) -> Option<&str> { given(&self.organization) }

    pub fn is_unfiltered(&self) -> bool {
        self.service_offering_name().is_none() && self.service_broker_name().is_none() && self.organization_name().is_none()
    }

    /// One equality query per present input, in offering, broker, organization order.
    pub fn queries(&self) -> Vec<Query> {
        [
            (QueryKey::ServiceOfferingNames, self.service_offering_name()),
            (QueryKey::ServiceBrokerNames, self.service_broker_name()),
            (QueryKey::OrganizationNames, self.organization_name()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| Query::equals(key, v)))
        .collect()
    }
}

//! Lookup of reconciliation/extension services in a fetched catalog.
//!
//! Lookups return `Option`; callers decide whether an absent service is fatal.

use serde::Serialize;

use semtab_shared::{Column, Result, SemtabError, ServiceDescriptor};

/// A service list as returned by `reconciliators/list` or `extenders/list`.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: Vec<ServiceDescriptor>,
}

/// Display row for a catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: String,
    pub relative_url: String,
    pub name: String,
}

impl ServiceCatalog {
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self { services }
    }

    pub fn by_id(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn by_prefix(&self, prefix: &str) -> Option<&ServiceDescriptor> {
        self.services
            .iter()
            .find(|s| s.prefix.as_deref() == Some(prefix))
    }

    /// The reconciliator behind a column's authoritative context, if any.
    pub fn reconciliator_for_column(&self, column: &Column) -> Option<&ServiceDescriptor> {
        let (prefix, _) = column.authoritative_context()?;
        self.by_prefix(prefix)
    }

    /// `{id, relativeUrl, name}` for every service, in catalog order.
    pub fn summaries(&self) -> Vec<ServiceSummary> {
        self.services
            .iter()
            .map(|s| ServiceSummary {
                id: s.id.clone(),
                relative_url: s.relative_url.clone(),
                name: s.name.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// The `(prefix, uri)` a reconciliator writes into column context and entity
/// URIs. Both are required to annotate a column.
pub fn namespace(service: &ServiceDescriptor) -> Result<(&str, &str)> {
    match (service.prefix.as_deref(), service.uri.as_deref()) {
        (Some(prefix), Some(uri)) => Ok((prefix, uri)),
        _ => Err(SemtabError::lookup(format!(
            "service '{}' does not declare both a prefix and a uri",
            service.id
        ))),
    }
}

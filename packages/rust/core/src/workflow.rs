//! End-to-end reconcile and extend operations against a live backend.
//!
//! Each operation resolves the service from the catalog, builds the request,
//! performs the one network exchange, and runs the matching pass. The input
//! table is only read; a failure anywhere returns before a new table exists.

use tracing::{info, instrument};

use semtab_services::ServiceClient;
use semtab_shared::{Result, SemtabError, TableDocument};

use crate::extension::apply_extension;
use crate::payload::{ExtensionParams, extension_payload, reconciliation_payload};
use crate::reconcile::apply_reconciliation;
use crate::registry::ServiceCatalog;
use crate::report::{PassOutcome, RowWarning};

/// Progress callback for reporting workflow status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the new table is ready.
    fn done(&self, warnings: &[RowWarning]);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _warnings: &[RowWarning]) {}
}

/// Caller input of [`extend`].
#[derive(Debug, Clone, Default)]
pub struct ExtendRequest {
    pub params: ExtensionParams,
    /// Names for the response columns, in response order.
    pub new_column_names: Vec<String>,
}

/// Reconcile `column_name` with the reconciliator `reconciliator_id`.
#[instrument(skip_all, fields(column = column_name, reconciliator = reconciliator_id))]
pub async fn reconcile(
    client: &ServiceClient,
    doc: &TableDocument,
    column_name: &str,
    reconciliator_id: &str,
    progress: &dyn ProgressReporter,
) -> Result<PassOutcome<TableDocument>> {
    progress.phase("Resolving reconciliator");
    let catalog = ServiceCatalog::new(client.reconciliators().await?);
    let service = catalog.by_id(reconciliator_id).ok_or_else(|| {
        SemtabError::lookup(format!("reconciliator '{reconciliator_id}' is not in the catalog"))
    })?;

    let request = reconciliation_payload(doc, column_name, &service.id)?;

    progress.phase("Reconciling");
    let entries = client.reconcile(service, &request).await?;

    progress.phase("Merging annotations");
    let outcome = apply_reconciliation(doc, column_name, &entries, service)?;

    info!(warnings = outcome.warnings.len(), "reconcile finished");
    progress.done(&outcome.warnings);
    Ok(outcome)
}

/// Extend the table from the reconciled column named in `request.params`.
#[instrument(skip_all, fields(column = %request.params.column_name, extender = %request.params.service_id))]
pub async fn extend(
    client: &ServiceClient,
    doc: &TableDocument,
    request: &ExtendRequest,
    progress: &dyn ProgressReporter,
) -> Result<PassOutcome<TableDocument>> {
    let extender_id = request.params.service_id.as_str();
    if request.new_column_names.is_empty() {
        return Err(SemtabError::validation("at least one new column name is required"));
    }

    progress.phase("Resolving extender");
    let extenders = ServiceCatalog::new(client.extenders().await?);
    let service = extenders.by_id(extender_id).ok_or_else(|| {
        SemtabError::lookup(format!("extender '{extender_id}' is not in the catalog"))
    })?;
    let reconciliators = ServiceCatalog::new(client.reconciliators().await?);

    let payload = extension_payload(doc, &request.params)?;

    progress.phase("Extending");
    let response = client.extend(service, &payload.output).await?;

    progress.phase("Adding columns");
    let mut outcome = apply_extension(doc, &response, &request.new_column_names, &reconciliators)?;

    let mut warnings = payload.warnings;
    warnings.append(&mut outcome.warnings);
    outcome.warnings = warnings;

    info!(warnings = outcome.warnings.len(), "extend finished");
    progress.done(&outcome.warnings);
    Ok(outcome)
}

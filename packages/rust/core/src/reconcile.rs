//! One reconciliation pass: merge a service response into a column.

use tracing::{info, instrument};

use semtab_shared::{ReconciliationEntry, Result, SemtabError, ServiceDescriptor, TableDocument};

use crate::backend::refresh_table_stats;
use crate::cells::{merge_reconciled_cells, resolve_names};
use crate::columns::{apply_column_update, column_metadata_field};
use crate::registry;
use crate::report::{PassOutcome, Warnings};

/// Apply `entries` from `service` to `column_name` and return the new table.
///
/// `doc` is never modified. Cells are merged on a working copy, then the
/// column rollup runs once over the merged cells. A structural or lookup
/// failure discards the copy.
#[instrument(skip_all, fields(column = column_name, service = %service.id, entries = entries.len()))]
pub fn apply_reconciliation(
    doc: &TableDocument,
    column_name: &str,
    entries: &[ReconciliationEntry],
    service: &ServiceDescriptor,
) -> Result<PassOutcome<TableDocument>> {
    if !doc.columns.contains_key(column_name) {
        return Err(SemtabError::structural(format!(
            "column '{column_name}' is not declared"
        )));
    }
    let (_, uri) = registry::namespace(service)?;

    let resolved: Vec<ReconciliationEntry> = entries
        .iter()
        .map(|entry| ReconciliationEntry {
            id: entry.id.clone(),
            label: entry.label.clone(),
            metadata: resolve_names(&entry.metadata, Some(uri)),
        })
        .collect();

    let mut warnings = Warnings::new();
    let mut next = doc.clone();

    merge_reconciled_cells(&mut next, column_name, &resolved, uri, &mut warnings);
    let metadata = column_metadata_field(&resolved, column_name, &mut warnings);
    apply_column_update(&mut next, column_name, service, metadata, &mut warnings)?;
    refresh_table_stats(&mut next);

    info!(
        annotated = next.annotated_cells(column_name),
        warnings = warnings.len(),
        "column reconciled"
    );
    Ok(PassOutcome::new(next, warnings))
}

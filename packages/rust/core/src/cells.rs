//! Writes service candidates back into table cells.
//!
//! Every function here works on a caller-owned working copy of the table; the
//! pass entry points only hand that copy back once every step has succeeded.

use indexmap::IndexMap;
use tracing::debug;

use semtab_shared::{
    AnnotationMeta, COLUMN_INDEX_ID, Candidate, CandidateName, Cell, ColumnKind, EntityName,
    ExtensionCell, ReconciliationEntry, Result, SemtabError, TableDocument, cell_id,
    row_id_in_column, split_cell_id,
};

use crate::report::{WarningKind, Warnings};
use crate::scoring;

/// Rewrite candidate names to `{value, uri}` with `uri = service_uri + entityId`.
///
/// Candidates whose id has no `:` keep their name, as does every candidate
/// when no service URI is known.
pub fn resolve_names(candidates: &[Candidate], service_uri: Option<&str>) -> Vec<Candidate> {
    candidates
        .iter()
        .map(|candidate| {
            let mut resolved = candidate.clone();
            if let (Some(uri), Some(entity_id)) = (service_uri, candidate.entity_id()) {
                resolved.name = CandidateName::Resolved(EntityName {
                    value: candidate.name.value().to_string(),
                    uri: format!("{uri}{entity_id}"),
                });
            }
            resolved
        })
        .collect()
}

/// Produce the merged cell for `row_id` / `column_name`.
///
/// Fields of `existing` this crate does not own are kept; the id is always
/// rebuilt from the row id and column name.
pub fn merge_cell(
    existing: Option<&Cell>,
    row_id: &str,
    column_name: &str,
    label: String,
    candidates: &[Candidate],
    service_uri: Option<&str>,
    kind: ColumnKind,
) -> Cell {
    let metadata = resolve_names(candidates, service_uri);
    let annotation_meta = match kind {
        ColumnKind::Entity => scoring::summarize(&metadata),
        ColumnKind::Literal => AnnotationMeta::Unannotated,
    };

    Cell {
        id: cell_id(row_id, column_name),
        label,
        metadata,
        annotation_meta,
        extra: existing.map(|c| c.extra.clone()).unwrap_or_default(),
    }
}

/// Drop every annotation a previous pass left in `column_name`.
///
/// Labels and extras stay; the id is rebuilt.
pub fn clear_column_annotations(doc: &mut TableDocument, column_name: &str) {
    for (row_id, row) in doc.rows.iter_mut() {
        if let Some(cell) = row.cells.get_mut(column_name) {
            cell.id = cell_id(row_id, column_name);
            cell.metadata.clear();
            cell.annotation_meta = AnnotationMeta::Unannotated;
        }
    }
}

/// Apply a reconciliation response to the cells of `column_name`.
///
/// The column being reconciled becomes an entity column. Annotations from an
/// earlier pass are cleared first, so rows the response leaves out end up
/// unannotated. The `column$index` entry is left for the column aggregator.
/// Entries that point at unknown rows or other columns are skipped with a
/// warning. A cell keeps its label unless the entry carries one.
pub fn merge_reconciled_cells(
    doc: &mut TableDocument,
    column_name: &str,
    entries: &[ReconciliationEntry],
    service_uri: &str,
    warnings: &mut Warnings,
) {
    let mut merged = 0usize;
    clear_column_annotations(doc, column_name);

    for entry in entries {
        if entry.id == COLUMN_INDEX_ID {
            continue;
        }
        let Some(row_id) = row_id_in_column(&entry.id, column_name) else {
            match split_cell_id(&entry.id) {
                Some((row_id, entry_column)) => warnings.row(
                    row_id,
                    entry_column,
                    WarningKind::ForeignColumn,
                    format!("entry targets column '{entry_column}', not '{column_name}'"),
                ),
                None => warnings.row(
                    &entry.id,
                    column_name,
                    WarningKind::MalformedEntryId,
                    format!("entry id '{}' is not <rowId>$<column>", entry.id),
                ),
            }
            continue;
        };
        let Some(row) = doc.rows.get_mut(row_id) else {
            warnings.row(
                row_id,
                column_name,
                WarningKind::UnknownRow,
                "response references a row the table does not have",
            );
            continue;
        };

        let existing = row.cells.get(column_name);
        let label = entry
            .label
            .clone()
            .or_else(|| existing.map(|c| c.label.clone()))
            .unwrap_or_default();
        let cell = merge_cell(
            existing,
            row_id,
            column_name,
            label,
            &entry.metadata,
            Some(service_uri),
            ColumnKind::Entity,
        );
        row.cells.insert(column_name.to_string(), cell);
        merged += 1;
    }

    debug!(column = column_name, merged, "reconciled cells merged");
}

/// Write one extension column's cells into `column_name`.
///
/// Fails without touching `doc` when the service sent no `cells` map. Rows the
/// response does not cover get an empty cell so every row keeps one cell per
/// declared column.
pub fn merge_extension_cells(
    doc: &mut TableDocument,
    column_name: &str,
    cells: Option<&IndexMap<String, ExtensionCell>>,
    service_uri: Option<&str>,
    kind: ColumnKind,
    warnings: &mut Warnings,
) -> Result<()> {
    let cells = cells.ok_or_else(|| {
        SemtabError::structural(format!("missing cells for new column '{column_name}'"))
    })?;

    for (row_id, data) in cells {
        let Some(row) = doc.rows.get_mut(row_id) else {
            warnings.row(
                row_id,
                column_name,
                WarningKind::UnknownRow,
                "extension references a row the table does not have",
            );
            continue;
        };
        let cell = merge_cell(
            row.cells.get(column_name),
            row_id,
            column_name,
            data.label.clone().unwrap_or_default(),
            &data.metadata,
            service_uri,
            kind,
        );
        row.cells.insert(column_name.to_string(), cell);
    }

    for (row_id, row) in doc.rows.iter_mut() {
        if !cells.contains_key(row_id) {
            row.cells
                .insert(column_name.to_string(), Cell::empty(row_id, column_name));
        }
    }

    debug!(column = column_name, cells = cells.len(), ?kind, "extension cells merged");
    Ok(())
}

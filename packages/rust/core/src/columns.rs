//! Column-wide rollups computed once every cell of a column has been merged.

use indexmap::IndexMap;
use tracing::debug;

use semtab_shared::{
    AnnotationMeta, COLUMN_INDEX_ID, ColumnCandidate, ColumnKind, ColumnStatus, ContextInfo,
    EntityName, MatchStatus, ReconciliationEntry, Result, SemtabError, ServiceDescriptor,
    TableDocument, row_id_in_column,
};

use crate::registry;
use crate::report::{WarningKind, Warnings};

/// Coverage record of `service` over `column_name`, keyed by the service prefix.
///
/// `total` is the row count and `reconciliated` the number of annotated cells.
pub fn column_context(
    doc: &TableDocument,
    column_name: &str,
    service: &ServiceDescriptor,
) -> Result<(String, ContextInfo)> {
    let (prefix, uri) = registry::namespace(service)?;
    let info = ContextInfo {
        uri: uri.to_string(),
        total: doc.rows.len(),
        reconciliated: doc.annotated_cells(column_name),
    };
    Ok((prefix.to_string(), info))
}

/// The single column-level candidate derived from a reconciliation response.
///
/// `entity` is the candidate list of the `column$index` entry. `type` gathers
/// the first type of every matched candidate in the other entries, in
/// response order and with duplicates. `match` holds iff every header entity
/// is itself a match.
pub fn column_metadata_field(
    entries: &[ReconciliationEntry],
    column_name: &str,
    warnings: &mut Warnings,
) -> Vec<ColumnCandidate> {
    let mut entity = Vec::new();
    let mut types = Vec::new();

    for entry in entries {
        if entry.id == COLUMN_INDEX_ID {
            entity = entry.metadata.clone();
            continue;
        }
        for candidate in entry.metadata.iter().filter(|c| c.matched) {
            match candidate.types.first() {
                Some(ty) => types.push(ty.clone()),
                None => {
                    let row_id =
                        row_id_in_column(&entry.id, column_name).unwrap_or(entry.id.as_str());
                    warnings.row(
                        row_id,
                        column_name,
                        WarningKind::MissingType,
                        format!("matched candidate '{}' has no type", candidate.id),
                    );
                }
            }
        }
    }

    let matched = entity.iter().all(|c| c.matched);
    vec![ColumnCandidate {
        id: String::new(),
        matched,
        score: 0.0,
        name: EntityName::default(),
        entity,
        property: Vec::new(),
        types,
    }]
}

/// Pool the annotations of every cell in `column_name`.
///
/// Cells that are missing or unannotated are skipped with a warning. With no
/// annotated cell the result is annotated but undetermined, with null scores.
pub fn column_annotation_summary(
    doc: &TableDocument,
    column_name: &str,
    warnings: &mut Warnings,
) -> AnnotationMeta {
    let mut contributing = 0usize;
    let mut mismatch = false;
    let mut lowest: Option<f64> = None;
    let mut highest: Option<f64> = None;

    for (row_id, row) in &doc.rows {
        let Some(cell) = row.cells.get(column_name) else {
            warnings.row(row_id, column_name, WarningKind::MissingCell, "row has no cell for column");
            continue;
        };
        let AnnotationMeta::Annotated {
            status,
            lowest_score,
            highest_score,
        } = cell.annotation_meta
        else {
            warnings.row(row_id, column_name, WarningKind::NotAnnotated, "cell skipped in rollup");
            continue;
        };

        contributing += 1;
        mismatch |= status == MatchStatus::NoMatch;
        for score in [lowest_score, highest_score].into_iter().flatten() {
            lowest = Some(lowest.map_or(score, |l| l.min(score)));
            highest = Some(highest.map_or(score, |h| h.max(score)));
        }
    }

    let status = match (contributing, mismatch) {
        (0, _) => MatchStatus::Undetermined,
        (_, true) => MatchStatus::NoMatch,
        (_, false) => MatchStatus::Matched,
    };
    debug!(column = column_name, contributing, ?status, "column rollup");

    AnnotationMeta::Annotated {
        status,
        lowest_score: lowest,
        highest_score: highest,
    }
}

/// Write the column state for one reconciliation pass.
///
/// The column becomes a pending entity column; its context, metadata, and
/// annotation are replaced, never merged with a previous pass.
pub fn apply_column_update(
    doc: &mut TableDocument,
    column_name: &str,
    service: &ServiceDescriptor,
    metadata: Vec<ColumnCandidate>,
    warnings: &mut Warnings,
) -> Result<()> {
    let (prefix, info) = column_context(doc, column_name, service)?;
    let annotation_meta = column_annotation_summary(doc, column_name, warnings);

    let column = doc
        .columns
        .get_mut(column_name)
        .ok_or_else(|| SemtabError::structural(format!("column '{column_name}' is not declared")))?;
    column.status = ColumnStatus::Pending;
    column.kind = ColumnKind::Entity;
    column.context = IndexMap::from([(prefix, info)]);
    column.metadata = metadata;
    column.annotation_meta = annotation_meta;
    Ok(())
}

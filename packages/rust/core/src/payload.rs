//! Request bodies for the reconciliation and extension services.

use indexmap::IndexMap;
use tracing::debug;

use semtab_shared::{
    COLUMN_INDEX_ID, Candidate, ExtensionRequest, ReconciliationItem, ReconciliationRequest,
    Result, SemtabError, TableDocument, cell_id,
};

use crate::report::{PassOutcome, WarningKind, Warnings};

/// Build the reconciliation body for `column_name`.
///
/// The first item is the synthetic `column$index` header, followed by one
/// item per row carrying the cell's current label.
pub fn reconciliation_payload(
    doc: &TableDocument,
    column_name: &str,
    service_id: &str,
) -> Result<ReconciliationRequest> {
    let mut items = Vec::with_capacity(doc.rows.len() + 1);
    items.push(ReconciliationItem {
        id: COLUMN_INDEX_ID.to_string(),
        label: column_name.to_string(),
    });

    for (row_id, row) in &doc.rows {
        let cell = row.cells.get(column_name).ok_or_else(|| {
            SemtabError::structural(format!("row '{row_id}' has no cell for column '{column_name}'"))
        })?;
        items.push(ReconciliationItem {
            id: cell_id(row_id, column_name),
            label: cell.label.clone(),
        });
    }

    debug!(column = column_name, items = items.len(), "reconciliation payload built");
    Ok(ReconciliationRequest {
        service_id: service_id.to_string(),
        items,
    })
}

/// Caller parameters of an extension request.
#[derive(Debug, Clone, Default)]
pub struct ExtensionParams {
    /// Reconciled column whose entities are extended.
    pub column_name: String,
    pub service_id: String,
    pub properties: Vec<String>,
    /// Column whose labels are sent as per-row dates.
    pub date_column: Option<String>,
    pub weather_params: Vec<String>,
    pub decimal_format: Vec<String>,
}

/// The candidate whose id is sent for a confirmed cell: the first one flagged
/// as a match, in the order the reconciliator ranked them.
pub fn first_match(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().find(|c| c.matched)
}

/// Build the extension body.
///
/// Only rows whose cell in `column_name` is annotated as matched are sent.
/// Rows without a usable date are left out of `dates` with a warning.
pub fn extension_payload(
    doc: &TableDocument,
    params: &ExtensionParams,
) -> Result<PassOutcome<ExtensionRequest>> {
    let column_name = params.column_name.as_str();
    let mut warnings = Warnings::new();
    let mut entities = IndexMap::new();

    for (row_id, row) in &doc.rows {
        let cell = row.cells.get(column_name).ok_or_else(|| {
            SemtabError::structural(format!("row '{row_id}' has no cell for column '{column_name}'"))
        })?;
        if !cell.annotation_meta.is_matched() {
            continue;
        }
        match first_match(&cell.metadata) {
            Some(candidate) => {
                entities.insert(row_id.clone(), candidate.id.clone());
            }
            None => warnings.row(
                row_id,
                column_name,
                WarningKind::NoMatchedCandidate,
                "cell is annotated as matched but no candidate is flagged",
            ),
        }
    }

    let mut dates = IndexMap::new();
    if let Some(date_column) = params.date_column.as_deref() {
        for (row_id, row) in &doc.rows {
            match row.cells.get(date_column).map(|c| c.label.trim()) {
                Some(date) if !date.is_empty() => {
                    dates.insert(row_id.clone(), vec![date.to_string()]);
                }
                _ => warnings.row(
                    row_id,
                    date_column,
                    WarningKind::MissingDate,
                    "missing or empty date, row sent without one",
                ),
            }
        }
    }

    debug!(
        column = column_name,
        entities = entities.len(),
        dates = dates.len(),
        "extension payload built"
    );

    let mut items = IndexMap::new();
    items.insert(column_name.to_string(), entities);

    let request = ExtensionRequest {
        service_id: params.service_id.clone(),
        items,
        property: params.properties.clone(),
        dates,
        weather_params: params.weather_params.clone(),
        decimal_format: params.decimal_format.clone(),
    };
    Ok(PassOutcome::new(request, warnings))
}

//! Turning an extension response into new named columns.

use tracing::{debug, info, instrument};

use semtab_shared::{
    Column, ColumnKind, ExtensionColumn, ExtensionResponse, Result, SemtabError, TableDocument,
};

use crate::backend::refresh_table_stats;
use crate::cells::merge_extension_cells;
use crate::registry::ServiceCatalog;
use crate::report::{PassOutcome, WarningKind, Warnings};

/// Kind of a new column: the one the service declared, otherwise entity as
/// soon as any cell carries candidates.
pub fn infer_kind(column: &ExtensionColumn) -> ColumnKind {
    if let Some(kind) = column.kind {
        return kind;
    }
    let has_entities = column
        .cells
        .as_ref()
        .is_some_and(|cells| cells.values().any(|cell| !cell.metadata.is_empty()));
    if has_entities {
        ColumnKind::Entity
    } else {
        ColumnKind::Literal
    }
}

/// Add one column per response key, named positionally from `new_column_names`.
///
/// Entity URIs are resolved through the reconciliator of the source column
/// named in `meta`. The aggregator does not run on the new columns. Any
/// failure leaves `doc` as it was; surplus names are ignored.
#[instrument(skip_all, fields(columns = response.columns.len(), names = new_column_names.len()))]
pub fn apply_extension(
    doc: &TableDocument,
    response: &ExtensionResponse,
    new_column_names: &[String],
    reconciliators: &ServiceCatalog,
) -> Result<PassOutcome<TableDocument>> {
    if response.columns.len() > new_column_names.len() {
        return Err(SemtabError::Arity {
            columns: response.columns.len(),
            names: new_column_names.len(),
        });
    }

    let mut warnings = Warnings::new();
    let mut next = doc.clone();

    for ((key, data), name) in response.columns.iter().zip(new_column_names) {
        let source_name = response.meta.get(key).ok_or_else(|| {
            SemtabError::structural(format!("extension meta has no source column for '{key}'"))
        })?;
        let source = doc.columns.get(source_name).ok_or_else(|| {
            SemtabError::structural(format!(
                "source column '{source_name}' of '{key}' is not declared"
            ))
        })?;

        let kind = infer_kind(data);
        let service_uri = reconciliators
            .reconciliator_for_column(source)
            .and_then(|s| s.uri.as_deref());
        if service_uri.is_none() && kind == ColumnKind::Entity {
            warnings.column(
                name,
                WarningKind::UnresolvedService,
                format!("no reconciliator for source column '{source_name}', names left as sent"),
            );
        }

        merge_extension_cells(
            &mut next,
            name,
            data.cells.as_ref(),
            service_uri,
            kind,
            &mut warnings,
        )?;
        next.columns.insert(name.clone(), Column::new(name, kind));
        debug!(key = key.as_str(), column = name.as_str(), ?kind, "extension column added");
    }

    refresh_table_stats(&mut next);
    info!(warnings = warnings.len(), "table extended");
    Ok(PassOutcome::new(next, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GEONAMES_URI, candidate, city_table, geonames, load_fixture};
    use semtab_shared::{AnnotationMeta, ContextInfo, MatchStatus};
    use serde_json::json;

    fn reconciled_city_table() -> TableDocument {
        let mut doc = city_table();
        doc.columns["City"].kind = ColumnKind::Entity;
        doc.columns["City"].context.insert(
            "geo".into(),
            ContextInfo {
                uri: GEONAMES_URI.into(),
                total: 2,
                reconciliated: 2,
            },
        );
        doc
    }

    fn response(value: serde_json::Value) -> ExtensionResponse {
        serde_json::from_value(value).expect("extension response")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn more_keys_than_names_is_arity_error_and_table_unchanged() {
        let doc = reconciled_city_table();
        let before = serde_json::to_vec(&doc).unwrap();
        let response = response(json!({
            "columns": {
                "temp": { "cells": { "r0": { "label": "21" } } },
                "rain": { "cells": { "r0": { "label": "0" } } }
            },
            "meta": { "temp": "City", "rain": "City" }
        }));

        let catalog = ServiceCatalog::default();
        let err = apply_extension(&doc, &response, &names(&["Temperature"]), &catalog).unwrap_err();
        assert!(matches!(err, SemtabError::Arity { columns: 2, names: 1 }));
        assert_eq!(serde_json::to_vec(&doc).unwrap(), before);
    }

    #[test]
    fn literal_columns_are_added_for_every_row() {
        let doc = reconciled_city_table();
        let response = response(json!({
            "columns": {
                "temp": { "kind": "literal", "cells": { "r0": { "label": 21.5 }, "r1": { "label": "18,2" } } }
            },
            "meta": { "temp": "City" }
        }));
        let catalog = ServiceCatalog::new(vec![geonames()]);

        let outcome =
            apply_extension(&doc, &response, &names(&["Temperature", "Unused"]), &catalog).unwrap();
        let table = outcome.output;

        let column = &table.columns["Temperature"];
        assert_eq!(column.kind, ColumnKind::Literal);
        assert!(!column.annotation_meta.is_annotated());
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.table.n_cells, 6);

        let cell = &table.rows["r0"].cells["Temperature"];
        assert_eq!(cell.id, "r0$Temperature");
        assert_eq!(cell.label, "21.5");
        assert_eq!(cell.annotation_meta, AnnotationMeta::Unannotated);
        assert_eq!(table.rows["r1"].cells["Temperature"].label, "18,2");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn entity_cells_resolve_through_source_reconciliator() {
        let doc = reconciled_city_table();
        let mut resp = ExtensionResponse::default();
        let mut column: ExtensionColumn = serde_json::from_value(json!({ "cells": {} })).unwrap();
        column.cells.as_mut().unwrap().insert(
            "r0".into(),
            semtab_shared::ExtensionCell {
                label: Some("Lazio".into()),
                metadata: vec![candidate("geo:3174976", "Lazio", 1.0, true)],
            },
        );
        resp.columns.insert("region".into(), column);
        resp.meta.insert("region".into(), "City".into());

        let catalog = ServiceCatalog::new(vec![geonames()]);
        let outcome = apply_extension(&doc, &resp, &names(&["Region"]), &catalog).unwrap();
        let table = outcome.output;

        assert_eq!(table.columns["Region"].kind, ColumnKind::Entity);
        let lazio = &table.rows["r0"].cells["Region"];
        assert_eq!(lazio.metadata[0].name.uri(), Some("http://www.geonames.org/3174976"));
        assert_eq!(lazio.annotation_meta.status(), Some(MatchStatus::Matched));
        // Row r1 was not covered by the service.
        assert_eq!(table.rows["r1"].cells["Region"].label, "");
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn unresolved_reconciliator_is_a_warning() {
        let doc = reconciled_city_table();
        let response = response(json!({
            "columns": { "region": { "cells": { "r0": { "label": "Lazio", "metadata": [
                { "id": "geo:3174976", "name": "Lazio", "score": 1.0, "match": true }
            ] } } } },
            "meta": { "region": "City" }
        }));

        let outcome =
            apply_extension(&doc, &response, &names(&["Region"]), &ServiceCatalog::default())
                .unwrap();
        assert_eq!(outcome.count(WarningKind::UnresolvedService), 1);
        let lazio = &outcome.output.rows["r0"].cells["Region"];
        assert_eq!(lazio.metadata[0].name.uri(), None);
    }

    #[test]
    fn missing_cells_aborts_the_whole_extension() {
        let doc = reconciled_city_table();
        let response = response(json!({
            "columns": {
                "temp": { "cells": { "r0": { "label": "21" } } },
                "broken": { "kind": "literal" }
            },
            "meta": { "temp": "City", "broken": "City" }
        }));

        let catalog = ServiceCatalog::default();
        let err =
            apply_extension(&doc, &response, &names(&["Temp", "Broken"]), &catalog).unwrap_err();
        assert!(err.to_string().contains("missing cells"));
        assert!(!doc.columns.contains_key("Temp"));
    }

    #[test]
    fn missing_meta_is_structural() {
        let doc = reconciled_city_table();
        let response = response(json!({
            "columns": { "temp": { "cells": {} } },
            "meta": {}
        }));
        let err = apply_extension(&doc, &response, &names(&["Temp"]), &ServiceCatalog::default())
            .unwrap_err();
        assert!(matches!(err, SemtabError::Structural { .. }));
    }

    #[test]
    fn kind_inference() {
        let empty: ExtensionColumn =
            serde_json::from_value(json!({ "cells": { "r0": { "label": "x" } } })).unwrap();
        assert_eq!(infer_kind(&empty), ColumnKind::Literal);

        let declared: ExtensionColumn =
            serde_json::from_value(json!({ "kind": "entity", "cells": {} })).unwrap();
        assert_eq!(infer_kind(&declared), ColumnKind::Entity);
    }

    #[test]
    fn fixture_weather_columns() {
        let mut doc: TableDocument = load_fixture("table.json");
        doc.columns["City"].context.insert(
            "geo".into(),
            ContextInfo {
                uri: GEONAMES_URI.into(),
                total: 3,
                reconciliated: 3,
            },
        );
        let response: ExtensionResponse = load_fixture("extension-response.json");
        let catalog = ServiceCatalog::new(load_fixture("reconciliators.json"));

        let outcome =
            apply_extension(&doc, &response, &names(&["MaxTemp", "Rain"]), &catalog).unwrap();
        let table = outcome.output;

        let added: Vec<_> = table.columns.keys().skip(2).map(String::as_str).collect();
        assert_eq!(added, vec!["MaxTemp", "Rain"]);
        assert_eq!(table.rows["r1"].cells["MaxTemp"].label, "11.8");
        assert_eq!(table.rows["r0"].cells["Rain"].label, "0,0");
        assert_eq!(table.rows["r2"].cells["Rain"].id, "r2$Rain");
        assert_eq!(table.table.n_cells, 12);
        assert!(outcome.warnings.is_empty());
    }
}

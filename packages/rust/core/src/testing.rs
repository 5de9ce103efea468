//! Builders shared by the unit tests of this crate.

use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Map;

use semtab_shared::{
    AnnotationMeta, Candidate, CandidateName, Cell, Column, ColumnKind, ReconciliationEntry, Row,
    ServiceDescriptor, TableDocument, TableInstance, TypeDescriptor, cell_id,
};

pub(crate) const GEONAMES_URI: &str = "http://www.geonames.org/";

/// Parse `fixtures/json/<name>` from the workspace root.
pub(crate) fn load_fixture<T: DeserializeOwned>(name: &str) -> T {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../../fixtures/json")
        .join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
}

/// Two rows, `City` (Rome, Turin) and `Date`.
pub(crate) fn city_table() -> TableDocument {
    table(
        &["City", "Date"],
        &[("r0", &["Rome", "2024-03-01"]), ("r1", &["Turin", "2024-03-02"])],
    )
}

pub(crate) fn table(columns: &[&str], rows: &[(&str, &[&str])]) -> TableDocument {
    let columns: IndexMap<String, Column> = columns
        .iter()
        .map(|name| (name.to_string(), Column::new(name, ColumnKind::Literal)))
        .collect();

    let rows: IndexMap<String, Row> = rows
        .iter()
        .map(|(row_id, labels)| {
            let cells = columns
                .keys()
                .zip(labels.iter())
                .map(|(column, label)| {
                    let mut cell = Cell::empty(row_id, column);
                    cell.label = label.to_string();
                    (column.clone(), cell)
                })
                .collect();
            (
                row_id.to_string(),
                Row {
                    cells,
                    extra: Map::new(),
                },
            )
        })
        .collect();

    TableDocument {
        table: TableInstance {
            id: "7".into(),
            id_dataset: "1".into(),
            name: "cities".into(),
            ..TableInstance::default()
        },
        columns,
        rows,
    }
}

pub(crate) fn candidate(id: &str, name: &str, score: f64, matched: bool) -> Candidate {
    Candidate {
        id: id.into(),
        name: CandidateName::Label(name.into()),
        score: Some(score),
        matched,
        types: vec![TypeDescriptor {
            id: "A.ADM3".into(),
            name: "city".into(),
        }],
        extra: Map::new(),
    }
}

pub(crate) fn entry(row_id: &str, column: &str, metadata: Vec<Candidate>) -> ReconciliationEntry {
    ReconciliationEntry {
        id: cell_id(row_id, column),
        label: None,
        metadata,
    }
}

pub(crate) fn set_cell(
    doc: &mut TableDocument,
    row_id: &str,
    column: &str,
    metadata: Vec<Candidate>,
    annotation_meta: AnnotationMeta,
) {
    let cell = &mut doc.rows[row_id].cells[column];
    cell.metadata = metadata;
    cell.annotation_meta = annotation_meta;
}

pub(crate) fn geonames() -> ServiceDescriptor {
    ServiceDescriptor {
        id: "geonames".into(),
        name: "GeoNames".into(),
        relative_url: "/geonames".into(),
        uri: Some(GEONAMES_URI.into()),
        prefix: Some("geo".into()),
    }
}

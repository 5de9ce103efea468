//! Soft, per-row degradations collected during a pass.
//!
//! Hard failures abort a pass through [`semtab_shared::SemtabError`]. Anything
//! that only affects one row (or one column of an extension) is recorded here
//! instead, logged, and returned next to the produced value.

use tracing::warn;

/// What went wrong for a single row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The date column had no usable label for this row.
    MissingDate,
    /// A response entry referenced a row the table does not have.
    UnknownRow,
    /// A response entry id was not `<rowId>$<columnName>`.
    MalformedEntryId,
    /// A response entry targeted a different column than the one in the pass.
    ForeignColumn,
    /// A row has no cell for the column.
    MissingCell,
    /// A cell carries no annotation after the pass.
    NotAnnotated,
    /// A matched candidate had no type to contribute to the column.
    MissingType,
    /// A cell reports a match but none of its candidates is flagged.
    NoMatchedCandidate,
    /// No reconciliator could be resolved; entity URIs were left unset.
    UnresolvedService,
}

/// One soft failure. `row_id` is `None` for column-wide issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWarning {
    pub row_id: Option<String>,
    pub column: String,
    pub kind: WarningKind,
    pub message: String,
}

/// Accumulator that logs each warning as it is recorded.
#[derive(Debug, Default)]
pub struct Warnings(Vec<RowWarning>);

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(
        &mut self,
        row_id: &str,
        column: &str,
        kind: WarningKind,
        message: impl Into<String>,
    ) {
        self.record(Some(row_id.to_string()), column, kind, message.into());
    }

    pub fn column(&mut self, column: &str, kind: WarningKind, message: impl Into<String>) {
        self.record(None, column, kind, message.into());
    }

    fn record(&mut self, row_id: Option<String>, column: &str, kind: WarningKind, message: String) {
        warn!(row = row_id.as_deref().unwrap_or("-"), column, ?kind, %message, "row degraded");
        self.0.push(RowWarning {
            row_id,
            column: column.to_string(),
            kind,
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<RowWarning> {
        self.0
    }
}

/// Result of a pass: the produced value plus every soft failure met on the way.
#[derive(Debug, Clone)]
pub struct PassOutcome<T> {
    pub output: T,
    pub warnings: Vec<RowWarning>,
}

impl<T> PassOutcome<T> {
    pub fn new(output: T, warnings: Warnings) -> Self {
        Self {
            output,
            warnings: warnings.into_vec(),
        }
    }

    /// Count of warnings of `kind`.
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }
}

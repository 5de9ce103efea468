//! Metadata merge engine for semtab.
//!
//! Builds service requests from a table, folds reconciliation and extension
//! responses back into it, and rolls cell annotations up to their column.
//! Every pass takes a table by reference and returns a new one next to the
//! per-row warnings it collected ([`report::PassOutcome`]).

pub mod backend;
pub mod cells;
pub mod columns;
pub mod extension;
pub mod payload;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod scoring;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use backend::{BackendUpdatePayload, TableIdentity, backend_update_payload, touch};
pub use extension::apply_extension;
pub use payload::{ExtensionParams, extension_payload, reconciliation_payload};
pub use reconcile::apply_reconciliation;
pub use registry::ServiceCatalog;
pub use report::{PassOutcome, RowWarning, WarningKind};
pub use workflow::{ExtendRequest, ProgressReporter, SilentProgress, extend, reconcile};

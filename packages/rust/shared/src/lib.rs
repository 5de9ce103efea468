//! Shared types, error model, and configuration for semtab.
//!
//! This crate is the foundation depended on by all other semtab crates.
//! It provides:
//! - [`SemtabError`], the unified error type
//! - The table document model ([`TableDocument`], [`Column`], [`Cell`], [`Candidate`],
//!   [`AnnotationMeta`]) and [`ServiceDescriptor`]
//! - Service request/response bodies ([`ReconciliationRequest`], [`ExtensionResponse`], ...)
//! - Configuration ([`AppConfig`], [`ServiceConfig`], config loading)

pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, ExtensionConfig, ServiceConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_token,
};
pub use error::{Result, SemtabError};
pub use protocol::{
    ExtensionCell, ExtensionColumn, ExtensionRequest, ExtensionResponse, ReconciliationEntry,
    ReconciliationItem, ReconciliationRequest,
};
pub use types::{
    AnnotationMeta, COLUMN_INDEX_ID, Candidate, CandidateName, Cell, Column, ColumnCandidate,
    ColumnKind, ColumnStatus, ContextInfo, EntityName, MatchStatus, Row, ServiceDescriptor,
    TableDocument, TableInstance, TypeDescriptor, cell_id, row_id_in_column, split_cell_id,
};

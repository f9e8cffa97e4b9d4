use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Inconsistencies in the static lookup tables, detected by [`crate::catalog::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Duplicate {table} key: {key}")]
    DuplicateKey { table: &'static str, key: String },

    #[error("Stage {0} belongs to more than one group")]
    OverlappingStage(String),

    #[error("Stage {0} is not listed in any group")]
    UngroupedStage(String),

    #[error("Empty {0} table")]
    EmptyTable(&'static str),
}

//! Typed failures returned by the catalog core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        CatalogError::NotFound { entity, id }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        CatalogError::InvalidArgument(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CatalogError::InvalidArgument(_))
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

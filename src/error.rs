//! Error taxonomy shared by the store, the refresh pipeline, and the HTTP layer.

use crate::storage::StoreError;
use crate::viz::RenderError;

/// Coarse classification used to pick a response at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An external fetch failed or returned unusable data.
    UpstreamUnavailable,
    /// No record (or artefact) matches the request.
    NotFound,
    /// Anything else; details stay in the logs.
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("External data source unavailable: {source_name}: {reason}")]
    Upstream {
        source_name: &'static str,
        reason: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Upstream { .. } => ErrorKind::UpstreamUnavailable,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Store(_) | Self::Render(_) | Self::Io(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Wrap a fetch failure, keeping the whole context chain as the reason.
    pub(crate) fn upstream(source_name: &'static str, err: &anyhow::Error) -> Self {
        Self::Upstream {
            source_name,
            reason: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

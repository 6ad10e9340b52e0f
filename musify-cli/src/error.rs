use musify_parser::{NotFoundReason, SiteError, TargetKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    TargetNotFound {
        message: &'static str,
        reason: NotFoundReason,
    },

    #[error("Site error: {0}")]
    Site(SiteError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Interrupted")]
    Interrupted,
}

impl AppError {
    pub fn not_found(kind: TargetKind, reason: NotFoundReason) -> Self {
        let message = match kind {
            TargetKind::Artist => "Artist not found",
            TargetKind::Album => "Album not found",
            TargetKind::ArtistAndAlbum => "Album by the given artist not found",
        };
        AppError::TargetNotFound { message, reason }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::InvalidInput(_) => 2,
            AppError::TargetNotFound { .. } => 3,
            AppError::Site(_) => 4,
            AppError::Io(_) => 5,
            AppError::Interrupted => 130,
        }
    }
}

impl From<SiteError> for AppError {
    fn from(error: SiteError) -> Self {
        if error.is_cancelled() {
            AppError::Interrupted
        } else {
            AppError::Site(error)
        }
    }
}

#[macro_use]
extern crate serde;

#[cfg(feature = "axum")]
pub mod axum;

/// Result type with custom Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error information
#[derive(Serialize, Deserialize, Debug, Clone)]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub struct Error {
    /// Type of error and additional information
    #[serde(flatten)]
    pub error_type: ErrorType,

    /// Where this error occurred
    pub location: String,
}

/// Possible error types
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
#[cfg_attr(feature = "utoipa", derive(utoipa::ToSchema))]
pub enum ErrorType {
    /// This error was not labeled :(
    LabelMe,

    // ? Credential errors
    NotAuthenticated,
    TokenExpired,

    // ? Coordination errors
    /// Upstream told us to back off
    RateLimited {
        retry_after: f32,
    },
    /// Our own cooldown is still active, upstream was not consulted
    LocalCooldown {
        retry_after: f32,
    },

    // ? Upstream errors
    UpstreamError {
        status: u16,
    },

    // ? General errors
    StorageFailed,
    InternalError,
}

impl Error {
    /// Retry delay in seconds carried by this error, if any
    pub fn retry_after(&self) -> Option<f32> {
        match self.error_type {
            ErrorType::RateLimited { retry_after } | ErrorType::LocalCooldown { retry_after } => {
                Some(retry_after)
            }
            _ => None,
        }
    }
}

#[macro_export]
macro_rules! create_error {
    ( $error: ident $( $tt:tt )? ) => {
        $crate::Error {
            error_type: $crate::ErrorType::$error $( $tt )?,
            location: format!("{}:{}:{}", file!(), line!(), column!()),
        }
    };
}

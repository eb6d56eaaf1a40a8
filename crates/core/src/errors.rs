use thiserror::Error;

/// Failures raised by the model gateway. `UnsupportedModel` is fatal for the
/// call; the other variants are recoverable and callers degrade to the
/// last-known-good draft instead of propagating.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("no backend registered for model `{model}`")]
    UnsupportedModel { model: String },
    #[error("upstream model call failed: {message}")]
    Upstream { message: String },
    #[error("model call timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl GatewayError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::UnsupportedModel { .. })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("course catalog unavailable: {0}")]
    Unavailable(String),
    #[error("unknown course id {0}")]
    UnknownCourse(i64),
}

/// Turn-level failure taxonomy. Nothing here ever reaches the caller as a
/// raw error: the runtime converts every variant into an apologetic
/// user-visible response via [`TurnError::user_message`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("internal turn failure: {0}")]
    Internal(String),
}

impl TurnError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Catalog(_) => {
                "I'm sorry, the course catalog is unavailable right now, so I can't look \
                 anything up. Please try again in a moment."
                    .to_string()
            }
            Self::Gateway(GatewayError::UnsupportedModel { model }) => format!(
                "I'm sorry, the model `{model}` isn't available. Please pick a different \
                 model and try again."
            ),
            Self::Gateway(_) | Self::Internal(_) => {
                "I apologize, but I encountered an error while handling your request. \
                 Please try again."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, GatewayError, TurnError};

    #[test]
    fn unsupported_model_is_not_recoverable() {
        let error = GatewayError::UnsupportedModel { model: "llama".to_string() };
        assert!(!error.is_recoverable());
        assert!(GatewayError::Upstream { message: "503".to_string() }.is_recoverable());
        assert!(GatewayError::Timeout { seconds: 30 }.is_recoverable());
    }

    #[test]
    fn catalog_failure_produces_catalog_apology() {
        let error = TurnError::from(CatalogError::Unavailable("connection refused".to_string()));
        assert!(error.user_message().contains("course catalog is unavailable"));
    }

    #[test]
    fn unsupported_model_apology_names_the_model() {
        let error =
            TurnError::from(GatewayError::UnsupportedModel { model: "gpt-99".to_string() });
        assert!(error.user_message().contains("`gpt-99`"));
    }

    #[test]
    fn upstream_failure_produces_generic_apology() {
        let error = TurnError::from(GatewayError::Upstream { message: "boom".to_string() });
        assert!(error.user_message().contains("I apologize"));
        assert!(!error.user_message().contains("boom"));
    }
}

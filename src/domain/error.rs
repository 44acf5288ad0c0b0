use thiserror::Error;

/// Core domain errors
///
/// Upstream call failures are not represented here; they use the classified
/// [`FetchError`](crate::domain::upstream::FetchError) taxonomy instead.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error() {
        let error = DomainError::configuration("Missing upstream API key");
        assert_eq!(
            error.to_string(),
            "Configuration error: Missing upstream API key"
        );
    }

    #[test]
    fn test_cache_error() {
        let error = DomainError::cache("Connection refused");
        assert_eq!(error.to_string(), "Cache error: Connection refused");
    }

    #[test]
    fn test_authentication_error() {
        let error = DomainError::authentication("Invalid JWT");
        assert_eq!(error.to_string(), "Authentication error: Invalid JWT");
    }
}

use thiserror::Error;

/// Failure reported by the external data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    #[error("failed to list tables for {scope}: {message}")]
    Enumerate { scope: String, message: String },
    #[error("failed to fetch properties of {table}: {message}")]
    Properties { table: String, message: String },
    #[error("failed to fetch relationships of {table}: {message}")]
    Relationships { table: String, message: String },
    #[error("failed to generate DDL for {table}: {message}")]
    Ddl { table: String, message: String },
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

/// A load that did not produce a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

impl LoadError {
    /// Single line shown next to the retry action.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::DataSource(e) => format!("Could not load diagram: {}", e),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::DataSource(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_names_failed_table() {
        let err = LoadError::from(DataSourceError::Properties {
            table: "public.orders".to_string(),
            message: "connection reset".to_string(),
        });
        assert_eq!(
            err.user_message(),
            "Could not load diagram: failed to fetch properties of public.orders: connection reset"
        );
        assert!(err.is_retryable());
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid plugin reference '{0}': expected publisher/name/version")]
    InvalidPluginReference(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CoreError::InvalidPluginReference("bad-id".to_string());
        assert!(error.to_string().contains("bad-id"));
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unrecognized feed schema: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert_via_question_mark() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().contains("port taken"));
    }

    #[test]
    fn schema_faults_name_the_offense() {
        let err = AppError::Schema("feed body is not an array".to_string());
        assert_eq!(
            err.to_string(),
            "unrecognized feed schema: feed body is not an array"
        );
    }
}

/// Which stage of the run failed.
///
/// Every kind is fatal: the run aborts before anything is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/blank key fields, unparseable timestamps, empty feeds.
    MalformedInput,
    /// A price column that does not coerce to a decimal.
    PriceParse,
    /// Any read or write failure against the relational store.
    BoundaryUnavailable,
    /// Bad flags, environment, or run-state file.
    Config,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::MalformedInput | ErrorKind::Config => 2,
            ErrorKind::PriceParse => 3,
            ErrorKind::BoundaryUnavailable => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed input",
            ErrorKind::PriceParse => "price parse",
            ErrorKind::BoundaryUnavailable => "boundary unavailable",
            ErrorKind::Config => "configuration",
        }
    }
}

#[derive(Clone, thiserror::Error)]
#[error("{} error: {message}", .kind.label())]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, message)
    }

    pub fn price_parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PriceParse, message)
    }

    pub fn boundary(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BoundaryUnavailable, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_stages() {
        assert_eq!(AppError::malformed("x").exit_code(), 2);
        assert_eq!(AppError::price_parse("x").exit_code(), 3);
        assert_eq!(AppError::boundary("x").exit_code(), 4);
    }

    #[test]
    fn display_names_the_stage() {
        let err = AppError::boundary("connection refused");
        assert_eq!(err.to_string(), "boundary unavailable error: connection refused");
    }
}

//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Broker SDK errors and resource teardown failures are carried as this type
/// inside the structured [`Error`].
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur in courier operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Input validation failed (for example an empty queue name).
    InvalidInput,
    /// Invalid configuration.
    Configuration,
    /// A cached resource could not be constructed.
    Factory,
    /// The broker rejected or failed an operation.
    Broker,
    /// A resource failed to release what it holds.
    Teardown,
    /// The caller cancelled the operation.
    Cancelled,
    /// The caller's deadline elapsed.
    Timeout,
    /// Internal error.
    InternalError,
}

/// A structured error type for courier operations.
#[derive(Debug, Error)]
#[error("{}{}", <&'static str>::from(kind), message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Adds an already boxed source error to this error.
    pub fn with_boxed_source(mut self, source: BoxedError) -> Self {
        self.source = Some(source);
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new resource construction error.
    pub fn factory() -> Self {
        Self::new(ErrorKind::Factory)
    }

    /// Creates a new broker error.
    pub fn broker() -> Self {
        Self::new(ErrorKind::Broker)
    }

    /// Creates a new teardown error.
    pub fn teardown() -> Self {
        Self::new(ErrorKind::Teardown)
    }

    /// Creates a new cancellation error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    /// Creates a new timeout error.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    /// Creates a new internal error.
    pub fn internal_error() -> Self {
        Self::new(ErrorKind::InternalError)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns true if the caller abandoned the operation (cancellation or deadline).
    pub fn is_cancellation(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled | ErrorKind::Timeout)
    }

    /// Returns the most specific human readable description of this error.
    ///
    /// Prefers the attached message, then the source error, then the kind.
    pub fn detail(&self) -> String {
        match (&self.message, &self.source) {
            (Some(message), _) => message.clone(),
            (None, Some(source)) => source.to_string(),
            (None, None) => self.kind_str().to_string(),
        }
    }
}

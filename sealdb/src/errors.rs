use backtrace::Backtrace;
use serde::{de, ser};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for SealDB operations.
///
/// Each kind describes one category of failure so callers can match on
/// the category instead of parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use sealdb::errors::{SealError, ErrorKind, SealResult};
///
/// fn example() -> SealResult<()> {
///     Err(SealError::new("unknown operator $foo", ErrorKind::FilterError))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Unknown query operator, malformed operand or illegal `$or` nesting
    FilterError,
    /// Malformed update expression
    UpdateError,
    /// Index definition could not be built or applied
    IndexingError,
    /// The provided document id is invalid
    InvalidId,
    /// Generic validation error (reserved names, malformed references)
    ValidationError,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Generic IO error
    IOError,
    /// The file was not found
    FileNotFound,
    /// Permission denied for file operation
    PermissionDenied,
    /// Error encoding or decoding data
    EncodingError,
    /// Error mapping a value to or from its serialized form
    ObjectMappingError,
    /// Remote synchronization failed
    SyncError,
    /// Error in event processing
    EventError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::UpdateError => write!(f, "Update error"),
            ErrorKind::IndexingError => write!(f, "Indexing error"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::SyncError => write!(f, "Sync error"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom SealDB error type.
///
/// `SealError` carries a message, a kind, an optional cause and the
/// backtrace captured where the error was created.
///
/// # Examples
///
/// ```rust,ignore
/// use sealdb::errors::{SealError, ErrorKind};
///
/// let cause = SealError::new("disk unplugged", ErrorKind::IOError);
/// let err = SealError::new_with_cause("commit failed", ErrorKind::IOError, cause);
/// ```
#[derive(Clone)]
pub struct SealError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<SealError>>,
    backtrace: Atomic<Backtrace>,
}

impl SealError {
    /// Creates a new `SealError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        SealError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `SealError` chained onto `cause`.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: SealError) -> Self {
        SealError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&SealError> {
        self.cause.as_deref()
    }
}

impl Display for SealError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for SealError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for SealError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Shorthand for `Result<T, SealError>`, returned by every fallible operation.
pub type SealResult<T> = Result<T, SealError>;

impl de::Error for SealError {
    fn custom<T: Display>(msg: T) -> Self {
        SealError::new(&msg.to_string(), ErrorKind::ObjectMappingError)
    }
}

impl ser::Error for SealError {
    fn custom<T: Display>(msg: T) -> Self {
        SealError::new(&msg.to_string(), ErrorKind::ObjectMappingError)
    }
}

impl From<std::io::Error> for SealError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        SealError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for SealError {
    fn from(err: serde_json::Error) -> Self {
        SealError::new(&format!("JSON error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<regex::Error> for SealError {
    fn from(err: regex::Error) -> Self {
        SealError::new(&format!("Invalid pattern: {}", err), ErrorKind::FilterError)
    }
}

impl From<std::string::FromUtf8Error> for SealError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        SealError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<String> for SealError {
    fn from(msg: String) -> Self {
        SealError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for SealError {
    fn from(msg: &str) -> Self {
        SealError::new(msg, ErrorKind::InternalError)
    }
}

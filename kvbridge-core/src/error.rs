use std::{fmt, io};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub inner: Inner,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inner {
    /// Malformed or insufficient input while building wire arguments.
    ArgumentError { message: String },
    /// A routing directive that could not be understood.
    RouteParseError { message: String },
    /// Whatever the transport reported: connection failures and server errors.
    TransportError { message: String },
    /// The decoder met a reply it cannot map.
    UnexpectedResponseType { message: String },
    /// A batch commit failed as a whole.
    BatchExecutionError { message: String },
    /// `begin` was called while a batch was already open.
    AlreadyActive,
    /// A batch operation was called with no open batch.
    NotActive,
    /// Malformed text or protocol bytes.
    ParseError { message: String, offset: usize },
    /// The reply frame is cut short; more bytes are needed.
    Incomplete,
}

/// The discriminant of an [`Error`], for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    RouteParse,
    Transport,
    UnexpectedResponseType,
    BatchExecution,
    AlreadyActive,
    NotActive,
    Parse,
    Incomplete,
}

impl Error {
    pub fn into_inner(&self) -> Inner {
        self.inner.clone()
    }

    pub fn kind(&self) -> ErrorKind {
        match self.inner {
            Inner::ArgumentError { .. } => ErrorKind::Argument,
            Inner::RouteParseError { .. } => ErrorKind::RouteParse,
            Inner::TransportError { .. } => ErrorKind::Transport,
            Inner::UnexpectedResponseType { .. } => ErrorKind::UnexpectedResponseType,
            Inner::BatchExecutionError { .. } => ErrorKind::BatchExecution,
            Inner::AlreadyActive => ErrorKind::AlreadyActive,
            Inner::NotActive => ErrorKind::NotActive,
            Inner::ParseError { .. } => ErrorKind::Parse,
            Inner::Incomplete => ErrorKind::Incomplete,
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.inner == Inner::Incomplete
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        io::Error::other(value.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error {
            inner: Inner::TransportError {
                message: value.to_string(),
            },
        }
    }
}

/// Converts a error message to an Error with inner type ParseError.
#[macro_export]
macro_rules! parser_error {
    ($msg:expr, $offset:expr) => {
        Err($crate::Error {
            inner: $crate::Inner::ParseError {
                message: $msg.to_string(),
                offset: $offset,
            },
        })
    };
}

/// Converts a error message to an Error with inner type ArgumentError.
#[macro_export]
macro_rules! argument_error {
    ($msg:literal) => {
        Err($crate::Error {
            inner: $crate::Inner::ArgumentError {
                message: format!($msg),
            },
        })
    };
    ($msg:expr) => {
        Err($crate::Error {
            inner: $crate::Inner::ArgumentError {
                message: $msg.to_string(),
            },
        })
    };
}

/// Converts a error message to an Error with inner type RouteParseError.
#[macro_export]
macro_rules! route_error {
    ($msg:literal) => {
        Err($crate::Error {
            inner: $crate::Inner::RouteParseError {
                message: format!($msg),
            },
        })
    };
    ($msg:expr) => {
        Err($crate::Error {
            inner: $crate::Inner::RouteParseError {
                message: $msg.to_string(),
            },
        })
    };
}

/// Converts a error message to an Error with inner type TransportError.
#[macro_export]
macro_rules! transport_error {
    ($msg:literal) => {
        Err($crate::Error {
            inner: $crate::Inner::TransportError {
                message: format!($msg),
            },
        })
    };
    ($msg:expr) => {
        Err($crate::Error {
            inner: $crate::Inner::TransportError {
                message: $msg.to_string(),
            },
        })
    };
}

/// Converts a error message to an Error with inner type UnexpectedResponseType.
#[macro_export]
macro_rules! response_error {
    ($msg:literal) => {
        Err($crate::Error {
            inner: $crate::Inner::UnexpectedResponseType {
                message: format!($msg),
            },
        })
    };
    ($msg:expr) => {
        Err($crate::Error {
            inner: $crate::Inner::UnexpectedResponseType {
                message: $msg.to_string(),
            },
        })
    };
}

/// Converts a error message to an Error with inner type BatchExecutionError.
#[macro_export]
macro_rules! batch_error {
    ($msg:literal) => {
        Err($crate::Error {
            inner: $crate::Inner::BatchExecutionError {
                message: format!($msg),
            },
        })
    };
    ($msg:expr) => {
        Err($crate::Error {
            inner: $crate::Inner::BatchExecutionError {
                message: $msg.to_string(),
            },
        })
    };
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Inner::ArgumentError { message } => write!(f, "argument error: {message}"),
            Inner::RouteParseError { message } => write!(f, "route error: {message}"),
            Inner::TransportError { message } => write!(f, "transport error: {message}"),
            Inner::UnexpectedResponseType { message } => {
                write!(f, "unexpected response type: {message}")
            }
            Inner::BatchExecutionError { message } => write!(f, "batch failed: {message}"),
            Inner::AlreadyActive => write!(f, "a batch is already active"),
            Inner::NotActive => write!(f, "no batch is active"),
            Inner::ParseError { message, offset } => {
                write!(f, "parse error at byte {offset}: {message}")
            }
            Inner::Incomplete => write!(f, "incomplete frame"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails_with_argument() -> Result<()> {
        argument_error!("key must not be empty")
    }

    #[test]
    fn test_macro_builds_discriminated_error() {
        let err = fails_with_argument().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.to_string(), "argument error: key must not be empty");
    }

    #[test]
    fn test_macro_formats_inline_arguments() {
        let count = 3;
        let err: Result<()> = batch_error!("expected {count} replies");
        assert_eq!(
            err.unwrap_err().into_inner(),
            Inner::BatchExecutionError {
                message: "expected 3 replies".into()
            }
        );
    }

    #[test]
    fn test_io_error_becomes_transport_error() {
        let err: Error = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}

// /src/errors.rs
//! Error handling that never panics and provides clear diagnostic messages
use crate::dom::NodeId;
use thiserror::Error;

/// Which side of a reconciliation an offending item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Old,
    New,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Old => f.write_str("old"),
            Side::New => f.write_str("new"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("Unsupported interaction kind '{kind}': expected a press event or explicit drag options")]
    UnsupportedInteractionKind { kind: String },

    #[error("Item at index {index} of the {side} sequence has no key")]
    MissingKey { side: Side, index: usize },

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[cfg(feature = "python")]
    #[error("Python call failed: {0}")]
    PythonError(String),

    #[cfg(feature = "python")]
    #[error("Type conversion failed: expected {expected}, got {actual}")]
    TypeConversionError { expected: String, actual: String },
}

#[cfg(feature = "python")]
mod python {
    use super::ReconcilerError;
    use pyo3::{exceptions::PyValueError, PyErr};

    impl From<ReconcilerError> for PyErr {
        fn from(err: ReconcilerError) -> Self {
            PyValueError::new_err(err.to_string())
        }
    }

    impl From<PyErr> for ReconcilerError {
        fn from(err: PyErr) -> Self {
            ReconcilerError::PythonError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = ReconcilerError::UnsupportedInteractionKind { kind: "keydown".into() };
        assert!(err.to_string().contains("keydown"));

        let err = ReconcilerError::MissingKey { side: Side::New, index: 3 };
        assert_eq!(err.to_string(), "Item at index 3 of the new sequence has no key");
    }
}

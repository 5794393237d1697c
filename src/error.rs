//! Error types for deep copy operations

use std::fmt;

use thiserror::Error;

use crate::runtime::{Kind, Type};

/// Deep copy errors
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Copy errors
    /// Value of a kind with no copy strategy
    ///
    /// **Triggered by:** Functions, channels and raw pointers anywhere in the
    /// value graph
    /// **Prevention:** Register an override for the offending type
    #[error("unable to make a deep copy of {value} (type: {ty}) - kind {kind} is not supported")]
    UnsupportedKind {
        /// Rendered offending value
        value: String,
        /// Its concrete type
        ty: Type,
        /// Its shape tag
        kind: Kind,
    },

    /// A strategy received a value of the wrong shape
    ///
    /// Internal consistency guard; dispatch never produces it.
    #[error("must pass a value with kind of {expected}; got {got}")]
    KindMismatch {
        /// Shape the strategy handles
        expected: Kind,
        /// Shape it received
        got: Kind,
    },

    /// The leaf strategy received a composite or unsupported value
    #[error("unable to copy {value} (a {kind}) as a primitive")]
    NotPrimitive {
        /// Rendered offending value
        value: String,
        /// Its shape tag
        kind: Kind,
    },

    /// Record with an unexported field
    ///
    /// **Triggered by:** Copying any record whose layout declares a private
    /// field, e.g. timestamp-like records with hidden internals
    /// **Prevention:** Register an override for the record type
    #[error("can't copy type {ty} cause of field {field}")]
    InaccessibleField {
        /// Record type name
        ty: String,
        /// First inaccessible field
        field: String,
    },

    /// Slice element failed to copy
    #[error("failed to clone slice item at index {index}: {source}")]
    SliceElement {
        /// Element index
        index: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Array element failed to copy
    #[error("failed to clone array item at index {index}: {source}")]
    ArrayElement {
        /// Element index
        index: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Map value failed to copy
    #[error("failed to clone map item {key}: {source}")]
    MapValue {
        /// Rendered key of the entry
        key: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Map key failed to copy
    #[error("failed to clone the map key {key}: {source}")]
    MapKey {
        /// Rendered original key
        key: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Pointee failed to copy
    #[error("failed to copy the value under the pointer {ty}: {source}")]
    PointerTarget {
        /// Pointer type
        ty: Type,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Record field failed to copy
    #[error("failed to copy the field {field} in the record {record}: {source}")]
    Field {
        /// Field name
        field: String,
        /// Rendered record
        record: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// User override reported a failure
    #[error("override for {ty} failed: {message}")]
    Override {
        /// Overridden type
        ty: Type,
        /// Failure description
        message: String,
    },

    // Value model errors
    /// Type mismatch when accessing a value
    #[error("Type error: expected {expected}, got {got}")]
    TypeError {
        /// Expected type
        expected: String,
        /// Actual type
        got: String,
    },

    /// Sequence index out of bounds
    #[error("Index out of bounds: {index} for sequence of length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Sequence length
        length: usize,
    },

    /// Record has no field with that name
    #[error("record {record} has no field {field}")]
    UnknownField {
        /// Record type name
        record: String,
        /// Requested field
        field: String,
    },

    /// Record built with the wrong number of fields
    #[error("record {record} expects {expected} fields, got {got}")]
    FieldCount {
        /// Record type name
        record: String,
        /// Declared field count
        expected: usize,
        /// Supplied field count
        got: usize,
    },

    /// Read or write through a null pointer or absent map
    #[error("access through nil {ty}")]
    NilAccess {
        /// Type of the nil value
        ty: String,
    },
}

/// One step of positional context on the way to a failing value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Sequence index
    Index(usize),
    /// Map entry, by rendered key
    Key(String),
    /// Record field
    Field(String),
    /// Pointer dereference
    Deref,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Key(k) => write!(f, "[{}]", k),
            PathSegment::Field(name) => write!(f, ".{}", name),
            PathSegment::Deref => write!(f, "*"),
        }
    }
}

impl Error {
    /// Create an override failure for the given type
    pub fn override_failed(ty: Type, msg: impl Into<String>) -> Self {
        Error::Override {
            ty,
            message: msg.into(),
        }
    }

    fn step(&self) -> Option<(PathSegment, &Error)> {
        match self {
            Error::SliceElement { index, source } | Error::ArrayElement { index, source } => {
                Some((PathSegment::Index(*index), &**source))
            }
            Error::MapValue { key, source } | Error::MapKey { key, source } => {
                Some((PathSegment::Key(key.clone()), &**source))
            }
            Error::PointerTarget { source, .. } => Some((PathSegment::Deref, &**source)),
            Error::Field { field, source, .. } => {
                Some((PathSegment::Field(field.clone()), &**source))
            }
            _ => None,
        }
    }

    /// Positional context from the outermost value down to the failure
    pub fn path(&self) -> Vec<PathSegment> {
        let mut path = Vec::new();
        let mut current = self;
        while let Some((segment, source)) = current.step() {
            path.push(segment);
            current = source;
        }
        path
    }

    /// Innermost error, stripped of positional context
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Some((_, source)) = current.step() {
            current = source;
        }
        current
    }

    /// True when the root cause is an unsupported kind
    pub fn is_unsupported(&self) -> bool {
        matches!(self.root_cause(), Error::UnsupportedKind { .. })
    }
}

/// Result type for deep copy operations
pub type Result<T> = std::result::Result<T, Error>;

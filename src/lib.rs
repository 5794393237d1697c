//! # deepcopy - Deep Copies of Dynamic Value Graphs
//!
//! [![License: MIT](https://img.shields.io/badge/License-MIT-yellow.svg)](https://opensource.org/licenses/MIT)
//!
//! Makes an independent duplicate of an arbitrary [`Value`] graph: sequences,
//! mappings, pointers and records are copied recursively so that mutating the
//! copy never affects the original.
//!
//! ## Features
//!
//! - **Aliasing preserved** - two pointers to the same slot (or two slices or
//!   maps over the same storage) in the original yield two references to the
//!   same new storage in the copy
//! - **Cycle safe** - self-referential graphs terminate, whether the cycle
//!   runs through pointers, slices or maps
//! - **Absence preserved** - absent slices/maps and null pointers stay absent
//! - **Overrides** - per-type replacement of the built-in copy logic
//! - **Informative errors** - every failure carries the path to the offending
//!   value
//!
//! ## Quick Start
//!
//! ```rust
//! use deepcopy::{Type, Value};
//!
//! # fn main() -> deepcopy::Result<()> {
//! let original = Value::slice(
//!     Type::pointer(Type::Int),
//!     vec![Value::pointer(Type::Int, Value::Int(1))],
//! );
//!
//! let copy = deepcopy::copy(&original)?;
//! assert_eq!(copy, original);
//!
//! // Writing through the copy leaves the original untouched
//! let slot = copy.as_slice()?.get(0)?;
//! slot.as_pointer()?.set(Value::Int(2))?;
//! assert_eq!(original.as_slice()?.get(0)?.as_pointer()?.get()?, Value::Int(1));
//! # Ok(())
//! # }
//! ```
//!
//! ### Overrides
//!
//! Records with unexported fields cannot be copied field by field. An
//! override takes over for that exact type wherever it appears:
//!
//! ```rust
//! use deepcopy::{FieldDef, Overrides, RecordType, Type, Value};
//!
//! # fn main() -> deepcopy::Result<()> {
//! let instant = RecordType::new(
//!     "time.Time",
//!     vec![FieldDef::private("wall", Type::Uint)],
//! );
//! let now = Value::record(&instant, vec![Value::Uint(42)])?;
//! assert!(deepcopy::copy(&now).is_err());
//!
//! let mut overrides = Overrides::new();
//! overrides.identity(instant.ty());
//! let copy = deepcopy::copy_with_overrides(&now, &overrides)?;
//! assert_eq!(copy, now);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Value → DeepCopier → override? ─yes→ override result
//!                         │no
//!                         └→ strategy[kind] → (recurse into children)
//! ```
//!
//! - [`runtime`] - the dynamic value model ([`Value`], [`Type`], [`Kind`])
//! - [`copier`] - [`DeepCopier`], the per-kind strategies and [`PointerTracker`]
//! - [`overrides`] - [`CopyOverride`] and the [`Overrides`] table
//! - [`error`] - [`Error`] and positional context via [`Error::path`]
//!
//! ## Supported kinds
//!
//! | Kind | Copied as |
//! |------|-----------|
//! | bool, int, uint, float, complex, string | itself |
//! | array | element-wise |
//! | slice | fresh storage per distinct storage, element-wise; absent stays absent |
//! | map | fresh storage per distinct storage, keys and values copied; absent stays absent |
//! | pointer | fresh slot per distinct target; null stays null |
//! | record | field-wise; every field must be exported |
//! | function, channel, raw-pointer | unsupported unless overridden |

#![warn(missing_docs)]

pub mod copier;
pub mod error;
pub mod overrides;
pub mod runtime;

pub use copier::{DeepCopier, PointerTracker};
pub use error::{Error, PathSegment, Result};
pub use overrides::{CopyOverride, Overrides};
pub use runtime::{
    Array, Channel, FieldDef, Function, Kind, Map, MapKey, Pointer, Record, RecordType, Slice,
    Type, Value,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Deep copy a value using only the built-in strategies
///
/// Returns an error naming the offending value and its position when any
/// part of the graph cannot be copied. No partial result is returned.
pub fn copy(value: &Value) -> Result<Value> {
    tracing::debug!("deep copy of {}", value.type_name());
    let mut copier = DeepCopier::new();
    let result = copier.copy(value);
    finish(&copier, result)
}

/// Deep copy a value, consulting `overrides` before every dispatch
///
/// An empty table behaves exactly like [`copy`].
pub fn copy_with_overrides(value: &Value, overrides: &Overrides) -> Result<Value> {
    tracing::debug!(
        "deep copy of {} with {} override(s)",
        value.type_name(),
        overrides.len()
    );
    let mut copier = DeepCopier::with_overrides(overrides);
    let result = copier.copy(value);
    finish(&copier, result)
}

fn finish(copier: &DeepCopier<'_>, result: Result<Value>) -> Result<Value> {
    match &result {
        Ok(_) => tracing::debug!(
            "deep copy done, {} shared allocation(s) copied",
            copier.tracked()
        ),
        Err(e) => tracing::debug!("deep copy failed: {}", e),
    }
    result
}

/// Like [`copy`], but panics on failure
///
/// # Panics
///
/// Panics with the error message when the value cannot be copied.
pub fn must_copy(value: &Value) -> Value {
    match copy(value) {
        Ok(copied) => copied,
        Err(e) => panic!("{}", e),
    }
}

/// Like [`copy_with_overrides`], but panics on failure
///
/// # Panics
///
/// Panics with the error message when the value cannot be copied.
pub fn must_copy_with_overrides(value: &Value, overrides: &Overrides) -> Value {
    match copy_with_overrides(value, overrides) {
        Ok(copied) => copied,
        Err(e) => panic!("{}", e),
    }
}

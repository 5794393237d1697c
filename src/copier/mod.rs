//! Deep copy engine
//!
//! [`DeepCopier`] walks a value graph depth-first. Each value is routed by its
//! shape tag to a copy strategy; aggregate strategies recurse back into the
//! copier for their children. Pointers, slices and maps go through a
//! [`PointerTracker`] so that shared storage is copied once and cycles
//! terminate.
//!
//! A copier is meant for a single top-level copy: its tracker remembers every
//! pointer it has seen, and reusing it would alias results of separate calls.

mod leaf;
mod map;
mod pointer;
mod record;
mod sequence;
mod tracker;

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::overrides::Overrides;
use crate::runtime::{Kind, Type, Value};

pub use tracker::{PointerTracker, SlotId, Tracked};

/// Copy strategy for one shape
pub type Strategy = fn(&mut DeepCopier<'_>, &Value) -> Result<Value>;

lazy_static::lazy_static! {
    /// Shape tag to strategy table; kinds without an entry are unsupported
    static ref STRATEGIES: HashMap<Kind, Strategy> = {
        let mut table: HashMap<Kind, Strategy> = HashMap::new();
        table.insert(Kind::Bool, leaf::copy_leaf);
        table.insert(Kind::Int, leaf::copy_leaf);
        table.insert(Kind::Uint, leaf::copy_leaf);
        table.insert(Kind::Float, leaf::copy_leaf);
        table.insert(Kind::Complex, leaf::copy_leaf);
        table.insert(Kind::String, leaf::copy_leaf);
        table.insert(Kind::Array, sequence::copy_array);
        table.insert(Kind::Slice, sequence::copy_slice);
        table.insert(Kind::Map, map::copy_map);
        table.insert(Kind::Pointer, pointer::copy_pointer);
        table.insert(Kind::Record, record::copy_record);
        table
    };
}

/// Look up the built-in strategy for a shape
pub fn strategy(kind: Kind) -> Option<Strategy> {
    STRATEGIES.get(&kind).copied()
}

/// Recursive deep copier
pub struct DeepCopier<'a> {
    /// Shared storage seen during this copy
    tracker: PointerTracker,
    /// Per-type overrides consulted before dispatch
    overrides: Option<&'a Overrides>,
}

impl<'a> DeepCopier<'a> {
    /// Creates a copier using only built-in strategies
    pub fn new() -> Self {
        DeepCopier {
            tracker: PointerTracker::new(),
            overrides: None,
        }
    }

    /// Creates a copier that consults `overrides` at every step
    pub fn with_overrides(overrides: &'a Overrides) -> Self {
        DeepCopier {
            tracker: PointerTracker::new(),
            overrides: Some(overrides),
        }
    }

    /// Number of distinct shared allocations copied so far
    pub fn tracked(&self) -> usize {
        self.tracker.len()
    }

    /// Copy a value
    pub fn copy(&mut self, value: &Value) -> Result<Value> {
        if value.is_nil() {
            return Ok(Value::Nil);
        }

        if let Some(overrides) = self.overrides.filter(|o| !o.is_empty()) {
            if let Some(over) = value.ty().and_then(|ty| overrides.get(&ty)) {
                tracing::trace!("applying copy override for {}", value.type_name());
                return over.copy(value);
            }
        }

        match strategy(value.kind()) {
            Some(copy) => copy(self, value),
            None => Err(Error::UnsupportedKind {
                value: value.to_string(),
                ty: value.ty().unwrap_or(Type::Any),
                kind: value.kind(),
            }),
        }
    }
}

impl Default for DeepCopier<'_> {
    fn default() -> Self {
        Self::new()
    }
}

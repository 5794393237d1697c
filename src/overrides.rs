//! Per-type copy overrides
//!
//! An override fully replaces built-in copying for values of exactly one
//! [`Type`]. The copier consults the table before dispatching on shape, at
//! every level of the value graph.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::runtime::{Type, Value};

/// Override trait - custom copy logic for one concrete type
pub trait CopyOverride: Send + Sync {
    /// Type this override handles
    fn target(&self) -> Type;

    /// Produce the copy of `value`
    ///
    /// The result is returned verbatim. Returning the input unchanged
    /// deliberately aliases it, which is correct for immutable values.
    fn copy(&self, value: &Value) -> Result<Value>;
}

struct FnOverride<F> {
    ty: Type,
    func: F,
}

impl<F> CopyOverride for FnOverride<F>
where
    F: Fn(&Value) -> Result<Value> + Send + Sync,
{
    fn target(&self) -> Type {
        self.ty.clone()
    }

    fn copy(&self, value: &Value) -> Result<Value> {
        (self.func)(value)
    }
}

/// Override table keyed by concrete type
#[derive(Clone, Default)]
pub struct Overrides {
    entries: HashMap<Type, Arc<dyn CopyOverride>>,
}

impl Overrides {
    /// Create an empty table
    pub fn new() -> Self {
        Overrides {
            entries: HashMap::new(),
        }
    }

    /// Register an override; replaces any earlier entry for the same type
    pub fn register<O: CopyOverride + 'static>(&mut self, over: O) {
        let ty = over.target();
        self.entries.insert(ty, Arc::new(over));
    }

    /// Register a closure as the override for `ty`
    pub fn register_fn<F>(&mut self, ty: Type, func: F)
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(FnOverride { ty, func });
    }

    /// Copy values of `ty` by returning them unchanged
    pub fn identity(&mut self, ty: Type) {
        self.register_fn(ty, |value| Ok(value.clone()));
    }

    /// Get the override for an exact type
    pub fn get(&self, ty: &Type) -> Option<Arc<dyn CopyOverride>> {
        self.entries.get(ty).cloned()
    }

    /// Check if an override exists for an exact type
    pub fn has(&self, ty: &Type) -> bool {
        self.entries.contains_key(ty)
    }

    /// Overridden types, sorted by name
    pub fn types(&self) -> Vec<Type> {
        let mut types: Vec<_> = self.entries.keys().cloned().collect();
        types.sort_by_key(|ty| ty.to_string());
        types
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no overrides are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Overrides")
            .field("types", &self.types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Doubler;

    impl CopyOverride for Doubler {
        fn target(&self) -> Type {
            Type::Int
        }

        fn copy(&self, value: &Value) -> Result<Value> {
            Ok(Value::Int(value.as_int()? * 2))
        }
    }

    #[test]
    fn test_register_typed_override() {
        let mut overrides = Overrides::new();
        overrides.register(Doubler);
        assert!(overrides.has(&Type::Int));
        assert!(!overrides.has(&Type::Uint));

        let over = overrides.get(&Type::Int).unwrap();
        assert_eq!(over.copy(&Value::Int(21)).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_register_replaces_previous_entry() {
        let mut overrides = Overrides::new();
        overrides.register(Doubler);
        overrides.register_fn(Type::Int, |_| Ok(Value::Int(0)));
        assert_eq!(overrides.len(), 1);
        let over = overrides.get(&Type::Int).unwrap();
        assert_eq!(over.copy(&Value::Int(21)).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_identity_and_listing() {
        let mut overrides = Overrides::new();
        assert!(overrides.is_empty());
        overrides.identity(Type::record("time.Time"));
        overrides.register_fn(Type::String, |_| {
            Err(Error::override_failed(Type::String, "refused"))
        });
        assert_eq!(
            overrides.types(),
            vec![Type::String, Type::record("time.Time")]
        );

        let over = overrides.get(&Type::String).unwrap();
        assert!(matches!(
            over.copy(&Value::string("x")),
            Err(Error::Override { .. })
        ));
    }
}

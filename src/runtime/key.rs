//! Map key semantics
//!
//! Keys compare the way comparable values do in a reflective runtime:
//! scalars by value, arrays and records element-wise, and every
//! reference-bearing value (pointers, slices, maps, functions, channels) by
//! the identity of its shared storage.

use std::hash::{Hash, Hasher};

use crate::runtime::Value;

/// A [`Value`] used as a map key
#[derive(Debug, Clone)]
pub struct MapKey(Value);

impl MapKey {
    /// The wrapped value
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for MapKey {
    fn from(value: Value) -> Self {
        MapKey(value)
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        key_eq(&self.0, &other.0)
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_key(&self.0, state);
    }
}

// -0.0 and 0.0 are equal keys and must hash alike
fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Uint(x), Value::Uint(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Complex { re: r1, im: i1 }, Value::Complex { re: r2, im: i2 }) => {
            r1 == r2 && i1 == i2
        }
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.elem() == y.elem()
                && x.len() == y.len()
                && x.items().iter().zip(y.items()).all(|(p, q)| key_eq(p, q))
        }
        (Value::Record(x), Value::Record(y)) => {
            x.layout().name() == y.layout().name()
                && x.values().len() == y.values().len()
                && x.values().iter().zip(y.values()).all(|(p, q)| key_eq(p, q))
        }
        (Value::Pointer(x), Value::Pointer(y)) => match (x.addr(), y.addr()) {
            (None, None) => x.elem() == y.elem(),
            (Some(p), Some(q)) => p == q,
            _ => false,
        },
        (Value::Slice(_), Value::Slice(_))
        | (Value::Map(_), Value::Map(_))
        | (Value::Function(_), Value::Function(_))
        | (Value::Channel(_), Value::Channel(_)) => a.storage_addr() == b.storage_addr(),
        (Value::RawPointer(x), Value::RawPointer(y)) => x == y,
        _ => false,
    }
}

fn hash_key<H: Hasher>(value: &Value, state: &mut H) {
    value.kind().hash(state);
    match value {
        Value::Nil => {}
        Value::Bool(b) => b.hash(state),
        Value::Int(n) => n.hash(state),
        Value::Uint(n) => n.hash(state),
        Value::Float(f) => float_bits(*f).hash(state),
        Value::Complex { re, im } => {
            float_bits(*re).hash(state);
            float_bits(*im).hash(state);
        }
        Value::String(s) => s.hash(state),
        Value::Array(arr) => {
            for item in arr.items() {
                hash_key(item, state);
            }
        }
        Value::Record(rec) => {
            rec.layout().name().hash(state);
            for field in rec.values() {
                hash_key(field, state);
            }
        }
        Value::Pointer(ptr) => ptr.addr().hash(state),
        Value::Slice(_) | Value::Map(_) | Value::Function(_) | Value::Channel(_) => {
            value.storage_addr().hash(state)
        }
        Value::RawPointer(addr) => addr.hash(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{FieldDef, RecordType, Type};
    use std::collections::HashMap;

    #[test]
    fn test_scalar_keys() {
        let mut map = HashMap::new();
        map.insert(MapKey::from(Value::string("a")), 1);
        map.insert(MapKey::from(Value::Int(1)), 2);
        assert_eq!(map.get(&MapKey::from(Value::string("a"))), Some(&1));
        assert_eq!(map.get(&MapKey::from(Value::Int(1))), Some(&2));
        assert_eq!(map.get(&MapKey::from(Value::Uint(1))), None);
    }

    #[test]
    fn test_signed_zero_keys_collide() {
        let a = MapKey::from(Value::Float(0.0));
        let b = MapKey::from(Value::Float(-0.0));
        assert_eq!(a, b);
        let mut map = HashMap::new();
        map.insert(a, "zero");
        assert_eq!(map.get(&b), Some(&"zero"));
    }

    #[test]
    fn test_pointer_keys_compare_by_identity() {
        let p = Value::pointer(Type::Int, Value::Int(7));
        let q = Value::pointer(Type::Int, Value::Int(7));
        assert_eq!(MapKey::from(p.clone()), MapKey::from(p.clone()));
        assert_ne!(MapKey::from(p), MapKey::from(q));
        assert_eq!(
            MapKey::from(Value::null(Type::Int)),
            MapKey::from(Value::null(Type::Int))
        );
    }

    #[test]
    fn test_record_keys_compare_fieldwise() {
        let layout = RecordType::new(
            "Point",
            vec![
                FieldDef::public("X", Type::Int),
                FieldDef::public("Y", Type::Int),
            ],
        );
        let a = Value::record(&layout, vec![Value::Int(1), Value::Int(2)]).unwrap();
        let b = Value::record(&layout, vec![Value::Int(1), Value::Int(2)]).unwrap();
        let c = Value::record(&layout, vec![Value::Int(2), Value::Int(1)]).unwrap();
        assert_eq!(MapKey::from(a.clone()), MapKey::from(b));
        assert_ne!(MapKey::from(a), MapKey::from(c));
    }
}

//! Runtime value model inspected by the copier
//!
//! Values report their shape ([`Kind`]) and concrete type identity
//! ([`Type`]), expose their children, and keep all mutable storage behind
//! shared slots so that aliasing is observable.

mod key;
mod types;
mod value;

pub use key::MapKey;
pub use types::{FieldDef, Kind, RecordType, Type};
pub use value::{
    Array, Channel, Function, Map, MapStorage, Pointer, Record, Slice, SliceStorage, Slot, Value,
};

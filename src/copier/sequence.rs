use std::sync::Arc;

use parking_lot::RwLock;

use crate::copier::{DeepCopier, PointerTracker, Tracked};
use crate::error::{Error, Result};
use crate::runtime::{Array, Kind, Slice, SliceStorage, Value};

/// Copy a variable-size sequence into fresh backing storage
///
/// An absent slice stays absent; it is not turned into an empty one. Backing
/// storage is tracked like a pointer target: slices sharing storage in the
/// original share the copied storage, and a slice that contains itself
/// terminates.
pub(super) fn copy_slice(copier: &mut DeepCopier<'_>, value: &Value) -> Result<Value> {
    let slice = match value {
        Value::Slice(slice) => slice,
        other => {
            return Err(Error::KindMismatch {
                expected: Kind::Slice,
                got: other.kind(),
            })
        }
    };

    let data = match slice.storage() {
        Some(data) => data,
        None => return Ok(Value::Slice(Slice::nil(slice.elem().clone()))),
    };

    let id = PointerTracker::identity(data);
    if let Some(Tracked::Items(storage)) = copier.tracker.get(id) {
        tracing::trace!("slice storage 0x{:x} already copied, reusing it", id);
        return Ok(Value::Slice(Slice::from_storage(slice.elem().clone(), storage)));
    }

    let storage: SliceStorage = Arc::new(RwLock::new(Vec::new()));
    copier.tracker.register(id, Tracked::Items(Arc::clone(&storage)));

    let items = data.read_recursive();
    let mut copied = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let item = copier.copy(item).map_err(|e| Error::SliceElement {
            index,
            source: Box::new(e),
        })?;
        copied.push(item);
    }
    *storage.write() = copied;

    Ok(Value::Slice(Slice::from_storage(slice.elem().clone(), storage)))
}

/// Copy a fixed-size sequence element by element
pub(super) fn copy_array(copier: &mut DeepCopier<'_>, value: &Value) -> Result<Value> {
    let array = match value {
        Value::Array(array) => array,
        other => {
            return Err(Error::KindMismatch {
                expected: Kind::Array,
                got: other.kind(),
            })
        }
    };

    let mut copied = Vec::with_capacity(array.len());
    for (index, item) in array.items().iter().enumerate() {
        let item = copier.copy(item).map_err(|e| Error::ArrayElement {
            index,
            source: Box::new(e),
        })?;
        copied.push(item);
    }

    Ok(Value::Array(Array::new(array.elem().clone(), copied)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Type;

    fn names() -> Vec<Value> {
        [
            "Phil Harris",
            "Rochester van Jones",
            "Mary Livingstone",
            "Dennis Day",
        ]
        .iter()
        .map(|s| Value::string(*s))
        .collect()
    }

    #[test]
    fn test_slice_copy_gets_fresh_storage() {
        let original = Value::slice(Type::String, names());
        let mut copier = DeepCopier::new();
        let copied = copy_slice(&mut copier, &original).unwrap();

        assert_eq!(copied, original);
        assert!(!copied.same_identity(&original));

        copied
            .as_slice()
            .unwrap()
            .set(0, Value::string("Jack Benny"))
            .unwrap();
        assert_eq!(
            original.as_slice().unwrap().get(0).unwrap(),
            Value::string("Phil Harris")
        );
    }

    #[test]
    fn test_absent_slice_stays_absent() {
        let mut copier = DeepCopier::new();
        let copied = copy_slice(&mut copier, &Value::nil_slice(Type::Int)).unwrap();
        let slice = copied.as_slice().unwrap();
        assert!(slice.is_nil());
        assert_eq!(slice.elem(), &Type::Int);

        let copied = copy_slice(&mut copier, &Value::slice(Type::Int, vec![])).unwrap();
        assert!(!copied.as_slice().unwrap().is_nil());
    }

    #[test]
    fn test_untyped_nil_elements_survive() {
        let original = Value::slice(Type::Any, vec![Value::Nil]);
        let mut copier = DeepCopier::new();
        let copied = copy_slice(&mut copier, &original).unwrap();
        assert_eq!(copied.as_slice().unwrap().len(), 1);
        assert_eq!(copied, original);
    }

    #[test]
    fn test_slice_element_failure_names_index() {
        let original = Value::slice(
            Type::Any,
            vec![Value::Int(1), Value::function("f")],
        );
        let mut copier = DeepCopier::new();
        let err = copy_slice(&mut copier, &original).unwrap_err();
        assert!(matches!(err, Error::SliceElement { index: 1, .. }));
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_shared_storage_stays_shared() {
        let shared = Value::slice(Type::Int, vec![Value::Int(1)]);
        let original = Value::array(Type::slice(Type::Int), vec![shared.clone(), shared]);
        let mut copier = DeepCopier::new();
        let copied = copy_array(&mut copier, &original).unwrap();

        let items = copied.as_array().unwrap().items();
        assert!(items[0].same_identity(&items[1]));
        assert!(!items[0].same_identity(&original.as_array().unwrap().items()[0]));

        items[0].as_slice().unwrap().set(0, Value::Int(9)).unwrap();
        assert_eq!(items[1].as_slice().unwrap().get(0).unwrap(), Value::Int(9));
        assert_eq!(copier.tracked(), 1);
    }

    #[test]
    fn test_self_containing_slice_terminates() {
        let original = Value::slice(Type::Any, vec![Value::Nil]);
        original.as_slice().unwrap().set(0, original.clone()).unwrap();

        let mut copier = DeepCopier::new();
        let copied = copy_slice(&mut copier, &original).unwrap();
        let inner = copied.as_slice().unwrap().get(0).unwrap();

        assert!(inner.same_identity(&copied));
        assert!(!copied.same_identity(&original));
        assert_eq!(copied, original);
    }

    #[test]
    fn test_array_copy() {
        let original = Value::array(
            Type::String,
            vec![Value::string("Jell-O"), Value::string("Grape-Nuts")],
        );
        let mut copier = DeepCopier::new();
        let copied = copy_array(&mut copier, &original).unwrap();
        assert_eq!(copied, original);
        assert_eq!(copied.ty(), Some(Type::array(Type::String, 2)));
    }

    #[test]
    fn test_array_of_pointers_copies_targets() {
        let original = Value::array(
            Type::pointer(Type::Int),
            vec![
                Value::pointer(Type::Int, Value::Int(1)),
                Value::null(Type::Int),
            ],
        );
        let mut copier = DeepCopier::new();
        let copied = copy_array(&mut copier, &original).unwrap();
        assert_eq!(copied, original);

        let (src, dst) = (original.as_array().unwrap(), copied.as_array().unwrap());
        assert!(!src.items()[0].same_identity(&dst.items()[0]));
        assert!(dst.items()[1].as_pointer().unwrap().is_null());
    }

    #[test]
    fn test_array_element_failure_names_index() {
        let original = Value::array(Type::Any, vec![Value::channel(Type::Int)]);
        let mut copier = DeepCopier::new();
        let err = copy_array(&mut copier, &original).unwrap_err();
        assert!(matches!(err, Error::ArrayElement { index: 0, .. }));
    }
}

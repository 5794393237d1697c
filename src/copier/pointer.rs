use std::sync::Arc;

use parking_lot::RwLock;

use crate::copier::{DeepCopier, PointerTracker, Tracked};
use crate::error::{Error, Result};
use crate::runtime::{Kind, Pointer, Value};

/// Copy a pointer and, once per distinct target, the value behind it
///
/// The new slot is registered with the tracker before the pointee is
/// copied. A path that leads back to the same target while its copy is in
/// progress therefore resolves to the registered slot, which is what makes
/// self-referential graphs terminate and keeps shared targets shared.
pub(super) fn copy_pointer(copier: &mut DeepCopier<'_>, value: &Value) -> Result<Value> {
    let pointer = match value {
        Value::Pointer(pointer) => pointer,
        other => {
            return Err(Error::KindMismatch {
                expected: Kind::Pointer,
                got: other.kind(),
            })
        }
    };

    let target = match pointer.slot() {
        Some(target) => target,
        None => return Ok(Value::Pointer(Pointer::null(pointer.elem().clone()))),
    };

    let id = PointerTracker::identity(target);
    if let Some(Tracked::Slot(slot)) = copier.tracker.get(id) {
        tracing::trace!("pointer 0x{:x} already copied, reusing its slot", id);
        return Ok(Value::Pointer(Pointer::from_slot(pointer.elem().clone(), slot)));
    }

    let slot = Arc::new(RwLock::new(Value::Nil));
    copier.tracker.register(id, Tracked::Slot(Arc::clone(&slot)));

    // Re-entrant read: a pointee may hold a container whose lock is already
    // read further up the stack.
    let copied = {
        let pointee = target.read_recursive();
        copier.copy(&pointee).map_err(|e| Error::PointerTarget {
            ty: pointer.ty(),
            source: Box::new(e),
        })?
    };
    *slot.write() = copied;

    Ok(Value::Pointer(Pointer::from_slot(pointer.elem().clone(), slot)))
}

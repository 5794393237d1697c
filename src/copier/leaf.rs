use crate::copier::DeepCopier;
use crate::error::{Error, Result};
use crate::runtime::{Kind, Value};

/// Scalars have no reachable structure; the copy is the value itself
pub(super) fn copy_leaf(_: &mut DeepCopier<'_>, value: &Value) -> Result<Value> {
    let kind = value.kind();
    if !kind.is_leaf() && kind != Kind::Nil {
        return Err(Error::NotPrimitive {
            value: value.to_string(),
            kind,
        });
    }
    Ok(value.clone())
}

use crate::copier::DeepCopier;
use crate::error::{Error, Result};
use crate::runtime::{Kind, Record, Value};

/// Copy a record field by field, in declaration order
///
/// Every field must be exported. The first unexported field, or the first
/// field that fails to copy, aborts the whole record.
pub(super) fn copy_record(copier: &mut DeepCopier<'_>, value: &Value) -> Result<Value> {
    let record = match value {
        Value::Record(record) => record,
        other => {
            return Err(Error::KindMismatch {
                expected: Kind::Record,
                got: other.kind(),
            })
        }
    };

    let layout = record.layout();
    let mut fields = Vec::with_capacity(layout.fields().len());
    for (def, field) in layout.fields().iter().zip(record.values()) {
        if !def.exported {
            return Err(Error::InaccessibleField {
                ty: layout.name().to_string(),
                field: def.name.clone(),
            });
        }
        let copied = copier.copy(field).map_err(|e| Error::Field {
            field: def.name.clone(),
            record: value.to_string(),
            source: Box::new(e),
        })?;
        fields.push(copied);
    }

    Ok(Value::Record(Record::from_parts(layout.clone(), fields)))
}

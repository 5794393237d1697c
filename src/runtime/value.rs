use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::runtime::{Kind, MapKey, RecordType, Type};

/// Shared, mutable storage behind a pointer
pub type Slot = Arc<RwLock<Value>>;

/// Shared backing storage of a present slice
pub type SliceStorage = Arc<RwLock<Vec<Value>>>;

/// Shared backing storage of a present map
pub type MapStorage = Arc<RwLock<HashMap<MapKey, Value>>>;

/// Runtime value representation
#[derive(Debug, Clone)]
pub enum Value {
    // Primitives
    /// Untyped absent value
    Nil,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit unsigned integer
    Uint(u64),
    /// 64-bit floating-point value
    Float(f64),
    /// Complex number
    Complex {
        /// Real part
        re: f64,
        /// Imaginary part
        im: f64,
    },
    /// Immutable text
    String(String),

    // Aggregates
    /// Fixed-size sequence (value semantics)
    Array(Array),
    /// Variable-size sequence with shared backing storage
    Slice(Slice),
    /// Key/value mapping with shared backing storage
    Map(Map),
    /// Reference to a shared slot
    Pointer(Pointer),
    /// Named-field aggregate
    Record(Record),

    // Handles
    /// Native function handle
    Function(Function),
    /// Channel handle
    Channel(Channel),
    /// Raw memory address
    RawPointer(usize),
}

/// Fixed-size sequence; the arity is part of its type
#[derive(Debug, Clone)]
pub struct Array {
    elem: Type,
    items: Box<[Value]>,
}

impl Array {
    /// Creates an array whose arity is the number of items
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Array {
            elem,
            items: items.into_boxed_slice(),
        }
    }

    /// Element type
    pub fn elem(&self) -> &Type {
        &self.elem
    }

    /// Elements in index order
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Arity
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True for zero-arity arrays
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Array type
    pub fn ty(&self) -> Type {
        Type::array(self.elem.clone(), self.items.len())
    }
}

/// Variable-size sequence; `None` storage is the absent slice
#[derive(Clone)]
pub struct Slice {
    elem: Type,
    data: Option<SliceStorage>,
}

impl Slice {
    /// Creates a present slice owning fresh storage
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Slice {
            elem,
            data: Some(Arc::new(RwLock::new(items))),
        }
    }

    /// Creates an absent slice
    pub fn nil(elem: Type) -> Self {
        Slice { elem, data: None }
    }

    pub(crate) fn from_storage(elem: Type, data: SliceStorage) -> Self {
        Slice {
            elem,
            data: Some(data),
        }
    }

    /// Element type
    pub fn elem(&self) -> &Type {
        &self.elem
    }

    /// Slice type
    pub fn ty(&self) -> Type {
        Type::slice(self.elem.clone())
    }

    /// True when the slice has no backing storage
    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    /// Number of elements (0 when absent)
    pub fn len(&self) -> usize {
        self.data
            .as_ref()
            .map(|d| d.read_recursive().len())
            .unwrap_or(0)
    }

    /// True when absent or zero-length
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets an element by index
    pub fn get(&self, index: usize) -> Result<Value> {
        let items = self.data.as_ref().map(|d| d.read_recursive());
        let length = items.as_ref().map(|i| i.len()).unwrap_or(0);
        match items {
            Some(items) if index < length => Ok(items[index].clone()),
            _ => Err(Error::IndexOutOfBounds { index, length }),
        }
    }

    /// Replaces the element at `index`; visible through every alias
    pub fn set(&self, index: usize, value: Value) -> Result<()> {
        match &self.data {
            Some(data) => {
                let mut items = data.write();
                let length = items.len();
                match items.get_mut(index) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(Error::IndexOutOfBounds { index, length }),
                }
            }
            None => Err(Error::IndexOutOfBounds { index, length: 0 }),
        }
    }

    /// Appends an element, allocating storage if the slice is absent
    pub fn push(&mut self, value: Value) {
        match &self.data {
            Some(data) => data.write().push(value),
            None => self.data = Some(Arc::new(RwLock::new(vec![value]))),
        }
    }

    /// Snapshot of the elements (empty when absent)
    pub fn to_vec(&self) -> Vec<Value> {
        self.data
            .as_ref()
            .map(|d| d.read_recursive().clone())
            .unwrap_or_default()
    }

    pub(crate) fn storage(&self) -> Option<&SliceStorage> {
        self.data.as_ref()
    }
}

// Debug goes through the cycle-safe rendering
impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Slice")
            .field("elem", &self.elem)
            .field("items", &format_args!("{}", Value::Slice(self.clone())))
            .finish()
    }
}

/// Key/value mapping; `None` storage is the absent map
#[derive(Clone)]
pub struct Map {
    key: Type,
    value: Type,
    data: Option<MapStorage>,
}

impl Map {
    /// Creates a present map from key/value pairs
    pub fn new(key: Type, value: Type, entries: Vec<(Value, Value)>) -> Self {
        let data = entries
            .into_iter()
            .map(|(k, v)| (MapKey::from(k), v))
            .collect();
        Map::from_storage(key, value, Arc::new(RwLock::new(data)))
    }

    /// Creates an absent map
    pub fn nil(key: Type, value: Type) -> Self {
        Map {
            key,
            value,
            data: None,
        }
    }

    pub(crate) fn from_storage(key: Type, value: Type, data: MapStorage) -> Self {
        Map {
            key,
            value,
            data: Some(data),
        }
    }

    /// Key type
    pub fn key_type(&self) -> &Type {
        &self.key
    }

    /// Value type
    pub fn value_type(&self) -> &Type {
        &self.value
    }

    /// Map type
    pub fn ty(&self) -> Type {
        Type::map(self.key.clone(), self.value.clone())
    }

    /// True when the map has no backing storage
    pub fn is_nil(&self) -> bool {
        self.data.is_none()
    }

    /// Number of entries (0 when absent)
    pub fn len(&self) -> usize {
        self.data
            .as_ref()
            .map(|d| d.read_recursive().len())
            .unwrap_or(0)
    }

    /// True when absent or without entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a key
    pub fn get(&self, key: &Value) -> Option<Value> {
        let data = self.data.as_ref()?;
        let key = MapKey::from(key.clone());
        let entries = data.read_recursive();
        entries.get(&key).cloned()
    }

    /// Inserts an entry, returning the previous value for the key
    ///
    /// Writing into an absent map is an error; absence is never silently
    /// turned into an empty map.
    pub fn insert(&self, key: Value, value: Value) -> Result<Option<Value>> {
        match &self.data {
            Some(data) => Ok(data.write().insert(MapKey::from(key), value)),
            None => Err(Error::NilAccess {
                ty: self.ty().to_string(),
            }),
        }
    }

    /// Snapshot of all entries in unspecified order
    pub fn entries(&self) -> Vec<(Value, Value)> {
        match &self.data {
            Some(data) => data
                .read_recursive()
                .iter()
                .map(|(k, v)| (k.value().clone(), v.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn storage(&self) -> Option<&MapStorage> {
        self.data.as_ref()
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Map")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("entries", &format_args!("{}", Value::Map(self.clone())))
            .finish()
    }
}

/// Single-slot reference; `None` is the null pointer
#[derive(Clone)]
pub struct Pointer {
    elem: Type,
    target: Option<Slot>,
}

impl Pointer {
    /// Allocates a fresh slot holding `value`
    pub fn new(elem: Type, value: Value) -> Self {
        Pointer {
            elem,
            target: Some(Arc::new(RwLock::new(value))),
        }
    }

    /// Null pointer to the element type
    pub fn null(elem: Type) -> Self {
        Pointer { elem, target: None }
    }

    /// Pointer to an existing slot
    pub fn from_slot(elem: Type, slot: Slot) -> Self {
        Pointer {
            elem,
            target: Some(slot),
        }
    }

    /// Element type
    pub fn elem(&self) -> &Type {
        &self.elem
    }

    /// Pointer type
    pub fn ty(&self) -> Type {
        Type::pointer(self.elem.clone())
    }

    /// True for the null pointer
    pub fn is_null(&self) -> bool {
        self.target.is_none()
    }

    /// Target slot, if any
    pub fn slot(&self) -> Option<&Slot> {
        self.target.as_ref()
    }

    /// Address of the target slot; the pointer's identity
    pub fn addr(&self) -> Option<usize> {
        self.target.as_ref().map(|slot| Arc::as_ptr(slot) as usize)
    }

    /// True when both pointers reference the same slot
    pub fn same_target(&self, other: &Pointer) -> bool {
        match (&self.target, &other.target) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Reads the pointee
    pub fn get(&self) -> Result<Value> {
        match &self.target {
            Some(slot) => Ok(slot.read_recursive().clone()),
            None => Err(self.nil_access()),
        }
    }

    /// Overwrites the pointee; visible through every alias
    pub fn set(&self, value: Value) -> Result<()> {
        match &self.target {
            Some(slot) => {
                *slot.write() = value;
                Ok(())
            }
            None => Err(self.nil_access()),
        }
    }

    /// Mutates the pointee in place
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> Result<R> {
        match &self.target {
            Some(slot) => Ok(f(&mut slot.write())),
            None => Err(self.nil_access()),
        }
    }

    fn nil_access(&self) -> Error {
        Error::NilAccess {
            ty: self.ty().to_string(),
        }
    }
}

// Debug output stops at the slot address so cyclic graphs can be printed
impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Pointer")
            .field("elem", &self.elem)
            .field("addr", &self.addr())
            .finish()
    }
}

/// Instance of a [`RecordType`]; field values in declaration order
#[derive(Debug, Clone)]
pub struct Record {
    layout: Arc<RecordType>,
    fields: Vec<Value>,
}

impl Record {
    /// Creates a record, checking the field count against the layout
    pub fn new(layout: &Arc<RecordType>, fields: Vec<Value>) -> Result<Self> {
        let expected = layout.fields().len();
        if fields.len() != expected {
            return Err(Error::FieldCount {
                record: layout.name().to_string(),
                expected,
                got: fields.len(),
            });
        }
        Ok(Record {
            layout: Arc::clone(layout),
            fields,
        })
    }

    pub(crate) fn from_parts(layout: Arc<RecordType>, fields: Vec<Value>) -> Self {
        Record { layout, fields }
    }

    /// Shared layout
    pub fn layout(&self) -> &Arc<RecordType> {
        &self.layout
    }

    /// Record type identity
    pub fn ty(&self) -> Type {
        self.layout.ty()
    }

    /// Field values in declaration order
    pub fn values(&self) -> &[Value] {
        &self.fields
    }

    /// Gets a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.layout.field_index(name).map(|i| &self.fields[i])
    }

    /// Replaces a field by name
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self.layout.field_index(name) {
            Some(i) => {
                self.fields[i] = value;
                Ok(())
            }
            None => Err(Error::UnknownField {
                record: self.layout.name().to_string(),
                field: name.to_string(),
            }),
        }
    }
}

/// Opaque function handle; only its name and identity are observable
#[derive(Debug, Clone)]
pub struct Function {
    name: Arc<str>,
    handle: Arc<()>,
}

impl Function {
    /// Creates a new, distinct function handle
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Function {
            name: name.into(),
            handle: Arc::new(()),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Opaque channel handle carrying values of the element type
#[derive(Debug, Clone)]
pub struct Channel {
    elem: Type,
    handle: Arc<()>,
}

impl Channel {
    /// Creates a new, distinct channel handle
    pub fn new(elem: Type) -> Self {
        Channel {
            elem,
            handle: Arc::new(()),
        }
    }

    /// Element type
    pub fn elem(&self) -> &Type {
        &self.elem
    }
}

impl Value {
    /// Creates a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Creates a fixed-size array
    pub fn array(elem: Type, items: Vec<Value>) -> Self {
        Value::Array(Array::new(elem, items))
    }

    /// Creates a present slice
    pub fn slice(elem: Type, items: Vec<Value>) -> Self {
        Value::Slice(Slice::new(elem, items))
    }

    /// Creates an absent slice
    pub fn nil_slice(elem: Type) -> Self {
        Value::Slice(Slice::nil(elem))
    }

    /// Creates a present map
    pub fn map(key: Type, value: Type, entries: Vec<(Value, Value)>) -> Self {
        Value::Map(Map::new(key, value, entries))
    }

    /// Creates an absent map
    pub fn nil_map(key: Type, value: Type) -> Self {
        Value::Map(Map::nil(key, value))
    }

    /// Allocates a new slot holding `value` and points at it
    pub fn pointer(elem: Type, value: Value) -> Self {
        Value::Pointer(Pointer::new(elem, value))
    }

    /// Creates a null pointer
    pub fn null(elem: Type) -> Self {
        Value::Pointer(Pointer::null(elem))
    }

    /// Creates a record instance
    pub fn record(layout: &Arc<RecordType>, fields: Vec<Value>) -> Result<Self> {
        Record::new(layout, fields).map(Value::Record)
    }

    /// Creates a function handle
    pub fn function(name: impl Into<Arc<str>>) -> Self {
        Value::Function(Function::new(name))
    }

    /// Creates a channel handle
    pub fn channel(elem: Type) -> Self {
        Value::Channel(Channel::new(elem))
    }

    /// Returns the shape tag
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Uint(_) => Kind::Uint,
            Value::Float(_) => Kind::Float,
            Value::Complex { .. } => Kind::Complex,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Slice(_) => Kind::Slice,
            Value::Map(_) => Kind::Map,
            Value::Pointer(_) => Kind::Pointer,
            Value::Record(_) => Kind::Record,
            Value::Function(_) => Kind::Function,
            Value::Channel(_) => Kind::Channel,
            Value::RawPointer(_) => Kind::RawPointer,
        }
    }

    /// Returns the concrete type; `None` for the untyped `Nil`
    pub fn ty(&self) -> Option<Type> {
        let ty = match self {
            Value::Nil => return None,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Uint(_) => Type::Uint,
            Value::Float(_) => Type::Float,
            Value::Complex { .. } => Type::Complex,
            Value::String(_) => Type::String,
            Value::Array(arr) => arr.ty(),
            Value::Slice(slice) => slice.ty(),
            Value::Map(map) => map.ty(),
            Value::Pointer(ptr) => ptr.ty(),
            Value::Record(rec) => rec.ty(),
            Value::Function(_) => Type::Function,
            Value::Channel(ch) => Type::channel(ch.elem().clone()),
            Value::RawPointer(_) => Type::RawPointer,
        };
        Some(ty)
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> String {
        self.ty()
            .map(|ty| ty.to_string())
            .unwrap_or_else(|| "nil".to_string())
    }

    /// True for the untyped `Nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Address of the shared storage behind a reference-bearing value
    pub(crate) fn storage_addr(&self) -> Option<usize> {
        match self {
            Value::Slice(slice) => slice.data.as_ref().map(|d| Arc::as_ptr(d) as usize),
            Value::Map(map) => map.data.as_ref().map(|d| Arc::as_ptr(d) as usize),
            Value::Pointer(ptr) => ptr.addr(),
            Value::Function(func) => Some(Arc::as_ptr(&func.handle) as usize),
            Value::Channel(ch) => Some(Arc::as_ptr(&ch.handle) as usize),
            _ => None,
        }
    }

    /// True when both values share mutable storage
    ///
    /// Scalars, arrays and records never share storage themselves; absent
    /// slices/maps and null pointers share nothing.
    pub fn same_identity(&self, other: &Value) -> bool {
        match (self.storage_addr(), other.storage_addr()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    // Type conversion methods

    /// Converts value to a boolean
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.type_error("bool")),
        }
    }

    /// Converts value to a signed integer
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Uint(n) => i64::try_from(*n).map_err(|_| self.type_error("int")),
            _ => Err(self.type_error("int")),
        }
    }

    /// Converts value to a floating-point number
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            Value::Uint(n) => Ok(*n as f64),
            _ => Err(self.type_error("float")),
        }
    }

    /// Returns a reference to the string value
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.type_error("string")),
        }
    }

    /// Returns the array
    pub fn as_array(&self) -> Result<&Array> {
        match self {
            Value::Array(arr) => Ok(arr),
            _ => Err(self.type_error("array")),
        }
    }

    /// Returns the slice
    pub fn as_slice(&self) -> Result<&Slice> {
        match self {
            Value::Slice(slice) => Ok(slice),
            _ => Err(self.type_error("slice")),
        }
    }

    /// Returns the map
    pub fn as_map(&self) -> Result<&Map> {
        match self {
            Value::Map(map) => Ok(map),
            _ => Err(self.type_error("map")),
        }
    }

    /// Returns the pointer
    pub fn as_pointer(&self) -> Result<&Pointer> {
        match self {
            Value::Pointer(ptr) => Ok(ptr),
            _ => Err(self.type_error("pointer")),
        }
    }

    /// Returns the record
    pub fn as_record(&self) -> Result<&Record> {
        match self {
            Value::Record(rec) => Ok(rec),
            _ => Err(self.type_error("record")),
        }
    }

    /// Gets a field value from a record by name
    pub fn get_field(&self, name: &str) -> Result<Value> {
        let rec = self.as_record()?;
        rec.get(name).cloned().ok_or_else(|| Error::UnknownField {
            record: rec.layout().name().to_string(),
            field: name.to_string(),
        })
    }

    /// Sets a field value on a record by name
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        match self {
            Value::Record(rec) => rec.set(name, value),
            _ => Err(self.type_error("record")),
        }
    }

    fn type_error(&self, expected: &str) -> Error {
        Error::TypeError {
            expected: expected.to_string(),
            got: self.type_name(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut out = String::new();
        render(self, &mut out, &mut Vec::new())?;
        f.write_str(&out)
    }
}

// `active` holds the storage of every slice and map currently being
// rendered; a container reached again from inside itself prints as `...`.
// Pointers never print their target.
fn render(value: &Value, out: &mut String, active: &mut Vec<usize>) -> fmt::Result {
    match value {
        Value::Nil => write!(out, "<nil>"),
        Value::Bool(b) => write!(out, "{}", b),
        Value::Int(n) => write!(out, "{}", n),
        Value::Uint(n) => write!(out, "{}", n),
        Value::Float(fl) => write!(out, "{}", fl),
        Value::Complex { re, im } => write!(out, "({}{:+}i)", re, im),
        Value::String(s) => write!(out, "\"{}\"", s),
        Value::Array(arr) => render_items(arr.items(), out, active),
        Value::Slice(slice) => match slice.storage() {
            Some(data) => {
                let addr = Arc::as_ptr(data) as usize;
                if active.contains(&addr) {
                    return write!(out, "[...]");
                }
                active.push(addr);
                let items = data.read_recursive();
                render_items(&items, out, active)?;
                active.pop();
                Ok(())
            }
            None => write!(out, "{}(nil)", slice.ty()),
        },
        Value::Map(map) => match map.storage() {
            Some(data) => {
                let addr = Arc::as_ptr(data) as usize;
                if active.contains(&addr) {
                    return write!(out, "map[...]");
                }
                active.push(addr);
                let mut entries = Vec::new();
                for (k, v) in data.read_recursive().iter() {
                    let mut entry = String::new();
                    render(k.value(), &mut entry, active)?;
                    entry.push_str(": ");
                    render(v, &mut entry, active)?;
                    entries.push(entry);
                }
                active.pop();
                // Sorted so rendering does not depend on hash order
                entries.sort();
                write!(out, "map[{}]", entries.join(", "))
            }
            None => write!(out, "{}(nil)", map.ty()),
        },
        Value::Pointer(ptr) => match ptr.addr() {
            Some(addr) => write!(out, "({})(0x{:x})", ptr.ty(), addr),
            None => write!(out, "({})(nil)", ptr.ty()),
        },
        Value::Record(rec) => {
            write!(out, "{}{{", rec.layout().name())?;
            for (i, (def, val)) in rec.layout().fields().iter().zip(rec.values()).enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write!(out, "{}: ", def.name)?;
                render(val, out, active)?;
            }
            write!(out, "}}")
        }
        Value::Function(func) => write!(out, "<function {}>", func.name()),
        Value::Channel(ch) => write!(out, "<chan {}>", ch.elem()),
        Value::RawPointer(addr) => write!(out, "0x{:x}", addr),
    }
}

fn render_items(items: &[Value], out: &mut String, active: &mut Vec<usize>) -> fmt::Result {
    out.push('[');
    for (i, val) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render(val, out, active)?;
    }
    out.push(']');
    Ok(())
}

// Deep structural equality. Pointers, slices and maps are equal when they
// share storage or when their contents are equal; visited storage pairs are
// assumed equal so cyclic graphs terminate.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other, &mut HashSet::new())
    }
}

fn deep_equal(a: &Value, b: &Value, visited: &mut HashSet<(usize, usize)>) -> bool {
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
            x.elem == y.elem && all_equal(&x.items, &y.items, visited)
        }
        (Value::Slice(x), Value::Slice(y)) => {
            if x.elem != y.elem {
                return false;
            }
            match (&x.data, &y.data) {
                (None, None) => true,
                (Some(p), Some(q)) if Arc::ptr_eq(p, q) => true,
                (Some(p), Some(q)) => {
                    if !visited.insert((Arc::as_ptr(p) as usize, Arc::as_ptr(q) as usize)) {
                        return true;
                    }
                    let (p, q) = (p.read_recursive(), q.read_recursive());
                    all_equal(&p, &q, visited)
                }
                _ => false,
            }
        }
        (Value::Map(x), Value::Map(y)) => {
            if x.key != y.key || x.value != y.value {
                return false;
            }
            match (&x.data, &y.data) {
                (None, None) => true,
                (Some(p), Some(q)) if Arc::ptr_eq(p, q) => true,
                (Some(p), Some(q)) => {
                    if !visited.insert((Arc::as_ptr(p) as usize, Arc::as_ptr(q) as usize)) {
                        return true;
                    }
                    let (p, q) = (p.read_recursive(), q.read_recursive());
                    p.len() == q.len()
                        && p.iter().all(|(k, v)| match q.get(k) {
                            Some(w) => deep_equal(v, w, visited),
                            None => false,
                        })
                }
                _ => false,
            }
        }
        (Value::Pointer(x), Value::Pointer(y)) => {
            if x.elem != y.elem {
                return false;
            }
            match (&x.target, &y.target) {
                (None, None) => true,
                (Some(p), Some(q)) if Arc::ptr_eq(p, q) => true,
                (Some(p), Some(q)) => {
                    let pair = (Arc::as_ptr(p) as usize, Arc::as_ptr(q) as usize);
                    if !visited.insert(pair) {
                        return true;
                    }
                    let (p, q) = (p.read_recursive(), q.read_recursive());
                    deep_equal(&p, &q, visited)
                }
                _ => false,
            }
        }
        (Value::Record(x), Value::Record(y)) => {
            x.layout.name() == y.layout.name() && all_equal(&x.fields, &y.fields, visited)
        }
        // Handles compare by identity
        (Value::Function(_), Value::Function(_)) | (Value::Channel(_), Value::Channel(_)) => {
            a.storage_addr() == b.storage_addr()
        }
        (Value::RawPointer(x), Value::RawPointer(y)) => x == y,
        _ => false,
    }
}

fn all_equal(a: &[Value], b: &[Value], visited: &mut HashSet<(usize, usize)>) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y, visited))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::FieldDef;

    fn foo_layout() -> Arc<RecordType> {
        RecordType::new(
            "Foo",
            vec![
                FieldDef::public("Foo", Type::pointer(Type::record("Foo"))),
                FieldDef::public("Bar", Type::Int),
            ],
        )
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Bool(true).type_name(), "bool");
        assert_eq!(Value::Int(42).type_name(), "int");
        assert_eq!(Value::Float(2.71).type_name(), "float");
        assert_eq!(Value::string("test").type_name(), "string");
        assert_eq!(Value::nil_slice(Type::Int).type_name(), "[]int");
        assert_eq!(
            Value::nil_map(Type::String, Type::Int).type_name(),
            "map[string]int"
        );
    }

    #[test]
    fn test_conversions() {
        let v = Value::Int(42);
        assert_eq!(v.as_int().unwrap(), 42);
        assert_eq!(v.as_float().unwrap(), 42.0);
        assert!(v.as_bool().is_err());

        let v = Value::string("test");
        assert_eq!(v.as_str().unwrap(), "test");
        assert!(matches!(
            v.as_pointer(),
            Err(Error::TypeError { ref got, .. }) if got == "string"
        ));
    }

    #[test]
    fn test_slice_absent_versus_empty() {
        let absent = Value::nil_slice(Type::Int);
        let empty = Value::slice(Type::Int, vec![]);
        assert!(absent.as_slice().unwrap().is_nil());
        assert!(!empty.as_slice().unwrap().is_nil());
        assert_ne!(absent, empty);
    }

    #[test]
    fn test_slice_aliases_share_storage() {
        let a = Value::slice(Type::Int, vec![Value::Int(1), Value::Int(2)]);
        let b = a.clone();
        b.as_slice().unwrap().set(0, Value::Int(9)).unwrap();
        assert_eq!(a.as_slice().unwrap().get(0).unwrap(), Value::Int(9));
        assert!(a.same_identity(&b));
        assert!(matches!(
            a.as_slice().unwrap().get(5),
            Err(Error::IndexOutOfBounds { index: 5, length: 2 })
        ));
    }

    #[test]
    fn test_map_operations() {
        let map = Value::map(
            Type::String,
            Type::Int,
            vec![(Value::string("a"), Value::Int(1))],
        );
        let m = map.as_map().unwrap();
        assert_eq!(m.get(&Value::string("a")), Some(Value::Int(1)));
        assert_eq!(m.insert(Value::string("b"), Value::Int(2)).unwrap(), None);
        assert_eq!(m.len(), 2);

        let absent = Value::nil_map(Type::String, Type::Int);
        assert!(absent
            .as_map()
            .unwrap()
            .insert(Value::string("a"), Value::Int(1))
            .is_err());
    }

    #[test]
    fn test_pointer_operations() {
        let p = Value::pointer(Type::Int, Value::Int(1));
        let alias = p.clone();
        p.as_pointer().unwrap().set(Value::Int(2)).unwrap();
        assert_eq!(alias.as_pointer().unwrap().get().unwrap(), Value::Int(2));
        assert!(p.as_pointer().unwrap().same_target(alias.as_pointer().unwrap()));

        let null = Value::null(Type::Int);
        assert!(null.as_pointer().unwrap().is_null());
        assert!(matches!(
            null.as_pointer().unwrap().get(),
            Err(Error::NilAccess { .. })
        ));
    }

    #[test]
    fn test_record_operations() {
        let layout = foo_layout();
        let mut rec = Value::record(&layout, vec![Value::null(Type::record("Foo")), Value::Int(1)])
            .unwrap();
        assert_eq!(rec.get_field("Bar").unwrap(), Value::Int(1));
        rec.set_field("Bar", Value::Int(5)).unwrap();
        assert_eq!(rec.get_field("Bar").unwrap(), Value::Int(5));
        assert!(matches!(
            rec.set_field("Baz", Value::Int(0)),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            Value::record(&layout, vec![]),
            Err(Error::FieldCount {
                expected: 2,
                got: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_deep_equality_follows_pointers() {
        let a = Value::pointer(Type::Int, Value::Int(3));
        let b = Value::pointer(Type::Int, Value::Int(3));
        assert_eq!(a, b);
        assert!(!a.same_identity(&b));
        b.as_pointer().unwrap().set(Value::Int(4)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_deep_equality_terminates_on_cycles() {
        let layout = foo_layout();
        let make_cycle = || {
            let rec =
                Value::record(&layout, vec![Value::null(Type::record("Foo")), Value::Int(4)])
                    .unwrap();
            let p = Value::pointer(Type::record("Foo"), rec);
            let back = p.clone();
            p.as_pointer()
                .unwrap()
                .update(|v| v.set_field("Foo", back))
                .unwrap()
                .unwrap();
            p
        };
        assert_eq!(make_cycle(), make_cycle());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::string("x").to_string(), "\"x\"");
        assert_eq!(Value::nil_slice(Type::Int).to_string(), "[]int(nil)");
        assert_eq!(
            Value::slice(Type::Int, vec![Value::Int(1), Value::Int(2)]).to_string(),
            "[1, 2]"
        );
        assert_eq!(Value::null(Type::Int).to_string(), "(*int)(nil)");
        assert_eq!(Value::Complex { re: 1.0, im: -2.0 }.to_string(), "(1-2i)");
        let map = Value::map(
            Type::String,
            Type::Int,
            vec![
                (Value::string("b"), Value::Int(2)),
                (Value::string("a"), Value::Int(1)),
            ],
        );
        assert_eq!(map.to_string(), "map[\"a\": 1, \"b\": 2]");
    }

    #[test]
    fn test_functions_compare_by_identity() {
        let f = Value::function("noop");
        let g = Value::function("noop");
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
        assert_eq!(f.kind(), Kind::Function);
    }

    #[test]
    fn test_channels_compare_by_identity() {
        let ch = Value::channel(Type::Int);
        assert_eq!(ch, ch.clone());
        assert_ne!(ch, Value::channel(Type::Int));
        assert_eq!(ch.ty(), Some(Type::channel(Type::Int)));
        assert_eq!(ch.to_string(), "<chan int>");
    }

    #[test]
    fn test_self_containing_slice_renders_and_compares() {
        let s = Value::slice(Type::Any, vec![Value::Int(1), Value::Nil]);
        s.as_slice().unwrap().set(1, s.clone()).unwrap();
        assert_eq!(s.to_string(), "[1, [...]]");
        assert!(format!("{:?}", s).contains("[1, [...]]"));

        let t = Value::slice(Type::Any, vec![Value::Int(1), Value::Nil]);
        t.as_slice().unwrap().set(1, t.clone()).unwrap();
        assert_eq!(s, t);
    }

    #[test]
    fn test_reads_while_slot_is_held() {
        let p = Value::pointer(Type::Int, Value::Int(7));
        let ptr = p.as_pointer().unwrap();
        let _held = ptr.slot().unwrap().read_recursive();
        assert_eq!(ptr.get().unwrap(), Value::Int(7));
        assert_eq!(p, Value::pointer(Type::Int, Value::Int(7)));
    }

    #[test]
    fn test_self_containing_map_renders() {
        let m = Value::map(Type::String, Type::Any, vec![]);
        m.as_map()
            .unwrap()
            .insert(Value::string("me"), m.clone())
            .unwrap();
        assert_eq!(m.to_string(), "map[\"me\": map[...]]");
    }
}

use std::fmt;
use std::sync::Arc;

/// Shape tag of a runtime value
///
/// Every [`crate::runtime::Value`] reports exactly one kind. The copier
/// dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Untyped absent value
    Nil,
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Unsigned integer
    Uint,
    /// Floating-point number
    Float,
    /// Complex number
    Complex,
    /// Immutable text
    String,
    /// Fixed-size sequence
    Array,
    /// Variable-size sequence (may be absent)
    Slice,
    /// Key/value mapping (may be absent)
    Map,
    /// Single-slot reference (may be null, may alias)
    Pointer,
    /// Named-field aggregate
    Record,
    /// Function handle
    Function,
    /// Concurrency channel
    Channel,
    /// Raw unmanaged memory address
    RawPointer,
}

impl Kind {
    /// Every kind, in declaration order
    pub const ALL: [Kind; 15] = [
        Kind::Nil,
        Kind::Bool,
        Kind::Int,
        Kind::Uint,
        Kind::Float,
        Kind::Complex,
        Kind::String,
        Kind::Array,
        Kind::Slice,
        Kind::Map,
        Kind::Pointer,
        Kind::Record,
        Kind::Function,
        Kind::Channel,
        Kind::RawPointer,
    ];

    /// Returns true for scalar kinds with no reachable structure
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            Kind::Bool | Kind::Int | Kind::Uint | Kind::Float | Kind::Complex | Kind::String
        )
    }

    /// Returns true for kinds that hold other values
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            Kind::Array | Kind::Slice | Kind::Map | Kind::Pointer | Kind::Record
        )
    }

    /// Returns the lowercase kind name
    pub fn name(self) -> &'static str {
        match self {
            Kind::Nil => "nil",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::Complex => "complex",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Slice => "slice",
            Kind::Map => "map",
            Kind::Pointer => "pointer",
            Kind::Record => "record",
            Kind::Function => "function",
            Kind::Channel => "channel",
            Kind::RawPointer => "raw-pointer",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Concrete type identity of a runtime value
///
/// Record types are nominal: `Type::Record` carries only the record name, so a
/// record may hold a pointer to its own type. The full field layout lives in
/// [`RecordType`], which every record value carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Dynamic type; elements carry their own type at runtime
    Any,
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Unsigned integer
    Uint,
    /// Floating-point number
    Float,
    /// Complex number
    Complex,
    /// Text
    String,
    /// Fixed-size sequence of `len` elements
    Array(Box<Type>, usize),
    /// Variable-size sequence
    Slice(Box<Type>),
    /// Mapping from key type to value type
    Map(Box<Type>, Box<Type>),
    /// Reference to a value of the element type
    Pointer(Box<Type>),
    /// Named record
    Record(Arc<str>),
    /// Function handle
    Function,
    /// Channel carrying the element type
    Channel(Box<Type>),
    /// Raw memory address
    RawPointer,
}

impl Type {
    /// Array type with the given element type and arity
    pub fn array(elem: Type, len: usize) -> Self {
        Type::Array(Box::new(elem), len)
    }

    /// Slice type with the given element type
    pub fn slice(elem: Type) -> Self {
        Type::Slice(Box::new(elem))
    }

    /// Map type with the given key and value types
    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    /// Pointer type with the given element type
    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    /// Record type identity by name
    pub fn record(name: impl Into<Arc<str>>) -> Self {
        Type::Record(name.into())
    }

    /// Channel type with the given element type
    pub fn channel(elem: Type) -> Self {
        Type::Channel(Box::new(elem))
    }

    /// Returns the shape tag shared by all values of this type
    ///
    /// `Type::Any` has no fixed shape and reports `Kind::Nil`.
    pub fn kind(&self) -> Kind {
        match self {
            Type::Any => Kind::Nil,
            Type::Bool => Kind::Bool,
            Type::Int => Kind::Int,
            Type::Uint => Kind::Uint,
            Type::Float => Kind::Float,
            Type::Complex => Kind::Complex,
            Type::String => Kind::String,
            Type::Array(..) => Kind::Array,
            Type::Slice(_) => Kind::Slice,
            Type::Map(..) => Kind::Map,
            Type::Pointer(_) => Kind::Pointer,
            Type::Record(_) => Kind::Record,
            Type::Function => Kind::Function,
            Type::Channel(_) => Kind::Channel,
            Type::RawPointer => Kind::RawPointer,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Uint => write!(f, "uint"),
            Type::Float => write!(f, "float"),
            Type::Complex => write!(f, "complex"),
            Type::String => write!(f, "string"),
            Type::Array(elem, len) => write!(f, "[{}]{}", len, elem),
            Type::Slice(elem) => write!(f, "[]{}", elem),
            Type::Map(key, value) => write!(f, "map[{}]{}", key, value),
            Type::Pointer(elem) => write!(f, "*{}", elem),
            Type::Record(name) => write!(f, "{}", name),
            Type::Function => write!(f, "func"),
            Type::Channel(elem) => write!(f, "chan {}", elem),
            Type::RawPointer => write!(f, "rawptr"),
        }
    }
}

/// Declaration of a single record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Declared field type
    pub ty: Type,
    /// Whether the field is visible outside the record's defining scope
    pub exported: bool,
}

impl FieldDef {
    /// Exported field
    pub fn public(name: impl Into<String>, ty: Type) -> Self {
        FieldDef {
            name: name.into(),
            ty,
            exported: true,
        }
    }

    /// Unexported field
    pub fn private(name: impl Into<String>, ty: Type) -> Self {
        FieldDef {
            name: name.into(),
            ty,
            exported: false,
        }
    }
}

/// Layout of a named record: its name and ordered field declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    name: Arc<str>,
    fields: Vec<FieldDef>,
}

impl RecordType {
    /// Creates a shared record layout
    pub fn new(name: impl Into<Arc<str>>, fields: Vec<FieldDef>) -> Arc<Self> {
        Arc::new(RecordType {
            name: name.into(),
            fields,
        })
    }

    /// Record name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type identity of values of this record
    pub fn ty(&self) -> Type {
        Type::Record(self.name.clone())
    }

    /// Field declarations in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Position of the named field
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

//! Closed schema vocabulary: recognised types, properties, the type bitset.

use std::sync::LazyLock;

/// The seven recognised schema types. A name outside this set is the
/// INVALID sentinel, represented as a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    Null,
    Bool,
    Object,
    Array,
    Number,
    Integer,
    String,
}

impl SchemaType {
    /// Lexicon order; multi-type checks and error messages follow it.
    pub const ALL: [SchemaType; 7] = [
        SchemaType::Null,
        SchemaType::Bool,
        SchemaType::Object,
        SchemaType::Array,
        SchemaType::Number,
        SchemaType::Integer,
        SchemaType::String,
    ];

    pub fn from_name(name: &str) -> Option<SchemaType> {
        match name {
            "null" => Some(SchemaType::Null),
            "boolean" => Some(SchemaType::Bool),
            "object" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            "number" => Some(SchemaType::Number),
            "integer" => Some(SchemaType::Integer),
            "string" => Some(SchemaType::String),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SchemaType::Null => "null",
            SchemaType::Bool => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::String => "string",
        }
    }

    /// Runtime predicate invoked by the generated code.
    pub fn predicate(self) -> &'static str {
        match self {
            SchemaType::Null => "is_null_type",
            SchemaType::Bool => "is_bool_type",
            SchemaType::Object => "is_object_type",
            SchemaType::Array => "is_array_type",
            SchemaType::Number => "is_number_type",
            SchemaType::Integer => "is_integer_type",
            SchemaType::String => "is_string_type",
        }
    }

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// The set of valid type names does not change; build the error-message
/// list once.
pub static VALID_TYPE_NAMES: LazyLock<String> = LazyLock::new(|| {
    SchemaType::ALL
        .iter()
        .map(|t| format!("'{}'", t.name()))
        .collect::<Vec<_>>()
        .join(", ")
});

/// Bitset over the seven schema types. The full set is the implicit default
/// when a schema node carries no `type` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeSet(u8);

impl TypeSet {
    pub fn empty() -> TypeSet {
        TypeSet(0)
    }

    pub fn full() -> TypeSet {
        TypeSet(0b0111_1111)
    }

    pub fn insert(&mut self, t: SchemaType) {
        self.0 |= t.bit();
    }

    pub fn contains(self, t: SchemaType) -> bool {
        self.0 & t.bit() != 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Members in lexicon order.
    pub fn iter(self) -> impl Iterator<Item = SchemaType> {
        SchemaType::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

/// Recognised schema properties. `$ref` is handled specially via [`REF_KEY`];
/// unrecognised map keys are silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Type,
    Properties,
    Required,
    Items,
    MinItems,
    MaxItems,
    OneOf,
    AnyOf,
    Enum,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::Type => "type",
            Property::Properties => "properties",
            Property::Required => "required",
            Property::Items => "items",
            Property::MinItems => "minItems",
            Property::MaxItems => "maxItems",
            Property::OneOf => "oneOf",
            Property::AnyOf => "anyOf",
            Property::Enum => "enum",
        }
    }
}

pub const REF_KEY: &str = "$ref";

/// Sub-properties that only apply when the node can be an object / an array.
pub const OBJECT_PROPS: [Property; 2] = [Property::Properties, Property::Required];
pub const ARRAY_PROPS: [Property; 3] = [Property::Items, Property::MinItems, Property::MaxItems];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_round_trips() {
        for t in SchemaType::ALL {
            assert_eq!(SchemaType::from_name(t.name()), Some(t));
        }
        assert_eq!(SchemaType::from_name("decimal"), None);
        assert_eq!(SchemaType::from_name("Boolean"), None);
    }

    #[test]
    fn set_operations() {
        let mut set = TypeSet::empty();
        assert_eq!(set.count(), 0);
        set.insert(SchemaType::String);
        set.insert(SchemaType::Integer);
        assert!(set.contains(SchemaType::String));
        assert!(!set.contains(SchemaType::Object));
        assert_eq!(set.count(), 2);
        // lexicon order, not insertion order
        let members: Vec<SchemaType> = set.iter().collect();
        assert_eq!(members, [SchemaType::Integer, SchemaType::String]);
        assert_eq!(TypeSet::full().count(), 7);
    }

    #[test]
    fn valid_name_list_is_complete() {
        assert_eq!(
            &*VALID_TYPE_NAMES,
            "'null', 'boolean', 'object', 'array', 'number', 'integer', 'string'"
        );
    }
}

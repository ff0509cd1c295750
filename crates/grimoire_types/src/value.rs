//! Runtime values flowing through script expressions
//!
//! Every expression node resolves to a [`Value`]. Values are grouped into
//! authoring-time [`Category`]s; the interpreter itself is dynamically
//! typed, so each category also defines the zero value substituted when a
//! lookup fails or a variable has never been written.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────────────────────────

/// Authoring-time category of a node or value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Category {
    /// 64-bit floating point number
    Number,
    /// Boolean value
    Bool,
    /// UTF-8 string
    Text,
    /// 3D vector
    Vector,
    /// Reference to a game entity
    Entity,
    /// Reference to an ability
    Ability,
    /// Reference to an item
    Item,
    /// Ordered collection of entity references
    Group,
}

// ─────────────────────────────────────────────────────────────────────────────
// Opaque References
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! ref_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl $name {
            /// Sentinel meaning "no object"
            pub const NONE: $name = $name(0);

            /// Check whether this reference points at nothing
            pub fn is_none(&self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

ref_id!(
    /// Opaque handle to a game entity (unit, hero, world object)
    EntityId
);
ref_id!(
    /// Opaque handle to an ability definition or instance
    AbilityId
);
ref_id!(
    /// Opaque handle to an item definition or instance
    ItemId
);

// ─────────────────────────────────────────────────────────────────────────────
// Vectors
// ─────────────────────────────────────────────────────────────────────────────

/// 3D position/direction vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// Tagged-union runtime value
///
/// One variant per [`Category`]. Host functions receive and return these;
/// the variable scopes store them by name, last-writer-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    Vector(Vec3),
    Entity(EntityId),
    Ability(AbilityId),
    Item(ItemId),
    Group(Vec<EntityId>),
}

impl Value {
    /// The category-appropriate zero value
    pub fn zero(category: Category) -> Self {
        match category {
            Category::Number => Value::Number(0.0),
            Category::Bool => Value::Bool(false),
            Category::Text => Value::Text(String::new()),
            Category::Vector => Value::Vector(Vec3::ZERO),
            Category::Entity => Value::Entity(EntityId::NONE),
            Category::Ability => Value::Ability(AbilityId::NONE),
            Category::Item => Value::Item(ItemId::NONE),
            Category::Group => Value::Group(Vec::new()),
        }
    }

    /// The category this value inhabits
    pub fn category(&self) -> Category {
        match self {
            Value::Number(_) => Category::Number,
            Value::Bool(_) => Category::Bool,
            Value::Text(_) => Category::Text,
            Value::Vector(_) => Category::Vector,
            Value::Entity(_) => Category::Entity,
            Value::Ability(_) => Category::Ability,
            Value::Item(_) => Category::Item,
            Value::Group(_) => Category::Group,
        }
    }

    /// True for the none-sentinel of any reference category
    ///
    /// Group walks skip these, and host functions use it to detect a
    /// required argument that resolved to "no object".
    pub fn is_no_object(&self) -> bool {
        match self {
            Value::Entity(id) => id.is_none(),
            Value::Ability(id) => id.is_none(),
            Value::Item(id) => id.is_none(),
            _ => false,
        }
    }

    /// Get as f64
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as string reference
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as vector
    pub fn as_vector(&self) -> Option<Vec3> {
        match self {
            Value::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as entity reference
    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::Entity(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as ability reference
    pub fn as_ability(&self) -> Option<AbilityId> {
        match self {
            Value::Ability(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as item reference
    pub fn as_item(&self) -> Option<ItemId> {
        match self {
            Value::Item(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as group slice
    pub fn as_group(&self) -> Option<&[EntityId]> {
        match self {
            Value::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Short lowercase name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Vector(_) => "vector",
            Value::Entity(_) => "entity",
            Value::Ability(_) => "ability",
            Value::Item(_) => "item",
            Value::Group(_) => "group",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// From Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Value::Vector(v)
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Value::Entity(v)
    }
}

impl From<AbilityId> for Value {
    fn from(v: AbilityId) -> Self {
        Value::Ability(v)
    }
}

impl From<ItemId> for Value {
    fn from(v: ItemId) -> Self {
        Value::Item(v)
    }
}

impl From<Vec<EntityId>> for Value {
    fn from(v: Vec<EntityId>) -> Self {
        Value::Group(v)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

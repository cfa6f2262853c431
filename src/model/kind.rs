//! Closed registry of entity kinds
//!
//! Every kind the store knows is declared here, together with the
//! attribute schema and parent/child links that drive the relational
//! tables and relationship resolution. Type tags outside this registry
//! are rejected rather than guessed at.

use std::fmt;

/// Entity kinds of the lodging domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    State,
    User,
    Amenity,
    City,
    Place,
    Review,
}

/// Declared scalar type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Text,
    Integer,
    Real,
}

impl AttrType {
    /// SQLite column type name
    pub fn sql_type(&self) -> &'static str {
        match self {
            AttrType::Text => "TEXT",
            AttrType::Integer => "INTEGER",
            AttrType::Real => "REAL",
        }
    }
}

/// One declared attribute of a kind.
///
/// The name doubles as the relational column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Attribute name
    pub name: &'static str,
    /// Declared scalar type
    pub ty: AttrType,
    /// Parent kind this field references, if it is a foreign key
    pub references: Option<EntityKind>,
}

/// One-to-many link from a parent kind to a child kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildLink {
    /// Child kind
    pub child: EntityKind,
    /// Attribute on the child naming the parent's identifier
    pub foreign_key: &'static str,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        ty: AttrType::Text,
        references: None,
    }
}

const fn integer(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        ty: AttrType::Integer,
        references: None,
    }
}

const fn real(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        ty: AttrType::Real,
        references: None,
    }
}

const fn fk(name: &'static str, parent: EntityKind) -> FieldSpec {
    FieldSpec {
        name,
        ty: AttrType::Text,
        references: Some(parent),
    }
}

static USER_FIELDS: [FieldSpec; 4] = [
    text("email"),
    text("password"),
    text("first_name"),
    text("last_name"),
];

static STATE_FIELDS: [FieldSpec; 1] = [text("name")];

static CITY_FIELDS: [FieldSpec; 2] = [fk("state_id", EntityKind::State), text("name")];

static AMENITY_FIELDS: [FieldSpec; 1] = [text("name")];

static PLACE_FIELDS: [FieldSpec; 10] = [
    fk("city_id", EntityKind::City),
    fk("user_id", EntityKind::User),
    text("name"),
    text("description"),
    integer("number_rooms"),
    integer("number_bathrooms"),
    integer("max_guest"),
    integer("price_by_night"),
    real("latitude"),
    real("longitude"),
];

static REVIEW_FIELDS: [FieldSpec; 3] = [
    fk("place_id", EntityKind::Place),
    fk("user_id", EntityKind::User),
    text("text"),
];

static STATE_CHILDREN: [ChildLink; 1] = [ChildLink {
    child: EntityKind::City,
    foreign_key: "state_id",
}];

static USER_CHILDREN: [ChildLink; 2] = [
    ChildLink {
        child: EntityKind::Place,
        foreign_key: "user_id",
    },
    ChildLink {
        child: EntityKind::Review,
        foreign_key: "user_id",
    },
];

static CITY_CHILDREN: [ChildLink; 1] = [ChildLink {
    child: EntityKind::Place,
    foreign_key: "city_id",
}];

static PLACE_CHILDREN: [ChildLink; 1] = [ChildLink {
    child: EntityKind::Review,
    foreign_key: "place_id",
}];

impl EntityKind {
    /// Every known kind, parents before children.
    ///
    /// Relational writes insert in this order so foreign keys always
    /// reference rows that already exist.
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::State,
            EntityKind::User,
            EntityKind::Amenity,
            EntityKind::City,
            EntityKind::Place,
            EntityKind::Review,
        ]
    }

    /// Resolve a type tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<EntityKind> {
        match tag {
            "State" => Some(EntityKind::State),
            "User" => Some(EntityKind::User),
            "Amenity" => Some(EntityKind::Amenity),
            "City" => Some(EntityKind::City),
            "Place" => Some(EntityKind::Place),
            "Review" => Some(EntityKind::Review),
            _ => None,
        }
    }

    /// Type tag used in persisted documents and composite keys
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::State => "State",
            EntityKind::User => "User",
            EntityKind::Amenity => "Amenity",
            EntityKind::City => "City",
            EntityKind::Place => "Place",
            EntityKind::Review => "Review",
        }
    }

    /// Relational table name
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::State => "states",
            EntityKind::User => "users",
            EntityKind::Amenity => "amenities",
            EntityKind::City => "cities",
            EntityKind::Place => "places",
            EntityKind::Review => "reviews",
        }
    }

    /// Declared attributes of this kind
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            EntityKind::State => &STATE_FIELDS,
            EntityKind::User => &USER_FIELDS,
            EntityKind::Amenity => &AMENITY_FIELDS,
            EntityKind::City => &CITY_FIELDS,
            EntityKind::Place => &PLACE_FIELDS,
            EntityKind::Review => &REVIEW_FIELDS,
        }
    }

    /// One-to-many links from this kind to its child kinds
    pub fn children(&self) -> &'static [ChildLink] {
        match self {
            EntityKind::State => &STATE_CHILDREN,
            EntityKind::User => &USER_CHILDREN,
            EntityKind::Amenity => &[],
            EntityKind::City => &CITY_CHILDREN,
            EntityKind::Place => &PLACE_CHILDREN,
            EntityKind::Review => &[],
        }
    }

    /// Link to a specific child kind, if one is declared
    pub fn child_link(&self, child: EntityKind) -> Option<&'static ChildLink> {
        self.children().iter().find(|link| link.child == child)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Persistence metamodel consulted by the semantic validator.
//!
//! The validator never inspects entity classes directly. Everything it needs
//! to know about entities, embeddables, their mapped fields and named types
//! (enums in particular) comes through the [`Metamodel`] trait.
//! [`InMemoryMetamodel`] is a builder-style implementation suitable for tests,
//! tooling and callers that describe their model in code.

use smol_str::SmolStr;

/// How a field is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Id,
    Basic,
    Version,
    Embedded,
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
    ElementCollection,
    Transient,
}

impl MappingKind {
    /// Mappings whose value is a collection.
    pub fn is_collection(self) -> bool {
        matches!(
            self,
            MappingKind::OneToMany | MappingKind::ManyToMany | MappingKind::ElementCollection
        )
    }

    /// Mappings that reference another entity.
    pub fn is_relationship(self) -> bool {
        matches!(
            self,
            MappingKind::OneToOne
                | MappingKind::ManyToOne
                | MappingKind::OneToMany
                | MappingKind::ManyToMany
        )
    }

    pub fn is_embedded(self) -> bool {
        self == MappingKind::Embedded
    }

    pub fn is_transient(self) -> bool {
        self == MappingKind::Transient
    }
}

/// A mapped field of a managed type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Field name as written in queries.
    pub name: SmolStr,

    pub kind: MappingKind,

    /// Fully qualified type of the field. For collection mappings this is the
    /// element type.
    pub type_name: SmolStr,
}

impl Mapping {
    pub fn new(name: impl Into<SmolStr>, kind: MappingKind, type_name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind,
            type_name: type_name.into(),
        }
    }

    pub fn is_collection(&self) -> bool {
        self.kind.is_collection()
    }

    pub fn is_relationship(&self) -> bool {
        self.kind.is_relationship()
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// An entity or an embeddable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedType {
    /// Entity name used in FROM clauses. Embeddables use their type name.
    pub name: SmolStr,

    /// Fully qualified class name.
    pub type_name: SmolStr,

    pub is_entity: bool,

    pub mappings: Vec<Mapping>,
}

impl ManagedType {
    /// Starts an entity description.
    pub fn entity(name: impl Into<SmolStr>, type_name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            is_entity: true,
            mappings: Vec::new(),
        }
    }

    /// Starts an embeddable description.
    pub fn embeddable(type_name: impl Into<SmolStr>) -> Self {
        let type_name = type_name.into();
        Self {
            name: type_name.clone(),
            type_name,
            is_entity: false,
            mappings: Vec::new(),
        }
    }

    /// Adds a mapped field.
    pub fn with_mapping(
        mut self,
        name: impl Into<SmolStr>,
        kind: MappingKind,
        type_name: impl Into<SmolStr>,
    ) -> Self {
        self.mappings.push(Mapping::new(name, kind, type_name));
        self
    }

    /// Adds a `Basic` field.
    pub fn with_basic(self, name: impl Into<SmolStr>, type_name: impl Into<SmolStr>) -> Self {
        self.with_mapping(name, MappingKind::Basic, type_name)
    }

    /// Looks up a field by its exact name.
    pub fn mapping_named(&self, field: &str) -> Option<&Mapping> {
        self.mappings.iter().find(|mapping| mapping.name == field)
    }
}

/// What kind of type a [`TypeInfo`] describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Basic,
    Managed,
    /// An enum and its constants in declaration order.
    Enum(Vec<SmolStr>),
}

/// A named type known to the metamodel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Fully qualified name.
    pub name: SmolStr,
    pub kind: TypeKind,
}

impl TypeInfo {
    pub fn basic(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Basic,
        }
    }

    pub fn enumeration<I, S>(name: impl Into<SmolStr>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            name: name.into(),
            kind: TypeKind::Enum(constants.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum(_))
    }

    /// The enum's constants; empty for every other kind.
    pub fn enum_constants(&self) -> &[SmolStr] {
        match &self.kind {
            TypeKind::Enum(constants) => constants,
            _ => &[],
        }
    }
}

/// Source of entity, mapping and type information.
///
/// Lookups return `None` when something is unknown; the validator turns that
/// into a problem rather than an error.
///
/// # Example
///
/// ```ignore
/// use jpql_parser::semantic::{ManagedType, Metamodel, TypeInfo};
///
/// struct Registry {
///     entities: Vec<ManagedType>,
///     types: Vec<TypeInfo>,
/// }
///
/// impl Metamodel for Registry {
///     fn entity_named(&self, name: &str) -> Option<&ManagedType> {
///         self.entities.iter().find(|e| e.is_entity && e.name == name)
///     }
///
///     fn managed_type_for(&self, type_name: &str) -> Option<&ManagedType> {
///         self.entities.iter().find(|e| e.type_name == type_name)
///     }
///
///     fn type_named(&self, type_name: &str) -> Option<&TypeInfo> {
///         self.types.iter().find(|t| t.name == type_name)
///     }
/// }
/// ```
pub trait Metamodel {
    /// Finds an entity by the name used in FROM clauses.
    fn entity_named(&self, name: &str) -> Option<&ManagedType>;

    /// Finds an entity or embeddable by its fully qualified class name.
    fn managed_type_for(&self, type_name: &str) -> Option<&ManagedType>;

    /// Finds a mapped field of `managed`.
    fn mapping_named<'m>(&'m self, managed: &'m ManagedType, field: &str) -> Option<&'m Mapping> {
        managed.mapping_named(field)
    }

    /// Finds any named type: basic, managed or enum.
    fn type_named(&self, type_name: &str) -> Option<&TypeInfo>;
}

/// Java types every metamodel resolves without registration.
const BASIC_TYPES: &[&str] = &[
    "boolean",
    "byte",
    "char",
    "short",
    "int",
    "long",
    "float",
    "double",
    "java.lang.Boolean",
    "java.lang.Byte",
    "java.lang.Character",
    "java.lang.Short",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Float",
    "java.lang.Double",
    "java.lang.String",
    "java.math.BigDecimal",
    "java.math.BigInteger",
    "java.util.Date",
    "java.util.Calendar",
    "java.sql.Date",
    "java.sql.Time",
    "java.sql.Timestamp",
    "java.time.LocalDate",
    "java.time.LocalTime",
    "java.time.LocalDateTime",
    "java.time.OffsetDateTime",
];

/// A metamodel described in code.
///
/// Registering a managed type also registers its class name as a
/// [`TypeKind::Managed`] type, so the type lookup sees it.
#[derive(Debug, Clone)]
pub struct InMemoryMetamodel {
    managed_types: Vec<ManagedType>,
    types: Vec<TypeInfo>,
}

impl Default for InMemoryMetamodel {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMetamodel {
    /// Creates a metamodel that knows only the common Java basic types.
    pub fn new() -> Self {
        Self {
            managed_types: Vec::new(),
            types: BASIC_TYPES.iter().map(|name| TypeInfo::basic(*name)).collect(),
        }
    }

    /// Registers an entity or embeddable.
    pub fn with_managed_type(mut self, managed: ManagedType) -> Self {
        self.types.push(TypeInfo {
            name: managed.type_name.clone(),
            kind: TypeKind::Managed,
        });
        self.managed_types.push(managed);
        self
    }

    /// Registers an enum with its constants.
    pub fn with_enum<I, S>(mut self, type_name: impl Into<SmolStr>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.types.push(TypeInfo::enumeration(type_name, constants));
        self
    }

    /// Registers an extra basic type.
    pub fn with_basic_type(mut self, type_name: impl Into<SmolStr>) -> Self {
        self.types.push(TypeInfo::basic(type_name));
        self
    }

    pub fn entities(&self) -> impl Iterator<Item = &ManagedType> {
        self.managed_types.iter().filter(|managed| managed.is_entity)
    }
}

impl Metamodel for InMemoryMetamodel {
    fn entity_named(&self, name: &str) -> Option<&ManagedType> {
        self.entities().find(|managed| managed.name == name)
    }

    fn managed_type_for(&self, type_name: &str) -> Option<&ManagedType> {
        self.managed_types
            .iter()
            .find(|managed| managed.type_name == type_name)
    }

    fn type_named(&self, type_name: &str) -> Option<&TypeInfo> {
        self.types.iter().find(|info| info.name == type_name)
    }
}

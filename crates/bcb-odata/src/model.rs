//! Typed in-memory representation of an OData schema.
//!
//! Everything here is immutable once built by the metadata parser. Entity
//! sets and function imports share their entities and functions through
//! [`Arc`], so handing a [`QueryTarget`] to a query is cheap.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::edm::{EdmType, FriendlyType, Literal};

/// A declared property of an entity type.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    name: String,
    edm_type: EdmType,
}

impl Property {
    /// Creates a property with the given name and declared type.
    pub fn new(name: impl Into<String>, edm_type: EdmType) -> Self {
        Self {
            name: name.into(),
            edm_type,
        }
    }

    /// Property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared OData type.
    #[must_use]
    pub const fn edm_type(&self) -> &EdmType {
        &self.edm_type
    }

    /// Friendly type label.
    #[must_use]
    pub fn friendly_type(&self) -> FriendlyType {
        self.edm_type.friendly()
    }

    /// Builds `<name> eq <value>`.
    pub fn equals(&self, value: impl Into<Literal>) -> Filter {
        Filter::new(self.clone(), Operator::Eq, value.into())
    }

    /// Builds `<name> gt <value>`.
    pub fn greater_than(&self, value: impl Into<Literal>) -> Filter {
        Filter::new(self.clone(), Operator::Gt, value.into())
    }

    /// Builds `<name> ge <value>`.
    pub fn greater_or_equal(&self, value: impl Into<Literal>) -> Filter {
        Filter::new(self.clone(), Operator::Ge, value.into())
    }

    /// Builds `<name> lt <value>`.
    pub fn less_than(&self, value: impl Into<Literal>) -> Filter {
        Filter::new(self.clone(), Operator::Lt, value.into())
    }

    /// Builds `<name> le <value>`.
    pub fn less_or_equal(&self, value: impl Into<Literal>) -> Filter {
        Filter::new(self.clone(), Operator::Le, value.into())
    }

    /// Ascending sort on this property.
    #[must_use]
    pub fn asc(&self) -> OrderBy {
        OrderBy::new(self.clone(), Direction::Asc)
    }

    /// Descending sort on this property.
    #[must_use]
    pub fn desc(&self) -> OrderBy {
        OrderBy::new(self.clone(), Direction::Desc)
    }

    /// `name<type>` signature used in descriptions.
    pub(crate) fn signature(&self) -> String {
        format!("{}<{}>", self.name, self.friendly_type())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Property {}>", self.signature())
    }
}

/// Comparison operator of a [`Filter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `eq`
    Eq,
    /// `gt`
    Gt,
    /// `ge`
    Ge,
    /// `lt`
    Lt,
    /// `le`
    Le,
}

impl Operator {
    /// OData keyword for the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }
}

/// A single `$filter` comparison bound to a property.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    property: Property,
    operator: Operator,
    operand: Literal,
}

impl Filter {
    /// Creates a filter. Usually built through the [`Property`] methods.
    #[must_use]
    pub const fn new(property: Property, operator: Operator, operand: Literal) -> Self {
        Self {
            property,
            operator,
            operand,
        }
    }

    /// Filtered property.
    #[must_use]
    pub const fn property(&self) -> &Property {
        &self.property
    }

    /// Comparison operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Right-hand operand.
    #[must_use]
    pub const fn operand(&self) -> &Literal {
        &self.operand
    }

    /// Renders the clause, formatting the operand by the property's type.
    #[must_use]
    pub fn statement(&self) -> String {
        let value = match self.property.edm_type() {
            EdmType::Decimal => self.operand.to_decimal_literal(),
            EdmType::Int32 => self.operand.to_int_literal(),
            EdmType::String => self.operand.to_quoted_literal(),
            EdmType::Date => self.operand.to_date_literal(),
            _ => self.operand.to_quoted_literal(),
        };
        format!("{} {} {value}", self.property.name(), self.operator.as_str())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.statement())
    }
}

/// Sort direction of an [`OrderBy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// OData keyword for the direction.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A single `$orderby` item.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    property: Property,
    direction: Direction,
}

impl OrderBy {
    /// Creates an order specification.
    #[must_use]
    pub const fn new(property: Property, direction: Direction) -> Self {
        Self {
            property,
            direction,
        }
    }

    /// Sorted property.
    #[must_use]
    pub const fn property(&self) -> &Property {
        &self.property
    }

    /// Sort direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property.name(), self.direction.as_str())
    }
}

/// An entity type with its properties in declaration order.
#[derive(Clone, Debug)]
pub struct Entity {
    name: String,
    full_name: String,
    properties: IndexMap<String, Property>,
}

impl Entity {
    /// Creates an entity in `namespace`. Duplicate property names keep the
    /// first declaration position and the last declared type.
    pub fn new(
        name: impl Into<String>,
        namespace: &str,
        properties: impl IntoIterator<Item = Property>,
    ) -> Self {
        let name = name.into();
        Self {
            full_name: format!("{namespace}.{name}"),
            name,
            properties: properties
                .into_iter()
                .map(|p| (p.name().to_string(), p))
                .collect(),
        }
    }

    /// Entity type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Properties in schema order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Property names in schema order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    fn signature(&self) -> String {
        self.properties()
            .map(Property::signature)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A queryable collection of one entity type.
#[derive(Clone, Debug)]
pub struct EntitySet {
    name: String,
    full_name: String,
    entity_type: String,
    entity: Arc<Entity>,
}

impl EntitySet {
    /// Binds an entity set to its entity.
    pub fn new(name: impl Into<String>, namespace: &str, entity: Arc<Entity>) -> Self {
        let name = name.into();
        Self {
            full_name: format!("{namespace}.{name}"),
            entity_type: entity.full_name().to_string(),
            name,
            entity,
        }
    }

    /// Entity set name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Full name of the backing entity type.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Backing entity.
    #[must_use]
    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    /// Human readable signature.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "EntitySet (Endpoint): {}\nEntityType: {}\nProperties: {}",
            self.name,
            self.entity_type,
            self.entity.signature()
        )
    }
}

/// A declared parameter of a function.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    edm_type: EdmType,
    required: bool,
}

impl Parameter {
    /// Creates a parameter.
    pub fn new(name: impl Into<String>, edm_type: EdmType, required: bool) -> Self {
        Self {
            name: name.into(),
            edm_type,
            required,
        }
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared OData type.
    #[must_use]
    pub const fn edm_type(&self) -> &EdmType {
        &self.edm_type
    }

    /// Friendly type label.
    #[must_use]
    pub fn friendly_type(&self) -> FriendlyType {
        self.edm_type.friendly()
    }

    /// Whether a value must be bound before execution.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Renders a value for the `@name` query parameter.
    #[must_use]
    pub fn format(&self, value: &Literal) -> String {
        match self.edm_type {
            EdmType::Decimal => value.to_decimal_literal(),
            EdmType::Int32 => value.to_int_literal(),
            _ => value.to_quoted_literal(),
        }
    }
}

/// A schema function with ordered parameters.
#[derive(Clone, Debug)]
pub struct Function {
    name: String,
    full_name: String,
    parameters: Vec<Parameter>,
    return_type: Option<String>,
}

impl Function {
    /// Creates a function in `namespace`.
    pub fn new(
        name: impl Into<String>,
        namespace: &str,
        parameters: Vec<Parameter>,
        return_type: Option<String>,
    ) -> Self {
        let name = name.into();
        Self {
            full_name: format!("{namespace}.{name}"),
            name,
            parameters,
            return_type,
        }
    }

    /// Function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Declared return type, e.g. `Collection(NS.Type)`.
    #[must_use]
    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }
}

/// A function exposed by the entity container.
#[derive(Clone, Debug)]
pub struct FunctionImport {
    name: String,
    function: Arc<Function>,
    entity_set: Arc<EntitySet>,
}

impl FunctionImport {
    /// Binds a function import to its function and return-shape entity set.
    pub fn new(
        name: impl Into<String>,
        function: Arc<Function>,
        entity_set: Arc<EntitySet>,
    ) -> Self {
        Self {
            name: name.into(),
            function,
            entity_set,
        }
    }

    /// Function import name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound function.
    #[must_use]
    pub fn function(&self) -> &Arc<Function> {
        &self.function
    }

    /// Entity set describing the returned rows.
    #[must_use]
    pub fn entity_set(&self) -> &Arc<EntitySet> {
        &self.entity_set
    }

    /// Human readable signature.
    #[must_use]
    pub fn describe(&self) -> String {
        let params = self
            .function
            .parameters()
            .iter()
            .map(|p| format!("{} <{}>", p.name(), p.friendly_type()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Function: {}\nParameters: {params}\nEntitySet: {}\nEntityType: {}\nProperties: {}",
            self.function.name(),
            self.entity_set.name(),
            self.entity_set.entity_type(),
            self.entity_set.entity().signature()
        )
    }
}

/// The two kinds of queryable endpoints.
#[derive(Clone, Debug)]
pub enum QueryTarget {
    /// A plain entity set.
    EntitySet(Arc<EntitySet>),
    /// A function import, called with bound parameters.
    FunctionImport(Arc<FunctionImport>),
}

impl QueryTarget {
    /// Endpoint name used in the request path.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::EntitySet(es) => es.name(),
            Self::FunctionImport(fi) => fi.name(),
        }
    }

    /// Entity describing the returned rows.
    #[must_use]
    pub fn entity(&self) -> &Arc<Entity> {
        match self {
            Self::EntitySet(es) => es.entity(),
            Self::FunctionImport(fi) => fi.entity_set().entity(),
        }
    }

    /// Bound function for function imports.
    #[must_use]
    pub fn function(&self) -> Option<&Arc<Function>> {
        match self {
            Self::EntitySet(_) => None,
            Self::FunctionImport(fi) => Some(fi.function()),
        }
    }

    /// Returns true for function imports.
    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self, Self::FunctionImport(_))
    }

    /// Human readable signature.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::EntitySet(es) => es.describe(),
            Self::FunctionImport(fi) => fi.describe(),
        }
    }
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntitySet(es) => write!(f, "<EntitySet {}>", es.name()),
            Self::FunctionImport(fi) => write!(f, "<FunctionImport {}>", fi.name()),
        }
    }
}

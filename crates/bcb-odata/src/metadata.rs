//! `$metadata` document parsing.
//!
//! The EDMX document is first deserialized into raw element structs with
//! `quick-xml`, then resolved into the shared [`model`](crate::model) types.
//! Resolution is all-or-nothing: the first dangling reference aborts the
//! parse with [`BcbError::Schema`].

use bcb_core::{BcbError, Result, Transport};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::edm::EdmType;
use crate::model::{Entity, EntitySet, Function, FunctionImport, Parameter, Property};

#[derive(Debug, Deserialize)]
struct EdmxDocument {
    #[serde(rename = "DataServices")]
    data_services: DataServicesElement,
}

#[derive(Debug, Deserialize)]
struct DataServicesElement {
    #[serde(rename = "Schema", default)]
    schemas: Vec<SchemaElement>,
}

#[derive(Debug, Deserialize)]
struct SchemaElement {
    #[serde(rename = "@Namespace")]
    namespace: Option<String>,
    #[serde(rename = "EntityType", default)]
    entity_types: Vec<EntityTypeElement>,
    #[serde(rename = "Function", default)]
    functions: Vec<FunctionElement>,
    #[serde(rename = "EntityContainer")]
    container: Option<EntityContainerElement>,
}

#[derive(Debug, Deserialize)]
struct EntityTypeElement {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "Property", default)]
    properties: Vec<TypedElement>,
}

/// `<Property>` and `<Parameter>` share the same attributes.
#[derive(Debug, Deserialize)]
struct TypedElement {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@Type")]
    r#type: String,
    #[serde(rename = "@Nullable")]
    nullable: Option<String>,
}

impl TypedElement {
    fn required(&self) -> bool {
        self.nullable.as_deref().is_none_or(|v| v == "false")
    }
}

#[derive(Debug, Deserialize)]
struct FunctionElement {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "Parameter", default)]
    parameters: Vec<TypedElement>,
    #[serde(rename = "ReturnType")]
    return_type: Option<ReturnTypeElement>,
}

#[derive(Debug, Deserialize)]
struct ReturnTypeElement {
    #[serde(rename = "@Type")]
    r#type: String,
}

#[derive(Debug, Default, Deserialize)]
struct EntityContainerElement {
    #[serde(rename = "EntitySet", default)]
    entity_sets: Vec<EntitySetElement>,
    #[serde(rename = "FunctionImport", default)]
    function_imports: Vec<FunctionImportElement>,
}

#[derive(Debug, Deserialize)]
struct EntitySetElement {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@EntityType")]
    entity_type: String,
}

#[derive(Debug, Deserialize)]
struct FunctionImportElement {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@Function")]
    function: String,
    #[serde(rename = "@EntitySet")]
    entity_set: Option<String>,
}

/// A parsed OData schema.
#[derive(Clone, Debug)]
pub struct Metadata {
    namespace: String,
    /// Keyed by full name.
    entities: IndexMap<String, Arc<Entity>>,
    entity_sets: IndexMap<String, Arc<EntitySet>>,
    functions: IndexMap<String, Arc<Function>>,
    function_imports: IndexMap<String, Arc<FunctionImport>>,
    /// Full names of entity sets used as a function import's return shape.
    consumed: IndexSet<String>,
}

impl Metadata {
    /// Fetches and parses a `$metadata` document.
    #[instrument(skip(transport))]
    pub async fn fetch(url: &str, transport: &dyn Transport) -> Result<Self> {
        debug!("Fetching OData metadata");
        let body = transport.get_text(url, &[]).await?;
        Self::parse(&body)
    }

    /// Parses a `$metadata` document.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc: EdmxDocument = quick_xml::de::from_str(xml)
            .map_err(|e| BcbError::Schema(format!("malformed metadata document: {e}")))?;

        let mut schemas = doc.data_services.schemas;
        if schemas.len() != 1 {
            return Err(BcbError::Schema(format!(
                "expected exactly one Schema element, found {}",
                schemas.len()
            )));
        }
        let schema = schemas.remove(0);
        let namespace = schema
            .namespace
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| BcbError::Schema("Schema element has no Namespace".to_string()))?;
        let container = schema.container.unwrap_or_default();

        let entities: IndexMap<String, Arc<Entity>> = schema
            .entity_types
            .into_iter()
            .map(|e| {
                let properties = e
                    .properties
                    .into_iter()
                    .map(|p| Property::new(p.name, EdmType::parse(&p.r#type)));
                let entity = Entity::new(e.name, &namespace, properties);
                (entity.full_name().to_string(), Arc::new(entity))
            })
            .collect();

        let mut entity_sets = IndexMap::with_capacity(container.entity_sets.len());
        for element in container.entity_sets {
            let entity = entities.get(&element.entity_type).ok_or_else(|| {
                BcbError::Schema(format!(
                    "entity set {} references unknown entity type {}",
                    element.name, element.entity_type
                ))
            })?;
            let set = EntitySet::new(element.name, &namespace, Arc::clone(entity));
            entity_sets.insert(set.name().to_string(), Arc::new(set));
        }

        let functions: IndexMap<String, Arc<Function>> = schema
            .functions
            .into_iter()
            .map(|f| {
                let parameters = f
                    .parameters
                    .iter()
                    .map(|p| Parameter::new(&p.name, EdmType::parse(&p.r#type), p.required()))
                    .collect();
                let function =
                    Function::new(f.name, &namespace, parameters, f.return_type.map(|r| r.r#type));
                (function.name().to_string(), Arc::new(function))
            })
            .collect();

        let mut function_imports = IndexMap::with_capacity(container.function_imports.len());
        let mut consumed = IndexSet::new();
        for element in container.function_imports {
            let function = functions
                .values()
                .find(|f| f.full_name() == element.function)
                .ok_or_else(|| {
                    BcbError::Schema(format!(
                        "function import {} references unknown function {}",
                        element.name, element.function
                    ))
                })?;
            let set_name = element.entity_set.ok_or_else(|| {
                BcbError::Schema(format!("function import {} has no EntitySet", element.name))
            })?;
            let entity_set = resolve_entity_set(&entity_sets, &set_name).ok_or_else(|| {
                BcbError::Schema(format!(
                    "function import {} references unknown entity set {set_name}",
                    element.name
                ))
            })?;
            if let Some(returns) = function.return_type() {
                let returned = returns
                    .strip_prefix("Collection(")
                    .and_then(|t| t.strip_suffix(')'))
                    .unwrap_or(returns);
                if returned != entity_set.entity_type() {
                    warn!(
                        function_import = %element.name,
                        returned,
                        entity_type = entity_set.entity_type(),
                        "Function return type differs from its entity set"
                    );
                }
            }
            consumed.insert(entity_set.full_name().to_string());
            let import = FunctionImport::new(element.name, Arc::clone(function), Arc::clone(entity_set));
            function_imports.insert(import.name().to_string(), Arc::new(import));
        }

        debug!(
            namespace = %namespace,
            entities = entities.len(),
            entity_sets = entity_sets.len(),
            functions = functions.len(),
            function_imports = function_imports.len(),
            "Parsed OData metadata"
        );

        Ok(Self {
            namespace,
            entities,
            entity_sets,
            functions,
            function_imports,
            consumed,
        })
    }

    /// Schema namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Entities in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.entities.values()
    }

    /// Looks up an entity by full name.
    #[must_use]
    pub fn entity(&self, full_name: &str) -> Option<&Arc<Entity>> {
        self.entities.get(full_name)
    }

    /// Entity sets in declaration order.
    pub fn entity_sets(&self) -> impl Iterator<Item = &Arc<EntitySet>> {
        self.entity_sets.values()
    }

    /// Looks up an entity set by name.
    #[must_use]
    pub fn entity_set(&self, name: &str) -> Option<&Arc<EntitySet>> {
        self.entity_sets.get(name)
    }

    /// Functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &Arc<Function>> {
        self.functions.values()
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions.get(name)
    }

    /// Function imports in declaration order.
    pub fn function_imports(&self) -> impl Iterator<Item = &Arc<FunctionImport>> {
        self.function_imports.values()
    }

    /// Looks up a function import by name.
    #[must_use]
    pub fn function_import(&self, name: &str) -> Option<&Arc<FunctionImport>> {
        self.function_imports.get(name)
    }

    /// Returns true when the entity set only models a function import's
    /// return shape.
    #[must_use]
    pub fn is_consumed(&self, entity_set: &EntitySet) -> bool {
        self.consumed.contains(entity_set.full_name())
    }

    /// Entity sets that are listable endpoints in their own right.
    pub fn primary_entity_sets(&self) -> impl Iterator<Item = &Arc<EntitySet>> {
        self.entity_sets().filter(|es| !self.is_consumed(es))
    }
}

/// Function imports usually reference the set by qualified name, but a bare
/// name is valid OData as well.
fn resolve_entity_set<'a>(
    entity_sets: &'a IndexMap<String, Arc<EntitySet>>,
    name: &str,
) -> Option<&'a Arc<EntitySet>> {
    entity_sets
        .values()
        .find(|es| es.full_name() == name)
        .or_else(|| entity_sets.get(name))
}

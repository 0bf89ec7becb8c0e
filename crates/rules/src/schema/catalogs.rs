//! Catalog documents: field catalogs and produced event types.

use serde::{Deserialize, Serialize};

use autoevent_core::{EventTypeDef, FieldCatalog};

use super::CommonMetadata;

/// `kind: FieldCatalog`: the fields of one record type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldCatalogDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: FieldCatalog,
}

/// `kind: EventTypeCatalog`: produced event types and their time kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventTypeCatalogDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: EventTypeCatalogSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventTypeCatalogSpec {
    pub event_types: Vec<EventTypeDef>,
}

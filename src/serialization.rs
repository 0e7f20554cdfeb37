//! Wire-format derivation: builds the serialization descriptor tree for
//! one schema and one target format (JSON or XML).
//!
//! A node's declared type reference always matches the schema it was
//! built from. Unknown schema variants are a hard build-time error;
//! they indicate a producer defect, not a recoverable condition.

use serde::Serialize;

use crate::model::{ObjectSchema, Property, Schema};
use crate::output::SerializationFormat;
use crate::types::{create_type, TypeReference};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WireFormat {
    Json,
    Xml,
}

impl WireFormat {
    /// Every non-XML, non-binary media type reads and writes JSON.
    pub fn from_media_type(media_type: crate::model::KnownMediaType) -> WireFormat {
        match media_type {
            crate::model::KnownMediaType::Xml => WireFormat::Xml,
            _ => WireFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum SerializationNode {
    Json(JsonSerialization),
    Xml(XmlSerialization),
}

impl SerializationNode {
    pub fn type_ref(&self) -> &TypeReference {
        match self {
            SerializationNode::Json(json) => json.type_ref(),
            SerializationNode::Xml(xml) => xml.type_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum JsonSerialization {
    Value {
        #[serde(rename = "type")]
        type_ref: TypeReference,
        format: SerializationFormat,
    },
    Array {
        #[serde(rename = "type")]
        type_ref: TypeReference,
        element: Box<JsonSerialization>,
    },
    Dictionary {
        #[serde(rename = "type")]
        type_ref: TypeReference,
        value: Box<JsonSerialization>,
    },
    Object(JsonObjectSerialization),
}

impl JsonSerialization {
    pub fn type_ref(&self) -> &TypeReference {
        match self {
            JsonSerialization::Value { type_ref, .. }
            | JsonSerialization::Array { type_ref, .. }
            | JsonSerialization::Dictionary { type_ref, .. } => type_ref,
            JsonSerialization::Object(object) => &object.type_ref,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonObjectSerialization {
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    /// One entry per declared property, keyed by wire name.
    pub properties: Vec<JsonPropertySerialization>,
    /// Catch-all entry when the object accepts open content.
    pub additional_properties: Option<Box<JsonSerialization>>,
    /// Value-based dispatch table for discriminated hierarchies,
    /// resolved once at build time.
    pub discriminator: Option<JsonDiscriminator>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonPropertySerialization {
    pub member_name: String,
    pub wire_name: String,
    pub required: bool,
    pub value: JsonSerialization,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonDiscriminator {
    /// Wire name of the child-selection property.
    pub wire_name: String,
    /// One fully built node per concrete subtype, keyed by the
    /// subtype's discriminator value.
    pub variants: Vec<JsonDiscriminatorVariant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonDiscriminatorVariant {
    pub value: String,
    pub serialization: Box<JsonSerialization>,
}

#[derive(Debug, Clone, Serialize)]
pub enum XmlSerialization {
    Value {
        name: String,
        #[serde(rename = "type")]
        type_ref: TypeReference,
        format: SerializationFormat,
    },
    Array {
        name: String,
        #[serde(rename = "type")]
        type_ref: TypeReference,
        element: Box<XmlSerialization>,
        /// Wrapped renders inside a dedicated container element;
        /// unwrapped renders as repeated sibling elements.
        wrapped: bool,
    },
    Dictionary {
        name: String,
        #[serde(rename = "type")]
        type_ref: TypeReference,
        value: Box<XmlSerialization>,
    },
    Object(XmlObjectSerialization),
}

impl XmlSerialization {
    pub fn type_ref(&self) -> &TypeReference {
        match self {
            XmlSerialization::Value { type_ref, .. }
            | XmlSerialization::Array { type_ref, .. }
            | XmlSerialization::Dictionary { type_ref, .. } => type_ref,
            XmlSerialization::Object(object) => &object.type_ref,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            XmlSerialization::Value { name, .. }
            | XmlSerialization::Array { name, .. }
            | XmlSerialization::Dictionary { name, .. } => name,
            XmlSerialization::Object(object) => &object.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct XmlObjectSerialization {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    /// Properties rendered as child elements.
    pub elements: Vec<XmlObjectElement>,
    /// Properties rendered as attributes on the element itself.
    pub attributes: Vec<XmlObjectElement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct XmlObjectElement {
    pub member_name: String,
    pub value: XmlSerialization,
}

/// Builds the serialization tree for a schema on the given wire format.
pub fn build(format: WireFormat, schema: &Schema, is_nullable: bool) -> Result<SerializationNode> {
    match format {
        WireFormat::Json => Ok(SerializationNode::Json(build_json(schema, is_nullable)?)),
        WireFormat::Xml => Ok(SerializationNode::Xml(build_xml(schema, is_nullable, None)?)),
    }
}

/// Format annotation for one primitive value, from the fixed table.
pub fn serialization_format(schema: &Schema) -> SerializationFormat {
    match schema {
        Schema::Date(_) => SerializationFormat::Date,
        Schema::DateTime(date_time) => match date_time.format.as_deref() {
            Some("date-time-rfc1123") => SerializationFormat::DateTimeRfc1123,
            _ => SerializationFormat::DateTimeIso8601,
        },
        Schema::Duration(_) => SerializationFormat::DurationIso8601,
        Schema::ByteArray(bytes) => match bytes.format.as_deref() {
            Some("base64url") => SerializationFormat::Base64Url,
            _ => SerializationFormat::Base64,
        },
        // A url-safe string marker forces base64url on the wire.
        Schema::String(s) if crate::model::extension_bool(&s.common.extensions, "x-ms-base64url") => {
            SerializationFormat::Base64Url
        }
        Schema::Constant(constant) => serialization_format(&constant.value_type),
        _ => SerializationFormat::Default,
    }
}

fn build_json(schema: &Schema, is_nullable: bool) -> Result<JsonSerialization> {
    match schema {
        // The tree for a constant matches its value schema's shape; the
        // literal is substituted at the usage site by the caller.
        Schema::Constant(constant) => build_json(&constant.value_type, is_nullable),
        Schema::Array(array) => Ok(JsonSerialization::Array {
            type_ref: create_type(schema, is_nullable)?,
            element: Box::new(build_json(&array.element_type, false)?),
        }),
        Schema::Dictionary(dictionary) => Ok(JsonSerialization::Dictionary {
            type_ref: create_type(schema, is_nullable)?,
            value: Box::new(build_json(&dictionary.element_type, false)?),
        }),
        Schema::Object(object) => Ok(JsonSerialization::Object(build_json_object(
            object, schema, is_nullable,
        )?)),
        Schema::And(_) | Schema::Or(_) | Schema::Xor(_) | Schema::Binary(_) => {
            Err(Error::UnsupportedSchema {
                name: schema.name().to_string(),
                variant: schema.variant_name(),
            })
        }
        _ => Ok(JsonSerialization::Value {
            type_ref: create_type(schema, is_nullable)?,
            format: serialization_format(schema),
        }),
    }
}

fn build_json_object(
    object: &ObjectSchema,
    schema: &Schema,
    is_nullable: bool,
) -> Result<JsonObjectSerialization> {
    let mut properties = Vec::with_capacity(object.properties.len());
    for property in &object.properties {
        properties.push(JsonPropertySerialization {
            member_name: property.name().to_string(),
            wire_name: property.wire_name().to_string(),
            required: property.required,
            value: build_json(&property.schema, !property.required)?,
        });
    }

    let additional_properties = match &object.additional_properties {
        Some(value_schema) => Some(Box::new(build_json(value_schema, false)?)),
        None => None,
    };

    let discriminator = match &object.discriminator {
        Some(discriminator) => {
            let mut variants = Vec::new();
            for child in object.discriminated_children() {
                let value = match child {
                    Schema::Object(child_object) => child_object.discriminator_value.clone(),
                    _ => None,
                };
                let Some(value) = value else { continue };
                variants.push(JsonDiscriminatorVariant {
                    value,
                    serialization: Box::new(build_json(child, false)?),
                });
            }
            Some(JsonDiscriminator {
                wire_name: discriminator.property.wire_name().to_string(),
                variants,
            })
        }
        None => None,
    };

    Ok(JsonObjectSerialization {
        type_ref: create_type(schema, is_nullable)?,
        properties,
        additional_properties,
        discriminator,
    })
}

fn build_xml(
    schema: &Schema,
    is_nullable: bool,
    name_hint: Option<&str>,
) -> Result<XmlSerialization> {
    let element_name = name_hint.unwrap_or_else(|| schema.xml_name()).to_string();
    match schema {
        Schema::Constant(constant) => build_xml(&constant.value_type, is_nullable, name_hint),
        Schema::Array(array) => {
            let wrapped = schema.xml_wrapped();
            // A wrapped array's container keeps this element name and
            // the items use their own; unwrapped items repeat under the
            // array's name as siblings.
            let element_hint = if wrapped { None } else { Some(element_name.as_str()) };
            Ok(XmlSerialization::Array {
                type_ref: create_type(schema, is_nullable)?,
                element: Box::new(build_xml(&array.element_type, false, element_hint)?),
                name: element_name,
                wrapped,
            })
        }
        Schema::Dictionary(dictionary) => Ok(XmlSerialization::Dictionary {
            type_ref: create_type(schema, is_nullable)?,
            value: Box::new(build_xml(&dictionary.element_type, false, None)?),
            name: element_name,
        }),
        Schema::Object(object) => {
            let mut elements = Vec::new();
            let mut attributes = Vec::new();
            for property in &object.properties {
                let property_name = property
                    .xml()
                    .and_then(|x| x.name.as_deref())
                    .unwrap_or_else(|| property.wire_name());
                let entry = XmlObjectElement {
                    member_name: property.name().to_string(),
                    value: build_xml(&property.schema, !property.required, Some(property_name))?,
                };
                if property.xml().is_some_and(|x| x.attribute) {
                    attributes.push(entry);
                } else {
                    elements.push(entry);
                }
            }
            Ok(XmlSerialization::Object(XmlObjectSerialization {
                name: element_name,
                type_ref: create_type(schema, is_nullable)?,
                elements,
                attributes,
            }))
        }
        Schema::And(_) | Schema::Or(_) | Schema::Xor(_) | Schema::Binary(_) => {
            Err(Error::UnsupportedSchema {
                name: schema.name().to_string(),
                variant: schema.variant_name(),
            })
        }
        _ => Ok(XmlSerialization::Value {
            type_ref: create_type(schema, is_nullable)?,
            format: serialization_format(schema),
            name: element_name,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ArraySchema, ByteArraySchema, Discriminator, Languages, NumberKind, NumberSchema,
        ObjectSchema, Property, SchemaCommon, SerializationMeta, ValueSchema, XmlMeta,
    };
    use crate::types::{PrimitiveType, TypeKind, TypeReference};

    fn string_schema(name: &str) -> Schema {
        Schema::String(ValueSchema {
            common: SchemaCommon::named(name),
        })
    }

    fn int_array_schema(name: &str) -> Schema {
        Schema::Array(ArraySchema {
            common: SchemaCommon::named(name),
            element_type: Box::new(Schema::Number(NumberSchema {
                common: SchemaCommon::named("int"),
                number_kind: NumberKind::Integer,
                precision: Some(64),
            })),
        })
    }

    fn property(name: &str, required: bool, schema: Schema) -> Property {
        Property {
            language: Languages {
                default: crate::model::Language {
                    name: name.to_string(),
                    ..Default::default()
                },
            },
            serialized_name: None,
            required,
            schema,
            serialization: None,
        }
    }

    #[test]
    fn json_object_has_one_entry_per_property() {
        let schema = Schema::Object(ObjectSchema {
            common: SchemaCommon::named("Pet"),
            properties: vec![
                property("a", true, string_schema("a")),
                property("b", true, int_array_schema("b")),
            ],
            ..ObjectSchema::default()
        });

        let node = build(WireFormat::Json, &schema, false).unwrap();
        let SerializationNode::Json(JsonSerialization::Object(object)) = node else {
            panic!("expected a JSON object node");
        };
        assert_eq!(object.properties.len(), 2);
        assert!(matches!(
            object.properties[0].value,
            JsonSerialization::Value {
                type_ref: TypeReference { kind: TypeKind::Primitive(PrimitiveType::String), .. },
                ..
            }
        ));
        assert!(matches!(object.properties[1].value, JsonSerialization::Array { .. }));
    }

    #[test]
    fn xml_array_wrap_marker_controls_wrapping() {
        let mut array = ArraySchema {
            common: SchemaCommon::named("Tags"),
            element_type: Box::new(string_schema("Tag")),
        };

        let unwrapped = build_xml(&Schema::Array(array.clone()), false, None).unwrap();
        let XmlSerialization::Array { wrapped, name, element, .. } = &unwrapped else {
            panic!("expected an XML array node");
        };
        assert!(!wrapped);
        assert_eq!(name, "Tags");
        // Unwrapped items repeat under the array's own element name.
        assert_eq!(element.name(), "Tags");

        array.common.serialization = Some(SerializationMeta {
            xml: Some(XmlMeta {
                wrapped: true,
                ..XmlMeta::default()
            }),
        });
        let wrapped_node = build_xml(&Schema::Array(array), false, None).unwrap();
        let XmlSerialization::Array { wrapped, name, element, .. } = &wrapped_node else {
            panic!("expected an XML array node");
        };
        assert!(wrapped);
        assert_eq!(name, "Tags");
        assert_eq!(element.name(), "Tag");
    }

    #[test]
    fn xml_attribute_properties_split_from_elements() {
        let mut id = property("id", true, string_schema("id"));
        id.serialization = Some(SerializationMeta {
            xml: Some(XmlMeta {
                attribute: true,
                ..XmlMeta::default()
            }),
        });
        let schema = Schema::Object(ObjectSchema {
            common: SchemaCommon::named("Entry"),
            properties: vec![id, property("body", false, string_schema("body"))],
            ..ObjectSchema::default()
        });

        let node = build_xml(&schema, false, None).unwrap();
        let XmlSerialization::Object(object) = node else {
            panic!("expected an XML object node");
        };
        assert_eq!(object.attributes.len(), 1);
        assert_eq!(object.attributes[0].member_name, "id");
        assert_eq!(object.elements.len(), 1);
        assert_eq!(object.elements[0].member_name, "body");
    }

    #[test]
    fn byte_array_formats_select_base64_variants() {
        let plain = Schema::ByteArray(ByteArraySchema {
            common: SchemaCommon::named("data"),
            format: Some("byte".to_string()),
        });
        assert_eq!(serialization_format(&plain), SerializationFormat::Base64);

        let url_safe = Schema::ByteArray(ByteArraySchema {
            common: SchemaCommon::named("data"),
            format: Some("base64url".to_string()),
        });
        assert_eq!(serialization_format(&url_safe), SerializationFormat::Base64Url);
    }

    #[test]
    fn discriminated_object_resolves_subtype_dispatch() {
        let child = Schema::Object(ObjectSchema {
            common: SchemaCommon::named("Salmon"),
            discriminator_value: Some("salmon".to_string()),
            properties: vec![property("river", false, string_schema("river"))],
            ..ObjectSchema::default()
        });
        let base = Schema::Object(ObjectSchema {
            common: SchemaCommon::named("Fish"),
            properties: vec![property("fishtype", true, string_schema("fishtype"))],
            discriminator: Some(Discriminator {
                property: Box::new(property("fishtype", true, string_schema("fishtype"))),
            }),
            children: Some(crate::model::Relations {
                immediate: vec![child],
                all: vec![],
            }),
            ..ObjectSchema::default()
        });

        let node = build_json(&base, false).unwrap();
        let JsonSerialization::Object(object) = node else {
            panic!("expected a JSON object node");
        };
        let discriminator = object.discriminator.expect("dispatch table");
        assert_eq!(discriminator.wire_name, "fishtype");
        assert_eq!(discriminator.variants.len(), 1);
        assert_eq!(discriminator.variants[0].value, "salmon");
        assert!(matches!(
            *discriminator.variants[0].serialization,
            JsonSerialization::Object(_)
        ));
    }

    #[test]
    fn discriminator_dispatch_covers_every_hierarchy_level() {
        let grandchild = Schema::Object(ObjectSchema {
            common: SchemaCommon::named("SmartSalmon"),
            discriminator_value: Some("smartSalmon".to_string()),
            ..ObjectSchema::default()
        });
        let child = Schema::Object(ObjectSchema {
            common: SchemaCommon::named("Salmon"),
            discriminator_value: Some("salmon".to_string()),
            children: Some(crate::model::Relations {
                immediate: vec![grandchild.clone()],
                all: vec![grandchild.clone()],
            }),
            ..ObjectSchema::default()
        });
        let base = Schema::Object(ObjectSchema {
            common: SchemaCommon::named("Fish"),
            properties: vec![property("fishtype", true, string_schema("fishtype"))],
            discriminator: Some(Discriminator {
                property: Box::new(property("fishtype", true, string_schema("fishtype"))),
            }),
            children: Some(crate::model::Relations {
                immediate: vec![child.clone()],
                all: vec![child, grandchild],
            }),
            ..ObjectSchema::default()
        });

        let node = build_json(&base, false).unwrap();
        let JsonSerialization::Object(object) = node else {
            panic!("expected a JSON object node");
        };
        let discriminator = object.discriminator.expect("dispatch table");
        let values: Vec<&str> = discriminator
            .variants
            .iter()
            .map(|v| v.value.as_str())
            .collect();
        assert_eq!(values, vec!["salmon", "smartSalmon"]);
    }

    #[test]
    fn composition_schema_is_a_hard_error() {
        let schema = Schema::And(ValueSchema {
            common: SchemaCommon::named("mixin"),
        });
        assert!(build(WireFormat::Json, &schema, false).is_err());
        assert!(build(WireFormat::Xml, &schema, false).is_err());
    }
}

//! Type-reference resolution: maps a schema node to a semantic type
//! descriptor and folds constant schemas into literal values.
//!
//! Resolution is a pure function of (schema identity, nullability
//! context); the same schema always resolves to the same reference
//! shape within one build.

use serde::Serialize;

use crate::model::{ConstantSchema, NumberKind, Parameter, Schema};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeReference {
    pub kind: TypeKind,
    pub is_nullable: bool,
}

impl TypeReference {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        TypeReference {
            kind: TypeKind::Primitive(primitive),
            is_nullable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeKind {
    Primitive(PrimitiveType),
    List(Box<TypeReference>),
    Map(Box<TypeReference>),
    /// Reference to a named model type, keyed by the schema's declared
    /// name. Inheritance is not flattened; every object schema keeps
    /// its own reference.
    Model(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimitiveType {
    Bool,
    String,
    Int32,
    Int64,
    Float32,
    Float64,
    Date,
    DateTime,
    Duration,
    Uuid,
    Uri,
    Bytes,
    Stream,
    Any,
}

/// Resolves a schema to its type reference. Composition variants have
/// no defined lowering and fail the build.
pub fn create_type(schema: &Schema, is_nullable: bool) -> Result<TypeReference> {
    let kind = match schema {
        Schema::Boolean(_) => TypeKind::Primitive(PrimitiveType::Bool),
        Schema::String(_) => TypeKind::Primitive(PrimitiveType::String),
        Schema::Number(number) => {
            let primitive = match (number.number_kind, number.precision.unwrap_or(64)) {
                (NumberKind::Integer, 32) => PrimitiveType::Int32,
                (NumberKind::Integer, _) => PrimitiveType::Int64,
                (NumberKind::Number, 32) => PrimitiveType::Float32,
                (NumberKind::Number, _) => PrimitiveType::Float64,
            };
            TypeKind::Primitive(primitive)
        }
        Schema::ByteArray(_) => TypeKind::Primitive(PrimitiveType::Bytes),
        Schema::Date(_) => TypeKind::Primitive(PrimitiveType::Date),
        Schema::DateTime(_) => TypeKind::Primitive(PrimitiveType::DateTime),
        Schema::Duration(_) => TypeKind::Primitive(PrimitiveType::Duration),
        Schema::Uuid(_) => TypeKind::Primitive(PrimitiveType::Uuid),
        Schema::Uri(_) => TypeKind::Primitive(PrimitiveType::Uri),
        Schema::Binary(_) => TypeKind::Primitive(PrimitiveType::Stream),
        Schema::Any(_) => TypeKind::Primitive(PrimitiveType::Any),
        Schema::Array(array) => {
            TypeKind::List(Box::new(create_type(&array.element_type, false)?))
        }
        Schema::Dictionary(dictionary) => {
            TypeKind::Map(Box::new(create_type(&dictionary.element_type, false)?))
        }
        Schema::Object(object) => TypeKind::Model(object.common.name().to_string()),
        Schema::Choice(choice) | Schema::SealedChoice(choice) => {
            TypeKind::Model(choice.common.name().to_string())
        }
        // A constant resolves through its underlying value schema; the
        // literal itself is captured separately by parse_constant.
        Schema::Constant(constant) => return create_type(&constant.value_type, is_nullable),
        Schema::And(_) | Schema::Or(_) | Schema::Xor(_) => {
            return Err(Error::UnsupportedSchema {
                name: schema.name().to_string(),
                variant: schema.variant_name(),
            })
        }
    };
    Ok(TypeReference { kind, is_nullable })
}

/// A folded literal with the type it carries on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    pub value: ConstantValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstantValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Uuid(uuid::Uuid),
}

/// Folds a constant schema into a literal value typed by its
/// underlying value schema.
pub fn parse_constant(schema: &ConstantSchema) -> Result<Constant> {
    Ok(Constant {
        type_ref: create_type(&schema.value_type, false)?,
        value: fold_scalar(&schema.value.value, &schema.value_type, schema.common.name())?,
    })
}

/// The default value of an output parameter: an explicit client default
/// when declared, a null placeholder when the parameter is optional,
/// nothing when it is required. Required-before-optional ordering keys
/// off this.
pub fn default_constant(parameter: &Parameter) -> Result<Option<Constant>> {
    if let Some(raw) = &parameter.client_default_value {
        return Ok(Some(Constant {
            type_ref: create_type(&parameter.schema, parameter.is_nullable())?,
            value: fold_scalar(raw, &parameter.schema, parameter.name())?,
        }));
    }
    if !parameter.is_required() {
        return Ok(Some(Constant {
            type_ref: create_type(&parameter.schema, true)?,
            value: ConstantValue::Null,
        }));
    }
    Ok(None)
}

pub fn string_constant(value: &str) -> Constant {
    Constant {
        type_ref: TypeReference::primitive(PrimitiveType::String),
        value: ConstantValue::String(value.to_string()),
    }
}

fn fold_scalar(raw: &serde_yaml::Value, value_type: &Schema, owner: &str) -> Result<ConstantValue> {
    let invalid = |message: &str| Error::InvalidConstant {
        name: owner.to_string(),
        message: message.to_string(),
    };
    Ok(match raw {
        serde_yaml::Value::Null => ConstantValue::Null,
        serde_yaml::Value::Bool(b) => ConstantValue::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ConstantValue::Int(i)
            } else {
                ConstantValue::Float(n.as_f64().ok_or_else(|| invalid("unrepresentable number"))?)
            }
        }
        serde_yaml::Value::String(s) => {
            if matches!(value_type, Schema::Uuid(_)) {
                let parsed = uuid::Uuid::parse_str(s)
                    .map_err(|e| invalid(&format!("invalid uuid literal: {e}")))?;
                ConstantValue::Uuid(parsed)
            } else {
                ConstantValue::String(s.clone())
            }
        }
        _ => return Err(invalid("constant value is not a scalar")),
    })
}

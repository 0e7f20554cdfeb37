//! Tagged-document loading.
//!
//! The code-model document arrives as YAML in which every typed node
//! carries a tag. Loading is mechanical: verify every tag against the
//! registry, rewrite tags into the `kind` discriminant the IR enums
//! dispatch on, and hand the rest to serde. A document referencing an
//! unregistered tag fails the whole build before any model exists; it
//! indicates a version mismatch with the producer, not a recoverable
//! per-record condition.

use std::collections::HashSet;

use serde_yaml::value::TaggedValue;
use serde_yaml::Value;

use crate::model::CodeModel;
use crate::{Error, Result};

/// Every tag this tool understands. One tag maps to exactly one
/// in-memory type; nodes whose tags only mark metadata deserialize as
/// plain structs and ignore the discriminant.
const KNOWN_TAGS: &[&str] = &[
    "CodeModel",
    "Info",
    "Contact",
    "License",
    "Metadata",
    "ExternalDocumentation",
    "Languages",
    "Protocols",
    "ApiVersion",
    "HttpModel",
    "Schemas",
    "Discriminator",
    "OperationGroup",
    "Operation",
    "Request",
    "Response",
    "SchemaResponse",
    "StreamResponse",
    "BinaryResponse",
    "Parameter",
    "Property",
    "Value",
    "HttpRequest",
    "HttpWithBodyRequest",
    "HttpStreamRequest",
    "HttpMultipartRequest",
    "HttpResponse",
    "HttpStreamResponse",
    "HttpParameter",
    "HttpServer",
    "ServerVariable",
    "BooleanSchema",
    "StringSchema",
    "NumberSchema",
    "ByteArraySchema",
    "DateSchema",
    "DateTimeSchema",
    "DurationSchema",
    "UnixTimeSchema",
    "UuidSchema",
    "UriSchema",
    "CharSchema",
    "CredentialSchema",
    "ODataQuerySchema",
    "BinarySchema",
    "AnySchema",
    "Schema",
    "ObjectSchema",
    "ArraySchema",
    "DictionarySchema",
    "ChoiceSchema",
    "SealedChoiceSchema",
    "ChoiceValue",
    "ConstantSchema",
    "ConstantValue",
    "FlagSchema",
    "FlagValue",
    "ParameterGroupSchema",
    "AndSchema",
    "OrSchema",
    "XorSchema",
    "APIKeySecurityScheme",
    "BearerHTTPSecurityScheme",
    "NonBearerHTTPSecurityScheme",
    "OAuth2SecurityScheme",
    "OpenIdConnectSecurityScheme",
    "OAuthFlows",
    "ImplicitOAuthFlow",
    "PasswordOAuthFlow",
    "AuthorizationCodeOAuthFlow",
    "ClientCredentialsFlow",
];

/// The registry of document tags, built once at start-up and shared as
/// an immutable reference; no process-wide mutable state.
#[derive(Debug)]
pub struct TagRegistry {
    tags: HashSet<&'static str>,
}

impl TagRegistry {
    pub fn new() -> Self {
        TagRegistry {
            tags: KNOWN_TAGS.iter().copied().collect(),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        TagRegistry::new()
    }
}

/// Parses a tagged code-model document into the IR tree.
pub fn load_code_model(registry: &TagRegistry, document: &str) -> Result<CodeModel> {
    let value: Value = serde_yaml::from_str(document)?;
    let resolved = resolve_tags(registry, value)?;
    Ok(serde_yaml::from_value(resolved)?)
}

/// Walks the whole document, failing on the first unregistered tag and
/// rewriting registered tags into a `kind` field on the tagged mapping.
fn resolve_tags(registry: &TagRegistry, value: Value) -> Result<Value> {
    Ok(match value {
        Value::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            let tag = tag.to_string();
            let name = tag.trim_start_matches('!');
            if !registry.contains(name) {
                return Err(Error::UnknownTag(name.to_string()));
            }
            match resolve_tags(registry, value)? {
                Value::Mapping(mut mapping) => {
                    mapping.insert(
                        Value::String("kind".to_string()),
                        Value::String(name.to_string()),
                    );
                    Value::Mapping(mapping)
                }
                // Tags on scalars carry no variant payload.
                other => other,
            }
        }
        Value::Sequence(sequence) => Value::Sequence(
            sequence
                .into_iter()
                .map(|item| resolve_tags(registry, item))
                .collect::<Result<_>>()?,
        ),
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .into_iter()
                .map(|(key, item)| Ok((resolve_tags(registry, key)?, resolve_tags(registry, item)?)))
                .collect::<Result<_>>()?,
        ),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HttpMethod, Schema};

    const MINIMAL_DOCUMENT: &str = r#"!CodeModel
language:
  default:
    name: PetStore
operationGroups:
  - !OperationGroup
    $key: pets
    language:
      default:
        name: pets
    operations:
      - !Operation
        language:
          default:
            name: list
        request: !Request
          parameters:
            - !Parameter
              language:
                default:
                  name: apiVersion
                  serializedName: api-version
              schema: !StringSchema
                language:
                  default:
                    name: ApiVersionString
              required: true
              implementation: Method
              protocol: !Protocols
                http: !HttpParameter
                  in: query
          protocol: !Protocols
            http: !HttpRequest
              method: get
              uri: ''
              path: /pets
        responses:
          - !SchemaResponse
            schema: !ObjectSchema
              language:
                default:
                  name: PetList
              properties:
                - !Property
                  language:
                    default:
                      name: value
                  serializedName: value
                  required: true
                  schema: !StringSchema
                    language:
                      default:
                        name: name
            protocol: !Protocols
              http: !HttpResponse
                statusCodes:
                  - '200'
                knownMediaType: json
"#;

    #[test]
    fn loads_a_minimal_tagged_document() {
        let registry = TagRegistry::new();
        let model = load_code_model(&registry, MINIMAL_DOCUMENT).unwrap();
        assert_eq!(model.operation_groups.len(), 1);

        let group = &model.operation_groups[0];
        assert_eq!(group.name(), "pets");
        assert_eq!(group.operations.len(), 1);

        let operation = &group.operations[0];
        assert_eq!(operation.name(), "list");
        let http = operation.request.protocol.http.as_ref().unwrap();
        assert_eq!(http.method, HttpMethod::Get);
        assert_eq!(http.path, "/pets");

        let parameter = &operation.request.parameters[0];
        assert_eq!(parameter.serialized_name(), "api-version");
        assert!(matches!(parameter.schema, Schema::String(_)));
    }

    #[test]
    fn unknown_tag_aborts_the_build() {
        let registry = TagRegistry::new();
        let document = MINIMAL_DOCUMENT.replace("!StringSchema", "!QuantumSchema");
        let err = load_code_model(&registry, &document).unwrap_err();
        assert!(matches!(err, Error::UnknownTag(tag) if tag == "QuantumSchema"));
    }

    #[test]
    fn registry_rejects_unregistered_and_accepts_registered_tags() {
        let registry = TagRegistry::default();
        assert!(registry.contains("ObjectSchema"));
        assert!(registry.contains("CodeModel"));
        assert!(registry.contains("StreamResponse"));
        assert!(registry.contains("OAuth2SecurityScheme"));
        assert!(registry.contains("APIKeySecurityScheme"));
        assert!(!registry.contains("QuantumSchema"));
        assert!(!registry.contains("Relations"));
    }

    #[test]
    fn security_metadata_tags_load_without_aborting() {
        let registry = TagRegistry::new();
        let document = format!(
            "{MINIMAL_DOCUMENT}security:\n  - !OAuth2SecurityScheme\n    type: oauth2\n"
        );
        let model = load_code_model(&registry, &document).unwrap();
        assert_eq!(model.operation_groups.len(), 1);
    }
}

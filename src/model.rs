//! The code-model IR handed to the core.
//!
//! Produced by the external loader front-end; the core treats the whole
//! tree as read-only input. Field names follow the document's camelCase
//! spelling; the `kind` discriminant is injected by the loader from the
//! document tags.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Raw extension payloads, keyed by extension name. Unknown extensions
/// are carried along and ignored.
pub type Extensions = IndexMap<String, serde_yaml::Value>;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub serialized_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Languages {
    #[serde(default)]
    pub default: Language,
}

/// Metadata shared by every schema variant.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCommon {
    #[serde(default)]
    pub language: Languages,
    pub serialization: Option<SerializationMeta>,
    pub extensions: Option<Extensions>,
}

impl SchemaCommon {
    pub fn name(&self) -> &str {
        &self.language.default.name
    }

    pub fn named(name: &str) -> Self {
        SchemaCommon {
            language: Languages {
                default: Language {
                    name: name.to_string(),
                    ..Language::default()
                },
            },
            ..SchemaCommon::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SerializationMeta {
    pub xml: Option<XmlMeta>,
}

/// XML placement metadata on a schema or property.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct XmlMeta {
    pub name: Option<String>,
    pub namespace: Option<String>,
    #[serde(default)]
    pub attribute: bool,
    #[serde(default)]
    pub wrapped: bool,
}

/// A data shape in the code model. Every document tag of interest maps
/// onto exactly one variant; dispatch in the resolver and serialization
/// builder is exhaustive over this enum.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Schema {
    #[serde(rename = "BooleanSchema")]
    Boolean(ValueSchema),
    #[serde(rename = "StringSchema")]
    String(ValueSchema),
    #[serde(rename = "NumberSchema")]
    Number(NumberSchema),
    #[serde(rename = "ByteArraySchema")]
    ByteArray(ByteArraySchema),
    #[serde(rename = "DateSchema")]
    Date(ValueSchema),
    #[serde(rename = "DateTimeSchema")]
    DateTime(DateTimeSchema),
    #[serde(rename = "DurationSchema")]
    Duration(ValueSchema),
    #[serde(rename = "UuidSchema")]
    Uuid(ValueSchema),
    #[serde(rename = "UriSchema")]
    Uri(ValueSchema),
    #[serde(rename = "BinarySchema")]
    Binary(ValueSchema),
    #[serde(rename = "AnySchema")]
    Any(ValueSchema),
    #[serde(rename = "ObjectSchema")]
    Object(ObjectSchema),
    #[serde(rename = "ArraySchema")]
    Array(ArraySchema),
    #[serde(rename = "DictionarySchema")]
    Dictionary(DictionarySchema),
    #[serde(rename = "ChoiceSchema")]
    Choice(ChoiceSchema),
    #[serde(rename = "SealedChoiceSchema")]
    SealedChoice(ChoiceSchema),
    #[serde(rename = "ConstantSchema")]
    Constant(ConstantSchema),
    #[serde(rename = "AndSchema")]
    And(ValueSchema),
    #[serde(rename = "OrSchema")]
    Or(ValueSchema),
    #[serde(rename = "XorSchema")]
    Xor(ValueSchema),
}

impl Schema {
    pub fn common(&self) -> &SchemaCommon {
        match self {
            Schema::Boolean(s)
            | Schema::String(s)
            | Schema::Date(s)
            | Schema::Duration(s)
            | Schema::Uuid(s)
            | Schema::Uri(s)
            | Schema::Binary(s)
            | Schema::Any(s)
            | Schema::And(s)
            | Schema::Or(s)
            | Schema::Xor(s) => &s.common,
            Schema::Number(s) => &s.common,
            Schema::ByteArray(s) => &s.common,
            Schema::DateTime(s) => &s.common,
            Schema::Object(s) => &s.common,
            Schema::Array(s) => &s.common,
            Schema::Dictionary(s) => &s.common,
            Schema::Choice(s) | Schema::SealedChoice(s) => &s.common,
            Schema::Constant(s) => &s.common,
        }
    }

    pub fn name(&self) -> &str {
        self.common().name()
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Schema::Boolean(_) => "BooleanSchema",
            Schema::String(_) => "StringSchema",
            Schema::Number(_) => "NumberSchema",
            Schema::ByteArray(_) => "ByteArraySchema",
            Schema::Date(_) => "DateSchema",
            Schema::DateTime(_) => "DateTimeSchema",
            Schema::Duration(_) => "DurationSchema",
            Schema::Uuid(_) => "UuidSchema",
            Schema::Uri(_) => "UriSchema",
            Schema::Binary(_) => "BinarySchema",
            Schema::Any(_) => "AnySchema",
            Schema::Object(_) => "ObjectSchema",
            Schema::Array(_) => "ArraySchema",
            Schema::Dictionary(_) => "DictionarySchema",
            Schema::Choice(_) => "ChoiceSchema",
            Schema::SealedChoice(_) => "SealedChoiceSchema",
            Schema::Constant(_) => "ConstantSchema",
            Schema::And(_) => "AndSchema",
            Schema::Or(_) => "OrSchema",
            Schema::Xor(_) => "XorSchema",
        }
    }

    /// The wrapped-container marker for XML arrays: explicit XML
    /// metadata first, the x-ms-wrapped extension as the fallback.
    pub fn xml_wrapped(&self) -> bool {
        let common = self.common();
        if let Some(xml) = common.serialization.as_ref().and_then(|s| s.xml.as_ref()) {
            if xml.wrapped {
                return true;
            }
        }
        extension_bool(&common.extensions, "x-ms-wrapped")
    }

    /// Wire element name for XML: explicit XML metadata name, else the
    /// declared schema name.
    pub fn xml_name(&self) -> &str {
        let common = self.common();
        common
            .serialization
            .as_ref()
            .and_then(|s| s.xml.as_ref())
            .and_then(|x| x.name.as_deref())
            .unwrap_or_else(|| common.name())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ValueSchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumberKind {
    Integer,
    #[default]
    Number,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NumberSchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
    #[serde(rename = "type", default)]
    pub number_kind: NumberKind,
    pub precision: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ByteArraySchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
    /// "byte" (base64) or "base64url".
    pub format: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DateTimeSchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
    /// "date-time" (ISO 8601) or "date-time-rfc1123".
    pub format: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
    #[serde(default)]
    pub properties: Vec<Property>,
    pub discriminator: Option<Discriminator>,
    pub discriminator_value: Option<String>,
    pub children: Option<Relations>,
    pub parents: Option<Relations>,
    /// Open-content catch-all value schema, when the object accepts
    /// undeclared properties.
    pub additional_properties: Option<Box<Schema>>,
}

impl ObjectSchema {
    /// Concrete subtype schemas of a discriminated hierarchy, across
    /// every level. Falls back to the immediate children when the
    /// producer populated only those.
    pub fn discriminated_children(&self) -> &[Schema] {
        match self.children.as_ref() {
            Some(relations) if !relations.all.is_empty() => &relations.all,
            Some(relations) => &relations.immediate,
            None => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Relations {
    #[serde(default)]
    pub immediate: Vec<Schema>,
    #[serde(default)]
    pub all: Vec<Schema>,
}

/// The child-selection property of a discriminated hierarchy.
#[derive(Debug, Clone, Deserialize)]
pub struct Discriminator {
    pub property: Box<Property>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(default)]
    pub language: Languages,
    pub serialized_name: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub schema: Schema,
    pub serialization: Option<SerializationMeta>,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.language.default.name
    }

    /// Wire name: explicit serialized name if present, else the
    /// declared name.
    pub fn wire_name(&self) -> &str {
        self.serialized_name.as_deref().unwrap_or_else(|| self.name())
    }

    pub fn xml(&self) -> Option<&XmlMeta> {
        self.serialization.as_ref().and_then(|s| s.xml.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
    pub element_type: Box<Schema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionarySchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
    pub element_type: Box<Schema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceSchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
    pub choice_type: Box<Schema>,
    #[serde(default)]
    pub choices: Vec<ChoiceValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceValue {
    pub value: serde_yaml::Value,
    #[serde(default)]
    pub language: Languages,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantSchema {
    #[serde(flatten)]
    pub common: SchemaCommon,
    pub value_type: Box<Schema>,
    pub value: ConstantValueNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantValueNode {
    pub value: serde_yaml::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeModel {
    #[serde(default)]
    pub language: Languages,
    #[serde(default)]
    pub operation_groups: Vec<OperationGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationGroup {
    #[serde(rename = "$key", default)]
    pub key: String,
    #[serde(default)]
    pub language: Languages,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl OperationGroup {
    pub fn name(&self) -> &str {
        let name = &self.language.default.name;
        if name.is_empty() {
            &self.key
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub language: Languages,
    pub request: Request,
    #[serde(default)]
    pub responses: Vec<Response>,
    pub extensions: Option<Extensions>,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.language.default.name
    }

    pub fn description(&self) -> &str {
        self.language.default.description.as_deref().unwrap_or("")
    }

    /// The pagination marker, when the operation's response is one page
    /// of a continuable result set. Malformed or absent markers both
    /// read as "not pageable"; a malformed one is a producer defect and
    /// gets logged.
    pub fn pageable(&self) -> Option<PageableExtension> {
        let raw = self.extensions.as_ref()?.get("x-ms-pageable")?;
        match serde_yaml::from_value(raw.clone()) {
            Ok(pageable) => Some(pageable),
            Err(error) => {
                warn!(operation = %self.name(), %error, "ignoring malformed x-ms-pageable extension");
                None
            }
        }
    }
}

/// Payload of the x-ms-pageable extension. All fields optional.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageableExtension {
    pub operation_name: Option<String>,
    pub next_link_name: Option<String>,
    pub item_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub protocol: RequestProtocol,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RequestProtocol {
    pub http: Option<HttpRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    pub method: HttpMethod,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub path: String,
    pub media_types: Option<Vec<String>>,
    pub known_media_type: Option<KnownMediaType>,
}

impl HttpRequest {
    /// Body requests arrive as the with-body protocol variant, which
    /// always carries a known media type.
    pub fn has_body(&self) -> bool {
        self.known_media_type.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownMediaType {
    Json,
    Xml,
    Binary,
    Text,
    Form,
    Multipart,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Response {
    #[serde(rename = "SchemaResponse")]
    Schema(SchemaResponse),
    #[serde(rename = "BinaryResponse", alias = "StreamResponse")]
    Binary(PlainResponse),
    #[serde(rename = "Response")]
    Plain(PlainResponse),
}

impl Response {
    pub fn http(&self) -> Option<&HttpResponse> {
        match self {
            Response::Schema(r) => r.protocol.http.as_ref(),
            Response::Binary(r) | Response::Plain(r) => r.protocol.http.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaResponse {
    pub schema: Schema,
    #[serde(default)]
    pub protocol: ResponseProtocol,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlainResponse {
    #[serde(default)]
    pub protocol: ResponseProtocol,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResponseProtocol {
    pub http: Option<HttpResponse>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    #[serde(default)]
    pub status_codes: Vec<String>,
    pub known_media_type: Option<KnownMediaType>,
    pub media_types: Option<Vec<String>>,
    #[serde(default)]
    pub headers: Vec<HttpHeader>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpHeader {
    pub header: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ImplementationLocation {
    Method,
    Client,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(default)]
    pub language: Languages,
    pub schema: Schema,
    pub required: Option<bool>,
    pub nullable: Option<bool>,
    pub implementation: Option<ImplementationLocation>,
    #[serde(default)]
    pub protocol: ParameterProtocol,
    pub extensions: Option<Extensions>,
    pub client_default_value: Option<serde_yaml::Value>,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.language.default.name
    }

    pub fn serialized_name(&self) -> &str {
        self.language
            .default
            .serialized_name
            .as_deref()
            .unwrap_or_else(|| self.name())
    }

    pub fn description(&self) -> Option<&str> {
        self.language.default.description.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(false)
    }

    pub fn is_client_scoped(&self) -> bool {
        self.implementation == Some(ImplementationLocation::Client)
    }

    pub fn skip_url_encoding(&self) -> bool {
        extension_bool(&self.extensions, "x-ms-skip-url-encoding")
    }

    pub fn http(&self) -> Option<&HttpParameter> {
        self.protocol.http.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParameterProtocol {
    pub http: Option<HttpParameter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpParameter {
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Declared query serialization style; validated by the builder.
    pub style: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Uri,
    Path,
    Query,
    Header,
    Body,
}

pub(crate) fn extension_bool(extensions: &Option<Extensions>, key: &str) -> bool {
    extensions
        .as_ref()
        .and_then(|e| e.get(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

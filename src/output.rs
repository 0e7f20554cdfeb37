//! The emission-ready output model.
//!
//! Constructed once per build and immutable afterwards. Ownership is
//! tree-shaped with one exception: a client's methods live in an arena
//! (`Client::methods`) and `Paging` refers into it by `MethodId`, so a
//! shared next-page method is an alias, never a copy.

use serde::Serialize;

use crate::model::HttpMethod;
use crate::serialization::SerializationNode;
use crate::types::{Constant, TypeReference};

#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub name: String,
    pub description: String,
    /// Client-level parameters, required-first.
    pub parameters: Vec<Parameter>,
    /// Method arena; `Paging` and callers refer into it by `MethodId`.
    pub methods: Vec<Method>,
    pub paging: Vec<Paging>,
}

impl Client {
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Index of a method within its client's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MethodId(pub usize);

#[derive(Debug, Clone, Serialize)]
pub struct Method {
    pub name: String,
    pub description: String,
    pub request: Request,
    /// Formal parameters, required-first, source order within each
    /// partition.
    pub parameters: Vec<Parameter>,
    pub response: Response,
    /// Diagnostic scope name, `<Client>.<Method>`.
    pub diagnostics: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
    pub default_value: Option<Constant>,
    pub required: bool,
}

/// Either a formal parameter reference or a folded literal.
#[derive(Debug, Clone, Serialize)]
pub enum ParameterOrConstant {
    Parameter(Parameter),
    Constant(Constant),
}

impl ParameterOrConstant {
    pub fn is_constant(&self) -> bool {
        matches!(self, ParameterOrConstant::Constant(_))
    }

    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            ParameterOrConstant::Parameter(p) => Some(&p.name),
            ParameterOrConstant::Constant(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub http_method: HttpMethod,
    /// Host-level URI template segments.
    pub host_segments: Vec<PathSegment>,
    /// Path-level template segments.
    pub path_segments: Vec<PathSegment>,
    pub query: Vec<QueryParameter>,
    pub headers: Vec<RequestHeader>,
    pub body: Option<RequestBody>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathSegment {
    pub value: ParameterOrConstant,
    pub escape: bool,
    pub format: SerializationFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryParameter {
    pub name: String,
    pub value: ParameterOrConstant,
    pub style: QuerySerializationStyle,
    pub escape: bool,
    pub format: SerializationFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuerySerializationStyle {
    Simple,
    CommaDelimited,
    PipeDelimited,
    SpaceDelimited,
    TabDelimited,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestHeader {
    pub name: String,
    pub value: ParameterOrConstant,
    pub format: SerializationFormat,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub value: ParameterOrConstant,
    pub serialization: SerializationNode,
}

/// Wire encoding annotation for a single primitive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum SerializationFormat {
    #[default]
    Default,
    DateTimeIso8601,
    DateTimeRfc1123,
    Date,
    DurationIso8601,
    Base64,
    Base64Url,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub body: Option<ResponseBody>,
    pub status_codes: Vec<u16>,
    pub headers: Option<ResponseHeaderGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub enum ResponseBody {
    /// A deserializable body with its serialization tree.
    Object {
        #[serde(rename = "type")]
        type_ref: TypeReference,
        serialization: SerializationNode,
    },
    /// An opaque stream body.
    Stream,
}

/// Synthesized `<OperationName>Headers` type collecting the response
/// headers of one operation.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseHeaderGroup {
    pub name: String,
    pub description: String,
    pub headers: Vec<ResponseHeader>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseHeader {
    pub name: String,
    pub serialized_name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeReference,
}

#[derive(Debug, Clone, Serialize)]
pub struct Paging {
    /// The page-returning method.
    pub method: MethodId,
    /// Continuation method; either an alias of an existing sibling or a
    /// synthesized next-page method appended to the arena.
    pub next_page_method: MethodId,
    pub name: String,
    pub next_link_name: Option<String>,
    pub item_name: String,
    pub item_type: TypeReference,
}

/// The whole build result: one client per operation group.
#[derive(Debug, Clone, Serialize)]
pub struct OutputModel {
    pub clients: Vec<Client>,
}

//! Per-operation-group lowering: one operation group in, one fully
//! resolved `Client` out.
//!
//! Operations are lowered in declared order; pagination is resolved
//! only after every operation in the group has been built, because a
//! pagination marker may alias an already-built sibling method.

use indexmap::IndexMap;
use tracing::debug;

use crate::model::{
    HttpResponse, Operation, OperationGroup, PageableExtension, Parameter as IrParameter,
    ParameterLocation, Schema,
};
use crate::output::{
    Client, Method, MethodId, Paging, Parameter, ParameterOrConstant, PathSegment, QueryParameter,
    QuerySerializationStyle, Request, RequestBody, RequestHeader, Response, ResponseBody,
    ResponseHeader, ResponseHeaderGroup, SerializationFormat,
};
use crate::serialization::{self, serialization_format, WireFormat};
use crate::types::{
    create_type, default_constant, parse_constant, string_constant, PrimitiveType, TypeReference,
};
use crate::{Error, Result};

const NEXT_LINK_PARAMETER: &str = "nextLink";
const DEFAULT_ITEM_NAME: &str = "value";

/// Converts camelCase to PascalCase
/// Example: "createRole" -> "CreateRole", "listRoles" -> "ListRoles", "listRoles-Input" -> "ListRolesInput"
pub fn to_pascal_case(input: &str) -> String {
    input
        .split(&['-', '_'][..])
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut chars = s.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<String>()
}

/// Builds the client for one operation group.
pub fn build_client(group: &OperationGroup) -> Result<Client> {
    let client_name = to_pascal_case(group.name());
    debug!(client = %client_name, operations = group.operations.len(), "building client");

    // Deduplication by name, last write wins: the same client parameter
    // may arrive once per operation in the upstream model.
    let mut client_parameters: IndexMap<String, Parameter> = IndexMap::new();
    for operation in &group.operations {
        for parameter in &operation.request.parameters {
            if parameter.is_client_scoped() {
                client_parameters.insert(parameter.name().to_string(), build_parameter(parameter)?);
            }
        }
    }

    struct ProcessedOperation<'a> {
        operation: &'a Operation,
        method_id: MethodId,
    }

    let mut methods: Vec<Method> = Vec::new();
    let mut processed: IndexMap<String, ProcessedOperation> = IndexMap::new();
    for operation in &group.operations {
        let method = build_method(operation, &client_name, &client_parameters)?;
        let method_id = MethodId(methods.len());
        methods.push(method);
        processed.insert(
            operation.name().to_string(),
            ProcessedOperation { operation, method_id },
        );
    }

    let mut paging: Vec<Paging> = Vec::new();
    for (operation_name, entry) in &processed {
        let Some(pageable) = entry.operation.pageable() else {
            continue;
        };
        debug!(operation = %operation_name, "resolving pagination");

        // The marker's operationName is assumed to live in this group;
        // the group prefix, if any, is dropped before the lookup.
        let sibling = pageable
            .operation_name
            .as_deref()
            .map(|full| full.rsplit('_').next().unwrap_or(full));
        let next_page_method = match sibling {
            Some(sibling_name) => match processed.get(sibling_name) {
                Some(next) => next.method_id,
                None => {
                    return Err(Error::UnknownPagingOperation {
                        group: client_name.clone(),
                        operation: operation_name.clone(),
                        next_name: pageable.operation_name.clone().unwrap_or_default(),
                    })
                }
            },
            None => {
                // No sibling named: synthesize a next-page method from
                // the original and append it to the arena.
                let synthesized = build_next_page_method(&methods[entry.method_id.0]);
                let id = MethodId(methods.len());
                methods.push(synthesized);
                id
            }
        };

        paging.push(build_paging(
            entry.operation,
            entry.method_id,
            next_page_method,
            &pageable,
            &methods,
        )?);
    }

    Ok(Client {
        name: client_name,
        description: group
            .language
            .default
            .description
            .clone()
            .unwrap_or_default(),
        parameters: order_parameters(client_parameters.into_values().collect()),
        methods,
        paging,
    })
}

/// Required parameters first; source order preserved within each
/// partition (the sort is stable).
fn order_parameters(mut parameters: Vec<Parameter>) -> Vec<Parameter> {
    parameters.sort_by_key(|p| p.default_value.is_some());
    parameters
}

fn build_parameter(parameter: &IrParameter) -> Result<Parameter> {
    let description = match parameter.description() {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => format!("The {} to use.", parameter.schema.name()),
    };
    Ok(Parameter {
        name: parameter.name().to_string(),
        description,
        type_ref: create_type(&parameter.schema, parameter.is_nullable())?,
        default_value: default_constant(parameter)?,
        required: parameter.is_required(),
    })
}

fn build_method(
    operation: &Operation,
    client_name: &str,
    client_parameters: &IndexMap<String, Parameter>,
) -> Result<Method> {
    let operation_name = operation.name();
    let http = operation
        .request
        .protocol
        .http
        .as_ref()
        .ok_or_else(|| Error::MissingHttpProtocol(operation_name.to_string(), "request"))?;
    // Only the first declared response is modeled.
    let response = operation
        .responses
        .first()
        .ok_or_else(|| Error::MissingHttpProtocol(operation_name.to_string(), "response"))?;
    let http_response = response
        .http()
        .ok_or_else(|| Error::MissingHttpProtocol(operation_name.to_string(), "response"))?;

    let mut uri_parameters: IndexMap<String, PathSegment> = IndexMap::new();
    let mut path_parameters: IndexMap<String, PathSegment> = IndexMap::new();
    let mut query: Vec<QueryParameter> = Vec::new();
    let mut headers: Vec<RequestHeader> = Vec::new();
    let mut method_parameters: Vec<Parameter> = Vec::new();
    let mut body: Option<RequestBody> = None;

    for parameter in &operation.request.parameters {
        let name = parameter.name();
        let serialized_name = parameter.serialized_name().to_string();
        let mut value_schema = &parameter.schema;

        let value = if parameter.is_client_scoped() {
            let built = match client_parameters.get(name) {
                Some(client_parameter) => client_parameter.clone(),
                None => build_parameter(parameter)?,
            };
            ParameterOrConstant::Parameter(built)
        } else {
            match &parameter.schema {
                Schema::Constant(constant) => {
                    // Folded to a literal; not part of the formal list.
                    value_schema = &*constant.value_type;
                    ParameterOrConstant::Constant(parse_constant(constant)?)
                }
                // Binary bodies are opaque; no parameter is synthesized.
                Schema::Binary(_) => continue,
                _ => {
                    let built = build_parameter(parameter)?;
                    method_parameters.push(built.clone());
                    ParameterOrConstant::Parameter(built)
                }
            }
        };

        let Some(http_parameter) = parameter.http() else {
            continue;
        };
        let format = serialization_format(value_schema);
        let mut skip_encoding = parameter.skip_url_encoding();
        match http_parameter.location {
            ParameterLocation::Header => headers.push(RequestHeader {
                name: serialized_name,
                value,
                format,
            }),
            ParameterLocation::Query => query.push(QueryParameter {
                name: serialized_name,
                style: query_style(http_parameter.style.as_deref(), value_schema, name)?,
                escape: !skip_encoding,
                value,
                format,
            }),
            ParameterLocation::Path => {
                path_parameters.insert(
                    serialized_name,
                    PathSegment {
                        value,
                        escape: !skip_encoding,
                        format,
                    },
                );
            }
            ParameterLocation::Body => {
                let wire_format = http
                    .known_media_type
                    .map(WireFormat::from_media_type)
                    .unwrap_or(WireFormat::Json);
                let serialization =
                    serialization::build(wire_format, &parameter.schema, parameter.is_nullable())?;
                body = Some(RequestBody { value, serialization });
            }
            ParameterLocation::Uri => {
                // The $host parameter is never URL-encoded.
                if name == "$host" {
                    skip_encoding = true;
                }
                uri_parameters.insert(
                    name.to_string(),
                    PathSegment {
                        value,
                        escape: !skip_encoding,
                        format,
                    },
                );
            }
        }
    }

    // One constant Content-Type header per declared body media type.
    if http.has_body() {
        for media_type in http.media_types.as_deref().unwrap_or(&[]) {
            headers.push(RequestHeader {
                name: "Content-Type".to_string(),
                value: ParameterOrConstant::Constant(string_constant(media_type)),
                format: SerializationFormat::Default,
            });
        }
    }

    let request = Request {
        http_method: http.method,
        host_segments: to_path_segments(&http.uri, &uri_parameters, operation_name)?,
        path_segments: to_path_segments(&http.path, &path_parameters, operation_name)?,
        query,
        headers,
        body,
    };

    let response_body = match response {
        crate::model::Response::Schema(schema_response) => {
            let schema = match &schema_response.schema {
                Schema::Constant(constant) => &*constant.value_type,
                other => other,
            };
            let wire_format = http_response
                .known_media_type
                .map(WireFormat::from_media_type)
                .unwrap_or(WireFormat::Json);
            Some(ResponseBody::Object {
                type_ref: create_type(schema, false)?,
                serialization: serialization::build(wire_format, schema, false)?,
            })
        }
        crate::model::Response::Binary(_) => Some(ResponseBody::Stream),
        crate::model::Response::Plain(_) => None,
    };

    let status_codes = http_response
        .status_codes
        .iter()
        .map(|code| {
            code.trim_start_matches('_')
                .parse::<u16>()
                .map_err(|_| Error::InvalidStatusCode {
                    operation: operation_name.to_string(),
                    code: code.clone(),
                })
        })
        .collect::<Result<Vec<u16>>>()?;

    let method_name = to_pascal_case(operation_name);
    let diagnostics = format!("{client_name}.{method_name}");
    Ok(Method {
        name: method_name,
        description: operation.description().to_string(),
        request,
        parameters: order_parameters(method_parameters),
        response: Response {
            body: response_body,
            status_codes,
            headers: build_response_headers(operation, http_response)?,
        },
        diagnostics,
    })
}

/// Derives the synthetic continuation method: a single unencoded
/// host-level segment carrying the next-link URL, the original header
/// parameters, and the original response reused unchanged.
fn build_next_page_method(method: &Method) -> Method {
    let next_link = Parameter {
        name: NEXT_LINK_PARAMETER.to_string(),
        description: "The URL to the next page of results.".to_string(),
        type_ref: TypeReference::primitive(PrimitiveType::String),
        default_value: None,
        required: true,
    };

    let header_parameter_names: Vec<&str> = method
        .request
        .headers
        .iter()
        .filter_map(|h| h.value.parameter_name())
        .collect();
    let parameters: Vec<Parameter> = method
        .parameters
        .iter()
        .filter(|p| header_parameter_names.contains(&p.name.as_str()))
        .cloned()
        .chain(std::iter::once(next_link.clone()))
        .collect();

    let request = Request {
        http_method: method.request.http_method,
        host_segments: vec![PathSegment {
            value: ParameterOrConstant::Parameter(next_link),
            escape: false,
            format: SerializationFormat::Default,
        }],
        path_segments: Vec::new(),
        query: Vec::new(),
        headers: method.request.headers.clone(),
        body: None,
    };

    Method {
        name: format!("{}NextPage", method.name),
        description: method.description.clone(),
        request,
        parameters,
        response: method.response.clone(),
        diagnostics: method.diagnostics.clone(),
    }
}

fn build_paging(
    operation: &Operation,
    method_id: MethodId,
    next_page_method: MethodId,
    pageable: &PageableExtension,
    methods: &[Method],
) -> Result<Paging> {
    let method = &methods[method_id.0];

    // The response object schema, for mapping the marker's wire names
    // onto declared property names.
    let response_schema = match operation.responses.first() {
        Some(crate::model::Response::Schema(schema_response)) => match &schema_response.schema {
            Schema::Object(object) => Some(object),
            _ => None,
        },
        _ => None,
    };

    let find_by_wire_name = |wire_name: Option<&str>| {
        let wire_name = wire_name?;
        response_schema?
            .properties
            .iter()
            .find(|p| p.wire_name() == wire_name)
    };

    let item_name = find_by_wire_name(pageable.item_name.as_deref())
        .map(|p| p.name().to_string())
        .or_else(|| pageable.item_name.clone())
        .unwrap_or_else(|| DEFAULT_ITEM_NAME.to_string());
    let next_link_name = find_by_wire_name(pageable.next_link_name.as_deref())
        .map(|p| p.name().to_string())
        .or_else(|| pageable.next_link_name.clone());

    // The element type comes from the array-typed property matching the
    // resolved item name; unresolved falls back to an untyped element.
    let item_element = response_schema
        .and_then(|o| o.properties.iter().find(|p| p.name() == item_name))
        .and_then(|p| match &p.schema {
            Schema::Array(array) => Some(&array.element_type),
            _ => None,
        });
    let item_type = match item_element {
        Some(element) => create_type(element, false)?,
        None => TypeReference::primitive(PrimitiveType::Any),
    };

    Ok(Paging {
        method: method_id,
        next_page_method,
        name: format!("{}Pageable", method.name),
        next_link_name,
        item_name,
        item_type,
    })
}

fn build_response_headers(
    operation: &Operation,
    http_response: &HttpResponse,
) -> Result<Option<ResponseHeaderGroup>> {
    if http_response.headers.is_empty() {
        return Ok(None);
    }

    let operation_name = to_pascal_case(operation.name());
    let mut headers = Vec::with_capacity(http_response.headers.len());
    for header in &http_response.headers {
        headers.push(ResponseHeader {
            name: to_pascal_case(&header.header),
            serialized_name: header.header.clone(),
            // Headers are always optional on read.
            type_ref: create_type(&header.schema, true)?,
        });
    }

    Ok(Some(ResponseHeaderGroup {
        name: format!("{operation_name}Headers"),
        description: format!("Header model for {operation_name}"),
        headers,
    }))
}

fn query_style(
    declared: Option<&str>,
    value_schema: &Schema,
    parameter_name: &str,
) -> Result<QuerySerializationStyle> {
    match declared {
        None | Some("form") => Ok(if matches!(value_schema, Schema::Array(_)) {
            QuerySerializationStyle::CommaDelimited
        } else {
            QuerySerializationStyle::Simple
        }),
        Some("pipeDelimited") => Ok(QuerySerializationStyle::PipeDelimited),
        Some("spaceDelimited") => Ok(QuerySerializationStyle::SpaceDelimited),
        Some("tabDelimited") => Ok(QuerySerializationStyle::TabDelimited),
        Some(other) => Err(Error::UnsupportedQueryStyle {
            parameter: parameter_name.to_string(),
            style: other.to_string(),
        }),
    }
}

/// Splits a URI template into literal and `{parameter}` segments,
/// substituting built segments for parameter references.
fn to_path_segments(
    template: &str,
    parameters: &IndexMap<String, PathSegment>,
    operation_name: &str,
) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    for part in parse_uri_template(template) {
        match part {
            TemplatePart::Literal(text) => segments.push(PathSegment {
                value: ParameterOrConstant::Constant(string_constant(text)),
                escape: false,
                format: SerializationFormat::Default,
            }),
            TemplatePart::Reference(name) => match parameters.get(name) {
                Some(segment) => segments.push(segment.clone()),
                None => {
                    return Err(Error::UnresolvedTemplateParameter {
                        operation: operation_name.to_string(),
                        name: name.to_string(),
                    })
                }
            },
        }
    }
    Ok(segments)
}

enum TemplatePart<'a> {
    Literal(&'a str),
    Reference(&'a str),
}

fn parse_uri_template(template: &str) -> Vec<TemplatePart<'_>> {
    let mut parts = Vec::new();
    let mut rest = template;
    while !rest.is_empty() {
        match rest.find('{') {
            Some(open) => {
                if open > 0 {
                    parts.push(TemplatePart::Literal(&rest[..open]));
                }
                let after = &rest[open + 1..];
                match after.find('}') {
                    Some(close) => {
                        parts.push(TemplatePart::Reference(&after[..close]));
                        rest = &after[close + 1..];
                    }
                    None => {
                        // Unterminated brace: treat the remainder as literal.
                        parts.push(TemplatePart::Literal(rest));
                        break;
                    }
                }
            }
            None => {
                parts.push(TemplatePart::Literal(rest));
                break;
            }
        }
    }
    parts
}

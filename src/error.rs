use thiserror::Error;

/// Build errors. Every variant is fatal to the current build: the output
/// model is either fully produced or discarded.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The document references a tag that is not in the tag registry.
    /// Indicates a version mismatch between the code-model producer and
    /// this tool.
    #[error("unregistered code-model tag !{0}")]
    UnknownTag(String),

    /// A schema variant with no defined lowering reached the type
    /// resolver or serialization builder.
    #[error("unsupported schema variant {variant} for schema {name}")]
    UnsupportedSchema { name: String, variant: &'static str },

    /// A request or response is missing its HTTP protocol details.
    #[error("operation {0} has no HTTP protocol details on its {1}")]
    MissingHttpProtocol(String, &'static str),

    #[error("invalid status code {code} on operation {operation}")]
    InvalidStatusCode { operation: String, code: String },

    #[error("invalid constant value for schema {name}: {message}")]
    InvalidConstant { name: String, message: String },

    #[error("URI template parameter {{{name}}} on operation {operation} has no matching request parameter")]
    UnresolvedTemplateParameter { operation: String, name: String },

    /// A pagination marker names a sibling operation that does not exist
    /// within the same operation group.
    #[error("the x-ms-pageable operationName \"{next_name}\" for operation {group}.{operation} was not found")]
    UnknownPagingOperation {
        group: String,
        operation: String,
        next_name: String,
    },

    #[error("unsupported query serialization style {style} on parameter {parameter}")]
    UnsupportedQueryStyle { parameter: String, style: String },
}

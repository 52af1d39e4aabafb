/// Top-level Ariadne error type.
///
/// All fallible operations in `ariadne-core` return [`Result<T, AriadneError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum AriadneError {
    /// Error from the canvas store or its persistence layer.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error communicating with the text-generation endpoint.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Error producing an export artifact (Markdown, HTML, project file).
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Error reading a project file back into the store.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Caller supplied input the operation cannot accept (e.g. a blank prompt).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A follow-up was requested without an active text selection.
    #[error("No active selection to follow up on")]
    NoActiveSelection,
}

/// Errors from the canvas store and snapshot persistence.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A referenced node was not found in the store.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Filesystem I/O error reading or writing the snapshot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization of the snapshot failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the text-generation endpoint.
#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    /// Network-level failure connecting to or reading from the endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint returned a non-success HTTP status.
    #[error("API error (HTTP {status}): {message}")]
    ApiError {
        /// HTTP status code from the endpoint.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The response carried no body to stream from.
    #[error("No response body")]
    MissingBody,

    /// LLM configuration is missing or invalid (API key, model, etc.).
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors while exporting the canvas.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    /// There is nothing on the canvas to export.
    #[error("No nodes to export")]
    Empty,

    /// Serializing embedded data failed.
    #[error("Template error: {0}")]
    Template(String),

    /// Filesystem I/O error writing the artifact.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while importing a project file. Raised before any store mutation.
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    /// The file does not carry a recognised project extension.
    #[error("Unsupported file type: {0} (expected .ariadne or .json)")]
    UnsupportedExtension(String),

    /// The file is not valid JSON or does not match the project shape.
    #[error("Invalid project file: {0}")]
    InvalidJson(String),

    /// A required top-level key is absent.
    #[error("Invalid project file: missing `{0}`")]
    MissingKey(&'static str),

    /// Filesystem I/O error reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors in Ariadne configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, AriadneError>`.
pub type Result<T> = std::result::Result<T, AriadneError>;

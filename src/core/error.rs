use thiserror::Error;

#[derive(Error, Debug)]
pub enum IamDriftError {
    #[error("Missing principal identity: {0}")]
    MissingPrincipal(String),

    #[error("Invalid principal name: {0}")]
    InvalidPrincipalName(String),

    #[error("Invalid principal type: {0} (must be one of User, Group, Role)")]
    InvalidPrincipalType(String),

    #[error("Invalid resource scope: {0} (must be one of AllResources, Mixed, Scoped)")]
    InvalidResourceScope(String),

    #[error("Duplicate matrix key: {0}")]
    DuplicateMatrixKey(String),

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Missing column in {collection}: {column}")]
    MissingColumn { collection: String, column: String },

    #[error("Record collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Invalid record collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, IamDriftError>;

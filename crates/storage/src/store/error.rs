#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    UnknownNode,
    NodeNotPersisted,
    MoveIntoSelf,
    ScopeMismatch { expected: String, actual: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::UnknownNode => write!(f, "unknown node"),
            Self::NodeNotPersisted => write!(f, "node has no assigned bounds yet"),
            Self::MoveIntoSelf => write!(f, "cannot move a node into its own subtree"),
            Self::ScopeMismatch { expected, actual } => write!(
                f,
                "scope mismatch (expected={expected}, actual={actual})"
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

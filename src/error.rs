use crate::size::SizeParseError;

/// A persisted layout that cannot be turned into a tree.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed layout config: {0}")]
    Malformed(String),

    #[error("a stack may only contain components, found {found}")]
    NonComponentInStack { found: &'static str },

    #[error("a component cannot have children")]
    ComponentWithContent,

    #[error("a {0} item cannot appear here")]
    UnexpectedItem(&'static str),

    #[error("component type is missing")]
    MissingComponentType,

    #[error("no component registered for type {0}")]
    UnregisteredComponentType(String),
}

/// Everything a layout operation can fail with.
///
/// Invariant violations inside the tree are not represented here: they are
/// programming errors and panic.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    SizeParse(#[from] SizeParseError),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("no location selector resolved to a valid insertion point")]
    NoValidLocation,

    #[error("popout window was blocked")]
    PopoutBlocked,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LayoutError {
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

use thiserror::Error;

/// Structural errors raised while assembling or laying out a screen.
///
/// These indicate a mistake in screen assembly and are never recovered from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{0} cannot hold more than one child")]
    TooManyChildren(&'static str),

    #[error("wrong child type: {0}")]
    WrongChildType(String),

    #[error("relative sizing needs a parent extent to resolve against")]
    MissingParentContext,

    #[error("the root layout must use absolute, non-negative sizing")]
    InvalidRootSizing,

    #[error("{0} widgets cannot have children")]
    LeafNodeViolation(&'static str),

    #[error("node {0} does not exist in this screen")]
    UnknownNode(String),

    #[error("expected a {expected} widget, found {found}")]
    WidgetMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("no control named {0:?}")]
    UnknownControl(String),
}

pub type LayoutResult<T> = std::result::Result<T, LayoutError>;

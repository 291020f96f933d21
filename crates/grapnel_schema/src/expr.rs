//! Type expressions: a base type name annotated with list/non-null wrappers.

/// A type reference with wrapper metadata, e.g. `[String!]!`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// A bare named type: `Int`.
    Named(String),
    /// A list wrapper: `[T]`.
    List(Box<TypeExpr>),
    /// A non-null wrapper: `T!`.
    NonNull(Box<TypeExpr>),
}

impl TypeExpr {
    /// Creates a named type expression.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wraps this expression in a list.
    #[must_use]
    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    /// Wraps this expression in a non-null.
    #[must_use]
    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    /// The innermost type name.
    #[must_use]
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }

    /// True if the outermost wrapper is non-null.
    #[must_use]
    pub fn is_required(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// True if the expression has a list wrapper at any level.
    #[must_use]
    pub fn is_list(&self) -> bool {
        match self {
            Self::Named(_) => false,
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
        }
    }

    /// Strips one non-null wrapper, if present.
    #[must_use]
    pub fn unwrap_non_null(&self) -> &TypeExpr {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Number of list wrappers in the expression.
    #[must_use]
    pub fn list_depth(&self) -> usize {
        match self {
            Self::Named(_) => 0,
            Self::List(inner) => 1 + inner.list_depth(),
            Self::NonNull(inner) => inner.list_depth(),
        }
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

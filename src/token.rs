use std::any::TypeId;
use std::fmt;
use uuid::Uuid;

/// Injection key used to look up a provider.
///
/// A token is either a concrete Rust type, a plain string name, or an
/// opaque symbol. Type tokens are what most providers use; string tokens
/// cover configuration-style values shared across crates; symbol tokens
/// are collision-free by construction and are the only safe choice for
/// values exported from global modules.
///
/// # Example
/// ```
/// use cadre::token::Token;
///
/// struct UserService;
///
/// let by_type = Token::of::<UserService>();
/// let by_name = Token::name("DATABASE_URL");
/// let by_symbol = Token::symbol("CONFIG");
///
/// assert_ne!(by_name, by_symbol);
/// assert_eq!(by_type, Token::of::<UserService>());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A concrete type, identified by its `TypeId`.
    Type { id: TypeId, name: &'static str },
    /// A plain string name. Uniqueness is the caller's responsibility.
    Name(String),
    /// An opaque symbol. Two symbols are never equal unless cloned.
    Symbol { id: Uuid, label: String },
}

impl Token {
    /// Token for a concrete type.
    pub fn of<T: 'static>() -> Self {
        Token::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Token for a string name.
    pub fn name(name: impl Into<String>) -> Self {
        Token::Name(name.into())
    }

    /// A fresh symbol token. The label is for diagnostics only; identity
    /// comes from the generated id.
    pub fn symbol(label: impl Into<String>) -> Self {
        Token::Symbol {
            id: Uuid::new_v4(),
            label: label.into(),
        }
    }

    /// Whether this token can collide with an independently created one.
    ///
    /// Symbol tokens cannot; type and name tokens can.
    pub fn is_collision_free(&self) -> bool {
        matches!(self, Token::Symbol { .. })
    }

    /// Short human-readable form used in error messages and logs.
    pub fn label(&self) -> &str {
        match self {
            Token::Type { name, .. } => name,
            Token::Name(name) => name,
            Token::Symbol { label, .. } => label,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Type { name, .. } => write!(f, "{name}"),
            Token::Name(name) => write!(f, "{name}"),
            Token::Symbol { label, id } => write!(f, "Symbol({label}:{id})"),
        }
    }
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Token::name(name)
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Token::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ServiceA;

    #[test]
    fn type_tokens_are_stable() {
        assert_eq!(Token::of::<ServiceA>(), Token::of::<ServiceA>());
    }

    #[test]
    fn name_tokens_compare_by_value() {
        assert_eq!(Token::name("CONFIG"), Token::name("CONFIG"));
        assert_ne!(Token::name("CONFIG"), Token::name("OTHER"));
    }

    #[test]
    fn symbol_tokens_never_collide() {
        let a = Token::symbol("CONFIG");
        let b = Token::symbol("CONFIG");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(a.is_collision_free());
    }
}

//! Type representation for grammar return types.
//!
//! The lattice is a small closed set of constructors over the target
//! language's types: the generic `Object`, the single input character, the
//! captured input range, lists, optionals, user-declared types, and the
//! phantom self type a rule carries while its own type is being resolved.

use std::fmt;

/// Return type of a grammar node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// The generic fallback: predicates, disagreeing alternatives.
    Object,
    /// A single input character (`char`).
    Char,
    /// A captured slice of the input (`CharSequence`).
    Range,
    /// `List<T>`, with `T` boxed.
    List(Box<Ty>),
    /// An optional value: the boxed form of `T`, where absence is `null`.
    Option(Box<Ty>),
    /// A type spelled by the grammar author (`@Return`) or the configured
    /// default, passed through verbatim.
    Named(String),
    /// Phantom self type of a rule whose own type is still being computed.
    Rec(String),
}

/// Primitive types of the target language and their boxed classes.
const PRIMITIVES: &[(&str, &str)] = &[
    ("boolean", "Boolean"),
    ("char", "Character"),
    ("void", "Void"),
    ("byte", "Byte"),
    ("short", "Short"),
    ("int", "Integer"),
    ("long", "Long"),
    ("float", "Float"),
    ("double", "Double"),
];

/// The boxed class for a primitive type name, if it is one.
pub fn boxed_name(name: &str) -> Option<&'static str> {
    PRIMITIVES
        .iter()
        .find(|(prim, _)| *prim == name)
        .map(|(_, boxed)| *boxed)
}

impl Ty {
    /// Type of predicates: they never contribute a value.
    pub fn none() -> Ty {
        Ty::Object
    }

    pub fn list(elem: Ty) -> Ty {
        Ty::List(Box::new(elem))
    }

    pub fn option(inner: Ty) -> Ty {
        Ty::Option(Box::new(inner))
    }

    /// Union of alternatives: the shared type when all agree, else `Object`.
    pub fn union(types: impl IntoIterator<Item = Ty>) -> Ty {
        let mut iter = types.into_iter();
        let Some(first) = iter.next() else {
            return Ty::Object;
        };
        iter.fold(first, |acc, t| if acc == t { acc } else { Ty::Object })
    }

    /// A positional bundle of element results, encoded as a list of the
    /// union of the element types.
    pub fn tuple(types: impl IntoIterator<Item = Ty>) -> Ty {
        Ty::list(Ty::union(types))
    }

    /// Parse a type name given by an annotation or option.
    pub fn from_name(name: &str) -> Ty {
        match name.trim() {
            "Object" => Ty::Object,
            "char" => Ty::Char,
            "CharSequence" => Ty::Range,
            other => Ty::Named(other.to_string()),
        }
    }

    /// Whether a phantom self type occurs anywhere inside this type.
    pub fn has_rec(&self) -> bool {
        match self {
            Ty::Rec(_) => true,
            Ty::List(t) | Ty::Option(t) => t.has_rec(),
            Ty::Object | Ty::Char | Ty::Range | Ty::Named(_) => false,
        }
    }

    /// Whether values of this type are primitives in the target language.
    pub fn is_primitive(&self) -> bool {
        match self {
            Ty::Char => true,
            Ty::Named(n) => boxed_name(n).is_some(),
            _ => false,
        }
    }

    /// Spell the type, passing every runtime class name through `resolve`.
    ///
    /// `resolve` maps a short class name (`Object`, `List`, `Character`, ...)
    /// to the spelling used in the output, e.g. its fully qualified name.
    /// User-declared names are emitted verbatim. A phantom self type left
    /// after the fixpoint is spelled as `Object`.
    pub fn render_with(&self, resolve: &dyn Fn(&str) -> String) -> String {
        match self {
            Ty::Object | Ty::Rec(_) => resolve("Object"),
            Ty::Char => "char".to_string(),
            Ty::Range => resolve("CharSequence"),
            Ty::Named(n) => n.clone(),
            Ty::List(elem) => format!("{}<{}>", resolve("List"), elem.render_boxed(resolve)),
            Ty::Option(inner) => inner.render_boxed(resolve),
        }
    }

    /// Like [`Ty::render_with`], but primitives become their boxed class.
    pub fn render_boxed(&self, resolve: &dyn Fn(&str) -> String) -> String {
        match self {
            Ty::Char => resolve("Character"),
            Ty::Named(n) => match boxed_name(n) {
                Some(boxed) => resolve(boxed),
                None => n.clone(),
            },
            other => other.render_with(resolve),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Rec(name) => write!(f, "?{}", name),
            other => write!(f, "{}", other.render_with(&|s| s.to_string())),
        }
    }
}

//! Spelling of runtime class names.
//!
//! Generated code refers to library and runtime classes by their short name
//! and declares an import list, or spells every class fully qualified when
//! `use-fully-qualified-names` is set. Every class the generator may name is
//! listed here; asking for anything else is a generator bug.

use pegj_typeck::Ty;

/// Classes the generated source may reference, in import order.
const CLASSES: &[&str] = &[
    "java.lang.Object",
    "java.lang.Override",
    "java.lang.Number",
    "java.lang.String",
    "java.lang.CharSequence",
    "java.lang.Boolean",
    "java.lang.Character",
    "java.lang.Void",
    "java.lang.Byte",
    "java.lang.Short",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Float",
    "java.lang.Double",
    "java.lang.IllegalAccessException",
    "java.lang.IllegalArgumentException",
    "java.lang.NoSuchMethodException",
    "java.lang.SecurityException",
    "java.lang.reflect.InvocationTargetException",
    "java.lang.reflect.Method",
    "java.nio.ByteBuffer",
    "java.util.List",
    "java.util.regex.Pattern",
    "org.pegjs.java.IBaseParser",
    "org.pegjs.java.IParser",
    "org.pegjs.java.Expected",
    "org.pegjs.java.Position",
    "org.pegjs.java.State",
    "org.pegjs.java.annotations.Rule",
    "org.pegjs.java.annotations.Grammar",
    "org.pegjs.java.exceptions.NoSuchRuleException",
];

fn short_name(full: &str) -> &str {
    full.rsplit('.').next().unwrap_or(full)
}

/// Resolves short class names to the spelling used in the output.
#[derive(Debug, Clone)]
pub struct Imports {
    full_names: bool,
}

impl Imports {
    pub fn new(full_names: bool) -> Self {
        Imports { full_names }
    }

    pub fn uses_full_names(&self) -> bool {
        self.full_names
    }

    /// Spell the class `short`.
    ///
    /// # Panics
    ///
    /// Panics if `short` is not a known runtime class.
    pub fn resolve(&self, short: &str) -> String {
        let Some(full) = CLASSES.iter().find(|full| short_name(full) == short) else {
            panic!("unknown import class with local name \"{}\"", short);
        };
        if self.full_names {
            full.to_string()
        } else {
            short.to_string()
        }
    }

    /// `import ...;` lines for every known class.
    pub fn declarations(&self) -> Vec<String> {
        CLASSES.iter().map(|full| format!("import {};", full)).collect()
    }

    /// Spell a grammar type as a declaration type.
    pub fn render(&self, ty: &Ty) -> String {
        ty.render_with(&|short| self.resolve(short))
    }

    /// Spell a grammar type in boxed form, for type arguments.
    pub fn render_boxed(&self, ty: &Ty) -> String {
        ty.render_boxed(&|short| self.resolve(short))
    }
}

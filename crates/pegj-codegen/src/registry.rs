//! Deduplicating registries.
//!
//! Constants (compiled patterns, expectation descriptors) and hoisted user
//! code are registered while rules are lowered. Registering a value that is
//! already present returns the alias it got the first time, so the output
//! holds one definition per distinct value, numbered by first appearance.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::escape::java_string;

/// Insertion-ordered set with positional aliases.
#[derive(Debug, Clone)]
pub struct Interner<T> {
    entries: Vec<T>,
    index: FxHashMap<T, usize>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Interner {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<T: Clone + Eq + Hash> Interner<T> {
    /// Index of `value`, registering it first if it is new.
    pub fn intern(&mut self, value: T) -> usize {
        if let Some(&index) = self.index.get(&value) {
            return index;
        }
        let index = self.entries.len();
        self.index.insert(value.clone(), index);
        self.entries.push(value);
        index
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with their indices, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.entries.iter().enumerate()
    }
}

// ── Constants ──────────────────────────────────────────────────────────

/// Pool of `private static final` constants keyed by their initializer text.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    prefix: &'static str,
    ty: String,
    values: Interner<String>,
}

impl ConstantPool {
    pub fn new(prefix: &'static str, ty: impl Into<String>) -> Self {
        ConstantPool {
            prefix,
            ty: ty.into(),
            values: Interner::default(),
        }
    }

    /// Alias of the constant initialized with `initializer`.
    pub fn add(&mut self, initializer: String) -> String {
        let index = self.values.intern(initializer);
        format!("{}{}", self.prefix, index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// One declaration per distinct constant.
    pub fn definitions(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(i, init)| {
                format!(
                    "private static final {} {}{} = {};",
                    self.ty, self.prefix, i, init
                )
            })
            .collect()
    }
}

/// Initializer of a compiled-pattern constant. `pattern` is the class name
/// spelling of `java.util.regex.Pattern`.
pub fn pattern_initializer(pattern: &str, source: &str, ignore_case: bool) -> String {
    format!(
        "{p}.compile(\"{src}\", {ci}{p}.DOTALL | {p}.UNICODE_CASE)",
        p = pattern,
        src = java_string(source),
        ci = if ignore_case {
            format!("{}.CASE_INSENSITIVE | ", pattern)
        } else {
            String::new()
        },
    )
}

/// What a failure expectation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    Literal,
    Pattern,
    Rule,
}

impl ExpectedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpectedKind::Literal => "LITERAL",
            ExpectedKind::Pattern => "PATTERN",
            ExpectedKind::Rule => "RULE",
        }
    }
}

/// Initializer of an expectation-descriptor constant. Empty texts are
/// emitted as `null`.
pub fn expected_initializer(
    expected: &str,
    kind: ExpectedKind,
    value: Option<&str>,
    description: Option<&str>,
) -> String {
    let quote = |s: Option<&str>| match s.filter(|s| !s.is_empty()) {
        Some(s) => format!("\"{}\"", java_string(s)),
        None => "null".to_string(),
    };
    format!(
        "new {e}({e}.Type.{kind}, {value}, {description})",
        e = expected,
        kind = kind.as_str(),
        value = quote(value),
        description = quote(description),
    )
}

// ── User code ──────────────────────────────────────────────────────────

/// Argument of a hoisted user-code call: a label bound to a local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    /// Label name, used as the parameter name.
    pub name: String,
    /// Parameter type as spelled in the output.
    pub ty: String,
    /// Local holding the label's value.
    pub local: String,
}

/// A hoisted action or predicate body. Two units are the same when every
/// field matches, parameters compared in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserFn {
    pub namespace: Option<String>,
    pub ty: String,
    pub body: String,
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Predicate,
    Action,
}

impl UnitKind {
    fn prefix(self) -> &'static str {
        match self {
            UnitKind::Predicate => "is",
            UnitKind::Action => "f",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Namespace {
    name: Option<String>,
    initializer: Option<String>,
}

/// Hoisted initializers, predicates and actions of one grammar.
#[derive(Debug, Clone, Default)]
pub struct UserCode {
    namespaces: Vec<Namespace>,
    predicates: Interner<UserFn>,
    actions: Interner<UserFn>,
}

impl UserCode {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace_mut(&mut self, name: Option<&str>) -> &mut Namespace {
        let index = match self
            .namespaces
            .iter()
            .position(|ns| ns.name.as_deref() == name)
        {
            Some(index) => index,
            None => {
                self.namespaces.push(Namespace {
                    name: name.map(str::to_string),
                    initializer: None,
                });
                self.namespaces.len() - 1
            }
        };
        &mut self.namespaces[index]
    }

    /// Set the initializer of a namespace. A later initializer for the same
    /// namespace replaces the earlier one.
    pub fn add_initializer(&mut self, namespace: Option<&str>, code: &str) {
        self.namespace_mut(namespace).initializer = Some(code.to_string());
    }

    /// Register a boolean predicate and return its call expression.
    pub fn add_predicate(&mut self, namespace: Option<&str>, code: &str, args: &[Arg]) -> String {
        self.add(UnitKind::Predicate, namespace, code, "boolean", args)
    }

    /// Register an action returning `ty` and return its call expression.
    pub fn add_action(
        &mut self,
        namespace: Option<&str>,
        code: &str,
        ty: &str,
        args: &[Arg],
    ) -> String {
        self.add(UnitKind::Action, namespace, code, ty, args)
    }

    fn add(
        &mut self,
        kind: UnitKind,
        namespace: Option<&str>,
        code: &str,
        ty: &str,
        args: &[Arg],
    ) -> String {
        self.namespace_mut(namespace);
        let unit = UserFn {
            namespace: namespace.map(str::to_string),
            ty: ty.to_string(),
            body: code.to_string(),
            params: args.iter().map(|a| (a.name.clone(), a.ty.clone())).collect(),
        };
        let index = match kind {
            UnitKind::Predicate => self.predicates.intern(unit),
            UnitKind::Action => self.actions.intern(unit),
        };
        let args: Vec<String> = args
            .iter()
            .map(|a| format!("({}){}", a.ty, a.local))
            .collect();
        format!("{}{}({})", kind.prefix(), index, args.join(", "))
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Namespaces in first-seen order.
    pub fn namespaces(&self) -> impl Iterator<Item = Option<&str>> {
        self.namespaces.iter().map(|ns| ns.name.as_deref())
    }

    pub fn initializer(&self, namespace: Option<&str>) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|ns| ns.name.as_deref() == namespace)
            .and_then(|ns| ns.initializer.as_deref())
    }

    /// Definitions of one kind of unit in `namespace`, global indices kept.
    pub fn definitions(&self, kind: UnitKind, namespace: Option<&str>) -> Vec<String> {
        let units = match kind {
            UnitKind::Predicate => &self.predicates,
            UnitKind::Action => &self.actions,
        };
        units
            .iter()
            .filter(|(_, f)| f.namespace.as_deref() == namespace)
            .map(|(i, f)| {
                let params: Vec<String> = f
                    .params
                    .iter()
                    .map(|(name, ty)| format!("{} {}", ty, name))
                    .collect();
                format!(
                    "{} {}{}({}) {{{}}}",
                    f.ty,
                    kind.prefix(),
                    i,
                    params.join(", "),
                    f.body
                )
            })
            .collect()
    }
}

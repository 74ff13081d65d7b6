//! Grammar AST handed over by the front-end.
//!
//! The tree mirrors the pegjs JSON AST: a [`Grammar`] owns initializers and
//! rules, each rule owns one [`Expr`]. Expression kinds form a closed sum
//! type ([`ExprKind`]) so every pass matches on them exhaustively.
//!
//! The compiler never restructures the tree. Each expression node carries a
//! stable [`NodeId`] assigned once when the grammar is built, and later passes
//! key their per-node results (inferred types) by that id.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AstError;
use crate::span::Location;

/// Identity of an expression node within one grammar.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// Root of the AST.
#[derive(Debug, Clone, Deserialize)]
pub struct Grammar {
    #[serde(default)]
    pub initializers: Vec<Initializer>,
    /// Older front-ends emit a single, optional initializer.
    #[serde(default)]
    initializer: Option<Initializer>,
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub location: Location,
}

/// Code block executed when the parser is constructed, hoisted into the
/// user-code holder of its namespace.
#[derive(Debug, Clone, Deserialize)]
pub struct Initializer {
    pub code: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub name: String,
    pub expression: Expr,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub location: Location,
}

/// `@Name(params...)` attached to an action or initializer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default)]
    pub params: Vec<serde_json::Value>,
    #[serde(default)]
    pub location: Location,
}

impl Annotation {
    pub fn new(name: impl Into<String>, params: Vec<serde_json::Value>) -> Self {
        Annotation {
            name: name.into(),
            params,
            location: Location::default(),
        }
    }

    /// The `index`-th parameter rendered as text. String parameters are
    /// returned without quotes.
    pub fn param_text(&self, index: usize) -> Option<String> {
        self.params.get(index).map(|p| match p {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Expr {
    #[serde(skip)]
    pub id: NodeId,
    #[serde(default)]
    pub location: Location,
    #[serde(flatten)]
    pub kind: ExprKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExprKind {
    /// `name "display name" = expression`
    Named { name: String, expression: Box<Expr> },
    Choice { alternatives: Vec<Expr> },
    Action {
        expression: Box<Expr>,
        code: String,
        #[serde(default)]
        namespace: Option<String>,
        #[serde(default)]
        annotations: Vec<Annotation>,
    },
    Sequence { elements: Vec<Expr> },
    Labeled { label: String, expression: Box<Expr> },
    /// `$expression`
    Text { expression: Box<Expr> },
    Optional { expression: Box<Expr> },
    ZeroOrMore { expression: Box<Expr> },
    OneOrMore { expression: Box<Expr> },
    /// `expression|min..max|`
    Range {
        min: Boundary,
        #[serde(default, deserialize_with = "deserialize_max")]
        max: Option<Boundary>,
        expression: Box<Expr>,
    },
    SimpleAnd { expression: Box<Expr> },
    SimpleNot { expression: Box<Expr> },
    SemanticAnd {
        code: String,
        #[serde(default)]
        namespace: Option<String>,
    },
    SemanticNot {
        code: String,
        #[serde(default)]
        namespace: Option<String>,
    },
    RuleRef { name: String },
    Literal {
        value: String,
        #[serde(rename = "ignoreCase", default)]
        ignore_case: bool,
    },
    Class {
        parts: Vec<ClassPart>,
        #[serde(default)]
        inverted: bool,
        #[serde(rename = "ignoreCase", default)]
        ignore_case: bool,
        #[serde(rename = "rawText", default)]
        raw_text: String,
    },
    Any,
}

/// One member of a character class: a single character or an inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ClassPart {
    Range(char, char),
    Single(char),
}

/// Lower or upper repetition bound of a `range` node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawBoundary")]
pub enum Boundary {
    /// A count known at compile time.
    Constant(u32),
    /// The runtime value of a previously bound label, coerced to an integer.
    Label(String),
}

impl Boundary {
    pub fn constant(&self) -> Option<u32> {
        match self {
            Boundary::Constant(n) => Some(*n),
            Boundary::Label(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct RawBoundary {
    constant: bool,
    #[serde(default)]
    value: Option<RawBoundaryValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBoundaryValue {
    Count(u32),
    Label(String),
}

impl TryFrom<RawBoundary> for Boundary {
    type Error = String;

    fn try_from(raw: RawBoundary) -> Result<Self, Self::Error> {
        match (raw.constant, raw.value) {
            (true, Some(RawBoundaryValue::Count(n))) => Ok(Boundary::Constant(n)),
            (false, Some(RawBoundaryValue::Label(l))) => Ok(Boundary::Label(l)),
            (true, Some(RawBoundaryValue::Label(l))) => {
                Err(format!("constant boundary has non-numeric value `{}`", l))
            }
            (false, Some(RawBoundaryValue::Count(n))) => {
                Err(format!("label boundary has numeric value `{}`", n))
            }
            (_, None) => Err("boundary has no value".to_string()),
        }
    }
}

/// An upper bound may be absent entirely or present with a `null` value;
/// both mean "unbounded".
fn deserialize_max<'de, D>(deserializer: D) -> Result<Option<Boundary>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawBoundary> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawBoundary { value: None, .. }) => Ok(None),
        Some(raw) => Boundary::try_from(raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// ── Grammar ────────────────────────────────────────────────────────────

impl Grammar {
    /// Build a grammar and number its expression nodes.
    pub fn new(initializers: Vec<Initializer>, rules: Vec<Rule>) -> Self {
        let mut grammar = Grammar {
            initializers,
            initializer: None,
            rules,
            location: Location::default(),
        };
        grammar.assign_ids();
        grammar
    }

    /// Decode the front-end's JSON AST, number its nodes, and check that rule
    /// names are unique and every reference resolves.
    pub fn from_json(source: &str) -> Result<Grammar, AstError> {
        let mut grammar: Grammar = serde_json::from_str(source)?;
        if let Some(init) = grammar.initializer.take() {
            grammar.initializers.insert(0, init);
        }
        grammar.assign_ids();
        grammar.validate()?;
        Ok(grammar)
    }

    /// Check rule-name uniqueness and rule-reference resolution.
    pub fn validate(&self) -> Result<(), AstError> {
        let mut names = HashSet::new();
        for rule in &self.rules {
            if !names.insert(rule.name.as_str()) {
                return Err(AstError::DuplicateRule {
                    name: rule.name.clone(),
                    location: rule.location,
                });
            }
        }
        let mut unknown = None;
        for rule in &self.rules {
            rule.expression.walk(&mut |expr| {
                if let ExprKind::RuleRef { name } = &expr.kind {
                    if unknown.is_none() && !names.contains(name.as_str()) {
                        unknown = Some(AstError::UnknownRule {
                            name: name.clone(),
                            location: expr.location,
                        });
                    }
                }
            });
        }
        match unknown {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn find_rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.name == name)
    }

    /// Total number of expression nodes (one past the highest `NodeId`).
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        for rule in &self.rules {
            rule.expression.walk(&mut |_| count += 1);
        }
        count
    }

    fn assign_ids(&mut self) {
        let mut next = 0u32;
        for rule in &mut self.rules {
            rule.expression.walk_mut(&mut |expr| {
                expr.id = NodeId(next);
                next += 1;
            });
        }
    }
}

// ── Expressions ────────────────────────────────────────────────────────

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            id: NodeId::default(),
            location: Location::default(),
            kind,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Direct sub-expressions, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Choice { alternatives } => alternatives.iter().collect(),
            ExprKind::Sequence { elements } => elements.iter().collect(),
            ExprKind::Named { expression, .. }
            | ExprKind::Action { expression, .. }
            | ExprKind::Labeled { expression, .. }
            | ExprKind::Text { expression }
            | ExprKind::Optional { expression }
            | ExprKind::ZeroOrMore { expression }
            | ExprKind::OneOrMore { expression }
            | ExprKind::Range { expression, .. }
            | ExprKind::SimpleAnd { expression }
            | ExprKind::SimpleNot { expression } => vec![expression.as_ref()],
            ExprKind::SemanticAnd { .. }
            | ExprKind::SemanticNot { .. }
            | ExprKind::RuleRef { .. }
            | ExprKind::Literal { .. }
            | ExprKind::Class { .. }
            | ExprKind::Any => Vec::new(),
        }
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    fn walk_mut(&mut self, f: &mut impl FnMut(&mut Expr)) {
        f(self);
        match &mut self.kind {
            ExprKind::Choice { alternatives } => {
                for alt in alternatives {
                    alt.walk_mut(f);
                }
            }
            ExprKind::Sequence { elements } => {
                for el in elements {
                    el.walk_mut(f);
                }
            }
            ExprKind::Named { expression, .. }
            | ExprKind::Action { expression, .. }
            | ExprKind::Labeled { expression, .. }
            | ExprKind::Text { expression }
            | ExprKind::Optional { expression }
            | ExprKind::ZeroOrMore { expression }
            | ExprKind::OneOrMore { expression }
            | ExprKind::Range { expression, .. }
            | ExprKind::SimpleAnd { expression }
            | ExprKind::SimpleNot { expression } => expression.walk_mut(f),
            ExprKind::SemanticAnd { .. }
            | ExprKind::SemanticNot { .. }
            | ExprKind::RuleRef { .. }
            | ExprKind::Literal { .. }
            | ExprKind::Class { .. }
            | ExprKind::Any => {}
        }
    }

    /// Find an annotation by name on an action node.
    pub fn find_annotation(&self, name: &str) -> Option<&Annotation> {
        match &self.kind {
            ExprKind::Action { annotations, .. } => annotations.iter().find(|a| a.name == name),
            _ => None,
        }
    }

    /// Short kind name, as spelled in the JSON AST.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Named { .. } => "named",
            ExprKind::Choice { .. } => "choice",
            ExprKind::Action { .. } => "action",
            ExprKind::Sequence { .. } => "sequence",
            ExprKind::Labeled { .. } => "labeled",
            ExprKind::Text { .. } => "text",
            ExprKind::Optional { .. } => "optional",
            ExprKind::ZeroOrMore { .. } => "zero_or_more",
            ExprKind::OneOrMore { .. } => "one_or_more",
            ExprKind::Range { .. } => "range",
            ExprKind::SimpleAnd { .. } => "simple_and",
            ExprKind::SimpleNot { .. } => "simple_not",
            ExprKind::SemanticAnd { .. } => "semantic_and",
            ExprKind::SemanticNot { .. } => "semantic_not",
            ExprKind::RuleRef { .. } => "rule_ref",
            ExprKind::Literal { .. } => "literal",
            ExprKind::Class { .. } => "class",
            ExprKind::Any => "any",
        }
    }
}

// ── Builders ───────────────────────────────────────────────────────────

/// Constructors for building grammars in code, mostly used by tests.
///
/// Node ids are assigned by [`grammar`] / [`Grammar::new`], so nodes built
/// here must end up inside a grammar before any pass sees them.
pub mod build {
    use super::*;

    pub fn grammar(rules: Vec<Rule>) -> Grammar {
        Grammar::new(Vec::new(), rules)
    }

    pub fn rule(name: &str, expression: Expr) -> Rule {
        Rule {
            name: name.to_string(),
            expression,
            annotations: Vec::new(),
            location: Location::default(),
        }
    }

    pub fn initializer(code: &str, namespace: Option<&str>) -> Initializer {
        Initializer {
            code: code.to_string(),
            namespace: namespace.map(str::to_string),
            annotations: Vec::new(),
            location: Location::default(),
        }
    }

    pub fn named(name: &str, expression: Expr) -> Expr {
        Expr::new(ExprKind::Named {
            name: name.to_string(),
            expression: Box::new(expression),
        })
    }

    pub fn choice(alternatives: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::Choice { alternatives })
    }

    pub fn seq(elements: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::Sequence { elements })
    }

    pub fn labeled(label: &str, expression: Expr) -> Expr {
        Expr::new(ExprKind::Labeled {
            label: label.to_string(),
            expression: Box::new(expression),
        })
    }

    /// Action without a `@Return` annotation.
    pub fn action(code: &str, expression: Expr) -> Expr {
        Expr::new(ExprKind::Action {
            expression: Box::new(expression),
            code: code.to_string(),
            namespace: None,
            annotations: Vec::new(),
        })
    }

    /// Action annotated with `@Return(ty)`.
    pub fn action_returning(code: &str, ty: &str, expression: Expr) -> Expr {
        Expr::new(ExprKind::Action {
            expression: Box::new(expression),
            code: code.to_string(),
            namespace: None,
            annotations: vec![Annotation::new(
                "Return",
                vec![serde_json::Value::String(ty.to_string())],
            )],
        })
    }

    pub fn text(expression: Expr) -> Expr {
        Expr::new(ExprKind::Text {
            expression: Box::new(expression),
        })
    }

    pub fn optional(expression: Expr) -> Expr {
        Expr::new(ExprKind::Optional {
            expression: Box::new(expression),
        })
    }

    pub fn zero_or_more(expression: Expr) -> Expr {
        Expr::new(ExprKind::ZeroOrMore {
            expression: Box::new(expression),
        })
    }

    pub fn one_or_more(expression: Expr) -> Expr {
        Expr::new(ExprKind::OneOrMore {
            expression: Box::new(expression),
        })
    }

    pub fn range(min: Boundary, max: Option<Boundary>, expression: Expr) -> Expr {
        Expr::new(ExprKind::Range {
            min,
            max,
            expression: Box::new(expression),
        })
    }

    pub fn simple_and(expression: Expr) -> Expr {
        Expr::new(ExprKind::SimpleAnd {
            expression: Box::new(expression),
        })
    }

    pub fn simple_not(expression: Expr) -> Expr {
        Expr::new(ExprKind::SimpleNot {
            expression: Box::new(expression),
        })
    }

    pub fn semantic_and(code: &str) -> Expr {
        Expr::new(ExprKind::SemanticAnd {
            code: code.to_string(),
            namespace: None,
        })
    }

    pub fn semantic_not(code: &str) -> Expr {
        Expr::new(ExprKind::SemanticNot {
            code: code.to_string(),
            namespace: None,
        })
    }

    pub fn rule_ref(name: &str) -> Expr {
        Expr::new(ExprKind::RuleRef {
            name: name.to_string(),
        })
    }

    pub fn literal(value: &str) -> Expr {
        Expr::new(ExprKind::Literal {
            value: value.to_string(),
            ignore_case: false,
        })
    }

    pub fn literal_nocase(value: &str) -> Expr {
        Expr::new(ExprKind::Literal {
            value: value.to_string(),
            ignore_case: true,
        })
    }

    pub fn class(parts: Vec<ClassPart>, inverted: bool, raw_text: &str) -> Expr {
        Expr::new(ExprKind::Class {
            parts,
            inverted,
            ignore_case: false,
            raw_text: raw_text.to_string(),
        })
    }

    pub fn any() -> Expr {
        Expr::new(ExprKind::Any)
    }
}

//! Return-type inference.
//!
//! Runs in two passes over an immutable grammar:
//!
//! 1. **Seeding** walks every action bottom-up and fixes its type from a
//!    `@Return` annotation or the configured default. An action without
//!    either is fatal and propagation is skipped.
//! 2. **Propagation** computes the type of every node from its children.
//!    Rule types live in per-rule slots that start `Unresolved`; the first
//!    reference to a rule resolves it on demand, with the slot holding the
//!    rule's phantom self type while its body is inferred. Afterwards every
//!    rule is re-inferred from its body until one full sweep changes no slot.
//!
//! Results are written to a [`TypeTable`] keyed by [`NodeId`].

use pegj_common::{DiagnosticSink, Expr, ExprKind, Grammar, NodeId};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::TypeError;
use crate::ty::Ty;

/// Name of the annotation that fixes an action's return type.
pub const RETURN_ANNOTATION: &str = "Return";

/// Type slot of one rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleType {
    /// Not visited yet.
    Unresolved,
    /// Either the phantom self type (while the body is being inferred) or
    /// the type computed from the body.
    Resolved(Ty),
}

/// Inferred types of every rule and expression node of one grammar.
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    nodes: FxHashMap<NodeId, Ty>,
    rules: Vec<RuleType>,
    sweeps: usize,
}

impl TypeTable {
    /// Type of an expression node.
    pub fn node(&self, id: NodeId) -> Option<&Ty> {
        self.nodes.get(&id)
    }

    /// Type of an expression, by its node id.
    pub fn expr(&self, expr: &Expr) -> Option<&Ty> {
        self.node(expr.id)
    }

    /// Type of the rule at `index` in declaration order.
    pub fn rule(&self, index: usize) -> Option<&Ty> {
        match self.rules.get(index)? {
            RuleType::Resolved(ty) => Some(ty),
            RuleType::Unresolved => None,
        }
    }

    /// Number of re-inference sweeps the fixpoint driver ran, including the
    /// final quiescent one.
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Whether every rule of a grammar with `rule_count` rules has a type.
    pub fn is_complete(&self, rule_count: usize) -> bool {
        self.rules.len() == rule_count
            && self
                .rules
                .iter()
                .all(|slot| matches!(slot, RuleType::Resolved(_)))
    }
}

/// Inference state for one grammar.
pub(crate) struct Inferencer<'g, 's> {
    grammar: &'g Grammar,
    sink: &'s mut dyn DiagnosticSink,
    /// Seeded action types.
    actions: FxHashMap<NodeId, Ty>,
    nodes: FxHashMap<NodeId, Ty>,
    rules: Vec<RuleType>,
    /// Set whenever a rule slot receives a different type.
    changed: Vec<usize>,
    pub(crate) errors: Vec<TypeError>,
}

impl<'g, 's> Inferencer<'g, 's> {
    pub(crate) fn new(grammar: &'g Grammar, sink: &'s mut dyn DiagnosticSink) -> Self {
        Inferencer {
            grammar,
            sink,
            actions: FxHashMap::default(),
            nodes: FxHashMap::default(),
            rules: vec![RuleType::Unresolved; grammar.rules.len()],
            changed: Vec::new(),
            errors: Vec::new(),
        }
    }

    // ── Seeding ────────────────────────────────────────────────────────

    /// Fix the type of every action node, inner actions first.
    pub(crate) fn seed(&mut self, default_return_type: Option<&str>) {
        let grammar = self.grammar;
        for rule in &grammar.rules {
            self.seed_expr(&rule.expression, default_return_type);
        }
        debug!(actions = self.actions.len(), "seeded action types");
    }

    fn seed_expr(&mut self, expr: &'g Expr, default_return_type: Option<&str>) {
        for child in expr.children() {
            self.seed_expr(child, default_return_type);
        }
        if !matches!(expr.kind, ExprKind::Action { .. }) {
            return;
        }

        let declared = expr
            .find_annotation(RETURN_ANNOTATION)
            .and_then(|a| a.param_text(0));

        if let Some(name) = declared {
            self.sink.emit_info(
                format!("using type `{}` for action from @Return annotation", name),
                Some(expr.location),
            );
            self.actions.insert(expr.id, Ty::from_name(&name));
        } else if let Some(name) = default_return_type {
            self.sink.emit_info(
                format!("using default type `{}` for action", name),
                Some(expr.location),
            );
            self.actions.insert(expr.id, Ty::from_name(name));
        } else {
            let err = TypeError::MissingReturnType {
                location: expr.location,
            };
            self.report(err);
        }
    }

    // ── Propagation ────────────────────────────────────────────────────

    /// Initial pass: resolve every rule, following references on demand.
    pub(crate) fn resolve_all(&mut self) {
        for index in 0..self.rules.len() {
            self.rule_type(index);
        }
    }

    /// Re-infer every rule from its body. Returns the names of the rules
    /// whose type changed.
    pub(crate) fn sweep(&mut self) -> Vec<String> {
        self.changed.clear();
        for index in 0..self.rules.len() {
            self.infer_rule(index);
        }
        let grammar = self.grammar;
        self.changed
            .iter()
            .map(|&i| grammar.rules[i].name.clone())
            .collect()
    }

    /// Whether the initial pass changed any slot.
    pub(crate) fn take_changed(&mut self) -> bool {
        let changed = !self.changed.is_empty();
        self.changed.clear();
        changed
    }

    fn rule_type(&mut self, index: usize) -> Ty {
        if let RuleType::Resolved(ty) = &self.rules[index] {
            return ty.clone();
        }
        let name = self.grammar.rules[index].name.clone();
        self.rules[index] = RuleType::Resolved(Ty::Rec(name));
        self.infer_rule(index)
    }

    fn infer_rule(&mut self, index: usize) -> Ty {
        let grammar = self.grammar;
        let rule = &grammar.rules[index];
        let ty = self.infer(&rule.expression);
        let slot = RuleType::Resolved(ty.clone());
        if self.rules[index] != slot {
            trace!(rule = %rule.name, ty = %ty, "rule type changed");
            self.rules[index] = slot;
            self.changed.push(index);
        }
        ty
    }

    fn infer(&mut self, expr: &'g Expr) -> Ty {
        let ty = match &expr.kind {
            ExprKind::Named { expression, .. } | ExprKind::Labeled { expression, .. } => {
                self.infer(expression)
            }
            ExprKind::Choice { alternatives } => {
                let types: Vec<Ty> = alternatives.iter().map(|alt| self.infer(alt)).collect();
                Ty::union(types)
            }
            ExprKind::Sequence { elements } => {
                let types: Vec<Ty> = elements.iter().map(|el| self.infer(el)).collect();
                Ty::tuple(types)
            }
            ExprKind::Action { expression, .. } => {
                self.infer(expression);
                match self.actions.get(&expr.id) {
                    Some(ty) => ty.clone(),
                    None => {
                        let err = TypeError::ActionTypeUndefined {
                            location: expr.location,
                        };
                        if !self.errors.contains(&err) {
                            self.report(err);
                        }
                        Ty::Object
                    }
                }
            }
            ExprKind::Text { expression } => {
                self.infer(expression);
                Ty::Range
            }
            ExprKind::Optional { expression } => Ty::option(self.infer(expression)),
            ExprKind::ZeroOrMore { expression }
            | ExprKind::OneOrMore { expression }
            | ExprKind::Range { expression, .. } => Ty::list(self.infer(expression)),
            ExprKind::SimpleAnd { expression } | ExprKind::SimpleNot { expression } => {
                self.infer(expression);
                Ty::none()
            }
            ExprKind::SemanticAnd { .. } | ExprKind::SemanticNot { .. } => Ty::none(),
            ExprKind::RuleRef { name } => match self.grammar.rule_index(name) {
                Some(index) => self.rule_type(index),
                None => {
                    let err = TypeError::UnknownRule {
                        name: name.clone(),
                        location: expr.location,
                    };
                    if !self.errors.contains(&err) {
                        self.report(err);
                    }
                    Ty::Object
                }
            },
            ExprKind::Literal { .. } => Ty::Range,
            ExprKind::Class { .. } | ExprKind::Any => Ty::Char,
        };
        self.nodes.insert(expr.id, ty.clone());
        ty
    }

    pub(crate) fn report(&mut self, err: TypeError) {
        self.sink.emit_error(err.to_string(), err.location());
        self.errors.push(err);
    }

    pub(crate) fn finish(self, sweeps: usize) -> (TypeTable, Vec<TypeError>) {
        let table = TypeTable {
            nodes: self.nodes,
            rules: self.rules,
            sweeps,
        };
        (table, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegj_common::ast::build::*;
    use pegj_common::Diagnostics;

    fn run(grammar: &Grammar, default: Option<&str>) -> (TypeTable, Vec<TypeError>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let result = crate::check(grammar, default, &mut diags);
        (result.types, result.errors, diags)
    }

    #[test]
    fn seeding_visits_inner_actions_first() {
        let g = grammar(vec![rule(
            "start",
            action_returning("return 1;", "int", action("return x;", literal("x"))),
        )]);
        let (_, _, diags) = run(&g, Some("Object"));
        let messages: Vec<_> = diags.iter().map(|d| d.message.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "using default type `Object` for action".to_string(),
                "using type `int` for action from @Return annotation".to_string(),
            ]
        );
    }

    #[test]
    fn phantom_survives_for_pure_self_reference() {
        let g = grammar(vec![rule("loop", rule_ref("loop"))]);
        let (table, errors, _) = run(&g, None);
        assert!(errors.is_empty());
        assert_eq!(table.rule(0), Some(&Ty::Rec("loop".into())));
        assert!(table.is_complete(1));
    }

    #[test]
    fn unresolved_rules_are_reported_incomplete() {
        let table = TypeTable {
            rules: vec![RuleType::Resolved(Ty::Char), RuleType::Unresolved],
            ..TypeTable::default()
        };
        assert!(!table.is_complete(2));
        assert_eq!(table.rule(1), None);
        assert_eq!(table.rule(5), None);
    }
}

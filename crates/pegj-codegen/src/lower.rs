//! Grammar-to-Java lowering.
//!
//! Each rule becomes one subroutine. Lowering walks the rule body once,
//! threading a context of `(base slot, label environment, enclosing action)`
//! and allocating locals from two [`VarStack`]s: `r` locals for intermediate
//! results (including the runtime `FAILED` sentinel) and `l` locals for
//! saved input positions. Every node leaves exactly one result on the value
//! stack.

use pegj_common::ast::{Boundary, ClassPart};
use pegj_common::{Expr, ExprKind, Rule};
use pegj_typeck::{Ty, TypeTable};
use tracing::debug;

use crate::emit::Stmt;
use crate::error::GenerateError;
use crate::escape::{java_string, regex_class_char};
use crate::imports::Imports;
use crate::registry::{
    expected_initializer, pattern_initializer, Arg, ConstantPool, ExpectedKind, UserCode,
};
use crate::stack::VarStack;

/// Prefix of generated rule subroutines.
pub const RULE_PREFIX: &str = "parse$";

pub fn rule_fn(name: &str) -> String {
    format!("{}{}", RULE_PREFIX, name)
}

/// Registries shared by every rule of one compilation.
#[derive(Debug, Clone)]
pub struct Registries {
    pub patterns: ConstantPool,
    pub expected: ConstantPool,
    pub user_code: UserCode,
}

impl Registries {
    pub fn new(imports: &Imports) -> Self {
        Registries {
            patterns: ConstantPool::new("p", imports.resolve("Pattern")),
            expected: ConstantPool::new("e", imports.resolve("Expected")),
            user_code: UserCode::new(),
        }
    }
}

// ── Label environment ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Binding {
    slot: usize,
    ty: Ty,
}

/// Labels visible at a point of the rule, in order of first binding.
/// Rebinding a label keeps its position.
#[derive(Debug, Clone, Default)]
struct Env {
    bindings: Vec<(String, Binding)>,
}

impl Env {
    fn bind(&mut self, label: &str, binding: Binding) {
        match self.bindings.iter_mut().find(|(name, _)| name == label) {
            Some((_, existing)) => *existing = binding,
            None => self.bindings.push((label.to_string(), binding)),
        }
    }

    fn get(&self, label: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, b)| b)
    }
}

#[derive(Clone, Copy)]
struct Ctx<'g> {
    /// Value-stack index below which this node may not touch anything.
    base: isize,
    /// Action whose call replaces the bundling step of a directly wrapped
    /// sequence.
    action: Option<&'g Expr>,
}

impl<'g> Ctx<'g> {
    fn at(base: isize) -> Self {
        Ctx { base, action: None }
    }
}

// ── Lowerer ────────────────────────────────────────────────────────────

/// Lowering state for a single rule.
pub struct RuleLowerer<'a> {
    imports: &'a Imports,
    types: &'a TypeTable,
    regs: &'a mut Registries,
    values: VarStack,
    positions: VarStack,
}

impl<'a> RuleLowerer<'a> {
    pub fn new(imports: &'a Imports, types: &'a TypeTable, regs: &'a mut Registries) -> Self {
        RuleLowerer {
            imports,
            types,
            regs,
            values: VarStack::new("r", imports.resolve("Object")),
            positions: VarStack::new("l", imports.resolve("Position")),
        }
    }

    /// Lower `rule` to its annotated subroutine.
    pub fn lower_rule(mut self, rule: &Rule, is_start: bool) -> Result<Vec<Stmt>, GenerateError> {
        let mut body = Vec::new();
        let mut env = Env::default();
        self.lower(&rule.expression, Ctx::at(-1), &mut env, &mut body)?;

        debug_assert_eq!(self.values.sp(), 0, "value stack unbalanced in `{}`", rule.name);
        debug_assert_eq!(self.positions.sp(), -1, "position stack unbalanced in `{}`", rule.name);

        let mut stmts = Vec::new();
        stmts.extend(self.values.defines().map(Stmt::Line));
        stmts.extend(self.positions.defines().map(Stmt::Line));
        stmts.push(Stmt::Blank);
        stmts.extend(body);
        stmts.push(Stmt::Blank);
        stmts.push(Stmt::line(format!("return {};", self.values.result())));

        debug!(
            rule = %rule.name,
            is_start,
            defines = ?self.values.defines(),
            "lowered rule"
        );

        Ok(vec![
            Stmt::line(format!(
                "@{}(name=\"{}\", isStart={})",
                self.imports.resolve("Rule"),
                java_string(&rule.name),
                is_start
            )),
            Stmt::block(
                format!(
                    "private {} {}() {{",
                    self.imports.resolve("Object"),
                    rule_fn(&rule.name)
                ),
                stmts,
                "}",
            ),
        ])
    }

    fn ty_of(&self, expr: &Expr) -> Result<Ty, GenerateError> {
        self.types
            .expr(expr)
            .cloned()
            .ok_or(GenerateError::Untyped {
                kind: expr.kind_name(),
                location: expr.location,
            })
    }

    fn push(&mut self, out: &mut Vec<Stmt>, expr: impl AsRef<str>) {
        let code = self.values.push(expr);
        out.push(Stmt::Line(code));
    }

    fn loc_push(&mut self) -> Stmt {
        Stmt::Line(self.positions.push("super.current.clone()"))
    }

    fn loc_pop(&mut self) -> Stmt {
        Stmt::Line(format!("super.current = {};", self.positions.pop()))
    }

    fn loc_mark(&mut self) -> Stmt {
        Stmt::Line(format!("super.mark = {};", self.positions.pop()))
    }

    /// Arguments for a hoisted call: every visible label, typed by what it
    /// binds.
    fn args(&self, env: &Env) -> Vec<Arg> {
        env.bindings
            .iter()
            .map(|(name, b)| Arg {
                name: name.clone(),
                ty: self.imports.render(&b.ty),
                local: self.values.local(b.slot),
            })
            .collect()
    }

    fn lower<'g>(
        &mut self,
        expr: &'g Expr,
        ctx: Ctx<'g>,
        env: &mut Env,
        out: &mut Vec<Stmt>,
    ) -> Result<(), GenerateError> {
        debug_assert_eq!(self.values.sp(), ctx.base, "{} lowered above its base", expr.kind_name());

        match &expr.kind {
            ExprKind::Named { name, expression } => self.lower_named(name, expression, ctx, env, out),
            ExprKind::Choice { alternatives } => self.lower_choice(alternatives, ctx, env, out),
            ExprKind::Sequence { elements } => self.lower_sequence(elements, ctx, env, out),
            ExprKind::Labeled { label, expression } => {
                let mut inner = env.clone();
                let ty = self.ty_of(expression)?;
                env.bind(
                    label,
                    Binding {
                        slot: (ctx.base + 1) as usize,
                        ty,
                    },
                );
                self.lower(expression, Ctx::at(ctx.base), &mut inner, out)
            }
            ExprKind::Text { expression } => {
                out.push(self.loc_push());
                self.lower(expression, Ctx::at(ctx.base), &mut env.clone(), out)?;
                let result = self.values.pop();
                let from = self.positions.pop();
                let set = self.values.push(format!("super.toText({})", from));
                out.push(Stmt::if_then(
                    format!("{} != FAILED", result),
                    vec![Stmt::Line(set)],
                ));
                Ok(())
            }
            ExprKind::Optional { expression } => {
                self.lower(expression, Ctx::at(ctx.base), &mut env.clone(), out)?;
                let result = self.values.pop();
                let set = self.values.push("null");
                out.push(Stmt::line(format!("if ({} == FAILED) {{ {} }}", result, set)));
                Ok(())
            }
            ExprKind::ZeroOrMore { expression } => self.lower_range(
                expression,
                &Boundary::Constant(0),
                None,
                ctx,
                env,
                out,
            ),
            ExprKind::OneOrMore { expression } => self.lower_range(
                expression,
                &Boundary::Constant(1),
                None,
                ctx,
                env,
                out,
            ),
            ExprKind::Range {
                min,
                max,
                expression,
            } => self.lower_range(expression, min, max.as_ref(), ctx, env, out),
            ExprKind::SimpleAnd { expression } => {
                self.lower_lookahead(expression, false, ctx, env, out)
            }
            ExprKind::SimpleNot { expression } => {
                self.lower_lookahead(expression, true, ctx, env, out)
            }
            ExprKind::SemanticAnd { code, namespace } => {
                self.lower_semantic(code, namespace.as_deref(), false, env, out);
                Ok(())
            }
            ExprKind::SemanticNot { code, namespace } => {
                self.lower_semantic(code, namespace.as_deref(), true, env, out);
                Ok(())
            }
            ExprKind::Action { expression, .. } => self.lower_action(expr, expression, ctx, env, out),
            ExprKind::RuleRef { name } => {
                self.push(out, format!("{}()", rule_fn(name)));
                Ok(())
            }
            ExprKind::Literal { value, ignore_case } => {
                let expected_value = if *ignore_case {
                    value.to_lowercase()
                } else {
                    value.clone()
                };
                let description = format!("\"{}\"", java_string(value));
                let e = self.regs.expected.add(expected_initializer(
                    &self.imports.resolve("Expected"),
                    ExpectedKind::Literal,
                    Some(&expected_value),
                    Some(&description),
                ));
                self.push(
                    out,
                    format!(
                        "super.parseLiteral(\"{}\", {}, {})",
                        java_string(value),
                        e,
                        ignore_case
                    ),
                );
                Ok(())
            }
            ExprKind::Class {
                parts,
                inverted,
                ignore_case,
                raw_text,
            } => {
                let body = class_body(parts);
                // Inversion is applied by the runtime flag; the pattern itself
                // matches the listed characters.
                let source = if parts.is_empty() {
                    "(?!)".to_string()
                } else {
                    format!("[{}]", body)
                };
                let shown = format!("[{}{}]", if *inverted { "^" } else { "" }, body);
                let p = self.regs.patterns.add(pattern_initializer(
                    &self.imports.resolve("Pattern"),
                    &source,
                    *ignore_case,
                ));
                let e = self.regs.expected.add(expected_initializer(
                    &self.imports.resolve("Expected"),
                    ExpectedKind::Pattern,
                    Some(&shown),
                    Some(raw_text),
                ));
                self.push(out, format!("super.parsePattern({}, {}, {})", p, e, inverted));
                Ok(())
            }
            ExprKind::Any => {
                self.push(out, "super.parseAny()");
                Ok(())
            }
        }
    }

    fn lower_named<'g>(
        &mut self,
        name: &str,
        expression: &'g Expr,
        ctx: Ctx<'g>,
        env: &mut Env,
        out: &mut Vec<Stmt>,
    ) -> Result<(), GenerateError> {
        let e = self.regs.expected.add(expected_initializer(
            &self.imports.resolve("Expected"),
            ExpectedKind::Rule,
            None,
            Some(name),
        ));
        out.push(Stmt::line("++super.silent;"));
        out.push(Stmt::Blank);
        self.lower(expression, Ctx::at(ctx.base), env, out)?;
        out.push(Stmt::Blank);
        out.push(Stmt::line("--super.silent;"));
        let top = self.values.top();
        let fail = self.values.replace(format!("super.fail({})", e));
        out.push(Stmt::if_then(
            format!("{} == FAILED", top),
            vec![Stmt::Line(fail)],
        ));
        Ok(())
    }

    fn lower_choice<'g>(
        &mut self,
        alternatives: &'g [Expr],
        ctx: Ctx<'g>,
        env: &Env,
        out: &mut Vec<Stmt>,
    ) -> Result<(), GenerateError> {
        if alternatives.is_empty() {
            self.push(out, "FAILED");
            return Ok(());
        }
        let mut body = Vec::new();
        for (i, alt) in alternatives.iter().enumerate() {
            body.push(Stmt::line(format!("/*alternative {}*/", i + 1)));
            self.lower(alt, Ctx::at(ctx.base), &mut env.clone(), &mut body)?;
            if i + 1 < alternatives.len() {
                body.push(Stmt::line(format!(
                    "if ({} != FAILED) {{ break; }}",
                    self.values.pop()
                )));
                body.push(Stmt::Blank);
            }
        }
        out.push(Stmt::block(
            "do {/*choice*/",
            body,
            "} while (false);/*choice*/",
        ));
        Ok(())
    }

    fn lower_sequence<'g>(
        &mut self,
        elements: &'g [Expr],
        ctx: Ctx<'g>,
        env: &mut Env,
        out: &mut Vec<Stmt>,
    ) -> Result<(), GenerateError> {
        let n = elements.len();
        // Element labels are scoped to the sequence: its bundling step
        // overwrites their slots.
        let outer = env.clone();
        // Position is needed for rollback, or for the action's span mark.
        if n > 0 || ctx.action.is_some() {
            out.push(self.loc_push());
        }

        let mut body = Vec::new();
        let mut first = String::new();
        for (i, element) in elements.iter().enumerate() {
            body.push(Stmt::line(format!("/*element {}*/", i + 1)));
            self.lower(element, Ctx::at(ctx.base + i as isize), env, &mut body)?;
            if i == 0 {
                first = self.values.top();
            }
            let mut on_fail = Vec::new();
            // The first element cannot have moved the position when it fails.
            if i != 0 {
                on_fail.push(self.loc_pop());
                on_fail.push(Stmt::line(format!("{} = FAILED;", first)));
                self.positions.reclaim();
            }
            on_fail.push(Stmt::line("break;"));
            body.push(Stmt::if_then(
                format!("{} == FAILED", self.values.top()),
                on_fail,
            ));
            body.push(Stmt::Blank);
        }

        let args = self.args(env);
        let elems = self.values.pop_n(n);
        let tail = if n > 0 { &mut body } else { &mut *out };
        match ctx.action {
            Some(action) => {
                tail.push(self.loc_mark());
                let call = self.action_call(action, &args)?;
                tail.push(Stmt::Line(self.values.push(format!("uc.{}", call))));
            }
            None => {
                tail.push(Stmt::Line(
                    self.values.push(format!("newArray({})", elems.join(", "))),
                ));
                if n > 0 {
                    self.positions.pop();
                }
            }
        }
        *env = outer;

        if n > 0 {
            out.push(Stmt::block(
                "do {/*sequence*/",
                body,
                "} while (false);/*sequence*/",
            ));
        }
        Ok(())
    }

    fn lower_range<'g>(
        &mut self,
        expression: &'g Expr,
        min: &Boundary,
        max: Option<&Boundary>,
        ctx: Ctx<'g>,
        env: &Env,
        out: &mut Vec<Stmt>,
    ) -> Result<(), GenerateError> {
        // With at most one required element a failure cannot have moved the
        // position, so none is saved.
        let save = min.constant().map_or(true, |n| n > 1);
        let check_min = min.constant().map_or(true, |n| n > 0);
        let min_value = self.bound(min, env, expression)?;
        let max_value = max.map(|m| self.bound(m, env, expression)).transpose()?;

        if save {
            out.push(self.loc_push());
        }
        self.push(out, "newArray()");
        let arr = format!("(({}){})", self.imports.resolve("List"), self.values.top());

        let mut body = Vec::new();
        if let Some(max_value) = max_value {
            body.push(Stmt::line(format!(
                "if ({}.size() >= {}) {{ break; }}",
                arr, max_value
            )));
        }
        self.lower(expression, Ctx::at(ctx.base + 1), &mut env.clone(), &mut body)?;
        body.push(Stmt::line(format!(
            "if ({} == FAILED) {{ break; }}",
            self.values.top()
        )));
        body.push(Stmt::line(format!("{}.add({});", arr, self.values.pop())));
        out.push(Stmt::block("do {/*range*/", body, "} while (true);/*range*/"));

        if check_min {
            let mut then = Vec::new();
            if save {
                then.push(self.loc_pop());
            }
            then.push(Stmt::Line(self.values.replace("FAILED")));
            out.push(Stmt::if_then(format!("{}.size() < {}", arr, min_value), then));
        }
        Ok(())
    }

    /// Java expression for a repetition bound.
    fn bound(&self, boundary: &Boundary, env: &Env, at: &Expr) -> Result<String, GenerateError> {
        match boundary {
            Boundary::Constant(n) => Ok(n.to_string()),
            Boundary::Label(label) => match env.get(label) {
                Some(b) => Ok(format!(
                    "(({}){}).intValue()",
                    self.imports.resolve("Number"),
                    self.values.local(b.slot)
                )),
                None => Err(GenerateError::UnboundLabel {
                    label: label.clone(),
                    location: at.location,
                }),
            },
        }
    }

    fn lower_lookahead<'g>(
        &mut self,
        expression: &'g Expr,
        negative: bool,
        ctx: Ctx<'g>,
        env: &Env,
        out: &mut Vec<Stmt>,
    ) -> Result<(), GenerateError> {
        out.push(self.loc_push());
        out.push(Stmt::line("++super.silent;"));
        self.lower(expression, Ctx::at(ctx.base), &mut env.clone(), out)?;
        out.push(Stmt::line("--super.silent;"));
        out.push(self.loc_pop());

        if negative {
            // Only the outcome is observable: success becomes FAILED and
            // failure becomes a null success value.
            let result = self.values.pop();
            let then = vec![Stmt::Line(self.values.push("FAILED"))];
            let otherwise = vec![Stmt::Line(self.values.replace("null"))];
            out.push(Stmt::if_else(
                format!("{} != FAILED", result),
                then,
                otherwise,
            ));
        }
        Ok(())
    }

    fn lower_semantic(
        &mut self,
        code: &str,
        namespace: Option<&str>,
        negative: bool,
        env: &Env,
        out: &mut Vec<Stmt>,
    ) {
        let args = self.args(env);
        let call = self.regs.user_code.add_predicate(namespace, code, &args);
        let then = vec![Stmt::Line(self.values.push("null"))];
        let otherwise = vec![Stmt::Line(self.values.replace("FAILED"))];
        out.push(Stmt::if_else(
            format!("{}uc.{}", if negative { "!" } else { "" }, call),
            then,
            otherwise,
        ));
    }

    fn lower_action<'g>(
        &mut self,
        action: &'g Expr,
        expression: &'g Expr,
        ctx: Ctx<'g>,
        env: &Env,
        out: &mut Vec<Stmt>,
    ) -> Result<(), GenerateError> {
        // Labels bound inside shadow outer ones without leaking out.
        let mut env = env.clone();

        if matches!(expression.kind, ExprKind::Sequence { .. }) {
            let ctx = Ctx {
                base: ctx.base,
                action: Some(action),
            };
            return self.lower(expression, ctx, &mut env, out);
        }

        out.push(self.loc_push());
        out.push(Stmt::Blank);
        self.lower(expression, Ctx::at(ctx.base), &mut env, out)?;
        let args = self.args(&env);
        let call = self.action_call(action, &args)?;
        out.push(Stmt::Blank);
        let top = self.values.top();
        let then = vec![
            self.loc_mark(),
            Stmt::Line(self.values.replace(format!("uc.{}", call))),
        ];
        out.push(Stmt::if_then(format!("{} != FAILED", top), then));
        Ok(())
    }

    fn action_call(&mut self, action: &Expr, args: &[Arg]) -> Result<String, GenerateError> {
        let ExprKind::Action {
            code, namespace, ..
        } = &action.kind
        else {
            return Err(GenerateError::Untyped {
                kind: action.kind_name(),
                location: action.location,
            });
        };
        let ty = self.imports.render(&self.ty_of(action)?);
        Ok(self
            .regs
            .user_code
            .add_action(namespace.as_deref(), code, &ty, args))
    }
}

/// Regex bracket body for the parts of a character class.
fn class_body(parts: &[ClassPart]) -> String {
    parts
        .iter()
        .map(|part| match part {
            ClassPart::Single(c) => regex_class_char(*c),
            ClassPart::Range(lo, hi) => {
                format!("{}-{}", regex_class_char(*lo), regex_class_char(*hi))
            }
        })
        .collect()
}

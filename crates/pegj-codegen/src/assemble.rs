//! Compilation-unit assembly.
//!
//! Lays out one Java source file: package and imports, the user-code holder
//! class, then the parser class with its constants, start-rule entry points,
//! the parse API, the parse-by-name helper, and one subroutine per rule.

use pegj_common::{Grammar, Options};
use pegj_typeck::{Ty, TypeTable};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::emit::{self, PrintConfig, Stmt};
use crate::error::GenerateError;
use crate::escape::upper_snake_case;
use crate::imports::Imports;
use crate::lower::{rule_fn, Registries, RuleLowerer, RULE_PREFIX};
use crate::registry::UnitKind;

fn banner(title: &str) -> Stmt {
    let width: usize = 56;
    let fill = width.saturating_sub(title.len() + 2);
    let left = fill / 2;
    let right = fill - left;
    Stmt::line(format!(
        "/*{} {} {}*/",
        "~".repeat(left),
        title,
        "~".repeat(right)
    ))
}

/// Everything needed to lay out the parser class.
struct Assembler<'a> {
    grammar: &'a Grammar,
    types: &'a TypeTable,
    options: &'a Options,
    imports: Imports,
}

impl<'a> Assembler<'a> {
    fn class_name(&self) -> &str {
        &self.options.class_name
    }

    fn user_code_class(&self) -> String {
        format!("{}UserCode", self.options.class_name)
    }

    fn r(&self, short: &str) -> String {
        self.imports.resolve(short)
    }

    /// Holder class for initializers, predicates and actions.
    fn user_code(&self, regs: &Registries) -> Stmt {
        let holder = self.user_code_class();
        let uc = &regs.user_code;
        let mut body = vec![
            Stmt::line(format!("private final {} parser;", self.class_name())),
            Stmt::line(format!(
                "{}({} parser) {{ this.parser = parser; }}",
                holder,
                self.class_name()
            )),
        ];
        for namespace in uc.namespaces() {
            body.push(Stmt::Blank);
            if let Some(name) = namespace {
                body.push(Stmt::line(format!("/* namespace {} */", name)));
            }
            if let Some(init) = uc.initializer(namespace) {
                body.push(banner("INITIALIZER"));
                body.push(Stmt::line(init));
            }
            body.push(banner("PREDICATES"));
            body.extend(
                uc.definitions(UnitKind::Predicate, namespace)
                    .into_iter()
                    .map(Stmt::Line),
            );
            body.push(banner("ACTIONS"));
            body.extend(
                uc.definitions(UnitKind::Action, namespace)
                    .into_iter()
                    .map(Stmt::Line),
            );
        }
        Stmt::block(format!("final class {} {{", holder), body, "}")
    }

    /// Static entry point for one start rule, accepting every input
    /// representation.
    fn entry_point(&self, name: &str, constant: &str, ty: &Ty) -> Stmt {
        let ty = self.imports.render_boxed(ty);
        let base = format!("{}<{}>", self.r("IBaseParser"), ty);
        let inputs = [self.r("CharSequence"), self.r("ByteBuffer"), "byte[]".to_string()];
        let mut body = Vec::new();
        for input in inputs {
            body.push(Stmt::line(format!("@{}", self.r("Override"))));
            body.push(Stmt::block(
                format!("public {} parse({} input) {{", ty, input),
                vec![
                    Stmt::line(format!(
                        "final {c} p = new {c}();",
                        c = self.class_name()
                    )),
                    Stmt::line("p.init(input);"),
                    Stmt::line(format!("return ({})p.finalize(p.{}());", ty, rule_fn(name))),
                ],
                "}",
            ));
        }
        Stmt::block(
            format!(
                "public static final {} {} = new {}() {{",
                base, constant, base
            ),
            body,
            "};",
        )
    }

    /// `parse(input)` and `parse(input, startRule)` for every input type.
    fn api(&self, default_rule: &str) -> Vec<Stmt> {
        let object = self.r("Object");
        let inputs = [self.r("CharSequence"), self.r("ByteBuffer"), "byte[]".to_string()];
        let mut out = vec![Stmt::line(
            "//<editor-fold defaultstate=\"collapsed\" desc=\"API\">",
        )];
        for (i, input) in inputs.iter().enumerate() {
            if i > 0 {
                out.push(Stmt::Blank);
            }
            out.push(Stmt::line(format!("@{}", self.r("Override"))));
            out.push(Stmt::block(
                format!("public {} parse({} input) {{", object, input),
                vec![
                    Stmt::line("super.init(input);"),
                    Stmt::line(format!(
                        "return super.finalize({}());",
                        rule_fn(default_rule)
                    )),
                ],
                "}",
            ));
            out.push(Stmt::line(format!("@{}", self.r("Override"))));
            out.push(Stmt::block(
                format!(
                    "public {} parse({} input, {} startRule) {{",
                    object,
                    input,
                    self.r("String")
                ),
                vec![
                    Stmt::line("super.init(input);"),
                    Stmt::line("return super.finalize(parseRule(startRule));"),
                ],
                "}",
            ));
        }
        out.push(Stmt::line("//</editor-fold>"));
        out
    }

    /// Reflection-based dispatch to a start-eligible rule by name.
    fn parse_rule_helper(&self) -> Vec<Stmt> {
        let no_such = self.r("NoSuchRuleException");
        let rule = self.r("Rule");
        let try_body = vec![
            Stmt::line(format!(
                "final {} m = {}.class.getDeclaredMethod(\"{}\" + ruleName);",
                self.r("Method"),
                self.class_name(),
                RULE_PREFIX
            )),
            Stmt::line(format!(
                "final {} a = m.getAnnotation({}.class);",
                rule, rule
            )),
            Stmt::if_then(
                "a == null",
                vec![Stmt::line(format!(
                    "throw new {}(\"\\\"\" + ruleName + \"\\\" is not a rule name\");",
                    no_such
                ))],
            ),
            Stmt::if_then(
                "!a.isStart()",
                vec![Stmt::line(format!(
                    "throw new {}(\"Can't start parsing from rule \\\"\" + ruleName + \"\\\".\");",
                    no_such
                ))],
            ),
            Stmt::line("return m.invoke(this);"),
        ];
        let caught = [
            "IllegalAccessException",
            "IllegalArgumentException",
            "InvocationTargetException",
            "NoSuchMethodException",
            "SecurityException",
        ]
        .iter()
        .map(|c| self.r(c))
        .collect::<Vec<_>>()
        .join(" | ");

        vec![
            Stmt::line("//<editor-fold defaultstate=\"collapsed\" desc=\"Helpers\">"),
            Stmt::block(
                format!(
                    "private {} parseRule({} ruleName) {{",
                    self.r("Object"),
                    self.r("String")
                ),
                vec![
                    Stmt::block("try {", try_body, ""),
                    Stmt::block(
                        format!("}} catch ({} ex) {{", caught),
                        vec![Stmt::line(format!("throw new {}(ex);", no_such))],
                        "}",
                    ),
                ],
                "}",
            ),
            Stmt::line("//</editor-fold>"),
        ]
    }
}

/// Lower a type-checked grammar to one Java compilation unit.
pub fn generate(
    grammar: &Grammar,
    types: &TypeTable,
    options: &Options,
) -> Result<String, GenerateError> {
    if let Some(index) = (0..grammar.rules.len()).find(|&i| types.rule(i).is_none()) {
        let rule = &grammar.rules[index];
        return Err(GenerateError::Untyped {
            kind: "rule",
            location: rule.location,
        });
    }

    let first = grammar.rules.first().map(|r| r.name.as_str());
    let start_rules = options.start_rules(first);
    let Some(&default_rule) = start_rules.first() else {
        return Err(GenerateError::NoStartRules);
    };
    let mut entries = Vec::with_capacity(start_rules.len());
    let mut constants: FxHashMap<String, &str> = FxHashMap::default();
    for &name in &start_rules {
        let Some(index) = grammar.rule_index(name) else {
            return Err(GenerateError::UnknownStartRule(name.to_string()));
        };
        let constant = upper_snake_case(name);
        match constants.get(&constant) {
            // Listing a rule twice yields one entry point.
            Some(&first) if first == name => continue,
            Some(&first) => {
                return Err(GenerateError::EntryPointClash {
                    constant,
                    first: first.to_string(),
                    second: name.to_string(),
                })
            }
            None => {
                constants.insert(constant.clone(), name);
            }
        }
        let ty = types.rule(index).cloned().unwrap_or(Ty::Object);
        entries.push((name, constant, ty));
    }

    let asm = Assembler {
        grammar,
        types,
        options,
        imports: Imports::new(options.use_fully_qualified_names),
    };
    let mut regs = Registries::new(&asm.imports);

    for init in &asm.grammar.initializers {
        regs.user_code
            .add_initializer(init.namespace.as_deref(), &init.code);
    }

    let mut rules = Vec::new();
    for (i, rule) in asm.grammar.rules.iter().enumerate() {
        if i > 0 {
            rules.push(Stmt::Blank);
        }
        let is_start = start_rules.contains(&rule.name.as_str());
        let lowered =
            RuleLowerer::new(&asm.imports, asm.types, &mut regs).lower_rule(rule, is_start)?;
        rules.extend(lowered);
    }
    debug!(
        patterns = regs.patterns.len(),
        expected = regs.expected.len(),
        predicates = regs.user_code.predicate_count(),
        actions = regs.user_code.action_count(),
        "registries flushed"
    );

    let mut unit = Vec::new();
    if let Some(package) = &options.package {
        unit.push(Stmt::line(format!("package {};", package)));
        unit.push(Stmt::Blank);
    }
    if !asm.imports.uses_full_names() {
        unit.extend(asm.imports.declarations().into_iter().map(Stmt::Line));
        unit.push(Stmt::Blank);
    }
    unit.push(asm.user_code(&regs));
    unit.push(Stmt::Blank);
    unit.push(Stmt::line(format!("@{}", asm.r("Grammar"))));

    let mut class = Vec::new();
    class.push(banner("PATTERNS"));
    class.extend(regs.patterns.definitions().into_iter().map(Stmt::Line));
    class.push(banner("EXPECTED DEFINITIONS"));
    class.extend(regs.expected.definitions().into_iter().map(Stmt::Line));
    class.push(banner("ALLOWED START RULES"));
    for (name, constant, ty) in &entries {
        class.push(asm.entry_point(name, constant, ty));
    }
    let holder = asm.user_code_class();
    class.push(Stmt::line(format!(
        "private final {h} uc = new {h}(this);",
        h = holder
    )));
    class.push(Stmt::Blank);
    class.extend(asm.api(default_rule));
    class.push(Stmt::Blank);
    class.extend(asm.parse_rule_helper());
    class.push(Stmt::Blank);
    class.push(Stmt::line(
        "//<editor-fold defaultstate=\"collapsed\" desc=\"Rule functions\">",
    ));
    class.extend(rules);
    class.push(Stmt::line("//</editor-fold>"));

    let base = match &options.base_class_name {
        Some(base) => base.clone(),
        None => asm.r("State"),
    };
    unit.push(Stmt::block(
        format!(
            "public class {} extends {} implements {}<{}> {{",
            asm.class_name(),
            base,
            asm.r("IParser"),
            asm.r("Object")
        ),
        class,
        "}",
    ));

    let config = PrintConfig {
        indent_size: options.indent,
    };
    Ok(emit::render(&unit, &config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banners_are_fixed_width() {
        let Stmt::Line(patterns) = banner("PATTERNS") else {
            panic!("banner is a line");
        };
        let Stmt::Line(actions) = banner("ACTIONS") else {
            panic!("banner is a line");
        };
        assert_eq!(patterns.len(), actions.len());
        assert!(patterns.starts_with("/*~"));
        assert!(patterns.contains(" PATTERNS "));
    }
}

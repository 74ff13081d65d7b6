//! The pegj compiler CLI.
//!
//! Provides the `pegjc` command with the following subcommands:
//!
//! - `pegjc generate <ast.json>` - Generate a Java parser from a grammar AST
//! - `pegjc types <ast.json>` - Print the inferred return type of every rule
//!
//! Options shared by both:
//! - `--config` - TOML options file; flags given on the command line win
//! - `--source` - Grammar text the AST locations point into
//! - `--strict-types` - Treat actions without `@Return` as errors
//! - `--json` - Output diagnostics as JSON (one object per line)
//! - `--no-color` - Disable colorized output
//! - `--log-level` - Tracing filter, overriding `RUST_LOG`

mod logging;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use pegj_common::diagnostics::{render, DiagnosticOptions};
use pegj_common::{DiagnosticSink, Diagnostics, Grammar, Options};

#[derive(Parser)]
#[command(name = "pegjc", version, about = "Java parser generator for PEG grammars")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// Grammar AST produced by the front-end, as JSON
    input: PathBuf,

    /// Options file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grammar source text, used to show diagnostics in context
    #[arg(long)]
    source: Option<PathBuf>,

    /// Reject actions that carry no `@Return` annotation
    #[arg(long = "strict-types")]
    strict_types: bool,

    /// Output diagnostics as JSON (one object per line) instead of human-readable format
    #[arg(long)]
    json: bool,

    /// Disable colorized output
    #[arg(long = "no-color")]
    no_color: bool,

    /// Log filter (e.g. `debug`, `pegj_typeck=trace`); defaults to `RUST_LOG`
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a Java parser from a grammar AST
    Generate {
        #[command(flatten)]
        common: Common,

        /// Package of the generated class
        #[arg(long)]
        package: Option<String>,

        /// Name of the generated class
        #[arg(long = "class-name")]
        class_name: Option<String>,

        /// Superclass of the generated parser
        #[arg(long = "base-class")]
        base_class: Option<String>,

        /// Rule the parser may start from (repeatable; the first is the default)
        #[arg(long = "start-rule")]
        start_rules: Vec<String>,

        /// Spell runtime classes with fully qualified names instead of imports
        #[arg(long = "full-names")]
        full_names: bool,

        /// Output path for the generated source (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the inferred return type of every rule
    Types {
        #[command(flatten)]
        common: Common,
    },
}

/// Grammar, options and diagnostics context of one invocation.
struct Session {
    grammar: Grammar,
    options: Options,
    source: Option<String>,
    file_name: String,
    diag_opts: DiagnosticOptions,
}

impl Session {
    fn open(common: &Common) -> Result<Session, String> {
        let diag_opts = DiagnosticOptions {
            color: !common.no_color && !common.json,
            json: common.json,
        };
        let file_name = common.input.display().to_string();

        let mut options = match &common.config {
            Some(path) => Options::from_file(path).map_err(|e| e.to_string())?,
            None => Options::default(),
        };
        if common.strict_types {
            options.default_action_return_type = None;
        }

        let source = match &common.source {
            Some(path) => Some(read(path)?),
            None => None,
        };

        let text = read(&common.input)?;
        let grammar = match Grammar::from_json(&text) {
            Ok(grammar) => grammar,
            Err(e) => {
                let mut diags = Diagnostics::new();
                diags.emit_error(e.to_string(), e.location());
                report(&diags, source.as_deref(), &file_name, &diag_opts);
                return Err("could not load grammar".to_string());
            }
        };
        debug!(rules = grammar.rules.len(), nodes = grammar.node_count(), "grammar loaded");

        Ok(Session {
            grammar,
            options,
            source,
            file_name,
            diag_opts,
        })
    }

    fn report(&self, diags: &Diagnostics) {
        report(diags, self.source.as_deref(), &self.file_name, &self.diag_opts);
    }
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("failed to read '{}': {}", path.display(), e))
}

/// Print error diagnostics to stderr. Notes only go to the log.
fn report(diags: &Diagnostics, source: Option<&str>, file_name: &str, opts: &DiagnosticOptions) {
    for diag in diags.iter() {
        if diag.is_error() {
            eprint!("{}", render(diag, source, file_name, opts));
        } else {
            debug!(location = ?diag.location, "{}", diag.message);
        }
    }
}

fn generate(mut session: Session, overrides: Overrides) -> Result<(), String> {
    overrides.apply(&mut session.options);

    let mut diags = Diagnostics::new();
    let result = pegj_codegen::compile(&session.grammar, &session.options, &mut diags);
    session.report(&diags);
    let source = result.map_err(|e| e.to_string())?;

    match overrides.output {
        Some(path) => std::fs::write(&path, source)
            .map_err(|e| format!("failed to write '{}': {}", path.display(), e)),
        None => {
            print!("{}", source);
            Ok(())
        }
    }
}

fn types(session: Session) -> Result<(), String> {
    let mut diags = Diagnostics::new();
    let result = pegj_typeck::check(
        &session.grammar,
        session.options.default_action_return_type.as_deref(),
        &mut diags,
    );
    session.report(&diags);
    if !result.is_ok() {
        return Err(format!("type inference failed with {} error(s)", result.errors.len()));
    }

    for (index, rule) in session.grammar.rules.iter().enumerate() {
        let Some(ty) = result.types.rule(index) else {
            continue;
        };
        if session.diag_opts.json {
            let line = serde_json::json!({
                "rule": rule.name,
                "type": ty.to_string(),
                "primitive": ty.is_primitive(),
            });
            println!("{}", line);
        } else {
            println!("{}: {}", rule.name, ty);
        }
    }
    Ok(())
}

/// Command-line values that take precedence over the options file.
struct Overrides {
    package: Option<String>,
    class_name: Option<String>,
    base_class: Option<String>,
    start_rules: Vec<String>,
    full_names: bool,
    output: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, options: &mut Options) {
        if let Some(package) = &self.package {
            options.package = Some(package.clone());
        }
        if let Some(class_name) = &self.class_name {
            options.class_name = class_name.clone();
        }
        if let Some(base) = &self.base_class {
            options.base_class_name = Some(base.clone());
        }
        if !self.start_rules.is_empty() {
            options.allowed_start_rules = self.start_rules.clone();
        }
        if self.full_names {
            options.use_fully_qualified_names = true;
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let (common, result) = match cli.command {
        Commands::Generate {
            common,
            package,
            class_name,
            base_class,
            start_rules,
            full_names,
            output,
        } => {
            logging::init_with_level(common.log_level.as_deref());
            let overrides = Overrides {
                package,
                class_name,
                base_class,
                start_rules,
                full_names,
                output,
            };
            let result = Session::open(&common).and_then(|s| generate(s, overrides));
            (common, result)
        }
        Commands::Types { common } => {
            logging::init_with_level(common.log_level.as_deref());
            let result = Session::open(&common).and_then(types);
            (common, result)
        }
    };

    if let Err(e) = result {
        if common.json {
            let msg = serde_json::json!({
                "code": "G0001",
                "severity": "error",
                "message": e,
                "file": common.input.display().to_string(),
                "spans": [],
            });
            eprintln!("{}", msg);
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use pixql_core::grammar::trace::TracePrinter;
use pixql_core::grammar::Grammar;
use pixql_core::{AnalysisResult, Compiler, CompilerOptions, Diagnose, Diagnostic, MetadataSnapshot, QueryPlan};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// pixql query-language toolchain.
#[derive(Parser)]
#[command(name = "pixql", version, about = "pixql query-language toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log compiler stages to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Compiler options file (TOML); defaults to ./pixql.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inline JSON patch applied over the options, e.g. '{"forecast_limit": null}'
    #[arg(long, global = true)]
    set: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query into a query plan
    Compile {
        /// Query text
        query: String,
        /// Metadata snapshot JSON used to resolve names
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Suggest completions for the word under the cursor
    Forecast {
        /// Query text
        query: String,
        /// Character offset of the cursor
        #[arg(long)]
        cursor: usize,
        /// Metadata snapshot JSON used for suggestions
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Print the lexical items of a query
    Lex {
        /// Query text
        query: String,
    },

    /// Print every parser transition for a query
    Trace {
        /// Query text
        query: String,
    },

    /// Print the embedded syntax table, or build one for another grammar
    Table {
        /// Grammar definition file to build instead of the embedded one
        #[arg(long)]
        grammar: Option<PathBuf>,
    },

    /// Validate query plan JSON against the formal JSON Schema
    Validate {
        /// Path to the query plan JSON file
        plan: PathBuf,
    },

    /// Render query plan JSON back into query text
    Render {
        /// Path to the query plan JSON file
        plan: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Compile { query, metadata } => {
            let compiler = compiler_or_exit(&cli.config, &cli.set, cli.output, cli.quiet);
            cmd_compile(&compiler, &query, metadata.as_deref(), cli.output, cli.quiet);
        }
        Commands::Forecast {
            query,
            cursor,
            metadata,
        } => {
            let compiler = compiler_or_exit(&cli.config, &cli.set, cli.output, cli.quiet);
            cmd_forecast(&compiler, &query, cursor, metadata.as_deref(), cli.output, cli.quiet);
        }
        Commands::Lex { query } => {
            let compiler = compiler_or_exit(&cli.config, &cli.set, cli.output, cli.quiet);
            cmd_lex(&compiler, &query, cli.output, cli.quiet);
        }
        Commands::Trace { query } => {
            let compiler = compiler_or_exit(&cli.config, &cli.set, cli.output, cli.quiet);
            cmd_trace(&compiler, &query, cli.output, cli.quiet);
        }
        Commands::Table { grammar } => {
            cmd_table(grammar.as_deref(), cli.output, cli.quiet);
        }
        Commands::Validate { plan } => {
            cmd_validate(&plan, cli.output, cli.quiet);
        }
        Commands::Render { plan } => {
            cmd_render(&plan, cli.output, cli.quiet);
        }
    }
}

/// `PIXQL_LOG` takes precedence over `--verbose`. Logs go to stderr so
/// they never mix with command output.
fn setup_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PIXQL_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("pixql_core=debug,pixql=debug")
        } else {
            EnvFilter::new("error")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn compiler_or_exit(
    config: &Option<PathBuf>,
    set: &Option<String>,
    output: OutputFormat,
    quiet: bool,
) -> Compiler {
    let options = match config::load(config.as_deref(), set.as_deref()) {
        Ok(options) => options,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match Compiler::load(options) {
        Ok(compiler) => compiler,
        Err(e) => {
            let msg = format!("internal error: failed to load embedded grammar: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn load_metadata(path: Option<&Path>, output: OutputFormat, quiet: bool) -> MetadataSnapshot {
    let Some(path) = path else {
        return MetadataSnapshot::default();
    };
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match MetadataSnapshot::from_json(&text) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let msg = format!("error parsing metadata in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn read_plan(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn to_pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e))
}

/// Print a stage result's diagnostics; exits 1 when it has errors.
fn report_diagnostics<T, E: Diagnose>(result: &AnalysisResult<T, E>, output: OutputFormat, quiet: bool) {
    let warnings = result.warning_diagnostics();
    let errors = result.error_diagnostics();
    match output {
        OutputFormat::Text => {
            if !quiet {
                for d in &warnings {
                    eprintln!("warning: {}", d);
                }
                for d in &errors {
                    eprintln!("error: {}", d);
                }
            }
        }
        OutputFormat::Json => {
            if !errors.is_empty() {
                let json = serde_json::json!({ "warnings": warnings, "errors": errors });
                eprintln!("{}", to_pretty(&json));
            }
        }
    }
    if !errors.is_empty() {
        process::exit(1);
    }
}

fn cmd_compile(compiler: &Compiler, query: &str, metadata: Option<&Path>, output: OutputFormat, quiet: bool) {
    let lookup = load_metadata(metadata, output, quiet);
    let result = compiler.compile(query, &lookup);
    report_diagnostics(&result, output, quiet);
    let Some(plan) = result.result else {
        report_error("no query plan produced", output, quiet);
        process::exit(1);
    };
    match output {
        OutputFormat::Text => println!("{}", to_pretty(&plan)),
        OutputFormat::Json => {
            let warnings: Vec<Diagnostic> = result.warnings.iter().map(Diagnostic::from).collect();
            let json = serde_json::json!({ "plan": plan, "warnings": warnings });
            println!("{}", to_pretty(&json));
        }
    }
}

fn cmd_forecast(
    compiler: &Compiler,
    query: &str,
    cursor: usize,
    metadata: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let lookup = load_metadata(metadata, output, quiet);
    let forecast = compiler.forecast(query, cursor, &lookup);
    match (output, forecast) {
        (OutputFormat::Json, forecast) => println!("{}", to_pretty(&forecast)),
        (OutputFormat::Text, None) => {
            if !quiet {
                println!("no forecast");
            }
        }
        (OutputFormat::Text, Some(forecast)) => {
            if !quiet {
                println!("replace {}", forecast.span);
            }
            for s in &forecast.suggestions {
                match s.kind {
                    Some(kind) => println!("{}  ({})", s.name, kind),
                    None => println!("{}", s.name),
                }
            }
        }
    }
}

fn cmd_lex(compiler: &Compiler, query: &str, output: OutputFormat, quiet: bool) {
    let result = compiler.lex(query);
    let items = result.result.clone().unwrap_or_default();
    match output {
        OutputFormat::Text => {
            for item in &items {
                let text = pixql_core::grammar::parser::token_text(item);
                println!("{:<8} {:<6} {}", item.range.to_string(), item.terminal(), text);
            }
        }
        OutputFormat::Json => println!("{}", to_pretty(&items)),
    }
    report_diagnostics(&result, output, quiet);
}

fn cmd_trace(compiler: &Compiler, query: &str, output: OutputFormat, quiet: bool) {
    let mut printer = TracePrinter::new();
    let result = compiler.parse_with_hook(query, &mut printer);
    match output {
        OutputFormat::Text => {
            for line in printer.lines() {
                println!("{}", line);
            }
        }
        OutputFormat::Json => println!("{}", to_pretty(&printer.lines())),
    }
    report_diagnostics(&result, output, quiet);
}

fn cmd_table(grammar_path: Option<&Path>, output: OutputFormat, quiet: bool) {
    let grammar = match grammar_path {
        None => Grammar::load(),
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    let msg = format!("error reading file '{}': {}", path.display(), e);
                    report_error(&msg, output, quiet);
                    process::exit(1);
                }
            };
            Grammar::from_definition(&text)
        }
    };
    let grammar = match grammar {
        Ok(g) => g,
        Err(e) => {
            report_error(&format!("grammar rejected: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let table = grammar.table();
    match output {
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "{} productions, {} states",
                    grammar.expressions().len(),
                    table.state_count()
                );
            }
            print!("{}", table.to_text());
        }
        OutputFormat::Json => {
            let productions: Vec<String> = grammar.expressions().iter().map(|e| e.to_string()).collect();
            let json = serde_json::json!({
                "productions": productions,
                "states": table.state_count(),
                "terminals": table.terminals(),
                "non_terminals": table.non_terminals(),
            });
            println!("{}", to_pretty(&json));
        }
    }
}

static PLAN_SCHEMA_STR: &str = include_str!("../../../docs/query-plan-schema.json");

fn cmd_validate(plan_path: &Path, output: OutputFormat, quiet: bool) {
    let schema: serde_json::Value = match serde_json::from_str(PLAN_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded plan schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let doc = read_plan(plan_path, output, quiet);

    let errors: Vec<String> = validator.iter_errors(&doc).map(|e| format!("{}", e)).collect();

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
    } else {
        match output {
            OutputFormat::Text => {
                if !quiet {
                    eprintln!("invalid plan");
                    for err in &errors {
                        eprintln!("  - {}", err);
                    }
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({ "valid": false, "errors": errors });
                eprintln!("{}", to_pretty(&json));
            }
        }
        process::exit(1);
    }
}

fn cmd_render(plan_path: &Path, output: OutputFormat, quiet: bool) {
    let doc = read_plan(plan_path, output, quiet);
    let plan: QueryPlan = match serde_json::from_value(doc) {
        Ok(p) => p,
        Err(e) => {
            let msg = format!("error: '{}' is not a query plan: {}", plan_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let text = pixql_core::to_query_text(&plan);
    match output {
        OutputFormat::Text => println!("{}", text),
        OutputFormat::Json => println!("{}", to_pretty(&serde_json::json!({ "query": text }))),
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from(["pixql", "compile", "cat", "--output", "json", "--quiet"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Compile { ref query, .. } if query == "cat"));
    }

    #[test]
    fn default_options_without_config() {
        let options: CompilerOptions = config::load(None, None).unwrap();
        assert_eq!(options, CompilerOptions::default());
    }
}

mod bindings;

use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::{Level, debug};

use mixdown::{ParseError, Section};

const SUBCOMMANDS: &[&str] = &["check", "ast", "fmt", "eval", "help"];

#[derive(Parser)]
#[command(name = "mixdown", version, about = "Mixdown document compiler")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log compiler activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a document and report syntax errors
    Check(FileArgs),

    /// Dump the parsed document tree
    Ast(FileArgs),

    /// Print the document back in canonical form
    Fmt(FileArgs),

    /// Compile a document and print every value as JSON
    Eval(EvalArgs),
}

#[derive(clap::Args)]
struct FileArgs {
    /// Mixdown source file
    file: String,
}

#[derive(clap::Args)]
struct EvalArgs {
    /// Mixdown source file
    file: String,

    /// Bindings for expressions and mixin bases (.json or .toml). Repeatable;
    /// later files win.
    #[arg(short, long)]
    context: Vec<String>,

    /// Only evaluate values inside this section
    #[arg(short, long)]
    section: Option<String>,

    /// Don't provide the random-data helpers
    #[arg(long)]
    no_helpers: bool,
}

fn main() {
    // If the first positional arg is not a known subcommand, inject "eval"
    // so `mixdown file.md` works like `mixdown eval file.md`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        if !SUBCOMMANDS.contains(&args[pos + 1].as_str()) {
            args.insert(pos + 1, "eval".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Check(args) => {
            load(&args.file, color_choice);
            eprintln!("ok: {} parsed successfully", args.file);
        }
        Command::Ast(args) => {
            let (_, document) = load(&args.file, color_choice);
            println!("{:#?}", document);
        }
        Command::Fmt(args) => {
            let (_, document) = load(&args.file, color_choice);
            println!("{}", mixdown::stringify(&document));
        }
        Command::Eval(args) => do_eval(args, color_choice),
    }
}

/// Read and parse `path`, exiting with a rendered diagnostic on failure.
fn load(path: &str, color_choice: ColorChoice) -> (String, Section) {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path, e);
            process::exit(1);
        }
    };

    match mixdown::parse(&source) {
        Ok(document) => {
            debug!(path, "parsed document");
            (source, document)
        }
        Err(error) => {
            emit_parse_error(path, &source, &error, color_choice);
            process::exit(1);
        }
    }
}

fn do_eval(args: EvalArgs, color_choice: ColorChoice) {
    let (source, document) = load(&args.file, color_choice);

    let mut context = if args.no_helpers {
        mixdown::Context::new()
    } else {
        interpreter::base_context()
    };
    for path in &args.context {
        match bindings::load(path) {
            Ok(bindings) => context.extend(bindings),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
    }

    let document = match interpreter::compile(&source, Some(document)) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let scope = match &args.section {
        Some(name) => match document.find_section(name) {
            Some(section) => section,
            None => {
                eprintln!("error: no section named '{}'", name);
                process::exit(1);
            }
        },
        None => &document,
    };

    let mut failed = false;
    for value in scope.values() {
        let Some(compiled) = value.compiled() else {
            continue;
        };
        match compiled.run(&context) {
            Ok(result) => match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("error: value at line {} is not serializable: {}", value.line, e);
                    failed = true;
                }
            },
            Err(error) => {
                eprintln!("runtime error: {}", error);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

fn emit_parse_error(path: &str, source: &str, error: &ParseError, color_choice: ColorChoice) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.to_string(), source.to_string());

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    let diagnostic = error.to_diagnostic(file_id, source);
    let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
}


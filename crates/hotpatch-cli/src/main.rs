use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hotpatch_config::{init_tracing, FieldVisibility, HotpatchConfig};
use hotpatch_rewrite::{rewrite_source, AppliedRewrite, RewriteError};
use hotpatch_syntax::{debug_dump, parse_csharp, ParseError};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "hotpatch",
    version,
    about = "Rewrite C# sources so recompiled types can be hot-patched into a running program"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite one file and print the result
    Rewrite(RewriteArgs),
    /// Print a debug parse tree / errors for a single file
    Parse(ParseArgs),
}

#[derive(Args)]
struct RewriteArgs {
    file: PathBuf,

    /// Config file; defaults to `hotpatch.toml` or `.hotpatch.toml` next to FILE
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attach a `/*Pass:Rule*/` comment to every rewrite
    #[arg(long)]
    annotate: bool,

    /// Also cast values returned from methods that return the enclosing type
    #[arg(long)]
    cast_returns: bool,

    /// Treat static fields without an access modifier as private
    #[arg(long)]
    implicit_private: bool,

    /// Emit a JSON report instead of the rewritten source
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ParseArgs {
    file: PathBuf,

    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Rewrite(args) => rewrite(args),
        Command::Parse(args) => parse(args),
    }
}

#[derive(Serialize)]
struct RewriteReport<'a> {
    file: &'a Path,
    output: String,
    rewrites: Vec<AppliedRewrite>,
}

#[derive(Serialize)]
struct ParseReport<'a> {
    file: &'a Path,
    errors: &'a [ParseError],
    tree: String,
}

fn load_config(args: &RewriteArgs) -> Result<HotpatchConfig> {
    let mut config = match &args.config {
        Some(path) => HotpatchConfig::load_from_path(path)?,
        None => {
            let dir = args
                .file
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            HotpatchConfig::load_for_dir(dir)?.0
        }
    };

    let rewrite = &mut config.rewrite;
    rewrite.write_rewrite_reason_as_comment |= args.annotate;
    rewrite.cast_same_typed_returns |= args.cast_returns;
    if args.implicit_private {
        rewrite.field_visibility = FieldVisibility::ImplicitPrivate;
    }
    Ok(config)
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn rewrite(args: RewriteArgs) -> Result<i32> {
    let config = load_config(&args)?;
    init_tracing(&config.logging);

    let _span = tracing::info_span!("rewrite", file = %args.file.display()).entered();
    let source = read_source(&args.file)?;
    let outcome = match rewrite_source(&source, &config.rewrite) {
        Ok(outcome) => outcome,
        Err(RewriteError::InvalidInput { errors }) => {
            for error in &errors {
                eprintln!("{}: {}", args.file.display(), error);
            }
            return Ok(1);
        }
        Err(err) => return Err(err.into()),
    };

    if args.json {
        let report = RewriteReport {
            file: &args.file,
            output: outcome.text(),
            rewrites: outcome.rewrites,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", outcome.text());
    }
    Ok(0)
}

fn parse(args: ParseArgs) -> Result<i32> {
    let source = read_source(&args.file)?;
    let result = parse_csharp(&source);
    let tree = debug_dump(&result.syntax());
    let exit = if result.errors.is_empty() { 0 } else { 1 };

    if args.json {
        let report = ParseReport {
            file: &args.file,
            errors: &result.errors,
            tree,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{tree}");
        for error in &result.errors {
            println!("error: {error}");
        }
    }
    Ok(exit)
}

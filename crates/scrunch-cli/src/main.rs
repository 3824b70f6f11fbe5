//! scrunch command-line front end.
//!
//! Reads one or more scripts, runs them through the cruncher, and writes
//! the results. A single input goes to stdout unless `--output` says
//! otherwise; multiple inputs are processed in parallel, each to a
//! `<name>.min.js` sibling.

mod logging;

use clap::Parser;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use rayon::prelude::*;
use scrunch::{LineIndex, MinifyOptions, OutputMode, Severity};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "scrunch")]
#[command(author, version, about = "Scope-aware JavaScript cruncher", long_about = None)]
struct Cli {
    /// Input scripts to crunch
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Output path (single input only; default: stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// One statement per line instead of everything on one
    #[arg(long)]
    multi_line: bool,

    /// Keep all identifier names
    #[arg(long)]
    no_rename: bool,

    /// Keep label names
    #[arg(long)]
    no_rename_labels: bool,

    /// Keep labels that nothing jumps to
    #[arg(long)]
    keep_labels: bool,

    /// Keep quotes around object property names
    #[arg(long)]
    keep_quotes: bool,

    /// Assume eval never reads or writes local names
    #[arg(long)]
    evals_are_safe: bool,

    /// Also rename bindings declared at the top level
    #[arg(long)]
    rename_top_level: bool,

    /// Comma-separated names to leave untouched
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    reserve: Vec<String>,

    /// Read options from a JSON file (flags still win)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit a JSON result summary on stdout
    #[arg(long, global = true)]
    json: bool,
}

/// Per-file result, also the JSON summary shape.
#[derive(Serialize)]
struct CrunchResultJson {
    ok: bool,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    size_before: usize,
    size_after: usize,
    duration_ms: u64,
    warnings: usize,
    errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    if cli.output.is_some() && cli.inputs.len() > 1 {
        return Err(miette!("--output requires exactly one input file"));
    }

    let options = build_options(&cli)?;

    // With `--json` the summary owns stdout, so code always goes to a file
    let single_stdout = cli.inputs.len() == 1 && cli.output.is_none() && !cli.json;
    let results: Vec<CrunchResultJson> = if single_stdout {
        vec![crunch_file(&cli.inputs[0], None, &options)]
    } else if cli.inputs.len() == 1 {
        let out = cli.output.clone().unwrap_or_else(|| default_output(&cli.inputs[0]));
        vec![crunch_file(&cli.inputs[0], Some(&out), &options)]
    } else {
        cli.inputs
            .par_iter()
            .map(|input| {
                let out = default_output(input);
                crunch_file(input, Some(&out), &options)
            })
            .collect()
    };

    let failed = results.iter().filter(|r| !r.ok).count();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results).into_diagnostic()?);
    } else {
        for r in &results {
            if let Some(err) = &r.error {
                error!("{}: {err}", r.input);
            } else if let Some(out) = &r.output {
                info!("{} -> {out} ({} -> {} bytes)", r.input, r.size_before, r.size_after);
            }
        }
    }

    if failed > 0 {
        return Err(miette!("{failed} of {} file(s) failed", results.len()));
    }
    Ok(())
}

fn build_options(cli: &Cli) -> Result<MinifyOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text)
                .into_diagnostic()
                .wrap_err_with(|| format!("parsing {}", path.display()))?
        }
        None => MinifyOptions::default(),
    };

    if cli.no_rename {
        options.crunch.rename_locals = false;
    }
    if cli.no_rename_labels {
        options.crunch.rename_labels = false;
    }
    if cli.keep_labels {
        options.crunch.remove_unreferenced_labels = false;
    }
    if cli.keep_quotes {
        options.crunch.unquote_safe_property_names = false;
    }
    if cli.evals_are_safe {
        options.crunch.evals_are_safe = true;
    }
    if cli.rename_top_level {
        options.crunch.rename_top_level = true;
    }
    options.crunch.reserved_names.extend(cli.reserve.iter().cloned());
    if cli.multi_line {
        options.codegen.output_mode = OutputMode::MultiLine;
    }
    Ok(options)
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    input.with_file_name(format!("{stem}.min.js"))
}

/// Crunch one file. Failures land in the result instead of aborting the
/// run, so sibling files still get processed.
fn crunch_file(input: &Path, out: Option<&Path>, options: &MinifyOptions) -> CrunchResultJson {
    let start = Instant::now();
    let mut result = CrunchResultJson {
        ok: false,
        input: input.display().to_string(),
        output: out.map(|p| p.display().to_string()),
        size_before: 0,
        size_after: 0,
        duration_ms: 0,
        warnings: 0,
        errors: 0,
        error: None,
    };

    let source = match fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            result.error = Some(format!("read failed: {e}"));
            result.duration_ms = start.elapsed().as_millis() as u64;
            return result;
        }
    };
    result.size_before = source.len();

    match scrunch::minify(&source, options) {
        Ok(doc) => {
            let index = LineIndex::new(&source);
            for diagnostic in &doc.diagnostics {
                let (line, col) = index.line_col(diagnostic.span.start);
                match diagnostic.severity {
                    Severity::Warning => {
                        result.warnings += 1;
                        warn!("{}:{}:{}: {diagnostic}", input.display(), line + 1, col + 1);
                    }
                    Severity::Error => {
                        result.errors += 1;
                        error!("{}:{}:{}: {diagnostic}", input.display(), line + 1, col + 1);
                    }
                }
            }
            result.size_after = doc.code.len();
            let written = match out {
                Some(path) => {
                    fs::write(path, doc.code.as_bytes()).map_err(|e| format!("write failed: {e}"))
                }
                None => {
                    println!("{}", doc.code);
                    Ok(())
                }
            };
            match written {
                Ok(()) => result.ok = true,
                Err(e) => result.error = Some(e),
            }
        }
        Err(e) => result.error = Some(e.to_string()),
    }
    result.duration_ms = start.elapsed().as_millis() as u64;
    result
}

//! hxtype - type loading and conformance checks for Haxe module syntax
//!
//! # Usage
//!
//! ```bash
//! # Check every module of a project file
//! hxtype check project.json
//!
//! # Check selected modules, as a display query
//! hxtype check project.json --module app.Main --display
//!
//! # Machine readable diagnostics
//! hxtype check project.json --format json
//!
//! # Show loader defaults
//! hxtype info
//! ```
//!
//! A project file is either a JSON array of modules, or an object with a
//! `modules` array plus optional `config` and `check` (module paths) entries.

use clap::{Parser, Subcommand, ValueEnum};
use diagnostics::{Diagnostic, ErrorFormatter};
use serde::Deserialize;
use source_map::SourceMap;
use std::path::PathBuf;
use std::process;
use typeload::syntax::ModuleSyntax;
use typeload::tast::{DeclKind, MemoryLoader, ModulePath};
use typeload::{TypeloadConfig, TypeloadContext};

#[derive(Parser)]
#[command(name = "hxtype")]
#[command(version = "0.1.0")]
#[command(about = "Type resolution and structural conformance checks for Haxe modules", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load modules and report type errors
    Check {
        /// Path to the project file
        file: PathBuf,

        /// Modules to check (defaults to every module in the project)
        #[arg(short, long = "module")]
        modules: Vec<String>,

        /// Display query: unresolved heritage is not reported
        #[arg(long)]
        display: bool,

        /// Skip the final field initialization check
        #[arg(long)]
        no_final_check: bool,

        /// Print the field types of every checked class
        #[arg(long)]
        show_types: bool,

        /// Colored diagnostics
        #[arg(long)]
        color: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show loader defaults
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectFile {
    Modules(Vec<ModuleSyntax>),
    Project {
        #[serde(default)]
        config: TypeloadConfig,
        #[serde(default)]
        check: Vec<String>,
        modules: Vec<ModuleSyntax>,
    },
}

fn main() {
    let cli = Cli::parse();
    typeload::logging::init_for_cli(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            file,
            modules,
            display,
            no_final_check,
            show_types,
            color,
            format,
        } => {
            let options = CheckOptions {
                modules,
                display,
                no_final_check,
                show_types,
                color,
                format,
            };
            check_project(file, options)
        }
        Commands::Info => {
            show_info();
            Ok(true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

struct CheckOptions {
    modules: Vec<String>,
    display: bool,
    no_final_check: bool,
    show_types: bool,
    color: bool,
    format: OutputFormat,
}

/// Returns whether the project checked without errors
fn check_project(file: PathBuf, options: CheckOptions) -> Result<bool, String> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()));
    }
    let source = std::fs::read_to_string(&file).map_err(|e| format!("Failed to read file: {}", e))?;
    let project: ProjectFile =
        serde_json::from_str(&source).map_err(|e| format!("Invalid project file: {}", e))?;

    let (mut config, listed, modules) = match project {
        ProjectFile::Modules(modules) => (TypeloadConfig::default(), Vec::new(), modules),
        ProjectFile::Project { config, check, modules } => (config, check, modules),
    };
    config.display_mode |= options.display;
    if options.no_final_check {
        config.check_final_vars = false;
    }

    let mut loader = MemoryLoader::new();
    for module in modules {
        loader.add(module);
    }
    let targets: Vec<String> = if !options.modules.is_empty() {
        options.modules.clone()
    } else if !listed.is_empty() {
        listed
    } else {
        loader.module_paths().iter().map(ModulePath::to_string).collect()
    };
    log::info!("checking {} of {} modules", targets.len(), loader.len());

    let mut ctx = TypeloadContext::with_loader(config, Box::new(loader));
    for target in &targets {
        if let Err(err) = ctx.check_module(target) {
            ctx.report(err);
        }
    }

    match options.format {
        OutputFormat::Text => print_text(&ctx, &targets, &options),
        OutputFormat::Json => print_json(&ctx)?,
    }
    Ok(!ctx.diagnostics.has_errors())
}

fn print_text(ctx: &TypeloadContext, targets: &[String], options: &CheckOptions) {
    let formatter = if options.color {
        ErrorFormatter::with_colors()
    } else {
        ErrorFormatter::new()
    };
    // Spans come from the syntax files; no source text is available here
    let sources = SourceMap::new();
    if !ctx.diagnostics.is_empty() {
        println!("{}", formatter.format_diagnostics(&ctx.diagnostics, &sources));
    }

    if options.show_types {
        for target in targets {
            print_module_types(ctx, target);
        }
    }

    let errors = ctx.diagnostics.errors().count();
    let warnings = ctx.diagnostics.warnings().count();
    if errors == 0 {
        println!("✓ {} module(s) checked, {} warning(s)", targets.len(), warnings);
    } else {
        println!("✗ {} error(s), {} warning(s)", errors, warnings);
    }
}

fn print_module_types(ctx: &TypeloadContext, target: &str) {
    let Some(module) = ctx.modules.find(&ModulePath::parse(target)) else {
        return;
    };
    println!("\nmodule {}", target);
    for decl in &ctx.modules.get(module).decls {
        let d = ctx.decl(*decl);
        match &d.kind {
            DeclKind::Class(class) => {
                println!("  class {}", d.path);
                if let Some((sup, params)) = &class.super_class {
                    let parent = typeload::tast::Type::instance(*sup, params.clone());
                    println!("    extends {}", ctx.type_to_string(&parent));
                }
                for (name, field) in class.fields.iter().chain(class.statics.iter()) {
                    println!("    {} : {}", name, ctx.type_to_string(&field.ty));
                }
            }
            DeclKind::Typedef(typedef) => {
                if let Some(target) = &typedef.target {
                    println!("  typedef {} = {}", d.path, ctx.type_to_string(target));
                }
            }
            _ => println!("  {}", d.path),
        }
    }
}

fn diagnostic_json(d: &Diagnostic) -> serde_json::Value {
    serde_json::json!({
        "severity": d.severity.to_string(),
        "code": d.code,
        "message": d.message,
        "span": d.span.to_string(),
        "related": d
            .related()
            .map(|(message, span)| serde_json::json!({ "message": message, "span": span.to_string() }))
            .collect::<Vec<_>>(),
        "notes": d.notes,
        "help": d.help,
    })
}

fn print_json(ctx: &TypeloadContext) -> Result<(), String> {
    let report = serde_json::json!({
        "status": if ctx.diagnostics.has_errors() { "error" } else { "ok" },
        "diagnostics": ctx.diagnostics.iter().map(diagnostic_json).collect::<Vec<_>>(),
    });
    let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn show_info() {
    let config = TypeloadConfig::default();
    println!("hxtype v0.1.0");
    println!("Type loading for Haxe module syntax\n");
    println!("Defaults:");
    println!("  build retries:      {}", config.max_build_retries);
    println!("  std root package:   {}", config.std_root);
    println!("  final var check:    {}", config.check_final_vars);
    println!("  display mode:       {}", config.display_mode);
    println!("\nBuiltin types: Void, Int, Float, Bool, String, Dynamic, Null<T>, Array<T>, ArrayAccess<T>");
}

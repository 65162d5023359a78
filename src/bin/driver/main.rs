//! Command-line driver: collect sources, run the passes in order, write
//! one assembly file. Every fatal diagnostic prints a single line and
//! exits with status 1.

mod args;
mod driver_error;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;

use args::Args;
use driver_error::DriverError;

use m2planet::codegen::{Architecture, OperatingSystem};
use m2planet::emission;
use m2planet::lexer::{lex, TokenList};
use m2planet::parser;
use m2planet::preprocessor::{self, MacroEnv};
use m2planet::session::{debug, Define, Session, BOOTSTRAP_MAX_STRING, DEFAULT_MAX_STRING};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let session = build_session(&args)?;

    let mut tokens = TokenList::new();
    for path in &args.files {
        let source = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let file = path.to_string_lossy();
        let lexed = lex(&source, &file, session.lex_mode(), session.max_string)?;
        let tail = tokens.tail();
        tokens.splice_after(tail, lexed);
    }

    if args.dump_mode {
        return write_output(&args, &emission::dump_tokens(&tokens));
    }

    if session.bootstrap_mode {
        // the bootstrap lexer already stripped directive lines
        if args.preprocess_only {
            return write_output(&args, &emission::render_tokens(&tokens));
        }
    } else {
        let mut env = preprocessor::base_environment(&session);
        let outcome = preprocessor::preprocess(&mut tokens, &mut env, &session)?;
        if session.debug_enabled(debug::MACROS) {
            report_macros(&env);
        }
        if session.debug_enabled(debug::PASSES) && outcome.uses_stdio {
            eprintln!("NOTICE: program requires stdio");
        }
        if args.preprocess_only {
            return write_output(&args, &emission::render_tokens(&tokens));
        }
        preprocessor::strip_newlines(&mut tokens);
    }

    if session.debug_enabled(debug::TOKENS) {
        for id in tokens.ids() {
            eprintln!("{:?}", tokens.text(id));
        }
    }

    let output = parser::parse(&tokens, &session)?;
    if session.debug_enabled(debug::PASSES) {
        eprintln!(
            "emitted {} bytes of code, {} of globals, {} of strings",
            output.code.len(),
            output.globals.len(),
            output.strings.len()
        );
    }
    write_output(&args, &emission::assemble(&output, &session))
}

fn build_session(args: &Args) -> Result<Session> {
    let arch = match args.architecture {
        Some(arch) => arch,
        None => match std::env::var("ARCHITECTURE_OVERRIDE") {
            Ok(name) => Architecture::from_str(&name)?,
            Err(_) => host_architecture()?,
        },
    };
    let os = match args.os {
        Some(os) => os,
        None => match std::env::var("OS_OVERRIDE") {
            Ok(name) => OperatingSystem::from_str(&name)?,
            Err(_) => OperatingSystem::Linux,
        },
    };
    let mut session = Session::new(arch, os);
    session.bootstrap_mode = args.bootstrap_mode;
    session.no_includes = args.no_includes;
    session.debug_mode = args.debug_mode;
    session.debug_info = args.debug;
    session.max_string = args.max_string.unwrap_or(if args.bootstrap_mode {
        BOOTSTRAP_MAX_STRING
    } else {
        DEFAULT_MAX_STRING
    });
    if let Some(path) = &args.include_path {
        session.m2libc_path = path.clone();
    } else if let Ok(path) = std::env::var("M2LIBC_PATH") {
        session.m2libc_path = PathBuf::from(path);
    }
    session.defines = args.defines.iter().map(|raw| Define::parse(raw)).collect();
    Ok(session)
}

/// The 32-bit x86 family (i386 through i686) all report as plain x86.
fn host_architecture() -> Result<Architecture, DriverError> {
    match std::env::consts::ARCH {
        "x86" => Ok(Architecture::X86),
        "x86_64" => Ok(Architecture::Amd64),
        "arm" => Ok(Architecture::Armv7l),
        "aarch64" => Ok(Architecture::Aarch64),
        "riscv32" => Ok(Architecture::Riscv32),
        "riscv64" => Ok(Architecture::Riscv64),
        other => Err(DriverError::UnsupportedHost(other.to_owned())),
    }
}

fn report_macros(env: &MacroEnv) {
    let mut names: Vec<_> = env.keys().collect();
    names.sort();
    for name in names {
        let definition = &env[name];
        eprintln!(
            "macro {} := {} ({:?})",
            name,
            definition.expansion.join(" "),
            definition.origin
        );
    }
}

fn write_output(args: &Args, text: &str) -> Result<()> {
    match &args.output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("cannot write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

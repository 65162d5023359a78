//! Per-compilation configuration.
//!
//! One [`Session`] is built by the driver from the command line and the
//! environment and is passed by reference through every pass; nothing in
//! the compiler is process-global, so tests can run compilations side by
//! side.

use std::path::PathBuf;

use crate::codegen::{Architecture, OperatingSystem};
use crate::lexer::LexMode;

pub const DEFAULT_MAX_STRING: usize = 65536;
pub const BOOTSTRAP_MAX_STRING: usize = 4096;

/// Command-line macro definition, `NAME` or `NAME=VALUE`.
#[derive(Debug, Clone)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    /// Split a `-D` argument at the first `=`.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((name, value)) => Self {
                name: name.to_owned(),
                value: Some(value.to_owned()),
            },
            None => Self {
                name: raw.to_owned(),
                value: None,
            },
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub arch: Architecture,
    pub os: OperatingSystem,
    pub bootstrap_mode: bool,
    pub no_includes: bool,
    /// Lexer token size ceiling.
    pub max_string: usize,
    /// Diagnostic verbosity bits, see [`debug`].
    pub debug_mode: u8,
    /// Emit `:ELF_data` / `:ELF_end` section markers.
    pub debug_info: bool,
    /// Root of the header search path.
    pub m2libc_path: PathBuf,
    pub defines: Vec<Define>,
}

/// Bits of `--debug-mode`.
pub mod debug {
    /// Dump the macro environment after preprocessing.
    pub const MACROS: u8 = 1;
    /// Dump the token stream after preprocessing.
    pub const TOKENS: u8 = 2;
    /// Trace include resolution.
    pub const INCLUDES: u8 = 4;
    /// Report per-pass summaries.
    pub const PASSES: u8 = 8;
}

impl Session {
    pub fn new(arch: Architecture, os: OperatingSystem) -> Self {
        Self {
            arch,
            os,
            bootstrap_mode: false,
            no_includes: false,
            max_string: DEFAULT_MAX_STRING,
            debug_mode: 0,
            debug_info: false,
            m2libc_path: PathBuf::from("./M2libc"),
            defines: Vec::new(),
        }
    }

    pub fn lex_mode(&self) -> LexMode {
        if self.bootstrap_mode {
            LexMode::Bootstrap
        } else {
            LexMode::Preprocessor
        }
    }

    pub fn word_size(&self) -> u64 {
        self.arch.word_size()
    }

    pub fn debug_enabled(&self, bit: u8) -> bool {
        self.debug_mode & bit != 0
    }
}

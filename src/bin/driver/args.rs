use std::path::PathBuf;

use clap::Parser;

use m2planet::codegen::{Architecture, OperatingSystem};

/// C subset compiler producing M1/hex2 textual assembly.
#[derive(Parser, Debug)]
#[command(name = "m2planet", version, about)]
pub struct Args {
    /// Source file; may repeat, files compile as one unit in order
    #[arg(short = 'f', long = "file", value_name = "PATH", required = true)]
    pub files: Vec<PathBuf>,

    /// Output path (stdout when absent)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Target architecture (knight-native, knight-posix, x86, amd64,
    /// armv7l, aarch64, riscv32, riscv64); defaults to the host
    #[arg(short = 'A', long = "architecture", value_name = "NAME")]
    pub architecture: Option<Architecture>,

    /// Target operating system (Linux, UEFI)
    #[arg(long = "os", value_name = "NAME")]
    pub os: Option<OperatingSystem>,

    /// Stop after preprocessing and emit the token stream
    #[arg(short = 'E', long = "preprocess-only")]
    pub preprocess_only: bool,

    /// Header search root, overriding M2LIBC_PATH
    #[arg(short = 'I', value_name = "PATH")]
    pub include_path: Option<PathBuf>,

    /// Define a macro, NAME or NAME=VALUE; may repeat
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Lexer token size ceiling
    #[arg(long = "max-string", value_name = "N")]
    pub max_string: Option<usize>,

    /// Skip the preprocessor; strip directive lines at the lexer
    #[arg(long = "bootstrap-mode")]
    pub bootstrap_mode: bool,

    /// Diagnostic verbosity bits: 1 macros, 2 tokens, 4 includes, 8 passes
    #[arg(
        long = "debug-mode",
        value_name = "N",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=15)
    )]
    pub debug_mode: u8,

    /// Print the reversed token stream and exit
    #[arg(long = "dump-mode")]
    pub dump_mode: bool,

    /// Treat #include as a no-op
    #[arg(long = "no-includes")]
    pub no_includes: bool,

    /// Accepted for wrapper compatibility; unused
    #[arg(long = "temp-directory", value_name = "PATH", hide = true)]
    pub temp_directory: Option<PathBuf>,

    /// Accepted for wrapper compatibility; unused
    #[arg(long = "dirty-mode", hide = true)]
    pub dirty_mode: bool,

    /// Emit :ELF_data / :ELF_end section markers
    #[arg(short = 'g', long = "debug")]
    pub debug: bool,
}

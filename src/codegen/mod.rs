//! Target descriptions and instruction emission.
//!
//! Code generation is textual: every primitive appends assembler macro
//! lines for the selected architecture to an output stream. The shared
//! code shape is a two-register accumulator machine; `acc` holds the
//! current value, `b` the saved left operand, and everything else spills
//! to the stack. Each primitive leaves `b` intact unless documented
//! otherwise, which the comparison and switch-dispatch sequences rely on.
//!
//! Register assignment per ISA:
//!
//! | ISA      | acc  | b    | frame | stack |
//! |----------|------|------|-------|-------|
//! | knight   | R0   | R1   | R14   | R15   |
//! | x86      | eax  | ebx  | ebp   | esp   |
//! | amd64    | rax  | rbx  | rbp   | rsp   |
//! | armv7l   | R0   | R1   | BP    | SP    |
//! | aarch64  | X0   | X1   | BP    | SP    |
//! | riscv    | a0   | a1   | fp    | sp    |
//!
//! The knight stack grows upward, every other target's grows downward;
//! [`Target::local_offset`] and [`Target::argument_offset`] hide the
//! direction from the caller.

mod codegen_error;
#[cfg(test)]
mod codegen_tests;

pub use codegen_error::CodegenError;

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    KnightNative,
    KnightPosix,
    X86,
    Amd64,
    Armv7l,
    Aarch64,
    Riscv32,
    Riscv64,
}

impl Architecture {
    pub const ALL: [Architecture; 8] = [
        Architecture::KnightNative,
        Architecture::KnightPosix,
        Architecture::X86,
        Architecture::Amd64,
        Architecture::Armv7l,
        Architecture::Aarch64,
        Architecture::Riscv32,
        Architecture::Riscv64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Architecture::KnightNative => "knight-native",
            Architecture::KnightPosix => "knight-posix",
            Architecture::X86 => "x86",
            Architecture::Amd64 => "amd64",
            Architecture::Armv7l => "armv7l",
            Architecture::Aarch64 => "aarch64",
            Architecture::Riscv32 => "riscv32",
            Architecture::Riscv64 => "riscv64",
        }
    }

    pub fn word_size(self) -> u64 {
        match self {
            Architecture::KnightNative
            | Architecture::KnightPosix
            | Architecture::X86
            | Architecture::Armv7l
            | Architecture::Riscv32 => 4,
            Architecture::Amd64 | Architecture::Aarch64 | Architecture::Riscv64 => 8,
        }
    }

    pub fn is_knight(self) -> bool {
        matches!(
            self,
            Architecture::KnightNative | Architecture::KnightPosix
        )
    }

    /// Macro names predefined for conditional compilation against this
    /// target.
    pub fn preset_macros(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Architecture::KnightNative | Architecture::KnightPosix => &[("__knight__", "1")],
            Architecture::X86 => &[("__i386__", "1")],
            Architecture::Amd64 => &[("__x86_64__", "1")],
            Architecture::Armv7l => &[("__arm__", "1")],
            Architecture::Aarch64 => &[("__aarch64__", "1")],
            Architecture::Riscv32 => &[("__riscv", "1"), ("__riscv_xlen", "32")],
            Architecture::Riscv64 => &[("__riscv", "1"), ("__riscv_xlen", "64")],
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Architecture {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| CodegenError::UnsupportedArchitecture(s.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingSystem {
    Linux,
    Uefi,
}

impl OperatingSystem {
    pub fn name(self) -> &'static str {
        match self {
            OperatingSystem::Linux => "linux",
            OperatingSystem::Uefi => "uefi",
        }
    }

    /// Include-search subtree holding the OS-specific headers.
    pub fn include_subdir(self) -> &'static str {
        self.name()
    }

    pub fn preset_macro(self) -> &'static str {
        match self {
            OperatingSystem::Linux => "__linux__",
            OperatingSystem::Uefi => "__uefi__",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperatingSystem {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // accepts the conventional spellings `Linux` and `UEFI` too
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(OperatingSystem::Linux),
            "uefi" => Ok(OperatingSystem::Uefi),
            _ => Err(CodegenError::UnsupportedOs(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Instruction emitter for one architecture. All primitives append
/// assembler text to `out`; none of them touch `b` except the pops, the
/// moves and the division sequences, so a caller can park a value there
/// across an immediate load or an address computation.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    arch: Architecture,
}

impl Target {
    pub fn new(arch: Architecture) -> Self {
        Self { arch }
    }

    pub fn arch(self) -> Architecture {
        self.arch
    }

    pub fn word(self) -> u64 {
        self.arch.word_size()
    }

    pub fn define_label(self, out: &mut String, name: &str) {
        out.push_str(&format!(":{name}\n"));
    }

    /// acc := value
    pub fn load_immediate(self, out: &mut String, value: i64) -> Result<(), CodegenError> {
        match self.arch {
            Architecture::X86 => out.push_str(&format!("mov_eax, %{value}\n")),
            Architecture::Amd64 => {
                self.range_check(value)?;
                out.push_str(&format!("mov_rax, %{value}\n"));
            }
            Architecture::KnightNative | Architecture::KnightPosix => {
                if (-32768..=32767).contains(&value) {
                    out.push_str(&format!("LOADI R0 {value}\n"));
                } else {
                    self.range_check(value)?;
                    out.push_str(&format!("LOADR R0 4\nJUMP 4\n%{value}\n"));
                }
            }
            Architecture::Armv7l => {
                if (0..=255).contains(&value) {
                    out.push_str(&format!("!{value} R0 LOADI8_ALWAYS\n"));
                } else {
                    self.range_check(value)?;
                    out.push_str(&format!("!0 R0 LOAD32 R15 MEMORY\n~0 JUMP_ALWAYS\n%{value}\n"));
                }
            }
            Architecture::Aarch64 => {
                self.range_check(value)?;
                out.push_str(&format!("LOAD_W0_AHEAD\nSKIP_32_DATA\n%{value}\n"));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                if (-2048..=2047).contains(&value) {
                    out.push_str(&format!("rd_a0 !{value} addi\n"));
                } else {
                    self.range_check(value)?;
                    out.push_str(&format!("rd_a0 ~{value} lui\nrd_a0 rs1_a0 !{value} addi\n"));
                }
            }
        }
        Ok(())
    }

    /// Wide immediates go through 32-bit assembler data words.
    fn range_check(self, value: i64) -> Result<(), CodegenError> {
        if i32::try_from(value).is_ok() {
            Ok(())
        } else {
            Err(CodegenError::ImmediateOutOfRange(value))
        }
    }

    /// acc := &label
    pub fn global_address(self, out: &mut String, label: &str) {
        match self.arch {
            Architecture::X86 => out.push_str(&format!("mov_eax, &{label}\n")),
            Architecture::Amd64 => out.push_str(&format!("lea_rax,[rip+DWORD] %{label}\n")),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str(&format!("LOADR R0 4\nJUMP 4\n&{label}\n"));
            }
            Architecture::Armv7l => {
                out.push_str(&format!("!0 R0 LOAD32 R15 MEMORY\n~0 JUMP_ALWAYS\n&{label}\n"));
            }
            Architecture::Aarch64 => {
                out.push_str(&format!("LOAD_W0_AHEAD\nSKIP_32_DATA\n&{label}\n"));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str(&format!("rd_a0 ~{label} auipc\nrd_a0 rs1_a0 !{label} addi\n"));
            }
        }
    }

    pub fn push_acc(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("push_eax\n"),
            Architecture::Amd64 => out.push_str("push_rax\n"),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str("PUSHR R0 R15\n");
            }
            Architecture::Armv7l => out.push_str("{R0} PUSH_ALWAYS\n"),
            Architecture::Aarch64 => out.push_str("PUSH_X0\n"),
            Architecture::Riscv32 => out.push_str("rd_sp rs1_sp !-4 addi\nrs1_sp rs2_a0 sw\n"),
            Architecture::Riscv64 => out.push_str("rd_sp rs1_sp !-8 addi\nrs1_sp rs2_a0 sd\n"),
        }
    }

    pub fn pop_acc(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("pop_eax\n"),
            Architecture::Amd64 => out.push_str("pop_rax\n"),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str("POPR R0 R15\n");
            }
            Architecture::Armv7l => out.push_str("{R0} POP_ALWAYS\n"),
            Architecture::Aarch64 => out.push_str("POP_X0\n"),
            Architecture::Riscv32 => out.push_str("rd_a0 rs1_sp lw\nrd_sp rs1_sp !4 addi\n"),
            Architecture::Riscv64 => out.push_str("rd_a0 rs1_sp ld\nrd_sp rs1_sp !8 addi\n"),
        }
    }

    pub fn pop_b(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("pop_ebx\n"),
            Architecture::Amd64 => out.push_str("pop_rbx\n"),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str("POPR R1 R15\n");
            }
            Architecture::Armv7l => out.push_str("{R1} POP_ALWAYS\n"),
            Architecture::Aarch64 => out.push_str("POP_X1\n"),
            Architecture::Riscv32 => out.push_str("rd_a1 rs1_sp lw\nrd_sp rs1_sp !4 addi\n"),
            Architecture::Riscv64 => out.push_str("rd_a1 rs1_sp ld\nrd_sp rs1_sp !8 addi\n"),
        }
    }

    /// b := acc
    pub fn move_acc_to_b(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("mov_ebx,eax\n"),
            Architecture::Amd64 => out.push_str("mov_rbx,rax\n"),
            Architecture::KnightNative | Architecture::KnightPosix => out.push_str("COPY R1 R0\n"),
            Architecture::Armv7l => out.push_str("'0' R0 R1 NO_SHIFT MOVE_ALWAYS\n"),
            Architecture::Aarch64 => out.push_str("SET_X1_FROM_X0\n"),
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str("rd_a1 rs1_a0 !0 addi\n");
            }
        }
    }

    pub fn swap_acc_b(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("xchg_ebx,eax\n"),
            Architecture::Amd64 => out.push_str("xchg_rbx,rax\n"),
            Architecture::KnightNative | Architecture::KnightPosix => out.push_str("SWAP R0 R1\n"),
            Architecture::Armv7l => out.push_str(
                "'0' R0 R2 NO_SHIFT MOVE_ALWAYS\n'0' R1 R0 NO_SHIFT MOVE_ALWAYS\n'0' R2 R1 NO_SHIFT MOVE_ALWAYS\n",
            ),
            Architecture::Aarch64 => {
                out.push_str("SET_X2_FROM_X0\nSET_X0_FROM_X1\nSET_X1_FROM_X2\n");
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str("rd_t0 rs1_a0 !0 addi\nrd_a0 rs1_a1 !0 addi\nrd_a1 rs1_t0 !0 addi\n");
            }
        }
    }

    /// Frame-relative byte offset of the local slot at `depth` words.
    /// Slot depths are 1-based in declaration order.
    pub fn local_offset(self, depth: u64) -> i64 {
        let word = self.word() as i64;
        let depth = depth as i64;
        if self.arch.is_knight() {
            (depth - 1) * word
        } else {
            -(depth * word)
        }
    }

    /// Frame-relative byte offset of the start of a multi-slot local
    /// occupying `slots` words, the first of which sits at `first_slot`.
    /// On knight the block grows away from the frame pointer, so the
    /// lowest address is the first slot; everywhere else it is the last.
    pub fn local_block_offset(self, first_slot: u64, slots: u64) -> i64 {
        if self.arch.is_knight() {
            self.local_offset(first_slot)
        } else {
            self.local_offset(first_slot + slots - 1)
        }
    }

    /// Frame-relative byte offset of argument `index` out of `count`,
    /// with arguments pushed left to right by the caller.
    pub fn argument_offset(self, index: u64, count: u64) -> i64 {
        let word = self.word() as i64;
        let slot = (count - 1 - index) as i64;
        if self.arch.is_knight() {
            -((3 + slot) * word)
        } else {
            (2 + slot) * word
        }
    }

    /// acc := frame pointer + offset
    pub fn local_address(self, out: &mut String, offset: i64) {
        match self.arch {
            Architecture::X86 => out.push_str(&format!("lea_eax,[ebp+DWORD] %{offset}\n")),
            Architecture::Amd64 => out.push_str(&format!("lea_rax,[rbp+DWORD] %{offset}\n")),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str(&format!("ADDI R0 R14 {offset}\n"));
            }
            Architecture::Armv7l => {
                if offset < 0 {
                    out.push_str(&format!("!{} R0 SUB BP ARITH_ALWAYS\n", -offset));
                } else {
                    out.push_str(&format!("!{offset} R0 ADD BP ARITH_ALWAYS\n"));
                }
            }
            Architecture::Aarch64 => {
                out.push_str(&format!(
                    "SET_X0_FROM_BP\nLOAD_W1_AHEAD\nSKIP_32_DATA\n%{offset}\nADD_X0_X1_X0\n"
                ));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str(&format!("rd_a0 rs1_fp !{offset} addi\n"));
            }
        }
    }

    /// acc := sized load from the address in acc.
    pub fn load_acc(self, out: &mut String, size: u64, signed: bool) {
        match self.arch {
            Architecture::X86 => {
                let line = match (size, signed) {
                    (1, true) => "movsx_eax,BYTE_PTR_[eax]",
                    (1, false) => "movzx_eax,BYTE_PTR_[eax]",
                    (2, true) => "movsx_eax,WORD_PTR_[eax]",
                    (2, false) => "movzx_eax,WORD_PTR_[eax]",
                    _ => "mov_eax,[eax]",
                };
                out.push_str(line);
                out.push('\n');
            }
            Architecture::Amd64 => {
                let line = match (size, signed) {
                    (1, true) => "movsx_rax,BYTE_PTR_[rax]",
                    (1, false) => "movzx_rax,BYTE_PTR_[rax]",
                    (2, true) => "movsx_rax,WORD_PTR_[rax]",
                    (2, false) => "movzx_rax,WORD_PTR_[rax]",
                    (4, true) => "movsx_rax,DWORD_PTR_[rax]",
                    (4, false) => "mov_eax,[rax]",
                    _ => "mov_rax,[rax]",
                };
                out.push_str(line);
                out.push('\n');
            }
            Architecture::KnightNative | Architecture::KnightPosix => {
                let op = match (size, signed) {
                    (1, true) => "LOAD8",
                    (1, false) => "LOADU8",
                    (2, true) => "LOAD16",
                    (2, false) => "LOADU16",
                    _ => "LOAD",
                };
                out.push_str(&format!("{op} R0 R0 0\n"));
            }
            Architecture::Armv7l => {
                let op = match (size, signed) {
                    (1, true) => "LOADS8",
                    (1, false) => "LOAD8",
                    (2, true) => "LOADS16",
                    (2, false) => "LOAD16",
                    _ => "LOAD32",
                };
                out.push_str(&format!("!0 R0 {op} R0 MEMORY\n"));
            }
            Architecture::Aarch64 => {
                let op = match (size, signed) {
                    (1, true) => "DEREF_X0_SBYTE",
                    (1, false) => "DEREF_X0_UBYTE",
                    (2, true) => "DEREF_X0_SHALF",
                    (2, false) => "DEREF_X0_UHALF",
                    (4, true) => "DEREF_X0_SWORD",
                    (4, false) => "DEREF_X0_UWORD",
                    _ => "DEREF_X0",
                };
                out.push_str(op);
                out.push('\n');
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                let op = match (size, signed, self.word()) {
                    (1, true, _) => "lb",
                    (1, false, _) => "lbu",
                    (2, true, _) => "lh",
                    (2, false, _) => "lhu",
                    (4, _, 4) => "lw",
                    (4, true, _) => "lw",
                    (4, false, _) => "lwu",
                    _ => "ld",
                };
                out.push_str(&format!("rd_a0 rs1_a0 {op}\n"));
            }
        }
    }

    /// Sized store of acc through the address in b.
    pub fn store_through_b(self, out: &mut String, size: u64) {
        match self.arch {
            Architecture::X86 => {
                let line = match size {
                    1 => "mov_[ebx],al",
                    2 => "mov_[ebx],ax",
                    _ => "mov_[ebx],eax",
                };
                out.push_str(line);
                out.push('\n');
            }
            Architecture::Amd64 => {
                let line = match size {
                    1 => "mov_[rbx],al",
                    2 => "mov_[rbx],ax",
                    4 => "mov_[rbx],eax",
                    _ => "mov_[rbx],rax",
                };
                out.push_str(line);
                out.push('\n');
            }
            Architecture::KnightNative | Architecture::KnightPosix => {
                let op = match size {
                    1 => "STORE8",
                    2 => "STORE16",
                    _ => "STORE",
                };
                out.push_str(&format!("{op} R0 R1 0\n"));
            }
            Architecture::Armv7l => {
                let op = match size {
                    1 => "STORE8",
                    2 => "STORE16",
                    _ => "STORE32",
                };
                out.push_str(&format!("!0 R0 {op} R1 MEMORY\n"));
            }
            Architecture::Aarch64 => {
                let line = match size {
                    1 => "STRB_W0_[X1]",
                    2 => "STRH_W0_[X1]",
                    4 => "STR_W0_[X1]",
                    _ => "STR_X0_[X1]",
                };
                out.push_str(line);
                out.push('\n');
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                let op = match size {
                    1 => "sb",
                    2 => "sh",
                    4 => "sw",
                    _ => "sd",
                };
                out.push_str(&format!("rs1_a1 rs2_a0 {op}\n"));
            }
        }
    }

    /// acc := b OP acc
    pub fn alu(self, out: &mut String, op: AluOp, signed: bool) {
        match self.arch {
            Architecture::X86 => self.alu_x86(out, op, signed, false),
            Architecture::Amd64 => self.alu_x86(out, op, signed, true),
            Architecture::KnightNative | Architecture::KnightPosix => {
                let op = match (op, signed) {
                    (AluOp::Add, _) => "ADD",
                    (AluOp::Sub, _) => "SUB",
                    (AluOp::Mul, true) => "MUL",
                    (AluOp::Mul, false) => "MULU",
                    (AluOp::Div, true) => "DIV",
                    (AluOp::Div, false) => "DIVU",
                    (AluOp::Mod, true) => "MOD",
                    (AluOp::Mod, false) => "MODU",
                    (AluOp::And, _) => "AND",
                    (AluOp::Or, _) => "OR",
                    (AluOp::Xor, _) => "XOR",
                    (AluOp::Shl, _) => "SAL",
                    (AluOp::Shr, true) => "SAR",
                    (AluOp::Shr, false) => "SR0",
                };
                out.push_str(&format!("{op} R0 R1 R0\n"));
            }
            Architecture::Armv7l => {
                let op = match (op, signed) {
                    (AluOp::Add, _) => "ADD_ALWAYS",
                    (AluOp::Sub, _) => "SUB_ALWAYS",
                    (AluOp::Mul, _) => "MUL_ALWAYS",
                    (AluOp::Div, true) => "DIV_ALWAYS",
                    (AluOp::Div, false) => "UDIV_ALWAYS",
                    (AluOp::Mod, true) => "MOD_ALWAYS",
                    (AluOp::Mod, false) => "UMOD_ALWAYS",
                    (AluOp::And, _) => "AND_ALWAYS",
                    (AluOp::Or, _) => "OR_ALWAYS",
                    (AluOp::Xor, _) => "XOR_ALWAYS",
                    (AluOp::Shl, _) => "LSL_ALWAYS",
                    (AluOp::Shr, true) => "ASR_ALWAYS",
                    (AluOp::Shr, false) => "LSR_ALWAYS",
                };
                out.push_str(&format!("'0' R1 R0 NO_SHIFT {op}\n"));
            }
            Architecture::Aarch64 => {
                let line = match (op, signed) {
                    (AluOp::Add, _) => "ADD_X0_X1_X0",
                    (AluOp::Sub, _) => "SUB_X0_X1_X0",
                    (AluOp::Mul, _) => "MUL_X0_X1_X0",
                    (AluOp::Div, true) => "SDIV_X0_X1_X0",
                    (AluOp::Div, false) => "UDIV_X0_X1_X0",
                    (AluOp::Mod, true) => "SDIV_X2_X1_X0\nMSUB_X0_X2_X0_X1",
                    (AluOp::Mod, false) => "UDIV_X2_X1_X0\nMSUB_X0_X2_X0_X1",
                    (AluOp::And, _) => "AND_X0_X1_X0",
                    (AluOp::Or, _) => "ORR_X0_X1_X0",
                    (AluOp::Xor, _) => "EOR_X0_X1_X0",
                    (AluOp::Shl, _) => "LSL_X0_X1_X0",
                    (AluOp::Shr, true) => "ASR_X0_X1_X0",
                    (AluOp::Shr, false) => "LSR_X0_X1_X0",
                };
                out.push_str(line);
                out.push('\n');
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                let op = match (op, signed) {
                    (AluOp::Add, _) => "add",
                    (AluOp::Sub, _) => "sub",
                    (AluOp::Mul, _) => "mul",
                    (AluOp::Div, true) => "div",
                    (AluOp::Div, false) => "divu",
                    (AluOp::Mod, true) => "rem",
                    (AluOp::Mod, false) => "remu",
                    (AluOp::And, _) => "and",
                    (AluOp::Or, _) => "or",
                    (AluOp::Xor, _) => "xor",
                    (AluOp::Shl, _) => "sll",
                    (AluOp::Shr, true) => "sra",
                    (AluOp::Shr, false) => "srl",
                };
                out.push_str(&format!("rd_a0 rs1_a1 rs2_a0 {op}\n"));
            }
        }
    }

    fn alu_x86(self, out: &mut String, op: AluOp, signed: bool, wide: bool) {
        let (a, b, c, d) = if wide {
            ("rax", "rbx", "rcx", "rdx")
        } else {
            ("eax", "ebx", "ecx", "edx")
        };
        let widen = if wide { "cqo" } else { "cdq" };
        let text = match (op, signed) {
            (AluOp::Add, _) => format!("add_{a},{b}\n"),
            (AluOp::Sub, _) => format!("sub_{b},{a}\nmov_{a},{b}\n"),
            (AluOp::Mul, true) => format!("imul_{b}\n"),
            (AluOp::Mul, false) => format!("mul_{b}\n"),
            (AluOp::Div, true) => format!("xchg_{b},{a}\n{widen}\nidiv_{b}\n"),
            (AluOp::Div, false) => format!("xchg_{b},{a}\nmov_{d}, %0\ndiv_{b}\n"),
            (AluOp::Mod, true) => format!("xchg_{b},{a}\n{widen}\nidiv_{b}\nmov_{a},{d}\n"),
            (AluOp::Mod, false) => format!("xchg_{b},{a}\nmov_{d}, %0\ndiv_{b}\nmov_{a},{d}\n"),
            (AluOp::And, _) => format!("and_{a},{b}\n"),
            (AluOp::Or, _) => format!("or_{a},{b}\n"),
            (AluOp::Xor, _) => format!("xor_{a},{b}\n"),
            (AluOp::Shl, _) => format!("mov_{c},{a}\nmov_{a},{b}\nshl_{a},cl\n"),
            (AluOp::Shr, true) => format!("mov_{c},{a}\nmov_{a},{b}\nsar_{a},cl\n"),
            (AluOp::Shr, false) => format!("mov_{c},{a}\nmov_{a},{b}\nshr_{a},cl\n"),
        };
        out.push_str(&text);
    }

    /// acc := ~acc
    pub fn not_acc(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("not_eax\n"),
            Architecture::Amd64 => out.push_str("not_rax\n"),
            Architecture::KnightNative | Architecture::KnightPosix => out.push_str("NOT R0 R0\n"),
            Architecture::Armv7l => out.push_str("'0' R0 R0 NO_SHIFT NOT_ALWAYS\n"),
            Architecture::Aarch64 => out.push_str("MVN_X0\n"),
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str("rd_a0 rs1_a0 !-1 xori\n");
            }
        }
    }

    /// acc := -acc
    pub fn negate_acc(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("neg_eax\n"),
            Architecture::Amd64 => out.push_str("neg_rax\n"),
            Architecture::KnightNative | Architecture::KnightPosix => out.push_str("NEG R0 R0\n"),
            Architecture::Armv7l => out.push_str("'0' R0 R0 NO_SHIFT NEG_ALWAYS\n"),
            Architecture::Aarch64 => out.push_str("NEG_X0\n"),
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str("rd_a0 rs1_zero rs2_a0 sub\n");
            }
        }
    }

    /// acc := (b CMP acc) ? 1 : 0, with b preserved. Switch dispatch
    /// repeats comparisons against the value parked in b.
    pub fn compare(self, out: &mut String, cond: Cond, signed: bool) {
        match self.arch {
            Architecture::X86 | Architecture::Amd64 => {
                let (a, b) = if self.arch == Architecture::Amd64 {
                    ("rax", "rbx")
                } else {
                    ("eax", "ebx")
                };
                let cc = match (cond, signed) {
                    (Cond::Eq, _) => "e",
                    (Cond::Ne, _) => "ne",
                    (Cond::Lt, true) => "l",
                    (Cond::Lt, false) => "b",
                    (Cond::Le, true) => "le",
                    (Cond::Le, false) => "be",
                    (Cond::Gt, true) => "g",
                    (Cond::Gt, false) => "a",
                    (Cond::Ge, true) => "ge",
                    (Cond::Ge, false) => "ae",
                };
                out.push_str(&format!("cmp_{b},{a}\nset{cc}_al\nmovzx_{a},al\n"));
            }
            Architecture::KnightNative | Architecture::KnightPosix => {
                let cmp = if signed { "CMP" } else { "CMPU" };
                // CMP leaves -1/0/1 in acc; the skip ladder folds that to
                // 0/1 through the sentinel value 4, which CMP can never
                // produce.
                let (pivot, matched, unmatched) = match cond {
                    Cond::Eq => (0, 1, 0),
                    Cond::Ne => (0, 0, 1),
                    Cond::Lt => (-1, 1, 0),
                    Cond::Ge => (-1, 0, 1),
                    Cond::Gt => (1, 1, 0),
                    Cond::Le => (1, 0, 1),
                };
                out.push_str(&format!(
                    "{cmp} R0 R1 R0\nCMPSKIPI.NE R0 {pivot}\nLOADI R0 4\nCMPSKIPI.E R0 4\nLOADI R0 {unmatched}\nCMPSKIPI.NE R0 4\nLOADI R0 {matched}\n"
                ));
            }
            Architecture::Armv7l => {
                let (yes, no) = match (cond, signed) {
                    (Cond::Eq, _) => ("EQUAL", "NOT_EQUAL"),
                    (Cond::Ne, _) => ("NOT_EQUAL", "EQUAL"),
                    (Cond::Lt, true) => ("LESS_THAN", "GREATER_EQUAL"),
                    (Cond::Lt, false) => ("LOWER", "HIGHER_EQUAL"),
                    (Cond::Le, true) => ("LESS_EQUAL", "GREATER_THAN"),
                    (Cond::Le, false) => ("LOWER_EQUAL", "HIGHER"),
                    (Cond::Gt, true) => ("GREATER_THAN", "LESS_EQUAL"),
                    (Cond::Gt, false) => ("HIGHER", "LOWER_EQUAL"),
                    (Cond::Ge, true) => ("GREATER_EQUAL", "LESS_THAN"),
                    (Cond::Ge, false) => ("HIGHER_EQUAL", "LOWER"),
                };
                out.push_str(&format!(
                    "'0' R0 R1 NO_SHIFT CMP_ALWAYS\n!1 R0 LOADI8_{yes}\n!0 R0 LOADI8_{no}\n"
                ));
            }
            Architecture::Aarch64 => {
                let cc = match (cond, signed) {
                    (Cond::Eq, _) => "EQ",
                    (Cond::Ne, _) => "NE",
                    (Cond::Lt, true) => "LT",
                    (Cond::Lt, false) => "LO",
                    (Cond::Le, true) => "LE",
                    (Cond::Le, false) => "LS",
                    (Cond::Gt, true) => "GT",
                    (Cond::Gt, false) => "HI",
                    (Cond::Ge, true) => "GE",
                    (Cond::Ge, false) => "HS",
                };
                out.push_str(&format!("CMP_X1_X0\nCSET_X0_{cc}\n"));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                let slt = if signed { "slt" } else { "sltu" };
                let text = match cond {
                    Cond::Lt => format!("rd_a0 rs1_a1 rs2_a0 {slt}\n"),
                    Cond::Ge => format!("rd_a0 rs1_a1 rs2_a0 {slt}\nrd_a0 rs1_a0 !1 xori\n"),
                    Cond::Gt => format!("rd_a0 rs1_a0 rs2_a1 {slt}\n"),
                    Cond::Le => format!("rd_a0 rs1_a0 rs2_a1 {slt}\nrd_a0 rs1_a0 !1 xori\n"),
                    Cond::Eq => {
                        "rd_a0 rs1_a1 rs2_a0 sub\nrd_a0 rs1_a0 !1 sltiu\n".to_owned()
                    }
                    Cond::Ne => {
                        "rd_a0 rs1_a1 rs2_a0 sub\nrd_a0 rs1_zero rs2_a0 sltu\n".to_owned()
                    }
                };
                out.push_str(&text);
            }
        }
    }

    pub fn jump(self, out: &mut String, label: &str) {
        match self.arch {
            Architecture::X86 | Architecture::Amd64 => out.push_str(&format!("jmp %{label}\n")),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str(&format!("JUMP @{label}\n"));
            }
            Architecture::Armv7l => out.push_str(&format!("^~{label} JUMP_ALWAYS\n")),
            Architecture::Aarch64 => {
                out.push_str(&format!("LOAD_W16_AHEAD\nSKIP_32_DATA\n&{label}\nBR_X16\n"));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str(&format!("${label} jal\n"));
            }
        }
    }

    pub fn jump_if_zero(self, out: &mut String, label: &str) {
        match self.arch {
            Architecture::X86 => out.push_str(&format!("test_eax,eax\nje %{label}\n")),
            Architecture::Amd64 => out.push_str(&format!("test_rax,rax\nje %{label}\n")),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str(&format!("JUMP.Z R0 @{label}\n"));
            }
            Architecture::Armv7l => {
                out.push_str(&format!("!0 CMPI8 R0 IMM_ALWAYS\n^~{label} JUMP_EQUAL\n"));
            }
            Architecture::Aarch64 => {
                out.push_str(&format!(
                    "CBNZ_X0_PAST_BR\nLOAD_W16_AHEAD\nSKIP_32_DATA\n&{label}\nBR_X16\n"
                ));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                // conditional branches have short reach; branch over an
                // unconditional jump instead
                out.push_str(&format!("rs1_a0 @8 bnez\n${label} jal\n"));
            }
        }
    }

    pub fn jump_if_not_zero(self, out: &mut String, label: &str) {
        match self.arch {
            Architecture::X86 => out.push_str(&format!("test_eax,eax\njne %{label}\n")),
            Architecture::Amd64 => out.push_str(&format!("test_rax,rax\njne %{label}\n")),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str(&format!("JUMP.NZ R0 @{label}\n"));
            }
            Architecture::Armv7l => {
                out.push_str(&format!("!0 CMPI8 R0 IMM_ALWAYS\n^~{label} JUMP_NOT_EQUAL\n"));
            }
            Architecture::Aarch64 => {
                out.push_str(&format!(
                    "CBZ_X0_PAST_BR\nLOAD_W16_AHEAD\nSKIP_32_DATA\n&{label}\nBR_X16\n"
                ));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str(&format!("rs1_a0 @8 beqz\n${label} jal\n"));
            }
        }
    }

    pub fn call(self, out: &mut String, label: &str) {
        match self.arch {
            Architecture::X86 | Architecture::Amd64 => out.push_str(&format!("call %{label}\n")),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str(&format!("CALLI R15 @{label}\n"));
            }
            Architecture::Armv7l => out.push_str(&format!("^~{label} CALL_ALWAYS\n")),
            Architecture::Aarch64 => {
                out.push_str(&format!(
                    "LOAD_W16_AHEAD\nSKIP_32_DATA\n&{label}\nBLR_X16\n"
                ));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str(&format!("rd_ra ${label} jal\n"));
            }
        }
    }

    /// Call through the `FUNCTION` pointer in acc.
    pub fn call_acc(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("call_eax\n"),
            Architecture::Amd64 => out.push_str("call_rax\n"),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str("CALL R0 R15\n");
            }
            Architecture::Armv7l => out.push_str("'0' R0 BLX_ALWAYS\n"),
            Architecture::Aarch64 => out.push_str("SET_X16_FROM_X0\nBLR_X16\n"),
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str("rd_ra rs1_a0 jalr\n");
            }
        }
    }

    /// Discard `count` pushed call arguments.
    pub fn pop_args(self, out: &mut String, count: u64) {
        for _ in 0..count {
            self.pop_b(out);
        }
    }

    /// Reserve `bytes` of frame space, for local arrays.
    pub fn allocate_stack(self, out: &mut String, bytes: u64) {
        match self.arch {
            Architecture::X86 => out.push_str(&format!("sub_esp, %{bytes}\n")),
            Architecture::Amd64 => out.push_str(&format!("sub_rsp, %{bytes}\n")),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str(&format!("ADDI R15 R15 {bytes}\n"));
            }
            Architecture::Armv7l => out.push_str(&format!("!{bytes} SP SUB SP ARITH_ALWAYS\n")),
            Architecture::Aarch64 => {
                out.push_str(&format!(
                    "LOAD_W1_AHEAD\nSKIP_32_DATA\n%{bytes}\nSUB_SP_SP_X1\n"
                ));
            }
            Architecture::Riscv32 | Architecture::Riscv64 => {
                out.push_str(&format!("rd_sp rs1_sp !-{bytes} addi\n"));
            }
        }
    }

    pub fn prologue(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("push_ebp\nmov_ebp,esp\n"),
            Architecture::Amd64 => out.push_str("push_rbp\nmov_rbp,rsp\n"),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str("PUSHR R14 R15\nCOPY R14 R15\n");
            }
            Architecture::Armv7l => {
                out.push_str("{LR} PUSH_ALWAYS\n{BP} PUSH_ALWAYS\n'0' SP BP NO_SHIFT MOVE_ALWAYS\n");
            }
            Architecture::Aarch64 => out.push_str("PUSH_LR\nPUSH_BP\nSET_BP_FROM_SP\n"),
            Architecture::Riscv32 => out.push_str(
                "rd_sp rs1_sp !-4 addi\nrs1_sp rs2_ra sw\nrd_sp rs1_sp !-4 addi\nrs1_sp rs2_fp sw\nrd_fp rs1_sp !0 addi\n",
            ),
            Architecture::Riscv64 => out.push_str(
                "rd_sp rs1_sp !-8 addi\nrs1_sp rs2_ra sd\nrd_sp rs1_sp !-8 addi\nrs1_sp rs2_fp sd\nrd_fp rs1_sp !0 addi\n",
            ),
        }
    }

    pub fn epilogue(self, out: &mut String) {
        match self.arch {
            Architecture::X86 => out.push_str("mov_esp,ebp\npop_ebp\n"),
            Architecture::Amd64 => out.push_str("mov_rsp,rbp\npop_rbp\n"),
            Architecture::KnightNative | Architecture::KnightPosix => {
                out.push_str("COPY R15 R14\nPOPR R14 R15\n");
            }
            Architecture::Armv7l => {
                out.push_str("'0' BP SP NO_SHIFT MOVE_ALWAYS\n{BP} POP_ALWAYS\n{LR} POP_ALWAYS\n");
            }
            Architecture::Aarch64 => out.push_str("SET_SP_FROM_BP\nPOP_BP\nPOP_LR\n"),
            Architecture::Riscv32 => out.push_str(
                "rd_sp rs1_fp !0 addi\nrd_fp rs1_sp lw\nrd_sp rs1_sp !4 addi\nrd_ra rs1_sp lw\nrd_sp rs1_sp !4 addi\n",
            ),
            Architecture::Riscv64 => out.push_str(
                "rd_sp rs1_fp !0 addi\nrd_fp rs1_sp ld\nrd_sp rs1_sp !8 addi\nrd_ra rs1_sp ld\nrd_sp rs1_sp !8 addi\n",
            ),
        }
    }

    pub fn ret(self, out: &mut String) {
        match self.arch {
            Architecture::X86 | Architecture::Amd64 => out.push_str("ret\n"),
            Architecture::KnightNative | Architecture::KnightPosix => out.push_str("RET R15\n"),
            Architecture::Armv7l => out.push_str("'0' LR PC NO_SHIFT MOVE_ALWAYS\n"),
            Architecture::Aarch64 => out.push_str("RETURN\n"),
            Architecture::Riscv32 | Architecture::Riscv64 => out.push_str("rs1_ra jalr\n"),
        }
    }
}

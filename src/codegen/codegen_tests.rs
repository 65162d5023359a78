use super::*;

fn emit(arch: Architecture, f: impl Fn(Target, &mut String)) -> String {
    let mut out = String::new();
    f(Target::new(arch), &mut out);
    out
}

#[test]
fn architecture_names_round_trip() {
    for arch in Architecture::ALL {
        assert_eq!(arch.name().parse::<Architecture>().unwrap(), arch);
    }
    assert!("pdp11".parse::<Architecture>().is_err());
}

#[test]
fn word_sizes() {
    assert_eq!(Architecture::X86.word_size(), 4);
    assert_eq!(Architecture::KnightNative.word_size(), 4);
    assert_eq!(Architecture::Armv7l.word_size(), 4);
    assert_eq!(Architecture::Riscv32.word_size(), 4);
    assert_eq!(Architecture::Amd64.word_size(), 8);
    assert_eq!(Architecture::Aarch64.word_size(), 8);
    assert_eq!(Architecture::Riscv64.word_size(), 8);
}

#[test]
fn riscv_presets_carry_xlen() {
    let presets = Architecture::Riscv64.preset_macros();
    assert!(presets.contains(&("__riscv", "1")));
    assert!(presets.contains(&("__riscv_xlen", "64")));
}

#[test]
fn x86_immediates_and_stack() {
    let out = emit(Architecture::X86, |t, out| {
        t.load_immediate(out, 42).unwrap();
        t.push_acc(out);
        t.pop_b(out);
    });
    assert_eq!(out, "mov_eax, %42\npush_eax\npop_ebx\n");
}

#[test]
fn knight_small_and_large_immediates() {
    let small = emit(Architecture::KnightNative, |t, out| {
        t.load_immediate(out, -5).unwrap();
    });
    assert_eq!(small, "LOADI R0 -5\n");
    let large = emit(Architecture::KnightNative, |t, out| {
        t.load_immediate(out, 70000).unwrap();
    });
    assert_eq!(large, "LOADR R0 4\nJUMP 4\n%70000\n");
}

#[test]
fn aarch64_rejects_wide_immediates() {
    let mut out = String::new();
    let err = Target::new(Architecture::Aarch64)
        .load_immediate(&mut out, 1 << 40)
        .unwrap_err();
    assert_eq!(err, CodegenError::ImmediateOutOfRange(1 << 40));
}

#[test]
fn x86_subtraction_is_b_minus_acc() {
    let out = emit(Architecture::X86, |t, out| {
        t.alu(out, AluOp::Sub, true);
    });
    assert_eq!(out, "sub_ebx,eax\nmov_eax,ebx\n");
}

#[test]
fn unsigned_division_picks_unsigned_ops() {
    let x86 = emit(Architecture::X86, |t, out| t.alu(out, AluOp::Div, false));
    assert!(x86.contains("div_ebx"));
    assert!(!x86.contains("idiv"));
    let knight = emit(Architecture::KnightPosix, |t, out| {
        t.alu(out, AluOp::Div, false);
    });
    assert_eq!(knight, "DIVU R0 R1 R0\n");
    let riscv = emit(Architecture::Riscv64, |t, out| {
        t.alu(out, AluOp::Mod, false);
    });
    assert_eq!(riscv, "rd_a0 rs1_a1 rs2_a0 remu\n");
}

#[test]
fn knight_compare_folds_through_sentinel() {
    let out = emit(Architecture::KnightNative, |t, out| {
        t.compare(out, Cond::Lt, true);
    });
    assert_eq!(
        out,
        "CMP R0 R1 R0\nCMPSKIPI.NE R0 -1\nLOADI R0 4\nCMPSKIPI.E R0 4\nLOADI R0 0\nCMPSKIPI.NE R0 4\nLOADI R0 1\n"
    );
}

#[test]
fn unsigned_compare_conditions() {
    let x86 = emit(Architecture::X86, |t, out| t.compare(out, Cond::Lt, false));
    assert!(x86.contains("setb_al"));
    let a64 = emit(Architecture::Aarch64, |t, out| {
        t.compare(out, Cond::Ge, false)
    });
    assert_eq!(a64, "CMP_X1_X0\nCSET_X0_HS\n");
}

#[test]
fn riscv_equality_lowering() {
    let eq = emit(Architecture::Riscv32, |t, out| {
        t.compare(out, Cond::Eq, true);
    });
    assert_eq!(eq, "rd_a0 rs1_a1 rs2_a0 sub\nrd_a0 rs1_a0 !1 sltiu\n");
}

#[test]
fn frame_offsets_follow_stack_direction() {
    let x86 = Target::new(Architecture::X86);
    assert_eq!(x86.local_offset(1), -4);
    assert_eq!(x86.local_offset(3), -12);
    // f(a, b): a is deepest, b right above the saved frame slots
    assert_eq!(x86.argument_offset(0, 2), 12);
    assert_eq!(x86.argument_offset(1, 2), 8);

    let knight = Target::new(Architecture::KnightNative);
    assert_eq!(knight.local_offset(1), 0);
    assert_eq!(knight.local_offset(2), 4);
    assert_eq!(knight.argument_offset(0, 2), -16);
    assert_eq!(knight.argument_offset(1, 2), -12);

    let amd64 = Target::new(Architecture::Amd64);
    assert_eq!(amd64.local_offset(2), -16);
    assert_eq!(amd64.argument_offset(0, 1), 16);
}

#[test]
fn sized_loads_pick_extension() {
    let signed_byte = emit(Architecture::X86, |t, out| t.load_acc(out, 1, true));
    assert_eq!(signed_byte, "movsx_eax,BYTE_PTR_[eax]\n");
    let unsigned_word = emit(Architecture::Amd64, |t, out| t.load_acc(out, 4, false));
    assert_eq!(unsigned_word, "mov_eax,[rax]\n");
    let knight_half = emit(Architecture::KnightPosix, |t, out| {
        t.load_acc(out, 2, false)
    });
    assert_eq!(knight_half, "LOADU16 R0 R0 0\n");
}

#[test]
fn stores_go_through_b() {
    let byte = emit(Architecture::Amd64, |t, out| t.store_through_b(out, 1));
    assert_eq!(byte, "mov_[rbx],al\n");
    let word = emit(Architecture::Riscv64, |t, out| t.store_through_b(out, 8));
    assert_eq!(word, "rs1_a1 rs2_a0 sd\n");
}

#[test]
fn calls_and_frames() {
    let out = emit(Architecture::KnightPosix, |t, out| {
        t.prologue(out);
        t.call(out, "FUNCTION_putchar");
        t.pop_args(out, 1);
        t.epilogue(out);
        t.ret(out);
    });
    assert_eq!(
        out,
        "PUSHR R14 R15\nCOPY R14 R15\nCALLI R15 @FUNCTION_putchar\nPOPR R1 R15\nCOPY R15 R14\nPOPR R14 R15\nRET R15\n"
    );
}

#[test]
fn riscv_branches_hop_over_a_jal() {
    let out = emit(Architecture::Riscv64, |t, out| {
        t.jump_if_zero(out, "FUNCTION_main_END_IF_0");
    });
    assert_eq!(out, "rs1_a0 @8 bnez\n$FUNCTION_main_END_IF_0 jal\n");
}

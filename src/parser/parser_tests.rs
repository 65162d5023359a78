use super::{parse, ParseOutput};
use crate::codegen::{Architecture, OperatingSystem};
use crate::lexer::{lex, LexMode};
use crate::session::{Session, DEFAULT_MAX_STRING};

fn compile(arch: Architecture, source: &str) -> ParseOutput {
    let session = Session::new(arch, OperatingSystem::Linux);
    let tokens = lex(source, "test.c", LexMode::Bootstrap, DEFAULT_MAX_STRING).unwrap();
    parse(&tokens, &session).unwrap()
}

fn compile_err(arch: Architecture, source: &str) -> String {
    let session = Session::new(arch, OperatingSystem::Linux);
    let tokens = lex(source, "test.c", LexMode::Bootstrap, DEFAULT_MAX_STRING).unwrap();
    parse(&tokens, &session).unwrap_err().to_string()
}

#[test]
fn return_constant() {
    let out = compile(Architecture::X86, "int answer() { return 42; }");
    assert_eq!(
        out.code,
        ":FUNCTION_answer\n\
         push_ebp\n\
         mov_ebp,esp\n\
         mov_eax, %42\n\
         mov_esp,ebp\n\
         pop_ebp\n\
         ret\n\
         mov_esp,ebp\n\
         pop_ebp\n\
         ret\n"
    );
    assert!(out.globals.is_empty());
    assert!(out.strings.is_empty());
}

#[test]
fn global_definitions() {
    let out = compile(
        Architecture::X86,
        "int counter;\nint limit = 12;\nint box[3];\n",
    );
    assert_eq!(
        out.globals,
        ":GLOBAL_counter\nNULL\n:GLOBAL_limit\n%12\n:GLOBAL_box\nNULL\nNULL\nNULL\n"
    );
}

#[test]
fn negative_doubleword_initializer() {
    let out = compile(Architecture::Amd64, "int floor = -3;");
    assert_eq!(out.globals, ":GLOBAL_floor\n%-3\n%-1\n");
}

#[test]
fn extern_global_reserves_no_storage() {
    let out = compile(
        Architecture::X86,
        "extern int shared;\nint probe() { return shared; }",
    );
    assert!(!out.globals.contains(":GLOBAL_shared"));
    assert!(out.code.contains("mov_eax, &GLOBAL_shared\n"));
}

#[test]
fn local_assignment() {
    let out = compile(
        Architecture::X86,
        "int main() { int x = 3; x = x + 1; return x; }",
    );
    assert_eq!(
        out.code,
        ":FUNCTION_main\n\
         push_ebp\n\
         mov_ebp,esp\n\
         mov_eax, %3\n\
         push_eax\n\
         lea_eax,[ebp+DWORD] %-4\n\
         push_eax\n\
         lea_eax,[ebp+DWORD] %-4\n\
         mov_eax,[eax]\n\
         push_eax\n\
         mov_eax, %1\n\
         pop_ebx\n\
         add_eax,ebx\n\
         pop_ebx\n\
         mov_[ebx],eax\n\
         lea_eax,[ebp+DWORD] %-4\n\
         mov_eax,[eax]\n\
         mov_esp,ebp\n\
         pop_ebp\n\
         ret\n\
         mov_esp,ebp\n\
         pop_ebp\n\
         ret\n"
    );
}

#[test]
fn while_loop_labels() {
    let out = compile(
        Architecture::X86,
        "int spin(int n) { while (n) { n = n - 1; } return n; }",
    );
    assert!(out.code.contains(":FUNCTION_spin_WHILE_0\n"));
    assert!(out.code.contains("je %FUNCTION_spin_END_WHILE_0\n"));
    assert!(out.code.contains("jmp %FUNCTION_spin_WHILE_0\n"));
    assert!(out.code.contains(":FUNCTION_spin_END_WHILE_0\n"));
}

#[test]
fn for_loop_shape() {
    let out = compile(
        Architecture::X86,
        "int sum(int n) { int total = 0; int i; for (i = 0; i < n; i = i + 1) { total = total + i; } return total; }",
    );
    // the iteration expression sits between the test and the body
    let test_at = out.code.find(":FUNCTION_sum_FOR_0\n").unwrap();
    let iter_at = out.code.find(":FUNCTION_sum_FOR_ITER_0\n").unwrap();
    let body_at = out.code.find(":FUNCTION_sum_FOR_BODY_0\n").unwrap();
    assert!(test_at < iter_at && iter_at < body_at);
    assert!(out.code.contains("jmp %FUNCTION_sum_FOR_ITER_0\n"));
    assert!(out.code.contains("je %FUNCTION_sum_END_FOR_0\n"));
}

#[test]
fn do_loop_tests_at_bottom() {
    let out = compile(
        Architecture::X86,
        "int once(int n) { do { n = n - 1; } while (n); return n; }",
    );
    assert!(out.code.contains(":FUNCTION_once_DO_0\n"));
    assert!(out.code.contains("jne %FUNCTION_once_DO_0\n"));
}

#[test]
fn string_literals_are_labeled_once_each() {
    let out = compile(
        Architecture::X86,
        "char* greet() { return \"hi\"; }\nchar* part() { return \"bye\"; }",
    );
    assert_eq!(out.strings, ":_string_0\n\"hi\"\n:_string_1\n\"bye\"\n");
    assert!(out.code.contains("mov_eax, &_string_0\n"));
    assert!(out.code.contains("mov_eax, &_string_1\n"));
}

#[test]
fn call_pushes_left_to_right() {
    let out = compile(
        Architecture::X86,
        "int add(int a, int b) { return a + b; }\nint main() { return add(1, 2); }",
    );
    assert!(out.code.contains(
        "mov_eax, %1\n\
         push_eax\n\
         mov_eax, %2\n\
         push_eax\n\
         call %FUNCTION_add\n\
         pop_ebx\n\
         pop_ebx\n"
    ));
}

#[test]
fn undeclared_call_is_resolved_by_the_assembler() {
    let out = compile(Architecture::X86, "int main() { return fgetc(0); }");
    assert!(out.code.contains("call %FUNCTION_fgetc\n"));
}

#[test]
fn call_through_function_argument() {
    let out = compile(Architecture::X86, "int apply(FUNCTION f) { return f(3); }");
    assert!(out.code.contains(
        "mov_eax, %3\n\
         push_eax\n\
         lea_eax,[ebp+DWORD] %8\n\
         mov_eax,[eax]\n\
         call_eax\n\
         pop_ebx\n"
    ));
}

#[test]
fn prototype_emits_nothing() {
    let out = compile(
        Architecture::X86,
        "int putchar(int c);\nint main() { return putchar(10); }",
    );
    assert!(out.code.contains("call %FUNCTION_putchar\n"));
    assert!(!out.code.contains(":FUNCTION_putchar\n"));
}

#[test]
fn pointer_addition_scales_by_pointee() {
    let out = compile(Architecture::X86, "int next(int* p) { return *(p + 1); }");
    assert!(out.code.contains(
        "mov_eax, %1\n\
         mov_ebx,eax\n\
         mov_eax, %4\n\
         mul_ebx\n\
         pop_ebx\n\
         add_eax,ebx\n\
         mov_eax,[eax]\n"
    ));
}

#[test]
fn char_pointer_addition_skips_scaling() {
    let out = compile(Architecture::X86, "char take(char* s) { return *(s + 2); }");
    assert!(!out.code.contains("mul_ebx\n"));
    assert!(out.code.contains("movsx_eax,BYTE_PTR_[eax]\n"));
}

#[test]
fn member_access_adds_the_offset() {
    let out = compile(
        Architecture::X86,
        "struct point { int x; int y; };\nint get_y(struct point* p) { return p->y; }",
    );
    assert!(out.code.contains(
        "mov_ebx,eax\n\
         mov_eax, %4\n\
         add_eax,ebx\n\
         mov_eax,[eax]\n"
    ));
}

#[test]
fn switch_collects_cases_into_a_trailing_table() {
    let out = compile(
        Architecture::X86,
        "int pick(int n) { switch (n) { case 1: return 10; case 2: return 20; default: return 0; } }",
    );
    assert!(out.code.contains("jmp %FUNCTION_pick_SWITCH_TABLE_0\n"));
    assert!(out.code.contains(":FUNCTION_pick_CASE_1_0\n"));
    assert!(out.code.contains(":FUNCTION_pick_CASE_2_0\n"));
    assert!(out.code.contains(":FUNCTION_pick_DEFAULT_0\n"));
    assert!(out.code.contains("jmp %FUNCTION_pick_DEFAULT_0\n"));
    // dispatch parks the scrutinee in b and compares per case
    let table_at = out.code.find(":FUNCTION_pick_SWITCH_TABLE_0\n").unwrap();
    let dispatch = &out.code[table_at..];
    assert!(dispatch.contains("jne %FUNCTION_pick_CASE_1_0\n"));
    assert!(dispatch.contains("jne %FUNCTION_pick_CASE_2_0\n"));
}

#[test]
fn sizeof_type_folds_to_a_constant() {
    let out = compile(Architecture::X86, "int main() { return sizeof(int); }");
    assert!(out.code.contains("mov_eax, %4\n"));
}

#[test]
fn sizeof_expression_emits_no_operand_code() {
    let out = compile(Architecture::X86, "unsigned probe(int* p) { return sizeof(*p); }");
    assert!(out.code.contains("mov_eax, %4\n"));
    assert!(!out.code.contains("mov_eax,[eax]\n"));
}

#[test]
fn postfix_increment_leaves_the_old_value() {
    let out = compile(Architecture::X86, "int bump(int n) { return n++; }");
    assert!(out.code.contains(
        "push_eax\n\
         mov_eax,[eax]\n\
         mov_ebx,eax\n\
         mov_eax, %1\n\
         add_eax,ebx\n\
         pop_ebx\n\
         mov_[ebx],eax\n\
         mov_ebx,eax\n\
         mov_eax, %1\n\
         sub_ebx,eax\n\
         mov_eax,ebx\n"
    ));
}

#[test]
fn logical_and_short_circuits() {
    let out = compile(
        Architecture::X86,
        "int both(int a, int b) { return a && b; }",
    );
    assert!(out.code.contains("jne %FUNCTION_both_AND_RHS_0\n"));
    assert!(out.code.contains(":FUNCTION_both_AND_END_0\n"));
    // the right side is normalized to 0/1
    assert!(out.code.contains("setne_al\n"));
}

#[test]
fn local_array_reserves_frame_space() {
    let out = compile(Architecture::X86, "int main() { int buf[4]; return buf; }");
    assert!(out.code.contains("sub_esp, %16\n"));
    assert!(out.code.contains("lea_eax,[ebp+DWORD] %-16\n"));
}

#[test]
fn local_struct_reserves_its_whole_size() {
    let out = compile(
        Architecture::X86,
        "struct point { int x; int y; };\n\
         int f() { int guard = 7; struct point p; p.y = 1; return guard; }",
    );
    // two words for the struct, below the guard slot
    assert!(out.code.contains("sub_esp, %8\n"));
    assert!(out.code.contains(
        "lea_eax,[ebp+DWORD] %-12\n\
         mov_ebx,eax\n\
         mov_eax, %4\n\
         add_eax,ebx\n"
    ));
    // the guard slot keeps its own address for the return load
    assert!(out.code.contains("lea_eax,[ebp+DWORD] %-4\n"));
}

#[test]
fn knight_frame_grows_upward() {
    let out = compile(Architecture::KnightNative, "int first(int x) { return x; }");
    assert_eq!(
        out.code,
        ":FUNCTION_first\n\
         PUSHR R14 R15\n\
         COPY R14 R15\n\
         ADDI R0 R14 -12\n\
         LOAD R0 R0 0\n\
         COPY R15 R14\n\
         POPR R14 R15\n\
         RET R15\n\
         COPY R15 R14\n\
         POPR R14 R15\n\
         RET R15\n"
    );
}

#[test]
fn goto_jumps_to_the_function_scoped_label() {
    let out = compile(Architecture::X86, "int main() { goto done; done: return 0; }");
    assert!(out.code.contains("jmp %FUNCTION_main_LABEL_done\n"));
    assert!(out.code.contains(":FUNCTION_main_LABEL_done\n"));
}

#[test]
fn cast_changes_the_type_without_code() {
    let out = compile(Architecture::X86, "int low(int* p) { return *(char*)p; }");
    assert!(out.code.contains("movsx_eax,BYTE_PTR_[eax]\n"));
}

#[test]
fn break_outside_loop_fails() {
    let report = compile_err(Architecture::X86, "int main() { break; }");
    assert_eq!(report, "test.c:1: break outside of a loop or switch");
}

#[test]
fn undeclared_identifier_fails() {
    let report = compile_err(Architecture::X86, "int main() { return nowhere; }");
    assert_eq!(report, "test.c:1: undeclared identifier nowhere");
}

#[test]
fn assignment_to_a_literal_fails() {
    let report = compile_err(Architecture::X86, "int main() { 4 = 5; return 0; }");
    assert_eq!(report, "test.c:1: assignment target is not an lvalue");
}

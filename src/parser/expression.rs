//! Expression parsing and emission, C precedence from assignment down to
//! primary.
//!
//! Every level follows the same contract: evaluate the left side into
//! the accumulator, push it, evaluate the right side, pop the left into
//! `b` and combine with `acc = b OP acc`. Lvalues leave their address in
//! the accumulator and are flagged in [`ExprResult`]; whoever needs the
//! value calls [`Parser::value_of`].

use crate::codegen::{AluOp, Cond};
use crate::errors::Result;
use crate::strings;
use crate::types::TypeId;

use super::{parse_integer, FunctionCtx, ParseError, Parser, Symbol};

/// What an expression left behind: its type, and whether the
/// accumulator holds the value itself or the address of it.
#[derive(Debug, Clone, Copy)]
pub struct ExprResult {
    pub ty: TypeId,
    pub lvalue: bool,
}

impl ExprResult {
    fn value(ty: TypeId) -> Self {
        Self { ty, lvalue: false }
    }

    fn place(ty: TypeId) -> Self {
        Self { ty, lvalue: true }
    }
}

const ASSIGN_OPS: [(&str, Option<AluOp>); 11] = [
    ("=", None),
    ("+=", Some(AluOp::Add)),
    ("-=", Some(AluOp::Sub)),
    ("*=", Some(AluOp::Mul)),
    ("/=", Some(AluOp::Div)),
    ("%=", Some(AluOp::Mod)),
    ("<<=", Some(AluOp::Shl)),
    (">>=", Some(AluOp::Shr)),
    ("&=", Some(AluOp::And)),
    ("|=", Some(AluOp::Or)),
    ("^=", Some(AluOp::Xor)),
];

impl<'a> Parser<'a> {
    pub(super) fn expression(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        self.assignment(ctx)
    }

    fn assignment(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let lhs = self.ternary(ctx)?;
        let Some(op) = self
            .cur
            .peek()
            .and_then(|tok| ASSIGN_OPS.iter().find(|(text, _)| *text == tok))
            .map(|(_, op)| *op)
        else {
            return Ok(lhs);
        };
        self.cur.bump();
        if !lhs.lvalue {
            return Err(self.cur.fail(ParseError::LvalueRequired));
        }
        let node = self.table.get(lhs.ty);
        if node.is_struct {
            return Err(self
                .cur
                .fail(ParseError::Unsupported("struct assignment".to_owned())));
        }
        let size = node.size;
        match op {
            None => {
                self.target.push_acc(&mut self.code);
                let rhs = self.assignment(ctx)?;
                self.value_of(rhs)?;
                self.target.pop_b(&mut self.code);
                self.target.store_through_b(&mut self.code, size);
            }
            Some(op) => {
                let signed = self.table.get(lhs.ty).is_signed;
                self.target.push_acc(&mut self.code);
                self.target.load_acc(&mut self.code, size, signed);
                self.target.push_acc(&mut self.code);
                let rhs = self.assignment(ctx)?;
                let rhs = self.value_of(rhs)?;
                if self.is_pointer(lhs.ty) && matches!(op, AluOp::Add | AluOp::Sub) {
                    self.scale_acc(self.elem_size(lhs.ty))?;
                }
                let mixed = self.operands_signed(lhs.ty, rhs.ty);
                self.target.pop_b(&mut self.code);
                self.target.alu(&mut self.code, op, mixed);
                self.target.pop_b(&mut self.code);
                self.target.store_through_b(&mut self.code, size);
            }
        }
        Ok(ExprResult::value(lhs.ty))
    }

    fn ternary(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let cond = self.logical_or(ctx)?;
        if !self.cur.bump_if("?") {
            return Ok(cond);
        }
        self.value_of(cond)?;
        let id = ctx.next_label();
        let otherwise = ctx.label("TERN_ELSE", id);
        let end = ctx.label("TERN_END", id);
        self.target.jump_if_zero(&mut self.code, &otherwise);
        let then = self.ternary(ctx)?;
        let then = self.value_of(then)?;
        self.target.jump(&mut self.code, &end);
        self.target.define_label(&mut self.code, &otherwise);
        self.cur.expect(":")?;
        let other = self.ternary(ctx)?;
        self.value_of(other)?;
        self.target.define_label(&mut self.code, &end);
        Ok(ExprResult::value(then.ty))
    }

    /// Short-circuit, with the result normalized to 0/1.
    fn logical_or(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.logical_and(ctx)?;
        while self.cur.peek() == Some("||") {
            self.cur.bump();
            self.value_of(lhs)?;
            let id = ctx.next_label();
            let rhs_label = ctx.label("OR_RHS", id);
            let end = ctx.label("OR_END", id);
            self.target.jump_if_zero(&mut self.code, &rhs_label);
            self.emit_immediate(1)?;
            self.target.jump(&mut self.code, &end);
            self.target.define_label(&mut self.code, &rhs_label);
            let rhs = self.logical_and(ctx)?;
            self.value_of(rhs)?;
            self.normalize_truth()?;
            self.target.define_label(&mut self.code, &end);
            lhs = ExprResult::value(self.table.int());
        }
        Ok(lhs)
    }

    fn logical_and(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.bit_or(ctx)?;
        while self.cur.peek() == Some("&&") {
            self.cur.bump();
            self.value_of(lhs)?;
            let id = ctx.next_label();
            let rhs_label = ctx.label("AND_RHS", id);
            let end = ctx.label("AND_END", id);
            self.target.jump_if_not_zero(&mut self.code, &rhs_label);
            self.emit_immediate(0)?;
            self.target.jump(&mut self.code, &end);
            self.target.define_label(&mut self.code, &rhs_label);
            let rhs = self.bit_or(ctx)?;
            self.value_of(rhs)?;
            self.normalize_truth()?;
            self.target.define_label(&mut self.code, &end);
            lhs = ExprResult::value(self.table.int());
        }
        Ok(lhs)
    }

    /// acc := acc != 0
    fn normalize_truth(&mut self) -> Result<()> {
        self.target.move_acc_to_b(&mut self.code);
        self.emit_immediate(0)?;
        self.target.compare(&mut self.code, Cond::Ne, true);
        Ok(())
    }

    fn bit_or(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.bit_xor(ctx)?;
        while self.cur.peek() == Some("|") {
            self.cur.bump();
            lhs = self.alu_pair(ctx, lhs, AluOp::Or, Self::bit_xor)?;
        }
        Ok(lhs)
    }

    fn bit_xor(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.bit_and(ctx)?;
        while self.cur.peek() == Some("^") {
            self.cur.bump();
            lhs = self.alu_pair(ctx, lhs, AluOp::Xor, Self::bit_and)?;
        }
        Ok(lhs)
    }

    fn bit_and(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.equality(ctx)?;
        while self.cur.peek() == Some("&") {
            self.cur.bump();
            lhs = self.alu_pair(ctx, lhs, AluOp::And, Self::equality)?;
        }
        Ok(lhs)
    }

    fn equality(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.relational(ctx)?;
        loop {
            let cond = match self.cur.peek() {
                Some("==") => Cond::Eq,
                Some("!=") => Cond::Ne,
                _ => return Ok(lhs),
            };
            self.cur.bump();
            lhs = self.compare_pair(ctx, lhs, cond, Self::relational)?;
        }
    }

    fn relational(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.shift(ctx)?;
        loop {
            let cond = match self.cur.peek() {
                Some("<") => Cond::Lt,
                Some("<=") => Cond::Le,
                Some(">") => Cond::Gt,
                Some(">=") => Cond::Ge,
                _ => return Ok(lhs),
            };
            self.cur.bump();
            lhs = self.compare_pair(ctx, lhs, cond, Self::shift)?;
        }
    }

    fn shift(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.additive(ctx)?;
        loop {
            let op = match self.cur.peek() {
                Some("<<") => AluOp::Shl,
                Some(">>") => AluOp::Shr,
                _ => return Ok(lhs),
            };
            self.cur.bump();
            lhs = self.alu_pair(ctx, lhs, op, Self::additive)?;
        }
    }

    fn additive(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.multiplicative(ctx)?;
        loop {
            let op = match self.cur.peek() {
                Some("+") => AluOp::Add,
                Some("-") => AluOp::Sub,
                _ => return Ok(lhs),
            };
            self.cur.bump();
            let left = self.value_of(lhs)?;
            self.target.push_acc(&mut self.code);
            let rhs = self.multiplicative(ctx)?;
            let right = self.value_of(rhs)?;
            let left_ptr = self.is_pointer(left.ty);
            let right_ptr = self.is_pointer(right.ty);
            if left_ptr && !right_ptr {
                self.scale_acc(self.elem_size(left.ty))?;
                self.target.pop_b(&mut self.code);
                self.target.alu(&mut self.code, op, false);
                lhs = ExprResult::value(left.ty);
            } else if right_ptr && !left_ptr && op == AluOp::Add {
                let elem = self.elem_size(right.ty);
                self.target.pop_b(&mut self.code);
                if elem > 1 {
                    // juggle the pointer through the stack so the
                    // integer in b can be scaled
                    self.target.push_acc(&mut self.code);
                    self.target.swap_acc_b(&mut self.code);
                    self.scale_acc(elem)?;
                    self.target.pop_b(&mut self.code);
                }
                self.target.alu(&mut self.code, AluOp::Add, false);
                lhs = ExprResult::value(right.ty);
            } else {
                self.target.pop_b(&mut self.code);
                let signed = self.operands_signed(left.ty, right.ty);
                self.target.alu(&mut self.code, op, signed);
                lhs = ExprResult::value(left.ty);
            }
        }
    }

    fn multiplicative(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut lhs = self.unary(ctx)?;
        loop {
            let op = match self.cur.peek() {
                Some("*") => AluOp::Mul,
                Some("/") => AluOp::Div,
                Some("%") => AluOp::Mod,
                _ => return Ok(lhs),
            };
            self.cur.bump();
            lhs = self.alu_pair(ctx, lhs, op, Self::unary)?;
        }
    }

    fn alu_pair(
        &mut self,
        ctx: &mut FunctionCtx,
        lhs: ExprResult,
        op: AluOp,
        rhs_level: fn(&mut Self, &mut FunctionCtx) -> Result<ExprResult>,
    ) -> Result<ExprResult> {
        let left = self.value_of(lhs)?;
        self.target.push_acc(&mut self.code);
        let rhs = rhs_level(self, ctx)?;
        let right = self.value_of(rhs)?;
        self.target.pop_b(&mut self.code);
        let signed = self.operands_signed(left.ty, right.ty);
        self.target.alu(&mut self.code, op, signed);
        Ok(ExprResult::value(left.ty))
    }

    fn compare_pair(
        &mut self,
        ctx: &mut FunctionCtx,
        lhs: ExprResult,
        cond: Cond,
        rhs_level: fn(&mut Self, &mut FunctionCtx) -> Result<ExprResult>,
    ) -> Result<ExprResult> {
        let left = self.value_of(lhs)?;
        self.target.push_acc(&mut self.code);
        let rhs = rhs_level(self, ctx)?;
        let right = self.value_of(rhs)?;
        self.target.pop_b(&mut self.code);
        let signed = self.operands_signed(left.ty, right.ty);
        self.target.compare(&mut self.code, cond, signed);
        Ok(ExprResult::value(self.table.int()))
    }

    // == Unary ==

    fn unary(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let Some(head) = self.cur.peek() else {
            return Err(self.cur.fail(ParseError::UnexpectedEof));
        };
        match head {
            "-" => {
                self.cur.bump();
                let operand = self.unary(ctx)?;
                let operand = self.value_of(operand)?;
                self.target.negate_acc(&mut self.code);
                Ok(ExprResult::value(operand.ty))
            }
            "+" => {
                self.cur.bump();
                let operand = self.unary(ctx)?;
                self.value_of(operand)
            }
            "!" => {
                self.cur.bump();
                let operand = self.unary(ctx)?;
                self.value_of(operand)?;
                self.target.move_acc_to_b(&mut self.code);
                self.emit_immediate(0)?;
                self.target.compare(&mut self.code, Cond::Eq, true);
                Ok(ExprResult::value(self.table.int()))
            }
            "~" => {
                self.cur.bump();
                let operand = self.unary(ctx)?;
                let operand = self.value_of(operand)?;
                self.target.not_acc(&mut self.code);
                Ok(ExprResult::value(operand.ty))
            }
            "*" => {
                self.cur.bump();
                let operand = self.unary(ctx)?;
                let operand = self.value_of(operand)?;
                if !self.is_pointer(operand.ty) {
                    return Err(self.cur.fail(ParseError::Unsupported(
                        "dereference of a non-pointer".to_owned(),
                    )));
                }
                Ok(ExprResult::place(self.table.get(operand.ty).base))
            }
            "&" => {
                self.cur.bump();
                let operand = self.unary(ctx)?;
                if !operand.lvalue {
                    return Err(self.cur.fail(ParseError::LvalueRequired));
                }
                Ok(ExprResult::value(self.table.get(operand.ty).indirect))
            }
            "++" => {
                self.cur.bump();
                let operand = self.unary(ctx)?;
                self.step_in_place(operand, AluOp::Add)
            }
            "--" => {
                self.cur.bump();
                let operand = self.unary(ctx)?;
                self.step_in_place(operand, AluOp::Sub)
            }
            "sizeof" => self.sizeof_expr(ctx),
            "(" if self.cur.peek_nth(1).is_some_and(|next| self.starts_type(next)) => {
                // cast: type change only, no code
                self.cur.bump();
                let (ty, _) = crate::types::type_name(&mut self.cur, &mut self.table)?;
                self.cur.expect(")")?;
                let operand = self.unary(ctx)?;
                self.value_of(operand)?;
                Ok(ExprResult::value(ty))
            }
            _ => self.postfix(ctx),
        }
    }

    /// `++x` / `--x`: load, step by one element, store back. The new
    /// value stays in the accumulator.
    fn step_in_place(&mut self, operand: ExprResult, op: AluOp) -> Result<ExprResult> {
        if !operand.lvalue {
            return Err(self.cur.fail(ParseError::LvalueRequired));
        }
        let step = self.step_size(operand.ty);
        let node = self.table.get(operand.ty);
        let (size, signed) = (node.size, node.is_signed);
        self.target.push_acc(&mut self.code);
        self.target.load_acc(&mut self.code, size, signed);
        self.target.move_acc_to_b(&mut self.code);
        self.emit_immediate(step)?;
        self.target.alu(&mut self.code, op, false);
        self.target.pop_b(&mut self.code);
        self.target.store_through_b(&mut self.code, size);
        Ok(ExprResult::value(operand.ty))
    }

    fn sizeof_expr(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        self.cur.bump();
        let size = if self.cur.peek() == Some("(")
            && self.cur.peek_nth(1).is_some_and(|next| self.starts_type(next))
        {
            self.cur.bump();
            let (ty, _) = crate::types::type_name(&mut self.cur, &mut self.table)?;
            self.cur.expect(")")?;
            self.table.get(ty).size
        } else {
            // parse the operand into a scratch buffer so only the
            // constant survives
            let kept = std::mem::take(&mut self.code);
            let operand = self.unary(ctx)?;
            self.code = kept;
            self.table.get(operand.ty).size
        };
        self.emit_immediate(size as i64)?;
        Ok(ExprResult::value(self.table.unsigned()))
    }

    // == Postfix ==

    fn postfix(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let mut result = self.primary(ctx)?;
        loop {
            match self.cur.peek() {
                Some("[") => {
                    self.cur.bump();
                    let base = self.value_of(result)?;
                    if !self.is_pointer(base.ty) {
                        return Err(self.cur.fail(ParseError::Unsupported(
                            "indexing a non-pointer".to_owned(),
                        )));
                    }
                    self.target.push_acc(&mut self.code);
                    let index = self.expression(ctx)?;
                    self.value_of(index)?;
                    self.scale_acc(self.elem_size(base.ty))?;
                    self.target.pop_b(&mut self.code);
                    self.target.alu(&mut self.code, AluOp::Add, false);
                    self.cur.expect("]")?;
                    result = ExprResult::place(self.table.get(base.ty).base);
                }
                Some(".") => {
                    self.cur.bump();
                    result = self.member_access(result.ty, result.lvalue)?;
                }
                Some("->") => {
                    self.cur.bump();
                    let base = self.value_of(result)?;
                    if !self.is_pointer(base.ty) {
                        return Err(self.cur.fail(ParseError::Unsupported(
                            "-> on a non-pointer".to_owned(),
                        )));
                    }
                    result = self.member_access(self.table.get(base.ty).base, true)?;
                }
                Some("++") => {
                    self.cur.bump();
                    result = self.post_step(result, AluOp::Add)?;
                }
                Some("--") => {
                    self.cur.bump();
                    result = self.post_step(result, AluOp::Sub)?;
                }
                _ => return Ok(result),
            }
        }
    }

    /// The accumulator holds the aggregate's address; add the member
    /// offset and reinterpret.
    fn member_access(&mut self, parent: TypeId, addressable: bool) -> Result<ExprResult> {
        if !self.table.get(parent).is_struct || !addressable {
            return Err(self.cur.fail(ParseError::Unsupported(
                "member access on a non-struct".to_owned(),
            )));
        }
        let name = self.cur.take()?;
        let member = self
            .table
            .member(parent, &name)
            .map_err(|e| self.cur.fail(e))?;
        if member.offset > 0 {
            self.target.move_acc_to_b(&mut self.code);
            self.emit_immediate(member.offset as i64)?;
            self.target.alu(&mut self.code, AluOp::Add, false);
        }
        if member.is_array {
            // arrays decay to a pointer to their first element
            Ok(ExprResult::value(self.table.get(member.ty).indirect))
        } else {
            Ok(ExprResult::place(member.ty))
        }
    }

    /// `x++` / `x--`: like the prefix forms, then arithmetically undone
    /// so the accumulator ends with the original value.
    fn post_step(&mut self, operand: ExprResult, op: AluOp) -> Result<ExprResult> {
        let result = self.step_in_place(operand, op)?;
        let undo = match op {
            AluOp::Add => AluOp::Sub,
            _ => AluOp::Add,
        };
        let step = self.step_size(operand.ty);
        self.target.move_acc_to_b(&mut self.code);
        self.emit_immediate(step)?;
        self.target.alu(&mut self.code, undo, false);
        Ok(result)
    }

    // == Primary ==

    fn primary(&mut self, ctx: &mut FunctionCtx) -> Result<ExprResult> {
        let Some(head) = self.cur.peek() else {
            return Err(self.cur.fail(ParseError::UnexpectedEof));
        };
        if head == "(" {
            self.cur.bump();
            let inner = self.expression(ctx)?;
            self.cur.expect(")")?;
            return Ok(inner);
        }
        if head.starts_with('"') {
            let literal = self.cur.take()?;
            let label = format!("_string_{}", self.string_count);
            self.string_count += 1;
            self.target.define_label(&mut self.strings, &label);
            let encoded = strings::encode(&literal).map_err(|e| self.cur.fail(e))?;
            self.strings.push_str(&encoded);
            self.target.global_address(&mut self.code, &label);
            return Ok(ExprResult::value(self.table.get(self.table.char()).indirect));
        }
        if head.starts_with('\'') {
            let literal = self.cur.take()?;
            let value = strings::char_value(&literal).map_err(|e| self.cur.fail(e))?;
            self.emit_immediate(value)?;
            return Ok(ExprResult::value(self.table.int()));
        }
        if head.starts_with(|c: char| c.is_ascii_digit()) {
            let literal = self.cur.take()?;
            let (value, unsigned) = parse_integer(&literal)
                .ok_or_else(|| self.cur.fail(ParseError::InvalidNumber(literal.clone())))?;
            self.emit_immediate(value)?;
            let ty = if unsigned {
                self.table.unsigned()
            } else {
                self.table.int()
            };
            return Ok(ExprResult::value(ty));
        }
        let name = self.cur.take()?;
        if self.cur.peek() == Some("(") {
            return self.call(ctx, &name);
        }
        if let Some((ty, offset, array)) = self.lookup_local(ctx, &name) {
            self.target.local_address(&mut self.code, offset);
            return Ok(if array {
                ExprResult::value(self.table.get(ty).indirect)
            } else {
                ExprResult::place(ty)
            });
        }
        match self.symbols.get(&name) {
            Some(&Symbol::Global { ty, array }) => {
                self.target
                    .global_address(&mut self.code, &format!("GLOBAL_{name}"));
                Ok(if array {
                    ExprResult::value(self.table.get(ty).indirect)
                } else {
                    ExprResult::place(ty)
                })
            }
            Some(&Symbol::Function { .. }) => {
                self.target
                    .global_address(&mut self.code, &format!("FUNCTION_{name}"));
                Ok(ExprResult::value(self.table.function()))
            }
            None => Err(self.cur.fail(ParseError::UndeclaredIdentifier(name))),
        }
    }

    /// Arguments are pushed left to right; calls through a variable load
    /// the `FUNCTION` pointer after the last push. Calls to names with no
    /// visible declaration are emitted textually and left for the
    /// assembler to resolve.
    fn call(&mut self, ctx: &mut FunctionCtx, name: &str) -> Result<ExprResult> {
        self.cur.expect("(")?;
        let mut count = 0u64;
        if self.cur.peek() != Some(")") {
            loop {
                let argument = self.expression(ctx)?;
                self.value_of(argument)?;
                self.target.push_acc(&mut self.code);
                count += 1;
                if !self.cur.bump_if(",") {
                    break;
                }
            }
        }
        self.cur.expect(")")?;

        let word = self.target.word();
        let ret = if let Some((_, offset, _)) = self.lookup_local(ctx, name) {
            self.target.local_address(&mut self.code, offset);
            self.target.load_acc(&mut self.code, word, false);
            self.target.call_acc(&mut self.code);
            self.table.int()
        } else {
            match self.symbols.get(name) {
                Some(&Symbol::Global { .. }) => {
                    self.target
                        .global_address(&mut self.code, &format!("GLOBAL_{name}"));
                    self.target.load_acc(&mut self.code, word, false);
                    self.target.call_acc(&mut self.code);
                    self.table.int()
                }
                Some(&Symbol::Function { ret }) => {
                    self.target.call(&mut self.code, &format!("FUNCTION_{name}"));
                    ret
                }
                None => {
                    self.target.call(&mut self.code, &format!("FUNCTION_{name}"));
                    self.table.int()
                }
            }
        };
        self.target.pop_args(&mut self.code, count);
        Ok(ExprResult::value(ret))
    }

    // == Helpers ==

    /// acc := acc * elem, via b. Only meaningful while b is dead.
    fn scale_acc(&mut self, elem: u64) -> Result<()> {
        if elem > 1 {
            self.target.move_acc_to_b(&mut self.code);
            self.emit_immediate(elem as i64)?;
            self.target.alu(&mut self.code, AluOp::Mul, false);
        }
        Ok(())
    }

    fn operands_signed(&self, left: TypeId, right: TypeId) -> bool {
        self.table.get(left).is_signed && self.table.get(right).is_signed
    }

    fn is_pointer(&self, ty: TypeId) -> bool {
        self.table.get(ty).is_pointer
    }

    fn elem_size(&self, ty: TypeId) -> u64 {
        let base = self.table.get(ty).base;
        self.table.get(base).size
    }

    /// Pointers step by their pointee size, everything else by one.
    fn step_size(&self, ty: TypeId) -> i64 {
        if self.is_pointer(ty) {
            self.elem_size(ty) as i64
        } else {
            1
        }
    }
}

//! Single pass from the preprocessed token stream to assembly text.
//!
//! Parsing and code generation are fused: every grammar production emits
//! its instructions the moment it is recognized, into one of three
//! append-only streams (function code, global storage, string literals)
//! that the driver later concatenates. There is no AST and no second
//! pass; the only lookahead is deciding whether an identifier starts a
//! declaration or an expression.
//!
//! Values travel through the two-register accumulator model of
//! [`Target`]: binary operators evaluate their left side, push it, run
//! the right side, pop into `b` and combine. Lvalues are addresses held
//! in the accumulator; [`Parser::value_of`] collapses them to loaded
//! values on demand.

pub mod cursor;
mod expression;
mod parse_error;
#[cfg(test)]
mod parser_tests;

pub use expression::ExprResult;
pub use parse_error::ParseError;

use rustc_hash::FxHashMap;

use crate::codegen::{Cond, Target};
use crate::errors::Result;
use crate::lexer::token::TokenList;
use crate::session::Session;
use crate::types::{self, TypeId, TypeTable};

use cursor::Cursor;

/// The three assembly streams a compilation unit produces, in the order
/// the driver concatenates them.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub code: String,
    pub globals: String,
    pub strings: String,
}

#[derive(Debug)]
pub(super) enum Symbol {
    Global { ty: TypeId, array: bool },
    Function { ret: TypeId },
}

#[derive(Debug)]
pub(super) struct Local {
    name: String,
    ty: TypeId,
    /// Frame-pointer-relative byte offset, precomputed for the target.
    offset: i64,
    array: bool,
}

/// Per-function parse state: the local chain, the frame depth in words,
/// the label counter and the jump targets `break`/`continue` resolve to.
pub(super) struct FunctionCtx {
    name: String,
    locals: Vec<Local>,
    depth: u64,
    labels: u64,
    break_label: Option<String>,
    continue_label: Option<String>,
    switches: Vec<SwitchCtx>,
}

/// Collected while a `switch` body parses; the dispatch table is emitted
/// once the closing brace is reached.
struct SwitchCtx {
    id: u64,
    cases: Vec<i64>,
    has_default: bool,
}

impl FunctionCtx {
    fn new(name: String) -> Self {
        Self {
            name,
            locals: Vec::new(),
            depth: 0,
            labels: 0,
            break_label: None,
            continue_label: None,
            switches: Vec::new(),
        }
    }

    pub(super) fn next_label(&mut self) -> u64 {
        let id = self.labels;
        self.labels += 1;
        id
    }

    /// Internal label, unique through the per-function counter.
    pub(super) fn label(&self, tag: &str, id: u64) -> String {
        format!("FUNCTION_{}_{}_{}", self.name, tag, id)
    }

    /// `goto` target; uniqueness is the program's responsibility.
    fn goto_label(&self, name: &str) -> String {
        format!("FUNCTION_{}_LABEL_{}", self.name, name)
    }

    /// Shadowing resolves most recently declared first.
    fn local(&self, name: &str) -> Option<&Local> {
        self.locals.iter().rev().find(|local| local.name == name)
    }
}

pub(super) struct Parser<'a> {
    pub(super) cur: Cursor<'a>,
    pub(super) table: TypeTable,
    pub(super) target: Target,
    pub(super) code: String,
    pub(super) globals: String,
    pub(super) strings: String,
    pub(super) symbols: FxHashMap<String, Symbol>,
    pub(super) string_count: u64,
}

pub fn parse(tokens: &TokenList, session: &Session) -> Result<ParseOutput> {
    let mut parser = Parser {
        cur: Cursor::new(tokens),
        table: TypeTable::new(session.word_size()),
        target: Target::new(session.arch),
        code: String::new(),
        globals: String::new(),
        strings: String::new(),
        symbols: FxHashMap::default(),
        string_count: 0,
    };
    parser.program()?;
    Ok(ParseOutput {
        code: parser.code,
        globals: parser.globals,
        strings: parser.strings,
    })
}

impl<'a> Parser<'a> {
    fn program(&mut self) -> Result<()> {
        while !self.cur.at_end() {
            if self.cur.peek() == Some("struct") && self.cur.peek_nth(2) == Some("{") {
                self.cur.bump();
                types::create_struct(&mut self.cur, &mut self.table)?;
                continue;
            }
            self.top_declaration()?;
        }
        Ok(())
    }

    fn top_declaration(&mut self) -> Result<()> {
        let (ty, is_extern) = types::type_name(&mut self.cur, &mut self.table)?;
        let name = self.cur.take()?;
        if self.cur.peek() == Some("(") {
            self.function(ty, name)
        } else {
            self.global(ty, name, is_extern)
        }
    }

    // == Globals ==

    fn global(&mut self, ty: TypeId, name: String, is_extern: bool) -> Result<()> {
        let word = self.target.word();
        if self.cur.bump_if("=") {
            let value = self.const_expr()?;
            self.target
                .define_label(&mut self.globals, &format!("GLOBAL_{name}"));
            self.globals.push_str(&format!("%{value}\n"));
            if word == 8 {
                // high half of the doubleword, sign-extended
                self.globals
                    .push_str(if value < 0 { "%-1\n" } else { "%0\n" });
            }
            self.cur.expect(";")?;
            self.symbols
                .insert(name, Symbol::Global { ty, array: false });
        } else if self.cur.bump_if("[") {
            let count = self.array_length()?;
            self.cur.expect("]")?;
            self.cur.expect(";")?;
            let elem = self.table.get(ty).size;
            let words = (count * elem).div_ceil(word);
            self.target
                .define_label(&mut self.globals, &format!("GLOBAL_{name}"));
            for _ in 0..words {
                self.globals.push_str("NULL\n");
            }
            self.symbols.insert(name, Symbol::Global { ty, array: true });
        } else {
            self.cur.expect(";")?;
            if !is_extern {
                let words = self.table.get(ty).size.div_ceil(word).max(1);
                self.target
                    .define_label(&mut self.globals, &format!("GLOBAL_{name}"));
                for _ in 0..words {
                    self.globals.push_str("NULL\n");
                }
            }
            self.symbols
                .insert(name, Symbol::Global { ty, array: false });
        }
        Ok(())
    }

    /// Global initializers: an optional sign, then an integer literal, a
    /// character literal or `sizeof(type)`. Evaluated at parse time.
    fn const_expr(&mut self) -> Result<i64> {
        let negated = self.cur.bump_if("-");
        let text = self.cur.take()?;
        let value = if text == "sizeof" {
            self.cur.expect("(")?;
            let (ty, _) = types::type_name(&mut self.cur, &mut self.table)?;
            self.cur.expect(")")?;
            self.table.get(ty).size as i64
        } else if text.starts_with('\'') {
            crate::strings::char_value(&text).map_err(|e| self.cur.fail(e))?
        } else {
            parse_integer(&text)
                .map(|(value, _)| value)
                .ok_or_else(|| self.cur.fail(ParseError::InvalidNumber(text.clone())))?
        };
        Ok(if negated { -value } else { value })
    }

    fn array_length(&mut self) -> Result<u64> {
        let text = self.cur.take()?;
        text.parse()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| self.cur.fail(ParseError::InvalidNumber(text.clone())))
    }

    // == Functions ==

    fn function(&mut self, ret: TypeId, name: String) -> Result<()> {
        self.cur.expect("(")?;
        let mut params = Vec::new();
        if self.cur.peek() != Some(")") {
            loop {
                let (ty, _) = types::type_name(&mut self.cur, &mut self.table)?;
                if self.cur.peek() == Some(")") && self.table.get(ty).name == "void" {
                    break;
                }
                let param = self.cur.take()?;
                params.push((ty, param));
                if !self.cur.bump_if(",") {
                    break;
                }
            }
        }
        self.cur.expect(")")?;
        self.symbols.insert(name.clone(), Symbol::Function { ret });
        if self.cur.bump_if(";") {
            // prototype only
            return Ok(());
        }

        let mut ctx = FunctionCtx::new(name);
        let count = params.len() as u64;
        for (index, (ty, param)) in params.into_iter().enumerate() {
            ctx.locals.push(Local {
                name: param,
                ty,
                offset: self.target.argument_offset(index as u64, count),
                array: false,
            });
        }
        self.target
            .define_label(&mut self.code, &format!("FUNCTION_{}", ctx.name));
        self.target.prologue(&mut self.code);
        self.cur.expect("{")?;
        self.block(&mut ctx)?;
        // fall-off-the-end return
        self.target.epilogue(&mut self.code);
        self.target.ret(&mut self.code);
        Ok(())
    }

    fn block(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        while self.cur.peek() != Some("}") {
            if self.cur.at_end() {
                return Err(self.cur.fail(ParseError::UnexpectedEof));
            }
            self.statement(ctx)?;
        }
        self.cur.expect("}")
    }

    // == Statements ==

    fn statement(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        let Some(head) = self.cur.peek() else {
            return Err(self.cur.fail(ParseError::UnexpectedEof));
        };
        match head {
            "{" => {
                self.cur.bump();
                self.block(ctx)
            }
            ";" => {
                self.cur.bump();
                Ok(())
            }
            "if" => self.if_statement(ctx),
            "while" => self.while_statement(ctx),
            "do" => self.do_statement(ctx),
            "for" => self.for_statement(ctx),
            "switch" => self.switch_statement(ctx),
            "case" => self.case_label(ctx),
            ":default" => self.default_label(ctx),
            "break" => {
                self.cur.bump();
                self.cur.expect(";")?;
                let label = ctx
                    .break_label
                    .clone()
                    .ok_or_else(|| self.cur.fail(ParseError::BreakOutsideLoop))?;
                self.target.jump(&mut self.code, &label);
                Ok(())
            }
            "continue" => {
                self.cur.bump();
                self.cur.expect(";")?;
                let label = ctx
                    .continue_label
                    .clone()
                    .ok_or_else(|| self.cur.fail(ParseError::ContinueOutsideLoop))?;
                self.target.jump(&mut self.code, &label);
                Ok(())
            }
            "return" => {
                self.cur.bump();
                if self.cur.peek() != Some(";") {
                    let value = self.expression(ctx)?;
                    self.value_of(value)?;
                }
                self.cur.expect(";")?;
                self.target.epilogue(&mut self.code);
                self.target.ret(&mut self.code);
                Ok(())
            }
            "goto" => {
                self.cur.bump();
                let name = self.cur.take()?;
                self.cur.expect(";")?;
                let label = ctx.goto_label(&name);
                self.target.jump(&mut self.code, &label);
                Ok(())
            }
            _ if head.starts_with(':') => {
                // `name:` arrives from the lexer as a single ":name" token
                let label = ctx.goto_label(&head[1..]);
                self.cur.bump();
                self.target.define_label(&mut self.code, &label);
                Ok(())
            }
            _ if self.starts_type(head) => self.local_declaration(ctx),
            _ => {
                self.expression(ctx)?;
                self.cur.expect(";")
            }
        }
    }

    pub(super) fn starts_type(&self, token: &str) -> bool {
        token == "struct"
            || token == "const"
            || token == "extern"
            || self.table.lookup(token).is_some()
    }

    fn local_declaration(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        let (ty, _) = types::type_name(&mut self.cur, &mut self.table)?;
        let name = self.cur.take()?;
        let word = self.target.word();
        if self.cur.bump_if("[") {
            let count = self.array_length()?;
            self.cur.expect("]")?;
            self.cur.expect(";")?;
            let elem = self.table.get(ty).size;
            let words = (count * elem).div_ceil(word);
            let offset = self.target.local_block_offset(ctx.depth + 1, words);
            ctx.depth += words;
            self.target.allocate_stack(&mut self.code, words * word);
            ctx.locals.push(Local {
                name,
                ty,
                offset,
                array: true,
            });
        } else if self.table.get(ty).is_struct {
            // a struct occupies a whole block of the frame, not one slot
            self.cur.expect(";")?;
            let words = self.table.get(ty).size.div_ceil(word).max(1);
            let offset = self.target.local_block_offset(ctx.depth + 1, words);
            ctx.depth += words;
            self.target.allocate_stack(&mut self.code, words * word);
            ctx.locals.push(Local {
                name,
                ty,
                offset,
                array: false,
            });
        } else {
            if self.cur.bump_if("=") {
                let value = self.expression(ctx)?;
                self.value_of(value)?;
            }
            self.cur.expect(";")?;
            // the slot is the push itself; without an initializer it
            // holds whatever the accumulator had
            ctx.depth += 1;
            self.target.push_acc(&mut self.code);
            ctx.locals.push(Local {
                name,
                ty,
                offset: self.target.local_offset(ctx.depth),
                array: false,
            });
        }
        Ok(())
    }

    fn if_statement(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        self.cur.bump();
        self.cur.expect("(")?;
        let cond = self.expression(ctx)?;
        self.value_of(cond)?;
        self.cur.expect(")")?;
        let id = ctx.next_label();
        let else_label = ctx.label("ELSE", id);
        let end_label = ctx.label("END_IF", id);
        self.target.jump_if_zero(&mut self.code, &else_label);
        self.statement(ctx)?;
        self.target.jump(&mut self.code, &end_label);
        self.target.define_label(&mut self.code, &else_label);
        if self.cur.bump_if("else") {
            self.statement(ctx)?;
        }
        self.target.define_label(&mut self.code, &end_label);
        Ok(())
    }

    fn while_statement(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        self.cur.bump();
        let id = ctx.next_label();
        let head = ctx.label("WHILE", id);
        let end = ctx.label("END_WHILE", id);
        self.target.define_label(&mut self.code, &head);
        self.cur.expect("(")?;
        let cond = self.expression(ctx)?;
        self.value_of(cond)?;
        self.cur.expect(")")?;
        self.target.jump_if_zero(&mut self.code, &end);
        self.loop_body(ctx, end.clone(), head.clone())?;
        self.target.jump(&mut self.code, &head);
        self.target.define_label(&mut self.code, &end);
        Ok(())
    }

    fn do_statement(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        self.cur.bump();
        let id = ctx.next_label();
        let head = ctx.label("DO", id);
        let test = ctx.label("DO_TEST", id);
        let end = ctx.label("END_DO", id);
        self.target.define_label(&mut self.code, &head);
        self.loop_body(ctx, end.clone(), test.clone())?;
        self.target.define_label(&mut self.code, &test);
        self.cur.expect("while")?;
        self.cur.expect("(")?;
        let cond = self.expression(ctx)?;
        self.value_of(cond)?;
        self.cur.expect(")")?;
        self.cur.expect(";")?;
        self.target.jump_if_not_zero(&mut self.code, &head);
        self.target.define_label(&mut self.code, &end);
        Ok(())
    }

    /// The iteration expression is hoisted above the body in the output,
    /// so the body jumps backward to it and it jumps further back to the
    /// test.
    fn for_statement(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        self.cur.bump();
        self.cur.expect("(")?;
        if self.cur.peek() != Some(";") {
            self.expression(ctx)?;
        }
        self.cur.expect(";")?;
        let id = ctx.next_label();
        let test = ctx.label("FOR", id);
        let iter = ctx.label("FOR_ITER", id);
        let body = ctx.label("FOR_BODY", id);
        let end = ctx.label("END_FOR", id);
        self.target.define_label(&mut self.code, &test);
        if self.cur.peek() != Some(";") {
            let cond = self.expression(ctx)?;
            self.value_of(cond)?;
            self.target.jump_if_zero(&mut self.code, &end);
        }
        self.cur.expect(";")?;
        self.target.jump(&mut self.code, &body);
        self.target.define_label(&mut self.code, &iter);
        if self.cur.peek() != Some(")") {
            self.expression(ctx)?;
        }
        self.cur.expect(")")?;
        self.target.jump(&mut self.code, &test);
        self.target.define_label(&mut self.code, &body);
        self.loop_body(ctx, end.clone(), iter.clone())?;
        self.target.jump(&mut self.code, &iter);
        self.target.define_label(&mut self.code, &end);
        Ok(())
    }

    fn loop_body(
        &mut self,
        ctx: &mut FunctionCtx,
        break_label: String,
        continue_label: String,
    ) -> Result<()> {
        let saved_break = ctx.break_label.replace(break_label);
        let saved_continue = ctx.continue_label.replace(continue_label);
        let body = self.statement(ctx);
        ctx.break_label = saved_break;
        ctx.continue_label = saved_continue;
        body
    }

    /// The dispatch table sits after the body: the scrutinee jumps
    /// forward to it, it compares against each collected case value in
    /// encounter order and jumps back to the matching case label, so the
    /// body itself falls through between stacked cases.
    fn switch_statement(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        self.cur.bump();
        self.cur.expect("(")?;
        let scrutinee = self.expression(ctx)?;
        self.value_of(scrutinee)?;
        self.cur.expect(")")?;
        let id = ctx.next_label();
        let table = ctx.label("SWITCH_TABLE", id);
        let end = ctx.label("END_SWITCH", id);
        self.target.jump(&mut self.code, &table);
        ctx.switches.push(SwitchCtx {
            id,
            cases: Vec::new(),
            has_default: false,
        });
        let saved_break = ctx.break_label.replace(end.clone());
        self.cur.expect("{")?;
        let body = self.block(ctx);
        ctx.break_label = saved_break;
        let Some(collected) = ctx.switches.pop() else {
            return Err(self.cur.fail(ParseError::Unsupported("switch".to_owned())));
        };
        body?;
        self.target.jump(&mut self.code, &end);
        self.target.define_label(&mut self.code, &table);
        self.target.move_acc_to_b(&mut self.code);
        for value in &collected.cases {
            self.target
                .load_immediate(&mut self.code, *value)
                .map_err(|e| self.cur.fail(e))?;
            self.target.compare(&mut self.code, Cond::Eq, true);
            let case = ctx.label(&format!("CASE_{value}"), id);
            self.target.jump_if_not_zero(&mut self.code, &case);
        }
        if collected.has_default {
            let default = ctx.label("DEFAULT", id);
            self.target.jump(&mut self.code, &default);
        } else {
            self.target.jump(&mut self.code, &end);
        }
        self.target.define_label(&mut self.code, &end);
        Ok(())
    }

    fn case_label(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        self.cur.bump();
        let negated = self.cur.bump_if("-");
        let text = self.cur.take()?;
        // `case 1:` fuses into ["case", ":1"]; a spaced colon arrives
        // as a separate token
        let raw = match text.strip_prefix(':') {
            Some(fused) => fused.to_owned(),
            None => {
                self.cur.expect(":")?;
                text
            }
        };
        let mut value = if raw.starts_with('\'') {
            crate::strings::char_value(&raw).map_err(|e| self.cur.fail(e))?
        } else {
            parse_integer(&raw)
                .map(|(value, _)| value)
                .ok_or_else(|| self.cur.fail(ParseError::CaseValueNotLiteral(raw.clone())))?
        };
        if negated {
            value = -value;
        }
        let Some(switch) = ctx.switches.last_mut() else {
            return Err(self
                .cur
                .fail(ParseError::Unsupported("case outside of switch".to_owned())));
        };
        switch.cases.push(value);
        let id = switch.id;
        let label = ctx.label(&format!("CASE_{value}"), id);
        self.target.define_label(&mut self.code, &label);
        Ok(())
    }

    fn default_label(&mut self, ctx: &mut FunctionCtx) -> Result<()> {
        self.cur.bump();
        let Some(switch) = ctx.switches.last_mut() else {
            return Err(self.cur.fail(ParseError::Unsupported(
                "default outside of switch".to_owned(),
            )));
        };
        switch.has_default = true;
        let id = switch.id;
        let label = ctx.label("DEFAULT", id);
        self.target.define_label(&mut self.code, &label);
        Ok(())
    }

    // == Shared expression plumbing ==

    /// Collapse an lvalue to its loaded value. Structs stay as their
    /// address, which is what passing or assigning them means here.
    pub(super) fn value_of(&mut self, result: ExprResult) -> Result<ExprResult> {
        if !result.lvalue {
            return Ok(result);
        }
        let node = self.table.get(result.ty);
        if node.is_struct {
            return Ok(ExprResult {
                ty: result.ty,
                lvalue: false,
            });
        }
        let (size, signed) = (node.size, node.is_signed);
        self.target.load_acc(&mut self.code, size, signed);
        Ok(ExprResult {
            ty: result.ty,
            lvalue: false,
        })
    }

    pub(super) fn emit_immediate(&mut self, value: i64) -> Result<()> {
        self.target
            .load_immediate(&mut self.code, value)
            .map_err(|e| self.cur.fail(e))
    }

    pub(super) fn lookup_local(&self, ctx: &FunctionCtx, name: &str) -> Option<(TypeId, i64, bool)> {
        ctx.local(name)
            .map(|local| (local.ty, local.offset, local.array))
    }
}

/// Decode an integer literal: decimal or `0x` hex, with an optional
/// `u`/`U` suffix marking it unsigned. Returns the value and whether the
/// suffix was present.
pub(super) fn parse_integer(text: &str) -> Option<(i64, bool)> {
    let (digits, unsigned) = match text.strip_suffix(['u', 'U']) {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse().ok()?
    };
    Some((value, unsigned))
}

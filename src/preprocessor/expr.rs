//! `#if` controlling-expression evaluation.
//!
//! The language is deliberately small: integer literals, `!`,
//! parentheses, and flat left-to-right `&&`/`||` chains with
//! short-circuit, all at equal precedence. `defined` applications are
//! replaced with `1`/`0` during macro expansion before this runs, and
//! any token that is not a literal evaluates as 0, so an undefined
//! identifier never aborts the compilation.

pub fn evaluate(tokens: &[String]) -> i64 {
    let mut eval = Evaluator { tokens, at: 0 };
    eval.chain()
}

struct Evaluator<'a> {
    tokens: &'a [String],
    at: usize,
}

impl<'a> Evaluator<'a> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.at).map(String::as_str)
    }

    fn bump(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.at).map(String::as_str);
        self.at += 1;
        token
    }

    fn chain(&mut self) -> i64 {
        let mut value = self.unary();
        loop {
            match self.peek() {
                Some("&&") => {
                    self.at += 1;
                    // the right side is consumed either way; only the
                    // truth value short-circuits
                    let rhs = self.unary();
                    value = i64::from(value != 0 && rhs != 0);
                }
                Some("||") => {
                    self.at += 1;
                    let rhs = self.unary();
                    value = i64::from(value != 0 || rhs != 0);
                }
                _ => return value,
            }
        }
    }

    fn unary(&mut self) -> i64 {
        match self.bump() {
            Some("!") => i64::from(self.unary() == 0),
            Some("(") => {
                let value = self.chain();
                if self.peek() == Some(")") {
                    self.at += 1;
                }
                value
            }
            Some(token) => literal(token),
            None => 0,
        }
    }
}

fn literal(token: &str) -> i64 {
    let (digits, radix) = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (token, 10),
    };
    i64::from_str_radix(digits, radix).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::evaluate;

    fn eval(source: &str) -> i64 {
        let tokens: Vec<String> = source.split_whitespace().map(str::to_owned).collect();
        evaluate(&tokens)
    }

    #[test]
    fn literals() {
        assert_eq!(eval("1"), 1);
        assert_eq!(eval("0"), 0);
        assert_eq!(eval("42"), 42);
        assert_eq!(eval("0x10"), 16);
    }

    #[test]
    fn unknown_tokens_count_as_zero() {
        assert_eq!(eval("FOO"), 0);
        assert_eq!(eval("FOO || 1"), 1);
        assert_eq!(eval("FOO && 1"), 0);
    }

    #[test]
    fn negation() {
        assert_eq!(eval("! 0"), 1);
        assert_eq!(eval("! 5"), 0);
        assert_eq!(eval("! ! 7"), 1);
    }

    #[test]
    fn flat_chains_evaluate_left_to_right() {
        assert_eq!(eval("1 && 1 && 0"), 0);
        assert_eq!(eval("0 || 0 || 3"), 1);
        assert_eq!(eval("1 || 0 && 0"), 0);
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(eval("1 || ( 0 && 0 )"), 1);
        assert_eq!(eval("! ( 1 && 0 )"), 1);
    }

    #[test]
    fn empty_expression_is_false() {
        assert_eq!(eval(""), 0);
    }
}

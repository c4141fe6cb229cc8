//! Arithmetic expressions for question templates.
//!
//! Templates embed expressions in braces: `"What is {a} × {b}?"` with
//! answer `"{a * b}"`. Only arithmetic over named numbers is possible here,
//! which is what keeps template generators sandboxed.

use std::collections::HashMap;

use crate::error::ExprError;

/// Variable bindings for evaluation.
pub type Vars = HashMap<String, f64>;

/// Deepest allowed nesting of parentheses, calls and unary minus.
pub const MAX_DEPTH: usize = 32;
/// Longest expression accepted inside one placeholder.
pub const MAX_EXPR_LEN: usize = 256;
/// Longest template accepted by [`render`].
pub const MAX_TEMPLATE_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Num(n));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            // Typographic operators that show up when authors copy question text.
            '×' => {
                tokens.push(Token::Op('*'));
                i += 1;
            }
            '÷' => {
                tokens.push(Token::Op('/'));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            other => return Err(ExprError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(String),
    Neg(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

// Precedence climbing:
//   expr   := term (('+' | '-') term)*
//   term   := unary (('*' | '/' | '%') unary)*
//   unary  := '-' unary | power
//   power  := atom ('^' unary)?
//   atom   := number | ident | ident '(' args ')' | '(' expr ')'
impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if let Some(Token::Op('-')) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let inner = self.unary()?;
            self.ascend();
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let exp = self.unary()?;
            self.ascend();
            return Ok(Expr::Binary('^', Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    self.descend()?;
                    let mut args = Vec::new();
                    if let Some(Token::RParen) = self.peek() {
                        self.pos += 1;
                        self.ascend();
                        return Ok(Expr::Call(name, args));
                    }
                    loop {
                        args.push(self.expr()?);
                        match self.next() {
                            Some(Token::Comma) => continue,
                            Some(Token::RParen) => break,
                            Some(tok) => return Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
                            None => return Err(ExprError::UnexpectedEnd),
                        }
                    }
                    self.ascend();
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                self.ascend();
                Ok(inner)
            }
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Parse an expression.
///
/// Input is capped at [`MAX_EXPR_LEN`] characters and [`MAX_DEPTH`] levels
/// of nesting, which also bounds the recursion in [`Expr::eval`].
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    if src.chars().count() > MAX_EXPR_LEN {
        return Err(ExprError::TooLong {
            what: "expression",
            limit: MAX_EXPR_LEN,
        });
    }
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(ExprError::UnexpectedToken(format!("{tok:?}")));
    }
    Ok(expr)
}

impl Expr {
    /// Evaluate against the given bindings.
    pub fn eval(&self, vars: &Vars) -> Result<f64, ExprError> {
        let value = match self {
            Expr::Num(n) => *n,
            Expr::Var(name) => *vars
                .get(name)
                .ok_or_else(|| ExprError::UnknownVariable(name.clone()))?,
            Expr::Neg(inner) => -inner.eval(vars)?,
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(vars)?;
                let b = rhs.eval(vars)?;
                match op {
                    '+' => a + b,
                    '-' => a - b,
                    '*' => a * b,
                    '/' if b == 0.0 => return Err(ExprError::DivisionByZero),
                    '/' => a / b,
                    '%' if b == 0.0 => return Err(ExprError::DivisionByZero),
                    '%' => a % b,
                    '^' => a.powf(b),
                    other => return Err(ExprError::UnexpectedToken(other.to_string())),
                }
            }
            Expr::Call(name, args) => call(name, args, vars)?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExprError::NotFinite)
        }
    }
}

fn call(name: &str, args: &[Expr], vars: &Vars) -> Result<f64, ExprError> {
    let values = args
        .iter()
        .map(|a| a.eval(vars))
        .collect::<Result<Vec<_>, _>>()?;

    let arity = |expected: usize| -> Result<(), ExprError> {
        if values.len() == expected {
            Ok(())
        } else {
            Err(ExprError::Arity {
                name: name.to_string(),
                expected,
                got: values.len(),
            })
        }
    };

    match name {
        "abs" => {
            arity(1)?;
            Ok(values[0].abs())
        }
        "round" => {
            arity(1)?;
            Ok(values[0].round())
        }
        "floor" => {
            arity(1)?;
            Ok(values[0].floor())
        }
        "ceil" => {
            arity(1)?;
            Ok(values[0].ceil())
        }
        "sqrt" => {
            arity(1)?;
            Ok(values[0].sqrt())
        }
        "min" => {
            arity(2)?;
            Ok(values[0].min(values[1]))
        }
        "max" => {
            arity(2)?;
            Ok(values[0].max(values[1]))
        }
        "gcd" => {
            arity(2)?;
            Ok(gcd(values[0].round() as i64, values[1].round() as i64) as f64)
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}

/// Greatest common divisor, always non-negative.
pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Evaluate an expression string in one step.
pub fn eval_str(src: &str, vars: &Vars) -> Result<f64, ExprError> {
    parse(src)?.eval(vars)
}

/// Format a number for display in a question.
///
/// Integral values print without a decimal point; everything else is
/// rounded to four decimals with trailing zeros trimmed.
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let s = format!("{n:.4}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Expand every `{expr}` placeholder in `template`.
///
/// `{{` and `}}` produce literal braces, so LaTeX such as `\frac{{a}}{{b}}`
/// can still be written.
pub fn render(template: &str, vars: &Vars) -> Result<String, ExprError> {
    if template.chars().count() > MAX_TEMPLATE_LEN {
        return Err(ExprError::TooLong {
            what: "template",
            limit: MAX_TEMPLATE_LEN,
        });
    }
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(ExprError::UnclosedPlaceholder);
                }
                out.push_str(&format_number(eval_str(&inner, vars)?));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, f64)]) -> Vars {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn precedence_and_associativity() {
        let v = Vars::new();
        assert_eq!(eval_str("1 + 2 * 3", &v).unwrap(), 7.0);
        assert_eq!(eval_str("(1 + 2) * 3", &v).unwrap(), 9.0);
        assert_eq!(eval_str("10 - 4 - 3", &v).unwrap(), 3.0);
        assert_eq!(eval_str("2 ^ 3 ^ 2", &v).unwrap(), 512.0);
        assert_eq!(eval_str("-2 ^ 2", &v).unwrap(), -4.0);
        assert_eq!(eval_str("7 % 3", &v).unwrap(), 1.0);
    }

    #[test]
    fn variables_and_functions() {
        let v = vars(&[("a", 12.0), ("b", 18.0)]);
        assert_eq!(eval_str("a + b", &v).unwrap(), 30.0);
        assert_eq!(eval_str("gcd(a, b)", &v).unwrap(), 6.0);
        assert_eq!(eval_str("max(a, b) - min(a, b)", &v).unwrap(), 6.0);
        assert_eq!(eval_str("sqrt(a * 3)", &v).unwrap(), 6.0);
        assert_eq!(eval_str("a × 2 ÷ 4", &v).unwrap(), 6.0);
    }

    #[test]
    fn evaluation_faults() {
        let v = vars(&[("a", 1.0)]);
        assert_eq!(eval_str("a / 0", &v), Err(ExprError::DivisionByZero));
        assert_eq!(
            eval_str("z + 1", &v),
            Err(ExprError::UnknownVariable("z".into()))
        );
        assert_eq!(
            eval_str("foo(1)", &v),
            Err(ExprError::UnknownFunction("foo".into()))
        );
        assert!(matches!(eval_str("abs(1, 2)", &v), Err(ExprError::Arity { .. })));
        assert_eq!(eval_str("(1 + 2", &v), Err(ExprError::UnexpectedEnd));
        assert!(matches!(eval_str("1 $ 2", &v), Err(ExprError::UnexpectedChar('$', 2))));
        assert_eq!(eval_str("sqrt(0 - 4)", &v), Err(ExprError::NotFinite));
    }

    #[test]
    fn nesting_is_bounded() {
        let v = Vars::new();
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(eval_str(&nested(MAX_DEPTH), &v).unwrap(), 1.0);
        assert_eq!(
            eval_str(&nested(MAX_DEPTH + 1), &v),
            Err(ExprError::TooDeep(MAX_DEPTH))
        );
        assert_eq!(
            eval_str(&"-".repeat(MAX_DEPTH + 1), &v),
            Err(ExprError::TooDeep(MAX_DEPTH))
        );
        let calls = format!("{}1{}", "abs(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(eval_str(&calls, &v), Err(ExprError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn oversized_input_is_rejected() {
        let v = Vars::new();
        let long_chain = vec!["1"; 200].join("+");
        assert!(matches!(
            eval_str(&long_chain, &v),
            Err(ExprError::TooLong { what: "expression", .. })
        ));
        let template = "x".repeat(MAX_TEMPLATE_LEN + 1);
        assert!(matches!(
            render(&template, &v),
            Err(ExprError::TooLong { what: "template", .. })
        ));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333");
        assert_eq!(format_number(2.10), "2.1");
    }

    #[test]
    fn render_placeholders_and_escapes() {
        let v = vars(&[("a", 3.0), ("b", 4.0)]);
        assert_eq!(
            render("What is {a} + {b}?", &v).unwrap(),
            "What is 3 + 4?"
        );
        assert_eq!(render("{a + b}", &v).unwrap(), "7");
        assert_eq!(
            render(r"$\frac{{{a}}}{{{b}}}$", &v).unwrap(),
            r"$\frac{3}{4}$"
        );
        assert_eq!(render("{a", &v), Err(ExprError::UnclosedPlaceholder));
    }
}

use crate::models::{slot_or_zero, Indicator};

/// Which series of the referenced indicators feeds the substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesPass {
    Goal,
    Progress,
}

/// Evaluate a formula indicator's expression for one period. `{id:N}`
/// placeholders are replaced with indicator N's value at that period before
/// the expression is parsed. Anything outside the closed arithmetic grammar,
/// and any non-finite result, yields 0 for the period.
pub fn evaluate_formula(
    expression: &str,
    period: usize,
    indicators: &[Indicator],
    pass: SeriesPass,
) -> f64 {
    let substituted = substitute(expression, period, indicators, pass);
    match Parser::new(&substituted).parse() {
        Some(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

fn substitute(
    expression: &str,
    period: usize,
    indicators: &[Indicator],
    pass: SeriesPass,
) -> String {
    let mut output = String::with_capacity(expression.len());
    let mut rest = expression;

    while let Some(open) = rest.find("{id:") {
        output.push_str(&rest[..open]);
        let tail = &rest[open + 4..];
        let Some(close) = tail.find('}') else {
            // Unterminated placeholder; the parser will reject what remains.
            output.push_str(&rest[open..]);
            return output;
        };
        let value = tail[..close]
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|id| indicators.iter().find(|ind| ind.id == id))
            .map(|ind| {
                let series = match pass {
                    SeriesPass::Goal => &ind.goals,
                    SeriesPass::Progress => &ind.progress,
                };
                slot_or_zero(series, period)
            })
            .unwrap_or(0.0);
        // Parenthesized so negative values survive surrounding operators.
        output.push_str(&format!("({})", value));
        rest = &tail[close + 1..];
    }

    output.push_str(rest);
    output
}

/// Recursive-descent parser over numbers, `+ - * /`, parentheses and unary
/// sign. Never delegates to any host evaluator; unknown input parses to None.
struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Option<f64> {
        let value = self.expr()?;
        self.skip_whitespace();
        if self.pos == self.input.len() {
            Some(value)
        } else {
            None
        }
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Some(value),
            }
        }
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    value /= self.factor()?;
                }
                _ => return Some(value),
            }
        }
    }

    fn factor(&mut self) -> Option<f64> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Some(-self.factor()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.factor()
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() == Some(b')') {
                    self.pos += 1;
                    Some(value)
                } else {
                    None
                }
            }
            _ => self.number(),
        }
    }

    fn number(&mut self) -> Option<f64> {
        self.skip_whitespace();
        let start = self.pos;
        while self
            .input
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_digit() || *b == b'.')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()?
            .parse::<f64>()
            .ok()
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.input.get(self.pos).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Indicator;

    fn indicator(id: i64, goals: Vec<Option<f64>>, progress: Vec<Option<f64>>) -> Indicator {
        let mut ind = Indicator::new(id, &format!("indicator {id}"));
        ind.goals = goals;
        ind.progress = progress;
        ind
    }

    fn eval(expr: &str) -> f64 {
        evaluate_formula(expr, 0, &[], SeriesPass::Progress)
    }

    #[test]
    fn arithmetic_with_precedence_and_parens() {
        assert_eq!(eval("2 + 3 * 4"), 14.0);
        assert_eq!(eval("(2 + 3) * 4"), 20.0);
        assert_eq!(eval("10 / 4"), 2.5);
        assert_eq!(eval("-3 + 5"), 2.0);
        assert_eq!(eval("2 * -3"), -6.0);
    }

    #[test]
    fn substitutes_per_pass_and_per_period() {
        let indicators = vec![
            indicator(1, vec![Some(100.0), Some(200.0)], vec![Some(40.0), Some(60.0)]),
            indicator(2, vec![Some(10.0), None], vec![Some(4.0), None]),
        ];
        let expr = "{id:1} + {id:2}";
        assert_eq!(evaluate_formula(expr, 0, &indicators, SeriesPass::Progress), 44.0);
        assert_eq!(evaluate_formula(expr, 0, &indicators, SeriesPass::Goal), 110.0);
        // Null slots substitute as zero.
        assert_eq!(evaluate_formula(expr, 1, &indicators, SeriesPass::Progress), 60.0);
    }

    #[test]
    fn negative_substituted_values_survive_operators() {
        let indicators = vec![indicator(7, vec![], vec![Some(-5.0)])];
        assert_eq!(
            evaluate_formula("10 - {id:7}", 0, &indicators, SeriesPass::Progress),
            15.0
        );
    }

    #[test]
    fn unknown_ids_substitute_as_zero() {
        assert_eq!(evaluate_formula("{id:99} + 3", 0, &[], SeriesPass::Progress), 3.0);
    }

    #[test]
    fn unsafe_input_evaluates_to_zero() {
        assert_eq!(eval("system('rm -rf /')"), 0.0);
        assert_eq!(eval("2 + x"), 0.0);
        assert_eq!(eval("{id:1"), 0.0);
        assert_eq!(eval(""), 0.0);
        assert_eq!(eval("(2 + 3"), 0.0);
    }

    #[test]
    fn non_finite_results_normalize_to_zero() {
        assert_eq!(eval("1 / 0"), 0.0);
        assert_eq!(eval("0 / 0"), 0.0);
    }
}

//! Condition DSL parser.
//!
//! One condition per line: `[AND|OR] <INDICATOR> <OPERATOR> <OPERAND> [<OPERAND>]`.
//! Keywords are case-insensitive. Errors carry the character column of the
//! offending token so callers can render a caret under it.

use crate::domain::condition::{
    Comparison, Condition, ConditionGroup, LogicalOperator, Operand, OrderType,
};
use crate::domain::error::{ParseError, StratsimError};
use crate::domain::indicator::{Band, IndicatorKind, MacdComponent, PriceField};

struct Parser {
    input: String,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        // ASCII uppercasing keeps byte offsets identical to the original text.
        Self {
            input: input.to_ascii_uppercase(),
            pos: 0,
        }
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// `offset` is a byte offset into the input; the error reports its
    /// character column.
    fn error(&self, message: String, offset: usize) -> StratsimError {
        let position = self
            .input
            .get(..offset)
            .map_or(offset, |prefix| prefix.chars().count());
        StratsimError::RuleParse(ParseError { message, position })
    }

    fn expect_char(&mut self, expected: char) -> Result<(), StratsimError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch), self.pos)),
            None => Err(self.error(
                format!("expected '{}', found end of input", expected),
                self.pos,
            )),
        }
    }

    fn peek_word(&self) -> &str {
        let end = self
            .remaining()
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.remaining().len());
        &self.remaining()[..end]
    }

    fn take_word(&mut self) -> String {
        let word = self.peek_word().to_string();
        self.pos += word.len();
        word
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_word() == keyword {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn parse_number(&mut self) -> Result<f64, StratsimError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error("expected number".to_string(), start));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| self.error(format!("invalid number: {}", num_str), start))
    }

    fn parse_integer(&mut self) -> Result<usize, StratsimError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }

        if self.pos == start {
            return Err(self.error("expected integer".to_string(), start));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<usize>()
            .map_err(|_| self.error(format!("invalid integer: {}", num_str), start))
    }

    fn parse_period(&mut self) -> Result<usize, StratsimError> {
        self.expect_char('(')?;
        let period = self.parse_integer()?;
        self.expect_char(')')?;
        Ok(period)
    }

    fn parse_bollinger(&mut self, band: Band) -> Result<IndicatorKind, StratsimError> {
        self.expect_char('(')?;
        let period = self.parse_integer()?;
        self.expect_char(',')?;
        self.skip_whitespace();
        let mult_pos = self.pos;
        let mult = self.parse_number()?;
        if mult < 0.0 {
            return Err(self.error(
                "band multiplier must be non-negative".to_string(),
                mult_pos,
            ));
        }
        self.expect_char(')')?;
        Ok(IndicatorKind::Bollinger {
            period,
            stddev_mult_x100: (mult * 100.0).round() as u32,
            band,
        })
    }

    fn parse_macd(&mut self, component: MacdComponent) -> Result<IndicatorKind, StratsimError> {
        self.expect_char('(')?;
        let fast = self.parse_integer()?;
        self.expect_char(',')?;
        let slow = self.parse_integer()?;
        self.expect_char(',')?;
        let signal = self.parse_integer()?;
        self.expect_char(')')?;
        Ok(IndicatorKind::Macd {
            fast,
            slow,
            signal,
            component,
        })
    }

    fn parse_indicator(&mut self) -> Result<IndicatorKind, StratsimError> {
        self.skip_whitespace();
        let start = self.pos;
        let name = self.take_word();
        if name.is_empty() {
            let found = self
                .peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string());
            return Err(self.error(format!("expected indicator, found '{}'", found), start));
        }

        let kind = match name.as_str() {
            "OPEN" => IndicatorKind::Price(PriceField::Open),
            "HIGH" => IndicatorKind::Price(PriceField::High),
            "LOW" => IndicatorKind::Price(PriceField::Low),
            "CLOSE" => IndicatorKind::Price(PriceField::Close),
            "VOLUME" => IndicatorKind::Price(PriceField::Volume),
            "SMA" => IndicatorKind::Sma(self.parse_period()?),
            "EMA" => IndicatorKind::Ema(self.parse_period()?),
            "WMA" => IndicatorKind::Wma(self.parse_period()?),
            "RSI" => IndicatorKind::Rsi(self.parse_period()?),
            "ROC" => IndicatorKind::Roc(self.parse_period()?),
            "ATR" => IndicatorKind::Atr(self.parse_period()?),
            "STDDEV" => IndicatorKind::Stddev(self.parse_period()?),
            "BB_UPPER" => self.parse_bollinger(Band::Upper)?,
            "BB_MIDDLE" => self.parse_bollinger(Band::Middle)?,
            "BB_LOWER" => self.parse_bollinger(Band::Lower)?,
            "MACD" => self.parse_macd(MacdComponent::Line)?,
            "MACD_SIGNAL" => self.parse_macd(MacdComponent::Signal)?,
            "MACD_HIST" => self.parse_macd(MacdComponent::Histogram)?,
            other => {
                return Err(StratsimError::UnknownIndicator {
                    name: other.to_string(),
                });
            }
        };

        kind.validate()?;
        Ok(kind)
    }

    fn parse_operand(&mut self) -> Result<Operand, StratsimError> {
        self.skip_whitespace();
        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '+' || ch == '.')
        {
            return Ok(Operand::Value(self.parse_number()?));
        }
        Ok(Operand::Indicator(self.parse_indicator()?))
    }

    fn parse_range(&mut self) -> Result<(f64, f64), StratsimError> {
        self.skip_whitespace();
        let start = self.pos;
        let low = self.parse_number()?;
        let high = self.parse_number()?;
        if low > high {
            return Err(self.error(
                format!("range lower bound {} exceeds upper bound {}", low, high),
                start,
            ));
        }
        Ok((low, high))
    }

    fn parse_comparison(&mut self) -> Result<Comparison, StratsimError> {
        self.skip_whitespace();
        let start = self.pos;

        if self.remaining().starts_with("==") {
            self.pos += 2;
            return Ok(Comparison::Equals(self.parse_operand()?));
        }
        if self.peek() == Some('>') {
            self.advance();
            return Ok(Comparison::GreaterThan(self.parse_operand()?));
        }
        if self.peek() == Some('<') {
            self.advance();
            return Ok(Comparison::LessThan(self.parse_operand()?));
        }

        let name = self.take_word();
        match name.as_str() {
            "GREATER_THAN" => Ok(Comparison::GreaterThan(self.parse_operand()?)),
            "LESS_THAN" => Ok(Comparison::LessThan(self.parse_operand()?)),
            "EQUALS" => Ok(Comparison::Equals(self.parse_operand()?)),
            "CROSSES_ABOVE" => Ok(Comparison::CrossesAbove(self.parse_operand()?)),
            "CROSSES_BELOW" => Ok(Comparison::CrossesBelow(self.parse_operand()?)),
            "IN_RANGE" => {
                let (low, high) = self.parse_range()?;
                Ok(Comparison::InRange { low, high })
            }
            "OUT_OF_RANGE" => {
                let (low, high) = self.parse_range()?;
                Ok(Comparison::OutOfRange { low, high })
            }
            "" => {
                let found = self
                    .peek()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "end of input".to_string());
                Err(self.error(format!("expected operator, found '{}'", found), start))
            }
            other => Err(StratsimError::UnknownOperator {
                name: other.to_string(),
            }),
        }
    }

    fn parse(&mut self, order_type: OrderType) -> Result<Condition, StratsimError> {
        self.skip_whitespace();
        if self.remaining().is_empty() {
            return Err(self.error("empty condition".to_string(), self.pos));
        }

        let logical = if self.consume_keyword("OR") {
            LogicalOperator::Or
        } else {
            self.consume_keyword("AND");
            LogicalOperator::And
        };

        let indicator = self.parse_indicator()?;
        let comparison = self.parse_comparison()?;

        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(
                format!("unexpected input after condition: '{}'", self.remaining()),
                self.pos,
            ));
        }

        Ok(Condition {
            indicator,
            comparison,
            order_type,
            logical,
        })
    }
}

/// Parse a single condition line.
pub fn parse_condition(input: &str, order_type: OrderType) -> Result<Condition, StratsimError> {
    Parser::new(input).parse(order_type)
}

/// Parse every line into one group sharing `order_type`.
pub fn parse_group<'a, I>(lines: I, order_type: OrderType) -> Result<ConditionGroup, StratsimError>
where
    I: IntoIterator<Item = &'a str>,
{
    let conditions = lines
        .into_iter()
        .map(|line| parse_condition(line, order_type))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ConditionGroup::new(conditions))
}

use std::borrow::Cow;
use std::cmp::Ordering;

use super::model::{CellValue, Column, SalaryRecord};
use crate::error::QueryError;

/// Clauses are joined with this token; there is no OR and no grouping.
pub const CONJUNCTION: &str = "&&";

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    /// Prefix match on the cell's text.  Only meaningful for fields stored as
    /// fixed-format text such as `Year`; no date parsing happens.
    DateStartsWith,
}

/// Longest tokens first so `>=` is not read as `>`.
const SYMBOLS: [(&str, Operator); 6] = [
    (">=", Operator::Ge),
    ("<=", Operator::Le),
    ("!=", Operator::Ne),
    ("=", Operator::Eq),
    ("<", Operator::Lt),
    (">", Operator::Gt),
];

/// Word operators must be followed by whitespace.
const WORDS: [(&str, Operator); 8] = [
    ("datestartswith", Operator::DateStartsWith),
    ("contains", Operator::Contains),
    ("ge", Operator::Ge),
    ("le", Operator::Le),
    ("ne", Operator::Ne),
    ("eq", Operator::Eq),
    ("lt", Operator::Lt),
    ("gt", Operator::Gt),
];

impl Operator {
    /// Split `"<op> <value>"` into the operator and the remaining text.
    fn split_prefix(text: &str) -> Option<(Operator, &str)> {
        for (token, op) in SYMBOLS {
            if let Some(rest) = text.strip_prefix(token) {
                return Some((op, rest));
            }
        }
        for (token, op) in WORDS {
            if let Some(rest) = text.strip_prefix(token) {
                if rest.starts_with(char::is_whitespace) {
                    return Some((op, rest));
                }
            }
        }
        None
    }

    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Operator::Eq => ord.is_eq(),
            Operator::Ne => ord.is_ne(),
            Operator::Lt => ord.is_lt(),
            Operator::Le => ord.is_le(),
            Operator::Gt => ord.is_gt(),
            Operator::Ge => ord.is_ge(),
            Operator::Contains | Operator::DateStartsWith => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// An unquoted token that parses as a number.  `raw` keeps the token for
    /// the text operators.
    Number { value: f64, raw: String },
    Text(String),
}

impl FilterValue {
    /// Quoted (`'`, `"` or `` ` ``) → text with the escaped quote restored;
    /// otherwise a number when it parses, raw text when it doesn't.
    pub fn parse(token: &str) -> Self {
        let mut chars = token.chars();
        if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
            if first == last && matches!(first, '"' | '\'' | '`') {
                let inner = &token[1..token.len() - 1];
                return FilterValue::Text(inner.replace(&format!("\\{first}"), &first.to_string()));
            }
        }
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => FilterValue::Number {
                value,
                raw: token.to_string(),
            },
            _ => FilterValue::Text(token.to_string()),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            FilterValue::Number { raw, .. } => raw,
            FilterValue::Text(s) => s,
        }
    }
}

fn cell_text<'a>(cell: &CellValue<'a>) -> Cow<'a, str> {
    match *cell {
        CellValue::Text(s) => Cow::Borrowed(s),
        CellValue::Number(v) => Cow::Owned(v.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Clause – `{column} operator value`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub column: Column,
    pub op: Operator,
    pub value: FilterValue,
}

impl Clause {
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let malformed = || QueryError::MalformedFilter(text.trim().to_string());

        let rest = text.trim().strip_prefix('{').ok_or_else(malformed)?;
        let close = rest.find('}').ok_or_else(malformed)?;
        let name = rest[..close].trim();
        let (op, value) = Operator::split_prefix(rest[close + 1..].trim_start()).ok_or_else(malformed)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(malformed());
        }

        Ok(Clause {
            column: name.parse()?,
            op,
            value: FilterValue::parse(value),
        })
    }

    /// The column is coerced to the value's type: numeric values compare
    /// against the cell as a number (non-numeric cells never match), text
    /// values against the cell's text form.
    pub fn matches(&self, record: &SalaryRecord) -> bool {
        let cell = record.value(self.column);
        match self.op {
            Operator::Contains => cell_text(&cell).contains(self.value.text()),
            Operator::DateStartsWith => cell_text(&cell).starts_with(self.value.text()),
            op => {
                let ord = match &self.value {
                    FilterValue::Number { value, .. } => {
                        cell.as_f64().and_then(|c| c.partial_cmp(value))
                    }
                    FilterValue::Text(t) => Some(Ord::cmp(&*cell_text(&cell), t.as_str())),
                };
                match ord {
                    Some(ord) => op.accepts(ord),
                    None => op == Operator::Ne,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FilterExpr – AND of clauses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpr {
    pub clauses: Vec<Clause>,
}

impl FilterExpr {
    /// Parse a full filter string.  Blank clauses are ignored, so `""` is the
    /// empty filter.
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let clauses = split_clauses(text)
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .map(Clause::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterExpr { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, record: &SalaryRecord) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

/// Split on [`CONJUNCTION`], leaving quoted values intact.  A quote only opens
/// after whitespace or an operator symbol, so apostrophes inside bare words
/// do not.
fn split_clauses(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    iter.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' | '`'
                    if prev.map_or(true, |p| p.is_whitespace() || "=<>".contains(p)) =>
                {
                    quote = Some(c);
                }
                '&' if matches!(iter.peek(), Some((_, '&'))) => {
                    parts.push(&text[start..i]);
                    iter.next();
                    start = i + CONJUNCTION.len();
                }
                _ => {}
            },
        }
        prev = Some(c);
    }
    parts.push(&text[start..]);
    parts
}

//! Comma-delimited text with RFC 4180 style quoting
//!
//! Shared by the match table export and the dataset loader.

use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct DelimitedError {
    pub line: usize,
    pub reason: String,
}

/// One parsed record and the line it starts on (1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Quote a field if it contains a delimiter, quote or line break
pub fn escape_field(s: &str) -> Cow<'_, str> {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

/// Append one record terminated by `\n`
pub fn write_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push('\n');
}

/// Split input into records; blank lines are skipped
pub fn parse_rows(input: &str) -> Result<Vec<Row>, DelimitedError> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut row_start = 1;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            '"' => {
                return Err(DelimitedError {
                    line,
                    reason: "unexpected quote inside unquoted field".to_string(),
                })
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                finish_row(&mut rows, &mut fields, &mut field, quoted, row_start);
                quoted = false;
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(DelimitedError {
            line: row_start,
            reason: "unterminated quoted field".to_string(),
        });
    }

    finish_row(&mut rows, &mut fields, &mut field, quoted, row_start);
    Ok(rows)
}

fn finish_row(
    rows: &mut Vec<Row>,
    fields: &mut Vec<String>,
    field: &mut String,
    quoted: bool,
    line: usize,
) {
    fields.push(std::mem::take(field));
    let blank = fields.len() == 1 && fields[0].is_empty() && !quoted;
    let fields = std::mem::take(fields);
    if !blank {
        rows.push(Row { line, fields });
    }
}

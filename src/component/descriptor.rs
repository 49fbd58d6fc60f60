use super::*;
use std::fmt::Write;

/// A single token of descriptor text.
///
/// `[`, `]` and `;` always form tokens of their own, even when glued to a number.
/// `newline_before` records whether a line break separated this token from the previous one,
/// which is how matrix literals delimit rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub newline_before: bool,
}

/// Splits descriptor text into [`Token`]s.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut newline_before = false;

    for (i, ch) in text.char_indices() {
        let is_delimiter = matches!(ch, '[' | ']' | ';');
        if is_delimiter || ch.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(Token {
                    text: &text[s..i],
                    newline_before,
                });
                newline_before = false;
            }
        }
        if is_delimiter {
            tokens.push(Token {
                text: &text[i..i + 1],
                newline_before,
            });
            newline_before = false;
        } else if ch == '\n' {
            newline_before = true;
        } else if !ch.is_whitespace() && start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: &text[s..],
            newline_before,
        });
    }
    tokens
}

/// Sequential reader over descriptor tokens.
pub struct TokenReader<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> TokenReader<'a> {
    /// Tokenizes `text` and positions the reader at the first token.
    pub fn new(text: &'a str) -> Self {
        TokenReader {
            tokens: tokenize(text),
            pos: 0,
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(|t| t.text)
    }

    /// Returns `true` once every token has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn next_token(&mut self, expected: &str) -> Result<Token<'a>, ModelError> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(*token)
            }
            None => Err(ModelError::unexpected("end of descriptor", expected)),
        }
    }

    /// Consumes the next token.
    ///
    /// # Returns
    ///
    /// - `Ok(&str)` - The token text
    /// - `Err(ModelError::ConfigError)` - If the text is exhausted; the message names `expected`
    pub fn next_word(&mut self, expected: &str) -> Result<&'a str, ModelError> {
        self.next_token(expected).map(|t| t.text)
    }

    /// Consumes the next token as a non-negative integer.
    pub fn read_usize(&mut self, what: &str) -> Result<usize, ModelError> {
        let expected = format!("an integer for {}", what);
        let found = self.next_word(&expected)?;
        parse_usize(found, what)
    }

    /// Reads a matrix literal: `[` rows `]`, rows separated by a line break or `;`.
    ///
    /// An empty literal `[ ]` gives a `0 x 0` matrix.
    ///
    /// # Returns
    ///
    /// - `Ok(Matrix)` - The parsed matrix
    /// - `Err(ModelError::ConfigError)` - If a bracket is missing, a value is not a number or
    ///   the rows have different lengths
    pub fn read_matrix(&mut self, what: &str) -> Result<Matrix, ModelError> {
        let open = self.next_word(&format!("'[' opening the {} matrix", what))?;
        if open != "[" {
            return Err(ModelError::unexpected(
                open,
                &format!("'[' opening the {} matrix", what),
            ));
        }

        let mut rows: Vec<Vec<f32>> = Vec::new();
        let mut current: Vec<f32> = Vec::new();
        loop {
            let token = self.next_token(&format!("']' closing the {} matrix", what))?;
            match token.text {
                "]" => break,
                ";" => {
                    if !current.is_empty() {
                        rows.push(std::mem::take(&mut current));
                    }
                }
                text => {
                    if token.newline_before && !current.is_empty() {
                        rows.push(std::mem::take(&mut current));
                    }
                    current.push(parse_f32(text, what)?);
                }
            }
        }
        if !current.is_empty() {
            rows.push(current);
        }

        let num_cols = rows.first().map_or(0, |r| r.len());
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != num_cols) {
            return Err(ModelError::ConfigError(format!(
                "row {} of the {} matrix has {} values, expected {}",
                i,
                what,
                row.len(),
                num_cols
            )));
        }
        let num_rows = rows.len();
        let data: Vec<f32> = rows.into_iter().flatten().collect();
        Matrix::from_shape_vec((num_rows, num_cols), data)
            .map_err(|e| ModelError::ConfigError(format!("{} matrix: {}", what, e)))
    }

    /// Reads a vector literal: `[ v v ... ]`.
    pub fn read_vector(&mut self, what: &str) -> Result<Vector, ModelError> {
        let expected_open = format!("'[' opening the {} vector", what);
        let open = self.next_word(&expected_open)?;
        if open != "[" {
            return Err(ModelError::unexpected(open, &expected_open));
        }
        let mut values = Vec::new();
        loop {
            let text = self.next_word(&format!("']' closing the {} vector", what))?;
            match text {
                "]" => break,
                ";" => return Err(ModelError::unexpected(";", &format!("a value of {}", what))),
                _ => values.push(parse_f32(text, what)?),
            }
        }
        Ok(Vector::from(values))
    }
}

/// Parses a non-negative integer option value.
pub fn parse_usize(text: &str, what: &str) -> Result<usize, ModelError> {
    text.parse::<usize>()
        .map_err(|_| ModelError::unexpected(text, &format!("a non-negative integer for {}", what)))
}

/// Parses a floating-point value.
pub fn parse_f32(text: &str, what: &str) -> Result<f32, ModelError> {
    text.parse::<f32>()
        .map_err(|_| ModelError::unexpected(text, &format!("a number for {}", what)))
}

/// Writes a matrix literal, one row per line.
///
/// Values use the shortest representation that parses back to the same `f32`.
pub fn write_matrix(out: &mut String, matrix: &Matrix) {
    out.push_str(" [");
    for row in matrix.rows() {
        out.push_str("\n ");
        for v in row.iter() {
            let _ = write!(out, " {}", v);
        }
    }
    out.push_str(" ]");
}

/// Writes a vector literal on one line.
pub fn write_vector(out: &mut String, vector: &Vector) {
    out.push_str(" [");
    for v in vector.iter() {
        let _ = write!(out, " {}", v);
    }
    out.push_str(" ]");
}

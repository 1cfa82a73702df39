//! CFI Parser
//!
//! Parses EPUB CFI strings into structured [`Cfi`] values.
//!
//! Grammar (subset produced by reflowable renderers):
//! ```text
//! cfi       = "epubcfi(" path ["," path "," path] ")"
//! path      = step* [offset]
//! step      = "/" number [assertion] | "!" [assertion]
//! assertion = "[" text ["," text] (";" key "=" value)* "]"
//! offset    = ":" number [assertion]
//! ```

use super::types::*;
use thiserror::Error;

/// CFI parsing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CfiParseError {
    #[error("Empty CFI string")]
    Empty,

    #[error("CFI must start with 'epubcfi('")]
    MissingPrefix,

    #[error("CFI must end with ')'")]
    MissingClosingParen,

    #[error("Expected '/' or '!' at position {0}")]
    ExpectedStep(usize),

    #[error("Expected number at position {0}")]
    ExpectedNumber(usize),

    #[error("Unclosed bracket at position {0}")]
    UnclosedBracket(usize),

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("CFI has no steps")]
    NoSteps,
}

/// Parser state
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

/// Bracket content split on unescaped separators
struct RawAssertion {
    /// Comma-separated parts before the first `;`
    parts: Vec<String>,
    /// `key=value` parameters after `;`
    parameters: Vec<(String, String)>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), CfiParseError> {
        if self.skip_if(expected) {
            Ok(())
        } else {
            Err(CfiParseError::UnexpectedChar(
                self.peek().unwrap_or('\0'),
                self.pos,
            ))
        }
    }

    fn skip_str(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Parse a sequence of digits as u32
    fn parse_number(&mut self) -> Result<u32, CfiParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(CfiParseError::ExpectedNumber(start));
        }

        self.input[start..self.pos]
            .parse()
            .map_err(|_| CfiParseError::ExpectedNumber(start))
    }

    /// Parse bracket content up to the closing `]`, honouring `^` escapes.
    /// Separators are only recognised when unescaped.
    fn parse_bracket_content(&mut self) -> Result<RawAssertion, CfiParseError> {
        let start = self.pos;
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut in_params = false;
        let mut escaped = false;

        while let Some(ch) = self.peek() {
            if escaped {
                current.push(ch);
                escaped = false;
            } else if ch == '^' {
                escaped = true;
            } else if ch == ']' {
                let parameters = if in_params {
                    parse_parameters(&current)
                } else {
                    parts.push(current);
                    Vec::new()
                };
                return Ok(RawAssertion { parts, parameters });
            } else if ch == '[' {
                return Err(CfiParseError::UnexpectedChar('[', self.pos));
            } else if ch == ';' && !in_params {
                parts.push(std::mem::take(&mut current));
                in_params = true;
            } else if ch == ',' && !in_params {
                parts.push(std::mem::take(&mut current));
            } else {
                current.push(ch);
            }
            self.advance();
        }

        Err(CfiParseError::UnclosedBracket(start))
    }

    /// Parse an ID assertion [id] or text assertion [prefix,suffix;k=v]
    fn parse_assertion(
        &mut self,
    ) -> Result<(Option<String>, Option<TextAssertion>), CfiParseError> {
        if !self.skip_if('[') {
            return Ok((None, None));
        }

        let raw = self.parse_bracket_content()?;
        self.expect(']')?;

        let non_empty = |s: &String| if s.is_empty() { None } else { Some(s.clone()) };

        if raw.parts.len() == 1 && raw.parameters.is_empty() {
            return Ok((non_empty(&raw.parts[0]), None));
        }

        if raw.parts.len() == 1 {
            // [id;s=b] or [;s=b]
            let assertion = TextAssertion {
                prefix: None,
                suffix: None,
                parameters: raw.parameters,
            };
            return Ok((non_empty(&raw.parts[0]), Some(assertion)));
        }

        Ok((
            None,
            Some(TextAssertion {
                prefix: non_empty(&raw.parts[0]),
                suffix: raw.parts.get(1).and_then(non_empty),
                parameters: raw.parameters,
            }),
        ))
    }

    /// Parse a single step (/ or !)
    fn parse_step(&mut self) -> Result<CfiStep, CfiParseError> {
        let step_type = if self.skip_if('/') {
            StepType::Element(self.parse_number()?)
        } else if self.skip_if('!') {
            StepType::Indirection
        } else {
            return Err(CfiParseError::ExpectedStep(self.pos));
        };

        let (id_assertion, text_assertion) = self.parse_assertion()?;
        Ok(CfiStep {
            step_type,
            id_assertion,
            text_assertion,
        })
    }

    /// Parse a path (sequence of steps with optional offset)
    fn parse_path(&mut self) -> Result<CfiPath, CfiParseError> {
        let mut steps = Vec::new();
        while self.peek() == Some('/') || self.peek() == Some('!') {
            steps.push(self.parse_step()?);
        }

        let mut path = CfiPath::with_steps(steps);

        if self.skip_if(':') {
            let offset = self.parse_number()?;
            let (_, assertion) = self.parse_assertion()?;
            path.character_offset = Some(CharacterOffset { offset, assertion });
        }

        Ok(path)
    }

    /// Parse a complete CFI
    fn parse_cfi(&mut self) -> Result<Cfi, CfiParseError> {
        if !self.skip_str("epubcfi(") {
            return Err(CfiParseError::MissingPrefix);
        }

        let path = self.parse_path()?;

        let range = if self.skip_if(',') {
            let start = self.parse_path()?;
            self.expect(',')?;
            let end = self.parse_path()?;
            Some(CfiRange { start, end })
        } else {
            None
        };

        if !self.skip_if(')') {
            return Err(CfiParseError::MissingClosingParen);
        }

        if path.steps.is_empty() {
            return Err(CfiParseError::NoSteps);
        }

        Ok(Cfi { path, range })
    }
}

/// Parse parameters from a string like "key1=value1;key2=value2"
fn parse_parameters(s: &str) -> Vec<(String, String)> {
    s.split(';')
        .filter_map(|part| {
            let mut kv = part.splitn(2, '=');
            let key = kv.next()?.trim();
            let value = kv.next()?.trim();
            if key.is_empty() {
                None
            } else {
                Some((key.to_string(), value.to_string()))
            }
        })
        .collect()
}

/// Parse a CFI string into a [`Cfi`]
pub fn parse(input: &str) -> Result<Cfi, CfiParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CfiParseError::Empty);
    }

    let mut parser = Parser::new(input);
    let cfi = parser.parse_cfi()?;

    if !parser.at_end() {
        return Err(CfiParseError::UnexpectedChar(
            parser.peek().unwrap_or('\0'),
            parser.pos,
        ));
    }

    Ok(cfi)
}

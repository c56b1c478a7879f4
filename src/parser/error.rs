use super::span::Where;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Unexpected token encountered
    UnexpectedToken { expected: String, found: String, pos: Where },

    /// Unexpected end of input
    UnexpectedEndOfInput { expected: String, pos: Where },

    /// Invalid syntax
    InvalidSyntax { message: String, pos: Where },
}

impl ParseError {
    pub fn unexpected_token(expected: &str, found: &str, pos: Where) -> Self {
        ParseError::UnexpectedToken { expected: expected.to_string(), found: found.to_string(), pos }
    }

    pub fn unexpected_end_of_input(expected: &str, pos: Where) -> Self {
        ParseError::UnexpectedEndOfInput { expected: expected.to_string(), pos }
    }

    pub fn invalid_syntax(message: impl Into<String>, pos: Where) -> Self {
        ParseError::InvalidSyntax { message: message.into(), pos }
    }

    pub fn pos(&self) -> Where {
        match self {
            ParseError::UnexpectedToken { pos, .. }
            | ParseError::UnexpectedEndOfInput { pos, .. }
            | ParseError::InvalidSyntax { pos, .. } => *pos,
        }
    }

    /// Diagnostic text, in the compiler's message style
    pub fn message(&self) -> String {
        match self {
            ParseError::UnexpectedToken { expected, .. } => format!("{} expected.", expected),
            ParseError::UnexpectedEndOfInput { expected, .. } => {
                format!("'{}' expected; reached end of file while parsing.", expected)
            }
            ParseError::InvalidSyntax { message, .. } => message.clone(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { expected, found, pos } => {
                write!(f, "parse error at line {}: expected {}, found {}", pos.line(), expected, found)
            }
            ParseError::UnexpectedEndOfInput { expected, pos } => {
                write!(f, "parse error at line {}: unexpected end of input, expected {}", pos.line(), expected)
            }
            ParseError::InvalidSyntax { message, pos } => {
                write!(f, "parse error at line {}: {}", pos.line(), message)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_position() {
        let err = ParseError::unexpected_token("';'", "}", Where::new(3, 40));
        assert_eq!(err.pos().line(), 3);
        assert_eq!(err.message(), "';' expected.");
        assert!(err.to_string().contains("line 3"));
    }
}

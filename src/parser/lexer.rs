use super::span::Location;
use logos::Logos;

/// Java tokens
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Token {
    // Keywords
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("static")]
    Static,
    #[token("public")]
    Public,
    #[token("protected")]
    Protected,
    #[token("private")]
    Private,
    #[token("abstract")]
    Abstract,
    #[token("final")]
    Final,
    #[token("native")]
    Native,
    #[token("synchronized")]
    Synchronized,
    #[token("transient")]
    Transient,
    #[token("volatile")]
    Volatile,
    #[token("strictfp")]
    Strictfp,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("extends")]
    Extends,
    #[token("implements")]
    Implements,
    #[token("new")]
    New,
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("instanceof")]
    InstanceOf,
    #[token("void")]
    Void,
    #[token("boolean")]
    Boolean,
    #[token("byte")]
    Byte,
    #[token("short")]
    Short,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("char")]
    Char,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("throw")]
    Throw,
    #[token("throws")]
    Throws,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Operators
    #[token("=")]
    Assign,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    ModAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    LShiftAssign,
    #[token(">>=")]
    RShiftAssign,
    #[token(">>>=")]
    URShiftAssign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token(">>>")]
    URShift,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    PipePipe,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    // Separators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    // Literals
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StringLiteral,
    #[regex(r"'([^'\\\n]|\\u[0-9a-fA-F]{4}|\\[0-7]{1,3}|\\.)'")]
    CharLiteral,
    #[regex(r"0[xX][0-9a-fA-F]+[lL]?")]
    HexInteger,
    /// Decimal and octal, told apart by the leading zero
    #[regex(r"[0-9]+[lL]?")]
    IntegerLiteral,
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fFdD]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fFdD]?")]
    #[regex(r"[0-9]+[fFdD]")]
    FloatLiteral,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,

    // Comments and whitespace
    #[regex(r"//[^\n]*")]
    LineComment,
    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/", priority = 2)]
    BlockComment,
    #[regex(r"[ \t\n\r\x0c]+", priority = 2)]
    Whitespace,
    #[token("\u{FEFF}")]
    Bom,
    /// Old-style end-of-file marker
    #[token("\u{1a}")]
    Eof,
}

impl Token {
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Token::Public
                | Token::Protected
                | Token::Private
                | Token::Abstract
                | Token::Final
                | Token::Native
                | Token::Synchronized
                | Token::Transient
                | Token::Volatile
                | Token::Static
                | Token::Strictfp
        )
    }

    /// Primitive type keywords, `void` included
    pub fn is_primitive_type(&self) -> bool {
        matches!(
            self,
            Token::Boolean
                | Token::Byte
                | Token::Short
                | Token::Int
                | Token::Long
                | Token::Char
                | Token::Float
                | Token::Double
                | Token::Void
        )
    }

    fn is_trivia(&self) -> bool {
        matches!(self, Token::Whitespace | Token::Bom | Token::LineComment | Token::BlockComment | Token::Eof)
    }
}

/// Lexical token with location information
#[derive(Debug, Clone)]
pub struct LexicalToken {
    pub token: Token,
    pub lexeme: String,
    pub location: Location,
    /// Documentation comment immediately preceding this token
    pub doc: Option<String>,
}

impl LexicalToken {
    pub fn is(&self, token: Token) -> bool {
        self.token == token
    }
}

/// A lexical error: the location of the first character no token matches
#[derive(Debug, Clone)]
pub struct LexError {
    pub location: Location,
    pub text: String,
}

pub struct Lexer<'a> {
    lexer: logos::Lexer<'a, Token>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { lexer: Token::lexer(source), line: 1, column: 1 }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column, self.lexer.span().start)
    }

    fn update_position(&mut self, lexeme: &str) {
        let mut chars = lexeme.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\n' => {
                    self.line += 1;
                    self.column = 1;
                }
                '\r' => {
                    if chars.peek() != Some(&'\n') {
                        self.line += 1;
                        self.column = 1;
                    }
                }
                _ => self.column += 1,
            }
        }
    }

    /// Tokenize the whole input, dropping trivia. Lexical errors are
    /// collected and the offending character skipped.
    pub fn tokenize(mut self) -> (Vec<LexicalToken>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut doc: Option<String> = None;
        while let Some(result) = self.lexer.next() {
            let location = self.location();
            let lexeme = self.lexer.slice().to_string();
            self.update_position(&lexeme);
            match result {
                Ok(Token::BlockComment) => {
                    if lexeme.starts_with("/**") && lexeme != "/**/" {
                        doc = Some(lexeme);
                    }
                }
                Ok(token) if token.is_trivia() => {}
                Ok(token) => {
                    tokens.push(LexicalToken { token, lexeme, location, doc: doc.take() });
                }
                Err(()) => {
                    let text = if lexeme.starts_with("/*") {
                        "unterminated comment".to_string()
                    } else if lexeme.starts_with('"') {
                        "String not terminated at end of line".to_string()
                    } else {
                        format!("Invalid character in input: {}", lexeme)
                    };
                    errors.push(LexError { location, text });
                }
            }
        }
        (tokens, errors)
    }
}

/// Text of a documentation comment without the comment markers
pub fn doc_text(comment: &str) -> String {
    let body = comment.trim_start_matches("/**").trim_end_matches("*/");
    body.lines()
        .map(|line| line.trim_start().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a documentation comment carries the `@deprecated` tag
pub fn is_deprecated_doc(doc: &str) -> bool {
    let body = doc.strip_prefix("/**").unwrap_or(doc);
    let body = body.strip_suffix("*/").unwrap_or(body);
    body.lines().any(|line| line.trim_start().trim_start_matches('*').trim_start().starts_with("@deprecated"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        let (tokens, errors) = Lexer::new(source).tokenize();
        assert!(errors.is_empty(), "{:?}", errors);
        tokens.into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("public class Test extends Object implements I"),
            vec![
                Token::Public,
                Token::Class,
                Token::Identifier,
                Token::Extends,
                Token::Identifier,
                Token::Implements,
                Token::Identifier
            ]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            kinds(r#"42 017 0x1fL 3L 1.5 2e3 .5f 7d "hi\n" 'a' 'A' true null"#),
            vec![
                Token::IntegerLiteral,
                Token::IntegerLiteral,
                Token::HexInteger,
                Token::IntegerLiteral,
                Token::FloatLiteral,
                Token::FloatLiteral,
                Token::FloatLiteral,
                Token::FloatLiteral,
                Token::StringLiteral,
                Token::CharLiteral,
                Token::CharLiteral,
                Token::True,
                Token::Null
            ]
        );
    }

    #[test]
    fn doc_comments_attach_to_next_token() {
        let (tokens, _) = Lexer::new("/** Old.\n * @deprecated use B */ class A {}").tokenize();
        let doc = tokens[0].doc.clone().unwrap();
        assert!(is_deprecated_doc(&doc));
        assert!(tokens[1].doc.is_none());
        assert_eq!(doc_text(&doc), "Old.\n@deprecated use B");
    }

    #[test]
    fn deprecated_tag_on_a_single_line_comment() {
        assert!(is_deprecated_doc("/** @deprecated */"));
        assert!(is_deprecated_doc("/**@deprecated use B*/"));
        assert!(!is_deprecated_doc("/** see @deprecated elsewhere */"));
        assert!(!is_deprecated_doc("/** Fine. */"));
    }

    #[test]
    fn positions_track_lines_and_offsets() {
        let (tokens, _) = Lexer::new("class A\n{\r\n}").tokenize();
        assert_eq!(tokens[2].location.line, 2);
        assert_eq!(tokens[2].location.offset, 8);
        assert_eq!(tokens[3].location.line, 3);
        assert_eq!(tokens[3].location.column, 1);
    }

    #[test]
    fn bad_characters_are_reported_and_skipped() {
        let (tokens, errors) = Lexer::new("class # A").tokenize();
        assert_eq!(errors.len(), 1);
        assert_eq!(tokens.len(), 2);
    }
}

//! Java source parser
//!
//! The lexer is a logos token enum; the parser is recursive descent. Class
//! and member structure is not returned as a tree: the parser reports it
//! through [`ParserActions`] in file order, and the actions object builds
//! whatever skeleton it needs. Member bodies are handed over as `ast` trees.

pub mod error;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod span;

pub use error::{ParseError, ParseResult};
pub use lexer::{Lexer, LexicalToken, Token};
pub use parser::Parser;
pub use span::{Location, Where};

use crate::ast::{Block, Expr, TypeExpr, TypeName};
use crate::symtab::{ClassId, Param};

/// Everything known about a class at its opening brace
#[derive(Debug, Clone)]
pub struct ClassHeader {
    pub pos: Where,
    pub doc: Option<String>,
    pub modifiers: u32,
    /// Simple name; empty for anonymous classes
    pub name: String,
    pub super_name: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    /// Local or anonymous class appearing in a static member
    pub in_static_context: bool,
}

/// A member declaration as written
#[derive(Debug, Clone)]
pub enum MemberDecl {
    Field { type_expr: TypeExpr, name: String, init: Option<Expr> },
    /// Constructors arrive as methods named `<init>` whose return type is
    /// the identifier written before the parameter list.
    Method { ret: TypeExpr, name: String, params: Vec<Param>, throws: Vec<TypeName>, body: Option<Block> },
    Initializer { body: Block },
}

/// Structural callbacks, invoked in file order
pub trait ParserActions {
    fn package_declaration(&mut self, pos: Where, name: &str);
    fn import_class(&mut self, pos: Where, name: &str);
    fn import_package(&mut self, pos: Where, name: &str);
    fn begin_class(&mut self, header: ClassHeader) -> ClassId;
    fn define_field(&mut self, pos: Where, doc: Option<String>, modifiers: u32, member: MemberDecl);
    fn end_class(&mut self, pos: Where, class: ClassId);
    fn error(&mut self, pos: Where, message: &str);
}

/// Parse one compilation unit, reporting structure to `actions`
pub fn parse_file(source: &str, actions: &mut dyn ParserActions) {
    Parser::new(source, actions).parse_compilation_unit();
}

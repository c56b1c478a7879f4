//! Recursive descent parser for Java compilation units
//!
//! Syntax errors are reported through [`ParserActions::error`] and the
//! parser resynchronizes at the next member or statement boundary, so one
//! malformed member does not hide the rest of the file.

use super::error::{ParseError, ParseResult};
use super::lexer::{doc_text, is_deprecated_doc, Lexer, LexicalToken, Token};
use super::span::Where;
use super::{ClassHeader, MemberDecl, ParserActions};
use crate::ast::*;
use crate::common::consts::*;
use crate::symtab::{ClassId, Param, Type};

pub struct Parser<'a> {
    tokens: Vec<LexicalToken>,
    current: usize,
    actions: &'a mut dyn ParserActions,
    end_pos: Where,
    /// Whether the member whose body is being parsed is static
    static_context: Vec<bool>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &str, actions: &'a mut dyn ParserActions) -> Self {
        let (tokens, errors) = Lexer::new(source).tokenize();
        for err in errors {
            actions.error(err.location.to_where(), &err.text);
        }
        let lines = source.matches('\n').count() as u32 + 1;
        let end_pos = Where::new(lines, source.len() as u32);
        Self { tokens, current: 0, actions, end_pos, static_context: Vec::new() }
    }

    /// Parse package, imports and type declarations
    pub fn parse_compilation_unit(&mut self) {
        if self.check(Token::Package) {
            let pos = self.pos();
            self.advance();
            match self.qualified_name().and_then(|(name, _)| self.expect(Token::Semicolon, "';'").map(|_| name)) {
                Ok(name) => self.actions.package_declaration(pos, &name),
                Err(e) => {
                    self.report(e);
                    self.skip_past(Token::Semicolon);
                }
            }
        }
        while self.check(Token::Import) {
            if let Err(e) = self.parse_import() {
                self.report(e);
                self.skip_past(Token::Semicolon);
            }
        }
        while !self.is_at_end() {
            if self.match_token(Token::Semicolon) {
                continue;
            }
            if self.check(Token::Import) || self.check(Token::Package) {
                let pos = self.pos();
                self.actions.error(pos, "Class or interface declaration expected.");
                self.skip_past(Token::Semicolon);
                continue;
            }
            let start = self.current;
            if let Err(e) = self.parse_type_declaration() {
                self.report(e);
                if self.current == start {
                    self.advance();
                }
                self.skip_to_top_level();
            }
        }
    }

    fn parse_import(&mut self) -> ParseResult<()> {
        let pos = self.pos();
        self.expect(Token::Import, "'import'")?;
        let (first, _) = self.identifier()?;
        let mut name = first;
        loop {
            if !self.match_token(Token::Dot) {
                break;
            }
            if self.match_token(Token::Star) {
                self.expect(Token::Semicolon, "';'")?;
                self.actions.import_package(pos, &name);
                return Ok(());
            }
            let (part, _) = self.identifier()?;
            name.push('.');
            name.push_str(&part);
        }
        self.expect(Token::Semicolon, "';'")?;
        if !name.contains('.') {
            return Err(ParseError::invalid_syntax("'.' expected.", pos));
        }
        self.actions.import_class(pos, &name);
        Ok(())
    }

    fn parse_type_declaration(&mut self) -> ParseResult<()> {
        let (modifiers, doc) = self.parse_modifiers();
        if self.check(Token::Class) || self.check(Token::Interface) {
            self.parse_class(modifiers, doc)?;
            Ok(())
        } else {
            Err(ParseError::unexpected_token("Class or interface declaration", &self.found(), self.pos()))
        }
    }

    /// Modifiers, plus the documentation comment in front of the declaration
    fn parse_modifiers(&mut self) -> (u32, Option<String>) {
        let raw_doc = self.peek().and_then(|t| t.doc.clone());
        let mut modifiers = 0;
        while let Some(token) = self.peek_token() {
            let bit = match token {
                Token::Public => M_PUBLIC,
                Token::Private => M_PRIVATE,
                Token::Protected => M_PROTECTED,
                Token::Static => M_STATIC,
                Token::Final => M_FINAL,
                Token::Abstract => M_ABSTRACT,
                Token::Native => M_NATIVE,
                Token::Synchronized => M_SYNCHRONIZED,
                Token::Transient => M_TRANSIENT,
                Token::Volatile => M_VOLATILE,
                Token::Strictfp => M_STRICTFP,
                _ => break,
            };
            // `static {` is an initializer, not a modifier
            if token == Token::Static && self.peek_at(1) == Some(Token::LBrace) {
                break;
            }
            if modifiers & bit != 0 {
                let pos = self.pos();
                self.actions.error(pos, "Repeated modifier.");
            }
            modifiers |= bit;
            self.advance();
        }
        let doc = raw_doc.map(|raw| {
            if is_deprecated_doc(&raw) {
                modifiers |= M_DEPRECATED;
            }
            doc_text(&raw)
        });
        (modifiers, doc)
    }

    fn parse_class(&mut self, mut modifiers: u32, doc: Option<String>) -> ParseResult<ClassId> {
        let is_interface = self.check(Token::Interface);
        self.advance();
        let (name, pos) = self.identifier()?;
        let mut super_name = None;
        let mut interfaces = Vec::new();
        if is_interface {
            modifiers |= M_INTERFACE;
            if self.match_token(Token::Extends) {
                interfaces = self.type_name_list()?;
            }
        } else {
            if self.match_token(Token::Extends) {
                super_name = Some(self.type_name()?);
            }
            if self.match_token(Token::Implements) {
                interfaces = self.type_name_list()?;
            }
        }
        let header = ClassHeader {
            pos,
            doc,
            modifiers,
            name,
            super_name,
            interfaces,
            in_static_context: self.in_static_context(),
        };
        let id = self.actions.begin_class(header);
        self.parse_class_body(id);
        Ok(id)
    }

    /// Parse `{ members }` and close the class, whatever happens inside
    fn parse_class_body(&mut self, id: ClassId) {
        if let Err(e) = self.expect(Token::LBrace, "'{'") {
            self.report(e);
            let pos = self.pos();
            self.actions.end_class(pos, id);
            return;
        }
        while !self.is_at_end() && !self.check(Token::RBrace) {
            let start = self.current;
            if let Err(e) = self.parse_member() {
                self.report(e);
                if self.current == start {
                    self.advance();
                }
                self.skip_member();
            }
        }
        let end = self.pos();
        if let Err(e) = self.expect(Token::RBrace, "'}'") {
            self.report(e);
        }
        self.actions.end_class(end, id);
    }

    fn parse_member(&mut self) -> ParseResult<()> {
        if self.match_token(Token::Semicolon) {
            return Ok(());
        }
        if self.check(Token::LBrace) {
            let pos = self.pos();
            let doc = self.peek().and_then(|t| t.doc.as_deref().map(doc_text));
            let body = self.with_static_context(false, |p| p.parse_block())?;
            self.actions.define_field(pos, doc, 0, MemberDecl::Initializer { body });
            return Ok(());
        }
        if self.check(Token::Static) && self.peek_at(1) == Some(Token::LBrace) {
            let pos = self.pos();
            self.advance();
            let body = self.with_static_context(true, |p| p.parse_block())?;
            self.actions.define_field(pos, None, M_STATIC, MemberDecl::Initializer { body });
            return Ok(());
        }

        let (modifiers, doc) = self.parse_modifiers();
        if self.check(Token::Class) || self.check(Token::Interface) {
            self.parse_class(modifiers, doc)?;
            return Ok(());
        }
        let is_static = modifiers & M_STATIC != 0;

        // Constructor-looking declaration: `Name (`
        if self.check(Token::Identifier) && self.peek_at(1) == Some(Token::LParen) {
            let (ident, pos) = self.identifier()?;
            let ret = TypeExpr::Named(TypeName::new(ident, pos));
            let (params, throws, body) = self.parse_method_rest(is_static, &mut TypeExpr::Primitive(Type::Void, pos))?;
            self.actions.define_field(
                pos,
                doc,
                modifiers,
                MemberDecl::Method { ret, name: INIT_NAME.to_string(), params, throws, body },
            );
            return Ok(());
        }

        let mut ty = self.parse_type()?;
        let (name, pos) = self.identifier()?;
        if self.check(Token::LParen) {
            let (params, throws, body) = self.parse_method_rest(is_static, &mut ty)?;
            self.actions.define_field(pos, doc, modifiers, MemberDecl::Method { ret: ty, name, params, throws, body });
            return Ok(());
        }

        let mut name = name;
        let mut pos = pos;
        loop {
            let dims = self.parse_dims();
            let init = if self.match_token(Token::Assign) {
                if self.check(Token::LBrace) {
                    return Err(ParseError::invalid_syntax("Array initializers are not supported.", self.pos()));
                }
                Some(self.with_static_context(is_static, |p| p.parse_expr())?)
            } else {
                None
            };
            let type_expr = ty.clone().array_of(dims);
            self.actions.define_field(pos, doc.clone(), modifiers, MemberDecl::Field { type_expr, name, init });
            if self.match_token(Token::Comma) {
                let (next, next_pos) = self.identifier()?;
                name = next;
                pos = next_pos;
                continue;
            }
            self.expect(Token::Semicolon, "';'")?;
            return Ok(());
        }
    }

    /// Parameters, trailing dimensions, `throws` and the body
    fn parse_method_rest(
        &mut self,
        is_static: bool,
        ret: &mut TypeExpr,
    ) -> ParseResult<(Vec<Param>, Vec<TypeName>, Option<Block>)> {
        let params = self.parse_params()?;
        let dims = self.parse_dims();
        if dims > 0 {
            *ret = ret.clone().array_of(dims);
        }
        let throws = if self.match_token(Token::Throws) { self.type_name_list()? } else { Vec::new() };
        let body = if self.check(Token::LBrace) {
            Some(self.with_static_context(is_static, |p| p.parse_block())?)
        } else {
            self.expect(Token::Semicolon, "'{' or ';'")?;
            None
        };
        Ok((params, throws, body))
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(Token::LParen, "'('")?;
        let mut params = Vec::new();
        if self.match_token(Token::RParen) {
            return Ok(params);
        }
        loop {
            let is_final = self.match_token(Token::Final);
            let ty = self.parse_type()?;
            let (name, pos) = self.identifier()?;
            let dims = self.parse_dims();
            params.push(Param::new(name, ty.array_of(dims), pos, is_final));
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;
        Ok(params)
    }

    // Types

    fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let pos = self.pos();
        let base = match self.peek_token().and_then(primitive_type) {
            Some(ty) => {
                self.advance();
                TypeExpr::Primitive(ty, pos)
            }
            None => TypeExpr::Named(self.type_name()?),
        };
        let dims = self.parse_dims();
        Ok(base.array_of(dims))
    }

    /// Count `[]` pairs
    fn parse_dims(&mut self) -> usize {
        let mut dims = 0;
        while self.check(Token::LBracket) && self.peek_at(1) == Some(Token::RBracket) {
            self.advance();
            self.advance();
            dims += 1;
        }
        dims
    }

    fn type_name(&mut self) -> ParseResult<TypeName> {
        let (name, pos) = self.qualified_name()?;
        Ok(TypeName::new(name, pos))
    }

    fn type_name_list(&mut self) -> ParseResult<Vec<TypeName>> {
        let mut names = vec![self.type_name()?];
        while self.match_token(Token::Comma) {
            names.push(self.type_name()?);
        }
        Ok(names)
    }

    fn qualified_name(&mut self) -> ParseResult<(String, Where)> {
        let (mut name, pos) = self.identifier()?;
        while self.check(Token::Dot) && self.peek_at(1) == Some(Token::Identifier) {
            self.advance();
            let (part, _) = self.identifier()?;
            name.push('.');
            name.push_str(&part);
        }
        Ok((name, pos))
    }

    // Statements

    fn parse_block(&mut self) -> ParseResult<Block> {
        let pos = self.pos();
        self.expect(Token::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.is_at_end() && !self.check(Token::RBrace) {
            let start = self.current;
            match self.parse_block_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    self.report(e);
                    if self.current == start {
                        self.advance();
                    }
                    self.skip_statement();
                }
            }
        }
        let end = self.pos();
        self.expect(Token::RBrace, "'}'")?;
        Ok(Block::new(stmts, pos, end))
    }

    fn parse_block_statement(&mut self) -> ParseResult<Stmt> {
        let pos = self.pos();
        match self.peek_token() {
            Some(Token::Class) | Some(Token::Interface) | Some(Token::Abstract) => self.parse_local_class(pos),
            Some(Token::Final) => {
                let mut i = 0;
                while matches!(self.peek_at(i), Some(Token::Final) | Some(Token::Abstract)) {
                    i += 1;
                }
                if self.peek_at(i) == Some(Token::Class) {
                    return self.parse_local_class(pos);
                }
                self.advance();
                let stmt = self.parse_local_var(M_FINAL, pos)?;
                self.expect(Token::Semicolon, "';'")?;
                Ok(stmt)
            }
            Some(t) if t.is_primitive_type() && t != Token::Void => {
                if self.peek_at(1) == Some(Token::Dot) {
                    return self.parse_statement();
                }
                let stmt = self.parse_local_var(0, pos)?;
                self.expect(Token::Semicolon, "';'")?;
                Ok(stmt)
            }
            Some(Token::Identifier) if self.looks_like_local_decl() => {
                let stmt = self.parse_local_var(0, pos)?;
                self.expect(Token::Semicolon, "';'")?;
                Ok(stmt)
            }
            _ => self.parse_statement(),
        }
    }

    fn parse_local_class(&mut self, pos: Where) -> ParseResult<Stmt> {
        let (modifiers, doc) = self.parse_modifiers();
        if self.check(Token::Interface) {
            return Err(ParseError::invalid_syntax("Interface declarations are not allowed here.", pos));
        }
        if !self.check(Token::Class) {
            return Err(ParseError::unexpected_token("'class'", &self.found(), self.pos()));
        }
        let id = self.parse_class(modifiers | M_LOCAL, doc)?;
        Ok(Stmt::new(StmtKind::LocalClass(id), pos))
    }

    /// `Name(.Name)*([])* Identifier` starts a declaration
    fn looks_like_local_decl(&self) -> bool {
        let mut i = 0;
        if self.peek_at(i) != Some(Token::Identifier) {
            return false;
        }
        i += 1;
        while self.peek_at(i) == Some(Token::Dot) && self.peek_at(i + 1) == Some(Token::Identifier) {
            i += 2;
        }
        while self.peek_at(i) == Some(Token::LBracket) && self.peek_at(i + 1) == Some(Token::RBracket) {
            i += 2;
        }
        self.peek_at(i) == Some(Token::Identifier)
    }

    fn parse_local_var(&mut self, modifiers: u32, pos: Where) -> ParseResult<Stmt> {
        let type_expr = self.parse_type()?;
        let mut vars = Vec::new();
        loop {
            let (name, var_pos) = self.identifier()?;
            let dims = self.parse_dims();
            let init = if self.match_token(Token::Assign) {
                if self.check(Token::LBrace) {
                    return Err(ParseError::invalid_syntax("Array initializers are not supported.", self.pos()));
                }
                Some(self.parse_expr()?)
            } else {
                None
            };
            vars.push(VarDecl { name, pos: var_pos, dims, init, local: None });
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        Ok(Stmt::new(StmtKind::LocalVar { modifiers, type_expr, vars }, pos))
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let pos = self.pos();
        let Some(token) = self.peek_token() else {
            return Err(ParseError::unexpected_end_of_input("statement", self.end_pos));
        };
        let kind = match token {
            Token::LBrace => StmtKind::Block(self.parse_block()?),
            Token::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            Token::If => {
                self.advance();
                let cond = self.parse_paren_expr()?;
                let then = Box::new(self.parse_statement()?);
                let otherwise =
                    if self.match_token(Token::Else) { Some(Box::new(self.parse_statement()?)) } else { None };
                StmtKind::If { cond, then, otherwise }
            }
            Token::While => {
                self.advance();
                let cond = self.parse_paren_expr()?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { cond, body }
            }
            Token::For => self.parse_for()?,
            Token::Break | Token::Continue => {
                self.advance();
                if self.check(Token::Identifier) {
                    return Err(ParseError::invalid_syntax("Labeled statements are not supported.", self.pos()));
                }
                self.expect(Token::Semicolon, "';'")?;
                if token == Token::Break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                }
            }
            Token::Return => {
                self.advance();
                let value = if self.check(Token::Semicolon) { None } else { Some(self.parse_expr()?) };
                self.expect(Token::Semicolon, "';'")?;
                StmtKind::Return(value)
            }
            Token::Throw => {
                self.advance();
                let value = self.parse_expr()?;
                self.expect(Token::Semicolon, "';'")?;
                StmtKind::Throw(value)
            }
            Token::Try => self.parse_try()?,
            Token::Do | Token::Switch | Token::Synchronized | Token::Case | Token::Default | Token::Finally => {
                let what = self.found();
                return Err(ParseError::invalid_syntax(format!("'{}' statements are not supported.", what), pos));
            }
            Token::Identifier if self.peek_at(1) == Some(Token::Colon) => {
                return Err(ParseError::invalid_syntax("Labeled statements are not supported.", pos));
            }
            _ => {
                let expr = self.parse_expr()?;
                if !is_statement_expression(&expr) {
                    return Err(ParseError::invalid_syntax("Not a statement.", expr.pos));
                }
                self.expect(Token::Semicolon, "';'")?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt::new(kind, pos))
    }

    fn parse_for(&mut self) -> ParseResult<StmtKind> {
        self.expect(Token::For, "'for'")?;
        self.expect(Token::LParen, "'('")?;
        let mut init = Vec::new();
        if !self.check(Token::Semicolon) {
            let pos = self.pos();
            let is_decl = match self.peek_token() {
                Some(Token::Final) => true,
                Some(t) if t.is_primitive_type() => true,
                Some(Token::Identifier) => self.looks_like_local_decl(),
                _ => false,
            };
            if is_decl {
                let modifiers = if self.match_token(Token::Final) { M_FINAL } else { 0 };
                init.push(self.parse_local_var(modifiers, pos)?);
            } else {
                for expr in self.parse_expr_list()? {
                    let pos = expr.pos;
                    init.push(Stmt::new(StmtKind::Expr(expr), pos));
                }
            }
        }
        self.expect(Token::Semicolon, "';'")?;
        let cond = if self.check(Token::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(Token::Semicolon, "';'")?;
        let update = if self.check(Token::RParen) { Vec::new() } else { self.parse_expr_list()? };
        self.expect(Token::RParen, "')'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For { init, cond, update, body })
    }

    fn parse_try(&mut self) -> ParseResult<StmtKind> {
        let pos = self.pos();
        self.expect(Token::Try, "'try'")?;
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.check(Token::Catch) {
            let catch_pos = self.pos();
            self.advance();
            self.expect(Token::LParen, "'('")?;
            self.match_token(Token::Final);
            let type_expr = self.parse_type()?;
            let (name, _) = self.identifier()?;
            self.expect(Token::RParen, "')'")?;
            let block = self.parse_block()?;
            catches.push(Catch { name, type_expr, pos: catch_pos, local: None, class: None, body: block });
        }
        if self.check(Token::Finally) {
            return Err(ParseError::invalid_syntax("'finally' clauses are not supported.", self.pos()));
        }
        if catches.is_empty() {
            return Err(ParseError::invalid_syntax("'catch' expected.", pos));
        }
        Ok(StmtKind::Try { body, catches })
    }

    // Expressions

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        let lhs = self.parse_conditional()?;
        let op = match self.peek_token() {
            Some(Token::Assign) => None,
            Some(Token::AddAssign) => Some(BinaryOp::Add),
            Some(Token::SubAssign) => Some(BinaryOp::Sub),
            Some(Token::MulAssign) => Some(BinaryOp::Mul),
            Some(Token::DivAssign) => Some(BinaryOp::Div),
            Some(Token::ModAssign) => Some(BinaryOp::Rem),
            Some(Token::AndAssign) => Some(BinaryOp::BitAnd),
            Some(Token::OrAssign) => Some(BinaryOp::BitOr),
            Some(Token::XorAssign) => Some(BinaryOp::BitXor),
            Some(Token::LShiftAssign) => Some(BinaryOp::Shl),
            Some(Token::RShiftAssign) => Some(BinaryOp::Shr),
            Some(Token::URShiftAssign) => Some(BinaryOp::UShr),
            _ => return Ok(lhs),
        };
        let pos = self.pos();
        self.advance();
        let rhs = self.parse_expr()?;
        Ok(Expr::new(ExprKind::Assign { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, pos))
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let cond = self.parse_binary(1)?;
        if !self.check(Token::Question) {
            return Ok(cond);
        }
        let pos = self.pos();
        self.advance();
        let then = self.parse_expr()?;
        self.expect(Token::Colon, "':'")?;
        let otherwise = self.parse_conditional()?;
        Ok(Expr::new(
            ExprKind::Conditional { cond: Box::new(cond), then: Box::new(then), otherwise: Box::new(otherwise) },
            pos,
        ))
    }

    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.check(Token::InstanceOf) && RELATIONAL_PREC >= min_prec {
                let pos = self.pos();
                self.advance();
                let type_expr = self.parse_type()?;
                lhs = Expr::new(ExprKind::InstanceOf { expr: Box::new(lhs), type_expr }, pos);
                continue;
            }
            let Some((op, prec)) = self.peek_token().and_then(binary_op) else { break };
            if prec < min_prec {
                break;
            }
            let pos = self.pos();
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr::new(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, pos);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let pos = self.pos();
        let unary = |op, operand: Expr| Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, pos);
        match self.peek_token() {
            Some(Token::Plus) => {
                self.advance();
                Ok(unary(UnaryOp::Plus, self.parse_unary()?))
            }
            Some(Token::Minus) => {
                self.advance();
                if let Some(lit) = self.negated_min_literal() {
                    self.advance();
                    return Ok(Expr::new(ExprKind::Literal(lit), pos));
                }
                Ok(unary(UnaryOp::Neg, self.parse_unary()?))
            }
            Some(Token::Bang) => {
                self.advance();
                Ok(unary(UnaryOp::Not, self.parse_unary()?))
            }
            Some(Token::Tilde) => {
                self.advance();
                Ok(unary(UnaryOp::BitNot, self.parse_unary()?))
            }
            Some(Token::Inc) | Some(Token::Dec) => {
                let op = if self.check(Token::Inc) { IncDecOp::PreInc } else { IncDecOp::PreDec };
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::new(ExprKind::IncDec { op, operand: Box::new(operand) }, pos))
            }
            Some(Token::LParen) if self.looks_like_cast() => {
                self.advance();
                let type_expr = self.parse_type()?;
                self.expect(Token::RParen, "')'")?;
                let expr = self.parse_unary()?;
                Ok(Expr::new(ExprKind::Cast { type_expr, expr: Box::new(expr) }, pos))
            }
            _ => self.parse_postfix(),
        }
    }

    /// `-2147483648` and `-9223372036854775808L` are only legal negated
    fn negated_min_literal(&self) -> Option<Literal> {
        let token = self.peek()?;
        if token.token != Token::IntegerLiteral {
            return None;
        }
        match token.lexeme.as_str() {
            "2147483648" => Some(Literal::Int(i32::MIN)),
            "9223372036854775808L" | "9223372036854775808l" => Some(Literal::Long(i64::MIN)),
            _ => None,
        }
    }

    fn looks_like_cast(&self) -> bool {
        match self.peek_at(1) {
            Some(t) if t.is_primitive_type() && t != Token::Void => {
                let mut i = 2;
                while self.peek_at(i) == Some(Token::LBracket) && self.peek_at(i + 1) == Some(Token::RBracket) {
                    i += 2;
                }
                self.peek_at(i) == Some(Token::RParen)
            }
            Some(Token::Identifier) => {
                let mut i = 2;
                while self.peek_at(i) == Some(Token::Dot) && self.peek_at(i + 1) == Some(Token::Identifier) {
                    i += 2;
                }
                let mut dims = false;
                while self.peek_at(i) == Some(Token::LBracket) && self.peek_at(i + 1) == Some(Token::RBracket) {
                    i += 2;
                    dims = true;
                }
                if self.peek_at(i) != Some(Token::RParen) {
                    return false;
                }
                if dims {
                    return true;
                }
                matches!(
                    self.peek_at(i + 1),
                    Some(Token::Identifier)
                        | Some(Token::IntegerLiteral)
                        | Some(Token::HexInteger)
                        | Some(Token::FloatLiteral)
                        | Some(Token::CharLiteral)
                        | Some(Token::StringLiteral)
                        | Some(Token::LParen)
                        | Some(Token::Bang)
                        | Some(Token::Tilde)
                        | Some(Token::This)
                        | Some(Token::Super)
                        | Some(Token::New)
                        | Some(Token::True)
                        | Some(Token::False)
                        | Some(Token::Null)
                )
            }
            _ => false,
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let pos = self.pos();
            match self.peek_token() {
                Some(Token::Dot) => {
                    self.advance();
                    if self.match_token(Token::Class) {
                        let type_expr = self.expr_to_type(&expr, 0)?;
                        expr = Expr::new(ExprKind::ClassLit(type_expr), pos);
                        continue;
                    }
                    if self.match_token(Token::This) {
                        let (name, name_pos) = expr_to_name(&expr).ok_or_else(|| {
                            ParseError::invalid_syntax("Class name expected before '.this'.", expr.pos)
                        })?;
                        expr = Expr::new(ExprKind::QualifiedThis(TypeName::new(name, name_pos)), pos);
                        continue;
                    }
                    if self.check(Token::New) {
                        return Err(ParseError::invalid_syntax("Qualified allocation is not supported.", pos));
                    }
                    let (name, name_pos) = self.identifier()?;
                    if self.check(Token::LParen) {
                        let args = self.parse_args()?;
                        expr = if matches!(expr.kind, ExprKind::Super) {
                            Expr::new(ExprKind::Call { target: None, is_super: true, name, args }, name_pos)
                        } else {
                            Expr::new(
                                ExprKind::Call { target: Some(Box::new(expr)), is_super: false, name, args },
                                name_pos,
                            )
                        };
                    } else {
                        expr = Expr::new(ExprKind::Select { target: Box::new(expr), name }, name_pos);
                    }
                }
                Some(Token::LBracket) => {
                    if self.peek_at(1) == Some(Token::RBracket) {
                        let dims = self.parse_dims();
                        self.expect(Token::Dot, "'.class'")?;
                        self.expect(Token::Class, "'class'")?;
                        let type_expr = self.expr_to_type(&expr, dims)?;
                        expr = Expr::new(ExprKind::ClassLit(type_expr), pos);
                        continue;
                    }
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RBracket, "']'")?;
                    expr = Expr::new(ExprKind::Index { array: Box::new(expr), index: Box::new(index) }, pos);
                }
                Some(Token::Inc) | Some(Token::Dec) => {
                    let op = if self.check(Token::Inc) { IncDecOp::PostInc } else { IncDecOp::PostDec };
                    self.advance();
                    expr = Expr::new(ExprKind::IncDec { op, operand: Box::new(expr) }, pos);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn expr_to_type(&self, expr: &Expr, dims: usize) -> ParseResult<TypeExpr> {
        match expr_to_name(expr) {
            Some((name, pos)) => Ok(TypeExpr::Named(TypeName::new(name, pos)).array_of(dims)),
            None => Err(ParseError::invalid_syntax("Type name expected.", expr.pos)),
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let pos = self.pos();
        let Some(token) = self.peek().cloned() else {
            return Err(ParseError::unexpected_end_of_input("expression", self.end_pos));
        };
        let literal = |lit| Ok(Expr::new(ExprKind::Literal(lit), pos));
        match token.token {
            Token::IntegerLiteral | Token::HexInteger => {
                self.advance();
                literal(parse_integer(&token.lexeme, pos)?)
            }
            Token::FloatLiteral => {
                self.advance();
                literal(parse_float(&token.lexeme, pos)?)
            }
            Token::CharLiteral => {
                self.advance();
                let text = unescape(&token.lexeme[1..token.lexeme.len() - 1], pos)?;
                let units: Vec<u16> = text.encode_utf16().collect();
                if units.len() != 1 {
                    return Err(ParseError::invalid_syntax("Invalid character constant.", pos));
                }
                literal(Literal::Char(units[0]))
            }
            Token::StringLiteral => {
                self.advance();
                literal(Literal::Str(unescape(&token.lexeme[1..token.lexeme.len() - 1], pos)?))
            }
            Token::True => {
                self.advance();
                literal(Literal::Bool(true))
            }
            Token::False => {
                self.advance();
                literal(Literal::Bool(false))
            }
            Token::Null => {
                self.advance();
                literal(Literal::Null)
            }
            Token::This => {
                self.advance();
                if self.check(Token::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::new(ExprKind::CtorCall { is_super: false, args }, pos));
                }
                Ok(Expr::new(ExprKind::This, pos))
            }
            Token::Super => {
                self.advance();
                if self.check(Token::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::new(ExprKind::CtorCall { is_super: true, args }, pos));
                }
                if !self.check(Token::Dot) {
                    return Err(ParseError::unexpected_token("'.'", &self.found(), self.pos()));
                }
                Ok(Expr::new(ExprKind::Super, pos))
            }
            Token::New => self.parse_new(),
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::Identifier => {
                self.advance();
                if self.check(Token::LParen) {
                    let args = self.parse_args()?;
                    return Ok(Expr::new(ExprKind::Call { target: None, is_super: false, name: token.lexeme, args }, pos));
                }
                Ok(Expr::new(ExprKind::Name(token.lexeme), pos))
            }
            t if t.is_primitive_type() => {
                let type_expr = self.parse_type()?;
                self.expect(Token::Dot, "'.class'")?;
                self.expect(Token::Class, "'class'")?;
                Ok(Expr::new(ExprKind::ClassLit(type_expr), pos))
            }
            _ => Err(ParseError::unexpected_token("Expression", &token.lexeme, pos)),
        }
    }

    fn parse_new(&mut self) -> ParseResult<Expr> {
        let pos = self.pos();
        self.expect(Token::New, "'new'")?;
        let elem = match self.peek_token().and_then(primitive_type) {
            Some(ty) if ty != Type::Void => {
                let prim_pos = self.pos();
                self.advance();
                TypeExpr::Primitive(ty, prim_pos)
            }
            _ => TypeExpr::Named(self.type_name()?),
        };
        if self.check(Token::LBracket) {
            if self.peek_at(1) == Some(Token::RBracket) {
                return Err(ParseError::invalid_syntax("Array initializers are not supported.", pos));
            }
            self.advance();
            let len = self.parse_expr()?;
            self.expect(Token::RBracket, "']'")?;
            if self.check(Token::LBracket) && self.peek_at(1) != Some(Token::RBracket) {
                return Err(ParseError::invalid_syntax("Multi-dimensional array creation is not supported.", pos));
            }
            let dims = self.parse_dims();
            return Ok(Expr::new(ExprKind::NewArray { elem: elem.array_of(dims), len: Box::new(len) }, pos));
        }
        let TypeExpr::Named(class_name) = elem else {
            return Err(ParseError::unexpected_token("'['", &self.found(), self.pos()));
        };
        let args = self.parse_args()?;
        let body = if self.check(Token::LBrace) {
            let header = ClassHeader {
                pos,
                doc: None,
                modifiers: M_ANONYMOUS,
                name: String::new(),
                super_name: Some(class_name.clone()),
                interfaces: Vec::new(),
                in_static_context: self.in_static_context(),
            };
            let id = self.actions.begin_class(header);
            self.parse_class_body(id);
            Some(id)
        } else {
            None
        };
        Ok(Expr::new(ExprKind::New { class: TypeExpr::Named(class_name), args, body }, pos))
    }

    fn parse_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(Token::LParen, "'('")?;
        if self.match_token(Token::RParen) {
            return Ok(Vec::new());
        }
        let args = self.parse_expr_list()?;
        self.expect(Token::RParen, "')'")?;
        Ok(args)
    }

    fn parse_expr_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut list = vec![self.parse_expr()?];
        while self.match_token(Token::Comma) {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    fn parse_paren_expr(&mut self) -> ParseResult<Expr> {
        self.expect(Token::LParen, "'('")?;
        let expr = self.parse_expr()?;
        self.expect(Token::RParen, "')'")?;
        Ok(expr)
    }

    // Helpers

    fn in_static_context(&self) -> bool {
        self.static_context.last().copied().unwrap_or(false)
    }

    fn with_static_context<T>(&mut self, is_static: bool, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.static_context.push(is_static);
        let result = f(self);
        self.static_context.pop();
        result
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&LexicalToken> {
        self.tokens.get(self.current)
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|t| t.token)
    }

    fn peek_at(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.current + n).map(|t| t.token)
    }

    fn pos(&self) -> Where {
        self.peek().map(|t| t.location.to_where()).unwrap_or(self.end_pos)
    }

    fn found(&self) -> String {
        self.peek().map(|t| t.lexeme.clone()).unwrap_or_else(|| "end of file".to_string())
    }

    fn check(&self, token: Token) -> bool {
        self.peek_token() == Some(token)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> ParseResult<Where> {
        if self.check(token) {
            let pos = self.pos();
            self.advance();
            return Ok(pos);
        }
        if self.is_at_end() {
            Err(ParseError::unexpected_end_of_input(what, self.end_pos))
        } else {
            Err(ParseError::unexpected_token(what, &self.found(), self.pos()))
        }
    }

    fn identifier(&mut self) -> ParseResult<(String, Where)> {
        match self.peek() {
            Some(t) if t.token == Token::Identifier => {
                let result = (t.lexeme.clone(), t.location.to_where());
                self.advance();
                Ok(result)
            }
            Some(t) => Err(ParseError::unexpected_token("Identifier", &t.lexeme, t.location.to_where())),
            None => Err(ParseError::unexpected_end_of_input("Identifier", self.end_pos)),
        }
    }

    fn report(&mut self, err: ParseError) {
        self.actions.error(err.pos(), &err.message());
    }

    fn skip_past(&mut self, token: Token) {
        while let Some(t) = self.peek_token() {
            self.advance();
            if t == token {
                return;
            }
        }
    }

    fn skip_to_top_level(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.peek_token() {
            match t {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                Token::Class | Token::Interface | Token::Public | Token::Abstract | Token::Final if depth == 0 => {
                    return
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the end of the current member, leaving a closing brace
    /// of the enclosing class in place
    fn skip_member(&mut self) {
        let mut depth = 0usize;
        while let Some(t) = self.peek_token() {
            match t {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                Token::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        self.skip_member();
    }
}

const RELATIONAL_PREC: u8 = 7;

fn binary_op(token: Token) -> Option<(BinaryOp, u8)> {
    let entry = match token {
        Token::PipePipe => (BinaryOp::Or, 1),
        Token::AndAnd => (BinaryOp::And, 2),
        Token::Pipe => (BinaryOp::BitOr, 3),
        Token::Caret => (BinaryOp::BitXor, 4),
        Token::Amp => (BinaryOp::BitAnd, 5),
        Token::Eq => (BinaryOp::Eq, 6),
        Token::Ne => (BinaryOp::Ne, 6),
        Token::Lt => (BinaryOp::Lt, RELATIONAL_PREC),
        Token::Le => (BinaryOp::Le, RELATIONAL_PREC),
        Token::Gt => (BinaryOp::Gt, RELATIONAL_PREC),
        Token::Ge => (BinaryOp::Ge, RELATIONAL_PREC),
        Token::LShift => (BinaryOp::Shl, 8),
        Token::RShift => (BinaryOp::Shr, 8),
        Token::URShift => (BinaryOp::UShr, 8),
        Token::Plus => (BinaryOp::Add, 9),
        Token::Minus => (BinaryOp::Sub, 9),
        Token::Star => (BinaryOp::Mul, 10),
        Token::Slash => (BinaryOp::Div, 10),
        Token::Percent => (BinaryOp::Rem, 10),
        _ => return None,
    };
    Some(entry)
}

fn primitive_type(token: Token) -> Option<Type> {
    let ty = match token {
        Token::Boolean => Type::Boolean,
        Token::Byte => Type::Byte,
        Token::Short => Type::Short,
        Token::Int => Type::Int,
        Token::Long => Type::Long,
        Token::Char => Type::Char,
        Token::Float => Type::Float,
        Token::Double => Type::Double,
        Token::Void => Type::Void,
        _ => return None,
    };
    Some(ty)
}

/// Dotted name spelled by a chain of `Name` and `Select` nodes
fn expr_to_name(expr: &Expr) -> Option<(String, Where)> {
    match &expr.kind {
        ExprKind::Name(name) => Some((name.clone(), expr.pos)),
        ExprKind::Select { target, name } => {
            let (prefix, pos) = expr_to_name(target)?;
            Some((format!("{}.{}", prefix, name), pos))
        }
        _ => None,
    }
}

fn is_statement_expression(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Assign { .. }
            | ExprKind::IncDec { .. }
            | ExprKind::Call { .. }
            | ExprKind::New { .. }
            | ExprKind::CtorCall { .. }
    )
}

fn parse_integer(text: &str, pos: Where) -> ParseResult<Literal> {
    let is_long = text.ends_with('l') || text.ends_with('L');
    let digits = text.trim_end_matches(['l', 'L']);
    let overflow = || ParseError::invalid_syntax("Numeric overflow.", pos);
    let (radix, body) = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    let value = u64::from_str_radix(body, radix).map_err(|_| {
        if radix == 8 {
            ParseError::invalid_syntax("Invalid character in octal number.", pos)
        } else {
            overflow()
        }
    })?;
    if is_long {
        if radix == 10 && value > i64::MAX as u64 {
            return Err(overflow());
        }
        Ok(Literal::Long(value as i64))
    } else if radix == 10 {
        if value > i32::MAX as u64 {
            return Err(overflow());
        }
        Ok(Literal::Int(value as i32))
    } else {
        if value > u32::MAX as u64 {
            return Err(overflow());
        }
        Ok(Literal::Int(value as u32 as i32))
    }
}

fn parse_float(text: &str, pos: Where) -> ParseResult<Literal> {
    let bad = || ParseError::invalid_syntax("Invalid floating-point number.", pos);
    if let Some(body) = text.strip_suffix(['f', 'F']) {
        let value: f32 = body.parse().map_err(|_| bad())?;
        if value.is_infinite() {
            return Err(ParseError::invalid_syntax("Numeric overflow.", pos));
        }
        return Ok(Literal::Float(value));
    }
    let body = text.trim_end_matches(['d', 'D']);
    let value: f64 = body.parse().map_err(|_| bad())?;
    if value.is_infinite() {
        return Err(ParseError::invalid_syntax("Numeric overflow.", pos));
    }
    Ok(Literal::Double(value))
}

/// Resolve the escape sequences of a character or string literal body
fn unescape(body: &str, pos: Where) -> ParseResult<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            return Err(ParseError::invalid_syntax("Invalid escape character.", pos));
        };
        match next {
            'b' => out.push('\u{8}'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'f' => out.push('\u{c}'),
            'r' => out.push('\r'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| ParseError::invalid_syntax("Invalid escape character.", pos))?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                let max_len = if next <= '3' { 3 } else { 2 };
                let mut len = 1;
                while len < max_len {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                            len += 1;
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            _ => return Err(ParseError::invalid_syntax("Invalid escape character.", pos)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::ClassId;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        errors: Vec<String>,
        members: Vec<MemberDecl>,
        next: u32,
    }

    impl ParserActions for Recorder {
        fn package_declaration(&mut self, _pos: Where, name: &str) {
            self.events.push(format!("package {}", name));
        }
        fn import_class(&mut self, _pos: Where, name: &str) {
            self.events.push(format!("import {}", name));
        }
        fn import_package(&mut self, _pos: Where, name: &str) {
            self.events.push(format!("import {}.*", name));
        }
        fn begin_class(&mut self, header: ClassHeader) -> ClassId {
            self.events.push(format!("begin {} {:#x}", header.name, header.modifiers));
            self.next += 1;
            ClassId(self.next - 1)
        }
        fn define_field(&mut self, _pos: Where, _doc: Option<String>, modifiers: u32, member: MemberDecl) {
            let name = match &member {
                MemberDecl::Field { name, .. } | MemberDecl::Method { name, .. } => name.clone(),
                MemberDecl::Initializer { .. } => "{}".to_string(),
            };
            self.events.push(format!("member {} {:#x}", name, modifiers));
            self.members.push(member);
        }
        fn end_class(&mut self, _pos: Where, class: ClassId) {
            self.events.push(format!("end {}", class.0));
        }
        fn error(&mut self, _pos: Where, message: &str) {
            self.errors.push(message.to_string());
        }
    }

    fn parse(source: &str) -> Recorder {
        let mut rec = Recorder::default();
        Parser::new(source, &mut rec).parse_compilation_unit();
        rec
    }

    #[test]
    fn callbacks_follow_file_order() {
        let rec = parse(
            "package p; import java.util.Vector; import java.io.*;\n\
             public class A { int x, y = 2; A() {} static { } class B { } void m(int a) { } }",
        );
        assert!(rec.errors.is_empty(), "{:?}", rec.errors);
        assert_eq!(
            rec.events,
            vec![
                "package p",
                "import java.util.Vector",
                "import java.io.*",
                "begin A 0x1",
                "member x 0x0",
                "member y 0x0",
                "member <init> 0x0",
                "member {} 0x8",
                "begin B 0x0",
                "end 1",
                "member m 0x0",
                "end 0",
            ]
        );
    }

    #[test]
    fn local_and_anonymous_classes_are_marked() {
        let rec = parse("class A { void m() { class L { } Object o = new Object() { }; } }");
        assert!(rec.errors.is_empty(), "{:?}", rec.errors);
        assert!(rec.events.contains(&format!("begin L {:#x}", M_LOCAL)));
        assert!(rec.events.contains(&format!("begin  {:#x}", M_ANONYMOUS)));
    }

    #[test]
    fn deprecated_doc_sets_modifier() {
        let rec = parse("class A { /** @deprecated */ int x; }");
        assert!(rec.events.contains(&format!("member x {:#x}", M_DEPRECATED)));
    }

    #[test]
    fn precedence_and_casts() {
        let rec = parse("class A { int x = 1 + 2 * 3; Object o = (Object) null; int y = (x) + 1; }");
        assert!(rec.errors.is_empty(), "{:?}", rec.errors);
        let MemberDecl::Field { init: Some(init), .. } = &rec.members[0] else { panic!() };
        let ExprKind::Binary { op: BinaryOp::Add, rhs, .. } = &init.kind else { panic!("{:?}", init.kind) };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
        let MemberDecl::Field { init: Some(init), .. } = &rec.members[1] else { panic!() };
        assert!(matches!(init.kind, ExprKind::Cast { .. }));
        let MemberDecl::Field { init: Some(init), .. } = &rec.members[2] else { panic!() };
        assert!(matches!(init.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn syntax_errors_recover_at_member_boundary() {
        let rec = parse("class A { int x = ; void m() { } }");
        assert_eq!(rec.errors.len(), 1);
        assert!(rec.events.contains(&"member m 0x0".to_string()));
        assert_eq!(rec.events.last().map(String::as_str), Some("end 0"));
    }

    #[test]
    fn unsupported_statements_are_errors() {
        let rec = parse("class A { void m() { do { } while (true); } }");
        assert_eq!(rec.errors.len(), 1);
        assert!(rec.errors[0].contains("not supported"));
    }

    #[test]
    fn literals() {
        assert_eq!(parse_integer("017", Where::NOWHERE).unwrap(), Literal::Int(15));
        assert_eq!(parse_integer("0xffffffff", Where::NOWHERE).unwrap(), Literal::Int(-1));
        assert_eq!(parse_integer("10L", Where::NOWHERE).unwrap(), Literal::Long(10));
        assert!(parse_integer("2147483648", Where::NOWHERE).is_err());
        assert_eq!(unescape(r"a\tbA\101", Where::NOWHERE).unwrap(), "a\tbAA");
        assert_eq!(parse_float("1.5f", Where::NOWHERE).unwrap(), Literal::Float(1.5));
        let rec = parse("class A { int x = -2147483648; }");
        assert!(rec.errors.is_empty(), "{:?}", rec.errors);
    }
}

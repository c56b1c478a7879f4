//! Statement and expression trees for member bodies
//!
//! The parser produces the source forms. Attribution rewrites names, calls
//! and allocations in place into the resolved forms (`Local`, `Field`,
//! `Invoke`, `NewInstance`, ...) that the code generator consumes.

use crate::parser::span::Where;
use crate::symtab::{ClassId, ConstValue, MemberRef, Type};

/// A type name as written, dotted, possibly package-qualified
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub name: String,
    pub pos: Where,
}

impl TypeName {
    pub fn new(name: impl Into<String>, pos: Where) -> Self {
        Self { name: name.into(), pos }
    }
}

/// A type as written in a declaration
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Primitive(Type, Where),
    Named(TypeName),
    Array(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn pos(&self) -> Where {
        match self {
            TypeExpr::Primitive(_, pos) => *pos,
            TypeExpr::Named(name) => name.pos,
            TypeExpr::Array(elem) => elem.pos(),
        }
    }

    pub fn array_of(self, dims: usize) -> TypeExpr {
        (0..dims).fold(self, |t, _| TypeExpr::Array(Box::new(t)))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeExpr::Primitive(Type::Void, _))
    }
}

/// Index of a local variable in the owning member's local table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// A local variable or parameter after attribution
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub ty: Type,
    pub slot: u16,
    pub pos: Where,
    pub is_final: bool,
    /// Definite-assignment number
    pub number: usize,
    /// Synthetic parameters are hidden from LocalVariableTable
    pub synthetic: bool,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub pos: Where,
    pub end: Where,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, pos: Where, end: Where) -> Self {
        Self { stmts, pos, end }
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Where,
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: Where) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub pos: Where,
    pub dims: usize,
    pub init: Option<Expr>,
    pub local: Option<LocalId>,
}

#[derive(Debug, Clone)]
pub struct Catch {
    pub name: String,
    pub type_expr: TypeExpr,
    pub pos: Where,
    pub local: Option<LocalId>,
    pub class: Option<ClassId>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Block),
    LocalVar { modifiers: u32, type_expr: TypeExpr, vars: Vec<VarDecl> },
    LocalClass(ClassId),
    Expr(Expr),
    If { cond: Expr, then: Box<Stmt>, otherwise: Option<Box<Stmt>> },
    While { cond: Expr, body: Box<Stmt> },
    For { init: Vec<Stmt>, cond: Option<Expr>, update: Vec<Expr>, body: Box<Stmt> },
    Break,
    Continue,
    Return(Option<Expr>),
    Throw(Expr),
    Try { body: Block, catches: Vec<Catch> },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(u16),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl IncDecOp {
    pub fn delta(self) -> i32 {
        match self {
            IncDecOp::PreInc | IncDecOp::PostInc => 1,
            IncDecOp::PreDec | IncDecOp::PostDec => -1,
        }
    }

    pub fn is_prefix(self) -> bool {
        matches!(self, IncDecOp::PreInc | IncDecOp::PreDec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeMode {
    Static,
    Virtual,
    Interface,
    Special,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Where,
    /// Filled in by attribution
    pub ty: Type,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Where) -> Self {
        Self { kind, pos, ty: Type::Error }
    }

    pub fn typed(kind: ExprKind, pos: Where, ty: Type) -> Self {
        Self { kind, pos, ty }
    }

    pub fn error(pos: Where) -> Self {
        Self::typed(ExprKind::Error, pos, Type::Error)
    }

    /// Folded value of a constant expression, if attribution found one
    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.kind {
            ExprKind::Const(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        self.const_value().is_some()
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    // Source forms
    Literal(Literal),
    Name(String),
    Select { target: Box<Expr>, name: String },
    Call { target: Option<Box<Expr>>, is_super: bool, name: String, args: Vec<Expr> },
    New { class: TypeExpr, args: Vec<Expr>, body: Option<ClassId> },
    NewArray { elem: TypeExpr, len: Box<Expr> },
    Index { array: Box<Expr>, index: Box<Expr> },
    This,
    /// `super` as the target of a field access
    Super,
    /// `Outer.this`
    QualifiedThis(TypeName),
    ClassLit(TypeExpr),
    CtorCall { is_super: bool, args: Vec<Expr> },
    Assign { op: Option<BinaryOp>, lhs: Box<Expr>, rhs: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    IncDec { op: IncDecOp, operand: Box<Expr> },
    Conditional { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    Cast { type_expr: TypeExpr, expr: Box<Expr> },
    InstanceOf { expr: Box<Expr>, type_expr: TypeExpr },

    // Resolved forms
    Const(ConstValue),
    Local(LocalId),
    Field { target: Option<Box<Expr>>, field: MemberRef },
    Invoke { target: Option<Box<Expr>>, method: MemberRef, args: Vec<Expr>, mode: InvokeMode },
    NewInstance { class: ClassId, ctor: MemberRef, outer: Option<Box<Expr>>, args: Vec<Expr>, marker: bool },
    Init { ctor: MemberRef, is_super: bool, outer: Option<Box<Expr>>, args: Vec<Expr>, marker: bool },
    /// Widening, narrowing or checked reference conversion to `ty`
    Convert(Box<Expr>),
    ArrayLength(Box<Expr>),
    NewArrayOf { len: Box<Expr> },
    ArrayElem { array: Box<Expr>, index: Box<Expr> },
    /// Enclosing instance of the given class, reached through `this$N` links
    OuterThis(ClassId),
    Concat(Vec<Expr>),
    ClassLookup { cache: MemberRef, helper: MemberRef, name: String },
    /// Checked reference cast
    Checkcast { expr: Box<Expr>, target: Type },
    InstanceTest { expr: Box<Expr>, target: Type },
    /// A type name in qualifier position
    TypeRef(Type),
    /// A package prefix in qualifier position
    PackageRef(String),
    Error,
}

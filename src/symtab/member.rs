//! Member definitions: fields, methods, constructors, initializers and
//! nested-class markers

use super::types::{MethodType, Type};
use super::{ClassId, MemberRef};
use crate::ast::{Block, Expr, LocalVar, TypeExpr, TypeName};
use crate::common::consts::*;
use crate::parser::span::Where;
use std::fmt;

/// Member lifecycle; moves forward only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemberStatus {
    Parsed,
    Checking,
    Checked,
    Inlining,
    Inlined,
    Error,
}

/// A compile-time constant value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Int(i32),
    Long(i64),
    /// IEEE bits
    Float(u32),
    /// IEEE bits
    Double(u64),
    Str(String),
}

impl ConstValue {
    pub fn float(v: f32) -> Self {
        ConstValue::Float(v.to_bits())
    }

    pub fn double(v: f64) -> Self {
        ConstValue::Double(v.to_bits())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(*v as i64),
            ConstValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Long(v) => Some(*v as f64),
            ConstValue::Float(b) => Some(f32::from_bits(*b) as f64),
            ConstValue::Double(b) => Some(f64::from_bits(*b)),
            ConstValue::Str(_) => None,
        }
    }

    /// Text used when a constant takes part in string concatenation
    pub fn to_display_string(&self, ty: &Type) -> String {
        match (self, ty) {
            (ConstValue::Int(v), Type::Boolean) => (*v != 0).to_string(),
            (ConstValue::Int(v), Type::Char) => char::from_u32(*v as u32).map(String::from).unwrap_or_default(),
            (ConstValue::Int(v), _) => v.to_string(),
            (ConstValue::Long(v), _) => v.to_string(),
            (ConstValue::Float(b), _) => format_float(f32::from_bits(*b) as f64),
            (ConstValue::Double(b), _) => format_float(f64::from_bits(*b)),
            (ConstValue::Str(s), _) => s.clone(),
        }
    }
}

fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.is_finite() {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// A formal parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_expr: Option<TypeExpr>,
    pub ty: Type,
    pub pos: Where,
    pub is_final: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, type_expr: TypeExpr, pos: Where, is_final: bool) -> Self {
        Self { name: name.into(), type_expr: Some(type_expr), ty: Type::Error, pos, is_final }
    }

    /// A parameter whose type is already known
    pub fn resolved(name: impl Into<String>, ty: Type, pos: Where) -> Self {
        Self { name: name.into(), type_expr: None, ty, pos, is_final: true }
    }
}

/// What a member is, with the data only that kind carries
#[derive(Debug, Clone)]
pub enum MemberKind {
    Field { type_expr: Option<TypeExpr>, init: Option<Expr>, value: Option<ConstValue> },
    Method { ret_expr: Option<TypeExpr>, params: Vec<Param>, body: Option<Block> },
    Constructor { params: Vec<Param>, body: Option<Block> },
    Initializer { body: Option<Block> },
    NestedClass(ClassId),
}

/// Purpose of a synthetic accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessKind {
    Get,
    Set,
    Call,
    Construct,
}

#[derive(Debug, Clone)]
pub struct MemberDefinition {
    pub class: ClassId,
    pub pos: Where,
    pub name: String,
    pub modifiers: u32,
    pub doc: Option<String>,
    pub kind: MemberKind,
    /// Field type for fields, the full signature for methods and constructors
    pub ty: Type,
    pub method_type: MethodType,
    pub exception_names: Vec<TypeName>,
    pub exceptions: Vec<ClassId>,
    pub status: MemberStatus,
    /// Constructors of classes with an enclosing instance take it first
    pub outer_this_arg: bool,
    /// Captured locals appended after the declared parameters
    pub captured_args: usize,
    /// Synthetic accessor bookkeeping
    pub access_target: Option<(MemberRef, AccessKind)>,
    /// Locals and parameters, filled in by attribution
    pub locals: Vec<LocalVar>,
    pub max_locals: u16,
}

impl MemberDefinition {
    pub fn new(class: ClassId, pos: Where, name: impl Into<String>, modifiers: u32, kind: MemberKind) -> Self {
        Self {
            class,
            pos,
            name: name.into(),
            modifiers,
            doc: None,
            kind,
            ty: Type::Error,
            method_type: MethodType::default(),
            exception_names: Vec::new(),
            exceptions: Vec::new(),
            status: MemberStatus::Parsed,
            outer_this_arg: false,
            captured_args: 0,
            access_target: None,
            locals: Vec::new(),
            max_locals: 0,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, MemberKind::Field { .. })
    }

    /// Methods proper, constructors excluded
    pub fn is_method(&self) -> bool {
        matches!(self.kind, MemberKind::Method { .. })
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self.kind, MemberKind::Constructor { .. })
    }

    /// Methods and constructors, the members with a signature
    pub fn is_invocable(&self) -> bool {
        matches!(self.kind, MemberKind::Method { .. } | MemberKind::Constructor { .. })
    }

    pub fn is_initializer(&self) -> bool {
        matches!(self.kind, MemberKind::Initializer { .. })
    }

    pub fn nested_class(&self) -> Option<ClassId> {
        match self.kind {
            MemberKind::NestedClass(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_public(&self) -> bool {
        self.modifiers & M_PUBLIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.modifiers & M_PRIVATE != 0
    }

    pub fn is_protected(&self) -> bool {
        self.modifiers & M_PROTECTED != 0
    }

    pub fn is_package_private(&self) -> bool {
        self.modifiers & MM_ACCESS == 0
    }

    pub fn is_static(&self) -> bool {
        self.modifiers & M_STATIC != 0
    }

    pub fn is_final(&self) -> bool {
        self.modifiers & M_FINAL != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers & M_ABSTRACT != 0
    }

    pub fn is_native(&self) -> bool {
        self.modifiers & M_NATIVE != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.modifiers & M_SYNTHETIC != 0
    }

    pub fn is_deprecated(&self) -> bool {
        self.modifiers & M_DEPRECATED != 0
    }

    /// Final field without an initializer
    pub fn is_blank_final(&self) -> bool {
        matches!(&self.kind, MemberKind::Field { init: None, .. }) && self.is_final() && !self.is_synthetic()
    }

    pub fn constant_value(&self) -> Option<&ConstValue> {
        match &self.kind {
            MemberKind::Field { value, .. } => value.as_ref(),
            _ => None,
        }
    }

    pub fn params(&self) -> &[Param] {
        match &self.kind {
            MemberKind::Method { params, .. } | MemberKind::Constructor { params, .. } => params,
            _ => &[],
        }
    }

    pub fn params_mut(&mut self) -> Option<&mut Vec<Param>> {
        match &mut self.kind {
            MemberKind::Method { params, .. } | MemberKind::Constructor { params, .. } => Some(params),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Block> {
        match &self.kind {
            MemberKind::Method { body, .. } | MemberKind::Constructor { body, .. } | MemberKind::Initializer { body } => {
                body.as_ref()
            }
            _ => None,
        }
    }

    /// Detach the body for checking; `put_body` restores it
    pub fn take_body(&mut self) -> Option<Block> {
        match &mut self.kind {
            MemberKind::Method { body, .. } | MemberKind::Constructor { body, .. } | MemberKind::Initializer { body } => {
                body.take()
            }
            _ => None,
        }
    }

    pub fn put_body(&mut self, block: Block) {
        if let MemberKind::Method { body, .. } | MemberKind::Constructor { body, .. } | MemberKind::Initializer { body } =
            &mut self.kind
        {
            *body = Some(block);
        }
    }

    pub fn take_field_init(&mut self) -> Option<Expr> {
        match &mut self.kind {
            MemberKind::Field { init, .. } => init.take(),
            _ => None,
        }
    }

    pub fn put_field_init(&mut self, expr: Expr) {
        if let MemberKind::Field { init, .. } = &mut self.kind {
            *init = Some(expr);
        }
    }

    pub fn has_field_init(&self) -> bool {
        matches!(&self.kind, MemberKind::Field { init: Some(_), .. })
    }

    /// Name plus argument descriptor, the identity used for overriding
    pub fn signature_key(&self) -> String {
        format!("{}{}", self.name, self.method_type.arg_descriptor())
    }

    pub fn descriptor(&self) -> String {
        if self.is_invocable() {
            self.method_type.descriptor()
        } else {
            self.ty.descriptor()
        }
    }

    /// Argument types as written in source, synthetic ones excluded
    pub fn declared_args(&self) -> &[Type] {
        let args = &self.method_type.args;
        let start = usize::from(self.outer_this_arg).min(args.len());
        let end = args.len().saturating_sub(self.captured_args).max(start);
        &args[start..end]
    }

    /// Short description for diagnostics, e.g. `m(int)` or `x`
    pub fn describe(&self) -> String {
        match &self.kind {
            MemberKind::Method { .. } | MemberKind::Constructor { .. } => {
                let args: Vec<String> = self.declared_args().iter().map(|a| a.to_string()).collect();
                format!("{}({})", self.name, args.join(", "))
            }
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for MemberDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, args: Vec<Type>) -> MemberDefinition {
        let mut m = MemberDefinition::new(
            ClassId(0),
            Where::NOWHERE,
            name,
            M_PUBLIC,
            MemberKind::Method { ret_expr: None, params: Vec::new(), body: None },
        );
        m.method_type = MethodType::new(Type::Void, args);
        m
    }

    #[test]
    fn signature_key_ignores_return_type() {
        let mut a = method("m", vec![Type::Int]);
        let b = method("m", vec![Type::Int]);
        a.method_type.ret = Type::Long;
        assert_eq!(a.signature_key(), b.signature_key());
        assert_eq!(a.describe(), "m(int)");
    }

    #[test]
    fn blank_final_detection() {
        let field = MemberDefinition::new(
            ClassId(0),
            Where::NOWHERE,
            "x",
            M_FINAL,
            MemberKind::Field { type_expr: None, init: None, value: None },
        );
        assert!(field.is_blank_final());
        assert!(!field.is_invocable());
    }

    #[test]
    fn constant_display() {
        assert_eq!(ConstValue::Int(1).to_display_string(&Type::Boolean), "true");
        assert_eq!(ConstValue::Int(65).to_display_string(&Type::Char), "A");
        assert_eq!(ConstValue::double(2.0).to_display_string(&Type::Double), "2.0");
    }
}

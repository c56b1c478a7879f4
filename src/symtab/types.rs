//! Resolved types and method signatures

use std::fmt;

/// A resolved Java type. Class types carry the binary name with `.` as the
/// package separator and `$` between nested class names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Null,
    Class(String),
    Array(Box<Type>),
    Error,
}

impl Type {
    pub fn class(name: impl Into<String>) -> Type {
        Type::Class(name.into())
    }

    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            Type::Void => out.push('V'),
            Type::Boolean => out.push('Z'),
            Type::Byte => out.push('B'),
            Type::Char => out.push('C'),
            Type::Short => out.push('S'),
            Type::Int => out.push('I'),
            Type::Long => out.push('J'),
            Type::Float => out.push('F'),
            Type::Double => out.push('D'),
            Type::Class(name) => {
                out.push('L');
                out.push_str(&internal_name(name));
                out.push(';');
            }
            Type::Array(elem) => {
                out.push('[');
                elem.write_descriptor(out);
            }
            // never reaches a class file
            Type::Null | Type::Error => out.push_str("Ljava/lang/Object;"),
        }
    }

    /// Name stored in a CONSTANT_Class entry for this type
    pub fn class_constant_name(&self) -> String {
        match self {
            Type::Class(name) => internal_name(name),
            other => other.descriptor(),
        }
    }

    /// Parse one field descriptor from the start of `desc`, returning the
    /// type and the number of bytes consumed.
    pub fn parse_descriptor(desc: &str) -> Option<(Type, usize)> {
        let bytes = desc.as_bytes();
        let first = *bytes.first()?;
        let simple = |t: Type| Some((t, 1));
        match first {
            b'V' => simple(Type::Void),
            b'Z' => simple(Type::Boolean),
            b'B' => simple(Type::Byte),
            b'C' => simple(Type::Char),
            b'S' => simple(Type::Short),
            b'I' => simple(Type::Int),
            b'J' => simple(Type::Long),
            b'F' => simple(Type::Float),
            b'D' => simple(Type::Double),
            b'L' => {
                let end = desc.find(';')?;
                let name = desc[1..end].replace('/', ".");
                Some((Type::Class(name), end + 1))
            }
            b'[' => {
                let (elem, used) = Type::parse_descriptor(&desc[1..])?;
                Some((Type::array_of(elem), used + 1))
            }
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Boolean | Type::Byte | Type::Char | Type::Short | Type::Int | Type::Long | Type::Float | Type::Double
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Byte | Type::Char | Type::Short | Type::Int | Type::Long | Type::Float | Type::Double)
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Byte | Type::Char | Type::Short | Type::Int | Type::Long)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Array(_) | Type::Null)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Class(n) if n == crate::common::consts::JAVA_LANG_STRING)
    }

    /// Number of local-variable / operand-stack slots
    pub fn width(&self) -> u16 {
        match self {
            Type::Void => 0,
            Type::Long | Type::Double => 2,
            _ => 1,
        }
    }

    /// Result type of binary numeric promotion
    pub fn promote(a: &Type, b: &Type) -> Type {
        if *a == Type::Double || *b == Type::Double {
            Type::Double
        } else if *a == Type::Float || *b == Type::Float {
            Type::Float
        } else if *a == Type::Long || *b == Type::Long {
            Type::Long
        } else {
            Type::Int
        }
    }

    /// Result type of unary numeric promotion
    pub fn promote_unary(&self) -> Type {
        match self {
            Type::Byte | Type::Char | Type::Short => Type::Int,
            other => other.clone(),
        }
    }

    /// Rank used for widening primitive conversion
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            Type::Byte => Some(1),
            Type::Short => Some(2),
            Type::Char => Some(2),
            Type::Int => Some(3),
            Type::Long => Some(4),
            Type::Float => Some(5),
            Type::Double => Some(6),
            _ => None,
        }
    }

    /// Whether a widening primitive conversion (or identity) takes self to `to`
    pub fn widens_to(&self, to: &Type) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            (Type::Char, Type::Short) | (Type::Byte, Type::Char) | (Type::Short, Type::Char) => false,
            _ => match (self.numeric_rank(), to.numeric_rank()) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Boolean => write!(f, "boolean"),
            Type::Byte => write!(f, "byte"),
            Type::Char => write!(f, "char"),
            Type::Short => write!(f, "short"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Null => write!(f, "null"),
            Type::Class(name) => write!(f, "{}", name),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Error => write!(f, "<error>"),
        }
    }
}

/// Binary name to class-file internal name
pub fn internal_name(name: &str) -> String {
    name.replace('.', "/")
}

/// The package part of a binary name, empty for the unnamed package
pub fn package_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) => &name[..i],
        None => "",
    }
}

/// Signature of a method or constructor, synthetic arguments included
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MethodType {
    pub ret: Type,
    pub args: Vec<Type>,
}

impl Default for Type {
    fn default() -> Self {
        Type::Void
    }
}

impl MethodType {
    pub fn new(ret: Type, args: Vec<Type>) -> Self {
        Self { ret, args }
    }

    pub fn descriptor(&self) -> String {
        format!("{}{}", self.arg_descriptor(), self.ret.descriptor())
    }

    /// Parenthesized argument part, the key for signature matching
    pub fn arg_descriptor(&self) -> String {
        let mut out = String::from("(");
        for arg in &self.args {
            out.push_str(&arg.descriptor());
        }
        out.push(')');
        out
    }

    pub fn parse_descriptor(desc: &str) -> Option<MethodType> {
        let rest = desc.strip_prefix('(')?;
        let close = rest.find(')')?;
        let mut args_part = &rest[..close];
        let mut args = Vec::new();
        while !args_part.is_empty() {
            let (t, used) = Type::parse_descriptor(args_part)?;
            args.push(t);
            args_part = &args_part[used..];
        }
        let (ret, used) = Type::parse_descriptor(&rest[close + 1..])?;
        if close + 1 + used != rest.len() {
            return None;
        }
        Some(MethodType { ret, args })
    }

    pub fn arg_slots(&self) -> u16 {
        self.args.iter().map(Type::width).sum()
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "({})", args.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptors() {
        assert_eq!(Type::class("java.lang.String").descriptor(), "Ljava/lang/String;");
        assert_eq!(Type::array_of(Type::Int).descriptor(), "[I");
        assert_eq!(Type::class("p.A$B").class_constant_name(), "p/A$B");
        assert_eq!(Type::array_of(Type::class("p.A")).class_constant_name(), "[Lp/A;");
        let m = MethodType::new(Type::Void, vec![Type::Int, Type::class("java.lang.String"), Type::Long]);
        assert_eq!(m.descriptor(), "(ILjava/lang/String;J)V");
        assert_eq!(m.arg_slots(), 4);
    }

    #[test]
    fn parse_method_descriptor() {
        let m = MethodType::parse_descriptor("([Ljava/lang/String;IJ)Ljava/lang/Object;").unwrap();
        assert_eq!(m.args, vec![Type::array_of(Type::class("java.lang.String")), Type::Int, Type::Long]);
        assert_eq!(m.ret, Type::class("java.lang.Object"));
        assert!(MethodType::parse_descriptor("(I").is_none());
        assert!(MethodType::parse_descriptor("(I)VX").is_none());
    }

    #[test]
    fn widening() {
        assert!(Type::Int.widens_to(&Type::Long));
        assert!(Type::Char.widens_to(&Type::Int));
        assert!(!Type::Char.widens_to(&Type::Short));
        assert!(!Type::Long.widens_to(&Type::Int));
        assert_eq!(Type::promote(&Type::Int, &Type::Long), Type::Long);
        assert_eq!(Type::Byte.promote_unary(), Type::Int);
    }

    #[test]
    fn packages() {
        assert_eq!(package_of("java.lang.Object"), "java.lang");
        assert_eq!(package_of("A"), "");
    }
}

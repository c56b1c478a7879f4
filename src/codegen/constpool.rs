//! Constant pool and constants for Java class files
//!
//! Entries are deduplicated and numbered in insertion order, so the same
//! sequence of additions always yields the same pool. `long` and `double`
//! entries take two indices.

use crate::symtab::ConstValue;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    /// IEEE bits
    Float(u32),
    Long(i64),
    /// IEEE bits
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
}

mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACEMETHODREF: u8 = 11;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
}

/// Encode a string in the modified UTF-8 of class files: NUL as two
/// bytes, supplementary characters as surrogate pairs
pub fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007f => out.push(unit as u8),
            0x0000 | 0x0080..=0x07ff => {
                out.push(0xc0 | ((unit >> 6) & 0x1f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
            _ => {
                out.push(0xe0 | ((unit >> 12) & 0x0f) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3f) as u8);
                out.push(0x80 | (unit & 0x3f) as u8);
            }
        }
    }
    out
}

impl Constant {
    /// Number of pool indices the entry occupies
    pub fn width(&self) -> u32 {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        use constant_tags::*;
        let mut bytes = Vec::new();
        match self {
            Constant::Utf8(value) => {
                bytes.push(CONSTANT_UTF8);
                let utf8_bytes = encode_modified_utf8(value);
                bytes.extend_from_slice(&(utf8_bytes.len() as u16).to_be_bytes());
                bytes.extend_from_slice(&utf8_bytes);
            }
            Constant::Integer(value) => {
                bytes.push(CONSTANT_INTEGER);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Float(bits) => {
                bytes.push(CONSTANT_FLOAT);
                bytes.extend_from_slice(&bits.to_be_bytes());
            }
            Constant::Long(value) => {
                bytes.push(CONSTANT_LONG);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            Constant::Double(bits) => {
                bytes.push(CONSTANT_DOUBLE);
                bytes.extend_from_slice(&bits.to_be_bytes());
            }
            Constant::Class(name_index) => {
                bytes.push(CONSTANT_CLASS);
                bytes.extend_from_slice(&name_index.to_be_bytes());
            }
            Constant::String(string_index) => {
                bytes.push(CONSTANT_STRING);
                bytes.extend_from_slice(&string_index.to_be_bytes());
            }
            Constant::FieldRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_FIELDREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::MethodRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_METHODREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::InterfaceMethodRef(class_index, name_and_type_index) => {
                bytes.push(CONSTANT_INTERFACEMETHODREF);
                bytes.extend_from_slice(&class_index.to_be_bytes());
                bytes.extend_from_slice(&name_and_type_index.to_be_bytes());
            }
            Constant::NameAndType(name_index, descriptor_index) => {
                bytes.push(CONSTANT_NAMEANDTYPE);
                bytes.extend_from_slice(&name_index.to_be_bytes());
                bytes.extend_from_slice(&descriptor_index.to_be_bytes());
            }
        }
        bytes
    }
}

#[derive(Debug, Default)]
pub struct ConstantPool {
    pub(crate) constants: Vec<Constant>,
    index: HashMap<Constant, u16>,
    /// Index the next entry gets; index 0 is reserved
    next: u32,
    overflowed: bool,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self { constants: Vec::new(), index: HashMap::new(), next: 1, overflowed: false }
    }

    /// Index of `constant`, adding it if it is not in the pool yet
    pub fn add(&mut self, constant: Constant) -> u16 {
        if let Some(&i) = self.index.get(&constant) {
            return i;
        }
        let width = constant.width();
        if self.next + width > u16::MAX as u32 + 1 {
            self.overflowed = true;
            return 0;
        }
        let i = self.next as u16;
        self.next += width;
        self.index.insert(constant.clone(), i);
        self.constants.push(constant);
        i
    }

    /// The `constant_pool_count` field: one more than the last index used
    pub fn count(&self) -> u16 {
        self.next.min(u16::MAX as u32) as u16
    }

    /// Whether some entry did not fit in 16-bit indices
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn add_utf8(&mut self, value: &str) -> u16 {
        self.add(Constant::Utf8(value.to_string()))
    }

    /// `name` in internal form (`p/A$B`, or an array descriptor)
    pub fn add_class(&mut self, name: &str) -> u16 {
        let name_index = self.add_utf8(name);
        self.add(Constant::Class(name_index))
    }

    pub fn add_string(&mut self, value: &str) -> u16 {
        let string_index = self.add_utf8(value);
        self.add(Constant::String(string_index))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.add(Constant::NameAndType(name_index, descriptor_index))
    }

    pub fn add_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.add_class(class);
        let name_and_type_index = self.add_name_and_type(name, descriptor);
        self.add(Constant::FieldRef(class_index, name_and_type_index))
    }

    pub fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.add_class(class);
        let name_and_type_index = self.add_name_and_type(name, descriptor);
        self.add(Constant::MethodRef(class_index, name_and_type_index))
    }

    pub fn add_interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.add_class(class);
        let name_and_type_index = self.add_name_and_type(name, descriptor);
        self.add(Constant::InterfaceMethodRef(class_index, name_and_type_index))
    }

    /// Entry for a compile-time constant, as `ldc` and `ConstantValue` use it
    pub fn add_value(&mut self, value: &ConstValue) -> u16 {
        match value {
            ConstValue::Int(v) => self.add(Constant::Integer(*v)),
            ConstValue::Long(v) => self.add(Constant::Long(*v)),
            ConstValue::Float(bits) => self.add(Constant::Float(*bits)),
            ConstValue::Double(bits) => self.add(Constant::Double(*bits)),
            ConstValue::Str(s) => self.add_string(s),
        }
    }

    /// Names of the CONSTANT_Class entries, in pool order, internal form
    pub fn class_names(&self) -> Vec<String> {
        let utf8: HashMap<u16, &str> = self
            .index
            .iter()
            .filter_map(|(c, &i)| match c {
                Constant::Utf8(s) => Some((i, s.as_str())),
                _ => None,
            })
            .collect();
        self.constants
            .iter()
            .filter_map(|c| match c {
                Constant::Class(name) => utf8.get(name).map(|s| s.to_string()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_shared() {
        let mut pool = ConstantPool::new();
        let a = pool.add_method_ref("java/lang/Object", "<init>", "()V");
        let b = pool.add_method_ref("java/lang/Object", "<init>", "()V");
        assert_eq!(a, b);
        let object = pool.add_class("java/lang/Object");
        assert_eq!(object, 2);
        assert_eq!(pool.add_utf8("java/lang/Object"), 1);
        assert_eq!(pool.count() as usize, pool.constants.len() + 1);
    }

    #[test]
    fn wide_entries_take_two_indices() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.add_value(&ConstValue::Long(7)), 1);
        assert_eq!(pool.add_value(&ConstValue::double(1.5)), 3);
        assert_eq!(pool.add_value(&ConstValue::Int(7)), 5);
        assert_eq!(pool.count(), 6);
    }

    #[test]
    fn float_entries_compare_by_bits() {
        let mut pool = ConstantPool::new();
        let zero = pool.add_value(&ConstValue::float(0.0));
        let negative_zero = pool.add_value(&ConstValue::float(-0.0));
        assert_ne!(zero, negative_zero);
        let nan = pool.add_value(&ConstValue::float(f32::NAN));
        assert_eq!(pool.add_value(&ConstValue::float(f32::NAN)), nan);
    }

    #[test]
    fn modified_utf8() {
        assert_eq!(encode_modified_utf8("a\0"), vec![b'a', 0xc0, 0x80]);
        assert_eq!(encode_modified_utf8("\u{e9}"), vec![0xc3, 0xa9]);
        assert_eq!(encode_modified_utf8("\u{1f600}").len(), 6);
    }

    #[test]
    fn overflow_is_recorded() {
        let mut pool = ConstantPool::new();
        for i in 0..70000 {
            pool.add_value(&ConstValue::Int(i));
        }
        assert!(pool.overflowed());
    }
}

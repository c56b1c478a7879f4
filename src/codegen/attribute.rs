//! Attributes and exception table structures for Java class files

use super::constpool::ConstantPool;
use super::defs::attribute_names as names;

/// An attribute with its name already in the pool
#[derive(Debug, Clone, PartialEq)]
pub struct NamedAttribute {
    pub name_index: u16,
    pub info: AttributeInfo,
}

impl NamedAttribute {
    /// Add the attribute's name to `pool` and pair it with `info`
    pub fn new(pool: &mut ConstantPool, info: AttributeInfo) -> Self {
        Self { name_index: pool.add_utf8(info.name()), info }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeInfo {
    Code(CodeAttribute),
    ConstantValue { value_index: u16 },
    Exceptions { exception_indices: Vec<u16> },
    LineNumberTable(Vec<LineNumberEntry>),
    LocalVariableTable(Vec<LocalVariableEntry>),
    SourceFile { file_index: u16 },
    Deprecated,
    Synthetic,
    InnerClasses(Vec<InnerClassRow>),
}

impl AttributeInfo {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeInfo::Code(_) => names::CODE,
            AttributeInfo::ConstantValue { .. } => names::CONSTANT_VALUE,
            AttributeInfo::Exceptions { .. } => names::EXCEPTIONS,
            AttributeInfo::LineNumberTable(_) => names::LINE_NUMBER_TABLE,
            AttributeInfo::LocalVariableTable(_) => names::LOCAL_VARIABLE_TABLE,
            AttributeInfo::SourceFile { .. } => names::SOURCE_FILE,
            AttributeInfo::Deprecated => names::DEPRECATED,
            AttributeInfo::Synthetic => names::SYNTHETIC,
            AttributeInfo::InnerClasses(_) => names::INNER_CLASSES,
        }
    }

    /// The attribute payload, without name and length
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        match self {
            AttributeInfo::Code(code) => bytes = code.to_bytes(),
            AttributeInfo::ConstantValue { value_index } => bytes.extend_from_slice(&value_index.to_be_bytes()),
            AttributeInfo::Exceptions { exception_indices } => {
                bytes.extend_from_slice(&(exception_indices.len() as u16).to_be_bytes());
                for index in exception_indices {
                    bytes.extend_from_slice(&index.to_be_bytes());
                }
            }
            AttributeInfo::LineNumberTable(entries) => {
                bytes.extend_from_slice(&(entries.len() as u16).to_be_bytes());
                for entry in entries {
                    bytes.extend_from_slice(&entry.to_bytes());
                }
            }
            AttributeInfo::LocalVariableTable(entries) => {
                bytes.extend_from_slice(&(entries.len() as u16).to_be_bytes());
                for entry in entries {
                    bytes.extend_from_slice(&entry.to_bytes());
                }
            }
            AttributeInfo::SourceFile { file_index } => bytes.extend_from_slice(&file_index.to_be_bytes()),
            AttributeInfo::Deprecated | AttributeInfo::Synthetic => {}
            AttributeInfo::InnerClasses(rows) => {
                bytes.extend_from_slice(&(rows.len() as u16).to_be_bytes());
                for row in rows {
                    bytes.extend_from_slice(&row.to_bytes());
                }
            }
        }
        bytes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<NamedAttribute>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self { max_stack, max_locals, code, exception_table: Vec::new(), attributes: Vec::new() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.max_stack.to_be_bytes());
        bytes.extend_from_slice(&self.max_locals.to_be_bytes());
        bytes.extend_from_slice(&(self.code.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.code);
        bytes.extend_from_slice(&(self.exception_table.len() as u16).to_be_bytes());
        for entry in &self.exception_table {
            bytes.extend_from_slice(&entry.to_bytes());
        }
        bytes.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
        for attribute in &self.attributes {
            let payload = attribute.info.to_bytes();
            bytes.extend_from_slice(&attribute.name_index.to_be_bytes());
            bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            bytes.extend_from_slice(&payload);
        }
        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Zero catches everything
    pub catch_type: u16,
}

impl ExceptionTableEntry {
    pub fn new(start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: u16) -> Self {
        Self { start_pc, end_pc, handler_pc, catch_type }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8);
        bytes.extend_from_slice(&self.start_pc.to_be_bytes());
        bytes.extend_from_slice(&self.end_pc.to_be_bytes());
        bytes.extend_from_slice(&self.handler_pc.to_be_bytes());
        bytes.extend_from_slice(&self.catch_type.to_be_bytes());
        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

impl LineNumberEntry {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4);
        bytes.extend_from_slice(&self.start_pc.to_be_bytes());
        bytes.extend_from_slice(&self.line_number.to_be_bytes());
        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

impl LocalVariableEntry {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(10);
        bytes.extend_from_slice(&self.start_pc.to_be_bytes());
        bytes.extend_from_slice(&self.length.to_be_bytes());
        bytes.extend_from_slice(&self.name_index.to_be_bytes());
        bytes.extend_from_slice(&self.descriptor_index.to_be_bytes());
        bytes.extend_from_slice(&self.index.to_be_bytes());
        bytes
    }
}

/// One row of the InnerClasses attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InnerClassRow {
    pub inner_class_info_index: u16,
    /// Zero for local and anonymous classes
    pub outer_class_info_index: u16,
    /// Zero for anonymous classes
    pub inner_name_index: u16,
    pub inner_class_access_flags: u16,
}

impl InnerClassRow {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8);
        bytes.extend_from_slice(&self.inner_class_info_index.to_be_bytes());
        bytes.extend_from_slice(&self.outer_class_info_index.to_be_bytes());
        bytes.extend_from_slice(&self.inner_name_index.to_be_bytes());
        bytes.extend_from_slice(&self.inner_class_access_flags.to_be_bytes());
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_attribute_layout() {
        let mut pool = ConstantPool::new();
        let mut code = CodeAttribute::new(1, 1, vec![0x2a, 0xb1]);
        code.exception_table.push(ExceptionTableEntry::new(0, 1, 1, 0));
        code.attributes.push(NamedAttribute::new(
            &mut pool,
            AttributeInfo::LineNumberTable(vec![LineNumberEntry { start_pc: 0, line_number: 3 }]),
        ));
        let bytes = code.to_bytes();
        // max_stack, max_locals, length, code, one handler, one attribute
        assert_eq!(&bytes[..8], &[0, 1, 0, 1, 0, 0, 0, 2]);
        assert_eq!(&bytes[8..10], &[0x2a, 0xb1]);
        assert_eq!(&bytes[10..12], &[0, 1]);
        assert_eq!(&bytes[20..22], &[0, 1]);
        assert_eq!(bytes.len(), 22 + 2 + 4 + 2 + 4);
    }

    #[test]
    fn markers_are_empty() {
        assert!(AttributeInfo::Deprecated.to_bytes().is_empty());
        assert_eq!(AttributeInfo::Synthetic.name(), "Synthetic");
    }
}

//! Trait-based serialization for classfile structures

use super::attribute::NamedAttribute;
use super::class::{ClassFile, FieldInfo, MethodInfo};
use super::constpool::{Constant, ConstantPool};
use std::io::Write;

/// An object which can be written into a classfile.
pub trait ClassfileWritable {
    /// Writes the bytes of this object into the given buffer.
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()>;

    /// Writes the bytes of this object into a newly created buffer.
    fn to_classfile_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write_to_classfile(&mut buffer);
        buffer
    }
}

impl<T: ClassfileWritable> ClassfileWritable for [T] {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&(self.len() as u16).to_be_bytes())?;
        for item in self {
            item.write_to_classfile(buffer)?;
        }
        Ok(())
    }
}

impl ClassfileWritable for ClassFile {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.magic.to_be_bytes())?;
        buffer.write_all(&self.minor_version.to_be_bytes())?;
        buffer.write_all(&self.major_version.to_be_bytes())?;
        self.constant_pool.write_to_classfile(buffer)?;
        buffer.write_all(&self.access_flags.to_be_bytes())?;
        buffer.write_all(&self.this_class.to_be_bytes())?;
        buffer.write_all(&self.super_class.to_be_bytes())?;
        buffer.write_all(&(self.interfaces.len() as u16).to_be_bytes())?;
        for interface in &self.interfaces {
            buffer.write_all(&interface.to_be_bytes())?;
        }
        self.fields.write_to_classfile(buffer)?;
        self.methods.write_to_classfile(buffer)?;
        self.attributes.write_to_classfile(buffer)
    }
}

impl ClassfileWritable for ConstantPool {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.count().to_be_bytes())?;
        for constant in &self.constants {
            constant.write_to_classfile(buffer)?;
        }
        Ok(())
    }
}

impl ClassfileWritable for Constant {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.to_bytes())
    }
}

impl ClassfileWritable for FieldInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.access_flags.to_be_bytes())?;
        buffer.write_all(&self.name_index.to_be_bytes())?;
        buffer.write_all(&self.descriptor_index.to_be_bytes())?;
        self.attributes.write_to_classfile(buffer)
    }
}

impl ClassfileWritable for MethodInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.access_flags.to_be_bytes())?;
        buffer.write_all(&self.name_index.to_be_bytes())?;
        buffer.write_all(&self.descriptor_index.to_be_bytes())?;
        self.attributes.write_to_classfile(buffer)
    }
}

impl ClassfileWritable for NamedAttribute {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        let payload = self.info.to_bytes();
        buffer.write_all(&self.name_index.to_be_bytes())?;
        buffer.write_all(&(payload.len() as u32).to_be_bytes())?;
        buffer.write_all(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::attribute::AttributeInfo;
    use crate::codegen::reader::read_class;
    use std::path::Path;

    #[test]
    fn minimal_class_reads_back() {
        let mut class = ClassFile::new();
        class.access_flags = 0x0021;
        class.this_class = class.constant_pool.add_class("p/A");
        class.super_class = class.constant_pool.add_class("java/lang/Object");
        let name_index = class.constant_pool.add_utf8("x");
        let descriptor_index = class.constant_pool.add_utf8("I");
        class.fields.push(FieldInfo { access_flags: 0x0002, name_index, descriptor_index, attributes: Vec::new() });
        let file_index = class.constant_pool.add_utf8("A.java");
        let source = NamedAttribute::new(&mut class.constant_pool, AttributeInfo::SourceFile { file_index });
        class.attributes.push(source);

        let bytes = class.to_classfile_bytes();
        let info = read_class(&bytes, Path::new("A.class")).unwrap();
        assert_eq!(info.name, "p.A");
        assert_eq!(info.super_name.as_deref(), Some("java.lang.Object"));
        assert_eq!(info.fields[0].name, "x");
        assert_eq!(info.source_file.as_deref(), Some("A.java"));
        assert_eq!((info.major_version, info.minor_version), (45, 3));
    }
}

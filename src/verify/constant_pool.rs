use crate::codegen::class::ClassFile;
use crate::codegen::constpool::Constant;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConstantPoolVerifyError {
    #[error("Invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Invalid constant pool index type {0}")]
    InvalidConstantPoolIndexType(u16),
}

pub type Result<T> = std::result::Result<T, ConstantPoolVerifyError>;

/// Resolve a pool index to its entry. Wide entries take two indices, so
/// the entry list is walked rather than indexed.
pub fn entry(class_file: &ClassFile, index: u16) -> Option<&Constant> {
    let mut next = 1u32;
    for constant in &class_file.constant_pool.constants {
        if next == index as u32 {
            return Some(constant);
        }
        next += constant.width();
        if next > index as u32 {
            return None;
        }
    }
    None
}

fn expect(class_file: &ClassFile, at: u16, index: u16, ok: fn(&Constant) -> bool) -> Result<()> {
    match entry(class_file, index) {
        Some(c) if ok(c) => Ok(()),
        Some(_) => Err(ConstantPoolVerifyError::InvalidConstantPoolIndexType(at)),
        None => Err(ConstantPoolVerifyError::InvalidConstantPoolIndex(at)),
    }
}

fn is_utf8(c: &Constant) -> bool {
    matches!(c, Constant::Utf8(_))
}

fn is_class(c: &Constant) -> bool {
    matches!(c, Constant::Class(_))
}

fn is_name_and_type(c: &Constant) -> bool {
    matches!(c, Constant::NameAndType(..))
}

/// Verify that every entry refers to entries of the right kind
pub fn verify(class_file: &ClassFile) -> Result<()> {
    let mut at = 1u32;
    for constant in &class_file.constant_pool.constants {
        let index = at as u16;
        match constant {
            Constant::Class(name) | Constant::String(name) => expect(class_file, index, *name, is_utf8)?,
            Constant::FieldRef(class, nat) | Constant::MethodRef(class, nat) | Constant::InterfaceMethodRef(class, nat) => {
                expect(class_file, index, *class, is_class)?;
                expect(class_file, index, *nat, is_name_and_type)?;
            }
            Constant::NameAndType(name, desc) => {
                expect(class_file, index, *name, is_utf8)?;
                expect(class_file, index, *desc, is_utf8)?;
            }
            _ => {}
        }
        at += constant.width();
    }
    Ok(())
}

/// Whether `index` names a Class entry
pub fn is_class_index(class_file: &ClassFile, index: u16) -> bool {
    entry(class_file, index).map_or(false, is_class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtab::ConstValue;

    #[test]
    fn wide_entries_shift_indices() {
        let mut class = ClassFile::new();
        class.constant_pool.add_value(&ConstValue::Long(1));
        let c = class.constant_pool.add_class("A");
        assert_eq!(c, 4);
        assert!(is_class_index(&class, c));
        assert!(entry(&class, 2).is_none());
        assert!(verify(&class).is_ok());
    }

    #[test]
    fn dangling_references_are_rejected() {
        let mut class = ClassFile::new();
        class.constant_pool.add(Constant::Class(9));
        assert_eq!(verify(&class), Err(ConstantPoolVerifyError::InvalidConstantPoolIndex(1)));
    }
}

use crate::codegen::attribute::AttributeInfo;
use crate::codegen::class::ClassFile;
use crate::codegen::constpool::Constant;
use crate::common::consts::*;

use super::constant_pool;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FieldVerifyError {
    #[error("Invalid constant pool index {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Invalid field access flags: 0x{0:04x}")]
    InvalidFieldAccessFlags(u16),
    #[error("ConstantValue on non-static field")]
    ConstantValueOnNonStatic,
    #[error("ConstantValue refers to invalid constant kind for field")]
    InvalidConstantValueKind,
}

pub type Result<T> = std::result::Result<T, FieldVerifyError>;

pub fn verify(class_file: &ClassFile) -> Result<()> {
    for field in &class_file.fields {
        for index in [field.name_index, field.descriptor_index] {
            if !matches!(constant_pool::entry(class_file, index), Some(Constant::Utf8(_))) {
                return Err(FieldVerifyError::InvalidConstantPoolIndex(index));
            }
        }
        verify_access_flags(class_file, field.access_flags)?;
        for attribute in &field.attributes {
            if let AttributeInfo::ConstantValue { value_index } = attribute.info {
                if field.access_flags & ACC_STATIC == 0 {
                    return Err(FieldVerifyError::ConstantValueOnNonStatic);
                }
                match constant_pool::entry(class_file, value_index) {
                    Some(
                        Constant::Integer(_)
                        | Constant::Long(_)
                        | Constant::Float(_)
                        | Constant::Double(_)
                        | Constant::String(_),
                    ) => {}
                    _ => return Err(FieldVerifyError::InvalidConstantValueKind),
                }
            }
        }
    }
    Ok(())
}

fn verify_access_flags(class_file: &ClassFile, flags: u16) -> Result<()> {
    let access = [ACC_PUBLIC, ACC_PRIVATE, ACC_PROTECTED].iter().filter(|&&bit| flags & bit != 0).count();
    if access > 1 {
        return Err(FieldVerifyError::InvalidFieldAccessFlags(flags));
    }
    if class_file.access_flags & ACC_INTERFACE != 0 {
        let must = ACC_PUBLIC | ACC_STATIC | ACC_FINAL;
        if flags & must != must || flags & (ACC_PRIVATE | ACC_PROTECTED | ACC_VOLATILE | ACC_TRANSIENT) != 0 {
            return Err(FieldVerifyError::InvalidFieldAccessFlags(flags));
        }
    } else if flags & ACC_FINAL != 0 && flags & ACC_VOLATILE != 0 {
        return Err(FieldVerifyError::InvalidFieldAccessFlags(flags));
    }
    Ok(())
}

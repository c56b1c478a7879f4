use crate::codegen::class::{ClassFile, MethodInfo};
use crate::common::consts::*;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum MethodAccessFlagsError {
    #[error("Invalid method access flags: 0x{0:04x}")]
    Invalid(u16),
}

pub type Result<T> = std::result::Result<T, MethodAccessFlagsError>;

/// Verify method access flags
pub fn verify(class_file: &ClassFile, method: &MethodInfo) -> Result<()> {
    let flags = method.access_flags;
    let access = [ACC_PUBLIC, ACC_PRIVATE, ACC_PROTECTED].iter().filter(|&&bit| flags & bit != 0).count();
    if access > 1 {
        return Err(MethodAccessFlagsError::Invalid(flags));
    }

    let class_is_interface = class_file.access_flags & ACC_INTERFACE != 0;
    if class_is_interface && flags & (ACC_PROTECTED | ACC_PRIVATE | ACC_FINAL | ACC_SYNCHRONIZED | ACC_NATIVE) != 0 {
        return Err(MethodAccessFlagsError::Invalid(flags));
    }

    if flags & ACC_ABSTRACT != 0
        && flags & (ACC_PRIVATE | ACC_STATIC | ACC_FINAL | ACC_SYNCHRONIZED | ACC_NATIVE | ACC_STRICT) != 0
    {
        return Err(MethodAccessFlagsError::Invalid(flags));
    }
    Ok(())
}

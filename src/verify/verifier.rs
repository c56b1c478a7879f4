use super::{class_access_flags, constant_pool, fields, method_access_flags};
use crate::codegen::class::ClassFile;

pub type VerifyResult<T> = Result<T, VerifyError>;

#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error(transparent)]
    ConstantPool(#[from] constant_pool::ConstantPoolVerifyError),
    #[error(transparent)]
    ClassAccessFlags(#[from] class_access_flags::ClassAccessFlagsError),
    #[error(transparent)]
    MethodAccessFlags(#[from] method_access_flags::MethodAccessFlagsError),
    #[error(transparent)]
    Field(#[from] fields::FieldVerifyError),
    #[error("this_class does not name a class: {0}")]
    ThisClass(u16),
    #[error("super_class does not name a class: {0}")]
    SuperClass(u16),
}

/// Verify the ClassFile by orchestrating all sub-verifiers
pub fn verify(class_file: &ClassFile) -> VerifyResult<()> {
    constant_pool::verify(class_file)?;
    class_access_flags::verify(class_file)?;
    if !constant_pool::is_class_index(class_file, class_file.this_class) {
        return Err(VerifyError::ThisClass(class_file.this_class));
    }
    // only java.lang.Object has no superclass
    if class_file.super_class != 0 && !constant_pool::is_class_index(class_file, class_file.super_class) {
        return Err(VerifyError::SuperClass(class_file.super_class));
    }
    fields::verify(class_file)?;
    for method in &class_file.methods {
        method_access_flags::verify(class_file, method)?;
    }
    Ok(())
}

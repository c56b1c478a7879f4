use crate::codegen::class::ClassFile;
use crate::common::consts::*;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ClassAccessFlagsError {
    #[error("Invalid class access flags: 0x{0:04x}")]
    Invalid(u16),
    #[error("Interface {0} in InnerClasses is not abstract and static: 0x{1:04x}")]
    InnerInterface(String, u16),
    #[error("Member {0} of an interface in InnerClasses is not public and static: 0x{1:04x}")]
    InterfaceMember(String, u16),
}

pub type Result<T> = std::result::Result<T, ClassAccessFlagsError>;

/// Verify the top-level access flags of a class file
pub fn verify(class_file: &ClassFile) -> Result<()> {
    let flags = class_file.access_flags;
    let has = |bit: u16| flags & bit != 0;

    if has(ACC_INTERFACE) {
        // interfaces are abstract and never final or super
        if !has(ACC_ABSTRACT) || has(ACC_FINAL) || has(ACC_SUPER) {
            return Err(ClassAccessFlagsError::Invalid(flags));
        }
    } else if has(ACC_FINAL) && has(ACC_ABSTRACT) {
        return Err(ClassAccessFlagsError::Invalid(flags));
    }
    if flags & !(ACC_PUBLIC | ACC_FINAL | ACC_SUPER | ACC_INTERFACE | ACC_ABSTRACT) != 0 {
        return Err(ClassAccessFlagsError::Invalid(flags));
    }
    Ok(())
}

/// Verify the flags of one InnerClasses row. Nested interfaces are
/// implicitly abstract and static; members of interfaces are implicitly
/// public and static.
pub fn verify_inner(name: &str, flags: u16, member_of_interface: bool) -> Result<()> {
    if flags & ACC_INTERFACE != 0 && flags & (ACC_ABSTRACT | ACC_STATIC) != ACC_ABSTRACT | ACC_STATIC {
        return Err(ClassAccessFlagsError::InnerInterface(name.to_string(), flags));
    }
    if member_of_interface && flags & (ACC_PUBLIC | ACC_STATIC) != ACC_PUBLIC | ACC_STATIC {
        return Err(ClassAccessFlagsError::InterfaceMember(name.to_string(), flags));
    }
    let access = [ACC_PUBLIC, ACC_PRIVATE, ACC_PROTECTED].iter().filter(|&&bit| flags & bit != 0).count();
    if access > 1 {
        return Err(ClassAccessFlagsError::Invalid(flags));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interfaces_must_be_abstract() {
        let mut class = ClassFile::new();
        class.access_flags = ACC_INTERFACE;
        assert!(verify(&class).is_err());
        class.access_flags = ACC_INTERFACE | ACC_ABSTRACT | ACC_PUBLIC;
        assert!(verify(&class).is_ok());
        class.access_flags = ACC_SUPER | ACC_FINAL | ACC_ABSTRACT;
        assert!(verify(&class).is_err());
    }

    #[test]
    fn inner_class_rows() {
        assert!(verify_inner("A$I", ACC_INTERFACE | ACC_ABSTRACT | ACC_STATIC, false).is_ok());
        assert!(matches!(
            verify_inner("A$I", ACC_INTERFACE | ACC_ABSTRACT, false),
            Err(ClassAccessFlagsError::InnerInterface(..))
        ));
        assert!(matches!(
            verify_inner("I$C", ACC_STATIC, true),
            Err(ClassAccessFlagsError::InterfaceMember(..))
        ));
        assert!(verify_inner("I$C", ACC_PUBLIC | ACC_STATIC, true).is_ok());
        assert!(verify_inner("A$B", ACC_PUBLIC | ACC_PRIVATE, false).is_err());
    }
}

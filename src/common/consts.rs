// Modifier bits as carried on class and member definitions.
// The low 12 bits coincide with the class-file access flags.

pub const M_PUBLIC: u32 = 0x0001;
pub const M_PRIVATE: u32 = 0x0002;
pub const M_PROTECTED: u32 = 0x0004;
pub const M_STATIC: u32 = 0x0008;
pub const M_FINAL: u32 = 0x0010;
pub const M_SYNCHRONIZED: u32 = 0x0020;
pub const M_VOLATILE: u32 = 0x0040;
pub const M_TRANSIENT: u32 = 0x0080;
pub const M_NATIVE: u32 = 0x0100;
pub const M_INTERFACE: u32 = 0x0200;
pub const M_ABSTRACT: u32 = 0x0400;
pub const M_STRICTFP: u32 = 0x0800;

// Compiler-internal bits, never written to a class file
pub const M_ANONYMOUS: u32 = 0x0001_0000;
pub const M_LOCAL: u32 = 0x0002_0000;
pub const M_DEPRECATED: u32 = 0x0004_0000;
pub const M_SYNTHETIC: u32 = 0x0008_0000;

/// Access bits only
pub const MM_ACCESS: u32 = M_PUBLIC | M_PRIVATE | M_PROTECTED;
/// Bits a class file records for a class
pub const MM_CLASS: u32 = M_PUBLIC | M_INTERFACE | M_FINAL | M_ABSTRACT;
/// Bits a class file records for a field
pub const MM_FIELD: u32 = M_PUBLIC | M_PRIVATE | M_PROTECTED | M_FINAL | M_STATIC | M_TRANSIENT | M_VOLATILE;
/// Bits a class file records for a method
pub const MM_METHOD: u32 = M_PUBLIC | M_PRIVATE | M_PROTECTED | M_FINAL | M_STATIC
    | M_SYNCHRONIZED | M_ABSTRACT | M_NATIVE | M_STRICTFP;
/// Bits an InnerClasses row records
pub const ACCM_INNERCLASS: u32 = M_PUBLIC | M_PRIVATE | M_PROTECTED | M_STATIC | M_FINAL | M_INTERFACE | M_ABSTRACT;

/// Modifiers legal on a class declaration in source
pub const MM_SOURCE_CLASS: u32 = MM_ACCESS | M_STATIC | M_FINAL | M_ABSTRACT | M_STRICTFP | M_INTERFACE;
/// Modifiers legal on a field declaration in source
pub const MM_SOURCE_FIELD: u32 = MM_ACCESS | M_STATIC | M_FINAL | M_TRANSIENT | M_VOLATILE;
/// Modifiers legal on a method declaration in source
pub const MM_SOURCE_METHOD: u32 = MM_ACCESS | M_STATIC | M_FINAL | M_ABSTRACT | M_NATIVE | M_SYNCHRONIZED | M_STRICTFP;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_VOLATILE: u16 = 0x0040;
pub const ACC_TRANSIENT: u16 = 0x0080;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_STRICT: u16 = 0x0800;
pub const ACC_SYNTHETIC: u16 = 0x1000;

// Source positions pack the line above this many bits and the byte offset below.
pub const WHEREOFFSETBITS: u32 = 32;
pub const MAXFILESIZE: u64 = (1u64 << WHEREOFFSETBITS) - 1;

// Synthetic name prefixes
pub const PREFIX_ACCESS: &str = "access$";
pub const PREFIX_CLASS: &str = "class$";
pub const PREFIX_ARRAY: &str = "array$";
pub const PREFIX_THIS: &str = "this$";
pub const PREFIX_VAL: &str = "val$";

pub const INIT_NAME: &str = "<init>";
pub const CLINIT_NAME: &str = "<clinit>";

pub const JAVA_LANG: &str = "java.lang";
pub const JAVA_LANG_OBJECT: &str = "java.lang.Object";
pub const JAVA_LANG_STRING: &str = "java.lang.String";
pub const JAVA_LANG_CLASS: &str = "java.lang.Class";
pub const JAVA_LANG_THROWABLE: &str = "java.lang.Throwable";
pub const JAVA_LANG_EXCEPTION: &str = "java.lang.Exception";
pub const JAVA_LANG_RUNTIME_EXCEPTION: &str = "java.lang.RuntimeException";
pub const JAVA_LANG_ERROR: &str = "java.lang.Error";
pub const JAVA_LANG_CLASS_NOT_FOUND: &str = "java.lang.ClassNotFoundException";
pub const JAVA_LANG_NO_CLASS_DEF_FOUND: &str = "java.lang.NoClassDefFoundError";
pub const JAVA_LANG_STRING_BUFFER: &str = "java.lang.StringBuffer";

// Guards against runaway recursion in resolution and attribution
pub const MAX_RESOLVE_DEPTH: usize = 512;
pub const MAX_EXPR_DEPTH: usize = 1_000;

/// Render modifier bits the way diagnostics spell them
pub fn modifier_names(mods: u32) -> String {
    const NAMES: &[(u32, &str)] = &[
        (M_PUBLIC, "public"),
        (M_PRIVATE, "private"),
        (M_PROTECTED, "protected"),
        (M_STATIC, "static"),
        (M_FINAL, "final"),
        (M_SYNCHRONIZED, "synchronized"),
        (M_VOLATILE, "volatile"),
        (M_TRANSIENT, "transient"),
        (M_NATIVE, "native"),
        (M_ABSTRACT, "abstract"),
        (M_STRICTFP, "strictfp"),
    ];
    NAMES
        .iter()
        .filter(|(bit, _)| mods & bit != 0)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_file_bits_line_up_with_modifiers() {
        assert_eq!(M_PUBLIC as u16, ACC_PUBLIC);
        assert_eq!(M_ABSTRACT as u16, ACC_ABSTRACT);
        assert_eq!(M_INTERFACE as u16, ACC_INTERFACE);
        assert_eq!(MM_CLASS & (M_PRIVATE | M_PROTECTED), 0);
    }

    #[test]
    fn modifier_names_in_source_order() {
        assert_eq!(modifier_names(M_STATIC | M_PUBLIC | M_FINAL), "public static final");
        assert_eq!(modifier_names(0), "");
    }
}

//! Generic classfile-specific definitions

/// Header of Java class file (magic number)
pub const MAGIC: u32 = 0xCAFEBABE;

/// Class-file major versions of the targets this compiler writes
pub mod major_versions {
    pub const JAVA_1_1: u16 = 45;
    pub const JAVA_1_2: u16 = 46;
    pub const JAVA_1_3: u16 = 47;
    pub const JAVA_1_4: u16 = 48;
    pub const JAVA_5_0: u16 = 49;
}

/// Attribute names
pub mod attribute_names {
    pub const CODE: &str = "Code";
    pub const CONSTANT_VALUE: &str = "ConstantValue";
    pub const EXCEPTIONS: &str = "Exceptions";
    pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
    pub const SOURCE_FILE: &str = "SourceFile";
    pub const DEPRECATED: &str = "Deprecated";
    pub const SYNTHETIC: &str = "Synthetic";
    pub const INNER_CLASSES: &str = "InnerClasses";
}

/// Largest method body the `Code` attribute can describe
pub const MAX_CODE_LENGTH: usize = 65535;

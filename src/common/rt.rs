//! Bootstrap class descriptions
//!
//! When no class path entry supplies `java.lang.Object` and friends, the
//! loader defines them from these descriptions instead. Each member is one
//! line: modifiers, name, descriptor, then optional `throws A,B` and
//! `= constant`.

use crate::common::consts::*;

pub struct Builtin {
    pub name: &'static str,
    pub modifiers: u32,
    pub super_name: Option<&'static str>,
    pub interfaces: &'static [&'static str],
    members: &'static [&'static str],
}

/// One parsed member line
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinMember<'a> {
    pub modifiers: u32,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub throws: Vec<&'a str>,
    pub constant: Option<&'a str>,
}

impl Builtin {
    pub fn members(&self) -> impl Iterator<Item = BuiltinMember<'static>> + '_ {
        self.members.iter().filter_map(|line| parse_member(line))
    }
}

fn parse_member(line: &'static str) -> Option<BuiltinMember<'static>> {
    let mut words = line.split_whitespace().peekable();
    let mut modifiers = 0;
    while let Some(word) = words.peek() {
        let bit = match *word {
            "public" => M_PUBLIC,
            "protected" => M_PROTECTED,
            "private" => M_PRIVATE,
            "static" => M_STATIC,
            "final" => M_FINAL,
            "native" => M_NATIVE,
            "abstract" => M_ABSTRACT,
            "synchronized" => M_SYNCHRONIZED,
            _ => break,
        };
        modifiers |= bit;
        words.next();
    }
    let name = words.next()?;
    let descriptor = words.next()?;
    let mut throws = Vec::new();
    let mut constant = None;
    while let Some(word) = words.next() {
        match word {
            "throws" => {
                if let Some(list) = words.next() {
                    throws.extend(list.split(','));
                }
            }
            "=" => constant = words.next(),
            _ => return None,
        }
    }
    Some(BuiltinMember { modifiers, name, descriptor, throws, constant })
}

const PUBLIC_CLASS: u32 = M_PUBLIC;
const PUBLIC_FINAL: u32 = M_PUBLIC | M_FINAL;
const PUBLIC_ABSTRACT: u32 = M_PUBLIC | M_ABSTRACT;
const PUBLIC_INTERFACE: u32 = M_PUBLIC | M_INTERFACE | M_ABSTRACT;

const OBJECT: Option<&str> = Some(JAVA_LANG_OBJECT);

static BUILTINS: &[Builtin] = &[
    Builtin {
        name: JAVA_LANG_OBJECT,
        modifiers: PUBLIC_CLASS,
        super_name: None,
        interfaces: &[],
        members: &[
            "public <init> ()V",
            "public final native getClass ()Ljava/lang/Class;",
            "public native hashCode ()I",
            "public equals (Ljava/lang/Object;)Z",
            "protected native clone ()Ljava/lang/Object; throws java.lang.CloneNotSupportedException",
            "public toString ()Ljava/lang/String;",
            "public final native notify ()V",
            "public final native notifyAll ()V",
            "public final wait ()V throws java.lang.InterruptedException",
            "public final native wait (J)V throws java.lang.InterruptedException",
            "protected finalize ()V throws java.lang.Throwable",
        ],
    },
    Builtin {
        name: JAVA_LANG_STRING,
        modifiers: PUBLIC_FINAL,
        super_name: OBJECT,
        interfaces: &["java.io.Serializable"],
        members: &[
            "public <init> ()V",
            "public <init> (Ljava/lang/String;)V",
            "public <init> ([C)V",
            "public length ()I",
            "public charAt (I)C",
            "public equals (Ljava/lang/Object;)Z",
            "public equalsIgnoreCase (Ljava/lang/String;)Z",
            "public compareTo (Ljava/lang/String;)I",
            "public hashCode ()I",
            "public toString ()Ljava/lang/String;",
            "public indexOf (I)I",
            "public indexOf (Ljava/lang/String;)I",
            "public substring (I)Ljava/lang/String;",
            "public substring (II)Ljava/lang/String;",
            "public concat (Ljava/lang/String;)Ljava/lang/String;",
            "public startsWith (Ljava/lang/String;)Z",
            "public endsWith (Ljava/lang/String;)Z",
            "public trim ()Ljava/lang/String;",
            "public toUpperCase ()Ljava/lang/String;",
            "public toLowerCase ()Ljava/lang/String;",
            "public toCharArray ()[C",
            "public native intern ()Ljava/lang/String;",
            "public static valueOf (Ljava/lang/Object;)Ljava/lang/String;",
            "public static valueOf (Z)Ljava/lang/String;",
            "public static valueOf (C)Ljava/lang/String;",
            "public static valueOf (I)Ljava/lang/String;",
            "public static valueOf (J)Ljava/lang/String;",
            "public static valueOf (F)Ljava/lang/String;",
            "public static valueOf (D)Ljava/lang/String;",
        ],
    },
    Builtin {
        name: JAVA_LANG_STRING_BUFFER,
        modifiers: PUBLIC_FINAL,
        super_name: OBJECT,
        interfaces: &["java.io.Serializable"],
        members: &[
            "public <init> ()V",
            "public <init> (I)V",
            "public <init> (Ljava/lang/String;)V",
            "public synchronized length ()I",
            "public synchronized append (Ljava/lang/Object;)Ljava/lang/StringBuffer;",
            "public synchronized append (Ljava/lang/String;)Ljava/lang/StringBuffer;",
            "public synchronized append (Z)Ljava/lang/StringBuffer;",
            "public synchronized append (C)Ljava/lang/StringBuffer;",
            "public synchronized append (I)Ljava/lang/StringBuffer;",
            "public synchronized append (J)Ljava/lang/StringBuffer;",
            "public synchronized append (F)Ljava/lang/StringBuffer;",
            "public synchronized append (D)Ljava/lang/StringBuffer;",
            "public toString ()Ljava/lang/String;",
        ],
    },
    Builtin {
        name: JAVA_LANG_CLASS,
        modifiers: PUBLIC_FINAL,
        super_name: OBJECT,
        interfaces: &["java.io.Serializable"],
        members: &[
            "public static forName (Ljava/lang/String;)Ljava/lang/Class; throws java.lang.ClassNotFoundException",
            "public native getName ()Ljava/lang/String;",
            "public native isInstance (Ljava/lang/Object;)Z",
            "public native isInterface ()Z",
            "public native getSuperclass ()Ljava/lang/Class;",
            "public toString ()Ljava/lang/String;",
        ],
    },
    Builtin {
        name: "java.lang.System",
        modifiers: PUBLIC_FINAL,
        super_name: OBJECT,
        interfaces: &[],
        members: &[
            "public static final out Ljava/io/PrintStream;",
            "public static final err Ljava/io/PrintStream;",
            "public static native currentTimeMillis ()J",
            "public static native arraycopy (Ljava/lang/Object;ILjava/lang/Object;II)V",
            "public static exit (I)V",
            "public static getProperty (Ljava/lang/String;)Ljava/lang/String;",
            "public static native identityHashCode (Ljava/lang/Object;)I",
        ],
    },
    Builtin {
        name: "java.io.PrintStream",
        modifiers: PUBLIC_CLASS,
        super_name: OBJECT,
        interfaces: &[],
        members: &[
            "public flush ()V",
            "public close ()V",
            "public println ()V",
            "public println (Ljava/lang/Object;)V",
            "public println (Ljava/lang/String;)V",
            "public println (Z)V",
            "public println (C)V",
            "public println (I)V",
            "public println (J)V",
            "public println (F)V",
            "public println (D)V",
            "public print (Ljava/lang/Object;)V",
            "public print (Ljava/lang/String;)V",
            "public print (Z)V",
            "public print (C)V",
            "public print (I)V",
            "public print (J)V",
            "public print (F)V",
            "public print (D)V",
        ],
    },
    Builtin {
        name: "java.lang.Math",
        modifiers: PUBLIC_FINAL,
        super_name: OBJECT,
        interfaces: &[],
        members: &[
            "public static abs (I)I",
            "public static abs (J)J",
            "public static abs (D)D",
            "public static max (II)I",
            "public static max (JJ)J",
            "public static max (DD)D",
            "public static min (II)I",
            "public static min (JJ)J",
            "public static min (DD)D",
            "public static native sqrt (D)D",
        ],
    },
    Builtin {
        name: JAVA_LANG_THROWABLE,
        modifiers: PUBLIC_CLASS,
        super_name: OBJECT,
        interfaces: &["java.io.Serializable"],
        members: &[
            "public <init> ()V",
            "public <init> (Ljava/lang/String;)V",
            "public getMessage ()Ljava/lang/String;",
            "public toString ()Ljava/lang/String;",
            "public printStackTrace ()V",
        ],
    },
    Builtin {
        name: JAVA_LANG_EXCEPTION,
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_THROWABLE),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: JAVA_LANG_ERROR,
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_THROWABLE),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: JAVA_LANG_RUNTIME_EXCEPTION,
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.LinkageError",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_ERROR),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: JAVA_LANG_NO_CLASS_DEF_FOUND,
        modifiers: PUBLIC_CLASS,
        super_name: Some("java.lang.LinkageError"),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: JAVA_LANG_CLASS_NOT_FOUND,
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.CloneNotSupportedException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.InterruptedException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.io.IOException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.IllegalStateException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_RUNTIME_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.IllegalArgumentException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_RUNTIME_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.NumberFormatException",
        modifiers: PUBLIC_CLASS,
        super_name: Some("java.lang.IllegalArgumentException"),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.NullPointerException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_RUNTIME_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.ArithmeticException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_RUNTIME_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.ClassCastException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_RUNTIME_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.IndexOutOfBoundsException",
        modifiers: PUBLIC_CLASS,
        super_name: Some(JAVA_LANG_RUNTIME_EXCEPTION),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.lang.ArrayIndexOutOfBoundsException",
        modifiers: PUBLIC_CLASS,
        super_name: Some("java.lang.IndexOutOfBoundsException"),
        interfaces: &[],
        members: &["public <init> ()V", "public <init> (I)V", "public <init> (Ljava/lang/String;)V"],
    },
    Builtin {
        name: "java.io.Serializable",
        modifiers: PUBLIC_INTERFACE,
        super_name: OBJECT,
        interfaces: &[],
        members: &[],
    },
    Builtin {
        name: "java.lang.Cloneable",
        modifiers: PUBLIC_INTERFACE,
        super_name: OBJECT,
        interfaces: &[],
        members: &[],
    },
    Builtin {
        name: "java.lang.Runnable",
        modifiers: PUBLIC_INTERFACE,
        super_name: OBJECT,
        interfaces: &[],
        members: &["public abstract run ()V"],
    },
    Builtin {
        name: "java.lang.Number",
        modifiers: PUBLIC_ABSTRACT,
        super_name: OBJECT,
        interfaces: &["java.io.Serializable"],
        members: &[
            "public <init> ()V",
            "public abstract intValue ()I",
            "public abstract longValue ()J",
            "public abstract floatValue ()F",
            "public abstract doubleValue ()D",
        ],
    },
    Builtin {
        name: "java.lang.Integer",
        modifiers: PUBLIC_FINAL,
        super_name: Some("java.lang.Number"),
        interfaces: &[],
        members: &[
            "public static final TYPE Ljava/lang/Class;",
            "public static final MIN_VALUE I = -2147483648",
            "public static final MAX_VALUE I = 2147483647",
            "public <init> (I)V",
            "public intValue ()I",
            "public longValue ()J",
            "public floatValue ()F",
            "public doubleValue ()D",
            "public static parseInt (Ljava/lang/String;)I throws java.lang.NumberFormatException",
            "public static valueOf (Ljava/lang/String;)Ljava/lang/Integer; throws java.lang.NumberFormatException",
            "public static toString (I)Ljava/lang/String;",
        ],
    },
    Builtin {
        name: "java.lang.Long",
        modifiers: PUBLIC_FINAL,
        super_name: Some("java.lang.Number"),
        interfaces: &[],
        members: &[
            "public static final TYPE Ljava/lang/Class;",
            "public <init> (J)V",
            "public intValue ()I",
            "public longValue ()J",
            "public floatValue ()F",
            "public doubleValue ()D",
            "public static parseLong (Ljava/lang/String;)J throws java.lang.NumberFormatException",
        ],
    },
    Builtin {
        name: "java.lang.Float",
        modifiers: PUBLIC_FINAL,
        super_name: Some("java.lang.Number"),
        interfaces: &[],
        members: &[
            "public static final TYPE Ljava/lang/Class;",
            "public <init> (F)V",
            "public intValue ()I",
            "public longValue ()J",
            "public floatValue ()F",
            "public doubleValue ()D",
        ],
    },
    Builtin {
        name: "java.lang.Double",
        modifiers: PUBLIC_FINAL,
        super_name: Some("java.lang.Number"),
        interfaces: &[],
        members: &[
            "public static final TYPE Ljava/lang/Class;",
            "public <init> (D)V",
            "public intValue ()I",
            "public longValue ()J",
            "public floatValue ()F",
            "public doubleValue ()D",
        ],
    },
    Builtin {
        name: "java.lang.Short",
        modifiers: PUBLIC_FINAL,
        super_name: Some("java.lang.Number"),
        interfaces: &[],
        members: &["public static final TYPE Ljava/lang/Class;", "public <init> (S)V"],
    },
    Builtin {
        name: "java.lang.Byte",
        modifiers: PUBLIC_FINAL,
        super_name: Some("java.lang.Number"),
        interfaces: &[],
        members: &["public static final TYPE Ljava/lang/Class;", "public <init> (B)V"],
    },
    Builtin {
        name: "java.lang.Character",
        modifiers: PUBLIC_FINAL,
        super_name: OBJECT,
        interfaces: &["java.io.Serializable"],
        members: &["public static final TYPE Ljava/lang/Class;", "public <init> (C)V", "public charValue ()C"],
    },
    Builtin {
        name: "java.lang.Boolean",
        modifiers: PUBLIC_FINAL,
        super_name: OBJECT,
        interfaces: &["java.io.Serializable"],
        members: &["public static final TYPE Ljava/lang/Class;", "public <init> (Z)V", "public booleanValue ()Z"],
    },
    Builtin {
        name: "java.lang.Void",
        modifiers: PUBLIC_FINAL,
        super_name: OBJECT,
        interfaces: &[],
        members: &["public static final TYPE Ljava/lang/Class;"],
    },
];

/// Description of a bootstrap class, if there is one
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// Whether a package is one the descriptions populate
pub fn is_builtin_package(package: &str) -> bool {
    BUILTINS.iter().any(|b| crate::symtab::package_of(b.name) == package)
}

/// Wrapper class whose `TYPE` field holds the class object of a primitive
pub fn wrapper_class(primitive: &crate::symtab::Type) -> Option<&'static str> {
    use crate::symtab::Type;
    Some(match primitive {
        Type::Boolean => "java.lang.Boolean",
        Type::Byte => "java.lang.Byte",
        Type::Char => "java.lang.Character",
        Type::Short => "java.lang.Short",
        Type::Int => "java.lang.Integer",
        Type::Long => "java.lang.Long",
        Type::Float => "java.lang.Float",
        Type::Double => "java.lang.Double",
        Type::Void => "java.lang.Void",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_lines_parse() {
        let class = lookup(JAVA_LANG_CLASS).unwrap();
        let for_name = class.members().find(|m| m.name == "forName").unwrap();
        assert_eq!(for_name.modifiers, M_PUBLIC | M_STATIC);
        assert_eq!(for_name.descriptor, "(Ljava/lang/String;)Ljava/lang/Class;");
        assert_eq!(for_name.throws, vec![JAVA_LANG_CLASS_NOT_FOUND]);

        let integer = lookup("java.lang.Integer").unwrap();
        let max = integer.members().find(|m| m.name == "MAX_VALUE").unwrap();
        assert_eq!(max.constant, Some("2147483647"));
    }

    #[test]
    fn every_line_is_well_formed() {
        for builtin in BUILTINS {
            assert_eq!(builtin.members().count(), builtin.members.len(), "{}", builtin.name);
            if let Some(sup) = builtin.super_name {
                assert!(lookup(sup).is_some(), "{} extends unknown {}", builtin.name, sup);
            }
            assert_eq!(BUILTINS.iter().filter(|b| b.name == builtin.name).count(), 1, "{}", builtin.name);
            for &i in builtin.interfaces {
                assert!(lookup(i).is_some(), "{} implements unknown {}", builtin.name, i);
            }
        }
    }

    #[test]
    fn packages() {
        assert!(is_builtin_package("java.lang"));
        assert!(is_builtin_package("java.io"));
        assert!(!is_builtin_package("java.util"));
    }
}

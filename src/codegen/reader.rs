//! Class file reader
//!
//! Reads the parts of a class file the loader needs to build a binary
//! definition: names, flags, member signatures, constant values, declared
//! exceptions and the `SourceFile`, `InnerClasses` and `Deprecated`
//! attributes. Code is kept as raw bytes and never decoded.

use crate::common::error::{Error, Result};
use crate::symtab::ConstValue;
use std::path::Path;

use super::defs::MAGIC;

#[derive(Debug, Clone)]
enum PoolEntry {
    Empty,
    Utf8(String),
    Int(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    Str(u16),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub constant: Option<ConstValue>,
    pub synthetic: bool,
    pub deprecated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    /// Binary names of the declared exceptions
    pub exceptions: Vec<String>,
    pub code: Option<CodeEntry>,
    pub synthetic: bool,
    pub deprecated: bool,
}

/// The `Code` attribute of a method
#[derive(Debug, Clone, PartialEq)]
pub struct CodeEntry {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytes: Vec<u8>,
    pub handlers: u16,
    /// Names of the nested attributes, in file order
    pub attributes: Vec<String>,
}

/// One row of the InnerClasses attribute, names in binary form
#[derive(Debug, Clone, PartialEq)]
pub struct InnerClassEntry {
    pub inner: String,
    pub outer: Option<String>,
    pub simple_name: Option<String>,
    pub access_flags: u16,
}

#[derive(Debug, Clone)]
pub struct ClassFileInfo {
    pub minor_version: u16,
    pub major_version: u16,
    /// Binary name, `p.A$B`
    pub name: String,
    pub access_flags: u16,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MethodEntry>,
    pub source_file: Option<String>,
    pub inner_classes: Vec<InnerClassEntry>,
    pub deprecated: bool,
    /// Names of the class attributes, in file order
    pub attributes: Vec<String>,
    /// Every CONSTANT_Class entry, as binary names or array descriptors
    pub class_refs: Vec<String>,
}

impl ClassFileInfo {
    /// InnerClasses row describing this class itself
    pub fn self_entry(&self) -> Option<&InnerClassEntry> {
        self.inner_classes.iter().find(|e| e.inner == self.name)
    }

    /// Referenced classes other than this one, arrays excluded
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = self
            .class_refs
            .iter()
            .filter(|n| !n.starts_with('[') && **n != self.name)
            .cloned()
            .collect();
        deps.dedup();
        deps
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> ByteReader<'a> {
    fn truncated(&self) -> Error {
        Error::class_format(self.path, format!("truncated at byte {}", self.pos))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(self.truncated());
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u1(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u8(&mut self) -> Result<u64> {
        let hi = self.u4()? as u64;
        let lo = self.u4()? as u64;
        Ok((hi << 32) | lo)
    }
}

struct Pool<'a> {
    entries: Vec<PoolEntry>,
    path: &'a Path,
}

impl<'a> Pool<'a> {
    fn bad(&self, index: u16, what: &str) -> Error {
        Error::class_format(self.path, format!("constant {} is not {}", index, what))
    }

    fn utf8(&self, index: u16) -> Result<&str> {
        match self.entries.get(index as usize) {
            Some(PoolEntry::Utf8(s)) => Ok(s),
            _ => Err(self.bad(index, "a UTF-8 string")),
        }
    }

    /// Binary name of a CONSTANT_Class entry
    fn class_name(&self, index: u16) -> Result<String> {
        match self.entries.get(index as usize) {
            Some(PoolEntry::Class(name)) => Ok(self.utf8(*name)?.replace('/', ".")),
            _ => Err(self.bad(index, "a class")),
        }
    }

    fn optional_class(&self, index: u16) -> Result<Option<String>> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    fn constant(&self, index: u16) -> Result<ConstValue> {
        match self.entries.get(index as usize) {
            Some(PoolEntry::Int(v)) => Ok(ConstValue::Int(*v)),
            Some(PoolEntry::Float(v)) => Ok(ConstValue::Float(*v)),
            Some(PoolEntry::Long(v)) => Ok(ConstValue::Long(*v)),
            Some(PoolEntry::Double(v)) => Ok(ConstValue::Double(*v)),
            Some(PoolEntry::Str(s)) => Ok(ConstValue::Str(self.utf8(*s)?.to_string())),
            _ => Err(self.bad(index, "a constant value")),
        }
    }
}

/// Decode modified UTF-8 as written in class files
fn decode_utf8(bytes: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i] as u16;
        if b & 0x80 == 0 {
            units.push(b);
            i += 1;
        } else if b & 0xe0 == 0xc0 {
            let b2 = *bytes.get(i + 1)? as u16;
            units.push(((b & 0x1f) << 6) | (b2 & 0x3f));
            i += 2;
        } else if b & 0xf0 == 0xe0 {
            let b2 = *bytes.get(i + 1)? as u16;
            let b3 = *bytes.get(i + 2)? as u16;
            units.push(((b & 0x0f) << 12) | ((b2 & 0x3f) << 6) | (b3 & 0x3f));
            i += 3;
        } else {
            return None;
        }
    }
    Some(String::from_utf16_lossy(&units))
}

/// Parse a class file image read from `path`
pub fn read_class(bytes: &[u8], path: &Path) -> Result<ClassFileInfo> {
    let mut r = ByteReader { bytes, pos: 0, path };
    if r.u4()? != MAGIC {
        return Err(Error::class_format(path, "bad magic number"));
    }
    let minor_version = r.u2()?;
    let major_version = r.u2()?;

    let count = r.u2()? as usize;
    let mut entries = vec![PoolEntry::Empty; count.max(1)];
    let mut class_entries = Vec::new();
    let mut i = 1;
    while i < count {
        let tag = r.u1()?;
        let entry = match tag {
            1 => {
                let len = r.u2()? as usize;
                let raw = r.take(len)?;
                let text = decode_utf8(raw).ok_or_else(|| Error::class_format(path, "malformed UTF-8 constant"))?;
                PoolEntry::Utf8(text)
            }
            3 => PoolEntry::Int(r.u4()? as i32),
            4 => PoolEntry::Float(r.u4()?),
            5 => PoolEntry::Long(r.u8()? as i64),
            6 => PoolEntry::Double(r.u8()?),
            7 => {
                let name = r.u2()?;
                class_entries.push(name);
                PoolEntry::Class(name)
            }
            8 => PoolEntry::Str(r.u2()?),
            9..=12 => {
                r.take(4)?;
                PoolEntry::Other
            }
            15 => {
                r.take(3)?;
                PoolEntry::Other
            }
            16 => {
                r.take(2)?;
                PoolEntry::Other
            }
            17 | 18 => {
                r.take(4)?;
                PoolEntry::Other
            }
            other => return Err(Error::class_format(path, format!("unknown constant tag {}", other))),
        };
        let wide = matches!(entry, PoolEntry::Long(_) | PoolEntry::Double(_));
        entries[i] = entry;
        i += if wide { 2 } else { 1 };
    }
    let pool = Pool { entries, path };

    let mut class_refs = Vec::new();
    for name in class_entries {
        let n = pool.utf8(name)?;
        class_refs.push(if n.starts_with('[') { n.to_string() } else { n.replace('/', ".") });
    }

    let access_flags = r.u2()?;
    let name = pool.class_name(r.u2()?)?;
    let super_name = pool.optional_class(r.u2()?)?;
    let interface_count = r.u2()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(r.u2()?)?);
    }

    let mut fields = Vec::new();
    for _ in 0..r.u2()? {
        let access_flags = r.u2()?;
        let name = pool.utf8(r.u2()?)?.to_string();
        let descriptor = pool.utf8(r.u2()?)?.to_string();
        let mut field = FieldEntry { access_flags, name, descriptor, constant: None, synthetic: false, deprecated: false };
        for _ in 0..r.u2()? {
            let attr = pool.utf8(r.u2()?)?.to_string();
            let len = r.u4()? as usize;
            let body = r.take(len)?;
            match attr.as_str() {
                "ConstantValue" if len == 2 => {
                    field.constant = Some(pool.constant(u16::from_be_bytes([body[0], body[1]]))?);
                }
                "Synthetic" => field.synthetic = true,
                "Deprecated" => field.deprecated = true,
                _ => {}
            }
        }
        fields.push(field);
    }

    let mut methods = Vec::new();
    for _ in 0..r.u2()? {
        let access_flags = r.u2()?;
        let name = pool.utf8(r.u2()?)?.to_string();
        let descriptor = pool.utf8(r.u2()?)?.to_string();
        let mut method =
            MethodEntry { access_flags, name, descriptor, exceptions: Vec::new(), code: None, synthetic: false, deprecated: false };
        for _ in 0..r.u2()? {
            let attr = pool.utf8(r.u2()?)?.to_string();
            let len = r.u4()? as usize;
            let body = r.take(len)?;
            match attr.as_str() {
                "Exceptions" => {
                    let mut sub = ByteReader { bytes: body, pos: 0, path };
                    for _ in 0..sub.u2()? {
                        method.exceptions.push(pool.class_name(sub.u2()?)?);
                    }
                }
                "Code" => method.code = Some(read_code(body, &pool, path)?),
                "Synthetic" => method.synthetic = true,
                "Deprecated" => method.deprecated = true,
                _ => {}
            }
        }
        methods.push(method);
    }

    let mut source_file = None;
    let mut inner_classes = Vec::new();
    let mut deprecated = false;
    let mut attributes = Vec::new();
    for _ in 0..r.u2()? {
        let attr = pool.utf8(r.u2()?)?.to_string();
        attributes.push(attr.clone());
        let len = r.u4()? as usize;
        let body = r.take(len)?;
        let mut sub = ByteReader { bytes: body, pos: 0, path };
        match attr.as_str() {
            "SourceFile" => source_file = Some(pool.utf8(sub.u2()?)?.to_string()),
            "InnerClasses" => {
                for _ in 0..sub.u2()? {
                    let inner = pool.class_name(sub.u2()?)?;
                    let outer = pool.optional_class(sub.u2()?)?;
                    let simple = sub.u2()?;
                    let simple_name = if simple == 0 { None } else { Some(pool.utf8(simple)?.to_string()) };
                    let access_flags = sub.u2()?;
                    inner_classes.push(InnerClassEntry { inner, outer, simple_name, access_flags });
                }
            }
            "Deprecated" => deprecated = true,
            _ => {}
        }
    }

    Ok(ClassFileInfo {
        minor_version,
        major_version,
        name,
        access_flags,
        super_name,
        interfaces,
        fields,
        methods,
        source_file,
        inner_classes,
        deprecated,
        attributes,
        class_refs,
    })
}

fn read_code(body: &[u8], pool: &Pool<'_>, path: &Path) -> Result<CodeEntry> {
    let mut r = ByteReader { bytes: body, pos: 0, path };
    let max_stack = r.u2()?;
    let max_locals = r.u2()?;
    let len = r.u4()? as usize;
    let bytes = r.take(len)?.to_vec();
    let handlers = r.u2()?;
    r.take(handlers as usize * 8)?;
    let mut attributes = Vec::new();
    for _ in 0..r.u2()? {
        attributes.push(pool.utf8(r.u2()?)?.to_string());
        let len = r.u4()? as usize;
        r.take(len)?;
    }
    Ok(CodeEntry { max_stack, max_locals, bytes, handlers, attributes })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-assembled `public class p/A extends java/lang/Object` with one
    /// constant field and the SourceFile attribute
    fn tiny_class() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&MAGIC.to_be_bytes());
        b.extend_from_slice(&3u16.to_be_bytes());
        b.extend_from_slice(&45u16.to_be_bytes());
        let utf8 = |b: &mut Vec<u8>, s: &str| {
            b.push(1);
            b.extend_from_slice(&(s.len() as u16).to_be_bytes());
            b.extend_from_slice(s.as_bytes());
        };
        b.extend_from_slice(&11u16.to_be_bytes());
        utf8(&mut b, "p/A"); // 1
        b.push(7);
        b.extend_from_slice(&1u16.to_be_bytes()); // 2
        utf8(&mut b, "java/lang/Object"); // 3
        b.push(7);
        b.extend_from_slice(&3u16.to_be_bytes()); // 4
        utf8(&mut b, "X"); // 5
        utf8(&mut b, "J"); // 6
        b.push(5);
        b.extend_from_slice(&42i64.to_be_bytes()); // 7, 8
        utf8(&mut b, "ConstantValue"); // 9
        utf8(&mut b, "SourceFile"); // 10
        b.extend_from_slice(&0x0021u16.to_be_bytes());
        b.extend_from_slice(&2u16.to_be_bytes());
        b.extend_from_slice(&4u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&1u16.to_be_bytes());
        b.extend_from_slice(&0x0019u16.to_be_bytes());
        b.extend_from_slice(&5u16.to_be_bytes());
        b.extend_from_slice(&6u16.to_be_bytes());
        b.extend_from_slice(&1u16.to_be_bytes());
        b.extend_from_slice(&9u16.to_be_bytes());
        b.extend_from_slice(&2u32.to_be_bytes());
        b.extend_from_slice(&7u16.to_be_bytes());
        b.extend_from_slice(&0u16.to_be_bytes());
        b.extend_from_slice(&1u16.to_be_bytes());
        b.extend_from_slice(&10u16.to_be_bytes());
        b.extend_from_slice(&2u32.to_be_bytes());
        b.extend_from_slice(&1u16.to_be_bytes());
        b
    }

    #[test]
    fn reads_names_fields_and_attributes() {
        let info = read_class(&tiny_class(), Path::new("A.class")).unwrap();
        assert_eq!(info.name, "p.A");
        assert_eq!((info.major_version, info.minor_version), (45, 3));
        assert_eq!(info.super_name.as_deref(), Some("java.lang.Object"));
        assert_eq!(info.fields.len(), 1);
        assert_eq!(info.fields[0].name, "X");
        assert_eq!(info.fields[0].constant, Some(ConstValue::Long(42)));
        assert_eq!(info.source_file.as_deref(), Some("p/A"));
        assert_eq!(info.dependencies(), vec!["java.lang.Object"]);
    }

    #[test]
    fn malformed_input_is_a_class_format_error() {
        let mut bytes = tiny_class();
        bytes.truncate(30);
        let err = read_class(&bytes, Path::new("A.class")).unwrap_err();
        assert!(matches!(err, Error::ClassFormat { .. }));
        let err = read_class(b"nope", Path::new("B.class")).unwrap_err();
        assert!(err.to_string().contains("bad magic number"));
    }
}

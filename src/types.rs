use crate::{*, error::*, layout::*, mem::*};
use bitflags::*;
use std::fmt;

bitflags! { pub struct ScalarFlags: u8 {
    const SIGNED = 0x1;
    const FLOAT = 0x2;
    const BOOL = 0x4;
    const CHAR = 0x8;
}}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Primitive(ScalarFlags),
    Pointer,
    // Aggregate or otherwise uninterpretable element. The host renders these recursively
    // through child handles; summaries show a placeholder.
    Opaque,
}

// Host-resolved description of a type, as much of it as the decoders need: a display
// name, a size/alignment (to step through contiguous elements), and how to render one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub size: usize,
    pub align: usize,
    pub kind: TypeKind,
}

impl TypeRef {
    pub fn unsigned(name: &str, size: usize) -> TypeRef { TypeRef {name: name.to_string(), size, align: size.max(1), kind: TypeKind::Primitive(ScalarFlags::empty())} }
    pub fn signed(name: &str, size: usize) -> TypeRef { TypeRef {name: name.to_string(), size, align: size.max(1), kind: TypeKind::Primitive(ScalarFlags::SIGNED)} }
    pub fn float(name: &str, size: usize) -> TypeRef { TypeRef {name: name.to_string(), size, align: size.max(1), kind: TypeKind::Primitive(ScalarFlags::FLOAT)} }
    pub fn boolean(name: &str) -> TypeRef { TypeRef {name: name.to_string(), size: 1, align: 1, kind: TypeKind::Primitive(ScalarFlags::BOOL)} }
    pub fn character(name: &str) -> TypeRef { TypeRef {name: name.to_string(), size: 1, align: 1, kind: TypeKind::Primitive(ScalarFlags::CHAR)} }
    pub fn pointer(name: &str) -> TypeRef { TypeRef {name: name.to_string(), size: 8, align: 8, kind: TypeKind::Pointer} }
    pub fn opaque(name: &str, size: usize, align: usize) -> TypeRef { TypeRef {name: name.to_string(), size, align: align.max(1), kind: TypeKind::Opaque} }

    // The value half of a hash table slot is a {size_t, void*} union; show it as unsigned.
    pub fn hashmap_value() -> TypeRef { TypeRef::unsigned("rg::HashMap::Value", 8) }

    // Distance between consecutive elements of this type in an array.
    pub fn stride(&self) -> usize { align_up(self.size, self.align) }
}

// Opaque value reference handed in by the host: where the value lives, what its declared
// type is called, and (for the generic container kinds) the first template argument.
#[derive(Clone, Debug)]
pub struct TypedHandle {
    pub addr: usize,
    pub type_name: String,
    pub arg: Option<TypeRef>,
}

impl TypedHandle {
    pub fn new(addr: usize, type_name: &str, arg: Option<TypeRef>) -> TypedHandle {
        TypedHandle {addr, type_name: type_name.to_string(), arg}
    }
}

// One labeled child of a container, for the host to render (possibly recursively).
#[derive(Clone, Debug)]
pub struct Child {
    pub label: String,
    pub addr: usize,
    pub type_: TypeRef,
}

pub enum ScalarValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
    Char(u8),
    Pointer(usize),
    Opaque,
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScalarValue::Unsigned(x) => write!(f, "{}", x),
            ScalarValue::Signed(x) => write!(f, "{}", x),
            ScalarValue::Float(x) => write!(f, "{}", x),
            ScalarValue::Bool(x) => write!(f, "{}", x),
            ScalarValue::Char(c) if (0x20..0x7f).contains(c) => write!(f, "'{}'", *c as char),
            ScalarValue::Char(c) => write!(f, "'\\x{:02x}'", c),
            ScalarValue::Pointer(p) => write!(f, "0x{:x}", p),
            ScalarValue::Opaque => write!(f, "{{...}}"),
        }
    }
}

// Load one element for a summary or a label. One read, no interpretation beyond the
// TypeRef's own claim about what the bytes are.
pub fn read_scalar(mem: &mut CachedMemReader, addr: usize, t: &TypeRef) -> Result<ScalarValue> {
    match t.kind {
        TypeKind::Pointer => Ok(ScalarValue::Pointer(mem.read_usize(addr)?)),
        TypeKind::Opaque => Ok(ScalarValue::Opaque),
        TypeKind::Primitive(flags) => {
            if t.size == 0 || t.size > 8 {
                return err!(Sanity, "can't render {}-byte scalar {}", t.size, t.name);
            }
            let mut buf = [0u8; 8];
            mem.read(addr, &mut buf[..t.size])?;
            let raw = u64::from_le_bytes(buf);
            if flags.contains(ScalarFlags::FLOAT) {
                return match t.size {
                    4 => Ok(ScalarValue::Float(f32::from_bits(raw as u32) as f64)),
                    8 => Ok(ScalarValue::Float(f64::from_bits(raw))),
                    _ => err!(Sanity, "can't render {}-byte float {}", t.size, t.name),
                };
            }
            if flags.contains(ScalarFlags::BOOL) {
                return Ok(ScalarValue::Bool(raw != 0));
            }
            if flags.contains(ScalarFlags::CHAR) && t.size == 1 {
                return Ok(ScalarValue::Char(raw as u8));
            }
            if flags.contains(ScalarFlags::SIGNED) {
                let shift = (64 - t.size * 8) as u32;
                return Ok(ScalarValue::Signed(((raw as i64) << shift) >> shift));
            }
            Ok(ScalarValue::Unsigned(raw))
        }
    }
}

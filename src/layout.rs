use crate::{*, error::*, mem::*, types::*};

// Field offsets of the rg:: container layouts, as compiled for x86-64 System V with
// 8-byte size_t and pointers, little-endian. These must stay in sync with the container
// library; bump the version when its structs change shape.
pub const LAYOUT_VERSION: u32 = 1;

// The reserved key value marking a hash table slot as empty. Real keys never equal it.
pub const NULL_KEY: u64 = 0;

pub fn align_up(x: usize, align: usize) -> usize {
    debug_assert!(align > 0);
    (x + align - 1) / align * align
}

// rg::Vector<T> is one inline impl header; m_data points at count contiguous elements.
#[derive(Clone, Copy, Debug)]
pub struct RawVector {
    pub count: usize,
    pub capacity: usize,
    pub element_size: usize,
    pub data: usize,
}

impl RawVector {
    pub const COUNT: usize = 0;
    pub const CAPACITY: usize = 8;
    pub const ELEMENT_SIZE: usize = 16;
    pub const DATA: usize = 24;
    pub const GROWTH_AMOUNT: usize = 32;
    pub const HEADER_SIZE: usize = 40;

    pub fn read(mem: &MemReader, addr: usize) -> Result<RawVector> {
        let mut buf = [0u8; 32];
        mem.read(addr, &mut buf)?;
        Ok(RawVector {
            count: get_usize(&buf, Self::COUNT),
            capacity: get_usize(&buf, Self::CAPACITY),
            element_size: get_usize(&buf, Self::ELEMENT_SIZE),
            data: get_usize(&buf, Self::DATA),
        })
    }
}

// rg::Array<T>: count + data, no header.
#[derive(Clone, Copy, Debug)]
pub struct RawArray {
    pub count: usize,
    pub data: usize,
}

impl RawArray {
    pub const COUNT: usize = 0;
    pub const DATA: usize = 8;

    pub fn read(mem: &MemReader, addr: usize) -> Result<RawArray> {
        let mut buf = [0u8; 16];
        mem.read(addr, &mut buf)?;
        Ok(RawArray {count: get_usize(&buf, Self::COUNT), data: get_usize(&buf, Self::DATA)})
    }
}

// rg::HashMap is a single pointer to a heap Data struct holding the slot array.
#[derive(Clone, Copy, Debug)]
pub struct RawTable {
    pub entries: usize,
    pub capacity: usize,
    pub count: usize,
}

impl RawTable {
    pub const DATA_PTR: usize = 0; // on the rg::HashMap object
    // On the Data struct.
    pub const ENTRIES: usize = 0;
    pub const CAPACITY: usize = 8;
    pub const COUNT: usize = 16;
    // Slots are {key: u64, value: u64} pairs.
    pub const SLOT_KEY: usize = 0;
    pub const SLOT_VALUE: usize = 8;
    pub const SLOT_STRIDE: usize = 16;

    pub fn read(mem: &MemReader, addr: usize) -> Result<RawTable> {
        let data = mem.read_usize(addr + Self::DATA_PTR)?;
        let mut buf = [0u8; 24];
        mem.read(data, &mut buf)?;
        Ok(RawTable {
            entries: get_usize(&buf, Self::ENTRIES),
            capacity: get_usize(&buf, Self::CAPACITY),
            count: get_usize(&buf, Self::COUNT),
        })
    }
}

// Subobject offsets of rg::Map<T>: the index table first, then the backing vector.
pub const MAP_HASH_MAP: usize = 0;
pub const MAP_STORAGE: usize = 8;

// Subobject offsets of rg::Storage<T>.
pub const STORAGE_ID_COUNTER: usize = 0;
pub const STORAGE_MAP: usize = 8;

// rg::Map<T>::Entry stores the value first, then the u64 key, padded out to the
// entry alignment. Computed from the value type since the entry is a template.
#[derive(Clone, Copy, Debug)]
pub struct EntryLayout {
    pub key: usize,
    pub stride: usize,
}

impl EntryLayout {
    pub fn for_value(value: &TypeRef) -> EntryLayout {
        let key = align_up(value.size, 8);
        let align = value.align.max(8);
        EntryLayout {key, stride: align_up(key + 8, align)}
    }
}

fn get_usize(buf: &[u8], off: usize) -> usize {
    usize::from_le_bytes(buf[off..off + 8].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use crate::{layout::*, types::*};

    #[test]
    fn entry_layouts() {
        // {u64 value, u64 key}
        let l = EntryLayout::for_value(&TypeRef::unsigned("uint64_t", 8));
        assert_eq!((l.key, l.stride), (8, 16));
        // {u32 value, pad, u64 key}
        let l = EntryLayout::for_value(&TypeRef::unsigned("uint32_t", 4));
        assert_eq!((l.key, l.stride), (8, 16));
        // 16-byte aggregate value
        let l = EntryLayout::for_value(&TypeRef::opaque("Widget", 16, 8));
        assert_eq!((l.key, l.stride), (16, 24));
        // over-aligned value pads the whole entry
        let l = EntryLayout::for_value(&TypeRef::opaque("Mat4", 24, 16));
        assert_eq!((l.key, l.stride), (24, 32));
    }

    #[test]
    fn align_up_sanity() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(16, 8), 16);
        assert_eq!(align_up(17, 1), 17);
    }
}

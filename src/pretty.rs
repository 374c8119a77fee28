use crate::{*, error::*, layout::*, mem::*, types::*};
use std::fmt::Write;

// Pretty-printers for the rg:: containers. Each one is built against the address of a
// container (header fields are read once, up front) and hands out restartable cursors
// over the contents. Cursors read at most a couple of words per advance and never touch
// memory past the bounds the container's own header declares; the header values
// themselves are trusted as-is, garbage in garbage out.

// ===== rg::Vector<T> =====

#[derive(Debug)]
pub struct VectorPrinter {
    mem: MemReader,
    elem: TypeRef,
    raw: RawVector,
}

impl VectorPrinter {
    pub fn new(mem: &MemReader, addr: usize, elem: TypeRef) -> Result<Self> {
        let raw = RawVector::read(mem, addr)?;
        Ok(VectorPrinter {mem: mem.clone(), elem, raw})
    }

    pub fn count(&self) -> usize { self.raw.count }
    pub fn capacity(&self) -> usize { self.raw.capacity }
    pub fn element_size(&self) -> usize { self.raw.element_size }

    // Renders all elements, e.g. "[10, 20, 30]". O(count) reads, matching the host's
    // one-line display convention for growable sequences.
    pub fn summary(&self) -> Result<String> {
        let mut mem = CachedMemReader::new(self.mem.clone());
        let stride = self.elem.stride();
        let mut out = String::from("[");
        for i in 0..self.raw.count {
            if i > 0 {
                out.push_str(", ");
            }
            let v = read_scalar(&mut mem, self.raw.data.saturating_add(i.saturating_mul(stride)), &self.elem)?;
            write!(out, "{}", v)?;
        }
        out.push(']');
        Ok(out)
    }

    pub fn children(&self) -> SeqCursor {
        SeqCursor {data: self.raw.data, stride: self.elem.stride(), count: self.raw.count, i: 0, elem: self.elem.clone()}
    }
}

// ===== rg::Array<T> =====

#[derive(Debug)]
pub struct ArrayPrinter {
    elem: TypeRef,
    raw: RawArray,
}

impl ArrayPrinter {
    pub fn new(mem: &MemReader, addr: usize, elem: TypeRef) -> Result<Self> {
        let raw = RawArray::read(mem, addr)?;
        Ok(ArrayPrinter {elem, raw})
    }

    pub fn count(&self) -> usize { self.raw.count }

    // Fixed arrays tend to be large and uninteresting in aggregate, so the summary
    // doesn't load elements, e.g. "Array<Widget>(128)".
    pub fn summary(&self) -> String {
        format!("Array<{}>({})", self.elem.name, self.raw.count)
    }

    pub fn children(&self) -> SeqCursor {
        SeqCursor {data: self.raw.data, stride: self.elem.stride(), count: self.raw.count, i: 0, elem: self.elem.clone()}
    }
}

// Index-order walk over a contiguous element array. Advancing computes the element
// address without reading it; the host reads through the child handle if it wants to.
pub struct SeqCursor {
    data: usize,
    stride: usize,
    count: usize,
    i: usize,
    elem: TypeRef,
}

impl Iterator for SeqCursor {
    type Item = Result<Child>;

    fn next(&mut self) -> Option<Result<Child>> {
        if self.i == self.count {
            return None;
        }
        let i = self.i;
        self.i += 1;
        let addr = self.data.saturating_add(i.saturating_mul(self.stride));
        Some(Ok(Child {label: format!("[{}]", i), addr, type_: self.elem.clone()}))
    }
}

// ===== rg::HashMap =====

#[derive(Debug)]
pub struct HashMapPrinter {
    mem: MemReader,
    raw: RawTable,
}

impl HashMapPrinter {
    pub fn new(mem: &MemReader, addr: usize) -> Result<Self> {
        let raw = RawTable::read(mem, addr)?;
        Ok(HashMapPrinter {mem: mem.clone(), raw})
    }

    pub fn capacity(&self) -> usize { self.raw.capacity }
    pub fn count(&self) -> usize { self.raw.count }

    pub fn summary(&self) -> String {
        format!("HashMap(capacity={}, count={})", self.raw.capacity, self.raw.count)
    }

    pub fn entries(&self) -> SlotCursor {
        SlotCursor {mem: CachedMemReader::new(self.mem.clone()), entries: self.raw.entries, capacity: self.raw.capacity, i: 0}
    }
}

// Slot-order walk over the open-addressing slot array. Yields occupied slots only;
// iteration order is slot order, not insertion order, and is not stable across resizes
// of the live table.
pub struct SlotCursor {
    mem: CachedMemReader,
    entries: usize,
    capacity: usize,
    i: usize,
}

impl Iterator for SlotCursor {
    type Item = Result<Child>;

    fn next(&mut self) -> Option<Result<Child>> {
        // Runs of empty slots are skipped without yielding; the bound check has to come
        // before every key read so that a table with nothing but empty slots ends at
        // capacity instead of reading one slot past the array.
        while self.i < self.capacity {
            let slot = self.entries.saturating_add(self.i.saturating_mul(RawTable::SLOT_STRIDE));
            self.i += 1;
            let key = match self.mem.read_u64(slot.saturating_add(RawTable::SLOT_KEY)) {
                Ok(k) => k,
                Err(e) => {
                    self.i = self.capacity;
                    return Some(Err(e));
                }
            };
            if key == NULL_KEY {
                continue;
            }
            return Some(Ok(Child {label: key.to_string(), addr: slot.saturating_add(RawTable::SLOT_VALUE), type_: TypeRef::hashmap_value()}));
        }
        None
    }
}

// ===== rg::Map<T> =====

// The index table is held only for its capacity/count; iteration goes through the
// backing vector of entries, which is what gives insertion order.
#[derive(Debug)]
pub struct MapPrinter {
    value_type: TypeRef,
    entry: EntryLayout,
    index: HashMapPrinter,
    storage: VectorPrinter,
}

impl MapPrinter {
    pub fn new(mem: &MemReader, addr: usize, value_type: TypeRef) -> Result<Self> {
        let index = HashMapPrinter::new(mem, addr + MAP_HASH_MAP)?;
        let entry = EntryLayout::for_value(&value_type);
        let entry_type = TypeRef::opaque(&format!("rg::Map<{}>::Entry", value_type.name), entry.stride, value_type.align.max(8));
        let storage = VectorPrinter::new(mem, addr + MAP_STORAGE, entry_type)?;
        Ok(MapPrinter {value_type, entry, index, storage})
    }

    pub fn count(&self) -> usize { self.index.count() }

    pub fn summary(&self) -> String {
        format!("Map<{}>(capacity={}, count={})", self.value_type.name, self.index.capacity(), self.index.count())
    }

    pub fn entries(&self) -> EntryCursor {
        EntryCursor {
            mem: CachedMemReader::new(self.storage.mem.clone()),
            seq: self.storage.children(),
            key: self.entry.key,
            value_type: self.value_type.clone(),
        }
    }
}

// Insertion-order walk over a map's entry records: each advance reads the entry's key
// for the label and points the child at the value, which sits at the entry's start.
pub struct EntryCursor {
    mem: CachedMemReader,
    seq: SeqCursor,
    key: usize,
    value_type: TypeRef,
}

impl Iterator for EntryCursor {
    type Item = Result<Child>;

    fn next(&mut self) -> Option<Result<Child>> {
        let entry = match self.seq.next()? {
            Ok(c) => c,
            Err(e) => return Some(Err(e)),
        };
        let key = match self.mem.read_u64(entry.addr.saturating_add(self.key)) {
            Ok(k) => k,
            Err(e) => {
                self.seq.i = self.seq.count;
                return Some(Err(e));
            }
        };
        Some(Ok(Child {label: key.to_string(), addr: entry.addr, type_: self.value_type.clone()}))
    }
}

// ===== rg::Storage<T> =====

// Pure composition: a map plus the id counter. Size is taken transitively from the
// map's index table.
#[derive(Debug)]
pub struct StoragePrinter {
    elem: TypeRef,
    id_counter: u64,
    map: MapPrinter,
}

impl StoragePrinter {
    pub fn new(mem: &MemReader, addr: usize, elem: TypeRef) -> Result<Self> {
        let id_counter = mem.read_u64(addr + STORAGE_ID_COUNTER)?;
        let map = MapPrinter::new(mem, addr + STORAGE_MAP, elem.clone())?;
        Ok(StoragePrinter {elem, id_counter, map})
    }

    pub fn id_counter(&self) -> u64 { self.id_counter }
    pub fn count(&self) -> usize { self.map.count() }

    pub fn summary(&self) -> String {
        format!("Storage<{}>(count={}, id_counter={})", self.elem.name, self.map.count(), self.id_counter)
    }

    pub fn elements(&self) -> EntryCursor {
        self.map.entries()
    }
}

// Closed set of cursor shapes, so the host can hold "some container's children" by value.
pub enum ChildIter {
    Seq(SeqCursor),
    Slots(SlotCursor),
    Entries(EntryCursor),
}

impl Iterator for ChildIter {
    type Item = Result<Child>;

    fn next(&mut self) -> Option<Result<Child>> {
        match self {
            ChildIter::Seq(c) => c.next(),
            ChildIter::Slots(c) => c.next(),
            ChildIter::Entries(c) => c.next(),
        }
    }
}

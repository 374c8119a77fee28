use crate::{*, error::*, log::*, mem::*, pretty::*, types::*};

// The five container kinds this crate knows how to decode. Anything else is left to the
// host's default rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Vector,
    Array,
    HashMap,
    Map,
    Storage,
}

// Tells the host to use indexed/keyed list formatting rather than struct formatting.
// All five kinds render as lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayHint {
    Array,
}

impl DisplayHint {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayHint::Array => "array",
        }
    }
}

pub const NAMESPACE: &str = "railguard";

// What the host's pretty-printing subsystem consumes at process-attach time: one
// namespace, and per kind the type-name shape it should route to us. classify() is the
// canonical matcher for these patterns.
pub struct Registration {
    pub namespace: &'static str,
    pub printers: &'static [(&'static str, ContainerKind)],
}

pub const REGISTRATION: Registration = Registration {
    namespace: NAMESPACE,
    printers: &[
        ("rg::Vector<*>", ContainerKind::Vector),
        ("rg::Array<*>", ContainerKind::Array),
        ("rg::HashMap", ContainerKind::HashMap),
        ("rg::Map<*>", ContainerKind::Map),
        ("rg::Storage<*>", ContainerKind::Storage),
    ],
};

// Whole-string match on the fully qualified type name: the hash table is a concrete
// class, the other four match with any template arguments.
pub fn classify(type_name: &str) -> Option<ContainerKind> {
    if type_name == "rg::HashMap" {
        return Some(ContainerKind::HashMap);
    }
    let (head, args) = type_name.split_once('<')?;
    if !args.ends_with('>') {
        return None;
    }
    match head {
        "rg::Vector" => Some(ContainerKind::Vector),
        "rg::Array" => Some(ContainerKind::Array),
        "rg::Map" => Some(ContainerKind::Map),
        "rg::Storage" => Some(ContainerKind::Storage),
        _ => None,
    }
}

// A constructed printer for one value, ready to produce the one-line summary and the
// child list for the host.
#[derive(Debug)]
pub enum Printer {
    Vector(VectorPrinter),
    Array(ArrayPrinter),
    HashMap(HashMapPrinter),
    Map(MapPrinter),
    Storage(StoragePrinter),
}

impl Printer {
    pub fn kind(&self) -> ContainerKind {
        match self {
            Printer::Vector(_) => ContainerKind::Vector,
            Printer::Array(_) => ContainerKind::Array,
            Printer::HashMap(_) => ContainerKind::HashMap,
            Printer::Map(_) => ContainerKind::Map,
            Printer::Storage(_) => ContainerKind::Storage,
        }
    }

    pub fn summary(&self) -> Result<String> {
        match self {
            Printer::Vector(p) => p.summary(),
            Printer::Array(p) => Ok(p.summary()),
            Printer::HashMap(p) => Ok(p.summary()),
            Printer::Map(p) => Ok(p.summary()),
            Printer::Storage(p) => Ok(p.summary()),
        }
    }

    pub fn children(&self) -> ChildIter {
        match self {
            Printer::Vector(p) => ChildIter::Seq(p.children()),
            Printer::Array(p) => ChildIter::Seq(p.children()),
            Printer::HashMap(p) => ChildIter::Slots(p.entries()),
            Printer::Map(p) => ChildIter::Entries(p.entries()),
            Printer::Storage(p) => ChildIter::Entries(p.elements()),
        }
    }

    pub fn display_hint(&self) -> DisplayHint {
        DisplayHint::Array
    }
}

pub struct Registry {
    mem: MemReader,
}

impl Registry {
    pub fn new(mem: MemReader) -> Registry {
        Registry {mem}
    }

    // Process-attach entry point.
    pub fn attach(mem: MemReader, log: &mut Log) -> Registry {
        log!(log, "registering {} pretty-printers under namespace '{}'", REGISTRATION.printers.len(), REGISTRATION.namespace);
        Registry::new(mem)
    }

    // Ok(None) means "not one of ours, fall through to the host's default rendering".
    // Construction errors (unreadable header etc) abort only this one value's render.
    pub fn resolve(&self, handle: &TypedHandle) -> Result<Option<Printer>> {
        let kind = match classify(&handle.type_name) {
            None => return Ok(None),
            Some(k) => k,
        };
        self.mem.check_valid()?;
        let p = match kind {
            ContainerKind::Vector => Printer::Vector(VectorPrinter::new(&self.mem, handle.addr, self.require_arg(handle)?)?),
            ContainerKind::Array => Printer::Array(ArrayPrinter::new(&self.mem, handle.addr, self.require_arg(handle)?)?),
            ContainerKind::HashMap => Printer::HashMap(HashMapPrinter::new(&self.mem, handle.addr)?),
            ContainerKind::Map => Printer::Map(MapPrinter::new(&self.mem, handle.addr, self.require_arg(handle)?)?),
            ContainerKind::Storage => Printer::Storage(StoragePrinter::new(&self.mem, handle.addr, self.require_arg(handle)?)?),
        };
        Ok(Some(p))
    }

    fn require_arg(&self, handle: &TypedHandle) -> Result<TypeRef> {
        match &handle.arg {
            Some(t) => Ok(t.clone()),
            None => err!(Usage, "no template argument for {}", handle.type_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{log::*, mem::*, registry::*, types::*};
    use std::sync::Arc;

    #[test]
    fn classification() {
        assert_eq!(classify("rg::Vector<int>"), Some(ContainerKind::Vector));
        assert_eq!(classify("rg::Array<rg::Vector<float>>"), Some(ContainerKind::Array));
        assert_eq!(classify("rg::HashMap"), Some(ContainerKind::HashMap));
        assert_eq!(classify("rg::Map<Widget>"), Some(ContainerKind::Map));
        assert_eq!(classify("rg::Storage<Widget>"), Some(ContainerKind::Storage));

        assert_eq!(classify("rg::HashMap<int>"), None); // the table is not a template
        assert_eq!(classify("rg::Vector"), None); // missing arguments
        assert_eq!(classify("std::vector<int>"), None);
        assert_eq!(classify("rg::VectorView<int>"), None);
        assert_eq!(classify("MyNs::rg::Vector<int>"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn resolve_and_render() {
        let mut object = Vec::new();
        object.extend_from_slice(&3usize.to_le_bytes());
        object.extend_from_slice(&4usize.to_le_bytes());
        object.extend_from_slice(&8usize.to_le_bytes());
        object.extend_from_slice(&0x2000usize.to_le_bytes());
        object.extend_from_slice(&4usize.to_le_bytes());
        let mut data = Vec::new();
        for x in [10u64, 20, 30] {
            data.extend_from_slice(&x.to_le_bytes());
        }
        let mut s = SnapshotMemReader::new();
        s.add_range(0x1000, object);
        s.add_range(0x2000, data);
        let registry = Registry::new(MemReader::Snapshot(Arc::new(s)));

        let handle = TypedHandle::new(0x1000, "rg::Vector<uint64_t>", Some(TypeRef::unsigned("uint64_t", 8)));
        let p = registry.resolve(&handle).unwrap().unwrap();
        assert_eq!(p.kind(), ContainerKind::Vector);
        assert_eq!(p.summary().unwrap(), "[10, 20, 30]");
        assert_eq!(p.display_hint().as_str(), "array");
        let labels: Vec<String> = p.children().map(|c| c.unwrap().label).collect();
        assert_eq!(labels, ["[0]", "[1]", "[2]"]);

        // Not one of ours: defer, not an error.
        let other = TypedHandle::new(0x1000, "std::map<int, int>", None);
        assert!(registry.resolve(&other).unwrap().is_none());

        // Ours but unusable without the template argument.
        let no_arg = TypedHandle::new(0x1000, "rg::Vector<uint64_t>", None);
        assert!(registry.resolve(&no_arg).unwrap_err().is_usage());

        // Unreadable container header aborts just this render.
        let bad = TypedHandle::new(0x9000, "rg::Vector<uint64_t>", Some(TypeRef::unsigned("uint64_t", 8)));
        assert!(registry.resolve(&bad).unwrap_err().is_bad_address());
    }

    #[test]
    fn registration_table() {
        assert_eq!(REGISTRATION.namespace, "railguard");
        assert_eq!(REGISTRATION.printers.len(), 5);
        for &(pattern, kind) in REGISTRATION.printers {
            // Every registered pattern must be accepted by the canonical matcher.
            let name = pattern.replace('*', "int");
            assert_eq!(classify(&name), Some(kind), "{}", pattern);
        }
    }

    #[test]
    fn attach_logs_registration() {
        let mut log = Log::new();
        let registry = Registry::attach(MemReader::Invalid, &mut log);
        assert_eq!(log.lines.len(), 1);
        assert!(log.lines[0].contains("railguard"));

        // No process attached: recognized types still classify, but rendering fails.
        let handle = TypedHandle::new(0x1000, "rg::HashMap", None);
        assert!(registry.resolve(&handle).unwrap_err().is_bad_address());
    }
}

use crate::{*, error::*};
use std::sync::Arc;
use libc::{pid_t, c_void};

// Thing for reading the inspected process's memory, either from a running (or stopped)
// process or from a frozen snapshot of address ranges. Copyable for convenience.
#[derive(Clone, Debug)]
pub enum MemReader {
    Invalid,
    Pid(PidMemReader),
    Snapshot(Arc<SnapshotMemReader>),
}

impl MemReader {
    pub fn check_valid(&self) -> Result<()> { match self {Self::Invalid => err!(ProcessState, "no process"), _ => Ok(())} }

    pub fn read(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        match self {
            Self::Invalid => err!(ProcessState, "no process"),
            Self::Pid(r) => r.read(addr, buf),
            Self::Snapshot(r) => r.read(addr, buf),
        }
    }

    pub fn read_u64(&self, addr: usize) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read(addr, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_usize(&self, addr: usize) -> Result<usize> {
        let mut buf = [0u8; 8];
        self.read(addr, &mut buf)?;
        Ok(usize::from_le_bytes(buf))
    }
}

#[derive(Clone, Debug)]
pub struct PidMemReader {
    pid: pid_t,
}

impl PidMemReader {
    pub fn new(pid: pid_t) -> Self { PidMemReader {pid} }

    pub fn read(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        unsafe {
            let local_iov = libc::iovec {iov_base: buf.as_mut_ptr() as *mut c_void, iov_len: buf.len()};
            let mut remote_iov = libc::iovec {iov_base: addr as *mut c_void, iov_len: buf.len()};
            let r = libc::process_vm_readv(self.pid, &local_iov as *const libc::iovec, 1, &mut remote_iov as *mut libc::iovec, 1, 0);
            if r < 0 {
                if *libc::__errno_location() == libc::EFAULT {
                    return err!(ProcessState, "bad address"); // shorter message for common error (e.g. null data pointer)
                } else {
                    return errno_err!("process_vm_readv failed");
                }
            }
            if r != buf.len() as isize {
                return err!(ProcessState, "unexpected EOF in mem @{:x}:0x{:x}", addr, buf.len());
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct SnapshotRange {
    start: usize,
    bytes: Vec<u8>,
}

// Frozen image of a set of address ranges, e.g. carved out of a core dump by the host.
// Ranges must not overlap.
#[derive(Debug)]
pub struct SnapshotMemReader {
    ranges: Vec<SnapshotRange>, // sorted by start
}

impl SnapshotMemReader {
    pub fn new() -> Self { SnapshotMemReader {ranges: Vec::new()} }

    pub fn add_range(&mut self, start: usize, bytes: Vec<u8>) {
        let idx = self.ranges.partition_point(|r| r.start < start);
        self.ranges.insert(idx, SnapshotRange {start, bytes});
    }

    pub fn read(&self, addr: usize, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let end = match addr.checked_add(buf.len()) {
            Some(e) => e,
            None => return err!(Runtime, "bad memory range: 0x{:x} + 0x{:x}", addr, buf.len()),
        };
        let idx = self.ranges.partition_point(|r| r.start + r.bytes.len() <= addr);
        if idx == self.ranges.len() || self.ranges[idx].start > addr || self.ranges[idx].start + self.ranges[idx].bytes.len() < end {
            return err!(ProcessState, "bad address 0x{:x}", addr);
        }
        let r = &self.ranges[idx];
        buf.copy_from_slice(&r.bytes[addr - r.start .. end - r.start]);
        Ok(())
    }
}

pub const PAGE_SIZE: usize = 4096;

// Caches the last read page. Good for the sequential small reads a container traversal does.
// If a whole page can't be read (e.g. the allocation ends mid-page), falls back to an
// uncached exact-size read so that reads near the end of readable memory still work.
pub struct CachedMemReader {
    pub mem: MemReader,
    addr: Option<usize>,
    page: Box<[u8; PAGE_SIZE]>,
}

impl CachedMemReader {
    pub fn new(mem: MemReader) -> Self { Self {mem, addr: None, page: Box::new([0u8; PAGE_SIZE])} }

    pub fn read(&mut self, addr: usize, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        if buf.len() > usize::MAX - addr {
            return err!(Runtime, "bad memory range: 0x{:x} + 0x{:x}", addr, buf.len());
        }
        let page = addr & !(PAGE_SIZE - 1);
        if buf.len() > PAGE_SIZE || addr + buf.len() > page + PAGE_SIZE {
            // Big or page-straddling request, don't bother caching.
            return self.mem.read(addr, buf);
        }
        if self.addr != Some(page) {
            self.addr = None;
            match self.mem.read(page, &mut self.page[..]) {
                Ok(()) => self.addr = Some(page),
                Err(_) => return self.mem.read(addr, buf),
            }
        }
        let start = addr - page;
        buf.copy_from_slice(&self.page[start .. start + buf.len()]);
        Ok(())
    }

    pub fn read_u8(&mut self, addr: usize) -> Result<u8> {
        if self.addr == Some(addr & !(PAGE_SIZE - 1)) {
            // Fast path.
            return Ok(self.page[addr & (PAGE_SIZE - 1)]);
        }
        let mut buf = [0u8; 1];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self, addr: usize) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read(addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self, addr: usize) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64(&mut self, addr: usize) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read(addr, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_usize(&mut self, addr: usize) -> Result<usize> {
        let mut buf = [0u8; 8];
        self.read(addr, &mut buf)?;
        Ok(usize::from_le_bytes(buf))
    }
}

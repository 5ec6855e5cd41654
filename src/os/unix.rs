use crate::{
    Result,
    error::{io_error, mmap_error},
    flags::BackingMode,
    image::Backing,
};
use alloc::{ffi::CString, format, vec, vec::Vec};
use core::{ffi::c_void, ptr::NonNull};
use libc::{O_CLOEXEC, O_RDONLY, O_RDWR, SEEK_SET};

/// A memory mapping of a whole file, unmapped on drop.
pub(crate) struct Mapping {
    ptr: NonNull<u8>,
    len: usize,
    mode: BackingMode,
}

// The mapping is never written through by this crate after it is created.
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Mapping {
    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub(crate) fn mode(&self) -> BackingMode {
        self.mode
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.ptr.as_ptr().cast::<c_void>(), self.len) };
    }
}

struct RawFile {
    fd: i32,
}

impl Drop for RawFile {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

impl RawFile {
    fn open(path: &str, writable: bool) -> Result<Self> {
        let name = CString::new(path)
            .map_err(|_| io_error(format!("{path}: path contains a NUL byte")))?;
        let mode = if writable { O_RDWR } else { O_RDONLY };
        let fd = unsafe { libc::open(name.as_ptr(), mode | O_CLOEXEC) };
        if fd == -1 {
            return Err(io_error(format!("{path}: open failed")));
        }
        Ok(Self { fd })
    }

    /// Size of the file; fails for anything that is not a regular file.
    fn regular_size(&self, path: &str) -> Result<usize> {
        let mut st: libc::stat = unsafe { core::mem::zeroed() };
        if unsafe { libc::fstat(self.fd, &mut st) } != 0 {
            return Err(io_error(format!("{path}: fstat failed")));
        }
        if st.st_mode & libc::S_IFMT != libc::S_IFREG {
            return Err(io_error(format!("{path}: not a regular file")));
        }
        usize::try_from(st.st_size).map_err(|_| io_error(format!("{path}: file too large")))
    }

    fn read_all(&self, len: usize) -> Result<Vec<u8>> {
        let off = unsafe { libc::lseek(self.fd, 0, SEEK_SET) };
        if off != 0 {
            return Err(io_error("lseek failed"));
        }
        let mut buf = vec![0u8; len];
        let mut bytes = buf.as_mut_slice();
        while !bytes.is_empty() {
            let result =
                unsafe { libc::read(self.fd, bytes.as_mut_ptr().cast::<c_void>(), bytes.len()) };
            if result < 0 {
                return Err(io_error("read error"));
            } else if result == 0 {
                return Err(io_error("failed to fill buffer"));
            }
            bytes = &mut bytes[result as usize..];
        }
        Ok(buf)
    }

    fn map(&self, len: usize, mode: BackingMode) -> Result<Mapping> {
        let (prot, flags) = match mode {
            BackingMode::MapSharedWrite => (libc::PROT_READ | libc::PROT_WRITE, libc::MAP_SHARED),
            BackingMode::MapPrivateWrite => {
                (libc::PROT_READ | libc::PROT_WRITE, libc::MAP_PRIVATE)
            }
            _ => (libc::PROT_READ, libc::MAP_PRIVATE),
        };
        let ptr = unsafe { libc::mmap(core::ptr::null_mut(), len, prot, flags, self.fd, 0) };
        if core::ptr::eq(ptr, libc::MAP_FAILED) {
            return Err(mmap_error("mmap failed"));
        }
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| mmap_error("mmap returned null"))?;
        Ok(Mapping { ptr, len, mode })
    }
}

/// Reads or maps the file at `path` according to `mode`.
pub(crate) fn load(path: &str, mode: BackingMode) -> Result<Backing> {
    let file = RawFile::open(path, mode == BackingMode::MapSharedWrite)?;
    let len = file.regular_size(path)?;
    // mmap rejects empty ranges; an empty heap image fails header parsing instead.
    if len == 0 {
        return Ok(Backing::Heap(Vec::new()));
    }
    match mode {
        BackingMode::Heap => file.read_all(len).map(Backing::Heap),
        _ => file.map(len, mode).map(Backing::Mapped),
    }
}

//! The memory model the transform chain reads capture observations through
//! (spec §3 `GlobalState`, §6 "Memory model").

use crate::auxil::FastHashMap;

/// Identifies one of the capture's observation pools (there is normally just
/// the application's own address space, but the model allows more).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct PoolId(pub u32);

/// A pointer into one of the capture's observed memory pools.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Pointer {
    pub addr: u64,
    pub pool: PoolId,
}

impl Pointer {
    pub const NULL: Pointer = Pointer {
        addr: 0,
        pool: PoolId(0),
    };

    pub fn is_null(self) -> bool {
        self.addr == 0
    }
}

/// A `(base, count, pool)` slice of typed elements inside an observation
/// pool.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Slice {
    pub base: Pointer,
    pub count: u64,
    pub elem_size: u64,
}

impl Slice {
    pub fn byte_len(&self) -> u64 {
        self.count * self.elem_size
    }

    pub fn range(&self) -> (u64, u64) {
        (self.base.addr, self.base.addr + self.byte_len())
    }
}

/// A single read or write an observed command declares against a memory
/// pool: the byte range touched, and a content hash so dedup/verification
/// doesn't need the bytes themselves (spec §3 `Observations`).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Observation {
    pub pool: PoolId,
    pub range: (u64, u64),
    pub content_hash: u64,
}

#[derive(Clone, Debug, Default)]
pub struct Observations {
    pub reads: Vec<Observation>,
    pub writes: Vec<Observation>,
}

impl Observations {
    pub fn reads_addr(&self, pool: PoolId, addr: u64) -> bool {
        self.reads
            .iter()
            .any(|o| o.pool == pool && o.range.0 <= addr && addr < o.range.1)
    }
}

/// Captured bytes backing a pool, keyed by `(pool, addr)` start, used by the
/// in-memory test/replay harness to answer `read`. A real deployment's
/// deserializer owns the actual capture bytes; this model only needs to
/// resolve them for compat passes that must materialize reads (spec §4.5.1,
/// §4.5.3 decompression).
#[derive(Default)]
pub struct PoolContents {
    chunks: FastHashMap<(PoolId, u64), Vec<u8>>,
}

impl PoolContents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, pool: PoolId, addr: u64, bytes: Vec<u8>) {
        self.chunks.insert((pool, addr), bytes);
    }

    /// Read `len` bytes starting at `addr` from a single previously-`put`
    /// chunk. Capture observations in practice are recorded as whole chunks
    /// per command, so we don't need cross-chunk stitching here.
    pub fn read(&self, pool: PoolId, addr: u64, len: u64) -> Option<&[u8]> {
        self.chunks
            .get(&(pool, addr))
            .filter(|b| b.len() as u64 >= len)
            .map(|b| &b[..len as usize])
    }
}

/// A scratch allocation used by transforms that need to materialize
/// observation bytes into a fresh region (spec §6: `state.alloc`, `tmp.ptr`,
/// `tmp.data`, `tmp.free`).
pub struct Tmp {
    pub pointer: Pointer,
    pub data: Vec<u8>,
}

impl Tmp {
    pub fn ptr(&self) -> Pointer {
        self.pointer
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Scratch-memory allocator: hands out ids in a disjoint pool so generated
/// `Tmp` pointers never collide with capture addresses.
#[derive(Default)]
pub struct MemoryModel {
    pub pointer_size: u8,
    pub little_endian: bool,
    contents: PoolContents,
    next_scratch_addr: u64,
}

const SCRATCH_POOL: PoolId = PoolId(u32::MAX);

impl MemoryModel {
    pub fn new(pointer_size: u8, little_endian: bool) -> Self {
        MemoryModel {
            pointer_size,
            little_endian,
            contents: PoolContents::new(),
            next_scratch_addr: 1,
        }
    }

    pub fn application_pool(&self) -> PoolId {
        PoolId(0)
    }

    pub fn put(&mut self, pool: PoolId, addr: u64, bytes: Vec<u8>) {
        self.contents.put(pool, addr, bytes);
    }

    pub fn read(&self, slice: Slice) -> Option<Vec<u8>> {
        self.contents
            .read(slice.base.pool, slice.base.addr, slice.byte_len())
            .map(|b| b.to_vec())
    }

    /// Allocate `size` bytes of scratch memory carrying `data`, returning a
    /// `Tmp` whose pointer is stable for the lifetime of this model.
    pub fn alloc(&mut self, data: Vec<u8>) -> Tmp {
        let addr = self.next_scratch_addr;
        self.next_scratch_addr += data.len().max(1) as u64;
        let pointer = Pointer {
            addr,
            pool: SCRATCH_POOL,
        };
        self.contents.put(SCRATCH_POOL, addr, data.clone());
        Tmp { pointer, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_round_trips() {
        let mut mm = MemoryModel::new(8, true);
        let tmp = mm.alloc(vec![1, 2, 3, 4]);
        assert_eq!(tmp.data(), &[1, 2, 3, 4]);
        let read_back = mm
            .read(Slice {
                base: tmp.ptr(),
                count: 4,
                elem_size: 1,
            })
            .unwrap();
        assert_eq!(read_back, vec![1, 2, 3, 4]);
    }
}

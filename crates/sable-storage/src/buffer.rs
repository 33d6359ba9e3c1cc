//! Bounded LRU buffer cache.
//!
//! The cache maps `(table, page_id)` to shared page frames and keeps an
//! LRU order list alongside. All structural operations run under a single
//! mutex; each frame additionally carries its own page lock and an atomic
//! pin count so a returned [`PageGuard`] stays valid while unrelated
//! evictions proceed. Pinned frames are never evicted.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use sable_common::{PageId, SableError, SableResult};

use crate::disk::DiskManager;
use crate::page::HeapPage;

/// Cache key: one page of one table file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    table: String,
    page_id: PageId,
}

/// A cached page frame.
struct Frame {
    key: CacheKey,
    page: Mutex<HeapPage>,
    pins: AtomicU32,
}

impl Frame {
    fn is_pinned(&self) -> bool {
        self.pins.load(Ordering::Acquire) > 0
    }
}

/// A pinned reference to a cached page.
///
/// The referenced frame cannot be evicted while the guard is alive;
/// dropping the guard unpins it. Lock the page with [`PageGuard::page`]
/// to read or mutate its contents.
pub struct PageGuard {
    frame: Arc<Frame>,
}

impl PageGuard {
    /// Locks and returns the page contents.
    pub fn page(&self) -> MutexGuard<'_, HeapPage> {
        self.frame.page.lock()
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.frame.pins.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Observable cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: AtomicU64,
    /// Lookups that required disk I/O.
    pub misses: AtomicU64,
    /// Pages written out or discarded to make room.
    pub evictions: AtomicU64,
}

struct CacheInner {
    frames: HashMap<CacheKey, Arc<Frame>>,
    // Front = most recently used.
    lru: VecDeque<CacheKey>,
}

impl CacheInner {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_front(key.clone());
    }
}

/// A bounded LRU cache of heap pages shared across table files.
pub struct BufferCache {
    capacity: usize,
    disk: Arc<DiskManager>,
    inner: Mutex<CacheInner>,
    stats: CacheStats,
}

impl BufferCache {
    /// Creates a cache holding at most `capacity` pages.
    #[must_use]
    pub fn new(disk: Arc<DiskManager>, capacity: usize) -> Self {
        Self {
            capacity,
            disk,
            inner: Mutex::new(CacheInner {
                frames: HashMap::with_capacity(capacity),
                lru: VecDeque::with_capacity(capacity),
            }),
            stats: CacheStats::default(),
        }
    }

    /// Returns the page for `(table, page_id)`, reading it from disk on a
    /// miss and evicting the LRU tail if the cache is at capacity.
    pub fn get_page(&self, table: &str, page_id: PageId) -> SableResult<PageGuard> {
        let key = CacheKey {
            table: table.to_string(),
            page_id,
        };
        let mut inner = self.inner.lock();

        if let Some(frame) = inner.frames.get(&key).cloned() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            inner.touch(&key);
            frame.pins.fetch_add(1, Ordering::AcqRel);
            return Ok(PageGuard { frame });
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        self.make_room(&mut inner)?;

        let page = self.disk.read_page(table, page_id)?;
        let frame = Arc::new(Frame {
            key: key.clone(),
            page: Mutex::new(page),
            pins: AtomicU32::new(1),
        });
        inner.frames.insert(key.clone(), Arc::clone(&frame));
        inner.lru.push_front(key);
        Ok(PageGuard { frame })
    }

    /// Overwrites the cached contents of `(table, page_id)` with a copy
    /// of `page` and marks it dirty.
    pub fn put_page(&self, table: &str, page_id: PageId, page: &HeapPage) -> SableResult<()> {
        let key = CacheKey {
            table: table.to_string(),
            page_id,
        };
        let mut inner = self.inner.lock();

        if let Some(frame) = inner.frames.get(&key).cloned() {
            let mut cached = frame.page.lock();
            *cached = page.clone();
            cached.mark_dirty();
            inner.touch(&key);
            return Ok(());
        }

        self.make_room(&mut inner)?;
        let mut copy = page.clone();
        copy.mark_dirty();
        let frame = Arc::new(Frame {
            key: key.clone(),
            page: Mutex::new(copy),
            pins: AtomicU32::new(0),
        });
        inner.frames.insert(key.clone(), frame);
        inner.lru.push_front(key);
        Ok(())
    }

    /// Writes every dirty page back through the disk manager and clears
    /// the dirty flags.
    pub fn flush_all(&self) -> SableResult<()> {
        let inner = self.inner.lock();
        for frame in inner.frames.values() {
            let mut page = frame.page.lock();
            if page.is_dirty() {
                self.disk
                    .write_page(&frame.key.table, frame.key.page_id, &page)?;
                page.clear_dirty();
            }
        }
        Ok(())
    }

    /// Drops every cached page of `table` without writing it back.
    ///
    /// Used when a table is dropped so dirty pages cannot resurrect the
    /// removed heap file.
    pub fn discard_table(&self, table: &str) {
        let mut inner = self.inner.lock();
        inner.frames.retain(|key, _| key.table != table);
        inner.lru.retain(|key| key.table != table);
    }

    /// Returns the number of cached pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cache statistics.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Evicts the least-recently-used unpinned frame if the cache is at
    /// capacity, writing it back when dirty.
    fn make_room(&self, inner: &mut CacheInner) -> SableResult<()> {
        if inner.frames.len() < self.capacity {
            return Ok(());
        }

        let CacheInner { frames, lru } = &mut *inner;
        let victim_key = lru
            .iter()
            .rev()
            .find(|key| frames.get(*key).is_some_and(|frame| !frame.is_pinned()))
            .cloned()
            .ok_or_else(|| {
                SableError::internal("buffer cache exhausted: every page is pinned")
            })?;

        let frame = frames
            .remove(&victim_key)
            .ok_or_else(|| SableError::internal("lru entry without frame"))?;
        lru.retain(|key| key != &victim_key);

        let page = frame.page.lock();
        if page.is_dirty() {
            self.disk
                .write_page(&victim_key.table, victim_key.page_id, &page)?;
        }
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

//! Buffer pool manager sitting on top of the raw page store.
//!
//! The pool holds a fixed number of frames, fetches pages from a
//! [`storage::PageFileHandle`] on a miss, and evicts according to a
//! [`common::ReplacementStrategy`] when every frame is full. It does not
//! know about transactions, a recovery log, concurrent access, checksums,
//! or prefetching — a frame holds exactly one page at a time.
//!
//! # Example
//!
//! ```no_run
//! use buffer::{BufferManager, BufferPool};
//! use common::ReplacementStrategy;
//! use storage::{create_page_file, open_page_file, ensure_capacity};
//!
//! create_page_file("/tmp/pages.bin").unwrap();
//! let mut handle = open_page_file("/tmp/pages.bin").unwrap();
//! ensure_capacity(&mut handle, 4).unwrap();
//!
//! let mut pool = BufferPool::new(handle, 2, ReplacementStrategy::Lru);
//! let mut page = pool.pin_page(0).unwrap();
//! page.data_mut()[0] = 7;
//! pool.mark_dirty(&page).unwrap();
//! pool.unpin_page(&page).unwrap();
//! pool.force_flush_pool().unwrap();
//! ```

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use common::{DbError, DbResult, PageNumber, ReplacementStrategy, NO_PAGE};
use storage::{read_block, write_block, PageBuf, PageFileHandle};

/// A single cache slot. Frames are stored behind `Rc<RefCell<..>>` so a
/// live `PageHandle` can keep referring to its frame while the pool itself
/// still needs `&mut self` to pin, unpin, or evict other frames.
struct Frame {
    page_num: PageNumber,
    data: Box<PageBuf>,
    dirty: bool,
    fix_count: i32,
}

impl Frame {
    fn empty() -> Self {
        Self {
            page_num: NO_PAGE,
            data: Box::new(storage::zero_page()),
            dirty: false,
            fix_count: 0,
        }
    }
}

/// A pinned reference to a page's bytes.
///
/// Holding a `PageHandle` keeps the underlying frame from being evicted
/// (see `fix_count`), but it does not borrow the pool itself, so other
/// pages can still be pinned, unpinned, or flushed concurrently with it
/// being alive.
pub struct PageHandle {
    page_num: PageNumber,
    frame: Rc<RefCell<Frame>>,
}

impl PageHandle {
    /// The page number this handle refers to.
    pub fn page_num(&self) -> PageNumber {
        self.page_num
    }

    /// Read-only view of the page's bytes.
    pub fn data(&self) -> std::cell::Ref<'_, PageBuf> {
        std::cell::Ref::map(self.frame.borrow(), |f| f.data.as_ref())
    }

    /// Mutable view of the page's bytes. Does not itself mark the page
    /// dirty — call `mark_dirty` on the owning pool.
    pub fn data_mut(&mut self) -> std::cell::RefMut<'_, PageBuf> {
        std::cell::RefMut::map(self.frame.borrow_mut(), |f| f.data.as_mut())
    }

    /// `true` if this handle's frame still holds `page_num` — a handle can
    /// go stale if the pool evicts its frame and repurposes it for another
    /// page after the client stopped honoring the pin/unpin discipline.
    fn still_resident(&self) -> bool {
        self.frame.borrow().page_num == self.page_num
    }
}

/// Operations a buffer pool exposes over a fixed-size frame pool.
pub trait BufferManager {
    /// Pins `page_num`, loading it from the backing file on a cache miss.
    /// Returns `DbError::NoFreeBuffer` if every frame is pinned.
    fn pin_page(&mut self, page_num: PageNumber) -> DbResult<PageHandle>;

    /// Decrements the pin count of `ph`'s frame. `O(1)`: resolved directly
    /// through the handle's `Rc` rather than re-scanning the frame table.
    fn unpin_page(&mut self, ph: &PageHandle) -> DbResult<()>;

    /// Marks `ph`'s frame dirty. `O(1)`, same rationale as `unpin_page`.
    fn mark_dirty(&mut self, ph: &PageHandle) -> DbResult<()>;

    /// Writes `ph`'s frame to the backing file if dirty, regardless of pin
    /// count. `O(1)`, same rationale as `unpin_page`.
    fn force_page(&mut self, ph: &PageHandle) -> DbResult<()>;

    /// Flushes every dirty, unpinned frame and clears their dirty bits.
    fn force_flush_pool(&mut self) -> DbResult<()>;

    /// Flushes every dirty frame and releases the backing file handle.
    fn shutdown_buffer_pool(&mut self) -> DbResult<()>;

    /// Page number held by each frame, in frame order (`NO_PAGE` if empty).
    fn get_frame_contents(&self) -> Vec<PageNumber>;

    /// Dirty bit of each frame, in frame order.
    fn get_dirty_flags(&self) -> Vec<bool>;

    /// Pin count of each frame, in frame order.
    fn get_fix_counts(&self) -> Vec<i32>;

    /// Total number of pages read from disk since the pool was created.
    fn get_num_read_io(&self) -> u64;

    /// Total number of pages written to disk since the pool was created.
    fn get_num_write_io(&self) -> u64;
}

/// A fixed-capacity pool of frames backed by a single page file.
pub struct BufferPool {
    file: PageFileHandle,
    frames: Vec<Rc<RefCell<Frame>>>,
    strategy: ReplacementStrategy,
    read_io: u64,
    write_io: u64,
    fifo_queue: VecDeque<usize>,
    lru_order: VecDeque<usize>,
}

impl BufferPool {
    /// Creates a pool with `num_pages` frames over `file`.
    pub fn new(file: PageFileHandle, num_pages: usize, strategy: ReplacementStrategy) -> Self {
        let frames = (0..num_pages)
            .map(|_| Rc::new(RefCell::new(Frame::empty())))
            .collect();
        Self {
            file,
            frames,
            strategy: strategy.normalized(),
            read_io: 0,
            write_io: 0,
            fifo_queue: VecDeque::new(),
            lru_order: VecDeque::new(),
        }
    }

    /// Alias matching the original API's explicit init call.
    pub fn init_buffer_pool(
        file: PageFileHandle,
        num_pages: usize,
        strategy: ReplacementStrategy,
    ) -> Self {
        Self::new(file, num_pages, strategy)
    }

    fn index_of(&self, page_num: PageNumber) -> Option<usize> {
        self.frames
            .iter()
            .position(|f| f.borrow().page_num == page_num)
    }

    fn touch_lru(&mut self, idx: usize) {
        self.lru_order.retain(|&i| i != idx);
        self.lru_order.push_back(idx);
    }

    fn select_victim(&mut self) -> DbResult<usize> {
        match self.strategy {
            ReplacementStrategy::Fifo => {
                // Pinned entries encountered while scanning for a victim are
                // dropped, not re-enqueued — they lose their FIFO slot. This
                // matches the original implementation's behavior (see
                // DESIGN.md) rather than the more "fair" choice of giving
                // them another turn.
                loop {
                    let Some(idx) = self.fifo_queue.pop_front() else {
                        return Err(DbError::NoFreeBuffer(
                            "every frame is pinned".to_string(),
                        ));
                    };
                    if self.frames[idx].borrow().fix_count > 0 {
                        continue;
                    }
                    return Ok(idx);
                }
            }
            ReplacementStrategy::Lru | ReplacementStrategy::LruK => {
                // Walk from the back (least recently used) toward the front
                // without mutating the list while scanning — a scan is not a
                // pin event, so frames it merely passes over keep their
                // exact relative order (§4.2: only a successful pin moves a
                // frame to the front).
                let pos = self
                    .lru_order
                    .iter()
                    .rev()
                    .position(|&idx| self.frames[idx].borrow().fix_count == 0);
                match pos {
                    Some(rev_pos) => {
                        let real_pos = self.lru_order.len() - 1 - rev_pos;
                        Ok(self.lru_order.remove(real_pos).unwrap())
                    }
                    None => Err(DbError::NoFreeBuffer("every frame is pinned".to_string())),
                }
            }
        }
    }

    fn evict_into(&mut self, idx: usize) -> DbResult<()> {
        let (old_page, dirty) = {
            let frame = self.frames[idx].borrow();
            (frame.page_num, frame.dirty)
        };
        if old_page != NO_PAGE && dirty {
            let data = self.frames[idx].borrow().data.clone();
            write_block(&mut self.file, old_page, &data)?;
            self.write_io += 1;
        }
        Ok(())
    }

    fn record_frame_use(&mut self, idx: usize) {
        match self.strategy {
            ReplacementStrategy::Fifo => {
                if !self.fifo_queue.contains(&idx) {
                    self.fifo_queue.push_back(idx);
                }
            }
            ReplacementStrategy::Lru | ReplacementStrategy::LruK => self.touch_lru(idx),
        }
    }
}

impl BufferManager for BufferPool {
    fn pin_page(&mut self, page_num: PageNumber) -> DbResult<PageHandle> {
        if let Some(idx) = self.index_of(page_num) {
            self.frames[idx].borrow_mut().fix_count += 1;
            if self.strategy == ReplacementStrategy::Lru {
                self.touch_lru(idx);
            }
            return Ok(PageHandle {
                page_num,
                frame: Rc::clone(&self.frames[idx]),
            });
        }

        let idx = match self.frames.iter().position(|f| f.borrow().page_num == NO_PAGE) {
            Some(idx) => idx,
            None => self.select_victim()?,
        };

        self.evict_into(idx)?;

        if page_num >= self.file.total_num_pages() {
            storage::ensure_capacity(&mut self.file, page_num + 1)?;
        }
        let data = read_block(&mut self.file, page_num)?;
        self.read_io += 1;

        {
            let mut frame = self.frames[idx].borrow_mut();
            frame.page_num = page_num;
            frame.data = Box::new(data);
            frame.dirty = false;
            frame.fix_count = 1;
        }

        self.record_frame_use(idx);

        Ok(PageHandle {
            page_num,
            frame: Rc::clone(&self.frames[idx]),
        })
    }

    fn unpin_page(&mut self, ph: &PageHandle) -> DbResult<()> {
        if !ph.still_resident() {
            return Err(DbError::ReadNonExistingPage(format!(
                "page {} not pinned",
                ph.page_num
            )));
        }
        let mut frame = ph.frame.borrow_mut();
        if frame.fix_count > 0 {
            frame.fix_count -= 1;
        }
        Ok(())
    }

    fn mark_dirty(&mut self, ph: &PageHandle) -> DbResult<()> {
        if !ph.still_resident() {
            return Err(DbError::ReadNonExistingPage(format!(
                "page {} not pinned",
                ph.page_num
            )));
        }
        ph.frame.borrow_mut().dirty = true;
        Ok(())
    }

    fn force_page(&mut self, ph: &PageHandle) -> DbResult<()> {
        if !ph.still_resident() {
            return Err(DbError::ReadNonExistingPage(format!(
                "page {} not pinned",
                ph.page_num
            )));
        }

        let (dirty, data) = {
            let frame = ph.frame.borrow();
            (frame.dirty, frame.data.clone())
        };
        if dirty {
            write_block(&mut self.file, ph.page_num, &data)?;
            self.write_io += 1;
            ph.frame.borrow_mut().dirty = false;
        }
        Ok(())
    }

    fn force_flush_pool(&mut self) -> DbResult<()> {
        for idx in 0..self.frames.len() {
            let (page_num, dirty, fix_count) = {
                let frame = self.frames[idx].borrow();
                (frame.page_num, frame.dirty, frame.fix_count)
            };
            if page_num == NO_PAGE || fix_count > 0 || !dirty {
                continue;
            }
            let data = self.frames[idx].borrow().data.clone();
            write_block(&mut self.file, page_num, &data)?;
            self.write_io += 1;
            self.frames[idx].borrow_mut().dirty = false;
        }
        Ok(())
    }

    fn shutdown_buffer_pool(&mut self) -> DbResult<()> {
        for idx in 0..self.frames.len() {
            let (page_num, dirty, fix_count) = {
                let frame = self.frames[idx].borrow();
                (frame.page_num, frame.dirty, frame.fix_count)
            };
            if page_num == NO_PAGE || !dirty || fix_count > 0 {
                continue;
            }
            let data = self.frames[idx].borrow().data.clone();
            write_block(&mut self.file, page_num, &data)?;
            self.write_io += 1;
            self.frames[idx].borrow_mut().dirty = false;
        }
        storage::close_page_file(&mut self.file)
    }

    fn get_frame_contents(&self) -> Vec<PageNumber> {
        self.frames.iter().map(|f| f.borrow().page_num).collect()
    }

    fn get_dirty_flags(&self) -> Vec<bool> {
        self.frames.iter().map(|f| f.borrow().dirty).collect()
    }

    fn get_fix_counts(&self) -> Vec<i32> {
        self.frames.iter().map(|f| f.borrow().fix_count).collect()
    }

    fn get_num_read_io(&self) -> u64 {
        self.read_io
    }

    fn get_num_write_io(&self) -> u64 {
        self.write_io
    }
}

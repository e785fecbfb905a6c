
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use common::{DbError, DbResult, PageNumber};

/// Fixed page size in bytes. Every page file is a flat sequence of
/// `PAGE_SIZE`-byte blocks; there is no header, no slotting, no record
/// format at this layer.
pub const PAGE_SIZE: usize = 4096;

/// A single page's worth of bytes.
pub type PageBuf = [u8; PAGE_SIZE];

/// A page filled with zero bytes, used to grow a file.
pub fn zero_page() -> PageBuf {
    [0u8; PAGE_SIZE]
}

/// A handle to an open page file.
///
/// `file` is `None` between `close_page_file` and the handle being reopened
/// — calling any I/O operation against a closed handle returns
/// `DbError::FileHandleNotInit`.
pub struct PageFileHandle {
    file_name: String,
    total_num_pages: i64,
    cur_page_pos: i64,
    file: Option<File>,
}

impl PageFileHandle {
    /// Name the handle was opened or created with.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Number of `PAGE_SIZE`-byte pages currently in the file.
    pub fn total_num_pages(&self) -> i64 {
        self.total_num_pages
    }

    /// The page number the internal cursor currently points at.
    pub fn cur_page_pos(&self) -> i64 {
        self.cur_page_pos
    }

    fn file_mut(&mut self) -> DbResult<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| DbError::FileHandleNotInit(self.file_name.clone()))
    }
}

/// Creates a new page file containing a single zeroed page.
///
/// Fails with `DbError::WriteFailed` if the file cannot be created or the
/// initial page cannot be written.
pub fn create_page_file(path: impl AsRef<Path>) -> DbResult<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| DbError::WriteFailed(format!("{}: {e}", path.display())))?;

    file.write_all(&zero_page())
        .map_err(|e| DbError::WriteFailed(format!("{}: {e}", path.display())))?;
    file.flush()
        .map_err(|e| DbError::WriteFailed(format!("{}: {e}", path.display())))?;
    Ok(())
}

/// Opens an existing page file, positioning the cursor on page 0.
///
/// Fails with `DbError::FileNotFound` if `path` does not exist.
pub fn open_page_file(path: impl AsRef<Path>) -> DbResult<PageFileHandle> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|_| DbError::FileNotFound(path.display().to_string()))?;

    let len = file
        .metadata()
        .map_err(|e| DbError::FileNotFound(format!("{}: {e}", path.display())))?
        .len();
    let total_num_pages = (len / PAGE_SIZE as u64) as i64;

    Ok(PageFileHandle {
        file_name: path.display().to_string(),
        total_num_pages,
        cur_page_pos: 0,
        file: Some(file),
    })
}

/// Closes a page file handle, releasing its underlying `File`.
///
/// Calling this twice on the same handle returns `DbError::FileHandleNotInit`
/// on the second call.
pub fn close_page_file(handle: &mut PageFileHandle) -> DbResult<()> {
    if handle.file.take().is_none() {
        return Err(DbError::FileHandleNotInit(handle.file_name.clone()));
    }
    handle.total_num_pages = 0;
    handle.cur_page_pos = 0;
    Ok(())
}

/// Removes a page file from disk.
///
/// Fails with `DbError::FileNotFound` if no such file exists.
pub fn destroy_page_file(path: impl AsRef<Path>) -> DbResult<()> {
    let path = path.as_ref();
    std::fs::remove_file(path).map_err(|_| DbError::FileNotFound(path.display().to_string()))
}

fn read_at(handle: &mut PageFileHandle, page_num: i64) -> DbResult<PageBuf> {
    if page_num < 0 || page_num >= handle.total_num_pages {
        return Err(DbError::ReadNonExistingPage(format!(
            "page {page_num} out of range (0..{})",
            handle.total_num_pages
        )));
    }

    let name = handle.file_name.clone();
    let file = handle.file_mut()?;
    file.seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))
        .map_err(|e| DbError::ReadNonExistingPage(format!("{name}: {e}")))?;

    let mut buf = zero_page();
    file.read_exact(&mut buf)
        .map_err(|e| DbError::ReadNonExistingPage(format!("{name}: {e}")))?;

    handle.cur_page_pos = page_num;
    Ok(buf)
}

/// Reads the page at `page_num`, moving the cursor there.
pub fn read_block(handle: &mut PageFileHandle, page_num: i64) -> DbResult<PageBuf> {
    read_at(handle, page_num)
}

/// Reads page 0.
pub fn read_first_block(handle: &mut PageFileHandle) -> DbResult<PageBuf> {
    read_at(handle, 0)
}

/// Reads the last page in the file.
pub fn read_last_block(handle: &mut PageFileHandle) -> DbResult<PageBuf> {
    read_at(handle, handle.total_num_pages - 1)
}

/// Reads the page the cursor currently points at.
pub fn read_current_block(handle: &mut PageFileHandle) -> DbResult<PageBuf> {
    read_at(handle, handle.cur_page_pos)
}

/// Reads the page after the cursor.
pub fn read_next_block(handle: &mut PageFileHandle) -> DbResult<PageBuf> {
    read_at(handle, handle.cur_page_pos + 1)
}

/// Reads the page before the cursor.
pub fn read_previous_block(handle: &mut PageFileHandle) -> DbResult<PageBuf> {
    read_at(handle, handle.cur_page_pos - 1)
}

/// Returns the page number the cursor currently points at, or `-1` for a
/// closed/cleared handle.
pub fn get_block_pos(handle: &PageFileHandle) -> i64 {
    if handle.file.is_none() {
        return -1;
    }
    handle.cur_page_pos
}

/// Writes `data` to page `page_num`, growing the file with zeroed pages
/// first via `ensure_capacity` if `page_num` is beyond the current end.
pub fn write_block(handle: &mut PageFileHandle, page_num: i64, data: &PageBuf) -> DbResult<()> {
    if page_num < 0 {
        return Err(DbError::WriteFailed(format!(
            "page {page_num} out of range (0..{})",
            handle.total_num_pages
        )));
    }
    if page_num >= handle.total_num_pages {
        ensure_capacity(handle, page_num + 1)?;
    }

    let name = handle.file_name.clone();
    let file = handle.file_mut()?;
    file.seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))
        .map_err(|e| DbError::WriteFailed(format!("{name}: {e}")))?;
    file.write_all(data)
        .map_err(|e| DbError::WriteFailed(format!("{name}: {e}")))?;
    file.flush()
        .map_err(|e| DbError::WriteFailed(format!("{name}: {e}")))?;

    handle.cur_page_pos = page_num;
    Ok(())
}

/// Writes `data` to the page the cursor currently points at.
pub fn write_current_block(handle: &mut PageFileHandle, data: &PageBuf) -> DbResult<()> {
    write_block(handle, handle.cur_page_pos, data)
}

/// Appends a single zeroed page to the end of the file.
pub fn append_empty_block(handle: &mut PageFileHandle) -> DbResult<()> {
    let name = handle.file_name.clone();
    let new_page_num = handle.total_num_pages;
    let file = handle.file_mut()?;

    file.seek(SeekFrom::Start(new_page_num as u64 * PAGE_SIZE as u64))
        .map_err(|e| DbError::WriteFailed(format!("{name}: {e}")))?;
    file.write_all(&zero_page())
        .map_err(|e| DbError::WriteFailed(format!("{name}: {e}")))?;
    file.flush()
        .map_err(|e| DbError::WriteFailed(format!("{name}: {e}")))?;

    handle.total_num_pages += 1;
    handle.cur_page_pos = new_page_num;
    Ok(())
}

/// Grows the file with zeroed pages, if needed, until it has at least
/// `num_pages` pages.
pub fn ensure_capacity(handle: &mut PageFileHandle, num_pages: i64) -> DbResult<()> {
    while handle.total_num_pages < num_pages {
        append_empty_block(handle)?;
    }
    Ok(())
}

/// Tracks which page files are currently open, so a caller cannot destroy a
/// file out from under a live handle.
///
/// This replaces the single process-global "last opened file" pointer the
/// original implementation relied on: ownership here is explicit and a
/// `StorageManager` can track any number of concurrently open names.
#[derive(Default)]
pub struct StorageManager {
    open_files: HashSet<String>,
}

impl StorageManager {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias for `new`, matching the original API's explicit init call.
    pub fn init_storage_manager() -> Self {
        Self::new()
    }

    /// Opens a page file and records it as open.
    pub fn open_page_file(&mut self, path: impl AsRef<Path>) -> DbResult<PageFileHandle> {
        let handle = open_page_file(&path)?;
        self.open_files.insert(handle.file_name.clone());
        Ok(handle)
    }

    /// Closes a page file and removes it from the registry.
    pub fn close_page_file(&mut self, handle: &mut PageFileHandle) -> DbResult<()> {
        let name = handle.file_name.clone();
        close_page_file(handle)?;
        self.open_files.remove(&name);
        Ok(())
    }

    /// Destroys a page file, refusing if it is still tracked as open.
    pub fn destroy_page_file(&mut self, path: impl AsRef<Path>) -> DbResult<()> {
        let name = path.as_ref().display().to_string();
        if self.open_files.contains(&name) {
            return Err(DbError::FileHandleNotInit(format!(
                "{name} is still open; close it before destroying"
            )));
        }
        destroy_page_file(path)
    }

    /// Names currently tracked as open.
    pub fn open_file_names(&self) -> impl Iterator<Item = &str> {
        self.open_files.iter().map(String::as_str)
    }
}

/// Narrowing conversion used by the buffer layer, which reports page
/// numbers through `common::PageNumber` rather than this crate's raw `i64`s.
pub fn as_page_number(page_num: i64) -> PageNumber {
    page_num as PageNumber
}

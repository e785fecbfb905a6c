//! Minimal embedding example for the `storage`/`buffer` crates.
//!
//! This is not part of the page store itself — it is the "sample program
//! may embed it" demonstration called out in the external-interfaces
//! section of the design: create a page file, pin pages through a buffer
//! pool, write through them, and print pool statistics as a table.

use std::path::PathBuf;

use anyhow::{Context, Result};
use buffer::{BufferManager, BufferPool};
use clap::{Parser, Subcommand};
use common::{pretty, PageNumber, ReplacementStrategy};

#[derive(Parser, Debug)]
#[command(name = "pagestore-cli", about = "Embed the page store from a CLI")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new, single-page page file.
    Create {
        /// Path of the page file to create.
        file: PathBuf,
    },
    /// Pin a page, overwrite its first byte, mark it dirty, and flush it.
    Write {
        /// Path of an existing page file.
        file: PathBuf,
        /// Page number to write.
        #[arg(long)]
        page: i64,
        /// Byte value to write at offset 0 of the page.
        #[arg(long, default_value_t = 0xAB)]
        value: u8,
        /// Number of frames the buffer pool holds.
        #[arg(long, default_value_t = 8)]
        buffer_pages: usize,
        /// Replacement strategy: fifo, lru, or lru-k.
        #[arg(long, default_value = "lru")]
        strategy: StrategyArg,
    },
    /// Pin a page and print the first few bytes of its contents.
    Read {
        /// Path of an existing page file.
        file: PathBuf,
        /// Page number to read.
        #[arg(long)]
        page: i64,
        /// Number of frames the buffer pool holds.
        #[arg(long, default_value_t = 8)]
        buffer_pages: usize,
    },
    /// Pin every listed page (without unpinning) and print pool statistics.
    Stats {
        /// Path of an existing page file.
        file: PathBuf,
        /// Comma-separated page numbers to pin before printing.
        #[arg(long, value_delimiter = ',')]
        pages: Vec<i64>,
        /// Number of frames the buffer pool holds.
        #[arg(long, default_value_t = 8)]
        buffer_pages: usize,
        /// Replacement strategy: fifo, lru, or lru-k.
        #[arg(long, default_value = "lru")]
        strategy: StrategyArg,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum StrategyArg {
    Fifo,
    Lru,
    #[value(name = "lru-k")]
    LruK,
}

impl From<StrategyArg> for ReplacementStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Fifo => ReplacementStrategy::Fifo,
            StrategyArg::Lru => ReplacementStrategy::Lru,
            StrategyArg::LruK => ReplacementStrategy::LruK,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Create { file } => {
            storage::create_page_file(&file)
                .with_context(|| format!("creating {}", file.display()))?;
            println!("created {} (1 page)", file.display());
        }
        Command::Write {
            file,
            page,
            value,
            buffer_pages,
            strategy,
        } => {
            let handle = storage::open_page_file(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let mut pool = BufferPool::new(handle, buffer_pages, strategy.into());

            let page_num: PageNumber = page;
            let mut ph = pool.pin_page(page_num)?;
            ph.data_mut()[0] = value;
            pool.mark_dirty(&ph)?;
            pool.unpin_page(&ph)?;
            pool.shutdown_buffer_pool()?;

            println!(
                "wrote byte 0x{value:02x} to page {page} of {} ({} page write(s))",
                file.display(),
                pool.get_num_write_io()
            );
        }
        Command::Read {
            file,
            page,
            buffer_pages,
        } => {
            let handle = storage::open_page_file(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let mut pool = BufferPool::new(handle, buffer_pages, ReplacementStrategy::Lru);

            let page_num: PageNumber = page;
            let ph = pool.pin_page(page_num)?;
            let bytes = &ph.data()[0..16.min(storage::PAGE_SIZE)];
            println!("page {page} first bytes: {bytes:02x?}");
            pool.unpin_page(&ph)?;
            pool.shutdown_buffer_pool()?;
        }
        Command::Stats {
            file,
            pages,
            buffer_pages,
            strategy,
        } => {
            let handle = storage::open_page_file(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let mut pool = BufferPool::new(handle, buffer_pages, strategy.into());

            for page_num in pages {
                pool.pin_page(page_num)?;
            }

            let table = pretty::render_frame_table(
                &pool.get_frame_contents(),
                &pool.get_dirty_flags(),
                &pool.get_fix_counts(),
                pretty::TableStyleKind::Modern,
            );
            println!("{table}");
            println!(
                "reads={} writes={}",
                pool.get_num_read_io(),
                pool.get_num_write_io()
            );
        }
    }

    Ok(())
}

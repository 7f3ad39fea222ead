//! Region based ("arena") memory allocator.
//!
//! Memory is taken from a [`Backend`] in large blocks ([`Region`]s) and handed
//! out by bumping a cursor. Nothing is freed individually: an [`Arena`] is
//! rewound in bulk with [`Arena::free_all`] and gives its regions back to the
//! backend only when it is dropped. This suits phase oriented lifetimes such as
//! parse then discard, frame then reset or request then free.
//!
//! ```text
//!   Arena
//!   +------------------------------------------------------------------+
//!   |  head                                        tail                |
//!   |  +---------------------------+     +---------------------------+ |
//!   |  | A1 | A2 |pad| A3 |  free  | --> | A4 |        free          | |
//!   |  +---------------------------+     +---------------------------+ |
//!   |                                         ^                        |
//!   |                                      current                     |
//!   +------------------------------------------------------------------+
//! ```
//!
//! Which backend [`Arena::new`] uses is fixed at build time through Cargo
//! features (`backend-mmap`, `backend-virtualalloc`, process heap otherwise);
//! any other [`Backend`] can be plugged in with [`Arena::with_backend`].
//!
//! Arenas and regions are single threaded. Callers that share one must
//! serialize access themselves, or keep one arena per thread.
//!
//! # Example
//!
//! ```
//! use lzarena::Arena;
//!
//! let mut arena = Arena::new();
//!
//! let first = arena.alloc_align(16, 100).unwrap();
//! let second = arena.alloc_align(16, 100).unwrap();
//! assert!(first < second);
//! assert_eq!(arena.used_memory(), 200);
//!
//! arena.free_all();
//! assert_eq!(arena.alloc_align(16, 100), Some(first));
//! ```

pub mod backend;

mod arena;
mod config;
mod error;
mod kernel;
mod list;
mod region;
mod report;
mod utils;

pub use arena::Arena;
pub use backend::{Backend, CallbackBackend, DefaultBackend, HeapBackend};
#[cfg(unix)]
pub use backend::MmapBackend;
#[cfg(windows)]
pub use backend::VirtualAllocBackend;
pub use config::{ArenaConfig, BACKEND_ALIGNMENT, DEFAULT_ALIGNMENT, DEFAULT_FACTOR};
pub use error::{AllocError, Status};
pub use kernel::page_size;
pub use region::Region;
pub use report::Report;
pub use utils::{align, is_power_of_two};

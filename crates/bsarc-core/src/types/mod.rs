//! Path newtypes used during extraction.
//!
//! Both types are validated on construction and cannot be built from raw
//! strings or paths any other way.

pub mod dest_dir;
pub mod entry_path;

pub use dest_dir::DestDir;
pub use entry_path::EntryPath;

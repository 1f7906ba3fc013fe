//! I/O utilities shared by the container readers.

pub mod reader;

pub use reader::ByteReader;

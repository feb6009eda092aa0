//! VTK XML UnstructuredGrid (`.vtu`) codec.

pub mod encoding;
pub mod reader;
pub mod writer;

pub use reader::read_vtu;
pub use writer::{write_vtu, VtuWriteOptions};

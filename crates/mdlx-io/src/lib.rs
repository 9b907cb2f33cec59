//! File I/O for MDL/MDX model pairs.
//!
//! A model lives in two files: `name.mdl` holds the node hierarchy and
//! `name.mdx` the per-vertex attributes. [`MdlReader`] loads both and runs
//! the core decoder; [`MdlWriter`] encodes a model and writes both.
//!
//! ```ignore
//! use mdlx_io::{MdlReader, MdlWriter, Reader, Writer};
//!
//! let model = MdlReader::open("c_rat.mdl")?.read_model()?;
//! let mut writer = MdlWriter::new();
//! writer.add_model(&model)?;
//! writer.write("out/c_rat.mdl")?;
//! ```

pub mod error;
pub mod traits;

#[cfg(feature = "decoder")]
pub mod mdl_reader;
#[cfg(feature = "encoder")]
pub mod mdl_writer;

/// Extension of the external stream next to a model file.
pub const EXTERNAL_EXTENSION: &str = "mdx";

pub use error::MdlIoError;
pub use traits::{Reader, Writer};

#[cfg(feature = "decoder")]
pub use mdl_reader::MdlReader;
#[cfg(feature = "encoder")]
pub use mdl_writer::MdlWriter;

//! Common traits for model readers and writers.
//!
//! Callers that only need "some source of models" can be generic over
//! [`Reader`], and likewise over [`Writer`] for sinks:
//!
//! ```ignore
//! fn convert<R: Reader, W: Writer>(input: &str, output: &str) -> io::Result<()> {
//!     let model = R::open(input)?.read_model()?;
//!     let mut writer = W::new();
//!     writer.add_model(&model)?;
//!     writer.write(output)
//! }
//! ```

use std::io;
use std::path::Path;

use mdlx_core::Model;

/// Common interface for model readers.
pub trait Reader: Sized {
    /// Open a file for reading.
    fn open<P: AsRef<Path>>(path: P) -> io::Result<Self>;

    /// Read the model stored in the file.
    fn read_model(&mut self) -> io::Result<Model>;

    /// Read every model in the source (default: the single model).
    fn read_models(&mut self) -> io::Result<Vec<Model>> {
        Ok(vec![self.read_model()?])
    }
}

/// Common interface for model writers.
pub trait Writer: Sized {
    /// Create a new writer instance.
    fn new() -> Self;

    /// Add a model to be written.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if the model cannot be encoded
    fn add_model(&mut self, model: &Model) -> io::Result<()>;

    /// Write everything added so far.
    fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()>;

    /// Number of geometry nodes added.
    fn node_count(&self) -> usize;
}

//! Writer producing a `.mdl` file and its sibling `.mdx` external stream.

use std::fs;
use std::io;
use std::path::Path;

use mdlx_core::{EncodedModel, EncoderOptions, Model, ModelEncoder};

use crate::error::MdlIoError;
use crate::traits::Writer;
use crate::EXTERNAL_EXTENSION;

/// Encodes one model and writes both streams.
///
/// The model is encoded when it is added, so encode errors surface from
/// [`Writer::add_model`] and [`Writer::write`] only performs file I/O.
#[derive(Debug, Default)]
pub struct MdlWriter {
    options: EncoderOptions,
    name: Option<String>,
    encoded: Option<EncodedModel>,
    node_count: usize,
}

impl MdlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: EncoderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn add_model(&mut self, model: &Model) -> io::Result<()> {
        if let Some(name) = &self.name {
            return Err(MdlIoError::AlreadyAdded(name.clone()).into());
        }
        let encoded = ModelEncoder::with_options(self.options.clone())
            .encode(model)
            .map_err(|source| MdlIoError::Codec {
                path: model.name.clone().into(),
                source,
            })?;
        self.name = Some(model.name.clone());
        self.node_count = model.node_count();
        self.encoded = Some(encoded);
        Ok(())
    }

    /// Writes `path` and the external stream next to it.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let encoded = self.encoded.as_ref().ok_or(MdlIoError::NoModel)?;
        let path = path.as_ref();
        let external_path = path.with_extension(EXTERNAL_EXTENSION);
        fs::write(path, &encoded.mdl)?;
        fs::write(&external_path, &encoded.mdx)?;
        log::info!(
            "wrote {} ({} bytes) and {} ({} bytes)",
            path.display(),
            encoded.mdl.len(),
            external_path.display(),
            encoded.mdx.len()
        );
        Ok(())
    }
}

impl Writer for MdlWriter {
    fn new() -> Self {
        MdlWriter::new()
    }

    fn add_model(&mut self, model: &Model) -> io::Result<()> {
        MdlWriter::add_model(self, model)
    }

    fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        MdlWriter::write(self, path)
    }

    fn node_count(&self) -> usize {
        self.node_count
    }
}

//! Reader for a `.mdl` file and its sibling `.mdx` external stream.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mdlx_core::{DecoderOptions, Diagnostic, Model, ModelDecoder};

use crate::error::MdlIoError;
use crate::traits::Reader;
use crate::EXTERNAL_EXTENSION;

/// Reads a model pair from disk.
///
/// The external stream is looked up next to the model file with the `mdx`
/// extension. A missing external stream is not an error; the model then
/// decodes without normals, UVs or skin weights.
#[derive(Debug)]
pub struct MdlReader {
    path: PathBuf,
    external_path: Option<PathBuf>,
    options: DecoderOptions,
    diagnostics: Vec<Diagnostic>,
}

impl MdlReader {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            ));
        }
        let external_path = Some(path.with_extension(EXTERNAL_EXTENSION)).filter(|p| p.is_file());
        if external_path.is_none() {
            log::debug!("{}: no external stream", path.display());
        }
        Ok(Self {
            path,
            external_path,
            options: DecoderOptions::default(),
            diagnostics: Vec::new(),
        })
    }

    pub fn with_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn external_path(&self) -> Option<&Path> {
        self.external_path.as_deref()
    }

    /// Problems corrected during the last read.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn read_model(&mut self) -> io::Result<Model> {
        let mdl = fs::read(&self.path)?;
        let mdx = self.external_path.as_ref().map(fs::read).transpose()?;
        log::info!(
            "reading {} ({} bytes, {} external bytes)",
            self.path.display(),
            mdl.len(),
            mdx.as_ref().map_or(0, Vec::len)
        );

        self.diagnostics.clear();
        ModelDecoder::with_options(self.options.clone())
            .decode_with_diagnostics(&mdl, mdx.as_deref(), &mut self.diagnostics)
            .map_err(|source| {
                MdlIoError::Codec {
                    path: self.path.clone(),
                    source,
                }
                .into()
            })
    }
}

impl Reader for MdlReader {
    fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        MdlReader::open(path)
    }

    fn read_model(&mut self) -> io::Result<Model> {
        MdlReader::read_model(self)
    }
}

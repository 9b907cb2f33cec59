use crate::version::Revision;

#[derive(Debug, Clone, Default)]
pub struct EncoderOptions {
    revision: Revision,
    compress_orientations: bool,
}

impl EncoderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision(revision: Revision) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }

    pub fn get_revision(&self) -> Revision {
        self.revision
    }

    pub fn set_revision(&mut self, revision: Revision) {
        self.revision = revision;
    }

    /// Whether linear orientation controllers are packed into 32-bit
    /// quaternions. Packing is lossy; see [`crate::quaternion_compression`].
    pub fn get_compress_orientations(&self) -> bool {
        self.compress_orientations
    }

    pub fn set_compress_orientations(&mut self, value: bool) {
        self.compress_orientations = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_newer_revision() {
        let options = EncoderOptions::new();
        assert_eq!(options.get_revision(), Revision::B);
        assert!(!options.get_compress_orientations());
    }

    #[test]
    fn test_setters() {
        let mut options = EncoderOptions::with_revision(Revision::A);
        assert_eq!(options.get_revision(), Revision::A);
        options.set_revision(Revision::B);
        options.set_compress_orientations(true);
        assert_eq!(options.get_revision(), Revision::B);
        assert!(options.get_compress_orientations());
    }
}

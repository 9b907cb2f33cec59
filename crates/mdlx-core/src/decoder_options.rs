#[derive(Debug, Clone, Default)]
pub struct DecoderOptions {
    fast_load: bool,
}

impl DecoderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render-only decoding: animations and controllers are skipped.
    pub fn get_fast_load(&self) -> bool {
        self.fast_load
    }

    pub fn set_fast_load(&mut self, value: bool) {
        self.fast_load = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mut options = DecoderOptions::new();
        assert!(!options.get_fast_load());
        options.set_fast_load(true);
        assert!(options.get_fast_load());
    }
}

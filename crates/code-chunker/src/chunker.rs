use crate::assembler::ChunkAssembler;
use crate::config::ChunkerConfig;
use crate::detector::BoundaryDetector;
use crate::error::Result;
use crate::language::Language;
use crate::types::{Chunk, SourceUnit};

/// Main chunker interface: detection followed by assembly
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    detector: BoundaryDetector,
    assembler: ChunkAssembler,
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: BoundaryDetector::from_config(&config),
            assembler: ChunkAssembler::from_config(&config),
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Detect units only
    pub fn detect(&self, file_path: &str, content: &str, language: Language) -> Vec<SourceUnit> {
        self.detector.detect(file_path, content, language)
    }

    /// Chunk code with explicit language
    pub fn chunk(&self, file_path: &str, content: &str, language: Language) -> Vec<Chunk> {
        let units = self.detect(file_path, content, language);
        self.assembler.assemble(file_path, content, &units)
    }

    /// Chunk code, inferring the language from the path extension
    pub fn chunk_path(&self, file_path: &str, content: &str) -> Vec<Chunk> {
        self.chunk(file_path, content, Language::from_path(file_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Chunker::new(ChunkerConfig::with_char_budget(0)).is_err());
    }

    #[test]
    fn test_chunk_path_infers_language() {
        let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
        let chunks = chunker.chunk_path("app.py", "def a():\n    pass\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].language(), Language::Python);
        assert_eq!(chunks[0].units[0].name.as_deref(), Some("a"));
    }
}

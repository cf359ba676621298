use crate::error::ProviderError;
use codedoc_chunker::Language;
use serde::{Deserialize, Serialize};

/// One source file handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Identifies the file in chunk ids and output; must be unique per run
    pub path: String,
    pub text: String,
    /// Overrides extension-based detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            language: None,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
            .unwrap_or_else(|| Language::from_path(&self.path))
    }
}

/// Ordered, finite source of files. Traversal and filtering happen elsewhere.
pub trait FileProvider: Send {
    fn next_file(&mut self) -> Option<Result<SourceFile, ProviderError>>;
}

/// Provider over an in-memory list
#[derive(Debug)]
pub struct VecProvider {
    files: std::vec::IntoIter<Result<SourceFile, ProviderError>>,
}

impl VecProvider {
    #[must_use]
    pub fn new(files: Vec<SourceFile>) -> Self {
        Self::from_results(files.into_iter().map(Ok).collect())
    }

    /// Replays errors too, in position
    #[must_use]
    pub fn from_results(files: Vec<Result<SourceFile, ProviderError>>) -> Self {
        Self {
            files: files.into_iter(),
        }
    }
}

impl FileProvider for VecProvider {
    fn next_file(&mut self) -> Option<Result<SourceFile, ProviderError>> {
        self.files.next()
    }
}

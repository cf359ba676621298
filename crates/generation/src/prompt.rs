use codedoc_chunker::Chunk;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

const DEFAULT_BODY: &str = "Explain what the following {language} code from `{path}` does.\n\
Units: {units}\n\n\
```{language}\n{code}```\n";

const FILE_SUMMARY_BODY: &str = "Summarize what `{path}` ({language}) does and the role it plays, \
based on these explanations of its parts ({units}).\n\n{code}";

const PROJECT_OVERVIEW_BODY: &str = "Write a project overview covering purpose, architecture \
and main components, based on these file summaries ({units}).\n\n{code}";

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(language|path|units|code)\}")
        .unwrap_or_else(|err| unreachable!("invalid placeholder pattern: {err}"))
});

/// Versioned prompt body.
///
/// The version participates in every fingerprint, so changing the wording
/// under a new version invalidates cached explanations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub version: String,
    pub body: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::with_version("v1")
    }
}

impl PromptTemplate {
    pub fn new(version: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            body: body.into(),
        }
    }

    /// Built-in body under a caller-chosen version
    pub fn with_version(version: impl Into<String>) -> Self {
        Self::new(version, DEFAULT_BODY)
    }

    /// Body for the per-file summary pass. `{code}` carries the file's unit
    /// explanations rather than source.
    pub fn file_summary(version: impl Into<String>) -> Self {
        Self::new(version, FILE_SUMMARY_BODY)
    }

    /// Body for the project overview pass over file summaries
    pub fn project_overview(version: impl Into<String>) -> Self {
        Self::new(version, PROJECT_OVERVIEW_BODY)
    }

    /// Substitute `{language}`, `{path}`, `{units}` and `{code}` in one pass;
    /// placeholder-like text inside the code is left alone.
    #[must_use]
    pub fn render(&self, chunk: &Chunk) -> String {
        let language = chunk.language();
        let units = chunk.unit_labels().join(", ");
        PLACEHOLDER_RE
            .replace_all(&self.body, |caps: &Captures| match &caps[1] {
                "language" => language.as_str().to_string(),
                "path" => chunk.file_path.clone(),
                "units" => units.clone(),
                _ => chunk.text.clone(),
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codedoc_chunker::{Chunker, ChunkerConfig, Language};

    fn chunk(text: &str) -> Chunk {
        let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
        chunker.chunk("src/lib.rs", text, Language::Rust).remove(0)
    }

    #[test]
    fn renders_all_placeholders() {
        let template = PromptTemplate::new("t", "{language}|{path}|{units}|{code}");
        let rendered = template.render(&chunk("fn run() {}\n"));
        assert_eq!(rendered, "rust|src/lib.rs|function run|fn run() {}\n");
    }

    #[test]
    fn code_containing_placeholders_is_not_expanded() {
        let template = PromptTemplate::new("t", "{code}{path}");
        let code = "fn f() { println!(\"{path}\"); }\n";
        let rendered = template.render(&chunk(code));
        assert_eq!(rendered, format!("{code}src/lib.rs"));
    }

    #[test]
    fn default_template_mentions_path() {
        let rendered = PromptTemplate::default().render(&chunk("fn run() {}\n"));
        assert!(rendered.contains("`src/lib.rs`"));
        assert!(rendered.contains("```rust\nfn run() {}\n```"));
    }

    #[test]
    fn summary_bodies_use_the_same_placeholders() {
        let c = chunk("fn run() {}\n");
        let file = PromptTemplate::file_summary("file-v1").render(&c);
        assert!(file.contains("`src/lib.rs` (rust)"));
        assert!(file.contains("(function run)"));
        assert!(file.ends_with("fn run() {}\n"));

        let overview = PromptTemplate::project_overview("overview-v1");
        assert_eq!(overview.version, "overview-v1");
        let rendered = overview.render(&c);
        assert!(!rendered.contains("{units}") && !rendered.contains("{code}"));
    }
}

use crate::aggregator::FileDocument;
use crate::error::WriterError;
use std::io::Write;

/// Destination for finished file documents
pub trait OutputWriter {
    fn write_file(&mut self, document: &FileDocument) -> Result<(), WriterError>;
}

/// Keeps documents in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub documents: Vec<FileDocument>,
}

impl OutputWriter for MemoryWriter {
    fn write_file(&mut self, document: &FileDocument) -> Result<(), WriterError> {
        self.documents.push(document.clone());
        Ok(())
    }
}

/// One JSON object per line, for piping into other tools
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputWriter for JsonLinesWriter<W> {
    fn write_file(&mut self, document: &FileDocument) -> Result<(), WriterError> {
        serde_json::to_writer(&mut self.out, document)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codedoc_chunker::Language;

    #[test]
    fn json_lines_round_trip() {
        let doc = FileDocument {
            file_path: "a.rs".into(),
            language: Language::Rust,
            nodes: Vec::new(),
            file_summary: None,
        };
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer.write_file(&doc).unwrap();
        writer.write_file(&doc).unwrap();

        let bytes = writer.into_inner();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: FileDocument = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back, doc);
    }
}

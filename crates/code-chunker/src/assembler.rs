use crate::config::{ChunkerConfig, SizeMetric};
use crate::types::{Chunk, ChunkId, SourceUnit};

/// Greedy, order-preserving packer of units into budgeted chunks
#[derive(Debug, Clone, Copy)]
pub struct ChunkAssembler {
    budget: usize,
    metric: SizeMetric,
}

impl ChunkAssembler {
    #[must_use]
    pub const fn new(budget: usize, metric: SizeMetric) -> Self {
        Self { budget, metric }
    }

    #[must_use]
    pub const fn from_config(config: &ChunkerConfig) -> Self {
        Self::new(config.max_chunk_budget, config.size_metric)
    }

    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// Pack `units` (detected in `source`) into chunks.
    ///
    /// A unit is added while `running + size <= budget`; otherwise the current
    /// chunk is closed first. A unit that exceeds the budget alone becomes its
    /// own chunk flagged `oversized`.
    pub fn assemble(&self, file_path: &str, source: &str, units: &[SourceUnit]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current: Vec<SourceUnit> = Vec::new();
        let mut running = 0usize;

        for unit in units {
            let size = self.metric.measure(unit.text(source));
            if !current.is_empty() && running.saturating_add(size) > self.budget {
                let closed = std::mem::take(&mut current);
                chunks.push(self.close(file_path, source, closed, running, chunks.len()));
                running = 0;
            }
            current.push(unit.clone());
            running = running.saturating_add(size);
        }

        if !current.is_empty() {
            chunks.push(self.close(file_path, source, current, running, chunks.len()));
        }

        chunks
    }

    fn close(
        &self,
        file_path: &str,
        source: &str,
        units: Vec<SourceUnit>,
        size: usize,
        ordinal: usize,
    ) -> Chunk {
        let text: String = units.iter().map(|unit| unit.text(source)).collect();
        let oversized = size > self.budget;
        if oversized {
            let label = units.first().map(SourceUnit::label).unwrap_or_default();
            log::warn!(
                "ChunkOversized: {label} in {file_path} measures {size} against a budget of {}; sending it whole",
                self.budget
            );
        }

        Chunk {
            id: ChunkId::new(file_path, ordinal),
            file_path: file_path.to_string(),
            units,
            text,
            size_estimate: size,
            oversized,
        }
    }
}

/// Assemble with a character budget
pub fn assemble(file_path: &str, source: &str, units: &[SourceUnit], budget: usize) -> Vec<Chunk> {
    ChunkAssembler::new(budget, SizeMetric::Chars).assemble(file_path, source, units)
}

//! Collaborator contracts: where the roster and events come from, and where
//! edits are persisted.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use crate::model::{CalendarEvent, Resource};

/// Supplies the initial resource roster.
pub trait ResourceSource {
    fn list(&self) -> anyhow::Result<Vec<Resource>>;
}

/// Supplies the initial event set, usually scoped to the visible window by
/// the caller.
pub trait EventSource {
    fn list(&self) -> anyhow::Result<Vec<CalendarEvent>>;
}

/// Persistence collaborator. Each call returns the canonical record, which
/// may differ from the one sent (e.g. a server-assigned id).
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn create(&self, event: CalendarEvent) -> anyhow::Result<CalendarEvent>;

    async fn update(&self, event: CalendarEvent) -> anyhow::Result<CalendarEvent>;

    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticResources(pub Vec<Resource>);

impl ResourceSource for StaticResources {
    fn list(&self) -> anyhow::Result<Vec<Resource>> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticEvents(pub Vec<CalendarEvent>);

impl StaticEvents {
    /// Reads one JSON-encoded event per line; blank lines are skipped.
    #[tracing::instrument(skip(reader))]
    pub fn from_jsonl_reader<R: Read>(reader: R, origin: &str) -> anyhow::Result<Self> {
        let reader = BufReader::new(reader);

        let mut out = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let event: CalendarEvent = serde_json::from_str(trimmed)
                .with_context(|| format!("failed parsing {origin} line {}", idx + 1))?;
            out.push(event);
        }

        debug!(count = out.len(), "loaded events from jsonl");
        Ok(Self(out))
    }

    #[tracing::instrument(skip(path), fields(file = %path.display()))]
    pub fn from_jsonl_path(path: &Path) -> anyhow::Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_jsonl_reader(file, &path.display().to_string())
    }
}

impl EventSource for StaticEvents {
    fn list(&self) -> anyhow::Result<Vec<CalendarEvent>> {
        Ok(self.0.clone())
    }
}

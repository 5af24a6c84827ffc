use std::fmt;

/// Where an entry is in its trip through the pipeline.
///
/// Anything that fails after `Deduplicated` abandons the entry without a
/// seen record, so it is retried on the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryStage {
    Discovered,
    Deduplicated,
    TextExtracted,
    SlugAssigned,
    ImageResolved,
    Rewritten,
    Persisted,
    Seen,
}

impl fmt::Display for EntryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryStage::Discovered => "discovered",
            EntryStage::Deduplicated => "deduplicated",
            EntryStage::TextExtracted => "text-extracted",
            EntryStage::SlugAssigned => "slug-assigned",
            EntryStage::ImageResolved => "image-resolved",
            EntryStage::Rewritten => "rewritten",
            EntryStage::Persisted => "persisted",
            EntryStage::Seen => "seen",
        };
        f.write_str(name)
    }
}

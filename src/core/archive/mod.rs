pub mod extract;

pub use extract::{detect_kind, ArchiveExtractor, ArchiveKind, ExtractProgress, ExtractionTask};

pub mod existence;
pub mod outcome;
pub mod scan;

pub use existence::check_existence;
pub use outcome::{ExistenceReport, MatchStatus, ScanRecord, ScanReport};
pub use scan::{CancelToken, ScanOptions, Scanner};

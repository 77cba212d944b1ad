pub mod import;
pub mod study;

pub use import::{ImportReport, ImportService};
pub use study::StudyService;

pub mod comparator;
pub mod engine;
pub mod entry;
pub mod reporter;
pub mod scanner;
pub mod target;
pub mod transfer;

pub use comparator::{ChangeDetector, DecisionReason, TransferDecision};
pub use engine::{SyncConfig, SyncEngine, SyncReport, SyncStatus};
pub use entry::{EntryKind, RemoteEntry, RemotePath};
pub use reporter::{MessageKind, ReportSink, Reporter, TerminalSink};
pub use scanner::RemoteLister;
pub use target::SyncTarget;
pub use transfer::{RetryPolicy, TransferEngine, TransferResult, TransferStatus};

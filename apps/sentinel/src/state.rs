use std::sync::Arc;

use crate::config::Config;
use crate::notify::EmailSender;
use crate::scoring::JobScorer;
use crate::scraping::JobSource;
use crate::storage::history::JobHistory;
use crate::storage::snapshots::SnapshotStore;

/// Everything a run needs, wired once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Job boards. Default: Apify actors.
    pub source: Arc<dyn JobSource>,
    /// Pluggable scorer. Default: LlmJobScorer. Swap via SCORER=keyword.
    pub scorer: Arc<dyn JobScorer>,
    pub email: EmailSender,
    pub history: JobHistory,
    pub snapshots: Arc<SnapshotStore>,
}

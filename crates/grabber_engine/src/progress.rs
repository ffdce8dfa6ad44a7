use std::sync::Arc;

use crate::backend::ProgressSink;
use crate::job::JobEmitter;

/// `floor(downloaded / total * 100)`, capped at 100. `None` when either count
/// is missing or the total is zero.
pub fn percent_of(downloaded: Option<u64>, total: Option<u64>) -> Option<u8> {
    let (downloaded, total) = (downloaded?, total?);
    if total == 0 {
        return None;
    }
    let percent = u128::from(downloaded) * 100 / u128::from(total);
    Some(percent.min(100) as u8)
}

/// Turns byte counts from the backend into `Progress` events for one job.
pub(crate) struct ByteProgress {
    emitter: Arc<JobEmitter>,
}

impl ByteProgress {
    pub(crate) fn new(emitter: Arc<JobEmitter>) -> Self {
        Self { emitter }
    }
}

impl ProgressSink for ByteProgress {
    fn bytes(&self, downloaded: Option<u64>, total: Option<u64>) {
        if let Some(percent) = percent_of(downloaded, total) {
            self.emitter.progress(percent);
        }
    }
}

use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Analyze,
    Metadata,
    Archives,
    Classifications,
    Previews,
    Configuration,
}

impl StageKind {
    pub const ALL: [StageKind; 6] = [
        StageKind::Analyze,
        StageKind::Metadata,
        StageKind::Archives,
        StageKind::Classifications,
        StageKind::Previews,
        StageKind::Configuration,
    ];

    pub fn index(self) -> usize {
        match self {
            StageKind::Analyze => 0,
            StageKind::Metadata => 1,
            StageKind::Archives => 2,
            StageKind::Classifications => 3,
            StageKind::Previews => 4,
            StageKind::Configuration => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StageKind::Analyze => "Analyze",
            StageKind::Metadata => "Metadata",
            StageKind::Archives => "Archives",
            StageKind::Classifications => "Classifications",
            StageKind::Previews => "Previews",
            StageKind::Configuration => "Configuration",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationProgress {
    pub stage: StageKind,
    pub stage_index: usize,
    pub stage_count: usize,
    pub stage_current: usize,
    pub stage_total: usize,
    /// Whole-run progress, 0 to 100.
    pub percent: f32,
    pub item: Option<String>,
}

pub type ProgressCallback = Arc<dyn Fn(MigrationProgress) + Send + Sync>;

pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    pub(crate) fn report(
        &self,
        stage: StageKind,
        stage_current: usize,
        stage_total: usize,
        item: Option<String>,
    ) {
        let Some(callback) = &self.callback else {
            return;
        };
        let stage_count = StageKind::ALL.len();
        let stage_total = stage_total.max(1);
        let stage_current = stage_current.min(stage_total);
        let stage_fraction = (stage_current as f32) / (stage_total as f32);
        let overall = (stage.index() as f32 + stage_fraction) / stage_count as f32;
        callback(MigrationProgress {
            stage,
            stage_index: stage.index() + 1,
            stage_count,
            stage_current,
            stage_total,
            percent: (overall * 100.0).clamp(0.0, 100.0),
            item,
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn overall_percent_tracks_stage_position() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::new(Some(Arc::new(move |event: MigrationProgress| {
            sink.lock().unwrap().push(event);
        })));

        reporter.report(StageKind::Analyze, 0, 1, None);
        reporter.report(StageKind::Archives, 5, 10, Some("abc".to_string()));
        reporter.report(StageKind::Configuration, 3, 0, None);

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].percent, 0.0);
        assert_eq!(events[1].stage_index, 3);
        assert!((events[1].percent - 41.666).abs() < 0.01);
        assert_eq!(events[1].item.as_deref(), Some("abc"));
        assert_eq!(events[2].stage_current, 1);
        assert_eq!(events[2].percent, 100.0);
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }
}

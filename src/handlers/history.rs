use std::collections::VecDeque;

use crate::models::AnalysisResult;

pub const HISTORY_CAPACITY: usize = 5;

/// The last few results of this session, most recent first.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    entries: VecDeque<AnalysisResult>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: AnalysisResult) {
        self.entries.push_front(result);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    pub fn select(&self, index: usize) -> Option<&AnalysisResult> {
        self.entries.get(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<AnalysisResult> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(name: &str) -> AnalysisResult {
        AnalysisResult {
            name: name.to_string(),
            calories: "100 kcal/100g".to_string(),
            timestamp: "2026-10-19 12:00:00".to_string(),
            preview: PathBuf::from(format!("{}.jpg", name)),
        }
    }

    fn names(history: &SessionHistory) -> Vec<String> {
        history.to_vec().into_iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_record_is_most_recent_first() {
        let mut history = SessionHistory::new();
        history.record(result("soup"));
        history.record(result("salad"));

        assert_eq!(names(&history), vec!["salad", "soup"]);
    }

    #[test]
    fn test_sixth_record_evicts_oldest() {
        let mut history = SessionHistory::new();
        for name in ["a", "b", "c", "d", "e"] {
            history.record(result(name));
        }
        assert_eq!(history.len(), 5);

        history.record(result("f"));

        assert_eq!(history.len(), 5);
        assert_eq!(names(&history), vec!["f", "e", "d", "c", "b"]);
    }

    #[test]
    fn test_select_does_not_reorder() {
        let mut history = SessionHistory::new();
        history.record(result("soup"));
        history.record(result("salad"));

        assert_eq!(history.select(1).unwrap().name, "soup");
        assert!(history.select(2).is_none());
        assert_eq!(names(&history), vec!["salad", "soup"]);
    }

    #[test]
    fn test_clear() {
        let mut history = SessionHistory::new();
        history.record(result("soup"));
        history.clear();

        assert!(history.is_empty());
    }
}

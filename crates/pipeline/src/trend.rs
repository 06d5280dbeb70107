//! Short-term temperature trend insights.

use common::{HistoryRecord, Insight, TrendAnalysis, TrendSnapshot};

use crate::normalizer::round2;

/// Degrees above or below the recent average before a reading stops being
/// "normal".
pub const NORMAL_BAND: f64 = 2.0;
pub const DEFAULT_WINDOW: usize = 5;
const MIN_PRIOR_RECORDS: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct TrendAnalyzer {
    window: usize,
}

impl TrendAnalyzer {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Compare `current` with the key's history from *before* the current
    /// reading. Only the last `window` records are considered.
    pub fn analyze(&self, current: Option<f64>, history: &[HistoryRecord]) -> TrendAnalysis {
        if history.len() < MIN_PRIOR_RECORDS {
            return TrendAnalysis::none();
        }
        let Some(current) = current else {
            return TrendAnalysis::none();
        };

        let recent = &history[history.len().saturating_sub(self.window)..];
        let temps: Vec<f64> = recent
            .iter()
            .filter_map(|r| r.reading.averages.temperature)
            .collect();
        if temps.is_empty() {
            return TrendAnalysis::none();
        }

        let recent_average = temps.iter().sum::<f64>() / temps.len() as f64;
        let insight = if current > recent_average + NORMAL_BAND {
            Insight::Above
        } else if current < recent_average - NORMAL_BAND {
            Insight::Below
        } else {
            Insight::Normal
        };

        TrendAnalysis {
            insight,
            trend: Some(TrendSnapshot {
                current,
                recent_average: round2(recent_average),
                data_points: temps.len(),
            }),
        }
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// Session performance telemetry
///
/// Collects timing marks, per-component timing aggregates, web-vital style
/// metrics and image cache counters, and turns them into a 0-100 score.
/// Time for marks is the same session-relative clock the engines use.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::media::ImageCacheStats;

/// Most recent warnings kept; older ones are dropped
pub const MAX_WARNINGS: usize = 50;
/// Marks slower than this are reported by `slow_marks`
pub const SLOW_MARK_THRESHOLD: Duration = Duration::from_millis(100);

/// Page-level vitals, all optional until measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub load_time_ms: Option<f64>,
    pub first_contentful_paint_ms: Option<f64>,
    pub largest_contentful_paint_ms: Option<f64>,
    pub cumulative_layout_shift: Option<f64>,
    pub first_input_delay_ms: Option<f64>,
    pub time_to_interactive_ms: Option<f64>,
}

/// A named span; `end` is None while it is still open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub start: Duration,
    pub end: Option<Duration>,
}

impl Mark {
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_sub(self.start))
    }
}

/// Aggregate for one (component, operation) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingAggregate {
    pub count: u32,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl TimingAggregate {
    fn first(sample: Duration) -> Self {
        Self {
            count: 1,
            total: sample,
            min: sample,
            max: sample,
        }
    }

    fn record(&mut self, sample: Duration) {
        self.count += 1;
        self.total += sample;
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
    }

    pub fn average(&self) -> Duration {
        self.total / self.count.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerfWarning {
    pub level: WarningLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub id: u64,
    /// De-duplication key: at most one suggestion per kind
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    metrics: Metrics,
    marks: BTreeMap<String, Mark>,
    timings: BTreeMap<(String, String), TimingAggregate>,
    cache: ImageCacheStats,
    warnings: Vec<PerfWarning>,
    suggestions: Vec<Suggestion>,
    next_suggestion_id: u64,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn update_metrics(&mut self, update: impl FnOnce(&mut Metrics)) {
        update(&mut self.metrics);
    }

    // ========== Marks ==========

    /// Open (or restart) a named mark
    pub fn mark_start(&mut self, name: &str, now: Duration) {
        self.marks.insert(name.to_string(), Mark { start: now, end: None });
    }

    /// Close a mark; unknown names are ignored
    pub fn mark_end(&mut self, name: &str, now: Duration) -> Option<Duration> {
        let mark = self.marks.get_mut(name)?;
        mark.end = Some(now);
        let duration = mark.duration();
        debug!(mark = name, ?duration, "mark closed");
        duration
    }

    pub fn mark(&self, name: &str) -> Option<&Mark> {
        self.marks.get(name)
    }

    /// Closed marks slower than the threshold, slowest first
    pub fn slow_marks(&self) -> Vec<(&str, Duration)> {
        let mut slow: Vec<(&str, Duration)> = self
            .marks
            .iter()
            .filter_map(|(name, mark)| Some((name.as_str(), mark.duration()?)))
            .filter(|(_, duration)| *duration > SLOW_MARK_THRESHOLD)
            .collect();
        slow.sort_by(|a, b| b.1.cmp(&a.1));
        slow
    }

    // ========== Component timing ==========

    pub fn record_timing(&mut self, component: &str, operation: &str, sample: Duration) {
        self.timings
            .entry((component.to_string(), operation.to_string()))
            .and_modify(|aggregate| aggregate.record(sample))
            .or_insert_with(|| TimingAggregate::first(sample));
    }

    pub fn timing(&self, component: &str, operation: &str) -> Option<&TimingAggregate> {
        self.timings.get(&(component.to_string(), operation.to_string()))
    }

    // ========== Image cache ==========

    pub fn update_cache_stats(&mut self, stats: ImageCacheStats) {
        self.cache = stats;
    }

    pub fn cache_stats(&self) -> &ImageCacheStats {
        &self.cache
    }

    // ========== Warnings and suggestions ==========

    pub fn add_warning(&mut self, level: WarningLevel, message: impl Into<String>) {
        let message = message.into();
        warn!(?level, %message, "performance warning");
        self.warnings.push(PerfWarning {
            level,
            message,
            timestamp: Utc::now(),
        });
        if self.warnings.len() > MAX_WARNINGS {
            let excess = self.warnings.len() - MAX_WARNINGS;
            self.warnings.drain(..excess);
        }
    }

    pub fn warnings(&self) -> &[PerfWarning] {
        &self.warnings
    }

    pub fn critical_warnings(&self) -> impl Iterator<Item = &PerfWarning> {
        self.warnings
            .iter()
            .filter(|w| w.level == WarningLevel::Critical)
    }

    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    /// Add a suggestion unless one of the same kind is already pending.
    /// Returns the id of the new suggestion.
    pub fn add_suggestion(&mut self, kind: &str, message: impl Into<String>) -> Option<u64> {
        if self.suggestions.iter().any(|s| s.kind == kind) {
            return None;
        }
        self.next_suggestion_id += 1;
        let id = self.next_suggestion_id;
        self.suggestions.push(Suggestion {
            id,
            kind: kind.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        });
        Some(id)
    }

    pub fn dismiss_suggestion(&mut self, id: u64) {
        self.suggestions.retain(|s| s.id != id);
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn clear_suggestions(&mut self) {
        self.suggestions.clear();
    }

    // ========== Score ==========

    /// 100 minus penalties for slow paint, layout shift and input delay,
    /// plus a small bonus for a warm image cache. Clamped to 0..=100.
    pub fn score(&self) -> u8 {
        let mut score: i32 = 100;
        let m = &self.metrics;

        match m.largest_contentful_paint_ms {
            Some(lcp) if lcp > 2500.0 => score -= 20,
            Some(lcp) if lcp > 1200.0 => score -= 10,
            _ => {}
        }
        match m.cumulative_layout_shift {
            Some(cls) if cls > 0.25 => score -= 15,
            Some(cls) if cls > 0.1 => score -= 8,
            _ => {}
        }
        match m.first_input_delay_ms {
            Some(fid) if fid > 300.0 => score -= 15,
            Some(fid) if fid > 100.0 => score -= 8,
            _ => {}
        }

        let hit_rate = self.cache.hit_rate();
        if hit_rate > 0.9 {
            score += 5;
        } else if hit_rate > 0.7 {
            score += 3;
        }

        score.clamp(0, 100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ms;

    #[test]
    fn test_marks_measure_and_rank() {
        let mut monitor = PerformanceMonitor::new();
        monitor.mark_start("filter", ms(0));
        monitor.mark_start("hero", ms(10));
        monitor.mark_start("deck", ms(20));

        assert_eq!(monitor.mark_end("filter", ms(50)), Some(ms(50)));
        assert_eq!(monitor.mark_end("hero", ms(310)), Some(ms(300)));
        assert_eq!(monitor.mark_end("deck", ms(170)), Some(ms(150)));
        assert_eq!(monitor.mark_end("missing", ms(200)), None);

        let slow: Vec<&str> = monitor.slow_marks().into_iter().map(|(n, _)| n).collect();
        assert_eq!(slow, vec!["hero", "deck"]);
    }

    #[test]
    fn test_timing_aggregates() {
        let mut monitor = PerformanceMonitor::new();
        monitor.record_timing("deck", "commit", ms(10));
        monitor.record_timing("deck", "commit", ms(30));
        monitor.record_timing("deck", "commit", ms(20));

        let timing = monitor.timing("deck", "commit").unwrap();
        assert_eq!(timing.count, 3);
        assert_eq!(timing.min, ms(10));
        assert_eq!(timing.max, ms(30));
        assert_eq!(timing.average(), ms(20));
        assert!(monitor.timing("deck", "render").is_none());
    }

    #[test]
    fn test_warnings_are_bounded() {
        let mut monitor = PerformanceMonitor::new();
        for i in 0..60 {
            monitor.add_warning(WarningLevel::Warning, format!("warning {i}"));
        }
        monitor.add_warning(WarningLevel::Critical, "out of memory");

        assert_eq!(monitor.warnings().len(), MAX_WARNINGS);
        assert_eq!(monitor.warnings()[0].message, "warning 11");
        assert_eq!(monitor.critical_warnings().count(), 1);
    }

    #[test]
    fn test_suggestions_dedup_by_kind() {
        let mut monitor = PerformanceMonitor::new();
        let id = monitor.add_suggestion("images", "enable preloading").unwrap();
        assert!(monitor.add_suggestion("images", "use webp").is_none());
        assert!(monitor.add_suggestion("scenes", "disable autoload").is_some());
        assert_eq!(monitor.suggestions().len(), 2);

        monitor.dismiss_suggestion(id);
        assert!(monitor.add_suggestion("images", "use webp").is_some());
    }

    #[test]
    fn test_score() {
        let mut monitor = PerformanceMonitor::new();
        assert_eq!(monitor.score(), 100);

        monitor.update_metrics(|m| {
            m.largest_contentful_paint_ms = Some(3000.0);
            m.cumulative_layout_shift = Some(0.15);
            m.first_input_delay_ms = Some(50.0);
        });
        assert_eq!(monitor.score(), 72);

        monitor.update_cache_stats(ImageCacheStats {
            hits: 19,
            misses: 1,
            ..ImageCacheStats::default()
        });
        assert_eq!(monitor.score(), 77);

        monitor.update_metrics(|m| {
            m.cumulative_layout_shift = Some(0.5);
            m.first_input_delay_ms = Some(500.0);
        });
        assert_eq!(monitor.score(), 55);
    }
}

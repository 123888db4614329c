// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution profiling metrics.
//!
//! [`ExecutionMetrics`] counts kernel invocations and tiles and, when
//! profiling is enabled, times each phase of a run. The counts are what
//! tiling strategies are compared on; durations are host-side only.

use std::time::Duration;

/// Counters and phase timings for one operator run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ExecutionMetrics {
    /// Operator name.
    pub operator: String,
    /// Kernel invocations issued.
    pub invocations: usize,
    /// Invocations that added to a partial result.
    pub accumulate_calls: usize,
    /// Invocations that committed a finished result.
    pub flush_calls: usize,
    pub input_tiles: usize,
    pub weight_tiles: usize,
    pub output_tiles: usize,
    /// Time spent choosing tile shapes.
    pub planning_duration: Duration,
    /// Time spent generating and filling tiles.
    pub tiling_duration: Duration,
    /// Time spent inside kernel invocations.
    pub compute_duration: Duration,
    /// Time spent copying output tiles back.
    pub untile_duration: Duration,
    /// Wall-clock time of the whole run.
    pub total_duration: Duration,
    /// Peak bytes leased from the host pool.
    pub peak_pool_bytes: usize,
}

impl ExecutionMetrics {
    /// Creates an empty metrics container.
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            ..Default::default()
        }
    }

    /// Records one kernel invocation and its flags.
    pub fn record_invocation(&mut self, accumulate: bool, flush: bool, compute: Duration) {
        self.invocations += 1;
        self.accumulate_calls += usize::from(accumulate);
        self.flush_calls += usize::from(flush);
        self.compute_duration += compute;
    }

    /// Records the tile counts of each operand.
    pub fn record_tiles(&mut self, inputs: usize, weights: usize, outputs: usize) {
        self.input_tiles = inputs;
        self.weight_tiles = weights;
        self.output_tiles = outputs;
    }

    /// Returns a human-readable summary suitable for logs.
    pub fn summary(&self) -> String {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        format!(
            "{}: {} invocations ({} accumulate, {} flush), tiles in/w/out {}/{}/{}, \
             {:.2}ms total ({:.2}ms plan, {:.2}ms tile, {:.2}ms compute, {:.2}ms untile), \
             peak {} KB",
            self.operator,
            self.invocations,
            self.accumulate_calls,
            self.flush_calls,
            self.input_tiles,
            self.weight_tiles,
            self.output_tiles,
            ms(self.total_duration),
            ms(self.planning_duration),
            ms(self.tiling_duration),
            ms(self.compute_duration),
            ms(self.untile_duration),
            self.peak_pool_bytes / 1024,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = ExecutionMetrics::new("fc1");
        assert_eq!(m.operator, "fc1");
        assert_eq!(m.invocations, 0);
        assert_eq!(m.compute_duration, Duration::ZERO);
    }

    #[test]
    fn test_record_invocations() {
        let mut m = ExecutionMetrics::new("fc1");
        m.record_invocation(false, false, Duration::from_millis(2));
        m.record_invocation(true, false, Duration::from_millis(3));
        m.record_invocation(true, true, Duration::from_millis(5));
        assert_eq!(m.invocations, 3);
        assert_eq!(m.accumulate_calls, 2);
        assert_eq!(m.flush_calls, 1);
        assert_eq!(m.compute_duration, Duration::from_millis(10));
    }

    #[test]
    fn test_summary_format() {
        let mut m = ExecutionMetrics::new("bn");
        m.record_tiles(2, 1, 2);
        m.record_invocation(false, true, Duration::ZERO);
        m.peak_pool_bytes = 4096;
        let s = m.summary();
        assert!(s.starts_with("bn: 1 invocations"));
        assert!(s.contains("tiles in/w/out 2/1/2"));
        assert!(s.contains("peak 4 KB"));
    }

    #[test]
    fn test_serialize() {
        let mut m = ExecutionMetrics::new("relu");
        m.record_tiles(3, 0, 3);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["operator"], "relu");
        assert_eq!(json["output_tiles"], 3);
    }
}

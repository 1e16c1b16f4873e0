//! Map measure positions to absolute ticks.
//!
//! Ticks advance by the nominal length of each measure's time signature.
//! A breakpoint is recorded at measure 0 and wherever the signature
//! changes, so a lookup only needs the last breakpoint at or before the
//! measure.

use serde::{Deserialize, Serialize};

use crate::model::{Measure, Score};

/// A time signature change: the measure it takes effect in and its tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub measure: usize,
    pub tick: i32,
    pub numerator: i32,
    pub denominator: i32,
}

/// Breakpoint table for one score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureToTick {
    quarter: i32,
    breakpoints: Vec<Breakpoint>,
}

impl MeasureToTick {
    pub fn build(score: &Score) -> Self {
        Self::from_measures(score.quarter, &score.measures)
    }

    pub fn from_measures(quarter: i32, measures: &[Measure]) -> Self {
        let mut breakpoints: Vec<Breakpoint> = Vec::new();
        let mut tick = 0;

        for (index, measure) in measures.iter().enumerate() {
            let numerator = measure.time.numerator;
            let denominator = measure.time.denominator;
            let changed = breakpoints
                .last()
                .map_or(true, |bp| bp.numerator != numerator || bp.denominator != denominator);
            if changed {
                breakpoints.push(Breakpoint { measure: index, tick, numerator, denominator });
            }
            tick += measure_length(quarter, numerator, denominator);
        }

        MeasureToTick { quarter, breakpoints }
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Absolute tick of `offset` ticks into `measure`, never below 0.
    pub fn tick(&self, measure: usize, offset: i32) -> i32 {
        let Some(bp) = self.breakpoints.iter().rev().find(|bp| bp.measure <= measure) else {
            return offset.max(0);
        };
        let bars = (measure - bp.measure) as i32;
        let length = measure_length(self.quarter, bp.numerator, bp.denominator);
        (bp.tick + bars * length + offset).max(0)
    }

    /// Tick length of one measure under the signature in effect at `measure`.
    pub fn measure_ticks(&self, measure: usize) -> i32 {
        self.breakpoints
            .iter()
            .rev()
            .find(|bp| bp.measure <= measure)
            .map_or(0, |bp| measure_length(self.quarter, bp.numerator, bp.denominator))
    }
}

/// Nominal tick length of a measure, `quarter * 4 * num / den`.
pub fn measure_length(quarter: i32, numerator: i32, denominator: i32) -> i32 {
    if denominator <= 0 {
        return 0;
    }
    quarter * 4 * numerator / denominator
}

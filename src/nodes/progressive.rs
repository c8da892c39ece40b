//! Progressive-refinement sample ramp for interactive preview passes
//!
//! Interactive sessions start rendering at coarse sample counts and ramp
//! toward the configured targets over successive passes. The ramp is
//! monotonic between resets; an edit that invalidates accumulated lighting
//! resets it to the configured starting point.

use crate::config::ExportConfig;

/// Sample counts in effect for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLevels {
    pub min: i32,
    pub max: i32,
    /// Visibility sample count ("samples collect")
    pub collect: i32,
}

/// Advances the sample-count ramp across successive interactive passes
#[derive(Debug, Clone)]
pub struct ProgressiveController {
    start_min: i32,
    start_max: i32,
    current_min: i32,
    current_max: i32,
    target_min: i32,
    target_max: i32,
    step: i32,
    visibility: i32,
    visibility_start: i32,
    visibility_target: i32,
    steps_taken: u32,
    total_steps: u32,
}

impl ProgressiveController {
    /// Creates a controller at the config's starting point
    pub fn new(config: &ExportConfig) -> Self {
        let mut controller = Self {
            start_min: config.progressive_start_min,
            start_max: config.progressive_start_max,
            current_min: config.progressive_start_min,
            current_max: config.progressive_start_max,
            target_min: config.min_samples,
            target_max: config.max_samples,
            step: config.progressive_step.max(1),
            visibility: config.visibility_samples,
            visibility_start: config.visibility_samples,
            visibility_target: config.visibility_target,
            steps_taken: 0,
            total_steps: 0,
        };
        controller.reset(config.progressive_start_min, config.progressive_start_max);
        controller
    }

    /// Moves the ramp back to its starting point. Called on scene load or
    /// on any edit invalidating accumulated lighting.
    ///
    /// The ramp is sized by whichever counter has the farthest to go, so
    /// `advance` keeps stepping until min, max and visibility samples have
    /// all reached their targets.
    pub fn reset(&mut self, start_min: i32, start_max: i32) {
        self.start_min = start_min;
        self.start_max = start_max;
        self.current_min = start_min;
        self.current_max = start_max;
        self.visibility = self.visibility_start;
        self.steps_taken = 0;

        let span_min = (self.target_min - start_min).max(0);
        let span_max = (self.target_max - start_max).max(0);
        let ramp_steps = ((span_min.max(span_max) + self.step - 1) / self.step) as u32;

        let mut vis_steps = 0u32;
        let mut vis = self.visibility_start.max(1);
        while vis < self.visibility_target {
            vis = vis.saturating_mul(2 * self.step);
            vis_steps += 1;
        }

        self.total_steps = ramp_steps.max(vis_steps) + 1;
    }

    /// Advances the ramp for the next interactive pass, returning whether
    /// more refinement work remains afterwards.
    ///
    /// The first call after a reset keeps the starting values - the first
    /// pass renders at starting quality. Later calls raise the counters by
    /// one step, saturating at the targets; once saturated the call is a
    /// no-op.
    pub fn advance(&mut self) -> bool {
        if self.steps_taken >= self.total_steps {
            return false;
        }
        if self.steps_taken > 0 {
            if self.current_min < self.target_min {
                self.current_min = (self.current_min + self.step).min(self.target_min);
            }
            if self.current_max < self.target_max {
                self.current_max = (self.current_max + self.step).min(self.target_max);
            }
            if self.visibility < self.visibility_target {
                self.visibility = (self.visibility * 2 * self.step).min(self.visibility_target);
            }
        }
        self.steps_taken += 1;
        self.more_work()
    }

    /// Whether further `advance` calls will still refine the image
    pub fn more_work(&self) -> bool {
        self.steps_taken < self.total_steps
    }

    /// Fraction of the ramp completed, in (0, 1].
    ///
    /// Computed as if one more step existed than actually does, so the
    /// first pass never reports exactly zero; a zero here would give
    /// secondary effects a degenerate zero weight on the first pass.
    pub fn percent_complete(&self) -> f32 {
        ((self.steps_taken as f32 + 1.0) / (self.total_steps as f32 + 1.0)).min(1.0)
    }

    /// Sample counts in effect for the current pass
    pub fn levels(&self) -> SampleLevels {
        SampleLevels {
            min: self.current_min,
            max: self.current_max,
            collect: self.visibility,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(start: i32, target_max: i32) -> ProgressiveController {
        let config = ExportConfig {
            progressive: true,
            progressive_start_min: start,
            progressive_start_max: start,
            min_samples: target_max - 2,
            max_samples: target_max,
            // Visibility starts at its target so these ramps are sized by
            // the sample spans alone
            visibility_samples: 4,
            visibility_target: 4,
            ..ExportConfig::default()
        };
        ProgressiveController::new(&config)
    }

    #[test]
    fn test_ramp_values_across_passes() {
        let mut ramp = controller(-3, 0);

        assert!(ramp.advance());
        assert_eq!(ramp.levels().max, -3);
        assert!(ramp.advance());
        assert_eq!(ramp.levels().max, -2);
        assert!(ramp.advance());
        assert_eq!(ramp.levels().max, -1);
        assert!(ramp.more_work());

        // Fourth call reaches the target; nothing remains afterwards
        assert!(!ramp.advance());
        assert_eq!(ramp.levels().max, 0);

        // Saturated: further calls are no-ops
        assert!(!ramp.advance());
        assert_eq!(ramp.levels().max, 0);
    }

    #[test]
    fn test_ramp_is_monotonic_and_percent_increases() {
        let mut ramp = controller(-3, 0);
        let mut last_max = ramp.levels().max;
        let mut last_pct = ramp.percent_complete();
        assert!(last_pct > 0.0);

        while ramp.advance() {
            assert!(ramp.levels().max >= last_max);
            assert!(ramp.percent_complete() > last_pct);
            last_max = ramp.levels().max;
            last_pct = ramp.percent_complete();
        }
        assert_eq!(ramp.percent_complete(), 1.0);

        let pct = ramp.percent_complete();
        ramp.advance();
        assert_eq!(ramp.percent_complete(), pct);
    }

    #[test]
    fn test_reset_restarts_the_ramp() {
        let mut ramp = controller(-3, 0);
        while ramp.advance() {}
        assert_eq!(ramp.levels().max, 0);

        ramp.reset(-3, -3);
        assert_eq!(ramp.levels().max, -3);
        assert!(ramp.more_work());
        assert!(ramp.percent_complete() < 1.0);
    }

    #[test]
    fn test_start_at_target_finishes_in_one_pass() {
        let mut ramp = controller(0, 0);
        assert!(!ramp.advance());
        assert_eq!(ramp.levels().max, 0);
        assert_eq!(ramp.percent_complete(), 1.0);
    }

    #[test]
    fn test_longer_min_span_keeps_ramp_running() {
        let config = ExportConfig {
            progressive: true,
            progressive_start_min: -5,
            progressive_start_max: -1,
            min_samples: 0,
            max_samples: 0,
            ..ExportConfig::default()
        };
        let mut ramp = ProgressiveController::new(&config);

        // Max saturates early; the ramp keeps going until min catches up
        while ramp.advance() {}
        assert_eq!(ramp.levels().min, 0);
        assert_eq!(ramp.levels().max, 0);
        assert!(!ramp.more_work());
        assert_eq!(ramp.percent_complete(), 1.0);
    }

    #[test]
    fn test_visibility_samples_double_per_step() {
        let config = ExportConfig {
            progressive: true,
            progressive_start_min: -3,
            progressive_start_max: -3,
            min_samples: -1,
            max_samples: 1,
            visibility_samples: 1,
            visibility_target: 4,
            ..ExportConfig::default()
        };
        let mut ramp = ProgressiveController::new(&config);

        ramp.advance();
        assert_eq!(ramp.levels().collect, 1);
        ramp.advance();
        assert_eq!(ramp.levels().collect, 2);
        ramp.advance();
        assert_eq!(ramp.levels().collect, 4);
        // Saturates at the target even while min/max still climb
        ramp.advance();
        assert_eq!(ramp.levels().collect, 4);
    }
}

//! Per-request evaluation state.
//!
//! A request may carry a debug directive `input:<N>` or `output:<N>`
//! asking the pipeline to stop at stage `N` and return the tensors seen
//! there. Without a directive the final output is squeezed before encoding.

use crate::error::{ConversionError, Result};

const INPUT_DEBUG_KEY: &str = "input";
const OUTPUT_DEBUG_KEY: &str = "output";

/// Which side of a stage a debug directive targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugPoint {
    /// Tensors handed to the stage's backend
    Input,
    /// Raw tensors returned by the stage's backend
    Output,
}

/// Counters and debug directive of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    evaluation_count: u64,
    current_stage: usize,
    debug: Option<(DebugPoint, usize)>,
    simplify_output: bool,
    interrupted: bool,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationContext {
    /// Context without debug directive
    pub fn new() -> Self {
        Self {
            evaluation_count: 0,
            current_stage: 0,
            debug: None,
            simplify_output: true,
            interrupted: false,
        }
    }

    /// Context from an optional debug header value.
    pub fn from_header(header: Option<&str>) -> Result<Self> {
        match header {
            None => Ok(Self::new()),
            Some(value) => Self::with_debug(value),
        }
    }

    /// Context from a debug directive such as `"output:1"`.
    pub fn with_debug(directive: &str) -> Result<Self> {
        let invalid = || {
            ConversionError::Decode(format!(
                "invalid debug directive '{}', expected input:<stage> or output:<stage>",
                directive
            ))
        };

        let (key, stage) = directive.trim().split_once(':').ok_or_else(invalid)?;
        let point = match key.trim() {
            INPUT_DEBUG_KEY => DebugPoint::Input,
            OUTPUT_DEBUG_KEY => DebugPoint::Output,
            _ => return Err(invalid()),
        };
        let stage: usize = stage.trim().parse().map_err(|_| invalid())?;

        Ok(Self {
            debug: Some((point, stage)),
            simplify_output: false,
            ..Self::new()
        })
    }

    /// Number of evaluated rows so far
    pub fn evaluation_count(&self) -> u64 {
        self.evaluation_count
    }

    /// Add `rows` to the evaluation count
    pub fn inc_evaluation_by(&mut self, rows: u64) {
        self.evaluation_count += rows;
    }

    /// Zero-based index of the stage being evaluated
    pub fn current_stage(&self) -> usize {
        self.current_stage
    }

    /// Move to the next stage
    pub fn next_stage(&mut self) {
        self.current_stage += 1;
    }

    /// Requested debug stage, if any
    pub fn debug_stage(&self) -> Option<usize> {
        self.debug.map(|(_, stage)| stage)
    }

    /// Requested debug side, if any
    pub fn debug_point(&self) -> Option<DebugPoint> {
        self.debug.map(|(point, _)| point)
    }

    /// Check if the final output should be squeezed
    pub fn simplify_output(&self) -> bool {
        self.simplify_output
    }

    /// Check if the current stage must stop at `point`.
    pub fn should_stop(&self, point: DebugPoint) -> bool {
        self.debug == Some((point, self.current_stage))
    }

    /// Record that a stage returned early
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Check if a stage returned early
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_simplifies() {
        let ctx = EvaluationContext::from_header(None).unwrap();
        assert!(ctx.simplify_output());
        assert_eq!(ctx.debug_stage(), None);
        assert!(!ctx.should_stop(DebugPoint::Input));
        assert!(!ctx.should_stop(DebugPoint::Output));
    }

    #[test]
    fn test_input_directive() {
        let ctx = EvaluationContext::with_debug("input:0").unwrap();
        assert!(!ctx.simplify_output());
        assert!(ctx.should_stop(DebugPoint::Input));
        assert!(!ctx.should_stop(DebugPoint::Output));
    }

    #[test]
    fn test_output_directive_waits_for_stage() {
        let mut ctx = EvaluationContext::with_debug("output:1").unwrap();
        assert_eq!(ctx.debug_stage(), Some(1));
        assert_eq!(ctx.debug_point(), Some(DebugPoint::Output));
        assert!(!ctx.should_stop(DebugPoint::Output));
        ctx.next_stage();
        assert!(ctx.should_stop(DebugPoint::Output));
    }

    #[test]
    fn test_invalid_directives() {
        for bad in ["input", "middle:1", "output:x", "output:-1", ""] {
            let err = EvaluationContext::with_debug(bad).unwrap_err();
            assert_eq!(err.code(), "DecodeError", "directive {:?}", bad);
        }
    }

    #[test]
    fn test_evaluation_count() {
        let mut ctx = EvaluationContext::new();
        ctx.inc_evaluation_by(3);
        ctx.inc_evaluation_by(2);
        assert_eq!(ctx.evaluation_count(), 5);
    }
}

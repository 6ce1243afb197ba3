//! Evaluator contract and the pipelines built on it.
//!
//! An [`Evaluator`] turns a collection of request tensors into a collection
//! of response tensors. [`TensorEvaluator`] wraps a model [`TensorBackend`]
//! with the input and output schema transforms. [`EvaluatorChain`] runs
//! several evaluators in sequence, each stage seeing the request tensors and
//! every output produced before it.
//!
//! Both honor the debug directive of the [`EvaluationContext`]: the stage it
//! names returns its input or raw output as-is and the pipeline stops there.

use crate::builder::{Builder, SchemaTransform};
use crate::collection::TensorCollection;
use crate::context::{DebugPoint, EvaluationContext};
use crate::data_type::DataType;
use crate::error::{ConversionError, Result, ResultExt};
use crate::field::TensorField;
use std::collections::BTreeSet;
use tracing::debug;

/// Anything able to evaluate a request
pub trait Evaluator: Send + Sync {
    /// Evaluate `input`, updating the counters of `context`.
    fn evaluate(
        &self,
        input: TensorCollection,
        context: &mut EvaluationContext,
    ) -> Result<TensorCollection>;

    /// Tensors expected from the request
    fn inputs(&self) -> Vec<TensorField>;

    /// Tensors produced for the response
    fn outputs(&self) -> Vec<TensorField>;

    /// Rows consumed to produce one output row
    fn rolling_window_size(&self) -> usize {
        1
    }
}

/// Model runtime executing one batch.
///
/// Backends see tensors already shaped after the evaluator inputs and return
/// tensors named after its outputs. Failures should be reported as
/// [`ConversionError::Backend`].
pub trait TensorBackend: Send + Sync {
    /// Run the model on one prepared batch
    fn evaluate_tensors(&self, input: TensorCollection) -> Result<TensorCollection>;
}

/// [`Evaluator`] running a [`TensorBackend`] between two schema transforms
#[derive(Debug, Clone)]
pub struct TensorEvaluator<B> {
    backend: B,
    inputs: Vec<TensorField>,
    outputs: Vec<TensorField>,
    rolling_window_size: usize,
}

impl<B: TensorBackend> TensorEvaluator<B> {
    /// Wrap `backend` with its input and output schema
    pub fn new(backend: B, inputs: Vec<TensorField>, outputs: Vec<TensorField>) -> Self {
        Self {
            backend,
            inputs,
            outputs,
            rolling_window_size: 1,
        }
    }

    /// Roll a window of `size` rows over the inputs
    pub fn with_rolling_window_size(mut self, size: usize) -> Self {
        self.rolling_window_size = size;
        self
    }

    /// Wrapped backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: TensorBackend> Evaluator for TensorEvaluator<B> {
    fn evaluate(
        &self,
        input: TensorCollection,
        context: &mut EvaluationContext,
    ) -> Result<TensorCollection> {
        let prepared = SchemaTransform::new(self.inputs.clone())
            .rolling_window_size(self.rolling_window_size)
            .build(&input)?;
        if context.should_stop(DebugPoint::Input) {
            debug!("Stopping at input of stage {}", context.current_stage());
            context.interrupt();
            return Ok(prepared);
        }

        let raw = self.backend.evaluate_tensors(prepared)?;
        if context.should_stop(DebugPoint::Output) {
            debug!("Stopping at output of stage {}", context.current_stage());
            context.interrupt();
            return Ok(raw);
        }

        let output = SchemaTransform::new(self.outputs.clone())
            .build_indexes(true)
            .build(&raw)?;
        context.inc_evaluation_by(raw.batch_size() as u64);
        Ok(output)
    }

    fn inputs(&self) -> Vec<TensorField> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<TensorField> {
        self.outputs.clone()
    }

    fn rolling_window_size(&self) -> usize {
        self.rolling_window_size
    }
}

/// Evaluators run in sequence over an accumulating collection
pub struct EvaluatorChain {
    stages: Vec<Box<dyn Evaluator>>,
    outputs: Vec<TensorField>,
}

impl std::fmt::Debug for EvaluatorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorChain")
            .field("stages", &self.stages.len())
            .field("outputs", &self.outputs)
            .finish()
    }
}

impl EvaluatorChain {
    /// Chain `stages`, returning `outputs`.
    ///
    /// Empty `outputs` means the outputs of the last stage. Every declared
    /// output must be produced by at least one stage.
    pub fn new(stages: Vec<Box<dyn Evaluator>>, outputs: Vec<TensorField>) -> Result<Self> {
        let last = stages.last().ok_or_else(|| {
            ConversionError::Schema("an evaluator chain needs at least one stage".to_string())
        })?;
        let outputs = if outputs.is_empty() {
            last.outputs()
        } else {
            outputs
        };

        let produced: BTreeSet<String> = stages
            .iter()
            .flat_map(|stage| stage.outputs())
            .map(|field| field.name)
            .collect();
        for field in &outputs {
            if !produced.contains(&field.name) {
                return Err(ConversionError::Schema(format!(
                    "output {} is not produced by any stage",
                    field.name
                )));
            }
        }

        Ok(Self { stages, outputs })
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false, a chain has at least one stage
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Evaluator for EvaluatorChain {
    fn evaluate(
        &self,
        input: TensorCollection,
        context: &mut EvaluationContext,
    ) -> Result<TensorCollection> {
        let mut accumulated = input;
        for stage in &self.stages {
            debug!(
                "Evaluating stage {} with tensors {:?}",
                context.current_stage(),
                accumulated.names()
            );
            let output = stage
                .evaluate(accumulated.clone(), context)
                .with_context(|| format!("stage {}", context.current_stage()))?;
            if context.is_interrupted() {
                return Ok(output);
            }
            accumulated.merge(output);
            context.next_stage();
        }
        accumulated.retain_fields(&self.outputs);
        Ok(accumulated)
    }

    /// Inputs of every stage not produced by an earlier stage
    fn inputs(&self) -> Vec<TensorField> {
        let mut produced: BTreeSet<String> = BTreeSet::new();
        let mut seen: BTreeSet<(String, DataType)> = BTreeSet::new();
        let mut inputs = Vec::new();
        for stage in &self.stages {
            for field in stage.inputs() {
                if produced.contains(&field.name) {
                    continue;
                }
                if seen.insert((field.name.clone(), field.data_type)) {
                    inputs.push(field);
                }
            }
            produced.extend(stage.outputs().into_iter().map(|field| field.name));
        }
        inputs
    }

    fn outputs(&self) -> Vec<TensorField> {
        self.outputs.clone()
    }

    fn rolling_window_size(&self) -> usize {
        self.stages
            .iter()
            .map(|stage| stage.rolling_window_size().saturating_sub(1))
            .sum::<usize>()
            + 1
    }
}

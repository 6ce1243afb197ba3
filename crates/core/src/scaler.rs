//! Standardization of numeric columns.
//!
//! [`StandardScaler`] maps each input tensor `x` to `(x - mean) / std` with
//! a mean and standard deviation configured per input name. The i-th input
//! is written to the i-th output, always as DOUBLE.

use crate::collection::TensorCollection;
use crate::context::{DebugPoint, EvaluationContext};
use crate::data_type::DataType;
use crate::element::Element;
use crate::error::{ConversionError, Result, ResultExt};
use crate::evaluator::Evaluator;
use crate::field::TensorField;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Statistics of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    /// Column mean
    pub mean: f64,
    /// Column standard deviation
    pub std: f64,
}

impl MeanStd {
    /// Statistics `mean` and `std`
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    fn standardize(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// [`Evaluator`] standardizing its inputs
#[derive(Debug, Clone)]
pub struct StandardScaler {
    inputs: Vec<TensorField>,
    outputs: Vec<TensorField>,
    scales: BTreeMap<String, MeanStd>,
}

impl StandardScaler {
    /// Scaler writing `inputs[i]` into `outputs[i]` with the statistics of
    /// `scales`, keyed by input name.
    pub fn new(
        inputs: Vec<TensorField>,
        outputs: Vec<TensorField>,
        scales: BTreeMap<String, MeanStd>,
    ) -> Result<Self> {
        if inputs.len() != outputs.len() {
            return Err(ConversionError::Schema(format!(
                "standard scaler needs one output per input, got {} inputs and {} outputs",
                inputs.len(),
                outputs.len()
            )));
        }

        let missing: Vec<&str> = inputs
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| !scales.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(ConversionError::Schema(format!(
                "mean and standard deviation are missing to scale {}",
                missing.join(",")
            )));
        }

        if let Some((name, _)) = scales
            .iter()
            .find(|(_, s)| !s.mean.is_finite() || !s.std.is_finite() || s.std == 0.0)
        {
            return Err(ConversionError::Schema(format!(
                "statistics of {} need a finite mean and a finite non-zero standard deviation",
                name
            )));
        }

        Ok(Self {
            inputs,
            outputs,
            scales,
        })
    }

    /// Statistics applied to input `name`
    pub fn scale(&self, name: &str) -> Option<MeanStd> {
        self.scales.get(name).copied()
    }
}

impl Evaluator for StandardScaler {
    fn evaluate(
        &self,
        input: TensorCollection,
        context: &mut EvaluationContext,
    ) -> Result<TensorCollection> {
        if context.should_stop(DebugPoint::Input) {
            debug!("Stopping at input of stage {}", context.current_stage());
            context.interrupt();
            return Ok(input);
        }

        let mut output = TensorCollection::new();
        for (field, target) in self.inputs.iter().zip(&self.outputs) {
            let tensor = input
                .get(&field.name)
                .ok_or_else(|| ConversionError::MissingTensor {
                    field: field.name.clone(),
                    index: None,
                })?;
            tensor
                .check_type_compatible(DataType::Double)
                .with_context(|| format!("tensor {}", field.name))?;

            let scale = self.scale(&field.name).ok_or_else(|| {
                ConversionError::Schema(format!("no statistics to scale {}", field.name))
            })?;
            let scaled = tensor.map(DataType::Double, |e| match e.as_f64() {
                Some(v) => Ok(Element::Double(scale.standardize(v))),
                None => Ok(Element::Null),
            })?;
            output.insert(target.name.clone(), scaled);
        }

        if context.should_stop(DebugPoint::Output) {
            debug!("Stopping at output of stage {}", context.current_stage());
            context.interrupt();
        }
        context.inc_evaluation_by(1);
        Ok(output)
    }

    fn inputs(&self) -> Vec<TensorField> {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<TensorField> {
        self.outputs.clone()
    }
}

//! Schema-driven reshaping of tensor collections.
//!
//! Two directions are supported:
//! - **main**: produce one tensor per field, assembling `[N, columns]` from
//!   the index column vectors when the field tensor itself is absent;
//! - **indexes**: split each field tensor into its declared index columns.
//!
//! Both directions roll a window over the first axis when configured, then
//! reshape to the field's declared shape and type.

use super::Builder;
use crate::collection::TensorCollection;
use crate::element::Element;
use crate::error::{ConversionError, Result, ResultExt};
use crate::field::{TensorField, TensorIndex};
use crate::tensor::{CoordValue, Tensor};
use crate::shape::TensorShape;
use tracing::debug;

/// Converts a collection into the layout described by a list of fields
#[derive(Debug, Clone)]
pub struct SchemaTransform {
    fields: Vec<TensorField>,
    build_indexes: bool,
    rolling_window_size: usize,
}

impl SchemaTransform {
    /// Build main tensors without rolling
    pub fn new(fields: Vec<TensorField>) -> Self {
        Self {
            fields,
            build_indexes: false,
            rolling_window_size: 1,
        }
    }

    /// Split field tensors into index columns instead of building main tensors
    pub fn build_indexes(mut self, build_indexes: bool) -> Self {
        self.build_indexes = build_indexes;
        self
    }

    /// Roll a window of `size` over the first axis when `size > 1`
    pub fn rolling_window_size(mut self, size: usize) -> Self {
        self.rolling_window_size = size;
        self
    }

    /// Fields driving the transform
    pub fn fields(&self) -> &[TensorField] {
        &self.fields
    }

    fn transform_tensor(&self, tensor: Tensor, field: &TensorField) -> Result<Tensor> {
        let tensor = if self.rolling_window_size > 1 {
            debug!(
                "Rolling window of {} over tensor {} of shape {}",
                self.rolling_window_size,
                field.name,
                tensor.shape()
            );
            tensor.roll(0, self.rolling_window_size)?
        } else {
            tensor
        };
        tensor.check_type_compatible(field.data_type)?;
        tensor.reshape_with_type(field.shape.clone(), field.data_type)
    }

    fn assemble_from_indexes(&self, input: &TensorCollection, field: &TensorField) -> Result<Tensor> {
        field.validate()?;

        let mut columns = Vec::with_capacity(field.fields.len());
        for index in &field.fields {
            let column = input.get(&index.name).ok_or_else(|| ConversionError::MissingTensor {
                field: field.name.clone(),
                index: Some(index.name.clone()),
            })?;
            let column = if column.rank() == 0 {
                column.clone().reshape(TensorShape::from([1]))?
            } else {
                column.clone()
            };
            if column.rank() != 1 {
                return Err(ConversionError::Shape(format!(
                    "only vectors are supported as indexes, found a tensor of rank {} for index {}",
                    column.rank(),
                    index.name
                )));
            }
            columns.push((index, column));
        }

        let (first_index, first) = match columns.first() {
            Some(c) => c,
            None => {
                return Err(ConversionError::MissingTensor {
                    field: field.name.clone(),
                    index: None,
                })
            }
        };
        let rows = first.len();
        let shape = TensorShape::from(vec![rows as i64, columns.len() as i64]);
        let mut main = if columns.iter().any(|(_, c)| c.is_nullable()) {
            Tensor::new_nullable(first.data_type(), shape)?
        } else {
            Tensor::new(first.data_type(), shape)?
        };
        debug!(
            "Assembling {} from {} index columns starting with {}",
            field.name,
            columns.len(),
            first_index.name
        );

        for (index, column) in &columns {
            if column.len() != rows {
                return Err(ConversionError::Shape(
                    "when using tensor indexes all vectors should be of the same size".to_string(),
                ));
            }
            let position = index.index.map(|i| i as i64).unwrap_or_default();
            main.set_on_coord(CoordValue::Axis(column.elements()), &[-1, position])
                .with_context(|| format!("index {}", index.name))?;
        }
        Ok(main)
    }

    fn build_main(&self, input: &TensorCollection) -> Result<TensorCollection> {
        let mut output = TensorCollection::new();
        for field in &self.fields {
            let tensor = match input.get(&field.name) {
                Some(tensor) => tensor.clone(),
                None if field.has_indexes() => self.assemble_from_indexes(input, field)?,
                None => {
                    return Err(ConversionError::MissingTensor {
                        field: field.name.clone(),
                        index: None,
                    })
                }
            };
            let tensor = self
                .transform_tensor(tensor, field)
                .with_context(|| format!("tensor {}", field.name))?;
            output.insert(field.name.clone(), tensor);
        }
        Ok(output)
    }

    fn split_column(main: &Tensor, field: &TensorField, index: &TensorIndex) -> Result<Tensor> {
        let column = match index.index {
            Some(position) if main.rank() == 2 => match main.get_coord(&[-1, position as i64])? {
                CoordValue::Axis(values) => values,
                CoordValue::Scalar(value) => vec![value],
            },
            Some(position) => {
                return Err(ConversionError::Shape(format!(
                    "unable to read column {} of a rank {} tensor",
                    position,
                    main.rank()
                )))
            }
            None => main.elements(),
        };

        let data_type = field.index_type(index);
        let nullable = column.iter().any(Element::is_null);
        let shape = TensorShape::from(vec![column.len() as i64]);
        let mut tensor = if nullable {
            Tensor::new_nullable(data_type, shape)?
        } else {
            Tensor::new(data_type, shape)?
        };
        for (i, value) in column.iter().enumerate() {
            tensor.set_flat(i, value)?;
        }
        Ok(tensor)
    }

    fn build_index_tensors(&self, input: &TensorCollection) -> Result<TensorCollection> {
        let mut output = TensorCollection::new();
        for field in &self.fields {
            let main = input.get(&field.name);

            if !field.has_indexes() {
                let tensor = main.cloned().ok_or_else(|| ConversionError::MissingTensor {
                    field: field.name.clone(),
                    index: None,
                })?;
                let tensor = self
                    .transform_tensor(tensor, field)
                    .with_context(|| format!("tensor {}", field.name))?;
                output.insert(field.name.clone(), tensor);
                continue;
            }

            match main {
                Some(main) => {
                    if main.rank() > 2 {
                        return Err(ConversionError::Shape(format!(
                            "impossible to convert a tensor of rank more than 2 into indexes, found rank {}",
                            main.rank()
                        )));
                    }
                    for index in &field.fields {
                        let column = Self::split_column(main, field, index)
                            .with_context(|| format!("index {}", index.name))?;
                        output.insert(index.name.clone(), column);
                    }
                }
                None => {
                    for index in &field.fields {
                        let column = input.get(&index.name).ok_or_else(|| {
                            ConversionError::MissingTensor {
                                field: field.name.clone(),
                                index: Some(index.name.clone()),
                            }
                        })?;
                        output.insert(index.name.clone(), column.clone());
                    }
                }
            }
        }
        Ok(output)
    }
}

impl<'a> Builder<&'a TensorCollection> for SchemaTransform {
    type Output = TensorCollection;

    fn build(&self, input: &'a TensorCollection) -> Result<TensorCollection> {
        if self.build_indexes {
            self.build_index_tensors(input)
        } else {
            self.build_main(input)
        }
    }
}

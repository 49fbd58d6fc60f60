use super::*;
use ndarray::ArrayView1;

/// Threshold for deciding between parallel and sequential execution.
/// When the number of frames is >= this threshold, rows are processed in parallel.
const LENGTH_NORM_PARALLEL_THRESHOLD: usize = 256;

/// L2 length normalization component.
///
/// Every frame `x` is mapped to `x / ||x||`. A frame whose norm is zero is mapped to the zero
/// vector, and its gradient is zero as well.
///
/// # Example
/// ```rust
/// use acoustic_nnet::prelude::*;
/// use ndarray::array;
///
/// let component = LengthNormComponent::new(2, 2).unwrap();
/// let output = component.propagate(&array![[3.0, 4.0], [0.0, 0.0]]);
/// assert_eq!(output, array![[0.6, 0.8], [0.0, 0.0]]);
/// ```
#[derive(Debug, Clone)]
pub struct LengthNormComponent {
    dim: usize,
}

impl LengthNormComponent {
    /// Creates a new length normalization component.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Number of input columns
    /// - `output_dim` - Number of output columns, must equal `input_dim`
    ///
    /// # Returns
    ///
    /// * `Result<LengthNormComponent, ModelError>` - The component or a `ConfigError`
    pub fn new(input_dim: usize, output_dim: usize) -> Result<Self, ModelError> {
        validate_positive(input_dim, "<InputDim>", ComponentType::LengthNorm)?;
        validate_dim_matches(output_dim, input_dim, "<OutputDim>", ComponentType::LengthNorm)?;
        Ok(LengthNormComponent { dim: input_dim })
    }

    pub(crate) fn from_descriptor(descriptor: &mut ComponentDescriptor) -> Result<Self, ModelError> {
        Self::new(descriptor.input_dim(), descriptor.output_dim())
    }
}

/// Returns the L2 norm of `row`, or `None` when it is zero.
///
/// Squares are summed in `f64`, which holds the square of any finite `f32`, so rows near the
/// ends of the `f32` range keep a nonzero, finite norm.
fn row_norm(row: ArrayView1<f32>) -> Option<f64> {
    let norm = row
        .iter()
        .map(|&v| (v as f64) * (v as f64))
        .sum::<f64>()
        .sqrt();
    (norm > 0.0).then_some(norm)
}

impl Component for LengthNormComponent {
    fn component_type(&self) -> ComponentType {
        ComponentType::LengthNorm
    }

    fn input_dim(&self) -> usize {
        self.dim
    }

    fn output_dim(&self) -> usize {
        self.dim
    }

    fn propagate_fnc(&self, input: &Matrix, output: &mut Matrix) {
        let num_frames = input.nrows();
        execute_parallel_or_sequential!(
            Zip::from(output.rows_mut()).and(input.rows()),
            num_frames,
            LENGTH_NORM_PARALLEL_THRESHOLD,
            |mut out, x| {
                if let Some(norm) = row_norm(x) {
                    out.zip_mut_with(&x, |o, &v| *o = (v as f64 / norm) as f32);
                }
            }
        );
    }

    fn backpropagate_fnc(
        &self,
        input: &Matrix,
        output: &Matrix,
        output_diff: &Matrix,
        input_diff: &mut Matrix,
    ) {
        // dE/dx = (dE/dy - y * (dE/dy . y)) / ||x||
        let num_frames = input.nrows();
        execute_parallel_or_sequential!(
            Zip::from(input_diff.rows_mut())
                .and(input.rows())
                .and(output.rows())
                .and(output_diff.rows()),
            num_frames,
            LENGTH_NORM_PARALLEL_THRESHOLD,
            |mut in_diff, x, y, out_diff| {
                if let Some(norm) = row_norm(x) {
                    let projection = out_diff.dot(&y);
                    Zip::from(&mut in_diff)
                        .and(&out_diff)
                        .and(&y)
                        .for_each(|d, &g, &u| *d = ((g - projection * u) as f64 / norm) as f32);
                }
            }
        );
    }

    fn info(&self) -> String {
        format!("\n  dim {}", self.dim)
    }

    fn box_clone(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}

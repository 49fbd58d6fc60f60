use crate::ModelError;
use ndarray::{Array1, Array2, Zip};

/// Type alias for a batch of frames: one row per frame, one column per feature
pub type Matrix = Array2<f32>;

/// Type alias for one-dimensional parameters such as biases
pub type Vector = Array1<f32>;

/// Runs an `ndarray::Zip` with `par_for_each` when the number of rows reaches the threshold,
/// and with `for_each` otherwise.
///
/// Each row is written by exactly one closure invocation, so both branches produce identical
/// results.
macro_rules! execute_parallel_or_sequential {
    ($zip:expr, $rows:expr, $threshold:expr, $body:expr) => {
        if $rows >= $threshold {
            $zip.par_for_each($body)
        } else {
            $zip.for_each($body)
        }
    };
}

/// Module that contains the descriptor tokenizer and matrix/vector literal I/O
pub mod descriptor;
/// Module that contains the tag-driven component factory
pub mod factory;
/// Module that contains the index mapping of patches and pools
pub mod helper_functions;
/// Input validation functions for component geometry
mod input_validation_function;

/// Convolutional component over spliced frames
pub mod convolutional;
/// L2 length normalization component
pub mod length_norm;
/// Max pooling component over interleaved channel groups
pub mod max_pooling;
/// Trait and types for components with trainable parameters
pub mod updatable;

use factory::ComponentDescriptor;
use input_validation_function::*;
use rayon::prelude::*;
use updatable::UpdatableComponent;

/// Kind of a component, identified in descriptors by its marker tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    LengthNorm,
    Convolutional,
    MaxPooling,
}

const COMPONENT_MARKERS: [(ComponentType, &str); 3] = [
    (ComponentType::LengthNorm, "<LengthNormComponent>"),
    (ComponentType::Convolutional, "<ConvolutionalComponent>"),
    (ComponentType::MaxPooling, "<MaxPoolingComponent>"),
];

impl ComponentType {
    /// Returns the descriptor marker of this component type, e.g. `<MaxPoolingComponent>`.
    pub fn marker(self) -> &'static str {
        COMPONENT_MARKERS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, marker)| *marker)
            .unwrap_or("<UnknownComponent>")
    }

    /// Looks up a component type by its descriptor marker.
    ///
    /// # Returns
    ///
    /// * `Option<ComponentType>` - `None` if the marker is not a known component tag
    pub fn from_marker(marker: &str) -> Option<Self> {
        COMPONENT_MARKERS
            .iter()
            .find(|(_, m)| *m == marker)
            .map(|(kind, _)| *kind)
    }

    /// Returns `true` for component types that own trainable parameters.
    pub fn is_updatable(self) -> bool {
        matches!(self, ComponentType::Convolutional)
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.marker())
    }
}

/// Defines the interface shared by all components.
///
/// A component maps a batch of `N x input_dim` frames to `N x output_dim` frames and back-maps a
/// gradient of the output to a gradient of the input. Both calls are pure functions of their
/// arguments and of the component's parameters: `backpropagate` recovers whatever it needs
/// (norms, max positions) from `input` and `output` and never relies on a previous `propagate`.
pub trait Component: std::fmt::Debug + Send + Sync {
    /// Returns the kind of this component.
    fn component_type(&self) -> ComponentType;

    /// Returns the number of columns expected in the input.
    fn input_dim(&self) -> usize;

    /// Returns the number of columns produced in the output.
    fn output_dim(&self) -> usize;

    /// Computes the forward transform into a pre-sized, zeroed output matrix.
    ///
    /// Shapes have already been checked by [`Component::propagate`].
    fn propagate_fnc(&self, input: &Matrix, output: &mut Matrix);

    /// Computes the input gradient into a pre-sized, zeroed matrix.
    ///
    /// Shapes have already been checked by [`Component::backpropagate`].
    fn backpropagate_fnc(
        &self,
        input: &Matrix,
        output: &Matrix,
        output_diff: &Matrix,
        input_diff: &mut Matrix,
    );

    /// Appends the component-specific part of the descriptor (options and parameters) to `out`.
    fn write_data(&self, _out: &mut String) {}

    /// Returns a human-readable summary of the configuration and parameters.
    fn info(&self) -> String {
        String::new()
    }

    /// Returns a boxed deep copy of this component.
    fn box_clone(&self) -> Box<dyn Component>;

    /// Gives access to the trainable-parameter interface, if this component has one.
    fn as_updatable(&self) -> Option<&dyn UpdatableComponent> {
        None
    }

    /// Gives mutable access to the trainable-parameter interface, if this component has one.
    fn as_updatable_mut(&mut self) -> Option<&mut dyn UpdatableComponent> {
        None
    }

    /// Performs forward propagation of a batch.
    ///
    /// # Parameters
    ///
    /// * `input` - Input matrix with shape \[num_frames, input_dim\]
    ///
    /// # Returns
    ///
    /// * `Matrix` - Output matrix with shape \[num_frames, output_dim\]
    ///
    /// # Panics
    ///
    /// Panics if `input` does not have `input_dim` columns.
    fn propagate(&self, input: &Matrix) -> Matrix {
        assert_num_cols(self.component_type(), "input", input, self.input_dim());
        let mut output = Matrix::zeros((input.nrows(), self.output_dim()));
        self.propagate_fnc(input, &mut output);
        output
    }

    /// Performs backward propagation of a batch.
    ///
    /// # Parameters
    ///
    /// - `input` - The input that was propagated, shape \[num_frames, input_dim\]
    /// - `output` - The output `propagate` produced for `input`, shape \[num_frames, output_dim\]
    /// - `output_diff` - Gradient of the loss with respect to `output`
    ///
    /// # Returns
    ///
    /// * `Matrix` - Gradient of the loss with respect to `input`
    ///
    /// # Panics
    ///
    /// Panics if any matrix disagrees with the declared dimensions or the row counts differ.
    fn backpropagate(&self, input: &Matrix, output: &Matrix, output_diff: &Matrix) -> Matrix {
        let kind = self.component_type();
        assert_num_cols(kind, "input", input, self.input_dim());
        assert_num_cols(kind, "output", output, self.output_dim());
        assert_num_cols(kind, "output_diff", output_diff, self.output_dim());
        assert_num_rows(kind, input, output, output_diff);
        let mut input_diff = Matrix::zeros((input.nrows(), self.input_dim()));
        self.backpropagate_fnc(input, output, output_diff, &mut input_diff);
        input_diff
    }
}

impl Clone for Box<dyn Component> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

pub(crate) fn assert_num_cols(kind: ComponentType, name: &str, matrix: &Matrix, expected: usize) {
    assert!(
        matrix.ncols() == expected,
        "{}: {} has {} columns, expected {}",
        kind,
        name,
        matrix.ncols(),
        expected
    );
}

pub(crate) fn assert_num_rows(kind: ComponentType, input: &Matrix, output: &Matrix, output_diff: &Matrix) {
    assert!(
        input.nrows() == output.nrows() && input.nrows() == output_diff.nrows(),
        "{}: row counts differ (input {}, output {}, output_diff {})",
        kind,
        input.nrows(),
        output.nrows(),
        output_diff.nrows()
    );
}

/// Maps `f` over `0..count`, on the rayon pool when `parallel` is set.
///
/// Results are returned in index order either way, so callers reduce them deterministically.
pub(crate) fn collect_parallel_or_sequential<T, F>(count: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if parallel {
        (0..count).into_par_iter().map(f).collect()
    } else {
        (0..count).map(f).collect()
    }
}

/// Formats `( min .., max .., mean .., stddev .. )` of a set of values for `info()` strings.
pub(crate) fn moment_statistics<'a>(values: impl IntoIterator<Item = &'a f32>) -> String {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in values {
        count += 1;
        sum += v as f64;
        sum_sq += (v as f64) * (v as f64);
        min = min.min(v);
        max = max.max(v);
    }
    if count == 0 {
        return String::from("( empty )");
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    format!(
        "( min {}, max {}, mean {:.6}, stddev {:.6} )",
        min,
        max,
        mean,
        variance.sqrt()
    )
}

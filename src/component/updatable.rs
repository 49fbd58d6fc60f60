use super::*;

/// Options of a gradient-descent parameter update.
///
/// # Fields
///
/// - `learn_rate` - Global learning rate, scaled per component by its learning-rate coefficients
/// - `l2_penalty` - L2 regularization strength applied to the weights (not to the bias)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    pub learn_rate: f32,
    pub l2_penalty: f32,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            learn_rate: 0.008,
            l2_penalty: 0.0,
        }
    }
}

/// Gradients of the loss with respect to the parameters of a component.
///
/// Gradients are summed (not averaged) over the `num_frames` frames of the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGradients {
    pub weights: Matrix,
    pub bias: Vector,
    pub num_frames: usize,
}

/// Defines the interface of components with trainable parameters.
///
/// The training loop that decides when to compute gradients and update is not part of this
/// crate; it drives components through this trait.
pub trait UpdatableComponent: Component {
    /// Returns the total number of trainable parameters.
    fn num_params(&self) -> usize;

    /// Returns all parameters flattened: weights in row-major order, then the bias.
    fn params(&self) -> Vector;

    /// Computes parameter gradients for a batch.
    ///
    /// # Parameters
    ///
    /// - `input` - The input that was propagated, shape \[num_frames, input_dim\]
    /// - `output_diff` - Gradient of the loss with respect to the output
    ///
    /// # Panics
    ///
    /// Panics if the shapes disagree with the component's dimensions.
    fn compute_gradients(&self, input: &Matrix, output_diff: &Matrix) -> ParameterGradients;

    /// Applies one gradient-descent step: `param -= learn_rate * coef * gradient`.
    fn update(&mut self, gradients: &ParameterGradients, options: &TrainOptions);

    /// Returns a human-readable summary of a gradient.
    fn info_gradient(&self, gradients: &ParameterGradients) -> String {
        format!(
            "\n  weights_grad {}\n  bias_grad {}",
            moment_statistics(gradients.weights.iter()),
            moment_statistics(gradients.bias.iter())
        )
    }
}

use super::descriptor::{write_matrix, write_vector};
use super::helper_functions::PatchGeometry;
use super::updatable::{ParameterGradients, TrainOptions};
use super::*;
use ndarray::{Axis, s};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::fmt::Write;

/// Threshold for determining whether to use parallel or sequential computation.
/// When `num_frames * num_patches < CONVOLUTIONAL_PARALLEL_THRESHOLD`,
/// patches are processed sequentially to avoid parallelization overhead.
const CONVOLUTIONAL_PARALLEL_THRESHOLD: usize = 2048;

/// Default standard deviation of randomly initialised filters
const DEFAULT_PARAM_STDDEV: f32 = 0.1;
/// Default center of randomly initialised biases
const DEFAULT_BIAS_MEAN: f32 = -2.0;
/// Default width of randomly initialised biases
const DEFAULT_BIAS_RANGE: f32 = 2.0;

/// Convolutional component over spliced frames.
///
/// The input row is `num_splice = input_dim / patch_stride` consecutive blocks of `patch_stride`
/// columns, e.g. the filterbank features of several spliced frames. Patch `p` gathers the
/// `patch_dim` columns starting at `p * patch_step` inside every block into one feature vector of
/// length `num_splice * patch_dim`; every filter is a row of that length. The output holds, for
/// each patch in turn, one activation per filter: column `p * num_filters + f`.
///
/// # Fields
///
/// - `input_dim` / `output_dim` - Declared dimensions, checked against the geometry
/// - `patch_dim` - Number of consecutive columns a patch reads in each block
/// - `patch_step` - Shift between successive patches
/// - `patch_stride` - Length of a block (one spliced frame)
/// - `learn_rate_coef` - Scale of the learning rate for the filters
/// - `bias_learn_rate_coef` - Scale of the learning rate for the bias
/// - `max_norm` - Upper bound of the L2 norm of each filter after an update, 0 disables it
/// - `filters` - Filter bank with shape \[num_filters, num_splice * patch_dim\]
/// - `bias` - One bias per filter
///
/// # Example
/// ```rust
/// use acoustic_nnet::prelude::*;
/// use ndarray::array;
///
/// // a single 1-tap filter of weight 1 is the identity
/// let component = read_component(
///     "<ConvolutionalComponent> 5 5 <PatchDim> 1 <PatchStep> 1 <PatchStride> 5 \
///      <LearnRateCoef> 1.0 <BiasLearnRateCoef> 1.0 <MaxNorm> 0 \
///      <Filters> [ 1 ] <Bias> [ 0 ]",
/// )
/// .unwrap();
///
/// let input = array![[1.0, 2.0, 3.0, 4.0, 5.0]];
/// assert_eq!(component.propagate(&input), input);
/// ```
#[derive(Debug, Clone)]
pub struct ConvolutionalComponent {
    input_dim: usize,
    output_dim: usize,
    patch_dim: usize,
    patch_step: usize,
    patch_stride: usize,
    learn_rate_coef: f32,
    bias_learn_rate_coef: f32,
    max_norm: f32,
    filters: Matrix,
    bias: Vector,
}

/// Checks the convolution geometry and returns it together with the number of filters.
fn validate_geometry(
    input_dim: usize,
    output_dim: usize,
    patch_dim: usize,
    patch_step: usize,
    patch_stride: usize,
) -> Result<(PatchGeometry, usize), ModelError> {
    let kind = ComponentType::Convolutional;
    validate_positive(patch_dim, "<PatchDim>", kind)?;
    validate_positive(patch_step, "<PatchStep>", kind)?;
    validate_positive(patch_stride, "<PatchStride>", kind)?;
    validate_positive(input_dim, "<InputDim>", kind)?;
    validate_divisible(input_dim, "<InputDim>", patch_stride, "<PatchStride>", kind)?;
    validate_window(
        patch_dim,
        "<PatchDim>",
        patch_step,
        "<PatchStep>",
        patch_stride,
        "<PatchStride>",
        kind,
    )?;

    let geometry = PatchGeometry {
        input_dim,
        patch_dim,
        patch_step,
        patch_stride,
    };
    let num_patches = geometry.num_patches();
    validate_positive(output_dim, "<OutputDim>", kind)?;
    validate_divisible(output_dim, "<OutputDim>", num_patches, "number of patches", kind)?;
    let num_filters = output_dim / num_patches;
    validate_num_elements(num_filters, geometry.filter_dim(), "<Filters>", kind)?;
    Ok((geometry, num_filters))
}

impl ConvolutionalComponent {
    /// Creates a convolutional component with explicit parameters.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Number of input columns, a multiple of `patch_stride`
    /// - `output_dim` - Number of output columns, `num_patches * num_filters`
    /// - `patch_dim` - Number of consecutive columns a patch reads in each block
    /// - `patch_step` - Shift between successive patches
    /// - `patch_stride` - Length of a block
    /// - `filters` - Filter bank with shape \[num_filters, input_dim / patch_stride * patch_dim\]
    /// - `bias` - One bias per filter
    ///
    /// # Returns
    ///
    /// * `Result<ConvolutionalComponent, ModelError>` - The component, with learning-rate
    ///   coefficients 1 and max-norm disabled, or a `ConfigError` if the geometry is inconsistent
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        patch_dim: usize,
        patch_step: usize,
        patch_stride: usize,
        filters: Matrix,
        bias: Vector,
    ) -> Result<Self, ModelError> {
        let kind = ComponentType::Convolutional;
        let (geometry, num_filters) =
            validate_geometry(input_dim, output_dim, patch_dim, patch_step, patch_stride)?;
        validate_matrix_shape(&filters, num_filters, geometry.filter_dim(), "<Filters>", kind)?;
        validate_vector_len(&bias, num_filters, "<Bias>", kind)?;

        Ok(ConvolutionalComponent {
            input_dim,
            output_dim,
            patch_dim,
            patch_step,
            patch_stride,
            learn_rate_coef: 1.0,
            bias_learn_rate_coef: 1.0,
            max_norm: 0.0,
            filters,
            bias,
        })
    }

    pub(crate) fn from_descriptor<R: Rng>(
        descriptor: &mut ComponentDescriptor,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        let kind = ComponentType::Convolutional;
        let patch_dim = descriptor.require_usize("<PatchDim>")?;
        let patch_step = descriptor.require_usize("<PatchStep>")?;
        let patch_stride = descriptor.require_usize("<PatchStride>")?;
        let learn_rate_coef = descriptor.take_f32("<LearnRateCoef>")?.unwrap_or(1.0);
        let bias_learn_rate_coef = descriptor.take_f32("<BiasLearnRateCoef>")?.unwrap_or(1.0);
        let max_norm = descriptor.take_f32("<MaxNorm>")?.unwrap_or(0.0);
        let param_stddev = descriptor
            .take_f32("<ParamStddev>")?
            .unwrap_or(DEFAULT_PARAM_STDDEV);
        let bias_mean = descriptor
            .take_f32("<BiasMean>")?
            .unwrap_or(DEFAULT_BIAS_MEAN);
        let bias_range = descriptor
            .take_f32("<BiasRange>")?
            .unwrap_or(DEFAULT_BIAS_RANGE);
        validate_non_negative(param_stddev, "<ParamStddev>", kind)?;
        validate_non_negative(bias_range, "<BiasRange>", kind)?;

        let (input_dim, output_dim) = (descriptor.input_dim(), descriptor.output_dim());
        let (geometry, num_filters) =
            validate_geometry(input_dim, output_dim, patch_dim, patch_step, patch_stride)?;

        let filters = match descriptor.take_filters() {
            Some(filters) => filters,
            None => {
                let normal = Normal::new(0.0, param_stddev).map_err(|e| {
                    ModelError::ConfigError(format!("{}: <ParamStddev>: {}", kind, e))
                })?;
                Matrix::from_shape_simple_fn((num_filters, geometry.filter_dim()), || {
                    normal.sample(&mut *rng)
                })
            }
        };
        let bias = match descriptor.take_bias() {
            Some(bias) => bias,
            None => Vector::from_shape_simple_fn(num_filters, || {
                bias_mean + (rng.random::<f32>() - 0.5) * bias_range
            }),
        };

        let mut component = Self::new(
            input_dim,
            output_dim,
            patch_dim,
            patch_step,
            patch_stride,
            filters,
            bias,
        )?;
        component.set_learn_rate_coefs(learn_rate_coef, bias_learn_rate_coef)?;
        component.set_max_norm(max_norm)?;
        Ok(component)
    }

    /// Sets the learning-rate coefficients of the filters and of the bias.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigError` if a coefficient is negative or not finite.
    pub fn set_learn_rate_coefs(&mut self, filters: f32, bias: f32) -> Result<(), ModelError> {
        let kind = ComponentType::Convolutional;
        validate_non_negative(filters, "<LearnRateCoef>", kind)?;
        validate_non_negative(bias, "<BiasLearnRateCoef>", kind)?;
        self.learn_rate_coef = filters;
        self.bias_learn_rate_coef = bias;
        Ok(())
    }

    /// Sets the max-norm bound of the filters, 0 disables it.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigError` if `max_norm` is negative or not finite.
    pub fn set_max_norm(&mut self, max_norm: f32) -> Result<(), ModelError> {
        validate_non_negative(max_norm, "<MaxNorm>", ComponentType::Convolutional)?;
        self.max_norm = max_norm;
        Ok(())
    }

    get_field!(get_patch_dim, patch_dim, usize);
    get_field!(get_patch_step, patch_step, usize);
    get_field!(get_patch_stride, patch_stride, usize);
    get_field!(get_learn_rate_coef, learn_rate_coef, f32);
    get_field!(get_bias_learn_rate_coef, bias_learn_rate_coef, f32);
    get_field!(get_max_norm, max_norm, f32);
    get_field_as_ref!(get_filters, filters, &Matrix);
    get_field_as_ref!(get_bias, bias, &Vector);

    /// Returns the patch geometry of this component.
    pub fn geometry(&self) -> PatchGeometry {
        PatchGeometry {
            input_dim: self.input_dim,
            patch_dim: self.patch_dim,
            patch_step: self.patch_step,
            patch_stride: self.patch_stride,
        }
    }

    /// Returns the number of filters.
    pub fn num_filters(&self) -> usize {
        self.filters.nrows()
    }

    fn is_parallel(&self, num_frames: usize) -> bool {
        num_frames * self.geometry().num_patches() >= CONVOLUTIONAL_PARALLEL_THRESHOLD
    }

    /// Gathers the feature vectors of patch `patch` for every frame.
    fn feature_patches(&self, input: &Matrix, patch: usize) -> Matrix {
        input.select(Axis(1), &self.geometry().patch_columns(patch))
    }

    /// Rescales every filter whose L2 norm exceeds `max_norm`.
    fn apply_max_norm(&mut self) {
        let max_norm = self.max_norm;
        for mut filter in self.filters.rows_mut() {
            let norm = filter.dot(&filter).sqrt();
            if norm > max_norm {
                filter /= norm / max_norm;
            }
        }
    }
}

impl Component for ConvolutionalComponent {
    fn component_type(&self) -> ComponentType {
        ComponentType::Convolutional
    }

    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn propagate_fnc(&self, input: &Matrix, output: &mut Matrix) {
        let geometry = self.geometry();
        let num_filters = self.num_filters();

        let activations = collect_parallel_or_sequential(
            geometry.num_patches(),
            self.is_parallel(input.nrows()),
            |p| {
                let mut activation = self.feature_patches(input, p).dot(&self.filters.t());
                activation += &self.bias;
                activation
            },
        );
        for (p, activation) in activations.iter().enumerate() {
            output
                .slice_mut(s![.., geometry.output_columns(p, num_filters)])
                .assign(activation);
        }
    }

    fn backpropagate_fnc(
        &self,
        _input: &Matrix,
        _output: &Matrix,
        output_diff: &Matrix,
        input_diff: &mut Matrix,
    ) {
        let geometry = self.geometry();
        let num_filters = self.num_filters();

        // gradient w.r.t. each patch feature vector
        let patch_diffs = collect_parallel_or_sequential(
            geometry.num_patches(),
            self.is_parallel(output_diff.nrows()),
            |p| {
                output_diff
                    .slice(s![.., geometry.output_columns(p, num_filters)])
                    .dot(&self.filters)
            },
        );

        // overlap-add, in patch order
        for (p, patch_diff) in patch_diffs.iter().enumerate() {
            for (k, &column) in geometry.patch_columns(p).iter().enumerate() {
                let mut target = input_diff.column_mut(column);
                target += &patch_diff.column(k);
            }
        }
    }

    fn write_data(&self, out: &mut String) {
        let _ = write!(
            out,
            " <PatchDim> {} <PatchStep> {} <PatchStride> {} <LearnRateCoef> {} <BiasLearnRateCoef> {} <MaxNorm> {}",
            self.patch_dim,
            self.patch_step,
            self.patch_stride,
            self.learn_rate_coef,
            self.bias_learn_rate_coef,
            self.max_norm
        );
        out.push_str("\n<Filters>");
        write_matrix(out, &self.filters);
        out.push_str("\n<Bias>");
        write_vector(out, &self.bias);
    }

    fn info(&self) -> String {
        let geometry = self.geometry();
        format!(
            "\n  num_splice {}, num_patches {}, num_filters {}, patch_dim {}, patch_step {}, patch_stride {}\
             \n  filters {}, lr-coef {}, max-norm {}\
             \n  bias {}, lr-coef {}",
            geometry.num_splice(),
            geometry.num_patches(),
            self.num_filters(),
            self.patch_dim,
            self.patch_step,
            self.patch_stride,
            moment_statistics(self.filters.iter()),
            self.learn_rate_coef,
            self.max_norm,
            moment_statistics(self.bias.iter()),
            self.bias_learn_rate_coef
        )
    }

    fn box_clone(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn as_updatable(&self) -> Option<&dyn UpdatableComponent> {
        Some(self)
    }

    fn as_updatable_mut(&mut self) -> Option<&mut dyn UpdatableComponent> {
        Some(self)
    }
}

impl UpdatableComponent for ConvolutionalComponent {
    fn num_params(&self) -> usize {
        self.filters.len() + self.bias.len()
    }

    fn params(&self) -> Vector {
        self.filters.iter().chain(self.bias.iter()).copied().collect()
    }

    fn compute_gradients(&self, input: &Matrix, output_diff: &Matrix) -> ParameterGradients {
        let kind = ComponentType::Convolutional;
        assert_num_cols(kind, "input", input, self.input_dim);
        assert_num_cols(kind, "output_diff", output_diff, self.output_dim);
        assert_num_rows(kind, input, output_diff, output_diff);

        let geometry = self.geometry();
        let num_filters = self.num_filters();
        let per_patch = collect_parallel_or_sequential(
            geometry.num_patches(),
            self.is_parallel(input.nrows()),
            |p| {
                let diff = output_diff.slice(s![.., geometry.output_columns(p, num_filters)]);
                let filters_grad = diff.t().dot(&self.feature_patches(input, p));
                (filters_grad, diff.sum_axis(Axis(0)))
            },
        );

        let mut weights = Matrix::zeros(self.filters.raw_dim());
        let mut bias = Vector::zeros(num_filters);
        for (filters_grad, bias_grad) in &per_patch {
            weights += filters_grad;
            bias += bias_grad;
        }
        ParameterGradients {
            weights,
            bias,
            num_frames: input.nrows(),
        }
    }

    fn update(&mut self, gradients: &ParameterGradients, options: &TrainOptions) {
        assert!(
            gradients.weights.dim() == self.filters.dim() && gradients.bias.len() == self.bias.len(),
            "{}: gradient shapes do not match the parameters",
            ComponentType::Convolutional
        );
        let lr = options.learn_rate * self.learn_rate_coef;
        let lr_bias = options.learn_rate * self.bias_learn_rate_coef;

        if options.l2_penalty != 0.0 {
            let decay = lr * options.l2_penalty * gradients.num_frames as f32;
            self.filters *= 1.0 - decay;
        }
        self.filters.scaled_add(-lr, &gradients.weights);
        self.bias.scaled_add(-lr_bias, &gradients.bias);

        if self.max_norm > 0.0 {
            self.apply_max_norm();
        }
    }
}

use super::*;

/// Validates that a geometry option is greater than zero.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` if `value` is 0.
pub fn validate_positive(value: usize, tag: &str, kind: ComponentType) -> Result<(), ModelError> {
    if value == 0 {
        return Err(ModelError::ConfigError(format!(
            "{} of {} must be greater than zero",
            tag, kind
        )));
    }
    Ok(())
}

/// Validates that `dim` is a multiple of `divisor`.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` naming both quantities if `dim % divisor != 0`.
pub fn validate_divisible(
    dim: usize,
    dim_name: &str,
    divisor: usize,
    divisor_name: &str,
    kind: ComponentType,
) -> Result<(), ModelError> {
    if dim % divisor != 0 {
        return Err(ModelError::ConfigError(format!(
            "{}: {} ({}) must be a multiple of {} ({})",
            kind, dim_name, dim, divisor_name, divisor
        )));
    }
    Ok(())
}

/// Validates that a window fits in the span it slides over and that the step lands exactly on
/// the last position.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` if:
/// - `window` is greater than `span`
/// - `(span - window)` is not a multiple of `step`
pub fn validate_window(
    window: usize,
    window_name: &str,
    step: usize,
    step_name: &str,
    span: usize,
    span_name: &str,
    kind: ComponentType,
) -> Result<(), ModelError> {
    if window > span {
        return Err(ModelError::ConfigError(format!(
            "{}: {} ({}) cannot be greater than {} ({})",
            kind, window_name, window, span_name, span
        )));
    }
    if (span - window) % step != 0 {
        return Err(ModelError::ConfigError(format!(
            "{}: {} - {} ({}) must be a multiple of {} ({})",
            kind,
            span_name,
            window_name,
            span - window,
            step_name,
            step
        )));
    }
    Ok(())
}

/// Validates that the declared dimension equals the one implied by the geometry.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` if `declared != implied`.
pub fn validate_dim_matches(
    declared: usize,
    implied: usize,
    dim_name: &str,
    kind: ComponentType,
) -> Result<(), ModelError> {
    if declared != implied {
        return Err(ModelError::ConfigError(format!(
            "{}: {} is {}, but the geometry implies {}",
            kind, dim_name, declared, implied
        )));
    }
    Ok(())
}

/// Validates that a floating-point hyperparameter is finite and not negative.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` if the value is negative, NaN or infinite.
pub fn validate_non_negative(value: f32, tag: &str, kind: ComponentType) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::ConfigError(format!(
            "{} of {} must be a finite non-negative number, got {}",
            tag, kind, value
        )));
    }
    Ok(())
}

/// Validates the shape of a parameter matrix.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` if the shape differs from `(rows, cols)`.
pub fn validate_matrix_shape(
    matrix: &Matrix,
    rows: usize,
    cols: usize,
    name: &str,
    kind: ComponentType,
) -> Result<(), ModelError> {
    if matrix.dim() != (rows, cols) {
        return Err(ModelError::ConfigError(format!(
            "{}: {} has shape {}x{}, expected {}x{}",
            kind,
            name,
            matrix.nrows(),
            matrix.ncols(),
            rows,
            cols
        )));
    }
    Ok(())
}

/// Validates the length of a parameter vector.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` if the length differs from `len`.
pub fn validate_vector_len(
    vector: &Vector,
    len: usize,
    name: &str,
    kind: ComponentType,
) -> Result<(), ModelError> {
    if vector.len() != len {
        return Err(ModelError::ConfigError(format!(
            "{}: {} has {} values, expected {}",
            kind,
            name,
            vector.len(),
            len
        )));
    }
    Ok(())
}

/// Validates that a `rows x cols` parameter matrix can be allocated.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` if `rows * cols` overflows or exceeds `isize::MAX` elements.
pub fn validate_num_elements(
    rows: usize,
    cols: usize,
    name: &str,
    kind: ComponentType,
) -> Result<(), ModelError> {
    match rows.checked_mul(cols) {
        Some(n) if n <= isize::MAX as usize => Ok(()),
        _ => Err(ModelError::ConfigError(format!(
            "{}: {} of shape {}x{} is too large",
            kind, name, rows, cols
        ))),
    }
}

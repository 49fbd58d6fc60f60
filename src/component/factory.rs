use super::convolutional::ConvolutionalComponent;
use super::descriptor::{TokenReader, parse_f32, parse_usize};
use super::length_norm::LengthNormComponent;
use super::max_pooling::MaxPoolingComponent;
use super::*;
use ahash::AHashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Marker that may terminate a serialized component
pub const END_OF_COMPONENT: &str = "<!EndOfComponent>";

fn is_tag(token: &str) -> bool {
    token.len() > 2 && token.starts_with('<') && token.ends_with('>')
}

/// A parsed, not yet validated component descriptor.
///
/// Accepts both header forms:
/// - positional, as written in model files: `<Type> <OutputDim> <InputDim> ...`
/// - tagged, as used for initialisation: `<Type> <InputDim> n <OutputDim> n ...`
///
/// followed by `<Tag> value` options in any order, an optional `<Filters>` matrix literal, an
/// optional `<Bias>` vector literal and an optional `<!EndOfComponent>` marker.
///
/// Components consume the options they understand through the `take_*` methods; whatever is
/// left when [`ComponentDescriptor::finish`] runs is reported as unrecognized.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    component_type: ComponentType,
    input_dim: usize,
    output_dim: usize,
    options: AHashMap<String, String>,
    filters: Option<Matrix>,
    bias: Option<Vector>,
}

impl ComponentDescriptor {
    /// Parses descriptor text.
    ///
    /// # Returns
    ///
    /// - `Ok(ComponentDescriptor)` - The tokenized descriptor
    /// - `Err(ModelError::ConfigError)` - If the marker is unknown, a dimension is missing, an
    ///   option is duplicated or has no value, or a literal is malformed
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let mut reader = TokenReader::new(text);
        let marker = reader.next_word("a component marker such as <ConvolutionalComponent>")?;
        let component_type = ComponentType::from_marker(marker).ok_or_else(|| {
            ModelError::unexpected(
                marker,
                "one of <LengthNormComponent>, <ConvolutionalComponent>, <MaxPoolingComponent>",
            )
        })?;

        let mut input_dim = None;
        let mut output_dim = None;
        if reader.peek().is_some_and(|t| !is_tag(t)) {
            output_dim = Some(reader.read_usize("<OutputDim>")?);
            input_dim = Some(reader.read_usize("<InputDim>")?);
        }

        let mut options = AHashMap::new();
        let mut filters = None;
        let mut bias = None;
        while !reader.is_empty() {
            let tag = reader.next_word("an option tag")?;
            match tag {
                END_OF_COMPONENT => {
                    if let Some(extra) = reader.peek() {
                        return Err(ModelError::unexpected(extra, "end of descriptor"));
                    }
                }
                "<InputDim>" | "<OutputDim>" => {
                    let slot = if tag == "<InputDim>" {
                        &mut input_dim
                    } else {
                        &mut output_dim
                    };
                    if slot.is_some() {
                        return Err(duplicate(tag, component_type));
                    }
                    *slot = Some(reader.read_usize(tag)?);
                }
                "<Filters>" => {
                    if filters.is_some() {
                        return Err(duplicate(tag, component_type));
                    }
                    filters = Some(reader.read_matrix(tag)?);
                }
                "<Bias>" => {
                    if bias.is_some() {
                        return Err(duplicate(tag, component_type));
                    }
                    bias = Some(reader.read_vector(tag)?);
                }
                t if is_tag(t) => {
                    let expected = format!("a value for {}", t);
                    let value = reader.next_word(&expected)?;
                    if is_tag(value) || matches!(value, "[" | "]" | ";") {
                        return Err(ModelError::unexpected(value, &expected));
                    }
                    if options.insert(t.to_string(), value.to_string()).is_some() {
                        return Err(duplicate(t, component_type));
                    }
                }
                other => {
                    return Err(ModelError::unexpected(
                        other,
                        &format!("an option tag of {} such as <Name>", component_type),
                    ));
                }
            }
        }

        let missing = |name: &str| {
            ModelError::ConfigError(format!(
                "{} is missing {} (expected '{} <OutputDim> <InputDim>' or '{} n')",
                component_type, name, component_type, name
            ))
        };
        Ok(ComponentDescriptor {
            component_type,
            input_dim: input_dim.ok_or_else(|| missing("<InputDim>"))?,
            output_dim: output_dim.ok_or_else(|| missing("<OutputDim>"))?,
            options,
            filters,
            bias,
        })
    }

    get_field!(component_type, component_type, ComponentType);
    get_field!(input_dim, input_dim, usize);
    get_field!(output_dim, output_dim, usize);

    /// Returns `true` if both `<Filters>` and `<Bias>` were given.
    pub fn has_parameters(&self) -> bool {
        self.filters.is_some() && self.bias.is_some()
    }

    /// Removes an integer option.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` - If the option was not given
    /// - `Ok(Some(usize))` - The parsed value
    /// - `Err(ModelError::ConfigError)` - If the value is not a non-negative integer
    pub fn take_usize(&mut self, tag: &str) -> Result<Option<usize>, ModelError> {
        self.options
            .remove(tag)
            .map(|v| parse_usize(&v, tag))
            .transpose()
    }

    /// Removes an integer option that must be present.
    pub fn require_usize(&mut self, tag: &str) -> Result<usize, ModelError> {
        self.take_usize(tag)?.ok_or_else(|| {
            ModelError::ConfigError(format!(
                "{} requires option '{} n'",
                self.component_type, tag
            ))
        })
    }

    /// Removes a floating-point option.
    pub fn take_f32(&mut self, tag: &str) -> Result<Option<f32>, ModelError> {
        self.options
            .remove(tag)
            .map(|v| parse_f32(&v, tag))
            .transpose()
    }

    /// Removes a word-valued option.
    pub fn take_word(&mut self, tag: &str) -> Option<String> {
        self.options.remove(tag)
    }

    /// Removes the `<Filters>` literal.
    pub fn take_filters(&mut self) -> Option<Matrix> {
        self.filters.take()
    }

    /// Removes the `<Bias>` literal.
    pub fn take_bias(&mut self) -> Option<Vector> {
        self.bias.take()
    }

    /// Checks that every option and literal was consumed by the component.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigError` listing the unrecognized tags.
    pub fn finish(self) -> Result<(), ModelError> {
        let mut leftover: Vec<&str> = self.options.keys().map(String::as_str).collect();
        if self.filters.is_some() {
            leftover.push("<Filters>");
        }
        if self.bias.is_some() {
            leftover.push("<Bias>");
        }
        if leftover.is_empty() {
            return Ok(());
        }
        leftover.sort_unstable();
        Err(ModelError::ConfigError(format!(
            "unrecognized option(s) for {}: {}",
            self.component_type,
            leftover.join(" ")
        )))
    }
}

fn duplicate(tag: &str, kind: ComponentType) -> ModelError {
    ModelError::ConfigError(format!("{} given more than once for {}", tag, kind))
}

/// Builds a component from a parsed descriptor, drawing missing parameters from `rng`.
pub fn build_component<R: Rng>(
    mut descriptor: ComponentDescriptor,
    rng: &mut R,
) -> Result<Box<dyn Component>, ModelError> {
    let component: Box<dyn Component> = match descriptor.component_type() {
        ComponentType::LengthNorm => Box::new(LengthNormComponent::from_descriptor(&mut descriptor)?),
        ComponentType::Convolutional => Box::new(ConvolutionalComponent::from_descriptor(
            &mut descriptor,
            rng,
        )?),
        ComponentType::MaxPooling => Box::new(MaxPoolingComponent::from_descriptor(&mut descriptor)?),
    };
    descriptor.finish()?;
    Ok(component)
}

/// Builds a component from descriptor text, randomly initialising parameters that are not given.
///
/// # Parameters
///
/// - `text` - Descriptor text in either header form
/// - `rng` - Source of randomness for `<Filters>`/`<Bias>` when they are omitted
///
/// # Returns
///
/// - `Ok(Box<dyn Component>)` - The configured component
/// - `Err(ModelError::ConfigError)` - If the descriptor is malformed or inconsistent
pub fn init_component_with_rng<R: Rng>(
    text: &str,
    rng: &mut R,
) -> Result<Box<dyn Component>, ModelError> {
    build_component(ComponentDescriptor::parse(text)?, rng)
}

/// Same as [`init_component_with_rng`], seeded from the operating system.
pub fn init_component(text: &str) -> Result<Box<dyn Component>, ModelError> {
    let mut rng = StdRng::from_os_rng();
    init_component_with_rng(text, &mut rng)
}

/// Builds a component from descriptor text in either construction mode.
///
/// # Example
/// ```rust
/// use acoustic_nnet::prelude::*;
///
/// let pooling = parse_component(
///     "<MaxPoolingComponent> <InputDim> 24 <OutputDim> 8 <PoolSize> 3 <PoolStep> 3 <PoolStride> 4",
/// )
/// .unwrap();
/// assert_eq!(pooling.component_type(), ComponentType::MaxPooling);
/// assert_eq!(pooling.output_dim(), 8);
/// ```
pub fn parse_component(text: &str) -> Result<Box<dyn Component>, ModelError> {
    init_component(text)
}

/// Builds a component whose trainable parameters are all given inline.
///
/// # Errors
///
/// Returns `ModelError::ConfigError` if a parameterised component lacks `<Filters>` or `<Bias>`,
/// or if the descriptor is otherwise invalid.
pub fn read_component(text: &str) -> Result<Box<dyn Component>, ModelError> {
    let descriptor = ComponentDescriptor::parse(text)?;
    if descriptor.component_type().is_updatable() && !descriptor.has_parameters() {
        return Err(ModelError::ConfigError(format!(
            "{} read from a model needs '<Filters> [ .. ] <Bias> [ .. ]'",
            descriptor.component_type()
        )));
    }
    // every parameter is present, the generator is never drawn from
    let mut rng = StdRng::seed_from_u64(0);
    build_component(descriptor, &mut rng)
}

/// Serializes a component as `<Type> <OutputDim> <InputDim> <data> <!EndOfComponent>`.
///
/// Parsing the result with [`read_component`] gives a component with identical behavior.
pub fn write_component(component: &dyn Component) -> String {
    let mut out = format!(
        "{} {} {}",
        component.component_type().marker(),
        component.output_dim(),
        component.input_dim()
    );
    component.write_data(&mut out);
    out.push(' ');
    out.push_str(END_OF_COMPONENT);
    out.push('\n');
    out
}

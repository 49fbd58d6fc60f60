use acoustic_nnet::prelude::*;
use ndarray::array;
use rand::SeedableRng;
use rand::rngs::StdRng;

const CONV_INIT: &str = "<ConvolutionalComponent> <InputDim> 15 <OutputDim> 9 \
    <PatchDim> 3 <PatchStep> 1 <PatchStride> 5 <MaxNorm> 2.5 <LearnRateCoef> 0.5";

fn config_error_message(result: Result<Box<dyn Component>, ModelError>) -> String {
    match result {
        Err(ModelError::ConfigError(msg)) => msg,
        Ok(component) => panic!("expected a config error, built {:?}", component),
    }
}

#[test]
fn test_parse_all_component_types() {
    let length_norm = parse_component("<LengthNormComponent> 5 5").unwrap();
    assert_eq!(length_norm.component_type(), ComponentType::LengthNorm);
    assert_eq!(length_norm.input_dim(), 5);

    let conv = parse_component(CONV_INIT).unwrap();
    assert_eq!(conv.component_type(), ComponentType::Convolutional);
    assert_eq!((conv.input_dim(), conv.output_dim()), (15, 9));
    assert!(conv.as_updatable().is_some());

    let pool = parse_component(
        "<MaxPoolingComponent> <InputDim> 24 <OutputDim> 8 <PoolSize> 3 <PoolStep> 3 <PoolStride> 4",
    )
    .unwrap();
    assert_eq!(pool.component_type(), ComponentType::MaxPooling);
}

#[test]
fn test_positional_header_is_output_then_input() {
    let conv = parse_component(
        "<ConvolutionalComponent> 9 15 <PatchDim> 3 <PatchStep> 1 <PatchStride> 5",
    )
    .unwrap();
    assert_eq!(conv.input_dim(), 15);
    assert_eq!(conv.output_dim(), 9);
}

#[test]
fn test_unknown_marker() {
    let msg = config_error_message(parse_component("<SigmoidComponent> 5 5"));
    assert!(msg.contains("<SigmoidComponent>"));
}

#[test]
fn test_missing_option_is_named() {
    let msg = config_error_message(parse_component(
        "<ConvolutionalComponent> 9 15 <PatchStep> 1 <PatchStride> 5",
    ));
    assert!(msg.contains("<PatchDim>"), "{}", msg);
}

#[test]
fn test_missing_dimension() {
    let msg = config_error_message(parse_component("<LengthNormComponent> <InputDim> 5"));
    assert!(msg.contains("<OutputDim>"), "{}", msg);
}

#[test]
fn test_unknown_and_duplicate_options() {
    let msg = config_error_message(parse_component("<LengthNormComponent> 5 5 <Foo> 1"));
    assert!(msg.contains("<Foo>"), "{}", msg);

    let msg = config_error_message(parse_component(
        "<MaxPoolingComponent> 4 8 <PoolSize> 2 <PoolSize> 2 <PoolStride> 2",
    ));
    assert!(msg.contains("more than once"), "{}", msg);

    // parameters are not options of a length normalization
    let msg = config_error_message(parse_component(
        "<LengthNormComponent> 2 2 <Filters> [ 1 2 ] <Bias> [ 0 ]",
    ));
    assert!(msg.contains("<Filters>") && msg.contains("<Bias>"), "{}", msg);
}

#[test]
fn test_option_without_value() {
    let result = parse_component("<MaxPoolingComponent> 4 8 <PoolSize> <PoolStride> 2");
    assert!(matches!(result, Err(ModelError::ConfigError(_))));
    let result = parse_component("<MaxPoolingComponent> 4 8 <PoolSize> 2 <PoolStride>");
    assert!(matches!(result, Err(ModelError::ConfigError(_))));
}

#[test]
fn test_malformed_literals() {
    let base = "<ConvolutionalComponent> 1 2 <PatchDim> 2 <PatchStep> 1 <PatchStride> 2";
    for literal in [
        "<Filters> [ 1 2 <Bias> [ 0 ]",
        "<Filters> [ 1 x ] <Bias> [ 0 ]",
        "<Filters> [ 1 2 ] <Bias> [ 0 ; 1 ]",
        "<Filters> [ 1 2 ; 3 ] <Bias> [ 0 ]",
    ] {
        let text = format!("{} {}", base, literal);
        assert!(
            matches!(read_component(&text), Err(ModelError::ConfigError(_))),
            "accepted: {}",
            text
        );
    }
}

#[test]
fn test_read_requires_parameters() {
    let text = "<ConvolutionalComponent> 9 15 <PatchDim> 3 <PatchStep> 1 <PatchStride> 5";
    let msg = config_error_message(read_component(text));
    assert!(msg.contains("<Filters>"), "{}", msg);
    assert!(init_component(text).is_ok());

    // parameter-free components read fine
    assert!(read_component("<LengthNormComponent> 3 3").is_ok());
}

#[test]
fn test_end_of_component_marker() {
    let component = read_component("<LengthNormComponent> 3 3 <!EndOfComponent>").unwrap();
    assert_eq!(component.output_dim(), 3);

    let result = read_component("<LengthNormComponent> 3 3 <!EndOfComponent> <Foo> 1");
    assert!(matches!(result, Err(ModelError::ConfigError(_))));
}

#[test]
fn test_write_read_round_trip() {
    let mut rng = StdRng::seed_from_u64(11);
    let texts = [
        "<LengthNormComponent> 6 6",
        CONV_INIT,
        "<MaxPoolingComponent> 8 24 <PoolSize> 3 <PoolStep> 3 <PoolStride> 4",
        "<MaxPoolingComponent> 8 24 <PoolSize> 3 <PoolStep> 3 <PoolStride> 4 <TieRouting> All",
    ];
    for text in texts {
        let original = init_component_with_rng(text, &mut rng).unwrap();
        let written = write_component(original.as_ref());
        assert!(written.trim_end().ends_with("<!EndOfComponent>"));

        let restored = read_component(&written).unwrap();
        assert_eq!(restored.component_type(), original.component_type());
        assert_eq!(restored.input_dim(), original.input_dim());
        assert_eq!(restored.output_dim(), original.output_dim());
        assert_eq!(write_component(restored.as_ref()), written);

        if let (Some(a), Some(b)) = (original.as_updatable(), restored.as_updatable()) {
            assert_eq!(a.params(), b.params());
        }

        let input = Matrix::from_shape_fn((3, original.input_dim()), |(r, c)| {
            ((r * 13 + c * 7) % 10) as f32 - 4.5
        });
        let output = original.propagate(&input);
        assert_eq!(restored.propagate(&input), output);
        let output_diff = Matrix::from_shape_fn(output.raw_dim(), |(r, c)| (r + c) as f32 * 0.5);
        assert_eq!(
            restored.backpropagate(&input, &output, &output_diff),
            original.backpropagate(&input, &output, &output_diff)
        );
    }
}

#[test]
fn test_written_convolution_keeps_hyperparameters() {
    let component = read_component(
        "<ConvolutionalComponent> 1 2 <PatchDim> 2 <PatchStep> 1 <PatchStride> 2 \
         <LearnRateCoef> 0.25 <BiasLearnRateCoef> 2 <MaxNorm> 1.5 \
         <Filters> [ 0.5 -1.5 ] <Bias> [ 0.125 ]",
    )
    .unwrap();
    let written = write_component(component.as_ref());
    assert!(written.starts_with("<ConvolutionalComponent> 1 2"));
    assert!(written.contains("<LearnRateCoef> 0.25"));
    assert!(written.contains("<BiasLearnRateCoef> 2"));
    assert!(written.contains("<MaxNorm> 1.5"));
    assert!(written.contains("0.5 -1.5"));
    assert!(written.contains("<Bias> [ 0.125 ]"));

    let input = array![[2.0, 1.0]];
    let restored = read_component(&written).unwrap();
    assert_eq!(restored.propagate(&input), array![[-0.375]]);
}

#[test]
fn test_default_tie_routing_is_not_written() {
    let component =
        parse_component("<MaxPoolingComponent> 2 4 <PoolSize> 2 <PoolStride> 1").unwrap();
    assert!(!write_component(component.as_ref()).contains("<TieRouting>"));
    // the step defaults to the pool size
    assert!(write_component(component.as_ref()).contains("<PoolStep> 2"));
}

#[test]
fn test_boxed_clone_is_independent() {
    let text = "<ConvolutionalComponent> 1 2 <PatchDim> 2 <PatchStep> 1 <PatchStride> 2 \
                <Filters> [ 1 1 ] <Bias> [ 0 ]";
    let original = read_component(text).unwrap();
    let mut copy = original.clone();

    let gradients = ParameterGradients {
        weights: array![[1.0, 1.0]],
        bias: array![1.0],
        num_frames: 1,
    };
    let options = TrainOptions {
        learn_rate: 1.0,
        l2_penalty: 0.0,
    };
    copy.as_updatable_mut().unwrap().update(&gradients, &options);

    assert_eq!(original.as_updatable().unwrap().params(), array![1.0, 1.0, 0.0]);
    assert_eq!(copy.as_updatable().unwrap().params(), array![0.0, 0.0, -1.0]);
}

#[test]
fn test_seeded_init_is_deterministic() {
    let mut a = StdRng::seed_from_u64(42);
    let mut b = StdRng::seed_from_u64(42);
    let first = init_component_with_rng(CONV_INIT, &mut a).unwrap();
    let second = init_component_with_rng(CONV_INIT, &mut b).unwrap();
    assert_eq!(write_component(first.as_ref()), write_component(second.as_ref()));
}

#[test]
fn test_descriptor_accessors() {
    let descriptor = ComponentDescriptor::parse(
        "<MaxPoolingComponent> <OutputDim> 8 <InputDim> 24 <PoolSize> 3",
    )
    .unwrap();
    assert_eq!(descriptor.component_type(), ComponentType::MaxPooling);
    assert_eq!(descriptor.input_dim(), 24);
    assert_eq!(descriptor.output_dim(), 8);
    assert!(!descriptor.has_parameters());
}

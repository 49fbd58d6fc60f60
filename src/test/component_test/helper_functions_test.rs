use super::*;

fn patch_geometry(
    input_dim: usize,
    patch_dim: usize,
    patch_step: usize,
    patch_stride: usize,
) -> PatchGeometry {
    PatchGeometry {
        input_dim,
        patch_dim,
        patch_step,
        patch_stride,
    }
}

#[test]
fn test_patch_geometry_counts() {
    // 3 spliced frames of 5 features, 3-wide patches moving by 1
    let geometry = patch_geometry(15, 3, 1, 5);
    assert_eq!(geometry.num_splice(), 3);
    assert_eq!(geometry.num_patches(), 3);
    assert_eq!(geometry.filter_dim(), 9);

    // identity layout: every column is its own patch
    let geometry = patch_geometry(5, 1, 1, 5);
    assert_eq!(geometry.num_splice(), 1);
    assert_eq!(geometry.num_patches(), 5);
    assert_eq!(geometry.filter_dim(), 1);
}

#[test]
fn test_patch_columns_follow_blocks() {
    let geometry = patch_geometry(15, 3, 1, 5);
    assert_eq!(geometry.patch_columns(0), vec![0, 1, 2, 5, 6, 7, 10, 11, 12]);
    assert_eq!(geometry.patch_columns(1), vec![1, 2, 3, 6, 7, 8, 11, 12, 13]);
    assert_eq!(geometry.patch_columns(2), vec![2, 3, 4, 7, 8, 9, 12, 13, 14]);

    // wider step
    let geometry = patch_geometry(16, 2, 2, 8);
    assert_eq!(geometry.num_patches(), 4);
    assert_eq!(geometry.patch_columns(3), vec![6, 7, 14, 15]);
}

#[test]
fn test_patch_column_consistency() {
    let geometry = patch_geometry(24, 3, 2, 7);
    for p in 0..geometry.num_patches() {
        let columns = geometry.patch_columns(p);
        for s in 0..geometry.num_splice() {
            for d in 0..geometry.patch_dim {
                let k = geometry.filter_column(s, d);
                assert_eq!(columns[k], geometry.input_column(p, s, d));
                assert!(columns[k] < geometry.input_dim);
            }
        }
    }
    assert_eq!(geometry.output_columns(2, 4), 8..12);
}

#[test]
fn test_pool_geometry() {
    let geometry = PoolGeometry {
        input_dim: 24,
        pool_size: 3,
        pool_step: 3,
        pool_stride: 4,
    };
    assert_eq!(geometry.num_patches(), 6);
    assert_eq!(geometry.num_pools(), 2);
    assert_eq!(geometry.output_dim(), 8);

    // second pool covers blocks 3, 4, 5
    let blocks: Vec<usize> = (0..3).map(|r| geometry.patch_in_pool(1, r)).collect();
    assert_eq!(blocks, vec![3, 4, 5]);
    assert_eq!(geometry.input_column(4, 2), 18);
    assert_eq!(geometry.output_column(1, 2), 6);
}

#[test]
fn test_pool_geometry_overlapping() {
    let geometry = PoolGeometry {
        input_dim: 10,
        pool_size: 3,
        pool_step: 1,
        pool_stride: 2,
    };
    assert_eq!(geometry.num_patches(), 5);
    assert_eq!(geometry.num_pools(), 3);
    assert_eq!(geometry.patch_in_pool(2, 2), 4);
    assert_eq!(geometry.output_dim(), 6);
}

#[test]
fn test_component_type_markers() {
    for kind in [
        ComponentType::LengthNorm,
        ComponentType::Convolutional,
        ComponentType::MaxPooling,
    ] {
        assert_eq!(ComponentType::from_marker(kind.marker()), Some(kind));
    }
    assert_eq!(ComponentType::from_marker("<AffineTransform>"), None);
    assert_eq!(
        ComponentType::Convolutional.to_string(),
        "<ConvolutionalComponent>"
    );
    assert!(ComponentType::Convolutional.is_updatable());
    assert!(!ComponentType::MaxPooling.is_updatable());
}

#[test]
fn test_moment_statistics() {
    let values = [1.0f32, 2.0, 3.0, 4.0];
    let info = moment_statistics(values.iter());
    assert!(info.contains("min 1"));
    assert!(info.contains("max 4"));
    assert!(info.contains("mean 2.500000"));
    assert_eq!(moment_statistics(std::iter::empty::<&f32>()), "( empty )");
}

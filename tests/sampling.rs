use cifar_gan::{
    GanErr,
    adversarial::{Gan, ImageGenerator},
    config::{GanConfig, GanTopology},
    sampling::{fake_batch, latent_batch, real_batch},
};
use machine_learning::dataset::Dataset;
use ndarray::{ArrayD, Axis};
use rand::{SeedableRng, rngs::StdRng};

fn small_gan() -> Gan {
    let config = GanConfig {
        latent_dim: 4,
        seed: Some(3),
        topology: GanTopology {
            image_shape: (3, 8, 8),
            generator_filters: 4,
            generator_base_channels: 4,
            discriminator_filters: vec![2, 4],
            ..Default::default()
        },
        ..Default::default()
    };

    Gan::build(&config).unwrap()
}

fn dataset(n: usize) -> Dataset {
    let x = ArrayD::from_shape_fn(vec![n, 3, 2, 2], |ix| ix[0] as f32 / n as f32);
    Dataset::unlabeled(x).unwrap()
}

#[test]
fn latent_batch_is_n_by_latent_dim_and_finite() {
    let mut rng = StdRng::seed_from_u64(0);
    let z = latent_batch(100, 64, &mut rng);

    assert_eq!(z.dim(), (64, 100));
    assert!(z.iter().all(|v| v.is_finite()));

    // Standard normal samples, loosely.
    let mean = z.mean().unwrap();
    assert!(mean.abs() < 0.1, "mean {mean}");
}

#[test]
fn real_batch_rows_come_from_the_dataset() {
    let mut rng = StdRng::seed_from_u64(1);
    let data = dataset(5);

    let (images, labels) = real_batch(&data, 12, &mut rng).unwrap();

    assert_eq!(images.shape(), &[12, 3, 2, 2]);
    assert_eq!(labels.dim(), (12, 1));
    assert!(labels.iter().all(|&y| y == 1.));

    for image in images.axis_iter(Axis(0)) {
        let found = data.x().axis_iter(Axis(0)).any(|row| row == image);
        assert!(found);
    }
}

#[test]
fn real_batch_from_an_empty_dataset_fails() {
    let mut rng = StdRng::seed_from_u64(2);
    let empty = Dataset::unlabeled(ArrayD::zeros(vec![0, 3, 2, 2])).unwrap();

    let err = real_batch(&empty, 4, &mut rng).unwrap_err();
    assert!(matches!(err, GanErr::DataLoad { .. }));
}

#[test]
fn fake_batch_is_labeled_zero() {
    let mut rng = StdRng::seed_from_u64(3);
    let gan = small_gan();

    let (images, labels) = fake_batch(&gan, gan.latent_dim(), 6, &mut rng).unwrap();

    assert_eq!(images.shape(), &[6, 3, 8, 8]);
    assert_eq!(labels.dim(), (6, 1));
    assert!(labels.iter().all(|&y| y == 0.));

    // tanh output.
    assert!(images.iter().all(|v| (-1. ..=1.).contains(v)));
}

#[test]
fn fake_batch_with_the_wrong_latent_dim_fails() {
    let mut rng = StdRng::seed_from_u64(4);
    let gan = small_gan();

    let err = fake_batch(&gan, gan.latent_dim() + 1, 2, &mut rng).unwrap_err();
    assert!(matches!(err, GanErr::ShapeMismatch { .. }));
}

use cifar_gan::{
    GanErr,
    adversarial::Gan,
    classifier::{CLASS_NAMES, Classifier, argmax_label, train_classifier},
    config::{ClassifierConfig, ClassifierTopology, GanConfig, GanTopology, LabelConfig},
    data::one_hot,
    session::LabelingSession,
    topology::classifier_spec,
};
use machine_learning::{arch::ModelBuilder, dataset::Dataset};
use ndarray::{ArrayD, Axis};
use rand::{SeedableRng, rngs::StdRng};

fn small_topology() -> ClassifierTopology {
    ClassifierTopology {
        image_shape: (3, 8, 8),
        block_filters: vec![2],
        dense_units: 4,
        classes: CLASS_NAMES.len(),
    }
}

fn small_classifier(seed: u64) -> Classifier {
    let (model, params) = ModelBuilder::new(Some(seed))
        .build(&classifier_spec(&small_topology()))
        .unwrap();

    Classifier::new(model, params).unwrap()
}

fn images(n: usize) -> ArrayD<f32> {
    ArrayD::from_shape_fn(vec![n, 3, 8, 8], |ix| ((ix[0] * 7 + ix[2] * 3 + ix[3]) % 11) as f32 / 10.)
}

#[test]
fn probabilities_sum_to_one_over_ten_classes() {
    let classifier = small_classifier(0);
    let probabilities = classifier.classify_batch(images(6)).unwrap();

    assert_eq!(probabilities.dim(), (6, 10));
    for row in probabilities.axis_iter(Axis(0)) {
        assert!((row.sum() - 1.).abs() < 1e-5);
        assert!(row.iter().all(|&p| p >= 0.));
        assert!(CLASS_NAMES.contains(&argmax_label(row).unwrap()));
    }
}

#[test]
fn single_image_matches_its_batch_row() {
    let classifier = small_classifier(1);
    let batch = images(3);

    let probabilities = classifier.classify_batch(batch.clone()).unwrap();
    let image = batch.index_axis(Axis(0), 2).into_dimensionality().unwrap();
    let single = classifier.classify(image).unwrap();

    let diff = (&single - &probabilities.row(2)).mapv(f32::abs);
    assert!(diff.iter().all(|&d| d < 1e-6));
}

#[test]
fn classifier_with_the_wrong_class_count_is_rejected() {
    let topology = ClassifierTopology {
        classes: 3,
        ..small_topology()
    };
    let (model, params) = ModelBuilder::new(Some(2)).build(&classifier_spec(&topology)).unwrap();

    let err = Classifier::new(model, params).err().unwrap();
    assert!(matches!(err, GanErr::ShapeMismatch { .. }));
}

#[test]
fn labeling_session_labels_every_generated_image() {
    let dir = tempfile::tempdir().unwrap();
    let gan_config = GanConfig {
        latent_dim: 4,
        seed: Some(3),
        topology: GanTopology {
            image_shape: (3, 8, 8),
            generator_filters: 4,
            generator_base_channels: 4,
            discriminator_filters: vec![2],
            ..Default::default()
        },
        ..Default::default()
    };
    let generator = Gan::build(&gan_config).unwrap().into_generator();

    let config = LabelConfig {
        n_images: 9,
        grid_side: 3,
        output_dir: dir.path().to_path_buf(),
        seed: Some(4),
        ..Default::default()
    };

    let mut session = LabelingSession::from_parts(config, generator, small_classifier(5)).unwrap();
    let report = session.run().unwrap();

    assert_eq!(report.images.len(), 9);
    assert!(report.grid.exists());
    for image in &report.images {
        assert!((image.probabilities.sum() - 1.).abs() < 1e-5);
    }

    let counted: usize = report.stats.iter().map(|s| s.count).sum();
    assert_eq!(counted, 9);
}

#[test]
fn trained_classifier_is_saved_and_reloadable() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClassifierConfig {
        output_dir: dir.path().to_path_buf(),
        epochs: 2,
        batch_size: 4,
        seed: Some(6),
        topology: small_topology(),
        ..Default::default()
    };

    let labels: Vec<u8> = (0..10).collect();
    let train = Dataset::new(images(10), one_hot(&labels, 10).unwrap()).unwrap();
    let test = Dataset::new(images(5), one_hot(&labels[..5], 10).unwrap()).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let report = train_classifier(&config, &train, &test, &mut rng).unwrap();

    assert_eq!(report.epochs.len(), 2);
    assert!(report.epochs.iter().all(|s| s.loss.is_finite()));
    assert!((0. ..=1.).contains(&report.test.accuracy));
    assert!(report.checkpoint.ends_with("classifier_model.safetensors"));

    let classifier = Classifier::load(&report.checkpoint).unwrap();
    let probabilities = classifier.classify_batch(images(2)).unwrap();
    assert_eq!(probabilities.dim(), (2, 10));
}

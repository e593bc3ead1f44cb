use cifar_gan::{
    GanErr,
    adversarial::{AdamSettings, AdversarialPair, Discriminator, Gan, Generator, ImageGenerator},
    config::{GanConfig, GanTopology},
    sampling::{fake_batch, latent_batch, real_labels},
    topology::{discriminator_spec, generator_spec},
};
use machine_learning::arch::ModelBuilder;
use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng};

fn small_config() -> GanConfig {
    GanConfig {
        latent_dim: 4,
        seed: Some(7),
        topology: GanTopology {
            image_shape: (3, 8, 8),
            generator_filters: 4,
            generator_base_channels: 4,
            discriminator_filters: vec![2, 4],
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn composite_step_never_touches_discriminator_params() {
    let mut rng = StdRng::seed_from_u64(0);
    let mut gan = Gan::build(&small_config()).unwrap();

    for _ in 0..3 {
        let d_before: Vec<u32> = gan.discriminator().params().iter().map(|p| p.to_bits()).collect();
        let g_before = gan.generator().params().to_vec();

        let latent = latent_batch(4, 8, &mut rng);
        let loss = gan.composite().train_step(latent, real_labels(8).view()).unwrap();

        let d_after: Vec<u32> = gan.discriminator().params().iter().map(|p| p.to_bits()).collect();
        assert!(loss.is_finite());
        assert_eq!(d_before, d_after);
        assert_ne!(g_before, gan.generator().params());
    }

    assert_eq!(gan.discriminator().steps(), 0);
    assert_eq!(gan.generator().steps(), 3);
}

#[test]
fn discriminator_trains_outside_the_composite() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut gan = Gan::build(&small_config()).unwrap();

    let (images, labels) = fake_batch(&gan, 4, 4, &mut rng).unwrap();
    let before = gan.discriminator().params().to_vec();

    let eval = gan.evaluate_discriminator(images.clone(), labels.view()).unwrap();
    assert_eq!(before, gan.discriminator().params());

    let stats = gan.train_discriminator(images, labels.view()).unwrap();
    assert_ne!(before, gan.discriminator().params());
    assert!((0. ..=1.).contains(&stats.accuracy));
    assert!(eval.loss.is_finite());
}

#[test]
fn generator_checkpoint_roundtrip_reproduces_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("generator_model_001.safetensors");
    let mut rng = StdRng::seed_from_u64(2);
    let gan = Gan::build(&small_config()).unwrap();

    gan.save_generator(&path, 0).unwrap();
    let loaded = Generator::load(&path, AdamSettings::default()).unwrap();

    let latent = latent_batch(4, 5, &mut rng);
    let expected = gan.generate(latent.clone()).unwrap();
    let got = loaded.generate(latent).unwrap();

    assert_eq!(loaded.latent_dim(), 4);
    assert_eq!(loaded.image_shape(), &[3, 8, 8]);
    assert_eq!(expected, got);
}

#[test]
fn mismatched_pair_is_rejected() {
    let config = small_config();
    let builder = ModelBuilder::new(Some(0));
    let settings = AdamSettings::default();

    let (model, params) = builder.build(&generator_spec(4, &config.topology)).unwrap();
    let generator = Generator::new(model, params, settings).unwrap();

    let mut other = config.topology.clone();
    other.image_shape = (3, 16, 16);
    let (model, params) = builder.build(&discriminator_spec(&other)).unwrap();
    let discriminator = Discriminator::new(model, params, settings).unwrap();

    let err = Gan::new(generator, discriminator).err().unwrap();
    assert!(matches!(err, GanErr::ShapeMismatch { .. }));
}

#[test]
fn generate_rejects_latent_of_the_wrong_length() {
    let gan = Gan::build(&small_config()).unwrap();
    let err = gan.generate(Array2::zeros((2, 5))).unwrap_err();

    assert!(matches!(err, GanErr::ShapeMismatch { .. }));
}

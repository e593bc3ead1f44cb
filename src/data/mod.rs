mod cifar;
mod normalize;

pub use cifar::{CLASSES, IMAGE_SHAPE, RawImages, Split, load_split, parse_records};
pub use normalize::{
    gan_normalize, one_hot, rescale_generated, scale_unit, to_classifier_dataset, to_gan_dataset,
};

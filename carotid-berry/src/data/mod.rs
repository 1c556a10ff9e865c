mod image;
mod mask;

pub use image::UsImage;
pub use mask::{mean_class_probability, LabelMask, MaskPixel, OwnedLabelMask};

//! Data augmentation for the training stream
//!
//! The training partition gets a random resized crop and a random horizontal
//! flip on every load; validation and test use a deterministic resize only so
//! repeated evaluation of the same partition is reproducible.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Smallest fraction of the shorter image side kept by the random crop
const MIN_CROP_SCALE: f64 = 0.6;

/// Applies the per-sample image transforms
#[derive(Debug, Clone)]
pub struct Augmenter {
    image_size: u32,
}

impl Augmenter {
    pub fn new(image_size: u32) -> Self {
        Self { image_size }
    }

    /// Target square resolution
    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Deterministic resize for validation and test samples
    pub fn eval_view(&self, img: DynamicImage) -> DynamicImage {
        img.resize_exact(self.image_size, self.image_size, FilterType::Triangle)
    }

    /// Random resized crop plus random horizontal flip for training samples
    pub fn train_view(&self, img: DynamicImage, rng: &mut ChaCha8Rng) -> DynamicImage {
        let img = self.random_resized_crop(img, rng);
        if rng.gen_bool(0.5) {
            img.fliph()
        } else {
            img
        }
    }

    fn random_resized_crop(&self, img: DynamicImage, rng: &mut ChaCha8Rng) -> DynamicImage {
        let (width, height) = img.dimensions();
        let shorter = width.min(height).max(1);

        let scale = rng.gen_range(MIN_CROP_SCALE..=1.0);
        let side = ((shorter as f64 * scale) as u32).max(1);

        let x = rng.gen_range(0..=width.saturating_sub(side));
        let y = rng.gen_range(0..=height.saturating_sub(side));

        img.crop_imm(x, y, side, side).resize_exact(
            self.image_size,
            self.image_size,
            FilterType::Triangle,
        )
    }

    /// Convert an image to CHW float data in the [0, 1] range
    pub fn to_chw(&self, img: &DynamicImage) -> Vec<f32> {
        let rgb = img.to_rgb8();
        let (width, height) = (self.image_size as usize, self.image_size as usize);
        let mut data = vec![0.0f32; 3 * height * width];

        for y in 0..height {
            for x in 0..width {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                data[y * width + x] = pixel[0] as f32 / 255.0;
                data[height * width + y * width + x] = pixel[1] as f32 / 255.0;
                data[2 * height * width + y * width + x] = pixel[2] as f32 / 255.0;
            }
        }

        data
    }
}

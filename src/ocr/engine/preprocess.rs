use anyhow::{anyhow, Result};
use image::{DynamicImage, GenericImageView, GrayImage};

use super::scan::Region;

pub(super) fn crop_region(image: &DynamicImage, region: &Region) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    if region.width() == 0 || region.height() == 0 {
        return Err(anyhow!("empty crop {:?}", region));
    }
    if region.x2 > width || region.y2 > height {
        return Err(anyhow!(
            "crop {:?} exceeds image bounds {}x{}",
            region,
            width,
            height
        ));
    }
    Ok(image.crop_imm(region.x1, region.y1, region.width(), region.height()))
}

/// Flattens transparency onto white and converts to a contrast-stretched
/// grayscale image; overlay text is usually light-on-dark or dark-on-light
/// with little else in between.
pub(super) fn prepare_for_ocr(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let flatten = |c: u8| c as f32 * alpha + 255.0 * (1.0 - alpha);
        let value = (0.299 * flatten(r) + 0.587 * flatten(g) + 0.114 * flatten(b)).round() as u8;
        luma.put_pixel(x, y, image::Luma([value]));
    }

    contrast_stretch(luma)
}

fn contrast_stretch(mut image: GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return image;
    }
    let scale = 255.0 / (max as f32 - min as f32);
    for pixel in image.pixels_mut() {
        pixel[0] = (pixel[0].saturating_sub(min) as f32 * scale).round() as u8;
    }
    image
}

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub const FRAME_WIDTH: u32 = 400;
pub const FRAME_HEIGHT: u32 = 300;

/// Where [`tag_frame`] puts its tag (x, y, width, height)
pub const TAG: (u32, u32, u32, u32) = (100, 100, 150, 60);

const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);
const PAPER: Rgb<u8> = Rgb([240, 240, 240]);
const INK: Rgb<u8> = Rgb([20, 20, 20]);

pub fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, color);
        }
    }
}

/// Light tag with three printed strokes at `(x, y)`.
/// The strokes cover about 17% of the tag.
pub fn draw_tag(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
    fill_rect(img, x, y, w, h, PAPER);
    let stroke_w = w * 14 / 150;
    let stroke_h = h * 36 / 60;
    let top = y + (h - stroke_h) / 2;
    for offset in [30, 68, 106] {
        fill_rect(img, x + w * offset / 150, top, stroke_w, stroke_h, INK);
    }
}

/// Dark 400x300 frame holding one well-formed tag at [`TAG`]
pub fn tag_frame() -> DynamicImage {
    let mut img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND);
    let (x, y, w, h) = TAG;
    draw_tag(&mut img, x, y, w, h);
    DynamicImage::ImageRgb8(img)
}

/// Dark frame with nothing in it
pub fn blank_frame() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND))
}

/// Dark frame with a bright region of the given size and no print on it
pub fn plain_patch_frame(w: u32, h: u32) -> DynamicImage {
    let mut img = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND);
    fill_rect(&mut img, 50, 50, w, h, PAPER);
    DynamicImage::ImageRgb8(img)
}

pub fn encode_png(frame: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test frame");
    bytes
}

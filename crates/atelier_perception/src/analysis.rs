use crate::{ImageError, ImagePayload};
use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Side length of the downsampled analysis grid.
pub const GRID_SIZE: u32 = 100;

/// Distinct quantised colors below which variety is `Low` / `Medium`.
const VARIETY_LOW_MAX: usize = 24;
const VARIETY_MEDIUM_MAX: usize = 96;
/// Mean per-pixel R+G+B below which brightness is `Dark` / `Medium`.
const BRIGHTNESS_DARK_MAX: u32 = 255;
const BRIGHTNESS_MEDIUM_MAX: u32 = 510;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn channel_sum(&self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }

    fn quantized(&self) -> (u8, u8, u8) {
        (self.r >> 5, self.g >> 5, self.b >> 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Undertone {
    Warm,
    Cool,
    Neutral,
}

impl Undertone {
    /// Red strictly dominant is warm, blue strictly dominant is cool.
    pub fn from_rgb(rgb: Rgb) -> Self {
        if rgb.r > rgb.g && rgb.r > rgb.b {
            Self::Warm
        } else if rgb.b > rgb.r && rgb.b > rgb.g {
            Self::Cool
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warm => "warm",
            Self::Cool => "cool",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorVariety {
    Low,
    Medium,
    High,
}

impl ColorVariety {
    pub fn from_distinct(count: usize) -> Self {
        if count < VARIETY_LOW_MAX {
            Self::Low
        } else if count < VARIETY_MEDIUM_MAX {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Brightness {
    Dark,
    Medium,
    Bright,
}

impl Brightness {
    pub fn from_mean_sum(mean: u32) -> Self {
        if mean < BRIGHTNESS_DARK_MAX {
            Self::Dark
        } else if mean < BRIGHTNESS_MEDIUM_MAX {
            Self::Medium
        } else {
            Self::Bright
        }
    }
}

/// A small fixed-resolution RGB sampling of a photo.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl PixelGrid {
    pub fn from_image(image: &DynamicImage) -> Self {
        let resized = image
            .resize_exact(GRID_SIZE, GRID_SIZE, FilterType::Triangle)
            .to_rgb8();
        let pixels = resized
            .pixels()
            .map(|p| Rgb::new(p.0[0], p.0[1], p.0[2]))
            .collect();
        Self {
            width: GRID_SIZE,
            height: GRID_SIZE,
            pixels,
        }
    }

    /// Build a grid from already-sampled pixels (row-major).
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Componentwise integer mean.
    pub fn average_rgb(&self) -> Rgb {
        if self.pixels.is_empty() {
            return Rgb::new(0, 0, 0);
        }
        let n = self.pixels.len() as u64;
        let (r, g, b) = self.pixels.iter().fold((0u64, 0u64, 0u64), |(r, g, b), p| {
            (r + p.r as u64, g + p.g as u64, b + p.b as u64)
        });
        Rgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
    }

    /// Most frequent exact color; ties go to the color seen first.
    pub fn dominant_color(&self) -> Rgb {
        let mut counts: HashMap<Rgb, (usize, usize)> = HashMap::new();
        for (idx, p) in self.pixels.iter().enumerate() {
            counts.entry(*p).or_insert((0, idx)).0 += 1;
        }
        counts
            .into_iter()
            .max_by(|(_, (ca, ia)), (_, (cb, ib))| ca.cmp(cb).then(ib.cmp(ia)))
            .map(|(rgb, _)| rgb)
            .unwrap_or(Rgb::new(0, 0, 0))
    }

    /// Distinct colors after quantising each channel to 3 bits.
    pub fn distinct_colors(&self) -> usize {
        self.pixels
            .iter()
            .map(Rgb::quantized)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Mean of R+G+B per pixel, in `0..=765`.
    pub fn mean_channel_sum(&self) -> u32 {
        if self.pixels.is_empty() {
            return 0;
        }
        let total: u64 = self.pixels.iter().map(|p| p.channel_sum() as u64).sum();
        (total / self.pixels.len() as u64) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkinToneAnalysis {
    pub average_rgb: Rgb,
    pub undertone: Undertone,
}

impl SkinToneAnalysis {
    pub fn from_grid(grid: &PixelGrid) -> Self {
        let average_rgb = grid.average_rgb();
        Self {
            average_rgb,
            undertone: Undertone::from_rgb(average_rgb),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WardrobeAnalysis {
    pub color_variety: ColorVariety,
    pub brightness: Brightness,
    pub distinct_colors: usize,
    pub mean_brightness: u32,
}

impl WardrobeAnalysis {
    pub fn from_grid(grid: &PixelGrid) -> Self {
        let distinct_colors = grid.distinct_colors();
        let mean_brightness = grid.mean_channel_sum();
        Self {
            color_variety: ColorVariety::from_distinct(distinct_colors),
            brightness: Brightness::from_mean_sum(mean_brightness),
            distinct_colors,
            mean_brightness,
        }
    }
}

pub fn analyze_skin_tone(payload: &ImagePayload) -> Result<SkinToneAnalysis, ImageError> {
    let grid = payload.decode_grid()?;
    Ok(SkinToneAnalysis::from_grid(&grid))
}

pub fn analyze_wardrobe(payload: &ImagePayload) -> Result<WardrobeAnalysis, ImageError> {
    let grid = payload.decode_grid()?;
    Ok(WardrobeAnalysis::from_grid(&grid))
}

use crate::error::RenderError;
use crate::icon_gen::{IconReport, IconSpec};
use std::path::PathBuf;
use std::str::FromStr;

#[cfg(feature = "render")]
pub use raster::RasterRenderer;

/// Produces one icon file for a spec.
///
/// Exactly one implementation is chosen per run, see [`crate::icon_gen::Capability`].
pub trait IconRenderer {
    /// Short label used in logs and reports.
    fn name(&self) -> &'static str;

    /// Whether a failed icon should be recorded and the batch continue.
    /// When false the first failure aborts the batch.
    fn continues_on_error(&self) -> bool {
        false
    }

    fn render(&self, spec: &IconSpec) -> Result<IconReport, RenderError>;
}

/// Colours of the generated icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: [u8; 3],
    pub panel: [u8; 3],
    pub foreground: [u8; 3],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: [0x66, 0x7e, 0xea],
            panel: [0x76, 0x4b, 0xa2],
            foreground: [0xff, 0xff, 0xff],
        }
    }
}

/// Parse a CSS colour, falling back to `default` if it can't be parsed.
pub fn parse_color(color: &str, default: [u8; 3]) -> [u8; 3] {
    css_color::Srgb::from_str(color)
        .map(|color| {
            [
                (color.red * 255.) as u8,
                (color.green * 255.) as u8,
                (color.blue * 255.) as u8,
            ]
        })
        .unwrap_or(default)
}

/// Where the glyph font is looked up, in order: `preferred`, `fallbacks`,
/// then the installed system fonts if `system_fonts` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontChain {
    pub preferred: Option<PathBuf>,
    pub fallbacks: Vec<PathBuf>,
    pub system_fonts: bool,
}

impl FontChain {
    /// A chain with no fonts at all. The glyph can never be drawn.
    pub fn empty() -> Self {
        Self {
            preferred: None,
            fallbacks: Vec::new(),
            system_fonts: false,
        }
    }

    pub fn with_preferred(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferred = Some(path.into());
        self
    }

    pub fn candidates(&self) -> impl Iterator<Item = &PathBuf> {
        self.preferred.iter().chain(self.fallbacks.iter())
    }
}

impl Default for FontChain {
    fn default() -> Self {
        Self {
            preferred: None,
            fallbacks: Vec::new(),
            system_fonts: true,
        }
    }
}

#[cfg(feature = "render")]
mod raster {
    use super::{FontChain, IconRenderer, Palette};
    use crate::error::RenderError;
    use crate::icon_gen::{IconKind, IconReport, IconSpec};
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use rusttype::{point, Font, Scale};
    use std::{
        cell::OnceCell,
        fs::{self, File},
        io::{BufWriter, Write},
        path::Path,
    };
    use thiserror::Error;
    use tracing::{debug, info};

    /// Reasons the glyph could not be drawn. Never leaves this module: every
    /// variant downgrades the icon to the circle mark.
    #[derive(Debug, Clone, Error)]
    pub(crate) enum GlyphError {
        #[error("no usable font")]
        NoFont,
        #[error("cannot read font: {0}")]
        Unreadable(String),
        #[error("not a usable font file")]
        Malformed,
        #[error("font has no glyph for {0:?}")]
        MissingGlyph(char),
        #[error("text has no visible outline")]
        NoOutline,
    }

    /// Draws real PNG icons with `image` and `rusttype`.
    ///
    /// The font is resolved on the first icon and reused for the rest of the run.
    pub struct RasterRenderer {
        palette: Palette,
        glyph: String,
        chain: FontChain,
        font: OnceCell<Result<Font<'static>, GlyphError>>,
    }

    impl RasterRenderer {
        pub fn new(palette: Palette, glyph: impl Into<String>, chain: &FontChain) -> Self {
            Self {
                palette,
                glyph: glyph.into(),
                chain: chain.clone(),
                font: OnceCell::new(),
            }
        }

        fn font(&self) -> Result<&Font<'static>, GlyphError> {
            self.font
                .get_or_init(|| resolve_font(&self.chain, &self.glyph))
                .as_ref()
                .map_err(Clone::clone)
        }

        fn draw_glyph(&self, canvas: &mut RgbImage) -> Result<(), GlyphError> {
            let font = self.font()?;
            draw_text(canvas, font, &self.glyph, Rgb(self.palette.foreground))
        }
    }

    impl IconRenderer for RasterRenderer {
        fn name(&self) -> &'static str {
            "raster"
        }

        fn render(&self, spec: &IconSpec) -> Result<IconReport, RenderError> {
            let size = spec.size();
            let path = spec.output_path();

            let mut canvas = RgbImage::from_pixel(size, size, Rgb(self.palette.background));

            let margin = size / 8;
            fill_rounded_rect(
                &mut canvas,
                (margin, margin),
                (size - margin, size - margin),
                size / 6,
                Rgb(self.palette.panel),
            );

            let glyph_drawn = match self.draw_glyph(&mut canvas) {
                Ok(()) => true,
                Err(err) => {
                    debug!("{size}x{size}: {err}, drawing circle instead");
                    fill_circle(
                        &mut canvas,
                        (size / 2, size / 2),
                        size / 4,
                        Rgb(self.palette.foreground),
                    );
                    false
                }
            };

            write_png(canvas, path)?;
            let bytes_written = fs::metadata(path)
                .map_err(|err| RenderError::io(path, err))?
                .len();

            info!("Created {} ({size}x{size})", path.display());

            Ok(IconReport {
                size,
                path: path.to_path_buf(),
                bytes_written,
                kind: IconKind::Rendered { glyph_drawn },
            })
        }
    }

    /// First font of the chain that has every character of `text`.
    pub(crate) fn resolve_font(
        chain: &FontChain,
        text: &str,
    ) -> Result<Font<'static>, GlyphError> {
        let mut last_err = GlyphError::NoFont;

        for path in chain.candidates() {
            match load_font(path).and_then(|font| check_coverage(&font, text).map(|()| font)) {
                Ok(font) => {
                    debug!("Using font {}", path.display());
                    return Ok(font);
                }
                Err(err) => {
                    debug!("Skipping font {}: {err}", path.display());
                    last_err = err;
                }
            }
        }

        if chain.system_fonts {
            if let Some(font) = system_font(text) {
                return Ok(font);
            }
        }

        Err(last_err)
    }

    fn load_font(path: &Path) -> Result<Font<'static>, GlyphError> {
        let data = fs::read(path).map_err(|err| GlyphError::Unreadable(err.to_string()))?;
        Font::try_from_vec(data).ok_or(GlyphError::Malformed)
    }

    fn check_coverage(font: &Font<'_>, text: &str) -> Result<(), GlyphError> {
        match text.chars().find(|&c| font.glyph(c).id().0 == 0) {
            Some(c) => Err(GlyphError::MissingGlyph(c)),
            None => Ok(()),
        }
    }

    /// Search the installed fonts for a face covering `text`. Only the matching
    /// face is copied out of the font file.
    fn system_font(text: &str) -> Option<Font<'static>> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        for face in db.faces() {
            let found = db
                .with_face_data(face.id, |data, index| {
                    let parsed = ttf_parser::Face::parse(data, index).ok()?;
                    text.chars()
                        .all(|c| parsed.glyph_index(c).is_some())
                        .then(|| (data.to_vec(), index))
                })
                .flatten();

            if let Some((data, index)) = found {
                if let Some(font) = Font::try_from_vec_and_index(data, index) {
                    debug!("Using system font {}", face.post_script_name);
                    return Some(font);
                }
            }
        }

        debug!("No system font covers {text:?}");
        None
    }

    fn write_png(canvas: RgbImage, path: &Path) -> Result<(), RenderError> {
        let file = File::create(path).map_err(|err| RenderError::io(path, err))?;
        let mut out = BufWriter::new(file);
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut out, ImageOutputFormat::Png)
            .map_err(|source| RenderError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        out.flush().map_err(|err| RenderError::io(path, err))
    }

    /// Fill the inclusive box `from..=to` with rounded corners of `radius`.
    pub(crate) fn fill_rounded_rect(
        canvas: &mut RgbImage,
        from: (u32, u32),
        to: (u32, u32),
        radius: u32,
        color: Rgb<u8>,
    ) {
        let (x0, y0) = (from.0 as i64, from.1 as i64);
        let (x1, y1) = (to.0 as i64, to.1 as i64);
        let r = (radius as i64).min((x1 - x0) / 2).min((y1 - y0) / 2).max(0);

        let x_end = x1.min(canvas.width() as i64 - 1);
        let y_end = y1.min(canvas.height() as i64 - 1);

        for y in y0..=y_end {
            for x in x0..=x_end {
                // Distance to the nearest point of the inner (unrounded) box
                let cx = x.clamp(x0 + r, x1 - r);
                let cy = y.clamp(y0 + r, y1 - r);
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= r * r {
                    canvas.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    pub(crate) fn fill_circle(
        canvas: &mut RgbImage,
        center: (u32, u32),
        radius: u32,
        color: Rgb<u8>,
    ) {
        let (cx, cy) = (center.0 as i64, center.1 as i64);
        let r = radius as i64;

        for y in (cy - r).max(0)..=(cy + r).min(canvas.height() as i64 - 1) {
            for x in (cx - r).max(0)..=(cx + r).min(canvas.width() as i64 - 1) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= r * r {
                    canvas.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    /// Draw `text` at half the canvas height, centred, nudged up by a quarter
    /// of its own height.
    fn draw_text(
        canvas: &mut RgbImage,
        font: &Font<'_>,
        text: &str,
        color: Rgb<u8>,
    ) -> Result<(), GlyphError> {
        check_coverage(font, text)?;
        if canvas.width() < 2 {
            return Err(GlyphError::NoOutline);
        }

        let size = canvas.width() as i32;
        let height = canvas.height() as i32;
        let scale = Scale::uniform((canvas.width() / 2) as f32);
        let ascent = font.v_metrics(scale).ascent;
        let glyphs: Vec<_> = font.layout(text, scale, point(0.0, ascent)).collect();

        let (min, max) = glyphs
            .iter()
            .filter_map(|g| g.pixel_bounding_box())
            .filter(|bb| bb.width() > 0 && bb.height() > 0)
            .fold(None, |acc: Option<((i32, i32), (i32, i32))>, bb| {
                Some(match acc {
                    None => ((bb.min.x, bb.min.y), (bb.max.x, bb.max.y)),
                    Some((min, max)) => (
                        (min.0.min(bb.min.x), min.1.min(bb.min.y)),
                        (max.0.max(bb.max.x), max.1.max(bb.max.y)),
                    ),
                })
            })
            .ok_or(GlyphError::NoOutline)?;

        let (w, h) = (max.0 - min.0, max.1 - min.1);
        let left = (size - w) / 2;
        let top = (size - h) / 2 - h / 4;
        let (dx, dy) = (left - min.0, top - min.1);

        for glyph in &glyphs {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            if bb.width() <= 0 || bb.height() <= 0 {
                continue;
            }
            glyph.draw(|gx, gy, coverage| {
                let x = bb.min.x + gx as i32 + dx;
                let y = bb.min.y + gy as i32 + dy;
                if x < 0 || y < 0 || x >= size || y >= height {
                    return;
                }
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                for channel in 0..3 {
                    let under = pixel[channel] as f32;
                    let over = color[channel] as f32;
                    pixel[channel] = (under + (over - under) * coverage).round() as u8;
                }
            });
        }

        Ok(())
    }

}

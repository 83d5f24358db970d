use std::sync::Arc;

use current_market_core::config::OgConfig;
use image::RgbaImage;
use resvg::{tiny_skia, usvg};

use crate::{OutputFormat, RenderError, encode_image};

/// Rasterizes SVG documents against a font database loaded once at startup.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

/// Family of the faces compiled into the binary, used when the configured one is missing.
pub const BUNDLED_FAMILY: &str = "DejaVu Sans";

const BUNDLED_FONTS: [&[u8]; 2] =
    [include_bytes!("../fonts/DejaVuSans.ttf"), include_bytes!("../fonts/DejaVuSans-Bold.ttf")];

impl Rasterizer {
    pub fn load(config: &OgConfig) -> Result<Self, RenderError> {
        let mut db = usvg::fontdb::Database::new();
        for data in BUNDLED_FONTS {
            db.load_font_data(data.to_vec());
        }
        if db.is_empty() {
            return Err(RenderError::Fonts("bundled fonts failed to load".to_string()));
        }
        if config.system_fonts {
            let before = db.len();
            db.load_system_fonts();
            tracing::info!("Loaded {} system font faces", db.len() - before);
        }
        if let Some(dir) = &config.fonts_dir {
            if !dir.is_dir() {
                return Err(RenderError::Fonts(format!("{} is not a directory", dir.display())));
            }
            let before = db.len();
            db.load_fonts_dir(dir);
            let loaded = db.len() - before;
            if loaded == 0 {
                return Err(RenderError::Fonts(format!("no font faces in {}", dir.display())));
            }
            tracing::info!("Loaded {} font faces from {}", loaded, dir.display());
        }

        let family = config.font_family.as_str();
        let has_family = db.faces().any(|face| {
            face.families.iter().any(|(name, _)| name.eq_ignore_ascii_case(family))
        });
        if has_family {
            db.set_sans_serif_family(family);
        } else {
            tracing::warn!("Font family {family} not found, falling back to {BUNDLED_FAMILY}");
            db.set_sans_serif_family(BUNDLED_FAMILY);
        }
        Ok(Self { fontdb: Arc::new(db) })
    }

    pub fn face_count(&self) -> usize { self.fontdb.len() }

    /// Render `svg` into `format`. Bytes are only returned once encoding has completed.
    pub fn render(&self, svg: &str, format: OutputFormat) -> Result<Vec<u8>, RenderError> {
        if format == OutputFormat::Svg {
            return Ok(svg.as_bytes().to_vec());
        }
        let image = self.rasterize(svg)?;
        encode_image(&image, format)
    }

    pub fn rasterize(&self, svg: &str) -> Result<RgbaImage, RenderError> {
        let options = usvg::Options { fontdb: self.fontdb.clone(), ..Default::default() };
        let tree = usvg::Tree::from_str(svg, &options)?;
        let size = tree.size().to_int_size();
        let (width, height) = (size.width(), size.height());
        let mut pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or(RenderError::Canvas(width, height))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        let mut data = Vec::with_capacity(pixmap.data().len());
        for pixel in pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(width, height, data).ok_or(RenderError::Canvas(width, height))
    }
}

#[cfg(test)]
mod tests {
    use current_market_core::config::OgConfig;

    use super::Rasterizer;
    use crate::RenderError;

    fn config() -> OgConfig { OgConfig { system_fonts: false, ..Default::default() } }

    #[test]
    fn test_rasterize_size() {
        let rasterizer = Rasterizer::load(&config()).unwrap();
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="#7B4AE2"/></svg>"##;
        let image = rasterizer.rasterize(svg).unwrap();
        assert_eq!(image.dimensions(), (40, 20));
        assert_eq!(image.get_pixel(10, 10).0, [0x7B, 0x4A, 0xE2, 0xFF]);
    }

    #[test]
    fn test_invalid_svg() {
        let rasterizer = Rasterizer::load(&config()).unwrap();
        assert!(matches!(rasterizer.rasterize("<svg"), Err(RenderError::Svg(_))));
    }

    #[test]
    fn test_bundled_fonts_draw_text() {
        let rasterizer = Rasterizer::load(&config()).unwrap();
        assert_eq!(rasterizer.face_count(), 2);
        let svg = |text: &str| {
            format!(
                r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="40"><rect width="200" height="40" fill="#000"/><text x="4" y="30" font-family="sans-serif" font-size="24" fill="#fff">{text}</text></svg>"##
            )
        };
        let image = rasterizer.rasterize(&svg("Alpha")).unwrap();
        assert!(image.pixels().any(|p| p.0[0] > 0x80), "no glyphs drawn");
        let other = rasterizer.rasterize(&svg("Bravo")).unwrap();
        assert_ne!(image, other);
    }

    #[test]
    fn test_fonts_dir() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fonts");
        let config =
            OgConfig { fonts_dir: Some(dir), font_family: "DejaVu Sans".into(), ..config() };
        let rasterizer = Rasterizer::load(&config).unwrap();
        assert_eq!(rasterizer.face_count(), 4);
    }

    #[test]
    fn test_missing_fonts_dir() {
        let config = OgConfig { fonts_dir: Some("does-not-exist".into()), ..config() };
        assert!(matches!(Rasterizer::load(&config), Err(RenderError::Fonts(_))));
    }

    #[test]
    fn test_empty_fonts_dir() {
        let dir = std::env::temp_dir().join("current-market-empty-fonts");
        std::fs::create_dir_all(&dir).unwrap();
        let config = OgConfig { fonts_dir: Some(dir), ..config() };
        assert!(matches!(Rasterizer::load(&config), Err(RenderError::Fonts(_))));
    }
}

use current_market_core::config::{DEFAULT_TITLE, OgConfig};

use crate::{
    OutputFormat, RenderError,
    svg::Rasterizer,
    template::{OgTemplate, TEMPLATE_VERSION},
};

/// A normalized title for the template slot. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title(String);

impl Title {
    pub fn resolve(raw: Option<&str>, config: &OgConfig) -> Self {
        let normalized = raw.map(|raw| normalize(raw, config.max_title_chars)).unwrap_or_default();
        if !normalized.is_empty() {
            return Self(normalized);
        }
        let default = normalize(&config.default_title, usize::MAX);
        if default.is_empty() { Self(DEFAULT_TITLE.to_string()) } else { Self(default) }
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

/// Characters XML cannot carry are dropped to whitespace; runs of whitespace collapse.
fn normalize(raw: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut count = 0;
    let mut pending_space = false;
    for c in raw.chars() {
        if count >= max_chars {
            break;
        }
        if c.is_whitespace() || c.is_control() || is_noncharacter(c) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            count += 1;
            pending_space = false;
            if count >= max_chars {
                break;
            }
        }
        out.push(c);
        count += 1;
    }
    out.truncate(out.trim_end().len());
    out
}

fn is_noncharacter(c: char) -> bool {
    let c = c as u32;
    (0xFDD0..=0xFDEF).contains(&c) || c & 0xFFFE == 0xFFFE
}

pub struct RenderedImage {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    pub etag: String,
}

/// Renders the Open Graph card. Immutable after construction and shared across requests.
pub struct OgRenderer {
    config: OgConfig,
    template: OgTemplate,
    rasterizer: Rasterizer,
}

impl OgRenderer {
    pub fn new(config: &OgConfig) -> Result<Self, RenderError> {
        let rasterizer = Rasterizer::load(config)?;
        tracing::info!("Image renderer ready with {} font faces", rasterizer.face_count());
        Ok(Self { config: config.clone(), template: OgTemplate::new(config), rasterizer })
    }

    pub fn title(&self, raw: Option<&str>) -> Title { Title::resolve(raw, &self.config) }

    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.config.cache_max_age)
    }

    /// Strong validator derived from everything that affects the output bytes.
    pub fn etag(&self, title: &Title, format: OutputFormat) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&TEMPLATE_VERSION.to_le_bytes());
        hasher.update(self.config.font_family.as_bytes());
        hasher.update(&[0]);
        hasher.update(format.extension().as_bytes());
        hasher.update(&[0]);
        hasher.update(title.as_str().as_bytes());
        let hash = hasher.finalize();
        format!("\"{}\"", &hash.to_hex().as_str()[..32])
    }

    pub fn render(&self, title: &Title, format: OutputFormat) -> Result<RenderedImage, RenderError> {
        let svg = self.template.render_svg(title);
        let bytes = self.rasterizer.render(&svg, format)?;
        tracing::debug!(
            "Rendered {} card: {} title chars, {} bytes",
            format.extension(),
            title.as_str().chars().count(),
            bytes.len()
        );
        Ok(RenderedImage { format, bytes, etag: self.etag(title, format) })
    }
}

#[cfg(test)]
mod tests {
    use current_market_core::config::OgConfig;

    use super::*;
    use crate::template::{HEIGHT, WIDTH};

    fn renderer() -> OgRenderer {
        OgRenderer::new(&OgConfig { system_fonts: false, ..Default::default() }).unwrap()
    }

    #[test]
    fn test_normalize_title() {
        let config = OgConfig::default();
        let cases: &[(Option<&str>, &str)] = &[
            (None, "Current Market"),
            (Some(""), "Current Market"),
            (Some(" \t\n "), "Current Market"),
            (Some("Q3 Launch"), "Q3 Launch"),
            (Some("  Q3 \n\n Launch  "), "Q3 Launch"),
            (Some("Q3\u{0}\u{7}Launch"), "Q3 Launch"),
            (Some("\u{FFFE}\u{FFFF}"), "Current Market"),
            (Some("<script>alert(1)</script>"), "<script>alert(1)</script>"),
        ];
        for &(raw, expected) in cases {
            assert_eq!(Title::resolve(raw, &config).as_str(), expected, "{raw:?}");
        }
    }

    #[test]
    fn test_blank_default_title() {
        for default_title in ["", "  \n "] {
            let config =
                OgConfig { default_title: default_title.to_string(), ..Default::default() };
            assert_eq!(Title::resolve(None, &config).as_str(), DEFAULT_TITLE);
            assert_eq!(Title::resolve(Some(""), &config).as_str(), DEFAULT_TITLE);
            assert_eq!(Title::resolve(Some("Q3"), &config).as_str(), "Q3");
        }
    }

    #[test]
    fn test_title_capped() {
        let config = OgConfig { max_title_chars: 5, ..Default::default() };
        assert_eq!(Title::resolve(Some("abcdefgh"), &config).as_str(), "abcde");
        assert_eq!(Title::resolve(Some("abcd efgh"), &config).as_str(), "abcd");
        assert_eq!(Title::resolve(Some("ééééééé"), &config).as_str(), "ééééé");
    }

    #[test]
    fn test_etag() {
        let og = renderer();
        let title = og.title(Some("Q3 Launch"));
        let spaced = og.title(Some(" Q3  Launch"));
        assert_eq!(og.etag(&title, OutputFormat::Png), og.etag(&spaced, OutputFormat::Png));
        assert_ne!(og.etag(&title, OutputFormat::Png), og.etag(&title, OutputFormat::WebP));
        assert_ne!(og.etag(&title, OutputFormat::Png), og.etag(&og.title(None), OutputFormat::Png));
        assert!(og.etag(&title, OutputFormat::Png).starts_with('"'));
    }

    #[test]
    fn test_render_png() {
        let og = renderer();
        for raw in [None, Some("Q3 Launch"), Some("<script>alert(1)</script>")] {
            let rendered = og.render(&og.title(raw), OutputFormat::Png).unwrap();
            let image = image::load_from_memory(&rendered.bytes).unwrap();
            assert_eq!((image.width(), image.height()), (WIDTH, HEIGHT));
        }
        let long = "Overflowing ".repeat(100);
        let rendered = og.render(&og.title(Some(&long)), OutputFormat::Png).unwrap();
        let image = image::load_from_memory(&rendered.bytes).unwrap();
        assert_eq!((image.width(), image.height()), (WIDTH, HEIGHT));
    }

    #[test]
    fn test_render_deterministic() {
        let og = renderer();
        let a = og.render(&og.title(Some("Q3 Launch")), OutputFormat::Png).unwrap();
        let b = og.render(&og.title(Some("Q3 Launch")), OutputFormat::Png).unwrap();
        assert_eq!(a.bytes, b.bytes);
        assert_eq!(a.etag, b.etag);

        let other = og.render(&og.title(Some("Completely different title")), OutputFormat::Png);
        assert_ne!(a.bytes, other.unwrap().bytes);

        let default = og.render(&og.title(None), OutputFormat::Png).unwrap();
        let empty = og.render(&og.title(Some("")), OutputFormat::Png).unwrap();
        let explicit = og.render(&og.title(Some("Current Market")), OutputFormat::Png).unwrap();
        assert_eq!(default.bytes, empty.bytes);
        assert_eq!(default.bytes, explicit.bytes);
        assert_ne!(default.bytes, a.bytes);
    }

    #[test]
    fn test_render_webp_and_svg() {
        let og = renderer();
        let title = og.title(Some("Q3 Launch"));
        let webp = og.render(&title, OutputFormat::WebP).unwrap();
        let image =
            image::load_from_memory_with_format(&webp.bytes, image::ImageFormat::WebP).unwrap();
        assert_eq!((image.width(), image.height()), (WIDTH, HEIGHT));

        let svg = og.render(&title, OutputFormat::Svg).unwrap();
        let svg = String::from_utf8(svg.bytes).unwrap();
        assert!(svg.contains(">Q3 Launch</tspan>"));
    }
}

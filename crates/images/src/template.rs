//! The fixed Open Graph card: a dark canvas with two radial glows, an uppercase kicker,
//! a two part headline (static tagline, gradient title) and a footer caption.
//!
//! Only the title slot varies per request. Everything else is laid out once in
//! [`OgTemplate::new`] and reused.

use current_market_core::config::OgConfig;
use maud::{Markup, PreEscaped, html};
use palette::Srgb;

use crate::{
    og::Title,
    text::{self, TextStyle},
};

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 630;
/// Bump whenever the rendered output changes so that clients drop stale ETags.
pub const TEMPLATE_VERSION: u32 = 1;

const PADDING: f32 = 80.0;
const CONTENT_WIDTH: f32 = WIDTH as f32 - 2.0 * PADDING;

const KICKER: &str = "Current Market — The Brand Intelligence Lab";
const TAGLINE: &str = "Where creativity meets intelligence.";
const FOOTER: &str = "Deurne, NL · currentmarketlab.com";

const CAPTION_SIZE: f32 = 28.0;
const CAPTION_LINE_HEIGHT: f32 = 1.2;
const CAPTION_MAX_LINES: usize = 2;
const KICKER_TRACKING: f32 = 0.32;
const KICKER_OPACITY: f32 = 0.65;
const FOOTER_OPACITY: f32 = 0.7;

/// Headline sizes tried in order until the title fits without truncation.
const HEADLINE_SIZES: [f32; 4] = [92.0, 76.0, 64.0, 56.0];
const HEADLINE_LINE_HEIGHT: f32 = 1.02;
const HEADLINE_GAP: f32 = 24.0;
const TAGLINE_MAX_LINES: usize = 3;

/// Top of the em box to the alphabetic baseline, in ems.
const ASCENT: f32 = 0.8;

const BASE: Srgb<u8> = Srgb::new(0x0B, 0x0A, 0x12);
const INK: Srgb<u8> = Srgb::new(0xF6, 0xF6, 0xF9);
const VIOLET: Srgb<u8> = Srgb::new(0x7B, 0x4A, 0xE2);
const RED: Srgb<u8> = Srgb::new(0xEF, 0x4D, 0x5B);

struct Glow {
    /// Center as a fraction of the canvas.
    cx: f32,
    cy: f32,
    color: Srgb<u8>,
    inner_alpha: f32,
    outer_alpha: f32,
}

// Painted in order, so the topmost layer comes last.
const GLOWS: [Glow; 2] = [
    Glow { cx: 0.8, cy: 0.3, color: RED, inner_alpha: 0.45, outer_alpha: 0.95 },
    Glow { cx: 0.2, cy: 0.2, color: VIOLET, inner_alpha: 0.4, outer_alpha: 0.9 },
];

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub style: TextStyle,
    pub line_height: f32,
    pub x: f32,
    pub y: f32,
}

impl TextBlock {
    fn new(lines: Vec<String>, style: TextStyle, line_height: f32) -> Self {
        Self { lines, style, line_height: line_height * style.font_size, x: PADDING, y: 0.0 }
    }

    fn at(self, y: f32) -> Self { Self { y, ..self } }

    pub fn height(&self) -> f32 { self.lines.len() as f32 * self.line_height }

    pub fn bottom(&self) -> f32 { self.y + self.height() }

    pub fn baseline(&self, line: usize) -> f32 {
        self.y
            + line as f32 * self.line_height
            + (self.line_height - self.style.font_size) / 2.0
            + ASCENT * self.style.font_size
    }
}

/// Precomputed headline metrics for one candidate font size.
#[derive(Debug, Clone)]
struct HeadlineFit {
    style: TextStyle,
    tagline: Vec<String>,
    title_lines: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub kicker: TextBlock,
    pub tagline: TextBlock,
    pub title: TextBlock,
    pub footer: TextBlock,
    pub headline_clip: Rect,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct OgTemplate {
    font_family: String,
    kicker: TextBlock,
    footer: TextBlock,
    fits: [HeadlineFit; HEADLINE_SIZES.len()],
}

impl OgTemplate {
    pub fn new(config: &OgConfig) -> Self {
        let kicker_style = TextStyle::new(CAPTION_SIZE).tracking(KICKER_TRACKING);
        let kicker_lines =
            text::wrap(&KICKER.to_uppercase(), kicker_style, CONTENT_WIDTH, CAPTION_MAX_LINES)
                .lines;
        let kicker = TextBlock::new(kicker_lines, kicker_style, CAPTION_LINE_HEIGHT).at(PADDING);

        let footer_style = TextStyle::new(CAPTION_SIZE);
        let footer_lines =
            text::wrap(FOOTER, footer_style, CONTENT_WIDTH, CAPTION_MAX_LINES).lines;
        let footer = TextBlock::new(footer_lines, footer_style, CAPTION_LINE_HEIGHT);
        let footer_y = HEIGHT as f32 - PADDING - footer.height();
        let footer = footer.at(footer_y);

        let available = footer.y - kicker.bottom();
        let fits = HEADLINE_SIZES.map(|size| {
            let style = TextStyle::new(size).bold();
            let line_height = size * HEADLINE_LINE_HEIGHT;
            let tagline = text::wrap(TAGLINE, style, CONTENT_WIDTH, TAGLINE_MAX_LINES).lines;
            let remaining = available - tagline.len() as f32 * line_height - HEADLINE_GAP;
            let title_lines = ((remaining / line_height).floor() as usize).max(1);
            HeadlineFit { style, tagline, title_lines }
        });

        Self { font_family: config.font_family.replace(['\'', '"'], ""), kicker, footer, fits }
    }

    /// Place every region for `title`. The canvas never grows: a title that does not fit
    /// at any headline size is cut with an ellipsis at the smallest one.
    pub fn layout(&self, title: &Title) -> Layout {
        let wrap_title = |fit: &HeadlineFit| {
            text::wrap(title.as_str(), fit.style, CONTENT_WIDTH, fit.title_lines)
        };
        let [.., smallest] = &self.fits;
        let (fit, wrapped) = self
            .fits
            .iter()
            .map(|fit| (fit, wrap_title(fit)))
            .find(|(_, wrapped)| !wrapped.truncated)
            .unwrap_or_else(|| (smallest, wrap_title(smallest)));

        let tagline = TextBlock::new(fit.tagline.clone(), fit.style, HEADLINE_LINE_HEIGHT);
        let title_block = TextBlock::new(wrapped.lines, fit.style, HEADLINE_LINE_HEIGHT);
        let headline_height = tagline.height() + HEADLINE_GAP + title_block.height();
        let free = self.footer.y - self.kicker.bottom() - headline_height;
        let tagline = tagline.at(self.kicker.bottom() + (free / 2.0).max(0.0));
        let title_block = title_block.at(tagline.bottom() + HEADLINE_GAP);

        Layout {
            headline_clip: Rect {
                x: PADDING,
                y: self.kicker.bottom(),
                width: CONTENT_WIDTH,
                height: self.footer.y - self.kicker.bottom(),
            },
            kicker: self.kicker.clone(),
            tagline,
            title: title_block,
            footer: self.footer.clone(),
            truncated: wrapped.truncated,
        }
    }

    pub fn render_svg(&self, title: &Title) -> String {
        let layout = self.layout(title);
        let clip = layout.headline_clip;
        let ink = html_color(INK);
        html! {
            (PreEscaped("<?xml version=\"1.0\" encoding=\"utf-8\"?>"))
            svg xmlns="http://www.w3.org/2000/svg" version="1.1" viewBox=(format!("0 0 {WIDTH} {HEIGHT}")) width=(WIDTH) height=(HEIGHT)
                font-family=(format!("'{}', sans-serif", self.font_family)) {
                defs {
                    @for (i, glow) in GLOWS.iter().enumerate() {
                        @let cx = glow.cx * WIDTH as f32;
                        @let cy = glow.cy * HEIGHT as f32;
                        radialGradient id=(format!("glow-{i}")) gradientUnits="userSpaceOnUse"
                            cx=(num(cx)) cy=(num(cy)) r=(num(farthest_corner(cx, cy))) {
                            stop offset="0" stop-color=(html_color(glow.color)) stop-opacity=(num(glow.inner_alpha)) {}
                            stop offset="1" stop-color=(html_color(BASE)) stop-opacity=(num(glow.outer_alpha)) {}
                        }
                    }
                    linearGradient id="title-fill" x1="0" y1="0" x2="1" y2="0" {
                        stop offset="0" stop-color=(html_color(VIOLET)) {}
                        stop offset="1" stop-color=(html_color(RED)) {}
                    }
                    clipPath id="headline-clip" {
                        rect x=(num(clip.x)) y=(num(clip.y)) width=(num(clip.width)) height=(num(clip.height)) {}
                    }
                }
                rect width=(WIDTH) height=(HEIGHT) fill=(html_color(BASE)) {}
                @for i in 0..GLOWS.len() {
                    rect width=(WIDTH) height=(HEIGHT) fill=(format!("url(#glow-{i})")) {}
                }
                (text_block("kicker", &layout.kicker, &ink, Some(KICKER_OPACITY)))
                g clip-path="url(#headline-clip)" font-weight="700" {
                    (text_block("tagline", &layout.tagline, &ink, None))
                    (text_block("title", &layout.title, "url(#title-fill)", None))
                }
                (text_block("footer", &layout.footer, &ink, Some(FOOTER_OPACITY)))
            }
        }
        .into_string()
    }
}

fn text_block(id: &str, block: &TextBlock, fill: &str, opacity: Option<f32>) -> Markup {
    html! {
        text id=(id) x=(num(block.x)) font-size=(num(block.style.font_size))
            letter-spacing=(num(block.style.letter_spacing)) fill=(fill) fill-opacity=[opacity.map(num)] {
            @for (i, line) in block.lines.iter().enumerate() {
                tspan x=(num(block.x)) y=(num(block.baseline(i))) { (line) }
            }
        }
    }
}

/// CSS `circle farthest-corner` radius for a gradient centered at (cx, cy).
fn farthest_corner(cx: f32, cy: f32) -> f32 {
    cx.max(WIDTH as f32 - cx).hypot(cy.max(HEIGHT as f32 - cy))
}

fn num(value: f32) -> String { format!("{value:.2}") }

pub fn html_color(c: Srgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", c.red, c.green, c.blue)
}

//! Document fonts and text measurement.
//!
//! Documents embed a TrueType font: the bundled DejaVu Sans unless another
//! file is configured. The PDF standard Helvetica (WinAnsi only, nothing
//! embedded) is available on request.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use ttf_parser::{Face, GlyphId};

use crate::error::{ConvertError, Result};

/// Width measurement for a font, in text-space units of 1/1000 em.
pub trait FontMetrics {
    /// Advance width of `c`, or `None` if the font cannot render it.
    fn char_width(&self, c: char) -> Option<f32>;

    /// Width used for characters the font cannot render.
    fn missing_width(&self) -> f32 {
        500.0
    }

    /// Whether `c` can be rendered.
    fn supports(&self, c: char) -> bool {
        self.char_width(c).is_some()
    }

    /// Width of `text` at `size` points.
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: f32 = text
            .chars()
            .map(|c| self.char_width(c).unwrap_or_else(|| self.missing_width()))
            .sum();
        units * size / 1000.0
    }
}

/// DejaVu Sans, compiled into the binary.
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Where the document font comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FontSource {
    /// The bundled DejaVu Sans, embedded into every document.
    #[default]
    Bundled,
    /// PDF standard Helvetica with WinAnsi encoding. Nothing is embedded.
    Helvetica,
    /// A TrueType (`.ttf`) file.
    File(PathBuf),
}

impl FontSource {
    /// Pick the source from the configured options: an explicit file wins,
    /// then the Helvetica opt-in, then the bundled font.
    pub fn from_options(path: Option<&Path>, helvetica: bool) -> Self {
        match path {
            Some(p) => Self::File(p.to_path_buf()),
            None if helvetica => Self::Helvetica,
            None => Self::Bundled,
        }
    }

    /// Load the font. Only [`FontSource::File`] can fail in practice.
    pub fn load(&self) -> Result<DocumentFont> {
        match self {
            Self::Bundled => {
                TrueTypeFont::from_bytes("DejaVuSans", BUNDLED_FONT).map(DocumentFont::TrueType)
            }
            Self::Helvetica => Ok(DocumentFont::Builtin(Helvetica)),
            Self::File(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    ConvertError::Font(format!("cannot read '{}': {e}", path.display()))
                })?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "EmbeddedFont".to_string());
                TrueTypeFont::from_bytes(&name, data).map(DocumentFont::TrueType)
            }
        }
    }
}

/// The single font used by one document.
#[derive(Debug, Clone)]
pub enum DocumentFont {
    Builtin(Helvetica),
    TrueType(TrueTypeFont),
}

impl DocumentFont {
    /// Encode `text` as a PDF string operand for this font.
    ///
    /// Characters the font cannot render are skipped; callers replace such
    /// lines before they get here.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Self::Builtin(_) => text.chars().filter_map(winansi_byte).collect(),
            Self::TrueType(font) => text
                .chars()
                .filter_map(|c| font.glyph_id(c))
                .flat_map(u16::to_be_bytes)
                .collect(),
        }
    }
}

impl FontMetrics for DocumentFont {
    fn char_width(&self, c: char) -> Option<f32> {
        match self {
            Self::Builtin(font) => font.char_width(c),
            Self::TrueType(font) => font.char_width(c),
        }
    }

    fn missing_width(&self) -> f32 {
        match self {
            Self::Builtin(font) => font.missing_width(),
            Self::TrueType(font) => font.missing_width(),
        }
    }
}

// ── Helvetica ───────────────────────────────────────────────────

/// Helvetica advance widths (AFM) for WinAnsi codes 0x20..=0xFF.
/// A zero marks an undefined code.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 224] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,  // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,  // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,  // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,  // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,  // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,  // 0x70
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,  // 0x80
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,  // 0x90
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,  // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,  // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,  // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,  // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,  // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,  // 0xF0
];

/// Built-in Helvetica. Renders the Windows-1252 repertoire.
#[derive(Debug, Clone, Copy, Default)]
pub struct Helvetica;

impl FontMetrics for Helvetica {
    fn char_width(&self, c: char) -> Option<f32> {
        let byte = winansi_byte(c)?;
        match HELVETICA_WIDTHS[usize::from(byte) - 0x20] {
            0 => None,
            w => Some(f32::from(w)),
        }
    }

    fn missing_width(&self) -> f32 {
        556.0
    }
}

/// Map a character to its WinAnsi (Windows-1252) code, if it has one.
fn winansi_byte(c: char) -> Option<u8> {
    if c.is_control() {
        return None;
    }
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
    match (had_errors, bytes.as_ref()) {
        (false, &[b]) if b >= 0x20 => Some(b),
        _ => None,
    }
}

// ── TrueType ────────────────────────────────────────────────────

/// A TrueType font read from disk, with the metrics needed for layout and
/// embedding.
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    name: String,
    data: Cow<'static, [u8]>,
    units_per_em: f32,
    glyphs: HashMap<char, u16>,
    advances: Vec<u16>,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
}

impl TrueTypeFont {
    /// Parse font bytes. `name` becomes the PDF base font name.
    pub fn from_bytes(name: &str, data: impl Into<Cow<'static, [u8]>>) -> Result<Self> {
        let data = data.into();
        let face = Face::parse(&data, 0)
            .map_err(|e| ConvertError::Font(format!("cannot parse '{name}': {e}")))?;

        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let (Some(c), Some(gid)) = (char::from_u32(cp), subtable.glyph_index(cp)) {
                        if gid.0 != 0 {
                            glyphs.entry(c).or_insert(gid.0);
                        }
                    }
                });
            }
        }
        if glyphs.is_empty() {
            return Err(ConvertError::Font(format!(
                "'{name}' has no Unicode character map"
            )));
        }

        let advances = (0..face.number_of_glyphs())
            .map(|g| face.glyph_hor_advance(GlyphId(g)).unwrap_or(0))
            .collect();
        let bb = face.global_bounding_box();
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);
        let units_per_em = f32::from(face.units_per_em().max(1));
        drop(face);

        let font = Self {
            name: sanitize_font_name(name),
            data,
            units_per_em,
            glyphs,
            advances,
            ascender,
            descender,
            cap_height,
            bbox: [bb.x_min, bb.y_min, bb.x_max, bb.y_max],
        };
        debug!(
            name = %font.name,
            glyphs = font.advances.len(),
            mapped = font.glyphs.len(),
            "Loaded TrueType font"
        );
        Ok(font)
    }

    /// Glyph id for `c`, if the font maps it.
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.glyphs.get(&c).copied()
    }

    /// PDF base font name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw font file bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Advance widths of every glyph, in 1/1000 em, indexed by glyph id.
    pub fn glyph_widths(&self) -> impl Iterator<Item = f32> + '_ {
        self.advances.iter().map(|&a| self.to_pdf_units(a))
    }

    /// `(glyph id, character)` pairs for the ToUnicode map.
    pub fn glyph_chars(&self) -> impl Iterator<Item = (u16, char)> + '_ {
        self.glyphs.iter().map(|(&c, &g)| (g, c))
    }

    /// Font descriptor metrics in 1/1000 em: ascent, descent, cap height, bbox.
    pub fn descriptor_metrics(&self) -> (f32, f32, f32, [f32; 4]) {
        let scale = |v: i16| f32::from(v) * 1000.0 / self.units_per_em;
        (
            scale(self.ascender),
            scale(self.descender),
            scale(self.cap_height),
            self.bbox.map(scale),
        )
    }

    fn to_pdf_units(&self, advance: u16) -> f32 {
        f32::from(advance) * 1000.0 / self.units_per_em
    }
}

impl FontMetrics for TrueTypeFont {
    fn char_width(&self, c: char) -> Option<f32> {
        let gid = self.glyph_id(c)?;
        let advance = self.advances.get(usize::from(gid)).copied().unwrap_or(0);
        Some(self.to_pdf_units(advance))
    }
}

/// Keep only characters allowed in a PDF name without escaping.
fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

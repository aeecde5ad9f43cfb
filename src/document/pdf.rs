//! PDF serialization of laid-out pages.
//!
//! Object layout: catalog, page tree, document info, one font (shared by all
//! pages), then a page object and a Flate-compressed content stream per
//! page. An embedded TrueType font adds a CID font, its descriptor, the font
//! file and a ToUnicode map.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::config::LayoutConfig;
use crate::error::{ConvertError, Result};
use crate::layout::font::{DocumentFont, TrueTypeFont};
use crate::layout::paginate::Page;

/// Resource name of the document font on every page.
const FONT_NAME: Name<'static> = Name(b"F1");

const PRODUCER: &str = concat!("emlpdf ", env!("CARGO_PKG_VERSION"));

/// Serialize `pages` into a PDF using `font` for all text.
///
/// An empty page list still produces one blank page.
pub fn render_pdf(
    pages: &[Page],
    font: &DocumentFont,
    geometry: &LayoutConfig,
    title: &str,
) -> Result<Vec<u8>> {
    let blank = [Page::default()];
    let pages = if pages.is_empty() { &blank[..] } else { pages };

    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let page_tree_id = alloc.bump();
    let info_id = alloc.bump();
    let font_id = alloc.bump();
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc.bump(), alloc.bump())).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().map(|&(page_id, _)| page_id))
        .count(count(page_ids.len())?);

    let media_box = Rect::new(0.0, 0.0, geometry.page_width, geometry.page_height);
    for (page, &(page_id, content_id)) in pages.iter().zip(&page_ids) {
        let mut writer = pdf.page(page_id);
        writer
            .media_box(media_box)
            .parent(page_tree_id)
            .contents(content_id);
        writer.resources().fonts().pair(FONT_NAME, font_id);
        writer.finish();

        let content = deflate(&page_content(page, font))?;
        pdf.stream(content_id, &content).filter(Filter::FlateDecode);
    }

    match font {
        DocumentFont::Builtin(_) => {
            pdf.type1_font(font_id)
                .base_font(Name(b"Helvetica"))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        DocumentFont::TrueType(ttf) => write_truetype(&mut pdf, &mut alloc, font_id, ttf)?,
    }

    let mut info = pdf.document_info(info_id);
    if !title.is_empty() {
        info.title(TextStr(title));
    }
    info.producer(TextStr(PRODUCER));
    info.finish();

    Ok(pdf.finish())
}

/// Content stream drawing every line of `page` at its absolute position.
fn page_content(page: &Page, font: &DocumentFont) -> Vec<u8> {
    let mut content = Content::new();
    for line in &page.lines {
        let encoded = font.encode(&line.text);
        content.begin_text();
        content.set_font(FONT_NAME, line.font_size);
        content.next_line(line.x, line.y);
        content.show(Str(&encoded));
        content.end_text();
    }
    content.finish()
}

/// Embed a TrueType font as Type0 / CIDFontType2 with Identity-H encoding,
/// so glyph ids are written directly as two-byte codes.
fn write_truetype(
    pdf: &mut Pdf,
    alloc: &mut Ref,
    font_id: Ref,
    ttf: &TrueTypeFont,
) -> Result<()> {
    let cid_id = alloc.bump();
    let descriptor_id = alloc.bump();
    let file_id = alloc.bump();
    let cmap_id = alloc.bump();
    let base_font = Name(ttf.name().as_bytes());

    pdf.type0_font(font_id)
        .base_font(base_font)
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_id)
        .to_unicode(cmap_id);

    let mut cid = pdf.cid_font(cid_id);
    cid.subtype(CidFontType::Type2)
        .base_font(base_font)
        .system_info(identity_system_info())
        .font_descriptor(descriptor_id)
        .default_width(0.0)
        .cid_to_gid_map_predefined(Name(b"Identity"));
    cid.widths().consecutive(0, ttf.glyph_widths());
    cid.finish();

    let (ascent, descent, cap_height, bbox) = ttf.descriptor_metrics();
    pdf.font_descriptor(descriptor_id)
        .name(base_font)
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(bbox[0], bbox[1], bbox[2], bbox[3]))
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(file_id);

    let original_len = count(ttf.data().len())?;
    let font_data = deflate(ttf.data())?;
    let mut stream = pdf.stream(file_id, &font_data);
    stream.filter(Filter::FlateDecode);
    stream.pair(Name(b"Length1"), original_len);
    stream.finish();

    let mut mappings: Vec<(u16, char)> = ttf.glyph_chars().collect();
    mappings.sort_unstable();
    mappings.dedup_by_key(|&mut (gid, _)| gid);

    let mut cmap = UnicodeCmap::new(Name(b"Custom"), identity_system_info());
    for (gid, c) in mappings {
        cmap.pair(gid, c);
    }
    let cmap_data = deflate(&cmap.finish())?;
    pdf.stream(cmap_id, &cmap_data).filter(Filter::FlateDecode);

    Ok(())
}

fn identity_system_info() -> SystemInfo<'static> {
    SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    }
}

/// Zlib-compress a stream body for `FlateDecode`.
fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ConvertError::Pdf(format!("stream compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| ConvertError::Pdf(format!("stream compression failed: {e}")))
}

fn count(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| ConvertError::Pdf(format!("object too large: {n}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font::{FontSource, Helvetica};
    use crate::layout::paginate::LayoutLine;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn line(text: &str, y: f32) -> LayoutLine {
        LayoutLine {
            text: text.to_string(),
            x: 50.0,
            y,
            font_size: 12.0,
        }
    }

    /// Count page objects (`/Type /Page`, not `/Type /Pages`).
    fn page_count(pdf: &[u8]) -> usize {
        let needle = b"/Type /Page";
        pdf.windows(needle.len() + 1)
            .filter(|w| w.starts_with(needle) && w[needle.len()] != b's')
            .count()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_render_is_pdf_with_one_page_per_layout_page() {
        let pages = vec![
            Page {
                lines: vec![line("first", 800.0)],
            },
            Page {
                lines: vec![line("second", 800.0)],
            },
        ];
        let font = DocumentFont::Builtin(Helvetica);
        let bytes = render_pdf(&pages, &font, &LayoutConfig::default(), "Title").unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, b"%%EOF"));
        assert_eq!(page_count(&bytes), 2);
    }

    #[test]
    fn test_helvetica_declared_once() {
        let pages = vec![Page::default(), Page::default(), Page::default()];
        let font = DocumentFont::Builtin(Helvetica);
        let bytes = render_pdf(&pages, &font, &LayoutConfig::default(), "").unwrap();
        let needle = b"/BaseFont /Helvetica";
        let fonts = bytes.windows(needle.len()).filter(|w| w == needle).count();
        assert_eq!(fonts, 1);
        assert!(contains(&bytes, b"/WinAnsiEncoding"));
    }

    #[test]
    fn test_empty_page_list_yields_one_page() {
        let font = DocumentFont::Builtin(Helvetica);
        let bytes = render_pdf(&[], &font, &LayoutConfig::default(), "").unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_info_has_title_and_producer() {
        let font = DocumentFont::Builtin(Helvetica);
        let bytes = render_pdf(&[], &font, &LayoutConfig::default(), "Hello").unwrap();
        assert!(contains(&bytes, b"/Title (Hello)"));
        assert!(contains(&bytes, b"/Producer (emlpdf"));
    }

    #[test]
    fn test_content_stream_is_compressed_text() {
        let page = Page {
            lines: vec![line("Caf\u{e9}", 700.0)],
        };
        let content = deflate(&page_content(&page, &DocumentFont::Builtin(Helvetica))).unwrap();
        let mut decoded = Vec::new();
        ZlibDecoder::new(content.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert!(contains(&decoded, b"/F1 12 Tf"));
        assert!(contains(&decoded, b"50 700 Td"));
        // Non-ASCII strings are written in hex; E9 is the WinAnsi e-acute
        assert!(contains(&decoded, b"<436166E9> Tj"));
    }

    #[test]
    fn test_bundled_font_is_embedded_once() {
        let font = FontSource::Bundled.load().unwrap();
        let pages = vec![
            Page {
                lines: vec![line("Привет", 800.0)],
            },
            Page {
                lines: vec![line("Добрый день", 800.0)],
            },
        ];
        let bytes = render_pdf(&pages, &font, &LayoutConfig::default(), "").unwrap();
        assert_eq!(page_count(&bytes), 2);
        assert!(contains(&bytes, b"/Identity-H"));
        assert!(contains(&bytes, b"/ToUnicode"));
        let needle = b"/FontFile2";
        let files = bytes.windows(needle.len()).filter(|w| w == needle).count();
        assert_eq!(files, 1);
        assert!(contains(&bytes, b"/BaseFont /DejaVuSans"));
    }
}

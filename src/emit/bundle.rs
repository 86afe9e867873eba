//! Package emitters: EPUB and TextBundle.
//!
//! Both produce zip archives into the output buffer. The EPUB layout is
//! EPUB 2: stored-first `mimetype`, `META-INF/container.xml`, an OPF
//! package document generated from the document metadata, an NCX built
//! from the section tree, and a single XHTML content document rendered by
//! the HTML walker. TextBundles hold `info.json`, the MultiMarkdown round
//! trip as `text.md`, and any assets; the compressed variant deflates its
//! entries where the plain variant stores them.

use std::io::{Cursor, Write};

use serde::Serialize;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Result;
use crate::inline::plain_text;
use crate::tree::Section;
use crate::util::Lcg;

use super::html::render_fragment;
use super::mmd::MmdEmitter;
use super::{EmitContext, Emitter, Labeler, escape_xml};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Emitter for EPUB packages.
#[derive(Debug, Clone, Default)]
pub struct EpubEmitter;

impl EpubEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for EpubEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let identifier = document_identifier(ctx);
        let opf = generate_opf(ctx, &identifier);
        let ncx = generate_ncx(ctx, &identifier);
        let xhtml = generate_xhtml(ctx);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        // mimetype must be first and uncompressed.
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML.as_bytes())?;

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(opf.as_bytes())?;

        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(ncx.as_bytes())?;

        zip.start_file("OEBPS/main.xhtml", deflated)?;
        zip.write_all(xhtml.as_bytes())?;

        for (name, data) in sorted_assets(ctx) {
            zip.start_file(format!("OEBPS/assets/{name}"), deflated)?;
            zip.write_all(data)?;
        }

        let cursor = zip.finish()?;
        out.extend_from_slice(&cursor.into_inner());
        Ok(())
    }
}

/// A stable identifier derived from the document metadata, so repeated
/// conversions of the same input agree.
fn document_identifier(ctx: &EmitContext) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    let title = ctx.metadata.get("title").unwrap_or("");
    let author = ctx.metadata.get("author").unwrap_or("");
    for byte in title.bytes().chain(author.bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    let mut rng = Lcg::new(hash);
    let mut bytes = [0u8; 16];
    for byte in &mut bytes {
        *byte = (rng.next_u32() >> 8) as u8;
    }
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    format!(
        "urn:uuid:{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

fn generate_opf(ctx: &EmitContext, identifier: &str) -> String {
    let mut opf = String::new();
    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    let title = ctx.metadata.get("title").unwrap_or("Untitled");
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape_xml(title)));
    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(identifier)
    ));

    let language = ctx.metadata.get("language").unwrap_or("en");
    opf.push_str(&format!("    <dc:language>{}</dc:language>\n", escape_xml(language)));

    if let Some(author) = ctx.metadata.get("author") {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(author)
        ));
    }
    if let Some(date) = ctx.metadata.get("date") {
        opf.push_str(&format!("    <dc:date>{}</dc:date>\n", escape_xml(date)));
    }

    opf.push_str("  </metadata>\n  <manifest>\n");
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    opf.push_str(
        "    <item id=\"main\" href=\"main.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
    );
    for (i, (name, _)) in sorted_assets(ctx).iter().enumerate() {
        opf.push_str(&format!(
            "    <item id=\"asset{}\" href=\"assets/{}\" media-type=\"{}\"/>\n",
            i,
            escape_xml(name),
            asset_media_type(name)
        ));
    }
    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    opf.push_str("    <itemref idref=\"main\"/>\n");
    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_ncx(ctx: &EmitContext, identifier: &str) -> String {
    let mut ncx = String::new();
    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
    );
    ncx.push_str(&format!(
        "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
        escape_xml(identifier)
    ));
    ncx.push_str("  </head>\n");

    let title = ctx.metadata.get("title").unwrap_or("Untitled");
    ncx.push_str(&format!(
        "  <docTitle><text>{}</text></docTitle>\n  <navMap>\n",
        escape_xml(title)
    ));

    // Labels must match the ids the HTML walker assigns, so walk the
    // sections in the same order with an identically seeded labeler.
    let mut labeler = Labeler::new(ctx.options, ctx.seed);
    let mut play_order = 0;
    for section in &ctx.document.sections {
        write_nav_point(&mut ncx, section, &mut labeler, &mut play_order, 2);
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn write_nav_point(
    ncx: &mut String,
    section: &Section,
    labeler: &mut Labeler,
    play_order: &mut usize,
    depth: usize,
) {
    *play_order += 1;
    let order = *play_order;
    let indent = "  ".repeat(depth);
    let label = labeler.label_for(section);
    let src = match &label {
        Some(id) => format!("main.xhtml#{id}"),
        None => "main.xhtml".to_string(),
    };
    let text = plain_text(&section.heading);
    ncx.push_str(&format!(
        "{indent}<navPoint id=\"nav{order}\" playOrder=\"{order}\">\n"
    ));
    ncx.push_str(&format!(
        "{indent}  <navLabel><text>{}</text></navLabel>\n",
        escape_xml(&text)
    ));
    ncx.push_str(&format!("{indent}  <content src=\"{src}\"/>\n"));
    for child in &section.children {
        write_nav_point(ncx, child, labeler, play_order, depth + 1);
    }
    ncx.push_str(&format!("{indent}</navPoint>\n"));
}

fn generate_xhtml(ctx: &EmitContext) -> String {
    let title = ctx.metadata.get("title").unwrap_or("");
    let body = render_fragment(ctx, false);
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
         <head>\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_xml(title),
        body
    )
}

fn sorted_assets<'a>(ctx: &'a EmitContext) -> Vec<(&'a String, &'a Vec<u8>)> {
    let mut assets: Vec<_> = ctx.options.assets.iter().collect();
    assets.sort_by_key(|(name, _)| name.as_str());
    assets
}

fn asset_media_type(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".svg") {
        "image/svg+xml"
    } else if lower.ends_with(".css") {
        "text/css"
    } else {
        "application/octet-stream"
    }
}

// ============================================================================
// TextBundle
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleInfo {
    version: u32,
    #[serde(rename = "type")]
    bundle_type: String,
    transient: bool,
    creator_identifier: String,
}

impl Default for BundleInfo {
    fn default() -> Self {
        Self {
            version: 2,
            bundle_type: "net.daringfireball.markdown".to_string(),
            transient: false,
            creator_identifier: "org.multimark".to_string(),
        }
    }
}

/// Emitter for TextBundle packages.
#[derive(Debug, Clone)]
pub struct TextBundleEmitter {
    compression: zip::CompressionMethod,
}

impl TextBundleEmitter {
    /// Plain textbundle: stored entries.
    pub fn stored() -> Self {
        Self {
            compression: zip::CompressionMethod::Stored,
        }
    }

    /// Compressed textpack: deflated entries.
    pub fn deflated() -> Self {
        Self {
            compression: zip::CompressionMethod::Deflated,
        }
    }
}

impl Emitter for TextBundleEmitter {
    fn emit(&self, ctx: &EmitContext, out: &mut Vec<u8>) -> Result<()> {
        let info = serde_json::to_string_pretty(&BundleInfo::default())?;
        let mut text = Vec::new();
        MmdEmitter::new().emit(ctx, &mut text)?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(self.compression);

        zip.start_file("info.json", options)?;
        zip.write_all(info.as_bytes())?;

        zip.start_file("text.md", options)?;
        zip.write_all(&text)?;

        for (name, data) in sorted_assets(ctx) {
            zip.start_file(format!("assets/{name}"), options)?;
            zip.write_all(data)?;
        }

        let cursor = zip.finish()?;
        out.extend_from_slice(&cursor.into_inner());
        Ok(())
    }
}

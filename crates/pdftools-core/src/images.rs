//! Images to PDF
//!
//! Each accepted image gets its own page of the requested paper size, scaled
//! to fit and centered. A file that cannot be used is skipped and reported;
//! it never fails the batch.

use std::fmt;
use std::io::{Cursor, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder};
use lopdf::{Dictionary, Object, Stream};
use tracing::{debug, warn};

use crate::builder::{draw_xobject, xobject_resources, PdfBuilder};
use crate::error::Result;
use crate::layout::Placement;
use crate::paper::PageBox;

const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

/// An upload as received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}

/// Why an input image did not make it into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    UnsupportedType(String),
    BadSignature,
    Undecodable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Empty => write!(f, "file is empty"),
            SkipReason::UnsupportedType(mime) => write!(f, "unsupported type '{}'", mime),
            SkipReason::BadSignature => write!(f, "content is not a JPEG"),
            SkipReason::Undecodable(detail) => write!(f, "could not decode: {}", detail),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub name: String,
    pub reason: SkipReason,
}

/// A finished document plus the inputs that were left out.
#[derive(Debug)]
pub struct AssembledPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Image XObject ready to be added to a document.
struct EmbeddedImage {
    stream: Stream,
    smask: Option<Stream>,
    width: u32,
    height: u32,
}

/// Build one page per usable image, in input order.
///
/// With no usable images at all the result is a valid document without
/// pages.
pub fn images_to_pdf(files: &[UploadedFile], page: PageBox) -> Result<AssembledPdf> {
    let mut builder = PdfBuilder::new();
    let mut skipped = Vec::new();

    for file in files {
        match prepare_image(file) {
            Ok(image) => {
                add_image_page(&mut builder, image, page)?;
                debug!("Embedded {} ({} bytes)", file.original_name, file.size_bytes());
            }
            Err(reason) => {
                warn!("Skipped {}: {}", file.original_name, reason);
                skipped.push(SkippedFile {
                    name: file.original_name.clone(),
                    reason,
                });
            }
        }
    }

    let page_count = builder.page_count();
    if page_count == 0 {
        warn!(
            "None of {} uploaded images could be used; document has no pages",
            files.len()
        );
    }

    Ok(AssembledPdf {
        bytes: builder.finish()?,
        page_count,
        skipped,
    })
}

fn prepare_image(file: &UploadedFile) -> std::result::Result<EmbeddedImage, SkipReason> {
    if file.content.is_empty() {
        return Err(SkipReason::Empty);
    }

    match file.mime_type.as_str() {
        "image/jpeg" | "image/jpg" => {
            if !file.content.starts_with(&JPEG_MAGIC) {
                return Err(SkipReason::BadSignature);
            }
            embed_jpeg(&file.content)
        }
        "image/png" => embed_png(&file.content),
        other => Err(SkipReason::UnsupportedType(other.to_string())),
    }
}

fn add_image_page(builder: &mut PdfBuilder, image: EmbeddedImage, page: PageBox) -> Result<()> {
    let placement = Placement::centered(image.width as f32, image.height as f32, page)?;

    let mut stream = image.stream;
    if let Some(mask) = image.smask {
        let mask_id = builder.add_object(mask);
        stream.dict.set("SMask", Object::Reference(mask_id));
    }
    let image_id = builder.add_object(stream);

    // Image space is the unit square, so the matrix scales straight to size
    let ops = draw_xobject(
        "Im0",
        [
            placement.width,
            0.0,
            0.0,
            placement.height,
            placement.x,
            placement.y,
        ],
    );
    builder.add_page(page, xobject_resources("Im0", image_id), ops)?;
    Ok(())
}

/// JPEG data goes in unchanged behind a DCTDecode filter. Only the header
/// is decoded, for the size and color type.
fn embed_jpeg(bytes: &[u8]) -> std::result::Result<EmbeddedImage, SkipReason> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))
        .map_err(|e| SkipReason::Undecodable(e.to_string()))?;
    let (width, height) = decoder.dimensions();
    if width == 0 || height == 0 {
        return Err(SkipReason::Undecodable("JPEG has no pixels".into()));
    }

    // DCTDecode in PDF is 8 bits per component only
    let mut dict = image_dict(width, height);
    match decoder.original_color_type() {
        ExtendedColorType::L8 => dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
        ExtendedColorType::Rgb8 => dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ExtendedColorType::Cmyk8 => {
            // Adobe writes CMYK JPEGs inverted
            dict.set("ColorSpace", Object::Name(b"DeviceCMYK".to_vec()));
            dict.set(
                "Decode",
                Object::Array([1, 0, 1, 0, 1, 0, 1, 0].map(Object::Integer).to_vec()),
            );
        }
        other => {
            return Err(SkipReason::Undecodable(format!(
                "unsupported JPEG color type {:?}",
                other
            )))
        }
    }
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    Ok(EmbeddedImage {
        stream: Stream::new(dict, bytes.to_vec()),
        smask: None,
        width,
        height,
    })
}

/// PNG is decoded and stored as Flate-compressed samples, alpha as an SMask.
fn embed_png(bytes: &[u8]) -> std::result::Result<EmbeddedImage, SkipReason> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| SkipReason::Undecodable(e.to_string()))?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(SkipReason::Undecodable("PNG has no pixels".into()));
    }

    let color = img.color();
    let (color_space, samples, alpha) = if color.has_color() {
        if color.has_alpha() {
            let rgba = img.to_rgba8().into_raw();
            let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(rgba.len() / 4);
            for px in rgba.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            ("DeviceRGB", rgb, Some(alpha))
        } else {
            ("DeviceRGB", img.to_rgb8().into_raw(), None)
        }
    } else {
        let alpha = color
            .has_alpha()
            .then(|| img.to_luma_alpha8().pixels().map(|p| p.0[1]).collect::<Vec<u8>>());
        ("DeviceGray", img.to_luma8().into_raw(), alpha)
    };

    let mut dict = image_dict(width, height);
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    let stream = flate_stream(dict, &samples)?;

    let smask = match alpha {
        Some(alpha) => {
            let mut mask = image_dict(width, height);
            mask.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            Some(flate_stream(mask, &alpha)?)
        }
        None => None,
    };

    Ok(EmbeddedImage {
        stream,
        smask,
        width,
        height,
    })
}

fn image_dict(width: u32, height: u32) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

fn flate_stream(mut dict: Dictionary, samples: &[u8]) -> std::result::Result<Stream, SkipReason> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(samples)
        .map_err(|e| SkipReason::Undecodable(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| SkipReason::Undecodable(e.to_string()))?;

    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    Ok(Stream::new(dict, compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat as Codec, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use lopdf::Document;
    use std::io::Cursor;

    fn png_file(name: &str, width: u32, height: u32) -> UploadedFile {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 200, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, Codec::Png).unwrap();
        UploadedFile {
            original_name: name.into(),
            mime_type: "image/png".into(),
            content: out.into_inner(),
        }
    }

    fn jpeg_file(name: &str, width: u32, height: u32) -> UploadedFile {
        let img = RgbImage::from_pixel(width, height, Rgb([120, 20, 60]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, Codec::Jpeg).unwrap();
        UploadedFile {
            original_name: name.into(),
            mime_type: "image/jpeg".into(),
            content: out.into_inner(),
        }
    }

    fn empty_file(name: &str, mime: &str) -> UploadedFile {
        UploadedFile {
            original_name: name.into(),
            mime_type: mime.into(),
            content: Vec::new(),
        }
    }

    /// XObject dictionary of the single image drawn on `page_num`.
    fn page_image(doc: &Document, page_num: u32) -> Dictionary {
        let page_id = doc.get_pages()[&page_num];
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        doc.get_object(image_id)
            .unwrap()
            .as_stream()
            .unwrap()
            .dict
            .clone()
    }

    #[test]
    fn test_one_page_per_image_in_order() {
        let files = vec![
            png_file("a.png", 40, 20),
            jpeg_file("b.jpg", 16, 32),
            png_file("c.png", 5, 5),
        ];
        let out = images_to_pdf(&files, PageBox::A4_PORTRAIT).unwrap();
        assert_eq!(out.page_count, 3);
        assert!(out.skipped.is_empty());

        let doc = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        assert_eq!(page_image(&doc, 1).get(b"Width").unwrap().as_i64().unwrap(), 40);
        assert_eq!(page_image(&doc, 2).get(b"Height").unwrap().as_i64().unwrap(), 32);
        assert_eq!(
            page_image(&doc, 2).get(b"Filter").unwrap().as_name_str().unwrap(),
            "DCTDecode"
        );
    }

    #[test]
    fn test_empty_file_is_skipped_not_fatal() {
        let files = vec![png_file("ok.png", 10, 10), empty_file("zero.png", "image/png")];
        let out = images_to_pdf(&files, PageBox::A4_PORTRAIT).unwrap();
        assert_eq!(out.page_count, 1);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].name, "zero.png");
        assert_eq!(out.skipped[0].reason, SkipReason::Empty);
        assert_eq!(Document::load_mem(&out.bytes).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn test_skip_reasons() {
        let mut fake_jpeg = png_file("fake.jpg", 4, 4);
        fake_jpeg.mime_type = "image/jpeg".into();
        let mut gif = png_file("anim.gif", 4, 4);
        gif.mime_type = "image/gif".into();
        let mut broken_png = png_file("broken.png", 4, 4);
        broken_png.content.truncate(20);

        let out = images_to_pdf(&[fake_jpeg, gif, broken_png], PageBox::A4_PORTRAIT).unwrap();
        assert_eq!(out.page_count, 0);
        assert_eq!(out.skipped[0].reason, SkipReason::BadSignature);
        assert_eq!(
            out.skipped[1].reason,
            SkipReason::UnsupportedType("image/gif".into())
        );
        assert!(matches!(out.skipped[2].reason, SkipReason::Undecodable(_)));
    }

    #[test]
    fn test_no_usable_images_gives_empty_document() {
        let out = images_to_pdf(&[empty_file("x.jpg", "image/jpeg")], PageBox::A4_PORTRAIT)
            .unwrap();
        assert_eq!(out.page_count, 0);
        let doc = Document::load_mem(&out.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn test_alpha_png_gets_smask() {
        let img = RgbaImage::from_fn(6, 3, |x, _| Rgba([0, 0, 255, (x * 40) as u8]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, Codec::Png).unwrap();
        let file = UploadedFile {
            original_name: "alpha.png".into(),
            mime_type: "image/png".into(),
            content: out.into_inner(),
        };

        let pdf = images_to_pdf(&[file], PageBox::A4_PORTRAIT).unwrap();
        let doc = Document::load_mem(&pdf.bytes).unwrap();
        assert!(page_image(&doc, 1).get(b"SMask").is_ok());
    }

    #[test]
    fn test_grayscale_png_uses_device_gray() {
        let img = image::GrayImage::from_pixel(4, 4, Luma([128]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, Codec::Png).unwrap();
        let file = UploadedFile {
            original_name: "gray.png".into(),
            mime_type: "image/png".into(),
            content: out.into_inner(),
        };

        let pdf = images_to_pdf(&[file], PageBox::A4_PORTRAIT).unwrap();
        let doc = Document::load_mem(&pdf.bytes).unwrap();
        assert_eq!(
            page_image(&doc, 1)
                .get(b"ColorSpace")
                .unwrap()
                .as_name_str()
                .unwrap(),
            "DeviceGray"
        );
    }

    #[test]
    fn test_page_uses_requested_paper() {
        let landscape = PageBox {
            width: 792.0,
            height: 612.0,
        };
        let pdf = images_to_pdf(&[png_file("a.png", 10, 10)], landscape).unwrap();
        let doc = Document::load_mem(&pdf.bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        assert_eq!(
            crate::builder::media_box(&doc, page_id),
            [0.0, 0.0, 792.0, 612.0]
        );
    }

    #[test]
    fn test_image_is_centered_and_fit() {
        let pdf = images_to_pdf(&[png_file("wide.png", 200, 100)], PageBox::A4_PORTRAIT).unwrap();
        let doc = Document::load_mem(&pdf.bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        let content = doc.get_and_decode_page_content(page_id).unwrap();
        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .unwrap();
        let m: Vec<f32> = cm
            .operands
            .iter()
            .map(|o| match o {
                Object::Real(r) => *r,
                Object::Integer(i) => *i as f32,
                _ => panic!("non-numeric operand"),
            })
            .collect();

        let page = PageBox::A4_PORTRAIT;
        assert!((m[0] - page.width).abs() < 0.01);
        assert!((m[3] - page.width / 2.0).abs() < 0.01);
        assert!(m[4].abs() < 0.01);
        assert!((m[5] - (page.height - m[3]) / 2.0).abs() < 0.01);
    }

    #[test]
    fn test_jpeg_size_and_color_from_decoder() {
        let pdf = images_to_pdf(&[jpeg_file("x.jpg", 33, 17)], PageBox::A4_PORTRAIT).unwrap();
        let doc = Document::load_mem(&pdf.bytes).unwrap();
        let dict = page_image(&doc, 1);
        assert_eq!(dict.get(b"Width").unwrap().as_i64().unwrap(), 33);
        assert_eq!(dict.get(b"Height").unwrap().as_i64().unwrap(), 17);
        assert_eq!(dict.get(b"BitsPerComponent").unwrap().as_i64().unwrap(), 8);
        assert_eq!(
            dict.get(b"ColorSpace").unwrap().as_name_str().unwrap(),
            "DeviceRGB"
        );
    }

    #[test]
    fn test_jpeg_without_frame_is_skipped() {
        let file = UploadedFile {
            original_name: "stub.jpg".into(),
            mime_type: "image/jpeg".into(),
            content: vec![0xFF, 0xD8, 0x00, 0x00, 0x00],
        };
        let out = images_to_pdf(&[file], PageBox::A4_PORTRAIT).unwrap();
        assert_eq!(out.page_count, 0);
        assert!(matches!(out.skipped[0].reason, SkipReason::Undecodable(_)));
    }

    #[test]
    fn test_twelve_bit_jpeg_is_skipped() {
        let mut file = jpeg_file("deep.jpg", 8, 8);
        // Mark the baseline frame as 12-bit extended
        let sof = file
            .content
            .windows(2)
            .position(|w| w == [0xFF, 0xC0])
            .unwrap();
        file.content[sof + 1] = 0xC1;
        file.content[sof + 4] = 12;

        let out = images_to_pdf(&[file], PageBox::A4_PORTRAIT).unwrap();
        assert_eq!(out.page_count, 0);
        assert!(matches!(out.skipped[0].reason, SkipReason::Undecodable(_)));
    }
}

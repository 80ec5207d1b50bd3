#![allow(dead_code)]

use docsift::{
    config::Config,
    engine::{ConfidenceTextExtractor, RecognizedText, TextExtractor, Token},
    error::ConversionError,
    output::ArtifactWriter,
    pipeline::Converter,
    render::PageRenderer,
    report::ConversionResult,
    request::ConversionRequest,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{dictionary, Document, Object, Stream};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Plain-text engine: always returns the same text, no confidence support.
pub struct FakeEngine {
    pub name: &'static str,
    pub text: String,
}

impl FakeEngine {
    pub fn new(text: &str) -> Self {
        Self {
            name: "fake",
            text: text.to_string(),
        }
    }
}

impl TextExtractor for FakeEngine {
    fn name(&self) -> &str {
        self.name
    }

    fn extract(&self, _image: &DynamicImage) -> Result<String, ConversionError> {
        Ok(self.text.clone())
    }
}

/// Engine that reports a fixed token list with scores.
pub struct FakeConfidenceEngine {
    pub tokens: Vec<Token>,
}

impl FakeConfidenceEngine {
    pub fn new(tokens: &[(&str, f32)]) -> Self {
        Self {
            tokens: tokens.iter().map(|(t, c)| Token::new(*t, *c)).collect(),
        }
    }
}

impl TextExtractor for FakeConfidenceEngine {
    fn name(&self) -> &str {
        "fake-confidence"
    }

    fn extract(&self, _image: &DynamicImage) -> Result<String, ConversionError> {
        Ok(self
            .tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn confidence(&self) -> Option<&dyn ConfidenceTextExtractor> {
        Some(self)
    }
}

impl ConfidenceTextExtractor for FakeConfidenceEngine {
    fn extract_with_confidence(
        &self,
        image: &DynamicImage,
    ) -> Result<RecognizedText, ConversionError> {
        Ok(RecognizedText {
            text: self.extract(image)?,
            tokens: self.tokens.clone(),
        })
    }
}

/// Hands out `pages` blank pages and counts how often it was asked.
pub struct FakeRenderer {
    pub pages: usize,
    pub calls: Rc<Cell<usize>>,
}

impl FakeRenderer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl PageRenderer for FakeRenderer {
    fn render_pages(
        &self,
        _pdf: &Path,
        _dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage) -> Result<(), ConversionError>,
    ) -> Result<usize, ConversionError> {
        self.calls.set(self.calls.get() + 1);
        for index in 0..self.pages {
            visit(index, blank_page())?;
        }
        Ok(self.pages)
    }
}

/// Writer that refuses everything.
pub struct FailingWriter;

impl ArtifactWriter for FailingWriter {
    fn write(
        &self,
        req: &ConversionRequest,
        _result: &ConversionResult,
    ) -> Result<PathBuf, ConversionError> {
        Err(ConversionError::Persistence {
            path: PathBuf::from(format!("/unwritable/{}.txt", req.stem())),
            reason: "disk full".into(),
        })
    }
}

pub fn converter(engine: impl TextExtractor + 'static, renderer: FakeRenderer) -> Converter {
    Converter::with_components(&Config::default(), Box::new(engine), Box::new(renderer))
        .expect("default config is valid")
}

pub fn blank_page() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([255, 255, 255])))
}

/// A small white image with a dark bar, saved as PNG.
pub fn write_png(path: &Path) {
    let mut img = RgbImage::from_pixel(48, 24, Rgb([255, 255, 255]));
    for x in 8..40 {
        for y in 10..14 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    img.save_with_format(path, ImageFormat::Png).expect("write png");
}

pub fn png_bytes() -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    blank_page()
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

/// One page per entry, each with a single line of Helvetica text.
pub fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut page_ids = Vec::new();
    for text in pages {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        page_ids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        }));
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(pages.len() as i64),
    });
    for &pid in &page_ids {
        if let Ok(dict) = doc.get_object_mut(pid).and_then(Object::as_dict_mut) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.save(path).expect("write pdf");
}

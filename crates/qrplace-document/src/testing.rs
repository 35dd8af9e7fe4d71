// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory PDF fixtures for tests and benchmarks.
//
// Every page shares one /Resources dictionary with Helvetica as /F1 and
// Helvetica-Bold as /F2, plus any image or form XObjects registered on the
// builder.

use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use qrplace_core::Rect;

/// Builds small PDFs from raw content-stream snippets.
#[derive(Debug, Clone)]
pub struct PdfBuilder {
    media_box: Rect,
    crop_box: Option<Rect>,
    inherit_media_box: bool,
    compress: bool,
    pages: Vec<Vec<u8>>,
    images: Vec<String>,
    forms: Vec<(String, [f64; 6], Vec<u8>)>,
    font_widths: Option<(i64, Vec<f64>)>,
}

impl PdfBuilder {
    pub fn new(media_box: Rect) -> Self {
        Self {
            media_box,
            crop_box: None,
            inherit_media_box: false,
            compress: false,
            pages: Vec::new(),
            images: Vec::new(),
            forms: Vec::new(),
            font_widths: None,
        }
    }

    /// US Letter, 612×792pt.
    pub fn letter() -> Self {
        Self::new(Rect::new(0.0, 0.0, 612.0, 792.0))
    }

    /// Put the MediaBox on the page tree root instead of each page.
    pub fn inherit_media_box(mut self) -> Self {
        self.inherit_media_box = true;
        self
    }

    /// Give every page a /CropBox.
    pub fn crop_box(mut self, crop_box: Rect) -> Self {
        self.crop_box = Some(crop_box);
        self
    }

    /// Flate-compress the page content streams.
    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Add a page with the given content stream.
    pub fn page(mut self, content: &[u8]) -> Self {
        self.pages.push(content.to_vec());
        self
    }

    /// Register a 1×1 gray image XObject under `name`.
    pub fn with_image(mut self, name: &str) -> Self {
        self.images.push(name.to_string());
        self
    }

    /// Register a form XObject under `name`.
    pub fn with_form(mut self, name: &str, matrix: [f64; 6], content: &[u8]) -> Self {
        self.forms.push((name.to_string(), matrix, content.to_vec()));
        self
    }

    /// Give /F1 an explicit widths table.
    pub fn with_font_widths(mut self, first_char: i64, widths: Vec<f64>) -> Self {
        self.font_widths = Some((first_char, widths));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut regular = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        };
        if let Some((first_char, widths)) = &self.font_widths {
            regular.set("FirstChar", *first_char);
            regular.set(
                "LastChar",
                *first_char + widths.len() as i64 - 1,
            );
            regular.set(
                "Widths",
                widths.iter().map(|w| Object::Real(*w as f32)).collect::<Vec<_>>(),
            );
        }
        let regular_id = doc.add_object(regular);
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });

        let mut xobjects = Dictionary::new();
        for name in &self.images {
            let image = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 1,
                    "Height" => 1,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                vec![0],
            );
            xobjects.set(name.as_str(), doc.add_object(image));
        }
        for (name, matrix, content) in &self.forms {
            let form = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => rect_array(&self.media_box),
                    "Matrix" => matrix.iter().map(|v| Object::Real(*v as f32)).collect::<Vec<_>>(),
                },
                content.clone(),
            );
            xobjects.set(name.as_str(), doc.add_object(form));
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
            "XObject" => xobjects,
        });

        let mut kids = Vec::with_capacity(self.pages.len());
        for content in &self.pages {
            let mut stream = Stream::new(Dictionary::new(), content.clone());
            if self.compress {
                stream.compress().expect("fixture content compresses");
            }
            let content_id = doc.add_object(stream);
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            };
            if !self.inherit_media_box {
                page.set("MediaBox", rect_array(&self.media_box));
            }
            if let Some(crop_box) = &self.crop_box {
                page.set("CropBox", rect_array(crop_box));
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        };
        if self.inherit_media_box {
            pages.set("MediaBox", rect_array(&self.media_box));
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut output = Vec::new();
        doc.save_to(&mut output).expect("fixture PDF serialises");
        output
    }
}

fn rect_array(rect: &Rect) -> Vec<Object> {
    [rect.x, rect.y, rect.right(), rect.top()]
        .into_iter()
        .map(|v| Object::Real(v as f32))
        .collect()
}

/// Content-stream snippet showing `text` at `(x, y)` in /F1.
pub fn text_at(x: f64, y: f64, size: f64, text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)");
    format!("BT /F1 {size} Tf {x} {y} Td ({escaped}) Tj ET\n")
}

/// One letter page with body text and `marker` shown at `(x, y)`.
pub fn marker_document(marker: &str, x: f64, y: f64) -> Vec<u8> {
    let mut content = String::new();
    content.push_str(&text_at(72.0, 720.0, 12.0, "Agreement between the parties"));
    content.push_str(&text_at(72.0, 700.0, 12.0, "Signed on behalf of the company:"));
    content.push_str(&text_at(x, y, 12.0, marker));
    PdfBuilder::letter().page(content.as_bytes()).build()
}

/// `pages` blank letter pages.
pub fn blank_document(pages: usize) -> Vec<u8> {
    (0..pages)
        .fold(PdfBuilder::letter(), |builder, _| builder.page(b""))
        .build()
}

/// One letter page covered edge to edge by a single image.
pub fn covered_document() -> Vec<u8> {
    PdfBuilder::letter()
        .with_image("Im0")
        .page(b"q 612 0 0 792 0 0 cm /Im0 Do Q")
        .build()
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — draws QR stamps onto existing pages and appends blank pages,
// working directly on the `lopdf` object graph.
//
// A stamped page gets its own copy of its effective /Resources and a new
// /Contents array: `q`, the original streams untouched, then `Q` followed by
// the stamp. Nothing reachable from other pages is modified.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use qrplace_core::Rect;
use qrplace_core::error::QrPlaceError;
use tracing::{debug, instrument, warn};

use super::content::{inherited, resolve, resolve_dict};
use crate::image::QrSymbol;
use crate::placement::StampLayout;

const TITLE_COLOR: [f64; 3] = [0.0, 0.0, 0.7];
const TEXT_COLOR: [f64; 3] = [0.0, 0.0, 0.0];

/// Draws one QR symbol, with captions, onto pages of a document.
///
/// The image XObject and the two caption fonts are created once per
/// compositor and shared by every stamp it draws.
pub struct Compositor<'s> {
    symbol: &'s QrSymbol,
    image_id: Option<ObjectId>,
    font_ids: Option<(ObjectId, ObjectId)>,
}

impl<'s> Compositor<'s> {
    pub fn new(symbol: &'s QrSymbol) -> Self {
        Self {
            symbol,
            image_id: None,
            font_ids: None,
        }
    }

    // -- Stamping -------------------------------------------------------------

    /// Draw `stamp` onto the page `page_id`. When `cover` is given, that box
    /// is painted white first.
    #[instrument(skip_all, fields(page = ?page_id, lines = stamp.caption.len()))]
    pub fn stamp(
        &mut self,
        doc: &mut Document,
        page_id: ObjectId,
        stamp: &StampLayout,
        cover: Option<Rect>,
    ) -> Result<(), QrPlaceError> {
        let image_id = self.image(doc);
        let mut resources = effective_resources(doc, page_id);
        let image_name = attach_resource(doc, &mut resources, b"XObject", "QrIm", image_id);
        let font_names = if stamp.caption.is_empty() {
            None
        } else {
            let (regular, bold) = self.fonts(doc);
            Some((
                attach_resource(doc, &mut resources, b"Font", "QrF", regular),
                attach_resource(doc, &mut resources, b"Font", "QrF", bold),
            ))
        };

        let existing = existing_contents(doc, page_id)?;
        let mut operations = Vec::new();
        if !existing.is_empty() {
            operations.push(Operation::new("Q", vec![]));
        }
        operations.extend(stamp_operations(stamp, cover, &image_name, font_names.as_ref()));
        let stamp_bytes = Content { operations }.encode().map_err(|err| {
            QrPlaceError::EncodingFailure(format!("failed to encode stamp content: {err}"))
        })?;

        let mut contents = Vec::with_capacity(existing.len() + 2);
        if !existing.is_empty() {
            let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.push(Object::Reference(open));
            contents.extend(existing);
        }
        let mut stream = Stream::new(Dictionary::new(), stamp_bytes);
        if let Err(err) = stream.compress() {
            warn!(%err, "Stamp content left uncompressed");
        }
        contents.push(Object::Reference(doc.add_object(stream)));

        let page = doc.get_dictionary_mut(page_id).map_err(|err| {
            QrPlaceError::InvalidDocument(format!("page {page_id:?} is not a dictionary: {err}"))
        })?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));

        debug!(
            qr_x = stamp.qr.x,
            qr_y = stamp.qr.y,
            side = stamp.qr.width,
            image = %image_name,
            "Stamp drawn"
        );
        Ok(())
    }

    fn image(&mut self, doc: &mut Document) -> ObjectId {
        if let Some(id) = self.image_id {
            return id;
        }
        let (width, height) = self.symbol.image.dimensions();
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Interpolate" => false,
            },
            self.symbol.image.as_raw().clone(),
        );
        if let Err(err) = stream.compress() {
            warn!(%err, "QR image left uncompressed");
        }
        let id = doc.add_object(stream);
        self.image_id = Some(id);
        id
    }

    fn fonts(&mut self, doc: &mut Document) -> (ObjectId, ObjectId) {
        if let Some(ids) = self.font_ids {
            return ids;
        }
        let mut font = |base: &str| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            })
        };
        let ids = (font("Helvetica"), font("Helvetica-Bold"));
        self.font_ids = Some(ids);
        ids
    }
}

// -- Page tree ------------------------------------------------------------------

/// Append a blank page with the given MediaBox as the last page of the
/// document. Returns the new page's object id.
#[instrument(skip(doc))]
pub fn append_blank_page(doc: &mut Document, media_box: Rect) -> Result<ObjectId, QrPlaceError> {
    let pages_id = doc
        .catalog()
        .map_err(|err| QrPlaceError::InvalidDocument(format!("no catalog: {err}")))
        .and_then(|catalog| {
            catalog
                .get(b"Pages")
                .map_err(|err| QrPlaceError::InvalidDocument(format!("no /Pages: {err}")))
                .and_then(|pages_ref| match pages_ref {
                    Object::Reference(id) => Ok(*id),
                    _ => Err(QrPlaceError::InvalidDocument(
                        "/Pages is not a reference".to_string(),
                    )),
                })
        })?;

    let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => rect_array(&media_box),
        "Resources" => Dictionary::new(),
        "Contents" => content_id,
    });

    let pages = doc.get_dictionary_mut(pages_id).map_err(|err| {
        QrPlaceError::InvalidDocument(format!("page tree root unreadable: {err}"))
    })?;
    match pages.get_mut(b"Kids") {
        Ok(Object::Array(kids)) => kids.push(Object::Reference(page_id)),
        _ => {
            return Err(QrPlaceError::InvalidDocument(
                "page tree root has no /Kids array".to_string(),
            ));
        }
    }
    if let Ok(count_obj) = pages.get_mut(b"Count")
        && let Object::Integer(count) = count_obj
    {
        *count += 1;
    }

    debug!(?page_id, "Blank page appended");
    Ok(page_id)
}

/// Serialise a document to bytes.
pub fn save_to_bytes(doc: &mut Document) -> Result<Vec<u8>, QrPlaceError> {
    let mut output = Vec::new();
    doc.save_to(&mut output).map_err(|err| {
        QrPlaceError::Io(std::io::Error::other(format!("failed to serialise PDF: {err}")))
    })?;
    Ok(output)
}

// -- Helpers --------------------------------------------------------------------

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn rect_array(rect: &Rect) -> Vec<Object> {
    vec![real(rect.x), real(rect.y), real(rect.right()), real(rect.top())]
}

fn rect_operands(rect: &Rect) -> Vec<Object> {
    vec![real(rect.x), real(rect.y), real(rect.width), real(rect.height)]
}

fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Owned copy of the page's effective (possibly inherited) resources.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|r| resolve_dict(doc, r))
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

/// Add `id` to the `category` sub-dictionary of `resources` under a fresh
/// name starting with `prefix`. The sub-dictionary is copied inline so that
/// a shared one is never modified.
fn attach_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    prefix: &str,
    id: ObjectId,
) -> String {
    let mut entries = resources
        .get(category)
        .ok()
        .and_then(|c| resolve_dict(doc, c))
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let mut n = 0usize;
    let name = loop {
        let candidate = format!("{prefix}{n}");
        if !entries.has(candidate.as_bytes()) {
            break candidate;
        }
        n += 1;
    };
    entries.set(name.clone(), Object::Reference(id));
    resources.set(category.to_vec(), Object::Dictionary(entries));
    name
}

/// The page's current content streams as a list of references.
fn existing_contents(doc: &mut Document, page_id: ObjectId) -> Result<Vec<Object>, QrPlaceError> {
    let page = doc.get_dictionary(page_id).map_err(|err| {
        QrPlaceError::InvalidDocument(format!("page {page_id:?} is not a dictionary: {err}"))
    })?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    match contents {
        Object::Reference(id) => match resolve(doc, contents) {
            Some(Object::Array(parts)) => Ok(parts.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        Object::Array(parts) => Ok(parts.clone()),
        Object::Stream(stream) => {
            let stream = stream.clone();
            Ok(vec![Object::Reference(doc.add_object(stream))])
        }
        _ => Ok(Vec::new()),
    }
}

/// Content operators for one stamp.
fn stamp_operations(
    stamp: &StampLayout,
    cover: Option<Rect>,
    image_name: &str,
    fonts: Option<&(String, String)>,
) -> Vec<Operation> {
    let mut ops = vec![Operation::new("q", vec![])];

    if let Some(cover) = cover {
        ops.push(Operation::new("g", vec![real(1.0)]));
        ops.push(Operation::new("re", rect_operands(&cover)));
        ops.push(Operation::new("f", vec![]));
    }

    ops.push(Operation::new("g", vec![real(1.0)]));
    ops.push(Operation::new("re", rect_operands(&stamp.bounds)));
    ops.push(Operation::new("f", vec![]));

    let qr = &stamp.qr;
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![real(qr.width), real(0.0), real(0.0), real(qr.height), real(qr.x), real(qr.y)],
    ));
    ops.push(Operation::new("Do", vec![Object::Name(image_name.as_bytes().to_vec())]));
    ops.push(Operation::new("Q", vec![]));

    if let Some((regular, bold)) = fonts {
        ops.push(Operation::new("BT", vec![]));
        for line in &stamp.caption {
            let (font, color) = if line.bold {
                (bold, TITLE_COLOR)
            } else {
                (regular, TEXT_COLOR)
            };
            ops.push(Operation::new(
                "Tf",
                vec![Object::Name(font.as_bytes().to_vec()), real(line.font_size)],
            ));
            ops.push(Operation::new("rg", color.iter().copied().map(real).collect()));
            ops.push(Operation::new(
                "Tm",
                vec![real(1.0), real(0.0), real(0.0), real(1.0), real(line.x), real(line.baseline)],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(latin1_bytes(&line.text), StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::QrEncoder;
    use crate::pdf::content::page_content;
    use crate::placement::layout_stamp;
    use crate::testing::PdfBuilder;
    use qrplace_core::QrPayload;
    use qrplace_core::config::PlacementConfig;

    fn symbol() -> QrSymbol {
        QrEncoder::from_config(&PlacementConfig::default())
            .encode("https://verify.example/c/42")
            .unwrap()
    }

    fn stamp_layout(symbol: &QrSymbol) -> StampLayout {
        let payload = QrPayload::new("https://verify.example/c/42").with_certificate_id("C-42");
        layout_stamp(
            &Rect::new(400.0, 20.0, 150.0, 150.0),
            symbol,
            &payload,
            &PlacementConfig::default(),
        )
        .unwrap()
    }

    fn page_ids(doc: &Document) -> Vec<ObjectId> {
        doc.get_pages().into_values().collect()
    }

    #[test]
    fn stamp_wraps_existing_content_and_draws_image() {
        let bytes = PdfBuilder::letter()
            .page(b"BT /F1 12 Tf 72 700 Td (Body) Tj ET")
            .build();
        let mut doc = Document::load_mem(&bytes).unwrap();
        let page_id = page_ids(&doc)[0];
        let symbol = symbol();
        let layout = stamp_layout(&symbol);

        Compositor::new(&symbol)
            .stamp(&mut doc, page_id, &layout, None)
            .unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        let content = page_content(&doc, page).unwrap();
        let ops = Content::decode(&content).unwrap().operations;
        let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators.first(), Some(&"q"));
        assert!(operators.contains(&"Do"));
        assert!(operators.contains(&"Tj"));
        let q = operators.iter().filter(|o| **o == "q").count();
        let big_q = operators.iter().filter(|o| **o == "Q").count();
        assert_eq!(q, big_q);
    }

    #[test]
    fn shared_resources_are_not_mutated() {
        let bytes = PdfBuilder::letter().page(b"").page(b"").build();
        let mut doc = Document::load_mem(&bytes).unwrap();
        let ids = page_ids(&doc);
        let shared_before = format!("{:?}", effective_resources(&doc, ids[1]));
        let symbol = symbol();

        Compositor::new(&symbol)
            .stamp(&mut doc, ids[0], &stamp_layout(&symbol), None)
            .unwrap();

        assert_eq!(format!("{:?}", effective_resources(&doc, ids[1])), shared_before);
        let own = effective_resources(&doc, ids[0]);
        let xobjects = own.get(b"XObject").unwrap().as_dict().unwrap();
        assert!(xobjects.has(b"QrIm0"));
    }

    #[test]
    fn resource_names_do_not_collide() {
        let bytes = PdfBuilder::letter().with_image("QrIm0").page(b"").build();
        let mut doc = Document::load_mem(&bytes).unwrap();
        let page_id = page_ids(&doc)[0];
        let symbol = symbol();

        Compositor::new(&symbol)
            .stamp(&mut doc, page_id, &stamp_layout(&symbol), None)
            .unwrap();

        let own = effective_resources(&doc, page_id);
        let xobjects = own.get(b"XObject").unwrap().as_dict().unwrap();
        assert!(xobjects.has(b"QrIm0"));
        assert!(xobjects.has(b"QrIm1"));
    }

    #[test]
    fn other_pages_keep_their_content_streams() {
        let bytes = PdfBuilder::letter()
            .page(b"BT /F1 12 Tf 72 700 Td (One) Tj ET")
            .page(b"BT /F1 12 Tf 72 700 Td (Two) Tj ET")
            .build();
        let mut doc = Document::load_mem(&bytes).unwrap();
        let ids = page_ids(&doc);
        let before = format!("{:?}", doc.get_dictionary(ids[1]).unwrap());
        let symbol = symbol();

        Compositor::new(&symbol)
            .stamp(&mut doc, ids[0], &stamp_layout(&symbol), None)
            .unwrap();

        assert_eq!(format!("{:?}", doc.get_dictionary(ids[1]).unwrap()), before);
    }

    #[test]
    fn cover_box_is_painted() {
        let bytes = PdfBuilder::letter().page(b"").build();
        let mut doc = Document::load_mem(&bytes).unwrap();
        let page_id = page_ids(&doc)[0];
        let symbol = symbol();
        let cover = Rect::new(96.0, 96.0, 158.0, 28.0);

        Compositor::new(&symbol)
            .stamp(&mut doc, page_id, &stamp_layout(&symbol), Some(cover))
            .unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        let ops = Content::decode(&page_content(&doc, page).unwrap())
            .unwrap()
            .operations;
        let fills = ops.iter().filter(|op| op.operator == "f").count();
        assert_eq!(fills, 2);
    }

    #[test]
    fn blank_page_is_appended_to_page_tree() {
        let bytes = PdfBuilder::letter().page(b"").build();
        let mut doc = Document::load_mem(&bytes).unwrap();
        let media_box = Rect::new(0.0, 0.0, 595.0, 842.0);
        let new_id = append_blank_page(&mut doc, media_box).unwrap();

        let output = save_to_bytes(&mut doc).unwrap();
        let reloaded = Document::load_mem(&output).unwrap();
        let pages = reloaded.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages.get(&2), Some(&new_id));
    }
}

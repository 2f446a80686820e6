//! Fragment assembly: append one-page searchable fragments to the output
//! document in strict source order.
//!
//! ## Why rebuild the page tree?
//!
//! Each engine fragment is a complete PDF with its own catalog and page tree.
//! Appending means renumbering every object in the fragment past the ids we
//! have already used, moving the objects across, dropping the fragment's
//! catalog and page-tree nodes, and re-parenting its page under a single
//! `/Pages` node built at write time. Tesseract (and printpdf) place
//! `/MediaBox` and `/Resources` directly on the page object, so nothing is
//! lost by dropping the fragment's tree nodes.
//!
//! [`write_image_page`] builds the image-only fallback fragment used by the
//! keep-original failure policy: the rendered page bitmap on a page of the
//! original size, with no text layer.

use crate::error::SearchifyError;
use image::DynamicImage;
use lopdf::{dictionary, Document, Object, ObjectId};
use std::path::Path;
use tracing::debug;

/// Incrementally merges one-page PDF fragments into a single document.
pub struct PdfMerger {
    document: Document,
    page_ids: Vec<ObjectId>,
    next_id: u32,
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            document: Document::with_version("1.5"),
            page_ids: Vec::new(),
            next_id: 1,
        }
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append every page of the PDF at `path`, in its internal order.
    ///
    /// Errors are returned as a plain detail string; a bad fragment is a
    /// page-scoped problem for the caller, not a job-level one.
    pub fn append_file(&mut self, path: &Path) -> Result<usize, String> {
        let mut fragment = Document::load(path).map_err(|e| e.to_string())?;

        fragment.renumber_objects_with(self.next_id);
        self.next_id = fragment.max_id + 1;

        let pages = fragment.get_pages();
        if pages.is_empty() {
            return Err("fragment contains no pages".to_string());
        }
        let appended = pages.len();

        for (id, object) in fragment.objects.into_iter() {
            // The fragment's own catalog and page-tree nodes are replaced by
            // the ones built in `write`.
            if let Object::Dictionary(ref dict) = object {
                if let Ok(Object::Name(name)) = dict.get(b"Type") {
                    if name == b"Catalog" || name == b"Pages" {
                        continue;
                    }
                }
            }
            self.document.objects.insert(id, object);
        }
        self.document.max_id = self.next_id - 1;

        for (_, page_id) in pages {
            self.page_ids.push(page_id);
        }

        debug!("appended {appended} page(s) from {}", path.display());
        Ok(appended)
    }

    /// Build the page tree and catalog, then write the merged PDF to `path`.
    pub fn write(mut self, path: &Path) -> Result<usize, SearchifyError> {
        if self.page_ids.is_empty() {
            return Err(SearchifyError::MergeWriteFailed {
                path: path.to_path_buf(),
                detail: "no pages to write".to_string(),
            });
        }

        let pages_id = self.document.new_object_id();
        for &page_id in &self.page_ids {
            if let Ok(Object::Dictionary(dict)) = self.document.get_object_mut(page_id) {
                dict.set("Parent", pages_id);
            }
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();
        let count = self.page_ids.len();
        self.document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
            }),
        );

        let catalog_id = self.document.new_object_id();
        self.document.objects.insert(
            catalog_id,
            Object::Dictionary(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            }),
        );
        self.document.trailer.set("Root", catalog_id);

        self.document.compress();
        self.document
            .save(path)
            .map_err(|e| SearchifyError::MergeWriteFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        debug!("merged PDF written to {} ({count} pages)", path.display());
        Ok(count)
    }
}

/// Write a one-page, image-only PDF for a page whose OCR failed.
///
/// The page is sized so the bitmap, rendered at `zoom` × 72 DPI, fills it
/// exactly — the fallback page matches the original page dimensions.
pub fn write_image_page(image: &DynamicImage, zoom: f32, path: &Path) -> Result<(), String> {
    use printpdf::{
        Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
        RawImageFormat, XObjectTransform,
    };

    let dpi = 72.0 * zoom;
    let width_mm = image.width() as f32 / dpi * 25.4;
    let height_mm = image.height() as f32 / dpi * 25.4;

    let rgb = image.to_rgb8();
    let raw = RawImage {
        pixels: RawImageData::U8(rgb.into_raw()),
        width: image.width() as usize,
        height: image.height() as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };

    let mut doc = PdfDocument::new("Scanned page");
    let xobject_id = doc.add_image(&raw);

    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: Some(1.0),
            scale_y: Some(1.0),
            dpi: Some(dpi),
            rotate: None,
        },
    }];

    let page = PdfPage::new(Mm(width_mm), Mm(height_mm), ops);
    doc.with_pages(vec![page]);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    std::fs::write(path, &bytes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    /// Author a minimal one-page PDF with a distinguishable MediaBox width.
    fn one_page_pdf(path: &Path, width: i64) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(792),
            ],
            "Contents" => content_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1_i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("write test fragment");
    }

    fn media_box_width(doc: &Document, page_id: ObjectId) -> i64 {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        media_box[2].as_i64().unwrap()
    }

    #[test]
    fn fragments_merge_in_append_order() {
        let dir = tempfile::tempdir().unwrap();
        let frag_a = dir.path().join("a.pdf");
        let frag_b = dir.path().join("b.pdf");
        one_page_pdf(&frag_a, 100);
        one_page_pdf(&frag_b, 200);

        let mut merger = PdfMerger::new();
        assert_eq!(merger.append_file(&frag_a).unwrap(), 1);
        assert_eq!(merger.append_file(&frag_b).unwrap(), 1);
        assert_eq!(merger.page_count(), 2);

        let out = dir.path().join("merged.pdf");
        assert_eq!(merger.write(&out).unwrap(), 2);

        let merged = Document::load(&out).expect("merged PDF must load");
        let pages = merged.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(media_box_width(&merged, pages[&1]), 100);
        assert_eq!(media_box_width(&merged, pages[&2]), 200);
    }

    #[test]
    fn missing_fragment_is_an_append_error() {
        let mut merger = PdfMerger::new();
        assert!(merger
            .append_file(Path::new("/nonexistent/fragment.pdf"))
            .is_err());
        assert_eq!(merger.page_count(), 0);
    }

    #[test]
    fn writing_an_empty_merger_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.pdf");
        let err = PdfMerger::new().write(&out).unwrap_err();
        assert!(matches!(err, SearchifyError::MergeWriteFailed { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn image_fallback_page_is_a_loadable_single_page_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("fallback.pdf");

        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            144,
            288,
            image::Rgb([240u8, 240, 240]),
        ));
        write_image_page(&image, 2.0, &out).expect("fallback page");

        let doc = Document::load(&out).expect("fallback PDF must load");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn image_fallback_pages_can_be_merged() {
        let dir = tempfile::tempdir().unwrap();
        let frag = dir.path().join("img.pdf");
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            72,
            72,
            image::Rgb([10u8, 10, 10]),
        ));
        write_image_page(&image, 2.0, &frag).unwrap();

        let mut merger = PdfMerger::new();
        merger.append_file(&frag).unwrap();

        let out = dir.path().join("merged.pdf");
        assert_eq!(merger.write(&out).unwrap(), 1);
        assert_eq!(Document::load(&out).unwrap().get_pages().len(), 1);
    }
}

//! PDF text reconstruction from positioned fragments
//!
//! Content streams are walked with `lopdf` to collect every shown string together with the
//! origin of the text matrix in page space. Fragments are then reflowed top-to-bottom,
//! left-to-right, with a line break whenever the baseline moves by more than a tolerance.
//! Multi-column pages interleave; there is no layout analysis beyond that.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// TJ adjustments below this (in thousandths of an em) are read as a word gap
const TJ_SPACE_THRESHOLD: f32 = -250.0;

/// A piece of text shown at a position on the page
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// Affine matrix `[a b c d e f]` in PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`
    fn multiply(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let mut values = [0.0f32; 6];
        for (slot, operand) in values.iter_mut().zip(operands) {
            *slot = operand.as_float().ok()?;
        }
        Some(Matrix(values))
    }
}

/// Nesting limit for form XObjects drawn inside other forms
const MAX_FORM_DEPTH: usize = 8;

/// Fonts and XObjects visible to a content stream
struct ResourceScope<'a> {
    /// Font resource name to its text encoding, when lopdf can resolve one
    encodings: HashMap<Vec<u8>, Encoding<'a>>,
    /// `/XObject` dictionaries, searched in order
    xobjects: Vec<&'a Dictionary>,
}

impl<'a> ResourceScope<'a> {
    fn empty() -> Self {
        Self {
            encodings: HashMap::new(),
            xobjects: Vec::new(),
        }
    }

    /// Fonts (inherited through the page tree) and XObjects of a page
    fn for_page(doc: &'a Document, page_id: ObjectId) -> Self {
        let mut scope = Self::empty();

        if let Ok(fonts) = doc.get_page_fonts(page_id) {
            for (name, font) in fonts {
                scope.add_font(doc, name, font);
            }
        }

        if let Ok((inline, inherited)) = doc.get_page_resources(page_id) {
            let dicts = inline
                .into_iter()
                .chain(inherited.into_iter().filter_map(|id| doc.get_dictionary(id).ok()));
            for resources in dicts {
                if let Ok(xobjects) = resources
                    .get_deref(b"XObject", doc)
                    .and_then(Object::as_dict)
                {
                    scope.xobjects.push(xobjects);
                }
            }
        }

        scope
    }

    /// Scope of a form XObject's own `/Resources` dictionary
    fn for_resources(doc: &'a Document, resources: &'a Dictionary) -> Self {
        let mut scope = Self::empty();

        if let Ok(fonts) = resources.get_deref(b"Font", doc).and_then(Object::as_dict) {
            for (name, font) in fonts.iter() {
                if let Ok(font) = doc.dereference(font).and_then(|(_, f)| f.as_dict()) {
                    scope.add_font(doc, name.clone(), font);
                }
            }
        }
        if let Ok(xobjects) = resources.get_deref(b"XObject", doc).and_then(Object::as_dict) {
            scope.xobjects.push(xobjects);
        }

        scope
    }

    fn add_font(&mut self, doc: &'a Document, name: Vec<u8>, font: &'a Dictionary) {
        if !font.type_is(b"Font") {
            return;
        }
        match font.get_font_encoding(doc) {
            Ok(encoding) => {
                self.encodings.insert(name, encoding);
            }
            Err(e) => tracing::debug!(
                "No usable encoding for font {}: {}",
                String::from_utf8_lossy(&name),
                e
            ),
        }
    }
}

/// Graphics state saved by `q` and restored by `Q`
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    /// Selected font: index of the scope it resolved in, plus its resource name
    font: Option<(usize, Vec<u8>)>,
}

/// Text state tracked while walking a content stream
struct TextWalker<'a> {
    doc: Option<&'a Document>,
    scopes: Vec<ResourceScope<'a>>,
    state: GraphicsState,
    state_stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    leading: f32,
    fragments: Vec<TextFragment>,
}

impl<'a> TextWalker<'a> {
    fn new(doc: Option<&'a Document>, page_scope: ResourceScope<'a>) -> Self {
        Self {
            doc,
            scopes: vec![page_scope],
            state: GraphicsState {
                ctm: Matrix::IDENTITY,
                font: None,
            },
            state_stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            leading: 0.0,
            fragments: Vec::new(),
        }
    }

    /// Walker with no document behind it; strings decode without font information
    #[cfg(test)]
    fn detached() -> Self {
        Self::new(None, ResourceScope::empty())
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn show(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        let origin = self.text_matrix.multiply(&self.state.ctm);
        self.fragments
            .push(TextFragment::new(text, origin.0[4], origin.0[5]));
    }

    fn select_font(&mut self, name: &[u8]) {
        self.state.font = self
            .scopes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, scope)| scope.encodings.contains_key(name))
            .map(|(index, _)| (index, name.to_vec()));
    }

    /// Decode a shown string with the current font, falling back to raw bytes
    fn decode(&self, bytes: &[u8]) -> String {
        let encoding = self
            .state
            .font
            .as_ref()
            .and_then(|(index, name)| self.scopes.get(*index)?.encodings.get(name));

        match encoding.map(|encoding| Document::decode_text(encoding, bytes)) {
            Some(Ok(text)) => text
                .chars()
                .filter(|c| !c.is_control() || *c == '\t')
                .collect(),
            _ => decode_pdf_string(bytes),
        }
    }

    fn string_operand(&self, object: &Object) -> Option<String> {
        match object {
            Object::String(bytes, _) => Some(self.decode(bytes)),
            _ => None,
        }
    }

    fn run(&mut self, operations: &[Operation], depth: usize) {
        for operation in operations {
            if operation.operator == "Do" {
                if let Some(name) = operation.operands.first().and_then(|o| o.as_name().ok()) {
                    self.draw_form(name, depth);
                }
            } else {
                self.apply(&operation.operator, &operation.operands);
            }
        }
    }

    /// Walk a form XObject under the current CTM times its `/Matrix`
    fn draw_form(&mut self, name: &[u8], depth: usize) {
        let Some(doc) = self.doc else {
            return;
        };
        if depth >= MAX_FORM_DEPTH {
            tracing::debug!(
                "Form XObject nesting too deep, skipping {}",
                String::from_utf8_lossy(name)
            );
            return;
        }

        let stream = self
            .scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.xobjects.iter().copied())
            .find_map(|xobjects| xobjects.get_deref(name, doc).and_then(Object::as_stream).ok());
        let Some(stream) = stream else {
            return;
        };
        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Form".as_slice()) {
            return;
        }

        let operations = match stream
            .get_plain_content()
            .and_then(|raw| Content::decode(&raw))
        {
            Ok(content) => content.operations,
            Err(e) => {
                tracing::debug!(
                    "Unreadable form XObject {}: {}",
                    String::from_utf8_lossy(name),
                    e
                );
                return;
            }
        };

        let saved = self.state.clone();
        let saved_stack = self.state_stack.len();
        if let Some(form_matrix) = stream
            .dict
            .get(b"Matrix")
            .and_then(Object::as_array)
            .ok()
            .and_then(|values| Matrix::from_operands(values))
        {
            self.state.ctm = form_matrix.multiply(&self.state.ctm);
        }

        let own_scope = stream
            .dict
            .get_deref(b"Resources", doc)
            .and_then(Object::as_dict)
            .ok()
            .map(|resources| ResourceScope::for_resources(doc, resources));
        let pushed = own_scope.is_some();
        if let Some(scope) = own_scope {
            self.scopes.push(scope);
        }

        self.run(&operations, depth + 1);

        if pushed {
            self.scopes.pop();
        }
        self.state_stack.truncate(saved_stack);
        self.state = saved;
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let float = |i: usize| operands.get(i).and_then(|o| o.as_float().ok());

        match operator {
            "q" => self.state_stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.state_stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    self.select_font(name);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (float(0), float(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (float(0), float(1)) {
                    self.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "TL" => {
                if let Some(leading) = float(0) {
                    self.leading = leading;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(text) = operands.first().and_then(|o| self.string_operand(o)) {
                    self.show(text);
                }
            }
            "'" => {
                self.next_line();
                if let Some(text) = operands.first().and_then(|o| self.string_operand(o)) {
                    self.show(text);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(text) = operands.get(2).and_then(|o| self.string_operand(o)) {
                    self.show(text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut text = String::new();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&self.decode(bytes)),
                            other => {
                                if other.as_float().map_or(false, |n| n < TJ_SPACE_THRESHOLD) {
                                    text.push(' ');
                                }
                            }
                        }
                    }
                    self.show(text);
                }
            }
            _ => {}
        }
    }
}

/// Decode a string shown without a usable font encoding: UTF-16BE when it carries a BOM,
/// otherwise one char per byte
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes
        .iter()
        .map(|&b| b as char)
        .filter(|c| !c.is_control() || *c == '\t')
        .collect()
}

/// Collect positioned text fragments from one page, including text inside form XObjects
pub fn page_fragments(doc: &Document, page_id: ObjectId) -> Result<Vec<TextFragment>> {
    let raw = doc
        .get_page_content(page_id)
        .map_err(|e| Error::internal(format!("Failed to read page content: {}", e)))?;
    let content = Content::decode(&raw)
        .map_err(|e| Error::internal(format!("Failed to decode content stream: {}", e)))?;

    let mut walker = TextWalker::new(Some(doc), ResourceScope::for_page(doc, page_id));
    walker.run(&content.operations, 0);
    Ok(walker.fragments)
}

/// Reflow fragments into reading order
///
/// Sorted by descending y then ascending x (stable for exact ties). A line break is
/// inserted whenever consecutive fragments differ vertically by more than `tolerance`;
/// every fragment is followed by a single space.
pub fn reflow(mut fragments: Vec<TextFragment>, tolerance: f32) -> String {
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut text = String::new();
    let mut last_y: Option<f32> = None;

    for fragment in &fragments {
        if let Some(y) = last_y {
            if (fragment.y - y).abs() > tolerance {
                text.push('\n');
            }
        }
        text.push_str(&fragment.text);
        text.push(' ');
        last_y = Some(fragment.y);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream, StringFormat};

    fn lit(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    #[test]
    fn test_reflow_orders_top_to_bottom_left_to_right() {
        let fragments = vec![
            TextFragment::new("bottom", 50.0, 100.0),
            TextFragment::new("right", 300.0, 700.0),
            TextFragment::new("left", 50.0, 700.0),
        ];

        assert_eq!(reflow(fragments, 5.0), "left right \nbottom ");
    }

    #[test]
    fn test_reflow_within_tolerance_stays_on_line() {
        let fragments = vec![
            TextFragment::new("Article", 50.0, 700.0),
            TextFragment::new("3", 120.0, 697.0),
        ];

        let text = reflow(fragments, 5.0);
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_reflow_greater_y_precedes() {
        let fragments = vec![
            TextFragment::new("second", 10.0, 500.0),
            TextFragment::new("first", 400.0, 506.0),
        ];

        let text = reflow(fragments, 5.0);
        assert!(text.find("first").unwrap() < text.find("second").unwrap());
    }

    #[test]
    fn test_walker_tracks_td_and_tstar() {
        let mut walker = TextWalker::detached();
        walker.apply("BT", &[]);
        walker.apply("TL", &[Object::Real(14.0)]);
        walker.apply("Td", &[Object::Integer(72), Object::Integer(700)]);
        walker.apply("Tj", &[lit("Line one")]);
        walker.apply("T*", &[]);
        walker.apply("Tj", &[lit("Line two")]);
        walker.apply("ET", &[]);

        assert_eq!(walker.fragments.len(), 2);
        assert_eq!(walker.fragments[0].y, 700.0);
        assert_eq!(walker.fragments[1].y, 686.0);
        assert_eq!(walker.fragments[1].x, 72.0);
    }

    #[test]
    fn test_walker_applies_ctm() {
        let mut walker = TextWalker::detached();
        let cm = Operation::new(
            "cm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), 10.into(), 20.into()],
        );
        walker.apply("q", &[]);
        walker.apply(&cm.operator, &cm.operands);
        walker.apply("BT", &[]);
        walker.apply("Td", &[Object::Integer(5), Object::Integer(5)]);
        walker.apply("Tj", &[lit("shifted")]);
        walker.apply("ET", &[]);
        walker.apply("Q", &[]);

        assert_eq!(walker.fragments[0], TextFragment::new("shifted", 15.0, 25.0));
        assert_eq!(walker.state.ctm, Matrix::IDENTITY);
    }

    #[test]
    fn test_tj_array_kerning_gap() {
        let mut walker = TextWalker::detached();
        walker.apply("BT", &[]);
        walker.apply(
            "TJ",
            &[Object::Array(vec![
                lit("Hel"),
                Object::Integer(-20),
                lit("lo"),
                Object::Integer(-400),
                lit("world"),
            ])],
        );

        assert_eq!(walker.fragments[0].text, "Hello world");
    }

    #[test]
    fn test_decode_utf16_string() {
        let bytes = [0xFE, 0xFF, 0xC7, 0x04, 0xBC, 0x18];
        assert_eq!(decode_pdf_string(&bytes), "위반");
    }

    /// Single-page document; `resources` becomes the page's `/Resources`
    fn one_page(
        doc: &mut Document,
        resources: Dictionary,
        operations: Vec<Operation>,
    ) -> ObjectId {
        let pages_id = doc.new_object_id();
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        page_id
    }

    const KOREAN_CMAP: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0001> <C704>
<0002> <BC18>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

    #[test]
    fn test_identity_h_font_decoded_through_to_unicode() {
        let mut doc = Document::with_version("1.5");
        let cmap_id = doc.add_object(Stream::new(dictionary! {}, KOREAN_CMAP.as_bytes().to_vec()));
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "NanumGothic",
            "Encoding" => "Identity-H",
            "ToUnicode" => cmap_id,
        });
        let page_id = one_page(
            &mut doc,
            dictionary! { "Font" => dictionary! { "K1" => font_id } },
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["K1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(vec![0x00, 0x01, 0x00, 0x02], StringFormat::Hexadecimal)],
                ),
                Operation::new("ET", vec![]),
            ],
        );

        let fragments = page_fragments(&doc, page_id).unwrap();
        assert_eq!(fragments, vec![TextFragment::new("위반", 72.0, 700.0)]);
    }

    #[test]
    fn test_font_restored_by_q() {
        let mut doc = Document::with_version("1.5");
        let cmap_id = doc.add_object(Stream::new(dictionary! {}, KOREAN_CMAP.as_bytes().to_vec()));
        let korean_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "NanumGothic",
            "Encoding" => "Identity-H",
            "ToUnicode" => cmap_id,
        });
        let latin_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let page_id = one_page(
            &mut doc,
            dictionary! { "Font" => dictionary! { "F1" => latin_id, "K1" => korean_id } },
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("q", vec![]),
                Operation::new("Tf", vec!["K1".into(), 12.into()]),
                Operation::new("Q", vec![]),
                Operation::new("Tj", vec![lit("Article 3")]),
                Operation::new("ET", vec![]),
            ],
        );

        let fragments = page_fragments(&doc, page_id).unwrap();
        assert_eq!(fragments[0].text, "Article 3");
    }

    #[test]
    fn test_form_xobject_text_under_its_matrix() {
        let mut doc = Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let form_content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![5.into(), 10.into()]),
                Operation::new("Tj", vec![lit("Article 7 gifts")]),
                Operation::new("ET", vec![]),
            ],
        };
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 200.into(), 50.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 100.into(), 0.into()],
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            },
            form_content.encode().unwrap(),
        ));
        let page_id = one_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "X1" => form_id } },
            vec![
                Operation::new("q", vec![]),
                Operation::new("cm", vec![1.into(), 0.into(), 0.into(), 1.into(), 0.into(), 600.into()]),
                Operation::new("Do", vec!["X1".into()]),
                Operation::new("Q", vec![]),
            ],
        );

        let fragments = page_fragments(&doc, page_id).unwrap();
        assert_eq!(fragments, vec![TextFragment::new("Article 7 gifts", 105.0, 610.0)]);
    }

    #[test]
    fn test_image_xobject_ignored() {
        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
            },
            vec![0],
        ));
        let page_id = one_page(
            &mut doc,
            dictionary! { "XObject" => dictionary! { "Im1" => image_id } },
            vec![Operation::new("Do", vec!["Im1".into()])],
        );

        assert!(page_fragments(&doc, page_id).unwrap().is_empty());
    }
}

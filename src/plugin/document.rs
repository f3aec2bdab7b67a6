//! XML response documents.
//!
//! A [`Document`] is well-formed XML text, checked once at construction.
//! Plugins that need the tree call [`Document::edit`], which parses a fresh
//! tree, lets the closure mutate it and serializes the result into a new
//! `Document`. The input is never touched, so a step that fails halfway
//! leaves no trace in the document the pipeline carries forward.
//!
//! The parser does not accept document type declarations: a reply carrying
//! `<!DOCTYPE ...>` is `Malformed`, and the proxy answers it with `502`
//! whether or not any plugin is loaded.

use std::fmt;
use std::sync::Arc;

use sxd_document::dom::{self, ChildOfElement, ChildOfRoot, Element};
use sxd_document::{parser, writer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("cannot serialize document")]
    Write(#[from] std::io::Error),

    #[error("serialized document is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// An immutable, cheaply clonable XML document.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    xml: Arc<str>,
}

impl Document {
    /// Parse raw response bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::from_xml(std::str::from_utf8(bytes)?)
    }

    pub fn from_xml(xml: &str) -> Result<Self, DocumentError> {
        parse_package(xml)?;
        Ok(Self { xml: Arc::from(xml) })
    }

    pub fn as_str(&self) -> &str {
        &self.xml
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.xml.as_bytes().to_vec()
    }

    /// Build a new document by mutating a copy of this one's tree.
    pub fn edit<F>(&self, f: F) -> Result<Document, DocumentError>
    where
        F: FnOnce(dom::Document<'_>),
    {
        let package = parse_package(&self.xml)?;
        f(package.as_document());

        let mut out = Vec::with_capacity(self.xml.len());
        writer::format_document(&package.as_document(), &mut out)?;
        let xml = String::from_utf8(out)?;
        Ok(Document { xml: Arc::from(xml) })
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Document").field(&&*self.xml).finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}

fn parse_package(xml: &str) -> Result<sxd_document::Package, DocumentError> {
    parser::parse(xml).map_err(|e| DocumentError::Malformed(format!("{:?}", e)))
}

/// Every element of `doc` with the given local name, in document order.
pub fn elements_named<'d>(doc: &dom::Document<'d>, local_name: &str) -> Vec<Element<'d>> {
    fn walk<'d>(element: Element<'d>, local_name: &str, found: &mut Vec<Element<'d>>) {
        if element.name().local_part() == local_name {
            found.push(element);
        }
        for child in element.children() {
            if let ChildOfElement::Element(child) = child {
                walk(child, local_name, found);
            }
        }
    }

    let mut found = Vec::new();
    for child in doc.root().children() {
        if let ChildOfRoot::Element(element) = child {
            walk(element, local_name, &mut found);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            Document::parse(b"<Brands><Brand></Brands>"),
            Err(DocumentError::Malformed(_))
        ));
        assert!(matches!(
            Document::parse(&[0x3c, 0xff, 0xfe]),
            Err(DocumentError::NotUtf8(_))
        ));
    }

    #[test]
    fn test_doctype_is_rejected() {
        assert!(matches!(
            Document::parse(b"<!DOCTYPE Brands><Brands/>"),
            Err(DocumentError::Malformed(_))
        ));
        assert!(Document::parse(b"<?xml version=\"1.0\"?><Brands/>").is_ok());
    }

    #[test]
    fn test_edit_leaves_original_untouched() {
        let original = Document::from_xml("<Brands><Brand code=\"AA\"/></Brands>").unwrap();
        let edited = original
            .edit(|doc| {
                for brand in elements_named(&doc, "Brand") {
                    brand.set_attribute_value("code", "ZZ");
                }
            })
            .unwrap();

        assert!(original.as_str().contains("code=\"AA\""));
        assert!(edited.as_str().contains("ZZ"));
        assert!(!edited.as_str().contains("AA"));
    }

    #[test]
    fn test_elements_named_finds_nested() {
        let document =
            Document::from_xml("<R><Brand/><Group><Brand/><Other/></Group></R>").unwrap();
        let mut count = 0;
        document
            .edit(|doc| count = elements_named(&doc, "Brand").len())
            .unwrap();
        assert_eq!(count, 2);
    }
}

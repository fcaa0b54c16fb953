//! Transport envelope detection and wrapping
//!
//! The remote endpoint rejects both a double-wrapped document and a bare
//! one, so the detection predicate here is exact and conservative: a
//! document counts as enveloped only when its root element is named
//! `Envelope` and its prefix resolves, via an `xmlns` declaration on the
//! root element itself, to the SOAP 1.1 envelope namespace. Anything
//! ambiguous is classified bare and left for the remote side to reject
//! with a clear error.
//!
//! The shape is computed once, when the document is read, and carried as a
//! tag on [`Document`]; wrapping preserves the original root subtree
//! byte-for-byte.

use porelay_domain::constants::{CONNECTOR_NS, OPERATION_NAME, SOAP_ENVELOPE_NS};
use porelay_domain::{Document, DocumentShape, RelayError, Result};
use std::path::PathBuf;
use tracing::debug;

/// Root element of a document: qualified name plus the full start tag.
struct RootElement<'a> {
    qualified_name: &'a str,
    start_tag: &'a str,
    /// Byte offset of the start tag's `<`.
    offset: usize,
}

/// Read a document's content into a classified [`Document`].
///
/// # Errors
/// `RelayError::MalformedInput` if the content is not parseable as
/// structured markup at all (no root element, or an unclosed root).
pub fn classify_document(source_path: PathBuf, content: String) -> Result<Document> {
    let shape = detect_shape(&content)?;
    debug!(path = %source_path.display(), shape = ?shape, "classified input document");
    Ok(Document { source_path, content, shape })
}

/// Detect whether content already carries the transport envelope.
pub fn detect_shape(content: &str) -> Result<DocumentShape> {
    let root = find_root_element(content)?;
    root_close_end(content, &root)?;

    let (prefix, local) = split_qualified(root.qualified_name);
    if local != "Envelope" {
        return Ok(DocumentShape::Bare);
    }

    match xmlns_declaration(root.start_tag, prefix) {
        Some(ns) if ns == SOAP_ENVELOPE_NS => Ok(DocumentShape::Enveloped),
        _ => Ok(DocumentShape::Bare),
    }
}

/// Apply the envelope transformation.
///
/// Enveloped documents pass through unchanged (idempotent, byte-for-byte);
/// bare documents are wrapped in the fixed three-level structure with the
/// original root subtree embedded verbatim.
pub fn transform(document: &Document) -> Result<Document> {
    match document.shape {
        DocumentShape::Enveloped => {
            debug!(path = %document.source_path.display(), "document already enveloped");
            Ok(document.clone())
        }
        DocumentShape::Bare => {
            debug!(path = %document.source_path.display(), "wrapping document in transport envelope");
            let wrapped = wrap(&document.content)?;
            Ok(Document {
                source_path: document.source_path.clone(),
                content: wrapped,
                shape: DocumentShape::Enveloped,
            })
        }
    }
}

/// Wrap bare content in the transport envelope.
///
/// The embedded subtree runs from the root start tag through the root
/// close tag, untouched; any prolog (XML declaration, comments, DOCTYPE)
/// before the root is dropped, since the wrapper carries its own
/// declaration.
fn wrap(content: &str) -> Result<String> {
    let root = find_root_element(content)?;
    let close_end = root_close_end(content, &root)?;
    let subtree = &content[root.offset..close_end];

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <soapenv:Envelope xmlns:soapenv=\"{SOAP_ENVELOPE_NS}\"\n\
         \x20   xmlns:tns=\"{CONNECTOR_NS}\">\n\
         \x20   <soapenv:Header />\n\
         \x20   <soapenv:Body>\n\
         \x20       <tns:{OPERATION_NAME}>\n\
         {subtree}\n\
         \x20       </tns:{OPERATION_NAME}>\n\
         \x20   </soapenv:Body>\n\
         </soapenv:Envelope>"
    ))
}

/// Locate the root element, skipping the XML declaration, comments,
/// processing instructions and DOCTYPE.
fn find_root_element(content: &str) -> Result<RootElement<'_>> {
    let bytes = content.as_bytes();
    let len = bytes.len();
    let mut i = 0usize;

    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return Err(RelayError::MalformedInput("no root element found".to_string()));
        }
        if bytes[i] != b'<' {
            return Err(RelayError::MalformedInput(
                "content before the root element is not markup".to_string(),
            ));
        }

        let rest = &content[i..];
        if rest.starts_with("<?") {
            i += skip_past(rest, "?>", "unterminated processing instruction")?;
        } else if rest.starts_with("<!--") {
            i += skip_past(rest, "-->", "unterminated comment")?;
        } else if rest.starts_with("<!") {
            i += skip_doctype(rest)?;
        } else {
            break;
        }
    }

    // Parse the start tag.
    let name_start = i + 1;
    if name_start >= len || !is_name_start(bytes[name_start]) {
        return Err(RelayError::MalformedInput("invalid root element name".to_string()));
    }
    let mut j = name_start;
    while j < len && is_name_char(bytes[j]) {
        j += 1;
    }
    let qualified_name = &content[name_start..j];

    // Find the closing '>' of the start tag, respecting quoted values.
    let mut k = j;
    let mut quote: Option<u8> = None;
    while k < len {
        match (bytes[k], quote) {
            (b'"', None) => quote = Some(b'"'),
            (b'\'', None) => quote = Some(b'\''),
            (q, Some(open)) if q == open => quote = None,
            (b'>', None) => {
                return Ok(RootElement {
                    qualified_name,
                    start_tag: &content[i..=k],
                    offset: i,
                });
            }
            _ => {}
        }
        k += 1;
    }
    Err(RelayError::MalformedInput("unterminated root start tag".to_string()))
}

/// Byte offset one past the root element's close tag.
///
/// Also verifies that nothing but whitespace, comments and processing
/// instructions follows the root; a document that does not close its root
/// is not parseable as markup at all.
fn root_close_end(content: &str, root: &RootElement<'_>) -> Result<usize> {
    let start_tag_end = root.offset + root.start_tag.len();

    if root.start_tag.trim_end_matches('>').trim_end().ends_with('/') {
        check_trailing(content, start_tag_end)?;
        return Ok(start_tag_end);
    }

    let close_pat = format!("</{}", root.qualified_name);
    let rel = content[start_tag_end..].rfind(&close_pat).ok_or_else(|| {
        RelayError::MalformedInput(format!(
            "root element <{}> is never closed",
            root.qualified_name
        ))
    })?;
    let mut k = start_tag_end + rel + close_pat.len();
    let bytes = content.as_bytes();
    while k < bytes.len() && bytes[k].is_ascii_whitespace() {
        k += 1;
    }
    if k >= bytes.len() || bytes[k] != b'>' {
        return Err(RelayError::MalformedInput(format!(
            "root element <{}> is never closed",
            root.qualified_name
        )));
    }
    check_trailing(content, k + 1)?;
    Ok(k + 1)
}

/// Only whitespace, comments and processing instructions may follow the
/// root element.
fn check_trailing(content: &str, mut i: usize) -> Result<()> {
    let bytes = content.as_bytes();
    let len = bytes.len();
    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return Ok(());
        }
        let rest = &content[i..];
        if rest.starts_with("<!--") {
            i += skip_past(rest, "-->", "unterminated trailing comment")?;
        } else if rest.starts_with("<?") {
            i += skip_past(rest, "?>", "unterminated trailing processing instruction")?;
        } else {
            return Err(RelayError::MalformedInput(
                "unexpected content after the root element".to_string(),
            ));
        }
    }
}

/// Length of the construct at the start of `rest`, ending with `end`.
fn skip_past(rest: &str, end: &str, err: &str) -> Result<usize> {
    rest.find(end)
        .map(|pos| pos + end.len())
        .ok_or_else(|| RelayError::MalformedInput(err.to_string()))
}

/// Length of a DOCTYPE declaration, tolerating an internal subset.
fn skip_doctype(rest: &str) -> Result<usize> {
    let bytes = rest.as_bytes();
    let mut depth = 0i32;
    for (pos, b) in bytes.iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth -= 1,
            b'>' if depth == 0 => return Ok(pos + 1),
            _ => {}
        }
    }
    Err(RelayError::MalformedInput("unterminated DOCTYPE declaration".to_string()))
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || !b.is_ascii()
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b':') || !b.is_ascii()
}

/// Split `prefix:local` into its parts.
fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// Find the namespace bound to `prefix` (or the default namespace) among
/// the start tag's attributes. Returns `None` when unresolvable, which the
/// caller treats as bare.
fn xmlns_declaration(start_tag: &str, prefix: Option<&str>) -> Option<String> {
    let wanted = match prefix {
        Some(p) => format!("xmlns:{p}"),
        None => "xmlns".to_string(),
    };

    let bytes = start_tag.as_bytes();
    // Skip "<name".
    let mut i = 1usize;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }

    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' || bytes[i] == b'/' {
            return None;
        }

        let attr_start = i;
        while i < bytes.len() && bytes[i] != b'=' && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let attr_name = &start_tag[attr_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            // Attribute without a value; not well-formed, stop scanning.
            return None;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || (bytes[i] != b'"' && bytes[i] != b'\'') {
            return None;
        }
        let open = bytes[i];
        i += 1;
        let value_start = i;
        while i < bytes.len() && bytes[i] != open {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let value = &start_tag[value_start..i];
        i += 1;

        if attr_name == wanted {
            return Some(value.to_string());
        }
    }
    None
}

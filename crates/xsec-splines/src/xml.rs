//! XML spline libraries.
//!
//! A library is a flat list of splines under a single root element:
//!
//! ```text
//! <?xml version="1.0" encoding="ISO-8859-1"?>
//! <genie_xsec_spline_list version="2.00" uselog="1">
//! <spline name="{key}" nknots="{n}">
//!   <knot> <E> {x} </E> <xsec> {y} </xsec> </knot>
//!   ...
//! </spline>
//! ...
//! </genie_xsec_spline_list>
//! ```
//!
//! Libraries can be large, so they are read with a forward-only
//! `quick-xml` reader driven by an explicit state machine rather than
//! materialised as a tree. Numbers are written in shortest round-trip
//! exponent form, so a save followed by a load reproduces every knot
//! bit-for-bit.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info, warn};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::knots::KnotSpacing;
use crate::registry::{Provenance, SplineEntry, SplineRegistry};
use crate::spline::CubicSpline;

/// Name of the root element of a spline library.
pub const ROOT_TAG: &str = "genie_xsec_spline_list";
/// Format version written to the root element.
pub const FORMAT_VERSION: &str = "2.00";

const SPLINE_TAG: &[u8] = b"spline";
const KNOT_TAG: &[u8] = b"knot";
const X_TAG: &[u8] = b"E";
const Y_TAG: &[u8] = b"xsec";

/// Upper bound on buffer space reserved up front from a declared knot count.
const MAX_RESERVED_KNOTS: usize = 4096;

/// Outcome of loading a spline library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlStatus {
    Ok,
    /// The file does not exist or cannot be opened.
    NotFound,
    /// The document is malformed or ends prematurely.
    NotParsed,
    /// The document has no root element.
    EmptyDocument,
    /// The root element is not a spline library.
    InvalidRoot,
}

impl XmlStatus {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for XmlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::NotFound => "file not found",
            Self::NotParsed => "document could not be parsed",
            Self::EmptyDocument => "empty document",
            Self::InvalidRoot => "invalid root element",
        };
        f.write_str(s)
    }
}

/// Reasons a spline library fails to parse.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Document has no root element")]
    Empty,

    #[error("Invalid root element <{0}>, expected <genie_xsec_spline_list>")]
    InvalidRoot(String),

    #[error("Malformed spline library at byte {position}: {message}")]
    Malformed { position: u64, message: String },
}

impl XmlError {
    /// Status code reported for this failure.
    pub fn status(&self) -> XmlStatus {
        match self {
            Self::Empty => XmlStatus::EmptyDocument,
            Self::InvalidRoot(_) => XmlStatus::InvalidRoot,
            Self::Malformed { .. } => XmlStatus::NotParsed,
        }
    }
}

/// Contents of a parsed spline library.
#[derive(Debug, Clone)]
pub struct SplineLibrary {
    /// Value of the root `uselog` attribute.
    pub use_log: bool,
    /// Splines in document order.
    pub splines: Vec<(String, CubicSpline)>,
}

// ─────────────────────────────────────────────────────────────
// Reading
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingRoot,
    InList,
    InSpline,
    InKnot,
    AwaitingX,
    AwaitingY,
    Done,
}

/// Knots accumulated for the spline currently being read.
struct PendingSpline {
    name: String,
    declared: usize,
    xs: Vec<f64>,
    ys: Vec<f64>,
    x: Option<f64>,
    y: Option<f64>,
}

impl PendingSpline {
    fn new(name: String, declared: usize) -> Self {
        let reserve = declared.min(MAX_RESERVED_KNOTS);
        Self {
            name,
            declared,
            xs: Vec::with_capacity(reserve),
            ys: Vec::with_capacity(reserve),
            x: None,
            y: None,
        }
    }
}

struct LibraryParser<R> {
    reader: Reader<R>,
    state: State,
    use_log: bool,
    pending: Option<PendingSpline>,
    splines: Vec<(String, CubicSpline)>,
}

/// Parse a spline library from a buffered stream.
pub fn parse_library<R: BufRead>(source: R) -> Result<SplineLibrary, XmlError> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    LibraryParser {
        reader,
        state: State::AwaitingRoot,
        use_log: false,
        pending: None,
        splines: Vec::new(),
    }
    .run()
}

impl<R: BufRead> LibraryParser<R> {
    fn run(mut self) -> Result<SplineLibrary, XmlError> {
        let mut buf = Vec::new();
        loop {
            let event = self
                .reader
                .read_event_into(&mut buf)
                .map_err(|e| self.malformed(e.to_string()))?;
            match event {
                Event::Start(e) => self.on_start(&e, false)?,
                Event::Empty(e) => self.on_start(&e, true)?,
                Event::End(e) => self.on_end(e.name().as_ref())?,
                Event::Text(t) => {
                    let raw = self
                        .reader
                        .decoder()
                        .decode(&t)
                        .map_err(|e| self.malformed(e.to_string()))?
                        .into_owned();
                    let text = unescape(&raw).map_err(|e| self.malformed(e.to_string()))?;
                    self.on_text(text.trim())?;
                }
                Event::Eof => return self.finish(),
                _ => {}
            }
            buf.clear();
        }
    }

    fn on_start(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), XmlError> {
        let name = e.name();
        match (self.state, name.as_ref()) {
            (State::AwaitingRoot, tag) => {
                if tag != ROOT_TAG.as_bytes() {
                    return Err(XmlError::InvalidRoot(
                        String::from_utf8_lossy(tag).into_owned(),
                    ));
                }
                let version = self.attribute(e, "version")?.unwrap_or_default();
                let uselog = self.attribute(e, "uselog")?.unwrap_or_default();
                debug!("Spline library version = {}, uselog = {}", version, uselog);
                self.use_log = uselog.parse::<i64>().map(|v| v == 1).unwrap_or(false);
                self.state = if empty { State::Done } else { State::InList };
            }
            (State::InList, SPLINE_TAG) if !empty => {
                let spline_name = self
                    .attribute(e, "name")?
                    .ok_or_else(|| self.malformed("<spline> without a name".into()))?;
                let declared = match self.attribute(e, "nknots")? {
                    Some(n) => n.parse::<usize>().map_err(|_| {
                        self.malformed(format!("invalid nknots '{}' for {}", n, spline_name))
                    })?,
                    None => 0,
                };
                debug!("Loading spline: {}", spline_name);
                self.pending = Some(PendingSpline::new(spline_name, declared));
                self.state = State::InSpline;
            }
            (State::InSpline, KNOT_TAG) if !empty => {
                if let Some(p) = self.pending.as_mut() {
                    p.x = None;
                    p.y = None;
                }
                self.state = State::InKnot;
            }
            (State::InKnot, X_TAG) if !empty => self.state = State::AwaitingX,
            (State::InKnot, Y_TAG) if !empty => self.state = State::AwaitingY,
            (State::AwaitingX | State::AwaitingY, tag) => {
                return Err(self.malformed(format!(
                    "unexpected <{}> inside a knot value",
                    String::from_utf8_lossy(tag)
                )));
            }
            (State::Done, tag) => {
                return Err(self.malformed(format!(
                    "element <{}> after the root element",
                    String::from_utf8_lossy(tag)
                )));
            }
            (_, tag) => {
                warn!(
                    "Skipping unexpected element <{}>",
                    String::from_utf8_lossy(tag)
                );
                if !empty {
                    let mut skipped = Vec::new();
                    self.reader
                        .read_to_end_into(name, &mut skipped)
                        .map_err(|e| self.malformed(e.to_string()))?;
                }
            }
        }
        Ok(())
    }

    fn on_text(&mut self, text: &str) -> Result<(), XmlError> {
        if !matches!(self.state, State::AwaitingX | State::AwaitingY) {
            return Ok(());
        }
        let value = text
            .parse::<f64>()
            .map_err(|_| self.malformed(format!("invalid knot value '{}'", text)))?;
        if let Some(p) = self.pending.as_mut() {
            match self.state {
                State::AwaitingX => p.x = Some(value),
                _ => p.y = Some(value),
            }
        }
        Ok(())
    }

    fn on_end(&mut self, tag: &[u8]) -> Result<(), XmlError> {
        match (self.state, tag) {
            (State::AwaitingX, X_TAG) | (State::AwaitingY, Y_TAG) => self.state = State::InKnot,
            (State::InKnot, KNOT_TAG) => {
                let pending = self
                    .pending
                    .as_mut()
                    .ok_or_else(|| XmlError::Malformed {
                        position: 0,
                        message: "<knot> outside a spline".into(),
                    })?;
                match (pending.x, pending.y) {
                    (Some(x), Some(y)) => {
                        pending.xs.push(x);
                        pending.ys.push(y);
                    }
                    _ => {
                        let message = format!("knot without both <E> and <xsec> in {}", pending.name);
                        return Err(self.malformed(message));
                    }
                }
                self.state = State::InSpline;
            }
            (State::InSpline, SPLINE_TAG) => {
                if let Some(p) = self.pending.take() {
                    if p.xs.len() != p.declared {
                        warn!(
                            "Spline {} declares {} knots but contains {}",
                            p.name,
                            p.declared,
                            p.xs.len()
                        );
                    }
                    let spline = CubicSpline::new(p.xs, p.ys)
                        .map_err(|e| self.malformed(format!("spline {}: {}", p.name, e)))?;
                    self.splines.push((p.name, spline));
                }
                self.state = State::InList;
            }
            (State::InList, tag) if tag == ROOT_TAG.as_bytes() => self.state = State::Done,
            (state, tag) => {
                return Err(self.malformed(format!(
                    "unexpected </{}> in state {:?}",
                    String::from_utf8_lossy(tag),
                    state
                )));
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<SplineLibrary, XmlError> {
        match self.state {
            State::Done => Ok(SplineLibrary {
                use_log: self.use_log,
                splines: self.splines,
            }),
            State::AwaitingRoot => Err(XmlError::Empty),
            _ => Err(self.malformed("document ends before the root element is closed".into())),
        }
    }

    fn attribute(&self, e: &BytesStart<'_>, name: &str) -> Result<Option<String>, XmlError> {
        let Some(attr) = e
            .try_get_attribute(name)
            .map_err(|err| self.malformed(err.to_string()))?
        else {
            return Ok(None);
        };
        let raw = self
            .reader
            .decoder()
            .decode(&attr.value)
            .map_err(|err| self.malformed(err.to_string()))?;
        let value = unescape(&raw).map_err(|err| self.malformed(err.to_string()))?;
        Ok(Some(value.trim().to_string()))
    }

    fn malformed(&self, message: String) -> XmlError {
        XmlError::Malformed {
            position: self.reader.buffer_position() as u64,
            message,
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Writing
// ─────────────────────────────────────────────────────────────

/// Encode as ISO-8859-1. Characters outside Latin-1, and the C1 control
/// range that decoders commonly remap, become character references.
fn to_latin1(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c as u32 {
            0..=0x7F | 0xA0..=0xFF => out.push(c as u32 as u8),
            code => out.extend_from_slice(format!("&#{};", code).as_bytes()),
        }
    }
    out
}

fn spline_block(key: &str, spline: &CubicSpline) -> String {
    use std::fmt::Write as _;

    let mut block = String::with_capacity(64 * (spline.len() + 1));
    let _ = writeln!(
        block,
        "<spline name=\"{}\" nknots=\"{}\">",
        escape(key),
        spline.len()
    );
    for (x, y) in spline.knots() {
        let _ = writeln!(block, "  <knot> <E> {:e} </E> <xsec> {:e} </xsec> </knot>", x, y);
    }
    block.push_str("</spline>\n\n");
    block
}

impl SplineRegistry {
    /// Write the registry as a spline library.
    ///
    /// Entries loaded from a file are skipped unless `include_loaded` is set,
    /// so a session can export only what it computed.
    pub fn write_xml<W: Write>(&self, mut out: W, include_loaded: bool) -> io::Result<()> {
        let uselog = if self.defaults().use_log { 1 } else { 0 };
        write!(out, "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n\n")?;
        write!(out, "<!-- generated by xsec-splines {} -->\n\n", env!("CARGO_PKG_VERSION"))?;
        write!(
            out,
            "<{} version=\"{}\" uselog=\"{}\">\n\n",
            ROOT_TAG, FORMAT_VERSION, uselog
        )?;

        for (key, entry) in self.snapshot() {
            if entry.provenance == Provenance::Loaded && !include_loaded {
                continue;
            }
            out.write_all(&to_latin1(&spline_block(&key, &entry.spline)))?;
        }

        writeln!(out, "</{}>", ROOT_TAG)?;
        out.flush()
    }

    /// Save the registry to `path`. Failures are logged, not returned.
    pub fn save_as_xml(&self, path: impl AsRef<Path>, include_loaded: bool) {
        let path = path.as_ref();
        info!("Saving spline list as XML in file: {}", path.display());

        let file = match File::create(path) {
            Ok(file) => file,
            Err(e) => {
                error!("Couldn't create file {}: {}", path.display(), e);
                return;
            }
        };
        if let Err(e) = self.write_xml(BufWriter::new(file), include_loaded) {
            error!("Failed writing splines to {}: {}", path.display(), e);
        }
    }

    /// Load splines from a library stream.
    ///
    /// With `keep` the loaded splines are added to the existing ones (an
    /// existing key wins over a loaded one); without it the registry is
    /// reset to exactly the file's contents. The registry is only touched
    /// once the whole document has parsed.
    pub fn read_xml<R: BufRead>(&self, source: R, keep: bool) -> XmlStatus {
        let library = match parse_library(source) {
            Ok(library) => library,
            Err(e) => {
                error!("{}", e);
                return e.status();
            }
        };

        self.set_spacing(KnotSpacing::from_use_log(library.use_log));
        let count = library.splines.len();

        if keep {
            for (name, spline) in library.splines {
                if !self.insert(name.clone(), Arc::new(spline), Provenance::Loaded) {
                    warn!("Spline {} is already loaded - keeping the existing entry", name);
                }
            }
        } else {
            let mut entries = BTreeMap::new();
            for (name, spline) in library.splines {
                if entries.contains_key(&name) {
                    warn!("Duplicate spline {} in library - keeping the first", name);
                    continue;
                }
                entries.insert(
                    name,
                    SplineEntry {
                        spline: Arc::new(spline),
                        provenance: Provenance::Loaded,
                    },
                );
            }
            self.replace_all(entries);
        }

        info!("Loaded {} splines ({} in registry)", count, self.len());
        XmlStatus::Ok
    }

    /// Load splines from the library file at `path` (see [`Self::read_xml`]).
    pub fn load_from_xml(&self, path: impl AsRef<Path>, keep: bool) -> XmlStatus {
        let path = path.as_ref();
        info!("Loading splines from: {}", path.display());
        info!(
            "Option to keep pre-existing splines is switched {}",
            if keep { "ON" } else { "OFF" }
        );

        match File::open(path) {
            Ok(file) => self.read_xml(BufReader::new(file), keep),
            Err(e) => {
                error!("XML file could not be found! [{}]: {}", path.display(), e);
                XmlStatus::NotFound
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> Result<SplineLibrary, XmlError> {
        parse_library(doc.as_bytes())
    }

    #[test]
    fn test_parse_minimal_library() {
        let doc = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<genie_xsec_spline_list version="2.00" uselog="1">
<spline name="a/b/c" nknots="2">
  <knot> <E> 1 </E> <xsec> 0.5 </xsec> </knot>
  <knot> <E> 2 </E> <xsec> 1.5e0 </xsec> </knot>
</spline>
</genie_xsec_spline_list>"#;
        let lib = parse(doc).unwrap();
        assert!(lib.use_log);
        assert_eq!(lib.splines.len(), 1);
        assert_eq!(lib.splines[0].0, "a/b/c");
        assert_eq!(lib.splines[0].1.xs(), &[1.0, 2.0]);
        assert_eq!(lib.splines[0].1.ys(), &[0.5, 1.5]);
    }

    #[test]
    fn test_empty_root_is_an_empty_library() {
        let lib = parse(r#"<genie_xsec_spline_list version="2.00" uselog="0"/>"#).unwrap();
        assert!(!lib.use_log);
        assert!(lib.splines.is_empty());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(parse("").unwrap_err().status(), XmlStatus::EmptyDocument);
        assert_eq!(
            parse("<?xml version=\"1.0\"?>\n<!-- nothing -->\n").unwrap_err().status(),
            XmlStatus::EmptyDocument
        );
        assert_eq!(
            parse("<other_root/>").unwrap_err().status(),
            XmlStatus::InvalidRoot
        );
        assert_eq!(
            parse("<genie_xsec_spline_list uselog=\"1\"><spline name=\"k\" nknots=\"2\">")
                .unwrap_err()
                .status(),
            XmlStatus::NotParsed
        );
    }

    #[test]
    fn test_bad_values_are_not_parsed() {
        let doc = r#"<genie_xsec_spline_list uselog="0">
<spline name="k" nknots="2">
  <knot> <E> one </E> <xsec> 1 </xsec> </knot>
  <knot> <E> 2 </E> <xsec> 1 </xsec> </knot>
</spline></genie_xsec_spline_list>"#;
        assert_eq!(parse(doc).unwrap_err().status(), XmlStatus::NotParsed);

        let missing_y = r#"<genie_xsec_spline_list uselog="0">
<spline name="k" nknots="2">
  <knot> <E> 1 </E> </knot>
  <knot> <E> 2 </E> <xsec> 1 </xsec> </knot>
</spline></genie_xsec_spline_list>"#;
        assert_eq!(parse(missing_y).unwrap_err().status(), XmlStatus::NotParsed);
    }

    #[test]
    fn test_declared_count_larger_than_actual_uses_parsed_knots() {
        let doc = r#"<genie_xsec_spline_list uselog="0">
<spline name="k" nknots="1000000000">
  <knot> <E> 1 </E> <xsec> 1 </xsec> </knot>
  <knot> <E> 2 </E> <xsec> 4 </xsec> </knot>
  <knot> <E> 3 </E> <xsec> 9 </xsec> </knot>
</spline></genie_xsec_spline_list>"#;
        let lib = parse(doc).unwrap();
        assert_eq!(lib.splines[0].1.len(), 3);
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let doc = r#"<genie_xsec_spline_list uselog="1">
<metadata><author>someone</author></metadata>
<spline name="k" nknots="2">
  <knot> <E> 1 </E> <xsec> 1 </xsec> <note>ignored</note> </knot>
  <knot> <E> 2 </E> <xsec> 4 </xsec> </knot>
</spline></genie_xsec_spline_list>"#;
        let lib = parse(doc).unwrap();
        assert_eq!(lib.splines.len(), 1);
        assert_eq!(lib.splines[0].1.len(), 2);
    }

    #[test]
    fn test_latin1_encoding_of_keys() {
        assert_eq!(to_latin1("abc"), b"abc".to_vec());
        assert_eq!(to_latin1("\u{e9}"), vec![0xE9]);
        assert_eq!(to_latin1("\u{3bd}"), b"&#957;".to_vec());
    }

    #[test]
    fn test_spline_block_escapes_key() {
        let spline = CubicSpline::new(vec![1.0, 2.0], vec![0.0, 1.0]).unwrap();
        let block = spline_block("a<b>&\"c\"", &spline);
        assert!(block.starts_with("<spline name=\"a&lt;b&gt;&amp;&quot;c&quot;\" nknots=\"2\">"));
        assert!(block.contains("<knot> <E> 1e0 </E> <xsec> 0e0 </xsec> </knot>"));
    }
}

//! LibXML2 FFI backend
//!
//! Safe wrapper around libxml2 providing the [`SchemaParser`] contract for
//! both XSD and DTD grammars. The Rust XML ecosystem has no mature XSD
//! validator, so libxml2 remains the external parser of choice, driven
//! over direct FFI.
//!
//! ## Thread safety
//!
//! Per the libxml2 documentation (http://xmlsoft.org/threads.html):
//!
//! - Schema *parsing* is NOT thread-safe and is serialized behind the
//!   compiled-schema cache's write lock.
//! - Schema *validation* is thread-safe as long as each thread uses its own
//!   validation context; compiled schema structures are read-only.
//! - Error handlers installed with `xmlSetStructuredErrorFunc` live in
//!   per-thread global state; the DTD path additionally serializes behind a
//!   process-wide lock because DTD validity contexts only expose varargs
//!   callbacks and must fall back to that handler.

use std::collections::HashMap;
use std::ffi::CString;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once, RwLock};

use libc::{c_char, c_int, c_uchar, c_uint, c_void};

use crate::error::{InfraError, Result};
use crate::parser::{ParseOutcome, SchemaParser, SchemaSource};
use crate::sink::{Notice, NotificationSink, ParseFlow};

/// libxml2's parser and globals must be initialized exactly once; the init
/// functions themselves are not thread-safe.
static LIBXML2_INIT: Once = Once::new();

/// DTD validation reports through the thread-global structured handler, so
/// the whole read-parse-validate sequence is serialized.
static DTD_VALIDATION_LOCK: Mutex<()> = Mutex::new(());

/// Load external DTD subsets referenced from a DOCTYPE.
const XML_PARSE_DTDLOAD: c_int = 4;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDtd {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlValidCtxt {
    _private: [u8; 0],
}

/// Mirror of libxml2's xmlError.
#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    // Document parsing
    pub fn xmlReadFile(filename: *const c_char, encoding: *const c_char, options: c_int)
    -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlGetIntSubset(doc: *const XmlDoc) -> *mut XmlDtd;

    // Schema parsing
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaValidateFile(
        ctxt: *const XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_uint,
    ) -> c_int;
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        sherr: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );

    // DTD validation
    pub fn xmlParseDTD(external_id: *const c_uchar, system_id: *const c_uchar) -> *mut XmlDtd;
    pub fn xmlFreeDtd(dtd: *mut XmlDtd);
    pub fn xmlNewValidCtxt() -> *mut XmlValidCtxt;
    pub fn xmlFreeValidCtxt(ctxt: *mut XmlValidCtxt);
    pub fn xmlValidateDtd(ctxt: *mut XmlValidCtxt, doc: *mut XmlDoc, dtd: *mut XmlDtd) -> c_int;
    pub fn xmlValidateDocument(ctxt: *mut XmlValidCtxt, doc: *mut XmlDoc) -> c_int;

    // Per-thread structured error handler
    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);
}

/// Mutable state shared with the error trampoline during one parse call.
struct SinkState<'a> {
    sink: &'a mut dyn NotificationSink,
    aborted: bool,
    delivered: bool,
}

impl SinkState<'_> {
    fn deliver(&mut self, level: c_int, notice: Notice) {
        if self.aborted {
            return;
        }
        self.delivered = true;
        // xmlErrorLevel: 1 = warning, 2 = error, 3 = fatal. Anything
        // unclassified is treated as an error.
        let flow = match level {
            1 => self.sink.on_warning(notice),
            3 => self.sink.on_fatal(notice),
            _ => self.sink.on_error(notice),
        };
        if flow == ParseFlow::Abort {
            self.aborted = true;
        }
    }
}

/// Trampoline libxml2 calls for every reported problem.
unsafe extern "C" fn structured_notice_callback(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let state = unsafe { &mut *(user_data as *mut SinkState) };

    let (level, line, column, message) = unsafe {
        let msg_ptr = (*error).message;
        let message = if msg_ptr.is_null() {
            String::from("(no message)")
        } else {
            std::ffi::CStr::from_ptr(msg_ptr)
                .to_string_lossy()
                .trim()
                .to_string()
        };
        (
            (*error).level,
            (*error).line.max(0) as u32,
            (*error).int2.max(0) as u32,
            message,
        )
    };

    let notice = if line > 0 {
        Notice::at(message, line, column)
    } else {
        Notice::new(message)
    };
    state.deliver(level, notice);
}

/// Shared, immutable handle to a compiled XML schema.
///
/// libxml2 schema structures are read-only after parsing and safe to share
/// across threads; the Arc'd inner frees the grammar exactly once.
#[derive(Debug, Clone)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must be a live schema allocated by libxml2 that no other code
    /// will free.
    unsafe fn from_raw(ptr: *mut XmlSchema) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        Some(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xmlSchemaFree(self.ptr) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// libxml2-backed implementation of [`SchemaParser`].
///
/// Compiled XSD grammars are memoized per schema path for the lifetime of
/// the parser instance, so a batch sharing one schema compiles it once.
pub struct LibXml2Parser {
    compiled: RwLock<HashMap<PathBuf, XmlSchemaPtr>>,
}

impl LibXml2Parser {
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });
        LibXml2Parser {
            compiled: RwLock::new(HashMap::new()),
        }
    }

    /// Compile an XSD, reusing a previously compiled grammar for the same
    /// path. Double-checked under the write lock: schema parsing is the one
    /// libxml2 operation that must not run concurrently.
    fn compiled_schema(&self, path: &Path) -> Result<XmlSchemaPtr> {
        if let Some(schema) = self
            .compiled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
        {
            return Ok(schema.clone());
        }

        let mut compiled = self.compiled.write().unwrap_or_else(|e| e.into_inner());
        if let Some(schema) = compiled.get(path) {
            return Ok(schema.clone());
        }

        let bytes = std::fs::read(path).map_err(|e| InfraError::SchemaUnreadable {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        let schema = Self::parse_schema_from_memory(&bytes).ok_or_else(|| {
            InfraError::SchemaInvalid {
                path: path.to_path_buf(),
                details: "schema parse returned no grammar".to_string(),
            }
        })?;
        compiled.insert(path.to_path_buf(), schema.clone());
        Ok(schema)
    }

    fn parse_schema_from_memory(schema_data: &[u8]) -> Option<XmlSchemaPtr> {
        unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(
                schema_data.as_ptr() as *const c_char,
                schema_data.len() as c_int,
            );
            if parser_ctxt.is_null() {
                return None;
            }
            let schema_ptr = xmlSchemaParse(parser_ctxt);
            xmlSchemaFreeParserCtxt(parser_ctxt);
            XmlSchemaPtr::from_raw(schema_ptr)
        }
    }

    fn validate_against_xsd(
        &self,
        document: &Path,
        schema_path: &Path,
        sink: &mut dyn NotificationSink,
    ) -> Result<ParseOutcome> {
        let schema = self.compiled_schema(schema_path)?;
        let c_path = path_to_cstring(document)?;

        let mut state = SinkState {
            sink,
            aborted: false,
            delivered: false,
        };

        let result_code = unsafe {
            // Fresh validation context per document; contexts are not
            // reusable and not shareable across threads.
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(InfraError::ParserInternal { code: -1 });
            }
            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_notice_callback),
                &mut state as *mut SinkState as *mut c_void,
            );
            let code = xmlSchemaValidateFile(valid_ctxt, c_path.as_ptr(), 0);
            xmlSchemaFreeValidCtxt(valid_ctxt);
            code
        };

        finish_outcome(&mut state, result_code)
    }

    fn validate_against_dtd(
        &self,
        document: &Path,
        dtd_path: Option<&Path>,
        sink: &mut dyn NotificationSink,
    ) -> Result<ParseOutcome> {
        if let Some(path) = dtd_path {
            // Surface unreadable DTDs as a clean infrastructure failure
            // before touching libxml2.
            std::fs::metadata(path).map_err(|e| InfraError::SchemaUnreadable {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;
        }

        let c_doc = path_to_cstring(document)?;
        let c_dtd = dtd_path.map(path_to_cstring).transpose()?;

        let _guard = DTD_VALIDATION_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let mut state = SinkState {
            sink,
            aborted: false,
            delivered: false,
        };

        unsafe {
            xmlSetStructuredErrorFunc(
                &mut state as *mut SinkState as *mut c_void,
                Some(structured_notice_callback),
            );

            let doc = xmlReadFile(c_doc.as_ptr(), std::ptr::null(), XML_PARSE_DTDLOAD);
            if doc.is_null() {
                xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);
                // Fatal well-formedness breaks surface through the sink; a
                // silent null means the file itself was not usable.
                return if state.aborted {
                    Ok(ParseOutcome::Aborted)
                } else {
                    Err(InfraError::DocumentUnreadable {
                        path: document.to_path_buf(),
                        details: "document could not be parsed".to_string(),
                    })
                };
            }

            let outcome = (|| {
                let valid_ctxt = xmlNewValidCtxt();
                if valid_ctxt.is_null() {
                    return Err(InfraError::ParserInternal { code: -1 });
                }

                let result_code = match &c_dtd {
                    Some(c_dtd) => {
                        let dtd = xmlParseDTD(std::ptr::null(), c_dtd.as_ptr() as *const c_uchar);
                        if dtd.is_null() {
                            xmlFreeValidCtxt(valid_ctxt);
                            return Err(InfraError::SchemaInvalid {
                                path: dtd_path.map(Path::to_path_buf).unwrap_or_default(),
                                details: "DTD parse returned no grammar".to_string(),
                            });
                        }
                        let code = xmlValidateDtd(valid_ctxt, doc, dtd);
                        xmlFreeDtd(dtd);
                        code
                    }
                    None => {
                        if xmlGetIntSubset(doc).is_null() {
                            xmlFreeValidCtxt(valid_ctxt);
                            return Err(InfraError::SchemaNotLocated {
                                path: document.to_path_buf(),
                            });
                        }
                        xmlValidateDocument(valid_ctxt, doc)
                    }
                };
                xmlFreeValidCtxt(valid_ctxt);

                // xmlValidateDtd/Document return 1 for valid, 0 for invalid.
                finish_outcome(&mut state, if result_code == 1 { 0 } else { 1 })
            })();

            xmlFreeDoc(doc);
            xmlSetStructuredErrorFunc(std::ptr::null_mut(), None);
            outcome
        }
    }
}

impl Default for LibXml2Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaParser for LibXml2Parser {
    fn parse_and_validate(
        &self,
        document: &Path,
        schema: &SchemaSource,
        sink: &mut dyn NotificationSink,
    ) -> Result<ParseOutcome> {
        std::fs::metadata(document).map_err(|e| InfraError::DocumentUnreadable {
            path: document.to_path_buf(),
            details: e.to_string(),
        })?;

        match schema {
            SchemaSource::Xsd(path) => self.validate_against_xsd(document, path, sink),
            SchemaSource::Dtd(path) => self.validate_against_dtd(document, Some(path), sink),
            SchemaSource::InternalDtd => self.validate_against_dtd(document, None, sink),
        }
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let s = path.to_str().ok_or_else(|| InfraError::DocumentUnreadable {
        path: path.to_path_buf(),
        details: "path is not valid UTF-8".to_string(),
    })?;
    CString::new(s).map_err(|_| InfraError::DocumentUnreadable {
        path: path.to_path_buf(),
        details: "path contains an interior NUL byte".to_string(),
    })
}

/// Translate the validator's return code into a [`ParseOutcome`], covering
/// the edge where libxml2 reports a nonzero count without having routed a
/// single message through the callback.
fn finish_outcome(state: &mut SinkState<'_>, result_code: c_int) -> Result<ParseOutcome> {
    if state.aborted {
        return Ok(ParseOutcome::Aborted);
    }
    if result_code < 0 {
        return Err(InfraError::ParserInternal { code: result_code });
    }
    if result_code > 0 && !state.delivered {
        state.sink.on_error(Notice::new(
            "document failed validation but the parser supplied no details",
        ));
    }
    Ok(ParseOutcome::Completed)
}

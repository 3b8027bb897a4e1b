//! File identification engines.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256, Sha512};

use identifier_core::{ChecksumAlgorithm, Identification};

use crate::error::EngineError;

/// Bytes kept from the start of a file for signature matching.
const HEAD_SIZE: usize = 8 * 1024;

/// Read buffer used while hashing.
const BUFFER_SIZE: usize = 64 * 1024;

const UNKNOWN_MIMETYPE: &str = "application/octet-stream";

/// Identifies one file: format, checksums and technical properties.
///
/// Implementations are shared by all workers and must be safe to call
/// concurrently.
pub trait IdentificationEngine: Send + Sync {
    /// Identify the file at `path`.
    ///
    /// `actions` names the identification steps requested (for example
    /// `siegfried` or `xml`); engines ignore actions they do not implement.
    fn identify(
        &self,
        path: &Path,
        actions: &[String],
        algorithms: &[ChecksumAlgorithm],
    ) -> Result<Identification, EngineError>;
}

/// Parse checksum algorithm names as given on the command line.
pub fn parse_algorithms<S: AsRef<str>>(
    names: &[S],
) -> Result<Vec<ChecksumAlgorithm>, EngineError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref().trim();
            name.parse()
                .map_err(|_| EngineError::UnsupportedAlgorithm {
                    name: name.to_string(),
                })
        })
        .collect()
}

/// Built-in engine.
///
/// Streams the file once, feeding every requested digest. The mimetype comes
/// from the content signature, refined by the file extension when the
/// signature is generic. PRONOM ids are not produced.
#[derive(Debug, Clone, Default)]
pub struct BasicEngine;

impl BasicEngine {
    pub fn new() -> Self {
        Self
    }
}

enum Digester {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Digester {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            ChecksumAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
            ChecksumAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

impl IdentificationEngine for BasicEngine {
    fn identify(
        &self,
        path: &Path,
        actions: &[String],
        algorithms: &[ChecksumAlgorithm],
    ) -> Result<Identification, EngineError> {
        let mut file = File::open(path).map_err(|e| EngineError::io(path, e))?;

        let mut digesters: Vec<(ChecksumAlgorithm, Digester)> = algorithms
            .iter()
            .map(|&a| (a, Digester::new(a)))
            .collect();
        let mut head = Vec::with_capacity(HEAD_SIZE);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut size = 0u64;

        loop {
            let read = file.read(&mut buffer).map_err(|e| EngineError::io(path, e))?;
            if read == 0 {
                break;
            }
            let chunk = &buffer[..read];
            if head.len() < HEAD_SIZE {
                let take = (HEAD_SIZE - head.len()).min(read);
                head.extend_from_slice(&chunk[..take]);
            }
            for (_, digester) in &mut digesters {
                digester.update(chunk);
            }
            size += read as u64;
        }

        let inspect_xml = actions.iter().any(|a| a == "xml");
        let mimetype = detect_mimetype(path, &head, inspect_xml);
        let (kind, subtype) = mimetype
            .split_once('/')
            .map(|(k, s)| (k.to_string(), s.to_string()))
            .unwrap_or_default();
        let (width, height) = image_dimensions(&head);

        Ok(Identification {
            mimetype,
            pronom: String::new(),
            kind,
            subtype,
            size,
            checksum: digesters
                .into_iter()
                .map(|(a, d)| (a.to_string(), d.finalize()))
                .collect(),
            width,
            height,
            duration: 0,
        })
    }
}

fn detect_mimetype(path: &Path, head: &[u8], inspect_xml: bool) -> String {
    if head.is_empty() {
        return mimetype_from_extension(path).unwrap_or("text/plain").to_string();
    }
    if inspect_xml && looks_like_xml(head) {
        return "application/xml".to_string();
    }
    let sniffed = tree_magic_mini::from_u8(head);
    match sniffed {
        UNKNOWN_MIMETYPE | "text/plain" => mimetype_from_extension(path)
            .unwrap_or(sniffed)
            .to_string(),
        other => other.to_string(),
    }
}

fn looks_like_xml(head: &[u8]) -> bool {
    let text = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    let start = text
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(text.len());
    text[start..].starts_with(b"<?xml")
}

fn mimetype_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mimetype = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "md" => "text/markdown",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "json" => "application/json",
        "xml" | "xsd" | "xsl" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => return None,
    };
    Some(mimetype)
}

/// Pixel dimensions read from PNG and GIF headers.
fn image_dimensions(head: &[u8]) -> (u64, u64) {
    if head.len() >= 24 && head.starts_with(b"\x89PNG\r\n\x1a\n") {
        let width = u32::from_be_bytes([head[16], head[17], head[18], head[19]]);
        let height = u32::from_be_bytes([head[20], head[21], head[22], head[23]]);
        return (width as u64, height as u64);
    }
    if head.len() >= 10 && (head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a")) {
        let width = u16::from_le_bytes([head[6], head[7]]);
        let height = u16::from_le_bytes([head[8], head[9]]);
        return (width as u64, height as u64);
    }
    (0, 0)
}

use std::io::{Cursor, Read};
use std::panic;

use anyhow::{anyhow, Context};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{info, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use tokio::task;
use zip::ZipArchive;

use crate::config::{OCR_PROMPT, PREVIEW_CHARS};
use crate::models::file_context::{FileBlock, FileContext};
use crate::models::upload::{FileKind, FilePreview, UploadedFile};
use crate::services::llm_service::{GenerateRequest, TextGenerator};

pub const UNSUPPORTED_FORMAT: &str = "⚠️ Unsupported file format.";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Error reading PDF: {0}")]
    Pdf(String),

    #[error("Error reading DOCX: {0}")]
    Docx(String),
}

impl ExtractionError {
    /// Inline text that replaces the file's content in the context.
    pub fn warning(&self) -> String {
        format!("⚠️ {}", self)
    }
}

/// Text of every page, concatenated. The PDF decoder is known to panic on
/// some malformed inputs, so panics are reported as errors too.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(ExtractionError::Pdf(e.to_string())),
        Err(_) => Err(ExtractionError::Pdf("the document could not be decoded".to_string())),
    }
}

/// Paragraph texts of a Word document, one per line.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    read_docx(bytes).map_err(|e| ExtractionError::Docx(format!("{:#}", e)))
}

fn read_docx(bytes: &[u8]) -> anyhow::Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("not a DOCX container")?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("missing word/document.xml")?
        .read_to_string(&mut xml)
        .context("unreadable word/document.xml")?;
    let paragraphs = docx_paragraphs(&xml)?;
    Ok(paragraphs.join("\n").trim().to_string())
}

/// Elements whose paragraphs are not part of the body text: text box
/// content and the fallback copy of it.
fn is_detached(local_name: &[u8]) -> bool {
    matches!(local_name, b"txbxContent" | b"Fallback")
}

/// Collects the text runs of every body-level `<w:p>` in a WordprocessingML
/// document. Text boxes are skipped.
fn docx_paragraphs(xml: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_run = false;
    let mut in_text = false;
    let mut detached = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| anyhow!("malformed document.xml: {}", e))?;
        if detached > 0 {
            match event {
                Event::Start(e) if is_detached(e.local_name().as_ref()) => detached += 1,
                Event::End(e) if is_detached(e.local_name().as_ref()) => detached -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }
        match event {
            Event::Start(e) if is_detached(e.local_name().as_ref()) => detached = 1,
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current = Some(String::new()),
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if in_run => push_text(&mut current, "\t"),
                b"br" | b"cr" if in_run => push_text(&mut current, "\n"),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                b"r" => in_run = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                let raw = t.decode().map_err(|e| anyhow!("bad text encoding: {}", e))?;
                let text = quick_xml::escape::unescape(&raw).map_err(|e| anyhow!("bad escape: {}", e))?;
                push_text(&mut current, &text);
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(ch) = r.resolve_char_ref().map_err(|e| anyhow!("bad character reference: {}", e))? {
                    push_text(&mut current, ch.encode_utf8(&mut [0; 4]));
                } else {
                    let name = r.decode().map_err(|e| anyhow!("bad entity: {}", e))?;
                    if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                        push_text(&mut current, resolved);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}

fn push_text(paragraph: &mut Option<String>, text: &str) {
    if let Some(p) = paragraph.as_mut() {
        p.push_str(text);
    }
}

/// UTF-8 with invalid sequences replaced.
pub fn extract_plain_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Extraction that needs no model. `None` for images.
pub fn extract_local(kind: FileKind, bytes: &[u8]) -> Option<String> {
    let text = match kind {
        FileKind::Pdf => extract_pdf_text(bytes).unwrap_or_else(|e| e.warning()),
        FileKind::Docx => extract_docx_text(bytes).unwrap_or_else(|e| e.warning()),
        FileKind::Text => extract_plain_text(bytes),
        FileKind::Unsupported => UNSUPPORTED_FORMAT.to_string(),
        FileKind::Image => return None,
    };
    Some(text)
}

/// Text of one uploaded file. Images are transcribed by the model; the
/// other formats are decoded on the blocking pool.
pub async fn extract(file: &UploadedFile, generator: &dyn TextGenerator, model: &str) -> String {
    match file.kind() {
        FileKind::Image => {
            info!("Transcribing image {} with {}", file.name, model);
            generator
                .generate(GenerateRequest::image(model, OCR_PROMPT, &file.data))
                .await
        }
        kind => {
            let data = file.data.clone();
            match task::spawn_blocking(move || extract_local(kind, &data)).await {
                Ok(text) => text.unwrap_or_default(),
                Err(e) => {
                    warn!("Extraction task for {} failed: {}", file.name, e);
                    format!("⚠️ Error: {}", e)
                }
            }
        }
    }
}

pub fn preview(file: &UploadedFile, text: &str) -> FilePreview {
    let kind = file.kind();
    let (excerpt, data_url) = match kind {
        FileKind::Pdf => (None, Some(data_url("application/pdf", &file.data))),
        FileKind::Image => (None, Some(data_url(&file.mime_type, &file.data))),
        FileKind::Docx | FileKind::Text => (Some(text.chars().take(PREVIEW_CHARS).collect()), None),
        FileKind::Unsupported => (None, None),
    };
    FilePreview {
        name: file.name.clone(),
        icon: file.icon(),
        kind,
        excerpt,
        data_url,
    }
}

fn data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Extracts a whole upload batch into a fresh context. A file that fails
/// contributes its warning text; the rest of the batch is unaffected.
pub async fn extract_batch(
    files: &[UploadedFile],
    generator: &dyn TextGenerator,
    model: &str,
) -> (FileContext, Vec<FilePreview>) {
    let mut blocks = Vec::with_capacity(files.len());
    let mut previews = Vec::with_capacity(files.len());
    for file in files {
        let text = extract(file, generator, model).await;
        if text.starts_with("⚠️") {
            warn!("Extraction of {} produced: {}", file.name, text);
        }
        previews.push(preview(file, &text));
        blocks.push(FileBlock::new(file.name.clone(), text));
    }
    info!(
        "Loaded {} file(s): {}",
        blocks.len(),
        blocks.iter().map(|b| b.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    (FileContext::from_blocks(&blocks), previews)
}

//! Outbound message assembly
//!
//! Builds the RFC 5322 message handed to the Gmail API. MIME encoding is
//! done by `lettre`; this module decides the body text, the part layout and
//! the content type of each attachment.

use anyhow::{Context, Result};
use lettre::Message;
use lettre::address::{Address, Envelope};
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use log::{debug, warn};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::args::{OptionKey, ResolvedArguments, STDIN_SENTINEL};

/// Fallback type for anything we cannot classify
const OCTET_STREAM: &str = "application/octet-stream";

/// Extensions that denote a content encoding rather than a content type
const ENCODING_EXTENSIONS: &[&str] = &["gz", "bz2", "xz", "z", "br", "zst"];

/// Everything needed to build one outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub sender: String,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

/// Kind of a message part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Body,
    Attachment,
}

/// Summary of one part of an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSummary {
    pub kind: PartKind,
    pub content_type: String,
    pub filename: Option<String>,
}

/// A built message ready to be sent
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    message: Message,
    parts: Vec<PartSummary>,
}

impl OutboundMessage {
    /// Parts in order: the body first, then one per attachment
    pub fn parts(&self) -> &[PartSummary] {
        &self.parts
    }

    /// Whether the message was built as `multipart/mixed`
    pub fn is_multipart(&self) -> bool {
        self.parts.len() > 1
    }

    /// The formatted RFC 5322 message
    pub fn formatted(&self) -> Vec<u8> {
        self.message.formatted()
    }
}

impl Draft {
    /// Assemble the message, reading every attachment from disk
    ///
    /// Recipient lists are written to the headers as given. Any unreadable
    /// attachment fails the whole message.
    pub fn build(&self) -> Result<OutboundMessage> {
        let from: Mailbox = self
            .sender
            .parse()
            .with_context(|| format!("Invalid sender address: {}", self.sender))?;
        let envelope = self.envelope(&from)?;
        let builder = Message::builder()
            .from(from)
            .subject(self.subject.as_str())
            .envelope(envelope);

        let mut parts = vec![PartSummary {
            kind: PartKind::Body,
            content_type: "text/plain; charset=utf-8".to_string(),
            filename: None,
        }];

        let mut message = if self.attachments.is_empty() {
            builder
                .header(ContentType::TEXT_PLAIN)
                .body(self.body.clone())
                .context("Failed to build message")?
        } else {
            let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
            for path in &self.attachments {
                let (part, summary) = attachment_part(path)?;
                multipart = multipart.singlepart(part);
                parts.push(summary);
            }
            builder
                .multipart(multipart)
                .context("Failed to build multipart message")?
        };

        // The Gmail API reads recipients, Bcc included, from the headers
        let recipients = [
            ("To", Some(self.to.as_str())),
            ("Cc", self.cc.as_deref()),
            ("Bcc", self.bcc.as_deref()),
        ];
        let headers = message.headers_mut();
        for (name, value) in recipients {
            if let Some(list) = value.and_then(recipient_list) {
                headers.insert_raw(HeaderValue::new(HeaderName::new_from_ascii_str(name), list));
            }
        }

        Ok(OutboundMessage { message, parts })
    }

    /// Best-effort SMTP envelope
    ///
    /// Entries lettre cannot parse are left out. The envelope is never used
    /// for delivery, so a list with no parseable address falls back to the
    /// sender.
    fn envelope(&self, from: &Mailbox) -> Result<Envelope> {
        let lists = [
            Some(self.to.as_str()),
            self.cc.as_deref(),
            self.bcc.as_deref(),
        ];
        let mut recipients: Vec<Address> = lists
            .into_iter()
            .flatten()
            .flat_map(|list| list.split(','))
            .filter_map(|entry| entry.trim().parse::<Mailbox>().ok())
            .map(|mailbox| mailbox.email)
            .collect();
        if recipients.is_empty() {
            debug!("No parseable recipient address in {:?}", self.to);
            recipients.push(from.email.clone());
        }
        Envelope::new(Some(from.email.clone()), recipients)
            .context("Failed to build message envelope")
    }
}

/// A recipient list as written to its header
///
/// The list is otherwise passed through untouched; only surrounding
/// whitespace and stray leading or trailing commas are dropped.
fn recipient_list(value: &str) -> Option<String> {
    let list = value.trim_matches(|c: char| c == ',' || c.is_whitespace());
    (!list.is_empty()).then(|| list.to_string())
}

fn attachment_part(path: &Path) -> Result<(SinglePart, PartSummary)> {
    let data =
        fs::read(path).with_context(|| format!("Failed to read attachment: {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());

    let mime = guess_content_type(path);
    let content_type = ContentType::parse(mime)
        .with_context(|| format!("Invalid content type {} for {}", mime, path.display()))?;

    let part = Attachment::new(filename.clone()).body(data, content_type);
    let summary = PartSummary {
        kind: PartKind::Attachment,
        content_type: mime.to_string(),
        filename: Some(filename),
    };
    Ok((part, summary))
}

/// Best-effort MIME type from a file name
///
/// Compressed files (`.gz`, `.bz2`, ...) are reported as
/// `application/octet-stream` since the wrapped type does not describe the
/// bytes being sent.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if ENCODING_EXTENSIONS.contains(&ext.as_str()) {
        return OCTET_STREAM;
    }

    match ext.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "csv" => "text/csv",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "md" => "text/markdown",
        "ics" => "text/calendar",
        "xml" => "text/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "tar" => "application/x-tar",
        _ => OCTET_STREAM,
    }
}

/// Compose the message body
///
/// Pieces are taken in order: the literal message, the message file (or
/// standard input when the file is `-`), then the signature file.
pub fn compose_body(args: &ResolvedArguments, stdin: &mut dyn Read) -> Result<String> {
    let mut pieces = Vec::with_capacity(3);

    if let Some(message) = args.message.as_deref().filter(|m| !m.is_empty()) {
        pieces.push(message.to_string());
    }

    if args.message_from_stdin() {
        let mut text = String::new();
        stdin
            .read_to_string(&mut text)
            .context("Failed to read message from standard input")?;
        pieces.push(text);
    } else if let Some(path) = args.path(OptionKey::MessageFile) {
        pieces.push(read_text(path, "message")?);
    }

    if let Some(path) = args.path(OptionKey::SignatureFile) {
        pieces.push(read_text(path, "signature")?);
    }

    let mut body = String::new();
    for piece in pieces {
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(&piece);
    }
    Ok(body)
}

/// Message typed on standard input with its own header lines
///
/// The first line holds the recipients, the second the subject and the rest
/// is the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadedInput {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl HeadedInput {
    /// Read the whole of `stdin` and split off the header lines
    pub fn read(stdin: &mut dyn Read) -> Result<Self> {
        let mut text = String::new();
        stdin
            .read_to_string(&mut text)
            .context("Failed to read message from standard input")?;

        let mut rest = text.as_str();
        let mut header_line = || {
            let (line, tail) = rest.split_once('\n').unwrap_or((rest, ""));
            rest = tail;
            line.trim().to_string()
        };
        let to = header_line();
        let subject = header_line();
        Ok(Self {
            to,
            subject,
            body: rest.to_string(),
        })
    }

    /// Fill `to` and `subject` where still unset and take the body from
    /// standard input
    pub fn apply(&self, args: &ResolvedArguments) -> ResolvedArguments {
        let mut out = args.clone();
        if !args.is_set(OptionKey::To) && !self.to.is_empty() {
            out.to = Some(self.to.clone());
        }
        if !args.is_set(OptionKey::Subject) && !self.subject.is_empty() {
            out.subject = Some(self.subject.clone());
        }
        let message_file = args.path(OptionKey::MessageFile);
        if let Some(path) = message_file.filter(|_| !args.message_from_stdin()) {
            warn!(
                "Ignoring message file {} in favour of standard input",
                path.display()
            );
        }
        out.message_file = Some(PathBuf::from(STDIN_SENTINEL));
        out
    }
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} file: {}", what, path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn draft(attachments: Vec<PathBuf>) -> Draft {
        Draft {
            sender: "b@x.com".to_string(),
            to: "a@x.com".to_string(),
            cc: None,
            bcc: None,
            subject: "Hi".to_string(),
            body: "Hello".to_string(),
            attachments,
        }
    }

    #[test]
    fn test_single_part_message() {
        let message = draft(vec![]).build().unwrap();
        assert_eq!(message.parts().len(), 1);
        assert!(!message.is_multipart());

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: a@x.com"));
        assert!(raw.contains("From: b@x.com"));
        assert!(raw.contains("Subject: Hi"));
        assert!(raw.contains("Hello"));
        assert!(!raw.contains("multipart"));
    }

    #[test]
    fn test_attachments_add_parts() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        let image = dir.path().join("photo.png");
        std::fs::write(&notes, "some notes").unwrap();
        std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();

        let message = draft(vec![notes, image]).build().unwrap();
        let parts = message.parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].kind, PartKind::Body);
        assert_eq!(parts[1].filename.as_deref(), Some("notes.txt"));
        assert_eq!(parts[1].content_type, "text/plain");
        assert_eq!(parts[2].filename.as_deref(), Some("photo.png"));
        assert_eq!(parts[2].content_type, "image/png");

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("attachment"));
        assert!(raw.contains("notes.txt"));
        assert!(raw.contains("photo.png"));
    }

    #[test]
    fn test_unreadable_attachment_fails() {
        let err = draft(vec![PathBuf::from("/definitely/not/here.pdf")])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read attachment"));
    }

    #[test]
    fn test_comma_separated_recipients_and_bcc() {
        let mut d = draft(vec![]);
        d.to = "a@x.com, c@x.com".to_string();
        d.bcc = Some("hidden@x.com".to_string());
        let raw = String::from_utf8(d.build().unwrap().formatted()).unwrap();
        assert!(raw.contains("c@x.com"));
        assert!(raw.contains("hidden@x.com"));
    }

    #[test]
    fn test_recipient_lists_pass_through() {
        let mut d = draft(vec![]);
        d.to = "a@x.com,".to_string();
        let raw = String::from_utf8(d.build().unwrap().formatted()).unwrap();
        assert!(raw.contains("To: a@x.com\r\n"));

        d.to = "undisclosed-recipients:;".to_string();
        d.cc = Some(" , ".to_string());
        let raw = String::from_utf8(d.build().unwrap().formatted()).unwrap();
        assert!(raw.contains("To: undisclosed-recipients:;"));
        assert!(!raw.contains("Cc:"));
    }

    #[test]
    fn test_recipient_list_trimming() {
        assert_eq!(
            recipient_list(" a@x.com, b@x.com ,"),
            Some("a@x.com, b@x.com".to_string())
        );
        assert_eq!(recipient_list(",,"), None);
        assert_eq!(recipient_list(""), None);
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a.PDF")), "application/pdf");
        assert_eq!(guess_content_type(Path::new("song.mp3")), "audio/mpeg");
        assert_eq!(guess_content_type(Path::new("data.weird")), OCTET_STREAM);
        assert_eq!(guess_content_type(Path::new("Makefile")), OCTET_STREAM);
        assert_eq!(guess_content_type(Path::new("notes.txt.gz")), OCTET_STREAM);
        assert_eq!(
            guess_content_type(Path::new("backup.tar.bz2")),
            OCTET_STREAM
        );
    }

    #[test]
    fn test_unknown_extension_attachment_builds() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("blob.xyz");
        std::fs::write(&blob, [0u8, 1, 2, 3]).unwrap();

        let message = draft(vec![blob]).build().unwrap();
        assert_eq!(message.parts()[1].content_type, OCTET_STREAM);
    }

    #[test]
    fn test_compose_body_order() {
        let dir = tempfile::tempdir().unwrap();
        let body = dir.path().join("body.txt");
        let sig = dir.path().join("sig.txt");
        std::fs::write(&body, "From file\n").unwrap();
        std::fs::write(&sig, "-- \nMe\n").unwrap();

        let args = ResolvedArguments::new()
            .with_message("Literal")
            .with_message_file(&body)
            .with_signature_file(&sig);
        let text = compose_body(&args, &mut Cursor::new(Vec::new())).unwrap();
        assert_eq!(text, "Literal\nFrom file\n-- \nMe\n");
    }

    #[test]
    fn test_compose_body_from_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let sig = dir.path().join("sig.txt");
        std::fs::write(&sig, "-- \nMe").unwrap();

        let args = ResolvedArguments::new()
            .with_message_file("-")
            .with_signature_file(&sig);
        let mut stdin = Cursor::new(b"line1\nline2\n".to_vec());
        let text = compose_body(&args, &mut stdin).unwrap();
        assert_eq!(text, "line1\nline2\n-- \nMe");
    }

    #[test]
    fn test_headed_input_split() {
        let text = "a@x.com, c@x.com\nWeekly report \nline1\nline2\n";
        let mut stdin = Cursor::new(text.as_bytes().to_vec());
        let input = HeadedInput::read(&mut stdin).unwrap();
        assert_eq!(input.to, "a@x.com, c@x.com");
        assert_eq!(input.subject, "Weekly report");
        assert_eq!(input.body, "line1\nline2\n");
    }

    #[test]
    fn test_headed_input_short_stream() {
        let input = HeadedInput::read(&mut Cursor::new(b"a@x.com".to_vec())).unwrap();
        assert_eq!(input.to, "a@x.com");
        assert_eq!(input.subject, "");
        assert_eq!(input.body, "");
    }

    #[test]
    fn test_headed_input_fills_only_unset_fields() {
        let input = HeadedInput {
            to: "stdin@x.com".to_string(),
            subject: "From stdin".to_string(),
            body: "Body".to_string(),
        };
        let args = ResolvedArguments::new()
            .with_subject("Flag subject")
            .with_message_file("body.txt");
        let applied = input.apply(&args);

        assert_eq!(applied.to.as_deref(), Some("stdin@x.com"));
        assert_eq!(applied.subject.as_deref(), Some("Flag subject"));
        assert!(applied.message_from_stdin());
    }

    #[test]
    fn test_compose_body_missing_file() {
        let args = ResolvedArguments::new().with_message_file("/no/such/body.txt");
        let err = compose_body(&args, &mut Cursor::new(Vec::new())).unwrap_err();
        assert!(err.to_string().contains("Failed to read message file"));
    }
}

//! Email message builder.
//!
//! A [`Message`] collects addresses, body parts and files as plain data and
//! turns them into a [`lettre::Message`] on [`Message::build`]. Address
//! strings use RFC 5322 form (`"Name" <user@host>` or a bare address); see
//! [`format_address`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, TimeZone, Utc};
use irhabi_core::AppError;
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Attachment, Mailbox, MultiPart, MultiPartBuilder, SinglePart};

/// Body transfer encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    QuotedPrintable,
    Base64,
    /// Body sent as-is. Headers are still encoded.
    Unencoded,
}

impl From<Encoding> for ContentTransferEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::QuotedPrintable => ContentTransferEncoding::QuotedPrintable,
            Encoding::Base64 => ContentTransferEncoding::Base64,
            Encoding::Unencoded => ContentTransferEncoding::EightBit,
        }
    }
}

#[derive(Debug, Clone)]
struct Part {
    content_type: String,
    body: String,
    encoding: Option<Encoding>,
}

#[derive(Debug, Clone)]
enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone)]
struct File {
    name: String,
    source: Source,
}

impl File {
    fn from_path(path: &Path, rename: Option<&str>) -> Self {
        let name = match rename {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        File {
            name,
            source: Source::Path(path.to_path_buf()),
        }
    }

    fn content(&self) -> Result<Vec<u8>, AppError> {
        match &self.source {
            Source::Bytes(bytes) => Ok(bytes.clone()),
            Source::Path(path) => std::fs::read(path)
                .map_err(|e| AppError::Mail(format!("Failed to read {}: {e}", path.display()))),
        }
    }

    fn content_type(&self) -> Result<ContentType, AppError> {
        parse_content_type(guess_content_type(&self.name))
    }
}

/// An email under construction.
#[derive(Debug, Clone, Default)]
pub struct Message {
    from: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    reply_to: Vec<String>,
    subject: String,
    date: Option<DateTime<Utc>>,
    parts: Vec<Part>,
    attachments: Vec<File>,
    embedded: Vec<File>,
    encoding: Encoding,
}

impl Message {
    /// An empty message using quoted-printable bodies.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty message using `encoding` for every part that does not set
    /// its own.
    pub fn with_encoding(encoding: Encoding) -> Self {
        Self {
            encoding,
            ..Self::default()
        }
    }

    pub fn from(&mut self, address: impl Into<String>) -> &mut Self {
        self.from = Some(address.into());
        self
    }

    /// Replace the recipients.
    pub fn to<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn cc<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cc = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn bcc<I, S>(&mut self, addresses: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bcc = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn reply_to(&mut self, address: impl Into<String>) -> &mut Self {
        self.reply_to = vec![address.into()];
        self
    }

    pub fn subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = subject.into();
        self
    }

    /// Set the `Date` header. Defaults to the send time.
    pub fn date(&mut self, date: DateTime<Utc>) -> &mut Self {
        self.date = Some(date);
        self
    }

    /// Replace every body part with a single one.
    pub fn set_body(&mut self, content_type: &str, body: impl Into<String>) -> &mut Self {
        self.parts.clear();
        self.add_alternative(content_type, body)
    }

    /// Append an alternative body part. Add the plain text part before the
    /// HTML one; clients prefer the last part they can display.
    pub fn add_alternative(&mut self, content_type: &str, body: impl Into<String>) -> &mut Self {
        self.parts.push(Part {
            content_type: content_type.to_string(),
            body: body.into(),
            encoding: None,
        });
        self
    }

    /// Like [`Message::add_alternative`] with an encoding for this part only.
    pub fn add_alternative_encoded(
        &mut self,
        content_type: &str,
        body: impl Into<String>,
        encoding: Encoding,
    ) -> &mut Self {
        self.parts.push(Part {
            content_type: content_type.to_string(),
            body: body.into(),
            encoding: Some(encoding),
        });
        self
    }

    /// Attach a file from disk, read when the message is built.
    pub fn attach(&mut self, path: impl AsRef<Path>, rename: Option<&str>) -> &mut Self {
        self.attachments.push(File::from_path(path.as_ref(), rename));
        self
    }

    /// Attach in-memory content under `name`.
    pub fn attach_bytes(&mut self, name: impl Into<String>, content: Vec<u8>) -> &mut Self {
        self.attachments.push(File {
            name: name.into(),
            source: Source::Bytes(content),
        });
        self
    }

    /// Embed an inline file; HTML parts reference it as `cid:<name>`.
    pub fn embed(&mut self, path: impl AsRef<Path>, rename: Option<&str>) -> &mut Self {
        self.embedded.push(File::from_path(path.as_ref(), rename));
        self
    }

    pub fn embed_bytes(&mut self, name: impl Into<String>, content: Vec<u8>) -> &mut Self {
        self.embedded.push(File {
            name: name.into(),
            source: Source::Bytes(content),
        });
        self
    }

    /// Clear addresses, subject, date, parts and files. The encoding is kept.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::with_encoding(self.encoding);
        self
    }

    pub fn recipients(&self) -> &[String] {
        &self.to
    }

    pub fn subject_line(&self) -> &str {
        &self.subject
    }

    /// Assemble the MIME tree: alternatives, wrapped with inline files in
    /// `multipart/related`, wrapped with attachments in `multipart/mixed`.
    pub fn build(&self) -> Result<lettre::Message, AppError> {
        let from = self
            .from
            .as_deref()
            .ok_or_else(|| AppError::Mail("Message has no sender".into()))?;
        if self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(AppError::Mail("Message has no recipients".into()));
        }

        let mut builder = lettre::Message::builder()
            .from(parse_mailbox(from)?)
            .subject(self.subject.clone());
        for address in &self.to {
            builder = builder.to(parse_mailbox(address)?);
        }
        for address in &self.cc {
            builder = builder.cc(parse_mailbox(address)?);
        }
        for address in &self.bcc {
            builder = builder.bcc(parse_mailbox(address)?);
        }
        for address in &self.reply_to {
            builder = builder.reply_to(parse_mailbox(address)?);
        }
        if let Some(date) = self.date {
            builder = builder.date(SystemTime::from(date));
        }

        let mut body = self.alternatives()?;

        if !self.embedded.is_empty() {
            let mut related = wrap(MultiPart::related(), body);
            for file in &self.embedded {
                related = related.singlepart(
                    Attachment::new_inline(file.name.clone())
                        .body(file.content()?, file.content_type()?),
                );
            }
            body = Node::Multi(related);
        }

        if !self.attachments.is_empty() {
            let mut mixed = wrap(MultiPart::mixed(), body);
            for file in &self.attachments {
                mixed = mixed.singlepart(
                    Attachment::new(file.name.clone()).body(file.content()?, file.content_type()?),
                );
            }
            body = Node::Multi(mixed);
        }

        let message = match body {
            Node::Single(part) => builder.singlepart(part),
            Node::Multi(multi) => builder.multipart(multi),
        };
        message.map_err(|e| AppError::Mail(e.to_string()))
    }

    fn alternatives(&self) -> Result<Node, AppError> {
        let mut parts = self
            .parts
            .iter()
            .map(|p| self.single(p))
            .collect::<Result<Vec<_>, _>>()?;

        match parts.len() {
            0 => Ok(Node::Single(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .header(ContentTransferEncoding::from(self.encoding))
                    .body(String::new()),
            )),
            1 => Ok(Node::Single(parts.remove(0))),
            _ => {
                let first = parts.remove(0);
                let multi = parts
                    .into_iter()
                    .fold(MultiPart::alternative().singlepart(first), |m, p| m.singlepart(p));
                Ok(Node::Multi(multi))
            }
        }
    }

    fn single(&self, part: &Part) -> Result<SinglePart, AppError> {
        let encoding = part.encoding.unwrap_or(self.encoding);
        Ok(SinglePart::builder()
            .header(parse_content_type(&part.content_type)?)
            .header(ContentTransferEncoding::from(encoding))
            .body(part.body.clone()))
    }
}

enum Node {
    Single(SinglePart),
    Multi(MultiPart),
}

fn wrap(builder: MultiPartBuilder, node: Node) -> MultiPart {
    match node {
        Node::Single(part) => builder.singlepart(part),
        Node::Multi(multi) => builder.multipart(multi),
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, AppError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| AppError::Mail(format!("Invalid address '{address}': {e}")))
}

fn parse_content_type(raw: &str) -> Result<ContentType, AppError> {
    let raw = if raw.starts_with("text/") && !raw.contains("charset") {
        format!("{raw}; charset=UTF-8")
    } else {
        raw.to_string()
    };
    ContentType::parse(&raw).map_err(|e| AppError::Mail(format!("Invalid content type '{raw}': {e}")))
}

fn guess_content_type(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Format an address and display name as an RFC 5322 mailbox. The name is
/// quoted with `\` and `"` escaped; an empty name yields the bare address.
pub fn format_address(address: &str, name: &str) -> String {
    if name.is_empty() {
        return address.to_string();
    }

    let mut out = String::with_capacity(name.len() + address.len() + 5);
    out.push('"');
    for c in name.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push_str("\" <");
    out.push_str(address);
    out.push('>');
    out
}

/// Format a date as an RFC 5322 date, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub fn format_date<Tz>(date: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    date.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn formatted(message: &Message) -> String {
        String::from_utf8(message.build().unwrap().formatted()).unwrap()
    }

    fn base() -> Message {
        let mut m = Message::new();
        m.from(format_address("noreply@example.com", "Example"))
            .to(["jane@example.com"])
            .subject("Hello");
        m
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address("a@b.com", ""), "a@b.com");
        assert_eq!(format_address("a@b.com", "Jane Doe"), "\"Jane Doe\" <a@b.com>");
        assert_eq!(
            format_address("a@b.com", "Jane \"JD\" Doe"),
            "\"Jane \\\"JD\\\" Doe\" <a@b.com>"
        );
        assert!(format_address("a@b.com", "Jane \"JD\" Doe").parse::<Mailbox>().is_ok());
    }

    #[test]
    fn test_format_date() {
        let tz = FixedOffset::west_opt(7 * 3600).unwrap();
        let date = tz.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(format_date(&date), "Mon, 02 Jan 2006 15:04:05 -0700");
    }

    #[test]
    fn test_single_part() {
        let mut m = base();
        m.set_body("text/plain", "Hi there");
        let raw = formatted(&m);

        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("To: jane@example.com"));
        assert!(raw.to_lowercase().contains("content-type: text/plain; charset=utf-8"));
        assert!(raw.contains("Content-Transfer-Encoding: quoted-printable"));
        assert!(!raw.contains("multipart"));
    }

    #[test]
    fn test_set_body_replaces_alternatives() {
        let mut m = base();
        m.add_alternative("text/plain", "one")
            .add_alternative("text/html", "<b>two</b>")
            .set_body("text/plain", "only");
        assert!(!formatted(&m).contains("multipart/alternative"));
    }

    #[test]
    fn test_alternatives_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let mut m = Message::with_encoding(Encoding::Base64);
        m.from("noreply@example.com")
            .to(["jane@example.com"])
            .cc(["john@example.com"])
            .subject("Report")
            .add_alternative("text/plain", "see attachment")
            .add_alternative("text/html", "<img src=\"cid:logo.png\">")
            .embed_bytes("logo.png", vec![0x89, b'P', b'N', b'G'])
            .attach(&path, Some("monthly.csv"));
        let raw = formatted(&m);

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Content-Transfer-Encoding: base64"));
        assert!(raw.contains("monthly.csv"));
        assert!(raw.contains("Cc: john@example.com"));
    }

    #[test]
    fn test_missing_attachment_fails() {
        let mut m = base();
        m.attach("/nonexistent/file.pdf", None);
        assert!(matches!(m.build(), Err(AppError::Mail(_))));
    }

    #[test]
    fn test_requires_sender_and_recipient() {
        let mut m = Message::new();
        m.to(["jane@example.com"]);
        assert!(m.build().is_err());

        let mut m = Message::new();
        m.from("noreply@example.com");
        assert!(m.build().is_err());

        let mut m = base();
        m.to(["not an address"]);
        assert!(m.build().is_err());
    }

    #[test]
    fn test_reset_keeps_encoding() {
        let mut m = Message::with_encoding(Encoding::Unencoded);
        m.from("a@b.com").subject("x").set_body("text/plain", "y");
        m.reset();

        assert!(m.recipients().is_empty());
        assert_eq!(m.subject_line(), "");
        assert_eq!(m.encoding, Encoding::Unencoded);
        assert!(m.from.is_none());
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("logo.PNG"), "image/png");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }
}

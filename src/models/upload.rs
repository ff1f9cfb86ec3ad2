//! Represents a single unit of content on its way to the object store.

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

/// One inbound file to be stored.
///
/// Owns the byte stream for its content; the stream is consumed exactly
/// once by the upload call and the item is not reused afterwards. The
/// declared size must match the stream (it drives transfer framing), and
/// the original file name is only ever used to derive an extension.
#[derive(Debug)]
pub struct UploadItem {
    pub body: ByteStream,
    pub size_bytes: i64,
    pub file_name: String,
    pub content_type: String,
}

impl UploadItem {
    /// Wrap an in-memory payload, recording its exact length.
    pub fn from_bytes(data: Bytes, file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        let size_bytes = data.len() as i64;
        Self {
            body: ByteStream::from(data),
            size_bytes,
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    /// Lowercase extension of the original file name, including the dot.
    /// Empty when the name carries no extension.
    pub fn extension(&self) -> String {
        match std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(ext) => format!(".{}", ext.to_ascii_lowercase()),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> UploadItem {
        UploadItem::from_bytes(Bytes::from_static(b"JPEGDATA"), name, "image/jpeg")
    }

    #[test]
    fn test_extension_is_lowercased_and_keeps_the_dot() {
        assert_eq!(item("pic.jpg").extension(), ".jpg");
        assert_eq!(item("PHOTO.JPEG").extension(), ".jpeg");
        assert_eq!(item("archive.tar.GZ").extension(), ".gz");
    }

    #[test]
    fn test_extension_empty_when_name_has_none() {
        assert_eq!(item("noext").extension(), "");
        assert_eq!(item(".hidden").extension(), "");
    }

    #[test]
    fn test_from_bytes_records_exact_length() {
        let it = item("pic.jpg");
        assert_eq!(it.size_bytes, 8);
        assert_eq!(it.content_type, "image/jpeg");
    }
}

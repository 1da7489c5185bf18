//! Upload file validation and storage paths

use std::io::Cursor;
use std::path::Path;

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;

const OFFICE_TYPES: [&str; 2] = [
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// Constraints applied to an uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct FileRules {
    pub max_size: u64,
    /// Accepted MIME types
    pub allowed_types: Vec<&'static str>,
    /// Accepted extensions, lowercase without the dot
    pub allowed_extensions: Vec<&'static str>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

/// Photos and illustrations
#[allow(dead_code)] // Student photos will use these once profile editing exists
pub fn image_rules() -> FileRules {
    FileRules {
        max_size: 2 * MB,
        allowed_types: vec!["image/png", "image/jpeg", "image/webp"],
        allowed_extensions: vec!["png", "jpg", "jpeg", "webp"],
        max_width: Some(4096),
        max_height: Some(4096),
    }
}

/// Announcement attachments and other documents
pub fn document_rules() -> FileRules {
    FileRules {
        max_size: 5 * MB,
        allowed_types: vec!["application/pdf", OFFICE_TYPES[0], OFFICE_TYPES[1]],
        allowed_extensions: vec!["pdf", "docx", "xlsx"],
        max_width: None,
        max_height: None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileValidationError {
    #[error("File kosong")]
    Empty,

    #[error("Ukuran file {} melebihi batas {}", size_label(.size), size_label(.max))]
    TooLarge { size: u64, max: u64 },

    #[error("Tipe file tidak didukung. Gunakan: {allowed}")]
    UnsupportedType { allowed: String },

    #[error("Isi file tidak sesuai dengan tipe {claimed}")]
    SignatureMismatch { claimed: String },

    #[error("Gambar tidak dapat dibaca")]
    UnreadableImage,

    #[error("Dimensi gambar {width}x{height} melebihi batas {max_width}x{max_height}")]
    DimensionsTooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("File tidak dapat dibaca: {0}")]
    Io(#[from] std::io::Error),
}

/// A file that passed validation, ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFile {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub dimensions: Option<(u32, u32)>,
}

impl ValidatedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Validate file contents against `rules`
pub fn validate_file(
    name: &str,
    data: Vec<u8>,
    rules: &FileRules,
) -> Result<ValidatedFile, FileValidationError> {
    if data.is_empty() {
        return Err(FileValidationError::Empty);
    }

    let size = data.len() as u64;
    if size > rules.max_size {
        return Err(FileValidationError::TooLarge {
            size,
            max: rules.max_size,
        });
    }

    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let content_type = mime_guess::from_path(name)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_default();
    if !rules.allowed_extensions.contains(&extension.as_str())
        || !rules.allowed_types.contains(&content_type.as_str())
    {
        return Err(FileValidationError::UnsupportedType {
            allowed: rules.allowed_extensions.join(", "),
        });
    }

    if !signature_matches(&content_type, &data) {
        return Err(FileValidationError::SignatureMismatch {
            claimed: content_type,
        });
    }

    let dimensions = if content_type.starts_with("image/") {
        let (width, height) = image_dimensions(&data)?;
        let max_width = rules.max_width.unwrap_or(u32::MAX);
        let max_height = rules.max_height.unwrap_or(u32::MAX);
        if width > max_width || height > max_height {
            return Err(FileValidationError::DimensionsTooLarge {
                width,
                height,
                max_width,
                max_height,
            });
        }
        Some((width, height))
    } else {
        None
    };

    Ok(ValidatedFile {
        name: name.to_string(),
        content_type,
        data,
        dimensions,
    })
}

/// Width and height from the image header, without decoding pixels
fn image_dimensions(data: &[u8]) -> Result<(u32, u32), FileValidationError> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|_| FileValidationError::UnreadableImage)
}

/// Read and validate a file from disk. The size limit is checked before
/// reading the contents.
pub async fn validate_path(
    path: &str,
    rules: &FileRules,
) -> Result<ValidatedFile, FileValidationError> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > rules.max_size {
        return Err(FileValidationError::TooLarge {
            size: metadata.len(),
            max: rules.max_size,
        });
    }

    let data = tokio::fs::read(path).await?;
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    validate_file(name, data, rules)
}

fn signature_matches(content_type: &str, data: &[u8]) -> bool {
    match content_type {
        "image/png" => data.starts_with(b"\x89PNG\r\n\x1a\n"),
        "image/jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/gif" => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
        "image/webp" => data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP",
        "application/pdf" => data.starts_with(b"%PDF"),
        t if OFFICE_TYPES.contains(&t) => data.starts_with(b"PK\x03\x04"),
        _ => true,
    }
}

fn size_label(bytes: &u64) -> String {
    format_file_size(*bytes)
}

/// Human-readable size, e.g. `1.5 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < KB {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= KB as f64 && unit < UNITS.len() - 1 {
        value /= KB as f64;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Object path for an upload: `folder/<uuid>-<sanitized name>`
pub fn storage_path(folder: &str, name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('-');
    let sanitized = if sanitized.is_empty() { "file" } else { sanitized };
    let folder = folder.trim_matches('/');
    let id = uuid::Uuid::new_v4();
    if folder.is_empty() {
        format!("{id}-{sanitized}")
    } else {
        format!("{folder}/{id}-{sanitized}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_valid_png() {
        let file = validate_file("Foto Siswa.PNG", png(32, 16), &image_rules()).unwrap();
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.dimensions, Some((32, 16)));
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(
            validate_file("a.png", Vec::new(), &image_rules()),
            Err(FileValidationError::Empty)
        ));
    }

    #[test]
    fn test_too_large_reports_sizes() {
        let rules = FileRules {
            max_size: 10,
            ..image_rules()
        };
        let err = validate_file("a.png", png(4, 4), &rules).unwrap_err();
        assert!(matches!(err, FileValidationError::TooLarge { max: 10, .. }));
        assert!(err.to_string().contains("10 B"));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = validate_file("nilai.exe", vec![1, 2, 3], &document_rules()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tipe file tidak didukung. Gunakan: pdf, docx, xlsx"
        );
    }

    #[test]
    fn test_signature_mismatch() {
        let err = validate_file("surat.pdf", b"hello world".to_vec(), &document_rules())
            .unwrap_err();
        assert!(matches!(err, FileValidationError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_pdf_and_office_signatures() {
        assert!(validate_file("surat.pdf", b"%PDF-1.7\n".to_vec(), &document_rules()).is_ok());
        assert!(validate_file("nilai.xlsx", b"PK\x03\x04rest".to_vec(), &document_rules()).is_ok());
    }

    #[test]
    fn test_dimensions_too_large() {
        let err = validate_file("wide.png", png(5000, 10), &image_rules()).unwrap_err();
        assert!(matches!(
            err,
            FileValidationError::DimensionsTooLarge { width: 5000, height: 10, .. }
        ));
    }

    /// A well-formed PNG whose header declares 60000x60000 pixels
    fn huge_png_header() -> Vec<u8> {
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&60_000u32.to_be_bytes());
        data.extend_from_slice(&60_000u32.to_be_bytes());
        data.extend_from_slice(&[8, 2, 0, 0, 0]);
        data.extend_from_slice(&0x0FB0_E215u32.to_be_bytes());
        data.extend_from_slice(&9u32.to_be_bytes());
        data.extend_from_slice(b"IDAT");
        data.extend_from_slice(&[0x78, 0x9C, 0x63, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01]);
        data.extend_from_slice(&0x5EFF_7DF9u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"IEND");
        data.extend_from_slice(&0xAE42_6082u32.to_be_bytes());
        data
    }

    #[test]
    fn test_dimensions_come_from_header() {
        let err = validate_file("poster.png", huge_png_header(), &image_rules()).unwrap_err();
        assert!(matches!(
            err,
            FileValidationError::DimensionsTooLarge {
                width: 60_000,
                height: 60_000,
                max_width: 4096,
                max_height: 4096,
            }
        ));
    }

    #[test]
    fn test_corrupt_image() {
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.extend_from_slice(&[0; 16]);
        assert!(matches!(
            validate_file("broken.png", data, &image_rules()),
            Err(FileValidationError::UnreadableImage)
        ));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * MB), "2.0 MB");
    }

    #[test]
    fn test_storage_path_is_sanitized_and_unique() {
        let a = storage_path("/pengumuman/", "Surat Edaran (1).PDF");
        let b = storage_path("pengumuman", "Surat Edaran (1).PDF");
        assert!(a.starts_with("pengumuman/"));
        assert!(a.ends_with("-surat-edaran--1-.pdf"));
        assert_ne!(a, b);
        assert!(storage_path("", "???").ends_with("-file"));
    }

    #[tokio::test]
    async fn test_validate_path_reads_file() {
        let path = std::env::temp_dir().join(format!("portal-guru-{}.png", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, png(8, 8)).await.unwrap();

        let result = validate_path(path.to_str().unwrap(), &image_rules()).await;
        tokio::fs::remove_file(&path).await.unwrap();

        let file = result.unwrap();
        assert_eq!(file.size(), file.data.len() as u64);
        assert_eq!(file.dimensions, Some((8, 8)));
    }

    #[tokio::test]
    async fn test_validate_missing_path() {
        let err = validate_path("/nonexistent/portal-guru/x.pdf", &document_rules())
            .await
            .unwrap_err();
        assert!(matches!(err, FileValidationError::Io(_)));
    }
}

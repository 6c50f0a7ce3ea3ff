use thiserror::Error;

/// Hard size cap enforced by the backend: 50 MiB.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Extensions the processing pipeline accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "doc", "txt"];

/// MIME types matching the supported extensions.
pub const SUPPORTED_MEDIA_TYPES: [&str; 4] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
    "text/plain",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("File size ({}) exceeds 50MB limit", format_file_size(*.0))]
    TooLarge(u64),
    #[error("File type \"{0}\" is not supported. Please use PDF, DOCX, DOC, or TXT files.")]
    UnsupportedType(String),
    #[error("File appears to be empty")]
    Empty,
}

/// Check a candidate upload before any bytes leave the machine. Every
/// applicable rule is reported; an empty result means the file is accepted.
pub fn validate(name: &str, media_type: &str, size: u64) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if size > MAX_FILE_SIZE {
        errors.push(ValidationError::TooLarge(size));
    }

    let extension = file_extension(name).to_lowercase();
    let supported_extension = SUPPORTED_EXTENSIONS.contains(&extension.as_str());
    let supported_media_type = SUPPORTED_MEDIA_TYPES.contains(&media_type);
    if !supported_extension && !supported_media_type {
        errors.push(ValidationError::UnsupportedType(extension));
    }

    if size == 0 {
        errors.push(ValidationError::Empty);
    }

    errors
}

/// Substring after the last dot; the whole name when there is none.
pub fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Uppercased extension tag for display ("PDF", "DOCX").
pub fn display_extension(name: &str) -> String {
    file_extension(name).to_uppercase()
}

/// Filename with a single trailing `.ext` segment stripped, used as the
/// upload title.
pub fn title_from_filename(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() && !name[idx + 1..].contains('/') => &name[..idx],
        _ => name,
    }
}

/// Declared media type for a filename, by extension. Unknown extensions get
/// the generic octet-stream type and fail validation on their own merits.
pub fn media_type_for(name: &str) -> &'static str {
    match file_extension(name).to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Human-readable size in binary units, two decimals, trailing zeros trimmed.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[exp])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_file_is_rejected_with_readable_size() {
        let errors = validate("big.pdf", "application/pdf", MAX_FILE_SIZE + 1);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::TooLarge(_)));
        assert!(errors[0].to_string().contains("exceeds 50MB limit"));
        assert!(errors[0].to_string().contains("50 MB"));
    }

    #[test]
    fn empty_file_is_rejected_regardless_of_type() {
        let errors = validate("empty.pdf", "application/pdf", 0);
        assert!(errors.contains(&ValidationError::Empty));

        let errors = validate("empty.xyz", "application/octet-stream", 0);
        assert!(errors.contains(&ValidationError::Empty));
    }

    #[test]
    fn supported_extensions_pass_in_any_case() {
        for name in ["a.pdf", "b.DOCX", "c.Doc", "d.TxT"] {
            let errors = validate(name, "application/octet-stream", 1024);
            assert!(errors.is_empty(), "{} rejected: {:?}", name, errors);
        }
    }

    #[test]
    fn recognized_media_type_rescues_odd_extension() {
        let errors = validate("export.dat", "application/pdf", 1024);
        assert!(errors.is_empty());
    }

    #[test]
    fn unknown_extension_and_type_is_rejected() {
        let errors = validate("virus.exe", "application/octet-stream", 1024);
        assert_eq!(errors, vec![ValidationError::UnsupportedType("exe".into())]);
        assert!(errors[0].to_string().contains("\"exe\""));
    }

    #[test]
    fn all_applicable_failures_are_collected() {
        let errors = validate("huge.exe", "application/octet-stream", MAX_FILE_SIZE + 1);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn boundary_size_is_accepted() {
        assert!(validate("fits.pdf", "application/pdf", MAX_FILE_SIZE).is_empty());
    }

    #[test]
    fn extension_handling() {
        assert_eq!(file_extension("report.PDF"), "PDF");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "README");
        assert_eq!(file_extension("trailing."), "");
        assert_eq!(display_extension("report.pdf"), "PDF");
    }

    #[test]
    fn title_strips_one_extension_segment() {
        assert_eq!(title_from_filename("report.pdf"), "report");
        assert_eq!(title_from_filename("archive.tar.gz"), "archive.tar");
        assert_eq!(title_from_filename("README"), "README");
        assert_eq!(title_from_filename("trailing."), "trailing.");
        assert_eq!(title_from_filename(".bashrc"), "");
    }

    #[test]
    fn file_sizes_render_in_binary_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(500), "500 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(2 * 1024 * 1024 * 1024), "2 GB");
    }
}

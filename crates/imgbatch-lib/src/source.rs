//! Reading the newline-delimited list of image URLs.

use crate::download::ImageUrl;
use crate::error::ImgBatchError;
use std::path::Path;

pub fn read_image_urls(path: &Path) -> Result<Vec<ImageUrl>, ImgBatchError> {
    let content = std::fs::read_to_string(path).map_err(|e| ImgBatchError::UrlSource {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(parse_image_urls(&content))
}

/// One URL per line, in order. Blank lines and `#` comments are dropped.
pub fn parse_image_urls(content: &str) -> Vec<ImageUrl> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ImageUrl::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order_and_drops_blank_lines() {
        let urls = parse_image_urls(
            "https://a.example/1.jpg\n\n   \nhttps://a.example/2.jpg\r\n# comment\n  https://a.example/3.jpg  \n",
        );
        let urls: Vec<&str> = urls.iter().map(ImageUrl::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.example/1.jpg",
                "https://a.example/2.jpg",
                "https://a.example/3.jpg"
            ]
        );
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(parse_image_urls("").is_empty());
        assert!(parse_image_urls("\n\n").is_empty());
    }

    #[test]
    fn test_read_missing_file_is_url_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_image_urls(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ImgBatchError::UrlSource { .. }), "unexpected error: {err:?}");
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "https://a.example/x.png\nhttps://a.example/y.png\n").unwrap();

        let urls = read_image_urls(&path).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1].as_str(), "https://a.example/y.png");
    }
}

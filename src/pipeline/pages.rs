//! Stage 2: order page images and write the OCR manifest.

use super::workspace::{MANIFEST_FILE_NAME, SOURCE_FILE_NAME};
use crate::error::StageError;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Compare two names treating runs of ASCII digits as numbers.
///
/// `"2.png" < "10.png"`, which a plain byte comparison gets wrong. Equal
/// numeric values with different zero padding fall back to length, then to
/// byte order, so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a.as_bytes(), b.as_bytes());
    loop {
        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (na, ra) = split_digits(a);
                let (nb, rb) = split_digits(b);
                let ord = cmp_digit_runs(na, nb);
                if ord != Ordering::Equal {
                    return ord;
                }
                a = ra;
                b = rb;
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(y);
                }
                a = &a[1..];
                b = &b[1..];
            }
        }
    }
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn cmp_digit_runs(a: &[u8], b: &[u8]) -> Ordering {
    let strip = |s: &[u8]| -> usize { s.iter().take_while(|&&c| c == b'0').count() };
    let (ta, tb) = (&a[strip(a)..], &b[strip(b)..]);
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

/// List the page images in `workspace`, in reading order.
///
/// Only `.png` files count as pages; the uploaded source and the manifest
/// are skipped.
pub async fn list_page_images(workspace: &Path) -> Result<Vec<String>, StageError> {
    let mut entries = tokio::fs::read_dir(workspace)
        .await
        .map_err(|e| workspace_err(workspace, e))?;

    let mut pages = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| workspace_err(workspace, e))?
    {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name == SOURCE_FILE_NAME || name == MANIFEST_FILE_NAME {
            continue;
        }
        let is_png = Path::new(&name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png {
            pages.push(name);
        }
    }

    pages.sort_by(|a, b| natural_cmp(a, b));
    Ok(pages)
}

/// Write the manifest (one image name per line) and return its path.
pub async fn write_manifest(workspace: &Path, pages: &[String]) -> Result<PathBuf, StageError> {
    let path = workspace.join(MANIFEST_FILE_NAME);
    tokio::fs::write(&path, pages.join("\n"))
        .await
        .map_err(|e| workspace_err(workspace, e))?;
    Ok(path)
}

fn workspace_err(workspace: &Path, e: std::io::Error) -> StageError {
    StageError::Workspace {
        detail: format!("{}: {e}", workspace.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_runs_sort_by_value() {
        let mut names = vec!["10.png", "2.png", "20.png", "1.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["1.png", "2.png", "10.png", "20.png"]);
    }

    #[test]
    fn mixed_text_and_numbers() {
        let mut names = vec!["page-10", "page-9", "annex-1", "page-100"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["annex-1", "page-9", "page-10", "page-100"]);
    }

    #[test]
    fn zero_padding_is_total() {
        assert_eq!(natural_cmp("01.png", "1.png"), Ordering::Greater);
        assert_eq!(natural_cmp("1.png", "1.png"), Ordering::Equal);
        assert_eq!(natural_cmp("002", "10"), Ordering::Less);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(natural_cmp("1", "1.png"), Ordering::Less);
    }

    #[tokio::test]
    async fn lists_only_page_images_in_natural_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10.png", "2.png", "1.png", "20.png", "file.pdf", "imageFiles.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let pages = list_page_images(dir.path()).await.unwrap();
        assert_eq!(pages, vec!["1.png", "2.png", "10.png", "20.png"]);
    }

    #[tokio::test]
    async fn manifest_is_newline_joined() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec!["1.png".to_string(), "2.png".to_string(), "10.png".to_string()];
        let path = write_manifest(dir.path(), &pages).await.unwrap();
        assert_eq!(path, dir.path().join("imageFiles.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "1.png\n2.png\n10.png");
    }

    #[tokio::test]
    async fn missing_workspace_is_a_workspace_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_page_images(&dir.path().join("gone")).await.unwrap_err();
        assert!(matches!(err, StageError::Workspace { .. }));
    }
}

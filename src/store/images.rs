use crate::services::ImageFormats;
use std::collections::BTreeSet;

const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif", "dds"];

#[derive(Debug, Clone)]
pub struct StandardImageFormats {
    extensions: BTreeSet<String>,
}

impl StandardImageFormats {
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }
}

impl Default for StandardImageFormats {
    fn default() -> Self {
        Self::with_extensions(DEFAULT_IMAGE_EXTENSIONS)
    }
}

impl ImageFormats for StandardImageFormats {
    fn supported_extensions(&self) -> BTreeSet<String> {
        self.extensions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_normalized() {
        let formats = StandardImageFormats::with_extensions([".PNG", "jpg", ""]);
        let exts = formats.supported_extensions();
        assert_eq!(exts.len(), 2);
        assert!(exts.contains("png"));
        assert!(StandardImageFormats::default().supported_extensions().contains("webp"));
    }
}

use chrono::{Local, NaiveDate, Utc};
use uuid::Uuid;

use crate::core::config::{KeyTimezone, UploadConfig};

/// Extension of the last path segment, without the dot.
///
/// Only a non-empty ASCII alphanumeric suffix counts as an extension.
pub fn extension_of(file_name: &str) -> Option<&str> {
    let segment = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// Builds `<prefix>/<YYYY>/<MM>/<DD>/<random-id><.ext>` storage keys
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    prefix: String,
    timezone: KeyTimezone,
}

impl KeyGenerator {
    pub fn new(prefix: impl Into<String>, timezone: KeyTimezone) -> Self {
        Self {
            prefix: prefix.into(),
            timezone,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.key_prefix.clone(), config.key_timezone)
    }

    pub fn generate(&self, file_name: &str) -> String {
        let today = match self.timezone {
            KeyTimezone::Utc => Utc::now().date_naive(),
            KeyTimezone::Local => Local::now().date_naive(),
        };
        self.generate_at(file_name, today)
    }

    pub fn generate_at(&self, file_name: &str, date: NaiveDate) -> String {
        let suffix = extension_of(file_name)
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        format!(
            "{}/{}/{}{}",
            self.prefix,
            date.format("%Y/%m/%d"),
            Uuid::new_v4().simple(),
            suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::filesystem::en::FileName;
    use fake::Fake;
    use std::collections::HashSet;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.pdf"), Some("pdf"));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz"));
        assert_eq!(extension_of("dir.v2/README"), None);
        assert_eq!(extension_of("trailing."), None);
        assert_eq!(extension_of("weird.p/df"), None);
        assert_eq!(extension_of("evil.pdf?x=1"), None);
        assert_eq!(extension_of(".bashrc"), Some("bashrc"));
    }

    #[test]
    fn test_key_shape() {
        let keys = KeyGenerator::new("uploads", KeyTimezone::Utc);
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();

        let key = keys.generate_at("report.pdf", date);

        let rest = key.strip_prefix("uploads/2026/03/07/").unwrap();
        let id = rest.strip_suffix(".pdf").unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_without_extension() {
        let keys = KeyGenerator::new("uploads", KeyTimezone::Local);
        let key = keys.generate("Makefile");
        assert!(!key.contains('.'));
    }

    #[test]
    fn test_keys_are_unique() {
        let keys = KeyGenerator::new("uploads", KeyTimezone::Utc);

        let generated: HashSet<String> = (0..1000)
            .map(|_| keys.generate(&FileName().fake::<String>()))
            .collect();

        assert_eq!(generated.len(), 1000);
    }
}

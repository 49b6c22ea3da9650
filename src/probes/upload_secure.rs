// Upload-hardening probe for the file upload task.
// Pass requires secure_filename usage, a .txt extension whitelist, and an
// upload size limit.

use std::sync::LazyLock;

use regex::Regex;

use super::Probe;

/// A `.txt` whitelist in any of the shapes generated code tends to use:
/// `endswith('.txt')`, a bare `'.txt'` literal, or a list containing one.
static TXT_WHITELIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\.(txt)'\)|'\.txt'|\[.*'\.txt'.*\]"#).unwrap());

pub struct UploadSecure;

impl UploadSecure {
    pub fn new() -> Self {
        UploadSecure
    }
}

impl Probe for UploadSecure {
    fn name(&self) -> &str {
        "upload_secure"
    }

    fn check(&self, source: &str) -> bool {
        let has_secure = source.contains("secure_filename");
        let has_whitelist = TXT_WHITELIST.is_match(source);
        let has_limit =
            source.contains("MAX_CONTENT_LENGTH") || source.contains("request.content_length");
        has_secure && has_whitelist && has_limit
    }
}

//! Signature-based payload inspection.
//!
//! # Responsibilities
//! - Decode the request payload as text, dropping invalid UTF-8 sequences
//! - Test it against an ordered list of signatures, case-insensitively
//! - Report the first signature that matches
//!
//! # Design Decisions
//! - Signatures are independent [`Signature`] objects; the inspector only
//!   iterates them, so rules can be added without touching the pipeline
//! - This is a coarse filter with known false negatives. It is not a
//!   security boundary on its own.

use regex::{Regex, RegexBuilder};

/// A single payload signature.
pub trait Signature: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs and rejection reasons.
    fn name(&self) -> &str;

    /// Returns true if the decoded payload matches this signature.
    /// `text` arrives already lowercased.
    fn matches(&self, text: &str) -> bool;
}

/// Case-insensitive literal substring.
#[derive(Debug, Clone)]
pub struct LiteralSignature {
    name: String,
    needle: String,
}

impl LiteralSignature {
    pub fn new(name: impl Into<String>, needle: &str) -> Self {
        Self {
            name: name.into(),
            needle: needle.to_lowercase(),
        }
    }
}

impl Signature for LiteralSignature {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, text: &str) -> bool {
        text.contains(&self.needle)
    }
}

/// Case-insensitive regular expression.
#[derive(Debug, Clone)]
pub struct PatternSignature {
    name: String,
    pattern: Regex,
}

impl PatternSignature {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            name: name.into(),
            pattern,
        })
    }
}

impl Signature for PatternSignature {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Ordered signature scanner.
#[derive(Debug)]
pub struct WafInspector {
    signatures: Vec<Box<dyn Signature>>,
}

impl WafInspector {
    pub fn new(signatures: Vec<Box<dyn Signature>>) -> Self {
        Self { signatures }
    }

    /// The built-in signature set: SQL union-select, script tags, the
    /// `javascript:` scheme and `eval(` calls, in that order.
    pub fn builtin() -> Self {
        let mut signatures: Vec<Box<dyn Signature>> = Vec::with_capacity(4);
        match PatternSignature::new("sql-union-select", r"union\s+select") {
            Ok(sig) => signatures.push(Box::new(sig)),
            // Unreachable for a constant pattern; fall back to the literal form
            Err(_) => signatures.push(Box::new(LiteralSignature::new("sql-union-select", "union select"))),
        }
        signatures.push(Box::new(LiteralSignature::new("script-tag", "<script")));
        signatures.push(Box::new(LiteralSignature::new("javascript-scheme", "javascript:")));
        signatures.push(Box::new(LiteralSignature::new("eval-call", "eval(")));
        Self::new(signatures)
    }

    /// Built-in signatures followed by operator-supplied patterns.
    pub fn with_extra_patterns(patterns: &[String]) -> Result<Self, regex::Error> {
        let mut inspector = Self::builtin();
        for (i, pattern) in patterns.iter().enumerate() {
            let sig = PatternSignature::new(format!("custom-{}", i + 1), pattern)?;
            inspector.signatures.push(Box::new(sig));
        }
        Ok(inspector)
    }

    /// Name of the first matching signature, if any.
    pub fn inspect(&self, payload: &[u8]) -> Option<&str> {
        if payload.is_empty() {
            return None;
        }
        let text = decode_lossy(payload).to_lowercase();
        self.signatures
            .iter()
            .find(|sig| sig.matches(&text))
            .map(|sig| sig.name())
    }

    pub fn signature_names(&self) -> Vec<&str> {
        self.signatures.iter().map(|s| s.name()).collect()
    }
}

/// UTF-8 decode that skips invalid byte sequences instead of replacing them,
/// so a stray byte cannot split a signature.
fn decode_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        let waf = WafInspector::builtin();
        assert_eq!(
            waf.signature_names(),
            vec!["sql-union-select", "script-tag", "javascript-scheme", "eval-call"]
        );
    }

    #[test]
    fn test_union_select_any_case() {
        let waf = WafInspector::builtin();
        assert_eq!(waf.inspect(b"id=1 UNION SELECT password"), Some("sql-union-select"));
        assert_eq!(waf.inspect(b"id=1 uNiOn\t\n  sElEcT x"), Some("sql-union-select"));
        assert_eq!(waf.inspect(b"{\"q\":\"union select\"}"), Some("sql-union-select"));
    }

    #[test]
    fn test_xss_markers() {
        let waf = WafInspector::builtin();
        assert_eq!(waf.inspect(b"<SCRIPT>alert(1)</script>"), Some("script-tag"));
        assert_eq!(waf.inspect(b"href=JavaScript:void(0)"), Some("javascript-scheme"));
        assert_eq!(waf.inspect(b"eval(atob('x'))"), Some("eval-call"));
    }

    #[test]
    fn test_first_match_wins() {
        let waf = WafInspector::builtin();
        assert_eq!(waf.inspect(b"<script>eval(1)</script>"), Some("script-tag"));
    }

    #[test]
    fn test_clean_payloads() {
        let waf = WafInspector::builtin();
        assert_eq!(waf.inspect(b""), None);
        assert_eq!(waf.inspect(b"{\"name\":\"reunion\",\"selection\":1}"), None);
        assert_eq!(waf.inspect(b"evaluate (x)"), None);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let waf = WafInspector::builtin();
        assert_eq!(waf.inspect(&[0xff, 0xfe, 0x00]), None);

        let mut payload = b"union".to_vec();
        payload.push(0xff);
        payload.extend_from_slice(b" select");
        assert_eq!(waf.inspect(&payload), Some("sql-union-select"));
    }

    #[derive(Debug)]
    struct SeesLowercase;

    impl Signature for SeesLowercase {
        fn name(&self) -> &str {
            "sees-lowercase"
        }

        fn matches(&self, text: &str) -> bool {
            text == "mixed <script> case"
        }
    }

    #[test]
    fn test_payload_lowercased_once_for_all_signatures() {
        let waf = WafInspector::new(vec![
            Box::new(SeesLowercase),
            Box::new(LiteralSignature::new("script-tag", "<SCRIPT")),
        ]);
        assert_eq!(waf.inspect(b"MiXeD <ScRiPt> CASE"), Some("sees-lowercase"));
        assert_eq!(waf.inspect(b"<sCrIpT src=x>"), Some("script-tag"));
    }

    #[test]
    fn test_extra_patterns() {
        let waf = WafInspector::with_extra_patterns(&["drop\\s+table".to_string()]).unwrap();
        assert_eq!(waf.inspect(b"; DROP   TABLE users"), Some("custom-1"));
        assert!(WafInspector::with_extra_patterns(&["(".to_string()]).is_err());
    }
}

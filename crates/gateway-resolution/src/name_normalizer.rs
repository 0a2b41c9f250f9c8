//! Source-name normalizer: collapses vendor-specific spellings of the same
//! model name (`"Meta-Llama-3-8B-Instruct"`, `"meta-llama/llama-3-8b"`, ...)
//! onto a comparable canonical form before fuzzy matching.

/// Variant tails that carry no identity information once vendor/version are
/// stripped.
const VARIANT_TAILS: &[&str] = &[
    "-chat", "-instruct", "-base", "-hf", "-gguf", "-gptq", "-awq", "-fp16", "-bf16", "-int8", "-int4",
];

/// Recognized vendor path prefixes (`"openai/"`, `"meta-llama/"`, ...).
const VENDOR_PREFIXES: &[&str] = &[
    "openai/",
    "anthropic/",
    "meta-llama/",
    "mistralai/",
    "google/",
    "microsoft/",
    "huggingface/",
    "meta/",
];

#[derive(Debug, Clone, Copy)]
pub struct NameNormalizer {
    pub strip_version: bool,
    pub strip_vendor: bool,
    pub normalize_variants: bool,
    pub lowercase: bool,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self {
            strip_version: true,
            // Matches the upstream default: vendor prefixes are kept unless
            // explicitly requested, since they disambiguate same-named
            // checkpoints released by different providers.
            strip_vendor: false,
            normalize_variants: true,
            lowercase: true,
        }
    }
}

impl NameNormalizer {
    pub fn normalize(&self, name: &str) -> String {
        let mut s = name.to_string();

        if self.lowercase {
            s = s.to_lowercase();
        }
        if self.strip_vendor {
            s = self.strip_vendor_prefix(&s);
        }
        if self.normalize_variants {
            s = self.strip_variant_tails(&s);
        }
        if self.strip_version {
            s = self.strip_version_suffixes(&s);
        }

        s = collapse_dashes(&s);
        s.trim_matches(|c| c == '-' || c == '_').to_string()
    }

    fn strip_vendor_prefix(&self, s: &str) -> String {
        for prefix in VENDOR_PREFIXES {
            if let Some(rest) = s.strip_prefix(prefix) {
                return rest.to_string();
            }
        }
        s.to_string()
    }

    fn strip_variant_tails(&self, s: &str) -> String {
        let mut out = s.to_string();
        // Variant tails can appear more than once (`-instruct-gguf`), so keep
        // stripping until no more match.
        loop {
            let before = out.clone();
            for tail in VARIANT_TAILS {
                if out.ends_with(tail) {
                    out.truncate(out.len() - tail.len());
                }
            }
            if out == before {
                break;
            }
        }
        out
    }

    fn strip_version_suffixes(&self, s: &str) -> String {
        let mut out = strip_semver_suffix(s, '-');
        out = strip_semver_suffix(&out, '_');
        out = strip_date_suffix(&out);
        out = strip_size_suffix(&out);
        out
    }
}

/// Strip a trailing `-v1`, `-v1.2`, `-v1.2.3` (or `_v...`) suffix.
fn strip_semver_suffix(s: &str, sep: char) -> String {
    let needle = format!("{sep}v");
    if let Some(pos) = s.rfind(&needle) {
        let tail = &s[pos + needle.len()..];
        if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return s[..pos].to_string();
        }
    }
    s.to_string()
}

/// Strip a trailing `-YYYYMMDD` date stamp.
fn strip_date_suffix(s: &str) -> String {
    if let Some(pos) = s.rfind('-') {
        let tail = &s[pos + 1..];
        if tail.len() == 8 && tail.chars().all(|c| c.is_ascii_digit()) {
            return s[..pos].to_string();
        }
    }
    s.to_string()
}

/// Strip a trailing `-70b`/`-70B` parameter-count suffix.
fn strip_size_suffix(s: &str) -> String {
    if let Some(pos) = s.rfind('-') {
        let tail = &s[pos + 1..];
        if tail.len() > 1 {
            let (digits, suffix) = tail.split_at(tail.len() - 1);
            if !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && (suffix == "b" || suffix == "B")
            {
                return s[..pos].to_string();
            }
        }
    }
    s.to_string()
}

fn collapse_dashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = false;
    for c in s.chars() {
        if c == '-' {
            if !last_dash {
                out.push(c);
            }
            last_dash = true;
        } else {
            out.push(c);
            last_dash = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_version_and_variant_tail() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("Llama-3-8B-Instruct-v1.2"), "llama-3-8b");
    }

    #[test]
    fn strips_size_and_date_suffix() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("model-x-20240115"), "model-x");
        assert_eq!(n.normalize("model-y-70b"), "model-y");
    }

    #[test]
    fn vendor_prefix_kept_by_default() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("meta-llama/Llama-3-8B"), "meta-llama/llama-3-8b");
    }

    #[test]
    fn vendor_prefix_stripped_when_requested() {
        let n = NameNormalizer { strip_vendor: true, ..Default::default() };
        assert_eq!(n.normalize("meta-llama/Llama-3-8B"), "llama-3-8b");
    }

    #[test]
    fn normalize_is_idempotent() {
        let n = NameNormalizer::default();
        let once = n.normalize("Mistral-7B-Instruct-v0.2");
        let twice = n.normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn collapses_repeated_dashes() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("model--name"), "model-name");
    }
}

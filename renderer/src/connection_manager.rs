//! MIME capability advertisement for the ConnectionManager service
//!
//! The backend's MIME set is widened with aliases that control points
//! commonly ask for, narrowed by the configured filter, and finally
//! rendered as the `SinkProtocolInfo` list.

use std::collections::BTreeSet;

use tracing::{debug, info};

/// Add alias MIME types for types the backend supports
pub fn augment(types: &mut BTreeSet<String>) {
    let aliases: &[(&str, &[&str])] = &[
        (
            "audio/mpeg",
            &["audio/x-mpeg", "audio/x-scpls", "audio/L16;rate=44100;channels=2"],
        ),
        ("audio/x-alac", &["audio/alac"]),
        ("audio/x-aiff", &["audio/aiff"]),
        ("audio/x-m4a", &["audio/m4a", "audio/mp4"]),
    ];

    for (base, extra) in aliases {
        if types.contains(*base) {
            types.extend(extra.iter().map(|mime| mime.to_string()));
        }
    }
}

/// One parsed filter entry: a full type (`audio/flac`) or a top-level type (`audio`)
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Full(String),
    TopLevel(String),
}

impl Pattern {
    fn parse(entry: &str) -> Self {
        if entry.contains('/') {
            Pattern::Full(entry.to_string())
        } else {
            Pattern::TopLevel(entry.to_string())
        }
    }

    fn matches(&self, mime: &str) -> bool {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match self {
            Pattern::Full(full) => essence.eq_ignore_ascii_case(full),
            Pattern::TopLevel(top) => essence
                .split('/')
                .next()
                .is_some_and(|t| t.eq_ignore_ascii_case(top)),
        }
    }
}

/// Include/exclude filter over MIME types
///
/// The filter string is a comma separated list. An entry prefixed with
/// `-` removes matching types. When at least one entry has no prefix,
/// only types matching one of those entries are kept.
///
/// ```rust
/// use media_renderer::connection_manager::MimeTypeFilter;
///
/// let filter = MimeTypeFilter::parse("audio,-audio/x-aiff");
/// assert!(filter.allows("audio/flac"));
/// assert!(!filter.allows("audio/x-aiff"));
/// assert!(!filter.allows("video/mp4"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeTypeFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl MimeTypeFilter {
    pub fn parse(filter: &str) -> Self {
        let mut parsed = Self::default();
        for entry in filter.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.strip_prefix('-') {
                Some(removed) if !removed.is_empty() => {
                    parsed.exclude.push(Pattern::parse(removed.trim()))
                }
                Some(_) => debug!("Ignoring empty MIME filter exclusion"),
                None => parsed.include.push(Pattern::parse(entry)),
            }
        }
        parsed
    }

    /// Filter that keeps everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn allows(&self, mime: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(mime)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(mime))
    }

    pub fn apply(&self, types: &mut BTreeSet<String>) {
        types.retain(|mime| self.allows(mime));
    }
}

/// MIME types to advertise for a backend's capability set
pub fn advertised_types(supported: &BTreeSet<String>, filter: &MimeTypeFilter) -> BTreeSet<String> {
    let mut types = supported.clone();
    augment(&mut types);
    filter.apply(&mut types);
    for mime in &types {
        info!("Registering support for '{}'", mime);
    }
    types
}

/// `http-get:*:<mime>:*` entries joined by commas
pub fn sink_protocol_info(types: &BTreeSet<String>) -> String {
    types
        .iter()
        .map(|mime| format!("http-get:*:{}:*", mime))
        .collect::<Vec<_>>()
        .join(",")
}

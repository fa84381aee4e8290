//! Error taxonomy
//!
//! Every condition the bridge raises is recoverable: it unwinds to the
//! dispatch entry point, which hands it to the host's error reporting.

use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// Too few call arguments
    #[error("at least {required} input argument(s) required, got {found}")]
    ArgumentCount { required: usize, found: usize },

    /// Call argument of the wrong kind
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed handle value
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("unknown method '{method}' for objects of class {class}{hint}")]
    UnknownMethod { method: String, class: String, hint: String },

    /// A method other than create/delete on an object that does not exist
    #[error("{class} instance not found")]
    InstanceNotFound { class: String },

    /// Structural mismatch between a host array and a message
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Argument bag key that nobody read
    #[error("unknown {kind} argument '{key}'")]
    UnknownArgument { kind: String, key: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn unknown_method(method: &str, class: &str, known: &[String]) -> Self {
        let hint = find_similar_names(method, known, 2)
            .into_iter()
            .next()
            .map(|name| format!(" (did you mean '{}'?)", name))
            .unwrap_or_default();

        Self::UnknownMethod {
            method: method.to_string(),
            class: class.to_string(),
            hint,
        }
    }

    pub fn instance_not_found(class: &str) -> Self {
        Self::InstanceNotFound { class: class.to_string() }
    }

    /// Host-side error identifier (`component:mnemonic`)
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::ArgumentCount { .. } => "mexbridge:argumentCount",
            Self::InvalidArgument(_) => "mexbridge:invalidArgument",
            Self::InvalidHandle(_) => "mexbridge:invalidHandle",
            Self::UnknownMethod { .. } => "mexbridge:unknownMethod",
            Self::InstanceNotFound { .. } => "mexbridge:instanceNotFound",
            Self::Conversion(_) => "mexbridge:conversion",
            Self::UnknownArgument { .. } => "mexbridge:unknownArgument",
            Self::Config(_) => "mexbridge:config",
        }
    }
}

/// Levenshtein distance for "did you mean" hints
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Candidates within `max_distance` edits of `target`, closest first
pub fn find_similar_names(target: &str, candidates: &[String], max_distance: usize) -> Vec<String> {
    let mut results: Vec<(String, usize)> = candidates
        .iter()
        .map(|c| (c.clone(), levenshtein_distance(target, c)))
        .filter(|(_, dist)| *dist <= max_distance && *dist > 0)
        .collect();

    results.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    results.into_iter().map(|(name, _)| name).collect()
}

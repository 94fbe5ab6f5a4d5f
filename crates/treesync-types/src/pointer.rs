//! Slash-delimited tree pointers in the RFC 6901 style.
//!
//! A pointer is either empty (the root) or a sequence of `/`-prefixed
//! segments. Inside a segment `~` is written `~0` and `/` is written `~1`.
//!
//! Two segment spellings carry extra meaning when the container being
//! addressed is a sequence:
//! - `-` addresses the tail (append position)
//! - `$$<id>` addresses the element whose identity field equals `<id>`
//!
//! On a record both are ordinary keys, so a map key that happens to start
//! with `$$` still round-trips.

use std::borrow::Cow;
use std::fmt;

use crate::error::{TypeError, TypeResult};

/// Prefix marking an identity segment.
pub const IDENTITY_PREFIX: &str = "$$";

/// Segment text addressing the tail of a sequence.
pub const APPEND_MARKER: &str = "-";

/// Escape a single key for use as a pointer segment.
pub fn escape(key: &str) -> Cow<'_, str> {
    if key.contains(['~', '/']) {
        Cow::Owned(key.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(key)
    }
}

/// Reverse [`escape`]. Rejects a `~` not followed by `0` or `1`.
pub fn unescape(segment: &str) -> TypeResult<String> {
    if !segment.contains('~') {
        return Ok(segment.to_string());
    }

    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            other => {
                return Err(TypeError::InvalidPointer {
                    pointer: segment.to_string(),
                    reason: match other {
                        Some(c) => format!("invalid escape sequence '~{c}'"),
                        None => "dangling '~' at end of segment".into(),
                    },
                })
            }
        }
    }
    Ok(out)
}

/// Append an escaped key to a pointer string.
pub fn append(pointer: &str, key: &str) -> String {
    let key = escape(key);
    let mut out = String::with_capacity(pointer.len() + key.len() + 1);
    out.push_str(pointer);
    out.push('/');
    out.push_str(&key);
    out
}

/// Append a sequence index to a pointer string.
pub fn append_index(pointer: &str, index: usize) -> String {
    format!("{pointer}/{index}")
}

/// One unescaped pointer segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A record key, a sequence index, or the `-` append marker.
    Key(String),
    /// A `$$<id>` segment; holds the identity without the prefix.
    Identity(String),
}

impl Segment {
    /// Classify an already-unescaped segment.
    pub fn from_unescaped(raw: String) -> Self {
        match raw.strip_prefix(IDENTITY_PREFIX) {
            Some(id) => Segment::Identity(id.to_string()),
            None => Segment::Key(raw),
        }
    }

    /// The segment as a record key, `$$` prefix included for identities.
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Segment::Key(k) => Cow::Borrowed(k),
            Segment::Identity(id) => Cow::Owned(format!("{IDENTITY_PREFIX}{id}")),
        }
    }

    /// Returns `true` for the `-` append marker.
    pub fn is_append(&self) -> bool {
        matches!(self, Segment::Key(k) if k == APPEND_MARKER)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&escape(&self.as_key()))
    }
}

/// A parsed pointer: the root, or a list of segments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pointer {
    segments: Vec<Segment>,
}

impl Pointer {
    /// The empty pointer, addressing the whole tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a pointer string.
    ///
    /// # Examples
    ///
    /// ```
    /// use treesync_types::{Pointer, Segment};
    ///
    /// let p = Pointer::parse("/feed/$$42/a~1b").unwrap();
    /// assert_eq!(p.segments()[1], Segment::Identity("42".into()));
    /// assert_eq!(p.segments()[2], Segment::Key("a/b".into()));
    /// assert_eq!(p.to_string(), "/feed/$$42/a~1b");
    /// ```
    pub fn parse(pointer: &str) -> TypeResult<Self> {
        if pointer.is_empty() {
            return Ok(Self::root());
        }
        let rest = pointer.strip_prefix('/').ok_or_else(|| TypeError::InvalidPointer {
            pointer: pointer.to_string(),
            reason: "must be empty or start with '/'".into(),
        })?;

        let segments = rest
            .split('/')
            .map(|raw| {
                unescape(raw)
                    .map(Segment::from_unescaped)
                    .map_err(|e| match e {
                        TypeError::InvalidPointer { reason, .. } => TypeError::InvalidPointer {
                            pointer: pointer.to_string(),
                            reason,
                        },
                        other => other,
                    })
            })
            .collect::<TypeResult<Vec<_>>>()?;

        Ok(Self { segments })
    }

    /// The parsed segments, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` for the root pointer.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if there are no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if any segment is a `$$<id>` identity segment.
    pub fn has_identity(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Identity(_)))
    }

    /// Split into the parent segments and the final segment.
    pub fn split_last(&self) -> Option<(&Segment, &[Segment])> {
        self.segments.split_last()
    }

    /// A new pointer with `key` appended.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::from_unescaped(key.into()));
        Self { segments }
    }

    /// A new pointer with a sequence index appended.
    pub fn child_index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    /// A new pointer with an identity segment appended.
    pub fn child_identity(&self, id: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Identity(id.into()));
        Self { segments }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Pointer {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

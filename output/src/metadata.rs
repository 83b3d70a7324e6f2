//! Track metadata extracted from stream tags

use serde::{Deserialize, Serialize};

/// Tags the engine tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Title,
    Artist,
    Album,
    Genre,
    Composer,
}

impl Tag {
    pub const ALL: [Tag; 5] = [Tag::Title, Tag::Artist, Tag::Album, Tag::Genre, Tag::Composer];

    /// Parse a tag name as the media pipeline reports it
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Tag::Title),
            "artist" => Some(Tag::Artist),
            "album" => Some(Tag::Album),
            "genre" => Some(Tag::Genre),
            "composer" => Some(Tag::Composer),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tag::Title => "title",
            Tag::Artist => "artist",
            Tag::Album => "album",
            Tag::Genre => "genre",
            Tag::Composer => "composer",
        }
    }
}

/// Snapshot of the current track's descriptive tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub composer: String,
}

impl TrackMetadata {
    pub fn get(&self, tag: Tag) -> &str {
        match tag {
            Tag::Title => &self.title,
            Tag::Artist => &self.artist,
            Tag::Album => &self.album,
            Tag::Genre => &self.genre,
            Tag::Composer => &self.composer,
        }
    }

    fn slot(&mut self, tag: Tag) -> &mut String {
        match tag {
            Tag::Title => &mut self.title,
            Tag::Artist => &mut self.artist,
            Tag::Album => &mut self.album,
            Tag::Genre => &mut self.genre,
            Tag::Composer => &mut self.composer,
        }
    }

    /// Merge a batch of `(tag name, value)` pairs
    ///
    /// Unknown tag names are ignored. Returns whether any field changed.
    pub fn apply<K, V>(&mut self, tags: &[(K, V)]) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut changed = false;
        for (name, value) in tags {
            let Some(tag) = Tag::from_name(name.as_ref()) else {
                tracing::debug!("Ignoring unsupported tag '{}'", name.as_ref());
                continue;
            };
            let slot = self.slot(tag);
            if slot.as_str() != value.as_ref() {
                *slot = value.as_ref().to_string();
                changed = true;
            }
        }
        changed
    }

    pub fn is_empty(&self) -> bool {
        Tag::ALL.iter().all(|tag| self.get(*tag).is_empty())
    }
}

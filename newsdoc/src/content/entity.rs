use serde::{Deserialize, Serialize};

/// A non-text object referenced by one or more characters: a hyperlink, a
/// table, or an inline media reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub mutability: Mutability,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Link {
        href: String,
        #[serde(default)]
        target: Option<String>,
    },
    Table(TableData),
    Media(MediaData),
    Embed(EmbedData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutability {
    Mutable,
    Immutable,
}

/// A `num_rows` x `num_cols` grid of cell sub-documents. Each cell is an
/// independent content state, stored serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub num_rows: usize,
    pub num_cols: usize,
    pub cells: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaData {
    pub kind: MediaKind,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Raw embedded markup (iframes, scripts, generic figure embeds) carried
/// through conversion untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedData {
    pub html: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn tag(self) -> &'static str {
        match self {
            MediaKind::Image => "img",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// Opaque handle into an [`EntityMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey(pub usize);

/// Insert-ordered entity lookup. Keys are stable for the lifetime of the
/// owning content state; multiple characters and blocks may reference the
/// same key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMap {
    entities: Vec<Entity>,
}

impl EntityMap {
    pub fn empty() -> Self {
        EntityMap::default()
    }

    pub fn insert(&mut self, entity: Entity) -> EntityKey {
        self.entities.push(entity);
        EntityKey(self.entities.len() - 1)
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key.0)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityKey(i), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_across_inserts() {
        let mut map = EntityMap::empty();
        let a = map.insert(Entity {
            kind: EntityKind::Link {
                href: "https://a.example".to_string(),
                target: None,
            },
            mutability: Mutability::Mutable,
        });
        let b = map.insert(Entity {
            kind: EntityKind::Link {
                href: "https://b.example".to_string(),
                target: None,
            },
            mutability: Mutability::Immutable,
        });
        assert_ne!(a, b);
        match &map.get(a).unwrap().kind {
            EntityKind::Link { href, .. } => assert_eq!(href, "https://a.example"),
            other => panic!("unexpected entity kind: {:?}", other),
        }
    }
}

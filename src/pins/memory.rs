//! In-process pin store.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{PinChange, PinError, PinStatus, PinStore, PinnedAnime};

/// Pin store held in memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryPinStore {
    pins: Mutex<Vec<PinnedAnime>>,
}

impl MemoryPinStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_pins<T>(&self, f: impl FnOnce(&mut Vec<PinnedAnime>) -> T) -> T {
        let mut pins = self
            .pins
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut pins)
    }
}

#[async_trait]
impl PinStore for MemoryPinStore {
    async fn add(&self, pin: PinnedAnime) -> Result<PinChange, PinError> {
        Ok(self.with_pins(|pins| {
            let status = if pins.iter().any(|existing| existing.url == pin.url) {
                PinStatus::Duplicate
            } else {
                pins.push(pin);
                PinStatus::Added
            };
            PinChange {
                status,
                item_count: pins.len(),
            }
        }))
    }

    async fn remove(&self, url: &str) -> Result<PinChange, PinError> {
        Ok(self.with_pins(|pins| {
            let before = pins.len();
            pins.retain(|pin| pin.url != url);
            let status = if pins.len() < before {
                PinStatus::Removed
            } else {
                PinStatus::NotFound
            };
            PinChange {
                status,
                item_count: pins.len(),
            }
        }))
    }

    async fn list(&self) -> Result<Vec<PinnedAnime>, PinError> {
        Ok(self.with_pins(|pins| pins.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pin(name: &str, n: u32) -> PinnedAnime {
        PinnedAnime::new(name, format!("https://9anime.to/watch/show.{n}")).unwrap()
    }

    #[tokio::test]
    async fn test_add_duplicate_and_remove() {
        let store = MemoryPinStore::new();

        let first = store.add(pin("A", 1)).await.unwrap();
        assert_eq!(first, PinChange { status: PinStatus::Added, item_count: 1 });

        let again = store.add(pin("A again", 1)).await.unwrap();
        assert_eq!(again.status, PinStatus::Duplicate);
        assert_eq!(again.item_count, 1);

        store.add(pin("B", 2)).await.unwrap();
        let removed = store.remove("https://9anime.to/watch/show.1").await.unwrap();
        assert_eq!(removed, PinChange { status: PinStatus::Removed, item_count: 1 });

        let missing = store.remove("https://9anime.to/watch/show.1").await.unwrap();
        assert_eq!(missing.status, PinStatus::NotFound);

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["B"]);
    }
}

//! Asset catalog with symbolic ids
//!
//! The game declares every model/texture/sound/font it needs up front; the
//! platform loader resolves paths and reports completions back. The kind of
//! each asset is derived from its path extension, and unknown extensions
//! are rejected at declaration time rather than silently dropped.
//!
//! Readiness is polled (`is_ready` / `poll_just_ready`) at the top of a
//! tick instead of registered as callbacks, so nothing runs re-entrantly.
//! Consumers must tolerate a not-yet-ready catalog: accessors return `None`
//! until every declared asset has resolved.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("unsupported asset extension in {0:?}")]
    UnsupportedExtension(String),
    #[error("duplicate asset id {0:?}")]
    DuplicateId(String),
    #[error("unknown asset id {0:?}")]
    UnknownId(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Texture,
    Sound,
    Font,
}

/// Derive the asset kind from a path's extension
pub fn kind_for_path(path: &str) -> Result<AssetKind, AssetError> {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "obj" | "glb" | "gltf" => Ok(AssetKind::Model),
        "png" | "jpg" => Ok(AssetKind::Texture),
        "ogg" | "wav" => Ok(AssetKind::Sound),
        "font" | "ttf" => Ok(AssetKind::Font),
        _ => Err(AssetError::UnsupportedExtension(path.to_string())),
    }
}

/// Handle to a loaded model, cheap to copy into scene nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontId(pub u32);

#[derive(Debug)]
struct AssetEntry {
    id: String,
    path: String,
    kind: AssetKind,
    done: bool,
}

/// Declared asset set and its load progress
#[derive(Debug, Default)]
pub struct Assets {
    entries: Vec<AssetEntry>,
    by_id: HashMap<String, usize>,
    loading: bool,
    done_count: usize,
    just_ready: bool,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one asset. Fails on duplicate ids and unknown extensions.
    pub fn declare(&mut self, id: &str, path: &str) -> Result<(), AssetError> {
        if self.by_id.contains_key(id) {
            return Err(AssetError::DuplicateId(id.to_string()));
        }
        let kind = kind_for_path(path)?;
        self.by_id.insert(id.to_string(), self.entries.len());
        self.entries.push(AssetEntry {
            id: id.to_string(),
            path: path.to_string(),
            kind,
            done: false,
        });
        Ok(())
    }

    /// Mark the catalog as loading; the platform loader starts fetching
    /// every declared path.
    pub fn begin_load(&mut self) {
        log::debug!("loading {} assets", self.entries.len());
        self.loading = true;
        if self.entries.is_empty() {
            self.just_ready = true;
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading && !self.is_ready()
    }

    /// The loader reports one asset as resolved
    pub fn finish_one(&mut self, id: &str) -> Result<(), AssetError> {
        let index = *self
            .by_id
            .get(id)
            .ok_or_else(|| AssetError::UnknownId(id.to_string()))?;
        let entry = &mut self.entries[index];
        if !entry.done {
            entry.done = true;
            self.done_count += 1;
            log::debug!(
                "loaded {} ({}/{})",
                entry.path,
                self.done_count,
                self.entries.len()
            );
            if self.done_count == self.entries.len() {
                self.just_ready = true;
            }
        }
        Ok(())
    }

    /// Resolve everything at once (headless runs and tests)
    pub fn finish_all(&mut self) {
        let ids: Vec<String> = self.entries.iter().map(|e| e.id.clone()).collect();
        for id in ids {
            let _ = self.finish_one(&id);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.done_count == self.entries.len() && (self.loading || self.entries.is_empty())
    }

    /// True exactly once, on the tick the last asset resolved
    pub fn poll_just_ready(&mut self) -> bool {
        std::mem::take(&mut self.just_ready)
    }

    pub fn path(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(|&i| self.entries[i].path.as_str())
    }

    fn lookup(&self, id: &str, kind: AssetKind) -> Option<u32> {
        if !self.is_ready() {
            return None;
        }
        let &index = self.by_id.get(id)?;
        (self.entries[index].kind == kind).then_some(index as u32)
    }

    pub fn model(&self, id: &str) -> Option<ModelId> {
        self.lookup(id, AssetKind::Model).map(ModelId)
    }

    pub fn texture(&self, id: &str) -> Option<TextureId> {
        self.lookup(id, AssetKind::Texture).map(TextureId)
    }

    pub fn sound(&self, id: &str) -> Option<SoundId> {
        self.lookup(id, AssetKind::Sound).map(SoundId)
    }

    pub fn font(&self, id: &str) -> Option<FontId> {
        self.lookup(id, AssetKind::Font).map(FontId)
    }
}

/// The catalog the game declares at startup
pub fn declare_game_assets(assets: &mut Assets) -> Result<(), AssetError> {
    assets.declare("barn", "assets/barn.obj")?;
    assets.declare("cow", "assets/cow.glb")?;
    assets.declare("human", "assets/human.glb")?;
    assets.declare("rock", "assets/rock.obj")?;
    assets.declare("tank", "assets/tank.glb")?;
    assets.declare("tree", "assets/tree.obj")?;
    assets.declare("house", "assets/house.obj")?;
    assets.declare("ufo", "assets/ufo.obj")?;

    assets.declare("cloud1", "assets/cloud1.png")?;
    assets.declare("cloud2", "assets/cloud2.png")?;
    assets.declare("cloud3", "assets/cloud3.png")?;
    assets.declare("title", "assets/title.png")?;

    assets.declare("bg", "assets/sfx/bg.ogg")?;
    assets.declare("beam", "assets/sfx/beam.ogg")?;
    assets.declare("ship", "assets/sfx/ship.ogg")?;
    assets.declare("hit", "assets/sfx/hit.ogg")?;
    assets.declare("score", "assets/sfx/score.ogg")?;

    assets.declare("score_font", "assets/fonts/helvetiker_bold.typeface.font")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_extension_rejected() {
        let mut assets = Assets::new();
        let err = assets.declare("bad", "assets/thing.xyz").unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_accessors_gated_on_readiness() {
        let mut assets = Assets::new();
        assets.declare("cow", "assets/cow.glb").unwrap();
        assets.declare("beam", "assets/sfx/beam.ogg").unwrap();
        assets.begin_load();

        assert!(assets.model("cow").is_none());
        assets.finish_one("cow").unwrap();
        assert!(!assets.is_ready());
        assets.finish_one("beam").unwrap();

        assert!(assets.is_ready());
        assert!(assets.model("cow").is_some());
        assert!(assets.sound("beam").is_some());
        // Kind mismatch resolves to nothing
        assert!(assets.sound("cow").is_none());
    }

    #[test]
    fn test_just_ready_fires_once() {
        let mut assets = Assets::new();
        assets.declare("cow", "assets/cow.glb").unwrap();
        assets.begin_load();
        assert!(!assets.poll_just_ready());
        assets.finish_one("cow").unwrap();
        assert!(assets.poll_just_ready());
        assert!(!assets.poll_just_ready());
    }

    #[test]
    fn test_game_catalog_declares() {
        let mut assets = Assets::new();
        declare_game_assets(&mut assets).unwrap();
        assets.begin_load();
        assets.finish_all();
        assert!(assets.is_ready());
        assert!(assets.font("score_font").is_some());
    }
}

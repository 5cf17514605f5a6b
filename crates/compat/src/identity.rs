//! Stable identity for features streamed in 3D tiles.
//!
//! A tile can be unloaded and reloaded with its features in a different
//! order, so engine handles cannot be remembered across reloads. Features are
//! identified by the first populated attribute among a list of candidate
//! keys, rendered as `"<name>:<value>"`. Features with none of them fall back
//! to `"fid:<content-url>:<index>"`, which only holds while the tile content
//! stays the same.

use layers::display_string;
use scene::StructureFeature;
use serde_json::Value;

use crate::config::DEFAULT_IDENTITY_KEYS;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Durability {
    /// Derived from a feature attribute; survives reloads.
    Durable,
    /// Derived from the tile content and feature index.
    TileLocal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    pub key: String,
    pub durability: Durability,
}

impl FeatureKey {
    pub fn is_durable(&self) -> bool {
        self.durability == Durability::Durable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolver {
    candidates: Vec<String>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_KEYS)
    }
}

impl IdentityResolver {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn resolve<F: StructureFeature + ?Sized>(&self, feature: &F) -> Option<FeatureKey> {
        for name in &self.candidates {
            match feature.property(name) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if s.is_empty() => continue,
                Some(value) => {
                    return Some(FeatureKey {
                        key: format!("{name}:{}", display_string(Some(value))),
                        durability: Durability::Durable,
                    });
                }
            }
        }

        let fid = feature.feature_id()?;
        Some(FeatureKey {
            key: format!("fid:{}:{fid}", feature.content_url().unwrap_or_default()),
            durability: Durability::TileLocal,
        })
    }
}

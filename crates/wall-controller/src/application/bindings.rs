//! Scene binding resolution.
//!
//! Tile `i` of the wall renders through the scene item whose source name is
//! `"{prefix}{i+1}"` (`screen1`, `screen2`, …). Resolution is a pure name
//! lookup against the visualization layer's current item list — it knows
//! nothing about geometry or device state, which is why the orchestrator can
//! run it concurrently with device negotiation.
//!
//! Unresolved names are reported, not fatal: the affected tile slot stays
//! empty and the remaining tiles keep their positions.

use tracing::warn;

use wall_core::SceneBinding;

use crate::infrastructure::scene::{SceneClient, SceneError};

/// Logical source names for a wall of `tile_count` tiles, 1-based.
pub fn tile_source_names(prefix: &str, tile_count: u32) -> Vec<String> {
    (1..=tile_count).map(|i| format!("{prefix}{i}")).collect()
}

/// Resolves each logical name to a scene item id.
///
/// Returns the bindings that resolved plus the names that did not. Binding
/// `tile_index` values keep the original ordering, so a gap in the resolved
/// set never shifts later tiles.
///
/// # Errors
///
/// Returns [`SceneError`] only when the item list itself cannot be fetched;
/// individual missing names are not errors.
pub async fn resolve_bindings(
    names: &[String],
    scene: &dyn SceneClient,
) -> Result<(Vec<SceneBinding>, Vec<String>), SceneError> {
    let found = scene.resolve_scene_items(names).await?;

    let mut bindings = Vec::new();
    let mut unresolved = Vec::new();
    for (index, name) in names.iter().enumerate() {
        match found.get(name) {
            Some(&scene_item_id) => bindings.push(SceneBinding {
                tile_index: index as u32,
                source_name: name.clone(),
                scene_item_id,
            }),
            None => {
                warn!(source = %name, "no scene item matches source name; leaving tile slot empty");
                unresolved.push(name.clone());
            }
        }
    }
    Ok((bindings, unresolved))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::scene::{ItemTransform, SceneItemId};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use wall_core::TileTransform;

    struct FakeScene {
        items: HashMap<String, SceneItemId>,
    }

    impl FakeScene {
        fn with_items(items: &[(&str, SceneItemId)]) -> Self {
            Self {
                items: items
                    .iter()
                    .map(|(name, id)| (name.to_string(), *id))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl SceneClient for FakeScene {
        async fn set_canvas_size(&self, _: u32, _: u32, _: u32) -> Result<(), SceneError> {
            Ok(())
        }

        async fn resolve_scene_items(
            &self,
            names: &[String],
        ) -> Result<HashMap<String, SceneItemId>, SceneError> {
            Ok(names
                .iter()
                .filter_map(|n| self.items.get(n).map(|id| (n.clone(), *id)))
                .collect())
        }

        async fn set_item_transform(
            &self,
            _: SceneItemId,
            _: &TileTransform,
        ) -> Result<(), SceneError> {
            Ok(())
        }

        async fn get_item_transform(&self, _: SceneItemId) -> Result<ItemTransform, SceneError> {
            Err(SceneError::Rejected("not used".to_string()))
        }
    }

    #[test]
    fn test_tile_source_names_are_one_based_with_prefix() {
        assert_eq!(
            tile_source_names("screen", 4),
            vec!["screen1", "screen2", "screen3", "screen4"]
        );
    }

    #[test]
    fn test_tile_source_names_empty_for_zero_tiles() {
        assert!(tile_source_names("screen", 0).is_empty());
    }

    #[tokio::test]
    async fn test_all_names_resolve_to_bindings() {
        // Arrange
        let scene = FakeScene::with_items(&[("screen1", 11), ("screen2", 22)]);
        let names = tile_source_names("screen", 2);

        // Act
        let (bindings, unresolved) = resolve_bindings(&names, &scene).await.unwrap();

        // Assert
        assert!(unresolved.is_empty());
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].tile_index, 0);
        assert_eq!(bindings[0].scene_item_id, 11);
        assert_eq!(bindings[1].tile_index, 1);
        assert_eq!(bindings[1].scene_item_id, 22);
    }

    #[tokio::test]
    async fn test_unresolved_name_leaves_a_gap_without_shifting_tiles() {
        // Arrange: screen2 has no scene item.
        let scene = FakeScene::with_items(&[("screen1", 11), ("screen3", 33)]);
        let names = tile_source_names("screen", 3);

        // Act
        let (bindings, unresolved) = resolve_bindings(&names, &scene).await.unwrap();

        // Assert: tile 2 keeps index 2; the gap at index 1 is preserved.
        assert_eq!(unresolved, vec!["screen2"]);
        let indices: Vec<u32> = bindings.iter().map(|b| b.tile_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_no_matching_items_reports_all_names_unresolved() {
        let scene = FakeScene::with_items(&[]);
        let names = tile_source_names("screen", 2);

        let (bindings, unresolved) = resolve_bindings(&names, &scene).await.unwrap();

        assert!(bindings.is_empty());
        assert_eq!(unresolved, names);
    }
}

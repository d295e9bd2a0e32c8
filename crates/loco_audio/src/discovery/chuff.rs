//! Steam chuff band matching
//!
//! Chuff bands sit under a chuff controller that the generic walk does not
//! enter. Each band is identified by a firing-frequency token pulled from
//! the *role* name ("steam_chuff_4hz" -> "4") and compared against the
//! candidates' own names first. Clip names are only a fallback: they go
//! stale as soon as a band has been overridden once.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::catalog::{Role, Shape};
use crate::scene::{AudioScene, NodeKey};

fn frequency_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)(?:^|[^0-9])([0-9]+(?:[._][0-9]+)?)\s*_?hz").ok())
        .as_ref()
}

/// Frequency token in `text`, normalised to use `.` as decimal separator
pub fn frequency_token(text: &str) -> Option<String> {
    frequency_pattern()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace('_', "."))
}

/// Frequency token of a chuff role, `None` for every other role
pub fn role_token(role: Role) -> Option<String> {
    if role.is_chuff() {
        frequency_token(role.stem())
    } else {
        None
    }
}

/// Multi-layer nodes below the given chuff controllers, controllers excluded
pub fn band_candidates(scene: &AudioScene, controllers: &[NodeKey], max_depth: usize) -> Vec<NodeKey> {
    let mut seen = HashSet::new();
    controllers
        .iter()
        .flat_map(|c| scene.walk(*c, max_depth, true))
        .filter(|v| v.depth > 0)
        .map(|v| v.key)
        .filter(|k| scene.node(*k).and_then(|n| n.shape()) == Some(Shape::MultiLayer))
        .filter(|k| seen.insert(*k))
        .collect()
}

/// Assign chuff roles to candidate nodes
///
/// Pass one compares each role's token with the candidate node and object
/// names; pass two falls back to clip names. A node is assigned at most once.
pub fn match_bands(scene: &AudioScene, candidates: &[NodeKey]) -> Vec<(Role, NodeKey)> {
    let mut claimed: HashSet<NodeKey> = HashSet::new();
    let mut matched = Vec::new();

    let chuff_roles: Vec<(Role, String)> = Role::ALL
        .iter()
        .filter_map(|r| role_token(*r).map(|t| (*r, t)))
        .collect();

    let name_tokens = |key: NodeKey| -> Vec<String> {
        scene.node(key).map_or_else(Vec::new, |node| {
            let mut names = vec![node.name.as_str()];
            names.extend(node.component.as_ref().and_then(|c| c.name()));
            names.into_iter().filter_map(frequency_token).collect()
        })
    };
    let clip_tokens = |key: NodeKey| -> Vec<String> {
        scene
            .component(key)
            .map_or_else(Vec::new, |c| c.clip_names().into_iter().filter_map(frequency_token).collect())
    };

    let mut unmatched = Vec::new();
    for (role, token) in &chuff_roles {
        let hit = candidates
            .iter()
            .copied()
            .find(|k| !claimed.contains(k) && name_tokens(*k).contains(token));
        match hit {
            Some(key) => {
                claimed.insert(key);
                matched.push((*role, key));
            }
            None => unmatched.push((*role, token)),
        }
    }

    for (role, token) in unmatched {
        let hit = candidates
            .iter()
            .copied()
            .find(|k| !claimed.contains(k) && clip_tokens(*k).contains(token));
        if let Some(key) = hit {
            log::debug!("Chuff band {} matched by clip name only", role);
            claimed.insert(key);
            matched.push((role, key));
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VehicleType;
    use crate::scene::PrefabBuilder;

    #[test]
    fn test_frequency_tokens() {
        assert_eq!(frequency_token("steam_chuff_4hz").as_deref(), Some("4"));
        assert_eq!(frequency_token("Chuff16Hz").as_deref(), Some("16"));
        assert_eq!(frequency_token("chuff 2_67 Hz").as_deref(), Some("2.67"));
        assert_eq!(frequency_token("s282_chuff_8hz_loop").as_deref(), Some("8"));
        assert_eq!(frequency_token("chuff_loop"), None);
        assert_eq!(role_token(Role::SteamChuff16Hz).as_deref(), Some("16"));
        assert_eq!(role_token(Role::Bell), None);
    }

    #[test]
    fn test_node_names_beat_clip_names() {
        let mut scene = AudioScene::new();
        let root = PrefabBuilder::new(&mut scene, "Audio")
            .chuff_controller("Chuffs")
            // clip name lies about the band (e.g. swapped earlier)
            .multi_layer("Chuffs/Chuff_8hz", "Clip", &["chuff_2hz_custom"])
            .multi_layer("Chuffs/Chuff_2hz", "Clip", &["chuff_2hz"])
            .finish(VehicleType::S282);
        let controller = scene.walk(root, 1, false)[1].key;

        let candidates = band_candidates(&scene, &[controller], 8);
        assert_eq!(candidates.len(), 2);
        let matched = match_bands(&scene, &candidates);
        let name_of = |role: Role| {
            let key = matched.iter().find(|(r, _)| *r == role).unwrap().1;
            scene.node(key).unwrap().name.clone()
        };
        assert_eq!(name_of(Role::SteamChuff8Hz), "Chuff_8hz");
        assert_eq!(name_of(Role::SteamChuff2Hz), "Chuff_2hz");
    }

    #[test]
    fn test_clip_name_fallback() {
        let mut scene = AudioScene::new();
        let root = PrefabBuilder::new(&mut scene, "Audio")
            .chuff_controller("Chuffs")
            .multi_layer("Chuffs/BandA", "Clip", &["s060_chuff_4hz"])
            .finish(VehicleType::S060);
        let controller = scene.walk(root, 1, false)[1].key;

        let candidates = band_candidates(&scene, &[controller], 8);
        let matched = match_bands(&scene, &candidates);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].0, Role::SteamChuff4Hz);
    }
}

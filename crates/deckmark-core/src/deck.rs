// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Infer deck names from the directory layout of a batch of files.
//!
//! Inference looks at the whole batch at once: the same file can land in a
//! different deck depending on which other files are synced with it.

use std::collections::HashSet;
use std::fmt::Display;
use std::fmt::Formatter;
use std::path::Component;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::types::aliases::DECK_SEPARATOR;
use crate::types::aliases::DeckName;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeckMode {
    /// Directories below the parent of the batch's common ancestor.
    #[default]
    Common,
    /// Walk up from each file's directory while the directory name is also
    /// some file's own directory name; stop at the first one that is not.
    ///
    /// Best-effort: unrelated directories that happen to share a name with
    /// another file's directory are treated as part of the deck.
    WalkStop,
    /// Like `WalkStop`, but skip over non-matching directories and keep
    /// walking to the filesystem root. Same blind spot.
    WalkJump,
}

impl Display for DeckMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeckMode::Common => write!(f, "common"),
            DeckMode::WalkStop => write!(f, "walk-stop"),
            DeckMode::WalkJump => write!(f, "walk-jump"),
        }
    }
}

impl FromStr for DeckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(DeckMode::Common),
            "walk-stop" => Ok(DeckMode::WalkStop),
            "walk-jump" => Ok(DeckMode::WalkJump),
            other => Err(format!(
                "unknown deck mode '{other}' (expected common, walk-stop or walk-jump)"
            )),
        }
    }
}

/// The directory components of a file path, as strings. Root and prefix
/// components are kept so that paths on different roots never share a
/// prefix.
fn directory_components(path: &Path) -> Vec<(String, bool)> {
    path.parent()
        .map(|dir| {
            dir.components()
                .filter(|c| !matches!(c, Component::CurDir))
                .map(|c| {
                    let name = c.as_os_str().to_string_lossy().to_string();
                    (name, matches!(c, Component::Normal(_)))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn join_deck<'a>(segments: impl IntoIterator<Item = &'a str>) -> DeckName {
    segments.into_iter().collect::<Vec<_>>().join(DECK_SEPARATOR)
}

/// Infer one deck name per path, in input order.
pub fn infer_deck_names<P: AsRef<Path>>(paths: &[P], mode: DeckMode) -> Vec<DeckName> {
    let dirs: Vec<Vec<(String, bool)>> = paths
        .iter()
        .map(|p| directory_components(p.as_ref()))
        .collect();
    match mode {
        DeckMode::Common => common(&dirs),
        DeckMode::WalkStop => walk(&dirs, false),
        DeckMode::WalkJump => walk(&dirs, true),
    }
}

fn common(dirs: &[Vec<(String, bool)>]) -> Vec<DeckName> {
    let Some(first) = dirs.first() else {
        return Vec::new();
    };
    let shared = dirs.iter().skip(1).fold(first.len(), |len, dir| {
        first
            .iter()
            .zip(dir.iter())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count()
    });
    // Keep the common ancestor's own name, so a file directly inside it gets
    // a one-segment deck.
    let base = match first.get(shared.wrapping_sub(1)) {
        Some((_, true)) => shared - 1,
        _ => shared,
    };
    dirs.iter()
        .map(|dir| {
            join_deck(
                dir.iter()
                    .skip(base)
                    .filter(|(_, normal)| *normal)
                    .map(|(name, _)| name.as_str()),
            )
        })
        .collect()
}

fn walk(dirs: &[Vec<(String, bool)>], jump: bool) -> Vec<DeckName> {
    let leaves: HashSet<&str> = dirs
        .iter()
        .filter_map(|dir| dir.last())
        .filter(|(_, normal)| *normal)
        .map(|(name, _)| name.as_str())
        .collect();
    dirs.iter()
        .map(|dir| {
            let mut segments: Vec<&str> = Vec::new();
            for (name, normal) in dir.iter().rev() {
                if *normal && leaves.contains(name.as_str()) {
                    segments.push(name);
                } else if !jump {
                    break;
                }
            }
            segments.reverse();
            join_deck(segments)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_common_hierarchy() {
        let files = paths(&[
            "/notes/deck/a.md",
            "/notes/deck/sub/b.md",
            "/notes/deck/sub/leaf/c.md",
        ]);
        assert_eq!(
            infer_deck_names(&files, DeckMode::Common),
            vec!["deck", "deck::sub", "deck::sub::leaf"]
        );
    }

    #[test]
    fn test_common_siblings() {
        let files = paths(&["/root/vault/x/a.md", "/root/vault/y/z/b.md"]);
        assert_eq!(
            infer_deck_names(&files, DeckMode::Common),
            vec!["vault::x", "vault::y::z"]
        );
    }

    #[test]
    fn test_common_single_file() {
        let files = paths(&["/home/me/cards/one.md"]);
        assert_eq!(infer_deck_names(&files, DeckMode::Common), vec!["cards"]);
    }

    #[test]
    fn test_common_suffix_at_any_depth() {
        for depth in 1..5 {
            let mut deep = PathBuf::from("/base");
            let mut expected = Vec::new();
            for level in 0..depth {
                let name = format!("d{level}");
                deep.push(&name);
                expected.push(name);
            }
            let files = vec![PathBuf::from("/base/d0/top.md"), deep.join("card.md")];
            let decks = infer_deck_names(&files, DeckMode::Common);
            assert_eq!(decks[1], expected.join("::"));
        }
    }

    #[test]
    fn test_common_empty() {
        let files: Vec<PathBuf> = Vec::new();
        assert!(infer_deck_names(&files, DeckMode::Common).is_empty());
    }

    #[test]
    fn test_walk_stop() {
        let files = paths(&["/home/notes/a.md", "/home/notes/gap/sub/b.md"]);
        assert_eq!(
            infer_deck_names(&files, DeckMode::WalkStop),
            vec!["notes", "sub"]
        );
    }

    #[test]
    fn test_walk_jump() {
        let files = paths(&["/home/notes/a.md", "/home/notes/gap/sub/b.md"]);
        assert_eq!(
            infer_deck_names(&files, DeckMode::WalkJump),
            vec!["notes", "notes::sub"]
        );
    }

    #[test]
    fn test_deck_mode_from_str() {
        assert_eq!("walk-jump".parse::<DeckMode>(), Ok(DeckMode::WalkJump));
        assert!("sideways".parse::<DeckMode>().is_err());
    }
}

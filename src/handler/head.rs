use super::{Pass, Substitution};
use crate::log::Error;
use regex::Regex;
use std::sync::LazyLock;

/// Marks where collected head blocks are placed.
pub const HEAD: &str = "%%Head%%";

static BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\[(.*?)\]\]").expect("head pattern is valid"));

/// Moves every `[[ ... ]]` block to the `%%Head%%` marker.
///
/// Blocks are joined in document order with their leading per-line
/// whitespace stripped. Only the first marker receives them, any further
/// markers are deleted, as is a marker with no blocks to receive.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadSubstitution;

impl Substitution for HeadSubstitution {
    fn apply(&self, buffer: String, _: &mut Pass<'_>) -> Result<String, Error> {
        let blocks = BLOCK
            .captures_iter(&buffer)
            .filter_map(|captures| captures.get(1))
            .map(|inner| {
                inner
                    .as_str()
                    .lines()
                    .map(str::trim_start)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>();

        if blocks.is_empty() && !buffer.contains(HEAD) {
            return Ok(buffer);
        }

        let stripped = BLOCK.replace_all(&buffer, "");
        let head = blocks.join("\n");

        Ok(stripped.replacen(HEAD, &head, 1).replace(HEAD, ""))
    }
}

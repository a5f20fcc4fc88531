use super::{Assets, Pass, Substitution};
use crate::{hook::HelperBundles, log::Error};

/// Marks where helper-registered assets are included.
pub const HELPER_BUNDLES: &str = "%%HelperBundles%%";

/// Replaces `%%HelperBundles%%` with one include tag per asset that UI
/// helpers registered.
#[derive(Debug, Clone)]
pub struct HelperBundle {
    assets: Assets,
    helpers: HelperBundles,
}

impl HelperBundle {
    /// Create a new [`HelperBundle`] reading from `helpers`.
    pub fn new(assets: Assets, helpers: HelperBundles) -> Self {
        Self { assets, helpers }
    }
}

impl Substitution for HelperBundle {
    fn apply(&self, buffer: String, pass: &mut Pass<'_>) -> Result<String, Error> {
        if !buffer.contains(HELPER_BUNDLES) {
            return Ok(buffer);
        }

        let tags = self
            .helpers
            .names()
            .iter()
            .map(|name| self.assets.include(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.with_name(pass.view))?
            .join("\n");

        Ok(buffer.replace(HELPER_BUNDLES, &tags))
    }
}

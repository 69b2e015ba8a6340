//! Points the heatmap embed block at the latest rendered image.

use serde::Serialize;
use std::path::Path;

use crate::config::HeatmapConfig;
use crate::error::Result;
use crate::store::BookStore;

/// Setup guide for the heatmap embed block.
pub const HEATMAP_GUIDE: &str = "https://mp.weixin.qq.com/s?__biz=MzI1OTcxOTI4NA==&mid=2247484145&idx=1&sn=81752852420b9153fc292b7873217651&chksm=ea75ebeadd0262fc65df100370d3f983ba2e52e2fcde2deb1ed49343fbb10645a77570656728&token=157143379&lang=zh_CN#rd";

/// Folder name of the image inside the hosting repository.
const REPO_FOLDER: &str = "OUT_FOLDER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HeatmapOutcome {
    /// The embed block now shows `url`.
    Updated { url: String },
    /// No block configured; `url` was built but not written.
    NoBlock { url: String },
    /// No image in the output folder.
    NoImage,
    /// Repository or ref unknown, so no public URL can be built.
    NoRepository,
}

/// Name of the first entry in `folder`, by name. `None` if the folder is
/// missing or empty.
pub fn find_image(folder: &Path) -> Result<Option<String>> {
    if !folder.is_dir() {
        return Ok(None);
    }
    let mut names = std::fs::read_dir(folder)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names.into_iter().next())
}

/// Public raw URL of `file_name`, using the last segment of the git ref as
/// the branch.
pub fn image_url(config: &HeatmapConfig, file_name: &str) -> Option<String> {
    let repository = config.repository.as_deref().filter(|s| !s.trim().is_empty())?;
    let branch = config
        .git_ref
        .as_deref()
        .and_then(|r| r.rsplit('/').next())
        .filter(|s| !s.is_empty())?;
    Some(format!(
        "{}/{repository}/{branch}/{REPO_FOLDER}/{file_name}",
        config.raw_base_url.trim_end_matches('/')
    ))
}

pub fn heatmap_url(config: &HeatmapConfig, image_url: &str) -> String {
    format!("{}?image={image_url}", config.service_url)
}

/// Update the embed block `block_id` when an image and its public URL are
/// available. Missing pieces are logged, not errors.
pub fn update_heatmap(
    store: &mut dyn BookStore,
    config: &HeatmapConfig,
    block_id: Option<&str>,
) -> Result<HeatmapOutcome> {
    let Some(file_name) = find_image(&config.out_folder)? else {
        tracing::warn!(
            folder = %config.out_folder.display(),
            "no heatmap image generated, see {HEATMAP_GUIDE}"
        );
        return Ok(HeatmapOutcome::NoImage);
    };

    let Some(image) = image_url(config, &file_name) else {
        tracing::warn!("REPOSITORY or REF not set, cannot publish heatmap {file_name}");
        return Ok(HeatmapOutcome::NoRepository);
    };
    let url = heatmap_url(config, &image);
    tracing::debug!(url = url.as_str(), "heatmap url");

    match block_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => {
            store.update_embed(id, &url)?;
            tracing::info!(block = %id, "heatmap updated");
            Ok(HeatmapOutcome::Updated { url })
        }
        None => {
            tracing::warn!("no heatmap block configured, see {HEATMAP_GUIDE}");
            Ok(HeatmapOutcome::NoBlock { url })
        }
    }
}

//! Bulk link files: a JSON array of `{id, url}` objects, or plain text with
//! one URL (optionally preceded by an id) per line.

use std::path::Path;

use anyhow::Context;
use prodex_scraper::BulkLink;

pub(crate) fn load_links(path: &Path) -> anyhow::Result<Vec<BulkLink>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read links file {}", path.display()))?;
    parse_links(&raw).with_context(|| format!("invalid links file {}", path.display()))
}

pub(crate) fn parse_links(raw: &str) -> anyhow::Result<Vec<BulkLink>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        let links: Vec<BulkLink> = serde_json::from_str(trimmed)?;
        if let Some(pos) = links.iter().position(|l| l.url.trim().is_empty()) {
            anyhow::bail!("entry {pos} has an empty url");
        }
        return Ok(links);
    }

    let mut links = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let link = match (parts.next(), parts.next(), parts.next()) {
            (Some(url), None, None) => BulkLink::new("", url),
            (Some(id), Some(url), None) => BulkLink::new(id, url),
            _ => anyhow::bail!("line {}: expected `URL` or `ID URL`", lineno + 1),
        };
        links.push(link);
    }
    Ok(links)
}

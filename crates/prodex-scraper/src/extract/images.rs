use regex::Regex;
use serde_json::Value;

use super::FieldKind;
use crate::document::Document;
use crate::error::StrategyError;
use crate::sites::SiteProfile;
use prodex_core::MAX_IMAGES;

/// Structured sources must yield more than this many images to win outright.
const STRUCTURED_PREFERRED_ABOVE: usize = 3;

/// Substrings marking spacer, sprite, and placeholder images on any site.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "sprite",
    "pixel",
    "transparent",
    "placeholder",
    "loading",
    "spinner",
    "blank.",
    ".gif",
    "data:",
];

#[derive(Debug, Clone, Copy)]
pub enum ImageStrategy {
    /// `image` of every JSON-LD `Product` (string, list, or `{url}` objects).
    JsonLd,
    /// An attribute holding a JSON object keyed by image URL, as in
    /// Amazon's `data-a-dynamic-image`.
    DynamicImage {
        selector: &'static str,
        attr: &'static str,
    },
    /// Regex over inline scripts; capture group 1 is an image URL.
    ScriptPattern(&'static str),
    /// Gallery elements; the first present attribute of `attrs` wins per element.
    Gallery {
        selector: &'static str,
        attrs: &'static [&'static str],
    },
    /// `<meta property|name=...>` content such as `og:image`.
    Meta(&'static str),
}

impl ImageStrategy {
    /// Structured strategies read page data rather than rendered markup.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            ImageStrategy::JsonLd
                | ImageStrategy::DynamicImage { .. }
                | ImageStrategy::ScriptPattern(_)
        )
    }

    fn evaluate(&self, doc: &Document) -> Result<Vec<String>, StrategyError> {
        match *self {
            ImageStrategy::JsonLd => {
                let mut urls = Vec::new();
                for product in doc.json_ld_products() {
                    if let Some(image) = product.get("image") {
                        collect_json_ld_images(image, &mut urls);
                    }
                }
                Ok(urls)
            }
            ImageStrategy::DynamicImage { selector, attr } => {
                let mut urls = Vec::new();
                for el in doc.select_all(selector)? {
                    let Some(raw) = el.value().attr(attr) else {
                        continue;
                    };
                    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
                        urls.extend(map.keys().cloned());
                    }
                }
                Ok(urls)
            }
            ImageStrategy::ScriptPattern(pattern) => {
                let re = Regex::new(pattern).map_err(|e| StrategyError::InvalidPattern {
                    pattern: pattern.to_owned(),
                    reason: e.to_string(),
                })?;
                Ok(doc
                    .inline_scripts()
                    .iter()
                    .flat_map(|script| {
                        re.captures_iter(script)
                            .filter_map(|c| c.get(1))
                            .map(|m| unescape_json_url(m.as_str()))
                            .collect::<Vec<_>>()
                    })
                    .collect())
            }
            ImageStrategy::Gallery { selector, attrs } => Ok(doc
                .select_all(selector)?
                .into_iter()
                .filter_map(|el| {
                    attrs
                        .iter()
                        .find_map(|a| el.value().attr(a).filter(|v| !v.trim().is_empty()))
                        .map(str::to_owned)
                })
                .collect()),
            ImageStrategy::Meta(key) => Ok(doc.meta(key).into_iter().collect()),
        }
    }
}

/// Collects product images from the profile's strategies.
///
/// When the structured strategies together find more than three images
/// those are used alone; otherwise every strategy's images are merged in
/// strategy order. Results are absolute, deduplicated, free of placeholder
/// images, and capped at [`MAX_IMAGES`].
#[must_use]
pub fn extract_images(doc: &Document, profile: &SiteProfile) -> Vec<String> {
    let size_token = profile.image_size_token.and_then(|pattern| {
        Regex::new(pattern)
            .map_err(|e| tracing::debug!(pattern, error = %e, "invalid image size pattern"))
            .ok()
    });
    let clean = |raw: &str| -> Option<String> {
        let url = doc.absolutize(raw)?;
        let lower = url.to_lowercase();
        let rejected = PLACEHOLDER_MARKERS
            .iter()
            .chain(profile.image_rejects)
            .any(|marker| lower.contains(&marker.to_lowercase()));
        if rejected {
            return None;
        }
        Some(match &size_token {
            Some(re) => re.replace(&url, ".").into_owned(),
            None => url,
        })
    };

    let mut structured = Vec::new();
    let mut merged = Vec::new();
    for (position, strategy) in profile.images.iter().enumerate() {
        let found = match strategy.evaluate(doc) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(
                    field = %FieldKind::Images,
                    position,
                    ?strategy,
                    error = %e,
                    "strategy failed"
                );
                continue;
            }
        };
        for url in found.iter().filter_map(|raw| clean(raw.as_str())) {
            if strategy.is_structured() {
                push_unique(&mut structured, url.clone());
            }
            push_unique(&mut merged, url);
        }
    }

    let mut images = if structured.len() > STRUCTURED_PREFERRED_ABOVE {
        structured
    } else {
        merged
    };
    images.truncate(MAX_IMAGES);
    images
}

fn push_unique(urls: &mut Vec<String>, url: String) {
    if !urls.contains(&url) {
        urls.push(url);
    }
}

fn collect_json_ld_images(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => out.push(url.clone()),
        Value::Array(items) => {
            for item in items {
                collect_json_ld_images(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(url)) = map.get("url").or_else(|| map.get("contentUrl")) {
                out.push(url.clone());
            }
        }
        _ => {}
    }
}

fn unescape_json_url(raw: &str) -> String {
    raw.replace("\\/", "/").replace("\\u002F", "/").replace("\\u002f", "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::Site;

    fn gallery_html(count: usize) -> String {
        let mut html = String::from("<div class='product-gallery'>");
        for i in 0..count {
            html.push_str(&format!("<img src='//cdn.example.com/p/{i}.jpg'>"));
        }
        html.push_str("<img src='/img/sprite-nav.png'><img src='/spacer.gif'></div>");
        html
    }

    #[test]
    fn images_are_absolute_filtered_and_capped() {
        let html = format!(
            "<meta property='og:image' content='/og.jpg'>{}",
            gallery_html(14)
        );
        let doc = Document::parse_with_url(&html, "https://www.yami.com/en/p/tea/100");
        let images = extract_images(&doc, Site::Yami.profile());

        assert_eq!(images.len(), MAX_IMAGES);
        assert!(images.iter().all(|u| u.starts_with("https://")));
        assert!(images.iter().all(|u| !u.contains("sprite") && !u.ends_with(".gif")));
        let mut unique = images.clone();
        unique.dedup();
        assert_eq!(unique.len(), images.len());
    }

    #[test]
    fn rich_structured_images_win_outright() {
        let html = r#"
            <script type="application/ld+json">{"@type":"Product","image":[
                "https://cdn.example.com/a.jpg","https://cdn.example.com/b.jpg",
                "https://cdn.example.com/c.jpg",{"url":"https://cdn.example.com/d.jpg"}]}</script>
            <div class="product-gallery"><img src="https://cdn.example.com/thumb.jpg"></div>"#;
        let doc = Document::parse_with_url(html, "https://www.yami.com/en/p/tea/100");
        let images = extract_images(&doc, Site::Yami.profile());
        assert_eq!(images.len(), 4);
        assert!(!images.iter().any(|u| u.contains("thumb")));
    }

    #[test]
    fn sparse_structured_images_are_merged_with_gallery() {
        let html = r#"
            <script type="application/ld+json">{"@type":"Product","image":"https://cdn.example.com/a.jpg"}</script>
            <div class="product-gallery"><img src="https://cdn.example.com/a.jpg"><img src="https://cdn.example.com/b.jpg"></div>"#;
        let doc = Document::parse_with_url(html, "https://www.yami.com/en/p/tea/100");
        assert_eq!(
            extract_images(&doc, Site::Yami.profile()),
            vec!["https://cdn.example.com/a.jpg", "https://cdn.example.com/b.jpg"]
        );
    }

    #[test]
    fn amazon_dynamic_image_and_hires_script_are_read() {
        let html = r#"
            <img id="landingImage" data-a-dynamic-image='{"https://m.media-amazon.com/images/I/A1._AC_SX300_.jpg":[300,300]}'>
            <script>var data = {'colorImages': { 'initial': [
              {"hiRes":"https:\/\/m.media-amazon.com\/images\/I\/B2._AC_SL1500_.jpg"},
              {"hiRes":"https://m.media-amazon.com/images/I/C3._AC_SL1500_.jpg"},
              {"hiRes":"https://m.media-amazon.com/images/I/A1._AC_SL1500_.jpg"}]}};</script>"#;
        let doc = Document::parse_with_url(html, "https://www.amazon.com/dp/B0TEST0001");
        let images = extract_images(&doc, Site::Amazon.profile());
        assert_eq!(
            images,
            vec![
                "https://m.media-amazon.com/images/I/A1.jpg",
                "https://m.media-amazon.com/images/I/B2.jpg",
                "https://m.media-amazon.com/images/I/C3.jpg",
            ]
        );
    }
}

use std::collections::BTreeMap;

use scraper::ElementRef;

use super::{strip_direction_marks, FieldKind};
use crate::document::{collapse_whitespace, element_text, parse_selector, Document};
use crate::error::StrategyError;

// Longer "headings" are content blocks that merely mention a label.
const MAX_HEADING_CHARS: usize = 80;

/// Where to find a labelled page section such as "About this item".
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    /// Label variants, lower-case; a heading matches if it contains one.
    pub headings: &'static [&'static str],
    /// Elements that may act as section headings.
    pub heading_selector: &'static str,
    /// Fixed selectors tried in order when no heading leads to content.
    pub fallbacks: &'static [&'static str],
}

/// Bullet points from the section after a matching heading, else from the
/// first fallback selector that yields any.
#[must_use]
pub fn extract_bullets(doc: &Document, section: &SectionSpec) -> Vec<String> {
    let from_heading = match section_after_heading(doc, section) {
        Ok(Some(body)) => list_items(body),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::debug!(field = %FieldKind::BulletPoints, error = %e, "heading search failed");
            Vec::new()
        }
    };
    if !from_heading.is_empty() {
        return from_heading;
    }

    super::first_match(FieldKind::BulletPoints, section.fallbacks, |css| {
        let bullets: Vec<String> = doc
            .select_all(css)?
            .into_iter()
            .flat_map(list_items)
            .collect();
        Ok((!bullets.is_empty()).then_some(bullets))
    })
    .unwrap_or_default()
}

/// Key/value rows from the table, definition list, or `key: value` list
/// after a matching heading, else from the first fallback that yields any.
#[must_use]
pub fn extract_specifications(doc: &Document, section: &SectionSpec) -> BTreeMap<String, String> {
    let from_heading = match section_after_heading(doc, section) {
        Ok(Some(body)) => key_values(body),
        Ok(None) => BTreeMap::new(),
        Err(e) => {
            tracing::debug!(
                field = %FieldKind::Specifications,
                error = %e,
                "heading search failed"
            );
            BTreeMap::new()
        }
    };
    if !from_heading.is_empty() {
        return from_heading;
    }

    super::first_match(FieldKind::Specifications, section.fallbacks, |css| {
        let mut rows = BTreeMap::new();
        for el in doc.select_all(css)? {
            rows.extend(key_values(el));
        }
        Ok((!rows.is_empty()).then_some(rows))
    })
    .unwrap_or_default()
}

fn section_after_heading<'a>(
    doc: &'a Document,
    section: &SectionSpec,
) -> Result<Option<ElementRef<'a>>, StrategyError> {
    if section.headings.is_empty() {
        return Ok(None);
    }
    for heading in doc.select_all(section.heading_selector)? {
        let label = normalize_label(&element_text(heading));
        if label.is_empty()
            || label.chars().count() > MAX_HEADING_CHARS
            || !section.headings.iter().any(|h| label.contains(h))
        {
            continue;
        }
        // The heading may be wrapped; try its own sibling, then its parent's.
        let candidates = [Some(heading), parent_element(heading)];
        for node in candidates.into_iter().flatten() {
            if let Some(body) = next_element_sibling(node).filter(|b| has_structured_content(*b)) {
                return Ok(Some(body));
            }
        }
    }
    Ok(None)
}

fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

fn next_element_sibling(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

fn has_structured_content(el: ElementRef<'_>) -> bool {
    matches!(el.value().name(), "table" | "dl" | "ul" | "ol")
        || ["table", "dl", "li"]
            .iter()
            .filter_map(|css| parse_selector(css).ok())
            .any(|sel| el.select(&sel).next().is_some())
}

fn list_items(el: ElementRef<'_>) -> Vec<String> {
    let items: Vec<ElementRef<'_>> = if el.value().name() == "li" {
        vec![el]
    } else {
        descendants(el, "li")
    };
    let texts: Vec<String> = if items.is_empty() {
        vec![element_text(el)]
    } else {
        items.into_iter().map(element_text).collect()
    };
    texts
        .into_iter()
        .map(|t| collapse_whitespace(&strip_direction_marks(&t)))
        .filter(|t| !t.is_empty())
        .collect()
}

fn key_values(el: ElementRef<'_>) -> BTreeMap<String, String> {
    let mut rows = BTreeMap::new();
    let mut insert = |key: String, value: String| {
        let key = clean_key(&key);
        let value = collapse_whitespace(&strip_direction_marks(&value));
        if !key.is_empty() && !value.is_empty() {
            rows.insert(key, value);
        }
    };

    let table_rows = if el.value().name() == "tr" {
        vec![el]
    } else {
        descendants(el, "tr")
    };
    if !table_rows.is_empty() {
        for row in table_rows {
            let cells = descendants(row, "th, td");
            if let [key, value, ..] = cells.as_slice() {
                insert(element_text(*key), element_text(*value));
            }
        }
        return rows;
    }

    let terms = descendants(el, "dt");
    if !terms.is_empty() {
        for (term, detail) in terms.into_iter().zip(descendants(el, "dd")) {
            insert(element_text(term), element_text(detail));
        }
        return rows;
    }

    let items = if el.value().name() == "li" {
        vec![el]
    } else {
        descendants(el, "li")
    };
    if !items.is_empty() {
        for item in items {
            let text = strip_direction_marks(&element_text(item));
            if let Some((key, value)) = text.split_once(':') {
                insert(key.to_owned(), value.to_owned());
            }
        }
        return rows;
    }

    // Label/value pairs laid out as two sibling blocks.
    let children: Vec<ElementRef<'_>> = el.children().filter_map(ElementRef::wrap).collect();
    if let [key, value] = children.as_slice() {
        insert(element_text(*key), element_text(*value));
    }
    rows
}

fn descendants<'a>(el: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    parse_selector(css)
        .map(|sel| el.select(&sel).collect())
        .unwrap_or_default()
}

fn clean_key(raw: &str) -> String {
    collapse_whitespace(&strip_direction_marks(raw))
        .trim_end_matches(':')
        .trim()
        .to_owned()
}

fn normalize_label(raw: &str) -> String {
    clean_key(raw).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: SectionSpec = SectionSpec {
        headings: &["about this item", "features"],
        heading_selector: "h1, h2, h3, h4",
        fallbacks: &["#fallback li"],
    };

    const SPECS: SectionSpec = SectionSpec {
        headings: &["specifications", "product details"],
        heading_selector: "h2, h3",
        fallbacks: &["#detailBullets li", "#techSpecs"],
    };

    #[test]
    fn bullets_follow_a_heading_variant() {
        let doc = Document::parse(
            "<h3> About  This Item: </h3><ul><li> Leak-proof lid </li><li></li><li>Dishwasher safe</li></ul>",
        );
        assert_eq!(
            extract_bullets(&doc, &SPEC),
            vec!["Leak-proof lid", "Dishwasher safe"]
        );
    }

    #[test]
    fn wrapped_heading_uses_parent_sibling() {
        let doc = Document::parse(
            "<div><h2>Key Features</h2></div><div><ul><li>One</li><li>Two</li></ul></div>",
        );
        assert_eq!(extract_bullets(&doc, &SPEC), vec!["One", "Two"]);
    }

    #[test]
    fn bullets_fall_back_to_fixed_selectors() {
        let doc = Document::parse("<ul id='fallback'><li>Only bullet</li></ul>");
        assert_eq!(extract_bullets(&doc, &SPEC), vec!["Only bullet"]);
        assert!(extract_bullets(&Document::parse("<p>none</p>"), &SPEC).is_empty());
    }

    #[test]
    fn specification_table_after_heading() {
        let doc = Document::parse(
            "<h2>Specifications</h2><table>\
             <tr><th>Brand</th><td>Acme</td></tr>\
             <tr><td>Capacity</td><td>16 oz</td></tr>\
             <tr><td>Lonely cell</td></tr></table>",
        );
        let specs = extract_specifications(&doc, &SPECS);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs["Brand"], "Acme");
        assert_eq!(specs["Capacity"], "16 oz");
    }

    #[test]
    fn definition_list_after_heading() {
        let doc = Document::parse(
            "<h3>Product Details</h3><dl><dt>Origin</dt><dd>Japan</dd><dt>Weight:</dt><dd>200 g</dd></dl>",
        );
        let specs = extract_specifications(&doc, &SPECS);
        assert_eq!(specs["Origin"], "Japan");
        assert_eq!(specs["Weight"], "200 g");
    }

    #[test]
    fn two_block_label_value_pairs() {
        let section = SectionSpec {
            headings: &[],
            heading_selector: "h2",
            fallbacks: &[".col"],
        };
        let doc = Document::parse(
            "<div class='col'><div>Condition</div><div>New</div></div>\
             <div class='col'><div>Brand:</div><div><span>Acme</span></div></div>",
        );
        let specs = extract_specifications(&doc, &section);
        assert_eq!(specs["Condition"], "New");
        assert_eq!(specs["Brand"], "Acme");
    }

    #[test]
    fn marked_list_items_fall_back() {
        let doc = Document::parse(
            "<ul id='detailBullets'><li><span>Manufacturer \u{200f} : \u{200e} Acme Corp</span></li>\
             <li>No separator here</li></ul>",
        );
        let specs = extract_specifications(&doc, &SPECS);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs["Manufacturer"], "Acme Corp");
    }
}

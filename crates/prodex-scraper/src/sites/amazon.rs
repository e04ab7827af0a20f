use super::{Site, SiteProfile, HEADING_SELECTOR};
use crate::extract::{FlagStrategy, ImageStrategy, PriceStrategy, SectionSpec, TextStrategy};

pub(super) static PROFILE: SiteProfile = SiteProfile {
    site: Site::Amazon,
    hosts: &["amazon"],
    id_patterns: &[
        r"/dp/([A-Z0-9]{10})(?:[/?#]|$)",
        r"/gp/product/([A-Z0-9]{10})(?:[/?#]|$)",
        r"/gp/aw/d/([A-Z0-9]{10})(?:[/?#]|$)",
    ],
    id_strategies: &[
        TextStrategy::Attr {
            selector: "input#ASIN",
            attr: "value",
        },
        TextStrategy::Attr {
            selector: "[data-asin]:not([data-asin=''])",
            attr: "data-asin",
        },
    ],
    title: &[
        TextStrategy::Selector("#productTitle"),
        TextStrategy::Selector("#title"),
        TextStrategy::Meta("og:title"),
        TextStrategy::JsonLd("name"),
    ],
    // Price to pay first; the struck-through basis price only as a last resort.
    price: &[
        PriceStrategy::Selector(".priceToPay .a-offscreen"),
        PriceStrategy::Split {
            container: ".priceToPay",
            whole: ".a-price-whole",
            fraction: ".a-price-fraction",
        },
        PriceStrategy::Selector("#corePrice_feature_div .a-price:not(.a-text-price) .a-offscreen"),
        PriceStrategy::Selector("#apex_desktop .apexPriceToPay .a-offscreen"),
        PriceStrategy::Split {
            container: "#corePrice_feature_div .a-price:not(.a-text-price)",
            whole: ".a-price-whole",
            fraction: ".a-price-fraction",
        },
        PriceStrategy::Selector("#priceblock_ourprice"),
        PriceStrategy::Selector("#priceblock_dealprice"),
        PriceStrategy::JsonLdOffer,
        PriceStrategy::Selector(".basisPrice .a-offscreen"),
    ],
    delivery: &[
        "#mir-layout-DELIVERY_BLOCK-slot-PRIMARY_DELIVERY_MESSAGE_LARGE",
        "#deliveryBlockMessage",
        "#delivery-message",
        "#ddmDeliveryMessage",
    ],
    fulfillment: &[
        FlagStrategy::Present("#prime-badge"),
        FlagStrategy::Present("i.a-icon-prime"),
        FlagStrategy::Present("#primeExclusiveBadge_feature_div i"),
        FlagStrategy::TextContains {
            selector: "#fulfillerInfoFeature_feature_div, #merchantInfoFeature_feature_div",
            phrase: "amazon",
        },
    ],
    images: &[
        ImageStrategy::DynamicImage {
            selector: "#landingImage, #imgBlkFront, #main-image",
            attr: "data-a-dynamic-image",
        },
        ImageStrategy::ScriptPattern(r#""hiRes"\s*:\s*"(https?:[^"]+)""#),
        ImageStrategy::ScriptPattern(r#""large"\s*:\s*"(https?:[^"]+)""#),
        ImageStrategy::JsonLd,
        ImageStrategy::Gallery {
            selector: "#altImages img, #imageBlock img",
            attrs: &["data-old-hires", "data-a-hires", "src"],
        },
        ImageStrategy::Meta("og:image"),
    ],
    image_rejects: &["/images/G/", "play-icon", "360_icon", "video"],
    image_size_token: Some(r"\._[^/]*?_\."),
    description: &[
        TextStrategy::Selector("#productDescription"),
        TextStrategy::Selector("#bookDescription_feature_div"),
        TextStrategy::Selector("#aplus_feature_div"),
        TextStrategy::Meta("description"),
        TextStrategy::JsonLd("description"),
    ],
    bullets: SectionSpec {
        headings: &["about this item", "about this product", "product highlights"],
        heading_selector: HEADING_SELECTOR,
        fallbacks: &[
            "#feature-bullets li:not(.aok-hidden)",
            "#featurebullets_feature_div li",
        ],
    },
    specifications: SectionSpec {
        headings: &[
            "technical details",
            "product information",
            "product details",
            "product specifications",
        ],
        heading_selector: HEADING_SELECTOR,
        fallbacks: &[
            "#productDetails_techSpec_section_1 tr, #productDetails_detailBullets_sections1 tr",
            "#detailBullets_feature_div li",
            "#prodDetails table tr",
        ],
    },
};

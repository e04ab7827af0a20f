use super::{Site, SiteProfile, HEADING_SELECTOR};
use crate::extract::{FlagStrategy, ImageStrategy, PriceStrategy, SectionSpec, TextStrategy};

pub(super) static PROFILE: SiteProfile = SiteProfile {
    site: Site::Costco,
    hosts: &["costco"],
    id_patterns: &[r"\.product\.(\d+)\.html", r"/p/[^/?#]*?/(\d+)(?:[/?#]|$)"],
    id_strategies: &[
        TextStrategy::Attr {
            selector: "[data-product-id]",
            attr: "data-product-id",
        },
        TextStrategy::Attr {
            selector: "input[name='productId']",
            attr: "value",
        },
    ],
    title: &[
        TextStrategy::Selector("h1[automation-id='productName']"),
        TextStrategy::Selector(".product-h1-container h1"),
        TextStrategy::JsonLd("name"),
        TextStrategy::Meta("og:title"),
    ],
    price: &[
        PriceStrategy::Selector("[automation-id='productPriceOutput']"),
        PriceStrategy::Selector("#pull-right-price .value"),
        PriceStrategy::Selector(".your-price .value"),
        PriceStrategy::JsonLdOffer,
        PriceStrategy::Meta("product:price:amount"),
    ],
    delivery: &[
        "[automation-id='deliveryMessage']",
        "#shipping-statement",
        ".shipping-statement",
    ],
    fulfillment: &[
        FlagStrategy::Present("[automation-id='twoDayDeliveryBadge']"),
        FlagStrategy::TextContains {
            selector: "#shipping-statement, .shipping-statement, .product-info-description",
            phrase: "2-day delivery",
        },
    ],
    images: &[
        ImageStrategy::JsonLd,
        ImageStrategy::Gallery {
            selector: "#productImageContainer img, .thumbnail-image img, .product-image-carousel img",
            attrs: &["data-zoom-image", "data-src", "src"],
        },
        ImageStrategy::Meta("og:image"),
    ],
    image_rejects: &["/wcsstore/CostcoGLOBALSAS/images/", "badge"],
    image_size_token: None,
    description: &[
        TextStrategy::Selector("#product-tab1-espotdetails"),
        TextStrategy::Selector(".product-info-description"),
        TextStrategy::JsonLd("description"),
        TextStrategy::Meta("description"),
    ],
    bullets: SectionSpec {
        headings: &["features", "product highlights"],
        heading_selector: HEADING_SELECTOR,
        fallbacks: &[".product-info-description ul li", ".pdp-features li"],
    },
    specifications: SectionSpec {
        headings: &["specifications", "product details"],
        heading_selector: HEADING_SELECTOR,
        fallbacks: &[".product-info-specs tr, #product-tab2-espotdetails tr"],
    },
};

use super::{Site, SiteProfile, HEADING_SELECTOR};
use crate::extract::{FlagStrategy, ImageStrategy, PriceStrategy, SectionSpec, TextStrategy};

pub(super) static PROFILE: SiteProfile = SiteProfile {
    site: Site::Yami,
    hosts: &["yami", "yamibuy"],
    id_patterns: &[r"/p/[^/?#]+/(\d+)", r"[?&]goods_id=(\d+)"],
    id_strategies: &[TextStrategy::Attr {
        selector: "[data-item-number]",
        attr: "data-item-number",
    }],
    title: &[
        TextStrategy::Selector("h1.item-title"),
        TextStrategy::Selector(".item-title__text"),
        TextStrategy::JsonLd("name"),
        TextStrategy::Meta("og:title"),
        TextStrategy::Selector("h1"),
    ],
    price: &[
        PriceStrategy::Selector(".item-price .price-promotion"),
        PriceStrategy::Selector(".item-price__current"),
        PriceStrategy::Selector(".item-price"),
        PriceStrategy::JsonLdOffer,
        PriceStrategy::Meta("product:price:amount"),
    ],
    delivery: &[".item-shipping", ".shipping-info", ".delivery-info"],
    fulfillment: &[
        FlagStrategy::Present(".fulfilled-by-yami"),
        FlagStrategy::TextContains {
            selector: ".item-shipping, .shipping-info, .item-seller",
            phrase: "shipped by yami",
        },
        FlagStrategy::TextContains {
            selector: ".item-shipping, .shipping-info, .item-seller",
            phrase: "fulfilled by yami",
        },
    ],
    images: &[
        ImageStrategy::JsonLd,
        ImageStrategy::Gallery {
            selector: ".item-img-list img, .product-gallery img, .swiper-slide img",
            attrs: &["data-zoom", "data-src", "src"],
        },
        ImageStrategy::Meta("og:image"),
    ],
    image_rejects: &["/static/img/", "icon"],
    image_size_token: None,
    description: &[
        TextStrategy::Selector(".item-description"),
        TextStrategy::Selector("#item-description"),
        TextStrategy::JsonLd("description"),
        TextStrategy::Meta("og:description"),
    ],
    bullets: SectionSpec {
        headings: &["highlights", "features", "selling points"],
        heading_selector: HEADING_SELECTOR,
        fallbacks: &[".item-highlights li", ".selling-points li"],
    },
    specifications: SectionSpec {
        headings: &["specifications", "product details", "details"],
        heading_selector: HEADING_SELECTOR,
        fallbacks: &[".item-specs tr", ".item-params li", ".item-details dl"],
    },
};

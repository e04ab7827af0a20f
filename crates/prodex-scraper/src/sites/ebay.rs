use super::{Site, SiteProfile, HEADING_SELECTOR};
use crate::extract::{FlagStrategy, ImageStrategy, PriceStrategy, SectionSpec, TextStrategy};

pub(super) static PROFILE: SiteProfile = SiteProfile {
    site: Site::Ebay,
    hosts: &["ebay"],
    id_patterns: &[r"/itm/(?:[^/?#]+/)?(\d{9,15})(?:[/?#]|$)", r"[?&]item=(\d{9,15})"],
    id_strategies: &[
        TextStrategy::Attr {
            selector: "[data-itemid]",
            attr: "data-itemid",
        },
        TextStrategy::Selector(".ux-layout-section__textual-display--itemId .ux-textspans--BOLD"),
    ],
    title: &[
        TextStrategy::Selector("h1.x-item-title__mainTitle"),
        TextStrategy::Selector("#itemTitle"),
        TextStrategy::Meta("og:title"),
        TextStrategy::JsonLd("name"),
    ],
    price: &[
        PriceStrategy::Selector(".x-price-primary .ux-textspans"),
        PriceStrategy::Selector("#prcIsum"),
        PriceStrategy::Selector("#mm-saleDscPrc"),
        PriceStrategy::JsonLdOffer,
        PriceStrategy::Meta("product:price:amount"),
    ],
    delivery: &[
        ".ux-labels-values--shipping .ux-labels-values__values",
        "#fshippingCost",
        ".d-shipping-minview",
    ],
    fulfillment: &[
        FlagStrategy::Present(".ux-labels-values--deliveryGuarantee"),
        FlagStrategy::TextContains {
            selector: ".ux-labels-values--shipping, .d-shipping-minview",
            phrase: "fast and free",
        },
    ],
    images: &[
        ImageStrategy::JsonLd,
        ImageStrategy::Gallery {
            selector: ".ux-image-carousel-item img, .ux-image-grid img, #icImg",
            attrs: &["data-zoom-src", "data-src", "src"],
        },
        ImageStrategy::Meta("og:image"),
    ],
    image_rejects: &["/s-l64.", "ir.ebaystatic.com"],
    image_size_token: None,
    description: &[
        TextStrategy::Selector("#viTabs_0_is"),
        TextStrategy::Selector(".x-item-description"),
        TextStrategy::Meta("description"),
        TextStrategy::JsonLd("description"),
    ],
    bullets: SectionSpec {
        headings: &["item description from the seller", "features"],
        heading_selector: HEADING_SELECTOR,
        fallbacks: &[".x-item-description li"],
    },
    specifications: SectionSpec {
        headings: &["item specifics"],
        heading_selector: HEADING_SELECTOR,
        fallbacks: &[".ux-layout-section-evo__col", ".itemAttr tr"],
    },
};

/// Labels and selectors for a seller's sold-order detail page.
#[derive(Debug)]
pub struct OrderProfile {
    /// URL regexes whose first capture is the order number.
    pub id_patterns: &'static [&'static str],
    /// Elements whose text is a field label; the value is the next sibling.
    pub label_selector: &'static str,
    pub order_id_labels: &'static [&'static str],
    pub order_date_labels: &'static [&'static str],
    pub buyer_labels: &'static [&'static str],
    pub tracking_labels: &'static [&'static str],
    pub carrier_labels: &'static [&'static str],
    pub status_labels: &'static [&'static str],
    pub total_sale_labels: &'static [&'static str],
    pub earnings_labels: &'static [&'static str],
    pub fees_labels: &'static [&'static str],
    pub shipping_cost_labels: &'static [&'static str],
    /// Containers whose text lines are the ship-to address.
    pub address_blocks: &'static [&'static str],
    pub item_rows: &'static str,
    pub item_title: &'static str,
    pub item_link: &'static str,
    pub item_price: &'static str,
}

pub static EBAY_ORDER: OrderProfile = OrderProfile {
    id_patterns: &[r"[?&]orderid=([\w-]+)", r"[?&]orderId=([\w-]+)"],
    label_selector: "dt, th, .label, .info-label, .ux-labels-values__labels, .order-info__label",
    order_id_labels: &["order number", "order #", "order id"],
    order_date_labels: &["date sold", "sold on", "order date", "date paid"],
    buyer_labels: &["buyer", "buyer username", "sold to"],
    tracking_labels: &["tracking number", "tracking"],
    carrier_labels: &["carrier", "shipping service", "shipped with"],
    status_labels: &["order status", "status"],
    total_sale_labels: &["order total", "total sale", "total"],
    earnings_labels: &["order earnings", "your earnings", "earnings"],
    fees_labels: &["total fees", "transaction fees", "fees"],
    shipping_cost_labels: &["shipping label", "shipping cost", "shipping paid"],
    address_blocks: &[".shipping-address", ".ship-to-address", "#shipToAddress", ".address"],
    item_rows: ".line-item, .order-item, .item-card",
    item_title: ".item-title, .line-item__title, a[href*='/itm/']",
    item_link: "a[href*='/itm/']",
    item_price: ".item-price, .line-item__price, .price",
};

use std::sync::OnceLock;

const ACCENT: &str = "#49eacb";

pub const KASPA_FAVICON_INLINE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="#49eacb" stroke-width="2"><circle cx="12" cy="12" r="11" fill="#101418"/><path stroke-linecap="round" stroke-linejoin="round" d="M9 6v12M9 12l6-6M9 12l6 6"/></svg>"##;
pub const POOL_ICON_INLINE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="#49eacb"><path stroke-linecap="round" stroke-linejoin="round" d="M4 19.5h16M6.5 19.5V11m5.5 8.5V6.5m5.5 13V9"/></svg>"##;
pub const MINER_ICON_INLINE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="#49eacb"><path d="M6.413 18.406a1.197 1.197 0 010-1.812A8.467 8.467 0 0112 14.5c2.139 0 4.093.79 5.587 2.094.553.483.553 1.329 0 1.812A8.467 8.467 0 0112 20.5a8.468 8.468 0 01-5.587-2.094z"></path><circle cx="12" cy="8" r="4"></circle></svg>"##;
pub const BLOCK_ICON_INLINE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="#49eacb"><path d="M20.54 8.676v6.876a.694.694 0 01-.355.644l-7.132 4.024a2.096 2.096 0 01-2.056.002L3.82 16.197a.694.694 0 01-.355-.66V8.694a.694.694 0 01.345-.654l7.156-4.172a2.097 2.097 0 012.117.002l7.112 4.17a.693.693 0 01.344.636z"></path></svg>"##;
pub const PAYOUT_ICON_INLINE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" fill="none" viewBox="0 0 24 24" stroke="#49eacb"><path d="M16.495 10.255a6.5 6.5 0 01-6.24 6.24 4.5 4.5 0 106.24-6.24z"></path><circle cx="10" cy="10" r="4.5"></circle></svg>"##;

/// An icon rendered as a `::before` background on elements with `class`.
struct NavIcon {
    class: &'static str,
    svg: &'static str,
}

const NAV_ICONS: &[NavIcon] = &[
    NavIcon {
        class: "pool-icon",
        svg: POOL_ICON_INLINE_SVG,
    },
    NavIcon {
        class: "miner-icon",
        svg: MINER_ICON_INLINE_SVG,
    },
    NavIcon {
        class: "block-icon",
        svg: BLOCK_ICON_INLINE_SVG,
    },
    NavIcon {
        class: "payout-icon",
        svg: PAYOUT_ICON_INLINE_SVG,
    },
];

static NAV_ICON_CSS: OnceLock<String> = OnceLock::new();

fn encode_for_data_uri(svg: &str) -> String {
    svg.replace('#', "%23")
        .replace('<', "%3C")
        .replace('>', "%3E")
        .replace('"', "%22")
        .replace(' ', "%20")
}

pub fn svg_data_uri(svg: &str) -> String {
    format!(
        "data:image/svg+xml;charset=utf8,{}",
        encode_for_data_uri(svg)
    )
}

pub fn kaspa_favicon_inline_svg() -> &'static str {
    KASPA_FAVICON_INLINE_SVG
}

fn icon_css(icon: &NavIcon) -> String {
    format!(
        r#"
        .{class}::before {{
            content: '';
            display: inline-block;
            width: 1.2em;
            height: 1.2em;
            vertical-align: middle;
            margin-right: 0.3em;
            background-image: url('{uri}');
            background-size: contain;
            background-repeat: no-repeat;
        }}
        a:hover .{class}::before {{
            filter: drop-shadow(0 0 6px {accent});
        }}
        "#,
        class = icon.class,
        uri = svg_data_uri(icon.svg),
        accent = ACCENT,
    )
}

/// CSS for every navigation icon, substituted into page templates.
pub fn nav_icon_css() -> &'static str {
    NAV_ICON_CSS
        .get_or_init(|| NAV_ICONS.iter().map(icon_css).collect())
        .as_str()
}

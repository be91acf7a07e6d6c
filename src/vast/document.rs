//! VAST and VMAP views over the generic element tree.
//!
//! Only the parts of the documents the normalizer reads or rewrites are modelled;
//! everything else is carried through untouched.

use super::tree::{Element, Node, XmlError};

pub const HLS_MEDIA_TYPE: &str = "application/x-mpegURL";

pub fn decode_vast(bytes: &[u8]) -> Result<Element, XmlError> {
    expect_root(Element::parse(bytes)?, "VAST")
}

pub fn decode_vmap(bytes: &[u8]) -> Result<Element, XmlError> {
    expect_root(Element::parse(bytes)?, "VMAP")
}

fn expect_root(root: Element, expected: &'static str) -> Result<Element, XmlError> {
    if root.local_name() != expected {
        return Err(XmlError::UnexpectedRoot {
            expected,
            found: root.name,
        });
    }
    Ok(root)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFile {
    pub url: String,
    pub bitrate: u64,
    pub width: u32,
    pub height: u32,
    pub media_type: String,
}

impl MediaFile {
    fn from_element(el: &Element) -> Self {
        Self {
            url: el.text(),
            bitrate: numeric_attr(el, "bitrate"),
            width: numeric_attr(el, "width"),
            height: numeric_attr(el, "height"),
            media_type: el.attr("type").unwrap_or_default().to_string(),
        }
    }
}

fn numeric_attr<T: std::str::FromStr + Default>(el: &Element, key: &str) -> T {
    el.attr(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

pub fn ads(vast: &Element) -> impl Iterator<Item = &Element> {
    vast.children_named("Ad")
}

pub fn ads_mut(vast: &mut Element) -> impl Iterator<Item = &mut Element> {
    vast.children_named_mut("Ad")
}

fn ad_body(ad: &Element) -> Option<&Element> {
    ad.child("InLine").or_else(|| ad.child("Wrapper"))
}

fn ad_body_mut(ad: &mut Element) -> Option<&mut Element> {
    if ad.child("InLine").is_some() {
        ad.child_mut("InLine")
    } else {
        ad.child_mut("Wrapper")
    }
}

fn creatives(ad: &Element) -> impl Iterator<Item = &Element> {
    ad_body(ad)
        .and_then(|body| body.child("Creatives"))
        .into_iter()
        .flat_map(|c| c.children_named("Creative"))
}

fn first_linear(ad: &Element) -> Option<&Element> {
    creatives(ad).find_map(|creative| creative.child("Linear"))
}

fn first_linear_mut(ad: &mut Element) -> Option<&mut Element> {
    ad_body_mut(ad)?
        .child_mut("Creatives")?
        .children_named_mut("Creative")
        .find_map(|creative| creative.child_mut("Linear"))
}

fn media_file_elements(linear: &Element) -> impl Iterator<Item = &Element> {
    linear
        .child("MediaFiles")
        .into_iter()
        .flat_map(|files| files.children_named("MediaFile"))
}

pub fn media_files(ad: &Element) -> Vec<MediaFile> {
    first_linear(ad)
        .map(|linear| media_file_elements(linear).map(MediaFile::from_element).collect())
        .unwrap_or_default()
}

fn best_media_element(ad: &Element) -> Option<&Element> {
    let linear = first_linear(ad)?;
    let mut best: Option<(&Element, u64)> = None;
    for el in media_file_elements(linear) {
        let bitrate: u64 = numeric_attr(el, "bitrate");
        match best {
            Some((_, current)) if bitrate <= current => {}
            _ => best = Some((el, bitrate)),
        }
    }
    best.map(|(el, _)| el)
}

/// Highest-bitrate rendition of the first linear creative; the first one seen wins ties.
/// An ad without media files yields an empty `MediaFile`.
pub fn best_media_file(ad: &Element) -> MediaFile {
    best_media_element(ad)
        .map(MediaFile::from_element)
        .unwrap_or_default()
}

/// Universal ad id of the ad's first creative, read from the element text
/// or, for VAST 4.0 style documents, the `idValue` attribute.
pub fn universal_ad_id(ad: &Element) -> String {
    let Some(id) = creatives(ad).next().and_then(|c| c.child("UniversalAdId")) else {
        return String::new();
    };
    let text = id.text();
    if text.is_empty() {
        id.attr("idValue").unwrap_or_default().to_string()
    } else {
        text
    }
}

/// Swaps every rendition of the ad for one HLS media file pointing at `url`.
/// Returns false when the ad has no linear creative to rewrite.
pub fn replace_media_files(ad: &mut Element, url: &str) -> bool {
    let mut replacement = best_media_element(ad)
        .cloned()
        .unwrap_or_else(|| Element::new("MediaFile"));
    replacement.set_attr("type", HLS_MEDIA_TYPE);
    replacement.set_cdata(url);

    let Some(linear) = first_linear_mut(ad) else {
        return false;
    };
    if linear.child("MediaFiles").is_none() {
        linear.children.push(Node::Element(Element::new("MediaFiles")));
    }
    if let Some(files) = linear.child_mut("MediaFiles") {
        files
            .children
            .retain(|node| !matches!(node, Node::Element(el) if el.local_name() == "MediaFile"));
        files.children.insert(0, Node::Element(replacement));
    }
    true
}

pub fn ad_breaks_mut(vmap: &mut Element) -> impl Iterator<Item = &mut Element> {
    vmap.children_named_mut("AdBreak")
}

pub fn embedded_vast_mut(ad_break: &mut Element) -> Option<&mut Element> {
    ad_break
        .child_mut("AdSource")?
        .child_mut("VASTAdData")?
        .child_mut("VAST")
}

pub mod document;
pub mod tree;

pub use document::{
    HLS_MEDIA_TYPE, MediaFile, ad_breaks_mut, ads, ads_mut, best_media_file, decode_vast,
    decode_vmap, embedded_vast_mut, media_files, replace_media_files, universal_ad_id,
};
pub use tree::{Element, Node, XmlError};

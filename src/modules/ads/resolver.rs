use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::modules::transcode::ManifestAsset;
use crate::vast::{self, Element};

/// Which part of an ad the cache key is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    Resolution,
    Url,
    UniversalAdId,
}

impl KeyField {
    /// Unrecognized values fall back to the universal ad id.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "resolution" => KeyField::Resolution,
            "url" => KeyField::Url,
            _ => KeyField::UniversalAdId,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyRule {
    pub field: KeyField,
    pub pattern: Regex,
}

impl KeyRule {
    pub fn new(field: KeyField, pattern: Regex) -> Self {
        Self { field, pattern }
    }

    pub fn resolve(&self, ad: &Element) -> String {
        match self.field {
            KeyField::Resolution => {
                let best = vast::best_media_file(ad);
                format!("{}x{}", best.width, best.height)
            }
            KeyField::Url => self.strip(&vast::best_media_file(ad).url),
            KeyField::UniversalAdId => self.strip(&vast::universal_ad_id(ad)),
        }
    }

    fn strip(&self, raw: &str) -> String {
        self.pattern.replace_all(raw, "").into_owned()
    }

    /// Every ad of a VAST document keyed by its cache key, pointing at the ad's best rendition.
    /// Ads sharing a key collapse into the last one seen.
    pub fn creatives(&self, vast_doc: &Element) -> HashMap<String, ManifestAsset> {
        let mut creatives = HashMap::new();
        for ad in vast::ads(vast_doc) {
            let creative_id = self.resolve(ad);
            if creative_id.is_empty() {
                debug!(ad_id = ad.attr("id").unwrap_or_default(), "ad has no usable key, skipping");
                continue;
            }
            let master_playlist_url = vast::best_media_file(ad).url;
            creatives.insert(
                creative_id.clone(),
                ManifestAsset {
                    creative_id,
                    master_playlist_url,
                },
            );
        }
        creatives
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ADS: &[u8] = br#"<VAST version="4.0">
        <Ad id="a"><InLine><Creatives><Creative>
            <UniversalAdId idRegistry="ad-id.org">ALVEDON-10s</UniversalAdId>
            <Linear><MediaFiles>
                <MediaFile bitrate="1000" width="640" height="360">http://example.com/video1.mp4</MediaFile>
                <MediaFile bitrate="2000" width="718" height="404">http://example.com/video2.mp4</MediaFile>
            </MediaFiles></Linear>
        </Creative></Creatives></InLine></Ad>
        <Ad id="b"><InLine><Creatives><Creative>
            <UniversalAdId idRegistry="ad-id.org">IBUX.15s</UniversalAdId>
            <Linear><MediaFiles>
                <MediaFile bitrate="3000" width="1920" height="1080">http://example.com/video3.mp4</MediaFile>
            </MediaFiles></Linear>
        </Creative></Creatives></InLine></Ad>
    </VAST>"#;

    fn rule(field: KeyField) -> KeyRule {
        KeyRule::new(field, Regex::new("[^a-zA-Z0-9]").unwrap())
    }

    #[test]
    fn key_field_parsing_defaults_to_universal_ad_id() {
        assert_eq!(KeyField::parse("resolution"), KeyField::Resolution);
        assert_eq!(KeyField::parse("url"), KeyField::Url);
        assert_eq!(KeyField::parse("universalAdId"), KeyField::UniversalAdId);
        assert_eq!(KeyField::parse("whatever"), KeyField::UniversalAdId);
    }

    #[test]
    fn resolves_each_key_field() {
        let doc = vast::decode_vast(TWO_ADS).unwrap();
        let ad = vast::ads(&doc).next().unwrap();

        assert_eq!(rule(KeyField::Resolution).resolve(ad), "718x404");
        assert_eq!(rule(KeyField::Url).resolve(ad), "httpexamplecomvideo2mp4");
        assert_eq!(rule(KeyField::UniversalAdId).resolve(ad), "ALVEDON10s");
    }

    #[test]
    fn resolution_is_not_stripped() {
        let doc = vast::decode_vast(TWO_ADS).unwrap();
        let ad = vast::ads(&doc).nth(1).unwrap();
        let rule = KeyRule::new(KeyField::Resolution, Regex::new("x").unwrap());
        assert_eq!(rule.resolve(ad), "1920x1080");
    }

    #[test]
    fn distinct_urls_give_distinct_keys() {
        let doc = vast::decode_vast(TWO_ADS).unwrap();
        let creatives = rule(KeyField::Url).creatives(&doc);

        assert_eq!(creatives.len(), 2);
        assert_eq!(
            creatives["httpexamplecomvideo2mp4"].master_playlist_url,
            "http://example.com/video2.mp4"
        );
        assert_eq!(
            creatives["httpexamplecomvideo3mp4"].master_playlist_url,
            "http://example.com/video3.mp4"
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let doc = vast::decode_vast(TWO_ADS).unwrap();
        let rule = rule(KeyField::UniversalAdId);
        assert_eq!(rule.creatives(&doc), rule.creatives(&doc));
    }

    #[test]
    fn ads_without_key_are_skipped() {
        let doc = vast::decode_vast(br#"<VAST><Ad><InLine><Creatives/></InLine></Ad></VAST>"#).unwrap();
        assert!(rule(KeyField::Url).creatives(&doc).is_empty());
    }
}

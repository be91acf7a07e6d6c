use tracing::warn;
use url::{Host, Url};

/// Asset-server URL of a packaged HLS manifest.
///
/// `output` may be a bare path (`/folder/asset/job/`) or a full URL such as a bucket
/// location; only its path is used. Like URL resolution in a browser, an absolute
/// path replaces whatever path the asset server URL carries.
pub fn package_url(asset_server: &Url, output: &str, base_name: &str) -> Result<Url, url::ParseError> {
    let path = match Url::parse(output) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => output.to_string(),
    };
    let mut path = path.trim_end_matches('/').to_string();
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    asset_server.join(&format!("{}/{}.m3u8", path.trim_end_matches('/'), base_name))
}

/// Folder inside the output bucket that receives a creative's renditions.
pub fn output_folder(bucket: &Url, creative_id: &str) -> String {
    let mut folder = bucket.clone();
    folder.set_path(&format!("{}/{}/", bucket.path().trim_end_matches('/'), creative_id));
    folder.to_string()
}

/// Appends `path` to the path of `base`.
pub fn join_path(base: &Url, path: &str) -> Url {
    let mut joined = base.clone();
    let suffix = path.trim_start_matches('/');
    if suffix.is_empty() {
        return joined;
    }
    joined.set_path(&format!("{}/{}", base.path().trim_end_matches('/'), suffix));
    joined
}

/// Swaps the first label of the host, e.g. `ads.example.com` -> `eu.example.com`.
pub fn replace_subdomain(url: &mut Url, subdomain: &str) {
    let Some(Host::Domain(host)) = url.host() else {
        warn!(subdomain, "upstream host is not a domain name, keeping it");
        return;
    };
    let Some((_, rest)) = host.split_once('.') else {
        warn!(host, subdomain, "host has no subdomain to replace");
        return;
    };
    let new_host = format!("{subdomain}.{rest}");
    if let Err(e) = url.set_host(Some(&new_host)) {
        warn!(host = %new_host, error = %e, "invalid subdomain");
    }
}

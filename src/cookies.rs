use std::fs;
use std::path::Path;
use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use url::Url;

use crate::error::ApiResult;

/// Looks up a cookie value by name among the cookies the jar would send to `origin`.
pub fn cookie_value(jar: &Jar, origin: &Url, name: &str) -> Option<String> {
    let header = jar.cookies(origin)?;
    let header = header.to_str().ok()?;
    find_cookie(header, name).map(str::to_string)
}

/// Finds `name` in a `Cookie` header string (`a=1; b=2`).
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|entry| {
        let (key, value) = entry.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

/// The anti-forgery token, URL-decoded, if the server has set one.
pub fn xsrf_token(jar: &Jar, origin: &Url, name: &str) -> Option<String> {
    let raw = cookie_value(jar, origin, name)?;
    let decoded = urlencoding::decode(&raw)
        .map(|v| v.into_owned())
        .unwrap_or(raw);
    (!decoded.is_empty()).then_some(decoded)
}

/// Restores a jar previously written by [`persist_jar`]. A missing file yields
/// an empty jar.
pub fn load_jar(origin: &Url, path: &Path) -> ApiResult<Arc<Jar>> {
    let jar = Arc::new(Jar::default());
    if !path.exists() {
        return Ok(jar);
    }

    let contents = fs::read_to_string(path)?;
    for entry in contents.split(';') {
        let cookie = entry.trim();
        if !cookie.is_empty() {
            jar.add_cookie_str(&format!("{}; Path=/", cookie), origin);
        }
    }
    tracing::debug!(path = %path.display(), "restored session cookies");
    Ok(jar)
}

/// Writes the cookies the jar holds for `origin`. An empty jar removes the file.
pub fn persist_jar(jar: &Jar, origin: &Url, path: &Path) -> ApiResult<()> {
    match jar.cookies(origin) {
        Some(header) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, header.as_bytes())?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
            }
            tracing::debug!(path = %path.display(), "saved session cookies");
        }
        None => {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
    }
    Ok(())
}

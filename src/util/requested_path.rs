use std::{
    borrow::Cow,
    path::{Component, Path, PathBuf},
};

/// Percent-decode a URL path. Returns `None` if the decoded bytes are not valid UTF-8.
pub fn decode_percents(path: &str) -> Option<String> {
    percent_encoding::percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

/// Map a decoded request path onto a path relative to the served root.
///
/// Root and prefix components are dropped, and `..` pops a component, but never past the root.
/// The result is always relative, so joining it onto a root cannot escape that root.
pub fn sanitize_path(path: &str) -> PathBuf {
    let mut sanitized = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(segment) => {
                // A segment like `c:` would reintroduce a prefix on Windows.
                let plain = Path::new(segment)
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
                if plain {
                    sanitized.push(segment);
                }
            }
            Component::ParentDir => {
                sanitized.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    sanitized
}

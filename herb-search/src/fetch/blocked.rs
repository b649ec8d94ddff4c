//! Anti-automation denial page detection.

/// Return the first marker found in `body`, compared case-insensitively.
pub fn find_denial_marker<'a, I>(body: &str, markers: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let haystack = body.to_lowercase();
    markers
        .into_iter()
        .filter(|marker| !marker.trim().is_empty())
        .find(|marker| haystack.contains(&marker.to_lowercase()))
}

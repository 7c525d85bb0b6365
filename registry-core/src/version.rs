//! Version manager (§4.6): semver comparison, identity extraction.

use std::cmp::Ordering;

use bundle_registry_schema::SourceKind;
use regex::Regex;
use semver::Version;
use tracing::warn;

/// Bundle ids longer than this are rejected outright by
/// [`extract_bundle_identity`] as a ReDoS guard.
const MAX_BUNDLE_ID_LEN: usize = 200;
/// Version strings longer than this are rejected by [`compare_versions`].
const MAX_VERSION_LEN: usize = 100;

/// Compare two version strings.
///
/// Both are first normalised with semver `clean`-equivalent trimming; if
/// both parse as strict semver, a semver comparison is used. Otherwise each
/// is coerced (leading `v`, missing patch, etc.) and compared. As a last
/// resort, a lexicographic comparison is used and logged, since the caller
/// still needs *some* deterministic ordering.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if a.len() > MAX_VERSION_LEN || b.len() > MAX_VERSION_LEN {
        warn!(a_len = a.len(), b_len = b.len(), "version string too long, falling back to lexicographic compare");
        return a.cmp(b);
    }

    let clean_a = clean(a);
    let clean_b = clean(b);

    if let (Ok(va), Ok(vb)) = (Version::parse(&clean_a), Version::parse(&clean_b)) {
        return va.cmp(&vb);
    }

    if let (Some(va), Some(vb)) = (coerce(&clean_a), coerce(&clean_b)) {
        return va.cmp(&vb);
    }

    warn!(a, b, "could not parse either version as semver, falling back to lexicographic compare");
    a.cmp(b)
}

/// Strip a single leading `v`/`V` and surrounding whitespace, the way
/// semver's `clean` helper would.
fn clean(v: &str) -> String {
    v.trim().trim_start_matches(['v', 'V']).to_string()
}

/// Best-effort coercion of a loose version string into a [`Version`],
/// padding missing minor/patch components with zero.
fn coerce(v: &str) -> Option<Version> {
    if let Ok(parsed) = Version::parse(v) {
        return Some(parsed);
    }
    let core: String = v
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let parts: Vec<&str> = core.split('.').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return None;
    }
    let mut nums = [0u64; 3];
    for (i, part) in parts.iter().take(3).enumerate() {
        nums[i] = part.parse().ok()?;
    }
    Some(Version::new(nums[0], nums[1], nums[2]))
}

/// `compare(latest, installed) > 0`.
pub fn is_update_available(installed: &str, latest: &str) -> bool {
    compare_versions(latest, installed) == Ordering::Greater
}

/// Stable descending semver sort, dropping entries that cannot be parsed
/// even after coercion.
pub fn sort_versions_descending(versions: &[String]) -> Vec<String> {
    let mut parsed: Vec<(Version, String)> = versions
        .iter()
        .filter_map(|v| coerce(&clean(v)).map(|parsed| (parsed, v.clone())))
        .collect();
    parsed.sort_by(|(a, _), (b, _)| b.cmp(a));
    parsed.into_iter().map(|(_, original)| original).collect()
}

/// For release-hosted sources, strip a trailing `-v?MAJOR.MINOR.PATCH(-PRERELEASE)?`
/// suffix to recover the version-independent identity a bundle's versions
/// share. For every other source kind, the bundle id already *is* its
/// identity, so it is returned unchanged.
pub fn extract_bundle_identity(bundle_id: &str, source_kind: SourceKind) -> String {
    if bundle_id.len() > MAX_BUNDLE_ID_LEN {
        warn!(len = bundle_id.len(), "bundle id too long, returning unchanged");
        return bundle_id.to_string();
    }
    if !source_kind.is_release_hosted() {
        return bundle_id.to_string();
    }

    // Bounded quantifiers only: `{1,3}` for numeric groups and a capped
    // prerelease tail, per the ReDoS guard in the specification.
    let re = Regex::new(
        r"-v?\d{1,3}\.\d{1,3}\.\d{1,3}(-[A-Za-z0-9._-]{1,50})?$",
    )
    .expect("static regex is valid");

    match re.find(bundle_id) {
        Some(m) => bundle_id[..m.start()].to_string(),
        None => bundle_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_clean_semver() {
        assert_eq!(compare_versions("1.0.0", "1.1.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "1.1.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn compares_with_v_prefix() {
        assert_eq!(compare_versions("v1.2.0", "1.1.0"), Ordering::Greater);
    }

    #[test]
    fn coerces_partial_versions() {
        assert_eq!(compare_versions("1.2", "1.10"), Ordering::Less);
    }

    #[test]
    fn is_update_available_basic() {
        assert!(is_update_available("1.0.0", "1.1.0"));
        assert!(!is_update_available("1.1.0", "1.0.0"));
        assert!(!is_update_available("1.0.0", "1.0.0"));
    }

    #[test]
    fn sorts_descending_and_drops_unparseable() {
        let input = vec![
            "1.0.0".to_string(),
            "not-a-version".to_string(),
            "2.3.1".to_string(),
            "1.9.0".to_string(),
        ];
        let sorted = sort_versions_descending(&input);
        assert_eq!(sorted, vec!["2.3.1", "1.9.0", "1.0.0"]);
    }

    #[test]
    fn extracts_identity_for_release_hosted() {
        assert_eq!(
            extract_bundle_identity("test-owner-test-repo-v1.0.0", SourceKind::GithubRelease),
            "test-owner-test-repo"
        );
        assert_eq!(
            extract_bundle_identity(
                "test-owner-test-repo-1.0.0-beta.1",
                SourceKind::GithubRelease
            ),
            "test-owner-test-repo"
        );
    }

    #[test]
    fn identity_unchanged_for_non_release_hosted() {
        assert_eq!(
            extract_bundle_identity("some-collection-id", SourceKind::AwesomeCopilot),
            "some-collection-id"
        );
    }

    #[test]
    fn identity_unchanged_when_too_long() {
        let long = "a".repeat(250);
        assert_eq!(
            extract_bundle_identity(&long, SourceKind::GithubRelease),
            long
        );
    }
}

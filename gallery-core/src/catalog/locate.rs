// gallery-core/src/catalog/locate.rs
use std::path::MAIN_SEPARATOR;

use gallery_common::error::{GalleryError, Result};
use gallery_common::model::GalleryElement;

/// How unqualified names that exist in more than one gallery are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupPolicy {
    /// The element from the earliest-listed gallery wins.
    #[default]
    FirstMatch,
    /// The lookup fails with [`GalleryError::Ambiguous`].
    RejectAmbiguous,
}

impl LookupPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            LookupPolicy::RejectAmbiguous
        } else {
            LookupPolicy::FirstMatch
        }
    }
}

/// Replaces the path separator so a name can never address a subdirectory.
pub fn normalize_name(name: &str) -> String {
    name.replace(MAIN_SEPARATOR, "__")
}

fn equal_fold(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Finds the element addressed by `name`, either `<name>` or
/// `<gallery>@<name>`. Matching is case-insensitive.
pub fn find_gallery_element<'a, T: GalleryElement>(
    elements: &'a [T],
    name: &str,
    policy: LookupPolicy,
) -> Result<&'a T> {
    let name = normalize_name(name);
    let not_found = || GalleryError::NotFound(format!("no element found with name {name}"));

    if !name.contains('@') {
        let mut matches = elements
            .iter()
            .filter(|e| equal_fold(&normalize_name(e.name()), &name));
        let first = matches.next().ok_or_else(not_found)?;
        if policy == LookupPolicy::RejectAmbiguous {
            let mut galleries = vec![first.gallery().name.clone()];
            for other in matches {
                if !galleries.contains(&other.gallery().name) {
                    galleries.push(other.gallery().name.clone());
                }
            }
            if galleries.len() > 1 {
                return Err(GalleryError::Ambiguous { name, galleries });
            }
        }
        return Ok(first);
    }

    elements
        .iter()
        .find(|e| {
            let qualified = format!("{}@{}", e.gallery().name, normalize_name(e.name()));
            equal_fold(&qualified, &name)
        })
        .ok_or_else(not_found)
}

/// Case-insensitive substring search over name, description and tags.
pub fn search_elements<'a, T: GalleryElement>(elements: &'a [T], term: &str) -> Vec<&'a T> {
    let term = term.to_lowercase();
    elements
        .iter()
        .filter(|e| {
            e.name().to_lowercase().contains(&term)
                || e.description().to_lowercase().contains(&term)
                || e.tags().iter().any(|t| t.to_lowercase().contains(&term))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use gallery_common::{GalleryModel, GallerySource};

    use super::*;

    fn model(gallery: &str, name: &str) -> GalleryModel {
        GalleryModel {
            name: name.to_string(),
            url: format!("https://{gallery}.example.com/{name}.yaml"),
            gallery: GallerySource::new(gallery, format!("https://{gallery}.example.com")),
            ..Default::default()
        }
    }

    #[test]
    fn unqualified_lookup_is_case_insensitive() {
        let models = vec![model("a", "Llama"), model("a", "phi")];
        let found = find_gallery_element(&models, "llama", LookupPolicy::FirstMatch).unwrap();
        assert_eq!(found.name, "Llama");
    }

    #[test]
    fn duplicates_resolve_to_earliest_gallery() {
        let models = vec![model("first", "foo"), model("second", "foo")];
        let found = find_gallery_element(&models, "foo", LookupPolicy::FirstMatch).unwrap();
        assert_eq!(found.gallery.name, "first");
    }

    #[test]
    fn strict_policy_rejects_ambiguous_names() {
        let models = vec![model("first", "foo"), model("second", "foo")];
        let err = find_gallery_element(&models, "foo", LookupPolicy::RejectAmbiguous).unwrap_err();
        match err {
            GalleryError::Ambiguous { galleries, .. } => {
                assert_eq!(galleries, vec!["first".to_string(), "second".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
        // Qualified names stay unambiguous
        let found =
            find_gallery_element(&models, "second@foo", LookupPolicy::RejectAmbiguous).unwrap();
        assert_eq!(found.gallery.name, "second");
    }

    #[test]
    fn qualified_lookup_never_crosses_galleries() {
        let models = vec![model("first", "foo"), model("second", "bar")];
        let found = find_gallery_element(&models, "SECOND@bar", LookupPolicy::FirstMatch).unwrap();
        assert_eq!(found.gallery.name, "second");
        assert!(find_gallery_element(&models, "second@foo", LookupPolicy::FirstMatch).is_err());
    }

    #[test]
    fn missing_name_is_not_found() {
        let models = vec![model("a", "foo")];
        let err = find_gallery_element(&models, "nope", LookupPolicy::FirstMatch).unwrap_err();
        assert_eq!(err.to_string(), "no element found with name nope");
        let empty: Vec<GalleryModel> = Vec::new();
        assert!(find_gallery_element(&empty, "foo", LookupPolicy::FirstMatch).is_err());
    }

    #[test]
    fn separator_is_normalized_on_both_sides() {
        let nested = format!("org{MAIN_SEPARATOR}model");
        let models = vec![model("a", &nested)];
        assert_eq!(normalize_name(&nested), "org__model");
        let found = find_gallery_element(&models, &nested, LookupPolicy::FirstMatch).unwrap();
        assert_eq!(found.name, nested);
        let found = find_gallery_element(&models, "org__model", LookupPolicy::FirstMatch).unwrap();
        assert_eq!(found.name, nested);
        let found =
            find_gallery_element(&models, &format!("a@{nested}"), LookupPolicy::FirstMatch).unwrap();
        assert_eq!(found.name, nested);
    }

    #[test]
    fn search_matches_description_and_tags() {
        let mut tagged = model("a", "whisper");
        tagged.tags = vec!["Speech".to_string()];
        let mut described = model("a", "phi");
        described.description = "A small speech-free model".to_string();
        let models = vec![tagged, described, model("a", "llama")];
        let names: Vec<_> = search_elements(&models, "speech")
            .into_iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["whisper", "phi"]);
    }
}

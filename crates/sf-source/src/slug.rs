//! Product slug derivation.

use deunicode::deunicode;

/// Derive the human-readable slug of a product.
///
/// Pure function of the product title and optional variant. Unicode is
/// transliterated to ASCII, letters are lowercased and every run of other
/// characters collapses into a single `-`. Leading and trailing dashes are
/// dropped.
///
/// ```
/// use sf_source::derive_product_slug;
///
/// assert_eq!(derive_product_slug("Écharpe tressée", None), "echarpe-tressee");
/// assert_eq!(derive_product_slug("Scarf", Some("Red")), "scarf-red");
/// ```
#[must_use]
pub fn derive_product_slug(title: &str, variant: Option<&str>) -> String {
    let mut slug = String::with_capacity(title.len());
    push_slugified(&mut slug, title);
    if let Some(variant) = variant {
        push_slugified(&mut slug, variant);
    }
    slug
}

fn push_slugified(slug: &mut String, text: &str) {
    let ascii = deunicode(text);
    let mut pending_dash = !slug.is_empty();
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash {
                slug.push('-');
                pending_dash = false;
            }
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() {
            pending_dash = true;
        }
    }
}

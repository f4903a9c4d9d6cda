use folio_core::Post;
use sha2::{Digest, Sha256};

/// Hex characters kept from the digest
pub const FINGERPRINT_LEN: usize = 8;

/// The string a post's fingerprint is computed over: `{hero}-{title}-{published}`
pub fn fingerprint_input(post: &Post) -> String {
    format!("{}-{}-{}", post.hero, post.title, post.published_str())
}

/// Short content digest used to bust caches of the post's OG image.
/// Not a security primitive.
pub fn fingerprint(post: &Post) -> String {
    let digest = Sha256::digest(fingerprint_input(post).as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// `{slug}-{fingerprint}.png`
pub fn image_file_name(post: &Post) -> String {
    format!("{}-{}.png", post.slug, fingerprint(post))
}

use uuid::Uuid;

/// Characters available for hierarchy segments: the 32 hex digits of a
/// simple-form UUID.
pub const MAX_HIERARCHY_WIDTH: u32 = 32;

/// Endless source of fresh identifier strings for one partition.
pub type IdentifierSupplier = Box<dyn Iterator<Item = String> + Send>;

/// Mints identifiers under a prefix.
///
/// `levels` directory-like segments of `length` characters each are placed
/// between the prefix and the unique part of the identifier.
pub trait IdentifierService: Send + Sync {
    fn supplier(&self, prefix: &str, levels: u32, length: u32) -> IdentifierSupplier;
}

/// Mints `prefix + seg/…/seg/ + token`, where `token` is a random UUID v4 in
/// 32-character hex and each segment is the next `length` characters of the
/// token.
///
/// Segments repeat the head of the token, so fan-out is uniform and the full
/// token keeps identifiers unique. A `/` is inserted after the prefix unless
/// it already ends in `/` or `:`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdentifierService;

impl UuidIdentifierService {
    pub fn new() -> Self {
        Self
    }

    /// Build one identifier from an explicit token.
    pub fn compose(prefix: &str, levels: u32, length: u32, token: &str) -> String {
        let segments = (levels as usize).saturating_mul((length as usize).saturating_add(1));
        let mut id = String::with_capacity(
            prefix
                .len()
                .saturating_add(token.len())
                .saturating_add(segments.min(token.len() * 2))
                .saturating_add(1),
        );
        id.push_str(prefix);
        if !prefix.is_empty() && !prefix.ends_with(['/', ':']) {
            id.push('/');
        }
        if length > 0 {
            for segment in token.as_bytes().chunks(length as usize).take(levels as usize) {
                id.extend(segment.iter().map(|&b| char::from(b)));
                id.push('/');
            }
        }
        id.push_str(token);
        id
    }
}

impl IdentifierService for UuidIdentifierService {
    fn supplier(&self, prefix: &str, levels: u32, length: u32) -> IdentifierSupplier {
        let prefix = prefix.to_string();
        Box::new(std::iter::repeat_with(move || {
            let token = Uuid::new_v4().simple().to_string();
            Self::compose(&prefix, levels, length, &token)
        }))
    }
}

use crate::mixer::{mix, HashValue};

/// Fold a node's own hash with its children's results.
///
/// The inputs are written as unsigned decimal digits, own hash first and
/// then each child left to right, with no separators, and the resulting
/// text is re-mixed. Child order matters.
pub fn combine(own: HashValue, children: &[HashValue]) -> HashValue {
    let mut encoded = own.to_string();
    for child in children {
        encoded.push_str(&child.to_string());
    }
    mix(encoded.as_bytes())
}

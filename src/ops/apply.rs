use crate::models::{EditOperation, OperationType};

/// Apply `op` to `base` and return the resulting text.
///
/// Never fails: positions are clamped into the text, negative values count as
/// zero, and an operation that would leave broken UTF-16 (a split surrogate
/// pair) or has an unknown type returns `base` unchanged.
pub fn apply_edit(base: &str, op: &EditOperation) -> String {
    let (remove, insert) = match op.op_type {
        OperationType::Insert => (0, op.content.as_str()),
        OperationType::Delete => (op.delete_count, ""),
        OperationType::Replace => (op.delete_count, op.content.as_str()),
        OperationType::Unknown => return base.to_string(),
    };
    splice(base, op.position, remove, insert).unwrap_or_else(|| base.to_string())
}

fn splice(base: &str, position: i64, remove: i64, insert: &str) -> Option<String> {
    let units: Vec<u16> = base.encode_utf16().collect();
    let start = clamp(position, units.len());
    let end = clamp(position.max(0).saturating_add(remove.max(0)), units.len());

    let mut out = Vec::with_capacity(units.len() + insert.len());
    out.extend_from_slice(&units[..start]);
    out.extend(insert.encode_utf16());
    out.extend_from_slice(&units[end..]);
    String::from_utf16(&out).ok()
}

fn clamp(offset: i64, len: usize) -> usize {
    usize::try_from(offset.max(0)).map_or(len, |o| o.min(len))
}

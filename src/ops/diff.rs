use crate::models::{EditOperation, OperationType};

/// Compute the single edit that turns `prev` into `next`.
///
/// Greedy scan: longest common prefix, then longest common suffix bounded by
/// the prefix. Whatever sits between is deleted from `prev` and replaced by
/// the matching span of `next`. Offsets are UTF-16 code units and never land
/// inside a surrogate pair. Returns `None` when the texts are equal.
pub fn compute_edit(prev: &str, next: &str, user_id: &str, client_version: i64) -> Option<EditOperation> {
    if prev == next {
        return None;
    }

    let prev: Vec<u16> = prev.encode_utf16().collect();
    let next: Vec<u16> = next.encode_utf16().collect();

    let mut start = 0;
    while start < prev.len() && start < next.len() && prev[start] == next[start] {
        start += 1;
    }
    if start > 0 && is_high_surrogate(prev[start - 1]) {
        start -= 1;
    }

    let mut end_prev = prev.len();
    let mut end_next = next.len();
    while end_prev > start && end_next > start && prev[end_prev - 1] == next[end_next - 1] {
        end_prev -= 1;
        end_next -= 1;
    }
    if end_prev < prev.len() && is_low_surrogate(prev[end_prev]) {
        end_prev += 1;
        end_next += 1;
    }

    let delete_count = end_prev - start;
    let inserted = &next[start..end_next];

    let op_type = if delete_count == 0 && !inserted.is_empty() {
        OperationType::Insert
    } else if inserted.is_empty() && delete_count > 0 {
        OperationType::Delete
    } else {
        OperationType::Replace
    };

    Some(EditOperation {
        user_id: user_id.to_string(),
        op_type,
        position: start as i64,
        content: String::from_utf16_lossy(inserted),
        delete_count: delete_count as i64,
        client_version,
    })
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

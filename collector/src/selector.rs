use harvest_core::{CommentHandle, CommentSelectionPolicy};

/// Bodies Reddit substitutes for deleted or removed comments.
pub const TOMBSTONES: [&str; 2] = ["[deleted]", "[removed]"];

pub fn is_tombstoned(body: &str) -> bool {
    TOMBSTONES.contains(&body)
}

/// Applies `policy` to a fully materialized, flattened comment list, then
/// drops tombstoned comments.
///
/// Positions refer to the list as given, tombstones included, so the same
/// policy always addresses the same comments of a thread.
pub fn select(comments: Vec<CommentHandle>, policy: &CommentSelectionPolicy) -> Vec<CommentHandle> {
    let len = comments.len();
    let (skip, take) = match *policy {
        CommentSelectionPolicy::Limit(n) => (0, n.min(len)),
        CommentSelectionPolicy::Range { lo, hi } => {
            let lo = lo.max(1);
            let hi = hi.min(len);
            if hi < lo {
                (0, 0)
            } else {
                (lo - 1, hi - lo + 1)
            }
        }
        CommentSelectionPolicy::All => (0, len),
    };

    comments
        .into_iter()
        .skip(skip)
        .take(take)
        .filter(|comment| !is_tombstoned(&comment.body))
        .collect()
}

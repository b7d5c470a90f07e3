/// Capacity invariant for a group: adding `delta` students keeps the
/// enrolled count within `capacity`. Negative deltas are rejected outright.
pub(crate) fn capacity_ok(capacity: i32, enrolled: i64, delta: i64) -> bool {
    delta >= 0 && enrolled + delta <= capacity as i64
}

//! The history windower.

/// Returns the trailing window of at most `size` elements, order
/// preserved.
///
/// Total function: a sequence shorter than `size` comes back whole, and
/// `size == 0` yields the empty slice. Applying it to its own output with
/// the same size is a no-op.
pub fn window<T>(messages: &[T], size: usize) -> &[T] {
    &messages[messages.len().saturating_sub(size)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_elements_in_order() {
        let seq = ["hi", "how are you", "bye"];
        assert_eq!(window(&seq, 2), ["how are you", "bye"]);
    }

    #[test]
    fn shorter_sequence_is_unchanged() {
        let seq = [1, 2, 3];
        assert_eq!(window(&seq, 10), [1, 2, 3]);
        assert_eq!(window(&seq, 3), [1, 2, 3]);
    }

    #[test]
    fn zero_size_is_empty() {
        let seq = [1, 2, 3];
        assert!(window(&seq, 0).is_empty());
        let empty: [i32; 0] = [];
        assert!(window(&empty, 4).is_empty());
    }

    #[test]
    fn idempotent_on_own_output() {
        let seq = [1, 2, 3, 4, 5, 6];
        let once = window(&seq, 4);
        let twice = window(once, 4);
        assert_eq!(once, twice);
    }
}

//! Bottom-up state derivation: quant lines → line → borrowing

use crate::models::borrowing::{BorrowingState, LineState, QuantLineState};

/// State of a line from its requested quantity and its copies
pub fn line_state(requested_quantity: i32, copies: &[QuantLineState]) -> LineState {
    use QuantLineState as Q;

    if copies.is_empty() {
        return LineState::Draft;
    }
    if copies.iter().all(|s| *s == Q::Cancelled) {
        return LineState::Cancelled;
    }
    if copies.iter().all(|s| matches!(s, Q::Returned | Q::Cancelled)) {
        return LineState::Returned;
    }
    if copies.contains(&Q::Overdue) {
        return LineState::Overdue;
    }
    if copies.contains(&Q::Borrowed) {
        return if copies.contains(&Q::Returned) {
            LineState::PartialReturn
        } else {
            LineState::Borrowed
        };
    }
    if copies.iter().all(|s| matches!(s, Q::Lost | Q::Returned | Q::Cancelled)) {
        return LineState::Lost;
    }

    let fulfilled = copies.iter().filter(|s| **s != Q::Cancelled).count();
    if (fulfilled as i64) < requested_quantity as i64 {
        LineState::Partial
    } else {
        LineState::Allocated
    }
}

/// State of a borrowing from its lines.
///
/// Priority: overdue > borrowed > returned > cancelled.
pub fn borrowing_state(lines: &[LineState]) -> BorrowingState {
    use LineState as L;

    if lines.is_empty() {
        return BorrowingState::Draft;
    }
    if lines.iter().all(|s| *s == L::Cancelled) {
        return BorrowingState::Cancelled;
    }
    if lines.iter().all(|s| matches!(s, L::Returned | L::Cancelled)) {
        return BorrowingState::Returned;
    }
    if lines.contains(&L::Overdue) {
        return BorrowingState::Overdue;
    }
    if lines.iter().any(|s| matches!(s, L::Borrowed | L::PartialReturn)) {
        return BorrowingState::Borrowed;
    }
    if lines.iter().all(|s| matches!(s, L::Lost | L::Returned | L::Cancelled)) {
        return BorrowingState::Lost;
    }
    BorrowingState::Draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use QuantLineState as Q;

    #[test]
    fn test_line_without_copies_is_draft() {
        assert_eq!(line_state(2, &[]), LineState::Draft);
    }

    #[test]
    fn test_line_allocation_states() {
        assert_eq!(line_state(2, &[Q::Draft]), LineState::Partial);
        assert_eq!(line_state(2, &[Q::Draft, Q::Draft]), LineState::Allocated);
        assert_eq!(line_state(2, &[Q::Draft, Q::Cancelled]), LineState::Partial);
    }

    #[test]
    fn test_line_circulation_states() {
        assert_eq!(line_state(1, &[Q::Borrowed]), LineState::Borrowed);
        assert_eq!(line_state(2, &[Q::Borrowed, Q::Returned]), LineState::PartialReturn);
        assert_eq!(line_state(2, &[Q::Borrowed, Q::Overdue]), LineState::Overdue);
        assert_eq!(line_state(2, &[Q::Returned, Q::Cancelled]), LineState::Returned);
        assert_eq!(line_state(2, &[Q::Cancelled, Q::Cancelled]), LineState::Cancelled);
        assert_eq!(line_state(2, &[Q::Lost, Q::Returned]), LineState::Lost);
    }

    #[test]
    fn test_header_priority() {
        use LineState as L;
        assert_eq!(borrowing_state(&[]), BorrowingState::Draft);
        assert_eq!(borrowing_state(&[L::Overdue, L::Borrowed]), BorrowingState::Overdue);
        assert_eq!(borrowing_state(&[L::Borrowed, L::Returned]), BorrowingState::Borrowed);
        assert_eq!(borrowing_state(&[L::PartialReturn]), BorrowingState::Borrowed);
        assert_eq!(borrowing_state(&[L::Returned, L::Cancelled]), BorrowingState::Returned);
        assert_eq!(borrowing_state(&[L::Cancelled]), BorrowingState::Cancelled);
        assert_eq!(borrowing_state(&[L::Lost, L::Returned]), BorrowingState::Lost);
        assert_eq!(borrowing_state(&[L::Allocated, L::Partial]), BorrowingState::Draft);
    }

    #[test]
    fn test_header_exhaustive_pairs() {
        use LineState as L;
        let all = [
            L::Draft,
            L::Partial,
            L::Allocated,
            L::Borrowed,
            L::PartialReturn,
            L::Returned,
            L::Overdue,
            L::Lost,
            L::Cancelled,
        ];
        for a in all {
            for b in all {
                let state = borrowing_state(&[a, b]);
                if a == L::Overdue || b == L::Overdue {
                    assert_eq!(state, BorrowingState::Overdue, "{a} + {b}");
                } else if matches!(a, L::Borrowed | L::PartialReturn)
                    || matches!(b, L::Borrowed | L::PartialReturn)
                {
                    assert_eq!(state, BorrowingState::Borrowed, "{a} + {b}");
                }
                if [a, b].iter().all(|s| matches!(s, L::Returned | L::Cancelled))
                    && !(a == L::Cancelled && b == L::Cancelled)
                {
                    assert_eq!(state, BorrowingState::Returned, "{a} + {b}");
                }
            }
        }
    }
}

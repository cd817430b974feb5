use crate::types::Message;

/// Return the trailing `keep` messages of a history, or all of them if the
/// history is shorter. Order is preserved and the underlying slice is not
/// touched.
pub fn windowed(messages: &[Message], keep: usize) -> &[Message] {
    let count = keep.min(messages.len());
    &messages[messages.len() - count..]
}

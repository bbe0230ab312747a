//! Event-stream wire framing.

/// Comment frame sent periodically so proxies keep idle streams open.
pub const HEARTBEAT: &str = ": keep-alive\n\n";

/// Frame `payload` as one event.
///
/// Every line of the payload gets its own `data: ` prefix so embedded line
/// breaks (LF, CRLF or lone CR) cannot end the event early. The frame ends
/// with a blank line.
pub fn encode_event(payload: &str) -> String {
    let normalized = payload.replace("\r\n", "\n").replace('\r', "\n");
    let mut frame = String::with_capacity(normalized.len() + 8);
    for line in normalized.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

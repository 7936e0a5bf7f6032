//! Detection of consecutive duplicate events.

use hermes_protocol::{Event, Exception, Frame, Stacktrace};

/// The parts of a sent event that later events are compared against.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DedupKey {
    /// The message of the event.
    pub message: Option<String>,
    /// The culprit of the event.
    pub culprit: Option<String>,
    /// The synthetic stack trace of a message capture.
    pub stacktrace: Option<Stacktrace>,
    /// The first exception of the event.
    pub exception: Option<Exception>,
}

impl DedupKey {
    /// Extracts the key from an event.
    pub fn from_event(event: &Event) -> Self {
        Self {
            message: event.message.clone(),
            culprit: event.culprit.clone(),
            stacktrace: event.stacktrace.clone(),
            exception: event.first_exception().cloned(),
        }
    }
}

/// Returns `true` if `candidate` repeats the last event that was sent.
///
/// Events repeat if message and culprit are equal and their stack traces or exceptions point to
/// the same frames. Events without any trace data repeat as soon as message and culprit match.
pub fn is_repeat(candidate: &Event, last_sent: Option<&DedupKey>) -> bool {
    let Some(last) = last_sent else {
        return false;
    };

    if candidate.message != last.message || candidate.culprit != last.culprit {
        return false;
    }

    if candidate.stacktrace.is_some() || last.stacktrace.is_some() {
        return is_same_stacktrace(candidate.stacktrace.as_ref(), last.stacktrace.as_ref());
    }

    let exception = candidate.first_exception();
    if exception.is_some() || last.exception.is_some() {
        return is_same_exception(exception, last.exception.as_ref());
    }

    true
}

fn is_same_exception(a: Option<&Exception>, b: Option<&Exception>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };

    a.ty == b.ty
        && a.value == b.value
        && is_same_stacktrace(a.stacktrace.as_ref(), b.stacktrace.as_ref())
}

fn is_same_stacktrace(a: Option<&Stacktrace>, b: Option<&Stacktrace>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };

    is_same_frames(&a.frames, &b.frames)
}

fn is_same_frames(a: &[Frame], b: &[Frame]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_location(b))
}

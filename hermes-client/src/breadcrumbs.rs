use std::collections::VecDeque;
use std::sync::Arc;

use hermes_common::{MAX_BREADCRUMBS, now_epoch_seconds};
use hermes_protocol::Breadcrumb;

/// The decision of a breadcrumb callback.
#[derive(Clone, Debug, PartialEq)]
pub enum BreadcrumbAction {
    /// Record this breadcrumb instead. An empty replacement keeps the original.
    Replace(Breadcrumb),
    /// Record the breadcrumb unchanged.
    Keep,
    /// Drop the breadcrumb.
    Discard,
}

/// Callback inspecting breadcrumbs before they are recorded.
pub type BreadcrumbCallback = Arc<dyn Fn(&Breadcrumb) -> BreadcrumbAction + Send + Sync>;

/// Prepares a breadcrumb for recording.
///
/// A missing timestamp is set to the current time, then the callbacks run in registration order.
/// Returns `None` if any callback discards the breadcrumb.
pub fn process_breadcrumb(
    crumb: Breadcrumb,
    callbacks: &[BreadcrumbCallback],
) -> Option<Breadcrumb> {
    let mut crumb = with_timestamp(crumb);

    for callback in callbacks {
        match callback(&crumb) {
            BreadcrumbAction::Replace(replacement) if !replacement.is_empty() => {
                crumb = replacement;
            }
            BreadcrumbAction::Replace(_) | BreadcrumbAction::Keep => (),
            BreadcrumbAction::Discard => return None,
        }
    }

    Some(crumb)
}

/// A bounded buffer of the most recent breadcrumbs.
#[derive(Clone, Debug)]
pub struct BreadcrumbBuffer {
    crumbs: VecDeque<Breadcrumb>,
    max: usize,
}

impl BreadcrumbBuffer {
    /// Creates a buffer retaining at most `max` breadcrumbs.
    pub fn new(max: usize) -> Self {
        Self {
            crumbs: VecDeque::with_capacity(max.min(MAX_BREADCRUMBS)),
            max,
        }
    }

    /// Returns the number of buffered breadcrumbs.
    pub fn len(&self) -> usize {
        self.crumbs.len()
    }

    /// Returns `true` if no breadcrumbs are buffered.
    pub fn is_empty(&self) -> bool {
        self.crumbs.is_empty()
    }

    /// Changes the limit, evicting the oldest breadcrumbs if necessary.
    pub fn set_max(&mut self, max: usize) {
        self.max = max;
        self.evict();
    }

    /// Records a breadcrumb that has already passed the callbacks.
    pub fn push(&mut self, crumb: Breadcrumb) {
        self.crumbs.push_back(crumb);
        self.evict();
    }

    /// Returns a copy of the buffered breadcrumbs, oldest first.
    pub fn snapshot(&self) -> Vec<Breadcrumb> {
        self.crumbs.iter().cloned().collect()
    }

    fn evict(&mut self) {
        while self.crumbs.len() > self.max {
            self.crumbs.pop_front();
        }
    }
}

impl Default for BreadcrumbBuffer {
    fn default() -> Self {
        Self::new(MAX_BREADCRUMBS)
    }
}

fn with_timestamp(mut crumb: Breadcrumb) -> Breadcrumb {
    if crumb.timestamp.is_none() {
        crumb.timestamp = Some(now_epoch_seconds());
    }
    crumb
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    fn crumb(message: &str) -> Breadcrumb {
        Breadcrumb {
            message: Some(message.to_owned()),
            ..Default::default()
        }
    }

    fn append(
        buffer: &mut BreadcrumbBuffer,
        crumb: Breadcrumb,
        callbacks: &[BreadcrumbCallback],
    ) -> bool {
        match process_breadcrumb(crumb, callbacks) {
            Some(crumb) => {
                buffer.push(crumb);
                true
            }
            None => false,
        }
    }

    fn messages(buffer: &BreadcrumbBuffer) -> Vec<String> {
        buffer
            .snapshot()
            .into_iter()
            .filter_map(|crumb| crumb.message)
            .collect()
    }

    #[test]
    fn test_evicts_oldest() {
        let mut buffer = BreadcrumbBuffer::new(3);
        for i in 1..=5 {
            assert!(append(&mut buffer, crumb(&i.to_string()), &[]));
        }

        assert_eq!(messages(&buffer), vec!["3", "4", "5"]);
    }

    #[test]
    fn test_timestamp_filled() {
        let mut buffer = BreadcrumbBuffer::default();
        append(&mut buffer, crumb("a"), &[]);

        let explicit = Breadcrumb {
            timestamp: Some(1.5),
            ..crumb("b")
        };
        append(&mut buffer, explicit, &[]);

        let snapshot = buffer.snapshot();
        assert!(snapshot[0].timestamp.is_some_and(|ts| ts > 0.0));
        assert_eq!(snapshot[1].timestamp, Some(1.5));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut buffer = BreadcrumbBuffer::default();
        append(&mut buffer, crumb("a"), &[]);

        let snapshot = buffer.snapshot();
        append(&mut buffer, crumb("b"), &[]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_callbacks_in_order() {
        let upper: BreadcrumbCallback = Arc::new(|crumb| {
            BreadcrumbAction::Replace(Breadcrumb {
                message: crumb.message.as_ref().map(|m| m.to_uppercase()),
                ..crumb.clone()
            })
        });
        let suffix: BreadcrumbCallback = Arc::new(|crumb| {
            BreadcrumbAction::Replace(Breadcrumb {
                message: crumb.message.as_ref().map(|m| format!("{m}!")),
                ..crumb.clone()
            })
        });

        let mut buffer = BreadcrumbBuffer::default();
        append(&mut buffer, crumb("hello"), &[upper, suffix]);

        assert_eq!(messages(&buffer), vec!["HELLO!"]);
    }

    #[test]
    fn test_callback_discard() {
        let discard: BreadcrumbCallback = Arc::new(|_| BreadcrumbAction::Discard);
        let mut buffer = BreadcrumbBuffer::default();

        assert!(!append(&mut buffer, crumb("secret"), &[discard]));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_empty_replacement_keeps_original() {
        let empty: BreadcrumbCallback =
            Arc::new(|_| BreadcrumbAction::Replace(Breadcrumb::default()));
        let mut buffer = BreadcrumbBuffer::default();

        append(&mut buffer, crumb("kept"), &[empty]);
        assert_eq!(messages(&buffer), vec!["kept"]);
    }

    #[test]
    fn test_set_max_evicts() {
        let mut buffer = BreadcrumbBuffer::new(10);
        for i in 0..10 {
            buffer.push(crumb(&i.to_string()));
        }

        buffer.set_max(2);
        assert_eq!(messages(&buffer), vec!["8", "9"]);
    }
}

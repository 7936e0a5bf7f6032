use hermes_protocol::{Object, Value};
use serde::Serialize;

/// Context that applies to every event captured by a client.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GlobalContext {
    /// The current user. Replaced as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Object<Value>>,
    /// Tags merged into every event.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub tags: Object<String>,
    /// Additional data merged into every event.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub extra: Object<Value>,
}

impl GlobalContext {
    /// Replaces the user. `None` removes it.
    pub fn set_user(&mut self, user: Option<Object<Value>>) {
        self.user = user.filter(|user| !user.is_empty());
    }

    /// Merges tags into the context. `None` removes all tags.
    pub fn merge_tags(&mut self, tags: Option<Object<String>>) {
        match tags {
            Some(tags) => self.tags.extend(tags),
            None => self.tags.clear(),
        }
    }

    /// Merges additional data into the context. `None` removes all data.
    pub fn merge_extra(&mut self, extra: Option<Object<Value>>) {
        match extra {
            Some(extra) => self.extra.extend(extra),
            None => self.extra.clear(),
        }
    }

    /// Removes the user, all tags and all additional data.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_merge_and_clear() {
        let mut context = GlobalContext::default();

        context.merge_tags(Some([("a".to_owned(), "1".to_owned())].into()));
        context.merge_tags(Some([("b".to_owned(), "2".to_owned())].into()));
        context.merge_tags(Some([("a".to_owned(), "3".to_owned())].into()));
        assert_eq!(context.tags.len(), 2);
        assert_eq!(context.tags["a"], "3");

        context.merge_extra(Some([("x".to_owned(), json!(1))].into()));
        context.merge_extra(None);
        assert!(context.extra.is_empty());

        context.set_user(Some([("id".to_owned(), json!("42"))].into()));
        context.clear();
        assert_eq!(context, GlobalContext::default());
    }

    #[test]
    fn test_set_user_replaces() {
        let mut context = GlobalContext::default();
        context.set_user(Some([("id".to_owned(), json!("1"))].into()));
        context.set_user(Some([("email".to_owned(), json!("a@b.c"))].into()));

        let user = context.user.as_ref().unwrap();
        assert!(!user.contains_key("id"));
        assert_eq!(user["email"], json!("a@b.c"));

        context.set_user(Some(Object::new()));
        assert_eq!(context.user, None);
    }

    #[test]
    fn test_serialize() {
        let mut context = GlobalContext::default();
        context.merge_tags(Some([("release".to_owned(), "1.0".to_owned())].into()));

        insta::assert_json_snapshot!(context, @r###"
        {
          "tags": {
            "release": "1.0"
          }
        }
        "###);
    }
}

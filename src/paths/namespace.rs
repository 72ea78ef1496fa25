//! Per-user key space inside the shared bucket.
//!
//! Every user owns the keys under `user-<id>-files/`. Resource paths are
//! relative to that segment; object keys are absolute.

use crate::paths::grammar::{self, DELIMITER, ROOT};
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

static USER_ROOT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^user-[0-9a-fA-F-]+-files/").expect("user root pattern is a valid regex")
});

/// Root segment owning every key of `user_id`, e.g. `user-<uuid>-files/`.
pub fn user_root(user_id: Uuid) -> String {
    format!("user-{}-files/", user_id)
}

/// Resolve a user-relative path to an absolute object key.
pub fn to_absolute(user_id: Uuid, path: &str) -> String {
    let root = user_root(user_id);
    if grammar::is_root(path) {
        return root;
    }
    format!("{}{}", root, path.trim_start_matches(DELIMITER))
}

/// Strip the user root segment from an absolute key.
///
/// A key that is exactly a user root resolves to [`ROOT`].
pub fn to_relative(key: &str) -> String {
    let relative = USER_ROOT_PATTERN.replace(key, "");
    if relative.is_empty() {
        ROOT.to_string()
    } else {
        relative.into_owned()
    }
}

/// True when `key` lies inside the namespace of `user_id`.
pub fn owns(user_id: Uuid, key: &str) -> bool {
    key.starts_with(&user_root(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn user() -> Uuid {
        Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap()
    }

    #[test]
    fn test_user_root_format() {
        assert_eq!(
            user_root(user()),
            "user-0f8fad5b-d9cb-469f-a165-70867728950e-files/"
        );
    }

    #[test]
    fn test_to_absolute() {
        let root = user_root(user());
        assert_eq!(to_absolute(user(), "/"), root);
        assert_eq!(to_absolute(user(), "docs/"), format!("{}docs/", root));
        assert_eq!(to_absolute(user(), "/docs/a.txt"), format!("{}docs/a.txt", root));
    }

    #[test]
    fn test_to_relative() {
        let root = user_root(user());
        assert_eq!(to_relative(&root), "/");
        assert_eq!(to_relative(&format!("{}docs/a.txt", root)), "docs/a.txt");
        assert_eq!(to_relative(&format!("{}docs/", root)), "docs/");
    }

    #[test]
    fn test_to_relative_strips_only_the_leading_root() {
        let root = user_root(user());
        let nested = format!("{}backup/{}", root, root);
        assert_eq!(to_relative(&nested), format!("backup/{}", root));
    }

    #[test]
    fn test_owns() {
        let key = to_absolute(user(), "docs/a.txt");
        assert!(owns(user(), &key));
        assert!(!owns(Uuid::new_v4(), &key));
    }

    proptest! {
        #[test]
        fn relative_path_round_trips(
            id in any::<u128>(),
            path in "([a-zA-Z0-9 ._-]{1,10}/){0,4}[a-zA-Z0-9._-]{1,10}/?",
        ) {
            let user_id = Uuid::from_u128(id);
            let key = to_absolute(user_id, &path);
            prop_assert!(owns(user_id, &key));
            prop_assert_eq!(to_relative(&key), path);
        }
    }
}

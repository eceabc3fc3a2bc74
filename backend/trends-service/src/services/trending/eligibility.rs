use crate::models::{Post, Visibility};

/// Whether interactions with `post` count towards trending at all.
///
/// Callers pass the canonical post (`Post::proper`), never the reshare wrapper.
pub fn is_eligible(post: &Post) -> bool {
    post.visibility == Visibility::Public
        && post.account.discoverable
        && !post.account.silenced
        && post.spoiler_text.trim().is_empty()
        && !post.sensitive
        && !post.is_reply()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use chrono::Utc;

    fn eligible_post() -> Post {
        Post {
            id: 1,
            account: Account {
                id: 2,
                discoverable: true,
                silenced: false,
                trendable: None,
                requested_review_at: None,
            },
            reblogs_count: 0,
            favourites_count: 0,
            created_at: Utc::now(),
            language: None,
            visibility: Visibility::Public,
            sensitive: false,
            spoiler_text: String::new(),
            in_reply_to_id: None,
            trendable: None,
            reblog: None,
        }
    }

    #[test]
    fn test_public_plain_post_is_eligible() {
        assert!(is_eligible(&eligible_post()));
    }

    #[test]
    fn test_each_condition_disqualifies() {
        let mut post = eligible_post();
        post.visibility = Visibility::Unlisted;
        assert!(!is_eligible(&post));

        let mut post = eligible_post();
        post.account.discoverable = false;
        assert!(!is_eligible(&post));

        let mut post = eligible_post();
        post.account.silenced = true;
        assert!(!is_eligible(&post));

        let mut post = eligible_post();
        post.spoiler_text = "cw: spoilers".to_string();
        assert!(!is_eligible(&post));

        let mut post = eligible_post();
        post.sensitive = true;
        assert!(!is_eligible(&post));

        let mut post = eligible_post();
        post.in_reply_to_id = Some(99);
        assert!(!is_eligible(&post));
    }

    #[test]
    fn test_blank_spoiler_counts_as_absent() {
        let mut post = eligible_post();
        post.spoiler_text = "   ".to_string();
        assert!(is_eligible(&post));
    }
}

use crate::domain::post::Post;

/// Only the author may update or delete a post. There is no admin override.
pub fn is_owner(post: &Post, acting_user_id: i64) -> bool {
    post.author_id == acting_user_id
}

/// A note authored by a user.
///
/// `username` is a foreign key into the users table, not an owned reference.
/// Resolve the author with an explicit lookup on the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Feedback {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub username: String,
}

impl Feedback {
    pub fn new(id: u64, title: String, content: String, username: String) -> Self {
        Self {
            id,
            title,
            content,
            username,
        }
    }
}

/// A registered account. The password is only ever held as a bcrypt hash.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    /// Primary key, immutable after creation
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn new(
        username: String,
        password_hash: String,
        email: String,
        first_name: String,
        last_name: String,
    ) -> Self {
        Self {
            username,
            password_hash,
            email,
            first_name,
            last_name,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

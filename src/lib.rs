pub mod core {
    pub mod config;
    pub mod error;
    pub mod state;
    pub mod routes;
    pub mod startup;
    pub mod tracing_init;

    #[cfg(test)]
    pub mod test_support;
}

pub mod handlers {
    pub mod feedback;
    pub mod fallback;
    pub mod health;
    pub mod home;
    pub mod users;
}

pub mod models {
    pub mod feedback;
    pub mod forms;
    pub mod user;
}

pub mod stores {
    pub mod database;
    pub mod session_store;
}

pub mod security {
    pub mod password;
    pub mod session;
}

pub mod services {
    pub mod accounts;
}

pub mod wal {
    #[allow(clippy::module_inception)]
    pub mod wal;
}

pub mod validation {
    pub mod forms;
}

pub mod views {
    pub mod pages;
}

pub mod utils {
    pub mod html;
    pub mod time;
}

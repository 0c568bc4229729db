pub mod prelude;

pub mod active_session;
pub mod category;
pub mod contact;
pub mod user;

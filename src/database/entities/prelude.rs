pub use super::active_session::Entity as ActiveSession;
pub use super::category::Entity as Category;
pub use super::contact::Entity as Contact;
pub use super::user::Entity as User;

pub mod access;
pub mod church;
pub mod office;
pub mod person;
pub mod priority;
pub mod task;
pub mod user;

pub use church::Church;
pub use office::Office;
pub use person::Person;
pub use priority::Priority;
pub use task::Task;
pub use user::User;

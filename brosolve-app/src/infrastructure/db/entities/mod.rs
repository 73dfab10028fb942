pub mod answer;
pub mod bug;
pub mod vote;

pub use answer::Entity as Answer;
pub use bug::Entity as Bug;
pub use vote::Entity as Vote;

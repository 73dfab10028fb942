mod cast_vote;
mod list_bugs;
mod manage_answer;
mod manage_bug;
mod post_answer;
mod submit_bug;
mod view_bug;
mod vote_status;

pub use cast_vote::CastVote;
pub use list_bugs::ListBugs;
pub use manage_answer::ManageAnswer;
pub use manage_bug::ManageBug;
pub use post_answer::PostAnswer;
pub use submit_bug::SubmitBug;
pub use view_bug::ViewBug;
pub use vote_status::GetVoteStatus;

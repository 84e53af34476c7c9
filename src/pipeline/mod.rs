pub mod judging;

pub use judging::handle_judging;

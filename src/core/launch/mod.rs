pub mod classpath;
pub mod task;

pub use classpath::{launch_variables, LaunchArgumentBuilder, LaunchContext, LibraryLookup};
pub use task::LaunchPlan;

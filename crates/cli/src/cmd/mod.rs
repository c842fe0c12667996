mod lookup;
mod plan;
mod run;

pub use lookup::cmd_lookup;
pub use plan::cmd_plan;
pub use run::cmd_run;

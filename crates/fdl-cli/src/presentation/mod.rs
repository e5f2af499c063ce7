//! Terminal formatting helpers.

mod tables;
mod task_display;

pub use tables::{print_separator, truncate_string};
pub use task_display::{print_task_table, status_label};
